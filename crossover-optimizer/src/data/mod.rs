pub mod archive;
pub mod loader;
pub mod synthetic;

pub use archive::{discover_csv_files, extract_archive};
pub use loader::{load_csv, read_bars};
pub use synthetic::{bars_to_csv, generate_noise_bars, generate_trending_bars};
