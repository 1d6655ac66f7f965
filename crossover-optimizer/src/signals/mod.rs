pub mod crossover;

pub use crossover::SignalGenerator;
