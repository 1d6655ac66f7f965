use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Insufficient cash: need ${required:.2}, have ${available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("No usable rows in {0}")]
    EmptyData(String),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("No feasible parameters: every combination in the grid violates fast < slow")]
    NoFeasibleParameters,

    #[error("Trade refers to bar {index}, but the series has {len} bars")]
    TradeIndexOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BacktestError>;
