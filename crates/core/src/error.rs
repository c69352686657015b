use crate::message::ScrapeResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Failed to parse date: {0}")]
    DateParse(String),

    #[error("DOES NOT EXIST: Could not find channel by name: {0}")]
    ChannelNotFound(String),

    /// The cycle guard tripped; `partial` holds what was collected until then.
    #[error("Scrape did not reach the cutoff date within {cycles} cycles")]
    ScrapeTimeout {
        cycles: u32,
        partial: Box<ScrapeResult>,
    },

    #[error("Export error: {0}")]
    Export(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
