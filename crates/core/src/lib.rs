pub mod config;
pub mod error;
pub mod message;
pub mod paths;
pub mod types;

pub use config::{BrowserConfig, Config, SelectorsConfig};
pub use error::{Error, Result};
pub use message::{MessageRecord, ScrapeResult, SENTINEL};
pub use paths::Paths;
pub use types::Cookie;
