use serde::{Deserialize, Serialize};

/// Placeholder written into any field that could not be read from the page.
pub const SENTINEL: &str = "404";

/// One scraped message. Every field is always present; unreadable fields hold
/// [`SENTINEL`] so exported rows keep a uniform shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub image_link: String,
    pub sender_id: String,
    pub sender_name: String,
    pub timestamp: String,
    pub information: String,
    pub had_extraction_error: bool,
}

impl MessageRecord {
    /// A record where nothing could be extracted.
    pub fn unavailable() -> Self {
        Self {
            image_link: SENTINEL.to_string(),
            sender_id: SENTINEL.to_string(),
            sender_name: SENTINEL.to_string(),
            timestamp: SENTINEL.to_string(),
            information: SENTINEL.to_string(),
            had_extraction_error: true,
        }
    }
}

/// Everything collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub records: Vec<MessageRecord>,
    pub failure_count: u32,
}

impl ScrapeResult {
    pub fn push(&mut self, record: MessageRecord) {
        if record.had_extraction_error {
            self.failure_count += 1;
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
