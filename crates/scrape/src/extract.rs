//! Message record extraction.
//!
//! Each field of a record is read independently. A field that cannot be read
//! becomes [`SENTINEL`] and flags the record; it never aborts the others.

use backscroll_browser::Session;
use backscroll_core::{MessageRecord, Result, SelectorsConfig, SENTINEL};
use tracing::{debug, warn};

pub struct RecordExtractor<'a> {
    selectors: &'a SelectorsConfig,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(selectors: &'a SelectorsConfig) -> Self {
        Self { selectors }
    }

    /// Extract one record from the currently visible containers.
    ///
    /// Only the first container is read; the rest of the visible set is
    /// ignored this cycle. With nothing visible the record is all sentinel.
    pub async fn extract_visible<S: Session>(&self, session: &mut S) -> Result<MessageRecord> {
        match session.find_element(&self.selectors.base_container).await?.found() {
            Some(container) => Ok(self.extract(session, &container).await),
            None => {
                warn!(selector = %self.selectors.base_container, "No message containers visible");
                Ok(MessageRecord::unavailable())
            }
        }
    }

    /// Read every field of one container.
    pub async fn extract<S: Session>(&self, session: &mut S, container: &S::Handle) -> MessageRecord {
        let mut failed = false;

        let image_link = settle("image_link", self.image_link(session, container).await, &mut failed);

        let (sender_id, sender_name) = match self.sender(session, container).await {
            Ok(Some(pair)) => pair,
            outcome => {
                log_failure("sender", outcome.err());
                failed = true;
                (SENTINEL.to_string(), SENTINEL.to_string())
            }
        };

        let timestamp = settle(
            "timestamp",
            self.child_text(session, container, &self.selectors.timestamp).await,
            &mut failed,
        );

        let information = settle("information", self.information(session, container).await, &mut failed);

        MessageRecord {
            image_link,
            sender_id,
            sender_name,
            timestamp,
            information,
            had_extraction_error: failed,
        }
    }

    async fn image_link<S: Session>(&self, session: &mut S, container: &S::Handle) -> Result<Option<String>> {
        let Some(avatar) = session.find_child(container, &self.selectors.avatar).await?.found() else {
            return Ok(None);
        };
        let Some(image) = session.find_child(&avatar, &self.selectors.avatar_image).await?.found() else {
            return Ok(None);
        };
        session.get_attribute(&image, "src").await
    }

    async fn sender<S: Session>(
        &self,
        session: &mut S,
        container: &S::Handle,
    ) -> Result<Option<(String, String)>> {
        let Some(button) = session.find_child(container, &self.selectors.sender_name).await?.found() else {
            return Ok(None);
        };
        let Some(id) = session
            .get_attribute(&button, &self.selectors.sender_id_attribute)
            .await?
        else {
            return Ok(None);
        };
        let name = session.get_text(&button).await?;
        Ok(Some((id, name)))
    }

    async fn child_text<S: Session>(
        &self,
        session: &mut S,
        container: &S::Handle,
        selector: &str,
    ) -> Result<Option<String>> {
        match session.find_child(container, selector).await?.found() {
            Some(node) => session.get_text(&node).await.map(Some),
            None => Ok(None),
        }
    }

    async fn information<S: Session>(&self, session: &mut S, container: &S::Handle) -> Result<Option<String>> {
        match session.find_child(container, &self.selectors.information).await?.found() {
            Some(node) => session.get_attribute(&node, "outerHTML").await,
            None => Ok(None),
        }
    }
}

/// Unwrap a field read, substituting the sentinel on any failure.
fn settle(field: &str, outcome: Result<Option<String>>, failed: &mut bool) -> String {
    match outcome {
        Ok(Some(value)) => value,
        other => {
            log_failure(field, other.err());
            *failed = true;
            SENTINEL.to_string()
        }
    }
}

fn log_failure(field: &str, error: Option<backscroll_core::Error>) {
    match error {
        Some(e) => debug!(field, error = %e, "Field read failed"),
        None => debug!(field, "Field not found"),
    }
}
