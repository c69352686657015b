use backscroll_browser::Session;
use backscroll_core::{Error, Result, SelectorsConfig};
use tracing::debug;

/// Scrolls the message feed toward older content by dragging its custom
/// scrollbar. The only place that knows which scrollbar that is.
pub struct ScrollDriver {
    selector: String,
    index: usize,
}

impl ScrollDriver {
    pub fn new(selector: &str, index: usize) -> Self {
        Self {
            selector: selector.to_string(),
            index,
        }
    }

    pub fn from_selectors(selectors: &SelectorsConfig) -> Self {
        Self::new(&selectors.scroll_bar, selectors.scroll_bar_index)
    }

    /// Drag the scrollbar vertically by `amount_px` (negative is older).
    pub async fn scroll_backward<S: Session>(&self, session: &mut S, amount_px: i64) -> Result<()> {
        let bars = session.find_elements(&self.selector).await?;
        let bar = bars.get(self.index).ok_or_else(|| {
            Error::ElementNotFound(format!(
                "scrollbar #{} for '{}' ({} rendered)",
                self.index,
                self.selector,
                bars.len()
            ))
        })?;
        debug!(amount_px, "Dragging scrollbar");
        session.drag_and_drop(bar, 0, amount_px).await
    }
}
