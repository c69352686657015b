//! The browser-automation seam the scraper is written against.

use async_trait::async_trait;
use backscroll_core::{Cookie, Result};
use std::time::Duration;

/// Outcome of a single-element query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<H> {
    Found(H),
    NotFound,
}

impl<H> Lookup<H> {
    pub fn found(self) -> Option<H> {
        match self {
            Lookup::Found(h) => Some(h),
            Lookup::NotFound => None,
        }
    }
}

impl<H> From<Option<H>> for Lookup<H> {
    fn from(value: Option<H>) -> Self {
        match value {
            Some(h) => Lookup::Found(h),
            None => Lookup::NotFound,
        }
    }
}

/// A live page that can be queried and driven.
///
/// Selectors are CSS selectors. Every call completes (or fails) before the
/// next one is issued; implementations never see concurrent callers because
/// all methods take `&mut self`.
#[async_trait]
pub trait Session: Send {
    /// Opaque reference to an element in the rendered page.
    type Handle: Clone + Send + Sync;

    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn reload(&mut self) -> Result<()>;

    async fn find_element(&mut self, selector: &str) -> Result<Lookup<Self::Handle>>;

    /// All matches in document order.
    async fn find_elements(&mut self, selector: &str) -> Result<Vec<Self::Handle>>;

    /// First descendant of `parent` matching `selector`.
    async fn find_child(
        &mut self,
        parent: &Self::Handle,
        selector: &str,
    ) -> Result<Lookup<Self::Handle>>;

    /// Wait for a rendered, non-empty element; `Error::Timeout` when it never shows up.
    async fn wait_until_visible(&mut self, selector: &str, timeout: Duration)
        -> Result<Self::Handle>;

    async fn click(&mut self, handle: &Self::Handle) -> Result<()>;

    async fn send_keys(&mut self, handle: &Self::Handle, text: &str) -> Result<()>;

    /// Press on the element's centre, move by (`dx`, `dy`) pixels, release.
    async fn drag_and_drop(&mut self, handle: &Self::Handle, dx: i64, dy: i64) -> Result<()>;

    async fn get_attribute(&mut self, handle: &Self::Handle, name: &str)
        -> Result<Option<String>>;

    async fn get_text(&mut self, handle: &Self::Handle) -> Result<String>;

    async fn get_cookies(&mut self) -> Result<Vec<Cookie>>;

    async fn add_cookie(&mut self, cookie: &Cookie) -> Result<()>;

    /// Drop every handle handed out so far. Handles obtained before the call
    /// must not be used after it.
    async fn release_handles(&mut self) -> Result<()>;
}
