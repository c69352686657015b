//! CDP-based browser automation.
//!
//! - `session`: the `Session` trait the scraper is written against
//! - `cdp`: Chrome DevTools Protocol client over WebSocket
//! - `page`: `Session` implemented over a CDP page target
//! - `launcher`: browser discovery, launch and attachment

pub mod cdp;
pub mod launcher;
pub mod page;
pub mod session;

pub use launcher::{find_any_browser, launch, BrowserEngine, LaunchOptions};
pub use page::{CdpSession, ElementHandle};
pub use session::{Lookup, Session};
