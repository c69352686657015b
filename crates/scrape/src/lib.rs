pub mod bootstrap;
pub mod controller;
pub mod dates;
pub mod export;
pub mod extract;
pub mod scroll;

#[cfg(test)]
mod mock;

pub use bootstrap::{navigate_to_channel, restore_or_login};
pub use controller::{ControllerSettings, ScrapeController, ScrapeState};
pub use dates::{parse_divider_label, Clock, FixedClock, LocalClock};
pub use export::{export_run, write_csv, RunReport};
pub use extract::RecordExtractor;
pub use scroll::ScrollDriver;
