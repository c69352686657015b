//! The scrape-and-scroll loop.
//!
//! ```text
//! PollingDate --(divider older than cutoff)--> Done
//!      |                                        ^
//!      v                                        |
//! Extracting --> Scrolling --> PollingDate ...  |
//! ```

use crate::dates::{parse_divider_label, Clock, LocalClock};
use crate::extract::RecordExtractor;
use crate::scroll::ScrollDriver;
use backscroll_browser::Session;
use backscroll_core::{Config, Error, Result, ScrapeResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    PollingDate,
    Extracting,
    Scrolling,
    Done,
}

/// Run parameters resolved from configuration once, before the loop starts.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub cutoff: NaiveDate,
    pub scroll_offset: i64,
    pub delay: Duration,
    pub max_cycles: Option<u32>,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            cutoff: config.cutoff()?,
            scroll_offset: config.scroll_offset,
            delay: config.time_delay()?,
            max_cycles: config.max_cycles(),
        })
    }
}

pub struct ScrapeController<'a, S: Session> {
    session: &'a mut S,
    settings: ControllerSettings,
    divider_selector: &'a str,
    extractor: RecordExtractor<'a>,
    scroller: ScrollDriver,
    clock: Box<dyn Clock>,
    state: ScrapeState,
    result: ScrapeResult,
    cycles: u32,
}

impl<'a, S: Session> ScrapeController<'a, S> {
    pub fn new(session: &'a mut S, config: &'a Config) -> Result<Self> {
        let settings = ControllerSettings::from_config(config)?;
        Ok(Self {
            session,
            settings,
            divider_selector: &config.selectors.date_divider,
            extractor: RecordExtractor::new(&config.selectors),
            scroller: ScrollDriver::from_selectors(&config.selectors),
            clock: Box::new(LocalClock),
            state: ScrapeState::PollingDate,
            result: ScrapeResult::default(),
            cycles: 0,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u32>) -> Self {
        self.settings.max_cycles = max_cycles;
        self
    }

    pub fn result(&self) -> &ScrapeResult {
        &self.result
    }

    /// Drive the loop until the cutoff shows up.
    pub async fn run(mut self) -> Result<ScrapeResult> {
        info!(cutoff = %self.settings.cutoff, "Scraping channel");
        while self.step().await? != ScrapeState::Done {}
        Ok(self.result)
    }

    /// Perform the work of the current state and move to the next one.
    pub async fn step(&mut self) -> Result<ScrapeState> {
        self.state = match self.state {
            ScrapeState::PollingDate => match self.older_divider().await? {
                Some(date) => {
                    info!(date = %date, "Found the desired date");
                    ScrapeState::Done
                }
                None => ScrapeState::Extracting,
            },
            ScrapeState::Extracting => {
                if let Some(max) = self.settings.max_cycles {
                    if self.cycles >= max {
                        return Err(Error::ScrapeTimeout {
                            cycles: max,
                            partial: Box::new(std::mem::take(&mut self.result)),
                        });
                    }
                }
                let record = self.extractor.extract_visible(&mut *self.session).await?;
                self.cycles += 1;
                info!(
                    cycle = self.cycles,
                    sender = %record.sender_name,
                    failed = record.had_extraction_error,
                    "Saved data"
                );
                self.result.push(record);
                ScrapeState::Scrolling
            }
            ScrapeState::Scrolling => {
                tokio::time::sleep(self.settings.delay).await;
                self.scroller
                    .scroll_backward(&mut *self.session, self.settings.scroll_offset)
                    .await?;
                ScrapeState::PollingDate
            }
            ScrapeState::Done => ScrapeState::Done,
        };
        Ok(self.state)
    }

    /// First visible divider strictly older than the cutoff, if any.
    ///
    /// Labels are parsed in document order; one that cannot be parsed aborts
    /// the run. Handles from the previous cycle are released first.
    async fn older_divider(&mut self) -> Result<Option<NaiveDateTime>> {
        self.session.release_handles().await?;
        let today = self.clock.today();
        let dividers = self.session.find_elements(self.divider_selector).await?;
        for divider in &dividers {
            let label = self.session.get_text(divider).await?;
            let date = parse_divider_label(&label, today)?;
            if date.date() < self.settings.cutoff {
                return Ok(Some(date));
            }
        }
        Ok(None)
    }
}
