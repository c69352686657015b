use super::Context;
use backscroll_browser::{launch, LaunchOptions, Session};
use backscroll_core::{Config, Paths};
use backscroll_scrape::{export_run, navigate_to_channel, restore_or_login, RunReport, ScrapeController};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Pause after the session is restored or signed in, before looking for the channel.
const AFTER_SIGN_IN: Duration = Duration::from_secs(2);
/// Pause after opening the channel, before the first date check.
const AFTER_CHANNEL_OPEN: Duration = Duration::from_secs(4);

/// Command-line overrides for a scrape run.
#[derive(Debug, Default)]
pub struct ScrapeArgs {
    pub max_cycles: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub headless: bool,
}

impl ScrapeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(max) = self.max_cycles {
            config.max_cycles = max;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.display().to_string());
        }
        if self.headless {
            config.browser.headed = false;
        }
    }
}

pub async fn run(ctx: &Context, args: ScrapeArgs) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    args.apply(&mut config);
    config.validate()?;

    std::fs::create_dir_all(ctx.paths.cookies_dir())?;
    let options = LaunchOptions::from_config(&config.browser, ctx.paths.browser_profile_dir());
    let mut session = launch(&options).await?;
    info!(channel = %config.channel_name, "Browser ready");

    let outcome = scrape(&mut session, &config, &ctx.paths).await;
    session.close().await;
    let report = outcome?;

    println!();
    println!("{}", report);
    Ok(())
}

async fn scrape<S: Session>(session: &mut S, config: &Config, paths: &Paths) -> anyhow::Result<RunReport> {
    restore_or_login(session, config, &paths.cookies_file()).await?;
    tokio::time::sleep(AFTER_SIGN_IN).await;

    navigate_to_channel(session, config).await?;
    tokio::time::sleep(AFTER_CHANNEL_OPEN).await;

    let outcome = ScrapeController::new(session, config)?.run().await;
    let report = export_run(outcome, &config.output_dir(paths), Local::now().naive_local())?;
    Ok(report)
}
