//! Getting from a blank browser to an open channel: cookie restore or
//! password login, then the channel sidebar.

use backscroll_browser::Session;
use backscroll_core::{Config, Cookie, Error, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const SIGN_IN_SETTLE: Duration = Duration::from_millis(200);

/// Add every cookie from the jar at `path`. Returns `false` when there is no
/// jar to restore from.
pub async fn load_cookies<S: Session>(session: &mut S, path: &Path) -> Result<bool> {
    if !path.exists() {
        info!("Cookies file not found. Proceeding without loading cookies.");
        return Ok(false);
    }
    let content = tokio::fs::read_to_string(path).await?;
    let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
    for cookie in &cookies {
        session.add_cookie(cookie).await?;
    }
    info!(count = cookies.len(), path = %path.display(), "Cookies loaded");
    Ok(true)
}

/// Write the session's current cookies to `path` as a JSON array.
pub async fn store_cookies<S: Session>(session: &mut S, path: &Path) -> Result<usize> {
    let cookies = session.get_cookies().await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(&cookies)?;
    tokio::fs::write(path, content).await?;
    info!(count = cookies.len(), path = %path.display(), "Cookies saved");
    Ok(cookies.len())
}

/// Fill in the sign-in form and submit it.
pub async fn login<S: Session>(session: &mut S, config: &Config) -> Result<()> {
    let selectors = &config.selectors;
    let email = required(session, &selectors.login_email).await?;
    let password = required(session, &selectors.login_password).await?;
    let submit = required(session, &selectors.login_submit).await?;

    session.send_keys(&email, &config.email).await?;
    session.send_keys(&password, &config.password).await?;
    tokio::time::sleep(SIGN_IN_SETTLE).await;
    session.click(&submit).await?;
    info!(email = %config.email, "Signed in");
    Ok(())
}

async fn required<S: Session>(session: &mut S, selector: &str) -> Result<S::Handle> {
    session
        .find_element(selector)
        .await?
        .found()
        .ok_or_else(|| Error::ElementNotFound(format!("login form field '{}'", selector)))
}

/// Open the workspace and try to restore the previous session from the jar.
pub async fn open_workspace<S: Session>(
    session: &mut S,
    config: &Config,
    cookie_jar: &Path,
) -> Result<bool> {
    info!(url = %config.workspace_url, "Opening workspace");
    session.navigate(&config.workspace_url).await?;
    let restored = load_cookies(session, cookie_jar).await?;
    session.reload().await?;
    Ok(restored)
}

/// Open the workspace, logging in and saving a fresh jar when no cookies
/// could be restored.
pub async fn restore_or_login<S: Session>(
    session: &mut S,
    config: &Config,
    cookie_jar: &Path,
) -> Result<()> {
    if open_workspace(session, config, cookie_jar).await? {
        return Ok(());
    }
    if !config.has_credentials() {
        return Err(Error::Config(
            "no stored cookies and no email/password configured".to_string(),
        ));
    }
    login(session, config).await?;
    if let Err(e) = store_cookies(session, cookie_jar).await {
        warn!(error = %e, "Failed to save cookies");
    }
    Ok(())
}

/// Wait for the configured channel in the sidebar and open it.
pub async fn navigate_to_channel<S: Session>(session: &mut S, config: &Config) -> Result<()> {
    let channel = &config.channel_name;
    let selector = config.selectors.channel_sidebar_for(channel);
    debug!(selector = %selector, "Waiting for channel");

    let entry = match session.wait_until_visible(&selector, config.wait_timeout()).await {
        Ok(handle) => handle,
        Err(Error::Timeout(_)) | Err(Error::ElementNotFound(_)) => {
            return Err(Error::ChannelNotFound(channel.clone()));
        }
        Err(e) => return Err(e),
    };
    let label = session.get_text(&entry).await?;
    info!(channel = %label, "Channel found");
    session.click(&entry).await
}
