//! Browser process launch and CDP attachment.

use super::cdp::CdpClient;
use super::page::CdpSession;
use backscroll_core::{BrowserConfig, Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::info;

/// Supported browser engines (both speak CDP).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrowserEngine {
    Chrome,
    Edge,
}

impl BrowserEngine {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Edge => "edge",
        }
    }
}

/// Everything needed to start a browser for scraping.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub binary: Option<String>,
    pub user_data_dir: PathBuf,
    pub headed: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl LaunchOptions {
    pub fn from_config(config: &BrowserConfig, user_data_dir: PathBuf) -> Self {
        Self {
            binary: config.binary.clone(),
            user_data_dir,
            headed: config.headed,
            window_width: config.window_width,
            window_height: config.window_height,
        }
    }
}

/// Launch a browser instance and attach a session to its first page.
pub async fn launch(options: &LaunchOptions) -> Result<CdpSession> {
    let browser_path = match &options.binary {
        Some(path) => path.clone(),
        None => find_any_browser()
            .map(|(_, path)| path)
            .ok_or_else(|| Error::Browser("Chrome/Chromium/Edge not found. Please install it.".into()))?,
    };

    std::fs::create_dir_all(&options.user_data_dir)?;

    let debug_port = find_free_port().await?;
    let args = build_browser_args(options, debug_port);

    info!(
        port = debug_port,
        headed = options.headed,
        browser = %browser_path,
        "Launching browser"
    );

    let child = Command::new(&browser_path)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Browser(format!("Failed to launch {}: {}", browser_path, e)))?;

    wait_for_cdp_ready(debug_port, Duration::from_secs(15)).await?;

    // Connect to the page target (not browser-level) so Page.enable etc. work
    let page_ws_url = get_page_ws_url(debug_port).await?;
    let cdp = CdpClient::connect(&page_ws_url).await.map_err(Error::Browser)?;

    for domain in ["Page", "Runtime", "DOM", "Network"] {
        cdp.enable_domain(domain).await.map_err(Error::Browser)?;
    }

    info!(ws_url = %page_ws_url, "CDP connection established (page target)");

    Ok(CdpSession::new(cdp, Some(child)))
}

/// Build command line arguments for a Chromium-family browser.
fn build_browser_args(options: &LaunchOptions, debug_port: u16) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", debug_port),
        format!("--user-data-dir={}", options.user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-extensions".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--password-store=basic".to_string(),
        "--window-position=0,0".to_string(),
        format!("--window-size={},{}", options.window_width, options.window_height),
    ];
    if !options.headed {
        args.push("--headless=new".to_string());
    }
    args.push("about:blank".to_string());
    args
}

/// Find a browser binary on the system for the given engine.
pub fn find_browser_binary(engine: BrowserEngine) -> Option<String> {
    let candidates = match engine {
        BrowserEngine::Chrome => {
            if cfg!(target_os = "macos") {
                vec![
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                    "/Applications/Chromium.app/Contents/MacOS/Chromium",
                ]
            } else if cfg!(target_os = "linux") {
                vec![
                    "google-chrome", "google-chrome-stable",
                    "chromium", "chromium-browser",
                    "/usr/bin/google-chrome", "/usr/bin/chromium",
                ]
            } else {
                vec![
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ]
            }
        }
        BrowserEngine::Edge => {
            if cfg!(target_os = "macos") {
                vec!["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
            } else if cfg!(target_os = "linux") {
                vec!["microsoft-edge", "microsoft-edge-stable", "/usr/bin/microsoft-edge"]
            } else {
                vec![
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                ]
            }
        }
    };

    for candidate in candidates {
        if Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
        if !candidate.contains('/') && !candidate.contains('\\') && which::which(candidate).is_ok() {
            return Some(candidate.to_string());
        }
    }
    None
}

/// First installed engine, Chrome preferred.
pub fn find_any_browser() -> Option<(BrowserEngine, String)> {
    [BrowserEngine::Chrome, BrowserEngine::Edge]
        .into_iter()
        .find_map(|engine| find_browser_binary(engine).map(|path| (engine, path)))
}

async fn find_free_port() -> Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Poll /json/version until the browser answers.
async fn wait_for_cdp_ready(port: u16, timeout: Duration) -> Result<String> {
    let start = Instant::now();
    let url = format!("http://127.0.0.1:{}/json/version", port);

    loop {
        if start.elapsed() > timeout {
            return Err(Error::Timeout(format!(
                "Browser CDP not ready after {}s on port {}",
                timeout.as_secs(),
                port
            )));
        }

        if let Ok(resp) = reqwest::get(&url).await {
            if let Ok(body) = resp.json::<Value>().await {
                if let Some(ws_url) = body.get("webSocketDebuggerUrl").and_then(|v| v.as_str()) {
                    return Ok(ws_url.to_string());
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// WebSocket URL of the first "page" target listed by /json/list.
/// Retries a few times since the page target may not appear immediately.
async fn get_page_ws_url(port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{}/json/list", port);

    for attempt in 0..10 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        let resp = match reqwest::get(&url).await {
            Ok(r) => r,
            Err(_) => continue,
        };
        let targets: Vec<Value> = match resp.json().await {
            Ok(t) => t,
            Err(_) => continue,
        };

        if let Some(ws_url) = page_ws_url(&targets) {
            return Ok(ws_url);
        }
    }

    Err(Error::Browser("No page target found after retries".to_string()))
}

fn page_ws_url(targets: &[Value]) -> Option<String> {
    targets
        .iter()
        .filter(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
        .find_map(|t| t.get("webSocketDebuggerUrl").and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(headed: bool) -> LaunchOptions {
        LaunchOptions {
            binary: None,
            user_data_dir: PathBuf::from("/tmp/profile"),
            headed,
            window_width: 1024,
            window_height: 1024,
        }
    }

    #[test]
    fn test_build_browser_args() {
        let args = build_browser_args(&options(true), 9333);
        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--window-size=1024,1024".to_string()));
        assert!(args.contains(&"--window-position=0,0".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));

        let headless = build_browser_args(&options(false), 9333);
        assert!(headless.contains(&"--headless=new".to_string()));
    }

    #[test]
    fn test_page_ws_url_skips_non_pages() {
        let targets = vec![
            json!({"type": "service_worker", "webSocketDebuggerUrl": "ws://sw"}),
            json!({"type": "page", "webSocketDebuggerUrl": "ws://page/1"}),
            json!({"type": "page", "webSocketDebuggerUrl": "ws://page/2"}),
        ];
        assert_eq!(page_ws_url(&targets).as_deref(), Some("ws://page/1"));
        assert_eq!(page_ws_url(&[]), None);
    }

    #[test]
    fn test_launch_options_from_config() {
        let cfg = BrowserConfig {
            binary: Some("/opt/chrome".to_string()),
            headed: false,
            window_width: 800,
            window_height: 600,
        };
        let opts = LaunchOptions::from_config(&cfg, PathBuf::from("/p"));
        assert_eq!(opts.binary.as_deref(), Some("/opt/chrome"));
        assert!(!opts.headed);
        assert_eq!((opts.window_width, opts.window_height), (800, 600));
    }

    #[test]
    fn test_engine_name() {
        assert_eq!(BrowserEngine::Chrome.name(), "chrome");
        assert_eq!(BrowserEngine::Edge.name(), "edge");
    }
}
