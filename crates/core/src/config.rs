use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::paths::Paths;

/// CSS selectors for the parts of the chat UI the scraper touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorsConfig {
    #[serde(default = "default_base_container")]
    pub base_container: String,
    #[serde(default = "default_date_divider")]
    pub date_divider: String,
    #[serde(default = "default_scroll_bar")]
    pub scroll_bar: String,
    /// Which of the matching scrollbars is the message-list one (document order).
    #[serde(default = "default_scroll_bar_index")]
    pub scroll_bar_index: usize,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    #[serde(default = "default_avatar_image")]
    pub avatar_image: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_sender_id_attribute")]
    pub sender_id_attribute: String,
    #[serde(default = "default_timestamp")]
    pub timestamp: String,
    #[serde(default = "default_information")]
    pub information: String,
    #[serde(default = "default_login_email")]
    pub login_email: String,
    #[serde(default = "default_login_password")]
    pub login_password: String,
    #[serde(default = "default_login_submit")]
    pub login_submit: String,
    /// `{channel}` is replaced with the configured channel name.
    #[serde(default = "default_channel_sidebar")]
    pub channel_sidebar: String,
}

fn default_base_container() -> String {
    ".c-message_kit__gutter".to_string()
}

fn default_date_divider() -> String {
    ".c-message_list__day_divider__label__pill".to_string()
}

fn default_scroll_bar() -> String {
    ".c-scrollbar__bar".to_string()
}

fn default_scroll_bar_index() -> usize {
    1
}

fn default_avatar() -> String {
    ".c-button-unstyled.c-message_kit__avatar.c-avatar.c-avatar--interactive".to_string()
}

fn default_avatar_image() -> String {
    "img".to_string()
}

fn default_sender_name() -> String {
    r#"button[data-qa="message_sender_name"]"#.to_string()
}

fn default_sender_id_attribute() -> String {
    "data-message-sender".to_string()
}

fn default_timestamp() -> String {
    ".c-timestamp__label".to_string()
}

fn default_information() -> String {
    ".c-message_kit__gutter__right".to_string()
}

fn default_login_email() -> String {
    "#email".to_string()
}

fn default_login_password() -> String {
    "#password".to_string()
}

fn default_login_submit() -> String {
    "#signin_btn".to_string()
}

fn default_channel_sidebar() -> String {
    r#"[data-qa="channel_sidebar_name_{channel}"]"#.to_string()
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            base_container: default_base_container(),
            date_divider: default_date_divider(),
            scroll_bar: default_scroll_bar(),
            scroll_bar_index: default_scroll_bar_index(),
            avatar: default_avatar(),
            avatar_image: default_avatar_image(),
            sender_name: default_sender_name(),
            sender_id_attribute: default_sender_id_attribute(),
            timestamp: default_timestamp(),
            information: default_information(),
            login_email: default_login_email(),
            login_password: default_login_password(),
            login_submit: default_login_submit(),
            channel_sidebar: default_channel_sidebar(),
        }
    }
}

impl SelectorsConfig {
    pub fn channel_sidebar_for(&self, channel: &str) -> String {
        self.channel_sidebar.replace("{channel}", channel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit browser executable; discovered on the system when unset.
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default = "default_headed")]
    pub headed: bool,
    #[serde(default = "default_window_size")]
    pub window_width: u32,
    #[serde(default = "default_window_size")]
    pub window_height: u32,
}

fn default_headed() -> bool {
    true
}

fn default_window_size() -> u32 {
    1024
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: None,
            headed: default_headed(),
            window_width: default_window_size(),
            window_height: default_window_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace_url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub start_year: i32,
    #[serde(default)]
    pub start_month: u32,
    #[serde(default)]
    pub start_day: u32,
    /// Vertical drag applied to the scrollbar each cycle, in pixels.
    #[serde(default = "default_scroll_offset")]
    pub scroll_offset: i64,
    /// Seconds to let the feed settle before each scroll.
    #[serde(default = "default_time_delay")]
    pub time_delay: f64,
    /// Upper bound on extraction cycles; 0 disables the bound.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub selectors: SelectorsConfig,
}

fn default_scroll_offset() -> i64 {
    -2
}

fn default_time_delay() -> f64 {
    0.6
}

fn default_max_cycles() -> u32 {
    10_000
}

fn default_wait_timeout_secs() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_url: String::new(),
            email: String::new(),
            password: String::new(),
            channel_name: String::new(),
            start_year: 0,
            start_month: 0,
            start_day: 0,
            scroll_offset: default_scroll_offset(),
            time_delay: default_time_delay(),
            max_cycles: default_max_cycles(),
            wait_timeout_secs: default_wait_timeout_secs(),
            output_dir: None,
            browser: BrowserConfig::default(),
            selectors: SelectorsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load `path`, or the defaults when there is no file there.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply the process environment on top of the file values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by the `.env` names the scraper
    /// has always used. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SLACK_WORKSPACE_URL") {
            self.workspace_url = v;
        }
        if let Some(v) = get("SLACK_EMAIL") {
            self.email = v;
        }
        if let Some(v) = get("SLACK_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = get("CHANNEL_NAMES") {
            self.channel_name = v;
        }
        if let Some(v) = get("START_YEAR") {
            self.start_year = parse_number("START_YEAR", &v)?;
        }
        if let Some(v) = get("START_MONTH") {
            self.start_month = parse_number("START_MONTH", &v)?;
        }
        if let Some(v) = get("START_DATE") {
            self.start_day = parse_number("START_DATE", &v)?;
        }
        Ok(())
    }

    /// The earliest date of interest; scraping stops once older content shows up.
    pub fn cutoff(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, self.start_month, self.start_day).ok_or_else(|| {
            Error::Config(format!(
                "invalid start date {}-{}-{}",
                self.start_year, self.start_month, self.start_day
            ))
        })
    }

    pub fn time_delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.time_delay).map_err(|_| {
            Error::Config(format!(
                "time_delay must be a non-negative number of seconds, got {}",
                self.time_delay
            ))
        })
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn max_cycles(&self) -> Option<u32> {
        (self.max_cycles > 0).then_some(self.max_cycles)
    }

    pub fn output_dir(&self, paths: &Paths) -> PathBuf {
        match self.output_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => paths.outputs_dir(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.workspace_url.trim().is_empty() {
            return Err(Error::Config("workspace_url is required".to_string()));
        }
        if self.channel_name.trim().is_empty() {
            return Err(Error::Config("channel_name is required".to_string()));
        }
        self.time_delay()?;
        self.cutoff()?;
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> Config {
        serde_json::from_str(
            r#"{
  "workspace_url": "https://acme.slack.com",
  "email": "me@acme.io",
  "password": "hunter2",
  "channel_name": "general",
  "start_year": 2023,
  "start_month": 1,
  "start_day": 1
}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_flat_keys_and_defaults() {
        let cfg = sample();
        assert_eq!(cfg.workspace_url, "https://acme.slack.com");
        assert_eq!(cfg.channel_name, "general");
        assert_eq!(cfg.scroll_offset, -2);
        assert!((cfg.time_delay - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.max_cycles(), Some(10_000));
        assert_eq!(cfg.selectors.scroll_bar_index, 1);
        assert!(cfg.browser.headed);
        assert_eq!(cfg.cutoff().unwrap(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        let mut cfg = sample();
        cfg.start_month = 2;
        cfg.start_day = 30;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_channel_rejected() {
        let mut cfg = sample();
        cfg.channel_name = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut cfg = sample();
        cfg.time_delay = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_max_cycles_is_unbounded() {
        let mut cfg = sample();
        cfg.max_cycles = 0;
        assert_eq!(cfg.max_cycles(), None);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SLACK_WORKSPACE_URL", "https://other.slack.com"),
            ("CHANNEL_NAMES", "random"),
            ("START_YEAR", "2024"),
            ("START_MONTH", "5"),
            ("START_DATE", "17"),
            ("SLACK_EMAIL", "   "),
        ]
        .into_iter()
        .collect();

        let mut cfg = sample();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.workspace_url, "https://other.slack.com");
        assert_eq!(cfg.channel_name, "random");
        assert_eq!(cfg.email, "me@acme.io");
        assert_eq!(cfg.cutoff().unwrap(), NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
    }

    #[test]
    fn test_env_override_must_be_numeric() {
        let mut cfg = sample();
        let err = cfg
            .apply_overrides(|k| (k == "START_MONTH").then(|| "May".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("START_MONTH"));
    }

    #[test]
    fn test_channel_sidebar_selector() {
        let sel = SelectorsConfig::default();
        assert_eq!(
            sel.channel_sidebar_for("general"),
            r#"[data-qa="channel_sidebar_name_general"]"#
        );
    }

    #[test]
    fn test_output_dir_fallback() {
        let paths = Paths::with_base(PathBuf::from("/tmp/bs"));
        let mut cfg = sample();
        assert_eq!(cfg.output_dir(&paths), PathBuf::from("/tmp/bs/outputs"));
        cfg.output_dir = Some("/data/out".to_string());
        assert_eq!(cfg.output_dir(&paths), PathBuf::from("/data/out"));
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let missing = Config::load_or_default(&path).unwrap();
        assert!(missing.channel_name.is_empty());

        std::fs::write(&path, serde_json::to_string_pretty(&sample()).unwrap()).unwrap();
        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.channel_name, "general");
        assert_eq!(loaded.selectors.timestamp, ".c-timestamp__label");
    }

    #[test]
    fn test_unrepresentable_delay_rejected() {
        let mut cfg = sample();
        cfg.time_delay = 1e20;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        assert!(cfg.time_delay().is_err());

        cfg.time_delay = f64::NAN;
        assert!(cfg.validate().is_err());

        cfg.time_delay = 0.25;
        assert_eq!(cfg.time_delay().unwrap(), Duration::from_millis(250));
    }
}
