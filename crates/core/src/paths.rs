use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".backscroll"))
            .unwrap_or_else(|| PathBuf::from(".backscroll"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn cookies_dir(&self) -> PathBuf {
        self.base.join("cookies")
    }

    pub fn cookies_file(&self) -> PathBuf {
        self.cookies_dir().join("cookie.json")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.base.join("outputs")
    }

    /// Chrome user-data directory for the scraping profile.
    pub fn browser_profile_dir(&self) -> PathBuf {
        self.base.join("browser-profile")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
