use serde::{Deserialize, Serialize};

/// A browser cookie as stored in the cookie jar.
///
/// Field names follow the DevTools protocol. `expiry` (what WebDriver tools
/// write) is accepted on read so older jars still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default, alias = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: default_cookie_path(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    /// Session cookies come back from CDP with `expires: -1`.
    pub fn is_session(&self) -> bool {
        self.expires.map_or(true, |e| e < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_reads_webdriver_jar() {
        let raw = r#"[{"name":"d","value":"xoxd","domain":".slack.com","path":"/",
            "expiry":1767225600,"httpOnly":true,"secure":true,"sameSite":"Lax"}]"#;
        let jar: Vec<Cookie> = serde_json::from_str(raw).unwrap();
        assert_eq!(jar.len(), 1);
        assert_eq!(jar[0].name, "d");
        assert_eq!(jar[0].expires, Some(1767225600.0));
        assert!(jar[0].http_only);
        assert_eq!(jar[0].same_site.as_deref(), Some("Lax"));
        assert!(!jar[0].is_session());
    }

    #[test]
    fn test_cookie_defaults() {
        let c: Cookie = serde_json::from_str(r#"{"name":"a","value":"b"}"#).unwrap();
        assert_eq!(c.path, "/");
        assert!(c.is_session());
        let out = serde_json::to_value(&c).unwrap();
        assert!(out.get("expires").is_none());
        assert_eq!(out["httpOnly"], false);
    }
}
