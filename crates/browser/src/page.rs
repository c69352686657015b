//! `Session` implementation on top of a CDP page connection.
//!
//! Element handles are Runtime remote object ids in one object group. They
//! stay valid across DOM queries until the node is detached, the page
//! navigates or `release_handles` drops the group.

use super::cdp::CdpClient;
use super::session::{Lookup, Session};
use async_trait::async_trait;
use backscroll_core::{Cookie, Error, Result};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::process::Child;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A remote DOM element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    object_id: String,
}

pub struct CdpSession {
    cdp: CdpClient,
    /// Browser process, when this session launched it.
    process: Option<Child>,
    current_url: Option<String>,
}

impl CdpSession {
    pub fn new(cdp: CdpClient, process: Option<Child>) -> Self {
        Self {
            cdp,
            process,
            current_url: None,
        }
    }

    /// Close the browser: CDP first, then the process.
    pub async fn close(&mut self) {
        if let Err(e) = self.cdp.close_browser().await {
            debug!("CDP Browser.close failed (may already be closed): {}", e);
        }
        if let Some(child) = self.process.as_mut() {
            let _ = child.kill().await;
        }
    }

    async fn wait_for_load(&self) -> Result<()> {
        let start = Instant::now();
        loop {
            let result = self
                .cdp
                .evaluate_js("document.readyState", true)
                .await
                .map_err(cdp_err)?;
            if remote_value(&result).as_str() == Some("complete") {
                return Ok(());
            }
            if start.elapsed() > LOAD_TIMEOUT {
                return Err(Error::Timeout(format!(
                    "page did not finish loading within {}s",
                    LOAD_TIMEOUT.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let js = format!(
            concat!(
                "(function() {{ var el = document.querySelector({});",
                " if (!el) return false;",
                " var r = el.getBoundingClientRect();",
                " return r.width > 0 && r.height > 0",
                " && window.getComputedStyle(el).visibility !== 'hidden'; }})()"
            ),
            js_string(selector)
        );
        let result = self.cdp.evaluate_js(&js, true).await.map_err(cdp_err)?;
        Ok(remote_value(&result).as_bool().unwrap_or(false))
    }

    async fn element_center(&self, handle: &ElementHandle) -> Result<Option<(f64, f64)>> {
        self.cdp
            .call_function_on(
                &handle.object_id,
                "function() { this.scrollIntoView({block: 'center', inline: 'center'}); }",
                vec![],
                true,
            )
            .await
            .map_err(cdp_err)?;
        match self.cdp.get_box_model(&handle.object_id).await {
            Ok(bm) => Ok(extract_center_from_box_model(&bm)),
            Err(e) => {
                debug!("DOM.getBoxModel failed: {}", e);
                Ok(None)
            }
        }
    }

    async fn mouse(&self, event: &str, x: f64, y: f64, buttons: i32) -> Result<()> {
        let click_count = if event == "mouseMoved" { 0 } else { 1 };
        self.cdp
            .dispatch_mouse_event(event, x, y, "left", buttons, click_count)
            .await
            .map_err(cdp_err)
    }
}

#[async_trait]
impl Session for CdpSession {
    type Handle = ElementHandle;

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let result = self.cdp.navigate(url).await.map_err(cdp_err)?;
        if let Some(error) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::Browser(format!("navigation to {} failed: {}", url, error)));
        }
        self.current_url = Some(url.to_string());
        self.wait_for_load().await
    }

    async fn reload(&mut self) -> Result<()> {
        self.cdp.reload().await.map_err(cdp_err)?;
        // readyState flips back to "loading" only after the reload commits
        tokio::time::sleep(POLL_INTERVAL).await;
        self.wait_for_load().await
    }

    async fn find_element(&mut self, selector: &str) -> Result<Lookup<ElementHandle>> {
        let js = format!("document.querySelector({})", js_string(selector));
        let result = self.cdp.evaluate_js(&js, false).await.map_err(cdp_err)?;
        Ok(remote_object_id(&result).map(|object_id| ElementHandle { object_id }).into())
    }

    async fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementHandle>> {
        let js = format!("Array.from(document.querySelectorAll({}))", js_string(selector));
        let result = self.cdp.evaluate_js(&js, false).await.map_err(cdp_err)?;
        let Some(array_id) = remote_object_id(&result) else {
            return Ok(Vec::new());
        };

        let properties = self.cdp.get_properties(&array_id).await.map_err(cdp_err)?;
        let _ = self.cdp.release_object(&array_id).await;

        Ok(indexed_elements(&properties)
            .into_iter()
            .map(|object_id| ElementHandle { object_id })
            .collect())
    }

    async fn find_child(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Lookup<ElementHandle>> {
        let result = self
            .cdp
            .call_function_on(
                &parent.object_id,
                "function(sel) { return this.querySelector(sel); }",
                vec![json!(selector)],
                false,
            )
            .await
            .map_err(cdp_err)?;
        Ok(remote_object_id(&result).map(|object_id| ElementHandle { object_id }).into())
    }

    async fn wait_until_visible(&mut self, selector: &str, timeout: Duration) -> Result<ElementHandle> {
        let start = Instant::now();
        loop {
            if self.is_visible(selector).await? {
                if let Lookup::Found(handle) = self.find_element(selector).await? {
                    return Ok(handle);
                }
            }
            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "'{}' not visible after {}s",
                    selector,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, handle: &ElementHandle) -> Result<()> {
        let Some((x, y)) = self.element_center(handle).await? else {
            // No layout box (e.g. zero-size wrapper): let the DOM handle it
            self.cdp
                .call_function_on(&handle.object_id, "function() { this.click(); }", vec![], true)
                .await
                .map_err(cdp_err)?;
            return Ok(());
        };

        self.mouse("mousePressed", x, y, 1).await?;
        self.mouse("mouseReleased", x, y, 0).await
    }

    async fn send_keys(&mut self, handle: &ElementHandle, text: &str) -> Result<()> {
        self.cdp
            .call_function_on(&handle.object_id, "function() { this.focus(); }", vec![], true)
            .await
            .map_err(cdp_err)?;

        self.cdp.insert_text(text).await.map_err(cdp_err)?;

        // Dispatch input event for frameworks
        self.cdp
            .call_function_on(
                &handle.object_id,
                "function() { this.dispatchEvent(new Event('input', {bubbles: true})); }",
                vec![],
                true,
            )
            .await
            .map_err(cdp_err)?;
        Ok(())
    }

    async fn drag_and_drop(&mut self, handle: &ElementHandle, dx: i64, dy: i64) -> Result<()> {
        let (x, y) = self
            .element_center(handle)
            .await?
            .ok_or_else(|| Error::Browser("drag source has no layout box".to_string()))?;
        let (to_x, to_y) = (x + dx as f64, y + dy as f64);

        self.mouse("mouseMoved", x, y, 0).await?;
        self.mouse("mousePressed", x, y, 1).await?;
        self.mouse("mouseMoved", to_x, to_y, 1).await?;
        self.mouse("mouseReleased", to_x, to_y, 0).await
    }

    async fn get_attribute(&mut self, handle: &ElementHandle, name: &str) -> Result<Option<String>> {
        // Scalar DOM properties win over attributes, so `src` is the resolved
        // URL and `outerHTML` is readable.
        let result = self
            .cdp
            .call_function_on(
                &handle.object_id,
                concat!(
                    "function(name) { var p = this[name];",
                    " if (p !== undefined && p !== null && typeof p !== 'object' && typeof p !== 'function')",
                    " return String(p);",
                    " return this.getAttribute(name); }"
                ),
                vec![json!(name)],
                true,
            )
            .await
            .map_err(cdp_err)?;
        Ok(remote_value(&result).as_str().map(str::to_string))
    }

    async fn get_text(&mut self, handle: &ElementHandle) -> Result<String> {
        let result = self
            .cdp
            .call_function_on(
                &handle.object_id,
                "function() { return (this.innerText || this.textContent || '').trim(); }",
                vec![],
                true,
            )
            .await
            .map_err(cdp_err)?;
        Ok(remote_value(&result).as_str().unwrap_or_default().to_string())
    }

    async fn get_cookies(&mut self) -> Result<Vec<Cookie>> {
        let raw = self.cdp.get_cookies().await.map_err(cdp_err)?;
        raw.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    async fn add_cookie(&mut self, cookie: &Cookie) -> Result<()> {
        let params = cookie_params(cookie, self.current_url.as_deref())?;
        self.cdp.set_cookie(params).await.map_err(cdp_err)
    }

    async fn release_handles(&mut self) -> Result<()> {
        self.cdp.release_object_group().await.map_err(cdp_err)
    }
}

/// Quote a string as a JavaScript literal.
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn remote_value(result: &Value) -> &Value {
    result.get("result").and_then(|r| r.get("value")).unwrap_or(&Value::Null)
}

/// Object id of a by-reference evaluation result; `None` for `null`.
fn remote_object_id(result: &Value) -> Option<String> {
    let remote = result.get("result")?;
    if remote.get("subtype").and_then(|v| v.as_str()) == Some("null") {
        return None;
    }
    remote
        .get("objectId")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Element object ids from `Runtime.getProperties` of an array, in index order.
fn indexed_elements(properties: &[Value]) -> Vec<String> {
    let mut items: Vec<(usize, String)> = properties
        .iter()
        .filter_map(|p| {
            let index = p.get("name")?.as_str()?.parse::<usize>().ok()?;
            let object_id = p.get("value")?.get("objectId")?.as_str()?;
            Some((index, object_id.to_string()))
        })
        .collect();
    items.sort_by_key(|(i, _)| *i);
    items.into_iter().map(|(_, id)| id).collect()
}

/// Extract center coordinates from a box model response.
fn extract_center_from_box_model(bm: &Value) -> Option<(f64, f64)> {
    let content = bm.get("model")?.get("content")?.as_array()?;
    if content.len() < 8 {
        return None;
    }
    let x1 = content[0].as_f64()?;
    let y1 = content[1].as_f64()?;
    let x2 = content[4].as_f64()?;
    let y2 = content[5].as_f64()?;
    Some(((x1 + x2) / 2.0, (y1 + y2) / 2.0))
}

/// `Network.setCookie` parameters. Session cookies drop `expires`; a cookie
/// without a domain is scoped to the current page URL.
fn cookie_params(cookie: &Cookie, current_url: Option<&str>) -> Result<Value> {
    let mut params = serde_json::to_value(cookie)?;
    let obj = params
        .as_object_mut()
        .ok_or_else(|| Error::Other("cookie did not serialize to an object".to_string()))?;
    if cookie.is_session() {
        obj.remove("expires");
    }
    if cookie.domain.is_empty() {
        obj.remove("domain");
        let url = current_url.ok_or_else(|| {
            Error::Browser(format!("cookie '{}' has no domain and no page is open", cookie.name))
        })?;
        obj.insert("url".to_string(), json!(url));
    }
    Ok(params)
}

fn cdp_err(e: String) -> Error {
    Error::Browser(format!("CDP: {}", e))
}
