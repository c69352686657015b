//! Low-level Chrome DevTools Protocol (CDP) client over WebSocket.
//!
//! Talks to one page target through its debugging WebSocket endpoint.
//! Commands are correlated with their responses by id.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime object group every by-reference result is placed in, so element
/// handles can be released together with `release_object_group`.
pub const OBJECT_GROUP: &str = "backscroll";

/// A CDP WebSocket client that can send commands and receive responses.
pub struct CdpClient {
    /// Sender to write messages to the WebSocket.
    ws_tx: mpsc::Sender<String>,
    /// Pending command responses, keyed by request ID.
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    /// Auto-incrementing command ID.
    next_id: AtomicU64,
    _reader_handle: tokio::task::JoinHandle<()>,
    _writer_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a Chrome CDP WebSocket endpoint.
    pub async fn connect(ws_url: &str) -> Result<Self, String> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::connect_async;
        use tokio_tungstenite::tungstenite::Message;

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| format!("Failed to connect to CDP endpoint {}: {}", ws_url, e))?;

        let (mut ws_sink, mut ws_stream_read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::channel::<String>(256);

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = pending.clone();

        // Writer task: owns the sink, forwards messages from channel
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(msg)).await {
                    error!("CDP WebSocket write error: {}", e);
                    break;
                }
            }
        });

        // Reader task: routes command responses back to their callers.
        // Events are not consumed; the scraper polls page state instead.
        let reader_handle = tokio::spawn(async move {
            while let Some(msg_result) = ws_stream_read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        let Ok(val) = serde_json::from_str::<Value>(&text) else {
                            continue;
                        };
                        if let Some(id) = val.get("id").and_then(|v| v.as_u64()) {
                            let mut pending = pending_clone.lock().await;
                            if let Some(tx) = pending.remove(&id) {
                                let _ = tx.send(val);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("CDP WebSocket closed by server");
                        break;
                    }
                    Err(e) => {
                        warn!("CDP WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            ws_tx,
            pending,
            next_id: AtomicU64::new(1),
            _reader_handle: reader_handle,
            _writer_handle: writer_handle,
        })
    }

    /// Send a CDP command and wait for the response.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let msg = json!({
            "id": id,
            "method": method,
            "params": params,
        });

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        self.ws_tx
            .send(msg.to_string())
            .await
            .map_err(|e| format!("Failed to send CDP command: {}", e))?;

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => {
                if let Some(error) = response.get("error") {
                    Err(format!("CDP error: {}", error))
                } else {
                    Ok(response.get("result").cloned().unwrap_or(Value::Null))
                }
            }
            Ok(Err(_)) => Err("CDP response channel closed".to_string()),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(format!(
                    "CDP command '{}' timed out after {}s",
                    method,
                    COMMAND_TIMEOUT.as_secs()
                ))
            }
        }
    }

    /// Enable a CDP domain (e.g., "Page", "Runtime", "Network", "DOM").
    pub async fn enable_domain(&self, domain: &str) -> Result<(), String> {
        self.send_command(&format!("{}.enable", domain), json!({}))
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<Value, String> {
        self.send_command("Page.navigate", json!({"url": url})).await
    }

    pub async fn reload(&self) -> Result<(), String> {
        self.send_command("Page.reload", json!({"ignoreCache": false}))
            .await?;
        Ok(())
    }

    /// Evaluate JavaScript in the page context.
    ///
    /// With `by_value` the result is serialized into `result.value`; otherwise
    /// the caller gets a remote object reference in `result.objectId`.
    pub async fn evaluate_js(&self, expression: &str, by_value: bool) -> Result<Value, String> {
        let result = self
            .send_command("Runtime.evaluate", evaluate_params(expression, by_value))
            .await?;
        check_exception(&result)?;
        Ok(result)
    }

    /// Call a function with `this` bound to a remote object.
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function_declaration: &str,
        arguments: Vec<Value>,
        by_value: bool,
    ) -> Result<Value, String> {
        let result = self
            .send_command(
                "Runtime.callFunctionOn",
                call_params(object_id, function_declaration, arguments, by_value),
            )
            .await?;
        check_exception(&result)?;
        Ok(result)
    }

    /// Own properties of a remote object (used to walk returned arrays).
    pub async fn get_properties(&self, object_id: &str) -> Result<Vec<Value>, String> {
        let result = self
            .send_command(
                "Runtime.getProperties",
                json!({"objectId": object_id, "ownProperties": true}),
            )
            .await?;
        Ok(result
            .get("result")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    pub async fn release_object(&self, object_id: &str) -> Result<(), String> {
        self.send_command("Runtime.releaseObject", json!({"objectId": object_id}))
            .await?;
        Ok(())
    }

    /// Release every remote object created through this client.
    pub async fn release_object_group(&self) -> Result<(), String> {
        self.send_command("Runtime.releaseObjectGroup", json!({"objectGroup": OBJECT_GROUP}))
            .await?;
        Ok(())
    }

    pub async fn get_box_model(&self, object_id: &str) -> Result<Value, String> {
        self.send_command("DOM.getBoxModel", json!({"objectId": object_id}))
            .await
    }

    /// Dispatch a mouse event via Input domain.
    ///
    /// `buttons` is the pressed-button bitmask (1 = left) and must be set on
    /// moves made while dragging.
    pub async fn dispatch_mouse_event(
        &self,
        event_type: &str,
        x: f64,
        y: f64,
        button: &str,
        buttons: i32,
        click_count: i32,
    ) -> Result<(), String> {
        self.send_command(
            "Input.dispatchMouseEvent",
            json!({
                "type": event_type,
                "x": x,
                "y": y,
                "button": button,
                "buttons": buttons,
                "clickCount": click_count,
            }),
        )
        .await?;
        Ok(())
    }

    /// Insert text (bypasses key events, good for filling forms).
    pub async fn insert_text(&self, text: &str) -> Result<(), String> {
        self.send_command("Input.insertText", json!({"text": text}))
            .await?;
        Ok(())
    }

    pub async fn set_cookie(&self, cookie: Value) -> Result<(), String> {
        let result = self.send_command("Network.setCookie", cookie).await?;
        if result.get("success").and_then(|v| v.as_bool()) == Some(false) {
            return Err("Network.setCookie rejected the cookie".to_string());
        }
        Ok(())
    }

    /// Get all cookies visible to the current page.
    pub async fn get_cookies(&self) -> Result<Vec<Value>, String> {
        let result = self.send_command("Network.getCookies", json!({})).await?;
        Ok(result
            .get("cookies")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    pub async fn close_browser(&self) -> Result<(), String> {
        self.send_command("Browser.close", json!({})).await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._reader_handle.abort();
        self._writer_handle.abort();
    }
}

fn evaluate_params(expression: &str, by_value: bool) -> Value {
    json!({
        "expression": expression,
        "returnByValue": by_value,
        "awaitPromise": true,
        "objectGroup": OBJECT_GROUP,
    })
}

fn call_params(object_id: &str, function_declaration: &str, arguments: Vec<Value>, by_value: bool) -> Value {
    let args: Vec<Value> = arguments.into_iter().map(|v| json!({"value": v})).collect();
    json!({
        "objectId": object_id,
        "functionDeclaration": function_declaration,
        "arguments": args,
        "returnByValue": by_value,
        "awaitPromise": true,
        "objectGroup": OBJECT_GROUP,
    })
}

/// Turn a thrown page exception into an error.
fn check_exception(result: &Value) -> Result<(), String> {
    if let Some(details) = result.get("exceptionDetails") {
        let text = details
            .get("exception")
            .and_then(|e| e.get("description"))
            .and_then(|v| v.as_str())
            .or_else(|| details.get("text").and_then(|v| v.as_str()))
            .unwrap_or("unknown exception");
        return Err(format!("JavaScript exception: {}", text));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_exception() {
        assert!(check_exception(&json!({"result": {"type": "boolean", "value": true}})).is_ok());

        let thrown = json!({
            "result": {"type": "object"},
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": {"description": "SyntaxError: bad selector"}
            }
        });
        let err = check_exception(&thrown).unwrap_err();
        assert!(err.contains("SyntaxError: bad selector"));

        let bare = json!({"exceptionDetails": {"text": "Uncaught"}});
        assert!(check_exception(&bare).unwrap_err().contains("Uncaught"));
    }

    #[test]
    fn test_results_are_grouped() {
        let eval = evaluate_params("document.querySelector('a')", false);
        assert_eq!(eval["objectGroup"], OBJECT_GROUP);
        assert_eq!(eval["returnByValue"], false);

        let call = call_params("obj-1", "function(s) { return this.querySelector(s); }", vec![json!("img")], false);
        assert_eq!(call["objectGroup"], OBJECT_GROUP);
        assert_eq!(call["objectId"], "obj-1");
        assert_eq!(call["arguments"], json!([{"value": "img"}]));
    }
}
