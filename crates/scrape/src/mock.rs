//! In-memory `Session` used by the tests.
//!
//! A page is a list of frames; each drag advances to the next frame (staying
//! on the last one), which stands in for older messages being rendered.
//! Selectors match by exact string, not CSS semantics. Like `querySelector`,
//! `find_child` searches all descendants in document order. Handles go stale
//! when the frame advances or `release_handles` is called.

use async_trait::async_trait;
use backscroll_browser::{Lookup, Session};
use backscroll_core::{Cookie, Error, Result, SelectorsConfig};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct MockNode {
    pub label: String,
    pub selector: String,
    pub parent: Option<usize>,
    pub text: String,
    pub attrs: HashMap<String, String>,
    /// Reads on this node fail as if it had been detached.
    pub broken: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockFrame {
    nodes: Vec<MockNode>,
}

impl MockFrame {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: MockNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// A top-level element with text.
    pub fn element(mut self, label: &str, selector: &str, text: &str) -> Self {
        self.push(MockNode {
            label: label.to_string(),
            selector: selector.to_string(),
            text: text.to_string(),
            ..Default::default()
        });
        self
    }

    pub fn divider(self, text: &str) -> Self {
        let selector = SelectorsConfig::default().date_divider;
        self.element(&format!("divider-{}", text), &selector, text)
    }

    pub fn scrollbars(mut self, count: usize) -> Self {
        let selector = SelectorsConfig::default().scroll_bar;
        for i in 0..count {
            self = self.element(&format!("scrollbar-{}", i), &selector, "");
        }
        self
    }

    pub fn message(mut self, message: MockMessage) -> Self {
        let sel = SelectorsConfig::default();
        let name = message.name.clone();
        let container = self.push(MockNode {
            label: format!("message-{}", name),
            selector: sel.base_container.clone(),
            ..Default::default()
        });

        if message.avatar {
            let avatar = self.push(MockNode {
                label: format!("avatar-{}", name),
                selector: sel.avatar.clone(),
                parent: Some(container),
                ..Default::default()
            });
            self.push(MockNode {
                label: format!("avatar-img-{}", name),
                selector: sel.avatar_image.clone(),
                parent: Some(avatar),
                attrs: [("src".to_string(), format!("https://avatars.example/{}.png", name))]
                    .into_iter()
                    .collect(),
                ..Default::default()
            });
        }
        if message.sender {
            self.push(MockNode {
                label: format!("sender-{}", name),
                selector: sel.sender_name.clone(),
                parent: Some(container),
                text: name.clone(),
                attrs: [(sel.sender_id_attribute.clone(), format!("U-{}", name))]
                    .into_iter()
                    .collect(),
                ..Default::default()
            });
        }
        self.push(MockNode {
            label: format!("timestamp-{}", name),
            selector: sel.timestamp.clone(),
            parent: Some(container),
            text: "10:02".to_string(),
            broken: message.broken_timestamp,
            ..Default::default()
        });
        self.push(MockNode {
            label: format!("body-{}", name),
            selector: sel.information.clone(),
            parent: Some(container),
            attrs: [(
                "outerHTML".to_string(),
                format!("<div class=\"c-message_kit__gutter__right\">hello from {}</div>", name),
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct MockMessage {
    name: String,
    avatar: bool,
    sender: bool,
    broken_timestamp: bool,
}

impl MockMessage {
    pub fn complete(name: &str) -> Self {
        Self {
            name: name.to_string(),
            avatar: true,
            sender: true,
            broken_timestamp: false,
        }
    }

    pub fn without_avatar(mut self) -> Self {
        self.avatar = false;
        self
    }

    pub fn without_sender(mut self) -> Self {
        self.sender = false;
        self
    }

    pub fn with_broken_timestamp(mut self) -> Self {
        self.broken_timestamp = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHandle {
    frame: usize,
    node: usize,
    generation: u32,
}

pub struct MockSession {
    frames: Vec<MockFrame>,
    current: usize,
    pub drags: Vec<(String, i64, i64)>,
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub navigations: Vec<String>,
    pub reloads: u32,
    pub cookies: Vec<Cookie>,
    /// Number of `release_handles` calls.
    pub releases: u32,
}

impl MockSession {
    pub fn new(frames: Vec<MockFrame>) -> Self {
        Self {
            frames,
            current: 0,
            drags: Vec::new(),
            clicks: Vec::new(),
            typed: Vec::new(),
            navigations: Vec::new(),
            reloads: 0,
            cookies: Vec::new(),
            releases: 0,
        }
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    fn frame(&self) -> Option<&MockFrame> {
        self.frames.get(self.current)
    }

    fn handle(&self, node: usize) -> MockHandle {
        MockHandle {
            frame: self.current,
            node,
            generation: self.releases,
        }
    }

    fn check_live(&self, handle: &MockHandle) -> Result<()> {
        if handle.frame != self.current || handle.generation != self.releases {
            return Err(Error::Browser("stale element reference".to_string()));
        }
        Ok(())
    }

    fn node(&self, handle: &MockHandle) -> Result<&MockNode> {
        self.check_live(handle)?;
        let node = self
            .frame()
            .and_then(|f| f.nodes.get(handle.node))
            .ok_or_else(|| Error::Browser("unknown element".to_string()))?;
        if node.broken {
            return Err(Error::Browser(format!("{} is detached", node.label)));
        }
        Ok(node)
    }

    fn top_level(&self, selector: &str) -> Vec<MockHandle> {
        let Some(frame) = self.frame() else {
            return Vec::new();
        };
        frame
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none() && n.selector == selector)
            .map(|(i, _)| self.handle(i))
            .collect()
    }

    fn is_descendant(frame: &MockFrame, node: usize, ancestor: usize) -> bool {
        let mut parent = frame.nodes[node].parent;
        while let Some(p) = parent {
            if p == ancestor {
                return true;
            }
            parent = frame.nodes[p].parent;
        }
        false
    }
}

#[async_trait]
impl Session for MockSession {
    type Handle = MockHandle;

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.navigations.push(url.to_string());
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.reloads += 1;
        Ok(())
    }

    async fn find_element(&mut self, selector: &str) -> Result<Lookup<MockHandle>> {
        Ok(self.top_level(selector).into_iter().next().into())
    }

    async fn find_elements(&mut self, selector: &str) -> Result<Vec<MockHandle>> {
        Ok(self.top_level(selector))
    }

    async fn find_child(&mut self, parent: &MockHandle, selector: &str) -> Result<Lookup<MockHandle>> {
        self.check_live(parent)?;
        let frame = self.frame().ok_or_else(|| Error::Browser("no page".to_string()))?;
        Ok((0..frame.nodes.len())
            .find(|&i| frame.nodes[i].selector == selector && Self::is_descendant(frame, i, parent.node))
            .map(|i| self.handle(i))
            .into())
    }

    async fn wait_until_visible(&mut self, selector: &str, timeout: Duration) -> Result<MockHandle> {
        self.top_level(selector).into_iter().next().ok_or_else(|| {
            Error::Timeout(format!("'{}' not visible after {}s", selector, timeout.as_secs()))
        })
    }

    async fn click(&mut self, handle: &MockHandle) -> Result<()> {
        let label = self.node(handle)?.label.clone();
        self.clicks.push(label);
        Ok(())
    }

    async fn send_keys(&mut self, handle: &MockHandle, text: &str) -> Result<()> {
        let label = self.node(handle)?.label.clone();
        self.typed.push((label, text.to_string()));
        Ok(())
    }

    async fn drag_and_drop(&mut self, handle: &MockHandle, dx: i64, dy: i64) -> Result<()> {
        let label = self.node(handle)?.label.clone();
        self.drags.push((label, dx, dy));
        if self.current + 1 < self.frames.len() {
            self.current += 1;
        }
        Ok(())
    }

    async fn get_attribute(&mut self, handle: &MockHandle, name: &str) -> Result<Option<String>> {
        Ok(self.node(handle)?.attrs.get(name).cloned())
    }

    async fn get_text(&mut self, handle: &MockHandle) -> Result<String> {
        Ok(self.node(handle)?.text.clone())
    }

    async fn get_cookies(&mut self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.clone())
    }

    async fn add_cookie(&mut self, cookie: &Cookie) -> Result<()> {
        self.cookies.push(cookie.clone());
        Ok(())
    }

    async fn release_handles(&mut self) -> Result<()> {
        self.releases += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_child_matches_any_descendant() {
        let sel = SelectorsConfig::default();
        let mut session = MockSession::new(vec![MockFrame::new().message(MockMessage::complete("alice"))]);
        let container = session.find_element(&sel.base_container).await.unwrap().found().unwrap();

        let image = session.find_child(&container, &sel.avatar_image).await.unwrap().found().unwrap();
        assert_eq!(
            session.get_attribute(&image, "src").await.unwrap().as_deref(),
            Some("https://avatars.example/alice.png")
        );
        assert_eq!(session.find_child(&image, &sel.avatar).await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_released_handles_are_stale() {
        let sel = SelectorsConfig::default();
        let mut session = MockSession::new(vec![MockFrame::new().message(MockMessage::complete("alice"))]);
        let container = session.find_element(&sel.base_container).await.unwrap().found().unwrap();

        session.release_handles().await.unwrap();
        assert!(matches!(
            session.find_child(&container, &sel.timestamp).await,
            Err(Error::Browser(_))
        ));
        let fresh = session.find_element(&sel.base_container).await.unwrap().found().unwrap();
        assert!(session.find_child(&fresh, &sel.timestamp).await.unwrap().found().is_some());
    }
}
