//! In-memory page model for unit tests. Elements are node ids; a lookup
//! matches whatever nodes were registered under `(scope, selector)`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::Browser;

pub type NodeId = usize;

#[derive(Default)]
struct Page {
    next_id: NodeId,
    index: HashMap<(Option<NodeId>, String), Vec<NodeId>>,
    text: HashMap<NodeId, String>,
    attrs: HashMap<NodeId, HashMap<String, String>>,
    failing: HashSet<String>,
    click_targets: HashMap<NodeId, String>,
    url: String,
    source: String,
    fail_navigation: bool,
    navigations: Vec<String>,
    clicks: Vec<NodeId>,
    typed: Vec<(NodeId, String)>,
}

pub struct FakeBrowser {
    page: Mutex<Page>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            page: Mutex::new(Page {
                url: "about:blank".into(),
                ..Page::default()
            }),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Page) -> T) -> T {
        let mut guard = self.page.lock().unwrap();
        f(&mut guard)
    }

    fn insert(&self, scope: Option<NodeId>, selector: &str, text: &str) -> NodeId {
        self.with(|page| {
            let id = page.next_id;
            page.next_id += 1;
            page.index
                .entry((scope, selector.to_string()))
                .or_default()
                .push(id);
            page.text.insert(id, text.to_string());
            id
        })
    }

    pub fn add_root(&self, selector: &str, text: &str) -> NodeId {
        self.insert(None, selector, text)
    }

    pub fn add_child(&self, parent: NodeId, selector: &str, text: &str) -> NodeId {
        self.insert(Some(parent), selector, text)
    }

    /// Make an existing node also match `selector` within `scope`.
    pub fn alias(&self, scope: Option<NodeId>, selector: &str, node: NodeId) {
        self.with(|page| {
            page.index
                .entry((scope, selector.to_string()))
                .or_default()
                .push(node)
        });
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.with(|page| {
            page.attrs
                .entry(node)
                .or_default()
                .insert(name.to_string(), value.to_string());
        });
    }

    pub fn fail_selector(&self, selector: &str) {
        self.with(|page| page.failing.insert(selector.to_string()));
    }

    pub fn set_url(&self, url: &str) {
        self.with(|page| page.url = url.to_string());
    }

    pub fn set_page_source(&self, source: &str) {
        self.with(|page| page.source = source.to_string());
    }

    /// Clicking `node` moves the page to `url`.
    pub fn on_click_navigate(&self, node: NodeId, url: &str) {
        self.with(|page| page.click_targets.insert(node, url.to_string()));
    }

    pub fn fail_navigation(&self, fail: bool) {
        self.with(|page| page.fail_navigation = fail);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.with(|page| page.navigations.clone())
    }

    pub fn clicks(&self) -> Vec<NodeId> {
        self.with(|page| page.clicks.clone())
    }

    pub fn typed(&self) -> Vec<(NodeId, String)> {
        self.with(|page| page.typed.clone())
    }

    fn lookup(&self, selector: &str, scope: Option<&NodeId>) -> Result<Vec<NodeId>> {
        self.with(|page| {
            if page.failing.contains(selector) {
                bail!("stale element while resolving {selector}");
            }
            Ok(page
                .index
                .get(&(scope.copied(), selector.to_string()))
                .cloned()
                .unwrap_or_default())
        })
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Element = NodeId;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.with(|page| {
            page.navigations.push(url.to_string());
            if page.fail_navigation {
                bail!("net::ERR_CONNECTION_RESET navigating to {url}");
            }
            page.url = url.to_string();
            Ok(())
        })
    }

    async fn find(&self, selector: &str, scope: Option<&NodeId>) -> Result<Option<NodeId>> {
        Ok(self.lookup(selector, scope)?.into_iter().next())
    }

    async fn find_all(&self, selector: &str, scope: Option<&NodeId>) -> Result<Vec<NodeId>> {
        self.lookup(selector, scope)
    }

    async fn read_text(&self, element: &NodeId) -> Result<String> {
        self.with(|page| {
            page.text
                .get(element)
                .cloned()
                .ok_or_else(|| anyhow!("node {element} detached"))
        })
    }

    async fn read_attribute(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.with(|page| page.attrs.get(element).and_then(|a| a.get(name).cloned())))
    }

    async fn click(&self, element: &NodeId) -> Result<()> {
        self.with(|page| {
            page.clicks.push(*element);
            if let Some(url) = page.click_targets.get(element).cloned() {
                page.url = url;
            }
        });
        Ok(())
    }

    async fn type_text(&self, element: &NodeId, text: &str) -> Result<()> {
        self.with(|page| page.typed.push((*element, text.to_string())));
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.with(|page| page.source.clone()))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.with(|page| page.url.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
