use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::html::escape;

/// A single node of the page: class list, attributes and inner content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub classes: Vec<String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default)]
    pub content: String,
}

impl Element {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            classes: vec![class.into()],
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Attribute value, with empty strings treated as missing.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn to_html(&self) -> String {
        let mut html = String::from("<div");
        if !self.classes.is_empty() {
            html.push_str(&format!(" class=\"{}\"", escape(&self.classes.join(" "))));
        }
        for (name, value) in &self.attributes {
            html.push_str(&format!(" {}=\"{}\"", name, escape(value)));
        }
        html.push('>');
        html.push_str(&self.content);
        html.push_str("</div>");
        html
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct Markup {
    #[serde(default)]
    elements: Vec<Element>,
}

/// Shared handle to the live page.
///
/// Clones point at the same elements. Every call to [`Page::update`] bumps a
/// revision counter that observers can follow through [`Page::subscribe`].
#[derive(Clone)]
pub struct Page {
    elements: Arc<Mutex<Vec<Element>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Page {
    pub fn new(elements: Vec<Element>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            elements: Arc::new(Mutex::new(elements)),
            revision: Arc::new(revision),
        }
    }

    pub fn from_json(markup: &str) -> Result<Self> {
        let markup: Markup = serde_json::from_str(markup).context("invalid page markup")?;
        Ok(Self::new(markup.elements))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read page markup {}", path.display()))?;
        Self::from_json(&raw)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Element>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against a consistent view of the elements.
    pub fn read<T>(&self, f: impl FnOnce(&[Element]) -> T) -> T {
        f(&self.lock())
    }

    /// Mutate the elements under a single lock, then publish a new revision.
    pub fn update<T>(&self, f: impl FnOnce(&mut [Element]) -> T) -> T {
        let out = f(&mut self.lock());
        self.revision.send_modify(|rev| *rev += 1);
        out
    }

    /// Append an element, as page markup would.
    pub fn append(&self, element: Element) {
        self.lock().push(element);
    }

    pub fn elements(&self) -> Vec<Element> {
        self.lock().clone()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn to_html(&self) -> String {
        self.read(|elements| {
            elements
                .iter()
                .map(Element::to_html)
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}
