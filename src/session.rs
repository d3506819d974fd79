//! The UI-automation capability set the workflow depends on.
//!
//! Everything above this module talks to the browser only through [`Session`],
//! so the pages, overlays and the fill engine never see chromiumoxide types.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Opaque handle to an element resolved by a [`Session`].
///
/// Handles become stale once the session navigates away; using a stale handle
/// is an error, not undefined behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u32);

/// How to find elements, in the strategies the portal's markup calls for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Name(String),
    ClassName(String),
    Css(String),
    XPath(String),
    /// Anchors whose visible text contains the given fragment.
    PartialLinkText(String),
    /// Elements whose attribute value contains the given fragment.
    AttributeContains { attribute: String, fragment: String },
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name(name.into())
    }

    pub fn class_name(class: impl Into<String>) -> Self {
        Locator::ClassName(class.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Locator::PartialLinkText(text.into())
    }

    pub fn attribute_contains(attribute: impl Into<String>, fragment: impl Into<String>) -> Self {
        Locator::AttributeContains {
            attribute: attribute.into(),
            fragment: fragment.into(),
        }
    }

    /// A `<button>` whose text contains `text`.
    pub fn button_text(text: &str) -> Self {
        Locator::XPath(format!(
            "//button[contains(text(), {})]",
            xpath_literal(text)
        ))
    }

    /// A `<button>` containing `text` anywhere in its subtree, relative to the
    /// element the search starts from.
    pub fn nested_button_text(text: &str) -> Self {
        Locator::XPath(format!(".//button[contains(., {})]", xpath_literal(text)))
    }

    /// A button-like control labelled `text`: either a `<button>` whose text
    /// contains it, or a submit/button/reset/search `<input>` whose value does.
    pub fn partial_button_text(text: &str) -> Self {
        let literal = xpath_literal(text);
        Locator::XPath(format!(
            "//button[contains(text(), {literal})] | \
             //input[(@type=\"submit\" or @type=\"button\" or @type=\"reset\" or @type=\"search\") \
             and contains(@value, {literal})]"
        ))
    }

    /// Reduce the locator to one of the three primitive query kinds a DOM can
    /// answer directly: `css`, `xpath` or `link` (partial anchor text).
    pub fn query(&self) -> (&'static str, String) {
        match self {
            Locator::Id(id) => ("css", format!("[id=\"{}\"]", css_escape(id))),
            Locator::Name(name) => ("css", format!("[name=\"{}\"]", css_escape(name))),
            Locator::ClassName(class) => ("css", format!("[class~=\"{}\"]", css_escape(class))),
            Locator::Css(selector) => ("css", selector.clone()),
            Locator::XPath(path) => ("xpath", path.clone()),
            Locator::PartialLinkText(text) => ("link", text.clone()),
            Locator::AttributeContains {
                attribute,
                fragment,
            } => (
                "css",
                format!("[{}*=\"{}\"]", attribute, css_escape(fragment)),
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={id}"),
            Locator::Name(name) => write!(f, "name={name}"),
            Locator::ClassName(class) => write!(f, "class={class}"),
            Locator::Css(selector) => write!(f, "css={selector}"),
            Locator::XPath(path) => write!(f, "xpath={path}"),
            Locator::PartialLinkText(text) => write!(f, "link text~={text}"),
            Locator::AttributeContains {
                attribute,
                fragment,
            } => write!(f, "[{attribute}*={fragment}]"),
        }
    }
}

/// Quote `text` as an XPath string literal, falling back to `concat()` when it
/// contains both quote characters.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        format!("\"{text}\"")
    } else if !text.contains('\'') {
        format!("'{text}'")
    } else {
        let parts: Vec<String> = text
            .split('"')
            .map(|part| format!("\"{part}\""))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A single key, dispatched as one discrete key-press event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Home,
    End,
    Enter,
    Tab,
    Escape,
    Backspace,
    Char(char),
}

impl Key {
    /// The DOM `key` value.
    pub fn dom_key(&self) -> String {
        match self {
            Key::Home => "Home".into(),
            Key::End => "End".into(),
            Key::Enter => "Enter".into(),
            Key::Tab => "Tab".into(),
            Key::Escape => "Escape".into(),
            Key::Backspace => "Backspace".into(),
            Key::Char(c) => c.to_string(),
        }
    }

    /// Text the key inserts, if any.
    pub fn text(&self) -> Option<String> {
        match self {
            Key::Enter => Some("\r".into()),
            Key::Char(c) => Some(c.to_string()),
            _ => None,
        }
    }

    /// Windows virtual key code for the non-printable keys.
    pub fn virtual_key_code(&self) -> Option<i64> {
        match self {
            Key::Home => Some(36),
            Key::End => Some(35),
            Key::Enter => Some(13),
            Key::Tab => Some(9),
            Key::Escape => Some(27),
            Key::Backspace => Some(8),
            Key::Char(_) => None,
        }
    }
}

/// Browser session boundary.
///
/// Implementations resolve locators against the current document: the top
/// document, or the content document of the frame last switched into.
#[async_trait]
pub trait Session: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// All elements matching `locator`, in document order.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementId>>;

    /// Descendants of `parent` matching `locator`, in document order.
    async fn find_children(&self, parent: ElementId, locator: &Locator) -> Result<Vec<ElementId>>;

    /// Lower-case tag name.
    async fn tag_name(&self, element: ElementId) -> Result<String>;

    async fn attribute(&self, element: ElementId, name: &str) -> Result<Option<String>>;

    /// Rendered text of the element.
    async fn text(&self, element: ElementId) -> Result<String>;

    async fn is_displayed(&self, element: ElementId) -> Result<bool>;

    async fn click(&self, element: ElementId) -> Result<()>;

    /// Focus the element and type `text` as one batch of literal keystrokes.
    async fn send_keys(&self, element: ElementId, text: &str) -> Result<()>;

    /// Focus the element and dispatch a single key to it.
    async fn send_key(&self, element: ElementId, key: Key) -> Result<()>;

    /// Dispatch one discrete key press to whatever currently has focus.
    async fn press_key(&self, key: Key) -> Result<()>;

    /// Select the `<option>` whose `value` attribute equals `value`.
    async fn select_by_value(&self, element: ElementId, value: &str) -> Result<()>;

    /// Select the `<option>` whose visible text equals `label`.
    async fn select_by_visible_text(&self, element: ElementId, label: &str) -> Result<()>;

    /// Switch into the frame matched by `frame` if it is available.
    /// Returns `false`, without switching, when it is not.
    async fn switch_to_frame(&self, frame: &Locator) -> Result<bool>;

    async fn switch_to_default(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Markup of the current document.
    async fn html(&self) -> Result<String>;

    /// Evaluate a JavaScript expression and return its result as JSON text.
    async fn evaluate(&self, expression: &str) -> Result<String>;

    async fn screenshot_to_file(&self, path: &Path) -> Result<()>;

    /// The first element matching `locator`.
    async fn find_element(&self, locator: &Locator) -> Result<ElementId> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound(locator.to_string()))
    }

    /// The first descendant of `parent` matching `locator`.
    async fn find_child(&self, parent: ElementId, locator: &Locator) -> Result<ElementId> {
        self.find_children(parent, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound(locator.to_string()))
    }
}
