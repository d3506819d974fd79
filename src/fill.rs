//! Chapter-by-chapter form filling.
//!
//! Field tables are external data: an ordered list of chapters, each an
//! ordered list of `(selector, value)` pairs. The widget behind a selector
//! decides how its value is entered.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dialog::{wait_out_progress, Overlay, OverlayKind};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::page::PageContext;
use crate::session::{Key, Locator, Session};

/// Attribute the portal puts on inputs that reformat keystrokes as typed.
pub const MASK_ATTRIBUTE: &str = "data-mask";

/// One form field and the value it should end up with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// CSS selector, resolved inside the form frame.
    pub selector: String,
    /// Literal text, option value or masked string, depending on the widget.
    pub value: String,
}

impl FieldSpec {
    pub fn new(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            value: value.into(),
        }
    }
}

/// A named section of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    #[serde(default, alias = "field")]
    pub fields: Vec<FieldSpec>,
}

impl Chapter {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Selectors must be unique within a chapter.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.selector.as_str()) {
                return Err(Error::DuplicateSelector {
                    chapter: self.name.clone(),
                    selector: field.selector.clone(),
                });
            }
        }
        Ok(())
    }
}

/// All chapters of the form, in the order the portal presents them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSet {
    #[serde(rename = "chapter", default)]
    chapters: Vec<Chapter>,
}

impl ChapterSet {
    pub fn new(chapters: Vec<Chapter>) -> Result<Self> {
        let set = Self { chapters };
        set.validate()?;
        Ok(set)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let set: ChapterSet = toml::from_str(source)?;
        set.validate()?;
        Ok(set)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::FieldTable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    fn validate(&self) -> Result<()> {
        if self.chapters.is_empty() {
            return Err(Error::FieldTable("no chapters defined".into()));
        }
        let mut names = HashSet::new();
        for chapter in &self.chapters {
            if !names.insert(chapter.name.as_str()) {
                return Err(Error::FieldTable(format!(
                    "chapter `{}` is defined twice",
                    chapter.name
                )));
            }
            chapter.validate()?;
        }
        Ok(())
    }
}

/// How a value gets into a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    /// `<select>`: the value names an option's `value` attribute.
    Select,
    /// Masked input: cursor reset, then one key event per character.
    Masked,
    /// Anything else: literal keystrokes.
    Text,
}

impl WidgetKind {
    pub fn classify(tag_name: &str, mask: Option<&str>) -> Self {
        if tag_name.eq_ignore_ascii_case("select") {
            WidgetKind::Select
        } else if mask.is_some() {
            WidgetKind::Masked
        } else {
            WidgetKind::Text
        }
    }
}

/// Fill `chapter`'s fields in table order.
///
/// Any field may bring up a modal as a side effect. It covers the form, so
/// before the next field is addressed it is logged and, if it is the progress
/// modal, waited out.
pub async fn fill_fields(ctx: &PageContext, chapter: &Chapter) -> Result<()> {
    info!(
        chapter = %chapter.name,
        fields = chapter.fields.len(),
        "Filling chapter"
    );
    for field in &chapter.fields {
        let element = ctx.find(&Locator::css(&field.selector)).await?;
        let tag = element.tag_name().await?;
        let mask = element.get_attribute(MASK_ATTRIBUTE).await?;
        let kind = WidgetKind::classify(&tag, mask.as_deref());

        info!(
            chapter = %chapter.name,
            "Setting form field {} ({}) to '{}'",
            field.selector,
            tag,
            field.value
        );
        match kind {
            WidgetKind::Select => element.select_by_value(&field.value).await?,
            WidgetKind::Masked => type_masked(ctx.session(), &element, &field.value).await?,
            WidgetKind::Text => {
                element.click().await?;
                element.type_text(&field.value).await?;
            }
        }

        if let Some(overlay) = Overlay::find(ctx.session(), OverlayKind::Modal).await? {
            debug!(selector = %field.selector, "Modal appeared after setting field");
            wait_out_progress(ctx, &overlay).await?;
        }
    }
    Ok(())
}

/// Type into a masked input.
///
/// The portal's mask plugin only accepts insertion at the start of the field
/// and drops characters that arrive as one batched string, so the cursor is
/// reset with Home and every character goes out as its own key press.
pub async fn type_masked(session: &dyn Session, element: &Element<'_>, value: &str) -> Result<()> {
    element.click().await?;
    element.send_key(Key::Home).await?;
    for c in value.chars() {
        session.press_key(Key::Char(c)).await?;
    }
    Ok(())
}
