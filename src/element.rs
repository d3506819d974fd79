use crate::error::Result;
use crate::session::{ElementId, Key, Session};

/// An element resolved through a [`Session`], with a simplified API.
#[derive(Clone, Copy)]
pub struct Element<'s> {
    session: &'s dyn Session,
    id: ElementId,
}

impl<'s> Element<'s> {
    pub fn new(session: &'s dyn Session, id: ElementId) -> Self {
        Self { session, id }
    }

    /// Returns the session handle of this element.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Click this element.
    pub async fn click(&self) -> Result<()> {
        self.session.click(self.id).await
    }

    /// Type text into this element as literal keystrokes.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.session.send_keys(self.id, text).await
    }

    /// Send a single key to this element (e.g. `Key::Home`).
    pub async fn send_key(&self, key: Key) -> Result<()> {
        self.session.send_key(self.id, key).await
    }

    /// Lower-case tag name of this element.
    pub async fn tag_name(&self) -> Result<String> {
        self.session.tag_name(self.id).await
    }

    /// Get the value of an attribute on this element.
    pub async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.session.attribute(self.id, name).await
    }

    /// Select an `<option>` of this `<select>` by its value attribute.
    pub async fn select_by_value(&self, value: &str) -> Result<()> {
        self.session.select_by_value(self.id, value).await
    }

    /// Select an `<option>` of this `<select>` by its visible label.
    pub async fn select_by_label(&self, label: &str) -> Result<()> {
        self.session.select_by_visible_text(self.id, label).await
    }
}

impl std::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Element").field(&self.id).finish()
    }
}
