//! In-memory stand-ins for the browser session and the operator.
//!
//! `FakeSession` keeps a flat list of nodes. A node matches a locator when the
//! locator is one of the node's registered locators, so tests describe pages
//! by the exact locators the robot uses rather than by markup.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use ifa_robot::config::Timeouts;
use ifa_robot::error::{Error, Result};
use ifa_robot::{ElementId, Key, Locator, Operator, PageContext, RecoveryChoice, Session, WaitPolicy};

/// Something the robot did to the session, in a form tests can compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Goto(String),
    Click(String),
    SendKeys(String, String),
    SendKey(String, Key),
    PressKey(Key),
    SelectValue(String, String),
    SelectText(String, String),
    SwitchFrame,
    SwitchDefault,
}

/// Which document a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Top,
    Frame,
}

/// State change applied when a node is clicked.
#[derive(Debug, Clone, Copy)]
pub enum Effect {
    /// Attach and display.
    Show(ElementId),
    /// Detach from the document.
    Hide(ElementId),
    /// Stay attached but stop being displayed, as closed Bootstrap modals do.
    Close(ElementId),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    locators: Vec<Locator>,
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    present: bool,
    displayed: bool,
    parent: Option<ElementId>,
    scope: Scope,
    /// Stops being displayed after this many visibility checks.
    checks_until_hidden: Option<u32>,
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    reactions: HashMap<u32, VecDeque<Vec<Effect>>>,
    in_frame: bool,
    log: Vec<Interaction>,
}

#[derive(Default)]
pub struct FakeSession {
    state: Mutex<State>,
}

/// Builder for one node, returned by [`FakeSession::node`].
pub struct NodeBuilder<'a> {
    session: &'a FakeSession,
    node: Node,
}

impl<'a> NodeBuilder<'a> {
    pub fn locator(mut self, locator: Locator) -> Self {
        self.node.locators.push(locator);
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.node.tag = tag.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.node.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.node.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.node.present = false;
        self
    }

    pub fn child_of(mut self, parent: ElementId) -> Self {
        self.node.parent = Some(parent);
        self
    }

    pub fn in_frame(mut self) -> Self {
        self.node.scope = Scope::Frame;
        self
    }

    pub fn add(self) -> ElementId {
        let mut state = self.session.state.lock();
        state.nodes.push(self.node);
        ElementId(state.nodes.len() as u32 - 1)
    }
}

impl FakeSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn node(&self, name: &str) -> NodeBuilder<'_> {
        NodeBuilder {
            session: self,
            node: Node {
                name: name.to_string(),
                locators: Vec::new(),
                tag: "div".to_string(),
                attrs: HashMap::new(),
                text: String::new(),
                present: true,
                displayed: true,
                parent: None,
                scope: Scope::Top,
                checks_until_hidden: None,
            },
        }
    }

    /// Queue the effects of the next click on `element`. Each click consumes
    /// one queued entry; clicks beyond the queue change nothing.
    pub fn on_click(&self, element: ElementId, effects: Vec<Effect>) {
        self.state
            .lock()
            .reactions
            .entry(element.0)
            .or_default()
            .push_back(effects);
    }

    pub fn set_present(&self, element: ElementId, present: bool) {
        self.state.lock().nodes[element.0 as usize].present = present;
    }

    /// Move an overlay root into the form frame. Its children follow, since
    /// they are only ever looked up relative to the root.
    pub fn move_into_frame(&self, element: ElementId) {
        self.state.lock().nodes[element.0 as usize].scope = Scope::Frame;
    }

    /// Show or close a node without detaching it.
    pub fn set_displayed(&self, element: ElementId, displayed: bool) {
        self.state.lock().nodes[element.0 as usize].displayed = displayed;
    }

    /// Still displayed for `checks` visibility checks, closed on the next.
    pub fn hide_after_checks(&self, element: ElementId, checks: u32) {
        self.state.lock().nodes[element.0 as usize].checks_until_hidden = Some(checks);
    }

    pub fn is_present(&self, element: ElementId) -> bool {
        self.state.lock().nodes[element.0 as usize].present
    }

    /// Attached and displayed.
    pub fn is_shown(&self, element: ElementId) -> bool {
        let state = self.state.lock();
        let node = &state.nodes[element.0 as usize];
        node.present && node.displayed
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().log.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.interactions()
            .into_iter()
            .filter_map(|i| match i {
                Interaction::Click(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Register a modal overlay with its header, body and buttons. Returns the
    /// overlay root and the button handles in the order given.
    pub fn modal(&self, name: &str, header: &str, body: &str, buttons: &[&str]) -> (ElementId, Vec<ElementId>) {
        let root = self
            .node(name)
            .locator(Locator::xpath("//*[@role='alertdialog']"))
            .hidden()
            .add();
        self.node(&format!("{name} header"))
            .locator(Locator::class_name("modal-header"))
            .text(header)
            .child_of(root)
            .add();
        self.node(&format!("{name} body"))
            .locator(Locator::class_name("modal-body"))
            .text(body)
            .child_of(root)
            .add();
        let buttons = buttons
            .iter()
            .map(|label| {
                self.node(&format!("{name} {label}"))
                    .tag("button")
                    .locator(Locator::xpath(format!(".//button[contains(text(), \"{label}\")]")))
                    .child_of(root)
                    .add()
            })
            .collect();
        (root, buttons)
    }

    /// Register a jQuery-style alert with its content and one button.
    pub fn alert(&self, content: &str, button: &str) -> (ElementId, ElementId) {
        let root = self
            .node("alert")
            .locator(Locator::xpath("//*[@role='dialog']"))
            .add();
        self.node("alert title")
            .locator(Locator::class_name("ui-dialog-title"))
            .text("Tájékoztatás")
            .child_of(root)
            .add();
        self.node("alert content")
            .locator(Locator::class_name("ui-dialog-content"))
            .text(content)
            .child_of(root)
            .add();
        let close = self
            .node(&format!("alert {button}"))
            .tag("button")
            .locator(Locator::nested_button_text(button))
            .child_of(root)
            .add();
        (root, close)
    }

    fn visible_in_scope(state: &State, node: &Node) -> bool {
        let scope = if state.in_frame { Scope::Frame } else { Scope::Top };
        node.present && node.scope == scope
    }

    fn record(&self, interaction: Interaction) {
        self.state.lock().log.push(interaction);
    }

    fn name_of(&self, element: ElementId) -> Result<String> {
        self.with_node(element, |node| node.name.clone())
    }

    fn with_node<T>(&self, element: ElementId, f: impl FnOnce(&Node) -> T) -> Result<T> {
        let state = self.state.lock();
        match state.nodes.get(element.0 as usize) {
            Some(node) if node.present => Ok(f(node)),
            _ => Err(Error::ElementNotFound(format!("stale element {}", element.0))),
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(Interaction::Goto(url.to_string()));
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementId>> {
        let state = self.state.lock();
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| Self::visible_in_scope(&state, node) && node.locators.contains(locator))
            .map(|(index, _)| ElementId(index as u32))
            .collect())
    }

    async fn find_children(&self, parent: ElementId, locator: &Locator) -> Result<Vec<ElementId>> {
        let state = self.state.lock();
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent == Some(parent) && node.locators.contains(locator))
            .map(|(index, _)| ElementId(index as u32))
            .collect())
    }

    async fn tag_name(&self, element: ElementId) -> Result<String> {
        self.with_node(element, |node| node.tag.clone())
    }

    async fn attribute(&self, element: ElementId, name: &str) -> Result<Option<String>> {
        self.with_node(element, |node| node.attrs.get(name).cloned())
    }

    async fn text(&self, element: ElementId) -> Result<String> {
        self.with_node(element, |node| node.text.clone())
    }

    async fn is_displayed(&self, element: ElementId) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get_mut(element.0 as usize) else {
            return Ok(false);
        };
        if let Some(left) = node.checks_until_hidden {
            if left == 0 {
                node.displayed = false;
                node.checks_until_hidden = None;
            } else {
                node.checks_until_hidden = Some(left - 1);
            }
        }
        Ok(node.present && node.displayed)
    }

    async fn click(&self, element: ElementId) -> Result<()> {
        let name = self.name_of(element)?;
        let mut state = self.state.lock();
        state.log.push(Interaction::Click(name));
        let effects = state
            .reactions
            .get_mut(&element.0)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();
        for effect in effects {
            match effect {
                Effect::Show(id) => {
                    let node = &mut state.nodes[id.0 as usize];
                    node.present = true;
                    node.displayed = true;
                }
                Effect::Hide(id) => state.nodes[id.0 as usize].present = false,
                Effect::Close(id) => state.nodes[id.0 as usize].displayed = false,
            }
        }
        Ok(())
    }

    async fn send_keys(&self, element: ElementId, text: &str) -> Result<()> {
        let name = self.name_of(element)?;
        self.record(Interaction::SendKeys(name, text.to_string()));
        Ok(())
    }

    async fn send_key(&self, element: ElementId, key: Key) -> Result<()> {
        let name = self.name_of(element)?;
        self.record(Interaction::SendKey(name, key));
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.record(Interaction::PressKey(key));
        Ok(())
    }

    async fn select_by_value(&self, element: ElementId, value: &str) -> Result<()> {
        let name = self.name_of(element)?;
        self.record(Interaction::SelectValue(name, value.to_string()));
        Ok(())
    }

    async fn select_by_visible_text(&self, element: ElementId, label: &str) -> Result<()> {
        let name = self.name_of(element)?;
        self.record(Interaction::SelectText(name, label.to_string()));
        Ok(())
    }

    async fn switch_to_frame(&self, frame: &Locator) -> Result<bool> {
        let mut state = self.state.lock();
        let available = state
            .nodes
            .iter()
            .any(|node| node.present && node.scope == Scope::Top && node.locators.contains(frame));
        if available {
            state.in_frame = true;
            state.log.push(Interaction::SwitchFrame);
        }
        Ok(available)
    }

    async fn switch_to_default(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.in_frame = false;
        state.log.push(Interaction::SwitchDefault);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let state = self.state.lock();
        Ok(state
            .log
            .iter()
            .rev()
            .find_map(|i| match i {
                Interaction::Goto(url) => Some(url.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> Result<String> {
        Ok("Fake portal".to_string())
    }

    async fn html(&self) -> Result<String> {
        Ok("<html></html>".to_string())
    }

    async fn evaluate(&self, expression: &str) -> Result<String> {
        Err(Error::JsError(format!("cannot evaluate `{expression}` without a browser")))
    }

    async fn screenshot_to_file(&self, path: &Path) -> Result<()> {
        Err(Error::ScreenshotError(format!("no browser to capture {}", path.display())))
    }
}

/// Operator whose answers are scripted up front.
#[derive(Default)]
pub struct ScriptedOperator {
    retries: Mutex<VecDeque<bool>>,
    commands: Mutex<VecDeque<String>>,
    recovery: Mutex<Option<RecoveryChoice>>,
    input_closed: Mutex<bool>,
    pub asked: Mutex<Vec<String>>,
    pub manual_edits: Mutex<u32>,
    pub shown: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers to successive retry prompts. Once exhausted, every prompt is
    /// declined.
    pub fn answering(retries: &[bool]) -> Arc<Self> {
        let operator = Self::default();
        operator.retries.lock().extend(retries.iter().copied());
        Arc::new(operator)
    }

    /// An operator whose terminal has gone away: every read hits end of input.
    pub fn input_closed() -> Arc<Self> {
        let operator = Self::default();
        *operator.input_closed.lock() = true;
        Arc::new(operator)
    }

    pub fn with_commands(commands: &[&str]) -> Arc<Self> {
        let operator = Self::default();
        operator
            .commands
            .lock()
            .extend(commands.iter().map(|c| c.to_string()));
        Arc::new(operator)
    }

    pub fn manual_edit_rounds(&self) -> u32 {
        *self.manual_edits.lock()
    }

    pub fn retry_prompts(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn output(&self) -> Vec<String> {
        self.shown.lock().clone()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn confirm_retry(&self, what: &str, _timeout: Duration) -> bool {
        self.asked.lock().push(what.to_string());
        self.retries.lock().pop_front().unwrap_or(false)
    }

    async fn await_manual_edits(&self) -> bool {
        if *self.input_closed.lock() {
            return false;
        }
        *self.manual_edits.lock() += 1;
        true
    }

    async fn offer_recovery(&self) -> RecoveryChoice {
        self.recovery.lock().unwrap_or(RecoveryChoice::Quit)
    }

    async fn read_command(&self) -> Option<String> {
        self.commands.lock().pop_front()
    }

    async fn show(&self, text: &str) {
        self.shown.lock().push(text.to_string());
    }
}

/// A page context over `session` with default timeouts.
pub fn context(session: Arc<FakeSession>, operator: Arc<ScriptedOperator>) -> PageContext {
    let timeouts = Timeouts::default();
    let waits = WaitPolicy::new(operator).with_poll_interval(timeouts.poll_interval());
    PageContext::new(session, waits, timeouts)
}
