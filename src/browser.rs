use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page as CrPage, ScreenshotParams};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::{BrowserBuilder, BrowserConfig};
use crate::error::{Error, Result};
use crate::session::{ElementId, Key, Locator, Session};

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "no-first-run",
    "disable-client-side-phishing-detection",
    "disable-prompt-on-repost",
];

/// Helpers shared by every script `CdpSession` evaluates.
///
/// Resolved nodes live in a registry on the top window and are referred to by
/// index. A navigation replaces the window and with it the registry, so old
/// handles stop resolving.
const PRELUDE: &str = r#"
const reg = (window.__ifaRobot = window.__ifaRobot || { nodes: [] });
function find(root, kind, arg) {
    if (kind === 'css') return Array.from(root.querySelectorAll(arg));
    if (kind === 'link') {
        return Array.from(root.querySelectorAll('a'))
            .filter(a => (a.innerText || a.textContent || '').includes(arg));
    }
    const doc = root.ownerDocument || root;
    const snapshot = doc.evaluate(arg, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    const out = [];
    for (let i = 0; i < snapshot.snapshotLength; i++) out.push(snapshot.snapshotItem(i));
    return out;
}
function frameDoc(frame) {
    if (!frame) return document;
    const el = find(document, frame[0], frame[1])[0];
    const doc = el && el.contentDocument;
    if (!doc || !doc.documentElement) throw new Error('frame not available: ' + frame[1]);
    return doc;
}
function put(nodes) {
    return nodes.map(n => {
        const known = reg.nodes.indexOf(n);
        if (known >= 0) return known;
        reg.nodes.push(n);
        return reg.nodes.length - 1;
    });
}
function get(id) {
    const n = reg.nodes[id];
    if (!n || !n.isConnected) throw new Error('stale element handle ' + id);
    return n;
}
function shown(n) {
    const style = n.ownerDocument.defaultView.getComputedStyle(n);
    return style.visibility !== 'hidden' && style.display !== 'none' && n.getClientRects().length > 0;
}
function fire(n) {
    n.dispatchEvent(new Event('input', { bubbles: true }));
    n.dispatchEvent(new Event('change', { bubbles: true }));
}
"#;

/// A launched Chrome instance.
///
/// Launching is an explicit step taken once by the binary; nothing in the
/// library starts a browser on its own.
pub struct PortalBrowser {
    browser: CrBrowser,
    _handler_task: tokio::task::JoinHandle<()>,
}

impl PortalBrowser {
    /// Create a new BrowserBuilder for configuring and launching a browser.
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder
            .launch_timeout(config.launch_timeout)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        info!(headless = config.headless, "Browser launched");
        Ok(Self {
            browser,
            _handler_task: handler_task,
        })
    }

    /// Open the tab the workflow will drive.
    pub async fn open_session(&self) -> Result<CdpSession> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(CdpSession::new(page))
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.browser.wait().await?;
        info!("Browser closed");
        Ok(())
    }
}

/// [`Session`] over one chromiumoxide tab.
///
/// Element lookups run as scripts against the current document, which is the
/// content document of the switched-into frame when there is one.
pub struct CdpSession {
    page: CrPage,
    frame: Mutex<Option<Locator>>,
}

impl CdpSession {
    pub fn new(page: CrPage) -> Self {
        Self {
            page,
            frame: Mutex::new(None),
        }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.page
    }

    fn script(&self, body: &str) -> Result<String> {
        let frame = self.frame.lock().as_ref().map(Locator::query);
        let frame = js(&frame)?;
        Ok(format!(
            "(() => {{\n{PRELUDE}\nconst frame = {frame};\nconst result = (() => {{\n{body}\n}})();\nreturn JSON.stringify(result === undefined ? null : result);\n}})()"
        ))
    }

    /// Run `body` with the prelude in scope and decode what it returns.
    async fn run<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        let script = self.script(body)?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        let json: String = result
            .into_value()
            .map_err(|e| Error::JsError(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| Error::JsError(e.to_string()))
    }

    async fn focus(&self, element: ElementId) -> Result<()> {
        self.run::<bool>(&format!(
            "const n = get({}); n.scrollIntoView({{ block: 'center' }}); n.focus(); return true;",
            element.0
        ))
        .await?;
        Ok(())
    }

    async fn dispatch_key(&self, key: Key) -> Result<()> {
        for down in [true, false] {
            let kind = if down {
                DispatchKeyEventType::KeyDown
            } else {
                DispatchKeyEventType::KeyUp
            };
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key(key.dom_key());
            if let Some(code) = key.virtual_key_code() {
                builder = builder
                    .windows_virtual_key_code(code)
                    .native_virtual_key_code(code);
            }
            if down {
                if let Some(text) = key.text() {
                    builder = builder.text(text);
                }
            }
            let params = builder.build().map_err(Error::JsError)?;
            self.page.execute(params).await?;
        }
        Ok(())
    }
}

/// Encode a value as a JavaScript literal.
fn js<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::JsError(e.to_string()))
}

#[async_trait]
impl Session for CdpSession {
    async fn goto(&self, url: &str) -> Result<()> {
        *self.frame.lock() = None;
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementId>> {
        let (kind, arg) = locator.query();
        let ids: Vec<u32> = self
            .run(&format!(
                "return put(find(frameDoc(frame), {}, {}));",
                js(kind)?,
                js(&arg)?
            ))
            .await?;
        debug!(locator = %locator, found = ids.len(), "find_elements");
        Ok(ids.into_iter().map(ElementId).collect())
    }

    async fn find_children(&self, parent: ElementId, locator: &Locator) -> Result<Vec<ElementId>> {
        let (kind, arg) = locator.query();
        let ids: Vec<u32> = self
            .run(&format!(
                "return put(find(get({}), {}, {}));",
                parent.0,
                js(kind)?,
                js(&arg)?
            ))
            .await?;
        Ok(ids.into_iter().map(ElementId).collect())
    }

    async fn tag_name(&self, element: ElementId) -> Result<String> {
        self.run(&format!("return get({}).tagName.toLowerCase();", element.0))
            .await
    }

    async fn attribute(&self, element: ElementId, name: &str) -> Result<Option<String>> {
        self.run(&format!(
            "return get({}).getAttribute({});",
            element.0,
            js(name)?
        ))
        .await
    }

    async fn text(&self, element: ElementId) -> Result<String> {
        self.run(&format!(
            "const n = get({}); return (n.innerText || n.textContent || '').trim();",
            element.0
        ))
        .await
    }

    async fn is_displayed(&self, element: ElementId) -> Result<bool> {
        self.run(&format!("return shown(get({}));", element.0))
            .await
    }

    async fn click(&self, element: ElementId) -> Result<()> {
        self.run::<bool>(&format!(
            "const n = get({}); n.scrollIntoView({{ block: 'center' }}); n.click(); return true;",
            element.0
        ))
        .await?;
        Ok(())
    }

    async fn send_keys(&self, element: ElementId, text: &str) -> Result<()> {
        self.focus(element).await?;
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn send_key(&self, element: ElementId, key: Key) -> Result<()> {
        self.focus(element).await?;
        self.dispatch_key(key).await
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.dispatch_key(key).await
    }

    async fn select_by_value(&self, element: ElementId, value: &str) -> Result<()> {
        let value = js(value)?;
        self.run::<bool>(&format!(
            r#"
            const n = get({id});
            const option = Array.from(n.options).find(o => o.value === {value});
            if (!option) throw new Error('no option with value ' + {value});
            n.value = option.value;
            fire(n);
            return true;
            "#,
            id = element.0,
        ))
        .await?;
        Ok(())
    }

    async fn select_by_visible_text(&self, element: ElementId, label: &str) -> Result<()> {
        let label = js(label)?;
        self.run::<bool>(&format!(
            r#"
            const n = get({id});
            const option = Array.from(n.options)
                .find(o => (o.textContent || '').replace(/\s+/g, ' ').trim() === {label});
            if (!option) throw new Error('no option labelled ' + {label});
            n.value = option.value;
            fire(n);
            return true;
            "#,
            id = element.0,
        ))
        .await?;
        Ok(())
    }

    async fn switch_to_frame(&self, frame: &Locator) -> Result<bool> {
        let (kind, arg) = frame.query();
        let available: bool = self
            .run(&format!(
                r#"
                const el = find(document, {}, {})[0];
                const doc = el && el.contentDocument;
                return !!(doc && doc.documentElement && doc.readyState !== 'loading');
                "#,
                js(kind)?,
                js(&arg)?
            ))
            .await?;
        if available {
            debug!(frame = %frame, "Switched into frame");
            *self.frame.lock() = Some(frame.clone());
        }
        Ok(available)
    }

    async fn switch_to_default(&self) -> Result<()> {
        *self.frame.lock() = None;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    async fn title(&self) -> Result<String> {
        self.run("return document.title;").await
    }

    async fn html(&self) -> Result<String> {
        self.run("return frameDoc(frame).documentElement.outerHTML;")
            .await
    }

    async fn evaluate(&self, expression: &str) -> Result<String> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        match result.value() {
            Some(val) => Ok(val.to_string()),
            None => Ok(String::new()),
        }
    }

    async fn screenshot_to_file(&self, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))?;
        Ok(())
    }
}
