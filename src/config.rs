use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::browser::PortalBrowser;
use crate::error::{Error, Result};

pub const DEFAULT_PORTAL_URL: &str = "https://ohp-20.asp.lgov.hu";

pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// How long to wait for Chrome to come up (default: 30s).
    pub launch_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_path: None,
            launch_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn launch_timeout(mut self, timeout: Duration) -> Self {
        self.config.launch_timeout = timeout;
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<PortalBrowser> {
        PortalBrowser::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Portal login credentials, read from the `[DEFAULT]` section.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Where to go and which case to open.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    pub url: String,
    /// Label of the identity provider button on the federated login screen.
    pub identity_provider: String,
    pub role: String,
    pub sector: String,
    pub case_type: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_PORTAL_URL.into(),
            identity_provider: "Ügyfélkapu".into(),
            role: "Saját néven (magánszemélyként)".into(),
            sector: "Adóügy".into(),
            case_type: "idegenforgalmi adó".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Seconds.
    pub launch_timeout: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let defaults = BrowserConfig::default();
        Self {
            headless: defaults.headless,
            chrome_path: defaults.chrome_path,
            viewport_width: defaults.viewport_width,
            viewport_height: defaults.viewport_height,
            launch_timeout: defaults.launch_timeout.as_secs(),
        }
    }
}

impl BrowserSettings {
    pub fn builder(&self) -> BrowserBuilder {
        let mut builder = BrowserBuilder::new()
            .headless(self.headless)
            .viewport(self.viewport_width, self.viewport_height)
            .launch_timeout(Duration::from_secs(self.launch_timeout));
        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        builder
    }
}

/// Wait bounds, in seconds unless noted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub page: u64,
    pub form_frame: u64,
    pub form: u64,
    pub dialog_visible: u64,
    pub progress_invisible: u64,
    pub attachments: u64,
    /// Pause on the provider chooser, whose buttons ignore clicks for a while
    /// after the screen has rendered.
    pub provider_settle: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page: 10,
            form_frame: 10,
            form: 30,
            dialog_visible: 5,
            progress_invisible: 30,
            attachments: 60,
            provider_settle: 5,
            poll_interval_ms: 500,
        }
    }
}

impl Timeouts {
    pub fn page(&self) -> Duration {
        Duration::from_secs(self.page)
    }

    pub fn form_frame(&self) -> Duration {
        Duration::from_secs(self.form_frame)
    }

    pub fn form(&self) -> Duration {
        Duration::from_secs(self.form)
    }

    pub fn dialog_visible(&self) -> Duration {
        Duration::from_secs(self.dialog_visible)
    }

    pub fn progress_invisible(&self) -> Duration {
        Duration::from_secs(self.progress_invisible)
    }

    pub fn attachments(&self) -> Duration {
        Duration::from_secs(self.attachments)
    }

    pub fn provider_settle(&self) -> Duration {
        Duration::from_secs(self.provider_settle)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Stop after this many rejected submissions. Unbounded when absent.
    pub max_submission_attempts: Option<u32>,
}

/// Everything the robot reads from its configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    #[serde(rename = "DEFAULT")]
    pub credentials: Credentials,
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub workflow: WorkflowSettings,
}

impl RobotConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: RobotConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(Error::Config("DEFAULT.username is empty".into()));
        }
        if self.credentials.password.is_empty() {
            return Err(Error::Config("DEFAULT.password is empty".into()));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(Error::Config("timeouts.poll_interval_ms must be positive".into()));
        }
        if self.workflow.max_submission_attempts == Some(0) {
            return Err(Error::Config(
                "workflow.max_submission_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
