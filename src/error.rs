use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The operator declined to keep polling. Only the process entry point
    /// handles this; everything in between propagates it.
    #[error("Operator abandoned the wait for: {0}")]
    WaitAbandoned(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("No {0} overlay is present")]
    OverlayNotPresent(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid field table: {0}")]
    FieldTable(String),

    #[error("Selector `{selector}` appears more than once in chapter `{chapter}`")]
    DuplicateSelector { chapter: String, selector: String },

    /// Nobody is left to review the form, so it must not be submitted again.
    #[error("Operator input closed while waiting for manual form edits")]
    OperatorInputClosed,

    #[error("The portal rejected the form {0} times, giving up")]
    SubmissionAttemptsExhausted(u32),

    #[error("Screenshot failed: {0}")]
    ScreenshotError(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Process exit status for a run that ended with this error.
    ///
    /// An abandoned wait is the only failure that maps to a non-zero status;
    /// every other error has already been offered to the operator for recovery.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::WaitAbandoned(_) => 1,
            _ => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
