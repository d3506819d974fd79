//! Files the tourism-tax case on the e-government portal by driving a Chrome
//! session through login, case selection and the multi-chapter form, with an
//! operator confirming each step that may need a human.

pub mod browser;
pub mod config;
pub mod dialog;
pub mod element;
pub mod error;
pub mod fill;
pub mod operator;
pub mod page;
pub mod pages;
pub mod recovery;
pub mod session;
pub mod wait;
pub mod workflow;

pub use browser::{CdpSession, PortalBrowser};
pub use config::{BrowserConfig, RobotConfig};
pub use error::{Error, Result};
pub use fill::{Chapter, ChapterSet, FieldSpec};
pub use operator::{ConsoleOperator, Operator, RecoveryChoice};
pub use page::{PageContext, Screen};
pub use session::{ElementId, Key, Locator, Session};
pub use wait::{WaitOutcome, WaitPolicy};
pub use workflow::{Outcome, Workflow};
