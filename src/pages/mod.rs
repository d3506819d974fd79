//! One type per portal screen, in the order the workflow visits them.
//!
//! Actions that are known to move the portal to another screen consume the
//! current page and return the next one, not yet waited for.

mod attachments;
mod case;
mod form;
mod login;

pub use attachments::AttachmentsPage;
pub use case::{CaseResultsPage, CaseSelectionPage};
pub use form::{AlertDisposition, FormPage, KNOWN_ALERT_TEXT};
pub use login::{CredentialsPage, LandingPage, ProviderChooserPage, WelcomePage};
