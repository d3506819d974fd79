//! End-to-end filing run.
//!
//! The run is a fixed sequence of screens with one feedback loop: the form is
//! handed to the operator for review, submitted, and handed back for as long
//! as the portal answers with a validation error list.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RobotConfig;
use crate::error::{Error, Result};
use crate::fill::ChapterSet;
use crate::operator::Operator;
use crate::page::{PageContext, Screen};
use crate::pages::{AlertDisposition, FormPage, LandingPage};
use crate::session::Session;
use crate::wait::WaitPolicy;

/// Header fragment of the portal's validation report, lower case.
pub const VALIDATION_ERROR_TOKEN: &str = "hibalista";

/// The portal's answer to one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionVerdict {
    /// The portal listed validation errors.
    Rejected,
    Accepted,
}

impl SubmissionVerdict {
    pub fn from_header(header: &str) -> Self {
        if header.to_lowercase().contains(VALIDATION_ERROR_TOKEN) {
            SubmissionVerdict::Rejected
        } else {
            SubmissionVerdict::Accepted
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Filling,
    Submitting,
    Complete,
}

impl SubmissionState {
    /// The operator has released the form for submission.
    pub fn submit(self) -> Self {
        match self {
            SubmissionState::Filling => SubmissionState::Submitting,
            other => other,
        }
    }

    /// Apply the portal's verdict to an attempt in flight.
    pub fn resolve(self, verdict: SubmissionVerdict) -> Self {
        match (self, verdict) {
            (SubmissionState::Submitting, SubmissionVerdict::Accepted) => SubmissionState::Complete,
            (SubmissionState::Submitting, SubmissionVerdict::Rejected) => SubmissionState::Filling,
            (other, _) => other,
        }
    }
}

/// Screens in the order the run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Landing,
    ProviderChooser,
    Credentials,
    Welcome,
    CaseSelection,
    CaseResults,
    Form,
    Attachments,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    pub stage: Stage,
    pub submission: SubmissionState,
    pub attempts: u32,
}

impl WorkflowState {
    fn enter(&mut self, stage: Stage) {
        info!(from = ?self.stage, to = ?stage, "Workflow stage");
        self.stage = stage;
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            stage: Stage::Start,
            submission: SubmissionState::Filling,
            attempts: 0,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub submission_attempts: u32,
    pub alert: AlertDisposition,
}

pub struct Workflow {
    ctx: PageContext,
    config: RobotConfig,
    chapters: ChapterSet,
    state: WorkflowState,
}

impl Workflow {
    pub fn new(
        session: Arc<dyn Session>,
        operator: Arc<dyn Operator>,
        config: RobotConfig,
        chapters: ChapterSet,
    ) -> Self {
        let waits = WaitPolicy::new(operator).with_poll_interval(config.timeouts.poll_interval());
        let ctx = PageContext::new(session, waits, config.timeouts.clone());
        Self {
            ctx,
            config,
            chapters,
            state: WorkflowState::default(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        let ctx = &self.ctx;
        let portal = &self.config.portal;
        let page_timeout = ctx.timeouts().page();

        info!(url = %portal.url, "Opening portal");
        ctx.session().goto(&portal.url).await?;

        self.state.enter(Stage::Landing);
        let landing = LandingPage::new(ctx).wait_for_page(page_timeout).await?;
        let chooser = landing.start_login(&portal.identity_provider).await?;

        self.state.enter(Stage::ProviderChooser);
        let chooser = chooser.wait_for_page(page_timeout).await?.settle().await;
        let credentials = chooser.choose_provider().await?;

        self.state.enter(Stage::Credentials);
        let credentials = credentials.wait_for_page(page_timeout).await?;
        let welcome = credentials.login(&self.config.credentials).await?;

        self.state.enter(Stage::Welcome);
        let welcome = welcome.wait_for_page(page_timeout).await?;
        let selection = welcome.start_case().await?;

        self.state.enter(Stage::CaseSelection);
        let selection = selection.wait_for_page(page_timeout).await?;
        let results = selection.select_case(portal).await?;

        self.state.enter(Stage::CaseResults);
        let results = results.wait_for_page(page_timeout).await?;
        let form = results.open_latest_form().await?;

        self.state.enter(Stage::Form);
        let form = form.wait_for_page(ctx.timeouts().form()).await?;
        form.wait_for_progress_overlay().await?;
        let alert = form.dismiss_known_alert().await?;
        form.fill_chapters(&self.chapters).await?;
        submit_until_accepted(
            &form,
            &mut self.state,
            ctx.waits().operator().as_ref(),
            self.config.workflow.max_submission_attempts,
        )
        .await?;

        self.state.enter(Stage::Attachments);
        let attachments = form
            .leave()
            .await?
            .wait_for_page(ctx.timeouts().attachments())
            .await?;
        attachments.submit().await?;

        self.state.enter(Stage::Done);
        Ok(Outcome {
            submission_attempts: self.state.attempts,
            alert,
        })
    }
}

/// Hand the form to the operator, submit it, and repeat while the portal
/// rejects it. Without a cap this runs until operator and portal agree.
async fn submit_until_accepted(
    form: &FormPage<'_>,
    state: &mut WorkflowState,
    operator: &dyn Operator,
    max_attempts: Option<u32>,
) -> Result<()> {
    while state.submission != SubmissionState::Complete {
        if !operator.await_manual_edits().await {
            warn!(attempt = state.attempts + 1, "No operator to release the form");
            return Err(Error::OperatorInputClosed);
        }

        state.submission = state.submission.submit();
        state.attempts += 1;
        info!(attempt = state.attempts, "Submitting form");
        form.open_more_actions().await?;
        form.click_submit().await?;
        form.confirm_submission().await?;

        let verdict = form.submission_verdict().await?;
        state.submission = state.submission.resolve(verdict);
        if verdict == SubmissionVerdict::Rejected {
            warn!(attempt = state.attempts, "Portal reported validation errors");
            operator
                .show("Looks like the form has some errors :( Fix them and submit again.")
                .await;
            if max_attempts.is_some_and(|max| state.attempts >= max) {
                return Err(Error::SubmissionAttemptsExhausted(state.attempts));
            }
        }
    }
    info!(attempts = state.attempts, "Form accepted");
    Ok(())
}
