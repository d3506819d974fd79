use tracing::info;

use crate::config::Credentials;
use crate::error::Result;
use crate::page::{PageContext, Screen};
use crate::pages::case::CaseSelectionPage;
use crate::session::Locator;

/// Public landing page.
pub struct LandingPage<'a> {
    ctx: &'a PageContext,
}

impl<'a> LandingPage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    fn login_link() -> Locator {
        Locator::partial_link_text("ÜGYINTÉZÉS BEJELENTKEZÉSSEL")
    }

    /// Follow the "log in to manage cases" link to the federated login, where
    /// `provider` will be chosen.
    pub async fn start_login(self, provider: &str) -> Result<ProviderChooserPage<'a>> {
        self.ctx.find(&Self::login_link()).await?.click().await?;
        Ok(ProviderChooserPage::new(self.ctx, provider))
    }
}

impl Screen for LandingPage<'_> {
    fn name(&self) -> &'static str {
        "Nyitólap"
    }

    fn readiness(&self) -> Locator {
        Self::login_link()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}

/// Federated login broker, listing the identity providers.
pub struct ProviderChooserPage<'a> {
    ctx: &'a PageContext,
    provider: String,
}

impl<'a> ProviderChooserPage<'a> {
    pub fn new(ctx: &'a PageContext, provider: impl Into<String>) -> Self {
        Self {
            ctx,
            provider: provider.into(),
        }
    }

    fn provider_button(&self) -> Locator {
        Locator::partial_button_text(&self.provider)
    }

    /// Wait out the period in which the provider buttons ignore clicks.
    pub async fn settle(self) -> Self {
        self.ctx.settle(self.ctx.timeouts().provider_settle()).await;
        self
    }

    pub async fn choose_provider(self) -> Result<CredentialsPage<'a>> {
        info!(provider = %self.provider, "Choosing identity provider");
        self.ctx.find(&self.provider_button()).await?.click().await?;
        Ok(CredentialsPage::new(self.ctx))
    }
}

impl Screen for ProviderChooserPage<'_> {
    fn name(&self) -> &'static str {
        "KAÜ"
    }

    fn readiness(&self) -> Locator {
        self.provider_button()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}

/// Identity provider's username/password form.
pub struct CredentialsPage<'a> {
    ctx: &'a PageContext,
}

impl<'a> CredentialsPage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    fn login_button() -> Locator {
        Locator::button_text("bejelentkezés")
    }

    fn username_input() -> Locator {
        Locator::name("felhasznaloNev")
    }

    fn password_input() -> Locator {
        Locator::name("jelszo")
    }

    pub async fn login(self, credentials: &Credentials) -> Result<WelcomePage<'a>> {
        let username = self.ctx.find(&Self::username_input()).await?;
        let password = self.ctx.find(&Self::password_input()).await?;
        let submit = self.ctx.find(&Self::login_button()).await?;

        info!(username = %credentials.username, "Logging in");
        username.type_text(&credentials.username).await?;
        password.type_text(&credentials.password).await?;
        submit.click().await?;
        Ok(WelcomePage::new(self.ctx))
    }
}

impl Screen for CredentialsPage<'_> {
    fn name(&self) -> &'static str {
        "KAÜ Login"
    }

    fn readiness(&self) -> Locator {
        Self::login_button()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}

/// Landing page after authentication.
pub struct WelcomePage<'a> {
    ctx: &'a PageContext,
}

impl<'a> WelcomePage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    fn start_case_link() -> Locator {
        Locator::partial_link_text("ÜGYINDÍTÁS")
    }

    pub async fn start_case(self) -> Result<CaseSelectionPage<'a>> {
        self.ctx.find(&Self::start_case_link()).await?.click().await?;
        Ok(CaseSelectionPage::new(self.ctx))
    }
}

impl Screen for WelcomePage<'_> {
    fn name(&self) -> &'static str {
        "Nyitólap bejelentkezve"
    }

    fn readiness(&self) -> Locator {
        Self::start_case_link()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}
