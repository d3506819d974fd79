//! ifa-robot - files the tourism-tax case on the e-government portal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use ifa_robot::recovery::run_console;
use ifa_robot::{
    ChapterSet, ConsoleOperator, Operator, PortalBrowser, RecoveryChoice, RobotConfig, Session,
    Workflow,
};

/// Log in to the portal, open the tourism-tax form and fill it in
#[derive(Parser)]
#[command(name = "ifa-robot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file with credentials under [DEFAULT]
    #[arg(long, default_value = "ifa-robot.toml", env = "IFA_ROBOT_CONFIG")]
    config: PathBuf,

    /// Field tables, one [[chapter]] per form chapter
    #[arg(long, default_value = "form-data.toml", env = "IFA_ROBOT_FIELDS")]
    fields: PathBuf,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let mut config = RobotConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let chapters = ChapterSet::load(&cli.fields)
        .with_context(|| format!("loading {}", cli.fields.display()))?;
    if cli.headless {
        config.browser.headless = true;
    }

    let browser = config
        .browser
        .builder()
        .build()
        .await
        .context("starting Chrome")?;
    let session: Arc<dyn Session> = Arc::new(browser.open_session().await?);
    let operator: Arc<dyn Operator> = Arc::new(ConsoleOperator::new());

    let mut workflow = Workflow::new(session.clone(), operator.clone(), config, chapters);
    let exit_code = match workflow.run().await {
        Ok(outcome) => {
            info!(
                attempts = outcome.submission_attempts,
                alert = ?outcome.alert,
                "Workflow finished"
            );
            0
        }
        Err(e) => {
            error!(stage = ?workflow.state().stage, "Workflow failed: {e:#}");
            e.exit_code()
        }
    };

    if operator.offer_recovery().await == RecoveryChoice::Console {
        run_console(session.as_ref(), operator.as_ref()).await;
    }

    drop(workflow);
    drop(session);
    shutdown(browser).await;

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn shutdown(browser: PortalBrowser) {
    if let Err(e) = browser.close().await {
        error!("Failed to close the browser: {e}");
    }
}
