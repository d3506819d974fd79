//! Line-oriented console for poking at the session after a run has stopped.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::dialog::{Overlay, OverlayKind};
use crate::error::Result;
use crate::operator::Operator;
use crate::session::{Locator, Session};

const HELP: &str = "\
commands:
  url                 current URL
  title               document title
  html                markup of the current document
  text <css>          text of the first match
  click <css>         click the first match
  eval <js>           evaluate a JavaScript expression
  screenshot <path>   save a PNG of the viewport
  frame <css>         switch into a frame
  top                 switch back to the top document
  overlay             show any open modal or alert
  help                this text
  quit                leave the console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Url,
    Title,
    Html,
    Text(String),
    Click(String),
    Eval(String),
    Screenshot(PathBuf),
    Frame(String),
    Top,
    Overlay,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = |what: &str| {
            if rest.is_empty() {
                Err(format!("{word} needs {what}"))
            } else {
                Ok(rest.to_string())
            }
        };
        match word {
            "url" => Ok(Command::Url),
            "title" => Ok(Command::Title),
            "html" => Ok(Command::Html),
            "text" => argument("a CSS selector").map(Command::Text),
            "click" => argument("a CSS selector").map(Command::Click),
            "eval" => argument("an expression").map(Command::Eval),
            "screenshot" => argument("a file path").map(|p| Command::Screenshot(p.into())),
            "frame" => argument("a CSS selector").map(Command::Frame),
            "top" => Ok(Command::Top),
            "overlay" => Ok(Command::Overlay),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command `{other}`, try `help`")),
        }
    }
}

/// Read and run commands until the operator quits or input ends.
pub async fn run_console(session: &dyn Session, operator: &dyn Operator) {
    info!("Entering recovery console");
    operator.show(HELP).await;
    while let Some(line) = operator.read_command().await {
        let command = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    operator.show(&message).await;
                }
                continue;
            }
        };
        match execute(session, &command).await {
            Ok(output) => operator.show(&output).await,
            Err(e) => {
                warn!(?command, "Recovery command failed: {e}");
                operator.show(&format!("error: {e}")).await;
            }
        }
    }
    info!("Leaving recovery console");
}

pub async fn execute(session: &dyn Session, command: &Command) -> Result<String> {
    match command {
        Command::Url => session.current_url().await,
        Command::Title => session.title().await,
        Command::Html => session.html().await,
        Command::Text(selector) => {
            let element = session.find_element(&Locator::css(selector)).await?;
            session.text(element).await
        }
        Command::Click(selector) => {
            let element = session.find_element(&Locator::css(selector)).await?;
            session.click(element).await?;
            Ok("clicked".into())
        }
        Command::Eval(expression) => session.evaluate(expression).await,
        Command::Screenshot(path) => {
            session.screenshot_to_file(path).await?;
            Ok(format!("saved {}", path.display()))
        }
        Command::Frame(selector) => {
            if session.switch_to_frame(&Locator::css(selector)).await? {
                Ok("switched".into())
            } else {
                Ok("frame not available".into())
            }
        }
        Command::Top => {
            session.switch_to_default().await?;
            Ok("switched to top document".into())
        }
        Command::Overlay => describe_overlays(session).await,
        Command::Help => Ok(HELP.into()),
        Command::Quit => Ok(String::new()),
    }
}

async fn describe_overlays(session: &dyn Session) -> Result<String> {
    let mut lines = Vec::new();
    for kind in [OverlayKind::Modal, OverlayKind::Alert] {
        if let Some(overlay) = Overlay::find(session, kind).await? {
            lines.push(format!(
                "{}: '{}'\n{}",
                kind.label(),
                overlay.header().await?,
                overlay.body().await?
            ));
        }
    }
    if lines.is_empty() {
        Ok("no overlay open".into())
    } else {
        Ok(lines.join("\n"))
    }
}
