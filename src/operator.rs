//! The human in the loop.
//!
//! The robot asks its operator exactly three kinds of question: whether to keep
//! polling after a timeout, when manual form edits are done, and whether to
//! inspect the session before quitting. The recovery console reads its commands
//! through the same channel.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// What to do once the workflow has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryChoice {
    Console,
    Quit,
}

impl RecoveryChoice {
    pub fn from_answer(answer: &str) -> Self {
        if answer.trim().eq_ignore_ascii_case("c") {
            RecoveryChoice::Console
        } else {
            RecoveryChoice::Quit
        }
    }
}

/// Only an explicit `y` keeps polling; anything else, including an empty
/// answer, gives up.
pub fn is_retry_answer(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

#[async_trait]
pub trait Operator: Send + Sync {
    /// Report that waiting for `what` timed out and ask whether to poll again
    /// with the same timeout.
    async fn confirm_retry(&self, what: &str, timeout: Duration) -> bool;

    /// Block until the operator says the manual form edits are complete.
    /// `false` means the operator can no longer answer (input closed).
    async fn await_manual_edits(&self) -> bool;

    async fn offer_recovery(&self) -> RecoveryChoice;

    /// Read one recovery console command. `None` ends the console.
    async fn read_command(&self) -> Option<String>;

    /// Show recovery console output.
    async fn show(&self, text: &str);
}

/// Operator on the process's own terminal.
pub struct ConsoleOperator {
    stdin: Mutex<BufReader<Stdin>>,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;

        let mut line = String::new();
        let read = self.stdin.lock().await.read_line(&mut line).await.ok()?;
        if read == 0 {
            return None;
        }
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    async fn confirm_retry(&self, what: &str, timeout: Duration) -> bool {
        self.show(&format!(
            "Waiting for this condition timed out after {}s: {what}.",
            timeout.as_secs_f32()
        ))
        .await;
        match self.ask("Would you like to try again? [Y/n]> ").await {
            Some(answer) => is_retry_answer(&answer),
            None => false,
        }
    }

    async fn await_manual_edits(&self) -> bool {
        self.ask("Fill in the form, hit ENTER when you are done > ")
            .await
            .is_some()
    }

    async fn offer_recovery(&self) -> RecoveryChoice {
        match self
            .ask("Type C and ENTER to start interactive console or hit ENTER to quit > ")
            .await
        {
            Some(answer) => RecoveryChoice::from_answer(&answer),
            None => RecoveryChoice::Quit,
        }
    }

    async fn read_command(&self) -> Option<String> {
        self.ask("robot> ").await
    }

    async fn show(&self, text: &str) {
        let mut stdout = tokio::io::stdout();
        let _ = stdout.write_all(text.as_bytes()).await;
        let _ = stdout.write_all(b"\n").await;
        let _ = stdout.flush().await;
    }
}
