use std::io::{self, BufRead, Write};

use tracing::warn;

/// Operator interaction between acquisition stages.
pub trait OperatorConsole {
    /// Shows `message` and blocks until the operator confirms.
    fn confirm(&mut self, message: &str);

    fn notify(&mut self, message: &str);
}

/// Prompts on stdout and waits for Enter on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConsole;

impl OperatorConsole for StdinConsole {
    fn confirm(&mut self, message: &str) {
        print!("{message} Press Enter to continue...");
        if let Err(e) = io::stdout().flush() {
            warn!("Failed to flush prompt: {}", e);
        }

        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            warn!("Failed to read operator confirmation: {}", e);
        }
    }

    fn notify(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Confirms every prompt immediately and keeps a transcript.
#[derive(Debug, Default, Clone)]
pub struct AutoConfirm {
    prompts: Vec<String>,
    notices: Vec<String>,
}

impl AutoConfirm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl OperatorConsole for AutoConfirm {
    fn confirm(&mut self, message: &str) {
        self.prompts.push(message.to_string());
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
