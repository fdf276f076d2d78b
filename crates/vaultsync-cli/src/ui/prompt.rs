//! Delete confirmation prompt backed by the terminal.

use dialoguer::Input;
use std::io;
use vaultsync_engine::Prompt;

/// Reads one line per question from the terminal.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn read_response(&mut self, message: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(message.trim_end().trim_end_matches(':'))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
