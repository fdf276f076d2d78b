//! Confirmation-gated deletion.

use crate::tasks::DeleteTask;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vaultsync_types::{Result, SyncError, VaultBackend};

/// Source of operator answers.
///
/// Reads may block; [`DeleteReviewer`] calls them on the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt: Send {
    /// Show `message` and read one line of input.
    fn read_response(&mut self, message: &str) -> std::io::Result<String>;
}

/// Ask a yes/no question, allowing at most `max_attempts` answers.
///
/// Only the first character of the trimmed answer counts, case-insensitively.
/// Anything other than `y` or `n`, including a read error, uses up an
/// attempt. Running out of attempts means "no".
pub fn ask_for_confirmation(prompt: &mut dyn Prompt, message: &str, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        let response = match prompt.read_response(message) {
            Ok(response) => response,
            Err(e) => {
                debug!("Failed to read confirmation: {}", e);
                continue;
            }
        };

        match response.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => return true,
            Some('n') => return false,
            _ => warn!("Invalid response."),
        }
    }

    warn!("Max number of invalid confirmations reached, exiting with 'n' response");
    false
}

/// Outcome of a review pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Paths deleted after confirmation
    pub deleted: Vec<String>,
    /// Paths the operator chose to keep
    pub kept: Vec<String>,
}

/// Presents delete candidates to the operator one at a time.
pub struct DeleteReviewer {
    backend: Arc<dyn VaultBackend>,
    prompt: Arc<Mutex<Box<dyn Prompt>>>,
    max_attempts: u32,
}

impl DeleteReviewer {
    /// Create a reviewer.
    pub fn new(backend: Arc<dyn VaultBackend>, prompt: Box<dyn Prompt>, max_attempts: u32) -> Self {
        Self {
            backend,
            prompt: Arc::new(Mutex::new(prompt)),
            max_attempts,
        }
    }

    async fn confirm(&self, message: String) -> Result<bool> {
        let prompt = self.prompt.clone();
        let max_attempts = self.max_attempts;

        tokio::task::spawn_blocking(move || {
            let mut prompt = prompt.lock();
            ask_for_confirmation(prompt.as_mut(), &message, max_attempts)
        })
        .await
        .map_err(|e| SyncError::Bug(format!("confirmation prompt failed: {}", e)))
    }

    /// Review `tasks` sequentially.
    ///
    /// # Errors
    ///
    /// A confirmed delete that fails at the backend is fatal.
    pub async fn review(&mut self, tasks: Vec<DeleteTask>) -> Result<ReviewSummary> {
        let mut summary = ReviewSummary::default();

        for task in tasks {
            let message = format!("{} does not exist in configuration.  Delete [y/n]?: ", task.description);

            if self.confirm(message).await? {
                self.backend.delete(&task.path).await.map_err(|e| {
                    SyncError::Vault(format!("Failed to delete {}: {}", task.description, e))
                })?;
                info!("Deleted {}", task.description);
                summary.deleted.push(task.path);
            } else {
                warn!("Leaving {} even though it is not in configuration", task.description);
                summary.kept.push(task.path);
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, FakeVault};
    use mockall::predicate::*;
    use mockall::Sequence;

    fn answers(responses: &[&'static str]) -> MockPrompt {
        let mut prompt = MockPrompt::new();
        let mut seq = Sequence::new();
        for &response in responses {
            prompt
                .expect_read_response()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(response.to_string()));
        }
        prompt
    }

    #[test]
    fn test_first_character_decides() {
        assert!(ask_for_confirmation(&mut answers(&["yes please"]), "?", 3));
        assert!(ask_for_confirmation(&mut answers(&["Y"]), "?", 3));
        assert!(!ask_for_confirmation(&mut answers(&["  nope"]), "?", 3));
    }

    #[test]
    fn test_invalid_answers_retry_then_default_to_no() {
        assert!(ask_for_confirmation(&mut answers(&["maybe", "", "y"]), "?", 3));
        assert!(!ask_for_confirmation(&mut answers(&["maybe", "what", "sure"]), "?", 3));
    }

    #[test]
    fn test_read_errors_use_attempts() {
        let mut prompt = MockPrompt::new();
        prompt
            .expect_read_response()
            .with(eq("Delete?"))
            .times(2)
            .returning(|_| Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof")));

        assert!(!ask_for_confirmation(&mut prompt, "Delete?", 2));
    }

    #[tokio::test]
    async fn test_review_deletes_and_keeps() {
        let fake = Arc::new(FakeVault::new().with_auth("a", "ldap").with_auth("b", "ldap"));
        let mut reviewer = DeleteReviewer::new(fake.clone(), Box::new(answers(&["y", "n"])), 3);

        let summary = reviewer
            .review(vec![
                DeleteTask::new("sys/auth/a", "Auth method [sys/auth/a]"),
                DeleteTask::new("sys/auth/b", "Auth method [sys/auth/b]"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.deleted, vec!["sys/auth/a"]);
        assert_eq!(summary.kept, vec!["sys/auth/b"]);
        assert!(!fake.has_auth("a"));
        assert!(fake.has_auth("b"));
        assert_eq!(fake.events(), vec![Event::Delete("sys/auth/a".to_string())]);
    }

    #[tokio::test]
    async fn test_prompt_reads_off_the_runtime_thread() {
        let runtime_thread = std::thread::current().id();
        let mut prompt = MockPrompt::new();
        prompt
            .expect_read_response()
            .times(1)
            .returning(move |_| {
                assert_ne!(std::thread::current().id(), runtime_thread);
                Ok("n".to_string())
            });

        let fake = Arc::new(FakeVault::new().with_auth("a", "ldap"));
        let mut reviewer = DeleteReviewer::new(fake.clone(), Box::new(prompt), 3);
        let summary = reviewer
            .review(vec![DeleteTask::new("sys/auth/a", "Auth method [sys/auth/a]")])
            .await
            .unwrap();

        assert_eq!(summary.kept, vec!["sys/auth/a"]);
        assert!(fake.has_auth("a"));
    }
}
