//! Core model client trait and test double
//!
//! The generation call is a soft contract: any transport, auth, or
//! response-shape failure yields "no text" rather than an error the retry
//! loop must unwind through. The orchestrator counts a no-text attempt as a
//! failure and keeps going.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

/// One generation call. Stateless: each attempt sends a fresh prompt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Ask the model for a parsing script.
    ///
    /// `feedback` carries the previous attempt's failure message; `None` on
    /// the first attempt. Returns `None` on any hard failure of this call.
    async fn generate(
        &self,
        prompt: &str,
        sample_line: &str,
        feedback: Option<&str>,
        project_id: &str,
    ) -> Option<String>;
}

/// Scripted model client for tests
///
/// Returns queued responses in order; once exhausted, returns `None`.
/// Records the feedback passed to each call so tests can assert that failure
/// messages thread into subsequent prompts.
pub struct MockModelClient {
    responses: Mutex<VecDeque<Option<String>>>,
    seen_feedback: Mutex<Vec<Option<String>>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<Option<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen_feedback: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: a client that always returns the same text
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            responses: Mutex::new(std::iter::repeat_with(|| Some(text.clone())).take(64).collect()),
            seen_feedback: Mutex::new(Vec::new()),
        }
    }

    /// Number of generate calls made so far
    pub fn calls(&self) -> usize {
        self.seen_feedback.lock().unwrap().len()
    }

    /// Feedback argument of each call, in order
    pub fn feedback_history(&self) -> Vec<Option<String>> {
        self.seen_feedback.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(
        &self,
        _prompt: &str,
        _sample_line: &str,
        feedback: Option<&str>,
        _project_id: &str,
    ) -> Option<String> {
        self.seen_feedback
            .lock()
            .unwrap()
            .push(feedback.map(|f| f.to_string()));
        self.responses.lock().unwrap().pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_queued_responses_in_order() {
        let mock = MockModelClient::new(vec![Some("first".into()), None, Some("third".into())]);

        assert_eq!(mock.generate("p", "s", None, "proj").await.as_deref(), Some("first"));
        assert_eq!(mock.generate("p", "s", None, "proj").await, None);
        assert_eq!(mock.generate("p", "s", None, "proj").await.as_deref(), Some("third"));
        // Exhausted
        assert_eq!(mock.generate("p", "s", None, "proj").await, None);
        assert_eq!(mock.calls(), 4);
    }

    #[tokio::test]
    async fn test_mock_records_feedback() {
        let mock = MockModelClient::new(vec![Some("a".into()), Some("b".into())]);
        mock.generate("p", "s", None, "proj").await;
        mock.generate("p", "s", Some("boom"), "proj").await;

        let history = mock.feedback_history();
        assert_eq!(history, vec![None, Some("boom".to_string())]);
    }

    #[tokio::test]
    async fn test_always_client() {
        let mock = MockModelClient::always("code");
        assert_eq!(mock.generate("p", "s", None, "proj").await.as_deref(), Some("code"));
        assert_eq!(mock.generate("p", "s", None, "proj").await.as_deref(), Some("code"));
    }
}
