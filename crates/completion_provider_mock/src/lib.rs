//! Deterministic mock implementation of the shared `completion_provider` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing. Replies are taken from
//! a script first; once the script is exhausted a canned answer is built from
//! the last user message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use completion_provider::{
    CompletionError, CompletionProvider, CompletionReply, CompletionRequest, ProviderProfile, Role,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

const HOLD_POLL_MS: u64 = 5;

/// One scripted result consumed by a single `complete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Reply(String),
    Empty,
    Fail(CompletionError),
    /// Panics inside `complete`, for exercising worker isolation.
    Panic,
}

impl MockOutcome {
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }

    #[must_use]
    pub fn http_status(status: u16, status_text: impl Into<String>) -> Self {
        Self::Fail(CompletionError::RequestFailed {
            status,
            status_text: status_text.into(),
        })
    }
}

/// Releases completions parked by [`MockProvider::hold`].
#[derive(Debug, Clone)]
pub struct MockRelease {
    held: Arc<AtomicBool>,
}

impl MockRelease {
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

/// Deterministic mock provider used by `code_assistant` tests and local runs.
#[derive(Debug)]
pub struct MockProvider {
    model_id: String,
    script: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<CompletionRequest>>,
    held: Arc<AtomicBool>,
    delay: Duration,
}

impl MockProvider {
    /// Creates a mock provider that answers from `script` before falling back
    /// to canned replies.
    #[must_use]
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            model_id: "mock".to_string(),
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            held: Arc::new(AtomicBool::new(false)),
            delay: Duration::ZERO,
        }
    }

    /// Sleeps for `delay` before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let trimmed = model_id.trim();
        if !trimmed.is_empty() {
            self.model_id = trimmed.to_string();
        }
        self
    }

    /// Parks every subsequent `complete` call until the returned handle is released.
    #[must_use]
    pub fn hold(&self) -> MockRelease {
        self.held.store(true, Ordering::SeqCst);
        MockRelease {
            held: Arc::clone(&self.held),
        }
    }

    /// Requests observed so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    fn wait_while_held(&self) {
        while self.held.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(HOLD_POLL_MS));
        }
    }
}

impl CompletionProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn complete(&self, request: &CompletionRequest) -> Result<CompletionReply, CompletionError> {
        lock_unpoisoned(&self.requests).push(request.clone());

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.wait_while_held();

        let scripted = lock_unpoisoned(&self.script).pop_front();
        match scripted {
            Some(MockOutcome::Reply(text)) => Ok(CompletionReply::Text(text)),
            Some(MockOutcome::Empty) => Ok(CompletionReply::Empty),
            Some(MockOutcome::Fail(error)) => Err(error),
            Some(MockOutcome::Panic) => panic!("mock provider scripted panic"),
            None => Ok(CompletionReply::Text(canned_reply(request))),
        }
    }
}

fn canned_reply(request: &CompletionRequest) -> String {
    let prompt = request
        .messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.as_str())
        .unwrap_or_default();
    let summary = prompt.lines().next().unwrap_or_default().trim();

    format!(
        "Here is a starting point for: {summary}\n\n```html\n<section class=\"mock\">\n  <p>{summary}</p>\n</section>\n```\n\nAdjust the markup to fit your layout."
    )
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use completion_provider::{CompletionOptions, Message};

    use super::*;

    fn request(id: u64, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            request_id: id,
            messages: vec![Message::system("rules"), Message::user(prompt)],
            options: CompletionOptions::new("mock", 0.5, 1024),
        }
    }

    #[test]
    fn profile_exposes_explicit_mock_provider_identity() {
        let profile = MockProvider::new(Vec::new()).profile();

        assert_eq!(profile.provider_id, MOCK_PROVIDER_ID);
        assert_eq!(profile.model_id, "mock");
    }

    #[test]
    fn blank_model_override_keeps_default() {
        let provider = MockProvider::new(Vec::new()).with_model_id("   ");
        assert_eq!(provider.profile().model_id, "mock");
    }

    #[test]
    fn scripted_outcomes_are_consumed_in_order() {
        let provider = MockProvider::new(vec![
            MockOutcome::reply("Hi there"),
            MockOutcome::Empty,
            MockOutcome::http_status(503, "Service Unavailable"),
        ]);

        assert_eq!(
            provider.complete(&request(1, "hello")),
            Ok(CompletionReply::Text("Hi there".to_string()))
        );
        assert_eq!(
            provider.complete(&request(2, "again")),
            Ok(CompletionReply::Empty)
        );
        assert_eq!(
            provider
                .complete(&request(3, "fail"))
                .expect_err("scripted failure")
                .to_string(),
            "API request failed: Service Unavailable"
        );
        assert_eq!(provider.request_count(), 3);
    }

    #[test]
    fn exhausted_script_falls_back_to_fenced_canned_reply() {
        let provider = MockProvider::new(Vec::new());

        let reply = provider
            .complete(&request(1, "build a navbar\nwith links"))
            .expect("canned reply")
            .into_text_or("");

        assert!(reply.contains("build a navbar"));
        assert!(reply.contains("```html\n"));
    }

    #[test]
    fn requests_are_recorded_with_full_history() {
        let provider = MockProvider::new(Vec::new());
        provider.complete(&request(4, "hello")).expect("reply");

        let observed = provider.requests();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].request_id, 4);
        assert_eq!(observed[0].messages.len(), 2);
    }

    #[test]
    fn hold_parks_completion_until_released() {
        let provider = Arc::new(MockProvider::new(vec![MockOutcome::reply("late")]));
        let release = provider.hold();
        let (tx, rx) = mpsc::channel();

        let worker = {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                let reply = provider.complete(&request(1, "wait"));
                tx.send(reply).expect("send reply");
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        release.release();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).expect("reply after release"),
            Ok(CompletionReply::Text("late".to_string()))
        );
        worker.join().expect("worker joins");
    }
}
