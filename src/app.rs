use completion_provider::{Message, RequestId};

use crate::conversation::Conversation;
use crate::extract::{extract_code, ExtractMode};
use crate::flow::{AdmissionGate, AdmissionPolicy, FlowKind, FlowRequest, FlowState};
use crate::image::ImageUpload;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an intelligent AI coding assistant.";
pub const IMAGE_COMPLETE_STATUS: &str = "Image-to-code processing complete. See code below.";
pub const IMAGE_CONVERTED_MESSAGE: &str = "Image design converted to code.";
pub const BUSY_NOTICE: &str = "A request is already in progress. Please wait for it to finish.";
pub const ERROR_REQUEST_ALREADY_ACTIVE: &str = "Request already active";

/// Result of a user-initiated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to send.
    Ignored,
    /// The admission gate was closed; nothing changed but the notice.
    Rejected,
    Dispatched { request_id: RequestId },
    /// The host could not start the request; the flow is idle again.
    DispatchFailed(String),
}

pub trait HostOps {
    fn start_completion(&mut self, request: FlowRequest) -> Result<RequestId, String>;
    fn request_render(&mut self);
    fn request_stop(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub input: String,
    conversation: Conversation,
    /// Latest extracted code; replaced on every completed response.
    pub code: String,
    pub uploaded_image: Option<ImageUpload>,
    pub image_status: Option<String>,
    /// Transient message for the view, e.g. a rejected submission.
    pub notice: Option<String>,
    image_selections: u64,
    gate: AdmissionGate,
    pub should_exit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, AdmissionPolicy::default())
    }
}

impl App {
    pub fn new(system_prompt: &str, policy: AdmissionPolicy) -> Self {
        Self {
            input: String::new(),
            conversation: Conversation::initial(system_prompt),
            code: String::new(),
            uploaded_image: None,
            image_status: None,
            notice: None,
            image_selections: 0,
            gate: AdmissionGate::new(policy),
            should_exit: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn flow_state(&self, kind: FlowKind) -> FlowState {
        self.gate.state(kind)
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        self.gate.policy()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Whether a chat submission would currently be admitted.
    pub fn can_submit(&self) -> bool {
        self.gate.admits(FlowKind::Chat)
    }

    /// Count of accepted image selections, including re-selections of the same file.
    pub fn image_selections(&self) -> u64 {
        self.image_selections
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn on_input_replace(&mut self, text: String) {
        self.input = text;
    }

    pub fn on_submit(&mut self, host: &mut dyn HostOps) -> SubmitOutcome {
        if self.input.trim().is_empty() {
            self.input.clear();
            host.request_render();
            return SubmitOutcome::Ignored;
        }

        if !self.gate.admits(FlowKind::Chat) {
            self.notice = Some(BUSY_NOTICE.to_string());
            host.request_render();
            return SubmitOutcome::Rejected;
        }

        let content = std::mem::take(&mut self.input);
        self.notice = None;
        self.conversation = self.conversation.append(Message::user(content));

        let request = FlowRequest::Chat {
            history: self.conversation.clone(),
        };
        let outcome = match host.start_completion(request) {
            Ok(request_id) => {
                self.gate.begin(FlowKind::Chat, request_id);
                SubmitOutcome::Dispatched { request_id }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to start chat completion");
                self.append_assistant(format!("Error: {error}"));
                SubmitOutcome::DispatchFailed(error)
            }
        };

        host.request_render();
        outcome
    }

    pub fn on_image_selected(
        &mut self,
        upload: ImageUpload,
        host: &mut dyn HostOps,
    ) -> SubmitOutcome {
        if !self.gate.admits(FlowKind::Image) {
            self.notice = Some(BUSY_NOTICE.to_string());
            host.request_render();
            return SubmitOutcome::Rejected;
        }

        self.notice = None;
        self.image_selections += 1;
        self.uploaded_image = Some(upload.clone());
        self.image_status = None;
        self.code.clear();

        let outcome = match host.start_completion(FlowRequest::Image { upload }) {
            Ok(request_id) => {
                self.gate.begin(FlowKind::Image, request_id);
                SubmitOutcome::Dispatched { request_id }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to start image completion");
                self.image_status = Some(format!("Error: {error}"));
                SubmitOutcome::DispatchFailed(error)
            }
        };

        host.request_render();
        outcome
    }

    pub fn on_completion_resolved(&mut self, kind: FlowKind, request_id: RequestId, text: &str) {
        if !self.gate.finish(kind, request_id) {
            tracing::debug!(flow = kind.label(), request_id, "ignoring stale completion");
            return;
        }

        match kind {
            FlowKind::Chat => {
                self.append_assistant(text.to_string());
                self.code = extract_code(text, ExtractMode::Chat);
            }
            FlowKind::Image => {
                self.code = extract_code(text, ExtractMode::Image);
                self.image_status = Some(IMAGE_COMPLETE_STATUS.to_string());
                self.append_assistant(IMAGE_CONVERTED_MESSAGE.to_string());
            }
        }
    }

    pub fn on_completion_failed(&mut self, kind: FlowKind, request_id: RequestId, error: &str) {
        if !self.gate.finish(kind, request_id) {
            tracing::debug!(flow = kind.label(), request_id, "ignoring stale failure");
            return;
        }

        match kind {
            FlowKind::Chat => self.append_assistant(format!("Error: {error}")),
            FlowKind::Image => self.image_status = Some(format!("Error: {error}")),
        }
    }

    pub fn on_quit(&mut self, host: &mut dyn HostOps) {
        self.should_exit = true;
        host.request_stop();
        host.request_render();
    }

    fn append_assistant(&mut self, content: String) {
        self.conversation = self.conversation.append(Message::assistant(content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingHost;

    impl HostOps for FailingHost {
        fn start_completion(&mut self, _request: FlowRequest) -> Result<RequestId, String> {
            Err("Failed to spawn completion worker: no threads".to_string())
        }

        fn request_render(&mut self) {}

        fn request_stop(&mut self) {}
    }

    #[test]
    fn default_app_starts_idle_with_system_prompt() {
        let app = App::default();

        assert_eq!(app.conversation().system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(app.conversation().len(), 1);
        assert!(!app.is_busy());
        assert!(app.can_submit());
        assert_eq!(app.admission_policy(), AdmissionPolicy::Serialized);
    }

    #[test]
    fn chat_dispatch_failure_becomes_error_message_and_stays_idle() {
        let mut app = App::default();
        app.on_input_replace("hello".to_string());

        let outcome = app.on_submit(&mut FailingHost);

        assert!(matches!(outcome, SubmitOutcome::DispatchFailed(_)));
        assert_eq!(app.conversation().len(), 3);
        assert_eq!(
            app.conversation().last().map(|message| message.content.as_str()),
            Some("Error: Failed to spawn completion worker: no threads")
        );
        assert!(!app.is_busy());
    }

    #[test]
    fn image_dispatch_failure_sets_status_only() {
        let mut app = App::default();
        let upload = ImageUpload::new("a.png", crate::image::ImageMime::Png, vec![1_u8]);

        let outcome = app.on_image_selected(upload, &mut FailingHost);

        assert!(matches!(outcome, SubmitOutcome::DispatchFailed(_)));
        assert_eq!(app.conversation().len(), 1);
        assert!(app
            .image_status
            .as_deref()
            .is_some_and(|status| status.starts_with("Error: ")));
        assert!(!app.is_busy());
    }
}
