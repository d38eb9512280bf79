//! Per-flow request state and the admission gate.

use completion_provider::RequestId;

use crate::conversation::Conversation;
use crate::image::ImageUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Chat,
    Image,
}

impl FlowKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingCompletion {
        request_id: RequestId,
    },
}

impl FlowState {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// When a new request may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    /// One request at a time across both flows.
    #[default]
    Serialized,
    /// Each flow admits while it is itself idle.
    Independent,
}

impl AdmissionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "serialized" => Some(Self::Serialized),
            "independent" => Some(Self::Independent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serialized => "serialized",
            Self::Independent => "independent",
        }
    }
}

/// Work handed to the host when a flow is admitted.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowRequest {
    /// Full history, system message first, ending with the new user turn.
    Chat { history: Conversation },
    Image { upload: ImageUpload },
}

impl FlowRequest {
    pub fn kind(&self) -> FlowKind {
        match self {
            Self::Chat { .. } => FlowKind::Chat,
            Self::Image { .. } => FlowKind::Image,
        }
    }
}

/// Tracks both flows and decides admission under a policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdmissionGate {
    policy: AdmissionPolicy,
    chat: FlowState,
    image: FlowState,
}

impl AdmissionGate {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    pub fn state(&self, kind: FlowKind) -> FlowState {
        match kind {
            FlowKind::Chat => self.chat,
            FlowKind::Image => self.image,
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.chat.is_idle() || !self.image.is_idle()
    }

    pub fn admits(&self, kind: FlowKind) -> bool {
        match self.policy {
            AdmissionPolicy::Serialized => !self.is_busy(),
            AdmissionPolicy::Independent => self.state(kind).is_idle(),
        }
    }

    pub fn begin(&mut self, kind: FlowKind, request_id: RequestId) {
        *self.slot(kind) = FlowState::AwaitingCompletion { request_id };
    }

    /// Returns the flow to idle when `request_id` is the one it awaits.
    ///
    /// Returns false for stale or unknown ids, leaving state untouched.
    pub fn finish(&mut self, kind: FlowKind, request_id: RequestId) -> bool {
        let slot = self.slot(kind);
        if *slot != (FlowState::AwaitingCompletion { request_id }) {
            return false;
        }

        *slot = FlowState::Idle;
        true
    }

    fn slot(&mut self, kind: FlowKind) -> &mut FlowState {
        match kind {
            FlowKind::Chat => &mut self.chat,
            FlowKind::Image => &mut self.image,
        }
    }
}
