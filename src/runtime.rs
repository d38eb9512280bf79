use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use completion_provider::RequestId;

use crate::app::{App, HostOps, ERROR_REQUEST_ALREADY_ACTIVE};
use crate::client::CompletionClient;
use crate::flow::{FlowKind, FlowRequest};

/// Called from worker threads when the event queue goes from empty to non-empty.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

const PANIC_ERROR: &str = "Completion provider panicked";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    Resolved {
        flow: FlowKind,
        request_id: RequestId,
        text: String,
    },
    Failed {
        flow: FlowKind,
        request_id: RequestId,
        error: String,
    },
}

impl CompletionEvent {
    fn flow(&self) -> FlowKind {
        match self {
            Self::Resolved { flow, .. } | Self::Failed { flow, .. } => *flow,
        }
    }

    fn request_id(&self) -> RequestId {
        match self {
            Self::Resolved { request_id, .. } | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

struct ActiveRequest {
    request_id: RequestId,
    join_handle: Option<JoinHandle<()>>,
}

pub struct RuntimeController {
    app: Arc<Mutex<App>>,
    client: Arc<CompletionClient>,
    pending_events: Mutex<VecDeque<CompletionEvent>>,
    next_request_id: AtomicU64,
    active: Mutex<HashMap<FlowKind, ActiveRequest>>,
    waker: Waker,
    render_requested: AtomicBool,
    stop_requested: AtomicBool,
}

impl RuntimeController {
    /// Creates a controller that buffers completion events before applying them to `App`.
    ///
    /// Events are applied only by [`RuntimeController::flush_pending_events`], which the
    /// view calls after `waker` fires.
    pub fn new(app: Arc<Mutex<App>>, client: Arc<CompletionClient>, waker: Waker) -> Arc<Self> {
        Arc::new(Self {
            app,
            client,
            pending_events: Mutex::new(VecDeque::new()),
            next_request_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
            waker,
            render_requested: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        })
    }

    fn start_completion_internal(
        self: &Arc<Self>,
        request: FlowRequest,
    ) -> Result<RequestId, String> {
        let kind = request.kind();
        let mut active = self.lock_active();
        if active.contains_key(&kind) {
            return Err(ERROR_REQUEST_ALREADY_ACTIVE.to_string());
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let join_handle = self.spawn_worker(request, request_id)?;
        tracing::info!(flow = kind.label(), request_id, "completion dispatched");

        active.insert(
            kind,
            ActiveRequest {
                request_id,
                join_handle: Some(join_handle),
            },
        );

        Ok(request_id)
    }

    fn spawn_worker(
        self: &Arc<Self>,
        request: FlowRequest,
        request_id: RequestId,
    ) -> Result<JoinHandle<()>, String> {
        let controller = Arc::clone(self);
        thread::Builder::new()
            .name(format!(
                "code-assistant-{}-{request_id}",
                request.kind().label()
            ))
            .spawn(move || controller.run_worker(request, request_id))
            .map_err(|error| format!("Failed to spawn completion worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, request: FlowRequest, request_id: RequestId) {
        let flow = request.kind();
        let client = Arc::clone(&self.client);

        let outcome = catch_unwind(AssertUnwindSafe(|| match &request {
            FlowRequest::Chat { history } => client.complete(request_id, history),
            FlowRequest::Image { upload } => client.complete_image(request_id, upload),
        }));

        let event = match outcome {
            Ok(Ok(text)) => CompletionEvent::Resolved {
                flow,
                request_id,
                text,
            },
            Ok(Err(error)) => CompletionEvent::Failed {
                flow,
                request_id,
                error: error.to_string(),
            },
            Err(_) => CompletionEvent::Failed {
                flow,
                request_id,
                error: PANIC_ERROR.to_string(),
            },
        };

        self.enqueue_event(event);
    }

    fn enqueue_event(&self, event: CompletionEvent) {
        let should_wake = {
            let mut queue = lock_unpoisoned(&self.pending_events);
            let should_wake = queue.is_empty();
            queue.push_back(event);
            should_wake
        };

        if should_wake {
            (self.waker)();
        }
    }

    fn drain_pending_events(&self) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        drained
    }

    /// Applies queued completion events to `App` and flags a render when any were applied.
    pub fn flush_pending_events(&self) -> usize {
        let drained = self.drain_pending_events();
        if drained > 0 {
            self.render_requested.store(true, Ordering::SeqCst);
        }

        drained
    }

    fn apply_event(&self, event: CompletionEvent) {
        let flow = event.flow();
        let request_id = event.request_id();

        {
            let mut app = lock_unpoisoned(&self.app);
            match event {
                CompletionEvent::Resolved {
                    flow,
                    request_id,
                    text,
                } => {
                    tracing::debug!(flow = flow.label(), request_id, "completion resolved");
                    app.on_completion_resolved(flow, request_id, &text);
                }
                CompletionEvent::Failed {
                    flow,
                    request_id,
                    error,
                } => {
                    tracing::warn!(flow = flow.label(), request_id, %error, "completion failed");
                    app.on_completion_failed(flow, request_id, &error);
                }
            }
        }

        self.clear_active_if_matching(flow, request_id);
    }

    fn clear_active_if_matching(&self, flow: FlowKind, request_id: RequestId) {
        let mut active = self.lock_active();
        let matches = active.get(&flow).map(|entry| entry.request_id) == Some(request_id);
        if !matches {
            return;
        }

        let Some(mut completed) = active.remove(&flow) else {
            return;
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    /// Whether any worker is still in flight.
    pub fn has_active_requests(&self) -> bool {
        !self.lock_active().is_empty()
    }

    /// Returns and clears the pending render flag.
    pub fn take_render_request(&self) -> bool {
        self.render_requested.swap(false, Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<FlowKind, ActiveRequest>> {
        lock_unpoisoned(&self.active)
    }
}

impl HostOps for Arc<RuntimeController> {
    fn start_completion(&mut self, request: FlowRequest) -> Result<RequestId, String> {
        self.start_completion_internal(request)
    }

    fn request_render(&mut self) {
        self.render_requested.store(true, Ordering::SeqCst);
    }

    fn request_stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        (self.waker)();
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
