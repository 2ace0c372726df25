use crate::api::GenerateBackend;
use crate::error::{ApiError, ApiResult};
use crate::page::{FormElements, SubmitEvent};
use crate::types::{GenerateRequest, GenerateResponse};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Which resolved responses are allowed to touch the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOrdering {
    /// Every response is applied as it arrives; the last to resolve wins.
    #[default]
    #[serde(alias = "arrival_order")]
    Arrival,
    /// Responses older than the newest submission are dropped.
    #[serde(alias = "latest_submission")]
    Latest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Displayed { generation: u64, src: String },
    Alerted { generation: u64, message: String },
    TransportFailed { generation: u64, error: String },
    Superseded { generation: u64 },
}

impl SubmitOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            SubmitOutcome::Displayed { generation, .. }
            | SubmitOutcome::Alerted { generation, .. }
            | SubmitOutcome::TransportFailed { generation, .. }
            | SubmitOutcome::Superseded { generation } => *generation,
        }
    }
}

struct FormAsyncEvent {
    generation: u64,
    result: ApiResult<GenerateResponse>,
}

/// The submit handler for the QR form.
///
/// Each submission runs on its own tokio task; results come back over a
/// channel and are applied to the page by whoever owns the form, through
/// [`QrForm::process_async_events`] or [`QrForm::next_outcome`].
pub struct QrForm {
    backend: Arc<dyn GenerateBackend>,
    elements: FormElements,
    ordering: ResponseOrdering,
    latest_generation: AtomicU64,
    in_flight: AtomicUsize,
    async_tx: mpsc::UnboundedSender<FormAsyncEvent>,
    async_rx: mpsc::UnboundedReceiver<FormAsyncEvent>,
}

impl QrForm {
    pub fn new(backend: Arc<dyn GenerateBackend>, elements: FormElements) -> Self {
        let (async_tx, async_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            elements,
            ordering: ResponseOrdering::default(),
            latest_generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            async_tx,
            async_rx,
        }
    }

    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn ordering(&self) -> ResponseOrdering {
        self.ordering
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Must be called from within a tokio runtime.
    pub fn handle_submit(&self, event: &mut SubmitEvent) -> Submission {
        event.prevent_default();

        let request = GenerateRequest::new(
            self.elements.url.value(),
            self.elements.expires.value(),
        );
        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        debug!(generation, "Form submitted");

        let backend = self.backend.clone();
        let tx = self.async_tx.clone();
        // The call runs in its own task so a panic still comes back as an
        // event and the in-flight count drains.
        tokio::spawn(async move {
            let call = tokio::spawn(async move { backend.generate(&request).await });
            let result = match call.await {
                Ok(result) => result,
                Err(e) => Err(ApiError::Aborted(e.to_string())),
            };
            let _ = tx.send(FormAsyncEvent { generation, result });
        });

        Submission { generation }
    }

    /// Applies every response that has already resolved, in arrival order.
    pub fn process_async_events(&mut self) -> Vec<SubmitOutcome> {
        let mut events = Vec::new();
        while let Ok(event) = self.async_rx.try_recv() {
            events.push(event);
        }
        events.into_iter().map(|event| self.apply(event)).collect()
    }

    /// Waits for the next response to resolve and applies it. Returns `None`
    /// when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<SubmitOutcome> {
        if self.in_flight() == 0 {
            return None;
        }
        let event = self.async_rx.recv().await?;
        Some(self.apply(event))
    }

    fn apply(&self, event: FormAsyncEvent) -> SubmitOutcome {
        let FormAsyncEvent { generation, result } = event;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.ordering == ResponseOrdering::Latest {
            let latest = self.latest_generation.load(Ordering::SeqCst);
            if generation < latest {
                debug!(generation, latest, "Dropping superseded response");
                return SubmitOutcome::Superseded { generation };
            }
        }

        match result {
            Ok(GenerateResponse::Success { qr_code_url }) => {
                self.elements.image.set_src(&qr_code_url);
                SubmitOutcome::Displayed {
                    generation,
                    src: qr_code_url,
                }
            }
            Ok(GenerateResponse::Failure { message }) => {
                let message = GenerateResponse::alert_text(message.as_deref());
                self.elements.alerts.alert(&message);
                SubmitOutcome::Alerted {
                    generation,
                    message,
                }
            }
            Err(e) => {
                error!(generation, hint = e.user_message(), "Error: {e}");
                SubmitOutcome::TransportFailed {
                    generation,
                    error: e.to_string(),
                }
            }
        }
    }
}
