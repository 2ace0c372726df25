//! Handles onto the page the form lives in.
//!
//! The form never looks elements up by id. Whoever builds the page passes
//! the handles in through [`FormElements`], so a terminal, a test, or a web
//! front end can all drive the same handler.

use std::sync::{Arc, Mutex, MutexGuard};

pub const FORM_ID: &str = "qr-form";
pub const URL_INPUT_ID: &str = "url";
pub const EXPIRES_INPUT_ID: &str = "expires";
pub const QR_IMAGE_ID: &str = "qr-code";

pub trait InputElement: Send + Sync {
    fn value(&self) -> String;
}

pub trait ImageElement: Send + Sync {
    fn set_src(&self, src: &str);
}

/// A blocking, user-facing notice.
pub trait AlertSink: Send + Sync {
    fn alert(&self, message: &str);
}

#[derive(Clone)]
pub struct FormElements {
    pub url: Arc<dyn InputElement>,
    pub expires: Arc<dyn InputElement>,
    pub image: Arc<dyn ImageElement>,
    pub alerts: Arc<dyn AlertSink>,
}

#[derive(Debug, Default)]
pub struct SubmitEvent {
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A text input holding its value in memory.
#[derive(Debug, Default)]
pub struct TextInput {
    value: Mutex<String>,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(value.into()),
        }
    }

    pub fn set_value(&self, value: impl Into<String>) {
        *lock(&self.value) = value.into();
    }
}

impl InputElement for TextInput {
    fn value(&self) -> String {
        lock(&self.value).clone()
    }
}

/// An image that only remembers its source.
#[derive(Debug, Default)]
pub struct ImageSlot {
    src: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(&self) -> Option<String> {
        lock(&self.src).clone()
    }

    /// How many times the source has been assigned.
    pub fn writes(&self) -> usize {
        *lock(&self.writes)
    }
}

impl ImageElement for ImageSlot {
    fn set_src(&self, src: &str) {
        *lock(&self.src) = Some(src.to_string());
        *lock(&self.writes) += 1;
    }
}

/// Collects alerts instead of showing them.
#[derive(Debug, Default)]
pub struct AlertLog {
    messages: Mutex<Vec<String>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl AlertSink for AlertLog {
    fn alert(&self, message: &str) {
        lock(&self.messages).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_event_starts_with_default_action() {
        let mut event = SubmitEvent::new();
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn text_input_reads_latest_value() {
        let input = TextInput::new("https://a");
        input.set_value("https://b");
        assert_eq!(input.value(), "https://b");
    }

    #[test]
    fn image_slot_counts_assignments() {
        let image = ImageSlot::new();
        assert_eq!(image.src(), None);
        image.set_src("/one.png");
        image.set_src("/two.png");
        assert_eq!(image.src().as_deref(), Some("/two.png"));
        assert_eq!(image.writes(), 2);
    }
}
