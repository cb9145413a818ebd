//! Timed status messages.

use std::fmt;
use std::time::{Duration, Instant};

use crate::domain::errors::DataTemplateError;

/// Default time a status message stays visible.
pub const DEFAULT_CLEAR_AFTER: Duration = Duration::from_secs(5);

/// Single-slot timer: setting a new value cancels whatever was pending.
///
/// A deadline past what `Instant` can represent never expires.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    slot: Option<(T, Option<Instant>)>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, slot: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer with `value`, returning the value it replaced.
    pub fn set(&mut self, value: T, now: Instant) -> Option<T> {
        self.slot
            .replace((value, now.checked_add(self.delay)))
            .map(|(previous, _)| previous)
    }

    pub fn current(&self) -> Option<&T> {
        self.slot.as_ref().map(|(value, _)| value)
    }

    /// Clear the slot if its deadline has passed, returning the expired value.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let expired = matches!(&self.slot, Some((_, Some(deadline))) if now >= *deadline);
        if expired {
            self.cancel()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|(value, _)| value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

impl StatusLevel {
    /// Banner colour.
    pub fn color(&self) -> &'static str {
        match self {
            StatusLevel::Info => "gray",
            StatusLevel::Success => "darkgreen",
            StatusLevel::Error => "darkred",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub title: String,
    pub text: String,
}

impl StatusMessage {
    pub fn new(level: StatusLevel, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, "ERROR", text)
    }
}

impl From<&DataTemplateError> for StatusMessage {
    fn from(err: &DataTemplateError) -> Self {
        StatusMessage::error(err.to_string())
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.text)
    }
}

/// The session's status line.
#[derive(Debug, Clone)]
pub struct StatusBanner {
    timer: Debounce<StatusMessage>,
}

impl Default for StatusBanner {
    fn default() -> Self {
        Self::new(DEFAULT_CLEAR_AFTER)
    }
}

impl StatusBanner {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            timer: Debounce::new(clear_after),
        }
    }

    pub fn show(&mut self, message: StatusMessage, now: Instant) {
        self.timer.set(message, now);
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.timer.current()
    }

    pub fn clear(&mut self) {
        self.timer.cancel();
    }

    /// Drop the message once its delay has elapsed.
    pub fn tick(&mut self, now: Instant) {
        self.timer.poll(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_value_replaces_pending_timer() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_secs(5));
        assert_eq!(debounce.set("first", start), None);
        assert_eq!(debounce.set("second", start + Duration::from_secs(4)), Some("first"));

        // The first deadline has passed but was cancelled along with its value.
        assert_eq!(debounce.poll(start + Duration::from_secs(6)), None);
        assert_eq!(debounce.current(), Some(&"second"));
        assert_eq!(debounce.poll(start + Duration::from_secs(9)), Some("second"));
        assert_eq!(debounce.current(), None);
    }

    #[test]
    fn unrepresentable_deadline_never_expires() {
        let start = Instant::now();
        let mut banner = StatusBanner::new(Duration::from_secs(u64::MAX));
        banner.show(StatusMessage::error("Invalid DataTemplate Format"), start);
        banner.tick(start + Duration::from_secs(3_600));
        assert!(banner.current().is_some());
        banner.clear();
        assert!(banner.current().is_none());
    }

    #[test]
    fn banner_clears_after_delay() {
        let start = Instant::now();
        let mut banner = StatusBanner::default();
        banner.show(StatusMessage::from(&DataTemplateError::MissingTemplate), start);
        assert_eq!(
            banner.current().map(ToString::to_string).as_deref(),
            Some("ERROR: No Template")
        );
        banner.tick(start + Duration::from_millis(4_999));
        assert!(banner.current().is_some());
        banner.tick(start + DEFAULT_CLEAR_AFTER);
        assert!(banner.current().is_none());
    }

    #[test]
    fn error_messages_are_dark_red() {
        let message = StatusMessage::error("Invalid DataTemplate Format");
        assert_eq!(message.level.color(), "darkred");
        assert_eq!(message.to_string(), "ERROR: Invalid DataTemplate Format");
    }
}
