//! A cancellable one-shot task driven by the host's clock.

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// One pending deadline. Scheduling again replaces it, which gives
/// trailing-edge debounce when every trigger reschedules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduledTask {
    due: Option<Instant>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant) {
        self.due = Some(at);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    /// Returns `true` once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once_after_deadline() {
        let start = Instant::now();
        let mut task = ScheduledTask::new();
        task.schedule(start + Duration::from_millis(100));

        assert!(!task.poll(start + Duration::from_millis(99)));
        assert!(task.poll(start + Duration::from_millis(100)));
        assert!(!task.poll(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_reschedule_and_cancel() {
        let start = Instant::now();
        let mut task = ScheduledTask::new();
        task.schedule(start + Duration::from_millis(100));
        task.schedule(start + Duration::from_millis(300));
        assert!(!task.poll(start + Duration::from_millis(200)));

        task.cancel();
        assert!(!task.is_scheduled());
        assert!(!task.poll(start + Duration::from_millis(1000)));
    }
}
