//! Cooperative timers on the simulation clock
//!
//! Timers never run code themselves. The tick polls them with the current
//! clock and acts when one reports that it fired. Rescheduling replaces the
//! pending deadline, so a restarted timer can never fire twice.

use serde::{Deserialize, Serialize};

/// A single-shot deadline that can be canceled, rescheduled or suspended
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    /// Absolute due time on the sim clock (ms)
    due_ms: Option<f64>,
    /// Remaining time while suspended (ms)
    suspended_ms: Option<f64>,
}

impl Timer {
    /// Cancel any pending deadline and schedule a new one `delay_ms` from `now_ms`
    pub fn restart(&mut self, now_ms: f64, delay_ms: f64) {
        self.due_ms = Some(now_ms + delay_ms.max(0.0));
        self.suspended_ms = None;
    }

    /// Drop any pending deadline
    pub fn cancel(&mut self) {
        self.due_ms = None;
        self.suspended_ms = None;
    }

    /// True if a deadline is pending (running or suspended)
    pub fn is_pending(&self) -> bool {
        self.due_ms.is_some() || self.suspended_ms.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_ms.is_some()
    }

    /// Time left before firing, if running
    pub fn remaining(&self, now_ms: f64) -> Option<f64> {
        self.due_ms.map(|due| (due - now_ms).max(0.0))
    }

    /// Freeze the remaining time; a suspended timer never fires
    pub fn suspend(&mut self, now_ms: f64) {
        if let Some(due) = self.due_ms.take() {
            self.suspended_ms = Some((due - now_ms).max(0.0));
        }
    }

    /// Continue a suspended timer from `now_ms`
    pub fn resume(&mut self, now_ms: f64) {
        if let Some(left) = self.suspended_ms.take() {
            self.due_ms = Some(now_ms + left);
        }
    }

    /// Fire at most once: returns true and clears the deadline when due
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once() {
        let mut timer = Timer::default();
        timer.restart(0.0, 100.0);
        assert!(!timer.poll(99.0));
        assert!(timer.poll(100.0));
        assert!(!timer.poll(200.0));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_restart_replaces_pending_deadline() {
        let mut timer = Timer::default();
        timer.restart(0.0, 100.0);
        timer.restart(80.0, 100.0);
        assert!(!timer.poll(120.0));
        assert!(timer.poll(180.0));
        assert!(!timer.poll(181.0));
    }

    #[test]
    fn test_suspend_and_resume_preserve_remaining() {
        let mut timer = Timer::default();
        timer.restart(0.0, 100.0);
        timer.suspend(40.0);
        assert!(timer.is_suspended());
        assert!(!timer.poll(10_000.0));
        timer.resume(1000.0);
        assert!(!timer.poll(1059.0));
        assert!(timer.poll(1060.0));
    }

    #[test]
    fn test_cancel() {
        let mut timer = Timer::default();
        timer.restart(0.0, 10.0);
        timer.cancel();
        assert!(!timer.poll(100.0));
    }
}
