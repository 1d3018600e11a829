//! Host timer
//!
//! The host drives rendering through a periodic timer it owns. The editor
//! registers on attach and unregisters first thing on destroy.

use std::time::Duration;

pub type TimerId = u32;

pub trait HostTimer {
    /// Ask the host for a periodic callback; `None` if it refused
    fn register(&mut self, period: Duration) -> Option<TimerId>;

    /// Stop a registered timer. Returns false for unknown ids.
    fn unregister(&mut self, id: TimerId) -> bool;
}

/// Timer whose ticks are delivered by hand (tests, offscreen runs)
#[derive(Debug, Default, Clone)]
pub struct ManualTimer {
    next_id: TimerId,
    active: Option<(TimerId, Duration)>,
    registrations: u32,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id to pass to the editor's timer callback, if running
    pub fn active_id(&self) -> Option<TimerId> {
        self.active.map(|(id, _)| id)
    }

    pub fn period(&self) -> Option<Duration> {
        self.active.map(|(_, period)| period)
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn registrations(&self) -> u32 {
        self.registrations
    }
}

impl HostTimer for ManualTimer {
    fn register(&mut self, period: Duration) -> Option<TimerId> {
        self.next_id += 1;
        self.registrations += 1;
        self.active = Some((self.next_id, period));
        Some(self.next_id)
    }

    fn unregister(&mut self, id: TimerId) -> bool {
        match self.active {
            Some((active, _)) if active == id => {
                self.active = None;
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
    fn test_register_unregister() {
        let mut timer = ManualTimer::new();
        let id = timer.register(Duration::from_millis(30)).unwrap();
        assert_eq!(timer.active_id(), Some(id));
        assert_eq!(timer.period(), Some(Duration::from_millis(30)));

        assert!(!timer.unregister(id + 1));
        assert!(timer.unregister(id));
        assert!(!timer.is_running());
    }

    #[test]
    fn test_ids_not_reused() {
        let mut timer = ManualTimer::new();
        let a = timer.register(Duration::from_millis(30)).unwrap();
        timer.unregister(a);
        let b = timer.register(Duration::from_millis(30)).unwrap();
        assert_ne!(a, b);
        assert_eq!(timer.registrations(), 2);
    }
}
