//! Deterministic event loop: timers and animation frames on a virtual clock.

use crate::dom::NodeId;
use std::collections::BTreeMap;

/// Default animation frame interval in milliseconds
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Deferred work scheduled by the site controllers.
///
/// Overlay tasks carry the generation of the instance that scheduled them so
/// a task outliving its instance is recognisably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// First frame after open: reset the dialog's enter class
    OverlayResetEnter {
        /// Instance generation
        generation: u64,
    },
    /// Second frame after open: add the enter class
    OverlayEnter {
        /// Instance generation
        generation: u64,
    },
    /// Close fallback: finalise the closing instance
    OverlayFinalize {
        /// Instance generation
        generation: u64,
    },
    /// Menu finished its opening phase
    MenuOpened {
        /// Menu open generation
        generation: u64,
    },
    /// First frame after the collapse node was inserted
    MenuCollapseArm {
        /// Collapse node
        node: NodeId,
    },
    /// Second frame: start the height transition
    MenuCollapseStart {
        /// Collapse node
        node: NodeId,
    },
    /// Collapse fallback: remove the node
    MenuCollapseRemove {
        /// Collapse node
        node: NodeId,
    },
    /// Deferred scroll after an in-menu link closed the menu
    MenuScrollTo {
        /// Scroll target
        node: NodeId,
    },
}

/// Handle for cancelling a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Something that came due
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Due<T> {
    /// A timer fired
    Timer(T),
    /// A batch of frame callbacks, in request order
    Frame(Vec<T>),
}

/// Virtual-clock scheduler.
///
/// Frames fire on multiples of the frame interval. Callbacks requested while
/// a frame batch is being handled land in the next frame. When a timer and a
/// frame are due at the same instant the timer runs first.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: u64,
    frame_interval: u64,
    next_id: u64,
    timers: BTreeMap<(u64, u64), T>,
    frames: Vec<T>,
}

impl<T> Scheduler<T> {
    /// Create a scheduler at time zero
    #[must_use]
    pub fn new(frame_interval: u64) -> Self {
        Self {
            now: 0,
            frame_interval: frame_interval.max(1),
            next_id: 0,
            timers: BTreeMap::new(),
            frames: Vec::new(),
        }
    }

    /// Current virtual time in milliseconds
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Frame interval in milliseconds
    #[must_use]
    pub const fn frame_interval(&self) -> u64 {
        self.frame_interval
    }

    /// Run `task` after `delay_ms`
    pub fn set_timeout(&mut self, delay_ms: u64, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert((self.now + delay_ms, id), task);
        TimerId(id)
    }

    /// Cancel a pending timer; returns whether it was still pending
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, i)| *i == id.0).copied();
        key.is_some_and(|k| self.timers.remove(&k).is_some())
    }

    /// Run `task` on the next animation frame
    pub fn request_frame(&mut self, task: T) {
        self.frames.push(task);
    }

    /// Whether frame callbacks are waiting
    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Number of pending timers
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Time of the next frame boundary strictly after now
    #[must_use]
    pub const fn next_frame_time(&self) -> u64 {
        (self.now / self.frame_interval + 1) * self.frame_interval
    }

    /// When the next piece of work is due
    #[must_use]
    pub fn next_due_time(&self) -> Option<u64> {
        let timer = self.timers.keys().next().map(|(t, _)| *t);
        let frame = (!self.frames.is_empty()).then(|| self.next_frame_time());
        match (timer, frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Pop the next due work at or before `until`, advancing the clock to it.
    /// Returns `None` (with the clock at `until`) when nothing is due.
    pub fn pop_due(&mut self, until: u64) -> Option<Due<T>> {
        let timer_at = self.timers.keys().next().map(|(t, _)| *t);
        let frame_at = (!self.frames.is_empty()).then(|| self.next_frame_time());

        let take_timer = match (timer_at, frame_at) {
            (Some(t), Some(f)) => t <= f,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => {
                self.now = self.now.max(until);
                return None;
            }
        };

        if take_timer {
            let at = timer_at.unwrap_or(until);
            if at > until {
                self.now = self.now.max(until);
                return None;
            }
            let entry = self.timers.pop_first()?;
            self.now = self.now.max(entry.0 .0);
            Some(Due::Timer(entry.1))
        } else {
            let at = frame_at.unwrap_or(until);
            if at > until {
                self.now = self.now.max(until);
                return None;
            }
            self.now = at;
            Some(Due::Frame(std::mem::take(&mut self.frames)))
        }
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_order() {
        let mut s = Scheduler::new(16);
        s.set_timeout(300, "b");
        s.set_timeout(50, "a");
        assert_eq!(s.pop_due(1000), Some(Due::Timer("a")));
        assert_eq!(s.now(), 50);
        assert_eq!(s.pop_due(1000), Some(Due::Timer("b")));
        assert_eq!(s.now(), 300);
        assert_eq!(s.pop_due(1000), None);
        assert_eq!(s.now(), 1000);
    }

    #[test]
    fn test_clear_timeout() {
        let mut s = Scheduler::new(16);
        let id = s.set_timeout(10, 1);
        assert!(s.clear_timeout(id));
        assert!(!s.clear_timeout(id));
        assert_eq!(s.pop_due(100), None);
    }

    #[test]
    fn test_frames_batch_and_defer() {
        let mut s = Scheduler::new(16);
        s.request_frame(1);
        s.request_frame(2);
        assert_eq!(s.pop_due(100), Some(Due::Frame(vec![1, 2])));
        assert_eq!(s.now(), 16);
        // requested during frame 16 runs at 32
        s.request_frame(3);
        assert_eq!(s.next_due_time(), Some(32));
        assert_eq!(s.pop_due(100), Some(Due::Frame(vec![3])));
    }

    #[test]
    fn test_timer_wins_tie_with_frame() {
        let mut s = Scheduler::new(16);
        s.request_frame("frame");
        s.set_timeout(16, "timer");
        assert_eq!(s.pop_due(16), Some(Due::Timer("timer")));
        assert_eq!(s.pop_due(16), Some(Due::Frame(vec!["frame"])));
    }

    #[test]
    fn test_pop_respects_until() {
        let mut s = Scheduler::new(16);
        s.set_timeout(500, ());
        assert_eq!(s.pop_due(499), None);
        assert_eq!(s.now(), 499);
        assert_eq!(s.pop_due(500), Some(Due::Timer(())));
    }
}
