//! Single-flight export slot

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::ExportState;

/// Observable view of the slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobStatus {
    pub state: ExportState,
    pub clip_number: Option<u32>,
    pub percent: f64,
}

#[derive(Debug)]
struct SlotInner {
    state: ExportState,
    clip_number: Option<u32>,
    percent: f64,
}

impl Default for SlotInner {
    fn default() -> Self {
        Self {
            state: ExportState::Idle,
            clip_number: None,
            percent: 0.0,
        }
    }
}

/// Holds the one export job that may be non-idle at a time
#[derive(Debug, Clone, Default)]
pub struct ExportSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl ExportSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check-and-set Idle -> Seeking, or refuse with `ExportBusy`
    pub fn try_begin(&self, clip_number: u32) -> DomainResult<JobLease> {
        let mut inner = self.lock();
        if inner.state.is_active() {
            return Err(DomainError::ExportBusy {
                active_clip: inner.clip_number.unwrap_or_default(),
            });
        }
        inner.state = ExportState::Seeking;
        inner.clip_number = Some(clip_number);
        inner.percent = 0.0;
        debug!(clip = clip_number, "Export slot taken");
        Ok(JobLease { slot: self.clone() })
    }

    pub fn status(&self) -> JobStatus {
        let inner = self.lock();
        JobStatus {
            state: inner.state,
            clip_number: inner.clip_number,
            percent: inner.percent,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock().state.is_active()
    }
}

/// Exclusive right to drive the slot; resets it to Idle when dropped
#[derive(Debug)]
pub struct JobLease {
    slot: ExportSlot,
}

impl JobLease {
    /// Apply a state-machine edge; illegal edges are ignored and logged
    pub fn transition(&self, next: ExportState) -> bool {
        let mut inner = self.slot.lock();
        if inner.state.can_transition_to(next) {
            inner.state = next;
            true
        } else {
            warn!(from = %inner.state, to = %next, "Ignoring illegal export transition");
            false
        }
    }

    pub fn set_percent(&self, percent: f64) {
        self.slot.lock().percent = percent;
    }

    pub fn state(&self) -> ExportState {
        self.slot.lock().state
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        let mut inner = self.slot.lock();
        *inner = SlotInner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_refused_while_active() {
        let slot = ExportSlot::new();
        let lease = slot.try_begin(4).unwrap();
        match slot.try_begin(5) {
            Err(DomainError::ExportBusy { active_clip }) => assert_eq!(active_clip, 4),
            other => panic!("expected ExportBusy, got {:?}", other.map(|_| ())),
        }
        drop(lease);
        assert!(slot.try_begin(5).is_ok());
    }

    #[test]
    fn test_lease_drop_resets_to_idle() {
        let slot = ExportSlot::new();
        {
            let lease = slot.try_begin(1).unwrap();
            assert!(lease.transition(ExportState::Capturing));
            lease.set_percent(42.0);
            assert_eq!(slot.status().state, ExportState::Capturing);
            assert_eq!(slot.status().percent, 42.0);
        }
        let status = slot.status();
        assert_eq!(status.state, ExportState::Idle);
        assert_eq!(status.clip_number, None);
        assert!(!slot.is_busy());
    }

    #[test]
    fn test_illegal_transition_is_ignored() {
        let slot = ExportSlot::new();
        let lease = slot.try_begin(1).unwrap();
        assert!(!lease.transition(ExportState::Done));
        assert_eq!(lease.state(), ExportState::Seeking);
    }
}
