//! Capability ports between the call core and its host application
//!
//! Inbound ports ([`DndSource`], [`CallSettings`], [`Clock`] and the
//! [`ContactLookup`] trait from the ring policy) are polled at decision time.
//! Outbound ports ([`TelephonyPort`], [`AlertPort`], [`IndicatorPort`],
//! [`WakeHoldPort`]) are how the coordinator acts on the world. All of them
//! are plain synchronous traits shared as `Arc<dyn Trait>`; none may block.
//!
//! Every port has a no-op implementation ([`NoopPorts`]) so a host only has to
//! supply the capabilities it actually has.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

use crate::audio::AudioRoute;
use crate::call::CallId;
use crate::number::NormalizedNumber;
use crate::ring_policy::{ContactLookup, ContactRef, DndState};

/// Requests forwarded to the telephony layer
pub trait TelephonyPort: Send + Sync {
    fn answer(&self, call_id: CallId);
    fn reject(&self, call_id: CallId);
    fn disconnect(&self, call_id: CallId);
    fn set_audio_route(&self, call_id: CallId, route: AudioRoute);
    fn play_dtmf(&self, call_id: CallId, digit: char);
}

/// Ringtone and vibration
pub trait AlertPort: Send + Sync {
    fn start_alerting(&self, call_id: CallId);
    fn stop_alerting(&self);
}

/// User-visible call notifications
pub trait IndicatorPort: Send + Sync {
    /// Persistent "call in progress" indicator
    fn show_ongoing(&self, call_id: CallId);
    fn hide_ongoing(&self);
    fn missed_call(&self, caller_number: Option<&str>, caller_display_name: Option<&str>);
    /// A call was declined because of app-level blocking
    fn blocked_call(&self, caller_number: &str);
}

/// Screen/proximity hold kept while a call needs it
pub trait WakeHoldPort: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Current Do-Not-Disturb state
///
/// `None` means the state could not be read; the ring policy then fails open.
pub trait DndSource: Send + Sync {
    fn current_dnd_state(&self) -> Option<DndState>;
}

/// User settings read at decision time
pub trait CallSettings: Send + Sync {
    fn block_unknown_callers(&self) -> bool;
    fn prefer_speaker_when_flat(&self) -> bool;
}

/// Wall clock used for repeat-caller windows and orientation freshness
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Port implementation that does nothing
///
/// As a [`DndSource`] it reports DND as unavailable; as [`CallSettings`] both
/// settings are off; as a contact directory it knows nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPorts;

impl TelephonyPort for NoopPorts {
    fn answer(&self, _call_id: CallId) {}
    fn reject(&self, _call_id: CallId) {}
    fn disconnect(&self, _call_id: CallId) {}
    fn set_audio_route(&self, _call_id: CallId, _route: AudioRoute) {}
    fn play_dtmf(&self, _call_id: CallId, _digit: char) {}
}

impl AlertPort for NoopPorts {
    fn start_alerting(&self, _call_id: CallId) {}
    fn stop_alerting(&self) {}
}

impl IndicatorPort for NoopPorts {
    fn show_ongoing(&self, _call_id: CallId) {}
    fn hide_ongoing(&self) {}
    fn missed_call(&self, _caller_number: Option<&str>, _caller_display_name: Option<&str>) {}
    fn blocked_call(&self, _caller_number: &str) {}
}

impl WakeHoldPort for NoopPorts {
    fn acquire(&self) {}
    fn release(&self) {}
}

impl DndSource for NoopPorts {
    fn current_dnd_state(&self) -> Option<DndState> {
        None
    }
}

impl CallSettings for NoopPorts {
    fn block_unknown_callers(&self) -> bool {
        false
    }

    fn prefer_speaker_when_flat(&self) -> bool {
        false
    }
}

impl ContactLookup for NoopPorts {
    fn lookup(&self, _number: &NormalizedNumber) -> Option<ContactRef> {
        None
    }
}

/// In-memory contact directory keyed by normalized number
///
/// Entries can be added while a coordinator is using the book.
#[derive(Default)]
pub struct ContactBook {
    entries: RwLock<HashMap<NormalizedNumber, ContactRef>>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a contact; returns false if `raw_number` has no digits
    pub fn insert(&self, raw_number: &str, contact: ContactRef) -> bool {
        match NormalizedNumber::parse(raw_number) {
            Some(number) => {
                self.entries.write().insert(number, contact);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, raw_number: &str) -> Option<ContactRef> {
        let number = NormalizedNumber::parse(raw_number)?;
        self.entries.write().remove(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for ContactBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactBook")
            .field("entries", &self.len())
            .finish()
    }
}

impl ContactLookup for ContactBook {
    fn lookup(&self, number: &NormalizedNumber) -> Option<ContactRef> {
        self.entries.read().get(number).cloned()
    }
}

/// Fixed values for [`DndSource`] and [`CallSettings`]
///
/// Values can be changed at runtime; the coordinator reads them on every
/// decision.
#[derive(Debug, Default)]
pub struct StaticEnvironment {
    dnd: RwLock<Option<DndState>>,
    block_unknown_callers: RwLock<bool>,
    prefer_speaker_when_flat: RwLock<bool>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dnd(self, dnd: DndState) -> Self {
        self.set_dnd(Some(dnd));
        self
    }

    pub fn with_block_unknown_callers(self, enabled: bool) -> Self {
        self.set_block_unknown_callers(enabled);
        self
    }

    pub fn with_prefer_speaker_when_flat(self, enabled: bool) -> Self {
        self.set_prefer_speaker_when_flat(enabled);
        self
    }

    pub fn set_dnd(&self, dnd: Option<DndState>) {
        *self.dnd.write() = dnd;
    }

    pub fn set_block_unknown_callers(&self, enabled: bool) {
        *self.block_unknown_callers.write() = enabled;
    }

    pub fn set_prefer_speaker_when_flat(&self, enabled: bool) {
        *self.prefer_speaker_when_flat.write() = enabled;
    }
}

impl DndSource for StaticEnvironment {
    fn current_dnd_state(&self) -> Option<DndState> {
        *self.dnd.read()
    }
}

impl CallSettings for StaticEnvironment {
    fn block_unknown_callers(&self) -> bool {
        *self.block_unknown_callers.read()
    }

    fn prefer_speaker_when_flat(&self) -> bool {
        *self.prefer_speaker_when_flat.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_policy::InterruptionFilter;

    #[test]
    fn contact_book_matches_any_formatting() {
        let book = ContactBook::new();
        assert!(book.insert("+1 (234) 567-890", ContactRef::favorite()));
        assert!(!book.insert("anonymous", ContactRef::known()));

        let number = NormalizedNumber::parse("+1234567890").unwrap();
        assert_eq!(book.lookup(&number), Some(ContactRef::favorite()));
        assert_eq!(book.len(), 1);

        assert!(book.remove("+1-234-567-890").is_some());
        assert!(book.is_empty());
    }

    #[test]
    fn noop_ports_report_unavailable_environment() {
        let ports = NoopPorts;
        assert!(ports.current_dnd_state().is_none());
        assert!(!ports.block_unknown_callers());
        assert!(!ports.prefer_speaker_when_flat());
    }

    #[test]
    fn static_environment_is_mutable() {
        let env = StaticEnvironment::new().with_dnd(DndState::with_filter(InterruptionFilter::None));
        assert_eq!(
            env.current_dnd_state().map(|d| d.interruption_filter),
            Some(InterruptionFilter::None)
        );

        env.set_dnd(None);
        env.set_block_unknown_callers(true);
        assert!(env.current_dnd_state().is_none());
        assert!(env.block_unknown_callers());
    }
}
