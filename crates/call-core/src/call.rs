//! Call types: identity, lifecycle state and the snapshot observers receive
//!
//! The coordinator models at most one call at a time. [`Call`] is that call;
//! [`CallSnapshot`] is the complete, self-contained view handed to observers
//! after every change, so an observer never has to remember earlier ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audio::AudioRouteState;

/// Identifier the telephony layer assigns to a call
pub type CallId = uuid::Uuid;

/// Lifecycle state of the current call
///
/// `Idle` doubles as "no call". `Disconnected` is a short pulse between the
/// end of a call and its removal; after that the coordinator is `Idle` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Ringing,
    Dialing,
    Connecting,
    Active,
    Holding,
    Disconnected,
}

impl CallState {
    /// States during which the wake-hold must be held
    pub fn needs_wake_hold(self) -> bool {
        matches!(self, CallState::Ringing | CallState::Dialing | CallState::Active)
    }

    /// States that show the persistent "call in progress" indicator
    pub fn shows_ongoing_indicator(self) -> bool {
        matches!(self, CallState::Active | CallState::Dialing)
    }

    /// A call exists and has not ended
    pub fn is_live(self) -> bool {
        !matches!(self, CallState::Idle | CallState::Disconnected)
    }

    /// States in which the speaker highlight is evaluated
    pub fn is_in_conversation(self) -> bool {
        matches!(self, CallState::Active | CallState::Dialing | CallState::Connecting)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "idle",
            CallState::Ringing => "ringing",
            CallState::Dialing => "dialing",
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Holding => "holding",
            CallState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Who placed the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The local user hung up
    LocalHangup,
    /// The remote party hung up
    RemoteHangup,
    /// The remote side was busy
    Busy,
    /// The call was declined
    Rejected,
    /// An incoming call stopped ringing without being answered
    Missed,
    /// Network or telephony failure
    Error,
    /// Anything the telephony layer could not classify
    Other,
}

impl DisconnectReason {
    /// Whether this reason says the call was never picked up
    pub fn indicates_unanswered(self) -> bool {
        matches!(self, DisconnectReason::Missed)
    }
}

/// The single call the device is currently handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub id: CallId,
    pub state: CallState,
    pub direction: CallDirection,
    /// Raw dialable string; `None` for withheld numbers
    pub caller_number: Option<String>,
    pub caller_display_name: Option<String>,
    /// Set once the state reaches `Disconnected`
    pub disconnect_reason: Option<DisconnectReason>,
    /// Whether the call ever reached `Active`
    pub answered: bool,
    pub created_at: DateTime<Utc>,
}

impl Call {
    pub fn new(
        id: CallId,
        direction: CallDirection,
        caller_number: Option<String>,
        caller_display_name: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let state = match direction {
            CallDirection::Incoming => CallState::Ringing,
            CallDirection::Outgoing => CallState::Dialing,
        };
        Self {
            id,
            state,
            direction,
            caller_number,
            caller_display_name,
            disconnect_reason: None,
            answered: false,
            created_at,
        }
    }

    /// Whether the call ended without ever being answered and should be
    /// reported as missed
    pub fn is_missed(&self) -> bool {
        self.direction == CallDirection::Incoming
            && !self.answered
            && self.disconnect_reason.map_or(false, DisconnectReason::indicates_unanswered)
    }
}

/// Complete view of the coordinator's state, delivered to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub state: CallState,
    pub call_id: Option<CallId>,
    pub direction: Option<CallDirection>,
    pub caller_number: Option<String>,
    pub caller_display_name: Option<String>,
    pub audio: AudioRouteState,
    pub disconnect_reason: Option<DisconnectReason>,
    /// Ringtone / vibration currently running
    pub alerting: bool,
    /// The UI should draw attention to the speaker button
    pub highlight_speaker: bool,
}

impl CallSnapshot {
    /// Snapshot of a coordinator with no call
    pub fn idle(audio: AudioRouteState) -> Self {
        Self {
            state: CallState::Idle,
            call_id: None,
            direction: None,
            caller_number: None,
            caller_display_name: None,
            audio,
            disconnect_reason: None,
            alerting: false,
            highlight_speaker: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn wake_hold_states() {
        assert!(CallState::Ringing.needs_wake_hold());
        assert!(CallState::Dialing.needs_wake_hold());
        assert!(CallState::Active.needs_wake_hold());
        assert!(!CallState::Connecting.needs_wake_hold());
        assert!(!CallState::Holding.needs_wake_hold());
        assert!(!CallState::Disconnected.needs_wake_hold());
        assert!(!CallState::Idle.needs_wake_hold());
    }

    #[test]
    fn new_call_starts_by_direction() {
        let incoming = Call::new(Uuid::new_v4(), CallDirection::Incoming, None, None, Utc::now());
        assert_eq!(incoming.state, CallState::Ringing);

        let outgoing = Call::new(Uuid::new_v4(), CallDirection::Outgoing, None, None, Utc::now());
        assert_eq!(outgoing.state, CallState::Dialing);
    }

    #[test]
    fn missed_requires_incoming_unanswered_and_missed_reason() {
        let mut call = Call::new(
            Uuid::new_v4(),
            CallDirection::Incoming,
            Some("+41791234567".to_string()),
            None,
            Utc::now(),
        );
        call.disconnect_reason = Some(DisconnectReason::Missed);
        assert!(call.is_missed());

        call.answered = true;
        assert!(!call.is_missed());

        call.answered = false;
        call.disconnect_reason = Some(DisconnectReason::Rejected);
        assert!(!call.is_missed());

        call.direction = CallDirection::Outgoing;
        call.disconnect_reason = Some(DisconnectReason::Missed);
        assert!(!call.is_missed());
    }
}
