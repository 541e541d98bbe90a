//! Inbound telephony events and the outcome of coordinator actions
//!
//! The telephony layer drives the coordinator with [`TelephonyEvent`]s. Their
//! delivery order is outside this crate's control, so an event that does not
//! fit the current state is dropped rather than treated as an error.
//!
//! UI actions (answer, reject, silence, ...) return an [`ActionOutcome`]: an
//! action either went through or was ignored for a named reason.
//!
//! # Examples
//!
//! ```rust
//! use dialer_call_core::events::TelephonyEvent;
//! use dialer_call_core::call::{CallDirection, CallState};
//! use uuid::Uuid;
//!
//! let call_id = Uuid::new_v4();
//! let arrived = TelephonyEvent::CallArrived {
//!     call_id,
//!     direction: CallDirection::Incoming,
//!     caller_number: Some("+41 79 123 45 67".to_string()),
//!     caller_display_name: None,
//! };
//! assert_eq!(arrived.call_id(), Some(call_id));
//!
//! let json = r#"{"type":"state_changed","call_id":"67e55044-10b1-426f-9247-bb680e5fe0c8","state":"active"}"#;
//! let event: TelephonyEvent = serde_json::from_str(json).unwrap();
//! assert!(matches!(event, TelephonyEvent::StateChanged { state: CallState::Active, .. }));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audio::{AudioRoute, AudioRouteState};
use crate::call::{CallDirection, CallId, CallState, DisconnectReason};

/// Event reported by the telephony layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelephonyEvent {
    /// A new call was created
    CallArrived {
        call_id: CallId,
        direction: CallDirection,
        #[serde(default)]
        caller_number: Option<String>,
        #[serde(default)]
        caller_display_name: Option<String>,
    },
    /// The call moved to a new state
    StateChanged {
        call_id: CallId,
        state: CallState,
        /// Only meaningful together with [`CallState::Disconnected`]
        #[serde(default)]
        disconnect_reason: Option<DisconnectReason>,
    },
    /// Caller identity details were updated (e.g. display name resolved late)
    DetailsChanged {
        call_id: CallId,
        #[serde(default)]
        caller_number: Option<String>,
        #[serde(default)]
        caller_display_name: Option<String>,
    },
    /// Supported or current audio routes changed
    AudioStateChanged { audio: AudioRouteState },
    /// The telephony layer released a disconnected call
    CallRemoved { call_id: CallId },
}

impl TelephonyEvent {
    /// The call this event refers to, if any
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            TelephonyEvent::CallArrived { call_id, .. }
            | TelephonyEvent::StateChanged { call_id, .. }
            | TelephonyEvent::DetailsChanged { call_id, .. }
            | TelephonyEvent::CallRemoved { call_id } => Some(*call_id),
            TelephonyEvent::AudioStateChanged { .. } => None,
        }
    }
}

/// Result of a coordinator action or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action was carried out
    Performed,
    /// The action did not apply and nothing changed
    Ignored(IgnoreReason),
}

impl ActionOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, ActionOutcome::Performed)
    }
}

/// Why an action or event was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// There is no call to act on
    NoCall,
    /// The current state does not allow the action
    InvalidState(CallState),
    /// The event names a call that is not the current one
    UnknownCall,
    /// The requested route is not available
    UnsupportedRoute(AudioRoute),
    /// Not a DTMF digit
    InvalidDigit(char),
    /// Nothing is alerting
    NotAlerting,
    /// The event repeats the state the coordinator is already in
    Unchanged,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::NoCall => write!(f, "no call"),
            IgnoreReason::InvalidState(state) => write!(f, "not allowed while {}", state),
            IgnoreReason::UnknownCall => write!(f, "unknown call"),
            IgnoreReason::UnsupportedRoute(route) => write!(f, "route {} not supported", route),
            IgnoreReason::InvalidDigit(digit) => write!(f, "invalid DTMF digit {:?}", digit),
            IgnoreReason::NotAlerting => write!(f, "not alerting"),
            IgnoreReason::Unchanged => write!(f, "unchanged"),
        }
    }
}
