//! Inputs and outputs of the ring decision

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::number::NormalizedNumber;

/// Device-wide interruption filter ("Do Not Disturb" mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionFilter {
    /// DND off: everything may interrupt
    All,
    /// Only priority interruptions are allowed
    Priority,
    /// Only alarms may interrupt
    AlarmsOnly,
    /// Nothing may interrupt
    None,
    /// A value this crate does not recognise (raw platform code)
    Unknown(i32),
}

impl InterruptionFilter {
    /// Map a platform interruption filter code
    ///
    /// Codes follow the platform notification manager: 1 = all,
    /// 2 = priority, 3 = none, 4 = alarms. Anything else is kept as
    /// [`InterruptionFilter::Unknown`].
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => Self::All,
            2 => Self::Priority,
            3 => Self::None,
            4 => Self::AlarmsOnly,
            other => Self::Unknown(other),
        }
    }
}

/// Which callers may break through when the filter is [`InterruptionFilter::Priority`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritySenders {
    /// Any caller
    Any,
    /// Callers that resolve to a contact
    ContactsOnly,
    /// Callers that resolve to a starred (favorite) contact
    StarredOnly,
    /// A sender policy this crate does not recognise (raw platform code)
    Unknown(i32),
}

impl PrioritySenders {
    /// Map a platform priority-sender code (0 = any, 1 = contacts, 2 = starred)
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Any,
            1 => Self::ContactsOnly,
            2 => Self::StarredOnly,
            other => Self::Unknown(other),
        }
    }
}

/// Snapshot of the interruption policy, taken once per ring decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DndState {
    pub interruption_filter: InterruptionFilter,
    pub priority_calls_allowed: bool,
    pub priority_sender_policy: PrioritySenders,
    pub priority_repeat_callers_allowed: bool,
}

impl DndState {
    /// DND off
    pub fn off() -> Self {
        Self::default()
    }

    /// A filter without any priority categories
    pub fn with_filter(filter: InterruptionFilter) -> Self {
        Self {
            interruption_filter: filter,
            ..Self::default()
        }
    }

    /// Priority mode with the given categories
    pub fn priority(calls_allowed: bool, senders: PrioritySenders, repeat_callers_allowed: bool) -> Self {
        Self {
            interruption_filter: InterruptionFilter::Priority,
            priority_calls_allowed: calls_allowed,
            priority_sender_policy: senders,
            priority_repeat_callers_allowed: repeat_callers_allowed,
        }
    }
}

impl Default for DndState {
    fn default() -> Self {
        Self {
            interruption_filter: InterruptionFilter::All,
            priority_calls_allowed: false,
            priority_sender_policy: PrioritySenders::Any,
            priority_repeat_callers_allowed: false,
        }
    }
}

/// What the host's contact store knows about a number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    pub is_favorite: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ContactRef {
    /// A plain, non-starred contact
    pub fn known() -> Self {
        Self::default()
    }

    /// A starred contact
    pub fn favorite() -> Self {
        Self {
            is_favorite: true,
            display_name: None,
        }
    }
}

/// Resolves a normalized number to a contact
///
/// Implemented for any `Fn(&NormalizedNumber) -> Option<ContactRef>`, so
/// tests and small hosts can pass a closure.
pub trait ContactLookup {
    fn lookup(&self, number: &NormalizedNumber) -> Option<ContactRef>;
}

impl<F> ContactLookup for F
where
    F: Fn(&NormalizedNumber) -> Option<ContactRef>,
{
    fn lookup(&self, number: &NormalizedNumber) -> Option<ContactRef> {
        self(number)
    }
}

/// Why a ring decision came out the way it did
///
/// Each variant maps to a short reason string that stays stable across
/// releases; diagnostics and tests match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RingReason {
    BlockedHiddenNumber,
    BlockedUnknownNumber,
    DndOff,
    DndBlocksCalls,
    RepeatCaller,
    PriorityAnySender,
    PriorityContact,
    PriorityNotContact,
    PriorityContactsNoNumber,
    PriorityStarred,
    PriorityNotStarred,
    PriorityStarredNoNumber,
    PriorityUnknownSenderPolicy,
    PriorityNotRepeatCaller,
    PriorityDefaultBlock,
    UnknownFilter,
}

impl RingReason {
    /// The stable reason string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockedHiddenNumber => "Blocked: empty/hidden number",
            Self::BlockedUnknownNumber => "Blocked: unknown number",
            Self::DndOff => "DND off (FILTER_ALL)",
            Self::DndBlocksCalls => "DND blocks calls (ALARMS/NONE)",
            Self::RepeatCaller => "Priority: repeat caller within window",
            Self::PriorityAnySender => "Priority ANY: all senders allowed",
            Self::PriorityContact => "Priority CONTACTS: caller is a contact",
            Self::PriorityNotContact => "Priority CONTACTS: caller not in contacts",
            Self::PriorityContactsNoNumber => "Priority CONTACTS: no number",
            Self::PriorityStarred => "Priority STARRED: caller is starred",
            Self::PriorityNotStarred => "Priority STARRED: caller not starred",
            Self::PriorityStarredNoNumber => "Priority STARRED: no number",
            Self::PriorityUnknownSenderPolicy => "Priority: unknown sender policy, blocking",
            Self::PriorityNotRepeatCaller => "Priority REPEAT_CALLERS: not a repeat caller",
            Self::PriorityDefaultBlock => "Priority mode: default block",
            Self::UnknownFilter => "Unknown filter, defaulting to ring",
        }
    }

    /// Whether the call was stopped by the app's own caller blocking
    /// rather than by the interruption filter
    pub fn is_app_block(&self) -> bool {
        matches!(self, Self::BlockedHiddenNumber | Self::BlockedUnknownNumber)
    }
}

impl fmt::Display for RingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a ring decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingDecision {
    pub should_ring: bool,
    pub reason: RingReason,
}

impl RingDecision {
    pub(crate) fn ring(reason: RingReason) -> Self {
        Self {
            should_ring: true,
            reason,
        }
    }

    pub(crate) fn silence(reason: RingReason) -> Self {
        Self {
            should_ring: false,
            reason,
        }
    }

    /// The stable reason string
    pub fn reason_str(&self) -> &'static str {
        self.reason.as_str()
    }

    /// The call should be declined outright, not merely left silent
    pub fn blocked_by_app(&self) -> bool {
        !self.should_ring && self.reason.is_app_block()
    }
}
