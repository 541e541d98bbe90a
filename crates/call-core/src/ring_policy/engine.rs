use chrono::{DateTime, Utc};
use tracing::debug;

use super::types::{
    ContactLookup, DndState, InterruptionFilter, PrioritySenders, RingDecision, RingReason,
};
use crate::number::NormalizedNumber;
use crate::recent_callers::RecentCallerCache;

/// Decides whether an incoming call should audibly ring
///
/// The policy owns the recent-caller cache; it is the only writer of that
/// cache. Every input, including a withheld number, yields a decision.
#[derive(Debug, Clone, Default)]
pub struct RingPolicy {
    recent_callers: RecentCallerCache,
}

impl RingPolicy {
    /// Create a policy with the default 15 minute repeat-caller window
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy with a custom repeat-caller window
    pub fn with_repeat_window_secs(window_secs: u64) -> Self {
        Self {
            recent_callers: RecentCallerCache::with_window_secs(window_secs),
        }
    }

    /// The recent-caller cache backing repeat-caller detection
    pub fn recent_callers(&self) -> &RecentCallerCache {
        &self.recent_callers
    }

    /// Decide whether to ring for `caller_number`
    ///
    /// Steps run in a fixed order and the first one that applies wins:
    /// app-level blocking, then the interruption filter, then (in priority
    /// mode) repeat callers before the priority sender policy.
    pub fn decide<C>(
        &mut self,
        caller_number: Option<&str>,
        block_unknown_callers: bool,
        dnd: &DndState,
        contacts: &C,
        now: DateTime<Utc>,
    ) -> RingDecision
    where
        C: ContactLookup + ?Sized,
    {
        let normalized = NormalizedNumber::from_caller(caller_number);

        let decision = self.evaluate(normalized.as_ref(), block_unknown_callers, dnd, contacts, now);

        debug!(
            caller = normalized.as_ref().map(|n| n.as_str()).unwrap_or("<hidden>"),
            filter = ?dnd.interruption_filter,
            should_ring = decision.should_ring,
            reason = decision.reason_str(),
            "Ring decision"
        );

        decision
    }

    fn evaluate<C>(
        &mut self,
        number: Option<&NormalizedNumber>,
        block_unknown_callers: bool,
        dnd: &DndState,
        contacts: &C,
        now: DateTime<Utc>,
    ) -> RingDecision
    where
        C: ContactLookup + ?Sized,
    {
        if block_unknown_callers {
            match number {
                None => return RingDecision::silence(RingReason::BlockedHiddenNumber),
                Some(n) if contacts.lookup(n).is_none() => {
                    return RingDecision::silence(RingReason::BlockedUnknownNumber);
                }
                Some(_) => {}
            }
        }

        match dnd.interruption_filter {
            InterruptionFilter::All => RingDecision::ring(RingReason::DndOff),
            InterruptionFilter::AlarmsOnly | InterruptionFilter::None => {
                RingDecision::silence(RingReason::DndBlocksCalls)
            }
            InterruptionFilter::Priority => self.evaluate_priority(number, dnd, contacts, now),
            InterruptionFilter::Unknown(_) => RingDecision::ring(RingReason::UnknownFilter),
        }
    }

    fn evaluate_priority<C>(
        &mut self,
        number: Option<&NormalizedNumber>,
        dnd: &DndState,
        contacts: &C,
        now: DateTime<Utc>,
    ) -> RingDecision
    where
        C: ContactLookup + ?Sized,
    {
        if let Some(n) = number {
            let seen = self.recent_callers.last_seen(n, now);
            // Recorded on every priority-mode call so the next attempt is a repeat
            self.recent_callers.record(n, now);
            if seen.is_some() {
                return RingDecision::ring(RingReason::RepeatCaller);
            }
        }

        if dnd.priority_calls_allowed {
            return match dnd.priority_sender_policy {
                PrioritySenders::Any => RingDecision::ring(RingReason::PriorityAnySender),
                PrioritySenders::ContactsOnly => match number {
                    None => RingDecision::silence(RingReason::PriorityContactsNoNumber),
                    Some(n) if contacts.lookup(n).is_some() => {
                        RingDecision::ring(RingReason::PriorityContact)
                    }
                    Some(_) => RingDecision::silence(RingReason::PriorityNotContact),
                },
                PrioritySenders::StarredOnly => match number {
                    None => RingDecision::silence(RingReason::PriorityStarredNoNumber),
                    Some(n) if contacts.lookup(n).map_or(false, |c| c.is_favorite) => {
                        RingDecision::ring(RingReason::PriorityStarred)
                    }
                    Some(_) => RingDecision::silence(RingReason::PriorityNotStarred),
                },
                PrioritySenders::Unknown(_) => {
                    RingDecision::silence(RingReason::PriorityUnknownSenderPolicy)
                }
            };
        }

        // The repeat-caller category only ever grants a ring through the cache hit above
        if dnd.priority_repeat_callers_allowed {
            return RingDecision::silence(RingReason::PriorityNotRepeatCaller);
        }

        RingDecision::silence(RingReason::PriorityDefaultBlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_policy::types::ContactRef;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    struct Contacts(HashMap<String, ContactRef>);

    impl Contacts {
        fn empty() -> Self {
            Self(HashMap::new())
        }

        fn with(mut self, number: &str, contact: ContactRef) -> Self {
            self.0.insert(number.to_string(), contact);
            self
        }
    }

    impl ContactLookup for Contacts {
        fn lookup(&self, number: &NormalizedNumber) -> Option<ContactRef> {
            self.0.get(number.as_str()).cloned()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap()
    }

    fn priority(calls: bool, senders: PrioritySenders, repeat: bool) -> DndState {
        DndState::priority(calls, senders, repeat)
    }

    // ===== DND OFF =====

    #[test]
    fn dnd_off_rings_for_known_unknown_and_hidden_numbers() {
        let mut policy = RingPolicy::new();
        let contacts = Contacts::empty().with("+1234567890", ContactRef::known());

        for caller in [Some("+1234567890"), Some("+9999999999"), None] {
            let decision = policy.decide(caller, false, &DndState::off(), &contacts, t0());
            assert!(decision.should_ring, "caller {:?} should ring", caller);
            assert_eq!(decision.reason, RingReason::DndOff);
        }
    }

    // ===== ALARMS / NONE =====

    #[test]
    fn alarms_and_none_never_ring() {
        let contacts = Contacts::empty().with("+1234567890", ContactRef::favorite());

        for filter in [InterruptionFilter::AlarmsOnly, InterruptionFilter::None] {
            let mut policy = RingPolicy::new();
            let dnd = DndState::with_filter(filter);
            // A repeat attempt must not matter either
            for _ in 0..2 {
                let decision = policy.decide(Some("+1234567890"), false, &dnd, &contacts, t0());
                assert!(!decision.should_ring);
                assert_eq!(decision.reason_str(), "DND blocks calls (ALARMS/NONE)");
            }
        }
    }

    #[test]
    fn unknown_filter_fails_open() {
        let mut policy = RingPolicy::new();
        let dnd = DndState::with_filter(InterruptionFilter::Unknown(42));
        let decision = policy.decide(None, false, &dnd, &Contacts::empty(), t0());

        assert!(decision.should_ring);
        assert_eq!(decision.reason, RingReason::UnknownFilter);
    }

    // ===== APP-LEVEL BLOCKING =====

    #[test]
    fn block_unknown_rejects_hidden_and_empty_numbers() {
        let mut policy = RingPolicy::new();
        for caller in [None, Some(""), Some("Private")] {
            let decision = policy.decide(caller, true, &DndState::off(), &Contacts::empty(), t0());
            assert!(!decision.should_ring);
            assert!(decision.reason_str().contains("empty/hidden"));
            assert!(decision.blocked_by_app());
        }
    }

    #[test]
    fn block_unknown_rejects_numbers_not_in_contacts() {
        let mut policy = RingPolicy::new();
        let decision = policy.decide(Some("+9999999999"), true, &DndState::off(), &Contacts::empty(), t0());

        assert!(!decision.should_ring);
        assert_eq!(decision.reason, RingReason::BlockedUnknownNumber);
    }

    #[test]
    fn block_unknown_lets_known_contacts_through_to_dnd() {
        let mut policy = RingPolicy::new();
        let contacts = Contacts::empty().with("+1234567890", ContactRef::known());

        let decision = policy.decide(Some("+1 (234) 567-890"), true, &DndState::off(), &contacts, t0());
        assert!(decision.should_ring);

        let dnd = DndState::with_filter(InterruptionFilter::None);
        let decision = policy.decide(Some("+1234567890"), true, &dnd, &contacts, t0());
        assert!(!decision.should_ring);
        assert!(!decision.blocked_by_app());
    }

    // ===== PRIORITY: REPEAT CALLERS =====

    #[test]
    fn first_priority_call_is_silent_and_second_within_window_rings() {
        let mut policy = RingPolicy::new();
        let dnd = priority(false, PrioritySenders::Any, false);

        let first = policy.decide(Some("+9999999999"), false, &dnd, &Contacts::empty(), t0());
        assert!(!first.should_ring);
        assert_eq!(first.reason, RingReason::PriorityDefaultBlock);

        let second = policy.decide(
            Some("+9999999999"),
            false,
            &dnd,
            &Contacts::empty(),
            t0() + Duration::minutes(5),
        );
        assert!(second.should_ring);
        assert_eq!(second.reason, RingReason::RepeatCaller);
    }

    #[test]
    fn repeat_window_boundary() {
        let dnd = priority(false, PrioritySenders::Any, false);

        let mut policy = RingPolicy::new();
        policy.decide(Some("555-0100"), false, &dnd, &Contacts::empty(), t0());
        let at_boundary =
            policy.decide(Some("5550100"), false, &dnd, &Contacts::empty(), t0() + Duration::minutes(15));
        assert!(at_boundary.should_ring);

        let mut policy = RingPolicy::new();
        policy.decide(Some("555-0100"), false, &dnd, &Contacts::empty(), t0());
        let past_boundary = policy.decide(
            Some("5550100"),
            false,
            &dnd,
            &Contacts::empty(),
            t0() + Duration::minutes(15) + Duration::seconds(1),
        );
        assert!(!past_boundary.should_ring);
    }

    #[test]
    fn repeat_caller_overrides_sender_policy() {
        let mut policy = RingPolicy::new();
        let dnd = priority(true, PrioritySenders::StarredOnly, false);

        let first = policy.decide(Some("+4470000"), false, &dnd, &Contacts::empty(), t0());
        assert_eq!(first.reason, RingReason::PriorityNotStarred);

        let second =
            policy.decide(Some("+4470000"), false, &dnd, &Contacts::empty(), t0() + Duration::minutes(1));
        assert!(second.should_ring);
        assert_eq!(second.reason, RingReason::RepeatCaller);
    }

    #[test]
    fn repeat_hit_refreshes_the_sighting() {
        let mut policy = RingPolicy::new();
        let dnd = priority(false, PrioritySenders::Any, false);

        policy.decide(Some("777"), false, &dnd, &Contacts::empty(), t0());
        policy.decide(Some("777"), false, &dnd, &Contacts::empty(), t0() + Duration::minutes(10));
        let third =
            policy.decide(Some("777"), false, &dnd, &Contacts::empty(), t0() + Duration::minutes(20));

        assert!(third.should_ring, "second call must have refreshed the timestamp");
    }

    #[test]
    fn different_numbers_are_not_repeat_callers() {
        let mut policy = RingPolicy::new();
        let dnd = priority(false, PrioritySenders::Any, false);

        policy.decide(Some("+1111111111"), false, &dnd, &Contacts::empty(), t0());
        let other =
            policy.decide(Some("+2222222222"), false, &dnd, &Contacts::empty(), t0() + Duration::minutes(5));
        assert!(!other.should_ring);
    }

    #[test]
    fn hidden_number_in_priority_mode_is_not_cached() {
        let mut policy = RingPolicy::new();
        let dnd = priority(false, PrioritySenders::Any, true);

        let decision = policy.decide(None, false, &dnd, &Contacts::empty(), t0());
        assert!(!decision.should_ring);
        assert_eq!(decision.reason, RingReason::PriorityNotRepeatCaller);
        assert!(policy.recent_callers().is_empty());
    }

    #[test]
    fn app_blocked_repeat_callers_stay_blocked() {
        let mut policy = RingPolicy::new();
        let dnd = priority(false, PrioritySenders::Any, true);

        policy.decide(Some("+9999999999"), true, &dnd, &Contacts::empty(), t0());
        let second =
            policy.decide(Some("+9999999999"), true, &dnd, &Contacts::empty(), t0() + Duration::minutes(5));

        assert!(!second.should_ring);
        assert_eq!(second.reason, RingReason::BlockedUnknownNumber);
    }

    #[test]
    fn known_contact_repeat_caller_rings_with_blocking_on() {
        let mut policy = RingPolicy::new();
        let contacts = Contacts::empty().with("+1234567890", ContactRef::known());
        let dnd = priority(false, PrioritySenders::Any, true);

        let first = policy.decide(Some("+1234567890"), true, &dnd, &contacts, t0());
        assert!(!first.should_ring);

        let second = policy.decide(Some("+1234567890"), true, &dnd, &contacts, t0() + Duration::minutes(5));
        assert!(second.should_ring);
    }

    // ===== PRIORITY: SENDER POLICY =====

    #[test]
    fn priority_any_sender_rings() {
        let mut policy = RingPolicy::new();
        let dnd = priority(true, PrioritySenders::Any, false);
        let decision = policy.decide(Some("+9999999999"), false, &dnd, &Contacts::empty(), t0());

        assert!(decision.should_ring);
        assert_eq!(decision.reason, RingReason::PriorityAnySender);
    }

    #[test]
    fn priority_contacts_only() {
        let contacts = Contacts::empty().with("+1234567890", ContactRef::known());
        let dnd = priority(true, PrioritySenders::ContactsOnly, false);

        let mut policy = RingPolicy::new();
        assert!(policy.decide(Some("+1234567890"), false, &dnd, &contacts, t0()).should_ring);
        assert_eq!(
            policy.decide(Some("+9999999999"), false, &dnd, &contacts, t0()).reason,
            RingReason::PriorityNotContact
        );
        assert_eq!(
            policy.decide(None, false, &dnd, &contacts, t0()).reason,
            RingReason::PriorityContactsNoNumber
        );
    }

    #[test]
    fn priority_starred_only() {
        let contacts = Contacts::empty()
            .with("+1111111111", ContactRef::favorite())
            .with("+2222222222", ContactRef::known());
        let dnd = priority(true, PrioritySenders::StarredOnly, false);

        let mut policy = RingPolicy::new();
        let starred = policy.decide(Some("+1111111111"), false, &dnd, &contacts, t0());
        assert!(starred.should_ring);
        assert_eq!(starred.reason, RingReason::PriorityStarred);

        let plain = policy.decide(Some("+2222222222"), false, &dnd, &contacts, t0());
        assert!(!plain.should_ring);
        assert_eq!(plain.reason, RingReason::PriorityNotStarred);

        let unknown = policy.decide(Some("+3333333333"), false, &dnd, &contacts, t0());
        assert!(!unknown.should_ring);

        let hidden = policy.decide(None, false, &dnd, &contacts, t0());
        assert_eq!(hidden.reason, RingReason::PriorityStarredNoNumber);
    }

    #[test]
    fn priority_unknown_sender_policy_blocks() {
        let mut policy = RingPolicy::new();
        let dnd = priority(true, PrioritySenders::Unknown(7), false);
        let decision = policy.decide(Some("+1"), false, &dnd, &Contacts::empty(), t0());

        assert!(!decision.should_ring);
        assert_eq!(decision.reason, RingReason::PriorityUnknownSenderPolicy);
    }

    #[test]
    fn repeat_category_alone_never_grants_a_ring() {
        let mut policy = RingPolicy::new();
        let dnd = priority(false, PrioritySenders::Any, true);
        let decision = policy.decide(Some("+15550001"), false, &dnd, &Contacts::empty(), t0());

        assert!(!decision.should_ring);
        assert_eq!(decision.reason_str(), "Priority REPEAT_CALLERS: not a repeat caller");
    }

    #[test]
    fn closures_work_as_contact_lookup() {
        let lookup = |n: &NormalizedNumber| {
            (n.as_str() == "+1234567890").then(ContactRef::favorite)
        };
        let mut policy = RingPolicy::new();
        let dnd = priority(true, PrioritySenders::StarredOnly, false);

        assert!(policy.decide(Some("+1 234 567 890"), false, &dnd, &lookup, t0()).should_ring);
    }
}
