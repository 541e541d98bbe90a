//! Recording fakes shared by the integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use dialer_call_core::{
    AlertPort, AudioRoute, CallCoordinator, CallId, CallSnapshot, Clock, ContactBook,
    CoordinatorConfig, IndicatorPort, OrientationCell, StaticEnvironment, TelephonyPort,
    WakeHoldPort,
};

/// Everything the coordinator asked the outside world to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortAction {
    Answer(CallId),
    Reject(CallId),
    Disconnect(CallId),
    SetRoute(CallId, AudioRoute),
    Dtmf(CallId, char),
    StartAlerting(CallId),
    StopAlerting,
    ShowOngoing(CallId),
    HideOngoing,
    Missed(Option<String>),
    Blocked(String),
    WakeAcquire,
    WakeRelease,
}

#[derive(Default)]
pub struct Recorder {
    actions: Mutex<Vec<PortAction>>,
}

impl Recorder {
    fn push(&self, action: PortAction) {
        self.actions.lock().push(action);
    }

    pub fn actions(&self) -> Vec<PortAction> {
        self.actions.lock().clone()
    }

    pub fn count(&self, wanted: &PortAction) -> usize {
        self.actions.lock().iter().filter(|a| *a == wanted).count()
    }

    pub fn contains(&self, wanted: &PortAction) -> bool {
        self.count(wanted) > 0
    }

    pub fn clear(&self) {
        self.actions.lock().clear();
    }
}

impl TelephonyPort for Recorder {
    fn answer(&self, call_id: CallId) {
        self.push(PortAction::Answer(call_id));
    }

    fn reject(&self, call_id: CallId) {
        self.push(PortAction::Reject(call_id));
    }

    fn disconnect(&self, call_id: CallId) {
        self.push(PortAction::Disconnect(call_id));
    }

    fn set_audio_route(&self, call_id: CallId, route: AudioRoute) {
        self.push(PortAction::SetRoute(call_id, route));
    }

    fn play_dtmf(&self, call_id: CallId, digit: char) {
        self.push(PortAction::Dtmf(call_id, digit));
    }
}

impl AlertPort for Recorder {
    fn start_alerting(&self, call_id: CallId) {
        self.push(PortAction::StartAlerting(call_id));
    }

    fn stop_alerting(&self) {
        self.push(PortAction::StopAlerting);
    }
}

impl IndicatorPort for Recorder {
    fn show_ongoing(&self, call_id: CallId) {
        self.push(PortAction::ShowOngoing(call_id));
    }

    fn hide_ongoing(&self) {
        self.push(PortAction::HideOngoing);
    }

    fn missed_call(&self, caller_number: Option<&str>, _caller_display_name: Option<&str>) {
        self.push(PortAction::Missed(caller_number.map(str::to_string)));
    }

    fn blocked_call(&self, caller_number: &str) {
        self.push(PortAction::Blocked(caller_number.to_string()));
    }
}

impl WakeHoldPort for Recorder {
    fn acquire(&self) {
        self.push(PortAction::WakeAcquire);
    }

    fn release(&self) {
        self.push(PortAction::WakeRelease);
    }
}

/// Manually advanced clock
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Every snapshot an observer received, in order
#[derive(Default)]
pub struct SnapshotLog {
    snapshots: Mutex<Vec<CallSnapshot>>,
}

impl SnapshotLog {
    pub fn all(&self) -> Vec<CallSnapshot> {
        self.snapshots.lock().clone()
    }

    pub fn last(&self) -> Option<CallSnapshot> {
        self.snapshots.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }
}

impl dialer_call_core::CallObserver for SnapshotLog {
    fn on_call_state_changed(&self, snapshot: &CallSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

/// A coordinator wired to recording fakes
pub struct Fixture {
    pub coordinator: Arc<CallCoordinator>,
    pub recorder: Arc<Recorder>,
    pub env: Arc<StaticEnvironment>,
    pub contacts: Arc<ContactBook>,
    pub clock: Arc<ManualClock>,
    pub orientation: OrientationCell,
    pub snapshots: Arc<SnapshotLog>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        let recorder = Arc::new(Recorder::default());
        let env = Arc::new(StaticEnvironment::new());
        let contacts = Arc::new(ContactBook::new());
        let clock = Arc::new(ManualClock::new());
        let orientation = OrientationCell::new();
        let snapshots = Arc::new(SnapshotLog::default());

        let coordinator = CallCoordinator::builder()
            .with_config(config)
            .with_telephony(recorder.clone())
            .with_alerts(recorder.clone())
            .with_indicators(recorder.clone())
            .with_wake_hold(recorder.clone())
            .with_dnd_source(env.clone())
            .with_settings(env.clone())
            .with_contacts(contacts.clone())
            .with_clock(clock.clone())
            .with_orientation(orientation.clone())
            .build()
            .expect("valid test configuration");
        coordinator.register_observer(snapshots.clone());

        Self {
            coordinator,
            recorder,
            env,
            contacts,
            clock,
            orientation,
            snapshots,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
