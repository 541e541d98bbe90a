//! Call lifecycle coordinator
//!
//! [`CallCoordinator`] owns the state of the single current call together
//! with the audio routes, and reacts to two inputs:
//!
//! - telephony events ([`TelephonyEvent`]), which drive the state machine
//! - UI actions (answer, reject, hang up, silence, route selection, DTMF)
//!
//! ```text
//!                 call arrived (incoming)          call arrived (outgoing)
//!   Idle ───────────────────────────► Ringing    Idle ──────────────► Dialing
//!                                        │                               │
//!                                        ▼                               ▼
//!                           Connecting / Active / Holding  ◄─────────────┘
//!                                        │
//!                                        ▼
//!                                  Disconnected ──(call removed)──► Idle
//! ```
//!
//! All mutation happens under one mutex and every change is followed, still
//! under that mutex, by a full [`CallSnapshot`] delivered to each observer.
//! An event or action that does not fit the current state is ignored and
//! reported as [`ActionOutcome::Ignored`]; nothing here returns an error.
//!
//! Hosts that receive events on several threads should feed the coordinator
//! through [`CallEventLoop`](crate::service::CallEventLoop), which also runs
//! the ring silence timer.

mod alerting;
pub mod builder;
pub mod observer;
mod wake_hold;

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use self::alerting::Alerting;
use self::observer::ObserverRegistry;
use self::wake_hold::WakeHold;
use crate::audio::{select_answer_route, AudioRoute, AudioRouteState, OrientationCell};
use crate::call::{Call, CallDirection, CallId, CallSnapshot, CallState, DisconnectReason};
use crate::config::CoordinatorConfig;
use crate::events::{ActionOutcome, IgnoreReason, TelephonyEvent};
use crate::ports::{
    AlertPort, CallSettings, Clock, DndSource, IndicatorPort, TelephonyPort, WakeHoldPort,
};
use crate::ring_policy::{ContactLookup, RingPolicy};

pub use builder::CallCoordinatorBuilder;
pub use observer::{CallObserver, ObserverId};

/// Shown as the last blocked number when the blocked caller withheld it
pub const UNKNOWN_BLOCKED_NUMBER: &str = "Unknown";

/// Ports that are only ever called, never tracked
pub(crate) struct Ports {
    pub(crate) telephony: Arc<dyn TelephonyPort>,
    pub(crate) indicators: Arc<dyn IndicatorPort>,
    pub(crate) dnd: Arc<dyn DndSource>,
    pub(crate) settings: Arc<dyn CallSettings>,
    pub(crate) contacts: Arc<dyn ContactLookup + Send + Sync>,
    pub(crate) clock: Arc<dyn Clock>,
}

struct CoordinatorState {
    call: Option<Call>,
    audio: AudioRouteState,
    alerting: Alerting,
    wake_hold: WakeHold,
    /// Whether the ongoing-call indicator is currently shown
    ongoing_shown: bool,
    highlight_speaker: bool,
    /// Latest proximity reading; survives across calls
    at_ear: bool,
    last_blocked_number: Option<String>,
    ring_policy: RingPolicy,
    observers: ObserverRegistry,
}

impl CoordinatorState {
    fn snapshot(&self) -> CallSnapshot {
        let mut snapshot = CallSnapshot::idle(self.audio);
        snapshot.alerting = self.alerting.is_active();
        snapshot.highlight_speaker = self.highlight_speaker;
        if let Some(call) = &self.call {
            snapshot.state = call.state;
            snapshot.call_id = Some(call.id);
            snapshot.direction = Some(call.direction);
            snapshot.caller_number = call.caller_number.clone();
            snapshot.caller_display_name = call.caller_display_name.clone();
            snapshot.disconnect_reason = call.disconnect_reason;
        }
        snapshot
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.observers.notify(&snapshot);
    }

    fn current_state(&self) -> CallState {
        self.call.as_ref().map_or(CallState::Idle, |call| call.state)
    }

    /// Recompute the speaker highlight; returns whether it changed
    fn refresh_highlight(&mut self) -> bool {
        let highlight = self.current_state().is_in_conversation()
            && !self.at_ear
            && self.audio.current_route() != AudioRoute::Speaker;
        let changed = highlight != self.highlight_speaker;
        self.highlight_speaker = highlight;
        changed
    }

    /// Look up the current call by id, for events and actions that name one
    fn call_mut(&mut self, call_id: CallId) -> Result<&mut Call, IgnoreReason> {
        match self.call.as_mut() {
            None => Err(IgnoreReason::NoCall),
            Some(call) if call.id != call_id => Err(IgnoreReason::UnknownCall),
            Some(call) => Ok(call),
        }
    }

    /// The current call, if it has not ended
    fn live_call(&self) -> Result<&Call, IgnoreReason> {
        match &self.call {
            None => Err(IgnoreReason::NoCall),
            Some(call) if !call.state.is_live() => Err(IgnoreReason::InvalidState(call.state)),
            Some(call) => Ok(call),
        }
    }
}

/// Coordinates one phone call at a time
///
/// Create one with [`CallCoordinatorBuilder`]. Instances are independent of
/// each other; nothing is process-global.
pub struct CallCoordinator {
    config: CoordinatorConfig,
    ports: Ports,
    orientation: OrientationCell,
    state: Mutex<CoordinatorState>,
}

impl CallCoordinator {
    pub(crate) fn from_parts(
        config: CoordinatorConfig,
        ports: Ports,
        alerts: Arc<dyn AlertPort>,
        wake_hold: Arc<dyn WakeHoldPort>,
        orientation: OrientationCell,
    ) -> Self {
        let state = CoordinatorState {
            call: None,
            audio: AudioRouteState::default(),
            alerting: Alerting::new(alerts),
            wake_hold: WakeHold::new(wake_hold),
            ongoing_shown: false,
            highlight_speaker: false,
            at_ear: false,
            last_blocked_number: None,
            ring_policy: RingPolicy::with_repeat_window_secs(config.repeat_caller_window_secs),
            observers: ObserverRegistry::default(),
        };
        Self {
            config,
            ports,
            orientation,
            state: Mutex::new(state),
        }
    }

    pub fn builder() -> CallCoordinatorBuilder {
        CallCoordinatorBuilder::new()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The orientation cell read when a call is answered
    pub fn orientation(&self) -> &OrientationCell {
        &self.orientation
    }

    /// Complete current state
    pub fn snapshot(&self) -> CallSnapshot {
        self.state.lock().snapshot()
    }

    /// Number of the most recently blocked caller (`"Unknown"` if withheld)
    pub fn last_blocked_number(&self) -> Option<String> {
        self.state.lock().last_blocked_number.clone()
    }

    /// Whether the wake-hold is currently held
    pub fn is_wake_hold_held(&self) -> bool {
        self.state.lock().wake_hold.is_held()
    }

    /// Generation of the running alerting episode, if the ringer is on
    pub fn alerting_generation(&self) -> Option<u64> {
        self.state.lock().alerting.current_generation()
    }

    /// Register an observer; it immediately receives the current snapshot
    pub fn register_observer(&self, observer: Arc<dyn CallObserver>) -> ObserverId {
        let mut state = self.state.lock();
        let id = state.observers.insert(observer);
        let snapshot = state.snapshot();
        state.observers.notify_one(id, &snapshot);
        debug!(observer = %id, "Observer registered");
        id
    }

    /// Remove an observer; returns false if it was not registered
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        let removed = self.state.lock().observers.remove(id);
        if removed {
            debug!(observer = %id, "Observer unregistered");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    // ===== Telephony events =====

    /// Apply a telephony event
    pub fn handle_telephony_event(&self, event: TelephonyEvent) -> ActionOutcome {
        match event {
            TelephonyEvent::CallArrived {
                call_id,
                direction,
                caller_number,
                caller_display_name,
            } => self.call_arrived(call_id, direction, caller_number, caller_display_name),
            TelephonyEvent::StateChanged {
                call_id,
                state,
                disconnect_reason,
            } => self.state_changed(call_id, state, disconnect_reason),
            TelephonyEvent::DetailsChanged {
                call_id,
                caller_number,
                caller_display_name,
            } => self.details_changed(call_id, caller_number, caller_display_name),
            TelephonyEvent::AudioStateChanged { audio } => self.audio_state_changed(audio),
            TelephonyEvent::CallRemoved { call_id } => self.call_removed(call_id),
        }
    }

    /// A new call was created by the telephony layer
    pub fn call_arrived(
        &self,
        call_id: CallId,
        direction: CallDirection,
        caller_number: Option<String>,
        caller_display_name: Option<String>,
    ) -> ActionOutcome {
        let mut state = self.state.lock();
        let mut pulse_acknowledged = false;

        if let Some(current) = &state.call {
            if current.id == call_id {
                return ignored("call arrived", IgnoreReason::Unchanged);
            }
            if current.state.is_live() {
                let busy_state = current.state;
                return self.waiting_call(busy_state, call_id, direction, caller_number, caller_display_name);
            }
            // A new arrival acknowledges a call still in its Disconnected pulse
            state.call = None;
            pulse_acknowledged = true;
        }

        let now = self.ports.clock.now();

        if direction == CallDirection::Incoming {
            let dnd = self.ports.dnd.current_dnd_state().unwrap_or_default();
            let block_unknown = self.ports.settings.block_unknown_callers();
            let decision = state.ring_policy.decide(
                caller_number.as_deref(),
                block_unknown,
                &dnd,
                self.ports.contacts.as_ref(),
                now,
            );

            if decision.blocked_by_app() {
                let shown = caller_number
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(UNKNOWN_BLOCKED_NUMBER)
                    .to_string();
                self.ports.telephony.reject(call_id);
                self.ports.indicators.blocked_call(&shown);
                info!(%call_id, number = %shown, reason = decision.reason_str(), "Blocked incoming call");
                state.last_blocked_number = Some(shown);
                if pulse_acknowledged {
                    state.refresh_highlight();
                    state.publish();
                }
                return ActionOutcome::Performed;
            }

            let call = Call::new(call_id, direction, caller_number, caller_display_name, now);
            info!(%call_id, should_ring = decision.should_ring, reason = decision.reason_str(), "Incoming call");
            state.call = Some(call);
            state.highlight_speaker = false;
            state.wake_hold.acquire();
            if decision.should_ring {
                state.alerting.start(call_id);
            }
        } else {
            let call = Call::new(call_id, direction, caller_number, caller_display_name, now);
            info!(%call_id, "Outgoing call");
            state.call = Some(call);
            state.highlight_speaker = false;
            state.wake_hold.acquire();
            self.show_ongoing(&mut state, call_id);
        }

        state.refresh_highlight();
        state.publish();
        ActionOutcome::Performed
    }

    fn waiting_call(
        &self,
        busy_state: CallState,
        call_id: CallId,
        direction: CallDirection,
        caller_number: Option<String>,
        caller_display_name: Option<String>,
    ) -> ActionOutcome {
        if direction != CallDirection::Incoming || !self.config.reject_waiting_calls {
            return ignored("call arrived", IgnoreReason::InvalidState(busy_state));
        }
        self.ports.telephony.reject(call_id);
        self.ports
            .indicators
            .missed_call(caller_number.as_deref(), caller_display_name.as_deref());
        info!(%call_id, busy = %busy_state, "Rejected waiting call");
        ActionOutcome::Performed
    }

    /// The telephony layer reports a new state for a call
    pub fn state_changed(
        &self,
        call_id: CallId,
        new_state: CallState,
        disconnect_reason: Option<DisconnectReason>,
    ) -> ActionOutcome {
        let mut state = self.state.lock();

        let call = match state.call_mut(call_id) {
            Ok(call) => call,
            Err(reason) => return ignored("state changed", reason),
        };
        let old_state = call.state;
        if old_state == CallState::Disconnected || new_state == CallState::Idle {
            return ignored("state changed", IgnoreReason::InvalidState(old_state));
        }
        if old_state == new_state {
            return ignored("state changed", IgnoreReason::Unchanged);
        }

        call.state = new_state;
        if new_state == CallState::Active {
            call.answered = true;
        }
        info!(%call_id, from = %old_state, to = %new_state, "Call state changed");

        if old_state == CallState::Ringing {
            state.alerting.stop();
        }
        if new_state.needs_wake_hold() {
            state.wake_hold.acquire();
        }
        if new_state.shows_ongoing_indicator() {
            self.show_ongoing(&mut state, call_id);
        }

        if new_state == CallState::Disconnected {
            self.finish_call(&mut state, disconnect_reason);
        }

        state.refresh_highlight();
        state.publish();
        ActionOutcome::Performed
    }

    fn finish_call(&self, state: &mut CoordinatorState, disconnect_reason: Option<DisconnectReason>) {
        state.alerting.stop();
        state.wake_hold.release();
        self.hide_ongoing(state);

        if let Some(call) = state.call.as_mut() {
            call.disconnect_reason = Some(disconnect_reason.unwrap_or(DisconnectReason::Other));
            if call.is_missed() {
                info!(call_id = %call.id, "Missed call");
                self.ports
                    .indicators
                    .missed_call(call.caller_number.as_deref(), call.caller_display_name.as_deref());
            }
            call.caller_number = None;
            call.caller_display_name = None;
        }
    }

    /// Caller identity details were updated
    pub fn details_changed(
        &self,
        call_id: CallId,
        caller_number: Option<String>,
        caller_display_name: Option<String>,
    ) -> ActionOutcome {
        let mut state = self.state.lock();
        let call = match state.call_mut(call_id) {
            Ok(call) => call,
            Err(reason) => return ignored("details changed", reason),
        };
        if !call.state.is_live() {
            return ignored("details changed", IgnoreReason::InvalidState(call.state));
        }
        if call.caller_number == caller_number && call.caller_display_name == caller_display_name {
            return ignored("details changed", IgnoreReason::Unchanged);
        }
        call.caller_number = caller_number;
        call.caller_display_name = caller_display_name;
        state.publish();
        ActionOutcome::Performed
    }

    /// The supported or current audio routes changed
    pub fn audio_state_changed(&self, audio: AudioRouteState) -> ActionOutcome {
        let mut state = self.state.lock();
        if state.audio == audio {
            return ignored("audio state changed", IgnoreReason::Unchanged);
        }
        debug!(route = %audio.current_route(), supported = audio.supported_routes().bits(), "Audio state changed");
        state.audio = audio;
        state.refresh_highlight();
        state.publish();
        ActionOutcome::Performed
    }

    /// The telephony layer released the call; the coordinator returns to idle
    pub fn call_removed(&self, call_id: CallId) -> ActionOutcome {
        let mut state = self.state.lock();
        if let Err(reason) = state.call_mut(call_id) {
            return ignored("call removed", reason);
        }

        // Normally already done on Disconnected; covers removal without one
        state.alerting.stop();
        state.wake_hold.release();
        self.hide_ongoing(&mut state);

        state.call = None;
        state.highlight_speaker = false;
        info!(%call_id, "Call removed");
        state.publish();
        ActionOutcome::Performed
    }

    // ===== UI actions =====

    /// Answer the ringing call, applying the selected initial route first
    pub fn answer(&self) -> ActionOutcome {
        let mut state = self.state.lock();
        let call_id = match &state.call {
            Some(call) if call.state == CallState::Ringing => call.id,
            Some(call) => return ignored("answer", IgnoreReason::InvalidState(call.state)),
            None => return ignored("answer", IgnoreReason::NoCall),
        };

        let now = self.ports.clock.now();
        let is_flat = self.orientation.is_flat(now, self.config.orientation_max_age());
        let prefer_speaker = self.ports.settings.prefer_speaker_when_flat();
        let route = select_answer_route(state.audio.supported_routes(), prefer_speaker, is_flat);
        info!(%call_id, %route, is_flat, prefer_speaker, "Answering call");

        self.ports.telephony.set_audio_route(call_id, route);
        state.audio.set_current(route);
        self.ports.telephony.answer(call_id);

        state.refresh_highlight();
        state.publish();
        ActionOutcome::Performed
    }

    /// Decline the current call
    pub fn reject(&self) -> ActionOutcome {
        let state = self.state.lock();
        match state.live_call() {
            Ok(call) => {
                info!(call_id = %call.id, "Rejecting call");
                self.ports.telephony.reject(call.id);
                ActionOutcome::Performed
            }
            Err(reason) => ignored("reject", reason),
        }
    }

    /// End the current call
    pub fn hang_up(&self) -> ActionOutcome {
        let state = self.state.lock();
        match state.live_call() {
            Ok(call) => {
                info!(call_id = %call.id, "Hanging up");
                self.ports.telephony.disconnect(call.id);
                ActionOutcome::Performed
            }
            Err(reason) => ignored("hang up", reason),
        }
    }

    /// Stop ringtone and vibration without answering or rejecting
    pub fn silence_ringer(&self) -> ActionOutcome {
        let mut state = self.state.lock();
        match &state.call {
            Some(call) if call.state == CallState::Ringing => {}
            Some(call) => return ignored("silence ringer", IgnoreReason::InvalidState(call.state)),
            None => return ignored("silence ringer", IgnoreReason::NoCall),
        }
        if !state.alerting.stop() {
            return ignored("silence ringer", IgnoreReason::NotAlerting);
        }
        info!("Ringer silenced");
        state.publish();
        ActionOutcome::Performed
    }

    /// Silence the ringer if alerting episode `generation` is still running
    pub fn silence_timeout(&self, generation: u64) -> ActionOutcome {
        let mut state = self.state.lock();
        if state.alerting.current_generation() != Some(generation) {
            return ignored("silence timeout", IgnoreReason::NotAlerting);
        }
        state.alerting.stop();
        info!(generation, "Ringer silenced after timeout");
        state.publish();
        ActionOutcome::Performed
    }

    /// Switch the current call to `route`
    pub fn select_audio_route(&self, route: AudioRoute) -> ActionOutcome {
        let mut state = self.state.lock();
        let call_id = match state.live_call() {
            Ok(call) => call.id,
            Err(reason) => return ignored("select audio route", reason),
        };
        if !state.audio.set_current(route) {
            return ignored("select audio route", IgnoreReason::UnsupportedRoute(route));
        }
        self.ports.telephony.set_audio_route(call_id, route);
        debug!(%call_id, %route, "Audio route selected");
        state.refresh_highlight();
        state.publish();
        ActionOutcome::Performed
    }

    /// Play a DTMF tone on the active call
    pub fn send_dtmf(&self, digit: char) -> ActionOutcome {
        let state = self.state.lock();
        let call_id = match &state.call {
            Some(call) if call.state == CallState::Active => call.id,
            Some(call) => return ignored("send dtmf", IgnoreReason::InvalidState(call.state)),
            None => return ignored("send dtmf", IgnoreReason::NoCall),
        };
        let digit = digit.to_ascii_uppercase();
        if !is_dtmf_digit(digit) {
            return ignored("send dtmf", IgnoreReason::InvalidDigit(digit));
        }
        self.ports.telephony.play_dtmf(call_id, digit);
        ActionOutcome::Performed
    }

    /// Proximity sensor update: `near` means the phone is at the user's ear
    ///
    /// Bringing the phone to the ear while on speaker moves the call to the
    /// earpiece. Away from the ear during a conversation the speaker button
    /// is highlighted unless the speaker is already in use.
    pub fn proximity_changed(&self, near: bool) -> ActionOutcome {
        let mut state = self.state.lock();
        state.at_ear = near;

        let mut changed = false;
        if near && state.audio.current_route() == AudioRoute::Speaker {
            if let Ok(call_id) = state.live_call().map(|call| call.id) {
                state.audio.set_current(AudioRoute::Earpiece);
                self.ports.telephony.set_audio_route(call_id, AudioRoute::Earpiece);
                info!(%call_id, "Phone at ear, switched speaker to earpiece");
                changed = true;
            }
        }
        changed |= state.refresh_highlight();

        if changed {
            state.publish();
        }
        ActionOutcome::Performed
    }

    /// Stop alerting and release the wake-hold
    ///
    /// Also done on drop. The coordinator stays usable afterwards.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        Self::release_resources(&mut state);
    }

    fn release_resources(state: &mut CoordinatorState) {
        state.alerting.stop();
        if state.wake_hold.release() {
            debug!("Wake-hold released on shutdown");
        }
    }

    fn show_ongoing(&self, state: &mut CoordinatorState, call_id: CallId) {
        if !state.ongoing_shown {
            self.ports.indicators.show_ongoing(call_id);
            state.ongoing_shown = true;
        }
    }

    fn hide_ongoing(&self, state: &mut CoordinatorState) {
        if state.ongoing_shown {
            self.ports.indicators.hide_ongoing();
            state.ongoing_shown = false;
        }
    }
}

impl Drop for CallCoordinator {
    fn drop(&mut self) {
        Self::release_resources(self.state.get_mut());
    }
}

impl std::fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `0-9`, `*`, `#` and `A-D`
pub fn is_dtmf_digit(digit: char) -> bool {
    matches!(digit, '0'..='9' | '*' | '#' | 'A'..='D')
}

fn ignored(action: &'static str, reason: IgnoreReason) -> ActionOutcome {
    warn!(action, %reason, "Ignored");
    ActionOutcome::Ignored(reason)
}
