//! # Dialer call core
//!
//! The in-call decision core of a phone dialer. It decides whether an
//! incoming call should ring, picks the audio route when a call is answered
//! and coordinates the lifecycle of the current call, notifying observers
//! with a complete snapshot after every change.
//!
//! ## Components
//!
//! - [`RecentCallerCache`]: time-windowed record of who called recently
//! - [`RingPolicy`]: app-level blocking and Do-Not-Disturb ring decisions
//! - [`select_answer_route`]: initial audio route for an answered call
//! - [`CallCoordinator`]: the call state machine and its side effects
//! - [`CallEventLoop`]: a tokio task that serializes inputs to a coordinator
//!
//! The host application plugs in through the traits in [`ports`]: it supplies
//! contacts, DND state and user settings, and receives telephony requests,
//! alerts, indicators and wake-hold changes.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use dialer_call_core::{
//!     CallCoordinator, CallDirection, CallSnapshot, CallState, StaticEnvironment,
//! };
//! use uuid::Uuid;
//!
//! let env = Arc::new(StaticEnvironment::new());
//! let coordinator = CallCoordinator::builder()
//!     .with_dnd_source(env.clone())
//!     .with_settings(env)
//!     .build()
//!     .unwrap();
//!
//! coordinator.register_observer(Arc::new(|snapshot: &CallSnapshot| {
//!     println!("call is {}", snapshot.state);
//! }));
//!
//! let call_id = Uuid::new_v4();
//! coordinator.call_arrived(call_id, CallDirection::Incoming, Some("+15551234".into()), None);
//! assert_eq!(coordinator.snapshot().state, CallState::Ringing);
//!
//! coordinator.answer();
//! coordinator.state_changed(call_id, CallState::Active, None);
//! assert_eq!(coordinator.snapshot().state, CallState::Active);
//! ```

pub mod audio;
pub mod call;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod logging;
pub mod number;
pub mod ports;
pub mod recent_callers;
pub mod ring_policy;
pub mod service;

pub use audio::{select_answer_route, AudioRoute, AudioRouteState, OrientationCell, RouteMask};
pub use call::{Call, CallDirection, CallId, CallSnapshot, CallState, DisconnectReason};
pub use config::CoordinatorConfig;
pub use coordinator::{
    is_dtmf_digit, CallCoordinator, CallCoordinatorBuilder, CallObserver, ObserverId,
    UNKNOWN_BLOCKED_NUMBER,
};
pub use error::{CallCoreError, CallCoreResult};
pub use events::{ActionOutcome, IgnoreReason, TelephonyEvent};
pub use logging::{setup_logging, LoggingConfig};
pub use number::NormalizedNumber;
pub use ports::{
    AlertPort, CallSettings, Clock, ContactBook, DndSource, IndicatorPort, NoopPorts,
    StaticEnvironment, SystemClock, TelephonyPort, WakeHoldPort,
};
pub use recent_callers::{RecentCallerCache, REPEAT_CALLER_WINDOW_SECS};
pub use ring_policy::{
    ContactLookup, ContactRef, DndState, InterruptionFilter, PrioritySenders, RingDecision,
    RingPolicy, RingReason,
};
pub use service::{CallEventLoop, Command, CoordinatorHandle};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
