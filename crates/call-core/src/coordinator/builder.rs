//! Fluent construction of a [`CallCoordinator`]
//!
//! Every port not supplied defaults to [`NoopPorts`]: no telephony actions,
//! no alerts, DND unavailable (so calls ring), both user settings off and an
//! empty contact directory.
//!
//! ```rust
//! use std::sync::Arc;
//! use dialer_call_core::{CallCoordinatorBuilder, ContactBook, ContactRef, CoordinatorConfig};
//!
//! let contacts = Arc::new(ContactBook::new());
//! contacts.insert("+41 79 123 45 67", ContactRef::favorite());
//!
//! let coordinator = CallCoordinatorBuilder::new()
//!     .with_config(CoordinatorConfig::new().with_ring_silence_timeout_secs(30))
//!     .with_contacts(contacts)
//!     .build()
//!     .expect("valid configuration");
//! assert_eq!(coordinator.snapshot().state, dialer_call_core::CallState::Idle);
//! ```

use std::sync::Arc;

use super::CallCoordinator;
use crate::audio::OrientationCell;
use crate::config::CoordinatorConfig;
use crate::error::CallCoreResult;
use crate::ports::{
    AlertPort, CallSettings, Clock, DndSource, IndicatorPort, NoopPorts, SystemClock,
    TelephonyPort, WakeHoldPort,
};
use crate::ring_policy::ContactLookup;

/// Builder for [`CallCoordinator`]
pub struct CallCoordinatorBuilder {
    config: CoordinatorConfig,
    telephony: Arc<dyn TelephonyPort>,
    alerts: Arc<dyn AlertPort>,
    indicators: Arc<dyn IndicatorPort>,
    wake_hold: Arc<dyn WakeHoldPort>,
    dnd: Arc<dyn DndSource>,
    settings: Arc<dyn CallSettings>,
    contacts: Arc<dyn ContactLookup + Send + Sync>,
    clock: Arc<dyn Clock>,
    orientation: OrientationCell,
}

impl Default for CallCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CallCoordinatorBuilder {
    pub fn new() -> Self {
        let noop = Arc::new(NoopPorts);
        Self {
            config: CoordinatorConfig::default(),
            telephony: noop.clone(),
            alerts: noop.clone(),
            indicators: noop.clone(),
            wake_hold: noop.clone(),
            dnd: noop.clone(),
            settings: noop.clone(),
            contacts: noop,
            clock: Arc::new(SystemClock),
            orientation: OrientationCell::new(),
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_telephony(mut self, telephony: Arc<dyn TelephonyPort>) -> Self {
        self.telephony = telephony;
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertPort>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_indicators(mut self, indicators: Arc<dyn IndicatorPort>) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn with_wake_hold(mut self, wake_hold: Arc<dyn WakeHoldPort>) -> Self {
        self.wake_hold = wake_hold;
        self
    }

    pub fn with_dnd_source(mut self, dnd: Arc<dyn DndSource>) -> Self {
        self.dnd = dnd;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn CallSettings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_contacts(mut self, contacts: Arc<dyn ContactLookup + Send + Sync>) -> Self {
        self.contacts = contacts;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an orientation cell with the sensor producer
    pub fn with_orientation(mut self, orientation: OrientationCell) -> Self {
        self.orientation = orientation;
        self
    }

    /// Validate the configuration and build the coordinator
    pub fn build(self) -> CallCoreResult<Arc<CallCoordinator>> {
        self.config.validate()?;
        Ok(Arc::new(CallCoordinator::from_parts(
            self.config,
            super::Ports {
                telephony: self.telephony,
                indicators: self.indicators,
                dnd: self.dnd,
                settings: self.settings,
                contacts: self.contacts,
                clock: self.clock,
            },
            self.alerts,
            self.wake_hold,
            self.orientation,
        )))
    }
}
