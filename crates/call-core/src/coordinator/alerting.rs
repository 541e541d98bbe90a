use std::sync::Arc;

use crate::call::CallId;
use crate::ports::AlertPort;

/// Ringtone/vibration on/off with a generation per alerting episode
///
/// The generation lets a delayed silence request tell whether the episode it
/// was scheduled for is still the one running.
pub(crate) struct Alerting {
    port: Arc<dyn AlertPort>,
    active: bool,
    generation: u64,
}

impl Alerting {
    pub(crate) fn new(port: Arc<dyn AlertPort>) -> Self {
        Self {
            port,
            active: false,
            generation: 0,
        }
    }

    /// Start a new episode and return its generation
    pub(crate) fn start(&mut self, call_id: CallId) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.active = true;
        self.port.start_alerting(call_id);
        self.generation
    }

    /// Stop the running episode; returns false if nothing was alerting
    pub(crate) fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.port.stop_alerting();
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    /// Generation of the running episode, if any
    pub(crate) fn current_generation(&self) -> Option<u64> {
        self.active.then_some(self.generation)
    }
}
