use std::sync::Arc;
use tracing::debug;

use crate::ports::WakeHoldPort;

/// Tracks whether the wake-hold is held so the port sees each acquire and
/// release exactly once
pub(crate) struct WakeHold {
    port: Arc<dyn WakeHoldPort>,
    held: bool,
}

impl WakeHold {
    pub(crate) fn new(port: Arc<dyn WakeHoldPort>) -> Self {
        Self { port, held: false }
    }

    /// Acquire unless already held; returns whether the port was called
    pub(crate) fn acquire(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.port.acquire();
        self.held = true;
        debug!("Wake-hold acquired");
        true
    }

    /// Release if held; returns whether the port was called
    pub(crate) fn release(&mut self) -> bool {
        if !self.held {
            return false;
        }
        self.port.release();
        self.held = false;
        debug!("Wake-hold released");
        true
    }

    pub(crate) fn is_held(&self) -> bool {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl WakeHoldPort for Counting {
        fn acquire(&self) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn repeated_calls_reach_the_port_once() {
        let port = Arc::new(Counting::default());
        let mut hold = WakeHold::new(port.clone());

        assert!(!hold.release());
        assert!(hold.acquire());
        assert!(!hold.acquire());
        assert!(hold.is_held());
        assert!(hold.release());
        assert!(!hold.release());

        assert_eq!(port.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(port.released.load(Ordering::SeqCst), 1);
    }
}
