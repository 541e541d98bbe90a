//! Audio routes and the set of routes the host currently supports

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical audio path for a call
///
/// Discriminants match the platform's route bit values so masks can be
/// passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AudioRoute {
    Earpiece = 0x01,
    Bluetooth = 0x02,
    WiredHeadset = 0x04,
    Speaker = 0x08,
}

impl AudioRoute {
    /// Every route, in bit order
    pub const ALL: [AudioRoute; 4] = [
        AudioRoute::Earpiece,
        AudioRoute::Bluetooth,
        AudioRoute::WiredHeadset,
        AudioRoute::Speaker,
    ];

    /// The route's bit in a [`RouteMask`]
    pub fn bit(self) -> u8 {
        self as u8
    }

    /// Map a single platform route bit
    pub fn from_bit(bit: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.bit() == bit)
    }
}

impl fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioRoute::Earpiece => "earpiece",
            AudioRoute::Bluetooth => "bluetooth",
            AudioRoute::WiredHeadset => "wired_headset",
            AudioRoute::Speaker => "speaker",
        };
        f.write_str(name)
    }
}

/// Bitset of routes that are currently available
///
/// Bits outside the four known routes are dropped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct RouteMask(u8);

impl RouteMask {
    const KNOWN_BITS: u8 = 0x0F;

    /// No routes
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from a raw platform mask
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::KNOWN_BITS)
    }

    /// The raw mask
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, route: AudioRoute) -> bool {
        self.0 & route.bit() != 0
    }

    pub fn insert(&mut self, route: AudioRoute) {
        self.0 |= route.bit();
    }

    /// A copy of this mask with `route` added
    pub fn with(mut self, route: AudioRoute) -> Self {
        self.insert(route);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Supported routes in bit order
    pub fn iter(self) -> impl Iterator<Item = AudioRoute> {
        AudioRoute::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl From<u8> for RouteMask {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<RouteMask> for u8 {
    fn from(mask: RouteMask) -> Self {
        mask.0
    }
}

impl FromIterator<AudioRoute> for RouteMask {
    fn from_iter<I: IntoIterator<Item = AudioRoute>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |mask, route| mask.with(route))
    }
}

/// Supported and current audio paths
///
/// The current route is always a member of the supported mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AudioRouteStateRepr")]
pub struct AudioRouteState {
    current_route: AudioRoute,
    supported_routes: RouteMask,
}

impl AudioRouteState {
    /// Build a state from what the host reports
    ///
    /// A host that reports a current route missing from its own mask is
    /// using that route, so the route is added to the mask.
    pub fn new(current_route: AudioRoute, supported_routes: RouteMask) -> Self {
        Self {
            current_route,
            supported_routes: supported_routes.with(current_route),
        }
    }

    pub fn current_route(&self) -> AudioRoute {
        self.current_route
    }

    pub fn supported_routes(&self) -> RouteMask {
        self.supported_routes
    }

    pub fn supports(&self, route: AudioRoute) -> bool {
        // Earpiece is a fixed precondition of the host telephony layer
        route == AudioRoute::Earpiece || self.supported_routes.contains(route)
    }

    /// Switch to `route`; returns false (and changes nothing) if it is unsupported
    pub fn set_current(&mut self, route: AudioRoute) -> bool {
        if !self.supports(route) {
            return false;
        }
        self.current_route = route;
        self.supported_routes.insert(route);
        true
    }
}

#[derive(Deserialize)]
struct AudioRouteStateRepr {
    current_route: AudioRoute,
    #[serde(default)]
    supported_routes: RouteMask,
}

impl From<AudioRouteStateRepr> for AudioRouteState {
    fn from(repr: AudioRouteStateRepr) -> Self {
        Self::new(repr.current_route, repr.supported_routes)
    }
}

impl Default for AudioRouteState {
    fn default() -> Self {
        Self::new(AudioRoute::Earpiece, RouteMask::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_ignores_unknown_bits() {
        let mask = RouteMask::from_bits(0xFF);
        assert_eq!(mask.bits(), 0x0F);
        assert_eq!(mask.iter().count(), 4);
    }

    #[test]
    fn mask_from_routes() {
        let mask: RouteMask = [AudioRoute::Speaker, AudioRoute::Bluetooth].into_iter().collect();
        assert!(mask.contains(AudioRoute::Speaker));
        assert!(mask.contains(AudioRoute::Bluetooth));
        assert!(!mask.contains(AudioRoute::WiredHeadset));
        assert_eq!(mask.bits(), 0x0A);
    }

    #[test]
    fn current_route_is_always_supported() {
        let state = AudioRouteState::new(AudioRoute::Speaker, RouteMask::from_bits(0x01));
        assert!(state.supported_routes().contains(AudioRoute::Speaker));

        let state = AudioRouteState::default();
        assert_eq!(state.current_route(), AudioRoute::Earpiece);
        assert!(state.supported_routes().contains(AudioRoute::Earpiece));
    }

    #[test]
    fn unsupported_route_is_refused() {
        let mut state = AudioRouteState::new(AudioRoute::Earpiece, RouteMask::from_bits(0x09));
        assert!(!state.set_current(AudioRoute::Bluetooth));
        assert_eq!(state.current_route(), AudioRoute::Earpiece);

        assert!(state.set_current(AudioRoute::Speaker));
        assert_eq!(state.current_route(), AudioRoute::Speaker);
    }

    #[test]
    fn deserialized_state_keeps_the_invariant() {
        let state: AudioRouteState =
            serde_json::from_str(r#"{"current_route":"bluetooth","supported_routes":1}"#).unwrap();
        assert_eq!(state.current_route(), AudioRoute::Bluetooth);
        assert!(state.supported_routes().contains(AudioRoute::Bluetooth));
    }

    #[test]
    fn route_bits_round_trip() {
        for route in AudioRoute::ALL {
            assert_eq!(AudioRoute::from_bit(route.bit()), Some(route));
        }
        assert_eq!(AudioRoute::from_bit(0x10), None);
    }
}
