//! Initial audio route for an answered call

use super::route::{AudioRoute, RouteMask};

/// Choose the route to apply when a call is answered
///
/// First match wins: Bluetooth, then a wired headset, then the speaker if
/// the user asked for it and the phone lies flat, then the earpiece. The
/// earpiece is returned even for an empty mask; the host telephony layer
/// always provides it.
///
/// ```rust
/// use dialer_call_core::audio::{select_answer_route, AudioRoute, RouteMask};
///
/// let mask = RouteMask::from_bits(0x09); // earpiece + speaker
/// assert_eq!(select_answer_route(mask, true, true), AudioRoute::Speaker);
/// assert_eq!(select_answer_route(mask, true, false), AudioRoute::Earpiece);
/// assert_eq!(select_answer_route(RouteMask::empty(), true, true), AudioRoute::Earpiece);
/// ```
pub fn select_answer_route(
    supported: RouteMask,
    prefer_speaker_when_flat: bool,
    is_device_flat: bool,
) -> AudioRoute {
    if supported.contains(AudioRoute::Bluetooth) {
        AudioRoute::Bluetooth
    } else if supported.contains(AudioRoute::WiredHeadset) {
        AudioRoute::WiredHeadset
    } else if prefer_speaker_when_flat && is_device_flat && supported.contains(AudioRoute::Speaker) {
        AudioRoute::Speaker
    } else {
        AudioRoute::Earpiece
    }
}
