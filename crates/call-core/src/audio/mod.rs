//! Audio routing: route types, answer-route selection and the orientation signal

pub mod orientation;
pub mod route;
pub mod selector;

pub use orientation::OrientationCell;
pub use route::{AudioRoute, AudioRouteState, RouteMask};
pub use selector::select_answer_route;
