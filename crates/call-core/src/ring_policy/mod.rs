//! Ring policy: should an incoming call audibly ring?
//!
//! The decision cascade, first match wins:
//!
//! ```text
//! 1. block unknown callers on?  hidden / not a contact  -> silent, declined
//! 2. filter ALL                                         -> ring
//! 3. filter ALARMS_ONLY or NONE                         -> silent
//! 4. filter PRIORITY
//!    a. same number within the repeat window           -> ring
//!       (the number is recorded either way)
//!    b. calls category off, repeat category off        -> silent
//!    c. calls category on: ANY / CONTACTS / STARRED     -> per sender policy
//!    d. calls category off, repeat category on         -> silent
//! 5. unrecognised filter                                -> ring
//! ```
//!
//! Every decision carries a [`RingReason`] with a stable reason string.

pub mod engine;
pub mod types;

pub use engine::RingPolicy;
pub use types::{
    ContactLookup, ContactRef, DndState, InterruptionFilter, PrioritySenders, RingDecision,
    RingReason,
};
