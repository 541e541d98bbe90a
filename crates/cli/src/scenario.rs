//! Scenario files: host environment plus a timeline of steps
//!
//! ```json
//! {
//!   "config": { "ring_silence_timeout_secs": 30 },
//!   "environment": { "dnd": { "interruption_filter": "priority", "priority_repeat_callers_allowed": true } },
//!   "contacts": [ { "number": "+41 79 123 45 67", "favorite": true } ],
//!   "steps": [
//!     { "step": "telephony", "event": { "type": "call_arrived", "call_id": "…", "direction": "incoming", "caller_number": "+15550100" } },
//!     { "step": "wait", "secs": 5 },
//!     { "step": "answer" }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

use dialer_call_core::{AudioRoute, AudioRouteState, CoordinatorConfig, DndState, TelephonyEvent};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: CoordinatorConfig,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
    /// Initial audio routes reported by the host
    #[serde(default)]
    pub audio: Option<AudioRouteState>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// `null` means DND state is unavailable
    pub dnd: Option<DndState>,
    pub block_unknown_callers: bool,
    pub prefer_speaker_when_flat: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContactEntry {
    pub number: String,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Telephony { event: TelephonyEvent },
    Answer,
    Reject,
    HangUp,
    SilenceRinger,
    SelectRoute { route: AudioRoute },
    Dtmf { digits: String },
    Proximity { near: bool },
    Orientation { flat: bool },
    Dnd { dnd: Option<DndState> },
    BlockUnknownCallers { enabled: bool },
    /// Advance the simulated clock (and sleep for real with `--realtime`)
    Wait { secs: u64 },
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        scenario
            .config
            .validate()
            .context("invalid coordinator config in scenario")?;
        Ok(scenario)
    }
}
