//! Console output: every port call and every observer snapshot

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use parking_lot::Mutex;

use dialer_call_core::{
    AlertPort, AudioRoute, CallId, CallObserver, CallSnapshot, Clock, IndicatorPort,
    TelephonyPort, WakeHoldPort,
};

/// Prints outbound port calls as they happen
#[derive(Debug, Default)]
pub struct PrintingPorts {
    json: bool,
}

impl PrintingPorts {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit(&self, port: &str, action: &str, detail: String) {
        if self.json {
            let line = serde_json::json!({ "port": port, "action": action, "detail": detail });
            println!("{}", line);
        } else {
            println!("  {} {:<10} {} {}", "->".cyan(), port.cyan(), action.bold(), detail.dimmed());
        }
    }
}

fn short(call_id: CallId) -> String {
    call_id.simple().to_string()[..8].to_string()
}

impl TelephonyPort for PrintingPorts {
    fn answer(&self, call_id: CallId) {
        self.emit("telephony", "answer", short(call_id));
    }

    fn reject(&self, call_id: CallId) {
        self.emit("telephony", "reject", short(call_id));
    }

    fn disconnect(&self, call_id: CallId) {
        self.emit("telephony", "disconnect", short(call_id));
    }

    fn set_audio_route(&self, call_id: CallId, route: AudioRoute) {
        self.emit("telephony", "route", format!("{} {}", short(call_id), route));
    }

    fn play_dtmf(&self, call_id: CallId, digit: char) {
        self.emit("telephony", "dtmf", format!("{} {}", short(call_id), digit));
    }
}

impl AlertPort for PrintingPorts {
    fn start_alerting(&self, call_id: CallId) {
        self.emit("alert", "start", short(call_id));
    }

    fn stop_alerting(&self) {
        self.emit("alert", "stop", String::new());
    }
}

impl IndicatorPort for PrintingPorts {
    fn show_ongoing(&self, call_id: CallId) {
        self.emit("indicator", "ongoing", short(call_id));
    }

    fn hide_ongoing(&self) {
        self.emit("indicator", "ongoing-off", String::new());
    }

    fn missed_call(&self, caller_number: Option<&str>, caller_display_name: Option<&str>) {
        let who = caller_display_name.or(caller_number).unwrap_or("unknown caller");
        self.emit("indicator", "missed", who.to_string());
    }

    fn blocked_call(&self, caller_number: &str) {
        self.emit("indicator", "blocked", caller_number.to_string());
    }
}

impl WakeHoldPort for PrintingPorts {
    fn acquire(&self) {
        self.emit("wake-hold", "acquire", String::new());
    }

    fn release(&self) {
        self.emit("wake-hold", "release", String::new());
    }
}

/// Prints every snapshot it receives
#[derive(Debug, Default)]
pub struct PrintingObserver {
    json: bool,
}

impl PrintingObserver {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl CallObserver for PrintingObserver {
    fn on_call_state_changed(&self, snapshot: &CallSnapshot) {
        if self.json {
            match serde_json::to_string(snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("snapshot not serializable: {}", e),
            }
            return;
        }

        let state = snapshot.state.to_string();
        let state = match snapshot.state {
            dialer_call_core::CallState::Ringing => state.yellow(),
            dialer_call_core::CallState::Active => state.green(),
            dialer_call_core::CallState::Disconnected => state.red(),
            _ => state.normal(),
        };
        let mut flags = Vec::new();
        if snapshot.alerting {
            flags.push("alerting");
        }
        if snapshot.highlight_speaker {
            flags.push("speaker-hint");
        }
        println!(
            "  {} {:<13} caller={} name={} route={} reason={} {}",
            "<-".magenta(),
            state.bold(),
            snapshot.caller_number.as_deref().unwrap_or("-"),
            snapshot.caller_display_name.as_deref().unwrap_or("-"),
            snapshot.audio.current_route(),
            snapshot
                .disconnect_reason
                .map(|r| format!("{:?}", r))
                .unwrap_or_else(|| "-".to_string()),
            flags.join(",").dimmed()
        );
    }
}

/// Longest single `wait` the simulated clock accepts (one year)
const MAX_WAIT_SECS: u64 = 365 * 24 * 60 * 60;

/// Simulated wall clock advanced by `wait` steps
#[derive(Debug)]
pub struct SimClock {
    now: Mutex<DateTime<Utc>>,
}

impl SimClock {
    pub fn starting_now() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, secs: u64) {
        let secs = secs.min(MAX_WAIT_SECS) as i64;
        let mut now = self.now.lock();
        if let Some(next) = now.checked_add_signed(Duration::seconds(secs)) {
            *now = next;
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
