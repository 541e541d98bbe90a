//! dialer-sim: drive the dialer call core from the command line
//!
//! - `run` replays a JSON scenario through a coordinator and its event loop,
//!   printing every port call (`->`) and every observer snapshot (`<-`)
//! - `decide` evaluates a single ring decision
//! - `route` evaluates answer-route selection for a route mask

mod scenario;
mod report;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use dialer_call_core::logging::{log_welcome, parse_log_level, LogWriter};
use dialer_call_core::{
    select_answer_route, setup_logging, ActionOutcome, CallCoordinator, CallEventLoop, Clock,
    Command, ContactBook, ContactRef, CoordinatorHandle, DndState, InterruptionFilter,
    LoggingConfig, OrientationCell, PrioritySenders, RingPolicy, RouteMask, StaticEnvironment,
};

use crate::report::{PrintingObserver, PrintingPorts, SimClock};
use crate::scenario::{Scenario, Step};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dialer call core simulator", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIALER_LOG", default_value = "warn", global = true)]
    log_level: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scenario file
    Run {
        /// Path to the scenario JSON
        scenario: PathBuf,

        /// Sleep for real on `wait` steps so the ring silence timer can fire
        #[arg(long)]
        realtime: bool,
    },
    /// Evaluate one ring decision
    Decide(DecideArgs),
    /// Pick the answer route for a set of available routes
    Route {
        /// Supported route mask: 0x01 earpiece, 0x02 bluetooth, 0x04 wired, 0x08 speaker
        #[arg(long, value_parser = parse_mask)]
        mask: u8,

        /// The user prefers the speaker when the phone lies flat
        #[arg(long)]
        prefer_speaker: bool,

        /// The phone is lying flat
        #[arg(long)]
        flat: bool,
    },
}

#[derive(Args, Debug)]
struct DecideArgs {
    /// Caller number; omit for a withheld number
    #[arg(long)]
    number: Option<String>,

    /// Decline callers that are not contacts
    #[arg(long)]
    block_unknown: bool,

    #[arg(long, value_enum, default_value_t = FilterArg::All)]
    filter: FilterArg,

    /// Priority mode: the calls category is enabled
    #[arg(long)]
    calls_allowed: bool,

    #[arg(long, value_enum, default_value_t = SendersArg::Any)]
    senders: SendersArg,

    /// Priority mode: the repeat-callers category is enabled
    #[arg(long)]
    repeat_callers: bool,

    /// Contact numbers; append `:fav` for a starred contact
    #[arg(long = "contact")]
    contacts: Vec<String>,

    /// The same number already called this many seconds ago
    #[arg(long)]
    previous_call_secs_ago: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Priority,
    AlarmsOnly,
    None,
}

impl From<FilterArg> for InterruptionFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => InterruptionFilter::All,
            FilterArg::Priority => InterruptionFilter::Priority,
            FilterArg::AlarmsOnly => InterruptionFilter::AlarmsOnly,
            FilterArg::None => InterruptionFilter::None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SendersArg {
    Any,
    ContactsOnly,
    StarredOnly,
}

impl From<SendersArg> for PrioritySenders {
    fn from(arg: SendersArg) -> Self {
        match arg {
            SendersArg::Any => PrioritySenders::Any,
            SendersArg::ContactsOnly => PrioritySenders::ContactsOnly,
            SendersArg::StarredOnly => PrioritySenders::StarredOnly,
        }
    }
}

fn parse_mask(raw: &str) -> Result<u8, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid route mask {:?}: {}", raw, e))
}

/// Logs go to stderr so stdout carries only the report
fn logging_config(cli: &Cli) -> anyhow::Result<LoggingConfig> {
    let mut logging = LoggingConfig::new(parse_log_level(&cli.log_level)?, "dialer-sim")
        .with_target(module_path!())
        .with_writer(LogWriter::Stderr);
    if cli.json {
        logging = logging.with_json();
    }
    Ok(logging)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(logging_config(&cli)?)?;
    log_welcome("dialer-sim", dialer_call_core::VERSION);

    match cli.command {
        Commands::Run { scenario, realtime } => run_scenario(scenario, realtime, cli.json).await,
        Commands::Decide(args) => decide(args, cli.json),
        Commands::Route {
            mask,
            prefer_speaker,
            flat,
        } => {
            let route = select_answer_route(RouteMask::from_bits(mask), prefer_speaker, flat);
            if cli.json {
                println!("{}", serde_json::json!({ "route": route }));
            } else {
                println!("{}", route.to_string().bold());
            }
            Ok(())
        }
    }
}

async fn run_scenario(path: PathBuf, realtime: bool, json: bool) -> anyhow::Result<()> {
    let scenario = Scenario::load(&path)?;
    info!(path = %path.display(), steps = scenario.steps.len(), "Running scenario");

    let env = Arc::new(
        StaticEnvironment::new()
            .with_block_unknown_callers(scenario.environment.block_unknown_callers)
            .with_prefer_speaker_when_flat(scenario.environment.prefer_speaker_when_flat),
    );
    env.set_dnd(scenario.environment.dnd);

    let contacts = Arc::new(ContactBook::new());
    for entry in &scenario.contacts {
        let contact = ContactRef {
            is_favorite: entry.favorite,
            display_name: entry.name.clone(),
        };
        if !contacts.insert(&entry.number, contact) {
            warn!(number = %entry.number, "Contact number has no digits, skipped");
        }
    }

    let clock = Arc::new(SimClock::starting_now());
    let ports = Arc::new(PrintingPorts::new(json));
    let orientation = OrientationCell::new();

    let coordinator = CallCoordinator::builder()
        .with_config(scenario.config.clone())
        .with_telephony(ports.clone())
        .with_alerts(ports.clone())
        .with_indicators(ports.clone())
        .with_wake_hold(ports)
        .with_dnd_source(env.clone())
        .with_settings(env.clone())
        .with_contacts(contacts)
        .with_clock(clock.clone())
        .with_orientation(orientation.clone())
        .build()
        .context("building coordinator")?;
    if let Some(audio) = scenario.audio {
        coordinator.audio_state_changed(audio);
    }
    coordinator.register_observer(Arc::new(PrintingObserver::new(json)));

    let (handle, task) = CallEventLoop::spawn(coordinator.clone());

    for (index, step) in scenario.steps.into_iter().enumerate() {
        if !json {
            println!("{} {:?}", format!("[{}]", index + 1).bold(), step);
        }
        match step {
            Step::Telephony { event } => request(&handle, Command::Telephony(event), json).await?,
            Step::Answer => request(&handle, Command::Answer, json).await?,
            Step::Reject => request(&handle, Command::Reject, json).await?,
            Step::HangUp => request(&handle, Command::HangUp, json).await?,
            Step::SilenceRinger => request(&handle, Command::SilenceRinger, json).await?,
            Step::SelectRoute { route } => {
                request(&handle, Command::SelectAudioRoute(route), json).await?
            }
            Step::Dtmf { digits } => {
                for digit in digits.chars() {
                    request(&handle, Command::SendDtmf(digit), json).await?;
                }
            }
            Step::Proximity { near } => {
                request(&handle, Command::ProximityChanged(near), json).await?
            }
            Step::Orientation { flat } => orientation.publish(flat, clock.now()),
            Step::Dnd { dnd } => env.set_dnd(dnd),
            Step::BlockUnknownCallers { enabled } => env.set_block_unknown_callers(enabled),
            Step::Wait { secs } => {
                clock.advance(secs);
                if realtime {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                // Let anything the wait triggered reach the observers first
                handle.snapshot().await?;
            }
        }
    }

    handle.shutdown()?;
    task.await.context("event loop task failed")?;

    if let Some(number) = coordinator.last_blocked_number() {
        if json {
            println!("{}", serde_json::json!({ "last_blocked_number": number }));
        } else {
            println!("last blocked number: {}", number.red());
        }
    }
    Ok(())
}

async fn request(handle: &CoordinatorHandle, command: Command, json: bool) -> anyhow::Result<()> {
    let outcome = handle.request(command).await?;
    if let ActionOutcome::Ignored(reason) = outcome {
        if json {
            println!("{}", serde_json::json!({ "ignored": reason.to_string() }));
        } else {
            println!("  {} {}", "ignored:".dimmed(), reason.to_string().dimmed());
        }
    }
    Ok(())
}

fn decide(args: DecideArgs, json: bool) -> anyhow::Result<()> {
    let dnd = DndState {
        interruption_filter: args.filter.into(),
        priority_calls_allowed: args.calls_allowed,
        priority_sender_policy: args.senders.into(),
        priority_repeat_callers_allowed: args.repeat_callers,
    };

    let contacts = ContactBook::new();
    for entry in &args.contacts {
        let (number, is_favorite) = match entry.strip_suffix(":fav") {
            Some(number) => (number, true),
            None => (entry.as_str(), false),
        };
        if !contacts.insert(
            number,
            ContactRef {
                is_favorite,
                display_name: None,
            },
        ) {
            anyhow::bail!("contact {:?} contains no digits", entry);
        }
    }

    let mut policy = RingPolicy::new();
    let now = Utc::now();
    if let Some(ago) = args.previous_call_secs_ago {
        // Only recorded when the filter is priority, as for a real call
        let earlier = now - ChronoDuration::seconds(i64::from(ago));
        policy.decide(args.number.as_deref(), args.block_unknown, &dnd, &contacts, earlier);
    }
    let decision = policy.decide(args.number.as_deref(), args.block_unknown, &dnd, &contacts, now);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "should_ring": decision.should_ring,
                "reason": decision.reason_str(),
                "declined": decision.blocked_by_app(),
            })
        );
    } else {
        let verdict = if decision.should_ring {
            "RING".green()
        } else if decision.blocked_by_app() {
            "DECLINE".red()
        } else {
            "SILENT".yellow()
        };
        println!("{} {}", verdict.bold(), decision.reason_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_masks() {
        assert_eq!(parse_mask("0x09"), Ok(9));
        assert_eq!(parse_mask("0X0f"), Ok(15));
        assert_eq!(parse_mask("11"), Ok(11));
        assert!(parse_mask("0xZZ").is_err());
        assert!(parse_mask("300").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn logs_stay_off_the_report_stream() {
        let cli = Cli::try_parse_from(["dialer-sim", "--json", "--log-level", "info", "route", "--mask", "0x09"])
            .unwrap();
        let logging = logging_config(&cli).unwrap();

        assert_eq!(logging.writer, LogWriter::Stderr);
        assert!(logging.json);
        assert_eq!(logging.level, tracing::Level::INFO);
        assert!(logging.targets.iter().any(|t| t == "dialer_sim"));
    }
}
