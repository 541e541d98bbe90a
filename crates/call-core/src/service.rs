//! Serialized event loop around a [`CallCoordinator`]
//!
//! Telephony callbacks, UI actions and timers usually arrive on different
//! threads. [`CallEventLoop`] funnels all of them through one tokio task, so
//! the coordinator sees a single ordered stream of inputs. It also owns the
//! ring silence timer: when the coordinator starts alerting and
//! `ring_silence_timeout_secs` is configured, a timer is armed for that
//! alerting episode and, on expiry, silences the ringer only if the same
//! episode is still running.
//!
//! ```rust
//! use dialer_call_core::{CallCoordinator, CallEventLoop, Command};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let coordinator = CallCoordinator::builder().build().unwrap();
//! let (handle, task) = CallEventLoop::spawn(coordinator);
//!
//! let outcome = handle.request(Command::Answer).await.unwrap();
//! assert!(!outcome.is_performed()); // nothing is ringing
//!
//! handle.shutdown().unwrap();
//! task.await.unwrap();
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::audio::AudioRoute;
use crate::call::CallSnapshot;
use crate::coordinator::CallCoordinator;
use crate::error::{CallCoreError, CallCoreResult};
use crate::events::{ActionOutcome, TelephonyEvent};

/// An input for the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Telephony(TelephonyEvent),
    Answer,
    Reject,
    HangUp,
    SilenceRinger,
    SelectAudioRoute(AudioRoute),
    SendDtmf(char),
    /// `true` when the phone is at the user's ear
    ProximityChanged(bool),
}

enum Message {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<ActionOutcome>>,
    },
    SilenceTimeout(u64),
    Snapshot(oneshot::Sender<CallSnapshot>),
    Shutdown,
}

/// Cloneable handle for feeding a running [`CallEventLoop`]
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Message>,
    coordinator: Arc<CallCoordinator>,
}

impl CoordinatorHandle {
    /// Queue a command without waiting for it to be applied
    pub fn send(&self, command: Command) -> CallCoreResult<()> {
        self.post(Message::Command {
            command,
            reply: None,
        })
    }

    /// Queue a command and wait for its outcome
    pub async fn request(&self, command: Command) -> CallCoreResult<ActionOutcome> {
        let (reply, rx) = oneshot::channel();
        self.post(Message::Command {
            command,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| CallCoreError::EventLoopClosed)
    }

    /// Snapshot taken after every command queued before this call was applied
    pub async fn snapshot(&self) -> CallCoreResult<CallSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.post(Message::Snapshot(reply))?;
        rx.await.map_err(|_| CallCoreError::EventLoopClosed)
    }

    pub fn telephony_event(&self, event: TelephonyEvent) -> CallCoreResult<()> {
        self.send(Command::Telephony(event))
    }

    pub fn answer(&self) -> CallCoreResult<()> {
        self.send(Command::Answer)
    }

    pub fn reject(&self) -> CallCoreResult<()> {
        self.send(Command::Reject)
    }

    pub fn hang_up(&self) -> CallCoreResult<()> {
        self.send(Command::HangUp)
    }

    pub fn silence_ringer(&self) -> CallCoreResult<()> {
        self.send(Command::SilenceRinger)
    }

    pub fn select_audio_route(&self, route: AudioRoute) -> CallCoreResult<()> {
        self.send(Command::SelectAudioRoute(route))
    }

    pub fn send_dtmf(&self, digit: char) -> CallCoreResult<()> {
        self.send(Command::SendDtmf(digit))
    }

    pub fn proximity_changed(&self, near: bool) -> CallCoreResult<()> {
        self.send(Command::ProximityChanged(near))
    }

    /// Ask the loop to stop once the commands queued before this are applied
    pub fn shutdown(&self) -> CallCoreResult<()> {
        self.post(Message::Shutdown)
    }

    /// The coordinator behind the loop, for observers and read-only queries
    pub fn coordinator(&self) -> &Arc<CallCoordinator> {
        &self.coordinator
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn post(&self, message: Message) -> CallCoreResult<()> {
        self.tx.send(message).map_err(|_| CallCoreError::EventLoopClosed)
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Single-writer loop that applies commands to a coordinator in order
pub struct CallEventLoop {
    coordinator: Arc<CallCoordinator>,
    rx: mpsc::UnboundedReceiver<Message>,
    timer_tx: mpsc::WeakUnboundedSender<Message>,
    armed_generation: Option<u64>,
}

impl CallEventLoop {
    /// Start the loop on the current tokio runtime
    ///
    /// The loop ends when [`CoordinatorHandle::shutdown`] is called or every
    /// handle has been dropped; either way the coordinator is shut down.
    pub fn spawn(coordinator: Arc<CallCoordinator>) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_loop = CallEventLoop {
            coordinator: coordinator.clone(),
            rx,
            timer_tx: tx.downgrade(),
            armed_generation: None,
        };
        let task = tokio::spawn(event_loop.run());
        (CoordinatorHandle { tx, coordinator }, task)
    }

    async fn run(mut self) {
        info!("Call event loop started");

        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Command { command, reply } => {
                    let outcome = self.apply(command);
                    if let Some(reply) = reply {
                        let _ = reply.send(outcome);
                    }
                }
                Message::SilenceTimeout(generation) => {
                    self.coordinator.silence_timeout(generation);
                }
                Message::Snapshot(reply) => {
                    let _ = reply.send(self.coordinator.snapshot());
                }
                Message::Shutdown => break,
            }
            self.arm_silence_timer();
        }

        self.coordinator.shutdown();
        info!("Call event loop stopped");
    }

    fn apply(&self, command: Command) -> ActionOutcome {
        let coordinator = &self.coordinator;
        match command {
            Command::Telephony(event) => coordinator.handle_telephony_event(event),
            Command::Answer => coordinator.answer(),
            Command::Reject => coordinator.reject(),
            Command::HangUp => coordinator.hang_up(),
            Command::SilenceRinger => coordinator.silence_ringer(),
            Command::SelectAudioRoute(route) => coordinator.select_audio_route(route),
            Command::SendDtmf(digit) => coordinator.send_dtmf(digit),
            Command::ProximityChanged(near) => coordinator.proximity_changed(near),
        }
    }

    /// Arm the silence timer once per alerting episode
    fn arm_silence_timer(&mut self) {
        let Some(timeout) = self.coordinator.config().ring_silence_timeout() else {
            return;
        };
        let Some(generation) = self.coordinator.alerting_generation() else {
            return;
        };
        if self.armed_generation == Some(generation) {
            return;
        }
        self.armed_generation = Some(generation);

        debug!(generation, timeout_secs = timeout.as_secs(), "Arming ring silence timer");
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(Message::SilenceTimeout(generation));
            }
        });
    }
}
