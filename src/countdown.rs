use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::protocol::ServerMessage;

pub const DEFAULT_ROUND_SECONDS: u32 = 60;

const WARNING_AT: u32 = 20;
const CRITICAL_AT: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountdownPhase {
    Calm,
    Warning,
    Critical,
    Expired,
}

impl CountdownPhase {
    pub fn for_remaining(remaining: u32) -> Self {
        match remaining {
            0 => CountdownPhase::Expired,
            r if r <= CRITICAL_AT => CountdownPhase::Critical,
            r if r <= WARNING_AT => CountdownPhase::Warning,
            _ => CountdownPhase::Calm,
        }
    }
}

/// Echo played shortly after a critical-phase tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub frequency_hz: u32,
    pub delay_ms: u32,
}

/// Sound the browser should synthesise for a tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "sound", rename_all = "snake_case")]
pub enum AudioCue {
    Tick {
        frequency_hz: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        echo: Option<Echo>,
    },
    Honk,
}

impl AudioCue {
    /// Rising tick for the last 20 seconds, nothing before that
    pub fn for_remaining(remaining: u32) -> Option<Self> {
        match remaining {
            0 => Some(AudioCue::Honk),
            r if r <= WARNING_AT => {
                let frequency_hz = 300 + (WARNING_AT - r) * 80;
                let echo = (r <= CRITICAL_AT).then_some(Echo {
                    frequency_hz: frequency_hz + 100,
                    delay_ms: 150,
                });
                Some(AudioCue::Tick { frequency_hz, echo })
            }
            _ => None,
        }
    }
}

/// Pure countdown state; one `tick()` per elapsed second
#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn phase(&self) -> CountdownPhase {
        CountdownPhase::for_remaining(self.remaining)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Advance one second and describe what the client should show
    pub fn tick(&mut self) -> ServerMessage {
        self.remaining = self.remaining.saturating_sub(1);
        if self.is_expired() {
            ServerMessage::TimeUp {
                cue: AudioCue::Honk,
            }
        } else {
            ServerMessage::Tick {
                remaining: self.remaining,
                phase: self.phase(),
                cue: AudioCue::for_remaining(self.remaining),
            }
        }
    }
}

/// Running countdown task. Dropping the handle stops it.
#[derive(Debug)]
pub struct CountdownHandle {
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Tick once per second until time runs out, pushing messages to `tx`.
/// A closed receiver does not stop the clock.
pub fn spawn_countdown(seconds: u32, tx: mpsc::UnboundedSender<ServerMessage>) -> CountdownHandle {
    let task = tokio::spawn(async move {
        let mut countdown = Countdown::new(seconds);
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // First tick completes immediately
        interval.tick().await;

        while !countdown.is_expired() {
            interval.tick().await;
            let _ = tx.send(countdown.tick());
        }
        tracing::debug!("Countdown of {}s finished", seconds);
    });
    CountdownHandle { task }
}
