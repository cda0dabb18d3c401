use crate::countdown::{AudioCue, CountdownPhase};
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    NextChallenge,
    /// Start the countdown for the current challenge
    StartRound,
    StopRound,
    GetStats,
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        session_id: SessionId,
        protocol: String,
    },
    Loading {
        loading: bool,
    },
    Ready {
        stats: PoolStats,
    },
    Challenge {
        challenge: Challenge,
        mode: ChallengeMode,
        stats: PoolStats,
    },
    RoundStarted {
        seconds: u32,
    },
    Tick {
        remaining: u32,
        phase: CountdownPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        cue: Option<AudioCue>,
    },
    TimeUp {
        cue: AudioCue,
    },
    RoundStopped,
    Stats {
        stats: PoolStats,
        loading: bool,
    },
    Pong,
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}
