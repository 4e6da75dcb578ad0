//! Score submission, ranked queries and insert notifications.
//!
//! The game talks to a [`LeaderboardGateway`] only through the
//! [`LeaderboardClient`] worker, so store I/O never runs on the event loop
//! and never touches session state.

mod board;
mod file_store;
mod memory;
mod region;
mod table;
mod worker;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use board::{BoardStats, BoardStatus, Medal, RankingBoard, DEFAULT_BOARD_LIMIT};
pub use file_store::FileLeaderboard;
pub use memory::MemoryLeaderboard;
pub use region::{RegionCode, RegionCodeError};
pub use worker::{LeaderboardClient, LeaderboardResponse};

pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NicknameError {
    #[error("nickname must be at least {NICKNAME_MIN_CHARS} characters")]
    TooShort,
    #[error("nickname must be at most {NICKNAME_MAX_CHARS} characters")]
    TooLong,
    #[error("nickname must not contain control characters")]
    ControlCharacter,
}

/// Player name accepted by the leaderboard: 2 to 10 characters after
/// trimming, no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    pub fn parse(raw: &str) -> Result<Self, NicknameError> {
        let trimmed = raw.trim();
        if trimmed.chars().any(char::is_control) {
            return Err(NicknameError::ControlCharacter);
        }
        let count = trimmed.chars().count();
        if count < NICKNAME_MIN_CHARS {
            return Err(NicknameError::TooShort);
        }
        if count > NICKNAME_MAX_CHARS {
            return Err(NicknameError::TooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: RecordId,
    pub nickname: String,
    pub duration_ms: u64,
    pub region: RegionCode,
    pub created_at: DateTime<Utc>,
}

/// A score about to be submitted. The duration is the frozen final value of
/// a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScore {
    pub nickname: Nickname,
    pub duration_ms: u64,
    pub region: RegionCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    World,
    Region(RegionCode),
}

impl Scope {
    pub fn includes(&self, record: &ScoreRecord) -> bool {
        match self {
            Scope::World => true,
            Scope::Region(region) => record.region == *region,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::World => f.write_str("world"),
            Scope::Region(region) => write!(f, "region {region}"),
        }
    }
}

/// Live feed of inserted records. Dropping it unsubscribes.
#[derive(Debug)]
pub struct InsertSubscription {
    receiver: mpsc::Receiver<ScoreRecord>,
}

impl InsertSubscription {
    pub(crate) fn new(receiver: mpsc::Receiver<ScoreRecord>) -> Self {
        Self { receiver }
    }

    pub fn drain_into(&self, out: &mut Vec<ScoreRecord>) {
        out.extend(self.receiver.try_iter());
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("leaderboard is not connected")]
    NotConnected,
    #[error("leaderboard store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("leaderboard store at {path} is corrupt at `{field}`: {source}")]
    Corrupt {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to start leaderboard worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("leaderboard worker is not running")]
    WorkerUnavailable,
}

/// Store boundary. Implementations are driven from a single worker thread.
pub trait LeaderboardGateway: Send {
    fn name(&self) -> &'static str;
    fn connect(&mut self) -> Result<(), GatewayError>;
    fn disconnect(&mut self);
    /// Stores the score and returns its world rank: one plus the number of
    /// stored scores strictly greater than it.
    fn submit_score(&mut self, score: NewScore) -> Result<Rank, GatewayError>;
    /// Best `limit` records in `scope`, longest first, ties in submission order.
    fn query_top(&self, limit: usize, scope: &Scope) -> Result<Vec<ScoreRecord>, GatewayError>;
    fn subscribe_inserts(&mut self) -> Result<InsertSubscription, GatewayError>;
}
