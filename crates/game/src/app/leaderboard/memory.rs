use chrono::Utc;
use tracing::info;

use super::table::ScoreTable;
use super::{
    GatewayError, InsertSubscription, LeaderboardGateway, NewScore, Rank, ScoreRecord, Scope,
};

/// Process-local store for offline play and tests. Scores live until the
/// gateway is dropped.
#[derive(Debug, Default)]
pub struct MemoryLeaderboard {
    table: ScoreTable,
    connected: bool,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardGateway for MemoryLeaderboard {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn connect(&mut self) -> Result<(), GatewayError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.table.clear_subscribers();
    }

    fn submit_score(&mut self, score: NewScore) -> Result<Rank, GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        let (record, rank) = self.table.insert(score, Utc::now());
        info!(
            store = self.name(),
            id = record.id.0,
            duration_ms = record.duration_ms,
            rank = rank.0,
            "score_stored"
        );
        self.table.publish(&record);
        Ok(rank)
    }

    fn query_top(&self, limit: usize, scope: &Scope) -> Result<Vec<ScoreRecord>, GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        Ok(self.table.top(limit, scope))
    }

    fn subscribe_inserts(&mut self) -> Result<InsertSubscription, GatewayError> {
        if !self.connected {
            return Err(GatewayError::NotConnected);
        }
        Ok(self.table.subscribe())
    }
}
