use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InsertSubscription, NewScore, Rank, RecordId, ScoreRecord, Scope};

/// Record set shared by the in-memory and file stores.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ScoreTable {
    next_id: u64,
    records: Vec<ScoreRecord>,
    #[serde(skip)]
    subscribers: Vec<mpsc::Sender<ScoreRecord>>,
}

impl ScoreTable {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn insert(&mut self, score: NewScore, created_at: DateTime<Utc>) -> (ScoreRecord, Rank) {
        let next_id = self
            .records
            .iter()
            .map(|record| record.id.0 + 1)
            .max()
            .unwrap_or(0)
            .max(self.next_id);
        let record = ScoreRecord {
            id: RecordId(next_id),
            nickname: score.nickname.as_str().to_string(),
            duration_ms: score.duration_ms,
            region: score.region,
            created_at,
        };
        self.next_id = next_id + 1;
        self.records.push(record.clone());
        let rank = self.rank_of(record.duration_ms);
        (record, rank)
    }

    pub(crate) fn remove_last(&mut self) {
        self.records.pop();
    }

    /// Delivers `record` to live subscribers, forgetting dropped ones.
    pub(crate) fn publish(&mut self, record: &ScoreRecord) {
        self.subscribers
            .retain(|subscriber| subscriber.send(record.clone()).is_ok());
    }

    pub(crate) fn rank_of(&self, duration_ms: u64) -> Rank {
        let better = self
            .records
            .iter()
            .filter(|record| record.duration_ms > duration_ms)
            .count();
        Rank(u32::try_from(better).unwrap_or(u32::MAX - 1) + 1)
    }

    pub(crate) fn top(&self, limit: usize, scope: &Scope) -> Vec<ScoreRecord> {
        let mut matching: Vec<ScoreRecord> = self
            .records
            .iter()
            .filter(|record| scope.includes(record))
            .cloned()
            .collect();
        sort_for_ranking(&mut matching);
        matching.truncate(limit);
        matching
    }

    pub(crate) fn subscribe(&mut self) -> InsertSubscription {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        InsertSubscription::new(receiver)
    }

    pub(crate) fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }
}

/// Longest first; equal durations keep submission order.
pub(crate) fn sort_for_ranking(records: &mut [ScoreRecord]) {
    records.sort_by(|a, b| {
        b.duration_ms
            .cmp(&a.duration_ms)
            .then_with(|| a.id.cmp(&b.id))
    });
}
