use std::collections::HashSet;

use super::table::sort_for_ranking;
use super::{ScoreRecord, Scope};

pub const DEFAULT_BOARD_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

impl Medal {
    pub fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Self::Gold),
            2 => Some(Self::Silver),
            3 => Some(Self::Bronze),
            _ => None,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Gold => "\u{1F947}",
            Self::Silver => "\u{1F948}",
            Self::Bronze => "\u{1F949}",
        }
    }
}

/// Summary over the entries currently on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub participants: usize,
    pub average_ms: u64,
    /// Where a given duration would land, as "top N percent".
    pub top_percent: Option<u32>,
}

/// Local top-N view of one scope, kept current by query results and insert
/// notifications.
#[derive(Debug, Clone)]
pub struct RankingBoard {
    scope: Scope,
    limit: usize,
    entries: Vec<ScoreRecord>,
    status: BoardStatus,
}

impl RankingBoard {
    pub fn new(scope: Scope, limit: usize) -> Self {
        Self {
            scope,
            limit: limit.max(1),
            entries: Vec::new(),
            status: BoardStatus::Idle,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn status(&self) -> &BoardStatus {
        &self.status
    }

    pub fn entries(&self) -> &[ScoreRecord] {
        &self.entries
    }

    /// Switches scope and drops the old entries. Returns false when the
    /// scope is unchanged.
    pub fn set_scope(&mut self, scope: Scope) -> bool {
        if scope == self.scope {
            return false;
        }
        self.scope = scope;
        self.entries.clear();
        self.status = BoardStatus::Idle;
        true
    }

    pub fn begin_loading(&mut self) {
        self.status = BoardStatus::Loading;
    }

    /// Replaces the entries with a query result. Results for another scope
    /// are stale and ignored.
    pub fn replace(&mut self, scope: Scope, records: Vec<ScoreRecord>) -> bool {
        if scope != self.scope {
            return false;
        }
        let mut seen = HashSet::new();
        self.entries = records
            .into_iter()
            .filter(|record| scope.includes(record) && seen.insert(record.id))
            .collect();
        self.normalize();
        self.status = BoardStatus::Ready;
        true
    }

    pub fn fail(&mut self, scope: Scope, message: impl Into<String>) {
        if scope == self.scope {
            self.status = BoardStatus::Failed(message.into());
        }
    }

    /// Merges one inserted record. Returns true when it made the board.
    pub fn apply_insert(&mut self, record: ScoreRecord) -> bool {
        if !self.scope.includes(&record) || self.entries.iter().any(|entry| entry.id == record.id)
        {
            return false;
        }
        let id = record.id;
        self.entries.push(record);
        self.normalize();
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Entries with their 1-based rank and medal.
    pub fn rows(&self) -> impl Iterator<Item = (usize, Option<Medal>, &ScoreRecord)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, record)| (index + 1, Medal::for_rank(index + 1), record))
    }

    pub fn stats(&self, duration_ms: Option<u64>) -> BoardStats {
        let participants = self.entries.len();
        let average_ms = if participants == 0 {
            0
        } else {
            let total: u128 = self
                .entries
                .iter()
                .map(|record| u128::from(record.duration_ms))
                .sum();
            (total / participants as u128) as u64
        };
        let top_percent = duration_ms.filter(|_| participants > 0).map(|mine| {
            let position = self
                .entries
                .iter()
                .filter(|record| record.duration_ms > mine)
                .count()
                + 1;
            let percent = (position * 100).div_ceil(participants.max(position));
            percent.clamp(1, 100) as u32
        });
        BoardStats {
            participants,
            average_ms,
            top_percent,
        }
    }

    fn normalize(&mut self) {
        sort_for_ranking(&mut self.entries);
        self.entries.truncate(self.limit);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::super::{RecordId, RegionCode};
    use super::*;

    fn record(id: u64, duration_ms: u64, region: &str) -> ScoreRecord {
        ScoreRecord {
            id: RecordId(id),
            nickname: format!("p{id}"),
            duration_ms,
            region: region.parse::<RegionCode>().expect("region"),
            created_at: Utc::now(),
        }
    }

    fn ids(board: &RankingBoard) -> Vec<u64> {
        board.entries().iter().map(|record| record.id.0).collect()
    }

    #[test]
    fn replace_sorts_and_dedupes() {
        let mut board = RankingBoard::new(Scope::World, 10);
        board.begin_loading();
        assert_eq!(board.status(), &BoardStatus::Loading);

        board.replace(
            Scope::World,
            vec![
                record(1, 100, "KR"),
                record(2, 300, "US"),
                record(1, 100, "KR"),
                record(3, 100, "JP"),
            ],
        );
        assert_eq!(ids(&board), vec![2, 1, 3]);
        assert_eq!(board.status(), &BoardStatus::Ready);
    }

    #[test]
    fn inserts_are_deduped_sorted_and_truncated() {
        let mut board = RankingBoard::new(Scope::World, 3);
        board.replace(
            Scope::World,
            vec![record(1, 500, "KR"), record(2, 400, "KR"), record(3, 300, "KR")],
        );

        assert!(!board.apply_insert(record(2, 400, "KR")));
        assert!(board.apply_insert(record(4, 450, "US")));
        assert_eq!(ids(&board), vec![1, 4, 2]);
        assert!(!board.apply_insert(record(5, 10, "US")));
        assert_eq!(board.entries().len(), 3);
    }

    #[test]
    fn equal_durations_keep_submission_order() {
        let mut board = RankingBoard::new(Scope::World, 10);
        board.apply_insert(record(7, 100, "KR"));
        board.apply_insert(record(3, 100, "KR"));
        assert_eq!(ids(&board), vec![3, 7]);
    }

    #[test]
    fn region_board_skips_other_regions() {
        let korea = Scope::Region("KR".parse().expect("region"));
        let mut board = RankingBoard::new(korea, 10);
        assert!(!board.apply_insert(record(1, 100, "US")));
        assert!(board.apply_insert(record(2, 100, "KR")));
        board.replace(korea, vec![record(3, 5, "KR"), record(4, 9, "JP")]);
        assert_eq!(ids(&board), vec![3]);
    }

    #[test]
    fn stale_scope_results_are_ignored() {
        let mut board = RankingBoard::new(Scope::World, 10);
        let korea = Scope::Region("KR".parse().expect("region"));
        assert!(board.set_scope(korea));
        assert!(!board.set_scope(korea));

        assert!(!board.replace(Scope::World, vec![record(1, 1, "US")]));
        board.fail(Scope::World, "boom");
        assert!(board.entries().is_empty());
        assert_eq!(board.status(), &BoardStatus::Idle);
    }

    #[test]
    fn rows_carry_medals_for_podium() {
        let mut board = RankingBoard::new(Scope::World, 10);
        board.replace(
            Scope::World,
            (1..=4).map(|id| record(id, 1_000 - id, "KR")).collect(),
        );
        let medals: Vec<Option<Medal>> = board.rows().map(|(_, medal, _)| medal).collect();
        assert_eq!(
            medals,
            vec![
                Some(Medal::Gold),
                Some(Medal::Silver),
                Some(Medal::Bronze),
                None
            ]
        );
    }

    #[test]
    fn stats_report_average_and_standing() {
        let mut board = RankingBoard::new(Scope::World, 10);
        assert_eq!(board.stats(Some(10)).top_percent, None);

        board.replace(
            Scope::World,
            vec![
                record(1, 4_000, "KR"),
                record(2, 3_000, "KR"),
                record(3, 2_000, "KR"),
                record(4, 1_000, "KR"),
            ],
        );
        let stats = board.stats(Some(3_500));
        assert_eq!(stats.participants, 4);
        assert_eq!(stats.average_ms, 2_500);
        assert_eq!(stats.top_percent, Some(50));
        assert_eq!(board.stats(Some(9_000)).top_percent, Some(25));
        assert_eq!(board.stats(None).top_percent, None);
    }
}
