use std::path::{Path, PathBuf};

use chrono::Utc;
use engine::storage::{read_text_if_exists, write_text_atomic};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::table::ScoreTable;
use super::{
    GatewayError, InsertSubscription, LeaderboardGateway, NewScore, Rank, ScoreRecord, Scope,
};

pub const LEADERBOARD_FILE_NAME: &str = "leaderboard.json";
const STORE_VERSION: u32 = 1;

#[derive(Deserialize)]
struct StoreDocument {
    version: u32,
    table: ScoreTable,
}

#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    version: u32,
    table: &'a ScoreTable,
}

/// JSON-document store. Loaded on connect, rewritten atomically after every
/// accepted submission.
#[derive(Debug)]
pub struct FileLeaderboard {
    path: PathBuf,
    table: Option<ScoreTable>,
}

impl FileLeaderboard {
    pub fn new(path: PathBuf) -> Self {
        Self { path, table: None }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(LEADERBOARD_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ScoreTable, GatewayError> {
        let Some(text) = read_text_if_exists(&self.path).map_err(|source| GatewayError::Io {
            path: self.path.clone(),
            source,
        })?
        else {
            return Ok(ScoreTable::default());
        };
        let mut deserializer = serde_json::Deserializer::from_str(&text);
        let document: StoreDocument = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| GatewayError::Corrupt {
                path: self.path.clone(),
                field: error.path().to_string(),
                source: error.into_inner(),
            })?;
        if document.version != STORE_VERSION {
            warn!(
                path = %self.path.display(),
                found = document.version,
                expected = STORE_VERSION,
                "leaderboard_store_version_mismatch"
            );
        }
        Ok(document.table)
    }

    fn persist(&self, table: &ScoreTable) -> Result<(), GatewayError> {
        let document = StoreDocumentRef {
            version: STORE_VERSION,
            table,
        };
        let text = serde_json::to_string_pretty(&document).map_err(|source| {
            GatewayError::Corrupt {
                path: self.path.clone(),
                field: ".".to_string(),
                source,
            }
        })?;
        write_text_atomic(&self.path, &text).map_err(|source| GatewayError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl LeaderboardGateway for FileLeaderboard {
    fn name(&self) -> &'static str {
        "file"
    }

    fn connect(&mut self) -> Result<(), GatewayError> {
        if self.table.is_some() {
            return Ok(());
        }
        let table = self.load()?;
        info!(
            path = %self.path.display(),
            records = table.len(),
            "leaderboard_store_loaded"
        );
        self.table = Some(table);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.table = None;
    }

    fn submit_score(&mut self, score: NewScore) -> Result<Rank, GatewayError> {
        let Some(mut table) = self.table.take() else {
            return Err(GatewayError::NotConnected);
        };
        let (record, rank) = table.insert(score, Utc::now());
        let persisted = self.persist(&table);
        // A failed write must not leave the unsaved record visible.
        let result = match persisted {
            Ok(()) => {
                info!(
                    store = self.name(),
                    id = record.id.0,
                    duration_ms = record.duration_ms,
                    rank = rank.0,
                    "score_stored"
                );
                table.publish(&record);
                Ok(rank)
            }
            Err(error) => {
                table.remove_last();
                Err(error)
            }
        };
        self.table = Some(table);
        result
    }

    fn query_top(&self, limit: usize, scope: &Scope) -> Result<Vec<ScoreRecord>, GatewayError> {
        let table = self.table.as_ref().ok_or(GatewayError::NotConnected)?;
        Ok(table.top(limit, scope))
    }

    fn subscribe_inserts(&mut self) -> Result<InsertSubscription, GatewayError> {
        let table = self.table.as_mut().ok_or(GatewayError::NotConnected)?;
        Ok(table.subscribe())
    }
}
