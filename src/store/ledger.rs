//! Durable name -> score ledger

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::supabase::SupabaseError;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub username: String,
    pub score: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Username must not be empty")]
    EmptyName,

    #[error(transparent)]
    Supabase(#[from] SupabaseError),
}

/// External score store, queried and updated by player name.
///
/// `update_score` is an upsert: an absent name starts at `delta`.
pub trait ScoreLedger: Send + Sync {
    /// All rows, highest score first
    fn scores(&self) -> BoxFuture<'_, Result<Vec<ScoreEntry>, LedgerError>>;

    /// Add `delta` to a name's score and return the new total
    fn update_score<'a>(&'a self, name: &'a str, delta: i64) -> BoxFuture<'a, Result<i64, LedgerError>>;
}

/// Process-local ledger used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<String, i64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreLedger for MemoryLedger {
    fn scores(&self) -> BoxFuture<'_, Result<Vec<ScoreEntry>, LedgerError>> {
        let mut entries: Vec<ScoreEntry> = self
            .rows
            .lock()
            .iter()
            .map(|(username, score)| ScoreEntry {
                username: username.clone(),
                score: *score,
            })
            .collect();
        sort_leaderboard(&mut entries);
        Box::pin(async move { Ok(entries) })
    }

    fn update_score<'a>(&'a self, name: &'a str, delta: i64) -> BoxFuture<'a, Result<i64, LedgerError>> {
        let result = validate_name(name).map(|name| {
            let mut rows = self.rows.lock();
            let score = rows.entry(name.to_string()).or_insert(0);
            *score += delta;
            *score
        });
        Box::pin(async move { result })
    }
}

/// Highest score first, ties by name
pub fn sort_leaderboard(entries: &mut [ScoreEntry]) {
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));
}

pub(crate) fn validate_name(name: &str) -> Result<&str, LedgerError> {
    let name = name.trim();
    if name.is_empty() {
        Err(LedgerError::EmptyName)
    } else {
        Ok(name)
    }
}

/// Background writer so the tick loop never waits on the ledger
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    tx: mpsc::UnboundedSender<(String, i64)>,
}

impl LedgerWriter {
    /// Spawn the writer task on the current runtime
    pub fn spawn(ledger: Arc<dyn ScoreLedger>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, i64)>();

        tokio::spawn(async move {
            while let Some((name, delta)) = rx.recv().await {
                match ledger.update_score(&name, delta).await {
                    Ok(total) => debug!(name = %name, delta, total, "Ledger updated"),
                    Err(e) => warn!(name = %name, delta, error = %e, "Ledger update failed"),
                }
            }
            debug!("Ledger writer stopped");
        });

        Self { tx }
    }

    /// Queue a score change; dropped with a warning if the writer is gone
    pub fn record(&self, name: &str, delta: i64) {
        if delta == 0 {
            return;
        }
        if self.tx.send((name.to_string(), delta)).is_err() {
            warn!(name = %name, delta, "Ledger writer closed, score change dropped");
        }
    }
}
