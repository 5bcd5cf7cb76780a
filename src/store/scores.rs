//! Supabase-backed score ledger

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::ledger::{sort_leaderboard, validate_name, LedgerError, ScoreEntry, ScoreLedger};
use super::supabase::SupabaseClient;

/// Score row as stored in the players table
#[derive(Debug, Clone, Deserialize)]
struct PlayerRow {
    username: String,
    score: i64,
}

#[derive(Debug, Serialize)]
struct NewPlayerRow<'a> {
    username: &'a str,
    score: i64,
}

#[derive(Debug, Serialize)]
struct ScoreUpdate {
    score: i64,
}

/// Ledger stored in a `players(username UNIQUE, score)` table
#[derive(Clone)]
pub struct SupabaseLedger {
    client: SupabaseClient,
    table: String,
}

impl SupabaseLedger {
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    async fn fetch_scores(&self) -> Result<Vec<ScoreEntry>, LedgerError> {
        let query = [
            ("select", "username,score".to_string()),
            ("order", "score.desc,username.asc".to_string()),
        ];
        let rows: Vec<PlayerRow> = self.client.get(&self.table, &query).await?;

        let mut entries: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|r| ScoreEntry {
                username: r.username,
                score: r.score,
            })
            .collect();
        sort_leaderboard(&mut entries);
        Ok(entries)
    }

    /// Read, then update the existing row or insert a new one
    async fn upsert_score(&self, name: &str, delta: i64) -> Result<i64, LedgerError> {
        let name = validate_name(name)?;
        let filter = [
            ("select", "username,score".to_string()),
            ("username", format!("eq.{}", name)),
        ];

        match self.client.get_one::<PlayerRow>(&self.table, &filter).await? {
            Some(row) => {
                let score = row.score + delta;
                let target = [("username", format!("eq.{}", name))];
                self.client
                    .update(&self.table, &target, &ScoreUpdate { score })
                    .await?;
                Ok(score)
            }
            None => {
                let row: PlayerRow = self
                    .client
                    .insert(&self.table, &NewPlayerRow { username: name, score: delta })
                    .await?;
                Ok(row.score)
            }
        }
    }
}

impl ScoreLedger for SupabaseLedger {
    fn scores(&self) -> BoxFuture<'_, Result<Vec<ScoreEntry>, LedgerError>> {
        Box::pin(self.fetch_scores())
    }

    fn update_score<'a>(&'a self, name: &'a str, delta: i64) -> BoxFuture<'a, Result<i64, LedgerError>> {
        Box::pin(self.upsert_score(name, delta))
    }
}
