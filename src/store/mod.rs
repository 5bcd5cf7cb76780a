//! Score ledger implementations

pub mod ledger;
pub mod scores;
pub mod supabase;

pub use ledger::{LedgerError, LedgerWriter, MemoryLedger, ScoreEntry, ScoreLedger};
pub use scores::SupabaseLedger;
pub use supabase::{SupabaseClient, SupabaseConfig};
