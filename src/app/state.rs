//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::engine::{Engine, EngineSettings};
use crate::game::{CoinCascade, CoinConfig, Simulators};
use crate::hardware::HardwareSettings;
use crate::store::{MemoryLedger, ScoreLedger, SupabaseClient, SupabaseLedger};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<Engine>,
    pub ledger: Arc<dyn ScoreLedger>,
    pub hardware: Arc<HardwareSettings>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let ledger: Arc<dyn ScoreLedger> = match &config.supabase {
            Some(supabase) => {
                info!(table = %config.scores_table, "Using Supabase score ledger");
                Arc::new(SupabaseLedger::new(
                    SupabaseClient::new(supabase),
                    config.scores_table.clone(),
                ))
            }
            None => {
                info!("No Supabase credentials, using in-memory score ledger");
                Arc::new(MemoryLedger::new())
            }
        };

        Self::with_ledger(config, ledger)
    }

    /// Build state around an existing ledger
    pub fn with_ledger(config: Config, ledger: Arc<dyn ScoreLedger>) -> Self {
        let simulators = Simulators {
            coin: CoinCascade::new(CoinConfig {
                capacity: config.coin_capacity,
                ..Default::default()
            }),
            ..Default::default()
        };

        let engine = Arc::new(Engine::new(EngineSettings {
            simulators,
            seed: config.sim_seed,
            allow_lobby_reset: config.allow_lobby_reset,
        }));

        let hardware = Arc::new(HardwareSettings {
            tokens: config.hardware_tokens.clone(),
            start_byte: config.hardware_start_byte,
        });

        Self {
            config: Arc::new(config),
            engine,
            ledger,
            hardware,
        }
    }
}
