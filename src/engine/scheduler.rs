//! Fixed-rate tick loop

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::Engine;
use crate::store::LedgerWriter;
use crate::util::time::unix_secs;
use crate::ws::protocol::ServerMsg;

/// Drives the engine: simulate, emit feedback, persist, broadcast.
pub struct TickScheduler {
    engine: Arc<Engine>,
    ledger: LedgerWriter,
    period: Duration,
}

impl TickScheduler {
    pub fn new(engine: Arc<Engine>, ledger: LedgerWriter, period: Duration) -> Self {
        Self {
            engine,
            ledger,
            period,
        }
    }

    /// Run forever. Late ticks are delayed, never replayed in a burst.
    pub async fn run(self) {
        info!(period_ms = self.period.as_millis() as u64, "Tick loop starting");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick_once(unix_secs());
        }
    }

    /// One simulate-then-broadcast cycle. Returns false while idle.
    pub fn tick_once(&self, now: f64) -> bool {
        let Some(report) = self.engine.step(now) else {
            return false;
        };

        let clients = self.engine.clients();
        for (player, result) in report.outcome.judgements() {
            clients.broadcast(&ServerMsg::ScoreFeedback {
                player,
                result,
                points: result.points(),
            });
        }

        for (name, delta) in &report.ledger_updates {
            self.ledger.record(name, *delta);
        }

        let delivered = clients.broadcast(&report.snapshot);
        debug!(mode = %report.mode, delivered, "Tick broadcast");
        true
    }
}
