//! Engine facade owning every piece of shared game state
//!
//! Transports (hardware links, observer sockets) and the tick scheduler all
//! hold an `Arc<Engine>`. Locks are always taken in the order
//! session -> game -> inputs -> slots and never held across an await.

pub mod input;
pub mod scheduler;
pub mod session;

use std::collections::BTreeMap;
use std::net::SocketAddr;

use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::game::{
    Arena, GameMode, InputEvent, PlayerId, PlayerPosition, Simulators, TickContext, TickOutcome,
};
use crate::hardware::slots::{Admission, AdmitError, SlotTable};
use crate::hardware::tokens::TokenMap;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ControllerData, ServerMsg};
use crate::ws::registry::ClientRegistry;

pub use input::InputAggregator;
pub use scheduler::TickScheduler;
pub use session::{Session, SessionError};

/// Construction-time knobs for the engine
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub simulators: Simulators,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Whether observers may send `reset`
    pub allow_lobby_reset: bool,
}

/// Mutable game state guarded by a single lock
#[derive(Debug)]
struct GameState {
    arena: Arena,
    /// Unix seconds at which the active mode was selected
    started_at: f64,
    scores: BTreeMap<PlayerId, i64>,
    rng: ChaCha8Rng,
}

/// Result of one simulated tick
#[derive(Debug)]
pub struct TickReport {
    pub mode: GameMode,
    /// `gameStateUpdate` message ready for broadcast
    pub snapshot: ServerMsg,
    pub outcome: TickOutcome,
    /// Net change per explicitly named player, for the ledger
    pub ledger_updates: Vec<(String, i64)>,
}

pub struct Engine {
    session: RwLock<Option<Session>>,
    game: Mutex<GameState>,
    inputs: InputAggregator,
    slots: Mutex<SlotTable>,
    clients: ClientRegistry,
    simulators: Simulators,
    allow_lobby_reset: bool,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            session: RwLock::new(None),
            game: Mutex::new(GameState {
                arena: Arena::Idle,
                started_at: 0.0,
                scores: BTreeMap::new(),
                rng,
            }),
            inputs: InputAggregator::new(),
            slots: Mutex::new(SlotTable::new()),
            clients: ClientRegistry::new(),
            simulators: settings.simulators,
            allow_lobby_reset: settings.allow_lobby_reset,
        }
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn allows_lobby_reset(&self) -> bool {
        self.allow_lobby_reset
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Replace the roster. Scores restart at zero, stored inputs are
    /// forgotten and links bound above the new roster size are closed.
    /// Vacated hardware slots stay vacated.
    pub fn init_session(&self, num_players: i64, names: Vec<String>) -> Result<u32, SessionError> {
        let session = Session::from_request(num_players, names)?;
        let n = session.num_players();

        let mut current = self.session.write();
        {
            let mut game = self.game.lock();
            game.scores = session.player_ids().map(|p| (p, 0)).collect();
        }
        self.inputs.reset();
        let closed = self.slots.lock().close_above(n);
        *current = Some(session);
        drop(current);

        if !closed.is_empty() {
            info!(?closed, "Closed hardware links outside the new roster");
        }
        info!(num_players = n, "Session initialized");
        Ok(n)
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Roster label for a player
    pub fn player_name(&self, player: PlayerId) -> String {
        match self.session.read().as_ref() {
            Some(session) => session.display_name(player),
            None => format!("Player {}", player),
        }
    }

    fn in_roster(&self, player: PlayerId) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|s| s.contains(player))
    }

    // ------------------------------------------------------------------
    // Mode state machine
    // ------------------------------------------------------------------

    /// Enter a gameplay mode with an empty arena and broadcast `startGame`
    pub fn select_mode(&self, mode: GameMode, now: f64) {
        {
            let mut game = self.game.lock();
            game.arena = Arena::fresh(mode);
            game.started_at = now;
        }
        self.inputs.clear_queue();

        info!(mode = %mode, "Game mode selected");
        self.clients.broadcast(&ServerMsg::StartGame {
            mode,
            start_at: now,
        });
    }

    /// Return to the lobby. Returns false if no mode was active.
    pub fn end_game(&self) -> bool {
        let previous = {
            let mut game = self.game.lock();
            std::mem::take(&mut game.arena).mode()
        };
        self.inputs.clear_queue();

        match previous {
            Some(mode) => {
                info!(mode = %mode, "Game ended, back to lobby");
                true
            }
            None => false,
        }
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.game.lock().arena.mode()
    }

    pub fn scores(&self) -> BTreeMap<PlayerId, i64> {
        self.game.lock().scores.clone()
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Store a position. Dropped unless the player is in the roster.
    pub fn set_position(&self, player: PlayerId, position: PlayerPosition) -> bool {
        if !self.in_roster(player) {
            debug!(player, "Position for unknown player dropped");
            return false;
        }
        self.inputs.set_position(player, position);
        true
    }

    /// Queue an action for the next tick. Dropped for unknown players and
    /// while no mode is active.
    pub fn push_input(&self, event: InputEvent) -> bool {
        if !self.in_roster(event.player) {
            debug!(player = event.player, "Input for unknown player dropped");
            return false;
        }
        if self.mode().is_none() {
            debug!(player = event.player, "Input while idle dropped");
            return false;
        }
        self.inputs.push_input(event);
        true
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run the active simulator once. Returns `None` while idle.
    ///
    /// The whole input queue is consumed, whatever the simulator does with it.
    pub fn step(&self, now: f64) -> Option<TickReport> {
        let session = self.session.read();
        let roster_size = session.as_ref().map_or(0, Session::num_players);

        let mut game = self.game.lock();
        let inputs = self.inputs.drain();
        let mode = game.arena.mode()?;
        let positions = self.inputs.positions();

        let ctx = TickContext {
            now,
            started_at: game.started_at,
            roster_size,
            positions: &positions,
        };
        let arena = std::mem::take(&mut game.arena);
        let (arena, outcome) = self.simulators.advance(arena, &ctx, inputs, &mut game.rng);
        game.arena = arena;

        let totals = outcome.totals();
        for (player, points) in &totals {
            *game.scores.entry(*player).or_insert(0) += points;
        }

        let ledger_updates = totals
            .into_iter()
            .filter(|(_, points)| *points != 0)
            .filter_map(|(player, points)| {
                let name = session.as_ref()?.name_of(player)?;
                Some((name.to_string(), points))
            })
            .collect();

        let snapshot = ServerMsg::GameStateUpdate {
            mode,
            objects: game.arena.objects(),
            scores: game.scores.clone(),
            timestamp: now,
        };

        Some(TickReport {
            mode,
            snapshot,
            outcome,
            ledger_updates,
        })
    }

    // ------------------------------------------------------------------
    // Hardware links
    // ------------------------------------------------------------------

    /// Bind a new hardware connection to the next free slot
    pub fn admit_hardware(&self, addr: SocketAddr) -> Result<Admission, AdmitError> {
        let session = self.session.read();
        let capacity = session
            .as_ref()
            .map(Session::num_players)
            .ok_or(AdmitError::NoSession)?;
        self.slots.lock().admit(capacity, addr)
    }

    /// Free a slot whose link never completed its handshake
    pub fn abandon_hardware(&self, player: PlayerId, link_id: u64) -> bool {
        self.slots.lock().release(player, link_id)
    }

    /// Release a slot after its link ended and tell observers
    pub fn release_hardware(&self, player: PlayerId, link_id: u64) -> bool {
        let released = self.abandon_hardware(player, link_id);
        if released {
            info!(player, "Hardware link released");
            self.clients
                .broadcast(&ServerMsg::PlayerDisconnected { player });
        }
        released
    }

    /// Ask a live link to shut down
    pub fn close_hardware(&self, player: PlayerId) -> bool {
        self.slots.lock().close(player)
    }

    pub fn hardware_links(&self) -> usize {
        self.slots.lock().live_count()
    }

    /// Handle one controller token: broadcast it raw and queue the
    /// decoded action, if any.
    pub fn hardware_token(&self, player: PlayerId, token: &str, tokens: &TokenMap) {
        let action = tokens.decode(token);
        if action.is_none() {
            warn!(player, token, "Unknown controller token");
        }

        self.clients
            .broadcast(&ServerMsg::Data(ControllerData::new(player, token, action)));

        if let Some(action) = action {
            self.push_input(InputEvent {
                player,
                action,
                client_timestamp: unix_millis() as f64,
            });
        }
    }
}
