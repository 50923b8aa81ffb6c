//! Battle session: the single mutation surface for a running battle
//!
//! Owns the authoritative battle, the queued player commands, the seeded
//! RNG and the commentary channel. Commands only take effect at tick
//! boundaries.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::battle::commands::{BattleCommand, CommandOutcome};
use crate::battle::execution::{Battle, BattleEventLog, BattleEventType, CombatEngine};
use crate::battle::loadout::BattleLoadout;
use crate::battle::rewards::RewardPayload;
use crate::battle::snapshot::BattleSnapshot;
use crate::core::types::{Millis, Side, StageId};
use crate::llm::client::CommentaryClient;
use crate::llm::commentary::Commentator;

pub struct BattleSession {
    engine: CombatEngine,
    battle: Option<Battle>,
    rng: ChaCha8Rng,
    queue: VecDeque<BattleCommand>,
    commentator: Commentator,
}

impl BattleSession {
    pub fn new(engine: CombatEngine, seed: u64) -> Self {
        Self::with_commentary(engine, seed, None)
    }

    pub fn with_commentary(engine: CombatEngine, seed: u64, client: Option<CommentaryClient>) -> Self {
        Self {
            engine,
            battle: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            queue: VecDeque::new(),
            commentator: Commentator::new(client, seed.wrapping_add(1)),
        }
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.engine
    }

    pub fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.battle.as_ref().is_some_and(|b| !b.state.is_finished())
    }

    /// Reset battle and director state for `stage`
    pub fn start_battle(&mut self, stage: StageId, sandbox: bool, loadout: BattleLoadout) {
        self.queue.clear();
        self.battle = Some(self.engine.start_battle(stage, sandbox, loadout));
    }

    pub fn stop_battle(&mut self) {
        if let Some(battle) = self.battle.take() {
            info!(stage = battle.state.stage, elapsed = battle.state.elapsed, "Battle stopped");
        }
        self.queue.clear();
    }

    /// Queue a command for the next tick boundary
    pub fn enqueue(&mut self, command: BattleCommand) {
        self.queue.push_back(command);
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Apply queued commands, then advance the battle by `dt`
    pub fn tick(&mut self, dt: Millis) -> BattleEventLog {
        let mut events = BattleEventLog::new();
        let Some(battle) = self.battle.as_mut() else {
            self.queue.clear();
            return events;
        };

        let now = battle.state.elapsed;
        for line in self.commentator.drain(now) {
            battle.state.log.push(line);
        }

        while let Some(command) = self.queue.pop_front() {
            let outcome = self.engine.apply_command(battle, &command, &mut events);
            if outcome == CommandOutcome::Applied && command == BattleCommand::FireSpecialAttack {
                self.commentator
                    .request("The player fired the special attack cannon.", now);
            }
        }

        let tick_events = self.engine.advance(battle, &mut self.rng, dt);
        for event in tick_events.iter() {
            if let Some(prompt) = commentary_prompt(&event.event_type) {
                self.commentator.request(prompt, battle.state.elapsed);
            }
        }
        events.events.extend(tick_events.events);
        events
    }

    pub fn snapshot(&self) -> Option<BattleSnapshot> {
        self.battle.as_ref().map(|b| self.engine.snapshot(b))
    }

    /// Hand out the victory reward; later calls return None
    pub fn take_reward(&mut self) -> Option<RewardPayload> {
        self.battle.as_mut().and_then(|b| b.state.pending_reward.take())
    }
}

/// Events worth a line of commentary
fn commentary_prompt(event: &BattleEventType) -> Option<&'static str> {
    match event {
        BattleEventType::BossPhaseChanged { .. } => Some("The boss is getting angry."),
        BattleEventType::LastStand { .. } => Some("The boss makes a last stand and wipes the front line."),
        BattleEventType::BattleEnded { winner: Side::Ally } => Some("The enemy stronghold has fallen."),
        BattleEventType::BattleEnded { winner: Side::Hostile } => Some("Our stronghold has been destroyed."),
        _ => None,
    }
}

impl std::fmt::Debug for BattleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleSession")
            .field("battle", &self.battle.as_ref().map(|b| b.state.stage))
            .field("queued", &self.queue.len())
            .field("commentator", &self.commentator)
            .finish()
    }
}
