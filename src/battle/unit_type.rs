//! Unit definitions and the roster that holds them
//!
//! Definitions are static templates keyed by string id. Special behavior
//! is data: each stat block carries a list of on-hit effects, and a small
//! set of traits covers the rest (bosses, walls, enrage, priority targets).

use serde::{Deserialize, Serialize};

use crate::battle::boss::BossPhaseProfile;
use crate::battle::constants::{
    DEFAULT_SUMMON_OFFSET, ENRAGE_ATTACK_COOLDOWN_MS, ENRAGE_HP_FRACTION,
};
use crate::core::error::{Result, SimError};
use crate::core::types::{Millis, Side};

/// Who a stun reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StunScope {
    /// Every unit hit by the attack
    Target,
    /// Every opposing unit within the attacker's range
    InRange,
    /// Every opposing unit on the lane
    AllOpposing,
}

/// Side effect applied when an attack lands
///
/// An empty effect list means flat single-target damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OnHitEffect {
    /// Damage the nearest `targets` candidates instead of one
    Splash { targets: usize },
    /// Push the target away from the attacker (negative pulls it closer)
    Displace { distance: f64 },
    /// Suppress movement and attacks for a while
    Stun {
        duration_ms: Millis,
        scope: StunScope,
        #[serde(default)]
        once: bool,
    },
    /// Each hit adds a stack on the target; hits from this attacker deal
    /// `1 + stacks * per_stack` times damage
    StackingDebuff { per_stack: f64, max_stacks: u32 },
    /// Periodically drop an auxiliary unit ahead of the attacker
    Summon {
        unit_id: String,
        interval_ms: Millis,
        #[serde(default = "default_summon_offset")]
        offset: f64,
    },
}

fn default_summon_offset() -> f64 {
    DEFAULT_SUMMON_OFFSET
}

fn default_damage_taken() -> f64 {
    1.0
}

/// A complete set of combat numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub hp: f64,
    pub damage: f64,
    /// Lane units per reference tick
    pub speed: f64,
    pub range: f64,
    pub attack_cooldown_ms: Millis,
    pub cost: f64,
    #[serde(default)]
    pub effects: Vec<OnHitEffect>,
    /// Multiplier on damage this unit receives
    #[serde(default = "default_damage_taken")]
    pub damage_taken: f64,
}

impl StatBlock {
    pub fn new(
        hp: f64,
        damage: f64,
        speed: f64,
        range: f64,
        attack_cooldown_ms: Millis,
        cost: f64,
    ) -> Self {
        Self {
            hp,
            damage,
            speed,
            range,
            attack_cooldown_ms,
            cost,
            effects: Vec::new(),
            damage_taken: 1.0,
        }
    }

    pub fn with_effects(mut self, effects: Vec<OnHitEffect>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_damage_taken(mut self, multiplier: f64) -> Self {
        self.damage_taken = multiplier;
        self
    }
}

/// Alternate stat profile unlocked at a level threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltForm {
    pub name: String,
    pub stats: StatBlock,
}

/// Low-hp attack speed boost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enrage {
    /// Enrage once hp falls below this fraction of base hp
    pub hp_fraction: f64,
    pub attack_cooldown_ms: Millis,
}

/// Behavioral flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTraits {
    /// Immune to stun and displacement
    pub boss: bool,
    /// Spawning does not debit hostile currency
    pub cost_exempt: bool,
    /// Never acts (walls); still blocks and absorbs hits
    pub inert: bool,
    /// Hostile attackers prefer this unit among their candidates
    pub priority_target: bool,
    pub enrage: Option<Enrage>,
    pub boss_phases: Option<BossPhaseProfile>,
    /// After a one-shot effect is spent, fight at melee range
    pub melee_after_ability: bool,
}

/// Static unit template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: String,
    pub name: String,
    pub side: Side,
    pub stats: StatBlock,
    pub spawn_cooldown_ms: Millis,
    #[serde(default)]
    pub alt_form: Option<AltForm>,
    #[serde(default)]
    pub traits: UnitTraits,
    #[serde(default)]
    pub description: String,
}

impl UnitDefinition {
    pub fn new(id: &str, name: &str, side: Side, stats: StatBlock, spawn_cooldown_ms: Millis) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            side,
            stats,
            spawn_cooldown_ms,
            alt_form: None,
            traits: UnitTraits::default(),
            description: String::new(),
        }
    }

    pub fn with_alt_form(mut self, name: &str, stats: StatBlock) -> Self {
        self.alt_form = Some(AltForm {
            name: name.into(),
            stats,
        });
        self
    }

    pub fn with_traits(mut self, traits: UnitTraits) -> Self {
        self.traits = traits;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.into();
        self
    }

    /// Stationary units never walk and cannot be displaced
    pub fn is_stationary(&self) -> bool {
        self.traits.inert || self.stats.speed <= 0.0
    }
}

/// Catalog of all unit definitions
#[derive(Debug, Clone, Default)]
pub struct UnitRoster {
    units: Vec<UnitDefinition>,
}

impl UnitRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing any existing one with the same id
    pub fn add(&mut self, definition: UnitDefinition) {
        if let Some(existing) = self.units.iter_mut().find(|u| u.id == definition.id) {
            *existing = definition;
        } else {
            self.units.push(definition);
        }
    }

    pub fn get(&self, id: &str) -> Option<&UnitDefinition> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Lookup that reports unknown ids as an error
    pub fn require(&self, id: &str) -> Result<&UnitDefinition> {
        self.get(id).ok_or_else(|| SimError::UnknownUnit(id.to_string()))
    }

    pub fn for_side(&self, side: Side) -> impl Iterator<Item = &UnitDefinition> {
        self.units.iter().filter(move |u| u.side == side)
    }

    pub fn all(&self) -> &[UnitDefinition] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Load a roster from a TOML file with a `[[units]]` array
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        let data: TomlRoster = toml::from_str(content)?;
        let mut roster = Self::new();
        for unit in data.units {
            roster.add(unit);
        }
        Ok(roster)
    }

    /// The shipped ally and hostile rosters
    pub fn with_defaults() -> Self {
        let mut roster = Self::new();
        for unit in ally_units().into_iter().chain(hostile_units()) {
            roster.add(unit);
        }
        roster
    }
}

#[derive(Deserialize)]
struct TomlRoster {
    units: Vec<UnitDefinition>,
}

fn ally_units() -> Vec<UnitDefinition> {
    use OnHitEffect::*;

    vec![
        UnitDefinition::new("baby", "Baby Intern", Side::Ally,
            StatBlock::new(150.0, 15.0, 4.0, 40.0, 1000, 50.0), 2000)
            .with_alt_form("Hairy Graduate", StatBlock::new(150.0, 15.0, 4.0, 40.0, 1000, 50.0))
            .with_description("Fragile but cheap early pressure."),
        UnitDefinition::new("tank", "Human Tank", Side::Ally,
            StatBlock::new(966.0, 6.0, 1.5, 35.0, 1500, 200.0), 5750)
            .with_alt_form("Human Fortress", StatBlock::new(1369.0, 6.0, 0.8, 35.0, 1500, 300.0))
            .with_traits(UnitTraits {
                priority_target: true,
                ..UnitTraits::default()
            })
            .with_description("Damage sponge. Hostile attackers focus it first."),
        UnitDefinition::new("sworder", "Sworder", Side::Ally,
            StatBlock::new(362.0, 24.0, 5.0, 55.0, 1000, 200.0), 6900)
            .with_alt_form("Blacksteel", StatBlock::new(362.0, 72.0, 5.0, 85.0, 3000, 200.0)),
        UnitDefinition::new("pistoler", "Pistoler", Side::Ally,
            StatBlock::new(185.0, 31.0, 1.9, 350.0, 1250, 200.0), 4600)
            .with_alt_form("SMG Gunner", StatBlock::new(185.0, 31.0, 1.9, 350.0, 500, 400.0)),
        UnitDefinition::new("cola_thrower", "Explosive Cola", Side::Ally,
            StatBlock::new(350.0, 12.0, 2.5, 200.0, 1500, 250.0)
                .with_effects(vec![Displace { distance: 120.0 }]), 4000)
            .with_alt_form("Cola Spray",
                StatBlock::new(350.0, 10.0, 2.5, 150.0, 1200, 350.0).with_effects(vec![
                    Displace { distance: 40.0 },
                    StackingDebuff { per_stack: 0.15, max_stacks: 14 },
                ]))
            .with_description("Knocks the front line back."),
        UnitDefinition::new("retro_battler", "Retro Battler", Side::Ally,
            StatBlock::new(489.0, 32.0, 5.0, 55.0, 1000, 235.0), 6900)
            .with_alt_form("Retro Gunner", StatBlock::new(250.0, 42.0, 1.9, 350.0, 1250, 305.0)),
        UnitDefinition::new("grappler", "Iron Grappler", Side::Ally,
            StatBlock::new(600.0, 15.0, 3.0, 250.0, 10_000, 550.0).with_effects(vec![
                Displace { distance: -150.0 },
                Stun { duration_ms: 1000, scope: StunScope::Target, once: false },
            ]), 15_000)
            .with_alt_form("Twin Grapplers",
                StatBlock::new(600.0, 12.0, 2.4, 250.0, 8500, 550.0).with_effects(vec![
                    Splash { targets: 2 },
                    Displace { distance: -150.0 },
                    Stun { duration_ms: 1000, scope: StunScope::Target, once: false },
                ]))
            .with_description("Hooks a non-boss enemy, pulls it in and stuns it."),
        UnitDefinition::new("guard", "Security", Side::Ally,
            StatBlock::new(2013.0, 40.0, 2.0, 45.0, 1200, 550.0), 17_250),
        UnitDefinition::new("megaphone", "Megaphone Maniac", Side::Ally,
            StatBlock::new(350.0, 4.0, 3.0, 300.0, 10_000, 380.0).with_effects(vec![
                Stun { duration_ms: 3000, scope: StunScope::Target, once: false },
            ]), 12_000)
            .with_alt_form("Megaphone Earrape",
                StatBlock::new(350.0, 2.0, 3.0, 300.0, 20_000, 450.0)
                    .with_effects(vec![Stun {
                        duration_ms: 3000,
                        scope: StunScope::AllOpposing,
                        once: false,
                    }])
                    .with_damage_taken(1.3))
            .with_description("Stuns the nearest non-boss enemy."),
        UnitDefinition::new("ceo", "The CEO", Side::Ally,
            StatBlock::new(5233.0, 604.0, 1.2, 150.0, 3500, 3000.0), 69_000),
    ]
}

fn hostile_units() -> Vec<UnitDefinition> {
    use OnHitEffect::*;

    vec![
        UnitDefinition::new("e_battler", "Battler", Side::Hostile,
            StatBlock::new(170.0, 18.0, 3.5, 40.0, 1010, 80.0), 3000),
        UnitDefinition::new("e_double_puncher", "Double Puncher Battler", Side::Hostile,
            StatBlock::new(225.0, 36.0, 2.5, 40.0, 1500, 150.0), 6000),
        UnitDefinition::new("e_fourth_puncher", "Fourth Puncher Battler", Side::Hostile,
            StatBlock::new(550.0, 72.0, 2.5, 40.0, 1500, 350.0), 9000),
        UnitDefinition::new("e_enforcer", "Enforcer", Side::Hostile,
            StatBlock::new(780.0, 73.0, 1.7, 60.0, 1300, 450.0), 12_000),
        UnitDefinition::new("e_pistoler", "Enemy Pistoler", Side::Hostile,
            StatBlock::new(230.0, 38.0, 1.8, 350.0, 1250, 200.0), 4000),
        UnitDefinition::new("e_builder", "Builder", Side::Hostile,
            StatBlock::new(400.0, 10.0, 2.0, 50.0, 2000, 300.0).with_effects(vec![Summon {
                unit_id: "e_wall".into(),
                interval_ms: 30_000,
                offset: DEFAULT_SUMMON_OFFSET,
            }]), 15_000)
            .with_description("Builds a wall in front of itself every 30s while fighting."),
        UnitDefinition::new("e_wall", "Wall", Side::Hostile,
            StatBlock::new(335.0, 0.0, 0.0, 0.0, 1000, 10.0), 1000)
            .with_traits(UnitTraits {
                inert: true,
                ..UnitTraits::default()
            }),
        UnitDefinition::new("e_rage_battler", "Rage Battler", Side::Hostile,
            StatBlock::new(350.0, 55.0, 7.0, 40.0, 500, 150.0), 5000)
            .with_traits(UnitTraits {
                enrage: Some(Enrage {
                    hp_fraction: ENRAGE_HP_FRACTION,
                    attack_cooldown_ms: ENRAGE_ATTACK_COOLDOWN_MS,
                }),
                ..UnitTraits::default()
            }),
        UnitDefinition::new("e_baller", "Baller Battler", Side::Hostile,
            StatBlock::new(230.0, 40.0, 1.8, 400.0, 3500, 250.0)
                .with_effects(vec![Displace { distance: 80.0 }]), 8000),
        UnitDefinition::new("e_cake_thrower", "Cake Thrower", Side::Hostile,
            StatBlock::new(250.0, 20.0, 3.0, 250.0, 1000, 200.0).with_effects(vec![Stun {
                duration_ms: 3000,
                scope: StunScope::InRange,
                once: true,
            }]), 8000)
            .with_traits(UnitTraits {
                melee_after_ability: true,
                ..UnitTraits::default()
            })
            .with_description("Throws one cake that stuns for 3s, then brawls."),
        UnitDefinition::new("e_boss_shotgunner", "Shotgunner (BOSS)", Side::Hostile,
            StatBlock::new(6563.0, 210.0, 0.8, 200.0, 2500, 9999.0)
                .with_effects(vec![Splash { targets: crate::battle::constants::BOSS_OPENING_SPLASH_TARGETS }]),
            60_000)
            .with_traits(UnitTraits {
                boss: true,
                cost_exempt: true,
                boss_phases: Some(BossPhaseProfile::default()),
                ..UnitTraits::default()
            }),
        UnitDefinition::new("e_tactical_trooper", "Tactical Trooper", Side::Hostile,
            StatBlock::new(600.0, 45.0, 3.0, 200.0, 800, 200.0), 4000),
        UnitDefinition::new("e_sniper", "Elite Sniper", Side::Hostile,
            StatBlock::new(300.0, 400.0, 1.5, 550.0, 5000, 400.0), 10_000),
        UnitDefinition::new("e_heavy_gunner", "Heavy Gunner", Side::Hostile,
            StatBlock::new(3000.0, 15.0, 1.0, 300.0, 100, 800.0), 20_000),
        UnitDefinition::new("e_boss_bulldozer", "Bulldozer (BOSS)", Side::Hostile,
            StatBlock::new(9500.0, 100.0, 0.6, 100.0, 2000, 9999.0).with_effects(vec![Summon {
                unit_id: "e_spiky_wall".into(),
                interval_ms: 12_000,
                offset: DEFAULT_SUMMON_OFFSET,
            }]), 60_000)
            .with_traits(UnitTraits {
                boss: true,
                cost_exempt: true,
                ..UnitTraits::default()
            }),
        UnitDefinition::new("e_spiky_wall", "Spiky Wall", Side::Hostile,
            StatBlock::new(550.0, 50.0, 0.0, 15.0, 100, 10.0), 1000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster_has_both_sides() {
        let roster = UnitRoster::with_defaults();
        assert_eq!(roster.for_side(Side::Ally).count(), 10);
        assert_eq!(roster.for_side(Side::Hostile).count(), 16);
    }

    #[test]
    fn test_unknown_unit_is_error() {
        let roster = UnitRoster::with_defaults();
        assert!(matches!(roster.require("e_ghost"), Err(SimError::UnknownUnit(_))));
    }

    #[test]
    fn test_bosses_are_cost_exempt() {
        let roster = UnitRoster::with_defaults();
        for id in ["e_boss_shotgunner", "e_boss_bulldozer"] {
            let def = roster.get(id).unwrap();
            assert!(def.traits.boss);
            assert!(def.traits.cost_exempt);
        }
    }

    #[test]
    fn test_walls_are_stationary() {
        let roster = UnitRoster::with_defaults();
        assert!(roster.get("e_wall").unwrap().is_stationary());
        assert!(roster.get("e_spiky_wall").unwrap().is_stationary());
        assert!(!roster.get("e_battler").unwrap().is_stationary());
    }

    #[test]
    fn test_add_replaces_existing_id() {
        let mut roster = UnitRoster::with_defaults();
        let before = roster.len();
        roster.add(UnitDefinition::new(
            "baby",
            "Replacement",
            Side::Ally,
            StatBlock::new(1.0, 1.0, 1.0, 1.0, 1000, 1.0),
            1000,
        ));
        assert_eq!(roster.len(), before);
        assert_eq!(roster.get("baby").unwrap().name, "Replacement");
    }

    #[test]
    fn test_parse_toml_roster() {
        let toml = r#"
            [[units]]
            id = "e_slime"
            name = "Slime"
            side = "hostile"
            spawn_cooldown_ms = 2000

            [units.stats]
            hp = 90.0
            damage = 5.0
            speed = 2.0
            range = 30.0
            attack_cooldown_ms = 900
            cost = 40.0
            effects = [{ kind = "displace", distance = 10.0 }]

            [units.traits]
            priority_target = true
        "#;
        let roster = UnitRoster::parse_toml(toml).expect("roster should parse");
        let slime = roster.get("e_slime").unwrap();
        assert_eq!(slime.side, Side::Hostile);
        assert_eq!(slime.stats.effects, vec![OnHitEffect::Displace { distance: 10.0 }]);
        assert_eq!(slime.stats.damage_taken, 1.0);
        assert!(slime.traits.priority_target);
        assert!(slime.alt_form.is_none());
    }
}
