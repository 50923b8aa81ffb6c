//! Stage spawn policies as data
//!
//! A stage owns an ordered list of policy layers. Each layer either yields
//! one spawn choice or passes, and the first layer that yields wins.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{Millis, StageId};

/// One candidate inside a probability group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollEntry {
    /// Spawn when the group's roll is below this value
    pub threshold: f64,
    pub unit_id: String,
    pub cooldown_ms: Millis,
}

/// Entries sharing a single roll, checked in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollGroup {
    pub entries: Vec<RollEntry>,
}

/// Time or pressure condition on a priority rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gate {
    Always,
    /// Open while `from <= elapsed < until`
    Window {
        from: Millis,
        #[serde(default)]
        until: Option<Millis>,
    },
    /// Open once `elapsed > after` or the hostile stronghold drops below
    /// `hp_fraction` of its max
    LateOrPressured { after: Millis, hp_fraction: f64 },
}

impl Gate {
    pub fn is_open(&self, elapsed: Millis, stronghold_hp: f64, stronghold_max_hp: f64) -> bool {
        match *self {
            Gate::Always => true,
            Gate::Window { from, until } => {
                elapsed >= from && until.map_or(true, |until| elapsed < until)
            }
            Gate::LateOrPressured { after, hp_fraction } => {
                elapsed > after || stronghold_hp < stronghold_max_hp * hp_fraction
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub unit_id: String,
    pub cooldown_ms: Millis,
    #[serde(default = "default_gate")]
    pub gate: Gate,
}

fn default_gate() -> Gate {
    Gate::Always
}

/// Keep a frontline alive, otherwise build the backline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionPolicy {
    /// Live hostile units of these ids count toward the frontline
    pub frontline_roles: Vec<String>,
    /// Units fielded to rebuild the frontline
    pub frontline: Vec<String>,
    pub backline: Vec<String>,
    pub frontline_floor: usize,
    /// With no backline option, reinforce the frontline above this currency
    pub surplus_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossPolicy {
    pub boss_id: String,
    /// Boss appears once `elapsed > delay_ms`
    pub delay_ms: Millis,
    /// Priority chain used after the boss is out
    pub support: Vec<PriorityRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagePolicy {
    FlatProbability { groups: Vec<RollGroup> },
    Priority { rules: Vec<PriorityRule> },
    Composition(CompositionPolicy),
    Boss(BossPolicy),
}

fn roll(threshold: f64, unit_id: &str, cooldown_ms: Millis) -> RollEntry {
    RollEntry {
        threshold,
        unit_id: unit_id.into(),
        cooldown_ms,
    }
}

fn group(entries: Vec<RollEntry>) -> RollGroup {
    RollGroup { entries }
}

fn rule(unit_id: &str, cooldown_ms: Millis) -> PriorityRule {
    PriorityRule {
        unit_id: unit_id.into(),
        cooldown_ms,
        gate: Gate::Always,
    }
}

fn gated(unit_id: &str, cooldown_ms: Millis, gate: Gate) -> PriorityRule {
    PriorityRule {
        unit_id: unit_id.into(),
        cooldown_ms,
        gate,
    }
}

fn window(from: Millis, until: Option<Millis>) -> Gate {
    Gate::Window { from, until }
}

fn flat(groups: Vec<RollGroup>) -> StagePolicy {
    StagePolicy::FlatProbability { groups }
}

fn priority(rules: Vec<PriorityRule>) -> StagePolicy {
    StagePolicy::Priority { rules }
}

/// Roll every stage from 3 on falls back to when its own layers pass
fn skirmish() -> StagePolicy {
    flat(vec![group(vec![
        roll(0.15, "e_double_puncher", 6000),
        roll(0.40, "e_battler", 3000),
    ])])
}

fn builder_roll() -> RollGroup {
    group(vec![roll(0.15, "e_builder", 18_000)])
}

fn pistoler_roll() -> RollGroup {
    group(vec![roll(0.10, "e_pistoler", 12_000)])
}

/// The shipped stage table, stages 1 to 21
pub fn default_policies() -> AHashMap<StageId, Vec<StagePolicy>> {
    let mut table: AHashMap<StageId, Vec<StagePolicy>> = AHashMap::new();

    table.insert(1, vec![flat(vec![group(vec![roll(0.25, "e_battler", 8000)])])]);
    table.insert(
        2,
        vec![flat(vec![group(vec![
            roll(0.15, "e_double_puncher", 10_000),
            roll(0.35, "e_battler", 5000),
        ])])],
    );
    table.insert(3, vec![flat(vec![builder_roll()]), skirmish()]);
    table.insert(4, vec![flat(vec![builder_roll(), pistoler_roll()]), skirmish()]);
    table.insert(
        5,
        vec![
            flat(vec![
                group(vec![roll(0.12, "e_rage_battler", 3500)]),
                builder_roll(),
                pistoler_roll(),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        6,
        vec![
            priority(vec![
                rule("e_battler", 1500),
                rule("e_double_puncher", 4500),
                gated(
                    "e_pistoler",
                    8000,
                    Gate::LateOrPressured {
                        after: 30_000,
                        hp_fraction: 0.8,
                    },
                ),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        7,
        vec![
            priority(vec![
                rule("e_baller", 8000),
                rule("e_battler", 2000),
                rule("e_pistoler", 10_000),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        8,
        vec![
            priority(vec![
                rule("e_builder", 15_000),
                rule("e_baller", 5000),
                rule("e_pistoler", 2500),
            ]),
            skirmish(),
        ],
    );

    let meatshields = vec![
        "e_battler".to_string(),
        "e_double_puncher".to_string(),
        "e_rage_battler".to_string(),
    ];
    let mut frontline_roles = meatshields.clone();
    frontline_roles.push("e_wall".into());
    table.insert(
        9,
        vec![
            StagePolicy::Composition(CompositionPolicy {
                frontline_roles,
                frontline: meatshields,
                backline: vec!["e_baller".into(), "e_pistoler".into(), "e_builder".into()],
                frontline_floor: 4,
                surplus_threshold: 400.0,
            }),
            skirmish(),
        ],
    );

    table.insert(
        10,
        vec![
            StagePolicy::Boss(BossPolicy {
                boss_id: "e_boss_shotgunner".into(),
                delay_ms: 2000,
                support: vec![
                    rule("e_baller", 10_000),
                    rule("e_builder", 15_000),
                    rule("e_pistoler", 6000),
                    rule("e_battler", 2500),
                ],
            }),
            skirmish(),
        ],
    );
    table.insert(
        11,
        vec![priority(vec![rule("e_fourth_puncher", 12_000), rule("e_battler", 2500)]), skirmish()],
    );
    table.insert(
        12,
        vec![
            priority(vec![
                rule("e_fourth_puncher", 9000),
                rule("e_double_puncher", 4000),
                rule("e_builder", 15_000),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        13,
        vec![
            priority(vec![
                rule("e_cake_thrower", 8000),
                rule("e_battler", 2500),
                rule("e_pistoler", 6000),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        14,
        vec![
            priority(vec![
                rule("e_cake_thrower", 9000),
                rule("e_baller", 7000),
                rule("e_builder", 14_000),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        15,
        vec![
            priority(vec![
                gated("e_battler", 2000, window(0, Some(20_000))),
                rule("e_enforcer", 10_000),
                rule("e_pistoler", 8000),
                rule("e_battler", 2500),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        16,
        vec![
            priority(vec![
                rule("e_enforcer", 18_000),
                rule("e_fourth_puncher", 14_000),
                rule("e_baller", 12_000),
                rule("e_pistoler", 9000),
                rule("e_double_puncher", 5000),
                rule("e_battler", 2000),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        17,
        vec![priority(vec![rule("e_sniper", 15_000), rule("e_tactical_trooper", 4000)]), skirmish()],
    );
    table.insert(
        18,
        vec![
            priority(vec![rule("e_heavy_gunner", 30_000), rule("e_tactical_trooper", 2500)]),
            skirmish(),
        ],
    );
    table.insert(
        19,
        vec![
            priority(vec![
                rule("e_heavy_gunner", 25_000),
                rule("e_sniper", 12_000),
                rule("e_tactical_trooper", 3000),
            ]),
            skirmish(),
        ],
    );
    table.insert(
        20,
        vec![
            StagePolicy::Boss(BossPolicy {
                boss_id: "e_boss_bulldozer".into(),
                delay_ms: 3000,
                support: vec![
                    rule("e_heavy_gunner", 35_000),
                    rule("e_sniper", 20_000),
                    rule("e_fourth_puncher", 15_000),
                    rule("e_enforcer", 12_000),
                    rule("e_tactical_trooper", 8000),
                    rule("e_cake_thrower", 10_000),
                ],
            }),
            skirmish(),
        ],
    );

    // Iron Curtain: three escalating windows
    let opening = window(0, Some(15_000));
    let middle = window(15_000, Some(35_000));
    let late = window(35_000, None);
    table.insert(
        21,
        vec![
            priority(vec![
                gated("e_tactical_trooper", 3000, opening),
                gated("e_pistoler", 6000, opening),
                gated("e_battler", 2200, opening),
                gated("e_enforcer", 14_000, middle),
                gated("e_fourth_puncher", 11_000, middle),
                gated("e_tactical_trooper", 3500, middle),
                gated("e_cake_thrower", 9000, middle),
                gated("e_heavy_gunner", 25_000, late),
                gated("e_sniper", 15_000, late),
                gated("e_enforcer", 12_000, late),
                gated("e_tactical_trooper", 4000, late),
                gated("e_battler", 2500, late),
            ]),
            skirmish(),
        ],
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_gate_half_open() {
        let gate = window(15_000, Some(35_000));
        assert!(!gate.is_open(14_999, 1.0, 1.0));
        assert!(gate.is_open(15_000, 1.0, 1.0));
        assert!(!gate.is_open(35_000, 1.0, 1.0));
        assert!(window(35_000, None).is_open(1_000_000, 1.0, 1.0));
    }

    #[test]
    fn test_late_or_pressured_gate() {
        let gate = Gate::LateOrPressured {
            after: 30_000,
            hp_fraction: 0.8,
        };
        assert!(!gate.is_open(30_000, 5500.0, 5500.0));
        assert!(gate.is_open(30_001, 5500.0, 5500.0));
        assert!(gate.is_open(10_000, 4000.0, 5500.0));
    }

    #[test]
    fn test_every_stage_has_a_policy() {
        let table = default_policies();
        for stage in 1..=21 {
            assert!(table.contains_key(&stage), "stage {} missing", stage);
        }
        assert!(!table.contains_key(&22));
    }

    #[test]
    fn test_boss_stages_use_boss_policy() {
        let table = default_policies();
        for stage in [10, 20] {
            assert!(matches!(table[&stage][0], StagePolicy::Boss(_)));
        }
    }
}
