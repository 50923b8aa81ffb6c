//! Stat resolution: effective combat numbers for a unit in context
//!
//! Ally units scale hp and damage with their level and may field an
//! alternate form. Hostile units never level; instead a per-stage
//! multiplier table tunes specific unit/stage combinations. Resolution is
//! pure so menus can preview numbers without touching battle state.

use serde::{Deserialize, Serialize};

use crate::battle::unit_type::{OnHitEffect, UnitDefinition, UnitRoster};
use crate::core::config::BattleConfig;
use crate::core::error::Result;
use crate::core::types::{Millis, Side, StageId};

/// Level and form inputs for one ally unit type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelContext {
    pub level: u32,
    pub prefer_alt: bool,
    pub growth_rate: f64,
    pub alt_form_level: u32,
}

impl LevelContext {
    pub fn new(level: u32, prefer_alt: bool, config: &BattleConfig) -> Self {
        Self {
            level: level.max(1),
            prefer_alt,
            growth_rate: config.growth_rate,
            alt_form_level: config.alt_form_level,
        }
    }

    /// Level 1, base form. Used for hostile units and previews.
    pub fn base(config: &BattleConfig) -> Self {
        Self::new(1, false, config)
    }

    pub fn growth_multiplier(&self) -> f64 {
        1.0 + (self.level.saturating_sub(1)) as f64 * self.growth_rate
    }
}

/// One row of the hostile stage multiplier table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRule {
    /// Restrict to one unit id; `None` matches every hostile
    #[serde(default)]
    pub unit_id: Option<String>,
    pub from_stage: StageId,
    #[serde(default)]
    pub until_stage: Option<StageId>,
    /// Whether bosses are affected
    #[serde(default)]
    pub include_bosses: bool,
    pub multiplier: f64,
}

impl ScalingRule {
    fn matches(&self, definition: &UnitDefinition, stage: StageId) -> bool {
        if stage < self.from_stage {
            return false;
        }
        if self.until_stage.is_some_and(|until| stage > until) {
            return false;
        }
        if definition.traits.boss && !self.include_bosses {
            return false;
        }
        match &self.unit_id {
            Some(id) => *id == definition.id,
            None => true,
        }
    }
}

/// Per-stage hp/damage multipliers for hostile units; first match wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostileScaling {
    pub rules: Vec<ScalingRule>,
}

impl Default for HostileScaling {
    fn default() -> Self {
        Self {
            rules: vec![
                // Tutorial nerf
                ScalingRule {
                    unit_id: Some("e_battler".into()),
                    from_stage: 1,
                    until_stage: Some(1),
                    include_bosses: false,
                    multiplier: 0.75,
                },
                ScalingRule {
                    unit_id: None,
                    from_stage: 16,
                    until_stage: None,
                    include_bosses: false,
                    multiplier: 1.10,
                },
            ],
        }
    }
}

impl HostileScaling {
    /// No multipliers at all
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn multiplier(&self, definition: &UnitDefinition, stage: StageId) -> f64 {
        self.rules
            .iter()
            .find(|rule| rule.matches(definition, stage))
            .map(|rule| rule.multiplier)
            .unwrap_or(1.0)
    }
}

/// Resolved numbers the tick engine fights with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveStats {
    pub name: String,
    pub alt_form: bool,
    pub hp: f64,
    pub damage: f64,
    pub speed: f64,
    pub range: f64,
    pub attack_cooldown_ms: Millis,
    pub cost: f64,
    pub spawn_cooldown_ms: Millis,
    pub effects: Vec<OnHitEffect>,
    pub damage_taken: f64,
}

/// Whether an ally unit fields its alternate form at this level
pub fn uses_alt_form(definition: &UnitDefinition, ctx: &LevelContext) -> bool {
    definition.side == Side::Ally
        && definition.alt_form.is_some()
        && ctx.prefer_alt
        && ctx.level >= ctx.alt_form_level
}

/// Compute effective stats for a definition in its level and stage context
///
/// `ctx` is ignored for hostile units and `scaling` is ignored for allies.
pub fn resolve(
    definition: &UnitDefinition,
    ctx: &LevelContext,
    stage: StageId,
    scaling: &HostileScaling,
) -> EffectiveStats {
    let alt = uses_alt_form(definition, ctx);
    let (name, block) = match (&definition.alt_form, alt) {
        (Some(form), true) => (form.name.clone(), &form.stats),
        _ => (definition.name.clone(), &definition.stats),
    };

    let multiplier = match definition.side {
        Side::Ally => ctx.growth_multiplier(),
        Side::Hostile => scaling.multiplier(definition, stage),
    };

    EffectiveStats {
        name,
        alt_form: alt,
        hp: block.hp * multiplier,
        damage: block.damage * multiplier,
        speed: block.speed,
        range: block.range,
        attack_cooldown_ms: block.attack_cooldown_ms,
        cost: block.cost,
        spawn_cooldown_ms: definition.spawn_cooldown_ms,
        effects: block.effects.clone(),
        damage_taken: block.damage_taken,
    }
}

impl UnitRoster {
    /// Resolve stats by id without any battle in progress
    pub fn preview(
        &self,
        id: &str,
        ctx: &LevelContext,
        stage: StageId,
        scaling: &HostileScaling,
    ) -> Result<EffectiveStats> {
        Ok(resolve(self.require(id)?, ctx, stage, scaling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_level_scaling_hp_and_damage_only() {
        let roster = UnitRoster::with_defaults();
        let config = BattleConfig::default();
        let ctx = LevelContext::new(4, false, &config);
        let baby = roster.preview("baby", &ctx, 1, &HostileScaling::default()).unwrap();
        assert!(approx(baby.hp, 240.0));
        assert!(approx(baby.damage, 24.0));
        assert_eq!(baby.speed, 4.0);
        assert_eq!(baby.range, 40.0);
        assert_eq!(baby.attack_cooldown_ms, 1000);
    }

    #[test]
    fn test_alt_form_needs_level_and_preference() {
        let roster = UnitRoster::with_defaults();
        let config = BattleConfig::default();
        let pistoler = roster.get("pistoler").unwrap();

        let low = LevelContext::new(9, true, &config);
        assert!(!resolve(pistoler, &low, 1, &HostileScaling::none()).alt_form);

        let unwilling = LevelContext::new(10, false, &config);
        assert!(!resolve(pistoler, &unwilling, 1, &HostileScaling::none()).alt_form);

        let ready = LevelContext::new(10, true, &config);
        let smg = resolve(pistoler, &ready, 1, &HostileScaling::none());
        assert!(smg.alt_form);
        assert_eq!(smg.name, "SMG Gunner");
        assert_eq!(smg.attack_cooldown_ms, 500);
        assert_eq!(smg.cost, 400.0);
    }

    #[test]
    fn test_units_without_alt_form_stay_base() {
        let roster = UnitRoster::with_defaults();
        let config = BattleConfig::default();
        let ctx = LevelContext::new(10, true, &config);
        let guard = roster.preview("guard", &ctx, 1, &HostileScaling::none()).unwrap();
        assert!(!guard.alt_form);
    }

    #[test]
    fn test_tutorial_battler_nerf() {
        let roster = UnitRoster::with_defaults();
        let config = BattleConfig::default();
        let ctx = LevelContext::base(&config);
        let scaling = HostileScaling::default();

        let stage1 = roster.preview("e_battler", &ctx, 1, &scaling).unwrap();
        assert!(approx(stage1.damage, 13.5));
        assert!(approx(stage1.hp, 127.5));

        let stage2 = roster.preview("e_battler", &ctx, 2, &scaling).unwrap();
        assert!(approx(stage2.damage, 18.0));
    }

    #[test]
    fn test_late_stage_buff_skips_bosses() {
        let roster = UnitRoster::with_defaults();
        let config = BattleConfig::default();
        let ctx = LevelContext::base(&config);
        let scaling = HostileScaling::default();

        let trooper = roster.preview("e_tactical_trooper", &ctx, 17, &scaling).unwrap();
        assert!(approx(trooper.hp, 660.0));

        let boss = roster.preview("e_boss_bulldozer", &ctx, 20, &scaling).unwrap();
        assert!(approx(boss.hp, 9500.0));
    }

    #[test]
    fn test_hostile_ignores_level_context() {
        let roster = UnitRoster::with_defaults();
        let config = BattleConfig::default();
        let ctx = LevelContext::new(8, true, &config);
        let dp = roster.preview("e_double_puncher", &ctx, 3, &HostileScaling::none()).unwrap();
        assert!(approx(dp.damage, 36.0));
    }
}
