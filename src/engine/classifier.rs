use crate::config::{EvalSettings, TierThresholds};
use crate::types::{Direction, Proposition, Tier, Verbosity};

/// Decide output verbosity for a computed hit rate.
pub fn classify(hit_rate: f64, tier: Tier, thresholds: &TierThresholds, force_detailed: bool) -> Verbosity {
    if force_detailed || hit_rate >= thresholds.floor(tier) {
        Verbosity::Detailed
    } else {
        Verbosity::Summary
    }
}

/// Directions a proposition is evaluated in. Standard-tier lines carry no fixed
/// direction, so both sides are checked unless disabled.
pub fn directions_for(prop: &Proposition, settings: &EvalSettings) -> Vec<Direction> {
    if prop.tier == Tier::Standard && settings.both_directions_for_standard {
        vec![Direction::Over, Direction::Under]
    } else {
        vec![prop.direction]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(tier: Tier, direction: Direction) -> Proposition {
        Proposition {
            player_name: "P".to_string(),
            stat: "Points".to_string(),
            target: 20.5,
            direction,
            tier,
        }
    }

    #[test]
    fn standard_boundary_is_inclusive() {
        let t = TierThresholds::default();
        assert_eq!(classify(0.80, Tier::Standard, &t, false), Verbosity::Detailed);
        assert_eq!(classify(16.0 / 20.0, Tier::Standard, &t, false), Verbosity::Detailed);
        assert_eq!(classify(0.7999999, Tier::Standard, &t, false), Verbosity::Summary);
    }

    #[test]
    fn goblin_and_demon_floors() {
        let t = TierThresholds::default();
        assert_eq!(classify(0.90, Tier::Goblin, &t, false), Verbosity::Detailed);
        assert_eq!(classify(0.85, Tier::Goblin, &t, false), Verbosity::Summary);
        assert_eq!(classify(0.55, Tier::Demon, &t, false), Verbosity::Detailed);
        assert_eq!(classify(0.54, Tier::Demon, &t, false), Verbosity::Summary);
    }

    #[test]
    fn override_forces_detailed() {
        let t = TierThresholds::default();
        assert_eq!(classify(0.0, Tier::Goblin, &t, true), Verbosity::Detailed);
    }

    #[test]
    fn standard_props_are_evaluated_both_ways() {
        let s = EvalSettings::default();
        assert_eq!(
            directions_for(&prop(Tier::Standard, Direction::Over), &s),
            vec![Direction::Over, Direction::Under]
        );
        assert_eq!(
            directions_for(&prop(Tier::Goblin, Direction::Under), &s),
            vec![Direction::Under]
        );
    }

    #[test]
    fn dual_direction_can_be_disabled() {
        let s = EvalSettings {
            both_directions_for_standard: false,
            ..EvalSettings::default()
        };
        assert_eq!(
            directions_for(&prop(Tier::Standard, Direction::Over), &s),
            vec![Direction::Over]
        );
    }
}
