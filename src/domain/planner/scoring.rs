//! Pure scoring of candidate paths.
//!
//! A path is scored from three weighted terms, all proportional to the share of
//! the flow's total demand it carries in the step:
//! * throughput: the share itself,
//! * delay: the share damped by `max_delay / (elapsed + max_delay)`,
//! * distance: the share damped by `2^(-hop_decay * hops)`.
//!
//! Landed paths additionally receive a landing adjustment that depends on the
//! flow's landing history.

use crate::domain::planner::config::ScoreConfig;
use crate::domain::planner::flow_state::FlowHistory;
use crate::domain::planner::ligne::Ligne;
use crate::domain::topology::coord::Coord;
use crate::domain::topology::flow::Flow;

/// Weighted score of carrying `quantity` of `demand` over `hops` hops,
/// `elapsed` steps after the flow started. Zero for a non-positive demand.
pub fn base_score(config: &ScoreConfig, demand: f64, quantity: f64, elapsed: u32, hops: f64) -> f64 {
    if demand <= 0.0 || quantity <= 0.0 {
        return 0.0;
    }

    let share = quantity / demand;
    let delay = config.max_delay / (elapsed as f64 + config.max_delay);
    let decay = (-config.hop_decay * hops).exp2();

    config.scale * (config.throughput_weight * share + config.delay_weight * delay * share + config.distance_weight * decay * share)
}

/// Penalty for the `k`-th distinct landing coordinate of a flow: `scale * (1/(k-1) - 1/k)`.
///
/// `k = 1` is the first landing and is never penalized; the penalty shrinks as `k` grows.
pub fn landing_change_penalty(config: &ScoreConfig, k: u32) -> f64 {
    if k <= 1 {
        return 0.0;
    }
    let k = k as f64;
    config.landing_change_scale * (1.0 / (k - 1.0) - 1.0 / k)
}

/// Penalty the next landing change of a flow with `history` would cost.
pub fn next_change_penalty(config: &ScoreConfig, history: &FlowHistory) -> f64 {
    landing_change_penalty(config, history.landing_changes + 2)
}

/// Bonus or penalty of landing at `end` given the flow's history.
pub fn landing_adjustment(config: &ScoreConfig, history: &FlowHistory, end: &Coord) -> f64 {
    match history.last_landing {
        None => config.first_landing_bonus,
        Some(last) if last == *end => 0.0,
        Some(_) => -next_change_penalty(config, history),
    }
}

/// The largest landing adjustment any landing coordinate can achieve.
pub fn best_landing_adjustment(config: &ScoreConfig, history: &FlowHistory) -> f64 {
    match history.last_landing {
        None => config.first_landing_bonus,
        Some(_) => 0.0,
    }
}

/// Score of `ligne` for `flow` when the flow enters the step with `history`.
///
/// Mid-grid paths are scored by the distance they still have to cover and get no
/// landing adjustment.
pub fn ligne_score(config: &ScoreConfig, flow: &Flow, ligne: &Ligne, history: &FlowHistory) -> f64 {
    let Some(end) = ligne.end() else {
        return 0.0;
    };
    let elapsed = ligne.t.saturating_sub(flow.start_time);

    if ligne.landed {
        base_score(config, flow.demand, ligne.quantity, elapsed, ligne.hops() as f64) + landing_adjustment(config, history, &end)
    } else {
        let hops = ligne.hops() as f64 + flow.landing.distance_from(&end) as f64;
        base_score(config, flow.demand, ligne.quantity, elapsed, hops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topology::flow::LandingRect;
    use crate::domain::utils::id::FlowId;

    #[test]
    fn test_single_hop_full_demand() {
        // q equals the demand, no delay, one hop
        let score = base_score(&ScoreConfig::default(), 10.0, 10.0, 0, 1.0);
        assert!((score - 87.991).abs() < 1e-3, "got {}", score);
    }

    #[test]
    fn test_penalty_is_harmonic_and_decreasing() {
        let config = ScoreConfig::default();
        assert_eq!(landing_change_penalty(&config, 0), 0.0);
        assert_eq!(landing_change_penalty(&config, 1), 0.0);
        assert!((landing_change_penalty(&config, 2) - 5.0).abs() < 1e-12);

        let mut previous = f64::INFINITY;
        for k in 2..20 {
            let p = landing_change_penalty(&config, k);
            assert!(p > 0.0 && p < previous, "penalty({}) = {} must be positive and below {}", k, p, previous);
            previous = p;
        }
    }

    #[test]
    fn test_landing_adjustment_by_history() {
        let config = ScoreConfig::default();
        let end = Coord::new(2, 0);

        assert_eq!(landing_adjustment(&config, &FlowHistory::default(), &end), config.first_landing_bonus);
        assert_eq!(landing_adjustment(&config, &FlowHistory::new(Some(end), 3), &end), 0.0);

        let moved = landing_adjustment(&config, &FlowHistory::new(Some(Coord::new(1, 0)), 0), &end);
        assert!((moved + 5.0).abs() < 1e-12, "first change costs penalty(2), got {}", moved);
    }

    #[test]
    fn test_score_shrinks_with_hops_and_delay() {
        let config = ScoreConfig::default();
        assert!(base_score(&config, 30.0, 10.0, 0, 2.0) > base_score(&config, 30.0, 10.0, 0, 3.0));
        assert!(base_score(&config, 30.0, 10.0, 0, 2.0) > base_score(&config, 30.0, 10.0, 4, 2.0));
        assert_eq!(base_score(&config, 0.0, 10.0, 0, 2.0), 0.0);
    }

    #[test]
    fn test_ligne_score_depends_on_history() {
        let config = ScoreConfig::default();
        let flow = Flow::new(FlowId::new(1), Coord::new(0, 0), 1, 10.0, LandingRect::new(1, 0, 1, 0));
        let ligne = Ligne { flow_id: flow.id, t: 1, route: vec![Coord::new(0, 0), Coord::new(1, 0)], bottleneck: 10.0, quantity: 10.0, landed: true, score: 0.0 };

        let first = ligne_score(&config, &flow, &ligne, &FlowHistory::default());
        assert!((first - (87.991 + 5.0)).abs() < 1e-3, "got {}", first);

        let again = ligne_score(&config, &flow, &ligne, &FlowHistory::new(Some(Coord::new(1, 0)), 0));
        assert!((first - again - config.first_landing_bonus).abs() < 1e-12);
    }
}
