use serde::Deserialize;

/// All tunables of the planner. Every field has a default, so a partial JSON
/// file only needs to name what it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    pub score: ScoreConfig,
    pub search: SearchConfig,
    pub slice_planner: SlicePlannerConfig,
    pub cube_builder: CubeBuilderConfig,
    pub optimizer: OptimizerConfig,
}

/// Weights and constants of the candidate path score.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreConfig {
    /// Multiplier applied to the weighted sum of the three terms.
    pub scale: f64,

    /// Weight of the share of total demand carried in the step.
    pub throughput_weight: f64,

    /// Weight of the delay term.
    pub delay_weight: f64,

    /// Weight of the distance term.
    pub distance_weight: f64,

    /// Exponent of the hop penalty `2^(-hop_decay * hops)`.
    pub hop_decay: f64,

    /// Delay constant: the delay term halves once `max_delay` steps passed since the flow start.
    pub max_delay: f64,

    /// Added to a landed path when the flow has never landed before.
    pub first_landing_bonus: f64,

    /// Scale of the harmonic landing change penalty.
    pub landing_change_scale: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        ScoreConfig {
            scale: 100.0,
            throughput_weight: 0.4,
            delay_weight: 0.2,
            distance_weight: 0.3,
            hop_decay: 0.1,
            max_delay: 10.0,
            first_landing_bonus: 5.0,
            landing_change_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Upper bound on the candidates returned by one search.
    pub max_candidates: usize,

    /// Upper bound on the paths popped from the open set.
    pub max_expansions: usize,

    /// Return the best mid-grid path when no landed path exists.
    pub keep_unlanded: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { max_candidates: 8, max_expansions: 20_000, keep_unlanded: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlicePlannerConfig {
    /// Number of slices kept after ranking.
    pub beam_width: usize,

    /// Below this many active flows every ordering is explored; from it on only the greedy one.
    pub permutation_threshold: usize,

    /// Candidates of one flow that are branched on during assignment.
    pub branch_candidates: usize,

    /// Complete assignments after which enumeration stops.
    pub max_assignments: usize,
}

impl Default for SlicePlannerConfig {
    fn default() -> Self {
        SlicePlannerConfig { beam_width: 8, permutation_threshold: 4, branch_candidates: 3, max_assignments: 512 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CubeBuilderConfig {
    /// Slices explored per time step in the depth-first search.
    pub max_branching: usize,

    /// Complete plans evaluated before the search continues greedily.
    pub max_leaves: usize,

    /// Wall clock budget of the search.
    pub time_limit_ms: Option<u64>,
}

impl Default for CubeBuilderConfig {
    fn default() -> Self {
        CubeBuilderConfig { max_branching: 2, max_leaves: 64, time_limit_ms: None }
    }
}

/// Whether the potential of a flow is computed with its own confirmed usage removed
/// from the snapshot or still subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnUsagePolicy {
    /// The flow's own usage is presumed removable and stays available.
    Removable,

    /// The flow's own usage is subtracted like any other flow's.
    Masked,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub max_iterations: usize,

    /// Efficiency gaps at or below this value count as converged.
    pub gap_tolerance: f64,

    /// Quantities at or below this value count as zero.
    pub quantity_epsilon: f64,

    pub own_usage_policy: OwnUsagePolicy,
    pub time_limit_ms: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            enabled: true,
            max_iterations: 50,
            gap_tolerance: 1e-6,
            quantity_epsilon: 1e-9,
            own_usage_policy: OwnUsagePolicy::Removable,
            time_limit_ms: None,
        }
    }
}
