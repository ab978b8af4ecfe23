use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::domain::planner::budget::SearchStatus;
use crate::domain::planner::config::{PlannerConfig, ScoreConfig, SearchConfig};
use crate::domain::planner::flow_state::FlowHistory;
use crate::domain::planner::ligne::Ligne;
use crate::domain::planner::scoring;
use crate::domain::topology::capacity::{CAPACITY_EPSILON, CapacitySnapshot};
use crate::domain::topology::coord::Coord;
use crate::domain::topology::flow::Flow;

/// A route under construction. Stored in the search arena, referenced from the open set by index.
#[derive(Debug, Clone)]
struct PartialPath {
    route: Vec<Coord>,
    bottleneck: f64,
}

impl PartialPath {
    fn end(&self) -> Coord {
        // Routes are never empty: every path starts at the access coordinate.
        self.route[self.route.len() - 1]
    }

    fn hops(&self) -> usize {
        self.route.len() - 1
    }
}

/// Open set entry. Ordered by priority; among equal priorities the earlier push wins.
#[derive(Debug)]
struct OpenEntry {
    priority: f64,
    seq: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.total_cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Finds candidate paths for one flow at one time step.
///
/// Best-first search over the 4-connected grid. The priority of a path is an upper
/// bound on the score of any of its extensions (exact once the path has landed):
/// quantity never grows along a route, and reaching the landing rectangle takes at
/// least the remaining Manhattan distance in hops.
///
/// Landing is terminal. Once a landed score is known, paths below
/// `best - next landing change penalty` are discarded and the search stops as soon
/// as the best open bound falls below that threshold.
pub struct LigneFinder<'a> {
    flow: &'a Flow,
    t: u32,
    snapshot: &'a CapacitySnapshot,
    history: FlowHistory,
    remaining: f64,
    score_config: &'a ScoreConfig,
    search_config: &'a SearchConfig,
}

/// Mutable state of one search run.
struct SearchLoop {
    arena: Vec<PartialPath>,
    open: BinaryHeap<OpenEntry>,
    seq: u64,

    /// Highest priority pushed per reached coordinate.
    best_at: BTreeMap<Coord, f64>,

    best_landed: Option<f64>,
    threshold: f64,
}

impl SearchLoop {
    fn push(&mut self, path: PartialPath, priority: f64) {
        self.best_at.insert(path.end(), priority);
        self.arena.push(path);
        self.seq += 1;
        self.open.push(OpenEntry { priority, seq: self.seq, index: self.arena.len() - 1 });
    }
}

impl<'a> LigneFinder<'a> {
    pub fn new(flow: &'a Flow, t: u32, snapshot: &'a CapacitySnapshot, history: FlowHistory, remaining: f64, config: &'a PlannerConfig) -> Self {
        LigneFinder { flow, t, snapshot, history, remaining, score_config: &config.score, search_config: &config.search }
    }

    /// Runs the search and returns the candidates ranked by score, highest first.
    ///
    /// Empty if the flow has not started, has nothing left to send or cannot enter
    /// the grid at its access coordinate. An empty result is a valid outcome.
    pub fn run(&self) -> Vec<Ligne> {
        self.run_with_status().0
    }

    /// Like [`LigneFinder::run`], also telling whether `max_expansions` cut the search short.
    pub fn run_with_status(&self) -> (Vec<Ligne>, SearchStatus) {
        if !self.flow.is_active_at(self.t) || self.remaining <= CAPACITY_EPSILON {
            return (Vec::new(), SearchStatus::Complete);
        }

        let access_capacity = self.snapshot.get(&self.flow.access);
        if access_capacity <= CAPACITY_EPSILON {
            return (Vec::new(), SearchStatus::Complete);
        }

        let mut search = SearchLoop {
            arena: Vec::new(),
            open: BinaryHeap::new(),
            seq: 0,
            best_at: BTreeMap::new(),
            best_landed: None,
            threshold: f64::NEG_INFINITY,
        };

        let start = PartialPath { route: vec![self.flow.access], bottleneck: access_capacity };
        let priority = self.priority(&start);
        search.push(start, priority);

        let next_penalty = scoring::next_change_penalty(self.score_config, &self.history);
        let mut landed: Vec<Ligne> = Vec::new();
        let mut best_unlanded: Option<Ligne> = None;
        let mut expansions = 0;
        let mut status = SearchStatus::Complete;

        while let Some(entry) = search.open.pop() {
            if entry.priority < search.threshold {
                break;
            }

            expansions += 1;
            if expansions > self.search_config.max_expansions {
                status = SearchStatus::BudgetExhausted;
                break;
            }

            let path = search.arena[entry.index].clone();
            let end = path.end();

            if self.flow.in_landing_range(&end) {
                let ligne = self.to_ligne(&path, true);
                if search.best_landed.is_none_or(|best| ligne.score > best) {
                    search.best_landed = Some(ligne.score);
                    search.threshold = ligne.score - next_penalty;
                }
                landed.push(ligne);
                continue;
            }

            // A better path reached this coordinate after the entry was pushed.
            if search.best_at.get(&end).is_some_and(|best| *best > entry.priority) {
                continue;
            }

            if self.search_config.keep_unlanded && path.hops() > 0 {
                let ligne = self.to_ligne(&path, false);
                let better = match &best_unlanded {
                    None => true,
                    Some(current) => ligne.score > current.score || (ligne.score == current.score && ligne.hops() < current.hops()),
                };
                if better {
                    best_unlanded = Some(ligne);
                }
            }

            for next in end.neighbors4() {
                let capacity = self.snapshot.get(&next);
                if capacity <= CAPACITY_EPSILON || path.route.contains(&next) {
                    continue;
                }

                let mut route = path.route.clone();
                route.push(next);
                let child = PartialPath { route, bottleneck: path.bottleneck.min(capacity) };
                let priority = self.priority(&child);

                if priority < search.threshold {
                    continue;
                }
                if search.best_at.get(&next).is_some_and(|best| *best >= priority) {
                    continue;
                }

                search.push(child, priority);
            }
        }

        let mut candidates = Self::retain_shortest_per_landing(landed, search.threshold);
        candidates.sort_by(Self::rank);
        candidates.truncate(self.search_config.max_candidates);

        if candidates.is_empty() {
            if let Some(unlanded) = best_unlanded {
                candidates.push(unlanded);
            }
        }

        (candidates, status)
    }

    fn quantity(&self, path: &PartialPath) -> f64 {
        path.bottleneck.min(self.remaining)
    }

    fn elapsed(&self) -> u32 {
        self.t.saturating_sub(self.flow.start_time)
    }

    /// Exact score for a landed path, optimistic bound otherwise.
    fn priority(&self, path: &PartialPath) -> f64 {
        let end = path.end();
        let quantity = self.quantity(path);

        if self.flow.in_landing_range(&end) {
            scoring::base_score(self.score_config, self.flow.demand, quantity, self.elapsed(), path.hops() as f64)
                + scoring::landing_adjustment(self.score_config, &self.history, &end)
        } else {
            let hops = path.hops() as f64 + self.flow.landing.distance_from(&end) as f64;
            scoring::base_score(self.score_config, self.flow.demand, quantity, self.elapsed(), hops)
                + scoring::best_landing_adjustment(self.score_config, &self.history)
        }
    }

    fn to_ligne(&self, path: &PartialPath, landed: bool) -> Ligne {
        let quantity = self.quantity(path);
        let mut ligne = Ligne { flow_id: self.flow.id, t: self.t, route: path.route.clone(), bottleneck: path.bottleneck, quantity, landed, score: 0.0 };
        ligne.score = scoring::ligne_score(self.score_config, self.flow, &ligne, &self.history);
        ligne
    }

    /// Keeps, per landing coordinate, the shortest candidates that clear `threshold`.
    fn retain_shortest_per_landing(landed: Vec<Ligne>, threshold: f64) -> Vec<Ligne> {
        let mut shortest: BTreeMap<Coord, usize> = BTreeMap::new();
        let clearing: Vec<Ligne> = landed.into_iter().filter(|l| l.score >= threshold).collect();

        for ligne in &clearing {
            if let Some(end) = ligne.end() {
                let hops = shortest.entry(end).or_insert(usize::MAX);
                *hops = (*hops).min(ligne.hops());
            }
        }

        let mut kept: Vec<Ligne> = Vec::new();
        for ligne in clearing {
            let is_shortest = ligne.end().and_then(|end| shortest.get(&end)).is_some_and(|hops| *hops == ligne.hops());
            if is_shortest && !kept.iter().any(|k| k.route == ligne.route) {
                kept.push(ligne);
            }
        }
        kept
    }

    /// Score descending, then fewer hops, then landing coordinate, then route.
    fn rank(a: &Ligne, b: &Ligne) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.hops().cmp(&b.hops()))
            .then_with(|| a.end().cmp(&b.end()))
            .then_with(|| a.route.cmp(&b.route))
    }
}
