use std::time::{Duration, Instant};

/// How a bounded search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Every branch allowed by the branching caps was explored.
    Complete,

    /// The leaf budget or the deadline ran out; the rest of the plan was completed greedily.
    BudgetExhausted,
}

/// Unit count and wall clock limits of one search.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    max_units: Option<usize>,
    deadline: Option<Instant>,
    used: usize,
}

impl SearchBudget {
    pub fn new(max_units: Option<usize>, time_limit_ms: Option<u64>) -> Self {
        // A limit too far out to represent means no deadline.
        let deadline = time_limit_ms.and_then(|ms| Instant::now().checked_add(Duration::from_millis(ms)));
        SearchBudget { max_units, deadline, used: 0 }
    }

    pub fn consume(&mut self) {
        self.used += 1;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_units.is_some_and(|max| self.used >= max) || self.deadline_passed()
    }
}
