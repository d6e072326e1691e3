//! Iteration budgets for time-sliced walks.
//!
//! A budget is the number of nodes a single walk slice may visit before it
//! hands control back to the caller. Unbounded budgets are used by the
//! one-shot `walk`; bounded ones by `walk_incremental` and `drive`.

/// Counts down the nodes a walk slice is still allowed to visit.
#[derive(Debug, Clone, Copy)]
pub struct IterationBudget {
    remaining: Option<usize>,
    spent: usize,
}

impl IterationBudget {
    /// Creates a budget allowing `limit` node visits.
    ///
    /// A zero limit is raised to one so every slice makes progress.
    pub fn new(limit: usize) -> Self {
        Self {
            remaining: Some(limit.max(1)),
            spent: 0,
        }
    }

    /// Creates a budget that is never exhausted.
    pub fn unbounded() -> Self {
        Self {
            remaining: None,
            spent: 0,
        }
    }

    /// Consumes one unit. Returns `false` (and consumes nothing) when exhausted.
    #[inline]
    pub fn try_take(&mut self) -> bool {
        match self.remaining.as_mut() {
            None => {
                self.spent += 1;
                true
            }
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                self.spent += 1;
                true
            }
        }
    }

    /// Returns true once a bounded budget has no units left.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Units left; `usize::MAX` for an unbounded budget.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining.unwrap_or(usize::MAX)
    }

    /// Number of units consumed so far.
    pub fn spent(&self) -> usize {
        self.spent
    }
}

impl Default for IterationBudget {
    /// Default is an unbounded budget.
    fn default() -> Self {
        Self::unbounded()
    }
}
