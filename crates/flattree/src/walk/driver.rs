//! Budgeted walks that spread one logical walk over many calls.

use crate::adapter::TreeAdapter;
use crate::budget::IterationBudget;
use crate::error::Result;
use crate::types::WalkSummary;
use crate::walker::TreeWalker;

use super::machine::Progress;

impl<A: TreeAdapter> TreeWalker<A> {
    /// Walks at most `budget` nodes, resuming a suspended walk of the same
    /// root when there is one.
    ///
    /// Call repeatedly with the same arguments until the summary reports
    /// `finished`. Between calls the cache holds a consistent partial view.
    /// A call with a different root key or value, config or depth discards
    /// the suspended walk and starts over.
    pub fn walk_incremental(
        &mut self,
        value: A::Value,
        key: A::Key,
        config: &A::Config,
        expand_depth: usize,
        budget: usize,
    ) -> Result<WalkSummary> {
        let token = self.adapter.config_token(config);
        let mut machine = match self.pending.take() {
            Some(machine)
                if machine.continues(&self.adapter, &value, &key, token, expand_depth) =>
            {
                machine
            }
            Some(machine) => {
                log::debug!(
                    "Discarding walk {} after {} slices: arguments changed",
                    machine.stamp(),
                    machine.slices()
                );
                self.start_walk(value, key, token, expand_depth)
            }
            None => self.start_walk(value, key, token, expand_depth),
        };

        let mut budget = IterationBudget::new(budget);
        let progress = machine.run(&self.adapter, &mut self.cache, config, &mut budget)?;
        if progress == Progress::Suspended {
            self.pending = Some(machine);
        }
        self.summary(progress == Progress::Finished, budget.spent())
    }

    /// Drives [`Self::walk_incremental`] to completion, yielding to the
    /// runtime between slices of `options().default_budget` nodes.
    pub async fn drive(
        &mut self,
        value: A::Value,
        key: A::Key,
        config: &A::Config,
        expand_depth: usize,
    ) -> Result<WalkSummary> {
        let budget = self.options.default_budget;
        let mut visited = 0;
        loop {
            let summary =
                self.walk_incremental(value.clone(), key.clone(), config, expand_depth, budget)?;
            visited += summary.visited;
            if summary.finished {
                return Ok(WalkSummary { visited, ..summary });
            }
            tokio::task::yield_now().await;
        }
    }
}
