//! Execution mode selection: a single pure function over a plan, persisted
//! explicitly on the project rather than left implicit in plan shape.

use crate::domain::models::{ExecutionMode, ExecutionPlan};

/// A plan is parallel-worthwhile if it has any batch with `can_parallel`
/// and at least two tasks; otherwise sequential mode is chosen.
pub fn select_mode(plan: &ExecutionPlan) -> ExecutionMode {
    let worthwhile = plan
        .batches
        .iter()
        .any(|b| b.can_parallel && b.task_ids.len() >= 2);

    if worthwhile {
        ExecutionMode::Parallel
    } else {
        ExecutionMode::Sequential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Batch;
    use std::collections::HashMap;
    use uuid::Uuid;

    #[test]
    fn single_task_batches_select_sequential() {
        let plan = ExecutionPlan::new(
            Uuid::new_v4(),
            vec![Batch::new(0, vec![Uuid::new_v4()], false, vec![])],
            HashMap::new(),
            vec![],
        );
        assert_eq!(select_mode(&plan), ExecutionMode::Sequential);
    }

    #[test]
    fn parallel_batch_selects_parallel_mode() {
        let plan = ExecutionPlan::new(
            Uuid::new_v4(),
            vec![Batch::new(0, vec![Uuid::new_v4(), Uuid::new_v4()], true, vec![])],
            HashMap::new(),
            vec![],
        );
        assert_eq!(select_mode(&plan), ExecutionMode::Parallel);
    }
}
