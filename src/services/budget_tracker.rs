//! Budget-pressure tracking: converts a project's spend-so-far against its
//! configured cap into a pressure level, and gates how much concurrency the
//! Parallel Executor is allowed under that pressure.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::CostRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BudgetPressure {
    Normal,
    Caution,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct BudgetTrackerConfig {
    pub total_budget_cents: i64,
    pub caution_threshold_pct: f64,
    pub warning_threshold_pct: f64,
    pub critical_threshold_pct: f64,
    pub max_concurrency_normal: usize,
    pub max_concurrency_caution: usize,
    pub max_concurrency_warning: usize,
    pub max_concurrency_critical: usize,
}

impl Default for BudgetTrackerConfig {
    fn default() -> Self {
        Self {
            total_budget_cents: 0,
            caution_threshold_pct: 0.60,
            warning_threshold_pct: 0.80,
            critical_threshold_pct: 0.95,
            max_concurrency_normal: 5,
            max_concurrency_caution: 4,
            max_concurrency_warning: 2,
            max_concurrency_critical: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetSnapshot {
    pub spent_cents: i64,
    pub remaining_cents: i64,
    pub pressure: BudgetPressure,
}

pub struct BudgetTracker {
    config: BudgetTrackerConfig,
    costs: Arc<dyn CostRepository>,
    last_warned_threshold: Arc<RwLock<f64>>,
}

impl BudgetTracker {
    pub fn new(config: BudgetTrackerConfig, costs: Arc<dyn CostRepository>) -> Self {
        Self { config, costs, last_warned_threshold: Arc::new(RwLock::new(0.0)) }
    }

    pub async fn snapshot(&self, project_id: Uuid) -> DomainResult<BudgetSnapshot> {
        let spent = self.costs.total_cost_cents(project_id).await?;
        let remaining = (self.config.total_budget_cents - spent).max(0);

        let pressure = if self.config.total_budget_cents <= 0 {
            BudgetPressure::Normal
        } else {
            let spent_pct = spent as f64 / self.config.total_budget_cents as f64;
            if spent_pct >= self.config.critical_threshold_pct {
                BudgetPressure::Critical
            } else if spent_pct >= self.config.warning_threshold_pct {
                BudgetPressure::Warning
            } else if spent_pct >= self.config.caution_threshold_pct {
                BudgetPressure::Caution
            } else {
                BudgetPressure::Normal
            }
        };

        self.warn_on_threshold_crossing(spent, project_id).await;

        Ok(BudgetSnapshot { spent_cents: spent, remaining_cents: remaining, pressure })
    }

    async fn warn_on_threshold_crossing(&self, spent: i64, project_id: Uuid) {
        if self.config.total_budget_cents <= 0 {
            return;
        }
        let spent_pct = spent as f64 / self.config.total_budget_cents as f64;
        let mut last = self.last_warned_threshold.write().await;
        for threshold in [0.95, 0.80] {
            if spent_pct >= threshold && *last < threshold {
                tracing::warn!(project_id = %project_id, spent_pct, "budget threshold crossed");
                *last = threshold;
                return;
            }
        }
    }

    pub fn effective_max_concurrency(&self, pressure: BudgetPressure, base_max: usize) -> usize {
        let cap = match pressure {
            BudgetPressure::Normal => self.config.max_concurrency_normal,
            BudgetPressure::Caution => self.config.max_concurrency_caution,
            BudgetPressure::Warning => self.config.max_concurrency_warning,
            BudgetPressure::Critical => self.config.max_concurrency_critical,
        };
        base_max.min(cap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentCost;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeCosts(Mutex<i64>);

    #[async_trait]
    impl CostRepository for FakeCosts {
        async fn record(&self, _cost: &AgentCost) -> DomainResult<()> {
            Ok(())
        }
        async fn total_cost_cents(&self, _project_id: Uuid) -> DomainResult<i64> {
            Ok(*self.0.lock().unwrap())
        }
        async fn list_for_project(&self, _project_id: Uuid) -> DomainResult<Vec<AgentCost>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn critical_pressure_caps_concurrency_to_one() {
        let costs = Arc::new(FakeCosts(Mutex::new(9_600)));
        let tracker = BudgetTracker::new(
            BudgetTrackerConfig { total_budget_cents: 10_000, ..Default::default() },
            costs,
        );
        let snapshot = tracker.snapshot(Uuid::new_v4()).await.unwrap();
        assert_eq!(snapshot.pressure, BudgetPressure::Critical);
        assert_eq!(tracker.effective_max_concurrency(snapshot.pressure, 5), 1);
    }

    #[tokio::test]
    async fn normal_pressure_uses_base_max() {
        let costs = Arc::new(FakeCosts(Mutex::new(0)));
        let tracker = BudgetTracker::new(
            BudgetTrackerConfig { total_budget_cents: 10_000, ..Default::default() },
            costs,
        );
        let snapshot = tracker.snapshot(Uuid::new_v4()).await.unwrap();
        assert_eq!(snapshot.pressure, BudgetPressure::Normal);
        assert_eq!(tracker.effective_max_concurrency(snapshot.pressure, 3), 3);
    }
}
