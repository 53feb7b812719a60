//! Cost ledger: per-model-tier pricing and the append-only cost journal.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentCost;
use crate::domain::ports::{CostRepository, ModelTier};

/// Cost per million tokens, in cents, for a tier.
#[derive(Debug, Clone, Copy)]
pub struct TierPricing {
    pub input_cents_per_million: i64,
    pub output_cents_per_million: i64,
}

fn pricing_for(tier: ModelTier) -> TierPricing {
    match tier {
        ModelTier::Cheap => TierPricing { input_cents_per_million: 80, output_cents_per_million: 400 },
        ModelTier::Mid => TierPricing { input_cents_per_million: 300, output_cents_per_million: 1_500 },
        ModelTier::Premium => TierPricing { input_cents_per_million: 1_500, output_cents_per_million: 7_500 },
    }
}

pub fn estimate_cost_cents(tier: ModelTier, input_tokens: i64, output_tokens: i64) -> i64 {
    let pricing = pricing_for(tier);
    (input_tokens * pricing.input_cents_per_million + output_tokens * pricing.output_cents_per_million)
        / 1_000_000
}

pub struct CostLedger {
    repo: Arc<dyn CostRepository>,
}

impl CostLedger {
    pub fn new(repo: Arc<dyn CostRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(
        &self,
        project_id: Uuid,
        session_id: Option<Uuid>,
        task_id: Option<Uuid>,
        model: &str,
        input_tokens: i64,
        output_tokens: i64,
        cost_cents: i64,
    ) -> DomainResult<()> {
        let cost = AgentCost::new(project_id, session_id, task_id, model, input_tokens, output_tokens, cost_cents);
        self.repo.record(&cost).await
    }

    pub async fn total_for_project(&self, project_id: Uuid) -> DomainResult<i64> {
        self.repo.total_cost_cents(project_id).await
    }
}
