//! Task-complexity-aware model tier selection.
//!
//! Six-stage pipeline, first match wins except historical adjustment and
//! budget enforcement which can each override the prior stage's result:
//! explicit override, priority override, task-type override, weighted
//! complexity scoring, historical success-rate adjustment, budget
//! enforcement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::domain::models::Task;
use crate::domain::ports::ModelTier;

#[derive(Debug, Clone)]
pub struct ModelSelectorConfig {
    /// Priority value (lower schedules earlier) that always forces premium.
    pub premium_priority: i32,
    /// Keyword → tier overrides, checked against the combined task text.
    pub task_type_overrides: Vec<(String, ModelTier)>,
    pub cheap_threshold: f64,
    pub mid_threshold: f64,
    pub success_rate_cache_ttl: Duration,
    pub min_sample_size: u32,
}

impl Default for ModelSelectorConfig {
    fn default() -> Self {
        Self {
            premium_priority: 1,
            task_type_overrides: Vec::new(),
            cheap_threshold: 0.3,
            mid_threshold: 0.7,
            success_rate_cache_ttl: Duration::from_secs(300),
            min_sample_size: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub tier: ModelTier,
    pub reasoning: String,
    pub estimated_cost_cents: i64,
    /// Set when budget enforcement forced a cheaper tier than the analysis
    /// recommended — a normal outcome, never an error.
    pub downgraded_for_budget: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct OutcomeStats {
    successes: u32,
    samples: u32,
}

impl OutcomeStats {
    fn rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.successes as f64 / self.samples as f64
        }
    }
}

struct CacheEntry {
    stats: HashMap<(String, ModelTier), OutcomeStats>,
    computed_at: Instant,
}

/// Keyword weights for the four complexity dimensions (spec §4.4).
const REASONING_KEYWORDS: &[&str] = &[
    "architecture", "algorithm", "optimize", "workflow", "multi-step", "distributed",
];
const COMPLEXITY_UP_KEYWORDS: &[&str] = &["create", "module", "api", "schema"];
const COMPLEXITY_DOWN_KEYWORDS: &[&str] = &["simple", "trivial", "minor"];
const DOMAIN_SPECIALIST_KEYWORDS: &[&str] = &["ml", "crypto", "compiler", "graphics"];
const CONTEXT_KEYWORDS: &[&str] = &["refactor", "integrate", "legacy", "migrate"];

fn keyword_score(text: &str, keywords: &[&str]) -> f64 {
    let hits = keywords.iter().filter(|k| text.contains(*k)).count();
    (hits as f64 / 2.0).min(1.0)
}

fn score_complexity(text: &str) -> f64 {
    let reasoning = keyword_score(text, REASONING_KEYWORDS);
    let mut code = keyword_score(text, COMPLEXITY_UP_KEYWORDS);
    code -= keyword_score(text, COMPLEXITY_DOWN_KEYWORDS);
    let code = code.clamp(0.0, 1.0);
    let domain = keyword_score(text, DOMAIN_SPECIALIST_KEYWORDS);
    let context = keyword_score(text, CONTEXT_KEYWORDS);

    (0.35 * reasoning + 0.30 * code + 0.20 * domain + 0.15 * context).clamp(0.0, 1.0)
}

/// Coarse task-type label used as the historical-adjustment cache key.
fn task_type_label(text: &str) -> String {
    for (kw, label) in [
        ("api", "api"),
        ("database", "database"),
        ("ui", "frontend"),
        ("frontend", "frontend"),
        ("test", "testing"),
        ("security", "security"),
        ("deploy", "deployment"),
    ] {
        if text.contains(kw) {
            return label.to_string();
        }
    }
    "general".to_string()
}

pub struct ModelSelector {
    config: ModelSelectorConfig,
    cache: Arc<RwLock<Option<CacheEntry>>>,
}

impl ModelSelector {
    pub fn new(config: ModelSelectorConfig) -> Self {
        Self { config, cache: Arc::new(RwLock::new(None)) }
    }

    pub fn with_defaults() -> Self {
        Self::new(ModelSelectorConfig::default())
    }

    pub async fn recommend(
        &self,
        task: &Task,
        remaining_budget_cents: i64,
        total_budget_cents: i64,
    ) -> ModelSelection {
        let mut reasons = Vec::new();

        let mut tier = if let Some(over) = task.model_override() {
            if let Some(parsed) = parse_tier(&over) {
                reasons.push(format!("explicit override to {}", parsed.as_str()));
                parsed
            } else {
                self.analyze(task, &mut reasons).await
            }
        } else if task.priority == self.config.premium_priority {
            reasons.push(format!("priority {} forces premium", task.priority));
            ModelTier::Premium
        } else if let Some(tier) = self.task_type_override(task, &mut reasons) {
            tier
        } else {
            self.analyze(task, &mut reasons).await
        };

        tier = self.apply_budget_enforcement(tier, remaining_budget_cents, total_budget_cents, &mut reasons);

        let downgraded_for_budget = reasons.iter().any(|r| r.contains("budget"));
        let estimated_cost_cents = estimate_cost_cents(tier);

        ModelSelection {
            tier,
            reasoning: reasons.join("; "),
            estimated_cost_cents,
            downgraded_for_budget,
        }
    }

    fn task_type_override(&self, task: &Task, reasons: &mut Vec<String>) -> Option<ModelTier> {
        let text = task.combined_text().to_lowercase();
        for (keyword, tier) in &self.config.task_type_overrides {
            if text.contains(keyword.as_str()) {
                reasons.push(format!("task-type override '{keyword}'"));
                return Some(*tier);
            }
        }
        None
    }

    async fn analyze(&self, task: &Task, reasons: &mut Vec<String>) -> ModelTier {
        let text = task.combined_text().to_lowercase();
        let score = score_complexity(&text);
        let base = if score < self.config.cheap_threshold {
            ModelTier::Cheap
        } else if score <= self.config.mid_threshold {
            ModelTier::Mid
        } else {
            ModelTier::Premium
        };
        reasons.push(format!("complexity score {score:.2} -> {}", base.as_str()));

        let adjusted = self.historical_adjustment(&task_type_label(&text), base, reasons).await;
        adjusted
    }

    async fn historical_adjustment(&self, task_type: &str, base: ModelTier, reasons: &mut Vec<String>) -> ModelTier {
        let guard = self.cache.read().await;
        let Some(entry) = guard.as_ref() else { return base };
        if entry.computed_at.elapsed() > self.config.success_rate_cache_ttl {
            return base;
        }

        let base_stats = entry.stats.get(&(task_type.to_string(), base)).copied().unwrap_or_default();
        if base_stats.samples < self.config.min_sample_size {
            return base;
        }

        if base_stats.rate() < 0.7 {
            if let Some(up) = next_tier_up(base) {
                let up_stats = entry.stats.get(&(task_type.to_string(), up)).copied().unwrap_or_default();
                if up_stats.samples >= self.config.min_sample_size && up_stats.rate() > base_stats.rate() {
                    reasons.push(format!("historical upgrade to {} (low success rate)", up.as_str()));
                    return up;
                }
            }
        } else if base_stats.rate() >= 0.9 {
            if let Some(down) = next_tier_down(base) {
                let down_stats = entry.stats.get(&(task_type.to_string(), down)).copied().unwrap_or_default();
                if down_stats.samples >= self.config.min_sample_size && down_stats.rate() >= 0.85 {
                    reasons.push(format!("historical downgrade to {} (cost saving)", down.as_str()));
                    return down;
                }
            }
        }
        base
    }

    fn apply_budget_enforcement(
        &self,
        tier: ModelTier,
        remaining_cents: i64,
        total_cents: i64,
        reasons: &mut Vec<String>,
    ) -> ModelTier {
        if total_cents <= 0 {
            return tier;
        }
        let spent_fraction = 1.0 - (remaining_cents.max(0) as f64 / total_cents as f64);

        if remaining_cents <= 0 {
            reasons.push("budget exhausted, forcing cheap".to_string());
            return ModelTier::Cheap;
        }
        if spent_fraction >= 0.95 {
            reasons.push("budget nearly exhausted, forcing cheap".to_string());
            return ModelTier::Cheap;
        }
        if spent_fraction >= 0.80 && tier == ModelTier::Premium {
            reasons.push("budget pressure, downgrading premium to mid".to_string());
            return ModelTier::Mid;
        }
        tier
    }

    /// Invalidate the success-rate cache and record an outcome. Actual cost
    /// rows are written by the caller to the cost ledger, not here.
    pub async fn record_outcome(&self, task_type: &str, tier: ModelTier, success: bool) {
        let mut guard = self.cache.write().await;
        let entry = guard.get_or_insert_with(|| CacheEntry {
            stats: HashMap::new(),
            computed_at: Instant::now(),
        });
        let stats = entry.stats.entry((task_type.to_string(), tier)).or_default();
        stats.samples += 1;
        if success {
            stats.successes += 1;
        }
        entry.computed_at = Instant::now();
    }
}

fn next_tier_up(tier: ModelTier) -> Option<ModelTier> {
    match tier {
        ModelTier::Cheap => Some(ModelTier::Mid),
        ModelTier::Mid => Some(ModelTier::Premium),
        ModelTier::Premium => None,
    }
}

fn next_tier_down(tier: ModelTier) -> Option<ModelTier> {
    match tier {
        ModelTier::Premium => Some(ModelTier::Mid),
        ModelTier::Mid => Some(ModelTier::Cheap),
        ModelTier::Cheap => None,
    }
}

fn parse_tier(s: &str) -> Option<ModelTier> {
    match s {
        "cheap" => Some(ModelTier::Cheap),
        "mid" => Some(ModelTier::Mid),
        "premium" => Some(ModelTier::Premium),
        _ => None,
    }
}

/// Default-average token counts per tier, refined as historical data
/// accumulates (spec §4.4); placeholder cents-per-task estimate.
fn estimate_cost_cents(tier: ModelTier) -> i64 {
    match tier {
        ModelTier::Cheap => 2,
        ModelTier::Mid => 15,
        ModelTier::Premium => 80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn simple_task_selects_cheap() {
        let selector = ModelSelector::with_defaults();
        let task = Task::new(Uuid::new_v4(), "fix typo", "change a comment", 5);
        let sel = selector.recommend(&task, 10_000, 10_000).await;
        assert_eq!(sel.tier, ModelTier::Cheap);
    }

    #[tokio::test]
    async fn priority_one_forces_premium() {
        let selector = ModelSelector::with_defaults();
        let task = Task::new(Uuid::new_v4(), "fix typo", "change a comment", 1);
        let sel = selector.recommend(&task, 10_000, 10_000).await;
        assert_eq!(sel.tier, ModelTier::Premium);
    }

    #[tokio::test]
    async fn zero_remaining_budget_forces_cheap() {
        let selector = ModelSelector::with_defaults();
        let task = Task::new(Uuid::new_v4(), "design distributed architecture", "optimize algorithm across the system", 5);
        let sel = selector.recommend(&task, 0, 10_000).await;
        assert_eq!(sel.tier, ModelTier::Cheap);
        assert!(sel.downgraded_for_budget);
    }

    #[tokio::test]
    async fn explicit_override_wins() {
        let selector = ModelSelector::with_defaults();
        let mut task = Task::new(Uuid::new_v4(), "fix typo", "change a comment", 5);
        task.metadata = serde_json::json!({ "model_override": "premium" });
        let sel = selector.recommend(&task, 10_000, 10_000).await;
        assert_eq!(sel.tier, ModelTier::Premium);
    }
}
