use chrono::{DateTime, Utc};
use mentor_core::types::UsageMetrics;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Reported view of one agent's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub agent: String,
    pub total_calls: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_cost_per_call: f64,
}

impl MetricsSnapshot {
    pub fn new(agent: &str, usage: &UsageMetrics) -> Self {
        Self {
            agent: agent.to_string(),
            total_calls: usage.total_calls,
            total_tokens: usage.total_tokens,
            total_cost: round4(usage.total_cost),
            avg_cost_per_call: round4(usage.avg_cost_per_call()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsTotals {
    pub total_calls: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub agents: BTreeMap<String, MetricsSnapshot>,
    pub totals: MetricsTotals,
    pub timestamp: DateTime<Utc>,
}

impl MetricsReport {
    pub fn from_usage(entries: &[(&str, UsageMetrics)]) -> Self {
        let mut agents = BTreeMap::new();
        let mut raw_cost = 0.0;
        let mut totals = MetricsTotals::default();

        for (name, usage) in entries {
            totals.total_calls += usage.total_calls;
            totals.total_tokens += usage.total_tokens;
            raw_cost += usage.total_cost;
            agents.insert(name.to_string(), MetricsSnapshot::new(name, usage));
        }
        totals.total_cost = round4(raw_cost);

        Self {
            agents,
            totals,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(round4(0.012345), 0.0123);
        assert_eq!(round2(0.916), 0.92);
    }

    #[test]
    fn test_report_totals_sum_agents() {
        let orchestrator = UsageMetrics { total_calls: 2, total_tokens: 300, total_cost: 0.0004 };
        let specialist = UsageMetrics { total_calls: 1, total_tokens: 1500, total_cost: 0.03 };
        let report = MetricsReport::from_usage(&[("orchestrator", orchestrator), ("tax_specialist", specialist)]);

        assert_eq!(report.totals.total_calls, 3);
        assert_eq!(report.totals.total_tokens, 1800);
        assert_eq!(report.totals.total_cost, 0.0304);
        assert_eq!(report.agents["tax_specialist"].avg_cost_per_call, 0.03);
        assert_eq!(report.agents["orchestrator"].avg_cost_per_call, 0.0002);
    }

    #[test]
    fn test_snapshot_for_idle_agent() {
        let snap = MetricsSnapshot::new("tax_specialist", &UsageMetrics::default());
        assert_eq!(snap.total_calls, 0);
        assert_eq!(snap.avg_cost_per_call, 0.0);
    }
}
