use mentor_core::types::{AgentIdentity, RoutingDecision, RoutingMethod};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::metrics::round2;

/// Curated patterns for one specialist. Each pattern that matches the
/// lowercased message adds one point.
struct AgentRule {
    agent: AgentIdentity,
    patterns: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %p, error = %e, "Dropping invalid routing pattern");
                None
            }
        })
        .collect()
}

// Order matters: on equal scores the earlier rule wins.
static RULES: Lazy<Vec<AgentRule>> = Lazy::new(|| {
    vec![
        AgentRule {
            agent: AgentIdentity::TaxSpecialist,
            patterns: compile(&[
                r"\b(explain|what is|define|how to calculate)\b",
                r"\b(irc|regulation|publication|pub \d+)\b",
                r"\b(deduction|credit|income|basis|depreciation)\b",
                r"\b(partnership|corporation|s-corp|c-corp)\b",
                r"\b(form \d+|schedule [a-z])\b",
            ]),
        },
        AgentRule {
            agent: AgentIdentity::SocraticCoach,
            patterns: compile(&[
                r"\b(study|learn|weak|improve|help me)\b",
                r"\b(mission|practice|quiz|test me)\b",
                r"\b(struggling|confused|don't understand)\b",
                r"\b(strategy|approach|method)\b",
                r"\b(motivate|encourage|confidence)\b",
            ]),
        },
        AgentRule {
            agent: AgentIdentity::DataAnalyst,
            patterns: compile(&[
                r"\b(score|progress|performance|analytics)\b",
                r"\b(when will i|how long|predict|estimate)\b",
                r"\b(weak area|topic|proficiency)\b",
                r"\b(trend|improvement|accuracy)\b",
                r"\b(statistics|data|analysis)\b",
            ]),
        },
    ]
});

static MULTI_INTENT: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(explain|teach).+(study plan|practice|quiz)",
        r"(score|performance).+(weak|improve|help)",
        r"(learn|understand).+(when will i|how long)",
    ])
});

/// Deterministic first routing pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordRouter;

impl KeywordRouter {
    pub fn new() -> Self {
        Self
    }

    /// Pattern hits per agent, in routing priority order.
    pub fn scores(&self, message: &str) -> Vec<(AgentIdentity, usize)> {
        let lower = message.to_lowercase();
        RULES
            .iter()
            .map(|rule| {
                let hits = rule.patterns.iter().filter(|re| re.is_match(&lower)).count();
                (rule.agent, hits)
            })
            .collect()
    }

    pub fn route(&self, message: &str) -> RoutingDecision {
        let scores = self.scores(message);
        let total: usize = scores.iter().map(|(_, s)| s).sum();

        // First strictly greater score wins, so ties keep the earlier agent.
        let best = scores
            .iter()
            .copied()
            .fold(None::<(AgentIdentity, usize)>, |acc, cur| match acc {
                Some(a) if a.1 >= cur.1 => Some(a),
                _ => Some(cur),
            });

        match best {
            Some((agent, top)) if top > 0 => RoutingDecision {
                agent,
                confidence: round2(top as f64 / total as f64),
                reasoning: format!("Keyword analysis matched {} patterns for {}", top, agent),
                should_use_rag: agent == AgentIdentity::TaxSpecialist,
                routing_method: RoutingMethod::Keyword,
                latency_ms: None,
            },
            _ => RoutingDecision {
                agent: AgentIdentity::TaxSpecialist,
                confidence: 0.5,
                reasoning: "No clear keywords detected, defaulting to tax specialist".to_string(),
                should_use_rag: true,
                routing_method: RoutingMethod::KeywordDefault,
                latency_ms: None,
            },
        }
    }

    /// True when the message reads as more than one request at once,
    /// e.g. an explanation plus a study plan.
    pub fn is_multi_intent(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        MULTI_INTENT.iter().any(|re| re.is_match(&lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert!(RULES.iter().all(|r| r.patterns.len() == 5));
        assert_eq!(MULTI_INTENT.len(), 3);
    }

    #[test]
    fn test_tax_question_routes_with_full_confidence() {
        let d = KeywordRouter::new().route("Explain partnership basis calculation");
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
        assert_eq!(d.confidence, 1.0);
        assert_eq!(d.routing_method, RoutingMethod::Keyword);
        assert!(d.should_use_rag);
        assert_eq!(d.reasoning, "Keyword analysis matched 3 patterns for TAX_SPECIALIST");
    }

    #[test]
    fn test_struggling_student_routes_to_coach() {
        let d = KeywordRouter::new().route("I'm struggling, help me study");
        assert_eq!(d.agent, AgentIdentity::SocraticCoach);
        assert_eq!(d.confidence, 1.0);
        assert!(!d.should_use_rag);
    }

    #[test]
    fn test_no_match_defaults_to_tax_specialist() {
        let d = KeywordRouter::new().route("hello there");
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
        assert_eq!(d.confidence, 0.5);
        assert_eq!(d.routing_method, RoutingMethod::KeywordDefault);
        assert!(d.should_use_rag);
    }

    #[test]
    fn test_tie_goes_to_earlier_agent() {
        // "explain" hits tax, "quiz" hits coach: one point each.
        let router = KeywordRouter::new();
        let scores = router.scores("explain this quiz");
        assert_eq!(scores[0], (AgentIdentity::TaxSpecialist, 1));
        assert_eq!(scores[1], (AgentIdentity::SocraticCoach, 1));

        let d = router.route("explain this quiz");
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
        assert_eq!(d.confidence, 0.5);
    }

    #[test]
    fn test_coach_tie_beats_analyst() {
        // "practice" -> coach, "score" -> analyst.
        let d = KeywordRouter::new().route("practice score");
        assert_eq!(d.agent, AgentIdentity::SocraticCoach);
    }

    #[test]
    fn test_mixed_message_confidence() {
        // tax: explain, depreciation; analyst: progress
        let d = KeywordRouter::new().route("Explain depreciation and my progress");
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
        assert_eq!(d.confidence, 0.67);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let d = KeywordRouter::new().route("WHAT IS SCHEDULE C");
        assert_eq!(d.agent, AgentIdentity::TaxSpecialist);
    }

    #[test]
    fn test_multi_intent_detection() {
        let router = KeywordRouter::new();
        assert!(router.is_multi_intent("Explain partnerships and give me a practice set"));
        assert!(router.is_multi_intent("My score is low, how do I improve?"));
        assert!(router.is_multi_intent("I want to learn this, how long will it take"));
        assert!(!router.is_multi_intent("What is a Section 179 deduction?"));
    }
}
