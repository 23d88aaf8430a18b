use mentor_core::types::{ChatMessage, Difficulty, RetrievedPassage};
use mentor_core::UserContext;

use crate::prompts;

/// How many prior turns are carried into a specialist call.
pub const HISTORY_TURNS: usize = 3;
/// Passages quoted in a specialist prompt or cited in a reply.
pub const MAX_EXCERPTS: usize = 3;

/// First `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn non_empty(list: Option<&Vec<String>>) -> Option<&[String]> {
    list.map(Vec::as_slice).filter(|l| !l.is_empty())
}

/// User turn for the AI routing pass.
pub fn routing_user_turn(message: &str, ctx: Option<&UserContext>) -> String {
    let mut out = format!("User message: {}", message);
    let Some(ctx) = ctx else {
        return out;
    };
    if let Some(score) = ctx.ready_score {
        out.push_str(&format!("\nUser's ReadyScore: {}", score));
    }
    if let Some(areas) = non_empty(ctx.weak_areas.as_ref()) {
        out.push_str(&format!("\nWeak areas: {}", areas.join(", ")));
    }
    if let Some(topics) = non_empty(ctx.recent_topics.as_ref()) {
        out.push_str(&format!("\nRecently studied: {}", topics.join(", ")));
    }
    out
}

/// Grounded user turn for the tax specialist.
pub fn specialist_user_turn(message: &str, passages: &[RetrievedPassage], ctx: Option<&UserContext>) -> String {
    let mut out = format!("User question: {}\n", message);

    if !passages.is_empty() {
        out.push_str("\n**Relevant IRS Publication Excerpts:**\n");
        for (i, p) in passages.iter().take(MAX_EXCERPTS).enumerate() {
            let page = p
                .page
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            out.push_str(&format!("\n[{}] {}, Page {}:\n{}\n", i + 1, p.source_id, page, p.text));
        }
    }

    if let Some(ctx) = ctx {
        if let Some(part) = ctx.exam_part {
            out.push_str(&format!("\nUser is studying for: EA Part {}", part));
        }
        if let Some(score) = ctx.ready_score {
            out.push_str(&format!("\nUser's ReadyScore: {}", score));
        }
        if ctx.request_focus {
            if let Some(areas) = non_empty(ctx.weak_areas.as_ref()) {
                out.push_str(&format!("\nFocus on weak areas: {}", areas.join(", ")));
            }
        }
    }

    out.push_str(prompts::SPECIALIST_INSTRUCTIONS);
    out
}

/// `[system, ..last three history turns.., user]`.
pub fn splice_history(system: &str, user: String, history: Option<&[ChatMessage]>) -> Vec<ChatMessage> {
    let recent = history
        .map(|h| &h[h.len().saturating_sub(HISTORY_TURNS)..])
        .unwrap_or(&[]);

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(recent.iter().cloned());
    messages.push(ChatMessage { role: "user".to_string(), content: user });
    messages
}

/// User turn for structured practice-question generation.
pub fn question_prompt(
    topic: &str,
    difficulty: Difficulty,
    references: &[RetrievedPassage],
    ctx: Option<&UserContext>,
) -> String {
    let mut out = format!(
        "Generate a realistic EA exam practice question on: {topic}\n\n\
Difficulty: {difficulty}\n\n\
Requirements:\n\
- Question should be scenario-based (not just definition)\n\
- Include realistic numbers and calculations\n\
- 4 answer choices (A, B, C, D)\n\
- One correct answer\n\
- Detailed explanation with IRS citation\n\
- Highlight a common misconception\n\n"
    );

    if !references.is_empty() {
        out.push_str("**Reference Material:**\n");
        for r in references {
            out.push_str(&format!("{}: {}...\n\n", r.source_id, truncate_chars(&r.text, 300)));
        }
    }

    if let Some(line) = ctx.and_then(personalization_line) {
        out.push_str(&line);
    }

    out.push_str(prompts::QUESTION_JSON_CONTRACT);
    out
}

fn personalization_line(ctx: &UserContext) -> Option<String> {
    let areas = non_empty(ctx.weak_areas.as_ref());
    match (ctx.ready_score, areas) {
        (None, None) => None,
        (Some(score), None) => Some(format!(
            "Student profile: ReadyScore {score}. Pitch the scenario at that level.\n"
        )),
        (None, Some(a)) => Some(format!(
            "Student profile: weak areas are {}. Exercise one of them if it fits the topic.\n",
            a.join(", ")
        )),
        (Some(score), Some(a)) => Some(format!(
            "Student profile: ReadyScore {score}; weak areas are {}. Pitch the scenario at that level.\n",
            a.join(", ")
        )),
    }
}
