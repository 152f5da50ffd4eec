//! Style prompt assembly.
//!
//! Turns retrieved chunks plus a user request into the instruction prompt
//! sent to the language model, and pulls inline style directives
//! (`[make this shorter]`, `make this more formal`) out of the query.

use std::sync::OnceLock;

use regex::Regex;

use crate::llm::{ChatMessage, ChatRequest};
use crate::store::ChunkSearchResult;

const SYSTEM_PROMPT: &str = "You are a writing assistant that mimics the style and voice of the user \
based on their previous writings. Your goal is to generate new content that sounds authentically \
like the user wrote it.";

/// Format retrieved chunks as numbered style examples.
pub fn format_context(results: &[ChunkSearchResult]) -> String {
    let mut context = String::new();

    for (i, result) in results.iter().enumerate() {
        context.push_str(&format!(
            "--- Example {} (Content type: {}) ---\n",
            i + 1,
            result.chunk.content_type
        ));
        context.push_str(&format!("Title: {}\n\n", result.chunk.title));
        context.push_str(&result.chunk.content);
        context.push_str("\n\n");
    }

    context.trim_end().to_string()
}

/// Build the full chat request for a generation.
pub fn build_request(
    query: &str,
    results: &[ChunkSearchResult],
    style_guidance: Option<&str>,
) -> ChatRequest {
    let context = format_context(results);
    let guidance_line = style_guidance
        .map(|g| format!("\nStyle guidance: {}\n", g))
        .unwrap_or_default();

    let user_prompt = format!(
        "Here are relevant examples of the user's writing style:\n\n{}\n\n\
Based on these examples, please write a response to the following request in the user's \
authentic voice:\n\n{}\n{}\n\
Remember to maintain the user's unique voice, vocabulary choices, sentence structures, and \
thematic preferences.",
        context, query, guidance_line
    );

    ChatRequest::new(vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ])
}

fn bracket_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[make this (.*?)\]").expect("valid pattern"))
}

fn paren_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(make this (.*?)\)").expect("valid pattern"))
}

fn inline_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)make this (more|less) (\w+)").expect("valid pattern"))
}

/// Detect an inline style directive in the query.
///
/// Returns the guidance text, e.g. `[make this punchier]` → "punchier" and
/// `make this more formal` → "more formal".
pub fn extract_style_guidance(query: &str) -> Option<String> {
    for pattern in [bracket_pattern(), paren_pattern()] {
        if let Some(caps) = pattern.captures(query) {
            let guidance = caps[1].trim().to_string();
            if !guidance.is_empty() {
                return Some(guidance);
            }
        }
    }

    inline_pattern()
        .captures(query)
        .map(|caps| format!("{} {}", &caps[1].to_lowercase(), &caps[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredChunk;

    fn result(title: &str, content_type: &str, content: &str) -> ChunkSearchResult {
        ChunkSearchResult {
            chunk: StoredChunk {
                chunk_id: "c".to_string(),
                content: content.to_string(),
                title: title.to_string(),
                content_type: content_type.to_string(),
                tags: vec![],
                source_file: "f.txt".to_string(),
                chunk_index: 0,
                word_count: 0,
            },
            score: 0.9,
        }
    }

    #[test]
    fn context_numbers_examples_with_type_and_title() {
        let results = vec![
            result("On Writing", "essay", "Essay body."),
            result("Weekly Notes", "newsletter", "Newsletter body."),
        ];

        let context = format_context(&results);

        assert!(context.contains("--- Example 1 (Content type: essay) ---"));
        assert!(context.contains("Title: On Writing"));
        assert!(context.contains("--- Example 2 (Content type: newsletter) ---"));
        assert!(context.contains("Newsletter body."));
    }

    #[test]
    fn request_contains_system_and_guidance() {
        let results = vec![result("On Writing", "essay", "Essay body.")];

        let request = build_request("Write an intro", &results, Some("more playful"));

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("writing assistant"));
        assert!(request.messages[1].content.contains("Write an intro"));
        assert!(request.messages[1]
            .content
            .contains("Style guidance: more playful"));
    }

    #[test]
    fn request_without_guidance_has_no_guidance_line() {
        let request = build_request("Write an intro", &[], None);
        assert!(!request.messages[1].content.contains("Style guidance"));
    }

    #[test]
    fn extracts_bracketed_directive() {
        assert_eq!(
            extract_style_guidance("Write an intro [make this punchier]"),
            Some("punchier".to_string())
        );
        assert_eq!(
            extract_style_guidance("Write an intro (Make this shorter)"),
            Some("shorter".to_string())
        );
    }

    #[test]
    fn extracts_more_less_directive() {
        assert_eq!(
            extract_style_guidance("Please make this more formal"),
            Some("more formal".to_string())
        );
        assert_eq!(
            extract_style_guidance("make this LESS verbose"),
            Some("less verbose".to_string())
        );
    }

    #[test]
    fn mismatched_delimiters_are_not_a_directive() {
        assert_eq!(extract_style_guidance("Write this (make this shorter]"), None);
        assert_eq!(extract_style_guidance("Write this [make this punchier)"), None);
    }

    #[test]
    fn no_directive_yields_none() {
        assert_eq!(extract_style_guidance("Write an essay about rivers"), None);
    }
}
