//! Context formatting for RAG prompts.

use super::ContextChunk;

/// Placed in the prompt when nothing was retrieved.
pub const NO_CONTEXT: &str = "(no relevant excerpts were found)";

/// Drop the lowest-scoring chunks until the total content fits `max_chars`.
///
/// Chunks arrive best first. The best chunk is always kept. Returns the kept
/// chunks and how many were dropped.
pub fn fit_to_budget(chunks: Vec<ContextChunk>, max_chars: usize) -> (Vec<ContextChunk>, usize) {
    let mut total = 0;
    let mut kept = Vec::with_capacity(chunks.len());
    let original = chunks.len();

    for chunk in chunks {
        let len = chunk.content.chars().count();
        if !kept.is_empty() && total + len > max_chars {
            break;
        }
        total += len;
        kept.push(chunk);
    }

    let dropped = original - kept.len();
    (kept, dropped)
}

/// Format context chunks for display in a prompt.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }

    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("---\n[{}] {}\n{}\n---", i + 1, chunk.source, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, score: f32) -> ContextChunk {
        ContextChunk {
            source: "notes.txt".to_string(),
            content: content.to_string(),
            score,
            order: 0,
        }
    }

    #[test]
    fn test_fit_to_budget_drops_lowest() {
        let chunks = vec![chunk("aaaa", 0.9), chunk("bbbb", 0.8), chunk("cccc", 0.7)];
        let (kept, dropped) = fit_to_budget(chunks, 9);

        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(kept[1].content, "bbbb");
    }

    #[test]
    fn test_fit_to_budget_keeps_best() {
        let (kept, dropped) = fit_to_budget(vec![chunk("too long", 0.5)], 3);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_prompt_format() {
        let text = format_context_for_prompt(&[chunk("alpha", 0.9), chunk("beta", 0.5)]);
        assert!(text.starts_with("---\n[1] notes.txt\nalpha"));
        assert!(text.contains("[2] notes.txt\nbeta"));

        assert_eq!(format_context_for_prompt(&[]), NO_CONTEXT);
    }
}
