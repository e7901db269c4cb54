//! Bounded context assembly from retrieval results.
//!
//! Chunk texts are concatenated in descending-similarity rank order,
//! separated by an explicit delimiter. Assembly stops before the cumulative
//! character count would exceed the budget; chunks after the first are never
//! split. The top-ranked chunk is always included — truncated at a character
//! boundary if the budget is smaller than the chunk — so a non-empty
//! retrieval never produces an empty context.

use crate::models::ScoredChunk;

/// Separator between chunks in the assembled context.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Concatenate retrieved chunks into a context of at most
/// `max_context_chars` characters, preserving rank order.
pub fn assemble(results: &[ScoredChunk], max_context_chars: usize) -> String {
    let delimiter_chars = CONTEXT_DELIMITER.chars().count();

    let mut context = String::new();
    let mut used = 0usize;

    for (rank, chunk) in results.iter().enumerate() {
        let chunk_chars = chunk.text.chars().count();

        if rank == 0 {
            // The top chunk always makes it in, truncated if it must be.
            if chunk_chars > max_context_chars {
                context.push_str(truncate_chars(&chunk.text, max_context_chars));
                used = max_context_chars;
            } else {
                context.push_str(&chunk.text);
                used = chunk_chars;
            }
            continue;
        }

        if used + delimiter_chars + chunk_chars > max_context_chars {
            break;
        }
        context.push_str(CONTEXT_DELIMITER);
        context.push_str(&chunk.text);
        used += delimiter_chars + chunk_chars;
    }

    context
}

/// Prefix of `s` holding at most `max` characters, cut on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_index, _)) => &s[..byte_index],
        None => s,
    }
}
