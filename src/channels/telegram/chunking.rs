//! Text chunking for Telegram's message size limit
//!
//! Telegram caps messages at 4096 characters. Long generator replies are
//! split into chunks on paragraph boundaries where possible, then single
//! newlines, then hard char-boundary cuts as a last resort.

/// Telegram's hard cap per message, in bytes
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Split `text` into non-empty chunks of at most `limit` bytes
///
/// When `limit` is 0, [`TELEGRAM_MESSAGE_LIMIT`] is used.
#[must_use]
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let limit = if limit == 0 { TELEGRAM_MESSAGE_LIMIT } else { limit };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.len() <= limit {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in trimmed.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        // "\n\n" separator when appending to a non-empty chunk
        let needed = if current.is_empty() {
            paragraph.len()
        } else {
            current.len() + 2 + paragraph.len()
        };

        if needed <= limit {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.len() <= limit {
            current.push_str(paragraph);
        } else {
            chunks.extend(split_oversized(paragraph, limit));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Hard-split a segment that exceeds the limit on its own
///
/// Prefers the last newline before the limit; otherwise cuts at the nearest
/// char boundary at or below the limit.
fn split_oversized(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > limit {
        let window_end = floor_char_boundary(remaining, limit);
        let mut split_at = remaining[..window_end]
            .rfind('\n')
            .filter(|&pos| pos > 0)
            .map_or(window_end, |pos| pos + 1);

        // A single char wider than the limit: emit it whole rather than loop
        if split_at == 0 {
            split_at = remaining
                .chars()
                .next()
                .map_or(remaining.len(), char::len_utf8);
        }

        let chunk = remaining[..split_at].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = remaining[split_at..].trim_start();
    }

    let tail = remaining.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    chunks
}

/// Largest char boundary at or below `index`
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut boundary = index;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}
