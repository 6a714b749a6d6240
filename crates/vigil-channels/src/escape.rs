/// Escape the MarkdownV2 reserved character class so a send never fails on
/// formatting. Matches the chat wire protocol's documented escape set.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*'
                | '['
                | ']'
                | '('
                | ')'
                | '~'
                | '`'
                | '>'
                | '#'
                | '+'
                | '-'
                | '='
                | '|'
                | '{'
                | '}'
                | '.'
                | '!'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split long text into chat-sized chunks without breaking inside a fenced
/// code block. `max_len` is the hard per-message character cap.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_fence = false;

    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }

        if current.chars().count() + line.chars().count() > max_len && !in_fence {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);

        if current.chars().count() > max_len && in_fence {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        let escaped = escape_markdown_v2("done! (see a.b_c)");
        assert_eq!(escaped, "done\\! \\(see a\\.b\\_c\\)");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_markdown_v2("hello world"), "hello world");
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_chunks("short", 100), vec!["short".to_string()]);
    }

    #[test]
    fn long_text_splits_into_multiple_chunks() {
        let text = "a".repeat(250);
        let chunks = split_chunks(&text, 100);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }
}
