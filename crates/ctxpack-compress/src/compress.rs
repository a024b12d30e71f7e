/// First `max_sentences` sentences of `text`, with an ellipsis when more
/// followed
pub fn summarize_sentences(text: &str, max_sentences: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let sentences: Vec<&str> = flat
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut summary = sentences
        .iter()
        .take(max_sentences)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if sentences.len() > max_sentences {
        summary.push_str(" ...");
    }
    summary
}

/// Content without blank lines or whole-line comments
pub fn strip_comments(content: &str) -> String {
    let mut in_block = false;
    content
        .lines()
        .filter(|line| {
            let t = line.trim();
            if in_block {
                if t.contains("*/") {
                    in_block = false;
                }
                return false;
            }
            if t.starts_with("/*") {
                in_block = !t.contains("*/");
                return false;
            }
            !(t.is_empty() || t.starts_with("//") || t.starts_with('#') && !t.starts_with("#["))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unindented, non-comment lines: the top-level keys and sections of a
/// config file
pub fn top_level_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with(char::is_whitespace)
                && !line.starts_with('#')
                && !line.starts_with("//")
                && !line.starts_with(';')
        })
        .collect::<Vec<_>>()
        .join("\n")
}
