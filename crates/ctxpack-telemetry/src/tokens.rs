//! Token estimation: the single size unit used for artifacts, compressed
//! forms, references and budgets.

const CODE_CHARS_PER_TOKEN: f64 = 2.5;
const MARKDOWN_CHARS_PER_TOKEN: f64 = 3.0;
const PROSE_CHARS_PER_TOKEN: f64 = 4.0;

/// Estimate the BPE token count of a piece of text.
///
/// The ratio of characters per token is blended from the share of code-like
/// punctuation and indentation, markdown markers and plain prose:
/// - code-heavy content: ~2.5 chars/token
/// - markdown: ~3.0 chars/token
/// - natural language: ~4.0 chars/token
///
/// Non-empty text always costs at least one token.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let total_chars = text.chars().count();
    let total_lines = text.lines().count().max(1);

    let mut code_chars = 0usize;
    let mut md_chars = 0usize;
    for c in text.chars() {
        if "{}[]();=<>|&!@$%^*~`\\".contains(c) {
            code_chars += 1;
        }
        if "#-*_>".contains(c) {
            md_chars += 1;
        }
    }

    let indent_lines = text
        .lines()
        .filter(|line| line.starts_with("    ") || line.starts_with('\t'))
        .count();
    let indent_ratio = indent_lines as f64 / total_lines as f64;

    let code_fraction =
        ((code_chars as f64 / total_chars as f64) * 10.0 + indent_ratio * 0.5).min(1.0);
    let md_fraction = ((md_chars as f64 / total_chars as f64) * 8.0).min(1.0 - code_fraction);
    let prose_fraction = 1.0 - code_fraction - md_fraction;

    let chars_per_token = code_fraction * CODE_CHARS_PER_TOKEN
        + md_fraction * MARKDOWN_CHARS_PER_TOKEN
        + prose_fraction * PROSE_CHARS_PER_TOKEN;

    ((total_chars as f64 / chars_per_token).ceil() as usize).max(1)
}

/// Cost of a path-only reference line (`- path`) in a rendered profile
pub fn estimate_reference_tokens(path: &str) -> usize {
    estimate_tokens(&format!("- {}", path))
}
