//! Term extraction shared by classification, scoring and learning

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static IDENT_RE: OnceLock<Regex> = OnceLock::new();
static MENTION_RE: OnceLock<Regex> = OnceLock::new();

static STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "can", "to", "of",
    "in", "for", "on", "with", "at", "by", "from", "as", "into", "through", "then", "here",
    "there", "when", "where", "why", "how", "all", "each", "every", "both", "few", "more", "most",
    "some", "such", "not", "only", "just", "but", "and", "or", "if", "about", "what", "which",
    "who", "this", "that", "these", "those", "it", "its", "my", "me", "we", "our", "you", "your",
    "up", "down", "no", "so", "very", "too", "than", "please", "help", "want", "like", "think",
    "know", "see", "look", "make", "take", "get", "let", "say", "tell", "give", "use", "find",
    "show", "try", "ask", "work", "call", "put", "keep", "also", "file", "code", "change",
    "update", "fix", "check", "run", "new", "now", "still", "already", "done", "good", "right",
    "sure", "yes", "okay", "thanks",
];

const MIN_TERM_LEN: usize = 3;

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Significant words of a task description, lowercased and deduplicated in
/// order of first appearance
pub fn task_terms(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() >= MIN_TERM_LEN && !is_stop_word(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

/// Identifier terms of a body of text.
///
/// Each identifier contributes its lowercased whole plus its snake_case and
/// camelCase parts, so `parseConfig` matches a task mentioning "config".
pub fn content_terms(content: &str) -> BTreeSet<String> {
    let re = IDENT_RE.get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z0-9_]*").unwrap());
    let mut terms = BTreeSet::new();
    for m in re.find_iter(content) {
        let ident = m.as_str();
        push_term(&mut terms, &ident.to_lowercase());
        for part in split_identifier(ident) {
            push_term(&mut terms, &part);
        }
    }
    terms
}

/// Terms of a repository path (directories, stem and extension)
pub fn path_terms(path: &str) -> BTreeSet<String> {
    content_terms(&path.replace(['/', '.', '-'], " "))
}

/// Explicit file references in free text, such as `core.entry` or
/// `src/auth/login.rs`
pub fn file_mentions(text: &str) -> Vec<String> {
    let re = MENTION_RE
        .get_or_init(|| Regex::new(r"[A-Za-z0-9_\-./]*[A-Za-z0-9_]\.[A-Za-z0-9]+").unwrap());
    let mut seen = BTreeSet::new();
    re.find_iter(text)
        .map(|m| m.as_str().trim_start_matches("./").to_string())
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

fn push_term(terms: &mut BTreeSet<String>, word: &str) {
    if word.len() >= MIN_TERM_LEN && !is_stop_word(word) {
        terms.insert(word.to_string());
    }
}

fn split_identifier(ident: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for chunk in ident.split('_') {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in chunk.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                parts.push(current.to_lowercase());
                current.clear();
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            parts.push(current.to_lowercase());
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_terms_filters_stop_words() {
        let terms = task_terms("Fix the bug in the login handler");
        assert_eq!(terms, vec!["bug", "login", "handler"]);
    }

    #[test]
    fn test_task_terms_dedup() {
        let terms = task_terms("router router config");
        assert_eq!(terms, vec!["router", "config"]);
    }

    #[test]
    fn test_content_terms_split_identifiers() {
        let terms = content_terms("fn parseConfig(raw_input: &str) {}");
        assert!(terms.contains("parseconfig"));
        assert!(terms.contains("parse"));
        assert!(terms.contains("config"));
        assert!(terms.contains("raw_input"));
        assert!(terms.contains("input"));
        assert!(!terms.contains("fn"));
    }

    #[test]
    fn test_path_terms() {
        let terms = path_terms("src/auth/login_handler.rs");
        assert!(terms.contains("auth"));
        assert!(terms.contains("login"));
        assert!(terms.contains("handler"));
        assert!(terms.contains("src"));
    }

    #[test]
    fn test_file_mentions() {
        let mentions = file_mentions("fix bug in core.entry and ./src/lib.rs.");
        assert_eq!(mentions, vec!["core.entry", "src/lib.rs"]);
    }

    #[test]
    fn test_no_mentions_in_plain_text() {
        assert!(file_mentions("refactor the router module").is_empty());
    }
}
