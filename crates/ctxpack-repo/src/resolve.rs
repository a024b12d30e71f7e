//! Resolution of raw reference strings to indexed artifact paths

use crate::symbols::Language;
use std::collections::{BTreeMap, BTreeSet};

/// Resolves references against a fixed set of artifact paths.
///
/// Candidates are tried exactly, with the language's extensions, as a
/// directory with an index file, and finally as a path suffix. Suffix matches
/// prefer the shortest path, then path order.
pub struct Resolver {
    paths: BTreeSet<String>,
    /// Directory -> files directly inside it
    dirs: BTreeMap<String, Vec<String>>,
}

impl Resolver {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let paths: BTreeSet<String> = paths.into_iter().map(str::to_string).collect();
        let mut dirs: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in &paths {
            dirs.entry(parent(path).to_string())
                .or_default()
                .push(path.clone());
        }
        Self { paths, dirs }
    }

    /// Resolve `reference`, written in `from`, to an artifact path
    pub fn resolve(&self, from: &str, language: Language, reference: &str) -> Option<String> {
        let candidates = candidates(from, language, reference);
        for candidate in &candidates {
            if let Some(found) = self.lookup(candidate, language) {
                return Some(found);
            }
        }
        if language == Language::Go {
            return candidates.iter().find_map(|c| self.go_package(c));
        }
        candidates.iter().find_map(|c| self.suffix_match(c, language))
    }

    fn lookup(&self, candidate: &str, language: Language) -> Option<String> {
        if candidate.is_empty() {
            return None;
        }
        if self.paths.contains(candidate) {
            return Some(candidate.to_string());
        }
        for ext in language.extensions() {
            let with_ext = format!("{}.{}", candidate, ext);
            if self.paths.contains(&with_ext) {
                return Some(with_ext);
            }
        }
        for index in language.index_files() {
            let inside = format!("{}/{}", candidate, index);
            if self.paths.contains(&inside) {
                return Some(inside);
            }
        }
        None
    }

    fn suffix_match(&self, candidate: &str, language: Language) -> Option<String> {
        if candidate.is_empty() {
            return None;
        }
        let mut suffixes = vec![format!("/{}", candidate)];
        suffixes.extend(
            language
                .extensions()
                .iter()
                .map(|ext| format!("/{}.{}", candidate, ext)),
        );
        self.paths
            .iter()
            .filter(|p| suffixes.iter().any(|s| p.ends_with(s.as_str())))
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .cloned()
    }

    /// Go imports name a package directory; resolve to its first non-test file
    fn go_package(&self, candidate: &str) -> Option<String> {
        let suffix = format!("/{}", candidate);
        self.dirs
            .iter()
            .filter(|(dir, _)| dir.as_str() == candidate || dir.ends_with(&suffix))
            .flat_map(|(_, files)| files.iter())
            .find(|f| f.ends_with(".go") && !f.ends_with("_test.go"))
            .cloned()
    }
}

/// Candidate repository paths for a reference, most specific first
fn candidates(from: &str, language: Language, reference: &str) -> Vec<String> {
    let dir = parent(from);
    match language {
        Language::Python => python_candidates(dir, reference),
        Language::Rust => rust_candidates(from, reference),
        Language::Java => vec![reference.replace('.', "/")],
        Language::Go => {
            // module paths carry a host/module prefix the repository lacks
            let parts: Vec<&str> = reference.split('/').filter(|s| !s.is_empty()).collect();
            (0..parts.len()).map(|i| parts[i..].join("/")).collect()
        }
        Language::JavaScript | Language::Ruby | Language::Markdown | Language::C => {
            if reference.starts_with("./") || reference.starts_with("../") {
                normalize(&join(dir, reference)).into_iter().collect()
            } else if let Some(rest) = reference.strip_prefix('/') {
                normalize(rest).into_iter().collect()
            } else {
                let mut out: Vec<String> = normalize(&join(dir, reference)).into_iter().collect();
                if let Some(alias) = reference.strip_prefix("@/") {
                    out.push(format!("src/{}", alias));
                }
                out.push(reference.to_string());
                out
            }
        }
    }
}

fn python_candidates(dir: &str, reference: &str) -> Vec<String> {
    let dots = reference.chars().take_while(|c| *c == '.').count();
    let module = reference[dots..].replace('.', "/");
    if dots == 0 {
        return vec![module];
    }
    let mut base = dir.to_string();
    for _ in 1..dots {
        base = parent(&base).to_string();
    }
    normalize(&join(&base, &module)).into_iter().collect()
}

fn rust_candidates(from: &str, reference: &str) -> Vec<String> {
    let file = from.rsplit('/').next().unwrap_or(from);
    let dir = parent(from);
    let owns_dir = matches!(file, "lib.rs" | "main.rs" | "mod.rs");
    // Directory holding the current module's children
    let module_dir = if owns_dir {
        dir.to_string()
    } else {
        join(dir, file.trim_end_matches(".rs"))
    };

    if !reference.contains("::") {
        // `mod name;`
        return vec![join(&module_dir, reference)];
    }

    let mut segments: Vec<&str> = reference.split("::").filter(|s| !s.is_empty()).collect();
    let base = match segments.first().copied() {
        Some("crate") => {
            segments.remove(0);
            crate_src_dir(from)
        }
        Some("self") => {
            segments.remove(0);
            module_dir
        }
        Some("super") => {
            let mut base = module_dir;
            while segments.first() == Some(&"super") {
                segments.remove(0);
                base = parent(&base).to_string();
            }
            base
        }
        _ => return Vec::new(),
    };

    (1..=segments.len())
        .rev()
        .map(|n| join(&base, &segments[..n].join("/")))
        .collect()
}

/// Nearest enclosing `src` directory, or the file's own directory
fn crate_src_dir(from: &str) -> String {
    let mut dir = parent(from);
    loop {
        if dir == "src" || dir.ends_with("/src") {
            return dir.to_string();
        }
        if dir.is_empty() {
            return parent(from).to_string();
        }
        dir = parent(dir);
    }
}

fn parent(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, rest)
    }
}

/// Collapse `.` and `..` components; `None` when the path escapes the root
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
