//! Artifact kind inference from path and file name

use ctxpack_core::ArtifactKind;

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];
const DOC_DIRS: &[&str] = &["docs", "doc"];
const ENTRY_STEMS: &[&str] = &[
    "main", "lib", "index", "app", "server", "cli", "__main__", "manage",
];
const DOC_EXTS: &[&str] = &["md", "markdown", "rst", "txt", "adoc", "doc", "org"];
const DOC_NAMES: &[&str] = &["readme", "changelog", "license", "contributing", "authors"];
const CONFIG_EXTS: &[&str] = &[
    "toml", "yaml", "yml", "json", "ini", "cfg", "conf", "env", "xml", "properties", "lock",
];
const CONFIG_NAMES: &[&str] = &[
    "makefile",
    "dockerfile",
    ".gitignore",
    ".editorconfig",
    ".dockerignore",
    "justfile",
];

/// Classify an artifact by its path.
///
/// Precedence: test, entry point, doc, config, then source.
pub fn infer_kind(path: &str) -> ArtifactKind {
    let lower = path.to_lowercase();
    let mut components: Vec<&str> = lower.split('/').collect();
    let name = components.pop().unwrap_or("");
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name, ""),
    };

    let in_dir = |dirs: &[&str]| components.iter().any(|c| dirs.contains(c));

    if in_dir(TEST_DIRS)
        || stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || stem.ends_with(".test")
        || stem.ends_with(".spec")
    {
        return ArtifactKind::Test;
    }
    if ext == "entry" || (ENTRY_STEMS.contains(&stem) && is_code(ext)) {
        return ArtifactKind::EntryPoint;
    }
    if DOC_EXTS.contains(&ext) || DOC_NAMES.contains(&stem) || in_dir(DOC_DIRS) {
        return ArtifactKind::Doc;
    }
    if CONFIG_EXTS.contains(&ext)
        || CONFIG_NAMES.contains(&name)
        || name.starts_with("docker-compose")
        || name.starts_with(".env")
    {
        return ArtifactKind::Config;
    }
    ArtifactKind::Source
}

fn is_code(ext: &str) -> bool {
    matches!(
        ext,
        "rs" | "py" | "js" | "jsx" | "ts" | "tsx" | "mjs" | "go" | "java" | "c" | "cc" | "cpp"
            | "rb"
    )
}
