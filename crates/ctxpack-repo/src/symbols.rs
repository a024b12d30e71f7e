//! Declaration and reference extraction from source files

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Languages whose references and declarations are recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Rust,
    Go,
    Java,
    C,
    Ruby,
    Markdown,
}

impl Language {
    pub fn from_path(path: &str) -> Option<Language> {
        let ext = Path::new(path).extension()?.to_str()?;
        let lang = match ext {
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => Language::JavaScript,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "cpp" | "cc" | "h" | "hpp" => Language::C,
            "rb" => Language::Ruby,
            "md" | "markdown" => Language::Markdown,
            _ => return None,
        };
        Some(lang)
    }

    /// Extensions tried when a reference omits one
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::JavaScript => &["ts", "tsx", "js", "jsx", "mjs", "cjs"],
            Language::Rust => &["rs"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::C => &["h", "hpp", "c", "cc", "cpp"],
            Language::Ruby => &["rb"],
            Language::Markdown => &["md"],
        }
    }

    /// Files standing in for a referenced directory
    pub fn index_files(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["__init__.py"],
            Language::JavaScript => &["index.ts", "index.tsx", "index.js", "index.jsx"],
            Language::Rust => &["mod.rs"],
            Language::Markdown => &["README.md", "index.md"],
            _ => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Ruby => "ruby",
            Language::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Type,
    Method,
    Heading,
}

/// A declaration line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub line: usize,
}

/// What one file declares and references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSymbols {
    pub path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    /// Raw reference strings, as written in the file
    pub references: Vec<String>,
    /// Lines carrying references, verbatim
    pub reference_lines: Vec<String>,
}

impl FileSymbols {
    pub fn new(path: &str, language: Language) -> Self {
        Self {
            path: path.to_string(),
            language,
            symbols: Vec::new(),
            references: Vec::new(),
            reference_lines: Vec::new(),
        }
    }

    /// Declaration lines in file order
    pub fn signatures(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.signature.clone()).collect()
    }
}

struct Rules {
    declarations: Vec<(SymbolKind, Regex)>,
    /// Group 1 of each match is the referenced module or path
    references: Vec<Regex>,
}

fn compile(declarations: &[(SymbolKind, &str)], references: &[&str]) -> Rules {
    Rules {
        declarations: declarations
            .iter()
            .map(|(kind, re)| (*kind, Regex::new(re).unwrap()))
            .collect(),
        references: references.iter().map(|re| Regex::new(re).unwrap()).collect(),
    }
}

static PYTHON_RULES: OnceLock<Rules> = OnceLock::new();
static JS_RULES: OnceLock<Rules> = OnceLock::new();
static RUST_RULES: OnceLock<Rules> = OnceLock::new();
static GO_RULES: OnceLock<Rules> = OnceLock::new();
static JAVA_RULES: OnceLock<Rules> = OnceLock::new();
static C_RULES: OnceLock<Rules> = OnceLock::new();
static RUBY_RULES: OnceLock<Rules> = OnceLock::new();
static MARKDOWN_RULES: OnceLock<Rules> = OnceLock::new();

fn rules(language: Language) -> &'static Rules {
    use SymbolKind::*;
    match language {
        Language::Python => PYTHON_RULES.get_or_init(|| {
            compile(
                &[
                    (Function, r"^\s*(?:async\s+)?def\s+(\w+)\s*\("),
                    (Type, r"^\s*class\s+(\w+)"),
                ],
                &[
                    r"^\s*from\s+(\.*[\w.]*)\s+import\b",
                    r"^\s*import\s+([\w.]+)",
                ],
            )
        }),
        Language::JavaScript => JS_RULES.get_or_init(|| {
            compile(
                &[
                    (
                        Function,
                        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\*?\s+(\w+)",
                    ),
                    (
                        Type,
                        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)",
                    ),
                    (Type, r"^\s*(?:export\s+)?(?:interface|type)\s+(\w+)"),
                    (
                        Function,
                        r"^\s*(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s+)?\([^)]*\)\s*=>",
                    ),
                ],
                &[
                    r#"^\s*import\s+(?:[^'"]*\s+from\s+)?['"]([^'"]+)['"]"#,
                    r#"^\s*export\s+[^'"]*\s+from\s+['"]([^'"]+)['"]"#,
                    r#"require\(\s*['"]([^'"]+)['"]\s*\)"#,
                ],
            )
        }),
        Language::Rust => RUST_RULES.get_or_init(|| {
            compile(
                &[
                    (
                        Function,
                        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)",
                    ),
                    (
                        Type,
                        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|type|union)\s+(\w+)",
                    ),
                ],
                &[
                    r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)",
                    r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;",
                ],
            )
        }),
        Language::Go => GO_RULES.get_or_init(|| {
            compile(
                &[
                    (Method, r"^func\s+\([^)]*\)\s+(\w+)"),
                    (Function, r"^func\s+(\w+)"),
                    (Type, r"^type\s+(\w+)"),
                ],
                &[r#"^\s*import\s+(?:\w+\s+)?"([^"]+)""#, r#"^\s*(?:\w+\s+)?"([^"]+)"\s*$"#],
            )
        }),
        Language::Java => JAVA_RULES.get_or_init(|| {
            compile(
                &[
                    (
                        Type,
                        r"^\s*(?:(?:public|private|protected|abstract|final|static|sealed)\s+)*(?:class|interface|enum|record)\s+(\w+)",
                    ),
                    (
                        Method,
                        r"^\s*(?:public|private|protected)\s+(?:(?:static|final|abstract|synchronized)\s+)*[\w<>\[\],.?\s]+?\s+(\w+)\s*\(",
                    ),
                ],
                &[r"^\s*import\s+(?:static\s+)?([\w.]+)\s*;"],
            )
        }),
        Language::C => C_RULES.get_or_init(|| {
            compile(
                &[
                    (
                        Function,
                        r"^(?:static\s+)?(?:inline\s+)?(?:[\w*]+\s+)+\**(\w+)\s*\([^)]*\)\s*\{?\s*$",
                    ),
                    (Type, r"^\s*(?:typedef\s+)?(?:struct|class|enum|union)\s+(\w+)"),
                ],
                &[r#"^\s*#\s*include\s+[<"]([^>"]+)[>"]"#],
            )
        }),
        Language::Ruby => RUBY_RULES.get_or_init(|| {
            compile(
                &[
                    (Function, r"^\s*def\s+(?:self\.)?(\w+[?!]?)"),
                    (Type, r"^\s*(?:class|module)\s+([\w:]+)"),
                ],
                &[r#"^\s*require(?:_relative)?\s*\(?\s*['"]([^'"]+)['"]"#],
            )
        }),
        Language::Markdown => MARKDOWN_RULES.get_or_init(|| {
            compile(
                &[(Heading, r"^#{1,6}\s+(.+?)\s*#*\s*$")],
                &[r"\]\(([^)#\s]+)(?:#[^)]*)?\)"],
            )
        }),
    }
}

/// Extract declarations and references; `None` for unrecognised languages
pub fn extract_symbols(content: &str, path: &str) -> Option<FileSymbols> {
    let language = Language::from_path(path)?;
    Some(extract_with(language, content, path))
}

pub fn extract_with(language: Language, content: &str, path: &str) -> FileSymbols {
    let rules = rules(language);
    let mut fs = FileSymbols::new(path, language);
    let mut in_fence = false;

    for (line_num, line) in content.lines().enumerate() {
        if language == Language::Markdown && line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let mut referenced = false;
        for re in &rules.references {
            for cap in re.captures_iter(line) {
                let target = cap[1].trim_end_matches(':');
                if !target.is_empty() && !is_external_url(target) {
                    fs.references.push(target.to_string());
                    referenced = true;
                }
            }
        }
        if referenced {
            fs.reference_lines.push(line.trim().to_string());
            continue;
        }

        if let Some((kind, cap)) = rules
            .declarations
            .iter()
            .find_map(|(kind, re)| re.captures(line).map(|c| (*kind, c)))
        {
            fs.symbols.push(Symbol {
                name: cap[1].to_string(),
                kind,
                signature: line.trim().to_string(),
                line: line_num + 1,
            });
        }
    }

    fs.references.dedup();
    fs
}

fn is_external_url(target: &str) -> bool {
    target.contains("://") || target.starts_with("mailto:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_declarations_and_imports() {
        let code = "import os\nfrom .models import User\nfrom app.db import session\n\nclass Service:\n    def handle(self):\n        pass\n";
        let fs = extract_symbols(code, "app/service.py").unwrap();
        assert_eq!(fs.references, vec!["os", ".models", "app.db"]);
        assert_eq!(fs.symbols.len(), 2);
        assert_eq!(fs.symbols[0].name, "Service");
        assert_eq!(fs.symbols[0].kind, SymbolKind::Type);
        assert_eq!(fs.symbols[1].name, "handle");
        assert_eq!(fs.symbols[1].line, 6);
    }

    #[test]
    fn test_javascript_import_forms() {
        let code = "import React from 'react';\nimport './styles.css';\nexport { a } from \"./a\";\nconst db = require('../db');\nexport async function load(id) {}\nexport interface Props {}\n";
        let fs = extract_symbols(code, "src/app.tsx").unwrap();
        assert_eq!(fs.references, vec!["react", "./styles.css", "./a", "../db"]);
        let names: Vec<&str> = fs.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["load", "Props"]);
    }

    #[test]
    fn test_rust_use_and_mod() {
        let code = "mod scorer;\npub(crate) mod packer;\nuse crate::types::{Artifact, Tier};\nuse std::sync::Arc;\n\npub struct Engine {}\npub async fn run() {}\n";
        let fs = extract_symbols(code, "src/lib.rs").unwrap();
        assert_eq!(
            fs.references,
            vec!["scorer", "packer", "crate::types", "std::sync::Arc"]
        );
        assert_eq!(fs.signatures(), vec!["pub struct Engine {}", "pub async fn run() {}"]);
    }

    #[test]
    fn test_go_functions_and_methods() {
        let code = "package main\n\nimport \"example.com/app/store\"\n\nfunc main() {}\ntype Config struct {}\nfunc (s *Server) Start() {}\n";
        let fs = extract_symbols(code, "cmd/main.go").unwrap();
        assert_eq!(fs.references, vec!["example.com/app/store"]);
        assert_eq!(fs.symbols[0].name, "main");
        assert_eq!(fs.symbols[2].name, "Start");
        assert_eq!(fs.symbols[2].kind, SymbolKind::Method);
    }

    #[test]
    fn test_c_include_and_function() {
        let code = "#include <stdio.h>\n#include \"util/list.h\"\n\nstatic int count_items(struct list *l) {\n    return 0;\n}\n";
        let fs = extract_symbols(code, "src/main.c").unwrap();
        assert_eq!(fs.references, vec!["stdio.h", "util/list.h"]);
        assert_eq!(fs.symbols[0].name, "count_items");
    }

    #[test]
    fn test_markdown_headings_and_links() {
        let code = "# Guide\n\nSee [setup](docs/setup.md#install) and [site](https://example.com).\n\n```\n# not a heading\n```\n## Usage\n";
        let fs = extract_symbols(code, "README.md").unwrap();
        assert_eq!(fs.references, vec!["docs/setup.md"]);
        let headings: Vec<&str> = fs.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(headings, vec!["Guide", "Usage"]);
    }

    #[test]
    fn test_unknown_extension_returns_none() {
        assert!(extract_symbols("content", "file.xyz").is_none());
        assert!(Language::from_path("Makefile").is_none());
    }
}
