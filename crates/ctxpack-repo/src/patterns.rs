//! Architectural layout recognition from directory and file names

use ctxpack_core::ArchitecturalPattern;
use std::collections::BTreeSet;

/// Patterns below this confidence are not reported
pub const MIN_PATTERN_CONFIDENCE: f64 = 0.5;

const MANIFESTS: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "go.mod",
    "pyproject.toml",
    "setup.py",
    "pom.xml",
    "build.gradle",
];

enum Signature {
    /// Any directory with one of these names
    Dir(&'static [&'static str]),
    /// Any file with one of these names
    File(&'static [&'static str]),
    /// A package manifest at the root
    RootManifest,
    /// At least this many manifests below the root
    NestedManifests(usize),
}

struct Template {
    name: &'static str,
    signatures: &'static [(&'static str, Signature)],
}

const TEMPLATES: &[Template] = &[
    Template {
        name: "mvc",
        signatures: &[
            ("controllers", Signature::Dir(&["controllers", "controller"])),
            ("models", Signature::Dir(&["models", "model"])),
            ("views", Signature::Dir(&["views", "view", "templates"])),
        ],
    },
    Template {
        name: "component-based",
        signatures: &[
            ("components", Signature::Dir(&["components"])),
            ("hooks", Signature::Dir(&["hooks"])),
            ("context", Signature::Dir(&["context", "contexts", "store"])),
        ],
    },
    Template {
        name: "service-oriented",
        signatures: &[
            ("services", Signature::Dir(&["services", "service"])),
            ("api", Signature::Dir(&["api", "apis", "gateway"])),
            (
                "compose file",
                Signature::File(&[
                    "docker-compose.yml",
                    "docker-compose.yaml",
                    "compose.yml",
                    "compose.yaml",
                ]),
            ),
        ],
    },
    Template {
        name: "layered",
        signatures: &[
            ("domain", Signature::Dir(&["domain"])),
            ("application", Signature::Dir(&["application", "app"])),
            ("infrastructure", Signature::Dir(&["infrastructure", "infra"])),
        ],
    },
    Template {
        name: "workspace",
        signatures: &[
            ("root manifest", Signature::RootManifest),
            ("member manifests", Signature::NestedManifests(2)),
        ],
    },
];

struct Layout {
    dirs: BTreeSet<String>,
    files: BTreeSet<String>,
    root_manifest: bool,
    nested_manifests: usize,
}

impl Layout {
    fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut layout = Layout {
            dirs: BTreeSet::new(),
            files: BTreeSet::new(),
            root_manifest: false,
            nested_manifests: 0,
        };
        for path in paths {
            let mut parts: Vec<&str> = path.split('/').collect();
            let name = parts.pop().unwrap_or("");
            layout.dirs.extend(parts.iter().map(|d| d.to_lowercase()));
            layout.files.insert(name.to_lowercase());
            if MANIFESTS.contains(&name) {
                if parts.is_empty() {
                    layout.root_manifest = true;
                } else {
                    layout.nested_manifests += 1;
                }
            }
        }
        layout
    }

    fn matches(&self, signature: &Signature) -> bool {
        match signature {
            Signature::Dir(names) => names.iter().any(|n| self.dirs.contains(*n)),
            Signature::File(names) => names.iter().any(|n| self.files.contains(*n)),
            Signature::RootManifest => self.root_manifest,
            Signature::NestedManifests(min) => self.nested_manifests >= *min,
        }
    }
}

/// Every template whose confidence reaches [`MIN_PATTERN_CONFIDENCE`],
/// highest confidence first
pub fn detect_patterns<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<ArchitecturalPattern> {
    let layout = Layout::new(paths);
    let mut found: Vec<ArchitecturalPattern> = TEMPLATES
        .iter()
        .filter_map(|template| {
            let matched: Vec<String> = template
                .signatures
                .iter()
                .filter(|(_, sig)| layout.matches(sig))
                .map(|(label, _)| label.to_string())
                .collect();
            let confidence = matched.len() as f64 / template.signatures.len() as f64;
            (confidence >= MIN_PATTERN_CONFIDENCE).then(|| ArchitecturalPattern {
                name: template.name.to_string(),
                confidence,
                matched,
            })
        })
        .collect();
    found.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    found
}
