use crate::compress::{strip_comments, summarize_sentences, top_level_lines};
use ctxpack_core::{Artifact, ArtifactKind, Compressed, Compressor};
use ctxpack_repo::{extract_with, Language, SymbolKind};
use ctxpack_telemetry::estimate_tokens;

const DOC_SENTENCES: usize = 2;

/// Keeps what a reader needs to navigate an artifact without its bodies.
///
/// Code keeps reference lines and declaration signatures, docs keep headings
/// with the leading sentences of each section, config keeps top-level lines,
/// and anything else loses comments and blank lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureCompressor;

impl SignatureCompressor {
    pub fn new() -> Self {
        Self
    }

    fn code_outline(&self, artifact: &Artifact) -> String {
        let Some(language) = Language::from_path(&artifact.path) else {
            return strip_comments(&artifact.content);
        };
        let symbols = extract_with(language, &artifact.content, &artifact.path);
        if symbols.symbols.is_empty() {
            return strip_comments(&artifact.content);
        }

        let mut lines = symbols.reference_lines.clone();
        lines.extend(symbols.symbols.iter().map(|s| match s.kind {
            SymbolKind::Heading => s.signature.clone(),
            _ => elide_body(&s.signature),
        }));
        lines.join("\n")
    }

    fn doc_outline(&self, content: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut section = String::new();

        let mut flush = |section: &mut String, out: &mut Vec<String>| {
            if !section.trim().is_empty() {
                out.push(summarize_sentences(section, DOC_SENTENCES));
            }
            section.clear();
        };

        for line in content.lines() {
            if line.starts_with('#') {
                flush(&mut section, &mut out);
                out.push(line.trim_end().to_string());
            } else {
                section.push_str(line);
                section.push('\n');
            }
        }
        flush(&mut section, &mut out);
        out.join("\n")
    }
}

impl Compressor for SignatureCompressor {
    fn compress(&self, artifact: &Artifact) -> Option<Compressed> {
        let content = match artifact.kind {
            ArtifactKind::Source | ArtifactKind::Test | ArtifactKind::EntryPoint => {
                self.code_outline(artifact)
            }
            ArtifactKind::Doc => self.doc_outline(&artifact.content),
            ArtifactKind::Config => top_level_lines(&artifact.content),
        };
        if content.trim().is_empty() {
            return None;
        }

        let size = estimate_tokens(&content);
        if size >= artifact.size {
            tracing::trace!(path = %artifact.path, size, "compression saved nothing");
            return None;
        }
        Some(Compressed { content, size })
    }
}

/// `fn run() {` becomes `fn run() { ... }`
fn elide_body(signature: &str) -> String {
    match signature.strip_suffix('{') {
        Some(head) => format!("{}{{ ... }}", head),
        None => signature.to_string(),
    }
}
