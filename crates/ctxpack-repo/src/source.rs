//! Where artifacts come from: a directory on disk or an in-memory listing

use chrono::{DateTime, Utc};
use ctxpack_core::ScanWarning;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// A file offered for indexing
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    /// Root-relative, `/`-separated
    pub path: String,
    pub len: u64,
    pub modified: DateTime<Utc>,
}

/// Enumeration result; sub-directories that could not be read become warnings
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<SourceEntry>,
    pub warnings: Vec<ScanWarning>,
}

/// A readable repository tree
pub trait RepoSource: Send + Sync {
    fn root(&self) -> &Path;

    /// Every file under the root, skipping directories named in `ignore`.
    /// Failing to read the root itself is an error.
    fn list(&self, ignore: &[String]) -> io::Result<Listing>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// A repository on the local filesystem
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, rel: &str, ignore: &[String], listing: &mut Listing) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                listing.warnings.push(ScanWarning {
                    path: rel.to_string(),
                    message: format!("directory unreadable: {}", e),
                });
                return;
            }
        };
        self.collect(entries, rel, ignore, listing);
    }

    fn collect(
        &self,
        entries: std::fs::ReadDir,
        rel: &str,
        ignore: &[String],
        listing: &mut Listing,
    ) {
        let mut children: Vec<(String, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
            .collect();
        children.sort();

        for (name, path) in children {
            let child_rel = if rel.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", rel, name)
            };
            // symlinks are not followed
            let meta = match std::fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    listing.warnings.push(ScanWarning {
                        path: child_rel,
                        message: format!("metadata unreadable: {}", e),
                    });
                    continue;
                }
            };
            if meta.is_dir() {
                if !ignore.iter().any(|i| i == &name) {
                    self.walk(&path, &child_rel, ignore, listing);
                }
            } else if meta.is_file() {
                let modified = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                listing.entries.push(SourceEntry {
                    path: child_rel,
                    len: meta.len(),
                    modified,
                });
            }
        }
    }
}

impl RepoSource for FsSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self, ignore: &[String]) -> io::Result<Listing> {
        let entries = std::fs::read_dir(&self.root)?;
        let mut listing = Listing::default();
        self.collect(entries, "", ignore, &mut listing);
        Ok(listing)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

#[derive(Debug, Clone)]
enum MemoryFile {
    Bytes(Vec<u8>, DateTime<Utc>),
    Unreadable,
}

/// An in-memory repository, for callers that already hold file contents
#[derive(Debug, Clone)]
pub struct MemorySource {
    root: PathBuf,
    files: BTreeMap<String, MemoryFile>,
}

impl MemorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.with_file_at(path, content, Utc::now())
    }

    pub fn with_file_at(self, path: &str, content: &str, modified: DateTime<Utc>) -> Self {
        self.with_bytes(path, content.as_bytes().to_vec(), modified)
    }

    pub fn with_bytes(mut self, path: &str, bytes: Vec<u8>, modified: DateTime<Utc>) -> Self {
        self.files
            .insert(path.to_string(), MemoryFile::Bytes(bytes, modified));
        self
    }

    /// A listed file whose reads fail
    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.files.insert(path.to_string(), MemoryFile::Unreadable);
        self
    }

    pub fn insert(&mut self, path: &str, content: &str) {
        self.files.insert(
            path.to_string(),
            MemoryFile::Bytes(content.as_bytes().to_vec(), Utc::now()),
        );
    }
}

impl RepoSource for MemorySource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self, ignore: &[String]) -> io::Result<Listing> {
        let entries = self
            .files
            .iter()
            .filter(|(path, _)| {
                let mut dirs = path.split('/').rev().skip(1);
                !dirs.any(|d| ignore.iter().any(|i| i == d))
            })
            .map(|(path, file)| match file {
                MemoryFile::Bytes(bytes, modified) => SourceEntry {
                    path: path.clone(),
                    len: bytes.len() as u64,
                    modified: *modified,
                },
                MemoryFile::Unreadable => SourceEntry {
                    path: path.clone(),
                    len: 0,
                    modified: Utc::now(),
                },
            })
            .collect();
        Ok(Listing {
            entries,
            warnings: Vec::new(),
        })
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        match self.files.get(path) {
            Some(MemoryFile::Bytes(bytes, _)) => Ok(bytes.clone()),
            Some(MemoryFile::Unreadable) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            )),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_source_walks_and_ignores() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src/nested")).unwrap();
        std::fs::create_dir_all(tmp.path().join("target/debug")).unwrap();
        std::fs::write(tmp.path().join("src/lib.rs"), "pub mod nested;").unwrap();
        std::fs::write(tmp.path().join("src/nested/mod.rs"), "").unwrap();
        std::fs::write(tmp.path().join("target/debug/out.rs"), "").unwrap();
        std::fs::write(tmp.path().join("README.md"), "# hi").unwrap();

        let source = FsSource::new(tmp.path());
        let listing = source.list(&["target".to_string()]).unwrap();
        let paths: Vec<&str> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/lib.rs", "src/nested/mod.rs"]);
        assert_eq!(source.read("src/lib.rs").unwrap(), b"pub mod nested;");
    }

    #[test]
    fn test_fs_source_missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let source = FsSource::new(tmp.path().join("nope"));
        assert!(source.list(&[]).is_err());
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new("/virtual")
            .with_file("a.rs", "fn a() {}")
            .with_file("node_modules/x/index.js", "")
            .with_unreadable("secret.rs");
        let listing = source.list(&["node_modules".to_string()]).unwrap();
        let paths: Vec<&str> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "secret.rs"]);
        assert!(source.read("secret.rs").is_err());
        assert_eq!(source.read("a.rs").unwrap(), b"fn a() {}");
    }
}
