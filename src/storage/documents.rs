//! The document storage area: one file per upload, named by the sanitized
//! original filename with numeric disambiguation.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Locator for a stored document. `file_name` is the opaque reference that
/// ends up in the certificate row; callers outside this module never build
/// paths themselves.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub file_name: String,
    pub path: PathBuf,
}

pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reduces an arbitrary client-supplied filename to a safe flat name:
    /// ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
    /// Path separators and leading dots cannot survive this.
    pub fn sanitize_file_name(original: &str) -> String {
        let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
        let mut out: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        while out.starts_with('.') {
            out.remove(0);
        }
        if out.is_empty() {
            out.push_str("document");
        }
        out
    }

    /// Persists `bytes` under a name derived from `original`, appending `_N`
    /// before the extension on a clash. `create_new` is the atomic
    /// create-if-absent primitive, so concurrent saves of the same original
    /// name each land in a distinct file and nothing is ever overwritten.
    pub async fn save(&self, original: &str, bytes: &[u8]) -> anyhow::Result<StoredDocument> {
        let sanitized = Self::sanitize_file_name(original);
        let (stem, ext) = match sanitized.rfind('.') {
            Some(idx) if idx > 0 => (sanitized[..idx].to_string(), sanitized[idx..].to_string()),
            _ => (sanitized.clone(), String::new()),
        };

        let root = self.root.clone();
        let bytes = bytes.to_vec();
        // Blocking filesystem work is kept off the async workers.
        let stored = tokio::task::spawn_blocking(move || -> anyhow::Result<StoredDocument> {
            let mut suffix: u32 = 0;
            loop {
                let candidate = if suffix == 0 {
                    format!("{}{}", stem, ext)
                } else {
                    format!("{}_{}{}", stem, suffix, ext)
                };
                let path = root.join(&candidate);
                match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                    Ok(mut file) => {
                        file.write_all(&bytes)?;
                        file.flush()?;
                        return Ok(StoredDocument { file_name: candidate, path });
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        suffix += 1;
                        if suffix > 10_000 {
                            return Err(anyhow::anyhow!(
                                "could not find a free name for '{}' after 10000 attempts",
                                stem
                            ));
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        })
        .await??;

        Ok(stored)
    }

    /// Resolves a stored file name back to its path for download. Rejects
    /// anything that could escape the storage root.
    pub fn path_for(&self, file_name: &str) -> anyhow::Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(anyhow::anyhow!("invalid file name"));
        }
        Ok(self.root.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(DocumentStore::sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(DocumentStore::sanitize_file_name("my cert (final).pdf"), "my_cert__final_.pdf");
        assert_eq!(DocumentStore::sanitize_file_name(".hidden.pdf"), "hidden.pdf");
        assert_eq!(DocumentStore::sanitize_file_name("C:\\docs\\cert.pdf"), "cert.pdf");
        assert_eq!(DocumentStore::sanitize_file_name("///"), "document");
    }

    #[tokio::test]
    async fn sequential_saves_of_same_name_get_numeric_suffixes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DocumentStore::new(dir.path().to_path_buf())?;

        let a = store.save("cert.pdf", b"one").await?;
        let b = store.save("cert.pdf", b"two").await?;
        let c = store.save("cert.pdf", b"three").await?;

        assert_eq!(a.file_name, "cert.pdf");
        assert_eq!(b.file_name, "cert_1.pdf");
        assert_eq!(c.file_name, "cert_2.pdf");
        assert_eq!(std::fs::read(&a.path)?, b"one");
        assert_eq!(std::fs::read(&b.path)?, b"two");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_never_overwrite_each_other() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(DocumentStore::new(dir.path().to_path_buf())?);

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let body = format!("payload-{}", i).into_bytes();
                store.save("same_name.pdf", &body).await.map(|d| (d, body))
            }));
        }

        let mut names = std::collections::HashSet::new();
        for handle in handles {
            let (doc, body) = handle.await??;
            assert!(names.insert(doc.file_name.clone()), "duplicate stored name {}", doc.file_name);
            assert_eq!(std::fs::read(&doc.path)?, body);
        }
        assert_eq!(names.len(), 8);
        Ok(())
    }

    #[test]
    fn path_for_rejects_traversal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DocumentStore::new(dir.path().to_path_buf())?;
        assert!(store.path_for("../secret").is_err());
        assert!(store.path_for("a/b.pdf").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for("cert.pdf").is_ok());
        Ok(())
    }
}
