//! Local document store: one `rfc<N>.txt` file per document in the peer's directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use p2pci_core::document;
use tokio::io::AsyncReadExt;

/// A document read from disk together with its modification time at read time.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub bytes: Vec<u8>,
    pub modified: SystemTime,
}

/// A document found by [`DocumentStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDocument {
    pub number: u32,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, number: u32) -> PathBuf {
        self.dir.join(document::file_name(number))
    }

    /// Read document `number`. `Ok(None)` when the file does not exist.
    pub async fn read(&self, number: u32) -> io::Result<Option<StoredDocument>> {
        let mut file = match tokio::fs::File::open(self.path_for(number)).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let modified = file.metadata().await?.modified()?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await?;
        Ok(Some(StoredDocument { bytes, modified }))
    }

    /// Replace document `number` with `bytes`. Goes through a temporary file and a rename,
    /// so a failed write leaves the previous file in place.
    pub async fn write(&self, number: u32, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(number);
        let tmp = self
            .dir
            .join(format!(".{}.part", document::file_name(number)));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(path)
    }

    /// Title from the document's first line, if it has a usable one.
    pub async fn title_of(&self, number: u32) -> Option<String> {
        let doc = self.read(number).await.ok()??;
        let text = String::from_utf8_lossy(&doc.bytes);
        document::extract_title(text.lines().next()?)
    }

    /// Every `rfc<N>.txt` in the directory, ordered by number.
    pub async fn scan(&self) -> io::Result<Vec<LocalDocument>> {
        let mut numbers = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(n) = entry.file_name().to_str().and_then(document::number_from_file_name) {
                numbers.push(n);
            }
        }
        numbers.sort_unstable();
        let mut out = Vec::with_capacity(numbers.len());
        for number in numbers {
            let title = self
                .title_of(number)
                .await
                .unwrap_or_else(|| document::default_title(number));
            out.push(LocalDocument { number, title });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        assert!(store.read(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("nested")).await.unwrap();
        let content = "RFC 5 - Five\r\n\r\nbody ✓\n\nend".as_bytes();
        let path = store.write(5, content).await.unwrap();
        assert_eq!(path, store.dir().join("rfc5.txt"));
        let doc = store.read(5).await.unwrap().unwrap();
        assert_eq!(doc.bytes, content);
        assert!(!store.dir().join(".rfc5.txt.part").exists());
    }

    #[tokio::test]
    async fn scan_finds_documents_with_titles() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        store.write(20, b"RFC 20 - Twenty\nbody").await.unwrap();
        store.write(3, b"").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let docs = store.scan().await.unwrap();
        assert_eq!(
            docs,
            vec![
                LocalDocument {
                    number: 3,
                    title: "RFC 3".into()
                },
                LocalDocument {
                    number: 20,
                    title: "Twenty".into()
                },
            ]
        );
    }
}
