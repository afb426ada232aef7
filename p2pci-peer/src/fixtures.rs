//! Sample document directories for local testing, one sample per directory.

use std::path::PathBuf;

use p2pci_core::document::{self, SAMPLES};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("expected {expected} directories, got {got}")]
    Count { expected: usize, got: usize },
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `peer1_rfcs`, `peer2_rfcs`, ... one per sample.
pub fn default_dirs() -> Vec<PathBuf> {
    (1..=SAMPLES.len())
        .map(|i| PathBuf::from(format!("peer{}_rfcs", i)))
        .collect()
}

/// Write sample `i` into `dirs[i]`, creating directories as needed. Returns the written paths.
pub fn write_samples(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, FixtureError> {
    if dirs.len() != SAMPLES.len() {
        return Err(FixtureError::Count {
            expected: SAMPLES.len(),
            got: dirs.len(),
        });
    }
    let mut written = Vec::with_capacity(dirs.len());
    for (dir, (number, title)) in dirs.iter().zip(SAMPLES) {
        let path = dir.join(document::file_name(number));
        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(&path, document::sample_text(number, title)))
            .map_err(|source| FixtureError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), "sample written");
        written.push(path);
    }
    Ok(written)
}
