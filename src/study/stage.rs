//! Study table files and staging them for the build runner

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::core::error::{Error, Result};
use crate::study::StudyTable;

/// Hex digits of the content hash kept in staged keys
const KEY_HASH_LEN: usize = 12;

impl StudyTable {
    /// Render as CSV: a header of column names, then one record per run
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns().keys())?;
        for idx in 0..self.rows() {
            let record: Vec<String> = self
                .columns()
                .values()
                .map(|col| col[idx].to_string())
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| Error::io("<csv>", e))?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }
}

/// Somewhere staged artifacts are put for the build runner to pick up
pub trait ArtifactSink {
    /// Store `data` under `key`, returning where it landed
    fn put(&mut self, key: &str, data: &[u8]) -> Result<String>;
}

/// Keys are relative `/`-separated paths made of plain segments only
fn check_key(key: &str) -> Result<()> {
    let plain = !key.is_empty()
        && !key.starts_with('/')
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(Error::InvalidArtifactKey {
            key: key.to_string(),
        })
    }
}

/// Sink writing each key as a file below a root directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectorySink {
    fn put(&mut self, key: &str, data: &[u8]) -> Result<String> {
        check_key(key)?;
        let path = key
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&path, data).map_err(|e| Error::io(&path, e))?;
        Ok(path.display().to_string())
    }
}

/// A study table handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub design: String,
    pub key: String,
    pub location: String,
    pub sha256: String,
}

/// Stage a study table for `design` under a content-addressed key
///
/// The key is `<design>/study-<hash>.csv`, so staging the same table twice
/// lands on the same key.
pub fn stage_table<K: ArtifactSink + ?Sized>(
    table: &StudyTable,
    design: &str,
    sink: &mut K,
) -> Result<StagedArtifact> {
    let data = table.to_csv_bytes()?;

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let sha256 = format!("{:x}", hasher.finalize());

    let key = format!("{}/study-{}.csv", design, &sha256[..KEY_HASH_LEN]);
    check_key(&key)?;
    let location = sink.put(&key, &data)?;
    tracing::info!(design, key = %key, location = %location, rows = table.rows(), "staged study table");

    Ok(StagedArtifact {
        design: design.to_string(),
        key,
        location,
        sha256,
    })
}
