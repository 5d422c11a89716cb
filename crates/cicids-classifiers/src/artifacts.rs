//! On-disk store for fitted scalers and classifiers.
//!
//! Each artifact is one bincode file, `<dir>/<id>.bin`. The store is meant
//! for a single writer; there is no locking and no retry.
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ArtifactError;

/// Identity of the persisted min-max scaler.
pub const SCALER_ARTIFACT: &str = "scaler";

const EXTENSION: &str = "bin";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

fn io_error(id: &str, source: io::Error) -> ArtifactError {
    ArtifactError::Io {
        id: id.to_string(),
        source,
    }
}

fn codec_error(id: &str, source: bincode::Error) -> ArtifactError {
    match *source {
        bincode::ErrorKind::Io(e) => io_error(id, e),
        other => ArtifactError::Corrupt {
            id: id.to_string(),
            source: Box::new(other),
        },
    }
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ArtifactStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }

    fn check_id(id: &str) -> Result<(), ArtifactError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(ArtifactError::UnknownArtifact(id.to_string()))
        }
    }

    pub fn exists(&self, id: &str) -> bool {
        Self::check_id(id).is_ok() && self.path_for(id).is_file()
    }

    /// Serialise `value` under `id`, replacing any previous artifact.
    pub fn save<T: Serialize>(&self, id: &str, value: &T) -> Result<(), ArtifactError> {
        Self::check_id(id)?;
        fs::create_dir_all(&self.dir).map_err(|e| io_error(id, e))?;

        let path = self.path_for(id);
        let file = File::create(&path).map_err(|e| io_error(id, e))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, value).map_err(|e| codec_error(id, e))?;
        writer.flush().map_err(|e| io_error(id, e))?;

        log::info!("Saved artifact '{}' to {}", id, path.display());
        Ok(())
    }

    /// Load the artifact saved under `id`.
    pub fn load<T: DeserializeOwned>(&self, id: &str) -> Result<T, ArtifactError> {
        Self::check_id(id)?;
        let path = self.path_for(id);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::UnknownArtifact(id.to_string()))
            }
            Err(e) => return Err(io_error(id, e)),
        };

        let value = bincode::deserialize_from(BufReader::new(file)).map_err(|e| match *e {
            // A short file is a truncated artifact rather than a device failure.
            bincode::ErrorKind::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                ArtifactError::Corrupt {
                    id: id.to_string(),
                    source: Box::new(bincode::ErrorKind::Io(io)),
                }
            }
            other => codec_error(id, Box::new(other)),
        })?;

        log::info!("Loaded artifact '{}' from {}", id, path.display());
        Ok(value)
    }

    /// Identities currently present, sorted.
    pub fn list(&self) -> Result<Vec<String>, ArtifactError> {
        let mut ids = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(io_error("*", e)),
        };

        for entry in entries {
            let path = entry.map_err(|e| io_error("*", e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
