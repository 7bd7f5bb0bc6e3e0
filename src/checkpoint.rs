//! Durable "last processed block height" checkpoint, used to resume the
//! relay loop from where it left off after a restart.

use crate::types::Checkpoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("reading checkpoint file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("writing checkpoint file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("parsing checkpoint file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The durable checkpoint record, read and written as a single whole file.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(&self) -> Result<Checkpoint, CheckpointError>;
    async fn set(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    height: i64,
}

/// File-backed progress store. Writes go to a temp file beside the target
/// and are renamed into place, so a crash mid-write never leaves a torn
/// checkpoint on disk.
pub struct FileProgressStore {
    path: PathBuf,
    starting_height: i64,
}

impl FileProgressStore {
    pub fn new(path: impl Into<PathBuf>, starting_height: i64) -> Self {
        Self {
            path: path.into(),
            starting_height,
        }
    }
}

#[async_trait]
impl ProgressStore for FileProgressStore {
    async fn get(&self) -> Result<Checkpoint, CheckpointError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                let state: StateFile =
                    serde_json::from_str(&content).map_err(|source| CheckpointError::Parse {
                        path: self.path.clone(),
                        source,
                    })?;
                Ok(Checkpoint {
                    height: state.height,
                })
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(Checkpoint {
                height: self.starting_height,
            }),
            Err(source) => Err(CheckpointError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn set(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let state = StateFile {
            height: checkpoint.height,
        };
        let body = serde_json::to_vec_pretty(&state).expect("StateFile always serializes");

        let tmp_path = tmp_path_for(&self.path);
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|source| CheckpointError::Write {
                path: tmp_path.clone(),
                source,
            })?;
        file.write_all(&body)
            .await
            .map_err(|source| CheckpointError::Write {
                path: tmp_path.clone(),
                source,
            })?;
        file.sync_all().await.map_err(|source| CheckpointError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| CheckpointError::Write {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os_str = path.as_os_str().to_owned();
    os_str.push(".tmp");
    PathBuf::from(os_str)
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// In-memory progress store for engine-level tests.
    pub struct InMemoryProgressStore {
        checkpoint: Mutex<Checkpoint>,
    }

    impl InMemoryProgressStore {
        pub fn new(starting_height: i64) -> Self {
            Self {
                checkpoint: Mutex::new(Checkpoint {
                    height: starting_height,
                }),
            }
        }
    }

    #[async_trait]
    impl ProgressStore for InMemoryProgressStore {
        async fn get(&self) -> Result<Checkpoint, CheckpointError> {
            Ok(*self.checkpoint.lock().unwrap())
        }

        async fn set(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
            *self.checkpoint.lock().unwrap() = checkpoint;
            Ok(())
        }
    }
}
