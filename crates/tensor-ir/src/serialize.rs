use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::graph::Graph;

/// Archive format version written by this crate.
pub const IR_VERSION: &str = "tensor-ir.v1";

#[derive(Debug, Error)]
pub enum GraphSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("graph archive version '{found}' does not match expected '{expected}'")]
    VersionMismatch {
        found: String,
        expected: &'static str,
    },
    #[error("graph archive is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum GraphIoError {
    #[error(transparent)]
    Serialization(#[from] GraphSerdeError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Serialize)]
struct ArchiveRef<'a> {
    version: &'a str,
    graph: &'a Graph,
}

#[derive(Deserialize)]
struct Archive {
    #[serde(default)]
    version: String,
    graph: Graph,
}

impl Graph {
    pub fn to_json_string(&self) -> Result<String, GraphSerdeError> {
        serde_json::to_string_pretty(&self.archive()).map_err(GraphSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, GraphSerdeError> {
        let archive: Archive = serde_json::from_str(src)?;
        archive.into_graph()
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, GraphSerdeError> {
        bincode::serialize(&self.archive()).map_err(GraphSerdeError::from)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self, GraphSerdeError> {
        let archive: Archive = bincode::deserialize(bytes)?;
        archive.into_graph()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphIoError> {
        let contents = self.to_json_string()?;
        fs::write(path, contents).map_err(GraphIoError::from)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, GraphIoError> {
        let contents = fs::read_to_string(path)?;
        Graph::from_json_str(&contents).map_err(GraphIoError::from)
    }

    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphIoError> {
        let bytes = self.to_bincode_bytes()?;
        fs::write(path, bytes).map_err(GraphIoError::from)
    }

    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, GraphIoError> {
        let bytes = fs::read(path)?;
        Graph::from_bincode_slice(&bytes).map_err(GraphIoError::from)
    }

    fn archive(&self) -> ArchiveRef<'_> {
        ArchiveRef {
            version: IR_VERSION,
            graph: self,
        }
    }
}

impl Archive {
    fn into_graph(self) -> Result<Graph, GraphSerdeError> {
        if !self.version.is_empty() && self.version != IR_VERSION {
            return Err(GraphSerdeError::VersionMismatch {
                found: self.version,
                expected: IR_VERSION,
            });
        }
        if let Err(reason) = self.graph.check_integrity() {
            warn!(%reason, "rejecting corrupt graph archive");
            return Err(GraphSerdeError::Corrupt(reason));
        }
        Ok(self.graph)
    }
}
