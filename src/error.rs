use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot open input {}", path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read input")]
    ReadSource(#[source] io::Error),

    #[error("failed to allocate the {0} queue")]
    QueueAlloc(&'static str),

    #[error("failed to spawn the {role} thread")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("the {0} thread panicked")]
    WorkerPanicked(&'static str),

    #[error("failed to write results")]
    Sink(#[from] io::Error),

    #[error("failed to encode a result")]
    Encode(#[from] serde_json::Error),
}
