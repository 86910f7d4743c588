use crate::{forest::ForestError, group::TargetGroup};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "expected a batch of 10 demonstrations (8 xy, 2 rotation) but got {records} ({positions} xy, {rotations} rotation)"
    )]
    MalformedBatch {
        records: usize,
        positions: usize,
        rotations: usize,
    },

    #[error("expected {expected} columns for {group} but got {actual}")]
    ShapeMismatch {
        group: TargetGroup,
        expected: usize,
        actual: usize,
    },

    #[error("{group} has {rows} samples but at least {required} are needed to fit a regressor")]
    InsufficientData {
        group: TargetGroup,
        rows: usize,
        required: usize,
    },

    #[error("{} holds {len} observations but a trajectory needs at least 2", .dir.display())]
    ShortTrajectory { dir: PathBuf, len: usize },

    #[error(transparent)]
    Forest(#[from] ForestError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
