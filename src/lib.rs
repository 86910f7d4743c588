//! Seed disambiguation and regression training for robot demonstrations.
//!
//! A demonstration records where the robot went on its own and where a human
//! moved it to. Batches of demonstrations are split into per-seed training
//! sets, using the camera image to tell neighbouring seeds apart, and a random
//! forest is fit for every set.
//!
//! ```no_run
//! use seedmap::prelude::*;
//!
//! let aggregate = aggregate(BatchReader::open("demos.json")?)?;
//! let tables = aggregate.tables()?;
//! let run = Trainer::new(ForestConfig::default()).train_all(tables.values())?;
//! run.models.save("maps.json")?;
//! # Ok::<(), seedmap::error::Error>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod demo;
pub mod error;
pub mod filter;
pub mod forest;
pub mod frame;
pub mod group;
pub mod pair;
pub mod trainer;

pub mod prelude {
    pub use crate::aggregate::{Aggregate, Sample, Table, aggregate};
    pub use crate::config::Config;
    pub use crate::demo::{Batch, BatchReader, Demonstration, Move};
    pub use crate::filter::{CameraParams, Observation, StereoCheck};
    pub use crate::forest::{ForestConfig, RandomForest};
    pub use crate::frame::{Frame, TaitBryan};
    pub use crate::group::{GroupKind, TargetGroup};
    pub use crate::trainer::{Models, Trainer};
}
