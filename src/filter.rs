use crate::{error::Error, frame::Frame};
use nalgebra::{Matrix3x2, Point2, RowVector3};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};
use thiserror::Error;
use tracing::{debug, info};

/// Returns `true` for the `(-1, -1)` placeholder written when a camera did
/// not detect the circle center.
pub fn is_missing(pixel: &Point2<f64>) -> bool {
    pixel.x == -1.0 && pixel.y == -1.0
}

/// Pixel distance of roughly one millimeter in the workspace.
pub const DEFAULT_TOLERANCE_PX: f64 = 12.0;

/// Name of the recording inside each trajectory directory.
pub const TRAJECTORY_FILE: &str = "traj_poses_list.json";

/// A robot pose with the target seen from both stereo cameras.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub pose: Frame,
    pub left: Point2<f64>,
    pub right: Point2<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ObservationError {
    #[error("target was not detected by both cameras")]
    MissingPoint,
    #[error("right pixel is {distance:.2} px from the left camera's prediction (tolerance {tolerance})")]
    StereoMismatch { distance: f64, tolerance: f64 },
}

/// Stereo calibration parameters needed by the filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// Affine map from homogeneous left pixels to right pixels, as 3 rows of 2.
    pub theta_l2r: [[f64; 2]; 3],
}

impl CameraParams {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    pub fn left_to_right(&self) -> Matrix3x2<f64> {
        Matrix3x2::from_row_slice(self.theta_l2r.as_flattened())
    }
}

/// Cross checks the left camera against the right camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoCheck {
    theta_l2r: Matrix3x2<f64>,
    tolerance_px: f64,
}

impl StereoCheck {
    pub fn new(theta_l2r: Matrix3x2<f64>, tolerance_px: f64) -> Self {
        Self {
            theta_l2r,
            tolerance_px,
        }
    }

    /// Predict where the right camera should see a left camera pixel.
    pub fn predict_right(&self, left: &Point2<f64>) -> Point2<f64> {
        let right = RowVector3::new(left.x, left.y, 1.0) * self.theta_l2r;
        Point2::new(right[0], right[1])
    }

    /// Returns the distance between the observed and predicted right pixel
    /// if `obs` is clean.
    pub fn check(&self, obs: &Observation) -> Result<f64, ObservationError> {
        if is_missing(&obs.left) || is_missing(&obs.right) {
            return Err(ObservationError::MissingPoint);
        }

        let distance = nalgebra::distance(&obs.right, &self.predict_right(&obs.left));
        if distance >= self.tolerance_px {
            return Err(ObservationError::StereoMismatch {
                distance,
                tolerance: self.tolerance_px,
            });
        }

        Ok(distance)
    }

    /// Keep the clean observations of one trajectory, in order.
    pub fn filter<'a, I>(&self, observations: I) -> Vec<Observation>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        observations
            .into_iter()
            .enumerate()
            .filter_map(|(i, obs)| match self.check(obs) {
                Ok(distance) => {
                    debug!("{i:03}  CLEAN : {obs:?} (dist {distance:.3})");
                    Some(*obs)
                }
                Err(err) => {
                    debug!("{i:03}        : {obs:?} ({err})");
                    None
                }
            })
            .collect()
    }
}

/// Filter every `traj_*` directory under `root`, in name order.
///
/// Each directory must hold a [`TRAJECTORY_FILE`] with more than one
/// observation. Dropped observations are logged, never fatal.
pub fn filter_trajectories<P: AsRef<Path>>(
    root: P,
    check: &StereoCheck,
) -> Result<Vec<Observation>, Error> {
    let entries = fs::read_dir(root)?.collect::<Result<Vec<_>, _>>()?;
    let mut dirs: Vec<_> = entries
        .into_iter()
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| entry.file_name().to_string_lossy().contains("traj_"))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    info!("found {} trajectory directories", dirs.len());

    let mut clean = Vec::new();
    for dir in dirs {
        let file = File::open(dir.join(TRAJECTORY_FILE))?;
        let raw: Vec<Observation> = serde_json::from_reader(BufReader::new(file))?;
        if raw.len() < 2 {
            return Err(Error::ShortTrajectory {
                dir,
                len: raw.len(),
            });
        }

        let kept = check.filter(&raw);
        info!(
            "dir {}, len(raw_data) {}, len(clean_data) {}",
            dir.display(),
            raw.len(),
            kept.len()
        );
        clean.extend(kept);
    }

    info!("returning clean data with {} elements", clean.len());
    Ok(clean)
}
