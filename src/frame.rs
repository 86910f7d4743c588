use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use uom::si::{
    angle::{degree, radian},
    f64::Angle,
};

/// A robot end effector pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in the robot base frame.
    pub position: Vector3<f64>,

    /// Orientation in the robot base frame.
    pub rotation: UnitQuaternion<f64>,
}

impl Frame {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// Create a `Frame` at `position` with no rotation.
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Returns the x and y components of the position.
    ///
    /// Height is assigned elsewhere so it never enters a training sample.
    pub fn xy(&self) -> [f64; 2] {
        [self.position.x, self.position.y]
    }

    /// Returns the orientation as Tait-Bryan angles.
    pub fn tait_bryan(&self) -> TaitBryan {
        let (roll, pitch, yaw) = self.rotation.euler_angles();
        TaitBryan {
            yaw: Angle::new::<radian>(yaw),
            pitch: Angle::new::<radian>(pitch),
            roll: Angle::new::<radian>(roll),
        }
    }
}

/// Intrinsic z-y'-x'' rotation angles, ie `R = Rz(yaw) * Ry(pitch) * Rx(roll)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaitBryan {
    pub yaw: Angle,
    pub pitch: Angle,
    pub roll: Angle,
}

impl TaitBryan {
    pub fn from_degrees(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self {
            yaw: Angle::new::<degree>(yaw),
            pitch: Angle::new::<degree>(pitch),
            roll: Angle::new::<degree>(roll),
        }
    }

    /// Returns `[yaw, pitch, roll]` in degrees.
    pub fn degrees(&self) -> [f64; 3] {
        [
            self.yaw.get::<degree>(),
            self.pitch.get::<degree>(),
            self.roll.get::<degree>(),
        ]
    }

    pub fn to_rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(
            self.roll.get::<radian>(),
            self.pitch.get::<radian>(),
            self.yaw.get::<radian>(),
        )
    }
}
