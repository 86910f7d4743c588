use crate::demo::Move;

/// Where a move sits within its pair, as seen by the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Lower in the image, ie larger pixel y. Owns the even seed index.
    Bottom,
    /// Higher in the image. Owns the odd seed index.
    Top,
}

impl Placement {
    /// Returns the seed index for this placement in the pair starting at `even`.
    pub fn seed(self, even: u8) -> u8 {
        match self {
            Placement::Bottom => even,
            Placement::Top => even + 1,
        }
    }
}

/// Decide which move of a recorded pair is the bottom seed.
///
/// Compares the camera pixel y of both moves. The move with the larger y is
/// lower in the image and is the bottom seed. When both y values are equal the
/// recorded order is kept and `first` is the bottom seed.
pub fn order(first: &Move, second: &Move) -> (Placement, Placement) {
    if first.camera.y < second.camera.y {
        (Placement::Top, Placement::Bottom)
    } else {
        (Placement::Bottom, Placement::Top)
    }
}
