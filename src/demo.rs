use crate::{error::Error, frame::Frame};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use serde_json::{StreamDeserializer, de::IoRead};
use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

/// Number of demonstrations in one batch.
pub const BATCH_LEN: usize = 10;

/// Number of position demonstrations in one batch.
pub const POSITIONS_PER_BATCH: usize = 8;

/// Number of rotation demonstrations in one batch.
pub const ROTATIONS_PER_BATCH: usize = 2;

/// One human-guided correction of the robot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// Where the robot went on its own.
    pub before: Frame,

    /// Where the demonstrator moved it to.
    pub after: Frame,

    /// The target location in the left camera image, in pixels.
    pub camera: Point2<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Demonstration {
    #[serde(rename = "xy")]
    Position(Move),
    #[serde(rename = "rotation")]
    Rotation(Move),
}

/// One validated unit of demonstrations.
///
/// Position moves come as four pairs (0,1), (2,3), (4,5), (6,7) where each
/// pair covers two neighbouring seeds in unknown order. The two rotation moves
/// belong to the pair at index 4.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    positions: [Move; POSITIONS_PER_BATCH],
    rotations: [Move; ROTATIONS_PER_BATCH],
}

impl Batch {
    pub fn positions(&self) -> &[Move; POSITIONS_PER_BATCH] {
        &self.positions
    }

    pub fn rotations(&self) -> &[Move; ROTATIONS_PER_BATCH] {
        &self.rotations
    }

    /// Returns the position moves as pairs in recorded order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Move, &Move)> {
        self.positions.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }
}

impl TryFrom<Vec<Demonstration>> for Batch {
    type Error = Error;

    fn try_from(demos: Vec<Demonstration>) -> Result<Self, Self::Error> {
        let records = demos.len();
        let mut positions = Vec::with_capacity(POSITIONS_PER_BATCH);
        let mut rotations = Vec::with_capacity(ROTATIONS_PER_BATCH);
        for demo in demos {
            match demo {
                Demonstration::Position(mv) => positions.push(mv),
                Demonstration::Rotation(mv) => rotations.push(mv),
            }
        }

        let malformed = || Error::MalformedBatch {
            records,
            positions: positions.len(),
            rotations: rotations.len(),
        };

        if records != BATCH_LEN {
            return Err(malformed());
        }

        let (Ok(positions), Ok(rotations)) = (
            <[Move; POSITIONS_PER_BATCH]>::try_from(positions.as_slice()),
            <[Move; ROTATIONS_PER_BATCH]>::try_from(rotations.as_slice()),
        ) else {
            return Err(malformed());
        };

        Ok(Self {
            positions,
            rotations,
        })
    }
}

impl From<Batch> for Vec<Demonstration> {
    fn from(batch: Batch) -> Self {
        batch
            .positions
            .into_iter()
            .map(Demonstration::Position)
            .chain(batch.rotations.into_iter().map(Demonstration::Rotation))
            .collect()
    }
}

/// Reads a stream of batches, one JSON array of demonstrations each.
///
/// The reader is dropped as soon as the stream ends or a batch fails to
/// decode. After the first error the iterator yields nothing.
pub struct BatchReader<R: Read> {
    stream: Option<StreamDeserializer<'static, IoRead<R>, Vec<Demonstration>>>,
}

impl BatchReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> BatchReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            stream: Some(serde_json::Deserializer::from_reader(reader).into_iter()),
        }
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = Result<Batch, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.stream.as_mut()?.next() {
            Some(Ok(demos)) => Batch::try_from(demos),
            Some(Err(err)) => Err(err.into()),
            None => {
                self.stream = None;
                return None;
            }
        };

        if item.is_err() {
            self.stream = None;
        }

        Some(item)
    }
}

/// Write `batches` in the format read by [`BatchReader`].
pub fn write_batches<'a, W, I>(mut writer: W, batches: I) -> Result<(), Error>
where
    W: Write,
    I: IntoIterator<Item = &'a Batch>,
{
    for batch in batches {
        let demos: Vec<Demonstration> = batch.clone().into();
        serde_json::to_writer(&mut writer, &demos)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
