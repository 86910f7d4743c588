use crate::{
    demo::{Batch, Move},
    error::Error,
    group::{ROTATION_SEEDS, TargetGroup},
    pair::{self, Placement},
};
use nalgebra::DMatrix;
use std::collections::BTreeMap;
use tracing::info;

/// Index of the position pair whose seeds also carry rotation samples.
const ROTATION_PAIR: usize = ROTATION_SEEDS[0] as usize / 2;

/// One row of training data, inputs first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    /// `[x_before, y_before, x_after, y_after]`
    Position([f64; 4]),
    /// `[yaw_before, pitch_before, roll_before, yaw_after, pitch_after, roll_after]` in degrees.
    Rotation([f64; 6]),
}

impl Sample {
    pub fn position(mv: &Move) -> Self {
        let [xb, yb] = mv.before.xy();
        let [xa, ya] = mv.after.xy();
        Sample::Position([xb, yb, xa, ya])
    }

    pub fn rotation(mv: &Move) -> Self {
        let [yb, pb, rb] = mv.before.tait_bryan().degrees();
        let [ya, pa, ra] = mv.after.tait_bryan().degrees();
        Sample::Rotation([yb, pb, rb, ya, pa, ra])
    }

    pub fn values(&self) -> &[f64] {
        match self {
            Sample::Position(values) => values,
            Sample::Rotation(values) => values,
        }
    }
}

/// Training samples of every group, in insertion order.
///
/// Every group of [`TargetGroup::all`] is present, even before its first sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    groups: BTreeMap<TargetGroup, Vec<Sample>>,
    batches: usize,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            groups: TargetGroup::all()
                .into_iter()
                .map(|group| (group, Vec::new()))
                .collect(),
            batches: 0,
        }
    }
}

impl Aggregate {
    /// Returns the number of batches folded into this aggregate.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn samples(&self, group: TargetGroup) -> &[Sample] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or_default()
    }

    fn push(&mut self, group: TargetGroup, sample: Sample) {
        self.groups.entry(group).or_default().push(sample);
        self.groups.entry(group.pooled()).or_default().push(sample);
    }

    /// Disambiguate every pair of `batch` and add its samples.
    fn add(&mut self, batch: &Batch) {
        for (index, (first, second)) in batch.pairs().enumerate() {
            let even = (index * 2) as u8;
            let placements = pair::order(first, second);

            self.push(
                TargetGroup::Seed(placements.0.seed(even)),
                Sample::position(first),
            );
            self.push(
                TargetGroup::Seed(placements.1.seed(even)),
                Sample::position(second),
            );

            if index == ROTATION_PAIR {
                self.add_rotations(batch, even, placements);
            }
        }
        self.batches += 1;
    }

    /// Rotation move `j` follows the placement of position move `even + j`.
    fn add_rotations(&mut self, batch: &Batch, even: u8, placements: (Placement, Placement)) {
        let [first, second] = batch.rotations();
        self.push(
            TargetGroup::Rotation(placements.0.seed(even)),
            Sample::rotation(first),
        );
        self.push(
            TargetGroup::Rotation(placements.1.seed(even)),
            Sample::rotation(second),
        );
    }

    /// Convert every group into a table, checking its width.
    pub fn tables(&self) -> Result<BTreeMap<TargetGroup, Table>, Error> {
        self.groups
            .iter()
            .map(|(group, samples)| {
                let table = Table::from_samples(*group, samples)?;
                info!("{group}.shape: ({}, {})", table.rows(), table.cols());
                Ok::<_, Error>((*group, table))
            })
            .collect()
    }
}

/// Fold `batches` into an [`Aggregate`].
///
/// Stops at the first error. Nothing is returned in that case, so a bad batch
/// never leaves some groups updated and others not.
pub fn aggregate<I>(batches: I) -> Result<Aggregate, Error>
where
    I: IntoIterator<Item = Result<Batch, Error>>,
{
    let mut aggregate = Aggregate::default();
    for batch in batches {
        aggregate.add(&batch?);
    }
    Ok(aggregate)
}

/// A group's samples as a fixed-shape matrix, one row per sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    group: TargetGroup,
    data: DMatrix<f64>,
}

impl Table {
    pub fn from_samples(group: TargetGroup, samples: &[Sample]) -> Result<Self, Error> {
        let expected = group.kind().width();
        if let Some(bad) = samples.iter().find(|s| s.values().len() != expected) {
            return Err(Error::ShapeMismatch {
                group,
                expected,
                actual: bad.values().len(),
            });
        }

        let data = DMatrix::from_row_iterator(
            samples.len(),
            expected,
            samples.iter().flat_map(|s| s.values().iter().copied()),
        );
        Ok(Self { group, data })
    }

    pub fn group(&self) -> TargetGroup {
        self.group
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Split into input and output columns at the group's input width.
    ///
    /// [`Table::from_samples`] already checked the width against the group.
    pub fn split(&self) -> (DMatrix<f64>, DMatrix<f64>) {
        let index = self.group.kind().input_width();
        (
            self.data.columns(0, index).into_owned(),
            self.data.columns(index, self.cols() - index).into_owned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        demo::{Demonstration, tests::mv},
        frame::{Frame, TaitBryan},
    };
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rstest::rstest;

    /// A batch where pairs 1 to 3 are recorded top first and pair 0 holds `pair0`.
    fn batch_with(pair0: (Move, Move)) -> Batch {
        let mut demos = vec![
            Demonstration::Position(pair0.0),
            Demonstration::Position(pair0.1),
        ];
        for i in 2..8 {
            let i = i as f64;
            demos.push(Demonstration::Position(mv((i, 0.0), (i, 1.0), 10.0 * i)));
        }
        for yaw in [10.0, 20.0] {
            let rotation = TaitBryan::from_degrees(yaw, 0.0, 0.0).to_rotation();
            let after = TaitBryan::from_degrees(yaw + 1.0, 2.0, 3.0).to_rotation();
            demos.push(Demonstration::Rotation(Move {
                before: Frame::new(Vector3::zeros(), rotation),
                after: Frame::new(Vector3::zeros(), after),
                camera: nalgebra::Point2::new(0.0, 0.0),
            }));
        }
        Batch::try_from(demos).unwrap()
    }

    fn default_batch() -> Batch {
        batch_with((mv((0.0, 0.0), (0.5, 0.5), 50.0), mv((1.0, 1.0), (1.5, 1.5), 80.0)))
    }

    #[test]
    fn lower_move_goes_to_even_seed() {
        let top = mv((1.0, 2.0), (1.1, 2.1), 50.0);
        let bottom = mv((3.0, 4.0), (3.1, 4.1), 80.0);
        let aggregate = aggregate([Ok(batch_with((top, bottom)))]).unwrap();

        assert_eq!(
            aggregate.samples(TargetGroup::Seed(0)),
            &[Sample::Position([3.0, 4.0, 3.1, 4.1])]
        );
        assert_eq!(
            aggregate.samples(TargetGroup::Seed(1)),
            &[Sample::Position([1.0, 2.0, 1.1, 2.1])]
        );
    }

    #[test]
    fn pooled_groups_collect_both_moves() {
        let aggregate = aggregate((0..3).map(|_| Ok(default_batch()))).unwrap();
        assert_eq!(aggregate.batches(), 3);
        assert_eq!(aggregate.samples(TargetGroup::AllSeeds).len(), 2 * 4 * 3);
        assert_eq!(aggregate.samples(TargetGroup::AllRotations).len(), 2 * 3);
        for seed in 0..8 {
            assert_eq!(aggregate.samples(TargetGroup::Seed(seed)).len(), 3);
        }
    }

    #[test]
    fn rotations_follow_position_pair_four() {
        // Pair (4, 5) is recorded top first, so the second rotation move is seed 4.
        let aggregate = aggregate([Ok(default_batch())]).unwrap();

        let Sample::Rotation(rot4) = aggregate.samples(TargetGroup::Rotation(4))[0] else {
            panic!("rotation_4 holds rotation samples");
        };
        let Sample::Rotation(rot5) = aggregate.samples(TargetGroup::Rotation(5))[0] else {
            panic!("rotation_5 holds rotation samples");
        };

        let expected4 = [20.0, 0.0, 0.0, 21.0, 2.0, 3.0];
        let expected5 = [10.0, 0.0, 0.0, 11.0, 2.0, 3.0];
        for i in 0..6 {
            assert_relative_eq!(rot4[i], expected4[i], epsilon = 1e-9);
            assert_relative_eq!(rot5[i], expected5[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn malformed_batch_returns_nothing() {
        let malformed = Batch::try_from(crate::demo::tests::demos(7, 2));
        assert!(malformed.is_err());

        let result = aggregate([Ok(default_batch()), malformed]);
        assert!(matches!(result, Err(Error::MalformedBatch { records: 9, .. })));
    }

    #[test]
    fn tables_have_expected_widths() {
        let tables = aggregate([Ok(default_batch())]).unwrap().tables().unwrap();
        assert_eq!(tables.len(), TargetGroup::all().len());
        for (group, table) in &tables {
            assert_eq!(table.cols(), group.kind().width());
        }
    }

    #[test]
    fn mixed_samples_are_a_shape_mismatch() {
        let samples = [
            Sample::Position([0.0; 4]),
            Sample::Rotation([0.0; 6]),
        ];
        assert!(matches!(
            Table::from_samples(TargetGroup::Seed(2), &samples),
            Err(Error::ShapeMismatch { expected: 4, actual: 6, .. })
        ));
    }

    #[test]
    fn split_at_input_width() {
        let table = Table::from_samples(
            TargetGroup::AllRotations,
            &[Sample::Rotation([1.0, 2.0, 3.0, 4.0, 5.0, 6.0])],
        )
        .unwrap();
        let (x, y) = table.split();
        assert_eq!(x.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(y.as_slice(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn empty_input_has_every_group() {
        let tables = aggregate(std::iter::empty()).unwrap().tables().unwrap();
        assert_eq!(
            tables.keys().copied().collect::<Vec<_>>(),
            TargetGroup::all()
        );
        for (group, table) in &tables {
            assert_eq!(table.rows(), 0);
            assert_eq!(table.cols(), group.kind().width());
        }
    }

    #[rstest]
    #[case(TargetGroup::Seed(3), 2)]
    #[case(TargetGroup::AllSeeds, 2)]
    #[case(TargetGroup::Rotation(4), 3)]
    #[case(TargetGroup::AllRotations, 3)]
    fn split_of_empty_table(#[case] group: TargetGroup, #[case] inputs: usize) {
        let (x, y) = Table::from_samples(group, &[]).unwrap().split();
        assert_eq!(x.shape(), (0, inputs));
        assert_eq!(y.shape(), (0, inputs));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let batches = || (0..4).map(|_| Ok(default_batch()));
        let first = aggregate(batches()).unwrap().tables().unwrap();
        let second = aggregate(batches()).unwrap().tables().unwrap();
        assert_eq!(first, second);
    }
}
