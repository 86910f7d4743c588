use crate::{
    aggregate::Table,
    error::Error,
    forest::{ForestConfig, ForestError, RandomForest, mean_squared_error},
    group::TargetGroup,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::info;

/// In-sample fit quality of one group's regressor.
///
/// Measured on the same rows the forest was trained on, so it is optimistic
/// and says nothing about generalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitReport {
    pub group: TargetGroup,
    pub rows: usize,
    /// Mean squared Euclidean error between targets and predictions.
    pub mse: f64,
}

/// Trained regressors by group. This is the artifact written at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Models(BTreeMap<TargetGroup, RandomForest>);

impl Models {
    pub fn get(&self, group: TargetGroup) -> Option<&RandomForest> {
        self.0.get(&group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &TargetGroup> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, group: TargetGroup, forest: RandomForest) {
        self.0.insert(group, forest);
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

pub struct TrainingRun {
    pub models: Models,
    pub reports: Vec<FitReport>,
}

pub struct Trainer {
    config: ForestConfig,
}

impl Trainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Fit a forest on `table`, inputs being the group's leading columns.
    pub fn train(&self, table: &Table) -> Result<(RandomForest, FitReport), Error> {
        let group = table.group();
        let kind = group.kind();
        if table.cols() != kind.width() {
            return Err(Error::ShapeMismatch {
                group,
                expected: kind.width(),
                actual: table.cols(),
            });
        }

        let (x, y) = table.split();
        let forest = RandomForest::fit(&x, &y, &self.config).map_err(|err| match err {
            ForestError::NotEnoughSamples { rows, required } => Error::InsufficientData {
                group,
                rows,
                required,
            },
            other => Error::Forest(other),
        })?;

        let predicted = forest.predict(&x)?;
        let mse = mean_squared_error(&predicted, &y);
        info!("{group}, avg(|| ytarg-ypred ||_2^2) = {mse:.7}");

        Ok((
            forest,
            FitReport {
                group,
                rows: table.rows(),
                mse,
            },
        ))
    }

    /// Train every table in order, stopping at the first failure.
    pub fn train_all<'a, I>(&self, tables: I) -> Result<TrainingRun, Error>
    where
        I: IntoIterator<Item = &'a Table>,
    {
        let mut models = Models::default();
        let mut reports = Vec::new();
        for table in tables {
            let (forest, report) = self.train(table)?;
            models.insert(table.group(), forest);
            reports.push(report);
        }
        Ok(TrainingRun { models, reports })
    }
}
