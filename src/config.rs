use crate::{error::Error, filter::DEFAULT_TOLERANCE_PX, forest::ForestConfig};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

/// Settings shared by the command line tools.
///
/// Every field has a default so a config file only lists what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Demonstration batches to train on.
    pub input: PathBuf,

    /// Where the trained regressors are written.
    pub output: PathBuf,

    pub forest: ForestConfig,

    /// Largest accepted distance between the observed and predicted right
    /// camera pixel.
    pub stereo_tolerance_px: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/demos_seeds_04.json"),
            output: PathBuf::from("data/demos_seeds_04_maps.json"),
            forest: ForestConfig::default(),
            stereo_tolerance_px: DEFAULT_TOLERANCE_PX,
        }
    }
}

impl Config {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"forest": {"n_trees": 10}, "output": "maps.json"}"#).unwrap();
        assert_eq!(config.forest.n_trees, 10);
        assert_eq!(config.forest.min_samples_split, 2);
        assert_eq!(config.output, PathBuf::from("maps.json"));
        assert_eq!(config.input, Config::default().input);
        assert_eq!(config.stereo_tolerance_px, 12.0);
    }

    #[test]
    fn default_round_trips() {
        let json = serde_json::to_string_pretty(&Config::default()).unwrap();
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, Config::default());
    }
}
