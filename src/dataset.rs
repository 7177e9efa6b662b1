use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::space::Point;

/// Label carried by instances that have not been labeled yet.
pub const UNLABELED: &str = "null";

/// Sentinel character every instance name must start with.
const NAME_SENTINEL: char = '@';

/// Faults raised by the data model.
#[derive(Clone, Debug, PartialEq)]
pub enum DatasetError {
    /// The instance name does not start with the `@` sentinel.
    InvalidName(String),
    /// A label update targeted a name that is not part of the dataset.
    NoSuchInstance(String),
    /// The label and location maps do not cover the same instance names.
    KeyMismatch,
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::InvalidName(name) => {
                write!(f, "invalid name '{}': instance names must start with '@'", name)
            }
            DatasetError::NoSuchInstance(name) => write!(f, "no such instance '{}'", name),
            DatasetError::KeyMismatch => {
                write!(f, "label and location maps do not cover the same instances")
            }
        }
    }
}

impl Error for DatasetError {}

/// One renderable series of the current partition: every point sharing one
/// label, ordered by instance name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<Point>,
}

/// A collection of named 2-D instances with per-instance labels.
///
/// Labels and locations always cover exactly the same instance names.
/// Locations are immutable once loaded; algorithms only reassign labels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    labels: BTreeMap<String, String>,
    locations: BTreeMap<String, Point>,
}

/// Mirror of `Dataset` that deserialization goes through so both invariants
/// are checked again at the boundary.
#[derive(Deserialize)]
struct RawDataset {
    labels: BTreeMap<String, String>,
    locations: BTreeMap<String, Point>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = DatasetError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        if raw.labels.len() != raw.locations.len()
            || !raw.labels.keys().zip(raw.locations.keys()).all(|(a, b)| a == b)
        {
            return Err(DatasetError::KeyMismatch);
        }
        for name in raw.labels.keys() {
            check_name(name)?;
        }
        Ok(Dataset {
            labels: raw.labels,
            locations: raw.locations,
        })
    }
}

fn check_name(name: &str) -> Result<(), DatasetError> {
    if name.starts_with(NAME_SENTINEL) {
        Ok(())
    } else {
        Err(DatasetError::InvalidName(name.to_string()))
    }
}

impl Dataset {
    /// Builds an empty dataset.
    pub fn new() -> Self {
        Dataset::default()
    }

    /// Builds a dataset from (name, label, location) records.
    pub fn from_records<I>(records: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (String, String, Point)>,
    {
        let mut dataset = Dataset::new();
        for (name, label, location) in records {
            dataset.insert(name, label, location)?;
        }
        Ok(dataset)
    }

    /// Adds one instance, validating its name.
    pub fn insert(
        &mut self,
        name: String,
        label: String,
        location: Point,
    ) -> Result<(), DatasetError> {
        check_name(&name)?;
        self.labels.insert(name.clone(), label);
        self.locations.insert(name, location);
        Ok(())
    }

    /// Reassigns the label of an existing instance.
    pub fn update_label(&mut self, name: &str, label: String) -> Result<(), DatasetError> {
        match self.labels.get_mut(name) {
            Some(slot) => {
                *slot = label;
                Ok(())
            }
            None => Err(DatasetError::NoSuchInstance(name.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The name-to-label map.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// The name-to-location map.
    pub fn locations(&self) -> &BTreeMap<String, Point> {
        &self.locations
    }

    /// Extracts the current partition as one series per distinct label,
    /// ordered by label.
    pub fn series(&self) -> Vec<Series> {
        let distinct: BTreeSet<&String> = self.labels.values().collect();
        distinct
            .into_iter()
            .map(|label| {
                let points = self
                    .labels
                    .iter()
                    .filter(|(_, l)| *l == label)
                    .map(|(name, _)| self.locations[name])
                    .collect();
                Series {
                    label: label.clone(),
                    points,
                }
            })
            .collect()
    }
}
