//! JSON dataset file
//!
//! A dataset holds named property sets. Each property set holds named
//! properties whose values are appended row by row, and may carry a time
//! domain relating rows to points in time.

use crate::error::{IoResultExt, Result, ScaleBenchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Format version written into new datasets
pub const DATASET_VERSION: u32 = 1;

/// A single typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Integer(u64),
    Float(f64),
    IntegerArray(Vec<u64>),
    FloatArray(Vec<f64>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer_array(&self) -> Option<&[u64]> {
        match self {
            Self::IntegerArray(values) => Some(values),
            _ => None,
        }
    }

    /// Values of a numeric array, converted to floats
    pub fn to_float_array(&self) -> Option<Vec<f64>> {
        match self {
            Self::FloatArray(values) => Some(values.clone()),
            Self::IntegerArray(values) => Some(values.iter().map(|&v| v as f64).collect()),
            _ => None,
        }
    }
}

/// Relation between rows and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDomain {
    /// Origin of the time points
    pub epoch: DateTime<Utc>,
    /// Unit of the time points, e.g. "second"
    pub unit: String,
    /// One time point per row, as an offset from the epoch
    pub time_points: Vec<u64>,
}

/// Named sequence of values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub values: Vec<PropertyValue>,
}

impl Property {
    /// Append a row
    pub fn append(&mut self, value: PropertyValue) {
        self.values.push(value);
    }

    /// Replace all rows by a single value
    pub fn write(&mut self, value: PropertyValue) {
        self.values = vec![value];
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The first value, which is the only one of a constant property
    pub fn first(&self) -> Option<&PropertyValue> {
        self.values.first()
    }
}

/// Named collection of properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_domain: Option<TimeDomain>,
    pub properties: BTreeMap<String, Property>,
}

impl PropertySet {
    /// Add a new, empty property
    pub fn add_property(&mut self, name: &str, description: &str) -> Result<&mut Property> {
        if self.properties.contains_key(name) {
            return Err(ScaleBenchError::dataset(format!(
                "Property '{}' already exists",
                name
            )));
        }

        Ok(self
            .properties
            .entry(name.to_string())
            .or_insert_with(|| Property {
                description: description.to_string(),
                values: Vec::new(),
            }))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Property by name
    pub fn property(&self, name: &str) -> Result<&Property> {
        self.properties
            .get(name)
            .ok_or_else(|| ScaleBenchError::dataset(format!("Property '{}' not found", name)))
    }

    /// Text value of a constant property
    pub fn text(&self, name: &str) -> Result<&str> {
        self.property(name)?
            .first()
            .and_then(PropertyValue::as_text)
            .ok_or_else(|| ScaleBenchError::dataset(format!("Property '{}' holds no text", name)))
    }

    /// Integer value of a constant property
    pub fn integer(&self, name: &str) -> Result<u64> {
        self.property(name)?
            .first()
            .and_then(PropertyValue::as_integer)
            .ok_or_else(|| {
                ScaleBenchError::dataset(format!("Property '{}' holds no integer", name))
            })
    }
}

/// A dataset, persisted as one JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub version: u32,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    pub property_sets: BTreeMap<String, PropertySet>,
    #[serde(skip)]
    path: PathBuf,
}

impl Dataset {
    /// Create a new dataset at `path`; it must not exist yet
    pub fn create(path: &Path, description: &str) -> Result<Self> {
        if path.exists() {
            return Err(ScaleBenchError::DatasetExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }

        let dataset = Self {
            version: DATASET_VERSION,
            description: description.to_string(),
            created: Utc::now(),
            property_sets: BTreeMap::new(),
            path: path.to_path_buf(),
        };
        dataset.save()?;

        Ok(dataset)
    }

    /// Open an existing dataset
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let mut dataset: Self =
            serde_json::from_str(&content).map_err(|e| ScaleBenchError::parse(path, e))?;

        if dataset.version != DATASET_VERSION {
            return Err(ScaleBenchError::dataset(format!(
                "Unsupported dataset version {} in '{}'",
                dataset.version,
                path.display()
            )));
        }

        dataset.path = path.to_path_buf();
        Ok(dataset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the dataset to its file, replacing the previous contents at once
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ScaleBenchError::dataset(e.to_string()))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        std::fs::write(&tmp_path, json).with_path(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.path).with_path(&self.path)?;
        Ok(())
    }

    /// Save a copy of this dataset under another path, returning the copy
    pub fn save_as(&self, path: &Path) -> Result<Self> {
        let mut copy = self.clone();
        copy.path = path.to_path_buf();
        copy.save()?;
        Ok(copy)
    }

    /// Add a new, empty property set
    pub fn add_property_set(&mut self, name: &str, description: &str) -> Result<&mut PropertySet> {
        if self.property_sets.contains_key(name) {
            return Err(ScaleBenchError::dataset(format!(
                "Property set '{}' already exists",
                name
            )));
        }

        Ok(self
            .property_sets
            .entry(name.to_string())
            .or_insert_with(|| PropertySet {
                description: description.to_string(),
                ..Default::default()
            }))
    }

    pub fn contains_property_set(&self, name: &str) -> bool {
        self.property_sets.contains_key(name)
    }

    /// Property set by name
    pub fn property_set(&self, name: &str) -> Result<&PropertySet> {
        self.property_sets
            .get(name)
            .ok_or_else(|| ScaleBenchError::dataset(format!("Property set '{}' not found", name)))
    }

    /// Mutable property set by name
    pub fn property_set_mut(&mut self, name: &str) -> Result<&mut PropertySet> {
        self.property_sets
            .get_mut(name)
            .ok_or_else(|| ScaleBenchError::dataset(format!("Property set '{}' not found", name)))
    }
}
