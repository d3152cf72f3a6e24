//! JSON interchange for datasets.
//!
//! ```json
//! {
//!   "identity": "mooring/ADCP_2019.nc",
//!   "burst_duration": 60, "burst_interval": 900,
//!   "instrument": {"frame_of_reference": "earth"},
//!   "dimensions": [{"name": "TIME", "data": [737000.0, 737000.0007]}],
//!   "variables": [
//!     {"name": "TEMP", "dimensions": ["TIME"], "data": [12.1, null], "flags": [0, 0]}
//!   ]
//! }
//! ```
//!
//! `null` is a missing value. Profile variables use nested arrays
//! (`samples × bins`). Omitted flags start at the active flag set's raw code.
//! A missing `identity` falls back to the path the file was read from.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use qc_common::{DatasetId, Error, FlagCode, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Dataset, Dimension, InstrumentMeta, Variable};

/// A 1-D series or a `samples × bins` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values<T> {
    Series(Vec<T>),
    Table(Vec<Vec<T>>),
}

impl<T: Clone> Values<T> {
    fn into_array(self, name: &str) -> Result<Array2<T>> {
        match self {
            Values::Series(v) => {
                let n = v.len();
                Array2::from_shape_vec((n, 1), v)
                    .map_err(|e| Error::InvalidInput(format!("{}: {}", name, e)))
            }
            Values::Table(rows) => {
                let nrows = rows.len();
                let ncols = rows.first().map(Vec::len).unwrap_or(0);
                if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
                    return Err(Error::InvalidInput(format!(
                        "{}: row {} has {} values, expected {}",
                        name,
                        i,
                        row.len(),
                        ncols
                    )));
                }
                let flat: Vec<T> = rows.into_iter().flatten().collect();
                Array2::from_shape_vec((nrows, ncols), flat)
                    .map_err(|e| Error::InvalidInput(format!("{}: {}", name, e)))
            }
        }
    }

    fn from_array(array: &Array2<T>) -> Self {
        if array.ncols() == 1 {
            Values::Series(array.column(0).to_vec())
        } else {
            Values::Table(array.rows().into_iter().map(|r| r.to_vec()).collect())
        }
    }
}

fn decode_missing(values: Values<Option<f64>>, name: &str) -> Result<Array2<f64>> {
    Ok(values.into_array(name)?.mapv(|v| v.unwrap_or(f64::NAN)))
}

fn encode_missing(array: &Array2<f64>) -> Values<Option<f64>> {
    Values::from_array(&array.mapv(|v| if v.is_finite() { Some(v) } else { None }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionRecord {
    pub name: String,
    pub data: Values<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Values<FlagCode>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    /// Dimension names, outermost first.
    #[serde(default)]
    pub dimensions: Vec<String>,
    pub data: Values<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Values<FlagCode>>,
}

/// On-disk form of a [`Dataset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instrument: InstrumentMeta,
    #[serde(default)]
    pub dimensions: Vec<DimensionRecord>,
    #[serde(default)]
    pub variables: Vec<VariableRecord>,
}

impl DatasetFile {
    /// Build and validate the in-memory dataset.
    pub fn into_dataset(self, fallback_identity: &str, raw_code: FlagCode) -> Result<Dataset> {
        let flags_or_raw = |flags: Option<Values<FlagCode>>, data: &Array2<f64>, name: &str| {
            match flags {
                Some(f) => f.into_array(name),
                None => Ok(Array2::from_elem(data.raw_dim(), raw_code)),
            }
        };

        let mut dimensions = Vec::with_capacity(self.dimensions.len());
        for rec in self.dimensions {
            let data = decode_missing(rec.data, &rec.name)?;
            let flags = flags_or_raw(rec.flags, &data, &rec.name)?;
            dimensions.push(Dimension {
                name: rec.name,
                data,
                flags,
            });
        }

        let mut variables = Vec::with_capacity(self.variables.len());
        for rec in self.variables {
            let dims = rec
                .dimensions
                .iter()
                .map(|d| {
                    dimensions.iter().position(|x| &x.name == d).ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "variable {} references unknown dimension {}",
                            rec.name, d
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let data = decode_missing(rec.data, &rec.name)?;
            let flags = flags_or_raw(rec.flags, &data, &rec.name)?;
            variables.push(Variable {
                name: rec.name,
                dimensions: dims,
                data,
                flags,
            });
        }

        let identity = self
            .identity
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback_identity.to_string());

        let dataset = Dataset {
            identity: DatasetId::new(identity),
            dimensions,
            variables,
            burst_duration: self.burst_duration,
            burst_interval: self.burst_interval,
            deployment_start: self.deployment_start,
            deployment_end: self.deployment_end,
            instrument: self.instrument,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        DatasetFile {
            identity: Some(dataset.identity.to_string()),
            burst_duration: dataset.burst_duration,
            burst_interval: dataset.burst_interval,
            deployment_start: dataset.deployment_start,
            deployment_end: dataset.deployment_end,
            instrument: dataset.instrument.clone(),
            dimensions: dataset
                .dimensions
                .iter()
                .map(|d| DimensionRecord {
                    name: d.name.clone(),
                    data: encode_missing(&d.data),
                    flags: Some(Values::from_array(&d.flags)),
                })
                .collect(),
            variables: dataset
                .variables
                .iter()
                .map(|v| VariableRecord {
                    name: v.name.clone(),
                    dimensions: v
                        .dimensions
                        .iter()
                        .map(|&i| dataset.dimensions[i].name.clone())
                        .collect(),
                    data: encode_missing(&v.data),
                    flags: Some(Values::from_array(&v.flags)),
                })
                .collect(),
        }
    }
}

/// Read a dataset JSON file.
pub fn load_dataset(path: &Path, raw_code: FlagCode) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)?;
    let file: DatasetFile = serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
    file.into_dataset(&path.display().to_string(), raw_code)
}

/// Write a dataset as pretty JSON, replacing the file atomically.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&DatasetFile::from_dataset(dataset))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
