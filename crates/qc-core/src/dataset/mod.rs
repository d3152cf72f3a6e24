//! In-memory dataset model.
//!
//! A dataset is a set of named coordinate [`Dimension`]s and measured
//! [`Variable`]s plus deployment metadata. Every series is stored as a
//! `samples × bins` array (a plain time series is `n × 1`); missing values are
//! NaN. Flags live next to the data in an array of the same shape.
//!
//! Tests receive a [`Target`] naming one series by index and collection, and
//! mutate flags in place through [`Dataset::flags_mut`].

pub mod io;

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1, ArrayView2};
use qc_common::{DatasetId, Error, FlagCode, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use io::{load_dataset, save_dataset, DatasetFile};

/// Seconds per day; TIME is stored in serial days.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Name of the time coordinate.
pub const TIME: &str = "TIME";

/// Which collection a [`Target`] index refers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Dimension,
    Variable,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Dimension => write!(f, "dimension"),
            TargetKind::Variable => write!(f, "variable"),
        }
    }
}

/// Reference to one series of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub index: usize,
    pub kind: TargetKind,
}

impl Target {
    pub fn variable(index: usize) -> Self {
        Target {
            index,
            kind: TargetKind::Variable,
        }
    }

    pub fn dimension(index: usize) -> Self {
        Target {
            index,
            kind: TargetKind::Dimension,
        }
    }
}

/// Named coordinate axis (TIME, HEIGHT_ABOVE_SENSOR, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    /// Always `n × 1`.
    pub data: Array2<f64>,
    pub flags: Array2<FlagCode>,
}

/// Measured parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Indices into [`Dataset::dimensions`], outermost first.
    pub dimensions: Vec<usize>,
    pub data: Array2<f64>,
    pub flags: Array2<FlagCode>,
}

/// Instrument metadata consulted by frame-sensitive tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMeta {
    /// Declared velocity reference frame (`"earth"`, `"beam"`, `"instrument"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_of_reference: Option<String>,
    /// RDI `EX` coordinate-transformation byte.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_transform: Option<u8>,
}

impl InstrumentMeta {
    /// Whether velocities are in earth coordinates.
    ///
    /// Heuristic: the declared frame is checked first, then bits 3-4 of the
    /// RDI transform byte (`0b11` = earth). Anything else is treated as not
    /// earth.
    pub fn is_earth_coordinates(&self) -> bool {
        if let Some(frame) = &self.frame_of_reference {
            return frame.trim().eq_ignore_ascii_case("earth");
        }
        match self.coordinate_transform {
            Some(ex) => (ex >> 3) & 0b11 == 0b11,
            None => false,
        }
    }
}

/// Borrowed view of one target series.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub name: &'a str,
    pub data: ArrayView2<'a, f64>,
    pub flags: ArrayView2<'a, FlagCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub identity: DatasetId,
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<Variable>,
    /// Seconds the instrument samples per burst.
    pub burst_duration: Option<f64>,
    /// Seconds between burst starts.
    pub burst_interval: Option<f64>,
    pub deployment_start: Option<DateTime<Utc>>,
    pub deployment_end: Option<DateTime<Utc>>,
    pub instrument: InstrumentMeta,
}

impl Dataset {
    pub fn new(identity: impl Into<DatasetId>) -> Self {
        Dataset {
            identity: identity.into(),
            dimensions: Vec::new(),
            variables: Vec::new(),
            burst_duration: None,
            burst_interval: None,
            deployment_start: None,
            deployment_end: None,
            instrument: InstrumentMeta::default(),
        }
    }

    /// Burst sampling metadata, when both halves are present.
    pub fn burst_timing(&self) -> Option<(f64, f64)> {
        match (self.burst_duration, self.burst_interval) {
            (Some(duration), Some(interval)) => Some((duration, interval)),
            _ => None,
        }
    }

    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Index of a series by name, dimensions first.
    pub fn find(&self, name: &str) -> Option<Target> {
        self.dimension_index(name)
            .map(Target::dimension)
            .or_else(|| self.variable_index(name).map(Target::variable))
    }

    /// The time axis in serial days, searched among dimensions then variables.
    pub fn time_axis(&self) -> Option<ArrayView1<'_, f64>> {
        if let Some(dim) = self.dimensions.iter().find(|d| d.name == TIME) {
            return dim.data.columns().into_iter().next();
        }
        self.variables
            .iter()
            .find(|v| v.name == TIME)
            .and_then(|v| v.data.columns().into_iter().next())
    }

    fn check_target(&self, target: Target) -> Result<()> {
        let len = match target.kind {
            TargetKind::Dimension => self.dimensions.len(),
            TargetKind::Variable => self.variables.len(),
        };
        if target.index >= len {
            return Err(Error::IndexOutOfRange {
                kind: target.kind.to_string(),
                index: target.index,
                len,
            });
        }
        Ok(())
    }

    /// Borrow the series a target refers to.
    pub fn series(&self, target: Target) -> Result<Series<'_>> {
        self.check_target(target)?;
        Ok(match target.kind {
            TargetKind::Dimension => {
                let d = &self.dimensions[target.index];
                Series {
                    name: &d.name,
                    data: d.data.view(),
                    flags: d.flags.view(),
                }
            }
            TargetKind::Variable => {
                let v = &self.variables[target.index];
                Series {
                    name: &v.name,
                    data: v.data.view(),
                    flags: v.flags.view(),
                }
            }
        })
    }

    /// Mutable flags of the series a target refers to.
    pub fn flags_mut(&mut self, target: Target) -> Result<&mut Array2<FlagCode>> {
        self.check_target(target)?;
        Ok(match target.kind {
            TargetKind::Dimension => &mut self.dimensions[target.index].flags,
            TargetKind::Variable => &mut self.variables[target.index].flags,
        })
    }

    /// Structural checks: flag shapes match data, dimension references
    /// resolve, a variable with samples has at least one column, and a
    /// variable's sample count matches its leading dimension.
    pub fn validate(&self) -> Result<()> {
        for dim in &self.dimensions {
            if dim.data.ncols() != 1 {
                return Err(Error::InvalidInput(format!(
                    "dimension {} must be one-dimensional, got {} columns",
                    dim.name,
                    dim.data.ncols()
                )));
            }
            check_flags_shape(&dim.name, dim.data.shape(), dim.flags.shape())?;
        }
        for var in &self.variables {
            check_flags_shape(&var.name, var.data.shape(), var.flags.shape())?;
            if var.data.nrows() > 0 && var.data.ncols() == 0 {
                return Err(Error::InvalidInput(format!(
                    "variable {} has {} samples but no columns",
                    var.name,
                    var.data.nrows()
                )));
            }
            for &d in &var.dimensions {
                if d >= self.dimensions.len() {
                    return Err(Error::InvalidInput(format!(
                        "variable {} references dimension {} but only {} exist",
                        var.name,
                        d,
                        self.dimensions.len()
                    )));
                }
            }
            if let Some(&lead) = var.dimensions.first() {
                let expected = self.dimensions[lead].data.nrows();
                if var.data.nrows() != expected {
                    return Err(Error::ShapeMismatch {
                        variable: var.name.clone(),
                        what: format!("dimension {}", self.dimensions[lead].name),
                        expected: vec![expected],
                        actual: vec![var.data.nrows()],
                    });
                }
            }
        }
        if let (Some(start), Some(end)) = (self.deployment_start, self.deployment_end) {
            if end < start {
                return Err(Error::InvalidInput(format!(
                    "deployment_end {} precedes deployment_start {}",
                    end, start
                )));
            }
        }
        for (field, value) in [
            ("burst_duration", self.burst_duration),
            ("burst_interval", self.burst_interval),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::InvalidInput(format!(
                        "{} must be a non-negative number of seconds, got {}",
                        field, v
                    )));
                }
            }
        }
        Ok(())
    }

    /// SHA-256 over every series' name, shape and flag codes, dimensions
    /// first. Two runs that leave identical flags give identical digests.
    pub fn flags_digest(&self) -> String {
        let mut hasher = Sha256::new();
        let series = self
            .dimensions
            .iter()
            .map(|d| (&d.name, &d.flags))
            .chain(self.variables.iter().map(|v| (&v.name, &v.flags)));
        for (name, flags) in series {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            for &len in flags.shape() {
                hasher.update((len as u64).to_le_bytes());
            }
            for &code in flags.iter() {
                hasher.update(code.to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn check_flags_shape(name: &str, data: &[usize], flags: &[usize]) -> Result<()> {
    if data != flags {
        return Err(Error::ShapeMismatch {
            variable: name.to_string(),
            what: "flags".to_string(),
            expected: data.to_vec(),
            actual: flags.to_vec(),
        });
    }
    Ok(())
}
