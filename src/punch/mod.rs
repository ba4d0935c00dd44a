//! GEOS-Chem binary punch ("bpch") collaborator.
//!
//! The rest of the pipeline only depends on the [`PunchRead`] seam and the
//! value types here; `bpch.rs` is the concrete decoder and `metadata.rs`
//! parses the `tracerinfo.dat` / `diaginfo.dat` files that accompany the
//! punch output in each run directory.

pub mod bpch;
pub mod metadata;

use std::path::Path;

use chrono::NaiveDateTime;
use ndarray::Array4;

use crate::error::Result;

pub use bpch::BpchDecoder;
pub use metadata::{DiagTable, TracerTable};

/// Cell-center coordinate axes of a (sub)grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub lon: Vec<f32>,
    pub lat: Vec<f32>,
}

/// One model variable, fully materialised.
///
/// `values` is dimensioned (time, level, latitude, longitude).
#[derive(Debug, Clone)]
pub struct VariableData {
    pub name: String,
    pub unit: String,
    /// Nominal carbon number for per-carbon tracers; `None` when the
    /// metadata carried no value.
    pub carbon: Option<f32>,
    pub times: Vec<NaiveDateTime>,
    pub grid: Grid,
    pub values: Array4<f32>,
}

impl VariableData {
    pub fn levels(&self) -> usize {
        self.values.shape()[1]
    }
}

/// Reads a named subset of variables out of one punch file.
///
/// Implementations return the variables in the order requested and fail
/// with a decode error when a requested variable is absent.
pub trait PunchRead {
    fn read_file(&self, path: &Path, category: &str, fields: &[String])
        -> Result<Vec<VariableData>>;
}
