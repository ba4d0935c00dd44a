//! GEOS-Chem output loading.
//!
//! Resolves a run identifier and plot kind to the punch files to read,
//! loads the requested category/species subset through the [`PunchRead`]
//! seam, concatenates multi-file loads along time, and sums constituent
//! tracers for aggregate species.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use log::warn;
use ndarray::{concatenate, Axis};

use crate::error::{MumbaError, Result};
use crate::punch::{PunchRead, VariableData};
use crate::species;

const TS_PREFIX: &str = "ts";
const TS_SUFFIX: &str = ".bpch";
// The averaging-file naming is part of the archive convention and must
// match existing run directories exactly.
const MAP_PREFIX: &str = "trac_avg.geosfp_025x03125_tropchem_au.";
const MAP_SUFFIX: &str = "0000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Timeseries,
    Map,
}

impl FromStr for PlotKind {
    type Err = MumbaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ts" | "timeseries" => Ok(PlotKind::Timeseries),
            "map" => Ok(PlotKind::Map),
            other => Err(MumbaError::UnsupportedPlotKind(other.to_string())),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotKind::Timeseries => write!(f, "timeseries"),
            PlotKind::Map => write!(f, "map"),
        }
    }
}

/// Which punch files to read out of a run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSpec {
    /// All files matching `prefix*suffix`.
    Wildcard { prefix: String, suffix: String },
    /// An explicit list of file names.
    Explicit(Vec<String>),
}

/// File names for a plot kind. A date range yields one file per calendar
/// day in the inclusive range; without one the whole run is read.
pub fn file_names(kind: PlotKind, daterange: Option<(NaiveDate, NaiveDate)>) -> FileSpec {
    let (prefix, suffix) = match kind {
        PlotKind::Timeseries => (TS_PREFIX, TS_SUFFIX),
        PlotKind::Map => (MAP_PREFIX, MAP_SUFFIX),
    };

    match daterange {
        Some((start, end)) => {
            let mut names = Vec::new();
            let mut day = start;
            while day <= end {
                names.push(format!("{prefix}{}{suffix}", day.format("%Y%m%d")));
                day += Duration::days(1);
            }
            FileSpec::Explicit(names)
        }
        None => FileSpec::Wildcard {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        },
    }
}

/// Resolves a [`FileSpec`] against a run directory. Names are sorted
/// lexically, which for the zero-padded date names is chronological.
pub fn resolve_files(run_dir: &Path, spec: &FileSpec) -> Result<Vec<PathBuf>> {
    let mut names = match spec {
        FileSpec::Explicit(names) => names.clone(),
        FileSpec::Wildcard { prefix, suffix } => {
            let mut names = Vec::new();
            for entry in fs::read_dir(run_dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with(prefix.as_str()) && name.ends_with(suffix.as_str()) {
                    names.push(name);
                }
            }
            if names.is_empty() {
                return Err(MumbaError::decode(
                    run_dir.display(),
                    format!("no punch files matching {prefix}*{suffix}"),
                ));
            }
            names
        }
    };

    names.sort();

    Ok(names.into_iter().map(|n| run_dir.join(n)).collect())
}

/// Loads one species for one run: resolve files, read every constituent
/// tracer over the same subset, then sum aggregates.
pub fn load_run<D: PunchRead + ?Sized>(
    decoder: &D,
    run_dir: &Path,
    kind: PlotKind,
    category: &str,
    species_name: &str,
    daterange: Option<(NaiveDate, NaiveDate)>,
) -> Result<VariableData> {
    let files = resolve_files(run_dir, &file_names(kind, daterange))?;
    load_files(decoder, &files, category, species_name)
}

/// Loads and combines a species from an explicit, ordered file list.
pub fn load_files<D: PunchRead + ?Sized>(
    decoder: &D,
    files: &[PathBuf],
    category: &str,
    species_name: &str,
) -> Result<VariableData> {
    let fields = species::model_constituents(species_name);

    // One read per file; time order follows file order
    let mut per_field: Vec<Vec<VariableData>> = (0..fields.len()).map(|_| Vec::new()).collect();
    for file in files {
        for (idx, var) in decoder
            .read_file(file, category, &fields)?
            .into_iter()
            .enumerate()
        {
            per_field[idx].push(var);
        }
    }

    let constituents = per_field
        .into_iter()
        .map(concat_time)
        .collect::<Result<Vec<_>>>()?;

    sum_constituents(constituents, species_name)
}

/// Concatenates one variable's per-file loads along the time dimension.
fn concat_time(mut parts: Vec<VariableData>) -> Result<VariableData> {
    if parts.is_empty() {
        return Err(MumbaError::Configuration(
            "no variables loaded".to_string(),
        ));
    }
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }

    let first = &parts[0];

    if parts.iter().any(|p| p.grid != first.grid) {
        return Err(MumbaError::decode(
            &first.name,
            "grid differs between punch files",
        ));
    }

    let views: Vec<_> = parts.iter().map(|p| p.values.view()).collect();
    let values = concatenate(Axis(0), &views)
        .map_err(|e| MumbaError::decode(&first.name, e.to_string()))?;
    let times = parts.iter().flat_map(|p| p.times.clone()).collect();

    let last = parts.last().unwrap_or(first);

    Ok(VariableData {
        name: first.name.clone(),
        unit: last.unit.clone(),
        carbon: last.carbon,
        times,
        grid: first.grid.clone(),
        values,
    })
}

/// Sums constituent tracers elementwise into the aggregate species.
///
/// Coordinates and attributes come from the last constituent; that choice
/// is arbitrary for derived quantities, so it is surfaced loudly.
fn sum_constituents(mut vars: Vec<VariableData>, species_name: &str) -> Result<VariableData> {
    let Some(mut combined) = vars.pop() else {
        return Err(MumbaError::Configuration(format!(
            "species {species_name} resolved to no tracers"
        )));
    };

    if !vars.is_empty() {
        for var in &vars {
            if var.values.shape() != combined.values.shape() {
                return Err(MumbaError::decode(
                    species_name,
                    format!(
                        "constituent {} has shape {:?}, expected {:?}",
                        var.name,
                        var.values.shape(),
                        combined.values.shape()
                    ),
                ));
            }
            combined.values += &var.values;
        }
        warn!(
            "attributes for {} taken from GEOS-Chem species {}; \
             double-check that this is appropriate for your application",
            species_name, combined.name
        );
    }

    combined.name = species_name.to_string();

    Ok(combined)
}

// -- Tests -------------------------------------------------------------------
