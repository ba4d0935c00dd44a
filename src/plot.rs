//! Prepared-plot payloads.
//!
//! The pipeline stops at these value types; a separate front end turns
//! them into figures. Everything a renderer needs (series, labels, axis
//! bounds, color-scale range) is carried here and in the saved files.

use chrono::NaiveDateTime;
use ndarray::Array2;

/// X axis of a series: calendar time, or hour of day for diurnal cycles.
#[derive(Debug, Clone)]
pub enum SeriesAxis {
    Time(Vec<NaiveDateTime>),
    HourOfDay(Vec<u32>),
}

#[derive(Debug, Clone)]
pub struct Series {
    /// Legend label: `Obs` or the run identifier.
    pub label: String,
    pub axis: SeriesAxis,
    pub values: Vec<Option<f32>>,
    /// Per-hour spread for diurnal series; not drawn by the current front
    /// end but carried through.
    pub std: Option<Vec<Option<f32>>>,
}

#[derive(Debug, Clone)]
pub struct TimeSeriesPlot {
    pub species: String,
    pub unit: String,
    pub diurnal: bool,
    pub series: Vec<Series>,
    pub ylim: Option<(f32, f32)>,
    pub xlim: Option<(NaiveDateTime, NaiveDateTime)>,
}

#[derive(Debug, Clone)]
pub struct MapPlot {
    pub species: String,
    pub unit: String,
    pub title: String,
    /// Colormap name for the front end: `viridis` for single-run maps,
    /// `coolwarm` for differences.
    pub cmap: String,
    pub lon: Vec<f32>,
    pub lat: Vec<f32>,
    /// Field values, dimensioned (latitude, longitude).
    pub values: Array2<f32>,
    pub vmin: Option<f32>,
    pub vmax: Option<f32>,
    /// Longitude window to draw, west to east.
    pub lon_window: (f32, f32),
    /// Latitude window to draw, south to north.
    pub lat_window: (f32, f32),
}
