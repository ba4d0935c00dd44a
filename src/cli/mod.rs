//! Command line interface.

pub mod command;

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{command, Args, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::cli::command::map::{LAT_WINDOW, LON_WINDOW};
use crate::cli::command::timeseries::{SITE_LAT, SITE_LON};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    /// Configuration file (defaults to ~/.mumba.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prepare a site time-series comparison against the MUMBA data
    Timeseries(TimeseriesArgs),
    /// Prepare a concentration map for one run, or a two-run difference
    Map(MapArgs),
    /// Download the MUMBA observation files
    FetchObs {},
}

#[derive(Args, Debug)]
pub struct TimeseriesArgs {
    /// Species name, e.g. O3, NOX, ISOP
    #[arg(short, long)]
    pub species: String,

    /// Diagnostic category to read
    #[arg(long, default_value = "IJ-AVG-$")]
    pub category: String,

    /// Model runs to overlay
    #[arg(short, long, default_value = "base", value_delimiter = ',')]
    pub runs: Vec<String>,

    /// Site latitude
    #[arg(long, default_value_t = SITE_LAT)]
    pub lat: f32,

    /// Site longitude
    #[arg(long, default_value_t = SITE_LON)]
    pub lon: f32,

    /// Sample the adjacent gridbox instead, e.g. N, SW
    #[arg(long)]
    pub shift: Option<String>,

    /// First date to read (YYYY-MM-DD); requires --end
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to read, inclusive; requires --start
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Lower y-axis bound (defaults to 0 when --ymax is given)
    #[arg(long)]
    pub ymin: Option<f32>,

    /// Upper y-axis bound
    #[arg(long)]
    pub ymax: Option<f32>,

    /// Skip the observation overlay
    #[arg(long)]
    pub no_obs: bool,

    /// Collapse to a mean diurnal cycle
    #[arg(long)]
    pub diurnal: bool,

    /// Keep the full observation span on the axis instead of the model span
    #[arg(long)]
    pub all_dates: bool,
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Species name, e.g. O3, NOX, ISOP
    #[arg(short, long)]
    pub species: String,

    /// Diagnostic category to read
    #[arg(long, default_value = "IJ-AVG-$")]
    pub category: String,

    /// One run for a plain map, two for a difference (second minus first)
    #[arg(short, long, default_value = "base", value_delimiter = ',')]
    pub runs: Vec<String>,

    /// Vertical level(s); several are averaged
    #[arg(short, long, default_value = "0", value_delimiter = ',')]
    pub levels: Vec<usize>,

    /// First date to read (YYYY-MM-DD); requires --end
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to read, inclusive; requires --start
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Color-scale maximum (derived from the data when omitted)
    #[arg(long)]
    pub vmax: Option<f32>,

    /// Western edge of the drawn window
    #[arg(long, default_value_t = LON_WINDOW.0)]
    pub lon_min: f32,

    /// Eastern edge of the drawn window
    #[arg(long, default_value_t = LON_WINDOW.1)]
    pub lon_max: f32,

    /// Southern edge of the drawn window
    #[arg(long, default_value_t = LAT_WINDOW.0)]
    pub lat_min: f32,

    /// Northern edge of the drawn window
    #[arg(long, default_value_t = LAT_WINDOW.1)]
    pub lat_max: f32,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}
