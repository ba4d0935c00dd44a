//! MUMBA observation tables.
//!
//! The campaign files are tab-separated with a human-edited header of
//! known, fixed length per file. The first column is a timestamp; every
//! other column is numeric with non-numeric placeholders for missing
//! values. Tables are resampled to hourly means before use.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{Duration, NaiveDateTime, Timelike};
use log::warn;

use crate::config::Config;
use crate::error::{MumbaError, Result};
use crate::species;

/// Time-indexed observation table, one column per measured field.
#[derive(Debug, Clone, Default)]
pub struct ObsTable {
    pub times: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Vec<Option<f32>>)>,
}

impl ObsTable {
    pub fn column(&self, name: &str) -> Option<&[Option<f32>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Observation series for a species. NOx was not reported directly, so
    /// it is reconstructed from the NO and NO2 columns (missing whenever
    /// either side is missing); everything else is a single-column lookup.
    pub fn species_series(&self, species_name: &str) -> Option<Vec<Option<f32>>> {
        if species_name.to_uppercase() == "NOX" {
            let no = self.column(&species::obs_field("NO"))?;
            let no2 = self.column(&species::obs_field("NO2"))?;
            let summed = no
                .iter()
                .zip(no2)
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(a + b),
                    _ => None,
                })
                .collect();
            Some(summed)
        } else {
            self.column(&species::obs_field(species_name))
                .map(|v| v.to_vec())
        }
    }
}

/// Loads the hourly-resampled MUMBA table holding a species.
///
/// `NotObserved` is routine for species the campaign did not measure;
/// callers skip the overlay and continue.
pub fn read_mumba(species_name: &str, config: &Config) -> Result<ObsTable> {
    let fname = species::obs_file(species_name)
        .ok_or_else(|| MumbaError::NotObserved(species_name.to_string()))?;
    let n_hdr = species::header_rows(fname)?;

    let table = read_tab_file(&config.obs_dir.join(fname), n_hdr)?;

    Ok(resample_hourly(&table))
}

/// Parses a tab-separated file whose column-name row sits after `n_hdr`
/// preamble lines.
pub fn read_tab_file(path: &Path, n_hdr: usize) -> Result<ObsTable> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines().skip(n_hdr);

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| MumbaError::decode(path.display(), "missing header row"))?;
    let names: Vec<String> = header.split('\t').skip(1).map(|s| s.trim().to_string()).collect();

    let mut times = Vec::new();
    let mut columns: Vec<(String, Vec<Option<f32>>)> =
        names.into_iter().map(|n| (n, Vec::new())).collect();

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let stamp = fields.next().unwrap_or_default();
        let Some(time) = parse_timestamp(stamp) else {
            warn!("skipping row with unparseable timestamp `{stamp}`");
            continue;
        };

        times.push(time);
        for (_, values) in columns.iter_mut() {
            values.push(fields.next().and_then(parse_value));
        }
    }

    Ok(ObsTable { times, columns })
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok())
}

/// Non-numeric cells (the campaign's missing-value placeholders) read as
/// missing, never as fabricated values.
fn parse_value(s: &str) -> Option<f32> {
    s.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Averages into 60-minute bins spanning the table's time range. Bins with
/// no source rows stay explicitly empty.
pub fn resample_hourly(table: &ObsTable) -> ObsTable {
    let Some(first) = table.times.iter().min() else {
        return table.clone();
    };
    let last = table.times.iter().max().unwrap_or(first);

    let start = floor_hour(*first);
    let n_bins = ((floor_hour(*last) - start).num_hours() + 1) as usize;
    let times: Vec<NaiveDateTime> = (0..n_bins)
        .map(|h| start + Duration::hours(h as i64))
        .collect();

    let columns = table
        .columns
        .iter()
        .map(|(name, values)| {
            let mut sums = vec![0.0f64; n_bins];
            let mut counts = vec![0usize; n_bins];
            for (time, value) in table.times.iter().zip(values) {
                if let Some(v) = value {
                    let bin = (floor_hour(*time) - start).num_hours() as usize;
                    sums[bin] += f64::from(*v);
                    counts[bin] += 1;
                }
            }
            let means = sums
                .iter()
                .zip(&counts)
                .map(|(sum, &n)| (n > 0).then(|| (sum / n as f64) as f32))
                .collect();
            (name.clone(), means)
        })
        .collect();

    ObsTable { times, columns }
}

fn floor_hour(t: NaiveDateTime) -> NaiveDateTime {
    t - Duration::minutes(t.minute() as i64) - Duration::seconds(t.second() as i64)
}

// -- Tests -------------------------------------------------------------------
