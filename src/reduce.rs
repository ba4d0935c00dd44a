//! Spatial and temporal reduction of loaded model fields.

use chrono::{Duration, NaiveDateTime, Timelike};
use ndarray::{Array2, Array3, Axis};

use crate::error::{MumbaError, Result};
use crate::punch::VariableData;

/// Grid spacing of the nested Australian domain.
pub const LON_SPACING: f32 = 0.3125;
pub const LAT_SPACING: f32 = 0.25;

/// Campaign local time is a fixed offset ahead of model time.
pub const LOCAL_OFFSET_HOURS: i64 = 10;

/// Moves a requested coordinate one gridbox in a compass direction
/// (combinations like `NW` shift both axes).
pub fn shift_coordinate(lat: f32, lon: f32, shift: &str) -> (f32, f32) {
    let shift = shift.to_uppercase();
    let mut lat = lat;
    let mut lon = lon;

    if shift.contains('W') {
        lon -= LON_SPACING;
    } else if shift.contains('E') {
        lon += LON_SPACING;
    }
    if shift.contains('S') {
        lat -= LAT_SPACING;
    } else if shift.contains('N') {
        lat += LAT_SPACING;
    }

    (lat, lon)
}

/// Index of the axis value closest to `target`. No interpolation.
pub fn nearest_index(axis: &[f32], target: f32) -> usize {
    let mut best = 0;
    for (i, value) in axis.iter().enumerate() {
        if (value - target).abs() < (axis[best] - target).abs() {
            best = i;
        }
    }

    best
}

/// Surface time series at the grid cell nearest to (lat, lon), with the
/// time axis moved to campaign local time.
pub fn cell_timeseries(
    var: &VariableData,
    lat: f32,
    lon: f32,
) -> (Vec<NaiveDateTime>, Vec<Option<f32>>) {
    let j = nearest_index(&var.grid.lat, lat);
    let i = nearest_index(&var.grid.lon, lon);

    let times = var
        .times
        .iter()
        .map(|t| *t + Duration::hours(LOCAL_OFFSET_HOURS))
        .collect();
    let values = (0..var.times.len())
        .map(|t| Some(var.values[[t, 0, j, i]]))
        .collect();

    (times, values)
}

/// Mean and sample standard deviation per hour of day.
///
/// The standard deviation is carried even where the front end only draws
/// the mean.
#[derive(Debug, Clone)]
pub struct DiurnalCycle {
    pub hours: Vec<u32>,
    pub mean: Vec<Option<f32>>,
    pub std: Vec<Option<f32>>,
}

pub fn diurnal_cycle(times: &[NaiveDateTime], values: &[Option<f32>]) -> DiurnalCycle {
    let mut bins: Vec<Vec<f64>> = vec![Vec::new(); 24];
    for (time, value) in times.iter().zip(values) {
        if let Some(v) = value {
            bins[time.hour() as usize].push(f64::from(*v));
        }
    }

    let mut mean = Vec::with_capacity(24);
    let mut std = Vec::with_capacity(24);
    for bin in &bins {
        let n = bin.len();
        if n == 0 {
            mean.push(None);
            std.push(None);
            continue;
        }
        let m = bin.iter().sum::<f64>() / n as f64;
        mean.push(Some(m as f32));
        if n > 1 {
            let var = bin.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64;
            std.push(Some(var.sqrt() as f32));
        } else {
            std.push(None);
        }
    }

    DiurnalCycle {
        hours: (0..24).collect(),
        mean,
        std,
    }
}

/// Map-mode reduction: mean over time, then the requested level(s).
/// Several levels are averaged after selection; a single level is plain
/// index selection.
pub fn map_field(var: &VariableData, levels: &[usize]) -> Result<Array2<f32>> {
    let n_levels = var.levels();
    let time_mean: Array3<f32> = var
        .values
        .mean_axis(Axis(0))
        .ok_or_else(|| MumbaError::decode(&var.name, "no time steps to average"))?;

    for &level in levels {
        if level >= n_levels {
            return Err(MumbaError::Configuration(format!(
                "level {level} out of range for {} ({n_levels} levels)",
                var.name
            )));
        }
    }

    match levels {
        [] => Err(MumbaError::Configuration(
            "no vertical level requested".to_string(),
        )),
        [level] => Ok(time_mean.index_axis(Axis(0), *level).to_owned()),
        levels => {
            let mut sum = Array2::<f32>::zeros(time_mean.index_axis(Axis(0), 0).raw_dim());
            for &level in levels {
                sum += &time_mean.index_axis(Axis(0), level);
            }
            Ok(sum / levels.len() as f32)
        }
    }
}

/// Elementwise second-minus-first difference between two runs.
pub fn difference(first: &Array2<f32>, second: &Array2<f32>) -> Array2<f32> {
    second - first
}

/// Symmetric color-scale half-width for a difference field.
pub fn half_width(diff: &Array2<f32>) -> f32 {
    diff.iter().fold(0.0f32, |m, v| m.max(v.abs()))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use crate::punch::Grid;
    use approx::assert_relative_eq;
    use ndarray::{array, Array4};

    fn time(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn should_shift_one_gridbox() {
        let (lat, lon) = shift_coordinate(-34.0, 150.0, "NW");
        assert_relative_eq!(lat, -34.0 + LAT_SPACING);
        assert_relative_eq!(lon, 150.0 - LON_SPACING);

        let (lat, lon) = shift_coordinate(-34.0, 150.0, "se");
        assert_relative_eq!(lat, -34.0 - LAT_SPACING);
        assert_relative_eq!(lon, 150.0 + LON_SPACING);
    }

    #[test]
    fn should_find_nearest_cell_without_interpolation() {
        let axis = [150.0, 150.3125, 150.625];
        assert_eq!(nearest_index(&axis, 150.4), 1);
        assert_eq!(nearest_index(&axis, 149.0), 0);
        assert_eq!(nearest_index(&axis, 151.0), 2);
    }

    #[test]
    fn should_extract_local_time_series_at_site() {
        let var = VariableData {
            name: "O3".to_string(),
            unit: "ppbv".to_string(),
            carbon: None,
            times: vec![time("2013-01-01 00:00:00"), time("2013-01-01 01:00:00")],
            grid: Grid {
                lon: vec![150.0, 150.3125],
                lat: vec![-34.5, -34.25],
            },
            values: Array4::from_shape_vec(
                (2, 1, 2, 2),
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            )
            .unwrap(),
        };

        let (times, values) = cell_timeseries(&var, -34.3, 150.25);

        // Nearest cell is (lat index 1, lon index 1)
        assert_eq!(values, vec![Some(4.0), Some(8.0)]);
        assert_eq!(times[0], time("2013-01-01 10:00:00"));
    }

    #[test]
    fn should_average_diurnal_cycle_by_hour() {
        let times = vec![
            time("2013-01-01 06:00:00"),
            time("2013-01-02 06:00:00"),
            time("2013-01-01 07:00:00"),
        ];
        let values = vec![Some(1.0), Some(3.0), Some(10.0)];

        let cycle = diurnal_cycle(&times, &values);

        assert_eq!(cycle.hours.len(), 24);
        assert_relative_eq!(cycle.mean[6].unwrap(), 2.0);
        // Sample standard deviation of [1, 3]
        assert_relative_eq!(cycle.std[6].unwrap(), std::f32::consts::SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(cycle.mean[7].unwrap(), 10.0);
        assert_eq!(cycle.std[7], None);
        assert_eq!(cycle.mean[0], None);
    }

    #[test]
    fn should_average_time_then_select_level() {
        let var = VariableData {
            name: "O3".to_string(),
            unit: "ppbv".to_string(),
            carbon: None,
            times: vec![time("2013-01-01 00:00:00"), time("2013-01-02 00:00:00")],
            grid: Grid {
                lon: vec![150.0],
                lat: vec![-34.0],
            },
            // Two times, two levels, 1x1 grid
            values: Array4::from_shape_vec((2, 2, 1, 1), vec![10.0, 100.0, 20.0, 200.0]).unwrap(),
        };

        let surface = map_field(&var, &[0]).unwrap();
        assert_relative_eq!(surface[[0, 0]], 15.0);

        let averaged = map_field(&var, &[0, 1]).unwrap();
        assert_relative_eq!(averaged[[0, 0]], (15.0 + 150.0) / 2.0);

        assert!(map_field(&var, &[5]).is_err());
    }

    #[test]
    fn should_difference_runs_and_derive_half_width() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let b = array![[0.5, 4.0], [1.0, 4.0]];

        let diff = difference(&a, &b);
        assert_relative_eq!(diff[[0, 0]], -0.5);
        assert_relative_eq!(diff[[0, 1]], 2.0);

        assert_relative_eq!(half_width(&diff), 2.0);
    }
}
