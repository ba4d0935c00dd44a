//! Site time-series comparison.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    cli::{create_spinner, TimeseriesArgs},
    config::Config,
    error::MumbaError,
    parquet,
    plot::{Series, SeriesAxis, TimeSeriesPlot},
    punch::BpchDecoder,
    reading::{model, mumba, ObsTable, PlotKind},
    reduce::{self, DiurnalCycle},
    species, units,
};

use super::{date_range, make_output_file_name};

/// The MUMBA container site at Wollongong.
pub const SITE_LAT: f32 = -34.3972;
pub const SITE_LON: f32 = 150.8996;

pub fn timeseries(args: &TimeseriesArgs, config: &Config) -> Result<String> {
    let daterange = date_range(args.start, args.end)?;
    let mut series = Vec::new();

    // Observation overlay; species the campaign never measured are routine
    if !args.no_obs {
        match obs_series(&args.species, args.diurnal, config) {
            Ok(obs) => series.push(obs),
            Err(MumbaError::NotObserved(name)) => {
                println!("No MUMBA data for species {name}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Sample the adjacent gridbox if asked
    let (lat, lon) = match &args.shift {
        Some(shift) => reduce::shift_coordinate(args.lat, args.lon, shift),
        None => (args.lat, args.lon),
    };

    let mut unit = String::new();
    let mut model_span: Option<(NaiveDateTime, NaiveDateTime)> = None;

    for run in &args.runs {
        let run_dir = config.run_dir(run);
        let decoder = BpchDecoder::for_run_dir(&run_dir)?;

        let bar = create_spinner(format!("Reading run {run}..."));
        let mut var = model::load_run(
            &decoder,
            &run_dir,
            PlotKind::Timeseries,
            &args.category,
            &args.species,
            daterange,
        )?;
        bar.finish_with_message(format!("Run {run} read"));

        units::convert(&mut var, &args.species);
        unit = var.unit.clone();

        let (times, values) = reduce::cell_timeseries(&var, lat, lon);
        if let (Some(&first), Some(&last)) = (times.first(), times.last()) {
            let span = model_span.get_or_insert((first, last));
            span.0 = span.0.min(first);
            span.1 = span.1.max(last);
        }

        series.push(run_series(run, &times, &values, args.diurnal));
    }

    let plot = TimeSeriesPlot {
        species: args.species.to_uppercase(),
        unit,
        diurnal: args.diurnal,
        series,
        ylim: axis_bounds(args.ymin, args.ymax),
        xlim: time_window(args.diurnal, args.all_dates, daterange, model_span),
    };

    let path = make_output_file_name("timeseries", &args.species);
    parquet::save_timeseries(&plot, &path)?;

    Ok(path.to_string_lossy().to_string())
}

fn obs_series(
    species_name: &str,
    diurnal: bool,
    config: &Config,
) -> crate::error::Result<Series> {
    let table = mumba::read_mumba(species_name, config)?;

    if diurnal {
        let cycle = obs_diurnal_cycle(&table, species_name)?;
        Ok(Series {
            label: "Obs".to_string(),
            axis: SeriesAxis::HourOfDay(cycle.hours),
            values: cycle.mean,
            std: Some(cycle.std),
        })
    } else {
        let values = table.species_series(species_name).ok_or_else(|| {
            MumbaError::Configuration(format!(
                "MUMBA file has no column for species {species_name}"
            ))
        })?;
        Ok(Series {
            label: "Obs".to_string(),
            axis: SeriesAxis::Time(table.times),
            values,
            std: None,
        })
    }
}

/// Hour-of-day cycle of the observed series. NOx is summed from the NO and
/// NO2 cycles after averaging, so each column's gaps are skipped
/// independently before the two means are added.
fn obs_diurnal_cycle(table: &ObsTable, species_name: &str) -> crate::error::Result<DiurnalCycle> {
    if species_name.to_uppercase() != "NOX" {
        return column_cycle(table, species_name);
    }

    let no = column_cycle(table, "NO")?;
    let no2 = column_cycle(table, "NO2")?;
    let mean = no
        .mean
        .iter()
        .zip(&no2.mean)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        })
        .collect();

    // The per-column spreads have no meaningful sum
    Ok(DiurnalCycle {
        hours: no.hours,
        mean,
        std: vec![None; 24],
    })
}

fn column_cycle(table: &ObsTable, species_name: &str) -> crate::error::Result<DiurnalCycle> {
    let values = table.column(&species::obs_field(species_name)).ok_or_else(|| {
        MumbaError::Configuration(format!(
            "MUMBA file has no column for species {species_name}"
        ))
    })?;

    Ok(reduce::diurnal_cycle(&table.times, values))
}

fn run_series(run: &str, times: &[NaiveDateTime], values: &[Option<f32>], diurnal: bool) -> Series {
    if diurnal {
        let cycle = reduce::diurnal_cycle(times, values);
        Series {
            label: run.to_string(),
            axis: SeriesAxis::HourOfDay(cycle.hours),
            values: cycle.mean,
            std: Some(cycle.std),
        }
    } else {
        Series {
            label: run.to_string(),
            axis: SeriesAxis::Time(times.to_vec()),
            values: values.to_vec(),
            std: None,
        }
    }
}

/// Lower bound defaults to zero once an upper bound is given.
fn axis_bounds(ymin: Option<f32>, ymax: Option<f32>) -> Option<(f32, f32)> {
    ymax.map(|max| (ymin.unwrap_or(0.0), max))
}

/// The drawn time window: the requested date range when given, otherwise
/// the model span unless the caller wants every observation date.
fn time_window(
    diurnal: bool,
    all_dates: bool,
    daterange: Option<(NaiveDate, NaiveDate)>,
    model_span: Option<(NaiveDateTime, NaiveDateTime)>,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    if diurnal {
        return None;
    }
    if let Some((start, end)) = daterange {
        return Some((
            start.and_hms_opt(0, 0, 0).unwrap(),
            end.and_hms_opt(0, 0, 0).unwrap(),
        ));
    }
    if all_dates {
        return None;
    }

    model_span
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    fn time(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn should_default_lower_axis_bound_to_zero() {
        assert_eq!(axis_bounds(None, Some(50.0)), Some((0.0, 50.0)));
        assert_eq!(axis_bounds(Some(10.0), Some(50.0)), Some((10.0, 50.0)));
        // A lone lower bound is not enough to fix the axis
        assert_eq!(axis_bounds(Some(10.0), None), None);
    }

    #[test]
    fn should_prefer_requested_date_range_for_time_window() {
        let daterange = Some((
            NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2013, 1, 31).unwrap(),
        ));
        let span = Some((time("2013-01-05 00:00:00"), time("2013-01-06 00:00:00")));

        let window = time_window(false, false, daterange, span).unwrap();
        assert_eq!(window.0, time("2013-01-01 00:00:00"));
        assert_eq!(window.1, time("2013-01-31 00:00:00"));

        // Without a range, clamp to the model span
        assert_eq!(time_window(false, false, None, span), span);
        // Unless every observation date was asked for
        assert_eq!(time_window(false, true, None, span), None);
        // Diurnal axes are hours, not dates
        assert_eq!(time_window(true, false, daterange, span), None);
    }

    #[test]
    fn should_sum_nox_diurnal_means_after_averaging() {
        let table = ObsTable {
            times: vec![
                time("2013-01-01 06:00:00"),
                time("2013-01-02 06:00:00"),
            ],
            columns: vec![
                ("NO [ppbv]".to_string(), vec![Some(1.0), Some(3.0)]),
                ("NO2 [ppbv]".to_string(), vec![Some(10.0), None]),
            ],
        };

        let cycle = obs_diurnal_cycle(&table, "NOX").unwrap();

        // Each column averages over its own readings first: NO gives 2.0
        // across both days, NO2 gives 10.0 with the gap skipped
        assert_eq!(cycle.mean[6], Some(12.0));
        assert_eq!(cycle.mean[0], None);
        assert_eq!(cycle.std[6], None);
    }

    #[test]
    fn should_collapse_run_series_to_diurnal_cycle() {
        let times = vec![
            time("2013-01-01 06:00:00"),
            time("2013-01-02 06:00:00"),
        ];
        let values = vec![Some(1.0), Some(3.0)];

        let series = run_series("base", &times, &values, true);

        assert_eq!(series.label, "base");
        let SeriesAxis::HourOfDay(hours) = &series.axis else {
            panic!("expected hour-of-day axis");
        };
        assert_eq!(hours.len(), 24);
        assert_eq!(series.values[6], Some(2.0));
        assert!(series.std.is_some());
    }
}
