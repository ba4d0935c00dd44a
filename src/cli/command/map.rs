//! Concentration and difference maps.

use anyhow::Result;
use chrono::NaiveDate;
use ndarray::Array2;

use crate::{
    cli::{create_spinner, MapArgs},
    config::Config,
    error::MumbaError,
    parquet,
    plot::MapPlot,
    punch::{BpchDecoder, Grid},
    reading::{model, PlotKind},
    reduce, units,
};

use super::{date_range, make_output_file_name};

/// Default south-east Australian window.
pub const LAT_WINDOW: (f32, f32) = (-40.0, -30.0);
pub const LON_WINDOW: (f32, f32) = (145.0, 155.0);

pub fn map(args: &MapArgs, config: &Config) -> Result<String> {
    let daterange = date_range(args.start, args.end)?;

    // The run-count check comes before any file is touched
    match args.runs.len() {
        1 => println!("Plotting map from run {}", args.runs[0]),
        2 => println!(
            "Plotting difference map: {} - {}",
            args.runs[1], args.runs[0]
        ),
        n => return Err(MumbaError::TooManyRuns(n).into()),
    }

    let mut fields: Vec<(Grid, Array2<f32>, String)> = Vec::new();
    for run in &args.runs {
        let run_dir = config.run_dir(run);
        let decoder = BpchDecoder::for_run_dir(&run_dir)?;

        let bar = create_spinner(format!("Reading run {run}..."));
        let mut var = model::load_run(
            &decoder,
            &run_dir,
            PlotKind::Map,
            &args.category,
            &args.species,
            daterange,
        )?;
        bar.finish_with_message(format!("Run {run} read"));

        units::convert(&mut var, &args.species);
        let field = reduce::map_field(&var, &args.levels)?;
        fields.push((var.grid, field, var.unit));
    }

    let (cmap, values, vmin, vmax) = if fields.len() == 2 {
        if fields[0].0 != fields[1].0 {
            return Err(MumbaError::decode(&args.species, "runs are on different grids").into());
        }
        let diff = reduce::difference(&fields[0].1, &fields[1].1);
        let half = args.vmax.unwrap_or_else(|| reduce::half_width(&diff));
        ("coolwarm", diff, Some(-half), Some(half))
    } else {
        ("viridis", fields[0].1.clone(), Some(0.0), args.vmax)
    };

    let (grid, _, unit) = fields.pop().expect("run count checked above");

    let plot = MapPlot {
        species: args.species.to_uppercase(),
        unit,
        title: map_title(&args.species, daterange),
        cmap: cmap.to_string(),
        lon: grid.lon,
        lat: grid.lat,
        values,
        vmin,
        vmax,
        lon_window: (args.lon_min, args.lon_max),
        lat_window: (args.lat_min, args.lat_max),
    };

    let path = make_output_file_name("map", &args.species);
    parquet::save_map(&plot, &path)?;

    Ok(path.to_string_lossy().to_string())
}

fn map_title(species_name: &str, daterange: Option<(NaiveDate, NaiveDate)>) -> String {
    match daterange {
        Some((start, end)) => format!("{}: {} to {}", species_name.to_uppercase(), start, end),
        None => species_name.to_uppercase(),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_reject_three_runs_before_any_io() {
        let args = MapArgs {
            species: "O3".to_string(),
            category: "IJ-AVG-$".to_string(),
            runs: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            levels: vec![0],
            start: None,
            end: None,
            vmax: None,
            lon_min: LON_WINDOW.0,
            lon_max: LON_WINDOW.1,
            lat_min: LAT_WINDOW.0,
            lat_max: LAT_WINDOW.1,
        };
        // Nonexistent run directories: an attempted read would surface an
        // I/O error instead of the run-count error
        let config = Config {
            model_root: "/nonexistent".into(),
            ..Config::default()
        };

        let err = map(&args, &config).unwrap_err();
        let err = err.downcast::<MumbaError>().unwrap();
        assert!(matches!(err, MumbaError::TooManyRuns(3)));
    }

    #[test]
    fn should_build_map_title_from_date_range() {
        assert_eq!(map_title("o3", None), "O3");

        let daterange = Some((
            NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2013, 1, 31).unwrap(),
        ));
        assert_eq!(map_title("o3", daterange), "O3: 2013-01-01 to 2013-01-31");
    }
}
