//! Writes prepared time-series plots as long-format Parquet.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{
    ArrayRef, Float32Array, Int32Array, RecordBatch, StringArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::plot::{SeriesAxis, TimeSeriesPlot};

/// One row per (series, point). Calendar plots fill `time`, diurnal plots
/// fill `hour`; plot-level labels and bounds go into the schema metadata.
pub fn save_timeseries(plot: &TimeSeriesPlot, file_path: &Path) -> Result<()> {
    let mut labels: Vec<String> = Vec::new();
    let mut times: Vec<Option<i64>> = Vec::new();
    let mut hours: Vec<Option<i32>> = Vec::new();
    let mut values: Vec<Option<f32>> = Vec::new();
    let mut stds: Vec<Option<f32>> = Vec::new();

    for series in &plot.series {
        for (idx, value) in series.values.iter().enumerate() {
            labels.push(series.label.clone());
            match &series.axis {
                SeriesAxis::Time(axis) => {
                    times.push(axis.get(idx).map(|t| t.and_utc().timestamp()));
                    hours.push(None);
                }
                SeriesAxis::HourOfDay(axis) => {
                    times.push(None);
                    hours.push(axis.get(idx).map(|h| *h as i32));
                }
            }
            values.push(*value);
            stds.push(series.std.as_ref().and_then(|s| s.get(idx).copied().flatten()));
        }
    }

    let mut metadata = HashMap::new();
    metadata.insert("species".to_string(), plot.species.clone());
    metadata.insert("unit".to_string(), plot.unit.clone());
    metadata.insert("diurnal".to_string(), plot.diurnal.to_string());
    if let Some((ymin, ymax)) = plot.ylim {
        metadata.insert("ymin".to_string(), ymin.to_string());
        metadata.insert("ymax".to_string(), ymax.to_string());
    }
    if let Some((xmin, xmax)) = plot.xlim {
        metadata.insert("xmin".to_string(), xmin.to_string());
        metadata.insert("xmax".to_string(), xmax.to_string());
    }

    let schema = Arc::new(
        Schema::new(vec![
            Field::new("series", DataType::Utf8, false),
            Field::new("time", DataType::Timestamp(TimeUnit::Second, None), true),
            Field::new("hour", DataType::Int32, true),
            Field::new("value", DataType::Float32, true),
            Field::new("std", DataType::Float32, true),
        ])
        .with_metadata(metadata),
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(labels)),
        Arc::new(TimestampSecondArray::from(times)),
        Arc::new(Int32Array::from(hours)),
        Arc::new(Float32Array::from(values)),
        Arc::new(Float32Array::from(stds)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(file_path)?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use crate::plot::Series;
    use chrono::NaiveDate;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    #[test]
    fn should_write_one_row_per_point() {
        let t0 = NaiveDate::from_ymd_opt(2013, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let plot = TimeSeriesPlot {
            species: "O3".to_string(),
            unit: "ppbv".to_string(),
            diurnal: false,
            series: vec![
                Series {
                    label: "Obs".to_string(),
                    axis: SeriesAxis::Time(vec![t0, t0 + chrono::Duration::hours(1)]),
                    values: vec![Some(20.0), None],
                    std: None,
                },
                Series {
                    label: "base".to_string(),
                    axis: SeriesAxis::Time(vec![t0]),
                    values: vec![Some(22.0)],
                    std: None,
                },
            ],
            ylim: Some((0.0, 50.0)),
            xlim: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.parquet");
        save_timeseries(&plot, &path).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
        let metadata = reader.schema().metadata().clone();
        let rows: usize = reader
            .build()
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum();

        assert_eq!(rows, 3);
        assert_eq!(metadata.get("species"), Some(&"O3".to_string()));
        assert_eq!(metadata.get("ymax"), Some(&"50".to_string()));
    }

    #[test]
    fn should_write_diurnal_hours_instead_of_times() {
        let plot = TimeSeriesPlot {
            species: "NOX".to_string(),
            unit: "ppbv".to_string(),
            diurnal: true,
            series: vec![Series {
                label: "base".to_string(),
                axis: SeriesAxis::HourOfDay(vec![0, 1, 2]),
                values: vec![Some(1.0), Some(2.0), Some(3.0)],
                std: Some(vec![Some(0.1), None, Some(0.3)]),
            }],
            ylim: None,
            xlim: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diurnal.parquet");
        save_timeseries(&plot, &path).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
        let batch = reader.build().unwrap().next().unwrap().unwrap();

        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.column_by_name("time").unwrap().null_count(), 3);
        assert_eq!(batch.column_by_name("hour").unwrap().null_count(), 0);
        assert_eq!(batch.column_by_name("std").unwrap().null_count(), 1);
    }
}
