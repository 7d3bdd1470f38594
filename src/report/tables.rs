use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{fs, fs::File, path::Path, sync::Arc};

use super::fields;
use crate::aggregate::{DensityEntry, NetChangeEntry, RegionTotal, RegionUrban, ShareEntry};
use crate::forecast::{ForecastPoint, PointKind};

fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building prepared table")
}

pub fn share_table(entries: &[ShareEntry]) -> Result<RecordBatch> {
    batch(
        vec![
            Field::new(fields::COUNTRY, DataType::Utf8, false),
            Field::new(fields::POPULATION_2020, DataType::UInt64, false),
            Field::new(fields::POPULATION_PERCENT, DataType::Float64, false),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(entries.iter().map(|e| &e.label))) as ArrayRef,
            Arc::new(UInt64Array::from_iter_values(entries.iter().map(|e| e.population))) as ArrayRef,
            Arc::new(Float64Array::from_iter_values(entries.iter().map(|e| e.percent))) as ArrayRef,
        ],
    )
}

pub fn region_table(totals: &[RegionTotal]) -> Result<RecordBatch> {
    batch(
        vec![
            Field::new(fields::REGIONS, DataType::Utf8, false),
            Field::new(fields::POPULATION_2020, DataType::UInt64, false),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(totals.iter().map(|t| &t.region))) as ArrayRef,
            Arc::new(UInt64Array::from_iter_values(totals.iter().map(|t| t.population))) as ArrayRef,
        ],
    )
}

pub fn net_change_table(entries: &[NetChangeEntry]) -> Result<RecordBatch> {
    batch(
        vec![
            Field::new(fields::COUNTRY, DataType::Utf8, false),
            Field::new(fields::NET_CHANGE, DataType::Int64, false),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(entries.iter().map(|e| &e.name))) as ArrayRef,
            Arc::new(Int64Array::from_iter_values(entries.iter().map(|e| e.net_change))) as ArrayRef,
        ],
    )
}

pub fn density_table(entries: &[DensityEntry]) -> Result<RecordBatch> {
    batch(
        vec![
            Field::new(fields::COUNTRY, DataType::Utf8, false),
            Field::new(fields::DENSITY, DataType::Float64, false),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(entries.iter().map(|e| &e.name))) as ArrayRef,
            Arc::new(Float64Array::from_iter_values(entries.iter().map(|e| e.density))) as ArrayRef,
        ],
    )
}

pub fn urban_table(regions: &[RegionUrban]) -> Result<RecordBatch> {
    batch(
        vec![
            Field::new(fields::REGIONS, DataType::Utf8, false),
            Field::new(fields::URBAN, DataType::Float64, false),
            Field::new(fields::URBAN_PERCENT, DataType::Float64, false),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(regions.iter().map(|r| &r.region))) as ArrayRef,
            Arc::new(Float64Array::from_iter_values(
                regions.iter().map(|r| r.urban_population),
            )) as ArrayRef,
            Arc::new(Float64Array::from_iter_values(regions.iter().map(|r| r.percent))) as ArrayRef,
        ],
    )
}

pub fn forecast_table(points: &[ForecastPoint]) -> Result<RecordBatch> {
    let kind = |k: PointKind| match k {
        PointKind::Actual => "actual",
        PointKind::Predicted => "predicted",
    };
    batch(
        vec![
            Field::new(fields::YEAR, DataType::Int32, false),
            Field::new(fields::POPULATION, DataType::Float64, false),
            Field::new(fields::KIND, DataType::Utf8, false),
        ],
        vec![
            Arc::new(Int32Array::from_iter_values(points.iter().map(|p| p.year))) as ArrayRef,
            Arc::new(Float64Array::from_iter_values(points.iter().map(|p| p.population))) as ArrayRef,
            Arc::new(StringArray::from_iter_values(points.iter().map(|p| kind(p.kind)))) as ArrayRef,
        ],
    )
}

/// Write one batch as a Snappy-compressed parquet file. Returns bytes on disk.
pub fn write_parquet(batch: &RecordBatch, output_path: &Path) -> Result<u64> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(output_path)
        .with_context(|| format!("creating file {}", output_path.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    let metadata = fs::metadata(output_path).context("getting file metadata")?;
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    #[test]
    fn share_table_round_trips_through_parquet() -> Result<()> {
        let entries = vec![
            ShareEntry {
                label: "China".into(),
                population: 1_439_323_776,
                percent: 18.47,
            },
            ShareEntry {
                label: "Others".into(),
                population: 6_355_474_963,
                percent: 81.53,
            },
        ];
        let batch = share_table(&entries)?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), fields::COUNTRY);

        let dir = tempdir()?;
        let path = dir.path().join("nested").join("share.parquet");
        let bytes = write_parquet(&batch, &path)?;
        assert!(bytes > 0);

        let file = File::open(&path)?;
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let back = reader.next().transpose()?.expect("one batch");
        assert_eq!(back.num_rows(), 2);
        let pops = back
            .column(1)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .expect("UInt64 population column");
        assert_eq!(pops.value(0), 1_439_323_776);
        Ok(())
    }

    #[test]
    fn forecast_table_labels_kinds() -> Result<()> {
        let points = vec![
            ForecastPoint {
                year: 2020,
                population: 10.0,
                kind: PointKind::Actual,
            },
            ForecastPoint {
                year: 2021,
                population: 11.5,
                kind: PointKind::Predicted,
            },
        ];
        let batch = forecast_table(&points)?;
        let kinds = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Utf8 kind column");
        assert_eq!(kinds.value(0), "actual");
        assert_eq!(kinds.value(1), "predicted");
        Ok(())
    }

    #[test]
    fn empty_tables_are_valid() -> Result<()> {
        assert_eq!(region_table(&[])?.num_rows(), 0);
        assert_eq!(density_table(&[])?.num_rows(), 0);
        assert_eq!(net_change_table(&[])?.num_rows(), 0);
        assert_eq!(urban_table(&[])?.num_rows(), 0);
        Ok(())
    }
}
