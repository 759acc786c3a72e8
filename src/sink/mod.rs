// src/sink/mod.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::flatten::normalize::{normalize_key, normalize_record};
use crate::flatten::{Record, Records, VALUE_FIELD};

const BATCH_ROWS: usize = 8192;

/// Stream the flattened records of one dataset into
/// `<out_dir>/<dataset>.parquet`, normalizing field names on the way.
///
/// Records are consumed in bounded batches so the full Cartesian product is
/// never materialized. The file is written to a `.tmp` path and renamed into
/// place once closed. Returns the number of rows written; an empty dataset
/// writes no file.
pub fn write_dataset(dataset: &str, records: Records, out_dir: &Path) -> Result<u64> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {:?}", out_dir))?;

    // Column order: dimensions as declared, then the value field. Collisions
    // introduced by normalization collapse to the first occurrence, matching
    // what normalize_record does to the records themselves.
    let mut columns: Vec<String> = Vec::new();
    for field in records.fields().map(normalize_key).chain([VALUE_FIELD.to_owned()]) {
        if !columns.contains(&field) {
            columns.push(field);
        }
    }

    let mut iter = records.map(normalize_record);
    let mut chunk = fill_chunk(&mut iter);
    if chunk.is_empty() {
        info!(dataset, "no records; skipping file");
        return Ok(0);
    }

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|name| {
                let dtype = if name == VALUE_FIELD {
                    value_column_type(&chunk)
                } else {
                    DataType::Utf8
                };
                Field::new(name, dtype, true)
            })
            .collect::<Vec<Field>>(),
    ));

    let out_path = out_dir.join(format!("{}.parquet", dataset));
    let tmp_path = out_path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {:?}", tmp_path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
        .with_context(|| format!("opening Parquet writer for {}", dataset))?;

    let mut total = 0u64;
    while !chunk.is_empty() {
        let batch = build_batch(&schema, &chunk)?;
        writer
            .write(&batch)
            .with_context(|| format!("writing batch for {}", dataset))?;
        total += chunk.len() as u64;
        chunk = fill_chunk(&mut iter);
    }

    writer
        .close()
        .with_context(|| format!("closing Parquet writer for {}", dataset))?;
    fs::rename(&tmp_path, &out_path)
        .with_context(|| format!("publishing {:?}", out_path))?;

    debug!(dataset, rows = total, path = %out_path.display(), "wrote dataset");
    Ok(total)
}

fn fill_chunk(iter: &mut impl Iterator<Item = Record>) -> Vec<Record> {
    let mut chunk = Vec::with_capacity(BATCH_ROWS);
    while chunk.len() < BATCH_ROWS {
        match iter.next() {
            Some(record) => chunk.push(record),
            None => break,
        }
    }
    chunk
}

/// Value column type, inferred from the first batch: Float64 when every
/// non-null value is numeric, Utf8 otherwise. A later batch that contradicts
/// the inference gets nulls in the offending cells.
fn value_column_type(chunk: &[Record]) -> DataType {
    let numeric_only = chunk
        .iter()
        .filter_map(|record| record.get(VALUE_FIELD))
        .all(|value| value.is_null() || value.is_number());
    if numeric_only {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn build_batch(schema: &Arc<Schema>, chunk: &[Record]) -> Result<RecordBatch> {
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let array: ArrayRef = match field.data_type() {
            DataType::Float64 => {
                let mut builder = Float64Builder::with_capacity(chunk.len());
                for record in chunk {
                    match record.get(field.name()).and_then(Value::as_f64) {
                        Some(n) => builder.append_value(n),
                        None => {
                            if let Some(v) = record.get(field.name()) {
                                if !v.is_null() {
                                    debug!(field = %field.name(), value = %v, "non-numeric value in numeric column; writing null");
                                }
                            }
                            builder.append_null();
                        }
                    }
                }
                Arc::new(builder.finish())
            }
            _ => {
                let mut builder = StringBuilder::new();
                for record in chunk {
                    match record.get(field.name()) {
                        Some(Value::String(s)) => builder.append_value(s),
                        Some(Value::Null) | None => builder.append_null(),
                        Some(other) => builder.append_value(other.to_string()),
                    }
                }
                Arc::new(builder.finish())
            }
        };
        arrays.push(array);
    }

    RecordBatch::try_new(schema.clone(), arrays).context("building record batch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Table;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_table(value: Value) -> Table {
        serde_json::from_value(json!({
            "id": ["freq", "geo"],
            "dimension": {
                "freq": {
                    "label": "Time frequency",
                    "category": {"index": {"A": 0}, "label": {"A": "Annual"}}
                },
                "geo": {
                    "label": "Geographic entity",
                    "category": {"index": {"BE": 0, "FR": 1}, "label": {"BE": "Belgium", "FR": "France"}}
                }
            },
            "value": value
        }))
        .expect("test payload should decode")
    }

    fn read_metadata(path: &Path) -> (i64, Vec<String>) {
        let reader = SerializedFileReader::new(File::open(path).unwrap()).unwrap();
        let meta = reader.metadata().file_metadata();
        let names = meta
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        (meta.num_rows(), names)
    }

    #[test]
    fn writes_one_row_per_record_with_normalized_columns() -> Result<()> {
        let out = TempDir::new()?;
        let records = sample_table(json!([100, 200])).records(None)?;

        let rows = write_dataset("nama_10_gdp", records, out.path())?;
        assert_eq!(rows, 2);

        let path = out.path().join("nama_10_gdp.parquet");
        let (num_rows, names) = read_metadata(&path);
        assert_eq!(num_rows, 2);
        assert_eq!(names, vec!["time_frequency", "geographic_entity", "value"]);
        assert!(!out.path().join("nama_10_gdp.tmp").exists());
        Ok(())
    }

    #[test]
    fn string_values_demote_the_value_column_to_utf8() -> Result<()> {
        let out = TempDir::new()?;
        let records = sample_table(json!([100, ":"])).records(None)?;
        write_dataset("prc_hicp_aind", records, out.path())?;

        let path = out.path().join("prc_hicp_aind.parquet");
        let reader = SerializedFileReader::new(File::open(path).unwrap())?;
        let meta = reader.metadata().file_metadata();
        let value_col = meta
            .schema_descr()
            .columns()
            .iter()
            .find(|c| c.name() == "value")
            .expect("value column present");
        assert_eq!(
            value_col.physical_type(),
            parquet::basic::Type::BYTE_ARRAY
        );
        Ok(())
    }

    #[test]
    fn empty_product_writes_nothing() -> Result<()> {
        let out = TempDir::new()?;
        let table: Table = serde_json::from_value(json!({
            "id": ["geo"],
            "dimension": {"geo": {"category": {"index": []}}},
            "value": []
        }))?;

        let rows = write_dataset("demo_pjan", table.records(None)?, out.path())?;
        assert_eq!(rows, 0);
        assert!(!out.path().join("demo_pjan.parquet").exists());
        Ok(())
    }

    #[test]
    fn record_limit_bounds_the_written_rows() -> Result<()> {
        let out = TempDir::new()?;
        let records = sample_table(json!([100, 200])).records(Some(1))?;
        assert_eq!(write_dataset("env_air_gge", records, out.path())?, 1);

        let (num_rows, _) = read_metadata(&out.path().join("env_air_gge.parquet"));
        assert_eq!(num_rows, 1);
        Ok(())
    }
}
