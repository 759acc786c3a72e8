// src/history/mod.rs

use anyhow::{Context, Result};
use arrow::array::{StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use glob::glob;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::HashSet,
    fs,
    fs::File,
    path::PathBuf,
    sync::Arc,
};

/// Sync audit log backed by Parquet files, one file per event.
pub struct History {
    history_dir: PathBuf,
}

impl History {
    /// Construct a new History store at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;
        Ok(Self { history_dir })
    }

    /// Record an event for `dataset` (e.g. "synced") together with the row
    /// count it produced. Writes `<dataset>_<event>_<ts>.parquet`.
    pub fn record_event(&self, dataset: &str, event: &str, rows: u64) -> Result<()> {
        let ts = Utc::now().timestamp_micros();
        let filename = format!("{}_{}_{}.parquet", dataset, event, ts);
        let path = self.history_dir.join(filename);

        let schema = Schema::new(vec![
            Field::new("dataset", DataType::Utf8, false),
            Field::new("event", DataType::Utf8, false),
            Field::new("rows", DataType::UInt64, false),
            Field::new(
                "event_time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ]);

        let arr_dataset = Arc::new(StringArray::from(vec![dataset.to_string()]))
            as Arc<dyn arrow::array::Array>;
        let arr_event =
            Arc::new(StringArray::from(vec![event.to_string()])) as Arc<dyn arrow::array::Array>;
        let arr_rows =
            Arc::new(UInt64Array::from(vec![rows])) as Arc<dyn arrow::array::Array>;
        let arr_time = Arc::new(TimestampMicrosecondArray::from_iter_values(vec![ts]))
            as Arc<dyn arrow::array::Array>;

        let batch = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![arr_dataset, arr_event, arr_rows, arr_time],
        )
        .context("building history record batch")?;
        let file =
            File::create(&path).with_context(|| format!("creating history file {:?}", &path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, Arc::new(schema), Some(props))
            .context("creating Arrow writer for history")?;
        writer.write(&batch).context("writing history batch")?;
        writer.close().context("closing history writer")?;
        Ok(())
    }

    /// Load all distinct dataset codes with the given `event`, by scanning
    /// filenames matching `<dataset>_<event>_*.parquet`.
    pub fn load_event_names(&self, event: &str) -> Result<HashSet<String>> {
        let mut set = HashSet::new();
        let pattern = format!("{}/**/*_{}_*.parquet", self.history_dir.display(), event);
        for entry in glob(&pattern)? {
            if let Ok(path) = entry {
                if let Some(fname) = path.file_stem().and_then(|s| s.to_str()) {
                    // fname = "<dataset>_<event>_<ts>"
                    if let Some(idx) = fname.rfind(&format!("_{}_", event)) {
                        let dataset = &fname[..idx];
                        set.insert(dataset.to_string());
                    }
                }
            }
        }
        Ok(set)
    }
}
