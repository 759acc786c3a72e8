// src/flatten/records.rs

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use super::table::{CategoryIndex, Table, Values};
use super::VALUE_FIELD;

/// One flattened cell: dimension display label -> category label, plus the
/// reserved `value` field. Insertion order follows the table's dimension
/// order, so downstream columns line up across records.
pub type Record = Map<String, Value>;

/// One resolved axis of the Cartesian product.
#[derive(Debug)]
struct Axis {
    /// Record field name for this dimension (display label or raw id).
    field: String,
    /// Category display labels in index order.
    labels: Vec<String>,
}

/// Lazy, one-pass iterator over the flattened cells of a [`Table`].
///
/// Walks the Cartesian product of category labels odometer-style, first
/// dimension outermost, pairing each combination with the value at its
/// linear index. Peak state is one cursor per dimension, never the product.
#[derive(Debug)]
pub struct Records {
    axes: Vec<Axis>,
    values: Values,
    cursor: Vec<usize>,
    pos: usize,
    /// Total records to emit: the product size, capped by any limit.
    end: usize,
}

impl Table {
    /// Resolve dimension metadata and return the record iterator.
    ///
    /// `limit` caps the number of emitted records; `None` yields the full
    /// product. Fails on malformed metadata: a dimension declared in `id`
    /// but absent from `dimension`, or a dimension whose category order
    /// cannot be determined. Those errors are fatal for this response and
    /// are not retried here.
    pub fn records(self, limit: Option<usize>) -> Result<Records> {
        let mut axes = Vec::with_capacity(self.id.len());

        for dim_id in &self.id {
            let Some(dim) = self.dimension.get(dim_id) else {
                bail!("dimension `{dim_id}` is listed in `id` but missing from `dimension`");
            };

            let field = dim.label.clone().unwrap_or_else(|| dim_id.clone());

            let keys: Vec<String> = match &dim.category.index {
                Some(CategoryIndex::Order(keys)) => keys.clone(),
                Some(CategoryIndex::Position(positions)) => {
                    let mut pairs: Vec<(&String, usize)> =
                        positions.iter().map(|(k, &p)| (k, p)).collect();
                    pairs.sort_by_key(|&(_, p)| p);
                    pairs.into_iter().map(|(k, _)| k.clone()).collect()
                }
                None => match &dim.category.label {
                    Some(labels) => labels.keys().cloned().collect(),
                    None => bail!(
                        "dimension `{dim_id}` has no category index and no category labels; \
                         ordering cannot be determined"
                    ),
                },
            };

            let labels = keys
                .iter()
                .map(|key| {
                    dim.category
                        .label
                        .as_ref()
                        .and_then(|m| m.get(key))
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                        .unwrap_or_else(|| key.clone())
                })
                .collect();

            axes.push(Axis { field, labels });
        }

        let mut total: usize = 1;
        for axis in &axes {
            total = match total.checked_mul(axis.labels.len()) {
                Some(n) => n,
                None => bail!("dimension sizes overflow the addressable product size"),
            };
        }

        let end = match limit {
            Some(limit) => total.min(limit),
            None => total,
        };

        Ok(Records {
            cursor: vec![0; axes.len()],
            axes,
            values: self.value,
            pos: 0,
            end,
        })
    }
}

impl Records {
    /// Record field names in dimension order, before any normalization.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.field.as_str())
    }
}

impl Iterator for Records {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.pos >= self.end {
            return None;
        }

        let mut record = Map::new();
        for (axis, &idx) in self.axes.iter().zip(&self.cursor) {
            record.insert(axis.field.clone(), Value::String(axis.labels[idx].clone()));
        }
        record.insert(VALUE_FIELD.to_owned(), self.values.at(self.pos));

        self.pos += 1;

        // advance the odometer, innermost axis first
        for i in (0..self.cursor.len()).rev() {
            self.cursor[i] += 1;
            if self.cursor[i] < self.axes[i].labels.len() {
                break;
            }
            self.cursor[i] = 0;
        }

        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}
