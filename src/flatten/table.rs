// src/flatten/table.rs

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A decoded JSON-stat dataset response from the dissemination API.
///
/// `id` lists the dimension ids in nesting order: the first id is the
/// slowest-varying axis of the linearised value collection, the last the
/// fastest. A `Table` is built fresh per HTTP response and consumed once.
#[derive(Debug, Deserialize)]
pub struct Table {
    pub id: Vec<String>,
    pub dimension: HashMap<String, Dimension>,
    #[serde(default)]
    pub value: Values,
}

/// One categorical axis of the table.
#[derive(Debug, Deserialize)]
pub struct Dimension {
    /// Display label; records fall back to the dimension id when absent.
    pub label: Option<String>,
    pub category: Category,
}

/// Category metadata for a dimension.
///
/// The label map keeps document order (serde_json `preserve_order`), which is
/// the ordering fallback when no explicit index is present.
#[derive(Debug, Default, Deserialize)]
pub struct Category {
    pub index: Option<CategoryIndex>,
    pub label: Option<Map<String, Value>>,
}

/// Explicit category ordering. The API emits either form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CategoryIndex {
    /// Category keys listed in order.
    Order(Vec<String>),
    /// Category key to 0-based position.
    Position(HashMap<String, usize>),
}

/// The table's value collection: dense in linear-index order, or sparse
/// keyed by stringified linear index.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Values {
    Dense(Vec<Value>),
    Sparse(HashMap<String, Value>),
}

impl Default for Values {
    fn default() -> Self {
        Values::Dense(Vec::new())
    }
}

impl Values {
    /// Value at linear index `i`, null when absent. Sparse entries beyond the
    /// table's product size are never looked up and so are ignored.
    pub fn at(&self, i: usize) -> Value {
        match self {
            Values::Dense(values) => values.get(i).cloned().unwrap_or(Value::Null),
            Values::Sparse(map) => map.get(&i.to_string()).cloned().unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_dense_and_sparse_values() {
        let dense: Values = serde_json::from_value(json!([1.0, null, 3.5])).unwrap();
        assert_eq!(dense.at(0), json!(1.0));
        assert_eq!(dense.at(1), Value::Null);
        assert_eq!(dense.at(7), Value::Null);

        let sparse: Values = serde_json::from_value(json!({"0": 12, "4": "n/a"})).unwrap();
        assert_eq!(sparse.at(0), json!(12));
        assert_eq!(sparse.at(3), Value::Null);
        assert_eq!(sparse.at(4), json!("n/a"));
    }

    #[test]
    fn decodes_both_index_forms() {
        let ordered: CategoryIndex = serde_json::from_value(json!(["A", "B"])).unwrap();
        assert!(matches!(ordered, CategoryIndex::Order(ref keys) if keys == &["A", "B"]));

        let positioned: CategoryIndex = serde_json::from_value(json!({"B": 1, "A": 0})).unwrap();
        match positioned {
            CategoryIndex::Position(map) => {
                assert_eq!(map["A"], 0);
                assert_eq!(map["B"], 1);
            }
            CategoryIndex::Order(_) => panic!("object should decode as positions"),
        }
    }

    #[test]
    fn decodes_full_table_payload() {
        let table: Table = serde_json::from_value(json!({
            "id": ["freq", "geo"],
            "dimension": {
                "freq": {"label": "Time frequency", "category": {"label": {"A": "Annual"}}},
                "geo": {"category": {"index": ["BE", "FR"], "label": {"BE": "Belgium", "FR": "France"}}}
            },
            "value": [100, 200]
        }))
        .unwrap();

        assert_eq!(table.id, vec!["freq", "geo"]);
        assert_eq!(table.dimension["freq"].label.as_deref(), Some("Time frequency"));
        assert!(table.dimension["geo"].label.is_none());
        assert_eq!(table.value.at(1), json!(200));
    }
}
