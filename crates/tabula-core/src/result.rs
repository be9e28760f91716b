//! Tabular results.

use serde::{Deserialize, Serialize};

use crate::schema::Column;
use crate::value::Value;

/// One result row, positionally aligned with the result set's columns.
pub type Row = Vec<Value>;

/// An ordered sequence of rows with a fixed column set. Row order is the
/// order records arrived from the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn empty(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    #[test]
    fn test_column_values() {
        let rs = ResultSet::new(
            vec![
                Column::new("id", ColumnType::String),
                Column::new("n", ColumnType::Number),
            ],
            vec![
                vec![Value::String("a".into()), Value::Number(1.0)],
                vec![Value::String("b".into()), Value::Number(2.0)],
            ],
        );
        let ids = rs.column_values("id").unwrap();
        assert_eq!(ids, vec![&Value::String("a".into()), &Value::String("b".into())]);
        assert!(rs.column_values("missing").is_none());
        assert_eq!(rs.len(), 2);
    }
}
