//! The result assembler: projects raw records onto the table schema,
//! applies the residual predicate, and enforces the query window when the
//! remote service could not.

use tabula_core::{Predicate, QueryError, ResultSet, Row, TableSchema, Value};
use tracing::debug;

use crate::fetch::RawRecord;

/// Query window as requested by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl PageWindow {
    pub fn new(offset: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit,
        }
    }
}

/// Assemble fetched records into a uniform result set.
///
/// Every declared column is present in every row; remote fields the schema
/// does not declare are dropped, declared columns the record lacks become
/// `Null`. When `remote_windowed` is true the service already started the
/// result at the requested offset, so only the limit is re-applied here
/// (cheap and harmless); otherwise the full window is enforced locally.
pub fn assemble(
    records: Vec<RawRecord>,
    schema: &TableSchema,
    residual: Option<&Predicate>,
    window: &PageWindow,
    remote_windowed: bool,
) -> Result<ResultSet, QueryError> {
    let total = records.len();
    let mut rows: Vec<Row> = Vec::with_capacity(total);

    for record in &records {
        let row: Row = schema
            .columns()
            .iter()
            .map(|column| {
                record
                    .get(&column.name)
                    .map(|raw| Value::coerce(raw, column.ty))
                    .unwrap_or(Value::Null)
            })
            .collect();
        if let Some(predicate) = residual {
            if !predicate.matches(&row, schema) {
                continue;
            }
        }
        rows.push(row);
    }

    let filtered = rows.len();
    if residual.is_some() {
        debug!("residual predicate kept {} of {} fetched records", filtered, total);
    }

    let rows: Vec<Row> = if remote_windowed {
        match window.limit {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        }
    } else {
        let iter = rows.into_iter().skip(window.offset);
        match window.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    };

    Ok(ResultSet::new(schema.columns().to_vec(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{Column, ColumnType, CompareOp, Predicate};

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            Column::new("id", ColumnType::String),
            Column::new("type", ColumnType::String),
            Column::new("count", ColumnType::Number),
        ])
    }

    fn record(id: &str, ty: &str, count: i64) -> RawRecord {
        let value = serde_json::json!({"id": id, "type": ty, "count": count, "extra": "dropped"});
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_projection_drops_unmapped_fields() {
        let rs = assemble(
            vec![record("1", "A", 5)],
            &schema(),
            None,
            &PageWindow::default(),
            false,
        )
        .unwrap();
        assert_eq!(rs.columns.len(), 3);
        assert_eq!(rs.rows[0].len(), 3);
        assert_eq!(rs.rows[0][2], Value::Number(5.0));
    }

    #[test]
    fn test_projection_totality_missing_columns_are_null() {
        let sparse = serde_json::json!({"id": "1"}).as_object().unwrap().clone();
        let rs = assemble(vec![sparse], &schema(), None, &PageWindow::default(), false).unwrap();
        assert_eq!(rs.rows[0].len(), 3);
        assert_eq!(rs.rows[0][1], Value::Null);
        assert_eq!(rs.rows[0][2], Value::Null);
    }

    #[test]
    fn test_residual_filtering() {
        let records = vec![
            record("1", "A", 1),
            record("2", "B", 2),
            record("3", "A", 3),
        ];
        let residual = Predicate::eq("type", Value::String("A".into()));
        let rs = assemble(records, &schema(), Some(&residual), &PageWindow::default(), false).unwrap();
        assert_eq!(rs.len(), 2);
        for row in &rs.rows {
            assert_eq!(row[1], Value::String("A".into()));
        }
    }

    #[test]
    fn test_local_window_applied_after_filtering() {
        let records: Vec<_> = (0..10).map(|i| record(&i.to_string(), "A", i)).collect();
        let residual = Predicate::compare("count", CompareOp::Gte, Value::Number(2.0));
        let window = PageWindow {
            offset: 2,
            limit: Some(3),
        };
        let rs = assemble(records, &schema(), Some(&residual), &window, false).unwrap();
        // filtered to counts 2..=9, then offset 2 / limit 3 => 4, 5, 6
        assert_eq!(rs.len(), 3);
        assert_eq!(rs.rows[0][2], Value::Number(4.0));
        assert_eq!(rs.rows[2][2], Value::Number(6.0));
    }

    #[test]
    fn test_remote_windowed_skips_local_offset() {
        let records: Vec<_> = (0..5).map(|i| record(&i.to_string(), "A", i)).collect();
        let window = PageWindow {
            offset: 10,
            limit: Some(4),
        };
        let rs = assemble(records, &schema(), None, &window, true).unwrap();
        // offset was already consumed remotely; only the limit re-applies
        assert_eq!(rs.len(), 4);
        assert_eq!(rs.rows[0][0], Value::String("0".into()));
    }

    #[test]
    fn test_empty_input_preserves_columns() {
        let rs = assemble(Vec::new(), &schema(), None, &PageWindow::default(), false).unwrap();
        assert!(rs.is_empty());
        assert_eq!(rs.columns.len(), 3);
    }

    #[test]
    fn test_arrival_order_preserved() {
        let records = vec![record("z", "A", 3), record("a", "A", 1), record("m", "A", 2)];
        let rs = assemble(records, &schema(), None, &PageWindow::default(), false).unwrap();
        let ids: Vec<_> = rs.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            ids,
            vec![
                Value::String("z".into()),
                Value::String("a".into()),
                Value::String("m".into())
            ]
        );
    }
}
