//! The query engine: the extract → translate → fetch → assemble pipeline
//! behind `execute_select`.

use tabula_core::{extract, QueryError, ResultSet, SelectQuery};
use tracing::info;

use crate::assemble::{assemble, PageWindow};
use crate::fetch::{fetch, FetchContext};
use crate::registry::TableRegistry;
use crate::translate::translate;

/// Executes SELECT queries against the tables of one registry.
///
/// Each query owns its own comparison list, payload and record buffer;
/// the registry is only read, so one engine serves concurrent queries.
pub struct QueryEngine {
    registry: TableRegistry,
}

impl QueryEngine {
    pub fn new(registry: TableRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Execute a single-table SELECT and return its rows.
    pub async fn execute_select(
        &self,
        query: &SelectQuery,
        ctx: &FetchContext,
    ) -> Result<ResultSet, QueryError> {
        let table = self.registry.table(&query.table)?;
        let (comparisons, connective) = extract(query.predicate.as_ref())?;
        let translation = translate(&comparisons, connective, &table.profile, &table.schema)?;

        let window = PageWindow::new(query.offset, query.limit);
        // The service enforces the window only when the whole predicate was
        // pushed down (otherwise residual filtering would shift it) and the
        // endpoint can start a page at an arbitrary offset.
        let remote_windowed = translation.fully_pushed() && table.endpoint.page.supports_offset();
        let (start, target) = if remote_windowed {
            (window.offset, window.limit)
        } else if translation.fully_pushed() {
            (0, window.limit.map(|l| l.saturating_add(window.offset)))
        } else {
            (0, None)
        };

        info!(
            "select on '{}': {} comparisons, pushdown: {}, remote window: {}",
            query.table,
            comparisons.len(),
            !translation.remote_payload.is_null(),
            remote_windowed
        );

        let records = fetch(
            table.client.as_ref(),
            &table.endpoint,
            &translation.remote_payload,
            start,
            target,
            ctx,
        )
        .await?;

        let result = assemble(
            records,
            &table.schema,
            translation.residual.as_ref(),
            &window,
            remote_windowed,
        )?;
        project(result, &query.columns)
    }
}

/// Narrow a result set to the projected columns, in projection order.
fn project(result: ResultSet, columns: &[String]) -> Result<ResultSet, QueryError> {
    if columns.is_empty() {
        return Ok(result);
    }
    let indices: Vec<usize> = columns
        .iter()
        .map(|name| {
            result
                .columns
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| QueryError::UnknownColumn {
                    column: name.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    let projected_columns = indices.iter().map(|&i| result.columns[i].clone()).collect();
    let projected_rows = result
        .rows
        .into_iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Ok(ResultSet::new(projected_columns, projected_rows))
}
