//! The filter translator: splits a flattened predicate into the part the
//! backing service evaluates natively and the residue evaluated locally.

use tabula_core::{Comparison, Connective, Predicate, QueryError, TableSchema};
use tracing::debug;

use crate::capability::{CapabilityProfile, UnknownColumnPolicy};

/// Outcome of translating one predicate against one capability profile.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    /// Service-native filter payload; `Value::Null` when nothing was
    /// pushed down.
    pub remote_payload: serde_json::Value,
    /// Predicate that must still be evaluated on fetched rows. `None`
    /// means the remote call fully satisfies the predicate.
    pub residual: Option<Predicate>,
}

impl TranslationResult {
    pub fn fully_pushed(&self) -> bool {
        self.residual.is_none()
    }
}

/// Translate `comparisons` under `connective` for a table with the given
/// profile and schema.
///
/// Every comparison is type-checked against the schema before any
/// partitioning, so a bad literal fails here and never reaches the
/// network. Under `Or`, pushdown is all-or-nothing: filtering only one
/// branch remotely would drop rows the other branch qualifies, so a mixed
/// partition keeps the entire predicate local.
pub fn translate(
    comparisons: &[Comparison],
    connective: Connective,
    profile: &CapabilityProfile,
    schema: &TableSchema,
) -> Result<TranslationResult, QueryError> {
    let mut native: Vec<Comparison> = Vec::new();
    let mut residual: Vec<Comparison> = Vec::new();

    for comparison in comparisons {
        match schema.column_type(&comparison.column) {
            None => match profile.unknown_columns {
                UnknownColumnPolicy::Reject => {
                    return Err(QueryError::UnknownColumn {
                        column: comparison.column.clone(),
                    });
                }
                UnknownColumnPolicy::Residual => {
                    residual.push(comparison.clone());
                    continue;
                }
            },
            Some(ty) => {
                if !comparison.value.matches_type(ty) {
                    return Err(QueryError::TypeMismatch {
                        column: comparison.column.clone(),
                        expected: ty,
                        actual: comparison.value.type_name().to_string(),
                    });
                }
                if comparison.op.is_ordering() && comparison.value.is_null() {
                    return Err(QueryError::unsupported_predicate(format!(
                        "ordering comparison against null on column '{}'",
                        comparison.column
                    )));
                }
            }
        }

        if profile.is_native(comparison) {
            native.push(comparison.clone());
        } else {
            residual.push(comparison.clone());
        }
    }

    // A partially-native OR cannot be pushed down soundly.
    if connective == Connective::Or && !native.is_empty() && !residual.is_empty() {
        debug!(
            "OR predicate with {} native / {} residual comparisons: keeping all {} local",
            native.len(),
            residual.len(),
            comparisons.len()
        );
        residual = comparisons.to_vec();
        native.clear();
    }

    let remote_payload = if native.is_empty() {
        serde_json::Value::Null
    } else {
        (profile.payload)(&native, connective)
    };

    Ok(TranslationResult {
        remote_payload,
        residual: Predicate::from_comparisons(&residual, connective),
    })
}
