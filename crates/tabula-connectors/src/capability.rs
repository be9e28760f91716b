//! Per-table capability profiles.
//!
//! A profile declares which columns and operators the backing service can
//! filter on natively, what to do with comparisons on undeclared columns,
//! and how to shape the native filter payload. Payload building is a plain
//! function registered against the profile, so each service variant stays a
//! pure function rather than a subclass.

use std::collections::{BTreeMap, BTreeSet};

use tabula_core::{Comparison, CompareOp, Connective};

/// Builds the service-native filter payload from the comparisons chosen
/// for pushdown. Must be deterministic: identical inputs must serialize to
/// identical bytes.
pub type PayloadBuilder = fn(&[Comparison], Connective) -> serde_json::Value;

/// What to do with a filter on a column the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownColumnPolicy {
    /// Fail translation with an unknown-column error.
    Reject,
    /// Keep the comparison local; the fetched rows decide.
    Residual,
}

/// Native filtering capabilities of one logical table.
#[derive(Clone)]
pub struct CapabilityProfile {
    native_ops: BTreeMap<String, BTreeSet<CompareOp>>,
    pub unknown_columns: UnknownColumnPolicy,
    pub payload: PayloadBuilder,
}

impl CapabilityProfile {
    pub fn new(
        native_ops: BTreeMap<String, BTreeSet<CompareOp>>,
        unknown_columns: UnknownColumnPolicy,
        payload: PayloadBuilder,
    ) -> Self {
        Self {
            native_ops,
            unknown_columns,
            payload,
        }
    }

    /// A profile for services with no native filter syntax: every
    /// comparison stays local.
    pub fn no_pushdown(unknown_columns: UnknownColumnPolicy) -> Self {
        Self {
            native_ops: BTreeMap::new(),
            unknown_columns,
            payload: empty_payload,
        }
    }

    /// A profile accepting every comparison operator on the given columns.
    pub fn all_ops(
        columns: impl IntoIterator<Item = String>,
        unknown_columns: UnknownColumnPolicy,
        payload: PayloadBuilder,
    ) -> Self {
        let every: BTreeSet<CompareOp> = [
            CompareOp::Eq,
            CompareOp::Neq,
            CompareOp::Gt,
            CompareOp::Lt,
            CompareOp::Gte,
            CompareOp::Lte,
        ]
        .into_iter()
        .collect();
        let native_ops = columns.into_iter().map(|c| (c, every.clone())).collect();
        Self {
            native_ops,
            unknown_columns,
            payload,
        }
    }

    /// Whether the service can evaluate this comparison natively.
    /// Null literals are never pushed down; no service filter syntax in
    /// scope expresses them.
    pub fn is_native(&self, comparison: &Comparison) -> bool {
        if comparison.value.is_null() {
            return false;
        }
        self.native_ops
            .get(&comparison.column)
            .is_some_and(|ops| ops.contains(&comparison.op))
    }

    pub fn has_native_columns(&self) -> bool {
        !self.native_ops.is_empty()
    }
}

impl std::fmt::Debug for CapabilityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProfile")
            .field("native_ops", &self.native_ops)
            .field("unknown_columns", &self.unknown_columns)
            .finish()
    }
}

/// Payload builder for no-pushdown profiles.
pub fn empty_payload(_comparisons: &[Comparison], _connective: Connective) -> serde_json::Value {
    serde_json::Value::Null
}
