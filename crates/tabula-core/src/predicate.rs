//! Predicate trees, flattening into atomic comparisons, and in-memory
//! evaluation against rows.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::schema::TableSchema;
use crate::value::{compare_values, values_equal, ColumnType, Value};

/// Comparison operators accepted in WHERE predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    /// The operator's conventional symbol, as remote filter syntaxes
    /// spell it.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }

    /// Whether this operator orders values rather than testing equality.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Neq)
    }
}

/// Logical connective joining the atomic comparisons of one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connective {
    And,
    Or,
}

/// One atomic `column <op> literal` comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Comparison {
    pub fn new(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    /// Evaluate this comparison against a row, positionally aligned with
    /// `schema`. A column absent from the schema never matches.
    pub fn matches(&self, row: &[Value], schema: &TableSchema) -> bool {
        let (idx, ty) = match (schema.index_of(&self.column), schema.column_type(&self.column)) {
            (Some(i), Some(t)) => (i, t),
            _ => return false,
        };
        let cell = match row.get(idx) {
            Some(v) => v,
            None => return false,
        };
        eval_op(cell, self.op, &self.value, ty)
    }
}

fn eval_op(lhs: &Value, op: CompareOp, rhs: &Value, ty: ColumnType) -> bool {
    match op {
        CompareOp::Eq => values_equal(lhs, rhs, ty),
        CompareOp::Neq => !values_equal(lhs, rhs, ty),
        CompareOp::Gt => matches!(compare_values(lhs, rhs, ty), Some(std::cmp::Ordering::Greater)),
        CompareOp::Lt => matches!(compare_values(lhs, rhs, ty), Some(std::cmp::Ordering::Less)),
        CompareOp::Gte => matches!(
            compare_values(lhs, rhs, ty),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        ),
        CompareOp::Lte => matches!(
            compare_values(lhs, rhs, ty),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        ),
    }
}

/// A boolean predicate tree: a comparison leaf, or a connective over two
/// subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Compare(Comparison),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Predicate::Compare(Comparison::new(column, op, value))
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn and(lhs: Predicate, rhs: Predicate) -> Self {
        Predicate::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Predicate, rhs: Predicate) -> Self {
        Predicate::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Rebuild a flat comparison list into a predicate tree under a
    /// single connective. Returns `None` for an empty list.
    pub fn from_comparisons(comparisons: &[Comparison], connective: Connective) -> Option<Predicate> {
        let mut iter = comparisons.iter().cloned().map(Predicate::Compare);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, next| match connective {
            Connective::And => Predicate::and(acc, next),
            Connective::Or => Predicate::or(acc, next),
        }))
    }

    /// Evaluate the tree against one row.
    pub fn matches(&self, row: &[Value], schema: &TableSchema) -> bool {
        match self {
            Predicate::Compare(c) => c.matches(row, schema),
            Predicate::And(l, r) => l.matches(row, schema) && r.matches(row, schema),
            Predicate::Or(l, r) => l.matches(row, schema) || r.matches(row, schema),
        }
    }
}

/// Flatten a predicate tree into its atomic comparisons plus the single
/// connective joining them.
///
/// A tree that mixes `And` and `Or` is rejected outright rather than
/// partially honoured. An absent predicate flattens to an empty
/// comparison list under `And` (the identity for "no filter").
pub fn extract(predicate: Option<&Predicate>) -> Result<(Vec<Comparison>, Connective), QueryError> {
    let Some(predicate) = predicate else {
        return Ok((Vec::new(), Connective::And));
    };
    let mut comparisons = Vec::new();
    let connective = flatten(predicate, &mut comparisons, None)?;
    Ok((comparisons, connective.unwrap_or(Connective::And)))
}

fn flatten(
    node: &Predicate,
    out: &mut Vec<Comparison>,
    seen: Option<Connective>,
) -> Result<Option<Connective>, QueryError> {
    match node {
        Predicate::Compare(c) => {
            out.push(c.clone());
            Ok(seen)
        }
        Predicate::And(l, r) => {
            if seen == Some(Connective::Or) {
                return Err(QueryError::unsupported_predicate(
                    "predicate mixes AND and OR connectives",
                ));
            }
            let seen = flatten(l, out, Some(Connective::And))?;
            flatten(r, out, seen)
        }
        Predicate::Or(l, r) => {
            if seen == Some(Connective::And) {
                return Err(QueryError::unsupported_predicate(
                    "predicate mixes AND and OR connectives",
                ));
            }
            let seen = flatten(l, out, Some(Connective::Or))?;
            flatten(r, out, seen)
        }
    }
}
