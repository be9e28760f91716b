//! Typed native commands.
//!
//! The command surface accepts short imperative strings
//! (`"list-tasks --max-results 50"`, `"get-service checkout"`) and turns
//! them into validated commands before anything is dispatched. Unknown
//! commands and malformed arguments are structured errors, never a
//! pass-through to the remote service.

use std::str::FromStr;

use tabula_core::{Predicate, QueryError, SelectQuery, Value};

/// A validated native command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCommand {
    ListClusters { max_results: Option<usize> },
    ListServices { max_results: Option<usize> },
    ListTasks { max_results: Option<usize> },
    ListContexts { max_results: Option<usize> },
    GetCluster { name: String },
    GetService { name: String },
    GetTask { arn: String },
}

impl NativeCommand {
    /// The SELECT equivalent of this command.
    pub fn into_query(self) -> SelectQuery {
        fn list(table: &str, max_results: Option<usize>) -> SelectQuery {
            match max_results {
                Some(limit) => SelectQuery::all(table).with_limit(limit),
                None => SelectQuery::all(table),
            }
        }
        fn get(table: &str, key_column: &str, key: String) -> SelectQuery {
            SelectQuery::all(table)
                .with_predicate(Predicate::eq(key_column, Value::String(key)))
                .with_limit(1)
        }

        match self {
            NativeCommand::ListClusters { max_results } => list("clusters", max_results),
            NativeCommand::ListServices { max_results } => list("services", max_results),
            NativeCommand::ListTasks { max_results } => list("tasks", max_results),
            NativeCommand::ListContexts { max_results } => list("contexts", max_results),
            NativeCommand::GetCluster { name } => get("clusters", "clusterName", name),
            NativeCommand::GetService { name } => get("services", "serviceName", name),
            NativeCommand::GetTask { arn } => get("tasks", "taskArn", arn),
        }
    }
}

impl FromStr for NativeCommand {
    type Err = QueryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut tokens = input.split_whitespace();
        let head = tokens.next().ok_or_else(|| QueryError::UnsupportedCommand {
            reason: "empty command".to_string(),
        })?;
        let args: Vec<&str> = tokens.collect();

        match head {
            "list-clusters" => Ok(NativeCommand::ListClusters {
                max_results: parse_max_results(head, &args)?,
            }),
            "list-services" => Ok(NativeCommand::ListServices {
                max_results: parse_max_results(head, &args)?,
            }),
            "list-tasks" => Ok(NativeCommand::ListTasks {
                max_results: parse_max_results(head, &args)?,
            }),
            "list-contexts" => Ok(NativeCommand::ListContexts {
                max_results: parse_max_results(head, &args)?,
            }),
            "get-cluster" => Ok(NativeCommand::GetCluster {
                name: parse_single_arg(head, &args)?,
            }),
            "get-service" => Ok(NativeCommand::GetService {
                name: parse_single_arg(head, &args)?,
            }),
            "get-task" => Ok(NativeCommand::GetTask {
                arn: parse_single_arg(head, &args)?,
            }),
            other => Err(QueryError::UnsupportedCommand {
                reason: format!("unknown command '{}'", other),
            }),
        }
    }
}

/// List commands take only an optional `--max-results <n>`.
fn parse_max_results(command: &str, args: &[&str]) -> Result<Option<usize>, QueryError> {
    match args {
        [] => Ok(None),
        ["--max-results", raw] => raw.parse().map(Some).map_err(|_| {
            QueryError::UnsupportedCommand {
                reason: format!("'{}': --max-results expects an integer, got '{}'", command, raw),
            }
        }),
        _ => Err(QueryError::UnsupportedCommand {
            reason: format!("'{}' accepts only --max-results <n>", command),
        }),
    }
}

/// Get commands take exactly one positional argument.
fn parse_single_arg(command: &str, args: &[&str]) -> Result<String, QueryError> {
    match args {
        [value] => Ok((*value).to_string()),
        [] => Err(QueryError::UnsupportedCommand {
            reason: format!("'{}' requires an argument", command),
        }),
        _ => Err(QueryError::UnsupportedCommand {
            reason: format!("'{}' takes exactly one argument", command),
        }),
    }
}
