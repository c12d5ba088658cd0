// SPDX-License-Identifier: MIT OR Apache-2.0
//! Running a resolved plan: invoking the underlying operations (through an
//! [`Invoker`] the caller supplies) and projecting each response page
//! through the plan's output path.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::arg::{Arg, Args, CallState};
use crate::output_path::PathSegment;
use crate::service::Service;

/// Performs the actual network call a resolved plan names. Implemented by
/// whatever wraps the real cloud SDK; this crate never talks to one
/// itself.
pub trait Invoker {
    type Error;

    /// Invoke `operation` with `input`, returning every page of the
    /// response already flattened (pagination is this trait's
    /// responsibility, not the planner's).
    fn invoke(&self, operation: &str, input: &serde_json::Map<String, Value>) -> Result<Vec<Value>, Self::Error>;
}

/// Thrown when a plan can't be executed as written: an unresolved lazy
/// call slipped through, or the invoker itself failed.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError<E> {
    #[error("plan contains an unresolved call; run unlazy() before executing")]
    NotResolved,
    #[error("operation invocation failed: {0}")]
    Invoke(E),
}

/// Per-execution cache of `(method, args) -> pages` results, so that two
/// branches of a Cartesian product sharing the same sub-call only invoke
/// it once.
#[derive(Default)]
pub struct ExecCache(BTreeMap<(String, String), Vec<Value>>);

impl ExecCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Execute every binding in `args`, returning the Cartesian product of
/// their resolved values as a list of fully-materialized `(name, Value)`
/// rows.
pub fn execute<I: Invoker>(
    args: &Args,
    service: &Service,
    invoker: &I,
    cache: &mut ExecCache,
) -> Result<Vec<BTreeMap<String, Value>>, ExecuteError<I::Error>> {
    let mut rows = vec![BTreeMap::new()];
    for (name, arg) in args.iter() {
        let values = execute_arg(arg, service, invoker, cache)?;
        let mut next_rows = Vec::with_capacity(rows.len() * values.len().max(1));
        for row in &rows {
            for value in &values {
                let mut next = row.clone();
                next.insert(name.clone(), value.clone());
                next_rows.push(next);
            }
        }
        rows = next_rows;
    }
    Ok(rows)
}

fn execute_arg<I: Invoker>(
    arg: &Arg,
    service: &Service,
    invoker: &I,
    cache: &mut ExecCache,
) -> Result<Vec<Value>, ExecuteError<I::Error>> {
    match arg {
        Arg::Static(v) => Ok(vec![v.clone()]),
        Arg::Multi(vs) => Ok(vs.clone()),
        Arg::CallOutput(co) => {
            let CallState::Resolved(resolved) = &co.call else {
                return Err(ExecuteError::NotResolved);
            };

            let input_rows = execute(&resolved.args, service, invoker, cache)?;
            let mut out = Vec::new();
            for row in input_rows {
                let input: serde_json::Map<String, Value> = row.into_iter().collect();
                let cache_key = (resolved.method.name.clone(), Value::Object(input.clone()).to_string());
                let pages = if let Some(cached) = cache.0.get(&cache_key) {
                    cached.clone()
                } else {
                    let pages = invoker
                        .invoke(&resolved.method.name, &input)
                        .map_err(ExecuteError::Invoke)?;
                    cache.0.insert(cache_key, pages.clone());
                    pages
                };
                for page in pages {
                    project(&page, co.output_path.segments(), &mut out);
                }
            }
            Ok(out)
        }
    }
}

fn project(value: &Value, segments: &[PathSegment], out: &mut Vec<Value>) {
    match segments.split_first() {
        None => out.push(value.clone()),
        Some((PathSegment::Field(name), rest)) => {
            if let Some(next) = value.get(name) {
                project(next, rest, out);
            }
        }
        Some((PathSegment::Iterate, rest)) => match value {
            Value::Array(items) => {
                for item in items {
                    project(item, rest, out);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    project(item, rest, out);
                }
            }
            _ => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::{CallOutput, LazyCall};
    use crate::method::Method;
    use crate::service::{OperationDef, ServiceDef};
    use ccx_core::{Shape, StructureMember};
    use std::rc::Rc;

    struct MockInvoker;

    impl Invoker for MockInvoker {
        type Error = std::convert::Infallible;
        fn invoke(&self, operation: &str, _input: &serde_json::Map<String, Value>) -> Result<Vec<Value>, Self::Error> {
            assert_eq!(operation, "describe_instances");
            Ok(vec![serde_json::json!({
                "Reservations": [
                    {"Instances": [{"InstanceId": "i-1"}, {"InstanceId": "i-2"}]}
                ]
            })])
        }
    }

    #[test]
    fn execute_projects_nested_values_through_output_path() {
        let output = Shape::structure(vec![StructureMember {
            name: "Reservations".into(),
            shape: Shape::list(Shape::structure(vec![StructureMember {
                name: "Instances".into(),
                shape: Shape::list(Shape::structure(vec![StructureMember {
                    name: "InstanceId".into(),
                    shape: Shape::string(),
                    required: true,
                }])),
                required: false,
            }])),
            required: false,
        }]);
        let service = Service::new(ServiceDef {
            name: "ec2".into(),
            operations: vec![OperationDef {
                name: "describe_instances".into(),
                requires: Vec::new(),
                output_shape: output.clone(),
            }],
        });

        let method = Rc::new(Method::new("ec2".into(), "describe_instances".into(), Vec::new(), output));
        let plans = method.how_to_get(
            "InstanceId",
            None,
            None,
            &Args::new(),
            &Default::default(),
            &Default::default(),
        );
        let Arg::CallOutput(co) = &plans[0] else {
            panic!("expected call output");
        };
        let resolved = co.unlazy(&service).expect("describe_instances has no required inputs");

        let args = Args::new().with("value".into(), Arg::CallOutput(resolved));
        let mut cache = ExecCache::new();
        let rows = execute(&args, &service, &MockInvoker, &mut cache).unwrap();
        let values: Vec<&Value> = rows.iter().map(|r| &r["value"]).collect();
        assert_eq!(values, vec![&serde_json::json!("i-1"), &serde_json::json!("i-2")]);
    }

    #[test]
    fn lazy_call_cannot_execute() {
        let method = Rc::new(Method::new("ec2".into(), "describe_instances".into(), Vec::new(), Shape::string()));
        let lazy = CallOutput {
            call: CallState::Lazy(LazyCall {
                method,
                args: Args::new(),
                excluded_methods: Default::default(),
                used_keys: Default::default(),
            }),
            output_path: crate::output_path::OutputPath::root(),
            method_score: (0, 0, 0),
            path_score: (0, 0, 0),
            shape: None,
        };
        let service = Service::new(ServiceDef {
            name: "ec2".into(),
            operations: Vec::new(),
        });
        let args = Args::new().with("v".into(), Arg::CallOutput(lazy));
        let mut cache = ExecCache::new();
        let err = execute(&args, &service, &MockInvoker, &mut cache).unwrap_err();
        assert!(matches!(err, ExecuteError::NotResolved));
    }
}
