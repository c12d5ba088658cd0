// SPDX-License-Identifier: MIT OR Apache-2.0
//! The fallback path of spec.md §4.6 step 5: when no static source answers
//! a flag, ask the grabber's planner for a plan and run it.

use ccx_grabber::{Args, ExcludedMethods, Service, UsedKeys};

/// Performs the actual operation call a plan names. Object-safe (unlike
/// `ccx_grabber::execute::Invoker`, which carries an associated error
/// type), so `OperationInfo` can hold one behind a plain reference instead
/// of needing its own type parameter.
pub trait PlannerInvoker {
    fn invoke(
        &self,
        operation: &str,
        input: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<serde_json::Value>, String>;
}

struct InvokerAdapter<'a>(&'a dyn PlannerInvoker);

impl ccx_grabber::execute::Invoker for InvokerAdapter<'_> {
    type Error = String;

    fn invoke(
        &self,
        operation: &str,
        input: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<serde_json::Value>, String> {
        self.0.invoke(operation, input)
    }
}

/// Everything the engine needs to fall back to the planner for one flag:
/// the service to search, the verb of the command being completed (to
/// prefer methods whose own name matches, per spec.md §4.4 step 2's
/// `method_key_spec`), and something to actually run the chosen plan.
pub struct PlannerRequest<'a> {
    pub service: &'a Service,
    pub method_verb: Option<&'a str>,
    pub invoker: &'a dyn PlannerInvoker,
}

/// Ask the planner for `key`, execute its top-ranked plan, and return the
/// scalar values it yields, stringified.
#[must_use]
pub fn complete_via_planner(request: &PlannerRequest<'_>, key: &str) -> Vec<String> {
    let plans = request.service.how_to_get(
        key,
        request.method_verb,
        None,
        &Args::new(),
        &ExcludedMethods::new(),
        &UsedKeys::new(),
    );
    let Some(top) = plans.into_iter().next() else {
        return Vec::new();
    };

    let args = Args::from_pairs(vec![("value".to_string(), top)]);
    let mut cache = ccx_grabber::execute::ExecCache::new();
    let adapter = InvokerAdapter(request.invoker);
    let Ok(rows) = ccx_grabber::execute::execute(&args, request.service, &adapter, &mut cache) else {
        return Vec::new();
    };
    rows.into_iter()
        .filter_map(|row| row.get("value").map(value_to_string))
        .collect()
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
