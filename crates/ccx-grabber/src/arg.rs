// SPDX-License-Identifier: MIT OR Apache-2.0
//! The value side of a plan: [`Arg`] bindings and the frozen [`Args`] set a
//! resolved [`crate::Method`] call carries.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::key_spec::Score;
use crate::method::Method;
use crate::output_path::OutputPath;

/// The set of excluded method names threaded through a search to forbid
/// cycles (a method can never be used to supply one of its own inputs).
pub type ExcludedMethods = BTreeSet<String>;

/// The set of key-token sequences already in use along the current search
/// path, also for cycle avoidance (the same *kind* of key can't recur).
pub type UsedKeys = BTreeSet<Vec<String>>;

/// A call not yet known to be satisfiable: the method to call and the
/// context (already-bound args, exclusions) needed to try resolving it.
#[derive(Debug, Clone)]
pub struct LazyCall {
    pub method: Rc<Method>,
    pub args: Args,
    pub excluded_methods: ExcludedMethods,
    pub used_keys: UsedKeys,
}

impl PartialEq for LazyCall {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.method, &other.method)
            && self.args == other.args
            && self.excluded_methods == other.excluded_methods
            && self.used_keys == other.used_keys
    }
}

/// A call whose required inputs have all been resolved to concrete `Args`.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub method: Rc<Method>,
    pub args: Args,
}

impl PartialEq for ResolvedCall {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.method, &other.method) && self.args == other.args
    }
}

/// Either side of a call's resolution state.
#[derive(Debug, Clone, PartialEq)]
pub enum CallState {
    Lazy(LazyCall),
    Resolved(ResolvedCall),
}

impl CallState {
    #[must_use]
    pub fn method(&self) -> &Rc<Method> {
        match self {
            CallState::Lazy(l) => &l.method,
            CallState::Resolved(r) => &r.method,
        }
    }
}

/// A value bound to a method call's output: which method, which output
/// path, and how well both the method and the path scored against the key
/// that was being looked up.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutput {
    pub call: CallState,
    pub output_path: OutputPath,
    pub method_score: Score,
    pub path_score: Score,
    pub shape: Option<ccx_core::Shape>,
}

impl CallOutput {
    /// How many required inputs the underlying method takes. Used to
    /// extend the ranking score for candidates in the "exact path match"
    /// buckets, where fewer required inputs is strictly better.
    #[must_use]
    pub fn method_requires_len(&self) -> usize {
        self.call.method().requires.len()
    }

    /// Resolve the underlying call if it is still lazy. Returns [`None`]
    /// if resolution fails (no way to supply one of the method's other
    /// required inputs). Idempotent: a [`CallState::Resolved`] call
    /// returns itself unchanged.
    #[must_use]
    pub fn unlazy(&self, service: &crate::service::Service) -> Option<CallOutput> {
        match &self.call {
            CallState::Resolved(_) => Some(self.clone()),
            CallState::Lazy(lazy) => {
                let resolved_args = lazy.method.how_to_call(
                    service,
                    &lazy.args,
                    &lazy.excluded_methods,
                    &lazy.used_keys,
                )?;
                Some(CallOutput {
                    call: CallState::Resolved(ResolvedCall {
                        method: Rc::clone(&lazy.method),
                        args: resolved_args,
                    }),
                    ..self.clone()
                })
            }
        }
    }

    /// The full ranking score for an already-resolved call: path score,
    /// method score, then (negated, so "more" sorts worse) plan
    /// complexity, required-argument count and output path length — all
    /// as tie-breakers preferring simpler plans.
    #[must_use]
    pub fn full_score(&self) -> (Score, Score, i64, i64, i64) {
        let (complexity, path_len) = match &self.call {
            CallState::Resolved(r) => (r.args.complexity_score() as i64, self.output_path_len()),
            CallState::Lazy(_) => (0, self.output_path_len()),
        };
        (
            self.path_score,
            self.method_score,
            -complexity,
            -(self.method_requires_len() as i64),
            -path_len,
        )
    }

    fn output_path_len(&self) -> i64 {
        self.output_path.non_branching().len() as i64
    }
}

/// A bound argument value: either a literal value (possibly multi-valued,
/// to be expanded as a Cartesian product at execution time) or a value
/// drawn from another method call's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A single literal value.
    Static(serde_json::Value),
    /// Several literal candidate values (e.g. an enumerated shape's full
    /// value set), expanded at execution time.
    Multi(Vec<serde_json::Value>),
    /// A value drawn from a (possibly still-lazy) method call.
    CallOutput(CallOutput),
}

impl Arg {
    /// Resolve this binding's underlying call, if any. Literal bindings
    /// are already resolved and return themselves.
    #[must_use]
    pub fn unlazy(&self, service: &crate::service::Service) -> Option<Arg> {
        match self {
            Arg::Static(_) | Arg::Multi(_) => Some(self.clone()),
            Arg::CallOutput(co) => co.unlazy(service).map(Arg::CallOutput),
        }
    }
}

/// A frozen set of `(name, Arg)` bindings, sorted by name. Used both as the
/// resolved argument list for a call and as the memoization key for a
/// [`Method`]'s plan cache.
#[derive(Debug, Clone, Default)]
pub struct Args(Vec<(String, Arg)>);

impl PartialEq for Args {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_pairs(mut pairs: Vec<(String, Arg)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Self(pairs)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Arg)> {
        self.0.iter()
    }

    /// This set with `name` bound to `arg`, replacing any existing binding
    /// of the same name.
    #[must_use]
    pub fn with(&self, name: String, arg: Arg) -> Args {
        let mut pairs: Vec<(String, Arg)> =
            self.0.iter().filter(|(k, _)| k != &name).cloned().collect();
        pairs.push((name, arg));
        Args::from_pairs(pairs)
    }

    /// The transitive set of method names referenced by resolved
    /// `CallOutput` bindings in this set.
    #[must_use]
    pub fn used_methods(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_used_methods(&mut out);
        out
    }

    fn collect_used_methods(&self, out: &mut BTreeSet<String>) {
        for (_, arg) in &self.0 {
            if let Arg::CallOutput(co) = arg {
                out.insert(co.call.method().name.clone());
                if let CallState::Resolved(r) = &co.call {
                    r.args.collect_used_methods(out);
                }
            }
        }
    }

    /// `1 +` the sum of every resolved child call's own complexity. A
    /// plan that chains more calls together scores as more complex.
    #[must_use]
    pub fn complexity_score(&self) -> u32 {
        1 + self
            .0
            .iter()
            .map(|(_, arg)| match arg {
                Arg::CallOutput(co) => match &co.call {
                    CallState::Resolved(r) => r.args.complexity_score(),
                    CallState::Lazy(_) => 0,
                },
                _ => 0,
            })
            .sum::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_replaces_existing_binding() {
        let args = Args::new()
            .with("a".into(), Arg::Static(serde_json::json!(1)))
            .with("a".into(), Arg::Static(serde_json::json!(2)));
        assert_eq!(args.get("a"), Some(&Arg::Static(serde_json::json!(2))));
        assert_eq!(args.iter().count(), 1);
    }

    #[test]
    fn complexity_score_counts_only_resolved_children() {
        let args = Args::new().with("a".into(), Arg::Static(serde_json::json!("x")));
        assert_eq!(args.complexity_score(), 1);
    }
}
