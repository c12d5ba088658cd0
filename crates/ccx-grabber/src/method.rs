// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Method`] wraps one service operation and knows how to offer its own
//! output as a value for some requested key, and how to resolve its own
//! required inputs by asking the owning [`crate::Service`] for each of
//! them in turn.

use std::cell::RefCell;
use std::rc::Rc;

use ccx_core::{singularise, Shape};

use crate::arg::{Arg, Args, CallOutput, CallState, ExcludedMethods, LazyCall, UsedKeys};
use crate::key_spec::KeySpec;
use crate::output_path::OutputPath;
use crate::service::Service;

/// One read-only operation: its name, the tokens derived from that name
/// (with the leading verb stripped), its required inputs, and its output
/// shape tree.
#[derive(Debug)]
pub struct Method {
    pub service_name: String,
    pub name: String,
    /// Name tokens after the leading verb (`describe`, `list`, `get`),
    /// singularised — e.g. `describe_instances` -> `["instance"]`.
    pub path: Vec<String>,
    pub requires: Vec<(String, Shape)>,
    cache: RefCell<Vec<(Args, Vec<CacheEntry>)>>,
    pub output_shape: Shape,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    excluded_methods: ExcludedMethods,
    used_keys: UsedKeys,
    result: Option<Args>,
}

impl Method {
    #[must_use]
    pub fn new(service_name: String, name: String, requires: Vec<(String, Shape)>, output_shape: Shape) -> Self {
        let path = name
            .to_lowercase()
            .split('_')
            .skip(1)
            .map(singularise)
            .filter(|t| !t.is_empty())
            .collect();
        Method {
            service_name,
            name,
            path,
            requires,
            cache: RefCell::new(Vec::new()),
            output_shape,
        }
    }

    /// Offer this method's output as a candidate source for `key`.
    ///
    /// Returns resolved terminal values directly (`Arg::Multi`) when
    /// `shape` is itself an enumerated string or list-of-enum — no call is
    /// needed, the answer is the enumerated value set. Otherwise returns
    /// one [`Arg::CallOutput`] per scalar leaf of this method's output
    /// shape whose derived path scores against `key`, each still lazy.
    ///
    /// Returns an empty vec if `key`'s tokens collide with one of this
    /// method's own required-input key specs (the call would need itself
    /// to supply one of its own arguments).
    #[must_use]
    pub fn how_to_get(
        self: &Rc<Self>,
        key: &str,
        method_name: Option<&str>,
        shape: Option<&Shape>,
        args: &Args,
        excluded_methods: &ExcludedMethods,
        used_keys: &UsedKeys,
    ) -> Vec<Arg> {
        if let Some(direct) = enum_answer(shape) {
            return vec![direct];
        }

        let own_key_tokens = KeySpec::make(key, None).without_format().to_vec();
        let mut used_keys = used_keys.clone();
        used_keys.insert(own_key_tokens);

        let requires_keys: Vec<Vec<String>> = self
            .requires
            .iter()
            .map(|(name, _)| KeySpec::make(name, None).without_format().to_vec())
            .collect();
        if used_keys.iter().any(|k| requires_keys.contains(k)) {
            return Vec::new();
        }

        let scoring_key_spec = KeySpec::make(key, method_name);
        let method_score = match scoring_key_spec.score(&self.path) {
            Some(s) => s,
            None => return Vec::new(),
        };

        let mut out = Vec::new();
        for (path, _leaf_shape) in OutputPath::from_shape(&self.output_shape) {
            let combined = {
                let mut items = self.path.clone();
                items.extend(path.for_scoring());
                items
            };
            let Some(path_score) = scoring_key_spec.score(&combined) else {
                continue;
            };
            out.push(Arg::CallOutput(CallOutput {
                call: CallState::Lazy(LazyCall {
                    method: Rc::clone(self),
                    args: args.clone(),
                    excluded_methods: excluded_methods.clone(),
                    used_keys: used_keys.clone(),
                }),
                output_path: path,
                method_score,
                path_score,
                shape: shape.cloned(),
            }));
        }
        out
    }

    /// Resolve every required input of this method, asking `service` to
    /// supply each one, and memoize the result keyed by the already-bound
    /// `args` plus the exclusion/used-key context (the same partial args
    /// can resolve differently depending on what's already been tried
    /// along the current search path).
    #[must_use]
    pub fn how_to_call(
        &self,
        service: &Service,
        args: &Args,
        excluded_methods: &ExcludedMethods,
        used_keys: &UsedKeys,
    ) -> Option<Args> {
        {
            let cache = self.cache.borrow();
            for (cached_args, entries) in cache.iter() {
                if cached_args != args {
                    continue;
                }
                for entry in entries {
                    if &entry.excluded_methods == excluded_methods && &entry.used_keys == used_keys {
                        return entry.result.clone();
                    }
                }
            }
        }

        let mut inner_excluded = excluded_methods.clone();
        inner_excluded.insert(self.name.clone());

        let mut resolved = args.clone();
        let mut failed = false;
        for (name, shape) in &self.requires {
            if resolved.contains_key(name) {
                continue;
            }
            let candidates = service.how_to_get(
                name,
                Some(&self.name),
                Some(shape),
                &resolved,
                &inner_excluded,
                used_keys,
            );
            match candidates.into_iter().next() {
                Some(arg) => resolved = resolved.with(name.clone(), arg),
                None => {
                    failed = true;
                    break;
                }
            }
        }

        let result = if failed { None } else { Some(resolved) };
        self.cache
            .borrow_mut()
            .entry_for(args)
            .push(CacheEntry {
                excluded_methods: excluded_methods.clone(),
                used_keys: used_keys.clone(),
                result: result.clone(),
            });
        result
    }
}

trait CacheVec {
    fn entry_for(&mut self, args: &Args) -> &mut Vec<CacheEntry>;
}

impl CacheVec for Vec<(Args, Vec<CacheEntry>)> {
    fn entry_for(&mut self, args: &Args) -> &mut Vec<CacheEntry> {
        if let Some(idx) = self.iter().position(|(a, _)| a == args) {
            return &mut self[idx].1;
        }
        self.push((args.clone(), Vec::new()));
        let last = self.len() - 1;
        &mut self[last].1
    }
}

fn enum_answer(shape: Option<&Shape>) -> Option<Arg> {
    let shape = shape?;
    let values = shape.enum_values()?;
    Some(Arg::Multi(
        values.iter().map(|v| serde_json::Value::String(v.clone())).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccx_core::StructureMember;

    fn instances_method() -> Rc<Method> {
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
        Rc::new(Method::new(
            "ec2".into(),
            "describe_instances".into(),
            Vec::new(),
            output,
        ))
    }

    #[test]
    fn how_to_get_scores_a_nested_leaf_path() {
        let method = instances_method();
        let offers = method.how_to_get("InstanceId", None, None, &Args::new(), &Default::default(), &Default::default());
        assert!(!offers.is_empty());
        let Arg::CallOutput(co) = &offers[0] else {
            panic!("expected a call output offer");
        };
        assert_eq!(co.output_path.to_jmespath(), "Reservations[].Instances[].InstanceId");
    }

    #[test]
    fn how_to_get_returns_enum_directly_without_a_call() {
        let method = instances_method();
        let shape = Shape::string_enum(["running", "stopped"]);
        let offers = method.how_to_get("State", None, Some(&shape), &Args::new(), &Default::default(), &Default::default());
        assert_eq!(offers.len(), 1);
        assert!(matches!(offers[0], Arg::Multi(_)));
    }

    #[test]
    fn how_to_get_rejects_when_key_collides_with_own_required_input() {
        let output = Shape::string();
        let method = Rc::new(Method::new(
            "ec2".into(),
            "describe_addresses".into(),
            vec![("InstanceId".into(), Shape::string())],
            output,
        ));
        let offers = method.how_to_get("InstanceId", None, None, &Args::new(), &Default::default(), &Default::default());
        assert!(offers.is_empty());
    }

    #[test]
    fn how_to_get_rejects_when_an_earlier_key_in_the_chain_collides() {
        // Not the key being resolved right now, but a key already used
        // earlier in this search path — the cycle guard must look at the
        // whole accumulated `used_keys` set, not just the new key.
        let output = Shape::string();
        let method = Rc::new(Method::new(
            "ec2".into(),
            "describe_addresses".into(),
            vec![("InstanceId".into(), Shape::string())],
            output,
        ));
        let mut used_keys = UsedKeys::new();
        used_keys.insert(KeySpec::make("InstanceId", None).without_format().to_vec());
        let offers = method.how_to_get("PublicIp", None, None, &Args::new(), &Default::default(), &used_keys);
        assert!(offers.is_empty());
    }
}
