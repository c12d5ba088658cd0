// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Service`] owns a cloud service's operation catalogue and runs the
//! best-first search that answers "how do I get a value for this key".

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ccx_core::Shape;

use crate::arg::{Arg, Args, ExcludedMethods, UsedKeys};
use crate::key_spec::KeySpec;
use crate::method::Method;

/// One operation's static description: its name, required inputs, and
/// output shape. Supplied by whatever loads the service model (out of
/// scope here — this crate never talks to a cloud SDK).
#[derive(Debug, Clone)]
pub struct OperationDef {
    pub name: String,
    pub requires: Vec<(String, Shape)>,
    pub output_shape: Shape,
}

/// A named collection of operations the planner can search over.
#[derive(Debug, Clone)]
pub struct ServiceDef {
    pub name: String,
    pub operations: Vec<OperationDef>,
}

/// A live planner instance over one [`ServiceDef`]. Memoizes constructed
/// [`Method`]s so repeated lookups reuse the same instance (and its call
/// cache).
pub struct Service {
    def: ServiceDef,
    methods: RefCell<HashMap<String, Rc<Method>>>,
}

impl Service {
    #[must_use]
    pub fn new(def: ServiceDef) -> Self {
        Service {
            def,
            methods: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    fn make_method(&self, name: &str) -> Rc<Method> {
        if let Some(existing) = self.methods.borrow().get(name) {
            return Rc::clone(existing);
        }
        let def = self
            .def
            .operations
            .iter()
            .find(|o| o.name == name)
            .expect("operation name drawn from this service's own catalogue");
        let method = Rc::new(Method::new(
            self.def.name.clone(),
            def.name.clone(),
            def.requires.clone(),
            def.output_shape.clone(),
        ));
        self.methods.borrow_mut().insert(name.to_string(), Rc::clone(&method));
        method
    }

    /// Find a ranked set of plans for deriving a value for `key`.
    ///
    /// Returns the single best-scoring group of plans: all plans tied for
    /// the best score, sorted with the highest-scoring first. Returns an
    /// empty vec if no read-only operation of this service can supply the
    /// key without forming a cycle.
    #[must_use]
    pub fn how_to_get(
        &self,
        key: &str,
        method_name: Option<&str>,
        shape: Option<&Shape>,
        args: &Args,
        excluded_methods: &ExcludedMethods,
        used_keys: &UsedKeys,
    ) -> Vec<Arg> {
        if let Some(values) = shape.and_then(Shape::enum_values) {
            return vec![Arg::Multi(
                values.iter().map(|v| serde_json::Value::String(v.clone())).collect(),
            )];
        }

        let key_spec = KeySpec::make(key, None);
        let method_key_spec = KeySpec::make(key, method_name);
        let best_patterns = key_spec.matcher_token_patterns();
        let best_method_patterns = method_key_spec.matcher_token_patterns();

        let mut best = Vec::new();
        let mut best_method = Vec::new();
        let mut good = Vec::new();
        let mut bad = Vec::new();

        for op in &self.def.operations {
            if excluded_methods.contains(&op.name) || !is_read_only_verb(&op.name) {
                continue;
            }
            let method = self.make_method(&op.name);
            if best_patterns.iter().any(|p| p == &method.path) {
                best.push(method);
            } else if best_method_patterns.iter().any(|p| p == &method.path) {
                best_method.push(method);
            } else if key_spec.matches(&method.path) {
                good.push(method);
            } else {
                bad.push(method);
            }
        }

        for (bucket, is_best) in [(best, true), (best_method, true), (good, false), (bad, false)] {
            let mut offers = Vec::new();
            for method in &bucket {
                offers.extend(method.how_to_get(key, method_name, shape, args, excluded_methods, used_keys));
            }
            if let Some(resolved) = self.sort_calls(offers, is_best) {
                return resolved;
            }
        }
        Vec::new()
    }

    /// Group `offers` by quick score (descending), and return the
    /// highest-scoring group that has at least one resolvable member,
    /// itself sorted by full score (descending). Lower-scoring groups are
    /// never even attempted once a higher one yields a result, matching
    /// the "stop at the first candidate bucket that works" search order.
    fn sort_calls(&self, offers: Vec<Arg>, extend_with_requires_len: bool) -> Option<Vec<Arg>> {
        if offers.is_empty() {
            return None;
        }

        let mut scored: Vec<(Vec<i64>, Arg)> = offers
            .into_iter()
            .map(|arg| {
                let score = quick_score_vec(&arg, extend_with_requires_len);
                (score, arg)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut idx = 0;
        while idx < scored.len() {
            let group_score = scored[idx].0.clone();
            let mut group_end = idx;
            while group_end < scored.len() && scored[group_end].0 == group_score {
                group_end += 1;
            }

            let mut resolved: Vec<Arg> = scored[idx..group_end]
                .iter()
                .filter_map(|(_, arg)| arg.unlazy(self))
                .collect();

            if !resolved.is_empty() {
                resolved.sort_by(|a, b| full_score(b).cmp(&full_score(a)));
                return Some(resolved);
            }

            idx = group_end;
        }
        None
    }
}

fn quick_score_vec(arg: &Arg, extend_with_requires_len: bool) -> Vec<i64> {
    let Arg::CallOutput(co) = arg else {
        return vec![i64::MAX];
    };
    let mut v = Vec::with_capacity(4);
    if extend_with_requires_len {
        v.push(-(co.method_requires_len() as i64));
    }
    v.push(co.path_score.0);
    v.push(co.path_score.1);
    v.push(co.path_score.2);
    v.push(co.method_score.0);
    v.push(co.method_score.1);
    v.push(co.method_score.2);
    v
}

fn full_score(arg: &Arg) -> (crate::key_spec::Score, crate::key_spec::Score, i64, i64, i64) {
    match arg {
        Arg::CallOutput(co) => co.full_score(),
        _ => (
            crate::key_spec::NEG_INF_SCORE,
            crate::key_spec::NEG_INF_SCORE,
            0,
            0,
            0,
        ),
    }
}

fn is_read_only_verb(name: &str) -> bool {
    name.starts_with("list") || name.starts_with("describe") || name.starts_with("get")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccx_core::StructureMember;

    fn ec2_service() -> Service {
        let instances_output = Shape::structure(vec![StructureMember {
            name: "Reservations".into(),
            shape: Shape::list(Shape::structure(vec![StructureMember {
                name: "Instances".into(),
                shape: Shape::list(Shape::structure(vec![
                    StructureMember {
                        name: "InstanceId".into(),
                        shape: Shape::string(),
                        required: true,
                    },
                    StructureMember {
                        name: "SubnetId".into(),
                        shape: Shape::string(),
                        required: false,
                    },
                ])),
                required: false,
            }])),
            required: false,
        }]);
        let addresses_output = Shape::structure(vec![StructureMember {
            name: "Addresses".into(),
            shape: Shape::list(Shape::structure(vec![StructureMember {
                name: "InstanceId".into(),
                shape: Shape::string(),
                required: true,
            }])),
            required: false,
        }]);

        Service::new(ServiceDef {
            name: "ec2".into(),
            operations: vec![
                OperationDef {
                    name: "describe_instances".into(),
                    requires: Vec::new(),
                    output_shape: instances_output,
                },
                OperationDef {
                    name: "describe_addresses".into(),
                    requires: vec![("InstanceId".into(), Shape::string())],
                    output_shape: addresses_output,
                },
            ],
        })
    }

    #[test]
    fn exact_match_resolves_without_extra_calls() {
        let service = ec2_service();
        let plans = service.how_to_get(
            "InstanceId",
            None,
            None,
            &Args::new(),
            &Default::default(),
            &Default::default(),
        );
        assert!(!plans.is_empty());
        let Arg::CallOutput(co) = &plans[0] else {
            panic!("expected a call output");
        };
        assert_eq!(co.call.method().name, "describe_instances");
    }

    #[test]
    fn cycle_through_requiring_method_is_rejected() {
        let service = ec2_service();
        // describe_addresses requires InstanceId; asking it to supply its
        // own InstanceId would be a cycle, so it must be excluded and the
        // planner must fall back to describe_instances instead.
        let mut excluded = ExcludedMethods::new();
        excluded.insert("describe_addresses".to_string());
        let plans = service.how_to_get("InstanceId", Some("describe_addresses"), None, &Args::new(), &excluded, &Default::default());
        assert!(plans.iter().all(|p| match p {
            Arg::CallOutput(co) => co.call.method().name != "describe_addresses",
            _ => true,
        }));
    }

    #[test]
    fn unknown_key_yields_no_plan() {
        let service = ec2_service();
        let plans = service.how_to_get(
            "TotallyUnrelatedThing",
            None,
            None,
            &Args::new(),
            &Default::default(),
            &Default::default(),
        );
        assert!(plans.is_empty());
    }
}
