//! Schema-driven planning.
//!
//! The host hands the provider its prior state and the proposed
//! configuration; [`plan_resource`] works out which attributes change and
//! whether any of them force the resource to be replaced.

use serde_json::{Map, Value};

use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};

const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// Plan a change for one resource.
///
/// - no prior state: every configured attribute is reported as added
/// - `proposed` is null: every attribute of the prior state is reported as removed
/// - otherwise: computed-only attributes are carried over from the prior
///   state, configured attributes are diffed, and a change to a force-new
///   attribute marks the plan as requiring replacement
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|state| !state.is_null());

    match prior {
        None => plan_create(schema, proposed),
        Some(prior) if proposed.is_null() => plan_delete(schema, prior),
        Some(prior) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let changes = schema
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.flags.is_computed_only())
        .filter_map(|(name, attr)| {
            field(proposed, name).map(|value| AttributeChange::added(name, masked(attr, value)))
        })
        .collect();

    PlanResult::with_changes(proposed.clone(), changes, false)
}

fn plan_delete(schema: &Schema, prior: &Value) -> PlanResult {
    let changes = schema
        .attributes
        .iter()
        .filter_map(|(name, attr)| {
            field(prior, name).map(|value| AttributeChange::removed(name, masked(attr, value)))
        })
        .collect();

    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut planned = match proposed {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.attributes {
        if attr.flags.is_computed_only() {
            if !planned.get(name).is_some_and(|value| !value.is_null()) {
                if let Some(value) = field(prior, name) {
                    planned.insert(name.clone(), value.clone());
                }
            }
            continue;
        }

        let before = field(prior, name);
        let after = planned.get(name).filter(|value| !value.is_null());
        if before == after {
            continue;
        }

        requires_replace |= attr.force_new;
        changes.push(AttributeChange::new(
            name,
            before.map(|value| masked(attr, value)),
            after.map(|value| masked(attr, value)),
        ));
    }

    let planned = Value::Object(planned);
    if changes.is_empty() {
        PlanResult::no_change(planned)
    } else {
        PlanResult::with_changes(planned, changes, requires_replace)
    }
}

fn field<'a>(state: &'a Value, name: &str) -> Option<&'a Value> {
    state.get(name).filter(|value| !value.is_null())
}

fn masked(attr: &Attribute, value: &Value) -> Value {
    if attr.flags.sensitive {
        Value::String(SENSITIVE_PLACEHOLDER.to_string())
    } else {
        value.clone()
    }
}
