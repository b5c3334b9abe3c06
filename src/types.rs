//! IO Type registry comparison
//!
//! Checks every reference IO Type against the proposed registry: methods,
//! events, `apiStateKeys`, supertype, type parameters and metadata defaults.
//! New types, methods and events on the proposed side are always allowed.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::compatibility::optional_equal;
use crate::descriptor::{Api, TypeDefinition};
use crate::problems::{display_value, ProblemCollector};
use crate::version::supports_api_state_keys;

/// Suffix for findings whose impact cannot be classified
pub const ADVISORY_SUFFIX: &str =
    "This may or may not be a breaking change, but we are reporting it just in case.";

/// Compare the type registries of two APIs, recording findings in `problems`
pub fn compare_type_registries(reference: &Api, proposed: &Api, problems: &mut ProblemCollector) {
    let state_keys_comparable = supports_api_state_keys(reference.version.as_ref())
        && supports_api_state_keys(proposed.version.as_ref());
    let defaults_comparable = !reference.is_legacy() && !proposed.is_legacy();

    debug!(
        reference_types = reference.types.len(),
        proposed_types = proposed.types.len(),
        state_keys_comparable,
        defaults_comparable,
        "comparing type registries"
    );

    for (type_name, reference_type) in &reference.types {
        let Some(proposed_type) = proposed.types.get(type_name) else {
            problems.breaking(format!("Type missing: {}", type_name));
            continue;
        };

        compare_methods(type_name, reference_type, proposed_type, problems);
        compare_events(type_name, reference_type, proposed_type, problems);

        if state_keys_comparable {
            compare_api_state_keys(type_name, reference_type, proposed_type, problems);
        }

        if reference_type.supertype != proposed_type.supertype {
            problems.breaking(format!(
                "{} supertype changed from {} to {}. {}",
                type_name,
                display_name(reference_type.supertype.as_deref()),
                display_name(proposed_type.supertype.as_deref()),
                ADVISORY_SUFFIX
            ));
        }

        let reference_parameters = reference_type.parameter_types.as_deref().unwrap_or_default();
        let proposed_parameters = proposed_type.parameter_types.as_deref().unwrap_or_default();
        if reference_parameters != proposed_parameters {
            problems.breaking(format!(
                "{} parameter types changed from [{}] to [{}]. {}",
                type_name,
                reference_parameters.join(", "),
                proposed_parameters.join(", "),
                ADVISORY_SUFFIX
            ));
        }

        if defaults_comparable {
            compare_metadata_defaults(type_name, reference_type, proposed_type, problems);
        }
    }
}

fn compare_methods(
    type_name: &str,
    reference_type: &TypeDefinition,
    proposed_type: &TypeDefinition,
    problems: &mut ProblemCollector,
) {
    for (method_name, reference_method) in &reference_type.methods {
        let Some(proposed_method) = proposed_type.methods.get(method_name) else {
            problems.breaking(format!(
                "Method missing, type={}, method={}",
                type_name, method_name
            ));
            continue;
        };

        if reference_method.parameter_types != proposed_method.parameter_types {
            problems.breaking(format!(
                "{}.{} has different parameter types: [{}] => [{}]",
                type_name,
                method_name,
                reference_method.parameter_types.join(", "),
                proposed_method.parameter_types.join(", ")
            ));
        }

        if reference_method.return_type != proposed_method.return_type {
            problems.breaking(format!(
                "{}.{} has a different return type {} => {}",
                type_name,
                method_name,
                display_name(reference_method.return_type.as_deref()),
                display_name(proposed_method.return_type.as_deref())
            ));
        }
    }
}

fn compare_events(
    type_name: &str,
    reference_type: &TypeDefinition,
    proposed_type: &TypeDefinition,
    problems: &mut ProblemCollector,
) {
    for event in &reference_type.events {
        if !proposed_type.events.contains(event) {
            problems.breaking(format!("{} is missing event: {}", type_name, event));
        }
    }
}

fn compare_api_state_keys(
    type_name: &str,
    reference_type: &TypeDefinition,
    proposed_type: &TypeDefinition,
    problems: &mut ProblemCollector,
) {
    match (&reference_type.api_state_keys, &proposed_type.api_state_keys) {
        (Some(_), None) => {
            problems.append_both(format!("{} apiStateKeys unexpectedly removed", type_name), true);
        }
        (None, Some(_)) => {
            problems.designed(format!("{} apiStateKeys unexpectedly added", type_name));
        }
        (Some(reference_keys), Some(proposed_keys)) => {
            let reference_set: BTreeSet<&str> = reference_keys.iter().map(String::as_str).collect();
            let proposed_set: BTreeSet<&str> = proposed_keys.iter().map(String::as_str).collect();
            if reference_set == proposed_set {
                return;
            }

            let removed: Vec<&str> = reference_set.difference(&proposed_set).copied().collect();
            let added: Vec<&str> = proposed_set.difference(&reference_set).copied().collect();
            let problem = format!(
                "{} apiStateKeys differ:\n  In reference but not proposed: {}\n  In proposed but not reference: {}",
                type_name,
                removed.join(", "),
                added.join(", ")
            );

            // Dropping a key loses state a client may rely on; adding one does not.
            if !removed.is_empty() {
                problems.breaking(problem.clone());
            }
            problems.designed(problem);
        }
        (None, None) => {}
    }
}

fn compare_metadata_defaults(
    type_name: &str,
    reference_type: &TypeDefinition,
    proposed_type: &TypeDefinition,
    problems: &mut ProblemCollector,
) {
    for (key, reference_value) in &reference_type.metadata_defaults {
        let proposed_value = proposed_type.metadata_defaults.get(key);
        if !optional_equal(Some(reference_value), proposed_value) {
            problems.breaking(format!(
                "{} metadata value {} changed from \"{}\" to \"{}\". {}",
                type_name,
                key,
                display_value(Some(reference_value)),
                display_value(proposed_value),
                ADVISORY_SUFFIX
            ));
        }
    }
}

/// Absent names render like any other absent value
fn display_name(name: Option<&str>) -> String {
    display_value(name.map(Value::from).as_ref())
}
