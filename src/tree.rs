//! Element tree comparison
//!
//! Walks the reference and proposed element trees in lock-step. Each
//! instrumented reference element has its complete metadata and its
//! `initialState` checked against the proposed element; then children are
//! matched by name.
//!
//! Once an element is designed (`phetioDesigned: true`) its whole subtree is
//! compared strictly: any deviation, safe or not, is a designed problem.

use serde_json::Value;
use tracing::trace;

use crate::compatibility::{is_initial_state_compatible, json_deep_equal, optional_equal};
use crate::descriptor::{Api, Element, Metadata};
use crate::error::Result;
use crate::metadata::resolve_metadata;
use crate::problems::{display_value, Bucket, ProblemCollector};
use crate::version::supports_api_state_keys;

pub const DESIGNED_KEY: &str = "phetioDesigned";
pub const ARCHETYPE_ID_KEY: &str = "phetioArchetypePhetioID";

/// Path below the top-level element of the locale property, whose
/// `validValues` grows with every new translation.
const LOCALE_PROPERTY_SUFFIX: &str = "general.model.localeProperty";

/// When a change to a metadata attribute counts as breaking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakingRule {
    /// Any change breaks clients
    AnyChange,
    /// Only a change to exactly this value breaks; a change the other way
    /// widens the API
    ChangedTo(bool),
}

impl BreakingRule {
    pub fn breaks(&self, proposed: Option<&Value>) -> bool {
        match self {
            BreakingRule::AnyChange => true,
            BreakingRule::ChangedTo(sentinel) => proposed == Some(&Value::Bool(*sentinel)),
        }
    }
}

/// A metadata attribute checked for breaking changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRule {
    pub key: &'static str,
    pub breaking: BreakingRule,
}

impl AttributeRule {
    const fn any_change(key: &'static str) -> Self {
        Self {
            key,
            breaking: BreakingRule::AnyChange,
        }
    }

    const fn changed_to(key: &'static str, sentinel: bool) -> Self {
        Self {
            key,
            breaking: BreakingRule::ChangedTo(sentinel),
        }
    }
}

/// Attributes whose changes can break clients.
///
/// `phetioDocumentation`, `phetioFeatured`, `phetioHighFrequency` (clients
/// with data get the full stream), `phetioStudioControl` and `phetioDesigned`
/// are never breaking; they are only compared inside designed subtrees.
pub const BREAKING_RULES: &[AttributeRule] = &[
    AttributeRule::any_change("phetioTypeName"),
    AttributeRule::any_change("phetioEventType"),
    AttributeRule::any_change("phetioPlayback"),
    AttributeRule::any_change("phetioDynamicElement"),
    AttributeRule::any_change("phetioIsArchetype"),
    AttributeRule::any_change(ARCHETYPE_ID_KEY),
    // leaving state breaks; joining it does not
    AttributeRule::changed_to("phetioState", false),
    // becoming read-only breaks; becoming writable does not
    AttributeRule::changed_to("phetioReadOnly", true),
];

/// Where the walk is. Passed down by value, so `designed` can only turn on.
#[derive(Debug, Clone)]
struct VisitContext<'a> {
    trail: Vec<&'a str>,
    designed: bool,
}

impl<'a> VisitContext<'a> {
    fn root() -> Self {
        Self {
            trail: Vec::new(),
            designed: false,
        }
    }

    fn phetio_id(&self) -> String {
        self.trail.join(".")
    }

    fn child_id(&self, name: &str) -> String {
        if self.trail.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.phetio_id(), name)
        }
    }

    fn with_designed(&self, designed: bool) -> Self {
        Self {
            trail: self.trail.clone(),
            designed: self.designed || designed,
        }
    }

    fn child(&self, name: &'a str) -> Self {
        let mut trail = self.trail.clone();
        trail.push(name);
        Self {
            trail,
            designed: self.designed,
        }
    }

    fn is_locale_property(&self) -> bool {
        match self.trail.first() {
            Some(top) => self.phetio_id() == format!("{}.{}", top, LOCALE_PROPERTY_SUFFIX),
            None => false,
        }
    }
}

/// Compare two element trees, recording findings in `problems`.
///
/// Fails only when metadata cannot be resolved because an IO Type is missing
/// from one of the registries.
pub fn compare_element_trees(
    reference: &Api,
    proposed: &Api,
    problems: &mut ProblemCollector,
) -> Result<()> {
    let mut comparator = TreeComparator {
        reference,
        proposed,
        problems,
    };
    comparator.visit(
        VisitContext::root(),
        &reference.elements,
        &proposed.elements,
    )
}

struct TreeComparator<'a, 'p> {
    reference: &'a Api,
    proposed: &'a Api,
    problems: &'p mut ProblemCollector,
}

impl<'a, 'p> TreeComparator<'a, 'p> {
    fn visit(
        &mut self,
        ctx: VisitContext<'a>,
        reference: &'a Element,
        proposed: &'a Element,
    ) -> Result<()> {
        let ctx = if reference.is_instrumented() {
            let declared = reference.own_metadata(DESIGNED_KEY) == Some(&Value::Bool(true));
            let ctx = ctx.with_designed(declared);
            trace!(phetio_id = %ctx.phetio_id(), designed = ctx.designed, "comparing element");
            self.compare_instrumented(&ctx, reference, proposed)?;
            ctx
        } else {
            ctx
        };

        for (name, reference_child) in &reference.children {
            match proposed.child(name) {
                Some(proposed_child) => {
                    self.visit(ctx.child(name), reference_child, proposed_child)?;
                }
                None => {
                    let problem = format!("PhET-iO Element missing: {}", ctx.child_id(name));
                    self.problems.append_both(problem, ctx.designed);
                }
            }
        }

        if ctx.designed {
            for name in proposed.children.keys() {
                if !reference.children.contains_key(name) {
                    self.problems.designed(format!(
                        "New PhET-iO Element (or uninstrumented intermediate container) not in reference: {}",
                        ctx.child_id(name)
                    ));
                }
            }
        }

        Ok(())
    }

    fn compare_instrumented(
        &mut self,
        ctx: &VisitContext<'a>,
        reference: &Element,
        proposed: &Element,
    ) -> Result<()> {
        let phetio_id = ctx.phetio_id();
        let reference_metadata = resolve_metadata(reference, self.reference)?;
        let proposed_metadata = resolve_metadata(proposed, self.proposed)?;

        for rule in BREAKING_RULES {
            let old = reference_metadata.get(rule.key);
            let new = proposed_metadata.get(rule.key);
            if self.metadata_changed(rule.key, old, new) && rule.breaking.breaks(new) {
                self.problems
                    .breaking(metadata_change(&phetio_id, rule.key, old, new));
            }
        }

        if ctx.designed {
            self.compare_designed_metadata(&phetio_id, &reference_metadata, &proposed_metadata);
        }

        self.compare_initial_state(ctx, &phetio_id, reference, proposed);
        Ok(())
    }

    fn compare_designed_metadata(
        &mut self,
        phetio_id: &str,
        reference_metadata: &Metadata,
        proposed_metadata: &Metadata,
    ) {
        for (key, old) in reference_metadata {
            let new = proposed_metadata.get(key);
            if self.metadata_changed(key, Some(old), new) {
                self.problems
                    .designed(metadata_change(phetio_id, key, Some(old), new));
            }
        }
    }

    /// Whether an attribute really changed, ignoring differences that only
    /// come from the legacy format boundary
    fn metadata_changed(&self, key: &str, old: Option<&Value>, new: Option<&Value>) -> bool {
        if optional_equal(old, new) {
            return false;
        }

        // Legacy APIs left the archetype ID out where current ones write null.
        let legacy_archetype_gap = key == ARCHETYPE_ID_KEY
            && ((self.proposed.is_legacy() && old == Some(&Value::Null) && new.is_none())
                || (self.reference.is_legacy() && old.is_none() && new == Some(&Value::Null)));

        !legacy_archetype_gap
    }

    fn compare_initial_state(
        &mut self,
        ctx: &VisitContext<'a>,
        phetio_id: &str,
        reference: &Element,
        proposed: &Element,
    ) {
        match (reference.initial_state(), proposed.initial_state()) {
            (Some(_), None) => {
                // Without a shared notion of apiStateKeys the absence is reported loudly.
                let reference_keys = supports_api_state_keys(self.reference.version.as_ref());
                let proposed_keys = supports_api_state_keys(self.proposed.version.as_ref());
                if reference_keys != proposed_keys {
                    self.problems.append_both(
                        format!("{}._data.initialState is missing from proposed API", phetio_id),
                        ctx.designed,
                    );
                }
            }
            (Some(expected), Some(actual)) => {
                if ctx.designed && !json_deep_equal(expected, actual) {
                    self.problems.append(
                        initial_state_change(phetio_id, expected, actual),
                        Bucket::Designed,
                    );
                }
                if !breaking_state_compatible(ctx, expected, actual) {
                    self.problems.append(
                        initial_state_change(phetio_id, expected, actual),
                        Bucket::Breaking,
                    );
                }
            }
            (None, Some(_)) if ctx.designed => {
                self.problems.designed(format!(
                    "{}._data.initialState is new in the proposed API but not in the reference API",
                    phetio_id
                ));
            }
            _ => {}
        }
    }
}

/// Breaking check for one element's `initialState`.
///
/// The locale property may gain locales freely; it must keep all of the old ones.
fn breaking_state_compatible(ctx: &VisitContext<'_>, expected: &Value, actual: &Value) -> bool {
    if ctx.is_locale_property() {
        if let Some(expected_locales) = expected.get("validValues").and_then(Value::as_array) {
            let actual_locales = actual
                .get("validValues")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            return expected_locales
                .iter()
                .all(|locale| actual_locales.iter().any(|a| json_deep_equal(locale, a)));
        }
    }
    is_initial_state_compatible(expected, actual)
}

fn metadata_change(
    phetio_id: &str,
    key: &str,
    old: Option<&Value>,
    new: Option<&Value>,
) -> String {
    format!(
        "{}.{} changed from \"{}\" to \"{}\"",
        phetio_id,
        key,
        display_value(old),
        display_value(new)
    )
}

fn initial_state_change(phetio_id: &str, expected: &Value, actual: &Value) -> String {
    format!(
        "{}._data.initialState differs. \nExpected:\n{}\n actual:\n{}\n",
        phetio_id, expected, actual
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ApiDescriptor;
    use crate::normalize::up_convert;
    use crate::problems::{CompareOptions, ComparisonReport};
    use serde_json::json;

    fn current(version_minor: u64, elements: Value) -> Api {
        up_convert(
            &ApiDescriptor::from_value(json!({
                "version": { "major": 1, "minor": version_minor },
                "phetioElements": elements,
                "phetioTypes": {
                    "ObjectIO": {
                        "supertype": null,
                        "metadataDefaults": {
                            "phetioTypeName": "ObjectIO",
                            "phetioState": true,
                            "phetioReadOnly": false,
                            "phetioDesigned": false,
                            "phetioDocumentation": "",
                            "phetioArchetypePhetioID": null
                        }
                    }
                }
            }))
            .unwrap(),
        )
    }

    fn legacy(elements: Value) -> Api {
        up_convert(
            &ApiDescriptor::from_value(json!({ "phetioElements": elements, "phetioTypes": {} }))
                .unwrap(),
        )
    }

    fn compare(reference: &Api, proposed: &Api) -> ComparisonReport {
        let mut problems = ProblemCollector::new(CompareOptions::default());
        compare_element_trees(reference, proposed, &mut problems).unwrap();
        problems.into_report()
    }

    #[test]
    fn test_breaking_rule_sentinels() {
        assert!(BreakingRule::AnyChange.breaks(None));
        assert!(BreakingRule::ChangedTo(false).breaks(Some(&json!(false))));
        assert!(!BreakingRule::ChangedTo(false).breaks(Some(&json!(true))));
        assert!(!BreakingRule::ChangedTo(true).breaks(None));
    }

    #[test]
    fn test_rule_table_keys_are_unique() {
        let mut keys: Vec<_> = BREAKING_RULES.iter().map(|r| r.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), BREAKING_RULES.len());
    }

    #[test]
    fn test_leaving_state_is_breaking() {
        let reference = current(
            0,
            json!({ "sim": { "e": { "_metadata": { "phetioState": true } } } }),
        );
        let proposed = current(
            0,
            json!({ "sim": { "e": { "_metadata": { "phetioState": false } } } }),
        );
        let report = compare(&reference, &proposed);
        assert_eq!(
            report.breaking_problems,
            vec![r#"sim.e.phetioState changed from "true" to "false""#]
        );
        assert!(report.designed_problems.is_empty());

        // the other direction widens the API
        let report = compare(&proposed, &reference);
        assert!(report.is_clean());
    }

    #[test]
    fn test_becoming_read_only_is_breaking() {
        let reference = current(0, json!({ "e": { "_metadata": {} } }));
        let proposed = current(0, json!({ "e": { "_metadata": { "phetioReadOnly": true } } }));
        assert_eq!(compare(&reference, &proposed).breaking_problems.len(), 1);
        assert!(compare(&proposed, &reference).is_clean());
    }

    #[test]
    fn test_designed_documentation_change_is_not_breaking() {
        let reference = current(0, json!({ "e": { "_metadata": { "phetioDesigned": true } } }));
        let proposed = current(0, json!({ "e": { "_metadata": {
            "phetioDesigned": true, "phetioTypeName": "ObjectIO", "phetioDocumentation": "new"
        } } }));
        // phetioTypeName resolves to ObjectIO on both sides
        let report = compare(&reference, &proposed);
        assert!(report.breaking_problems.is_empty());
        assert_eq!(
            report.designed_problems,
            vec![r#"e.phetioDocumentation changed from "" to "new""#]
        );
    }

    #[test]
    fn test_designed_flag_propagates_to_descendants() {
        let reference = current(0, json!({
            "sim": {
                "_metadata": { "phetioDesigned": true },
                "container": {
                    "leaf": { "_metadata": { "phetioDesigned": false, "phetioDocumentation": "a" } }
                }
            }
        }));
        let proposed = current(0, json!({
            "sim": {
                "_metadata": { "phetioDesigned": true },
                "container": {
                    "leaf": { "_metadata": { "phetioDesigned": false, "phetioDocumentation": "b" } },
                    "extra": {}
                }
            }
        }));

        let report = compare(&reference, &proposed);
        assert!(report.breaking_problems.is_empty());
        assert_eq!(
            report.designed_problems,
            vec![
                r#"sim.container.leaf.phetioDocumentation changed from "a" to "b""#.to_string(),
                "New PhET-iO Element (or uninstrumented intermediate container) not in reference: sim.container.extra".to_string(),
            ]
        );
    }

    #[test]
    fn test_new_elements_ignored_outside_designed_subtrees() {
        let reference = current(0, json!({ "sim": { "_metadata": {} } }));
        let proposed = current(
            0,
            json!({ "sim": { "_metadata": {}, "added": { "_metadata": {} } } }),
        );
        assert!(compare(&reference, &proposed).is_clean());
    }

    #[test]
    fn test_missing_child_reported_in_both_buckets_when_designed() {
        let reference = current(0, json!({ "p": {
            "_metadata": { "phetioDesigned": true },
            "childA": { "_metadata": {} }
        } }));
        let proposed = current(0, json!({ "p": { "_metadata": { "phetioDesigned": true } } }));

        let report = compare(&reference, &proposed);
        assert_eq!(report.breaking_problems, vec!["PhET-iO Element missing: p.childA"]);
        assert_eq!(report.designed_problems, vec!["PhET-iO Element missing: p.childA"]);
    }

    #[test]
    fn test_archetype_null_to_undefined_across_formats_is_ignored() {
        let reference = current(
            0,
            json!({ "e": { "_metadata": { "phetioArchetypePhetioID": null } } }),
        );
        let proposed = legacy(json!({
            "e": { "phetioTypeName": "ObjectIO", "phetioState": true, "phetioReadOnly": false }
        }));
        let report = compare(&reference, &proposed);
        assert!(report.breaking_problems.is_empty());
    }

    #[test]
    fn test_archetype_undefined_to_null_from_legacy_reference_is_ignored() {
        let reference =
            legacy(json!({ "e": { "phetioTypeName": "ObjectIO", "phetioState": true } }));
        let proposed = current(0, json!({ "e": { "_metadata": {} } }));
        let report = compare(&reference, &proposed);
        assert!(report.breaking_problems.is_empty(), "{:?}", report.breaking_problems);
    }

    #[test]
    fn test_initial_state_extension_is_compatible() {
        let reference = current(0, json!({ "e": {
            "_metadata": {},
            "_data": { "initialState": { "value": 1 } }
        } }));
        let proposed = current(0, json!({ "e": {
            "_metadata": {},
            "_data": { "initialState": { "value": 1, "units": "m" } }
        } }));
        assert!(compare(&reference, &proposed).is_clean());
    }

    #[test]
    fn test_initial_state_extension_is_designed_problem() {
        let reference = current(0, json!({ "e": {
            "_metadata": { "phetioDesigned": true },
            "_data": { "initialState": { "value": 1 } }
        } }));
        let proposed = current(0, json!({ "e": {
            "_metadata": { "phetioDesigned": true },
            "_data": { "initialState": { "value": 1, "units": "m" } }
        } }));
        let report = compare(&reference, &proposed);
        assert!(report.breaking_problems.is_empty());
        assert_eq!(report.designed_problems.len(), 1);
        assert!(report.designed_problems[0].starts_with("e._data.initialState differs."));
        assert!(report.designed_problems[0].contains(r#""units":"m""#));
    }

    #[test]
    fn test_changed_initial_state_is_breaking() {
        let reference = current(
            0,
            json!({ "e": { "_metadata": {}, "_data": { "initialState": { "value": 1 } } } }),
        );
        let proposed = current(
            0,
            json!({ "e": { "_metadata": {}, "_data": { "initialState": { "value": 2 } } } }),
        );
        let report = compare(&reference, &proposed);
        assert_eq!(
            report.breaking_problems,
            vec!["e._data.initialState differs. \nExpected:\n{\"value\":1}\n actual:\n{\"value\":2}\n"]
        );
    }

    #[test]
    fn test_missing_initial_state_depends_on_state_key_support() {
        let with_state = json!({ "e": { "_metadata": {}, "_data": { "initialState": 5 } } });
        let without_state = json!({ "e": { "_metadata": {} } });

        // both support apiStateKeys: suppressed
        let report = compare(&current(1, with_state.clone()), &current(1, without_state.clone()));
        assert!(report.is_clean());

        // support differs: reported
        let report = compare(&current(0, with_state), &current(1, without_state));
        assert_eq!(
            report.breaking_problems,
            vec!["e._data.initialState is missing from proposed API"]
        );
    }

    #[test]
    fn test_missing_initial_state_in_designed_subtree_is_reported_twice() {
        let reference = current(0, json!({ "e": {
            "_metadata": { "phetioDesigned": true },
            "_data": { "initialState": 1 }
        } }));
        let proposed = current(1, json!({ "e": { "_metadata": { "phetioDesigned": true } } }));

        let report = compare(&reference, &proposed);
        let expected = vec!["e._data.initialState is missing from proposed API"];
        assert_eq!(report.breaking_problems, expected);
        assert_eq!(report.designed_problems, expected);
    }

    #[test]
    fn test_false_initial_state_counts_as_declared() {
        let reference = current(
            0,
            json!({ "e": { "_metadata": {}, "_data": { "initialState": false } } }),
        );
        let proposed = current(1, json!({ "e": { "_metadata": {} } }));
        assert_eq!(
            compare(&reference, &proposed).breaking_problems,
            vec!["e._data.initialState is missing from proposed API"]
        );
    }

    #[test]
    fn test_new_initial_state_in_designed_subtree() {
        let reference = current(0, json!({ "e": { "_metadata": { "phetioDesigned": true } } }));
        let proposed = current(0, json!({ "e": {
            "_metadata": { "phetioDesigned": true },
            "_data": { "initialState": true }
        } }));
        let report = compare(&reference, &proposed);
        assert!(report.breaking_problems.is_empty());
        assert_eq!(
            report.designed_problems,
            vec!["e._data.initialState is new in the proposed API but not in the reference API"]
        );
    }

    #[test]
    fn test_locale_property_may_gain_locales() {
        let locale = |locales: Value| {
            current(0, json!({ "sim": { "general": { "model": { "localeProperty": {
                "_metadata": {},
                "_data": { "initialState": { "value": "en", "validValues": locales } }
            } } } } }))
        };

        let report = compare(&locale(json!(["en", "fr"])), &locale(json!(["en", "fr", "es"])));
        assert!(report.is_clean());

        let report = compare(&locale(json!(["en", "fr"])), &locale(json!(["fr", "en"])));
        assert!(report.is_clean());

        let report = compare(&locale(json!(["en", "fr"])), &locale(json!(["en"])));
        assert_eq!(report.breaking_problems.len(), 1);
        assert!(report.breaking_problems[0]
            .starts_with("sim.general.model.localeProperty._data.initialState differs."));
    }

    #[test]
    fn test_designed_locale_property_growth_is_designed_only() {
        let locale = |locales: Value| {
            current(0, json!({ "sim": {
                "_metadata": { "phetioDesigned": true },
                "general": { "model": { "localeProperty": {
                    "_metadata": {},
                    "_data": { "initialState": { "value": "en", "validValues": locales } }
                } } }
            } }))
        };

        let report = compare(&locale(json!(["en"])), &locale(json!(["en", "fr"])));
        assert!(report.breaking_problems.is_empty());
        assert_eq!(report.designed_problems.len(), 1);
        assert!(report.designed_problems[0]
            .starts_with("sim.general.model.localeProperty._data.initialState differs."));
    }

    #[test]
    fn test_locale_list_growth_elsewhere_is_breaking() {
        let at = |locales: Value| {
            current(0, json!({ "sim": { "other": {
                "_metadata": {},
                "_data": { "initialState": { "validValues": locales } }
            } } }))
        };
        let report = compare(&at(json!(["en"])), &at(json!(["en", "fr"])));
        assert_eq!(report.breaking_problems.len(), 1);
    }

    #[test]
    fn test_uninstrumented_containers_skip_metadata() {
        let reference = current(0, json!({ "sim": { "screen": { "_metadata": {} } } }));
        let proposed = current(0, json!({ "sim": { "screen": { "_metadata": {} } } }));
        assert!(compare(&reference, &proposed).is_clean());
    }

    #[test]
    fn test_locale_detection_requires_top_level_prefix() {
        let ctx = VisitContext::root()
            .child("sim")
            .child("general")
            .child("model")
            .child("localeProperty");
        assert!(ctx.is_locale_property());

        let nested = VisitContext::root()
            .child("sim")
            .child("screen")
            .child("general")
            .child("model")
            .child("localeProperty");
        assert!(!nested.is_locale_property());
        assert!(!VisitContext::root().is_locale_property());
    }
}
