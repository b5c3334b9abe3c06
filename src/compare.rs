//! Top-level API comparison

use serde_json::Value;
use tracing::debug;

use crate::descriptor::{Api, ApiDescriptor};
use crate::error::Result;
use crate::normalize::up_convert;
use crate::problems::{CompareOptions, ComparisonReport, ProblemCollector};
use crate::tree::compare_element_trees;
use crate::types::compare_type_registries;

/// Compare two API descriptors given as parsed JSON.
///
/// Legacy descriptors are up-converted first, so either format may be
/// compared against either. The only error is a fatal one: a malformed
/// descriptor or an element whose IO Type is missing from its registry.
///
/// ```
/// use phetio_api_compare::{compare_apis, CompareOptions};
/// use serde_json::json;
///
/// let api = json!({
///     "version": { "major": 1, "minor": 0 },
///     "phetioElements": { "sim": { "_metadata": { "phetioTypeName": "ObjectIO" } } },
///     "phetioTypes": { "ObjectIO": { "supertype": null, "methods": {}, "events": [] } }
/// });
/// let report = compare_apis(&api, &api, &CompareOptions::default()).unwrap();
/// assert!(report.is_clean());
/// ```
pub fn compare_apis(
    reference: &Value,
    proposed: &Value,
    options: &CompareOptions,
) -> Result<ComparisonReport> {
    let reference = ApiDescriptor::from_value(reference.clone())?;
    let proposed = ApiDescriptor::from_value(proposed.clone())?;
    compare_descriptors(&reference, &proposed, options)
}

/// Compare two already-parsed descriptors
pub fn compare_descriptors(
    reference: &ApiDescriptor,
    proposed: &ApiDescriptor,
    options: &CompareOptions,
) -> Result<ComparisonReport> {
    compare_normalized(&up_convert(reference), &up_convert(proposed), options)
}

/// Compare two normalized APIs
pub fn compare_normalized(
    reference: &Api,
    proposed: &Api,
    options: &CompareOptions,
) -> Result<ComparisonReport> {
    debug!(
        reference_version = ?reference.version,
        proposed_version = ?proposed.version,
        breaking = options.compare_breaking_api_changes,
        designed = options.compare_designed_api_changes,
        "comparing APIs"
    );

    let mut problems = ProblemCollector::new(*options);
    compare_element_trees(reference, proposed, &mut problems)?;
    compare_type_registries(reference, proposed, &mut problems);

    let report = problems.into_report();
    debug!(
        breaking = report.breaking_problems.len(),
        designed = report.designed_problems.len(),
        "comparison finished"
    );
    Ok(report)
}
