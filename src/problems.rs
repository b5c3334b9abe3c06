//! Problem aggregation
//!
//! Every finding is a human-readable string. The collector routes each one into
//! the breaking bucket, the designed bucket, or both, and drops findings for
//! buckets the caller disabled.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which result list a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Could break a client relying on the reference API
    Breaking,
    /// Deviates from the reviewed, designed surface
    Designed,
}

/// Toggles for the two result lists. Both default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareOptions {
    #[serde(rename = "compareBreakingAPIChanges")]
    pub compare_breaking_api_changes: bool,
    #[serde(rename = "compareDesignedAPIChanges")]
    pub compare_designed_api_changes: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_breaking_api_changes: true,
            compare_designed_api_changes: true,
        }
    }
}

impl CompareOptions {
    /// Report breaking changes only
    pub fn breaking_only() -> Self {
        Self {
            compare_designed_api_changes: false,
            ..Self::default()
        }
    }

    /// Report designed changes only
    pub fn designed_only() -> Self {
        Self {
            compare_breaking_api_changes: false,
            ..Self::default()
        }
    }

    pub fn records(&self, bucket: Bucket) -> bool {
        match bucket {
            Bucket::Breaking => self.compare_breaking_api_changes,
            Bucket::Designed => self.compare_designed_api_changes,
        }
    }
}

/// Result of comparing two APIs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub breaking_problems: Vec<String>,
    pub designed_problems: Vec<String>,
}

impl ComparisonReport {
    /// No breaking problems: safe to publish
    pub fn is_safe(&self) -> bool {
        self.breaking_problems.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.breaking_problems.is_empty() && self.designed_problems.is_empty()
    }

    /// Safe to publish, but needs sign-off for deviating from the designed surface
    pub fn needs_design_review(&self) -> bool {
        self.is_safe() && !self.designed_problems.is_empty()
    }
}

/// Accumulates findings for one comparison run
#[derive(Debug)]
pub struct ProblemCollector {
    options: CompareOptions,
    report: ComparisonReport,
}

impl ProblemCollector {
    pub fn new(options: CompareOptions) -> Self {
        Self {
            options,
            report: ComparisonReport::default(),
        }
    }

    /// Record a finding in one bucket, if that bucket is enabled
    pub fn append(&mut self, problem: impl Into<String>, bucket: Bucket) {
        if !self.options.records(bucket) {
            return;
        }
        let problem = problem.into();
        match bucket {
            Bucket::Breaking => self.report.breaking_problems.push(problem),
            Bucket::Designed => self.report.designed_problems.push(problem),
        }
    }

    pub fn breaking(&mut self, problem: impl Into<String>) {
        self.append(problem, Bucket::Breaking);
    }

    pub fn designed(&mut self, problem: impl Into<String>) {
        self.append(problem, Bucket::Designed);
    }

    /// Record a breaking finding, and also a designed one inside a designed subtree
    pub fn append_both(&mut self, problem: impl Into<String>, is_designed: bool) {
        let problem = problem.into();
        if is_designed {
            self.designed(problem.clone());
        }
        self.breaking(problem);
    }

    pub fn into_report(self) -> ComparisonReport {
        self.report
    }
}

/// Render an attribute value inside a problem message: strings bare, absent
/// values as `undefined`, everything else as JSON.
pub(crate) fn display_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
