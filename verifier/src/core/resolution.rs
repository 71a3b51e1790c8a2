//! AND-aggregation of independent sub-resolutions.

use crate::core::types::IssueResolutionStatus;

/// Outcome of one sub-check prior to aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubResolution {
    /// Category name, used as the key in `error_details`.
    pub name: String,
    /// Human-readable label recorded in `remaining_issues` when unresolved.
    pub label: String,
    pub resolved: bool,
    pub evidence: Vec<String>,
}

impl SubResolution {
    pub fn resolved(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            resolved: true,
            evidence: Vec::new(),
        }
    }

    pub fn unresolved(
        name: impl Into<String>,
        label: impl Into<String>,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            resolved: false,
            evidence,
        }
    }
}

/// `all_resolved` is true iff every sub-resolution is true. An empty input is
/// vacuously resolved.
pub fn aggregate_resolutions(subs: Vec<SubResolution>) -> IssueResolutionStatus {
    let mut status = IssueResolutionStatus {
        all_resolved: true,
        ..IssueResolutionStatus::default()
    };
    for sub in subs {
        status.resolutions.push((sub.name.clone(), sub.resolved));
        if sub.resolved {
            continue;
        }
        status.all_resolved = false;
        status
            .remaining_issues
            .push(format!("{}: {}", sub.name, sub.label));
        status
            .error_details
            .entry(sub.name)
            .or_default()
            .extend(sub.evidence);
    }
    status
}
