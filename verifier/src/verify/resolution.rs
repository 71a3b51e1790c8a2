//! Double-checked issue resolution.
//!
//! Upstream stages report whether an issue category was fixed. Those flags are
//! not trusted on their own: each category's raw output is re-classified and
//! the category only counts as resolved when both sources agree.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::registry::{ClassifierKind, ClassifierRegistry, classifier_for};
use crate::core::resolution::{SubResolution, aggregate_resolutions};
use crate::core::types::IssueResolutionStatus;

/// One issue category to re-verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionCheck {
    pub name: String,
    pub label: String,
    /// What the upstream stage claims.
    pub upstream_resolved: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub classifier: ClassifierKind,
}

impl ResolutionCheck {
    /// Re-classify this category's output. Kinds missing from `registry` fall
    /// back to their default classifier.
    pub fn verify(&self, registry: &ClassifierRegistry) -> SubResolution {
        let verdict = match registry.get(self.classifier) {
            Some(classifier) => classifier.classify(&self.output, self.exit_code),
            None => classifier_for(self.classifier).classify(&self.output, self.exit_code),
        };
        let problem = verdict.has_problem();

        if self.upstream_resolved && !problem {
            return SubResolution::resolved(&self.name, &self.label);
        }

        let mut evidence = verdict.evidence();
        if !self.upstream_resolved {
            evidence.push("upstream stage reported unresolved".to_string());
        }
        if self.upstream_resolved && problem {
            warn!(
                category = %self.name,
                classifier = self.classifier.label(),
                "upstream reported resolved but output still shows the issue"
            );
        } else {
            debug!(category = %self.name, "category unresolved");
        }
        SubResolution::unresolved(&self.name, &self.label, evidence)
    }
}

/// AND-aggregate every check after re-verifying it.
pub fn resolve_issues(
    checks: &[ResolutionCheck],
    registry: &ClassifierRegistry,
) -> IssueResolutionStatus {
    aggregate_resolutions(checks.iter().map(|check| check.verify(registry)).collect())
}
