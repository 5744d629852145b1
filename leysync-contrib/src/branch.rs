//! Contribution branch naming.

use std::fmt;

use chrono::{DateTime, Utc};

pub const BRANCH_PREFIX: &str = "contribution/";

/// `contribution/<project>-<YYYY-MM-DD>-<unix millis>`.
///
/// The millisecond suffix keeps names unique across contributors working on
/// identically named projects on the same day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionBranch {
    name: String,
}

impl ContributionBranch {
    pub fn new(project: &str, at: DateTime<Utc>) -> Self {
        Self {
            name: format!(
                "{BRANCH_PREFIX}{}-{}-{}",
                sanitize(project),
                at.format("%Y-%m-%d"),
                at.timestamp_millis()
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ContributionBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lowercase ASCII alphanumerics; everything else becomes `-`.
fn sanitize(project: &str) -> String {
    let cleaned: String = project
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "workspace".to_string()
    } else {
        cleaned
    }
}
