//! Core optimization domain types and DTOs shared across the workspace.

use serde::{Deserialize, Serialize};

/// Severity attached to a finding, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Cosmetic or advisory issue.
    Low,
    /// Worth fixing, limited blast radius.
    Medium,
    /// Materially degrades the image.
    High,
    /// Must be addressed before shipping.
    Critical,
}

/// Broad classification of a finding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCategory {
    /// Vulnerable package, secret leakage, privilege escalation.
    Security,
    /// Build-time or runtime slowdowns.
    Performance,
    /// Layer or image size bloat.
    Size,
    /// Dockerfile authoring conventions.
    BestPractice,
    /// Anything the backend reports outside the known categories.
    #[default]
    General,
}

/// One analyzer finding for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity assigned by the backend.
    pub severity: Severity,
    /// Classification of the finding.
    #[serde(default, deserialize_with = "category_or_general")]
    pub category: FindingCategory,
    /// Human-readable description of the issue.
    pub message: String,
    /// Suggested resolution, when the backend offers one.
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Categories outside the known set collapse to [`FindingCategory::General`]
/// rather than failing the whole payload.
fn category_or_general<'de, D>(deserializer: D) -> Result<FindingCategory, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        "SECURITY" => FindingCategory::Security,
        "PERFORMANCE" => FindingCategory::Performance,
        "SIZE" => FindingCategory::Size,
        "BEST_PRACTICE" => FindingCategory::BestPractice,
        _ => FindingCategory::General,
    })
}

/// Recommended replacement artifact for one target, with rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Replacement Dockerfile content.
    #[serde(alias = "optimized_dockerfile")]
    pub dockerfile: String,
    /// Optional auxiliary `.dockerignore` content.
    #[serde(default)]
    pub dockerignore: Option<String>,
    /// Human-readable rationale entries for the rewrite.
    #[serde(default)]
    pub explanation: Vec<String>,
}

/// Optimization outcome for one target path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Target path the backend resolved, when it reports one.
    #[serde(default)]
    pub path: Option<String>,
    /// Severity-tagged findings for the target.
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Recommended replacement artifact.
    pub recommendation: Recommendation,
}

impl TargetReport {
    /// Highest severity across the findings, if any were reported.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|finding| finding.severity).max()
    }
}

/// Candidate target paths discovered for one repository session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// Repository source the candidates belong to.
    pub source: String,
    /// Candidate target paths, deduplicated, in backend order.
    pub paths: Vec<String>,
}

/// Scan response, branched once at the collaborator boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The repository holds several candidate targets; present a menu.
    MultiTarget {
        /// Source identifier as normalized by the backend, when reported.
        source: Option<String>,
        /// Candidate target paths.
        paths: Vec<String>,
    },
    /// The scan resolved to a single optimized target.
    SingleTarget {
        /// The optimization outcome for that target.
        report: TargetReport,
    },
}

/// One file rewrite inside a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdate {
    /// Repository-relative path of the file to replace.
    pub path: String,
    /// Replacement content.
    pub content: String,
}

/// Publication request handed to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Repository source the updates apply to.
    pub source: String,
    /// File rewrites to land as one change.
    pub updates: Vec<FileUpdate>,
    /// Branch name to publish under.
    pub branch: String,
    /// Pull request title.
    pub title: String,
    /// Commit message for the change.
    pub commit_message: String,
}

/// Backend acknowledgement of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Backend-supplied confirmation message, possibly embedding a URL.
    pub message: String,
}

impl PublishReceipt {
    /// Extract the first `https://` URL embedded in the receipt message.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        let start = self.message.find("https://")?;
        let rest = &self.message[start..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let url = rest[..end].trim_end_matches(['.', ',', ')', ']']);
        (url.len() > "https://".len()).then_some(url)
    }
}
