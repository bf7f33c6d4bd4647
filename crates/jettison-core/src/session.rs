//! Discovery-and-optimization session state machine.
//!
//! The session owns every per-repository artifact the client tracks: the
//! discovery menu, the per-target optimization reports, the active target,
//! and the publication slot. All network work goes through the
//! [`AnalysisBackend`] collaborator; all outcomes surface on the
//! [`NotificationChannel`]. Failures terminate here — nothing is retried and
//! nothing propagates to callers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use jettison_notify::{Notice, NotificationChannel};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::RemoteResult;
use crate::model::{
    Discovery, FileUpdate, PublishReceipt, PublishRequest, ScanOutcome, TargetReport,
};
use crate::service::AnalysisBackend;

/// Fallback target path used when neither the caller nor the backend names
/// one.
pub const DEFAULT_TARGET_PATH: &str = "Dockerfile";

/// Service label reported for targets that live at the repository root.
pub const ROOT_SERVICE_LABEL: &str = "ROOT";

const BATCH_BRANCH_PREFIX: &str = "optimize-all-services";
const BRANCH_SUFFIX_LEN: usize = 6;

/// In-flight publication marker. At most one publication may be outstanding
/// at any time, regardless of target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    /// No publication outstanding.
    Idle,
    /// A single-target publication for the named path is outstanding.
    Single(String),
    /// A batched publication covering every tracked report is outstanding.
    Batch,
}

impl Publication {
    /// Whether a publication is currently outstanding.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Default)]
struct SessionState {
    generation: u64,
    source: Option<String>,
    discovery: Option<Discovery>,
    reports: HashMap<String, TargetReport>,
    active: Option<String>,
}

/// Read-only view of the session handed to presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Repository source the session is bound to, if any.
    pub source: Option<String>,
    /// Candidate targets discovered for the current repository.
    pub discovery: Option<Discovery>,
    /// Paths with a tracked optimization report, sorted.
    pub optimized: Vec<String>,
    /// Target currently designated for display.
    pub active: Option<String>,
    /// Publication slot state at snapshot time.
    pub publication: Publication,
}

/// Coordinates discovery, per-target optimization bookkeeping, and
/// publication for one repository session at a time.
///
/// Every completed network call results in a single atomic state update.
/// Responses belonging to a superseded session (reset, or a scan against a
/// different repository) are discarded via a generation token captured at
/// request issue time.
pub struct ScanSession<B: AnalysisBackend> {
    backend: Arc<B>,
    notices: NotificationChannel,
    state: RwLock<SessionState>,
    publication: Mutex<Publication>,
}

impl<B: AnalysisBackend> ScanSession<B> {
    /// Construct a session over the given backend and notification channel.
    #[must_use]
    pub fn new(backend: Arc<B>, notices: NotificationChannel) -> Self {
        Self {
            backend,
            notices,
            state: RwLock::new(SessionState::default()),
            publication: Mutex::new(Publication::Idle),
        }
    }

    /// Scan a repository, or optimize one target inside it.
    ///
    /// Blank inputs are ignored without issuing a request. Scanning a
    /// repository other than the session's current one starts a fresh session
    /// first. Exactly one request is issued per invocation, with no retry.
    pub async fn scan(&self, source: &str, path: Option<&str>) {
        let source = source.trim();
        if source.is_empty() {
            debug!("ignoring scan request with a blank source");
            return;
        }
        let path = match path.map(str::trim) {
            Some("") => {
                debug!("ignoring scan request with a blank path");
                return;
            }
            other => other,
        };

        let generation = self.enter_session(source).await;

        match self.backend.scan_repository(source, path).await {
            Ok(outcome) => {
                self.apply_scan_outcome(generation, source, path, outcome)
                    .await;
            }
            Err(err) => {
                warn!(%source, error = %err, "repository scan failed");
                self.notices.post(Notice::error(err.detail().map_or_else(
                    || "Failed to scan repository".to_string(),
                    str::to_string,
                )));
            }
        }
    }

    /// Drop the tracked report for `path`. Clears the active target in the
    /// same state update when it pointed there. Unknown paths are a no-op;
    /// discovery candidates are unaffected either way.
    pub async fn discard(&self, path: &str) {
        let mut state = self.state.write().await;
        if state.reports.remove(path).is_none() {
            debug!(%path, "discard requested for an untracked path");
            return;
        }
        if state.active.as_deref() == Some(path) {
            state.active = None;
        }
    }

    /// Clear the whole session. In-flight requests are not cancelled; their
    /// responses are discarded on arrival.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.source = None;
        state.discovery = None;
        state.reports.clear();
        state.active = None;
    }

    /// Show the tracked report for `path`, or go compute it.
    ///
    /// Presence in the report map decides: an existing report becomes active
    /// with no network call, a missing one triggers optimization against the
    /// session's current repository. There is no separate mode flag.
    pub async fn select_or_optimize(&self, path: &str) {
        let source = {
            let mut state = self.state.write().await;
            if state.reports.contains_key(path) {
                state.active = Some(path.to_string());
                return;
            }
            state.source.clone()
        };

        match source {
            Some(source) => self.scan(&source, Some(path)).await,
            None => debug!(%path, "no repository session to optimize against"),
        }
    }

    /// Publish the recommended artifact for one target as a pull request.
    ///
    /// Refuses silently when the target has no report, no repository session
    /// exists, or another publication is outstanding.
    pub async fn publish_one(&self, path: &str) {
        let (source, update) = {
            let state = self.state.read().await;
            let Some(source) = state.source.clone() else {
                debug!(%path, "no repository session to publish against");
                return;
            };
            let Some(report) = state.reports.get(path) else {
                debug!(%path, "publish requested for an untracked path");
                return;
            };
            (
                source,
                FileUpdate {
                    path: path.to_string(),
                    content: report.recommendation.dockerfile.clone(),
                },
            )
        };

        let Some(guard) = self.claim_publication(Publication::Single(path.to_string())) else {
            return;
        };

        let service = service_label(path);
        let request = PublishRequest {
            source,
            updates: vec![update],
            branch: format!(
                "optimize-{}-{}",
                service.to_ascii_lowercase(),
                branch_suffix()
            ),
            title: format!("Optimize {service} Dockerfile"),
            commit_message: format!("Optimize {service} Dockerfile"),
        };

        let result = self.backend.publish(request).await;
        drop(guard);

        self.post_publish_outcome(result, &format!("Pull request created for {service}"));
    }

    /// Publish every tracked report as one batched pull request.
    ///
    /// All-or-nothing from the client's perspective: one request carries one
    /// update per tracked report, path-sorted for determinism.
    pub async fn publish_all(&self) {
        let (source, updates) = {
            let state = self.state.read().await;
            let Some(source) = state.source.clone() else {
                debug!("no repository session to publish against");
                return;
            };
            if state.reports.is_empty() {
                debug!("batch publish requested with no tracked reports");
                return;
            }
            let mut updates: Vec<FileUpdate> = state
                .reports
                .iter()
                .map(|(path, report)| FileUpdate {
                    path: path.clone(),
                    content: report.recommendation.dockerfile.clone(),
                })
                .collect();
            updates.sort_by(|a, b| a.path.cmp(&b.path));
            (source, updates)
        };

        let Some(guard) = self.claim_publication(Publication::Batch) else {
            return;
        };

        let count = updates.len();
        let request = PublishRequest {
            source,
            updates,
            branch: format!("{BATCH_BRANCH_PREFIX}-{}", branch_suffix()),
            title: "Optimize all service Dockerfiles".to_string(),
            commit_message: "Bulk optimization of multiple services".to_string(),
        };

        let result = self.backend.publish(request).await;
        drop(guard);

        self.post_publish_outcome(
            result,
            &format!("Pull request created covering {count} targets"),
        );
    }

    /// Clone-out view of the session for presentation layers.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        let mut optimized: Vec<String> = state.reports.keys().cloned().collect();
        optimized.sort();
        SessionSnapshot {
            source: state.source.clone(),
            discovery: state.discovery.clone(),
            optimized,
            active: state.active.clone(),
            publication: self.publication(),
        }
    }

    /// Tracked report for `path`, if present.
    pub async fn report(&self, path: &str) -> Option<TargetReport> {
        self.state.read().await.reports.get(path).cloned()
    }

    /// The active target and its report, if one is designated.
    ///
    /// An active pointer always has a backing report; clearing happens in the
    /// same state update that removes the entry.
    pub async fn active_report(&self) -> Option<(String, TargetReport)> {
        let state = self.state.read().await;
        let path = state.active.clone()?;
        let report = state.reports.get(&path).cloned()?;
        Some((path, report))
    }

    /// Publication slot state.
    ///
    /// # Panics
    ///
    /// Panics if the slot mutex has been poisoned.
    #[must_use]
    pub fn publication(&self) -> Publication {
        self.publication
            .lock()
            .expect("publication slot mutex poisoned")
            .clone()
    }

    /// Notification channel that operation outcomes are posted on.
    #[must_use]
    pub fn notices(&self) -> &NotificationChannel {
        &self.notices
    }

    async fn enter_session(&self, source: &str) -> u64 {
        let mut state = self.state.write().await;
        if state.source.as_deref() != Some(source) {
            state.generation += 1;
            state.source = Some(source.to_string());
            state.discovery = None;
            state.reports.clear();
            state.active = None;
        }
        state.generation
    }

    async fn apply_scan_outcome(
        &self,
        generation: u64,
        source: &str,
        requested: Option<&str>,
        outcome: ScanOutcome,
    ) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(%source, "discarding scan response for a superseded session");
            return;
        }

        match outcome {
            ScanOutcome::MultiTarget {
                source: reported,
                paths,
            } => {
                let paths = dedupe_paths(paths);
                if paths.is_empty() {
                    self.notices
                        .post(Notice::info("No optimization targets found in repository"));
                }
                state.discovery = Some(Discovery {
                    source: reported.unwrap_or_else(|| source.to_string()),
                    paths,
                });
            }
            ScanOutcome::SingleTarget { report } => {
                let effective = requested
                    .map(str::to_string)
                    .or_else(|| report.path.clone())
                    .unwrap_or_else(|| DEFAULT_TARGET_PATH.to_string());
                if state.discovery.is_none() {
                    state.discovery = Some(Discovery {
                        source: source.to_string(),
                        paths: vec![effective.clone()],
                    });
                }
                state.reports.insert(effective.clone(), report);
                state.active = Some(effective);
            }
        }
    }

    fn claim_publication(&self, tag: Publication) -> Option<PublicationGuard<'_>> {
        let mut slot = self
            .publication
            .lock()
            .expect("publication slot mutex poisoned");
        if slot.is_in_flight() {
            debug!("publication already in flight");
            return None;
        }
        *slot = tag;
        Some(PublicationGuard {
            slot: &self.publication,
        })
    }

    fn post_publish_outcome(&self, result: RemoteResult<PublishReceipt>, fallback: &str) {
        match result {
            Ok(receipt) => {
                let link = receipt.link().map(str::to_string);
                let trimmed = receipt.message.trim();
                let message = if trimmed.is_empty() {
                    fallback.to_string()
                } else {
                    trimmed.to_string()
                };
                let mut notice = Notice::success(message);
                if let Some(url) = link {
                    notice = notice.with_link("View pull request", url);
                }
                self.notices.post(notice);
            }
            Err(err) => {
                warn!(error = %err, "publication failed");
                self.notices.post(Notice::error(err.detail().map_or_else(
                    || "Failed to create pull request".to_string(),
                    str::to_string,
                )));
            }
        }
    }
}

/// Scope guard that releases the publication slot on drop, however the
/// publish attempt ended.
struct PublicationGuard<'a> {
    slot: &'a Mutex<Publication>,
}

impl Drop for PublicationGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Publication::Idle;
        }
    }
}

/// Human-readable service label for a target path: the parent directory
/// segment uppercased, or [`ROOT_SERVICE_LABEL`] for root-level targets.
#[must_use]
pub fn service_label(path: &str) -> String {
    match path.rsplit('/').nth(1) {
        Some(parent) if !parent.is_empty() => parent.to_uppercase(),
        _ => ROOT_SERVICE_LABEL.to_string(),
    }
}

fn branch_suffix() -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .take(BRANCH_SUFFIX_LEN)
        .collect::<String>()
        .to_ascii_lowercase()
}

fn dedupe_paths(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| !path.trim().is_empty() && seen.insert(path.clone()))
        .collect()
}
