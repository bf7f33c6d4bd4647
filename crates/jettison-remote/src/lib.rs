#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! HTTP adapter for the Jettison analysis backend.
//!
//! Implements [`AnalysisBackend`] against the backend's REST API. The scan
//! endpoint answers with one of two payload shapes — a multi-target candidate
//! list or a single optimized report — and the branch between them happens
//! exactly once here, at the interface edge. Timeouts live in this crate; the
//! session above only sees calls that eventually resolve.

use std::time::Duration;

use async_trait::async_trait;
use jettison_core::{
    AnalysisBackend, Finding, PublishReceipt, PublishRequest, Recommendation, RemoteError,
    RemoteResult, ScanOutcome, TargetReport,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default request timeout applied when the caller does not override it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-wide backend endpoint configuration, resolved once at startup and
/// handed to [`HttpAnalysisClient::new`]; call sites never carry addresses.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the analysis backend.
    pub endpoint: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Configuration for the given endpoint with the default timeout.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Stateless request/response client for the analysis backend.
pub struct HttpAnalysisClient {
    http: Client,
    endpoint: Url,
}

impl HttpAnalysisClient {
    /// Build a client from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            endpoint: config.endpoint,
        })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> RemoteResult<reqwest::Response> {
        let url = self.endpoint.join(path).map_err(transport)?;
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(classify_failure(response).await)
        }
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisClient {
    async fn scan_repository(
        &self,
        source: &str,
        path: Option<&str>,
    ) -> RemoteResult<ScanOutcome> {
        let response = self
            .post("/api/scan-github", &ScanRequestBody { url: source, path })
            .await?;
        let body: ScanResponseBody = response.json().await.map_err(transport)?;
        body.into_outcome()
    }

    async fn publish(&self, request: PublishRequest) -> RemoteResult<PublishReceipt> {
        let body = PublishRequestBody {
            url: &request.source,
            updates: &request.updates,
            branch_name: &request.branch,
            title: &request.title,
            commit_message: &request.commit_message,
        };
        let response = self.post("/api/create-pr", &body).await?;
        response.json().await.map_err(transport)
    }

    async fn optimize_content(&self, content: &str) -> RemoteResult<TargetReport> {
        let response = self
            .post("/api/analyze-dockerfile", &AnalyzeRequestBody { content })
            .await?;
        response.json().await.map_err(transport)
    }
}

#[derive(Serialize)]
struct ScanRequestBody<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

#[derive(Serialize)]
struct PublishRequestBody<'a> {
    url: &'a str,
    updates: &'a [jettison_core::FileUpdate],
    branch_name: &'a str,
    title: &'a str,
    commit_message: &'a str,
}

#[derive(Serialize)]
struct AnalyzeRequestBody<'a> {
    content: &'a str,
}

/// Superset of both scan payload shapes; collapsed into [`ScanOutcome`]
/// immediately after deserialization.
#[derive(Deserialize)]
struct ScanResponseBody {
    #[serde(default)]
    multi_target: bool,
    #[serde(default)]
    paths: Vec<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    findings: Vec<Finding>,
    #[serde(default)]
    recommendation: Option<Recommendation>,
}

impl ScanResponseBody {
    fn into_outcome(self) -> RemoteResult<ScanOutcome> {
        if self.multi_target {
            return Ok(ScanOutcome::MultiTarget {
                source: self.source,
                paths: self.paths,
            });
        }
        let recommendation = self.recommendation.ok_or_else(|| RemoteError::Backend {
            detail: Some("scan response carried no recommendation".to_string()),
        })?;
        Ok(ScanOutcome::SingleTarget {
            report: TargetReport {
                path: self.path,
                findings: self.findings,
                recommendation,
            },
        })
    }
}

#[derive(Deserialize)]
struct ProblemBody {
    detail: Option<String>,
}

/// Map a non-success response to a backend error, preferring the service's
/// `detail` payload over raw body text.
async fn classify_failure(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ProblemBody>(&bytes)
        .ok()
        .and_then(|problem| problem.detail)
        .or_else(|| {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            (!text.is_empty()).then_some(text)
        });
    debug!(%status, "backend rejected the request");
    RemoteError::Backend { detail }
}

fn transport(err: impl std::error::Error + Send + Sync + 'static) -> RemoteError {
    RemoteError::Transport {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use jettison_core::FileUpdate;
    use serde_json::json;

    fn client_for(server: &MockServer) -> Result<HttpAnalysisClient> {
        let endpoint = server.base_url().parse()?;
        Ok(HttpAnalysisClient::new(RemoteConfig::new(endpoint))?)
    }

    #[tokio::test]
    async fn scan_parses_a_single_target_response() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/scan-github")
                .json_body(json!({"url": "github.com/acme/shop", "path": "svc1/Dockerfile"}));
            then.status(200).json_body(json!({
                "path": "svc1/Dockerfile",
                "findings": [
                    {"severity": "HIGH", "category": "SECURITY", "message": "runs as root"}
                ],
                "recommendation": {
                    "optimized_dockerfile": "FROM alpine:3.20",
                    "dockerignore": "node_modules\n",
                    "explanation": ["smaller base image"]
                }
            }));
        });

        let client = client_for(&server)?;
        let outcome = client
            .scan_repository("github.com/acme/shop", Some("svc1/Dockerfile"))
            .await?;

        mock.assert();
        let ScanOutcome::SingleTarget { report } = outcome else {
            anyhow::bail!("expected a single-target outcome");
        };
        assert_eq!(report.path.as_deref(), Some("svc1/Dockerfile"));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.recommendation.dockerfile, "FROM alpine:3.20");
        assert_eq!(
            report.recommendation.dockerignore.as_deref(),
            Some("node_modules\n")
        );
        Ok(())
    }

    #[tokio::test]
    async fn scan_parses_a_multi_target_response() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/scan-github")
                .json_body(json!({"url": "github.com/acme/shop"}));
            then.status(200).json_body(json!({
                "multi_target": true,
                "source": "github.com/acme/shop",
                "paths": ["svc1/Dockerfile", "svc2/Dockerfile"]
            }));
        });

        let client = client_for(&server)?;
        let outcome = client.scan_repository("github.com/acme/shop", None).await?;

        mock.assert();
        let ScanOutcome::MultiTarget { source, paths } = outcome else {
            anyhow::bail!("expected a multi-target outcome");
        };
        assert_eq!(source.as_deref(), Some("github.com/acme/shop"));
        assert_eq!(paths, vec!["svc1/Dockerfile", "svc2/Dockerfile"]);
        Ok(())
    }

    #[tokio::test]
    async fn scan_surfaces_backend_detail_on_rejection() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/scan-github");
            then.status(404)
                .json_body(json!({"detail": "No Dockerfile found in repository"}));
        });

        let client = client_for(&server)?;
        let err = client
            .scan_repository("github.com/acme/empty", None)
            .await
            .expect_err("rejection should fail the call");

        mock.assert();
        assert_eq!(err.detail(), Some("No Dockerfile found in repository"));
        Ok(())
    }

    #[tokio::test]
    async fn scan_rejects_a_response_without_a_recommendation() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/scan-github");
            then.status(200).json_body(json!({"path": "Dockerfile"}));
        });

        let client = client_for(&server)?;
        let err = client
            .scan_repository("github.com/acme/shop", None)
            .await
            .expect_err("malformed payload should fail the call");

        assert!(
            err.detail()
                .is_some_and(|detail| detail.contains("recommendation"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn publish_sends_the_batch_and_parses_the_receipt() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/create-pr").json_body(json!({
                "url": "github.com/acme/shop",
                "updates": [
                    {"path": "svc1/Dockerfile", "content": "FROM alpine:3.20"},
                    {"path": "svc2/Dockerfile", "content": "FROM debian:stable-slim"}
                ],
                "branch_name": "optimize-all-services-x1y2z3",
                "title": "Optimize all service Dockerfiles",
                "commit_message": "Bulk optimization of multiple services"
            }));
            then.status(200).json_body(json!({
                "message": "Pull request created: https://github.test/acme/shop/pull/12"
            }));
        });

        let client = client_for(&server)?;
        let receipt = client
            .publish(PublishRequest {
                source: "github.com/acme/shop".to_string(),
                updates: vec![
                    FileUpdate {
                        path: "svc1/Dockerfile".to_string(),
                        content: "FROM alpine:3.20".to_string(),
                    },
                    FileUpdate {
                        path: "svc2/Dockerfile".to_string(),
                        content: "FROM debian:stable-slim".to_string(),
                    },
                ],
                branch: "optimize-all-services-x1y2z3".to_string(),
                title: "Optimize all service Dockerfiles".to_string(),
                commit_message: "Bulk optimization of multiple services".to_string(),
            })
            .await?;

        mock.assert();
        assert_eq!(
            receipt.link(),
            Some("https://github.test/acme/shop/pull/12")
        );
        Ok(())
    }

    #[tokio::test]
    async fn publish_failure_carries_the_backend_detail() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/create-pr");
            then.status(403)
                .json_body(json!({"detail": "GITHUB_TOKEN is required to create a PR"}));
        });

        let client = client_for(&server)?;
        let err = client
            .publish(PublishRequest {
                source: "github.com/acme/shop".to_string(),
                updates: vec![FileUpdate {
                    path: "Dockerfile".to_string(),
                    content: "FROM scratch".to_string(),
                }],
                branch: "optimize-root-abc123".to_string(),
                title: "Optimize ROOT Dockerfile".to_string(),
                commit_message: "Optimize ROOT Dockerfile".to_string(),
            })
            .await
            .expect_err("rejection should fail the call");

        assert_eq!(err.detail(), Some("GITHUB_TOKEN is required to create a PR"));
        Ok(())
    }

    #[tokio::test]
    async fn analyze_parses_an_uploaded_dockerfile_report() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/analyze-dockerfile")
                .json_body(json!({"content": "FROM node:latest\n"}));
            then.status(200).json_body(json!({
                "findings": [
                    {"severity": "MEDIUM", "category": "SIZE", "message": "unpinned tag"}
                ],
                "recommendation": {
                    "dockerfile": "FROM node:22-slim\n",
                    "explanation": ["pinned and slimmed the base image"]
                }
            }));
        });

        let client = client_for(&server)?;
        let report = client.optimize_content("FROM node:latest\n").await?;

        mock.assert();
        assert_eq!(report.path, None);
        assert_eq!(report.recommendation.dockerfile, "FROM node:22-slim\n");
        assert_eq!(report.findings.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn non_json_rejections_fall_back_to_body_text() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/scan-github");
            then.status(502).body("upstream unavailable");
        });

        let client = client_for(&server)?;
        let err = client
            .scan_repository("github.com/acme/shop", None)
            .await
            .expect_err("rejection should fail the call");

        assert_eq!(err.detail(), Some("upstream unavailable"));
        Ok(())
    }
}
