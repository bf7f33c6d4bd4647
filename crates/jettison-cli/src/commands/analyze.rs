//! Optimize a local Dockerfile without a repository session.

use std::io::Read;
use std::path::Path;

use anyhow::anyhow;
use jettison_core::{AnalysisBackend, DEFAULT_TARGET_PATH};

use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output;

pub(crate) async fn handle_analyze(
    ctx: &AppContext,
    args: AnalyzeArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let content = read_content(args.file.as_deref())?;
    if content.trim().is_empty() {
        return Err(CliError::validation("Dockerfile content must not be empty"));
    }

    match ctx.backend.optimize_content(&content).await {
        Ok(report) => {
            let path = report
                .path
                .clone()
                .unwrap_or_else(|| DEFAULT_TARGET_PATH.to_string());
            output::render_report(&path, &report, format)
        }
        Err(err) => Err(CliError::failure(anyhow!(
            "{}",
            err.detail().unwrap_or("Failed to analyze Dockerfile")
        ))),
    }
}

fn read_content(file: Option<&Path>) -> CliResult<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            CliError::failure(anyhow!(
                "failed to read Dockerfile '{}': {err}",
                path.display()
            ))
        }),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| {
                    CliError::failure(anyhow!("failed to read Dockerfile from stdin: {err}"))
                })?;
            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use jettison_notify::NotificationChannel;
    use jettison_remote::{HttpAnalysisClient, RemoteConfig};
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context_for(server: &MockServer) -> AppContext {
        let endpoint = server.base_url().parse().expect("valid URL");
        let backend = HttpAnalysisClient::new(RemoteConfig::new(endpoint)).expect("client");
        AppContext {
            backend: Arc::new(backend),
            notices: NotificationChannel::new(),
        }
    }

    fn scratch_dockerfile(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("jettison-analyze-{}", uuid::Uuid::new_v4()));
        fs::write(&path, content).expect("write scratch Dockerfile");
        path
    }

    #[tokio::test]
    async fn analyze_renders_the_report_for_a_local_file() {
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

        let path = scratch_dockerfile("FROM node:latest\n");
        let ctx = context_for(&server);
        let result = handle_analyze(
            &ctx,
            AnalyzeArgs {
                file: Some(path.clone()),
            },
            OutputFormat::Table,
        )
        .await;
        let _ = fs::remove_file(&path);

        result.expect("analysis should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn empty_dockerfiles_are_rejected_before_any_request() {
        let server = MockServer::start_async().await;
        let path = scratch_dockerfile("   \n");
        let ctx = context_for(&server);

        let result = handle_analyze(
            &ctx,
            AnalyzeArgs {
                file: Some(path.clone()),
            },
            OutputFormat::Table,
        )
        .await;
        let _ = fs::remove_file(&path);

        let err = result.expect_err("blank content should be rejected");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn backend_detail_reaches_the_failure_message() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/analyze-dockerfile");
            then.status(422)
                .json_body(json!({"detail": "content is not a Dockerfile"}));
        });

        let path = scratch_dockerfile("FROM node:latest\n");
        let ctx = context_for(&server);
        let result = handle_analyze(
            &ctx,
            AnalyzeArgs {
                file: Some(path.clone()),
            },
            OutputFormat::Table,
        )
        .await;
        let _ = fs::remove_file(&path);

        let err = result.expect_err("rejection should fail the command");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("not a Dockerfile"));
    }
}
