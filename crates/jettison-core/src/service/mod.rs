//! Collaborator traits implemented by remote analysis adapters.

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::model::{PublishReceipt, PublishRequest, ScanOutcome, TargetReport};

/// Remote analysis and publication backend driven by the scan session.
///
/// Implementations are stateless request/response wrappers; every call is a
/// single round trip that eventually resolves to success or failure.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Discover optimization targets in a repository, or optimize one of them
    /// when `path` names a specific target.
    async fn scan_repository(&self, source: &str, path: Option<&str>)
    -> RemoteResult<ScanOutcome>;

    /// Publish recommended updates back to the source-control provider.
    async fn publish(&self, request: PublishRequest) -> RemoteResult<PublishReceipt>;

    /// Optimize a raw Dockerfile body; default implementation reports lack of
    /// support.
    async fn optimize_content(&self, content: &str) -> RemoteResult<TargetReport> {
        let _ = content;
        Err(RemoteError::Unsupported {
            operation: "optimize_content",
        })
    }
}
