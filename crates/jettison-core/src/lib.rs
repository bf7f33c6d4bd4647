//! Backend-agnostic orchestration primitives for Dockerfile optimization.
//!
//! Layout: `model` (domain DTOs shared across the workspace), `service` (the
//! `AnalysisBackend` collaborator trait), `error` (remote failure types),
//! `session` (the discovery-and-optimization state machine).

pub mod error;
pub mod model;
pub mod service;
pub mod session;

pub use error::{RemoteError, RemoteResult};
pub use model::{
    Discovery, FileUpdate, Finding, FindingCategory, PublishReceipt, PublishRequest,
    Recommendation, ScanOutcome, Severity, TargetReport,
};
pub use service::AnalysisBackend;
pub use session::{
    DEFAULT_TARGET_PATH, Publication, ROOT_SERVICE_LABEL, ScanSession, SessionSnapshot,
    service_label,
};
