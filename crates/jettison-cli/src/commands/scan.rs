//! Repository scan, per-target optimization, and publication flows.

use anyhow::anyhow;
use jettison_notify::{NoticeEnvelope, NoticeKind};

use crate::cli::{OutputFormat, ScanArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output;

pub(crate) async fn handle_scan(
    ctx: &AppContext,
    args: ScanArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let source = args.source.trim().to_string();
    if source.is_empty() {
        return Err(CliError::validation("repository source must not be empty"));
    }

    let session = ctx.session();
    session.scan(&source, args.path.as_deref()).await;

    if args.all {
        let paths = session
            .snapshot()
            .await
            .discovery
            .map(|discovery| discovery.paths)
            .unwrap_or_default();
        for path in &paths {
            if session.report(path).await.is_none() {
                session.select_or_optimize(path).await;
            }
        }
    }

    if args.push {
        if args.all {
            session.publish_all().await;
        } else if let Some((active, _)) = session.active_report().await {
            session.publish_one(&active).await;
        }
    }

    let snapshot = session.snapshot().await;
    if args.all {
        let mut entries = Vec::new();
        for path in &snapshot.optimized {
            if let Some(report) = session.report(path).await {
                entries.push((path.clone(), report));
            }
        }
        output::render_summary(&entries, format)?;
    } else if let Some((path, report)) = session.active_report().await {
        output::render_report(&path, &report, format)?;
    } else if let Some(discovery) = &snapshot.discovery {
        output::render_menu(discovery, format)?;
    }

    let notices = ctx.notices.live();
    output::render_notices(&notices);
    fail_on_error_notices(&notices)
}

/// The orchestration layer reports failures as notices rather than errors;
/// surface the first one as the command outcome so the exit code reflects it.
fn fail_on_error_notices(notices: &[NoticeEnvelope]) -> CliResult<()> {
    notices
        .iter()
        .find(|envelope| envelope.notice.kind == NoticeKind::Error)
        .map_or(Ok(()), |envelope| {
            Err(CliError::failure(anyhow!("{}", envelope.notice.message)))
        })
}
