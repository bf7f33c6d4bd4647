//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use jettison_core::{Discovery, Severity, TargetReport, service_label};
use jettison_notify::{NoticeEnvelope, NoticeKind};
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_report(
    path: &str,
    report: &TargetReport,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "path": path, "report": report }))?,
        OutputFormat::Table => {
            println!("target: {path}");
            println!("service: {}", service_label(path));
            if let Some(severity) = report.max_severity() {
                println!("worst finding: {}", severity_to_str(severity));
            }
            if !report.findings.is_empty() {
                println!("findings:");
                for finding in &report.findings {
                    println!(
                        "  [{:<8}] {}",
                        severity_to_str(finding.severity),
                        finding.message
                    );
                    if let Some(fix) = &finding.recommendation {
                        println!("             fix: {fix}");
                    }
                }
            }
            println!("--- optimized Dockerfile ---");
            println!("{}", report.recommendation.dockerfile.trim_end());
            if let Some(dockerignore) = &report.recommendation.dockerignore {
                println!("--- .dockerignore ---");
                println!("{}", dockerignore.trim_end());
            }
            if !report.recommendation.explanation.is_empty() {
                println!("rationale:");
                for entry in &report.recommendation.explanation {
                    println!("  - {entry}");
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn render_menu(discovery: &Discovery, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "source": discovery.source,
            "paths": discovery.paths,
        }))?,
        OutputFormat::Table => {
            println!(
                "{} target(s) discovered in {}",
                discovery.paths.len(),
                discovery.source
            );
            for path in &discovery.paths {
                println!("  {:<20} {path}", service_label(path));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_summary(
    entries: &[(String, TargetReport)],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<_> = entries
                .iter()
                .map(|(path, report)| json!({ "path": path, "report": report }))
                .collect();
            print_json(&json!(items))?;
        }
        OutputFormat::Table => {
            println!("{:<32} {:<16} {:>8} WORST", "PATH", "SERVICE", "FINDINGS");
            for (path, report) in entries {
                let worst = report
                    .max_severity()
                    .map_or("-", severity_to_str);
                println!(
                    "{:<32} {:<16} {:>8} {worst}",
                    path,
                    service_label(path),
                    report.findings.len()
                );
            }
        }
    }
    Ok(())
}

/// Print the success and info notices accumulated during a run; error notices
/// are surfaced through the command result instead.
pub(crate) fn render_notices(notices: &[NoticeEnvelope]) {
    for envelope in notices {
        if envelope.notice.kind == NoticeKind::Error {
            continue;
        }
        println!(
            "{}: {}",
            kind_to_str(envelope.notice.kind),
            envelope.notice.message
        );
        if let Some(link) = &envelope.notice.link {
            println!("  {} -> {}", link.label, link.url);
        }
    }
}

pub(crate) const fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "LOW",
        Severity::Medium => "MEDIUM",
        Severity::High => "HIGH",
        Severity::Critical => "CRITICAL",
    }
}

const fn kind_to_str(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "success",
        NoticeKind::Error => "error",
        NoticeKind::Info => "info",
    }
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}
