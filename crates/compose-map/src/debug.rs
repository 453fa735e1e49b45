//! Debug helpers for inspecting cycles and recorded renderer traffic.

use std::fmt::Write;

use compose_map_renderer::RendererCall;

use crate::declaration::MapContentNode;
use crate::report::{CycleReport, ReconcileStats};

fn format_stats(stats: &ReconcileStats) -> String {
    format!("+{} ~{} -{}", stats.created, stats.updated, stats.destroyed)
}

/// One-line summary of a cycle.
pub fn format_cycle_report(report: &CycleReport) -> String {
    let mut out = format!(
        "cycle {}: {} leaves, sources {}, layers {}, groups {}, items {}, overlays {}",
        report.cycle,
        report.leaves,
        format_stats(&report.style.sources),
        format_stats(&report.style.layers),
        format_stats(&report.annotations.groups),
        format_stats(&report.annotations.items),
        format_stats(&report.overlays),
    );
    if report.camera.viewport_applied {
        out.push_str(", viewport applied");
    }
    if report.camera.settings_applied > 0 {
        let _ = write!(out, ", {} settings", report.camera.settings_applied);
    }
    if report.camera.camera_changed {
        out.push_str(", camera moved");
    }
    if report.subscriptions_attached > 0 {
        let _ = write!(out, ", {} subscriptions", report.subscriptions_attached);
    }
    if !report.failures.is_empty() {
        let _ = write!(out, ", {} failures", report.failures.len());
    }
    out
}

pub fn log_cycle_report(report: &CycleReport) {
    if report.is_clean() {
        log::debug!("{}", format_cycle_report(report));
    } else {
        log::warn!("{}", format_cycle_report(report));
    }
}

/// Numbered listing of recorded calls, one per line.
pub fn format_renderer_calls(calls: &[RendererCall]) -> String {
    let mut out = String::new();
    for (index, call) in calls.iter().enumerate() {
        let _ = writeln!(out, "{index:>3}: {call:?}");
    }
    out
}

/// Resolved id of every leaf in traversal order.
pub fn format_content_tree(content: &MapContentNode) -> String {
    let mut out = String::new();
    match content.resolve() {
        Ok(leaves) => {
            for leaf in leaves {
                let _ = writeln!(out, "{} {:?}", leaf.id, leaf.payload);
            }
        }
        Err(error) => {
            let _ = writeln!(out, "invalid content: {error}");
        }
    }
    out
}

pub fn log_content_tree(content: &MapContentNode) {
    log::debug!("map content:\n{}", format_content_tree(content));
}
