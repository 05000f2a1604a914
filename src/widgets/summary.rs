use ratatui::{
    style::{Color, Stylize},
    text::{Line, Span},
};

use crate::dashboard::Dashboard;
use crate::occupancy::Occupancy;

/// Totals, queues and numbering notes shown above the core matrices
pub fn summary_lines(dashboard: &Dashboard, occupancy: &Occupancy) -> Vec<Line<'static>> {
    let cluster = &dashboard.cluster;
    let mut lines = vec![Line::from(vec![
        format!("{} ", dashboard.scheduler.to_uppercase()).bold(),
        "nodes ".into(),
        format!("{}/{}", cluster.online_nodes(), cluster.total_nodes).bold(),
        " | cores ".into(),
        format!("{}/{}", cluster.busy_cores, cluster.total_cores).bold(),
        format!(" ({:.1}%)", dashboard.utilization()).into(),
        " | jobs ".into(),
        dashboard.jobs.to_string().bold(),
        format!(
            " ({} running, {} queued)",
            dashboard.queues.running, dashboard.queues.queued
        )
        .into(),
    ])];

    if !dashboard.queues.queues.is_empty() {
        let mut spans = vec![Span::from("Queues:")];
        for queue in &dashboard.queues.queues {
            spans.push(format!(" {}", queue.name).bold());
            spans.push(format!(" {}/{}", queue.running, queue.queued).into());
        }

        lines.push(Line::from(spans));
    }

    let mut notes = Vec::new();
    if let Some(decision) = cluster.remap.as_ref().filter(|d| d.remap()) {
        let reasons: Vec<_> = decision.reasons.iter().map(|r| r.to_string()).collect();
        notes.push(format!("nodes renumbered ({})", reasons.join(", ")));
    }

    if occupancy.start > 0 {
        notes.push(format!("nodes 1-{} hidden", occupancy.start));
    }

    if cluster.filtered > 0 {
        notes.push(format!("{} nodes filtered", cluster.filtered));
    }

    if cluster.offdown_nodes > 0 {
        notes.push(format!("{} nodes down/offline", cluster.offdown_nodes));
    }

    if !notes.is_empty() {
        lines.push(Line::from(notes.join("; ")).fg(Color::DarkGray));
    }

    lines
}

/// Single line with the error of the last cycle or the sources that could not be queried
pub fn diagnostic_line(dashboard: Option<&Dashboard>, status: Option<&str>) -> Option<Line<'static>> {
    if let Some(status) = status {
        return Some(Line::from(status.to_string()).fg(Color::Red));
    }

    dashboard
        .filter(|d| !d.warnings.is_empty())
        .map(|d| Line::from(d.warnings.join("; ")).fg(Color::Yellow))
}
