use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Line,
    widgets::StatefulWidgetRef,
};

use crate::dashboard::Dashboard;
use crate::occupancy::Occupancy;

use super::{
    matrix::page_lines,
    summary::{diagnostic_line, summary_lines},
    RightScrollbar,
};

/// Everything shown in the cluster pane, as a scrollable list of lines
#[derive(Debug, Default)]
pub struct ClusterState {
    lines: Vec<Line<'static>>,
    /// Index of the first visible line
    offset: usize,
    /// Number of lines that fit in the pane when it was last rendered
    visible: usize,
}

impl ClusterState {
    /// Lays out the summary, the diagnostic line and every non-empty page of the matrix
    pub fn update(
        &mut self,
        dashboard: Option<&Dashboard>,
        occupancy: &Occupancy,
        highlight: Option<usize>,
        status: Option<&str>,
    ) {
        self.lines = dashboard_lines(dashboard, occupancy, highlight, status);
        self.scroll(0);
    }

    pub fn scroll(&mut self, delta: isize) {
        let last = self.lines.len().saturating_sub(self.visible.max(1));
        self.offset = (self.offset as isize)
            .saturating_add(delta)
            .clamp(0, last as isize) as usize;
    }

    pub fn height(&self) -> u16 {
        self.lines.len() as u16
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }
}

/// Builds the lines of the cluster pane; also used for one-shot output
pub fn dashboard_lines(
    dashboard: Option<&Dashboard>,
    occupancy: &Occupancy,
    highlight: Option<usize>,
    status: Option<&str>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(dashboard) = dashboard {
        lines.extend(summary_lines(dashboard, occupancy));
    }

    if let Some(line) = diagnostic_line(dashboard, status) {
        lines.push(line);
    }

    if let Some(dashboard) = dashboard {
        for page in occupancy.visible_pages() {
            lines.push(Line::default());
            lines.extend(page_lines(
                page,
                &dashboard.users,
                &dashboard.config,
                highlight,
            ));
        }
    }

    lines
}

/// Strips all styling from `lines`
pub fn plain_text(lines: &[Line]) -> String {
    let mut text = String::new();
    for line in lines {
        for span in &line.spans {
            text.push_str(&span.content);
        }

        text.push('\n');
    }

    text
}

#[derive(Debug, Default)]
pub struct ClusterPane {}

impl ClusterPane {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatefulWidgetRef for ClusterPane {
    type State = ClusterState;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let area = RightScrollbar::default()
            .items(state.lines.len().saturating_sub(area.height as usize) + 1)
            .selected(Some(state.offset))
            .render(area, buf);

        state.visible = area.height as usize;
        state.scroll(0);

        for (row, line) in state
            .lines
            .iter()
            .skip(state.offset)
            .take(area.height as usize)
            .enumerate()
        {
            buf.set_line(area.x, area.y + row as u16, line, area.width);
        }
    }
}
