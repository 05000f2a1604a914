use std::rc::Rc;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    symbols,
    widgets::{Block, StatefulWidgetRef, Widget},
};

use ratatui::{prelude::Stylize, symbols::border, text::Line, widgets::Borders};

use crate::{
    app::App,
    dashboard::Dashboard,
    occupancy::Occupancy,
    widgets::{ClusterPane, ClusterState, UsersTable, UsersTableState},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Focus {
    #[default]
    Users,
    Cluster,
}

#[derive(Debug, Default)]
pub struct UI {
    /// Indicates if the cluster pane or the accounts table has focus
    focus: Focus,
    dashboard: Option<Rc<Dashboard>>,
    status: Option<String>,
    occupancy: Occupancy,
    /// Matrix width the occupancy was laid out for; None forces a new layout
    width: Option<u16>,
    /// Transposition toggled at runtime; overrides the configuration
    transpose: Option<bool>,
    cluster: ClusterPane,
    cluster_state: ClusterState,
    /// The last used layout; used to determine mouse-click targets
    cluster_layout: Rect,
    users: UsersTable,
    user_state: UsersTableState,
}

impl UI {
    pub fn new(app: &App) -> Self {
        let mut ui = Self::default();
        // Set initial focus on the cluster pane
        ui.toggle_focus();
        ui.update(app);
        ui
    }

    /// Takes over the dashboard of the last refresh cycle
    pub fn update(&mut self, app: &App) {
        self.dashboard = app.dashboard.clone();
        self.status = app.status.clone();

        if let Some(dashboard) = &self.dashboard {
            self.user_state.update(&dashboard.users);
        }

        self.width = None;
        self.update_lines();
    }

    pub fn scroll(&mut self, delta: isize) {
        match self.focus {
            Focus::Cluster => self.cluster_state.scroll(delta),
            Focus::Users => {
                self.user_state.scroll(delta);
                self.update_lines();
            }
        }
    }

    pub fn set_sort_column(&mut self, delta: isize) {
        self.user_state.set_sort_column(delta);
    }

    pub fn toggle_sort_order(&mut self) {
        self.user_state.toggle_sort_order();
    }

    /// Switches between one column and one row per node
    pub fn toggle_transpose(&mut self) {
        let current = self
            .transpose
            .or_else(|| self.dashboard.as_ref().map(|d| d.config.transpose))
            .unwrap_or_default();

        self.transpose = Some(!current);
        self.width = None;
    }

    pub fn mouse_click(&mut self, row: u16) {
        if let Some(focus) = self.focus_at(row) {
            if self.focus != focus {
                self.toggle_focus();
            }

            if focus == Focus::Users {
                // -1 for the joined border
                let row = row
                    .saturating_sub(self.cluster_layout.height)
                    .saturating_sub(1);
                self.user_state.click(row as usize);
                self.update_lines();
            }
        }
    }

    pub fn mouse_wheel(&mut self, row: u16, delta: isize) {
        match self.focus_at(row) {
            Some(Focus::Cluster) => self.cluster_state.scroll(delta),
            Some(Focus::Users) => {
                self.user_state.scroll(delta);
                self.update_lines();
            }
            None => {}
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Users => Focus::Cluster,
            Focus::Cluster => Focus::Users,
        };

        self.user_state.focus(self.focus == Focus::Users);
        self.update_lines();
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        // Require space for the matrix summary and a few accounts before rendering both panes
        if area.height >= 2 * (3 + 1) + 3 {
            let users = (self.user_state.height() + 3).clamp(5, area.height / 2);
            let layout = Layout::default()
                .direction(ratatui::layout::Direction::Vertical)
                .constraints(vec![Constraint::Min(4), Constraint::Length(users)])
                .split(area);

            self.render_cluster(layout[0], buf, Line::default());
            self.render_users(layout[1], buf, UI::instructions());
            self.cluster_layout = layout[0];
        } else {
            self.render_cluster(area, buf, UI::instructions());
            self.cluster_layout = area;
        }
    }

    fn focus_at(&self, row: u16) -> Option<Focus> {
        if row >= self.cluster_layout.height && !self.cluster_layout.is_empty() {
            Some(Focus::Users)
        } else if row < self.cluster_layout.height.saturating_sub(1) {
            Some(Focus::Cluster)
        } else {
            None
        }
    }

    /// Lays out the core matrices for a pane of the given width; resizing the terminal
    /// re-paginates the cluster of the last refresh cycle
    fn layout_matrix(&mut self, width: u16) {
        if self.width == Some(width) {
            return;
        }

        self.occupancy = match &self.dashboard {
            Some(dashboard) => match self.transpose {
                Some(transpose) if transpose != dashboard.config.transpose => {
                    let mut config = dashboard.config.clone();
                    config.transpose = transpose;
                    Occupancy::build(&dashboard.cluster, &dashboard.users, &config, width.into())
                }
                _ => Occupancy::build(
                    &dashboard.cluster,
                    &dashboard.users,
                    &dashboard.config,
                    width.into(),
                ),
            },
            None => Occupancy::default(),
        };

        self.width = Some(width);
        self.update_lines();
    }

    fn update_lines(&mut self) {
        let highlight = match self.focus {
            Focus::Users => self.user_state.selected_user(),
            Focus::Cluster => None,
        };

        self.cluster_state.update(
            self.dashboard.as_deref(),
            &self.occupancy,
            highlight,
            self.status.as_deref(),
        );
    }

    fn render_cluster(&mut self, area: Rect, buf: &mut Buffer, instructions: Line) {
        let title = match &self.dashboard {
            Some(dashboard) => format!(" {} ", dashboard.scheduler),
            None => String::default(),
        };

        let block = Block::default()
            .title_top(Line::from(title).bold().centered())
            .title_bottom(instructions)
            .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
            .border_set(border::PLAIN);

        let inner = block.inner(area);
        // Two columns are taken by the scrollbar
        self.layout_matrix(inner.width.saturating_sub(2));

        self.cluster.render_ref(inner, buf, &mut self.cluster_state);
        block.render(area, buf);
    }

    fn render_users(&mut self, area: Rect, buf: &mut Buffer, instructions: Line) {
        // Join border with border-less bottom of the cluster pane
        let border = symbols::border::Set {
            top_left: symbols::line::NORMAL.vertical_right,
            top_right: symbols::line::NORMAL.vertical_left,
            ..symbols::border::PLAIN
        };

        let block = Block::default()
            .title_top(Line::from(" Users ").centered())
            .title_bottom(instructions)
            .borders(Borders::ALL)
            .border_set(border);

        self.users
            .render_ref(block.inner(area), buf, &mut self.user_state);
        block.render(area, buf);
    }

    fn instructions() -> Line<'static> {
        Line::from(vec![
            " <R> ".bold(),
            "Refresh".into(),
            " <T> ".bold(),
            "Transpose".into(),
            " <Tab> ".bold(),
            "Focus".into(),
            " <S> ".bold(),
            "Sort order".into(),
            " <Q> ".bold(),
            "Quit ".into(),
        ])
        .centered()
    }
}
