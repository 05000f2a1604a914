use std::cmp::Ordering;
use std::fmt::Debug;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Borders, StatefulWidgetRef, TableState, Widget},
};

use crate::users::UserIdentities;
use crate::widgets::misc::scroll;

use super::{
    misc::{center_layout, right_align_text},
    table::{GenericTable, GenericTableState, SortOrder},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Token,
    Running,
    Queued,
    Total,
    Account,
    Pattern,
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self, f)
    }
}

/// A single line of the accounts table
#[derive(Clone, Debug, PartialEq)]
struct UserRow {
    /// Index of the account in [`UserIdentities`]
    idx: usize,
    token: String,
    running: usize,
    queued: usize,
    total: usize,
    account: String,
    pattern: String,
    color: Color,
}

impl UserRow {
    fn compare(&self, other: &Self, column: Column) -> Ordering {
        match column {
            Column::Token => self.idx.cmp(&other.idx),
            Column::Running => self.running.cmp(&other.running),
            Column::Queued => self.queued.cmp(&other.queued),
            Column::Total => self.total.cmp(&other.total),
            Column::Account => self.account.cmp(&other.account),
            Column::Pattern => self.pattern.cmp(&other.pattern),
        }
        .then_with(|| self.idx.cmp(&other.idx))
    }
}

#[derive(Debug)]
pub struct UsersTableState {
    focus: bool,
    table: TableState,
    rows: Vec<UserRow>,
    columns: Vec<Column>,
    /// No explicit sort column means token order
    sort_column: Option<Column>,
    sort_order: SortOrder,
}

impl UsersTableState {
    pub fn focus(&mut self, focus: bool) {
        self.focus = focus;
    }

    pub fn update(&mut self, users: &UserIdentities) {
        let selected = self.selected_account().map(str::to_string);

        self.rows.clear();
        self.rows
            .extend(users.iter().enumerate().map(|(idx, user)| UserRow {
                idx,
                token: user.label(),
                running: user.running(),
                queued: user.queued(),
                total: user.total,
                account: user.account.clone(),
                pattern: user.pattern.clone(),
                color: user.color,
            }));
        self.sort();

        // Keep the same account selected across refreshes
        if let Some(account) = selected {
            if let Some(row) = self.rows.iter().position(|row| row.account == account) {
                self.table.select(Some(row));
            }
        }

        self.scroll(0);
    }

    pub fn scroll(&mut self, delta: isize) {
        scroll(&mut self.table, self.rows.len(), delta);
    }

    pub fn click(&mut self, row: usize) {
        let offset = self.table.offset().saturating_add(row);
        self.table.select(Some(offset.saturating_sub(1)));
        self.scroll(0);
    }

    pub fn height(&self) -> u16 {
        self.rows.len() as u16
    }

    /// Moves the sort column `delta` steps; stepping past either end returns to token order
    pub fn set_sort_column(&mut self, delta: isize) {
        let columns = self.columns.len() as isize;
        let current = match self.sort_column {
            Some(column) => self
                .columns
                .iter()
                .position(|c| *c == column)
                .map_or(-1, |idx| idx as isize),
            None => -1,
        };

        let next = (current + 1 + delta).rem_euclid(columns + 1) - 1;
        self.sort_column = usize::try_from(next)
            .ok()
            .and_then(|idx| self.columns.get(idx).copied());
        self.resort();
    }

    pub fn toggle_sort_order(&mut self) {
        self.sort_order = self.sort_order.toggle();
        self.resort();
    }

    /// Index in [`UserIdentities`] of the selected account
    pub fn selected_user(&self) -> Option<usize> {
        self.table
            .selected()
            .and_then(|row| self.rows.get(row))
            .map(|row| row.idx)
    }

    fn selected_account(&self) -> Option<&str> {
        self.table
            .selected()
            .and_then(|row| self.rows.get(row))
            .map(|row| row.account.as_str())
    }

    fn resort(&mut self) {
        let selected = self.selected_user();
        self.sort();

        if let Some(idx) = selected {
            self.table
                .select(self.rows.iter().position(|row| row.idx == idx));
        }
    }

    fn sort(&mut self) {
        let column = self.sort_column.unwrap_or(Column::Token);
        let order = self.sort_order;
        let explicit = self.sort_column.is_some();
        self.rows.sort_by(|a, b| {
            let ordering = a.compare(b, column);
            match (column, order) {
                // Token order reads top to bottom unless reversed explicitly
                (Column::Token, SortOrder::Descending) if !explicit => ordering,
                (_, SortOrder::Ascending) => ordering,
                (_, SortOrder::Descending) => ordering.reverse(),
            }
        });
    }
}

impl Default for UsersTableState {
    fn default() -> Self {
        Self {
            focus: false,
            table: TableState::default(),
            rows: Vec::default(),
            columns: vec![
                Column::Token,
                Column::Running,
                Column::Queued,
                Column::Total,
                Column::Account,
                Column::Pattern,
            ],
            sort_column: None,
            sort_order: SortOrder::default(),
        }
    }
}

impl GenericTableState<Column> for UsersTableState {
    fn focus(&self) -> bool {
        self.focus
    }

    fn nrows(&self) -> usize {
        self.rows.len()
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn sort_column(&self) -> Option<Column> {
        self.sort_column
    }

    fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    fn selected(&self) -> Option<usize> {
        self.table.selected()
    }

    fn variable_width(&self, column: Column) -> bool {
        matches!(column, Column::Pattern)
    }

    fn text<'a>(&self, _constraint: &Constraint, row: usize, column: Column) -> Text<'a> {
        let user = &self.rows[row];
        match column {
            Column::Token => Text::from(user.token.clone()).fg(user.color).bold(),
            Column::Running => right_align_text(user.running),
            Column::Queued => right_align_text(user.queued),
            Column::Total => right_align_text(user.total),
            Column::Account => Text::from(user.account.clone()).fg(user.color),
            Column::Pattern => user.pattern.clone().into(),
        }
    }

    fn inner_state(&mut self) -> &mut TableState {
        &mut self.table
    }
}

#[derive(Debug, Default)]
pub struct UsersTable {}

impl UsersTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Renders a simple notification that there are no jobs at all
    fn render_empty_table(area: Rect, buf: &mut Buffer) {
        let label = "No jobs found";
        // Size of label + surrounding border
        let width = label.chars().count() as u16 + 2;
        let height = 3;

        if let Some(area) = center_layout(area, width, height) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_set(border::PLAIN);

            Text::from(label).render(block.inner(area), buf);
            block.render(area, buf);
        }
    }
}

impl StatefulWidgetRef for UsersTable {
    type State = UsersTableState;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if state.rows.is_empty() {
            Self::render_empty_table(area, buf)
        } else {
            let table = GenericTable::<Column, UsersTableState>::new();

            table.render_ref(area, buf, state);
        }
    }
}

/// Accounts table as plain lines, in token order
pub fn account_lines(users: &UserIdentities) -> Vec<Line<'static>> {
    let width = users
        .iter()
        .map(|user| user.account.chars().count())
        .max()
        .unwrap_or_default()
        .max("Account".len());

    let mut lines = vec![Line::from(format!(
        "{:>5} {:>7} {:>6} {:>5}  {:<width$}  Pattern",
        "Token",
        "Running",
        "Queued",
        "Total",
        "Account",
        width = width
    ))
    .bold()];

    for user in users.iter() {
        lines.push(Line::from(vec![
            Span::from(format!("{:>5}", user.label())).fg(user.color).bold(),
            Span::from(format!(
                " {:>7} {:>6} {:>5}  ",
                user.running(),
                user.queued(),
                user.total
            )),
            Span::from(format!("{:<width$}", user.account, width = width)).fg(user.color),
            Span::from(format!("  {}", user.pattern)),
        ]));
    }

    lines
}
