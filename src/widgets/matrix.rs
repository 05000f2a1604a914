use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::config::Config;
use crate::occupancy::{color, Cell, ColorKey, Page, RowKind};
use crate::users::UserIdentities;

/// Renders a page of the core matrix; cores owned by the `highlight` account are reversed
pub fn page_lines(
    page: &Page,
    users: &UserIdentities,
    config: &Config,
    highlight: Option<usize>,
) -> Vec<Line<'static>> {
    let width = page
        .rows
        .iter()
        .map(|row| row.label.chars().count())
        .max()
        .unwrap_or_default();

    page.rows
        .iter()
        .map(|row| {
            let label = if page.transposed {
                format!("{:<width$} ", row.label, width = width)
            } else {
                format!("{:>width$} ", row.label, width = width)
            };

            let mut spans = vec![Span::styled(label, label_style(row.kind))];
            let mut text = String::new();
            let mut style = Style::new();

            for cell in &row.cells {
                let next = cell_style(*cell, users, config, highlight);
                if next != style && !text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut text), style));
                }

                style = next;
                text.push(cell.glyph);
            }

            if !text.is_empty() {
                spans.push(Span::styled(text, style));
            }

            Line::from(spans)
        })
        .collect()
}

fn label_style(kind: RowKind) -> Style {
    match kind {
        RowKind::Attribute(_) | RowKind::Node(_) => Style::new().add_modifier(Modifier::BOLD),
        RowKind::Id | RowKind::Core(_) => Style::new(),
    }
}

fn cell_style(cell: Cell, users: &UserIdentities, config: &Config, highlight: Option<usize>) -> Style {
    let style = Style::new().fg(color(cell.key, users, config));

    match cell.key {
        ColorKey::User(idx) if highlight == Some(idx) => style.add_modifier(Modifier::REVERSED),
        _ => style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::Row;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn page(transposed: bool) -> Page {
        let cells = |glyphs: &str, key: ColorKey| glyphs.chars().map(|c| Cell::new(c, key)).collect();
        let mut user = Row {
            kind: RowKind::Core(0),
            label: "0".into(),
            cells: cells("00", ColorKey::User(0)),
        };
        user.cells.extend(cells("1_", ColorKey::User(1)));
        user.cells[3] = Cell::new('_', ColorKey::Free);

        Page {
            window: 0..4,
            rows: vec![
                Row {
                    kind: RowKind::Id,
                    label: String::new(),
                    cells: cells("1234", ColorKey::Label),
                },
                user,
                Row {
                    kind: RowKind::Attribute(crate::cluster::NodeAttribute::State),
                    label: "state".into(),
                    cells: cells("-dj-", ColorKey::Label),
                },
            ],
            coreless: false,
            transposed,
        }
    }

    #[test]
    fn test_page_lines() {
        let users = UserIdentities::default();
        let lines = page_lines(&page(false), &users, &Config::default(), None);

        let text: Vec<_> = lines.iter().map(line_text).collect();
        assert_eq!(text, ["      1234", "    0 001_", "state -dj-"]);
        // Label, then one span per color
        assert_eq!(lines[1].spans.len(), 3);

        let lines = page_lines(&page(true), &users, &Config::default(), None);
        assert_eq!(line_text(&lines[1]), "0     001_");
    }

    #[test]
    fn test_highlight() {
        let users = UserIdentities::default();
        let lines = page_lines(&page(false), &users, &Config::default(), Some(1));

        let reversed: String = lines[1]
            .spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::REVERSED))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(reversed, "1");
    }
}
