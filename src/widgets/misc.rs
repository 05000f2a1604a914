use std::fmt::Display;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::Text,
    widgets::TableState,
};

pub const COLUMN_SPACING: u16 = 2;

/// Moves the selection of a table with `items` rows by `delta`, clamped to the table
pub fn scroll(state: &mut TableState, items: usize, delta: isize) -> Option<usize> {
    let selection = if items == 0 {
        None
    } else {
        Some(
            (state.selected().unwrap_or_default() as isize)
                .saturating_add(delta)
                .clamp(0, items as isize - 1) as usize,
        )
    };

    state.select(selection);
    selection
}

/// Right aligns displayable value
pub fn right_align_text<'a, T: Display>(v: T) -> Text<'a> {
    Text::from(v.to_string()).alignment(Alignment::Right)
}

/// Creates a `height`/`width` Rect centered in the specified `area`
pub fn center_layout(area: Rect, width: u16, height: u16) -> Option<Rect> {
    if width > area.width || height > area.height {
        return None;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length((area.height - height) / 2),
            Constraint::Length(height),
        ])
        .split(area);

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Length((area.width - width) / 2),
            Constraint::Length(width),
        ])
        .split(layout[1]);

    Some(layout[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll() {
        let mut state = TableState::default();
        assert_eq!(scroll(&mut state, 0, 1), None);
        assert_eq!(scroll(&mut state, 5, 0), Some(0));
        assert_eq!(scroll(&mut state, 5, -1), Some(0));
        assert_eq!(scroll(&mut state, 5, 3), Some(3));
        assert_eq!(scroll(&mut state, 5, isize::MAX), Some(4));
        assert_eq!(scroll(&mut state, 2, 0), Some(1));
        assert_eq!(state.selected(), Some(1));
    }

    #[test]
    fn test_center_layout() {
        let area = Rect::new(0, 0, 20, 10);
        let center = center_layout(area, 10, 4).unwrap();
        assert_eq!((center.x, center.y), (5, 3));
        assert_eq!(center_layout(area, 21, 4), None);
        assert_eq!(center_layout(area, 10, 11), None);
    }
}
