use crate::{app::App, ui::UI};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Handles the key events and updates the state of [`App`].
///
/// Returns true if the dashboard needs to be redrawn.
pub fn handle_key_events(key_event: KeyEvent, app: &mut App, ui: &mut UI) -> bool {
    let mut processed = true;

    match key_event.code {
        // Exit application on `ESC` or `q`
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
            app.quit();
        }
        // Exit application on `Ctrl-C`
        KeyCode::Char('c') | KeyCode::Char('C') => {
            if key_event.modifiers == KeyModifiers::CONTROL {
                app.quit();
            } else {
                processed = false;
            }
        }
        // Force a refresh cycle
        KeyCode::Char('r') | KeyCode::Char('R') => {
            if app.update(1) {
                ui.update(app);
            } else {
                processed = false;
            }
        }
        // One row per node instead of one column
        KeyCode::Char('t') | KeyCode::Char('T') => ui.toggle_transpose(),
        // Scrolling
        KeyCode::Home => ui.scroll(isize::MIN),
        KeyCode::PageUp => ui.scroll(-10),
        KeyCode::Up => ui.scroll(-1),
        KeyCode::Down => ui.scroll(1),
        KeyCode::PageDown => ui.scroll(10),
        KeyCode::End => ui.scroll(isize::MAX),
        // Sorting of the accounts table
        KeyCode::Left => ui.set_sort_column(-1),
        KeyCode::Right => ui.set_sort_column(1),
        KeyCode::Char('s') | KeyCode::Char('S') => {
            ui.toggle_sort_order();
        }
        // Switch focus between cluster / accounts
        KeyCode::Tab | KeyCode::BackTab => ui.toggle_focus(),
        _ => processed = false,
    }

    processed
}

pub fn handle_mouse_events(event: MouseEvent, ui: &mut UI) -> bool {
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => ui.mouse_click(event.row),
        MouseEventKind::ScrollUp => ui.mouse_wheel(event.row, -1),
        MouseEventKind::ScrollDown => ui.mouse_wheel(event.row, 1),
        _ => return false,
    }

    true
}

#[cfg(test)]
mod tests {
    use argh::FromArgs;
    use crossterm::event::KeyEvent;

    use super::*;
    use crate::args::Args;

    fn app() -> App {
        let args = Args::from_args(&["qtop"], &["-b", "demo"]).unwrap();
        App::new(args).unwrap()
    }

    #[test]
    fn test_quit() {
        for key in [
            KeyEvent::from(KeyCode::Char('q')),
            KeyEvent::from(KeyCode::Esc),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut app = app();
            let mut ui = UI::new(&app);
            assert!(handle_key_events(key, &mut app, &mut ui));
            assert!(!app.running);
        }

        let mut app = app();
        let mut ui = UI::new(&app);
        assert!(!handle_key_events(KeyEvent::from(KeyCode::Char('c')), &mut app, &mut ui));
        assert!(!handle_key_events(KeyEvent::from(KeyCode::Char('x')), &mut app, &mut ui));
        assert!(app.running);
    }

    #[test]
    fn test_navigation() {
        let mut app = app();
        app.collect();
        let mut ui = UI::new(&app);

        for code in [KeyCode::Tab, KeyCode::Down, KeyCode::End, KeyCode::Right, KeyCode::Char('s'), KeyCode::Char('t')] {
            assert!(handle_key_events(KeyEvent::from(code), &mut app, &mut ui));
        }

        // Refreshing is rate limited
        assert!(!handle_key_events(KeyEvent::from(KeyCode::Char('r')), &mut app, &mut ui));
        assert!(app.running);
    }
}
