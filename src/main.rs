use color_eyre::Result;
use ratatui::backend::CrosstermBackend;
use ratatui::text::Line;
use ratatui::Terminal;
use std::io;

use qtop::app::App;
use qtop::args::Args;
use qtop::event::{Event, EventHandler};
use qtop::handler::{handle_key_events, handle_mouse_events};
use qtop::logging;
use qtop::occupancy::Occupancy;
use qtop::tui::{self, Tui};
use qtop::ui::UI;
use qtop::widgets::{account_lines, dashboard_lines};

/// Width assumed when printing somewhere other than a terminal
const DEFAULT_WIDTH: u16 = 80;

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    if args.version {
        println!("qtop v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.once {
        color_eyre::install()?;
    }

    logging::init(args.log_file.as_deref(), args.verbose)?;
    let mut app = App::new(args)?;

    if app.args.once {
        return print_once(&mut app);
    }

    app.collect();
    let mut ui = UI::new(&app);

    // Initialize the terminal user interface
    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;
    let events = EventHandler::new(50);
    let mut tui = Tui::new(terminal, events);
    tui.init()?;
    tui.draw(&mut ui)?;

    // Main loop
    while app.running {
        let redraw = match tui.events.next()? {
            Event::Tick => {
                if app.tick() {
                    ui.update(&app);
                    true
                } else {
                    false
                }
            }
            Event::Key(key_event) => handle_key_events(key_event, &mut app, &mut ui),
            Event::Mouse(mouse_event) => handle_mouse_events(mouse_event, &mut ui),
            Event::Resize(_, _) => true,
        };

        if redraw {
            tui.draw(&mut ui)?;
        }
    }

    tui.exit()?;
    Ok(())
}

/// Prints a single dashboard; a failing cycle is an error
fn print_once(app: &mut App) -> Result<()> {
    let dashboard = app.cycle()?;
    let width = app
        .args
        .width
        .or_else(tui::stdout_width)
        .unwrap_or(DEFAULT_WIDTH);

    let occupancy = Occupancy::build(
        &dashboard.cluster,
        &dashboard.users,
        &dashboard.config,
        width.into(),
    );

    let mut lines = dashboard_lines(Some(&dashboard), &occupancy, None, None);
    lines.push(Line::default());
    lines.extend(account_lines(&dashboard.users));

    tui::print_lines(&lines)
}
