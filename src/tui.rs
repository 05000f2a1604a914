use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};

use color_eyre::{config::HookBuilder, eyre, Result};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::text::Line;
use ratatui::{Terminal, TerminalOptions, Viewport};
use std::io::{self, IsTerminal, Write};
use std::panic;

use crate::event::EventHandler;
use crate::ui::UI;
use crate::widgets::plain_text;

/// Representation of a terminal user interface.
///
/// It is responsible for setting up the terminal,
/// initializing the interface and handling the draw events.
#[derive(Debug)]
pub struct Tui<B: Backend>
where
    <B as Backend>::Error: Send + Sync + 'static,
{
    /// Interface to the Terminal.
    terminal: Terminal<B>,
    /// Terminal event handler.
    pub events: EventHandler,
}

impl<B: Backend> Tui<B>
where
    <B as Backend>::Error: Send + Sync + 'static,
{
    /// Constructs a new instance of [`Tui`].
    pub fn new(terminal: Terminal<B>, events: EventHandler) -> Self {
        Self { terminal, events }
    }

    /// Initializes the terminal interface.
    ///
    /// It enables the raw mode and sets terminal properties.
    pub fn init(&mut self) -> Result<()> {
        // Reset the terminal before reporting panics and errors, so that they are readable
        let (panic_hook, eyre_hook) = HookBuilder::default().into_hooks();
        let panic_hook = panic_hook.into_panic_hook();
        panic::set_hook(Box::new(move |panic| {
            if let Err(err) = Self::reset() {
                eprintln!("failed to reset the terminal: {}", err);
            }
            panic_hook(panic);
        }));

        let eyre_hook = eyre_hook.into_eyre_hook();
        eyre::set_hook(Box::new(
            move |error: &(dyn std::error::Error + 'static)| {
                if let Err(err) = Self::reset() {
                    eprintln!("failed to reset the terminal: {}", err);
                }
                eyre_hook(error)
            },
        ))?;

        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;

        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    /// [`Draw`] the terminal interface by [`rendering`] the widgets.
    ///
    /// [`Draw`]: ratatui::Terminal::draw
    pub fn draw(&mut self, ui: &mut UI) -> Result<()> {
        self.terminal
            .draw(|frame| ui.render(frame.area(), frame.buffer_mut()))?;

        Ok(())
    }

    /// Resets the terminal interface.
    ///
    /// This function is also used for the panic hook to revert
    /// the terminal properties if unexpected errors occur.
    fn reset() -> Result<()> {
        terminal::disable_raw_mode()?;
        crossterm::execute!(io::stderr(), LeaveAlternateScreen, DisableMouseCapture)?;
        Ok(())
    }

    /// Exits the terminal interface.
    ///
    /// It disables the raw mode and reverts back the terminal properties.
    pub fn exit(&mut self) -> Result<()> {
        Self::reset()?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Width of the terminal on stdout, if it is one
pub fn stdout_width() -> Option<u16> {
    if io::stdout().is_terminal() {
        terminal::size().ok().map(|(width, _)| width)
    } else {
        None
    }
}

/// Prints `lines` to stdout; styled and inline on a terminal, plain text otherwise
pub fn print_lines(lines: &[Line]) -> Result<()> {
    let mut stdout = io::stdout();
    if !stdout.is_terminal() {
        stdout.write_all(plain_text(lines).as_bytes())?;
        return Ok(stdout.flush()?);
    }

    let mut terminal = Terminal::with_options(
        CrosstermBackend::new(stdout),
        TerminalOptions {
            viewport: Viewport::Inline(1),
        },
    )?;

    terminal.insert_before(lines.len() as u16, |buf| {
        let area = buf.area;
        for (row, line) in lines.iter().enumerate() {
            buf.set_line(area.x, area.y + row as u16, line, area.width);
        }
    })?;

    Ok(())
}
