use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::{eyre::Context, Result};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use tracing::error;

/// Terminal events.
#[derive(Clone, Copy, Debug)]
pub enum Event {
    /// Terminal tick.
    Tick,
    /// Key press.
    Key(KeyEvent),
    /// Mouse click/scroll.
    Mouse(MouseEvent),
    /// Terminal resize.
    Resize(u16, u16),
}

/// Terminal event handler; events are read on a separate thread.
#[derive(Debug)]
pub struct EventHandler {
    receiver: mpsc::Receiver<Event>,
}

impl EventHandler {
    /// Constructs a new instance of [`EventHandler`], ticking every `tick_rate` milliseconds.
    pub fn new(tick_rate: u64) -> Self {
        let tick_rate = Duration::from_millis(tick_rate);
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(tick_rate);

                let event = match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(e)) if e.kind == KeyEventKind::Press => {
                            Some(Event::Key(e))
                        }
                        Ok(CrosstermEvent::Mouse(e)) => Some(Event::Mouse(e)),
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        Ok(_) => None,
                        Err(err) => {
                            error!("failed to read terminal event: {}", err);
                            break;
                        }
                    },
                    Ok(false) => None,
                    Err(err) => {
                        error!("failed to poll terminal events: {}", err);
                        break;
                    }
                };

                if let Some(event) = event {
                    if sender.send(event).is_err() {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if sender.send(Event::Tick).is_err() {
                        break;
                    }

                    last_tick = Instant::now();
                }
            }
        });

        Self { receiver }
    }

    /// Receives the next event, blocking until one is available.
    pub fn next(&self) -> Result<Event> {
        self.receiver
            .recv()
            .wrap_err("terminal event thread stopped")
    }
}
