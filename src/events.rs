//! Event types and the main event loop driver for the guide.
//!
//! Everything that can change [`App`](crate::app::App) arrives here as an
//! [`Event`]: key presses and ticks from the terminal, and the results of
//! background work (content loads, location lookups) posted through
//! [`EventHandler::tx`]. The main loop applies them one at a time, so no
//! transition ever sees another half-applied.

use crate::error::LocationError;
use crate::location::Fix;
use crate::models::Dish;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
#[derive(Debug)]
pub enum Event {
    /// Periodic tick used for the loading spinner.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// A content load finished. `ticket` identifies the request that
    /// produced it so superseded loads can be dropped.
    DishesLoaded { ticket: u64, dishes: Vec<Dish> },
    /// The location lookup finished, one way or another.
    LocationUpdate(Result<Fix, LocationError>),
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// The sender ([`tx`](EventHandler::tx)) can be cloned and handed to
/// background tasks; the receiver is drained by [`next`](EventHandler::next).
pub struct EventHandler {
    /// Sender for posting events from background tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The task polls crossterm with a timeout of `tick_rate_ms`, sends
    /// [`Event::Input`] on key press and [`Event::Tick`] when the interval
    /// elapses. It stops when the terminal can't be read or the receiver is
    /// gone.
    pub fn new(tick_rate_ms: u64) -> Self {
        let handler = Self::detached();
        let event_tx = handler.tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
                // Give the runtime a cancellation point between polls.
                tokio::task::yield_now().await;
            }
        });

        handler
    }

    /// A handler with no terminal task attached; only [`tx`](Self::tx) feeds it.
    pub fn detached() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    ///
    /// Returns `None` when all senders have been dropped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
