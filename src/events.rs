use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use termion::event::Event as TermEvent;
use termion::input::TermRead;

use crate::config::Config;
use crate::error::Result;
use crate::export::Rasterize;

pub enum Event {
    Input(TermEvent),
    Update,
    CapabilityLoaded(Result<Arc<dyn Rasterize>>),
    Exported(Result<PathBuf>),
}

pub struct Dispatcher {
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    _input_handle: thread::JoinHandle<()>,
    _update_handle: thread::JoinHandle<()>,
}

impl Dispatcher {
    pub fn from_config(config: &Config) -> Dispatcher {
        Self::with_tick_rate(config.tick_rate())
    }

    pub fn with_tick_rate(tick_rate: Duration) -> Dispatcher {
        let (tx, rx) = mpsc::channel();
        let input_handle = {
            let tx = tx.clone();
            thread::spawn(move || {
                let stdin = io::stdin();
                for evt in stdin.lock().events() {
                    match evt {
                        Ok(evt) => {
                            if tx.send(Event::Input(evt)).is_err() {
                                return;
                            }
                        }
                        Err(err) => log::warn!("Failed to read input: {}", err),
                    }
                }
            })
        };
        let update_handle = {
            let tx = tx.clone();
            thread::spawn(move || {
                while tx.send(Event::Update).is_ok() {
                    thread::sleep(tick_rate);
                }
            })
        };
        Dispatcher {
            rx,
            tx,
            _input_handle: input_handle,
            _update_handle: update_handle,
        }
    }

    pub fn next(&self) -> std::result::Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }

    pub fn event_sink(&self) -> &mpsc::Sender<Event> {
        &self.tx
    }
}
