pub mod calendar;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod schedule;
pub mod session;
pub mod ui;
