pub mod app;
pub mod command;
pub mod context;
pub mod form;
pub mod month;
pub mod show;
mod util;

pub use app::App;
pub use context::{Context, Mode, Theme, TuiContext};
