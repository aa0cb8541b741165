extern crate stampcal as lib;

use chrono::Local;
use flexi_logger::{FileSpec, Logger};
use lib::calendar::{self, CalendarDate};
use lib::events::Dispatcher;
use lib::export::assets;
use lib::session::Session;
use lib::ui::{show, App};
use nix::sys::termios;
use std::io;
use std::path::PathBuf;
use structopt::StructOpt;
use termion::input::MouseTerminal;
use termion::raw::IntoRawMode;
use termion::screen::AlternateScreen;
use tui::backend::TermionBackend;
use tui::Terminal;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "stc",
    about = "Stampcal - A monthly class and rest day planner for the terminal."
)]
pub struct Args {
    #[structopt(
        name = "CONFIG",
        short = "c",
        long = "config",
        help = "path to config file",
        parse(from_os_str)
    )]
    pub configfile: Option<PathBuf>,

    #[structopt(
        short = "m",
        long = "month",
        help = "month to show first, as YYYY-MM",
        parse(try_from_str = calendar::parse_month)
    )]
    pub month: Option<CalendarDate>,

    #[structopt(
        short = "s",
        long = "show",
        help = "only print the month non-interactively"
    )]
    pub show: bool,

    #[structopt(long = "log-file", help = "path to log file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_args();

    const DEFAULT_LOG_LEVEL: &str = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    // Without a log file only RUST_LOG enables logging, stderr would end up
    // on top of the calendar otherwise.
    let logger = if let Some(log_file) = args.log_file {
        Logger::try_with_env_or_str(DEFAULT_LOG_LEVEL)?
            .log_to_file(FileSpec::try_from(log_file)?)
            .print_message()
    } else {
        Logger::try_with_env_or_str("off")?
    };

    let _logger = logger.start()?;

    let config = lib::config::load_suitable_config(args.configfile.as_deref())?;

    let start = match args.month {
        Some(month) => month,
        None => CalendarDate::from_naive(Local::now().date_naive())
            .ok_or("today is outside of the supported calendar range")?,
    };

    let session = Session::new(&config, start);
    log::info!(
        "Starting session at {} with {} people",
        calendar::month_label(session.displayed_month()),
        session.roster().len()
    );

    if args.show {
        println!("{}", show::render_month(&session));
        return Ok(());
    }

    const STDIN: std::os::unix::io::RawFd = 0;
    let orig_attr = std::sync::Mutex::new(termios::tcgetattr(STDIN)?);

    std::panic::set_hook(Box::new(move |info| {
        // Switch to main terminal screen
        println!(
            "{}{}",
            termion::screen::ToMainScreen,
            termion::cursor::Show
        );

        if let Ok(attr) = orig_attr.lock() {
            let _ = termios::tcsetattr(STDIN, termios::SetArg::TCSANOW, &attr);
        }

        println!("Stampcal ran into a fatal error!");
        println!("Consider filing an issue with a log file and the backtrace below.");

        println!("{}", info);
        println!("{:?}", backtrace::Backtrace::new());
    }));

    let dispatcher = Dispatcher::from_config(&config);
    assets::spawn_loader(
        config.export.font_candidates(),
        dispatcher.event_sink().clone(),
    )?;

    let stdout = io::stdout().into_raw_mode()?;
    let stdout = MouseTerminal::from(stdout);
    let stdout = AlternateScreen::from(stdout);
    let backend = TermionBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let mut app = App::new(session);
    let result = app.run(dispatcher, &mut terminal);

    terminal.show_cursor()?;
    log::info!(
        "Session ended with {} scheduled days",
        app.context().session().store().len()
    );

    result
}
