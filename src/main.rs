use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;
use ratatui::crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
};
use tracing::{error, info, warn};

mod comparator;
mod controller;
mod domain;
mod fragment;
mod inputter;
mod listing;
mod loader;
mod logging;
mod model;
mod ui;

use controller::Controller;
use domain::{SVConfig, SVError};
use fragment::Location;
use model::{Model, Status};
use ui::TableUI;

/// A tui based viewer for server listings.
///
/// Click a header to sort by it, click it again to reverse. Click rows to
/// select them; the selection lives in the fragment of the location, which is
/// printed on exit.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Listing to open, optionally with a selection: `servers.html#12,40`
    location: String,

    /// CSS selector of the table inside an html listing
    #[arg(long, default_value = "table")]
    table: String,

    /// Column the listing is already sorted by
    #[arg(long, default_value = "Name")]
    presorted: String,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll: u64,

    #[arg(long, default_value_t = 32)]
    max_column_width: usize,

    #[arg(long, default_value = "~/.sv.log")]
    log_file: String,

    /// Show links and locations in the status line instead of copying them
    #[arg(long)]
    no_clipboard: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(location) => {
            println!("{location}");
            ExitCode::SUCCESS
        }
    }
}

fn run(args: Args) -> Result<Location, SVError> {
    let log_path = logging::init(&args.log_file)?;

    let cfg = SVConfig::default()
        .with_event_poll_time(args.poll)
        .with_max_column_width(args.max_column_width)
        .with_table_selector(args.table)
        .with_presorted_column(args.presorted)
        .with_clipboard(!args.no_clipboard);
    info!("Config {:?}, logging to {}", cfg, log_path.display());

    let location = Location::parse(&args.location);
    info!("Opening {} with fragment {:?}", location.path(), location.fragment());
    let listing = loader::load(&location.expanded_path()?, &cfg)?;

    let mut terminal = ratatui::init();
    let _guard = TerminalGuard {
        restore: || {
            if let Err(e) = execute!(stdout(), DisableMouseCapture) {
                warn!("Could not disable mouse capture: {e}");
            }
            ratatui::restore();
        },
    };
    execute!(stdout(), EnableMouseCapture)?;
    event_loop(&mut terminal, &cfg, listing, location)
}

/// Runs `restore` when dropped, so the terminal leaves raw mode on every exit
/// path out of `run`.
struct TerminalGuard<R: FnMut()> {
    restore: R,
}

impl<R: FnMut()> Drop for TerminalGuard<R> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    cfg: &SVConfig,
    listing: listing::Listing,
    location: Location,
) -> Result<Location, SVError> {
    let size = terminal.size()?;
    let mut model = Model::init(
        cfg,
        listing,
        location,
        size.width as usize,
        size.height as usize,
    );
    let mut ui = TableUI::new();
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        let message = controller.handle_event(&model)?;
        model.update(message);
    }

    info!(
        "Quitting at {} ({} selected, sorted by {:?}, active column {:?})",
        model.location(),
        model.nselected(),
        model.sorted_header(),
        model.last_column()
    );
    Ok(model.location().clone())
}
