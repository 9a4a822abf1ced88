mod app;
mod config;
mod error;
mod github;
mod model;
mod semantic;
mod ui;

use anyhow::Result;
use app::{Screen, Session, SessionEvent};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use model::FilterOptions;
use ratatui::prelude::*;
use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

/// Browse commit history across your GitHub repositories
#[derive(Parser)]
#[command(name = "ght", version, about)]
struct Cli {
    /// Pre-fill the author filter
    #[arg(long)]
    author: Option<String>,

    /// Pre-fill the start date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    from: Option<String>,

    /// Pre-fill the end date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<String>,

    /// Commits per page, clamped to 1..=100
    #[arg(long)]
    per_page: Option<u32>,

    /// Pre-fill the semantic relevance query
    #[arg(long)]
    query: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Preflight: both checks must pass before any session state exists
    github::ensure_gh_installed()?;

    let config = config::load_config();
    let seed = seed_filters(&cli, &config);

    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>();
    let mut session = Session::new(
        Arc::new(github::GhClient),
        Arc::new(semantic::CkScorer::new(config.scorer)),
        seed,
        event_tx,
    );

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut session, &event_rx);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn seed_filters(cli: &Cli, config: &config::GhtConfig) -> FilterOptions {
    let mut seed = FilterOptions {
        date_from: cli.from.clone().unwrap_or_default(),
        date_to: cli.to.clone().unwrap_or_default(),
        author: cli.author.clone().unwrap_or_default(),
        per_page: cli.per_page.unwrap_or(config.defaults.per_page),
        semantic_query: cli.query.clone().unwrap_or_default(),
    };
    seed.validate();
    seed
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    event_rx: &Receiver<SessionEvent>,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let mut tick = 0u64;

    loop {
        terminal.draw(|f| ui::draw(f, session, tick))?;

        // Poll keys with a timeout so task results keep flowing
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(session, key);
                }
            }
        }

        // Each background task resolves to exactly one event
        while let Ok(event) = event_rx.try_recv() {
            session.apply(event);
        }

        tick = tick.wrapping_add(1);
        if session.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(session: &mut Session, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        session.should_quit = true;
        return;
    }

    if matches!(session.screen, Screen::SelectingRepos(_)) {
        handle_repo_select_key(session, key);
    } else if matches!(session.screen, Screen::ConfiguringFilters(_)) {
        handle_filter_form_key(session, key);
    } else if matches!(session.screen, Screen::Browsing(_)) {
        handle_browse_key(session, key);
    } else if key.code == KeyCode::Char('q') {
        // Loading and failed screens only react to quit
        session.should_quit = true;
    }
}

fn handle_repo_select_key(session: &mut Session, key: KeyEvent) {
    let filtering = matches!(&session.screen, Screen::SelectingRepos(s) if s.filtering);

    if filtering {
        let Screen::SelectingRepos(select) = &mut session.screen else {
            return;
        };
        match key.code {
            KeyCode::Enter | KeyCode::Esc => select.filtering = false,
            KeyCode::Backspace => select.pop_filter_char(),
            KeyCode::Char(c) => select.push_filter_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => session.should_quit = true,
        KeyCode::Enter => session.confirm_selection(),
        _ => {
            // Split borrows: the child state moves the cursor against the
            // session-owned catalog
            let Session { screen, catalog, .. } = session;
            let Screen::SelectingRepos(select) = screen else {
                return;
            };
            let visible_len = select.visible(catalog).len();
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => select.move_cursor(1, visible_len),
                KeyCode::Char('k') | KeyCode::Up => select.move_cursor(-1, visible_len),
                KeyCode::Char(' ') => select.toggle_current(catalog),
                KeyCode::Char('/') => select.filtering = true,
                KeyCode::Esc => {
                    select.filter.clear();
                    select.cursor = 0;
                }
                _ => {}
            }
        }
    }
}

fn handle_filter_form_key(session: &mut Session, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        session.submit_filters();
        return;
    }

    let Screen::ConfiguringFilters(form) = &mut session.screen else {
        return;
    };
    match key.code {
        KeyCode::Tab => form.next_field(),
        KeyCode::BackTab => form.prev_field(),
        KeyCode::Down => form.cycle_branch(1),
        KeyCode::Up => form.cycle_branch(-1),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.insert_char(c),
        _ => {}
    }
}

fn handle_browse_key(session: &mut Session, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => session.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => session.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => session.move_cursor(-1),
        KeyCode::Enter => session.toggle_expanded(),
        KeyCode::Char('n') => session.request_more(),
        KeyCode::Char('r') => session.restart(),
        _ => {}
    }
}
