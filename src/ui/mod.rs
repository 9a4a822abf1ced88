mod commit_view;
mod filter_form;
mod repo_select;
mod styles;

use crate::app::{Screen, Session};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Render the active screen
pub fn draw(f: &mut Frame, session: &Session, tick: u64) {
    match &session.screen {
        Screen::Initializing => draw_loading(f, "Loading repositories", tick),
        Screen::SelectingRepos(select) => repo_select::render(f, session, select),
        Screen::ResolvingBranches => draw_loading(f, "Resolving branches", tick),
        Screen::ConfiguringFilters(form) => filter_form::render(f, form),
        Screen::LoadingCommits => draw_loading(f, "Loading commits", tick),
        Screen::Browsing(browse) => commit_view::render(f, session, browse),
        Screen::Failed(message) => draw_failed(f, message),
    }
}

fn draw_loading(f: &mut Frame, what: &str, tick: u64) {
    let dots = ".".repeat((tick / 3 % 4) as usize);
    let text = format!("\n  {}{}", what, dots);
    f.render_widget(Paragraph::new(text).style(styles::default_style()), f.area());
}

fn draw_failed(f: &mut Frame, message: &str) {
    let text = format!("\n  Error: {}\n\n  Press q to quit.", message);
    f.render_widget(Paragraph::new(text).style(styles::error_style()), f.area());
}

/// First visible row so that `cursor` stays on screen in a list of the
/// given viewport height
pub(crate) fn scroll_offset(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return cursor;
    }
    (cursor + 1).saturating_sub(height)
}
