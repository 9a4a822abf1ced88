use super::styles;
use crate::app::{Browse, Session};
use crate::model::{Commit, RepoCommits};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub fn render(f: &mut Frame, session: &Session, browse: &Browse) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(1),    // commit feed
            Constraint::Length(1), // notice
            Constraint::Length(1), // help
        ])
        .split(f.area());

    let title = format!(
        "  Commits ({}/{})",
        (session.feed.cursor() + 1).min(session.feed.total()),
        session.feed.total()
    );
    f.render_widget(Paragraph::new(title).style(styles::title_style()), chunks[0]);

    let (lines, cursor_line) = feed_lines(session, browse);
    let offset = super::scroll_offset(cursor_line, chunks[1].height as usize);
    let body = Paragraph::new(lines).scroll((offset as u16, 0));
    f.render_widget(body, chunks[1]);

    if let Some(notice) = &browse.notice {
        f.render_widget(
            Paragraph::new(format!("  {}", notice)).style(styles::notice_style()),
            chunks[2],
        );
    }

    let help = "  ↑/↓: navigate • enter: expand • n: load more • r: restart • q: quit";
    f.render_widget(Paragraph::new(help).style(styles::help_style()), chunks[3]);
}

/// Build the feed as styled lines, returning the line index of the cursor
fn feed_lines<'a>(session: &'a Session, browse: &Browse) -> (Vec<Line<'a>>, usize) {
    let mut lines = Vec::new();
    let mut cursor_line = 0;
    let mut commit_index = 0;

    for rc in session.feed.repos() {
        lines.push(repo_header(rc));
        lines.push(Line::raw(""));

        for commit in &rc.commits {
            if commit_index == session.feed.cursor() {
                cursor_line = lines.len();
            }
            push_commit_lines(&mut lines, commit, commit_index, session, browse);
            commit_index += 1;
        }

        if rc.has_more {
            lines.push(Line::styled(
                "    ↓ n: load more...",
                styles::dim_style(),
            ));
        }
        lines.push(Line::raw(""));
    }

    if session.loading_more() {
        lines.push(Line::styled(
            "  Loading more commits...",
            styles::selected_style(),
        ));
    }

    (lines, cursor_line)
}

fn repo_header(rc: &RepoCommits) -> Line<'_> {
    Line::styled(
        format!(
            "  ═══ {} ({}) · {} commits ═══",
            rc.repository.name_with_owner,
            rc.branch,
            rc.commits.len()
        ),
        styles::repo_header_style(),
    )
}

fn push_commit_lines<'a>(
    lines: &mut Vec<Line<'a>>,
    commit: &'a Commit,
    index: usize,
    session: &Session,
    browse: &Browse,
) {
    let cursor = if index == session.feed.cursor() {
        "> "
    } else {
        "  "
    };

    lines.push(Line::from(vec![
        Span::styled(cursor, styles::selected_style()),
        Span::styled(commit.short_sha(), styles::sha_style()),
        Span::raw(" │ "),
        Span::styled(commit.formatted_date(), styles::date_style()),
        Span::raw(" │ "),
        Span::styled(commit.author.as_str(), styles::author_style()),
    ]));

    if browse.expanded.contains(&index) {
        push_expanded_message(lines, commit);
    } else {
        let mut spans = vec![
            Span::raw("     └─ "),
            Span::styled(commit.first_line(), styles::default_style()),
        ];
        if commit.has_multiple_lines() {
            spans.push(Span::styled(
                format!(" [+{} lines]", commit.extra_line_count()),
                styles::dim_style(),
            ));
        }
        lines.push(Line::from(spans));
    }
}

fn push_expanded_message<'a>(lines: &mut Vec<Line<'a>>, commit: &'a Commit) {
    lines.push(Line::styled(
        "   ┌─────────────────────────────────────",
        styles::dim_style(),
    ));
    lines.push(detail_line(format!("   │ SHA:    {}", commit.sha)));
    lines.push(detail_line(format!(
        "   │ Author: {}",
        commit.author_with_email()
    )));
    lines.push(detail_line(format!(
        "   │ Date:   {}",
        commit.formatted_date()
    )));
    lines.push(detail_line("   │".to_string()));
    for line in commit.message.lines() {
        lines.push(detail_line(format!("   │ {}", line)));
    }
    lines.push(Line::styled(
        "   └─────────────────────────────────────",
        styles::dim_style(),
    ));
}

fn detail_line(text: String) -> Line<'static> {
    Line::styled(text, styles::default_style())
}
