use super::styles;
use crate::app::{RepoSelect, Session};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub fn render(f: &mut Frame, session: &Session, select: &RepoSelect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // filter line
            Constraint::Min(1),    // repo list
            Constraint::Length(1), // help
        ])
        .split(f.area());

    let title = format!(
        "  Select repositories ({} selected)",
        select.selected.len()
    );
    f.render_widget(Paragraph::new(title).style(styles::title_style()), chunks[0]);

    render_filter_line(f, chunks[1], select);
    render_list(f, chunks[2], session, select);

    let help = if select.filtering {
        "  type to filter • enter/esc: done"
    } else {
        "  ↑/↓: move • space: select • /: filter • enter: confirm • q: quit"
    };
    f.render_widget(Paragraph::new(help).style(styles::help_style()), chunks[3]);
}

fn render_filter_line(f: &mut Frame, area: Rect, select: &RepoSelect) {
    if !select.filtering && select.filter.is_empty() {
        return;
    }
    let marker = if select.filtering { "▌" } else { "" };
    let line = format!("  /{}{}", select.filter, marker);
    f.render_widget(Paragraph::new(line).style(styles::dim_style()), area);
}

fn render_list(f: &mut Frame, area: Rect, session: &Session, select: &RepoSelect) {
    let visible = select.visible(&session.catalog);
    let offset = super::scroll_offset(select.cursor, area.height as usize);

    let lines: Vec<Line> = visible
        .iter()
        .enumerate()
        .skip(offset)
        .take(area.height as usize)
        .map(|(row, &idx)| repo_line(session, select, row, idx))
        .collect();

    f.render_widget(Paragraph::new(lines), area);
}

fn repo_line<'a>(session: &'a Session, select: &RepoSelect, row: usize, idx: usize) -> Line<'a> {
    let repo = &session.catalog[idx];
    let cursor = if row == select.cursor { "> " } else { "  " };
    let checkbox = if select.selected.contains(&idx) {
        "[x] "
    } else {
        "[ ] "
    };
    let name_style = if row == select.cursor {
        styles::selected_style()
    } else {
        styles::default_style()
    };

    let mut spans = vec![
        Span::styled(cursor, styles::selected_style()),
        Span::raw(checkbox),
        Span::styled(repo.name_with_owner.as_str(), name_style),
        Span::styled(
            format!("  {}", repo.time_since_push()),
            styles::dim_style(),
        ),
    ];
    if !repo.description.is_empty() {
        spans.push(Span::styled(
            format!("  · {}", repo.description),
            styles::dim_style(),
        ));
    }
    Line::from(spans)
}
