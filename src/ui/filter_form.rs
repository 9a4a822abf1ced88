use super::styles;
use crate::app::screens::{
    FilterForm, FIELD_AUTHOR, FIELD_COUNT_BASE, FIELD_DATE_FROM, FIELD_DATE_TO, FIELD_PER_PAGE,
    FIELD_SEMANTIC,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

const FIELD_LABELS: [(usize, &str, &str); FIELD_COUNT_BASE] = [
    (FIELD_DATE_FROM, "From:     ", "YYYY-MM-DD"),
    (FIELD_DATE_TO, "To:       ", "YYYY-MM-DD"),
    (FIELD_AUTHOR, "Author:   ", "username"),
    (FIELD_PER_PAGE, "Per page: ", "50"),
    (FIELD_SEMANTIC, "Semantic: ", "free-text relevance query"),
];

pub fn render(f: &mut Frame, form: &FilterForm) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(1),    // form body
            Constraint::Length(1), // help
        ])
        .split(f.area());

    f.render_widget(
        Paragraph::new("  Configure filters").style(styles::title_style()),
        chunks[0],
    );

    let mut lines = vec![Line::raw("")];
    for (field, label, placeholder) in FIELD_LABELS {
        lines.push(field_line(form, field, label, placeholder));
        lines.push(Line::raw(""));
    }

    if !form.repo_branches.is_empty() {
        lines.push(Line::styled("  Branches", styles::dim_style()));
        lines.push(Line::raw(""));
        for row in 0..form.repo_branches.len() {
            lines.push(branch_line(form, row));
        }
    }

    f.render_widget(Paragraph::new(lines), chunks[1]);

    let help = "  tab: next field • ↑/↓: cycle branch • enter: load commits";
    f.render_widget(Paragraph::new(help).style(styles::help_style()), chunks[2]);
}

fn field_line<'a>(form: &'a FilterForm, field: usize, label: &'a str, placeholder: &'a str) -> Line<'a> {
    let focused = form.focused == field;
    let label_style = if focused {
        styles::selected_style()
    } else {
        styles::dim_style()
    };

    let value = &form.inputs[field];
    let value_span = if value.is_empty() && !focused {
        Span::styled(placeholder, styles::dim_style())
    } else {
        Span::styled(value.as_str(), styles::default_style())
    };

    let mut spans = vec![Span::raw("  "), Span::styled(label, label_style), value_span];
    if focused {
        spans.push(Span::styled("▌", styles::selected_style()));
    }
    Line::from(spans)
}

fn branch_line(form: &FilterForm, row: usize) -> Line<'_> {
    let rb = &form.repo_branches[row];
    let focused = form.focused == FIELD_COUNT_BASE + row;
    let cursor = if focused { "> " } else { "  " };
    let label_style = if focused {
        styles::selected_style()
    } else {
        styles::dim_style()
    };

    let branch = form.branch_name(row);
    let mut display = branch.to_string();
    if branch == rb.repo.default_branch {
        display.push_str(" (default)");
    }

    Line::from(vec![
        Span::styled(cursor, styles::selected_style()),
        Span::styled(format!("{}: ", rb.repo.name_with_owner), label_style),
        Span::styled(display, styles::sha_style()),
    ])
}
