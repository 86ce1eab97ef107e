use ratatui::{
    prelude::*,
    widgets::{Block, Clear, Paragraph},
};

use crate::content::LOADING_MESSAGE;
use crate::input::App;
use crate::theme::Theme;

/// Renders the page, the tooltip on top of it and the footer.
pub fn render(f: &mut Frame, app: &App, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());
    let page_area = chunks[0];

    let lines: Vec<Line> = app
        .page
        .visible_rows()
        .into_iter()
        .map(|(text, highlight)| page_line(text, highlight, theme))
        .collect();
    f.render_widget(Paragraph::new(lines).style(theme.text), page_area);

    render_tooltip(f, app, theme, page_area);
    render_footer(f, app, theme, chunks[1]);
}

fn page_line(text: String, highlight: Option<(usize, usize)>, theme: &Theme) -> Line<'static> {
    let Some((from, to)) = highlight else {
        return Line::from(text);
    };
    let chars: Vec<char> = text.chars().collect();
    let part = |a: usize, b: usize| chars[a..b].iter().collect::<String>();
    Line::from(vec![
        Span::raw(part(0, from)),
        Span::styled(part(from, to), theme.selection),
        Span::raw(part(to, chars.len())),
    ])
}

fn render_tooltip(f: &mut Frame, app: &App, theme: &Theme, page_area: Rect) {
    let Some(tooltip) = app.content.presenter().current() else {
        return;
    };
    let scroll = app.page.scroll();
    let bounds = tooltip.bounds;
    let Some(area) = clip(
        bounds.left - scroll.x + i32::from(page_area.x),
        bounds.top - scroll.y + i32::from(page_area.y),
        bounds.width,
        bounds.height,
        page_area,
    ) else {
        return;
    };

    let style = if tooltip.text == LOADING_MESSAGE {
        theme.tooltip_loading
    } else {
        theme.tooltip_text
    };
    let lines: Vec<Line> = tooltip.lines.iter().map(|l| Line::from(l.as_str())).collect();
    let para = Paragraph::new(lines)
        .block(Block::bordered().border_style(theme.tooltip_border))
        .style(style);
    f.render_widget(Clear, area);
    f.render_widget(para, area);
}

/// The part of the screen rectangle `(x, y, width, height)` inside `area`.
fn clip(x: i32, y: i32, width: i32, height: i32, area: Rect) -> Option<Rect> {
    let left = x.max(i32::from(area.x));
    let top = y.max(i32::from(area.y));
    let right = (x + width).min(i32::from(area.right()));
    let bottom = (y + height).min(i32::from(area.bottom()));
    if left >= right || top >= bottom {
        return None;
    }
    Some(Rect::new(left as u16, top as u16, (right - left) as u16, (bottom - top) as u16))
}

fn render_footer(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let state = if app.content.enabled() {
        Span::styled(" ON ", theme.footer_enabled)
    } else {
        Span::styled(" OFF ", theme.footer_disabled)
    };
    let mut spans = vec![
        state,
        Span::styled(
            " drag/double-click: explain | e: toggle | c: copy | ↑/↓ PgUp/PgDn: scroll | q: quit",
            theme.footer,
        ),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" | {status}"), theme.footer));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
