use ratatui::{prelude::*, widgets::*};

use crate::app::{App, AppState, CommentsScreen};
use crate::comment::{CommentNode, Visibility};
use crate::feed::{LinkPreview, PostFeed};
use crate::markup;
use crate::presenter::CommentListPresenter;
use crate::theme::Theme;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
/// Lines taken by one post row.
const POST_ROW_HEIGHT: u16 = 2;

pub fn ui(f: &mut Frame, app: &mut App) {
    let c = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(f.area());
    let (main_area, bottom_area) = (c[0], c[1]);

    match app.state {
        AppState::Posts => render_posts(f, app, main_area),
        AppState::Comments => {
            let theme = app.theme;
            let indent_unit = app.indent_unit;
            let ticks = app.ticks;
            if let Some(screen) = app.comments.as_mut() {
                render_comments(f, screen, &theme, indent_unit, ticks, main_area);
            }
        }
    }

    let help = match app.state {
        AppState::Posts => " [ Enter: Comments ] [ p: Preview ] [ o: Open ] [ Tab: Feed ] [ r: Refresh ] [ q: Quit ] ",
        AppState::Comments => " [ Enter: Collapse ] [ o: Open link ] [ O: Open post ] [ Esc: Back ] [ q: Quit ] ",
    };
    let bottom = match &app.toast {
        Some(toast) => Paragraph::new(format!(" {} ", toast.message))
            .style(Style::default().bg(Color::Red).fg(Color::White)),
        None => Paragraph::new(help).style(Style::default().bg(app.theme.tint).fg(Color::Black)),
    };
    f.render_widget(bottom, bottom_area);
}

fn border(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(Span::styled(format!(" {} ", title), theme.border_style()))
}

fn render_posts(f: &mut Frame, app: &mut App, area: Rect) {
    let preview = app.preview();
    let (list_area, side_area) = if preview.is_some() {
        let c = Layout::horizontal([Constraint::Min(40), Constraint::Length(40)]).split(area);
        (c[0], Some(c[1]))
    } else {
        (area, None)
    };

    let title = format!("Hacker News · {}", app.feed.post_type().title());
    let block = border(&app.theme, &title);

    if let Some(empty) = app.feed.empty_state() {
        let mut text = empty.title().to_string();
        if empty.shows_spinner() {
            let frame = SPINNER[(app.ticks as usize) % SPINNER.len()];
            text = format!("{frame} {text}");
        }
        app.posts_window = 0..0;
        f.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .style(Style::default().fg(app.theme.light_text))
                .block(block),
            list_area,
        );
        return;
    }

    let inner = block.inner(list_area);
    let items = post_items(&app.feed, &app.theme, inner.width as usize);
    let list = List::new(items)
        .block(block)
        .highlight_style(app.theme.row_style(true));
    f.render_stateful_widget(list, list_area, &mut app.post_list_state);

    let offset = app.post_list_state.offset();
    let shown = (inner.height / POST_ROW_HEIGHT) as usize;
    app.posts_window = offset..(offset + shown).min(app.feed.posts().len());

    if let (Some(side), Some(preview)) = (side_area, preview) {
        render_preview(f, &app.theme, &preview, side);
    }
}

fn post_items(feed: &PostFeed, theme: &Theme, width: usize) -> Vec<ListItem<'static>> {
    feed.posts()
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let mut title = vec![
                Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(theme.light_text)),
                Span::styled(post.title.clone(), Style::default().fg(theme.title_text)),
            ];
            if let Some(url) = post.url.as_deref() {
                let domain = crate::feed::domain(url);
                if !domain.is_empty() {
                    title.push(Span::styled(
                        format!(" ({domain})"),
                        Style::default().fg(theme.light_text),
                    ));
                }
            }
            let meta = format!(
                "     {} points by {} {} | {} comments",
                post.points, post.author, post.date_created_string, post.comment_count
            );
            let meta: String = meta.chars().take(width).collect();
            ListItem::new(vec![
                Line::from(title),
                Line::from(Span::styled(meta, Style::default().fg(theme.light_text))),
            ])
        })
        .collect()
}

fn render_preview(f: &mut Frame, theme: &Theme, preview: &LinkPreview, area: Rect) {
    let block = border(theme, "Preview");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(Span::styled(
            preview.title.clone(),
            Style::default().fg(theme.title_text).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(preview.domain.clone(), Style::default().fg(theme.tint))),
        Line::from(Span::styled(preview.url.clone(), Style::default().fg(theme.light_text))),
        Line::from(""),
        Line::from(Span::styled(
            format!("[Enter] {}", preview.action_title),
            Style::default().fg(theme.text),
        )),
        Line::from(Span::styled("[o] Open in browser", Style::default().fg(theme.text))),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_comments(
    f: &mut Frame,
    screen: &mut CommentsScreen,
    theme: &Theme,
    indent_unit: u16,
    ticks: u64,
    area: Rect,
) {
    let block = border(theme, &screen.post.title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(presenter) = screen.presenter.as_ref() else {
        let frame = SPINNER[(ticks as usize) % SPINNER.len()];
        f.render_widget(
            Paragraph::new(format!("{frame} Loading comments"))
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme.light_text)),
            inner,
        );
        return;
    };

    if presenter.row_count() == 0 {
        f.render_widget(
            Paragraph::new("No comments")
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme.light_text)),
            inner,
        );
        return;
    }

    let width = inner.width as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_span = 0..0;
    for (row, node) in presenter.rows().enumerate() {
        let selected = row == screen.view.selected;
        let start = lines.len();
        lines.extend(comment_lines(presenter, row, node, theme, indent_unit, width, selected));
        if selected {
            selected_span = start..lines.len();
        }
    }

    screen.view.scroll = scroll_to(screen.view.scroll, selected_span, inner.height as usize);
    f.render_widget(Paragraph::new(lines).scroll((screen.view.scroll, 0)), inner);
}

/// Smallest change of `scroll` that brings `span` into a viewport of `height`
/// lines.
fn scroll_to(scroll: u16, span: std::ops::Range<usize>, height: usize) -> u16 {
    let scroll = scroll as usize;
    let top = if span.start < scroll {
        span.start
    } else if span.end > scroll + height {
        span.end.saturating_sub(height).min(span.start)
    } else {
        scroll
    };
    u16::try_from(top).unwrap_or(u16::MAX)
}

fn comment_lines(
    presenter: &CommentListPresenter,
    row: usize,
    node: &CommentNode,
    theme: &Theme,
    indent_unit: u16,
    width: usize,
    selected: bool,
) -> Vec<Line<'static>> {
    let collapsed = node.is_collapsed_presentation();
    let indent = " ".repeat(node.indent_width(indent_unit) as usize);
    let marker = if node.visibility() == Visibility::Compact { "[+]" } else { "[-]" };

    let mut header = vec![
        Span::raw(indent.clone()),
        Span::styled(format!("{marker} "), Style::default().fg(theme.tint)),
        Span::styled(node.author_username().to_string(), theme.comment_author_style(collapsed)),
        Span::styled(" · ", theme.comment_date_style(collapsed)),
        Span::styled(node.date_created_string().to_string(), theme.comment_date_style(collapsed)),
    ];
    if node.visibility() == Visibility::Compact {
        let hidden = presenter.hidden_replies(row).unwrap_or(0);
        if hidden > 0 {
            let suffix = if hidden == 1 { "reply" } else { "replies" };
            header.push(Span::styled(
                format!(" · {hidden} hidden {suffix}"),
                theme.comment_date_style(true),
            ));
        }
    }

    let mut lines = vec![Line::from(header)];
    let body_width = width.saturating_sub(indent.len()).max(10);
    if let Some(body) = markup::styled_body(node.text(), node.visibility(), theme, body_width) {
        for line in body.lines {
            let mut spans = vec![Span::raw(indent.clone())];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
    }
    lines.push(Line::from(Span::styled(
        format!("{indent}{}", "─".repeat(width.saturating_sub(indent.len()))),
        Style::default().fg(theme.separator),
    )));

    let row_style = theme.row_style(selected);
    lines.into_iter().map(|line| line.style(row_style)).collect()
}
