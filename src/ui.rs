//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a two-row split: a scrollable list on top and a one-line
//!   status bar at the bottom.
//! * While a page is loading and rows are already shown, an extra
//!   "Loading more…" row is appended instead of blanking the list.
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use gread_feed::feed::FeedPhase;

use crate::app::{App, ListEntry};

/// Draw the complete UI for one frame.
pub fn draw<T: ListEntry>(app: &mut App<T>, frame: &mut Frame) {
    let [main_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    if app.items.is_empty() {
        draw_placeholder(app, frame, main_area);
    } else {
        draw_feed_list(app, frame, main_area);
    }
    draw_status_bar(app, frame, status_area);
}

fn list_block<T>(app: &App<T>) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", app.feed_name))
        .borders(Borders::ALL)
}

/// Shown while the feed has no rows: loading, error, or genuinely empty.
fn draw_placeholder<T: ListEntry>(app: &App<T>, frame: &mut Frame, area: Rect) {
    let (text, color) = match (&app.last_error, app.phase) {
        (_, FeedPhase::Loading) => ("Loading…".to_string(), Color::Yellow),
        (Some(err), _) => (format!("{err}\n\nr: retry"), Color::Red),
        (None, FeedPhase::Exhausted) => ("Nothing here yet.".to_string(), Color::DarkGray),
        (None, FeedPhase::Idle) => ("r: load".to_string(), Color::DarkGray),
    };

    let placeholder = Paragraph::new(text)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(list_block(app));
    frame.render_widget(placeholder, area);
}

/// Render the scrollable feed item list.
fn draw_feed_list<T: ListEntry>(app: &mut App<T>, frame: &mut Frame, area: Rect) {
    let now = Utc::now();
    let mut list_items: Vec<ListItem> = app
        .items
        .iter()
        .map(|item| {
            let line = Line::from(vec![
                Span::styled(item.headline(), Style::default().fg(Color::White)),
                Span::raw("  "),
                Span::styled(item.byline(now), Style::default().fg(Color::DarkGray)),
            ]);
            ListItem::new(line)
        })
        .collect();

    match app.phase {
        FeedPhase::Loading => list_items.push(ListItem::new(Span::styled(
            "Loading more…",
            Style::default().fg(Color::Yellow),
        ))),
        FeedPhase::Exhausted => list_items.push(ListItem::new(Span::styled(
            "— end —",
            Style::default().fg(Color::DarkGray),
        ))),
        FeedPhase::Idle => {}
    }

    let list = List::new(list_items)
        .block(list_block(app))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar<T>(app: &App<T>, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} items", app.items.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  ↑/↓: scroll  r: refresh  m: more"),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
