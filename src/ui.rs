//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  Nothing here mutates the
//! snapshot; it only reads the [`StoreView`](crate::store::StoreView) copy
//! held by the app.
//!
//! ## Layout
//!
//! ```text
//! ┌ service ─────────────────────────────────────────┐
//! │ status · version · cycle state · next refresh    │
//! └──────────────────────────────────────────────────┘
//!  error banner (only after a failed cycle)
//! ┌ GitHub ────────────┐┌ Reddit ────────────┐
//! └────────────────────┘└────────────────────┘
//! ┌ Hacker News ───────┐┌ Stack Overflow ────┐
//! └────────────────────┘└────────────────────┘
//! ┌ Unclassified (only when non-empty) ──────┐
//! ┌ Languages ─────────┐┌ Platforms ─────────┐
//!  status bar
//! ```

use std::time::Duration;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use tokio::time::Instant;

use crate::app::App;
use crate::normalize::RefreshSnapshot;
use crate::source::{Bucket, Health, PlatformDetails, PlatformItem};
use crate::store::CycleState;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let has_error = app.view.error.is_some();
    let visible = app.visible_buckets();
    let has_unclassified = visible.contains(&Bucket::Unclassified);

    let [header, banner, grid, extra, bottom, status] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(u16::from(has_error)),
        Constraint::Min(8),
        Constraint::Length(if has_unclassified { 6 } else { 0 }),
        Constraint::Length(9),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header);
    if has_error {
        draw_error_banner(app, frame, banner);
    }

    let [top, lower] = Layout::vertical([Constraint::Fill(1); 2]).areas(grid);
    let [gh, rd] = Layout::horizontal([Constraint::Fill(1); 2]).areas(top);
    let [hn, so] = Layout::horizontal([Constraint::Fill(1); 2]).areas(lower);
    for (bucket, area) in [
        (Bucket::GitHub, gh),
        (Bucket::Reddit, rd),
        (Bucket::HackerNews, hn),
        (Bucket::StackOverflow, so),
    ] {
        draw_bucket(app, frame, bucket, area);
    }
    if has_unclassified {
        draw_bucket(app, frame, Bucket::Unclassified, extra);
    }

    let [languages, platforms] = Layout::horizontal([Constraint::Fill(1); 2]).areas(bottom);
    draw_languages(app, frame, languages);
    draw_platforms(app, frame, platforms);
    draw_status_bar(app, frame, status);
}

/// Service status, cycle state and the refresh countdown.
fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let view = &app.view;
    let service = view.snapshot.as_ref().map(|s| &s.service);

    let (word, colour) = match service {
        Some(s) if s.is_healthy() => (s.status.as_str(), Color::Green),
        Some(s) if !s.status.is_empty() => (s.status.as_str(), Color::Red),
        _ => ("unknown", Color::DarkGray),
    };

    let mut first = vec![
        Span::styled(format!(" {word} "), Style::default().fg(colour).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
    ];
    if let Some(s) = service {
        first.push(Span::raw(format!("v{}  {}", s.version, s.message)));
        for (name, api) in &s.apis {
            first.push(Span::raw("  "));
            let limit = api
                .rate_limit
                .map(|r| format!(" {}/{}", r.remaining, r.limit))
                .unwrap_or_default();
            first.push(Span::styled(
                format!("{name}: {}{limit}", api.status),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    let updated = view
        .last_updated
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".into());
    let generated = view
        .snapshot
        .as_ref()
        .and_then(|s| s.generated_at)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "n/a".into());

    let second = Line::from(vec![
        Span::styled(cycle_label(view.cycle), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::raw(countdown_label(view.cycle, view.next_refresh_at)),
        Span::styled(
            format!("  fetched {updated}  ·  service data {generated}"),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(vec![Line::from(first), second])
        .block(Block::default().title(" Trending ").borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn cycle_label(state: CycleState) -> &'static str {
    match state {
        CycleState::Idle => "waiting",
        CycleState::InFlight => "refreshing…",
        CycleState::Succeeded => "up to date",
        CycleState::Failed => "last refresh failed",
    }
}

fn countdown_label(state: CycleState, next: Option<Instant>) -> String {
    match (state, next) {
        (CycleState::InFlight, _) | (_, None) => String::new(),
        (_, Some(at)) => {
            let left = at.saturating_duration_since(Instant::now());
            format!("next refresh in {}s", round_up_secs(left))
        }
    }
}

fn round_up_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn draw_error_banner(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.view.error.as_deref().unwrap_or_default();
    let suffix = if app.view.snapshot.is_some() {
        "  (showing last good data, r: retry)"
    } else {
        "  (r: retry)"
    };
    let banner = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" ⚠ {message}"),
            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled(suffix, Style::default().fg(Color::Red)),
    ]));
    frame.render_widget(banner, area);
}

/// One platform panel: capped item list titled with the bucket totals.
fn draw_bucket(app: &mut App, frame: &mut Frame, bucket: Bucket, area: Rect) {
    let focused = app.focus == bucket;
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let (items, title) = match app.view.snapshot.as_deref() {
        Some(snap) => (bucket_lines(snap, bucket), bucket_title(snap, bucket)),
        None => (Vec::new(), format!(" {bucket} ")),
    };

    let empty = items.is_empty();
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL).border_style(border))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▸ ");

    if empty {
        let note = match app.view.cycle {
            CycleState::Idle | CycleState::InFlight if app.view.snapshot.is_none() => "Loading…",
            _ => "No items available",
        };
        let block = Block::default()
            .title(format!(" {bucket} "))
            .borders(Borders::ALL)
            .border_style(border);
        frame.render_widget(
            Paragraph::new(Span::styled(note, Style::default().fg(Color::DarkGray))).block(block),
            area,
        );
    } else if focused {
        frame.render_stateful_widget(list, area, &mut app.list_state);
    } else {
        frame.render_stateful_widget(list, area, &mut ListState::default());
    }
}

fn bucket_title(snap: &RefreshSnapshot, bucket: Bucket) -> String {
    let totals = snap.aggregates.totals_for(bucket);
    let (primary, secondary) = bucket.metric_labels();
    format!(
        " {bucket} ({}) · {} {primary} · {} {secondary} ",
        totals.items, totals.primary, totals.secondary
    )
}

fn bucket_lines(snap: &RefreshSnapshot, bucket: Bucket) -> Vec<ListItem<'static>> {
    snap.displayed(bucket)
        .enumerate()
        .map(|(rank, item)| ListItem::new(item_line(rank + 1, item)))
        .collect()
}

fn item_line(rank: usize, item: &PlatformItem) -> Line<'static> {
    let (primary, secondary) = item.bucket.metric_labels();
    let tag = match &item.details {
        PlatformDetails::GitHub { language } => language.clone().unwrap_or_else(|| "Unknown".into()),
        PlatformDetails::Reddit { subreddit } => {
            format!("r/{}", subreddit.as_deref().unwrap_or("programming"))
        }
        PlatformDetails::HackerNews { author } => {
            format!("by {}", author.as_deref().unwrap_or("unknown"))
        }
        PlatformDetails::StackOverflow | PlatformDetails::Unclassified => String::new(),
    };

    Line::from(vec![
        Span::styled(format!("#{rank:<2} "), Style::default().fg(Color::DarkGray)),
        Span::styled(item.title.clone(), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(
            format!("{} {primary}  {} {secondary}", item.primary_metric, item.secondary_count),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(tag, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  {:.0}", item.trend_score.round()),
            Style::default().fg(Color::Magenta),
        ),
    ])
}

/// Bar chart of stars per language (GitHub only).
fn draw_languages(app: &App, frame: &mut Frame, area: Rect) {
    let Some(snap) = app.view.snapshot.as_deref() else {
        frame.render_widget(Block::default().title(" Languages ").borders(Borders::ALL), area);
        return;
    };

    let aggregates = &snap.aggregates;
    let bars: Vec<Bar> = aggregates
        .languages
        .iter()
        .map(|l| {
            Bar::default()
                .label(Line::from(l.language.clone()))
                .value(l.stars)
                .text_value(l.stars.to_string())
        })
        .collect();

    let title = format!(" Languages ({} total) ", aggregates.distinct_languages);
    let chart = BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(7)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Blue))
        .value_style(Style::default().fg(Color::White).bg(Color::Blue));
    frame.render_widget(chart, area);
}

/// Per-platform harvester status plus service-reported totals.
fn draw_platforms(app: &App, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(snap) = app.view.snapshot.as_deref() {
        for (name, status) in &snap.platform_status {
            let label = name
                .parse::<crate::source::Platform>()
                .map_or_else(|_| name.clone(), |p| p.label().to_string());
            let (word, colour) = match status.health {
                Health::Ok => ("ok", Color::Green),
                Health::Degraded => ("degraded", Color::Yellow),
                Health::Error => ("error", Color::Red),
            };
            let mut spans = vec![
                Span::raw(format!("{label:<15}")),
                Span::styled(format!("{word:<9}"), Style::default().fg(colour)),
            ];
            if let Some((n, unit)) = status.headline_count() {
                spans.push(Span::raw(format!("{n} {unit}  ")));
            }
            if let Some(left) = status.rate_limit_remaining {
                spans.push(Span::styled(
                    format!("{left} API calls left"),
                    Style::default().fg(Color::Blue),
                ));
            }
            if let Some(err) = &status.error {
                spans.push(Span::styled(format!(" {err}"), Style::default().fg(Color::Red)));
            }
            lines.push(Line::from(spans));
        }
        for (name, count) in &snap.analyzed_totals {
            let pretty = name.trim_start_matches("total_").replace('_', " ");
            lines.push(Line::from(Span::styled(
                format!("{count} {pretty}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let panel = Paragraph::new(lines).block(Block::default().title(" Platforms ").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let count = app
        .view
        .snapshot
        .as_ref()
        .map_or(0, |s| s.aggregates.item_count);
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(format!("{count} items"), Style::default().fg(Color::Green)),
        Span::raw("  q: quit  r: refresh  tab: next panel  ↑/↓: scroll"),
    ]));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use serde_json::json;

    use super::*;
    use crate::app::tests::{snapshot, view_with};
    use crate::store::RefreshStore;

    fn render(app: &mut App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_before_first_snapshot() {
        let mut app = App::new(RefreshStore::new().view());
        let text = render(&mut app, 120, 40);
        assert!(text.contains("Loading"));
    }

    #[test]
    fn draw_does_not_panic_at_80x24() {
        let mut app = App::new(view_with(snapshot(vec![json!({ "platform": "github" })])));
        render(&mut app, 80, 24);
    }

    #[test]
    fn bucket_titles_show_totals() {
        let mut app = App::new(view_with(snapshot(vec![
            json!({ "platform": "GitHub", "stars": 100, "posts_count": 3, "language": "Rust" }),
            json!({ "platform": "GitHub", "stars": 60, "posts_count": 2, "language": "Go" }),
            json!({ "platform": "Reddit", "score": 45, "posts_count": 9 }),
        ])));
        app.status = "OK".into();
        let text = render(&mut app, 160, 48);

        assert!(text.contains("160 stars"), "GitHub total missing");
        assert!(text.contains("45 upvotes"), "Reddit total missing");
        assert!(text.contains("3 items"), "status bar should show item count");
    }

    #[test]
    fn error_banner_shown_with_stale_data() {
        let mut view = view_with(snapshot(vec![json!({ "platform": "github", "keyword": "stale-repo" })]));
        view.cycle = CycleState::Failed;
        view.error = Some("Failed to fetch data from API".into());
        let mut app = App::new(view);
        let text = render(&mut app, 160, 48);

        assert!(text.contains("Failed to fetch data from API"));
        assert!(text.contains("showing last good data"));
        assert!(text.contains("stale-repo"));
    }

    #[test]
    fn unclassified_panel_appears_when_needed() {
        let mut app = App::new(view_with(snapshot(vec![json!({ "keyword": "mystery" })])));
        let text = render(&mut app, 160, 48);
        assert!(text.contains("Unclassified"));
        assert!(text.contains("mystery"));
    }

    #[test]
    fn countdown_rounds_up_and_hides_while_in_flight() {
        assert_eq!(round_up_secs(Duration::from_millis(1500)), 2);
        assert_eq!(round_up_secs(Duration::from_secs(3)), 3);
        assert_eq!(
            countdown_label(CycleState::InFlight, Some(Instant::now())),
            ""
        );
        assert_eq!(countdown_label(CycleState::Succeeded, None), "");
    }
}
