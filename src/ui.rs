use crate::app::{App, Screen};
use crate::dashboard::PLACEHOLDER_WIDGETS;
use crate::forms::Form;
use crate::notify::Level;
use crate::profile::ProfileView;
use crate::sync::Envelope;
use crate::task::{Priority, Stage};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Draws, applies finished API calls, then waits briefly for a key. Returns on quit.
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut UnboundedReceiver<Envelope>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(envelope) = events.try_recv() {
            app.receive(envelope);
        }

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        app.tick(Instant::now());
        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    match app.screen {
        Screen::Login => draw_form_screen(f, &app.login_form, "Welcome back", app.busy, chunks[1]),
        Screen::Signup => draw_form_screen(f, &app.signup_form, "Create account", app.busy, chunks[1]),
        Screen::Dashboard => draw_dashboard(f, app, chunks[1]),
        Screen::Contacts => draw_contacts(f, app, chunks[1]),
        Screen::Deals => draw_deals(f, app, chunks[1]),
        Screen::Profile => draw_profile(f, app, chunks[1]),
    }
    draw_footer(f, app, chunks[2]);

    if let Some(overlay) = &app.overlay {
        let area = centered_rect(60, 50, f.area());
        f.render_widget(Clear, area);
        let form = overlay.form();
        let body = Paragraph::new(form_lines(form)).block(
            Block::default()
                .title(overlay.title())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(body, area);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let who = app
        .session
        .as_ref()
        .map_or_else(|| "not signed in".to_string(), |s| s.name.clone());
    let block = Block::default()
        .title(format!("DealTrack CRM · {who}"))
        .borders(Borders::ALL);

    if matches!(app.screen, Screen::Login | Screen::Signup) {
        f.render_widget(Paragraph::new(app.screen.title()).block(block), area);
        return;
    }
    let titles: Vec<Line> = Screen::NAV
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("{} {}", i + 1, s.title())))
        .collect();
    let selected = Screen::NAV.iter().position(|s| *s == app.screen).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(block)
        .select(selected)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = match app.notices.latest() {
        Some(notice) => {
            let color = match notice.level {
                Level::Info => Color::Green,
                Level::Error => Color::Red,
            };
            Line::from(Span::styled(notice.message.clone(), Style::default().fg(color)))
        }
        None => Line::from(Span::styled(help_text(app), Style::default().fg(Color::DarkGray))),
    };
    f.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
}

fn help_text(app: &App) -> &'static str {
    if app.overlay.is_some() {
        return "Tab next field · Enter save · Esc cancel";
    }
    match app.screen {
        Screen::Login => "Enter sign in · Tab next field · Ctrl-N create account · Ctrl-C quit",
        Screen::Signup => "Enter register · Tab next field · Esc back to sign in",
        Screen::Dashboard => "1-4 switch view · r refresh · L sign out · q quit",
        Screen::Contacts if app.contacts.searching => "type to search · ↑↓ pick · Enter add · Esc close",
        Screen::Contacts => "a add · d delete · ↑↓ select · r refresh · q quit",
        Screen::Deals => "←→ column · ↑↓ deal · f/b move · a add · d delete · r refresh · q quit",
        Screen::Profile => "e edit description · t add tag · x remove tag · r refresh · q quit",
    }
}

fn form_lines(form: &Form) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", field.label), label_style),
            Span::styled(
                format!("{}{cursor}", field.display()),
                Style::default().fg(Color::White),
            ),
        ]));
        if let Some(error) = form.errors.get(field.name) {
            lines.push(Line::from(Span::styled(
                format!("  {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn draw_form_screen(f: &mut Frame, form: &Form, title: &str, busy: bool, area: Rect) {
    let area = centered_rect(60, 70, area);
    let mut lines = form_lines(form);
    if busy {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Working...", Style::default().fg(Color::Yellow))));
    }
    let body = Paragraph::new(lines).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(body, area);
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let chart_block = Block::default()
        .title("Deals by stage")
        .borders(Borders::ALL);
    match &app.summary {
        None => f.render_widget(Paragraph::new("Loading...").block(chart_block), halves[0]),
        Some(summary) if summary.is_empty() => {
            f.render_widget(Paragraph::new("No data available").block(chart_block), halves[0]);
        }
        Some(summary) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Min(6), Constraint::Length(6)])
                .split(halves[0]);
            let data: Vec<(&str, u64)> = summary
                .slices
                .iter()
                .map(|s| (short_label(s.stage), s.count))
                .collect();
            let chart = BarChart::default()
                .block(chart_block)
                .data(data.as_slice())
                .bar_width(9)
                .bar_gap(2)
                .bar_style(Style::default().fg(Color::Blue))
                .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
            f.render_widget(chart, rows[0]);

            let shares: Vec<Line> = summary
                .slices
                .iter()
                .map(|s| Line::from(format!("{}: {} ({:.0}%)", s.stage, s.count, summary.percent(s.stage))))
                .collect();
            f.render_widget(
                Paragraph::new(shares).block(Block::default().borders(Borders::ALL)),
                rows[1],
            );
        }
    }

    let mut constraints = vec![Constraint::Ratio(1, 5); PLACEHOLDER_WIDGETS.len().div_ceil(2)];
    constraints.push(Constraint::Min(3));
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(halves[1]);
    for (row, pair) in PLACEHOLDER_WIDGETS.chunks(2).enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(side[row]);
        for (cell, title) in cells.iter().zip(pair) {
            let widget = Paragraph::new(Span::styled("[placeholder]", Style::default().fg(Color::DarkGray)))
                .block(Block::default().title(*title).borders(Borders::ALL));
            f.render_widget(widget, *cell);
        }
    }
    let report = app
        .report_url
        .as_deref()
        .unwrap_or("No report configured (set DEALTRACK_REPORT_URL)");
    f.render_widget(
        Paragraph::new(report)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Embedded report").borders(Borders::ALL)),
        side[side.len() - 1],
    );
}

fn short_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Review => "Revision",
        Stage::InContact => "Contacto",
        Stage::FinishingTouches => "Toques",
        Stage::AwaitingConfirmation => "Espera",
    }
}

fn draw_contacts(f: &mut Frame, app: &App, area: Rect) {
    let dir = &app.contacts;
    let (list_area, search_area) = if dir.searching {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(8), Constraint::Min(0)])
            .split(area);
        (parts[1], Some(parts[0]))
    } else {
        (area, None)
    };

    if let Some(search_area) = search_area {
        let mut lines = vec![Line::from(vec![
            Span::raw("Search: "),
            Span::styled(format!("{}_", dir.search), Style::default().fg(Color::White)),
        ])];
        for (i, c) in dir.filtered_suggestions().iter().enumerate() {
            let style = if i == dir.selected_suggestion {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!("{} - {}", c.name, c.company), style)));
        }
        f.render_widget(
            Paragraph::new(lines).block(Block::default().title("Add contact").borders(Borders::ALL)),
            search_area,
        );
    }

    let items: Vec<ListItem> = dir
        .contacts()
        .iter()
        .map(|c| {
            ListItem::new(Line::from(vec![
                Span::styled(&c.name, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
                Span::raw(format!("  {} · {} · {}", c.company, c.contact, c.role)),
            ]))
        })
        .collect();
    let title = if dir.loaded { "Contacts" } else { "Contacts (loading...)" };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected((!dir.contacts().is_empty()).then_some(dir.selected));
    f.render_stateful_widget(list, list_area, &mut state);
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Green,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::Red,
    }
}

fn draw_deals(f: &mut Frame, app: &App, area: Rect) {
    let board = &app.board;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(25); 4])
        .split(area);

    for (i, column) in board.columns().iter().enumerate() {
        let tasks: Vec<_> = column.task_ids.iter().filter_map(|id| board.get(id)).collect();
        let items: Vec<ListItem> = tasks
            .iter()
            .map(|t| {
                let due = t
                    .due_date
                    .map(|d| format!(" (Due: {d})"))
                    .unwrap_or_default();
                ListItem::new(Line::from(vec![
                    Span::raw(format!("[#{}] ", t.id)),
                    Span::styled(&t.title, Style::default().fg(Color::White)),
                    Span::raw(due),
                    Span::styled(
                        format!(" {}", t.priority.label()),
                        Style::default().fg(priority_color(t.priority)),
                    ),
                ]))
            })
            .collect();

        let mut title = format!("{} ({})", column.stage.label(), tasks.len());
        if !board.loaded {
            title.push_str(" …");
        } else if board.resyncing {
            title.push_str(" ↻");
        }
        let focused = board.selected_stage == i;
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(if focused {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    }),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

        let mut state = ListState::default()
            .with_selected((focused && !tasks.is_empty()).then_some(board.selected_task));
        f.render_stateful_widget(list, chunks[i], &mut state);
    }
}

fn draw_profile(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Profile").borders(Borders::ALL);
    let profile = match &app.profile {
        ProfileView::Idle | ProfileView::Loading => {
            f.render_widget(Paragraph::new("Loading profile...").block(block), area);
            return;
        }
        ProfileView::Failed(message) => {
            let text = Span::styled(message.clone(), Style::default().fg(Color::Red));
            f.render_widget(Paragraph::new(text).block(block), area);
            return;
        }
        ProfileView::Loaded(profile) => profile,
    };

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let details = vec![
        Line::from(Span::styled(
            profile.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(profile.email.clone()),
        Line::from(format!("Born: {}", profile.dob.as_deref().unwrap_or("-"))),
        Line::from(format!("Photo: {}", profile.profile_photo.as_deref().unwrap_or("?"))),
        Line::from(""),
        Line::from(profile.description_or_placeholder().to_string()),
    ];
    f.render_widget(
        Paragraph::new(details).wrap(Wrap { trim: true }).block(block),
        parts[0],
    );

    let tags: Vec<ListItem> = profile.tags.iter().map(|t| ListItem::new(t.as_str())).collect();
    let list = List::new(tags)
        .block(Block::default().title("Tags").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected((!profile.tags.is_empty()).then_some(app.selected_tag));
    f.render_stateful_widget(list, parts[1], &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::dashboard::StageSummary;
    use crate::kanban_board::tests::task;
    use crate::session::{Session, SessionStore};
    use crate::sync::SyncClient;
    use crate::task::OwnerId;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[tokio::test]
    async fn deals_screen_shows_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store
            .save(&Session {
                owner_id: OwnerId(1),
                name: "Ana".into(),
                token: None,
            })
            .unwrap();
        let (sync, _rx) = SyncClient::new(Arc::new(FakeApi::default()), Handle::current());
        let mut app = App::new(sync, store, None);
        app.screen = Screen::Deals;
        app.board.replace_all(vec![task("a", Stage::InContact)]);

        let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = screen_text(&terminal);

        for stage in Stage::ALL {
            assert!(text.contains(&format!("{} (", stage.label())), "missing {stage}");
        }
        assert!(text.contains("deal a"));
    }

    #[tokio::test]
    async fn dashboard_lists_every_placeholder_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let (sync, _rx) = SyncClient::new(Arc::new(FakeApi::default()), Handle::current());
        let mut app = App::new(sync, store, None);
        app.screen = Screen::Dashboard;
        app.summary = Some(StageSummary::from_counts([(Stage::Review, 2)]));

        let mut terminal = Terminal::new(TestBackend::new(180, 44)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = screen_text(&terminal);

        for title in PLACEHOLDER_WIDGETS {
            assert_eq!(text.matches(title).count(), 1, "{title}");
        }
        assert!(text.contains("Embedded report"));
    }

    #[tokio::test]
    async fn login_screen_shows_inline_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let (sync, _rx) = SyncClient::new(Arc::new(FakeApi::default()), Handle::current());
        let mut app = App::new(sync, store, None);
        app.login_form.set_value("email", "bad");
        app.submit_login();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("Email is not valid"));
    }
}
