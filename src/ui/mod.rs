// ui/mod.rs — terminal UI: task board plus assistant panel.
//
// Single cooperative loop: draw a frame, drain completed client calls from
// the event channel, then handle pending key input. Client calls run on
// spawned tasks and report back through the channel, so the list only
// changes after the server acknowledges.
//
// Keys:
//   Tab          cycle focus (new-task input → task list → assistant)
//   Enter        add task / toggle selected / send message (per focus)
//   d            delete selected task
//   ←/→          previous / next day
//   ↑/↓          move selection
//   Ctrl-R       reset assistant transcript
//   q / Ctrl-C   quit

pub mod state;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use crate::assistant::{Assistant, Role, Snapshot};
use crate::client::ApiClient;
use self::state::{AppState, Focus, UiEvent};

type EventTx = mpsc::UnboundedSender<UiEvent>;

pub async fn run(client: ApiClient, assistant: Arc<Assistant>) -> Result<()> {
    assistant.start();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = AppState::new(Local::now().date_naive());
    spawn_refresh(client.clone(), tx.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &mut rx, &client, &tx, &assistant).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    client: &ApiClient,
    tx: &EventTx,
    assistant: &Arc<Assistant>,
) -> Result<()> {
    let mut tick = tokio::time::interval(Duration::from_millis(50));

    loop {
        let snapshot = assistant.snapshot().await;
        terminal.draw(|f| render(f, app, &snapshot))?;

        while let Ok(ev) = rx.try_recv() {
            app.apply(ev);
        }

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    match key.code {
                        KeyCode::Char('c') => return Ok(()),
                        KeyCode::Char('r') => assistant.reset().await,
                        _ => {}
                    }
                    continue;
                }
                match app.focus {
                    Focus::Input => handle_input_key(key.code, app, client, tx),
                    Focus::List => {
                        if handle_list_key(key.code, app, client, tx) {
                            return Ok(());
                        }
                    }
                    Focus::Assistant => handle_assistant_key(key.code, app, assistant).await,
                }
            }
        }

        tick.tick().await;
    }
}

// ─── Key handling ─────────────────────────────────────────────────────────────

fn handle_input_key(code: KeyCode, app: &mut AppState, client: &ApiClient, tx: &EventTx) {
    match code {
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            let title = app.input.trim().to_string();
            if !title.is_empty() {
                spawn_add(client.clone(), tx.clone(), title, app.selected_date_str());
            }
        }
        KeyCode::Left => app.shift_date(-1),
        KeyCode::Right => app.shift_date(1),
        _ => {}
    }
}

/// Returns true when the user asked to quit.
fn handle_list_key(code: KeyCode, app: &mut AppState, client: &ApiClient, tx: &EventTx) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Up => app.select_prev(),
        KeyCode::Down => app.select_next(),
        KeyCode::Left => app.shift_date(-1),
        KeyCode::Right => app.shift_date(1),
        KeyCode::Enter | KeyCode::Char(' ') => {
            if let Some(task) = app.day_view().get(app.selected) {
                spawn_toggle(client.clone(), tx.clone(), task.id);
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(task) = app.day_view().get(app.selected) {
                spawn_delete(client.clone(), tx.clone(), task.id);
            }
        }
        _ => {}
    }
    false
}

async fn handle_assistant_key(code: KeyCode, app: &mut AppState, assistant: &Arc<Assistant>) {
    match code {
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char(c) => app.chat_input.push(c),
        KeyCode::Backspace => {
            app.chat_input.pop();
        }
        KeyCode::Enter => {
            // send() applies the single-flight guard and the empty-input
            // check; a rejected send leaves the draft in place.
            if assistant.send(&app.chat_input).await {
                app.chat_input.clear();
            }
        }
        _ => {}
    }
}

// ─── Client call wrappers ─────────────────────────────────────────────────────

fn spawn_refresh(client: ApiClient, tx: EventTx) {
    tokio::spawn(async move {
        let ev = match client.list_tasks().await {
            Ok(tasks) => UiEvent::TasksLoaded(tasks),
            Err(e) => UiEvent::Error(format!("list failed: {e:#}")),
        };
        let _ = tx.send(ev);
    });
}

fn spawn_add(client: ApiClient, tx: EventTx, title: String, date: String) {
    tokio::spawn(async move {
        let ev = match client.add_task(&title, &date).await {
            Ok(task) => UiEvent::TaskCreated(task),
            Err(e) => UiEvent::Error(format!("add failed: {e:#}")),
        };
        let _ = tx.send(ev);
    });
}

fn spawn_toggle(client: ApiClient, tx: EventTx, id: i64) {
    tokio::spawn(async move {
        let ev = match client.toggle_task(id).await {
            Ok(task) => UiEvent::TaskToggled(task),
            Err(e) => UiEvent::Error(format!("toggle failed: {e:#}")),
        };
        let _ = tx.send(ev);
    });
}

fn spawn_delete(client: ApiClient, tx: EventTx, id: i64) {
    tokio::spawn(async move {
        let ev = match client.delete_task(id).await {
            Ok(_) => UiEvent::TaskDeleted(id),
            Err(e) => UiEvent::Error(format!("delete failed: {e:#}")),
        };
        let _ = tx.send(ev);
    });
}

// ─── Rendering ────────────────────────────────────────────────────────────────

fn render(f: &mut Frame, app: &AppState, assistant: &Snapshot) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(42),
            Constraint::Percentage(30),
        ])
        .split(f.area());

    render_all_tasks(f, columns[0], app);
    render_day(f, columns[1], app);
    render_assistant(f, columns[2], app, assistant);
}

fn task_line(task: &crate::tasks::Task) -> Line<'_> {
    let mark = if task.completed { "[x] " } else { "[ ] " };
    let style = if task.completed {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(mark),
        Span::styled(task.title.as_str(), style),
        Span::styled(format!("  {}", task.task_date), Style::default().fg(Color::DarkGray)),
    ])
}

fn render_all_tasks(f: &mut Frame, area: Rect, app: &AppState) {
    let items: Vec<ListItem> = app.tasks.iter().map(|t| ListItem::new(task_line(t))).collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" All Tasks ({}) ", app.tasks.len())),
    );
    f.render_widget(list, area);
}

fn render_day(f: &mut Frame, area: Rect, app: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Min(4),
        ])
        .split(area);

    let input_style = if app.focus == Focus::Input {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let input = Paragraph::new(app.input.as_str()).style(input_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" New task — {} ", app.selected_date_str())),
    );
    f.render_widget(input, rows[0]);

    let view = app.day_view();
    let list_focused = app.focus == Focus::List;

    let active_items: Vec<ListItem> =
        view.active.iter().map(|t| ListItem::new(task_line(t))).collect();
    let mut active_state = ListState::default();
    if list_focused && app.selected < view.active.len() {
        active_state.select(Some(app.selected));
    }
    let active = List::new(active_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Active ({}) ", view.active.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(active, rows[1], &mut active_state);

    let completed_items: Vec<ListItem> =
        view.completed.iter().map(|t| ListItem::new(task_line(t))).collect();
    let mut completed_state = ListState::default();
    if list_focused && app.selected >= view.active.len() && !view.is_empty() {
        completed_state.select(Some(app.selected - view.active.len()));
    }
    let completed = List::new(completed_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Completed ({}) ", view.completed.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(completed, rows[2], &mut completed_state);
}

fn render_assistant(f: &mut Frame, area: Rect, app: &AppState, snapshot: &Snapshot) {
    let show_gauge = snapshot.loading;
    let constraints = if show_gauge {
        vec![
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
        ]
    } else {
        vec![Constraint::Min(4), Constraint::Length(3)]
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut next = 0;
    if show_gauge {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Initializing AI model... "),
            )
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(u16::from(snapshot.progress));
        f.render_widget(gauge, rows[next]);
        next += 1;
    }

    let mut lines: Vec<Line> = Vec::new();
    for msg in &snapshot.transcript {
        let (label, style) = match msg.role {
            Role::User => ("you: ", Style::default().fg(Color::Yellow)),
            Role::Bot => ("ai:  ", Style::default().fg(Color::Cyan)),
        };
        lines.push(Line::from(vec![
            Span::styled(label, style.add_modifier(Modifier::BOLD)),
            Span::raw(msg.text.clone()),
        ]));
    }
    if snapshot.generating {
        lines.push(Line::from(Span::styled(
            "ai:  …",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Assistant "));
    f.render_widget(transcript, rows[next]);
    next += 1;

    let input_style = if app.focus == Focus::Assistant {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let placeholder = if snapshot.loading {
        " Loading model... "
    } else {
        " Type a message "
    };
    let input = Paragraph::new(app.chat_input.as_str())
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(placeholder));
    f.render_widget(input, rows[next]);
}
