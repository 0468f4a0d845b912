//! TUI rendering using ratatui.

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap};

use metsuke_core::{TaskPriority, TaskStatus};

use super::app::{App, View};

const LOG_PANEL_HEIGHT: u16 = 8;

/// Render the current view.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // main content
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    match app.current_view {
        View::Dashboard => render_dashboard(f, app, chunks[0]),
        View::Help => render_help(f, app, chunks[0]),
    }

    render_status_bar(f, app, chunks[1]);
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let mut constraints = vec![
        Constraint::Length(3),  // title + project info
        Constraint::Length(4),  // progress
        Constraint::Length(11), // priority | dependencies
        Constraint::Min(5),     // task table
    ];
    if app.show_log {
        constraints.push(Constraint::Length(LOG_PANEL_HEIGHT));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_header(f, app, chunks[0]);
    render_progress(f, app, chunks[1]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[2]);
    render_priority_breakdown(f, app, panels[0]);
    render_dependency_status(f, app, panels[1]);

    render_task_table(f, app, chunks[3]);
    if app.show_log {
        render_log(f, app, chunks[4]);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let info = match &app.snapshot {
        Some(s) => Line::from(vec![
            Span::styled("Project: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                s.project.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  Version: {}", s.project.version)),
        ]),
        None => Line::from(Span::styled(
            "No plan loaded",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let header = Paragraph::new(info).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Metsuke: {} ", app.plan_path.display())),
    );
    f.render_widget(header, area);
}

fn render_progress(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Tasks Progress ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let s = &app.summary;
    if s.total == 0 {
        f.render_widget(Paragraph::new("No tasks found."), rows[0]);
        return;
    }

    let counts = Line::from(vec![
        Span::raw(format!("{}/{}  ", s.done, s.total)),
        Span::raw("Done: "),
        Span::styled(s.done.to_string(), Style::default().fg(Color::Green)),
        Span::raw(" | In Progress: "),
        Span::styled(s.in_progress.to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(" | Pending: "),
        Span::styled(s.pending.to_string(), Style::default().fg(Color::Blue)),
        Span::raw(" | Blocked: "),
        Span::styled(s.blocked.to_string(), Style::default().fg(Color::Red)),
    ]);
    f.render_widget(Paragraph::new(counts), rows[0]);

    let percent = s.progress_percent();
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{percent:.1}%"));
    f.render_widget(gauge, rows[1]);
}

fn render_priority_breakdown(f: &mut Frame, app: &App, area: Rect) {
    let s = &app.summary;
    let text = vec![
        Line::from(vec![
            Span::raw("• High priority: "),
            Span::styled(s.high.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::raw("• Medium priority: "),
            Span::styled(s.medium.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("• Low priority: "),
            Span::styled(s.low.to_string(), Style::default().fg(Color::Green)),
        ]),
    ];

    let panel = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Priority Breakdown "),
    );
    f.render_widget(panel, area);
}

fn render_dependency_status(f: &mut Frame, app: &App, area: Rect) {
    let m = &app.metrics;
    let heading = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::UNDERLINED);

    let mut text = vec![
        Line::from(Span::styled("Dependency Metrics:", heading)),
        Line::from(format!("• Tasks with no dependencies: {}", m.tasks_with_no_deps)),
        Line::from(format!("• Tasks ready to work on: {}", m.ready_to_work)),
        Line::from(format!("• Tasks blocked by dependencies: {}", m.blocked_by_deps)),
    ];
    if let Some(id) = m.most_depended_on_id {
        text.push(Line::from(format!(
            "• Most depended-on task: #{id} ({} dependents)",
            m.most_depended_on_count
        )));
    }
    text.push(Line::from(format!(
        "• Avg dependencies per task: {:.1}",
        m.avg_deps_per_task
    )));
    text.push(Line::from(Span::styled("Next Task to Work On:", heading)));

    match &m.next_task {
        Some(task) => {
            text.push(Line::from(vec![
                Span::styled(format!("#{} ", task.id), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.title.clone()),
            ]));
            text.push(Line::from(vec![
                Span::raw("Priority: "),
                priority_colored(task.priority),
                Span::raw(format!("  Dependencies: {}", task.dependencies_label())),
            ]));
        }
        None => text.push(Line::from(Span::styled(
            "ID: N/A - No task available",
            Style::default().add_modifier(Modifier::ITALIC),
        ))),
    }

    let panel = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Dependency Status & Next Task "),
    );
    f.render_widget(panel, area);
}

fn render_task_table(f: &mut Frame, app: &App, area: Rect) {
    let header_cells = ["ID", "Title", "Status", "Priority", "Dependencies"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1);

    let tasks = app.snapshot.as_ref().map(|s| s.tasks.as_slice()).unwrap_or(&[]);

    let rows = tasks.iter().enumerate().map(|(i, task)| {
        let style = if i == app.selected_task {
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(task.id.to_string()),
            Cell::from(task.title.clone()),
            Cell::from(status_colored(task.status)),
            Cell::from(priority_colored(task.priority)),
            Cell::from(task.dependencies_label()),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(50),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Min(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Tasks ({}) ", tasks.len())),
    );

    f.render_widget(table, area);
}

fn render_log(f: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .logs
        .tail(visible)
        .into_iter()
        .map(|line| {
            let color = if line.contains(" ERROR ") {
                Color::Red
            } else if line.contains(" WARN ") {
                Color::Yellow
            } else {
                Color::Gray
            };
            Line::from(Span::styled(line, Style::default().fg(color)))
        })
        .collect();

    let log = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Log "),
    );
    f.render_widget(log, area);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(11)])
        .split(area);

    let context = if app.context().trim().is_empty() {
        Paragraph::new(Span::styled(
            "No context provided in PROJECT_PLAN.yaml",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
    } else {
        Paragraph::new(app.context().to_string())
    };
    let context = context.wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Context "),
    );
    f.render_widget(context, chunks[0]);

    let section = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let keys = vec![
        Line::from(Span::styled("  Navigation", section)),
        Line::from("    j/Down    Move down"),
        Line::from("    k/Up      Move up"),
        Line::from("    Esc/q     Back / Quit"),
        Line::from("    Ctrl+C    Quit"),
        Line::from(Span::styled("  Actions", section)),
        Line::from("    r         Reload plan file"),
        Line::from("    Ctrl+D    Toggle log panel"),
        Line::from("    ?         Show this help"),
    ];

    let help = Paragraph::new(keys).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help "),
    );
    f.render_widget(help, chunks[1]);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let view_name = match app.current_view {
        View::Dashboard => "Dashboard",
        View::Help => "Help",
    };

    let loaded = app
        .last_loaded
        .map(|t| format!("loaded {}", t.format("%H:%M:%S")))
        .unwrap_or_else(|| "not loaded".to_string());

    let health = match &app.last_error {
        Some(err) => Span::styled(format!("error: {err}"), Style::default().fg(Color::Red)),
        None => Span::styled(loaded, Style::default().fg(Color::DarkGray)),
    };

    let status_msg = app.status_message.as_deref().unwrap_or("");

    let left = Line::from(vec![
        Span::styled(
            format!(" {view_name} "),
            Style::default().bg(Color::Blue).fg(Color::White),
        ),
        Span::raw("  "),
        health,
        Span::raw("  "),
        Span::styled(status_msg, Style::default().fg(Color::Green)),
        Span::raw("  q:quit  ?:help  r:reload  ^D:log"),
    ]);
    let clock = Line::from(Local::now().format("%H:%M:%S ").to_string());

    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(10)])
        .split(area);
    f.render_widget(Paragraph::new(left), parts[0]);
    f.render_widget(Paragraph::new(clock).alignment(Alignment::Right), parts[1]);
}

// -- Helpers --

fn status_colored(status: TaskStatus) -> Span<'static> {
    let color = match status {
        TaskStatus::Done => Color::Green,
        TaskStatus::InProgress => Color::Yellow,
        TaskStatus::Pending => Color::Blue,
        TaskStatus::Blocked => Color::Red,
        TaskStatus::Unknown => Color::White,
    };
    Span::styled(status.to_string(), Style::default().fg(color))
}

fn priority_colored(priority: TaskPriority) -> Span<'static> {
    let color = match priority {
        TaskPriority::High => Color::Red,
        TaskPriority::Medium => Color::Yellow,
        TaskPriority::Low => Color::Green,
        TaskPriority::Unknown => Color::White,
    };
    Span::styled(priority.to_string(), Style::default().fg(color))
}
