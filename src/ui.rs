use crate::app::{App, DeleteTarget, FilterField, FormState, InputMode};
use crate::models::{parse_timestamp, Category, Task};
use crate::query::{CategoryFilter, StatusTab};
use crate::validation::Field;
use crossterm::event::{self, Event as CEvent};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

const DEFAULT_CATEGORY_COLOR: Color = Color::Gray;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

/// `#RRGGBB` to a terminal color, grey for anything else.
pub fn category_color(category: Option<&Category>) -> Color {
    let Some(hex) = category.and_then(|c| c.color.as_deref()) else {
        return DEFAULT_CATEGORY_COLOR;
    };
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return DEFAULT_CATEGORY_COLOR;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => DEFAULT_CATEGORY_COLOR,
    }
}

fn priority_color(task: &Task) -> Color {
    match task.priority_rank() {
        0 => Color::Red,
        1 => Color::Yellow,
        2 => Color::Blue,
        _ => Color::DarkGray,
    }
}

fn display_date(raw: Option<&str>) -> String {
    match raw {
        Some(text) => parse_timestamp(text)
            .map(|dt| dt.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| text.to_string()),
        None => "No due date".to_string(),
    }
}

fn key_hint(key: &'static str, action: &'static str) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!(" {} ", key), Style::default().fg(Color::Red)),
        Span::raw(format!(": {} ", action)),
    ]
}

fn get_legend(input_mode: &InputMode) -> Text<'static> {
    let hints: &[(&'static str, &'static str)] = match input_mode {
        InputMode::Normal => &[
            ("q", "Quit"),
            ("j/k", "Move"),
            ("Tab", "Tab"),
            ("/", "Search"),
            ("f", "Filters"),
            ("c", "Clear Filters"),
            ("a", "Add"),
            ("e", "Edit"),
            ("x", "Toggle Done"),
            ("d", "Delete"),
            ("g", "Categories"),
            ("r", "Refresh"),
        ],
        InputMode::Search => &[("Enter", "Done"), ("Esc", "Clear Search")],
        InputMode::Filter => &[
            ("Tab", "Next Field"),
            ("←/→", "Change"),
            ("c", "Clear"),
            ("Esc", "Close"),
        ],
        InputMode::Editing => &[
            ("i", "Insert"),
            ("Tab", "Next Field"),
            ("←/→", "Change"),
            ("Enter", "Submit"),
            ("Esc", "Cancel"),
        ],
        InputMode::Insert => &[("Esc", "Stop Typing")],
        InputMode::ConfirmDelete => &[("y", "Delete"), ("n", "Keep")],
        InputMode::Categories => &[
            ("j/k", "Move"),
            ("a", "Add"),
            ("e", "Edit"),
            ("d", "Delete"),
            ("Esc", "Back"),
        ],
    };
    let spans: Vec<Span<'static>> = hints
        .iter()
        .flat_map(|&(key, action)| key_hint(key, action))
        .collect();
    Text::from(Line::from(spans))
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let count = app.visible_tasks().len();
    let mut status_spans = vec![Span::styled(
        format!(
            "{} task{} remaining",
            count,
            if count != 1 { "s" } else { "" }
        ),
        Style::default().fg(Color::Gray),
    )];
    if app.loading {
        status_spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
    }
    if let Some(error) = &app.load_error {
        status_spans.push(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(status) = &app.status {
        status_spans.push(Span::styled(
            format!("  {}", status),
            Style::default().fg(Color::Green),
        ));
    }

    let title = Paragraph::new(Line::from(Span::styled(
        "My Tasks",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    f.render_widget(title, chunks[0]);
    f.render_widget(Paragraph::new(Line::from(status_spans)), chunks[1]);

    let search_style = if app.input_mode == InputMode::Search {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };
    let search_text = if app.filters.search().is_empty() && app.input_mode != InputMode::Search {
        "Search tasks...".to_string()
    } else {
        app.filters.search().to_string()
    };
    let search = Paragraph::new(Line::from(vec![
        Span::styled("/ ", search_style),
        Span::styled(search_text, search_style),
    ]));
    f.render_widget(search, chunks[2]);

    let tab_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(18)].as_ref())
        .split(chunks[3]);
    let tabs = Tabs::new(StatusTab::ALL.iter().map(|t| t.label()).collect::<Vec<_>>())
        .select(app.filters.tab().index())
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, tab_row[0]);

    let filter_label = if app.filters.has_active_filters() {
        Span::styled("● Filters (f)", Style::default().fg(Color::Magenta))
    } else {
        Span::styled("Filters (f)", Style::default().fg(Color::Gray))
    };
    f.render_widget(
        Paragraph::new(Line::from(filter_label)).alignment(Alignment::Right),
        tab_row[1],
    );
}

fn task_item<'a>(task: &'a Task, category: Option<&'a Category>) -> ListItem<'a> {
    let mut content = Vec::new();
    if task.is_completed() {
        content.push(Span::styled("DONE ", Style::default().fg(Color::Green)));
        content.push(Span::styled(
            task.title.as_str(),
            Style::default().add_modifier(Modifier::CROSSED_OUT),
        ));
    } else {
        content.push(Span::raw(task.title.as_str()));
    }
    content.push(Span::raw(" "));
    content.push(Span::styled(
        format!("[{}]", task.priority.to_lowercase()),
        Style::default().fg(priority_color(task)),
    ));
    if let Some(category) = category {
        content.push(Span::raw(" "));
        content.push(Span::styled(
            format!(" {} ", category.name),
            Style::default().bg(category_color(Some(category))).fg(Color::Black),
        ));
    }
    ListItem::new(Line::from(content))
}

fn draw_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Tasks ({})", app.filters.tab().label()));

    let visible = app.visible_tasks();
    let empty_message = match &app.tasks {
        Some(tasks) if tasks.is_empty() => Some("No task yet. Press a to add your first task"),
        Some(_) if visible.is_empty() => {
            Some("No tasks match your filters. Try adjusting your filters or search")
        }
        None if app.loading => Some("Loading tasks..."),
        None => Some("No tasks loaded"),
        _ => None,
    };

    if let Some(message) = empty_message {
        let widget = Paragraph::new(message)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(widget, area);
        return;
    }

    let items: Vec<ListItem> = visible
        .iter()
        .map(|task| task_item(task, app.category(task.category_id.as_deref())))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    let mut state = app.state.clone();
    f.render_stateful_widget(list, area, &mut state);
    app.state = state;
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");

    let Some(task) = app.selected_task() else {
        let paragraph = Paragraph::new("Select a task to see its details")
            .block(detail_block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(task.title.clone(), bold)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status: ", bold),
            Span::raw(if task.is_completed() {
                "Completed"
            } else {
                "Pending"
            }),
        ]),
        Line::from(vec![
            Span::styled("Due Date: ", bold),
            Span::raw(display_date(task.due_date.as_deref())),
        ]),
        Line::from(vec![
            Span::styled("Priority: ", bold),
            Span::styled(
                if task.priority.is_empty() {
                    "No priority".to_string()
                } else {
                    task.priority.clone()
                },
                Style::default().fg(priority_color(task)),
            ),
        ]),
    ];

    let category = app.category(task.category_id.as_deref());
    lines.push(Line::from(vec![
        Span::styled("Category: ", bold),
        match category {
            Some(c) => Span::styled(
                format!(" {} ", c.name),
                Style::default().bg(category_color(Some(c))).fg(Color::Black),
            ),
            None => Span::raw("No category"),
        },
    ]));

    if let Some(created) = task.created_at.as_deref() {
        lines.push(Line::from(vec![
            Span::styled("Created: ", bold),
            Span::raw(display_date(Some(created))),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Description: ", bold)));
    match task.description.as_deref().map(str::trim) {
        Some(desc) if !desc.is_empty() => {
            lines.extend(desc.lines().map(|l| Line::from(l.to_string())));
        }
        _ => lines.push(Line::from("No description")),
    }

    let paragraph = Paragraph::new(lines)
        .block(detail_block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn field_value(app: &App, form: &FormState, field: Field) -> String {
    match field {
        Field::Title => form.task.title.clone(),
        Field::Description => form.task.description.clone(),
        Field::DueDate => form.task.due_date.clone(),
        Field::Priority => form
            .task
            .priority
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| "Select priority".to_string()),
        Field::Category => app
            .category(form.task.category_id.as_deref())
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "No category".to_string()),
        Field::Name => form.category.name.clone(),
        Field::Color => form.category.color.clone(),
    }
}

fn draw_form(f: &mut Frame, app: &App, form: &FormState, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for field in form.fields() {
        let active = *field == form.active;
        let typing = active && app.input_mode == InputMode::Insert;
        let label_style = if active {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let mut value = field_value(app, form, *field);
        if typing {
            value.push('_');
        }
        let value = if FormState::is_text(*field) {
            value
        } else {
            format!("< {} >", value)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", field), label_style),
            Span::raw(value),
        ]));
        if let Some(error) = form.errors.get(*field) {
            lines.push(Line::from(Span::styled(
                format!("  {}", error),
                Style::default().fg(Color::Red),
            )));
        }
    }
    if form.submitting.is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Saving...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let width = (area.width * 60 / 100).max(30).min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup_area = centered_rect_absolute(width, height, area);

    let popup_block = Block::default()
        .title(form.heading())
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));
    let input = Paragraph::new(lines)
        .style(Style::default().fg(Color::White))
        .block(popup_block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

fn draw_filters(f: &mut Frame, app: &App, area: Rect) {
    let category_label = match app.filters.category() {
        CategoryFilter::All => "All".to_string(),
        CategoryFilter::Only(id) => app
            .category(Some(id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.clone()),
    };
    let rows = [
        (FilterField::Category, "Category", category_label),
        (
            FilterField::Priority,
            "Priority",
            app.filters.priority().label().to_string(),
        ),
        (
            FilterField::Sort,
            "Sort By",
            app.filters.sort().label().to_string(),
        ),
    ];

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(field, label, value)| {
            let style = if field == app.filter_field {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Line::from(vec![
                Span::styled(format!("{}: ", label), style),
                Span::raw(format!("< {} >", value)),
            ])
        })
        .collect();

    let popup_area = centered_rect_absolute(40.min(area.width), 5.min(area.height), area);
    let title = if app.filters.has_active_filters() {
        "Filters (c to clear)"
    } else {
        "Filters"
    };
    let popup = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn draw_confirm_delete(f: &mut Frame, target: &DeleteTarget, area: Rect) {
    let message = match target {
        DeleteTarget::Task { title, .. } => format!("Delete task \"{}\"? (y/n)", title),
        DeleteTarget::Category { name, .. } => format!("Delete category \"{}\"? (y/n)", name),
    };
    let width = (message.chars().count() as u16 + 4).min(area.width);
    let popup_area = centered_rect_absolute(width, 3.min(area.height), area);
    let popup = Paragraph::new(message).block(
        Block::default()
            .title("Confirm")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Red)),
    );
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn draw_categories(f: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = if app.categories.is_empty() {
        vec![ListItem::new("No categories yet. Press a to add one")]
    } else {
        app.categories
            .iter()
            .map(|c| {
                ListItem::new(Line::from(vec![
                    Span::styled("  ", Style::default().bg(category_color(Some(c)))),
                    Span::raw(format!(" {}", c.name)),
                ]))
            })
            .collect()
    };

    let width = (area.width / 2).max(30).min(area.width);
    let height = (items.len() as u16 + 2).clamp(3, area.height.max(3));
    let popup_area = centered_rect_absolute(width, height.min(area.height), area);
    let list = List::new(items)
        .block(
            Block::default()
                .title("Manage Categories")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    f.render_widget(Clear, popup_area);
    f.render_stateful_widget(list, popup_area, &mut app.category_state);
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Header, body and footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);

    let header_chunk = chunks[0];
    let body_chunk = chunks[1];
    let footer_chunk = chunks[2];

    draw_header(f, app, header_chunk);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(body_chunk);
    draw_tasks(f, app, body[0]);
    draw_detail(f, app, body[1]);

    match app.input_mode {
        InputMode::Editing | InputMode::Insert => {
            if let Some(form) = app.form.clone() {
                draw_form(f, app, &form, body_chunk);
            }
        }
        InputMode::Filter => draw_filters(f, app, body_chunk),
        InputMode::Categories => draw_categories(f, app, body_chunk),
        InputMode::ConfirmDelete => {
            if let Some(target) = &app.pending_delete {
                draw_confirm_delete(f, target, body_chunk);
            }
        }
        InputMode::Normal | InputMode::Search => {}
    }

    // Render the legend in the footer
    let legend = Paragraph::new(get_legend(&app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(legend, footer_chunk);
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        app.sync();
        terminal.draw(|f| draw(f, &mut app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if app.handle_input(key) {
                    return Ok(());
                }
            }
        } else {
            // Let spawned requests make progress between frames.
            tokio::task::yield_now().await;
        }
    }
}
