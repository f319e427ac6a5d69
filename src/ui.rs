//! TUI rendering for the guide.
//!
//! A pure function of [`App`]: the header with the current city and any
//! nearby-city hint, the ranked dish list (or a loading line), and whichever
//! overlay is open on top.

use crate::app::{App, Modal};
use crate::models::Dish;
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Renders one frame of the TUI based on current application state.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_header(f, app, chunks[0]);
    if app.is_loading() {
        render_loading(f, app, chunks[1]);
    } else {
        render_dish_list(f, app, chunks[1]);
    }
    render_help(f, app, chunks[2]);

    match app.modal() {
        Modal::CitySelector => render_city_selector(f, app),
        Modal::DishDetail => {
            if let Some(dish) = app.selected_dish() {
                render_dish_detail(f, dish);
            }
        }
        Modal::None => {}
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let city = app.current_city();
    let mut lines = vec![Line::from(vec![
        Span::raw(format!(" {} ", city.emoji)),
        Span::styled(
            format!("{}で絶対食べるべき", city.name),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            " TOP 5 ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        Span::styled(
            format!("  {} · {}", city.name_romanized, city.region),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if let Some(nearby) = app.suggestion() {
        lines.push(Line::from(vec![
            Span::styled(" NEARBY: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("{} {} ({})", nearby.emoji, nearby.name, nearby.name_romanized),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled("  press c to switch", Style::default().fg(Color::DarkGray)),
        ]));
    }

    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(header, area);
}

fn render_loading(f: &mut Frame, app: &App, area: Rect) {
    let frame = SPINNER[app.tick_count % SPINNER.len()];
    let msg = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "{} {}のグルメ情報を取得中...",
                frame,
                app.current_city().name
            ),
            Style::default().fg(Color::Yellow),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    f.render_widget(msg, area);
}

fn render_dish_list(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Must-try dishes ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    if app.dishes().is_empty() {
        let empty = Paragraph::new("No dishes for this city yet.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .dishes()
        .iter()
        .map(|dish| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!(" {:>2} ", dish.rank),
                        Style::default()
                            .fg(Color::White)
                            .bg(Color::Red)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" {}", dish.name),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", dish.romanized_name),
                        Style::default().fg(Color::Cyan),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("     {}", dish.short_description),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Rgb(30, 30, 60)))
        .highlight_symbol("▶");
    let mut state = ListState::default().with_selected(Some(app.selected_index));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let text = match app.modal() {
        Modal::CitySelector => " type to search   ↑/↓ move   Enter choose   Esc cancel",
        Modal::DishDetail => " Esc/Enter close",
        Modal::None => " ↑/↓ move   Enter details   c change city   q quit",
    };
    let help = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, area);
}

fn render_city_selector(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 70, f.size());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" 都市を選択 / Choose a city ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    let search = Paragraph::new(format!(" 🔍 {}▏", app.city_query)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(search, chunks[0]);

    let cities = app.filtered_cities();
    if cities.is_empty() {
        let none = Paragraph::new("該当する都市が見つかりません")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(none, chunks[1]);
        return;
    }

    let current_id = &app.current_city().id;
    let items: Vec<ListItem> = cities
        .iter()
        .map(|city| {
            let marker = if &city.id == current_id { "●" } else { " " };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", marker), Style::default().fg(Color::Yellow)),
                Span::raw(format!("{} ", city.emoji)),
                Span::styled(
                    format!("{:<6}", city.name),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {:<10}", city.name_romanized)),
                Span::styled(city.region.as_str(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .fg(Color::Cyan)
            .bg(Color::Rgb(30, 30, 60))
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default().with_selected(Some(app.city_cursor));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_dish_detail(f: &mut Frame, dish: &Dish) {
    let area = centered_rect(80, 85, f.size());
    f.render_widget(Clear, area);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            dish.romanized_name.as_str(),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(dish.full_description.as_str()),
        Line::from(""),
        Line::from(vec![
            Span::styled("価格帯 Price: ", bold),
            Span::raw(format!(
                "{} ({})",
                dish.price_range_local, dish.price_range_foreign
            )),
        ]),
    ];

    if let Some(note) = &dish.preparation_note {
        lines.push(Line::from(vec![
            Span::styled("食べ方 How to eat: ", bold),
            Span::raw(note.as_str()),
        ]));
    }

    if !dish.order_phrases.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "📣 Order like a local",
            bold.fg(Color::Yellow),
        )));
        for phrase in &dish.order_phrases {
            lines.push(Line::from(Span::styled(
                format!("  {}", phrase.native_text),
                bold,
            )));
            lines.push(Line::from(format!("  {}", phrase.romanized_text)));
            lines.push(Line::from(Span::styled(
                format!("  \"{}\"", phrase.translated_text),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    if let Some(note) = &dish.cultural_note {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("📚 Background", bold.fg(Color::Blue))));
        lines.push(Line::from(format!("  {}", note)));
    }

    if !dish.restaurants.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("📍 おすすめの店 Where to go", bold)));
        for restaurant in &dish.restaurants {
            let mut name = vec![Span::styled(format!("  {}", restaurant.name), bold)];
            if let Some(romanized) = &restaurant.romanized_name {
                name.push(Span::raw(format!("  {}", romanized)));
            }
            lines.push(Line::from(name));
            lines.push(Line::from(format!("  {}", restaurant.address)));
            if !restaurant.features.is_empty() {
                let tags: Vec<&str> = restaurant.features.iter().map(String::as_str).collect();
                lines.push(Line::from(Span::styled(
                    format!("  [{}]", tags.join("] [")),
                    Style::default().fg(Color::Green),
                )));
            }
            lines.push(Line::from(Span::styled(
                format!("  {}", restaurant.map_link),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            )));
        }
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!(" {}. {} ", dish.rank, dish.name))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(detail, area);
}

/// A rectangle `percent_x` by `percent_y` of `r`, centered in it.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
