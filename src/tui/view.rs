// Terminal Rendering
//
// Layout: menu on the left, the selected module's form or dashboard on
// the upper right, its log view below.
//

use super::app::{App, Focus, Screen};
use super::form::{FieldKind, Form};
use crate::pool::PoolStats;
use crate::types::HarvestToken;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

const ACCENT: Color = Color::Cyan;

pub fn draw(f: &mut Frame, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(f.size());

    draw_menu(f, app, columns[0]);

    let Some(screen) = app.screen() else {
        draw_quit_hint(f, columns[1]);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[1]);

    match screen {
        Screen::Dashboard => draw_dashboard(f, app, rows[0]),
        Screen::Harvest => draw_harvest(f, app, rows[0]),
        Screen::Miner(_) | Screen::Wallet => {
            if let Some(form) = app.active_form() {
                draw_form(f, form, app.focus == Focus::Form, &status_lines(app, screen), rows[0]);
            }
        }
    }

    draw_logs(f, app, screen, rows[1]);
}

fn draw_menu(f: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = app.menu_items().into_iter().map(ListItem::new).collect();
    let border = if app.focus == Focus::Menu { ACCENT } else { Color::Gray };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title("xoon"),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(ACCENT))
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut app.menu);
}

fn draw_quit_hint(f: &mut Frame, area: Rect) {
    let text = Paragraph::new(vec![
        Line::from("Press 'q' four times, within a second each, to quit."),
        Line::from("Running miners are stopped and the wallet is locked."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Quit"));
    f.render_widget(text, area);
}

/// Header lines above a module form
fn status_lines(app: &App, screen: Screen) -> Vec<Line<'static>> {
    let key = app
        .ctx
        .wallet
        .public_key()
        .unwrap_or_else(|| "not logged in".to_string());

    match screen {
        Screen::Miner(i) => {
            let supervisor = &app.supervisors[i];
            let state = if supervisor.is_active() {
                Span::styled("MINING", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            } else {
                Span::styled("IDLE", Style::default().fg(Color::DarkGray))
            };
            vec![
                Line::from(vec![Span::raw(format!("{}: ", supervisor.backend().name)), state]),
                Line::from(format!("Public Key: {}", key)),
            ]
        }
        Screen::Wallet => {
            let stored = app
                .ctx
                .store
                .existing_prefix()
                .map(|p| format!("Wallet file: {}...", p))
                .unwrap_or_else(|| "No wallet yet".to_string());
            vec![Line::from(stored), Line::from(format!("Public Key: {}", key))]
        }
        _ => Vec::new(),
    }
}

fn draw_form(f: &mut Frame, form: &Form, focused: bool, header: &[Line<'static>], area: Rect) {
    let mut lines: Vec<Line> = header.to_vec();
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }

    for (i, field) in form.fields.iter().enumerate() {
        let selected = focused && i == form.focus;
        let marker = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let line = match &field.kind {
            FieldKind::Text { value, masked } => {
                let shown = if *masked { "*".repeat(value.chars().count()) } else { value.clone() };
                Line::from(vec![
                    Span::styled(format!("{}{}: ", marker, field.label), style),
                    Span::raw(shown),
                    Span::styled(if selected { "_" } else { "" }, style),
                ])
            }
            FieldKind::Select { options, index } => Line::from(vec![
                Span::styled(format!("{}{}: ", marker, field.label), style),
                Span::raw(format!("< {} >", options.get(*index).map(String::as_str).unwrap_or("-"))),
            ]),
            FieldKind::Button(_) => Line::from(Span::styled(format!("{}[ {} ]", marker, field.label), style)),
        };
        lines.push(line);
    }

    let border = if focused { ACCENT } else { Color::Gray };
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(form.title.clone()),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_harvest(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.harvest_form;
    let token = HarvestToken::from_symbol(form.value("manual_token")).unwrap_or(HarvestToken::PRIMARY);
    let estimate = app.harvester.estimate(form.value("manual_sol"), token);

    let header = vec![Line::from(format!("Amount(Est.): {}", estimate))];
    draw_form(f, form, app.focus == Focus::Form, &header, area);
}

/// Pool amounts are in SOL; show their solXEN value at the cached price
fn sol_as_primary(app: &App, sol: f64) -> f64 {
    app.prices
        .get(HarvestToken::PRIMARY.symbol())
        .map_or(0.0, |price| sol * price)
}

fn pool_lines(app: &App, stats: &PoolStats) -> Vec<Line<'static>> {
    let primary = HarvestToken::PRIMARY.symbol();
    let reward = |value: Option<f64>| match value {
        Some(sol) => format!("{:.2} {}", sol_as_primary(app, sol), primary),
        None => "-".to_string(),
    };

    vec![
        Line::from(Span::styled("MINING STATS:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(format!(
            "Pending: {} {} ({:.2} {}) | AutoPay: {} | PayOn: {} {}",
            stats.balance,
            stats.coin,
            sol_as_primary(app, stats.balance),
            primary,
            if stats.auto_pay { "On" } else { "Off" },
            stats.payment_threshold,
            stats.coin
        )),
        Line::from(format!(
            "Rewards: 24h: {} | 7d: {} | 30d: {}",
            reward(stats.rewards_24h),
            reward(stats.rewards_7d),
            reward(stats.rewards_30d)
        )),
    ]
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    match app.ctx.wallet.public_key() {
        Some(key) => lines.push(Line::from(format!("Public Key: {}", key))),
        None => lines.push(Line::from(Span::styled(
            "Login to your wallet to see balances and pool stats",
            Style::default().fg(Color::Yellow),
        ))),
    }
    lines.push(Line::from(""));

    match &app.pool {
        Some(stats) => lines.extend(pool_lines(app, stats)),
        None => lines.push(Line::from("MINING STATS: -")),
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("WALLET BALANCE:", Style::default().add_modifier(Modifier::BOLD))));
    match &app.balances {
        Some((native, tokens)) => {
            let mut text = format!("{:.6} SOL", native);
            for token in tokens {
                text.push_str(&format!(" | {:.6} {}", token.amount, token.symbol));
            }
            lines.push(Line::from(text));
        }
        None => lines.push(Line::from("-")),
    }

    if !app.prices.is_empty() {
        lines.push(Line::from(""));
        let mut prices: Vec<_> = app.prices.iter().collect();
        prices.sort_by(|a, b| a.0.cmp(b.0));
        let text = prices
            .iter()
            .map(|(symbol, price)| format!("{:.2} {}", price, symbol))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(Line::from(format!("1 SOL = {}", text)));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Dashboard"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_logs(f: &mut Frame, app: &App, screen: Screen, area: Rect) {
    let scope = screen.scope(&app.supervisors);
    let visible = area.height.saturating_sub(2) as usize;

    let lines: Vec<Line> = app.log_lines(scope).map(|l| Line::from(l.as_str())).collect();
    let skip = lines.len().saturating_sub(visible);
    let lines: Vec<Line> = lines.into_iter().skip(skip).collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} Log", scope.title())),
    );
    f.render_widget(paragraph, area);
}
