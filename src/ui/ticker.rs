// ============================================================================
// Ticker - Rendu du widget
// ============================================================================
// Une seule ligne de cotation à la fois, au centre d'un petit cadre :
//
//   ┌──────────────── LazyTicker ────────────────┐
//   │   VWS.CO   142.350 ▲   14:15 UTC            │
//   └──────────── 5 tickers · q : quitter ───────┘
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Span / Line : morceaux de texte stylés
// 3. Layout : découpage de l'espace en zones
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Block, Borders, Paragraph,
    },
    Frame,
};

use crate::app::App;
use crate::models::{DisplayQuote, Movement};

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let area = centered_row(frame.size(), 3);

    let border_color = if app.is_awaiting_quit_confirmation() {
        Color::Yellow
    } else {
        Color::Cyan
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" LazyTicker ")
        .title_alignment(Alignment::Center)
        .title(
            Title::from(Span::styled(footer(app), Style::default().fg(Color::DarkGray)))
                .position(Position::Bottom)
                .alignment(Alignment::Center),
        );

    let paragraph = Paragraph::new(body(app))
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Zone de `height` lignes centrée verticalement
fn centered_row(area: Rect, height: u16) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    chunks[1]
}

/// Contenu principal : indicateur de démarrage ou cotation
fn body(app: &App) -> Line<'static> {
    match (&app.current, app.is_starting()) {
        (Some(quote), _) => Line::from(quote_spans(quote)),
        (None, true) => Line::from(Span::styled(
            "Démarrage...",
            Style::default().fg(Color::Yellow),
        )),
        (None, false) => Line::from(Span::styled(
            "Aucune cotation disponible",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

fn footer(app: &App) -> String {
    if app.is_awaiting_quit_confirmation() {
        " q pour confirmer ".to_string()
    } else {
        format!(" {} tickers · q : quitter ", app.tracked)
    }
}

/// Couleur associée à un mouvement de prix
pub fn movement_color(movement: Movement) -> Color {
    match movement {
        Movement::Up => Color::Green,
        Movement::Down => Color::Red,
        Movement::Unchanged | Movement::Initial => Color::Gray,
    }
}

/// Découpe une cotation en spans stylés
///
/// Marché fermé : prix en gris (valeur figée) et mention "fermé".
pub fn quote_spans(quote: &DisplayQuote) -> Vec<Span<'static>> {
    let price_style = if quote.market_open {
        Style::default().fg(movement_color(quote.movement))
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![
        Span::styled(
            format!("{:<8}", quote.ticker),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {:>12} ", quote.price), price_style),
        Span::styled(
            quote.movement.arrow().to_string(),
            Style::default().fg(movement_color(quote.movement)),
        ),
        Span::raw(format!("  {}", quote.as_of.format("%H:%M UTC"))),
    ];

    if !quote.market_open {
        spans.push(Span::styled(
            "  fermé".to_string(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }
    spans
}

// ============================================================================
// Tests
// ============================================================================
