use crate::{
    app::{AppState, Modal, TimeDialog, CLOCK_ROW, COUNTDOWN_ROW, PANEL_HEIGHT, TARGET_ROW},
    countdown::Tone,
};
use ratatui::{prelude::*, widgets::*};

const CLOCK_COLOR: Color = Color::Rgb(0x66, 0x66, 0x66);
const BACKGROUND: Color = Color::Black;

// ============================================================================
// UI Rendering
// ============================================================================

pub fn render_ui(f: &mut Frame, app: &AppState) {
    render_panel(f, app);

    if let Some(dialog) = &app.dialog {
        render_dialog(f, dialog);
    }
    if let Some(modal) = &app.modal {
        render_modal(f, modal);
    }
}

fn render_panel(f: &mut Frame, app: &AppState) {
    let area = app.panel();
    let countdown_color = match app.display.tone {
        Tone::Alert => Color::Red,
        Tone::Normal => Color::White,
    };

    let mut lines = vec![Line::from(""); PANEL_HEIGHT as usize];
    lines[CLOCK_ROW as usize] = Line::from(Span::styled(
        app.display.clock.as_str(),
        Style::default().fg(CLOCK_COLOR).add_modifier(Modifier::BOLD),
    ));
    lines[COUNTDOWN_ROW as usize] = Line::from(Span::styled(
        spaced(&app.display.countdown),
        Style::default().fg(countdown_color).add_modifier(Modifier::BOLD),
    ));
    lines[TARGET_ROW as usize] = Line::from(Span::styled(
        app.display.target.as_str(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().style(Style::default().bg(BACKGROUND))),
        area,
    );
}

/// Widens the countdown so it reads as the headline of the panel.
fn spaced(text: &str) -> String {
    text.chars().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

fn render_dialog(f: &mut Frame, dialog: &TimeDialog) {
    let area = centered_fixed(34, 9, f.size());

    let input_style = if dialog.selected {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    };
    let mut input = vec![Span::styled(dialog.input.as_str(), input_style)];
    if !dialog.selected {
        input.push(Span::styled("█", Style::default().fg(Color::Green)));
    }

    let lines = vec![
        Line::from("Enter target time:"),
        Line::from(Span::styled("(HH:MM or HH:MM:SS)", Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(input),
        Line::from(""),
        Line::from(vec![
            Span::styled("[ Set ]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled("  Enter  •  Esc cancel", Style::default().fg(Color::DarkGray)),
        ]),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(popup_block(" Set Target Time ")),
        area,
    );
}

fn render_modal(f: &mut Frame, modal: &Modal) {
    let message = modal.message();
    let width = message.chars().count() as u16 + 6;
    let area = centered_fixed(width, 7, f.size());
    let color = match modal {
        Modal::InvalidFormat(_) => Color::Red,
        Modal::Finished => Color::Yellow,
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(color).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled("[ OK ]", Style::default().fg(Color::White).add_modifier(Modifier::BOLD))),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(popup_block(modal.title())),
        area,
    );
}

fn popup_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Gray))
        .style(Style::default().bg(BACKGROUND))
}

fn centered_fixed(w: u16, h: u16, r: Rect) -> Rect {
    let w = w.min(r.width);
    let h = h.min(r.height);
    Rect::new(r.x + (r.width - w) / 2, r.y + (r.height - h) / 2, w, h)
}
