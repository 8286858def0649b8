//! Screen chrome around the wizard: progress header, step body, error
//! banner and key hints. The steps themselves only produce text; all
//! framing lives here.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::installer::StepView;
use crate::wizard::StepWizard;

pub mod terminal_guard;

/// Everything one frame needs to draw.
pub struct Screen<'a> {
    pub wizard: &'a StepWizard<StepView>,
    /// Transient status line, e.g. a blocked gate.
    pub status: Option<&'a str>,
    /// Last failure from the install state.
    pub error: Option<&'a str>,
    /// An advance is in flight.
    pub busy: bool,
}

pub fn render(frame: &mut Frame, screen: &Screen) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(Line::from(vec![
            Span::raw(" "),
            Span::styled(
                "regenfass",
                Style::default()
                    .fg(Color::LightBlue)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" installer "),
        ]))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Progress header
            Constraint::Min(6),    // Step body
            Constraint::Length(1), // Status / error
            Constraint::Length(1), // Footer
        ])
        .split(inner);

    frame.render_widget(progress_header(screen.wizard), chunks[0]);

    let body = Paragraph::new(screen.wizard.current().render()).wrap(Wrap { trim: false });
    frame.render_widget(body, chunks[1]);

    if let Some(message) = message_line(screen) {
        frame.render_widget(Paragraph::new(message), chunks[2]);
    }

    frame.render_widget(footer(screen), chunks[3]);
}

/// Step titles in order with the current one highlighted.
fn progress_header(wizard: &StepWizard<StepView>) -> Paragraph<'_> {
    let current = wizard.index();
    let mut spans = Vec::new();
    for (i, title) in wizard.titles().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" → ", Style::default().fg(Color::DarkGray)));
        }
        let style = if i == current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if i < current {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(title, style));
    }
    spans.push(Span::styled(
        format!("  ({}/{})", current + 1, wizard.step_count()),
        Style::default().fg(Color::DarkGray),
    ));
    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

fn message_line<'a>(screen: &Screen<'a>) -> Option<Line<'a>> {
    if screen.busy {
        return Some(Line::from(Span::styled(
            "Working…",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(error) = screen.error {
        return Some(Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        )));
    }
    screen.status.map(|status| {
        Line::from(Span::styled(status, Style::default().fg(Color::Yellow)))
    })
}

fn footer(screen: &Screen<'_>) -> Paragraph<'static> {
    let mut spans = Vec::new();
    if screen.wizard.is_terminal() {
        spans.push(Span::styled("q", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(" close  "));
    } else {
        // Dim the continue hint while the current gate is closed.
        let enter_style = if screen.wizard.can_advance() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled("Enter", enter_style));
        spans.push(Span::raw(" continue  "));
    }
    if screen.wizard.index() > 0 {
        spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(" back  "));
    }
    spans.push(Span::styled("Ctrl+C", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" quit"));
    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_contained_and_centered() {
        let outer = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(70, 80, outer);

        assert!(rect.width <= 70);
        assert!(rect.height <= 40);
        assert!(rect.x >= 15);
        assert!(rect.y >= 5);
    }
}
