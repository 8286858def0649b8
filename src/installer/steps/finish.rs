//! Finish step: terminal page showing what to do next.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::installer::{SharedState, StepView};
use crate::wizard::Step;

pub(crate) fn step(state: SharedState) -> Step<StepView> {
    Step::new("Finish", move || render(&state))
}

fn render(state: &SharedState) -> StepView {
    let st = state.lock().unwrap();

    let mut lines = vec![
        Line::from(Span::styled(
            "Setup complete",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if let Some(info) = &st.device_info {
        lines.push(Line::from(vec![
            Span::raw("Firmware: "),
            Span::styled(format!("v{}", info.firmware_version), Style::default().fg(Color::Cyan)),
        ]));
        if let Some(dev_eui) = info.config.get("devEUI") {
            lines.push(Line::from(vec![
                Span::raw("DevEUI:   "),
                Span::styled(dev_eui.to_string(), Style::default().fg(Color::Cyan)),
            ]));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from("Next steps:"));
    lines.push(Line::from("  1. Unplug the sensor and mount it above the water surface."));
    lines.push(Line::from("  2. Power it up; it will join the LoRaWAN network on its own."));
    lines.push(Line::from("  3. Watch for the first measurement on your console."));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" closes the installer."),
    ]));

    StepView::from(lines)
}
