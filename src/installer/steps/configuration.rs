//! Configuration step: edit the LoRaWAN credentials and write them back.
//!
//! Gated until the device has been read and every schema field has a
//! value; leaving the step writes each field over the link.

use std::sync::Arc;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::device::{self, schema, DeviceLink};
use crate::installer::{SharedState, StepView};
use crate::wizard::Step;

pub(crate) fn step(state: SharedState, link: Arc<dyn DeviceLink>) -> Step<StepView> {
    let render_state = state.clone();
    let gate_state = state.clone();

    Step::new("Configuration", move || render(&render_state))
        .gated(move || {
            let st = gate_state.lock().unwrap();
            st.device_info.is_some() && st.draft_complete()
        })
        .before_next(move || write_back(state.clone(), link.clone()))
}

async fn write_back(state: SharedState, link: Arc<dyn DeviceLink>) -> anyhow::Result<()> {
    let draft = state.lock().unwrap().draft.clone();
    device::write_configuration(link.as_ref(), &draft).await?;
    tracing::info!("configuration written to device");

    let mut st = state.lock().unwrap();
    if let Some(info) = st.device_info.as_mut() {
        info.config = draft;
    }
    st.last_error = None;
    Ok(())
}

fn render(state: &SharedState) -> StepView {
    let st = state.lock().unwrap();

    let mut lines = vec![
        Line::from("Enter the LoRaWAN credentials for this sensor:"),
        Line::from(""),
    ];

    for (i, field) in schema::latest().fields().iter().enumerate() {
        let highlighted = i == st.field_cursor;
        let marker = if highlighted { "> " } else { "  " };
        let value = st.draft.get(field).unwrap_or_default();

        let value_span = if value.is_empty() {
            Span::styled("<empty>", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(value.to_string(), Style::default().fg(Color::Green))
        };
        let name_style = if highlighted {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{field:>8}: "), name_style),
            value_span,
        ]));
    }

    lines.push(Line::from(""));
    if !st.draft_complete() {
        lines.push(Line::from(Span::styled(
            "All fields are required before continuing.",
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" next field  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" write to device."),
    ]));

    StepView::from(lines)
}
