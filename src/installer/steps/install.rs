//! Install step: pick a firmware version and flash it.
//!
//! Gated until a target version has been committed; after flashing, the
//! device is re-read and its configuration migrated to the latest schema
//! so the editor always works on current fields.

use std::sync::Arc;

use anyhow::Context;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::device::{self, schema, DeviceLink};
use crate::installer::{SharedState, StepView};
use crate::wizard::Step;

pub(crate) fn step(state: SharedState, link: Arc<dyn DeviceLink>) -> Step<StepView> {
    let render_state = state.clone();
    let gate_state = state.clone();

    Step::new("Install", move || render(&render_state))
        .gated(move || gate_state.lock().unwrap().target_version.is_some())
        .before_next(move || install_and_migrate(state.clone(), link.clone()))
}

async fn install_and_migrate(state: SharedState, link: Arc<dyn DeviceLink>) -> anyhow::Result<()> {
    let version = state
        .lock()
        .unwrap()
        .target_version
        .clone()
        .context("no firmware version selected")?;

    tracing::info!(%version, "installing firmware");
    link.install_firmware(&version).await?;

    let mut info = device::load_device_info(link.as_ref()).await?;
    schema::migrate(&mut info, schema::latest().version())?;

    let mut st = state.lock().unwrap();
    st.draft = info.config.clone();
    st.device_info = Some(info);
    st.last_error = None;
    Ok(())
}

fn render(state: &SharedState) -> StepView {
    let st = state.lock().unwrap();

    let mut lines = vec![Line::from(vec![
        Span::raw("Device firmware: "),
        Span::styled(
            st.device_info
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |i| format!("v{}", i.firmware_version)),
            Style::default().fg(Color::Cyan),
        ),
    ])];
    lines.push(Line::from(""));
    lines.push(Line::from("Select the firmware version to install:"));

    for (i, version) in st.available_versions.iter().enumerate() {
        let highlighted = i == st.version_cursor;
        let selected = st.target_version.as_deref() == Some(version.as_str());

        let marker = if highlighted { "> " } else { "  " };
        let tag = if selected { "  [selected]" } else { "" };
        let style = if selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else if highlighted {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };

        lines.push(Line::from(Span::styled(
            format!("{marker}v{version}{tag}"),
            style,
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Space", Style::default().fg(Color::Yellow)),
        Span::raw(" select  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" flash the selected version."),
    ]));

    StepView::from(lines)
}
