//! Connect step: open the device link and read what is on the sensor.

use std::sync::Arc;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::device::{self, DeviceLink};
use crate::installer::{SharedState, StepView};
use crate::wizard::Step;

pub(crate) fn step(state: SharedState, link: Arc<dyn DeviceLink>) -> Step<StepView> {
    let render_state = state.clone();

    Step::new("Connect", move || render(&render_state))
        .before_next(move || connect_and_load(state.clone(), link.clone()))
}

async fn connect_and_load(state: SharedState, link: Arc<dyn DeviceLink>) -> anyhow::Result<()> {
    link.connect().await?;
    let info = device::load_device_info(link.as_ref()).await?;
    tracing::info!(firmware = %info.firmware_version, "device connected");

    let mut st = state.lock().unwrap();
    st.connected = true;
    st.draft = info.config.clone();
    st.device_info = Some(info);
    st.last_error = None;
    Ok(())
}

fn render(state: &SharedState) -> StepView {
    let st = state.lock().unwrap();

    let status = if st.connected {
        let firmware = st
            .device_info
            .as_ref()
            .map_or_else(String::new, |info| format!(" (firmware v{})", info.firmware_version));
        Line::from(Span::styled(
            format!("Connected{firmware}"),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            "Not connected",
            Style::default().fg(Color::DarkGray),
        ))
    };

    StepView::from(vec![
        Line::from("Plug the sensor into a USB port."),
        Line::from(""),
        status,
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(" opens the connection and reads the device."),
        ]),
    ])
}
