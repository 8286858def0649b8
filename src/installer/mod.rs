//! The concrete installer flow: Connect → Install → Configuration → Finish.
//!
//! Steps close over a shared [`InstallState`] and a [`DeviceLink`]; the
//! wizard engine itself stays ignorant of both.

use std::sync::{Arc, Mutex};

use ratatui::text::Text;

use crate::device::schema::{self, DeviceConfig};
use crate::device::{DeviceInfo, DeviceLink};
use crate::wizard::Step;

pub mod steps;


/// View type every installer step renders to.
pub type StepView = Text<'static>;

pub type SharedState = Arc<Mutex<InstallState>>;

/// Positions of the steps in the wizard, in construction order.
pub const STEP_CONNECT: usize = 0;
pub const STEP_INSTALL: usize = 1;
pub const STEP_CONFIGURATION: usize = 2;
pub const STEP_FINISH: usize = 3;

/// Mutable context shared between the steps and the key handler.
pub struct InstallState {
    /// Whether the device link has been opened.
    pub connected: bool,
    /// Firmware versions offered for installation.
    pub available_versions: Vec<String>,
    /// Highlighted entry in the version list.
    pub version_cursor: usize,
    /// Version the user committed to installing.
    pub target_version: Option<String>,
    /// Device snapshot loaded after connecting (and after flashing).
    pub device_info: Option<DeviceInfo>,
    /// Editable copy of the device configuration.
    pub draft: DeviceConfig,
    /// Highlighted field in the configuration editor.
    pub field_cursor: usize,
    /// Last failure surfaced to the user; cleared on the next success.
    pub last_error: Option<String>,
}

impl InstallState {
    pub fn new(available_versions: Vec<String>) -> Self {
        Self {
            connected: false,
            available_versions,
            version_cursor: 0,
            target_version: None,
            device_info: None,
            draft: schema::latest().defaults(),
            field_cursor: 0,
            last_error: None,
        }
    }

    pub fn shared(available_versions: Vec<String>) -> SharedState {
        Arc::new(Mutex::new(Self::new(available_versions)))
    }

    /// Move the version highlight down, wrapping.
    pub fn version_next(&mut self) {
        let len = self.available_versions.len();
        if len > 0 {
            self.version_cursor = (self.version_cursor + 1) % len;
        }
    }

    /// Move the version highlight up, wrapping.
    pub fn version_prev(&mut self) {
        let len = self.available_versions.len();
        if len > 0 {
            self.version_cursor = if self.version_cursor == 0 {
                len - 1
            } else {
                self.version_cursor - 1
            };
        }
    }

    /// Commit the highlighted version as the installation target.
    pub fn select_highlighted_version(&mut self) {
        self.target_version = self.available_versions.get(self.version_cursor).cloned();
    }

    pub fn field_next(&mut self) {
        let len = schema::latest().fields().len();
        self.field_cursor = (self.field_cursor + 1) % len;
    }

    pub fn field_prev(&mut self) {
        let len = schema::latest().fields().len();
        self.field_cursor = if self.field_cursor == 0 {
            len - 1
        } else {
            self.field_cursor - 1
        };
    }

    fn highlighted_field(&self) -> &'static str {
        schema::latest().fields()[self.field_cursor]
    }

    /// Append a character to the highlighted config field.
    pub fn field_push(&mut self, c: char) {
        let field = self.highlighted_field();
        let mut value = self.draft.get(field).unwrap_or_default().to_string();
        value.push(c);
        self.draft.set(field, value);
    }

    /// Delete the last character of the highlighted config field.
    pub fn field_pop(&mut self) {
        let field = self.highlighted_field();
        let mut value = self.draft.get(field).unwrap_or_default().to_string();
        value.pop();
        self.draft.set(field, value);
    }

    pub fn draft_complete(&self) -> bool {
        self.draft.is_complete_for(schema::latest())
    }
}

/// Build the installer's step list in order.
pub fn build_steps(state: SharedState, link: Arc<dyn DeviceLink>) -> Vec<Step<StepView>> {
    vec![
        steps::connect::step(state.clone(), link.clone()),
        steps::install::step(state.clone(), link.clone()),
        steps::configuration::step(state.clone(), link),
        steps::finish::step(state),
    ]
}
