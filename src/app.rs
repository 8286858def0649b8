//! Application event loop: owns the wizard, routes keys, draws frames.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::device::{DeviceLink, SimulatedLink};
use crate::installer::{
    self, InstallState, SharedState, StepView, STEP_CONFIGURATION, STEP_INSTALL,
};
use crate::ui::{self, terminal_guard::TerminalGuard, Screen};
use crate::wizard::{StepWizard, WizardError};

pub struct App {
    config: Config,
    state: SharedState,
    wizard: StepWizard<StepView>,
    /// Transient status line, e.g. a blocked gate.
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let state = InstallState::shared(config.firmware.versions.clone());
        // No serial backend is wired up in this build; the installer
        // drives the simulated device behind the same trait the real
        // transport will implement.
        let link: Arc<dyn DeviceLink> = Arc::new(SimulatedLink::factory_fresh());
        let wizard = StepWizard::new(installer::build_steps(state.clone(), link));
        tracing::debug!(baud_rate = config.serial.baud_rate, "serial defaults");

        Self {
            config,
            state,
            wizard,
            status: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let _guard = TerminalGuard::new()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(self.config.ui.refresh_rate_ms);

        while !self.should_quit {
            self.draw(&mut terminal, false)?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key, &mut terminal).await?;
                    }
                }
            }
        }

        tracing::info!("installer closed");
        Ok(())
    }

    fn draw<B: Backend>(&self, terminal: &mut Terminal<B>, busy: bool) -> Result<()> {
        let error = self.state.lock().unwrap().last_error.clone();
        terminal.draw(|frame| {
            ui::render(
                frame,
                &Screen {
                    wizard: &self.wizard,
                    status: self.status.as_deref(),
                    error: error.as_deref(),
                    busy,
                },
            );
        })?;
        Ok(())
    }

    async fn handle_key<B: Backend>(
        &mut self,
        key: KeyEvent,
        terminal: &mut Terminal<B>,
    ) -> Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Enter => self.advance(terminal).await?,
            KeyCode::Esc => {
                if self.wizard.index() == 0 {
                    self.should_quit = true;
                } else {
                    self.wizard.retreat();
                    self.status = None;
                    self.state.lock().unwrap().last_error = None;
                }
            }
            _ => self.handle_step_key(key),
        }
        Ok(())
    }

    /// Keys that only mean something on a particular step.
    fn handle_step_key(&mut self, key: KeyEvent) {
        match self.wizard.index() {
            STEP_INSTALL => {
                let mut st = self.state.lock().unwrap();
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => st.version_prev(),
                    KeyCode::Down | KeyCode::Char('j') => st.version_next(),
                    KeyCode::Char(' ') => {
                        st.select_highlighted_version();
                        drop(st);
                        self.status = None;
                    }
                    KeyCode::Char('q') => self.should_quit = true,
                    _ => {}
                }
            }
            STEP_CONFIGURATION => {
                let mut st = self.state.lock().unwrap();
                match key.code {
                    KeyCode::Tab | KeyCode::Down => st.field_next(),
                    KeyCode::BackTab | KeyCode::Up => st.field_prev(),
                    KeyCode::Backspace => st.field_pop(),
                    // Text entry; credentials are hex strings but free
                    // typing is allowed, the gate only checks presence.
                    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                        st.field_push(c);
                    }
                    _ => {}
                }
            }
            _ => {
                if key.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
        }
    }

    async fn advance<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        // Show the busy line while the pre-transition hook runs; the loop
        // is suspended on it.
        self.draw(terminal, true)?;

        match self.wizard.advance().await {
            Ok(()) => {
                self.status = None;
                tracing::info!(step = self.wizard.current().title(), "advanced");
            }
            Err(WizardError::GateBlocked(step)) => {
                self.status = Some(format!("\"{step}\" is not finished yet"));
            }
            Err(WizardError::PreNextFailed { step, cause }) => {
                tracing::warn!(%step, error = %cause, "step hook failed");
                self.state.lock().unwrap().last_error = Some(cause.to_string());
            }
            // A duplicate request while one is pending; drop it.
            Err(WizardError::AdvanceInProgress) => {}
        }
        Ok(())
    }
}
