use anyhow::{anyhow, Context};
use serde::Serialize;
use slog::{debug, info, warn, Logger};
use std::process::Command;
use std::time::Duration;

use crate::AlertSet;

pub const ALERT_TITLE: &str = "Weather Alerts";
pub const ALERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Two-state alert indicator shown by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum IndicatorState {
    #[default]
    Normal,
    Warning,
}

#[cfg_attr(test, mockall::automock)]
pub trait AlertIndicator: Send {
    fn set_state(&mut self, state: IndicatorState);
}

/// Fire-and-forget desktop notification target
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> Result<(), anyhow::Error>;
}

/// Applies the side effects of an evaluated [`AlertSet`]: flips the
/// indicator and sends at most one notification per evaluation.
pub struct AlertDispatcher {
    logger: Logger,
    indicator: Box<dyn AlertIndicator>,
    notifier: Box<dyn NotificationSink>,
}

impl AlertDispatcher {
    pub fn new(
        logger: Logger,
        indicator: Box<dyn AlertIndicator>,
        notifier: Box<dyn NotificationSink>,
    ) -> Self {
        Self {
            logger,
            indicator,
            notifier,
        }
    }

    pub fn dispatch(&mut self, alerts: &AlertSet) -> IndicatorState {
        if alerts.is_empty() {
            self.indicator.set_state(IndicatorState::Normal);
            debug!(self.logger, "no active alerts");
            return IndicatorState::Normal;
        }

        self.indicator.set_state(IndicatorState::Warning);
        info!(self.logger, "raising {} weather alert(s)", alerts.len());
        if let Err(e) = self
            .notifier
            .notify(ALERT_TITLE, &alerts.notification_body(), ALERT_TIMEOUT)
        {
            warn!(self.logger, "failed to send alert notification: {}", e);
        }
        IndicatorState::Warning
    }
}

/// Indicator for terminal hosts; remembers the state and logs transitions
pub struct StatusIndicator {
    logger: Logger,
    state: IndicatorState,
}

impl StatusIndicator {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            state: IndicatorState::Normal,
        }
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }
}

impl AlertIndicator for StatusIndicator {
    fn set_state(&mut self, state: IndicatorState) {
        if self.state != state {
            info!(self.logger, "alert indicator: {:?} -> {:?}", self.state, state);
        }
        self.state = state;
    }
}

/// Sends notifications through an external program such as `notify-send`
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: String) -> Self {
        Self { program }
    }
}

impl NotificationSink for CommandNotifier {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> Result<(), anyhow::Error> {
        let status = Command::new(&self.program)
            .arg("-t")
            .arg(timeout.as_millis().to_string())
            .arg(title)
            .arg(body)
            .status()
            .with_context(|| format!("failed to run {}", self.program))?;
        if !status.success() {
            return Err(anyhow!("{} exited with {}", self.program, status));
        }
        Ok(())
    }
}

/// Prints notifications to stderr
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, title: &str, body: &str, _timeout: Duration) -> Result<(), anyhow::Error> {
        eprintln!("== {} ==", title);
        for line in body.lines() {
            eprintln!("  {}", line);
        }
        Ok(())
    }
}
