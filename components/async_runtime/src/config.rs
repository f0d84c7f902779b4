//! Process-wide promise configuration.
//!
//! Two settings exist: the unhandled-rejection delay and the handler invoked
//! when a rejection goes unobserved. Both live in thread-local state, since a
//! thread is the unit of cooperative execution here.

use crate::scheduler;
use core_types::Value;
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Environment variable read by [`PromiseConfig::from_env`].
pub const DELAY_ENV_VAR: &str = "PROMISE_UNHANDLED_REJECTION_DELAY_MS";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid promise configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The environment variable held something other than an integer.
    #[error("{var} must be an integer number of milliseconds, got {value:?}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Raw value found
        value: String,
    },
}

/// How unobserved rejections are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionPolicy {
    /// Never report.
    Disabled,
    /// Report if still unobserved when the run queue next gets to it.
    NextFlush,
    /// Report if still unobserved after the delay.
    Delayed(Duration),
}

/// Promise configuration.
///
/// # Examples
///
/// ```
/// use async_runtime::{PromiseConfig, RejectionPolicy};
/// use std::time::Duration;
///
/// let config = PromiseConfig::from_json(r#"{ "unhandled_rejection_delay_ms": 250 }"#).unwrap();
/// assert_eq!(config.policy(), RejectionPolicy::Delayed(Duration::from_millis(250)));
/// assert_eq!(PromiseConfig::default().policy(), RejectionPolicy::NextFlush);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromiseConfig {
    /// Grace period in milliseconds: positive arms a timer, zero checks on the
    /// next run-queue pass, negative disables detection.
    pub unhandled_rejection_delay_ms: i64,
}

impl Default for PromiseConfig {
    fn default() -> Self {
        Self {
            unhandled_rejection_delay_ms: 0,
        }
    }
}

impl PromiseConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads [`DELAY_ENV_VAR`], falling back to the default when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(DELAY_ENV_VAR) {
            Ok(raw) => Self::from_env_value(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    fn from_env_value(raw: &str) -> Result<Self, ConfigError> {
        raw.trim()
            .parse()
            .map(|unhandled_rejection_delay_ms| Self {
                unhandled_rejection_delay_ms,
            })
            .map_err(|_| ConfigError::InvalidEnv {
                var: DELAY_ENV_VAR,
                value: raw.to_string(),
            })
    }

    /// The detection policy this delay selects.
    pub fn policy(&self) -> RejectionPolicy {
        match self.unhandled_rejection_delay_ms {
            ms if ms < 0 => RejectionPolicy::Disabled,
            0 => RejectionPolicy::NextFlush,
            ms => RejectionPolicy::Delayed(Duration::from_millis(ms.unsigned_abs())),
        }
    }
}

type RejectionHandler = Rc<dyn Fn(Value)>;

thread_local! {
    static CONFIG: Cell<PromiseConfig> = Cell::new(PromiseConfig::default());
    static HANDLER: RefCell<Option<RejectionHandler>> = const { RefCell::new(None) };
}

/// Installs `config` for promises on the current thread.
pub fn configure(config: PromiseConfig) {
    CONFIG.with(|c| c.set(config));
}

/// The active configuration.
pub fn current_config() -> PromiseConfig {
    CONFIG.with(Cell::get)
}

/// Shorthand for `configure` with only the delay set.
pub fn set_unhandled_rejection_delay(delay_ms: i64) {
    configure(PromiseConfig {
        unhandled_rejection_delay_ms: delay_ms,
    });
}

/// Replaces the handler called with unobserved rejection reasons.
pub fn set_unhandled_rejection_handler<F>(handler: F)
where
    F: Fn(Value) + 'static,
{
    HANDLER.with(|h| *h.borrow_mut() = Some(Rc::new(handler)));
}

/// Restores the default handler, which reports through
/// [`scheduler::report_uncaught`].
pub fn reset_unhandled_rejection_handler() {
    HANDLER.with(|h| *h.borrow_mut() = None);
}

pub(crate) fn handle_unhandled_rejection(reason: Value) {
    // Clone out so the handler may replace itself.
    let handler = HANDLER.with(|h| h.borrow().clone());
    match handler {
        Some(handler) => handler(reason),
        None => scheduler::report_uncaught(reason),
    }
}
