//! Renderer capability traits and error types
//!
//! The harvest core drives rendering sessions only through these traits, so
//! the retry and discovery logic is independent of any particular engine.

use crate::renderer::IdentityProfile;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving a rendering session
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("Connection error for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("No element matches '{0}'")]
    ElementNotFound(String),

    #[error("Operation not supported by this renderer: {0}")]
    Unsupported(&'static str),

    #[error("Session error: {0}")]
    Session(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RenderError {
    /// Returns true for timeouts, dropped connections and throttling statuses
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout,
        }
    }
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// When a navigation is considered finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// The initial document has been parsed
    ContentLoaded,

    /// The network has been quiet for a short period
    NetworkIdle,
}

/// One isolated rendering session
///
/// A session is owned by exactly one worker; nothing shares it.
#[async_trait]
pub trait Renderer: Send {
    /// Navigates to `url`, giving up after `timeout`
    async fn navigate(&mut self, url: &str, wait: WaitStrategy, timeout: Duration)
        -> RenderResult<()>;

    /// Waits until an element matches `selector`
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> RenderResult<()>;

    /// Returns the full rendered markup of the current page
    async fn content(&mut self) -> RenderResult<String>;

    /// Returns the URL the session ended up on after the last navigation
    fn current_url(&self) -> Option<String>;

    /// Selects the option with `value` in the `<select>` matching `selector`
    async fn select_option(&mut self, selector: &str, value: &str) -> RenderResult<()>;

    async fn click(&mut self, selector: &str) -> RenderResult<()>;

    async fn hover(&mut self, selector: &str) -> RenderResult<()>;

    /// Moves the pointer to viewport coordinates
    async fn move_pointer(&mut self, x: u32, y: u32) -> RenderResult<()>;

    /// Scrolls the page vertically by `delta` pixels
    async fn scroll_by(&mut self, delta: i32) -> RenderResult<()>;

    /// Returns the text content of every element matching `selector`
    async fn option_labels(&mut self, selector: &str) -> RenderResult<Vec<String>>;

    /// Tears the session down
    async fn close(&mut self) -> RenderResult<()>;
}

/// Creates isolated rendering sessions
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Renderer + 'static;

    /// Opens a fresh session presenting `profile`
    async fn open(&self, profile: &IdentityProfile) -> RenderResult<Self::Session>;
}
