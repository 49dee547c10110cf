//! Tracing setup for the Crossfire signaling stack.
//!
//! The signaling core never touches a global log level. Components log
//! through `tracing` spans they own (one per connection, one per router),
//! and the host process decides where those events go by installing a
//! subscriber once at startup.
//!
//! # Usage
//!
//! ```ignore
//! use crossfire_core::tracing::{init_tracing, TracingConfig};
//!
//! // Interactive debugging of a local relay
//! init_tracing(TracingConfig::cli_debug()).expect("failed to initialize tracing");
//!
//! // Production relay with structured output
//! init_tracing(TracingConfig::relay()).expect("failed to initialize tracing");
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

/// Target prefix shared by every crate in the workspace.
const TARGET_PREFIX: &str = "crossfire";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] TryInitError),

    #[error("invalid log filter directive: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, human oriented.
    #[default]
    Pretty,
    Compact,
    /// JSON lines, one event per line, with the current span attached.
    Json,
}

/// Which span lifecycle transitions are logged as events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpanEvents {
    #[default]
    Off,
    /// Open and close, i.e. one pair per connection.
    Lifecycle,
    /// Every enter and exit as well. Noisy; for debugging scheduling.
    Full,
}

impl SpanEvents {
    fn as_fmt_span(self) -> FmtSpan {
        match self {
            Self::Off => FmtSpan::NONE,
            Self::Lifecycle => FmtSpan::NEW | FmtSpan::CLOSE,
            Self::Full => FmtSpan::FULL,
        }
    }
}

/// Subscriber settings for [`init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for `crossfire*` targets when neither `filter` nor `RUST_LOG`
    /// is set.
    pub level: Level,
    pub format: TracingOutputFormat,
    pub span_events: SpanEvents,
    /// Annotate events with file and line.
    pub source_location: bool,
    /// Only honoured by the compact format.
    pub timestamps: bool,
    /// Explicit filter directive. Takes precedence over `RUST_LOG`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Pretty,
            span_events: SpanEvents::Off,
            source_location: false,
            timestamps: true,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose, compact output for running a relay by hand.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            format: TracingOutputFormat::Compact,
            source_location: true,
            timestamps: false,
            ..Self::default()
        }
    }

    /// JSON output with connection span lifecycles, for a deployed relay.
    #[must_use]
    pub fn relay() -> Self {
        Self {
            format: TracingOutputFormat::Json,
            span_events: SpanEvents::Lifecycle,
            source_location: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_span_events(mut self, span_events: SpanEvents) -> Self {
        self.span_events = span_events;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Directive used when neither `filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{TARGET_PREFIX}={}", self.level)
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.filter {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn fmt_layer(&self) -> BoxedLayer {
        let base = fmt::layer()
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_span_events(self.span_events.as_fmt_span());

        match self.format {
            TracingOutputFormat::Pretty => base.pretty().boxed(),
            TracingOutputFormat::Compact if self.timestamps => base.compact().boxed(),
            TracingOutputFormat::Compact => base.compact().without_time().boxed(),
            TracingOutputFormat::Json => base.json().with_current_span(true).boxed(),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Call once, from the binary that hosts the relay.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or if the
/// filter directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let layer = config.fmt_layer().with_filter(config.env_filter()?);
    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = TracingConfig::default();
        assert_eq!(default.level, Level::INFO);
        assert_eq!(default.format, TracingOutputFormat::Pretty);
        assert_eq!(default.span_events, SpanEvents::Off);
        assert!(default.filter.is_none());

        let cli = TracingConfig::cli_debug();
        assert_eq!(cli.level, Level::DEBUG);
        assert_eq!(cli.format, TracingOutputFormat::Compact);
        assert!(cli.source_location);
        assert!(!cli.timestamps);

        let relay = TracingConfig::relay();
        assert_eq!(relay.level, Level::INFO);
        assert_eq!(relay.format, TracingOutputFormat::Json);
        assert_eq!(relay.span_events, SpanEvents::Lifecycle);
    }

    #[test]
    fn default_directive_covers_workspace_targets() {
        let config = TracingConfig::default().with_level(Level::WARN);
        assert_eq!(config.default_directive(), "crossfire=WARN");
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::default().with_env_filter("crossfire=notalevel");
        assert!(matches!(config.env_filter(), Err(TracingError::EnvFilter(_))));

        let config = TracingConfig::default().with_env_filter("crossfire_server=trace");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn span_event_mapping() {
        assert_eq!(SpanEvents::Off.as_fmt_span(), FmtSpan::NONE);
        assert_eq!(
            SpanEvents::Lifecycle.as_fmt_span(),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
        assert_eq!(SpanEvents::Full.as_fmt_span(), FmtSpan::FULL);
    }

    #[test]
    fn every_format_builds_a_layer() {
        for format in [
            TracingOutputFormat::Pretty,
            TracingOutputFormat::Compact,
            TracingOutputFormat::Json,
        ] {
            let _ = TracingConfig::default().with_format(format).fmt_layer();
        }
        let _ = TracingConfig::cli_debug().fmt_layer();
    }
}
