//! Subscriber setup for the command line front end
//!
//! The library only emits spans and events; installing a subscriber is left
//! to the binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format for CLI logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Coloured compact output for terminals
    #[default]
    Console,
    /// Plain compact output for CI logs and pipes
    Compact,
    /// JSON lines
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug, Default)]
pub struct TracingConfig {
    /// Number of `-v` flags
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Explicit filter directives, overriding `verbosity`
    pub env_filter: Option<String>,
    /// Correlates all events of one CLI invocation
    pub session_id: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directives for the configured verbosity
    ///
    /// HTTP internals stay at `warn` until `-vvv`.
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn,tshirt_image_gen=info",
            1 => "warn,tshirt_image_gen=debug",
            2 => "info,tshirt_image_gen=trace",
            _ => "trace",
        }
    }

    /// Install the global subscriber
    ///
    /// `RUST_LOG` wins over both `env_filter` and `verbosity` when set.
    ///
    /// # Errors
    /// - Invalid filter directives
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let directives = self
            .env_filter
            .as_deref()
            .unwrap_or_else(|| self.verbosity_to_filter());
        let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))?;

        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr);
                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "Session started");
        }

        Ok(())
    }
}

/// Initialize tracing with CLI defaults and a fresh session id
///
/// # Errors
/// - See [`TracingConfig::init`]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let format = if std::env::var_os("CI").is_some() {
        TracingFormat::Compact
    } else {
        TracingFormat::Console
    };

    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_session_id(session_id.clone())
        .init()?;
    Ok(session_id)
}

/// Span helpers for CLI commands
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering one CLI invocation
    pub fn session(session_id: &str, command: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            command = %command
        )
    }

    pub fn file_processing(input: &str, format: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "file_processing",
            input = %input,
            format = %format
        )
    }

    pub fn design(prompt: &str, color: &str) -> Span {
        tracing::span!(Level::INFO, "design", prompt = %prompt, color = %color)
    }
}
