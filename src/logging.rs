use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn level(verbosity: i8) -> Level {
    match verbosity {
        i8::MIN..=-2 => Level::ERROR,
        -1 => Level::WARN,
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber: compact output on stderr, plus plain
/// text appended to `log_file` when given. `RUST_LOG` overrides the
/// verbosity flags.
pub fn init(verbosity: i8, log_file: Option<&Path>) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level(verbosity)).into())
        .from_env_lossy();
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let mut file_error = None;
    let file = log_file.and_then(|path| match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(tracing_subscriber::fmt::layer().with_writer(Arc::new(file)).with_ansi(false)),
        Err(e) => {
            file_error = Some((path.to_path_buf(), e));
            None
        },
    });

    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::registry().with(filter).with(stderr).with(file).try_init();
    if let Some((path, e)) = file_error {
        tracing::warn!(path = %path.display(), error = %e, "could not open log file; logging to stderr only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-5, Level::ERROR)]
    #[case(-1, Level::WARN)]
    #[case(0, Level::INFO)]
    #[case(1, Level::DEBUG)]
    #[case(3, Level::TRACE)]
    fn test_level(#[case] verbosity: i8, #[case] expected: Level) {
        assert_eq!(level(verbosity), expected);
    }
}
