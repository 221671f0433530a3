use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;
use tracing::Level;

/// `-v` repetition (or a named level from the environment) to a tracing
/// level; zero means quiet, anything past `-vvvv` stays TRACE.
const fn verbosity_to_level(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Parse the command line, bring up logging/telemetry, and hand back the
/// action the binary should run.
///
/// # Errors
///
/// Returns an error if telemetry initialization or argument dispatch fails.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let level = verbosity_to_level(matches.get_count(commands::logging::ARG_VERBOSITY));
    telemetry::init(level)?;

    dispatch::handler(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(verbosity_to_level(0), None);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(verbosity_to_level(1), Some(Level::WARN));
        assert_eq!(verbosity_to_level(2), Some(Level::INFO));
        assert_eq!(verbosity_to_level(3), Some(Level::DEBUG));
        assert_eq!(verbosity_to_level(4), Some(Level::TRACE));
        assert_eq!(verbosity_to_level(42), Some(Level::TRACE));
    }
}
