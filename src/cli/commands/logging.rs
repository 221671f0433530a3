use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Named levels in ascending verbosity; the index doubles as the `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_level(level: &str) -> Result<u8, String> {
    // Bare numbers pass through as repetition counts.
    if let Ok(count) = level.parse::<u8>() {
        if count as usize <= LEVEL_NAMES.len() {
            return Ok(count);
        }
        return Err(format!("verbosity out of range: {count}"));
    }

    let wanted = level.to_lowercase();
    LEVEL_NAMES
        .iter()
        .position(|name| *name == wanted)
        .map(|index| index as u8)
        .ok_or_else(|| format!("unknown log level: {level}"))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| parse_level(level))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeatable (-vv) or named: error, warn, info, debug, trace")
            .env("ENSALUTI_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::parse_level;

    #[test]
    fn named_levels_map_to_their_index() {
        for (index, name) in ["error", "warn", "info", "debug", "trace"].iter().enumerate() {
            assert_eq!(parse_level(name), Ok(index as u8));
            assert_eq!(parse_level(&name.to_uppercase()), Ok(index as u8));
        }
    }

    #[test]
    fn numeric_counts_pass_through() {
        assert_eq!(parse_level("0"), Ok(0));
        assert_eq!(parse_level("5"), Ok(5));
        assert!(parse_level("6").is_err());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(parse_level("noisy").is_err());
        assert!(parse_level("").is_err());
    }
}
