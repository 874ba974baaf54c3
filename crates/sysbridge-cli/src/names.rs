//! Symbolic names for facilities, severities and open options, as accepted
//! by `logger(1)`.

use sysbridge_sys::{
    LOG_ALERT, LOG_AUTH, LOG_AUTHPRIV, LOG_CONS, LOG_CRIT, LOG_CRON, LOG_DAEMON, LOG_DEBUG,
    LOG_EMERG, LOG_ERR, LOG_INFO, LOG_KERN, LOG_LOCAL0, LOG_LOCAL1, LOG_LOCAL2, LOG_LOCAL3,
    LOG_LOCAL4, LOG_LOCAL5, LOG_LOCAL6, LOG_LOCAL7, LOG_LPR, LOG_MAIL, LOG_NDELAY, LOG_NEWS,
    LOG_NOTICE, LOG_NOWAIT, LOG_ODELAY, LOG_PERROR, LOG_PID, LOG_SYSLOG, LOG_USER, LOG_UUCP,
    LOG_WARNING, MAX_LEVEL, MIN_LEVEL,
};

const FACILITIES: &[(&str, i32)] = &[
    ("kern", LOG_KERN),
    ("user", LOG_USER),
    ("mail", LOG_MAIL),
    ("daemon", LOG_DAEMON),
    ("auth", LOG_AUTH),
    ("syslog", LOG_SYSLOG),
    ("lpr", LOG_LPR),
    ("news", LOG_NEWS),
    ("uucp", LOG_UUCP),
    ("cron", LOG_CRON),
    ("authpriv", LOG_AUTHPRIV),
    ("local0", LOG_LOCAL0),
    ("local1", LOG_LOCAL1),
    ("local2", LOG_LOCAL2),
    ("local3", LOG_LOCAL3),
    ("local4", LOG_LOCAL4),
    ("local5", LOG_LOCAL5),
    ("local6", LOG_LOCAL6),
    ("local7", LOG_LOCAL7),
];

const LEVELS: &[(&str, i32)] = &[
    ("emerg", LOG_EMERG),
    ("panic", LOG_EMERG),
    ("alert", LOG_ALERT),
    ("crit", LOG_CRIT),
    ("err", LOG_ERR),
    ("error", LOG_ERR),
    ("warning", LOG_WARNING),
    ("warn", LOG_WARNING),
    ("notice", LOG_NOTICE),
    ("info", LOG_INFO),
    ("debug", LOG_DEBUG),
];

const OPTIONS: &[(&str, i32)] = &[
    ("pid", LOG_PID),
    ("cons", LOG_CONS),
    ("odelay", LOG_ODELAY),
    ("ndelay", LOG_NDELAY),
    ("nowait", LOG_NOWAIT),
    ("perror", LOG_PERROR),
];

fn lookup(table: &[(&str, i32)], name: &str) -> Option<i32> {
    let name = name.trim().to_ascii_lowercase();
    let name = name.strip_prefix("log_").unwrap_or(&name);
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, value)| *value)
}

fn choices(table: &[(&str, i32)]) -> String {
    table
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a facility name (`daemon`, `local3`) or its raw numeric code.
pub(crate) fn parse_facility(value: &str) -> Result<i32, String> {
    if let Ok(code) = value.trim().parse::<i32>() {
        return Ok(code);
    }
    lookup(FACILITIES, value)
        .ok_or_else(|| format!("unknown facility `{value}`; expected one of {}", choices(FACILITIES)))
}

/// Parse a severity name (`info`, `err`) or a level number.
pub(crate) fn parse_level(value: &str) -> Result<i32, String> {
    if let Ok(level) = value.trim().parse::<i32>() {
        return if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            Ok(level)
        } else {
            Err(format!("level {level} is outside {MIN_LEVEL}..={MAX_LEVEL}"))
        };
    }
    lookup(LEVELS, value)
        .ok_or_else(|| format!("unknown level `{value}`; expected one of {}", choices(LEVELS)))
}

/// Parse one open option flag (`pid`, `ndelay`).
pub(crate) fn parse_option(value: &str) -> Result<i32, String> {
    lookup(OPTIONS, value)
        .ok_or_else(|| format!("unknown option `{value}`; expected one of {}", choices(OPTIONS)))
}

/// Name of `level`, for reports.
pub(crate) fn level_name(level: i32) -> &'static str {
    LEVELS
        .iter()
        .find(|(_, value)| *value == level)
        .map_or("unknown", |(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facilities_accept_names_and_numbers() {
        assert_eq!(parse_facility("daemon"), Ok(LOG_DAEMON));
        assert_eq!(parse_facility("LOG_LOCAL3"), Ok(LOG_LOCAL3));
        assert_eq!(parse_facility(" User "), Ok(LOG_USER));
        assert_eq!(parse_facility("8"), Ok(8));
        assert!(parse_facility("nonsense").unwrap_err().contains("local7"));
    }

    #[test]
    fn levels_accept_names_and_numbers() {
        assert_eq!(parse_level("info"), Ok(LOG_INFO));
        assert_eq!(parse_level("warn"), Ok(LOG_WARNING));
        assert_eq!(parse_level("LOG_ERR"), Ok(LOG_ERR));
        assert_eq!(parse_level("0"), Ok(0));
        assert_eq!(parse_level("7"), Ok(7));
        assert!(parse_level("8").is_err());
        assert!(parse_level("-1").is_err());
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn options_are_flags() {
        assert_eq!(parse_option("pid"), Ok(LOG_PID));
        assert_eq!(parse_option("NDELAY"), Ok(LOG_NDELAY));
        assert!(parse_option("fast").is_err());
    }

    #[test]
    fn level_names_round_trip() {
        assert_eq!(level_name(LOG_EMERG), "emerg");
        assert_eq!(level_name(LOG_DEBUG), "debug");
        assert_eq!(level_name(42), "unknown");
    }
}
