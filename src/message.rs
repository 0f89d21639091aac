use serde::{Deserialize, Serialize};

/// One chat line, as written to the converted JSON and as stored in the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub datestamp: String,
    pub channel: String,
    pub username: String,
    pub message: String,
}

impl LogRecord {
    pub fn new(datestamp: String, channel: &str, username: &str, message: &str) -> LogRecord {
        LogRecord {
            datestamp,
            channel: channel.to_string(),
            username: username.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "[{ts}] {user}: {message}",
            ts = self.datestamp,
            user = self.username,
            message = self.message,
        )
    }
}

/// Builds `<date>T<HH:MM>.<NN>`.
///
/// Source logs only carry minutes, so `seq` (a run-wide counter) is appended to keep
/// records orderable. It is padded to two digits and simply grows wider past 99.
pub fn datestamp(date: &str, time: &str, seq: u32) -> String {
    format!("{}T{}.{:02}", date, time, seq)
}

/// Result of matching a single raw log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine<'a> {
    Matched {
        time: &'a str,
        username: &'a str,
        message: &'a str,
    },
    /// Joins, parts, notices, wrapped lines and anything else without `[HH:MM] <nick> `
    Unmatched,
}

impl<'a> ParsedLine<'a> {
    pub fn is_matched(&self) -> bool {
        match self {
            ParsedLine::Matched { .. } => true,
            ParsedLine::Unmatched => false,
        }
    }
}

pub mod ubuntu {
    use super::*;
    use crate::error::Result;
    use regex::Regex;

    // irclogs.ubuntu.com lines look like:
    // [13:07] <alice> hello world
    const LINE_PATTERN: &str = r"^\[(\d\d:\d\d)\] <(\w+)> (.*)$";

    pub struct LineParser {
        pattern: Regex,
    }

    impl LineParser {
        pub fn new() -> Result<LineParser> {
            Ok(LineParser { pattern: Regex::new(LINE_PATTERN)? })
        }

        pub fn parse_line<'a>(&self, line: &'a str) -> ParsedLine<'a> {
            match self.pattern.captures(line) {
                Some(caps) => match (caps.get(1), caps.get(2), caps.get(3)) {
                    (Some(time), Some(username), Some(message)) => ParsedLine::Matched {
                        time: time.as_str(),
                        username: username.as_str(),
                        message: message.as_str(),
                    },
                    _ => ParsedLine::Unmatched,
                },
                None => ParsedLine::Unmatched,
            }
        }

        /// Lazily parses every line of `text`, including the ones that do not match.
        pub fn parse_lines<'s>(&'s self, text: &'s str) -> impl Iterator<Item = ParsedLine<'s>> + 's {
            text.lines().map(move |line| self.parse_line(line))
        }
    }

}
