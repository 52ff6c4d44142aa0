//! Inbound chat command parsing
//!
//! Transport-agnostic: the chat integration hands over the raw message text
//! and gets a [`Command`] back.

use crate::error::{Error, Result};
use crate::model::TrackingQuery;

/// A recognised bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/check <billcode> <phone suffix>`
    Check(TrackingQuery),
}

impl Command {
    /// Parse message text
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Command))`: a well-formed command
    /// - `Ok(None)`: not addressed to this bot (plain text or unknown command)
    /// - `Err(Error::Validation)`: `/check` with wrong arity or bad arguments
    pub fn parse(text: &str) -> Result<Option<Self>> {
        let mut parts = text.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(None);
        };
        let Some(name) = head.strip_prefix('/') else {
            return Ok(None);
        };
        // Group chats address commands as /check@SomeBot
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        let args: Vec<&str> = parts.collect();

        match name.as_str() {
            "start" => Ok(Some(Command::Start)),
            "help" => Ok(Some(Command::Help)),
            "check" => {
                let [billcode, phone] = args.as_slice() else {
                    return Err(Error::validation(format!(
                        "/check takes 2 arguments, got {}",
                        args.len()
                    )));
                };
                Ok(Some(Command::Check(TrackingQuery::new(billcode, phone)?)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_with_two_arguments() {
        let cmd = Command::parse("/check 861396533622 6719").unwrap();
        assert_eq!(
            cmd,
            Some(Command::Check(TrackingQuery::new("861396533622", "6719").unwrap()))
        );
    }

    #[test]
    fn accepts_bot_mention_and_extra_spaces() {
        let cmd = Command::parse("  /check@ParcelBot   861396533622\t6719 ").unwrap();
        assert!(matches!(cmd, Some(Command::Check(_))));
    }

    #[test]
    fn wrong_arity_is_a_validation_error() {
        for text in ["/check", "/check 861396533622", "/check 861396533622 6719 extra"] {
            assert!(matches!(Command::parse(text), Err(Error::Validation(_))), "{}", text);
        }
    }

    #[test]
    fn short_phone_suffix_is_a_validation_error() {
        assert!(matches!(
            Command::parse("/check 861396533622 67"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn start_help_and_unknown() {
        assert_eq!(Command::parse("/start").unwrap(), Some(Command::Start));
        assert_eq!(Command::parse("/HELP").unwrap(), Some(Command::Help));
        assert_eq!(Command::parse("/weather").unwrap(), None);
        assert_eq!(Command::parse("hello there").unwrap(), None);
        assert_eq!(Command::parse("").unwrap(), None);
    }
}
