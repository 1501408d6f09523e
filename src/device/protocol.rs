//! Text protocol spoken with the identity device.
//!
//! Commands are `VERB:arg1,arg2,...` followed by a single `\n`. Responses are
//! one line of text. There is no escaping: an argument containing a comma
//! shifts every field after it on the device side, so callers must only pass
//! validated fields.

use crate::validation::{CitizenIdentity, MinimumAge, Pin, ValidationError};
use std::fmt;

/// Line terminator appended to every command.
pub const TERMINATOR: char = '\n';

/// Command verbs understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Store a citizen identity.
    SetId,
    /// Ask whether the stored identity meets a minimum age.
    CheckAge,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetId => "SET_ID",
            Self::CheckAge => "CHK_AGE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable device command.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    args: Vec<String>,
}

impl Command {
    /// Build a command from raw arguments.
    ///
    /// Arguments may not contain line breaks, which would end the command
    /// early on the wire.
    pub fn new<I, S>(verb: Verb, args: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if let Some(bad) = args.iter().find(|a| a.contains(['\n', '\r'])) {
            return Err(ValidationError::CommandArgument(bad.escape_debug().to_string()));
        }
        Ok(Self { verb, args })
    }

    /// `SET_ID:first,last,dob,national_id,sex,pin`
    pub fn set_id(identity: &CitizenIdentity) -> Self {
        Self {
            verb: Verb::SetId,
            args: vec![
                identity.first_name().to_string(),
                identity.last_name().to_string(),
                identity.date_of_birth_text(),
                identity.national_id().to_string(),
                identity.sex().to_string(),
                identity.pin().as_str().to_string(),
            ],
        }
    }

    /// `CHK_AGE:min_age,pin`
    pub fn check_age(min_age: MinimumAge, pin: &Pin) -> Self {
        Self {
            verb: Verb::CheckAge,
            args: vec![min_age.to_string(), pin.as_str().to_string()],
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The bytes sent to the device, terminator included.
    pub fn to_wire(&self) -> String {
        let mut wire = self.to_string();
        wire.push(TERMINATOR);
        wire
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.verb, self.args.join(","))
    }
}

// Arguments carry PINs; keep them out of debug output.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("verb", &self.verb)
            .field("args", &self.args.len())
            .finish()
    }
}

/// A classified response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK`: provisioning accepted.
    Ok,
    /// `VERIFIED`: the holder meets the minimum age.
    Verified,
    /// `DENIED`: the holder does not meet it, or the PIN was wrong.
    Denied,
    /// Nothing arrived within the exchange window.
    Empty,
    /// Any other line, kept verbatim.
    Unrecognized(String),
}

impl Response {
    /// Classify one line read from the device. Surrounding whitespace
    /// (including the `\r` the firmware sends) is ignored.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "OK" => Self::Ok,
            "VERIFIED" => Self::Verified,
            "DENIED" => Self::Denied,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The literal text of the response; empty for [`Response::Empty`].
    pub fn text(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::Verified => "VERIFIED",
            Self::Denied => "DENIED",
            Self::Empty => "",
            Self::Unrecognized(text) => text,
        }
    }

    /// Substring test against the literal text.
    ///
    /// The firmware may decorate its status words (`OK: stored`), so the
    /// provisioning path matches loosely.
    pub fn contains(&self, literal: &str) -> bool {
        !literal.is_empty() && self.text().contains(literal)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<no response>"),
            other => f.write_str(other.text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn identity() -> CitizenIdentity {
        CitizenIdentity::new("Ada", "Lovelace", "1990-12-10", "123456789", "F", "1234").unwrap()
    }

    #[test]
    fn test_set_id_wire_format() {
        let command = Command::set_id(&identity());
        assert_eq!(
            command.to_wire(),
            "SET_ID:Ada,Lovelace,1990-12-10,123456789,F,1234\n"
        );
        assert_eq!(command.verb(), Verb::SetId);
    }

    #[test]
    fn test_check_age_wire_format() {
        let pin = Pin::parse("9999").unwrap();
        let command = Command::check_age(MinimumAge::new(21).unwrap(), &pin);
        assert_eq!(command.to_string(), "CHK_AGE:21,9999");
        assert_eq!(command.to_wire(), "CHK_AGE:21,9999\n");
    }

    #[test]
    fn test_wire_has_single_trailing_newline() {
        for command in [
            Command::set_id(&identity()),
            Command::check_age(MinimumAge::ADULT, &Pin::parse("12345678").unwrap()),
        ] {
            let wire = command.to_wire();
            let (body, rest) = wire.split_at(wire.len() - 1);
            assert_eq!(rest, "\n");
            assert!(!body.contains('\n') && !body.contains('\r'));
            let (verb, args) = body.split_once(':').unwrap();
            assert_eq!(verb, command.verb().as_str());
            assert_eq!(args.split(',').count(), command.args().len());
        }
    }

    #[test]
    fn test_new_rejects_line_breaks() {
        assert!(Command::new(Verb::CheckAge, ["18", "12\n34"]).is_err());
        assert!(Command::new(Verb::CheckAge, ["18\r", "1234"]).is_err());
        let command = Command::new(Verb::CheckAge, ["18", "1234"]).unwrap();
        assert_eq!(command.to_string(), "CHK_AGE:18,1234");
    }

    #[test]
    fn test_debug_hides_arguments() {
        let command = Command::check_age(MinimumAge::ADULT, &Pin::parse("4321").unwrap());
        let debug = format!("{:?}", command);
        assert!(!debug.contains("4321"));
        assert!(debug.contains("CheckAge"));
    }

    #[test]
    fn test_response_classification() {
        assert_eq!(Response::parse("OK\r\n"), Response::Ok);
        assert_eq!(Response::parse("VERIFIED"), Response::Verified);
        assert_eq!(Response::parse(" DENIED "), Response::Denied);
        assert_eq!(Response::parse("\r\n"), Response::Empty);
        assert_eq!(
            Response::parse("ERR:LOCKED"),
            Response::Unrecognized("ERR:LOCKED".to_string())
        );
        // Exact matching only; decorated words stay unrecognized.
        assert_eq!(
            Response::parse("verified"),
            Response::Unrecognized("verified".to_string())
        );
    }

    #[test]
    fn test_response_contains() {
        assert!(Response::parse("OK: stored").contains("OK"));
        assert!(Response::Ok.contains("OK"));
        assert!(!Response::Empty.contains("OK"));
        assert!(!Response::Denied.contains(""));
        assert_eq!(Response::Empty.to_string(), "<no response>");
    }
}
