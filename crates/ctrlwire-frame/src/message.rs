use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::codec::encode_frame;
use crate::error::{FrameError, ParseError, Result};

/// Command and reply kinds carried in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verb {
    Get,
    Set,
    Trap,
    GetReply,
    SetReply,
    TrapReply,
    Error,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Set => "SET",
            Verb::Trap => "TRAP",
            Verb::GetReply => "GET_REPLY",
            Verb::SetReply => "SET_REPLY",
            Verb::TrapReply => "TRAP_REPLY",
            Verb::Error => "ERROR",
        }
    }

    /// The successful reply verb for a request verb.
    pub fn expected_reply(self) -> Option<Verb> {
        match self {
            Verb::Get => Some(Verb::GetReply),
            Verb::Set => Some(Verb::SetReply),
            _ => None,
        }
    }

    /// True for the verbs a GET/SET may be answered with.
    pub fn is_reply(self) -> bool {
        matches!(self, Verb::GetReply | Verb::SetReply | Verb::Error)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Verb::Get),
            "SET" => Ok(Verb::Set),
            "TRAP" => Ok(Verb::Trap),
            "GET_REPLY" => Ok(Verb::GetReply),
            "SET_REPLY" => Ok(Verb::SetReply),
            "TRAP_REPLY" => Ok(Verb::TrapReply),
            "ERROR" => Ok(Verb::Error),
            other => Err(ParseError::UnknownVerb(other.to_string())),
        }
    }
}

/// A decoded control message.
///
/// For [`Verb::Error`] the text after the verb is the failure reason; it is
/// stored in `value` and `variable` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub verb: Verb,
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        verb: Verb,
        variable: impl Into<String>,
        value: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            verb,
            variable: variable.into(),
            value: value.map(str::to_string),
        }
    }

    /// An `ERROR` reply for transaction `id`.
    pub fn error(id: impl Into<String>, reason: &str) -> Self {
        Self::new(id, Verb::Error, String::new(), Some(reason))
    }

    /// The failure reason of an `ERROR` message.
    pub fn error_reason(&self) -> Option<&str> {
        match self.verb {
            Verb::Error => self.value.as_deref(),
            _ => None,
        }
    }

    pub fn is_notification(&self) -> bool {
        is_notification(self)
    }

    /// Render the unframed text payload, validating token rules.
    pub fn to_payload(&self) -> Result<String> {
        check_token("transaction id", &self.id)?;
        let value = self.value.as_deref().filter(|v| !v.is_empty());

        if self.verb == Verb::Error {
            let reason = value.ok_or(FrameError::MissingValue(Verb::Error))?;
            return Ok(format!("{} {} {}", self.id, self.verb, reason));
        }

        check_token("variable", &self.variable)?;
        match (self.verb, value) {
            (Verb::Get, Some(_)) => Err(FrameError::UnexpectedValue(Verb::Get)),
            (verb @ (Verb::Set | Verb::GetReply), None) => Err(FrameError::MissingValue(verb)),
            (verb, Some(value)) => Ok(format!("{} {} {} {}", self.id, verb, self.variable, value)),
            (verb, None) => Ok(format!("{} {} {}", self.id, verb, self.variable)),
        }
    }

    /// Render and frame the message.
    pub fn encode(&self) -> Result<Bytes> {
        let payload = self.to_payload()?;
        let mut buf = BytesMut::new();
        encode_frame(payload.as_bytes(), &mut buf)?;
        Ok(buf.freeze())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.verb)?;
        if !self.variable.is_empty() {
            write!(f, " {}", self.variable)?;
        }
        if let Some(value) = &self.value {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

/// Build a framed command: `<id> <VERB> <variable>[ <value>]`.
pub fn encode_command(verb: Verb, id: &str, variable: &str, value: Option<&str>) -> Result<Bytes> {
    Message::new(id, verb, variable, value).encode()
}

/// Decode a frame payload into a [`Message`].
///
/// Tokens are separated by single spaces. The value is everything after the
/// variable, verbatim, so it may itself contain spaces.
pub fn decode_message(payload: &[u8]) -> std::result::Result<Message, ParseError> {
    if payload.is_empty() {
        return Err(ParseError::Empty);
    }
    let text = std::str::from_utf8(payload).map_err(|_| ParseError::NotUtf8)?;

    let (id, rest) = next_token(text).ok_or(ParseError::MissingToken("transaction id"))?;
    let (verb, rest) = next_token(rest).ok_or(ParseError::MissingToken("verb"))?;
    let verb: Verb = verb.parse()?;

    if verb == Verb::Error {
        if rest.is_empty() {
            return Err(ParseError::MissingValue(Verb::Error));
        }
        return Ok(Message::error(id, rest));
    }

    let (variable, rest) = next_token(rest).ok_or(ParseError::MissingToken("variable"))?;
    let value = (!rest.is_empty()).then_some(rest);

    match (verb, value) {
        (Verb::Get, Some(_)) => Err(ParseError::UnexpectedValue(Verb::Get)),
        (verb @ (Verb::Set | Verb::GetReply), None) => Err(ParseError::MissingValue(verb)),
        _ => Ok(Message::new(id, verb, variable, value)),
    }
}

/// Unsolicited notifications are never replies to a pending command.
pub fn is_notification(message: &Message) -> bool {
    message.verb == Verb::Trap
}

fn next_token(s: &str) -> Option<(&str, &str)> {
    let (token, rest) = s.split_once(' ').unwrap_or((s, ""));
    (!token.is_empty()).then_some((token, rest))
}

fn check_token(what: &'static str, token: &str) -> Result<()> {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(FrameError::InvalidToken {
            what,
            token: token.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::extract_frame;

    fn unframe(wire: Bytes) -> Vec<u8> {
        let mut buf = BytesMut::from(wire.as_ref());
        let frame = extract_frame(&mut buf).unwrap();
        assert!(buf.is_empty());
        frame.payload.to_vec()
    }

    #[test]
    fn encode_get_command() {
        let wire = encode_command(Verb::Get, "1", "foo.bar", None).unwrap();
        assert_eq!(&wire[..2], &[0x00, 13]);
        assert_eq!(unframe(wire), b"1 GET foo.bar");
    }

    #[test]
    fn encode_set_command() {
        let wire = encode_command(Verb::Set, "42", "subscriber.create", Some("001010000000001"))
            .unwrap();
        assert_eq!(unframe(wire), b"42 SET subscriber.create 001010000000001");
    }

    #[test]
    fn encode_rejects_bad_tokens() {
        let err = encode_command(Verb::Get, "1", "foo bar", None).unwrap_err();
        assert!(matches!(err, FrameError::InvalidToken { what: "variable", .. }));

        let err = encode_command(Verb::Get, "", "foo", None).unwrap_err();
        assert!(matches!(err, FrameError::InvalidToken { what: "transaction id", .. }));
    }

    #[test]
    fn encode_enforces_value_rules() {
        let err = encode_command(Verb::Get, "1", "foo", Some("x")).unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedValue(Verb::Get)));

        let err = encode_command(Verb::Set, "1", "foo", None).unwrap_err();
        assert!(matches!(err, FrameError::MissingValue(Verb::Set)));

        let err = encode_command(Verb::Set, "1", "foo", Some("")).unwrap_err();
        assert!(matches!(err, FrameError::MissingValue(Verb::Set)));

        let err = Message::new("1", Verb::GetReply, "foo", None).encode().unwrap_err();
        assert!(matches!(err, FrameError::MissingValue(Verb::GetReply)));
    }

    #[test]
    fn encode_error_reply() {
        let wire = Message::error("9", "Command not found").encode().unwrap();
        assert_eq!(unframe(wire), b"9 ERROR Command not found");
    }

    #[test]
    fn decode_get_reply() {
        let msg = decode_message(b"1 GET_REPLY foo.bar hello").unwrap();
        assert_eq!(msg, Message::new("1", Verb::GetReply, "foo.bar", Some("hello")));
        assert!(!msg.is_notification());
    }

    #[test]
    fn decode_keeps_value_spaces_verbatim() {
        let msg = decode_message(b"3 GET_REPLY subscriber.list one  two three").unwrap();
        assert_eq!(msg.value.as_deref(), Some("one  two three"));
    }

    #[test]
    fn decode_trap_is_notification() {
        let msg = decode_message(b"0 TRAP subscriber.alarm raised").unwrap();
        assert_eq!(msg.verb, Verb::Trap);
        assert_eq!(msg.id, "0");
        assert!(is_notification(&msg));
    }

    #[test]
    fn decode_error_reason() {
        let msg = decode_message(b"5 ERROR Value failed verification.").unwrap();
        assert_eq!(msg.verb, Verb::Error);
        assert!(msg.variable.is_empty());
        assert_eq!(msg.error_reason(), Some("Value failed verification."));
    }

    #[test]
    fn error_word_in_value_is_not_an_error() {
        let msg = decode_message(b"5 GET_REPLY alarm.ERROR ERROR").unwrap();
        assert_eq!(msg.verb, Verb::GetReply);
        assert_eq!(msg.error_reason(), None);
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert_eq!(decode_message(b""), Err(ParseError::Empty));
        assert_eq!(decode_message(&[0xFF, 0xFE]), Err(ParseError::NotUtf8));
        assert_eq!(
            decode_message(b"1"),
            Err(ParseError::MissingToken("verb"))
        );
        assert_eq!(
            decode_message(b"1 GET"),
            Err(ParseError::MissingToken("variable"))
        );
        assert_eq!(
            decode_message(b"1 FETCH foo"),
            Err(ParseError::UnknownVerb("FETCH".to_string()))
        );
        assert_eq!(
            decode_message(b"1 GET foo extra"),
            Err(ParseError::UnexpectedValue(Verb::Get))
        );
        assert_eq!(
            decode_message(b"1 SET foo"),
            Err(ParseError::MissingValue(Verb::Set))
        );
        assert_eq!(
            decode_message(b"1 GET_REPLY foo"),
            Err(ParseError::MissingValue(Verb::GetReply))
        );
        assert_eq!(
            decode_message(b"1 ERROR"),
            Err(ParseError::MissingValue(Verb::Error))
        );
    }

    #[test]
    fn encoded_command_decodes_back() {
        let wire = encode_command(Verb::Set, "17", "subscriber.by-imsi-1.msisdn", Some("555"))
            .unwrap();
        let msg = decode_message(&unframe(wire)).unwrap();
        assert_eq!(msg.to_string(), "17 SET subscriber.by-imsi-1.msisdn 555");
    }

    #[test]
    fn verb_reply_mapping() {
        assert_eq!(Verb::Get.expected_reply(), Some(Verb::GetReply));
        assert_eq!(Verb::Set.expected_reply(), Some(Verb::SetReply));
        assert_eq!(Verb::Trap.expected_reply(), None);
        assert!(Verb::Error.is_reply());
        assert!(!Verb::TrapReply.is_reply());
        assert_eq!("SET_REPLY".parse::<Verb>(), Ok(Verb::SetReply));
    }
}
