//! FTP reply model and command helpers

use ftpmirror_types::Error;
use std::borrow::Cow;
use std::fmt;

/// First digit of a reply code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 1xx: the action is starting, expect another reply
    PositivePreliminary,
    /// 2xx: the action completed
    PositiveCompletion,
    /// 3xx: more information is needed
    PositiveIntermediate,
    /// 4xx: the action failed but may succeed if retried
    TransientNegative,
    /// 5xx: the action failed
    PermanentNegative,
}

impl ReplyClass {
    /// Classify a three digit reply code
    pub const fn of(code: u16) -> Option<Self> {
        match code / 100 {
            1 => Some(Self::PositivePreliminary),
            2 => Some(Self::PositiveCompletion),
            3 => Some(Self::PositiveIntermediate),
            4 => Some(Self::TransientNegative),
            5 => Some(Self::PermanentNegative),
            _ => None,
        }
    }
}

/// A complete, possibly multi-line, server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three digit reply code
    pub code: u16,
    /// All reply lines, including the codes, joined by `\n`
    pub text: String,
}

impl Reply {
    /// Create a reply
    pub fn new<S: Into<String>>(code: u16, text: S) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Reply class, derived from the first digit
    pub fn class(&self) -> Option<ReplyClass> {
        ReplyClass::of(self.code)
    }

    /// 1xx
    pub fn is_preliminary(&self) -> bool {
        self.class() == Some(ReplyClass::PositivePreliminary)
    }

    /// 1xx, 2xx or 3xx
    pub fn is_positive(&self) -> bool {
        (100..400).contains(&self.code)
    }

    /// 5xx
    pub fn is_permanent_negative(&self) -> bool {
        self.class() == Some(ReplyClass::PermanentNegative)
    }

    /// Text of the last line without the code
    pub fn message(&self) -> &str {
        let last = self.text.lines().last().unwrap_or_default();
        last.get(4..).unwrap_or_default().trim()
    }

    /// Turn this reply into an error
    pub fn into_error(self) -> Error {
        let message = self.message().to_string();
        Error::reply(self.code, message)
    }

    /// `Ok(self)` if the code is one of `accepted`, an error otherwise
    pub fn expect(self, accepted: &[u16]) -> ftpmirror_types::Result<Self> {
        if accepted.contains(&self.code) {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// `Ok(self)` for any positive completion, an error otherwise
    pub fn expect_completion(self) -> ftpmirror_types::Result<Self> {
        if self.class() == Some(ReplyClass::PositiveCompletion) {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Position of a line within a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLine {
    /// `ddd text`: a single line reply, or the last line of a multi-line one
    Last(u16),
    /// `ddd-text`: the first line of a multi-line reply
    First(u16),
    /// Any other line inside a multi-line reply
    Continuation,
}

/// Classify one line of a reply
pub fn parse_reply_line(line: &str) -> ReplyLine {
    let bytes = line.as_bytes();
    if bytes.len() >= 3 && bytes[..3].iter().all(u8::is_ascii_digit) {
        let code = bytes[..3]
            .iter()
            .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
        match bytes.get(3) {
            None | Some(b' ') => return ReplyLine::Last(code),
            Some(b'-') => return ReplyLine::First(code),
            _ => {}
        }
    }
    ReplyLine::Continuation
}

/// Command text safe to write to logs
pub fn loggable(command: &str) -> Cow<'_, str> {
    let is_password = command
        .get(..5)
        .map_or(false, |verb| verb.eq_ignore_ascii_case("PASS "));
    if is_password {
        Cow::Borrowed("PASS ****")
    } else {
        Cow::Borrowed(command)
    }
}
