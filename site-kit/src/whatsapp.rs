//! `wa.me` deep links used in place of a form backend.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::{fmt, str::FromStr};

/// Characters `encodeURIComponent` leaves alone; everything else is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WhatsAppError {
    #[error("WhatsApp number is empty")]
    EmptyNumber,
    #[error("invalid character {0:?} in WhatsApp number")]
    InvalidCharacter(char),
}

/// A chat target in international format without `+`, e.g. `5492346515265`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppLink {
    number: String,
}

impl WhatsAppLink {
    /// Accepts the number as people usually write it (`+54 9 2346 51-5265`)
    /// and keeps only the digits.
    pub fn new(number: &str) -> Result<Self, WhatsAppError> {
        let mut digits = String::with_capacity(number.len());
        for c in number.chars() {
            match c {
                '0'..='9' => digits.push(c),
                '+' | ' ' | '-' | '(' | ')' => {}
                other => return Err(WhatsAppError::InvalidCharacter(other)),
            }
        }

        if digits.is_empty() {
            return Err(WhatsAppError::EmptyNumber);
        }

        Ok(Self { number: digits })
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Chat link with a pre-filled message; the message is always
    /// percent-encoded.
    pub fn url(&self, message: &str) -> String {
        format!(
            "https://wa.me/{}?text={}",
            self.number,
            encode_uri_component(message)
        )
    }
}

impl FromStr for WhatsAppLink {
    type Err = WhatsAppError;

    fn from_str(number: &str) -> Result<Self, Self::Err> {
        Self::new(number)
    }
}

impl fmt::Display for WhatsAppLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://wa.me/{}", self.number)
    }
}
