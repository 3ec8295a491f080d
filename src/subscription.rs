//! Subscription descriptors parsed from configuration entries
//!
//! Each configured entry is a string of the form
//! `"<signum> <channel> <connectionstring>"`. Tokens are separated by spaces
//! or tabs; any token may be double-quoted to carry embedded whitespace,
//! which connection strings in keyword/value form need.

use crate::errors::BridgeError;

/// One configured channel subscription.
///
/// All fields are fixed for the process lifetime. Runtime connection state
/// lives on the owning [`ConnectionHandle`](crate::core::ConnectionHandle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    /// Signal number raised for every notification on the channel.
    pub signum: u8,
    /// Bare channel name as configured.
    pub channel: String,
    /// The subscription statement, precomputed as `"LISTEN <channel>"`.
    pub listen_command: String,
    /// Connection string handed verbatim to the client library.
    pub connection_string: String,
}

impl SubscriptionSpec {
    /// Parses a `"<signum> <channel> <connectionstring>"` entry.
    ///
    /// The signal token is parsed best-effort: a token that is not a valid
    /// signal number silently becomes signal 0. Tokens after the connection
    /// string are ignored. Fewer than three tokens is a fatal configuration
    /// error.
    pub fn parse(entry: &str) -> Result<Self, BridgeError> {
        let mut tokens = split_quoted(entry);
        if tokens.len() < 3 {
            return Err(BridgeError::InvalidSubscription {
                entry: entry.to_string(),
            });
        }

        let connection_string = std::mem::take(&mut tokens[2]);
        let channel = std::mem::take(&mut tokens[1]);
        Ok(Self {
            signum: tokens[0].parse().unwrap_or(0),
            listen_command: format!("LISTEN {}", channel),
            channel,
            connection_string,
        })
    }
}

/// Splits an entry on spaces and tabs, honoring double quotes.
///
/// Quoted regions keep their whitespace; the quotes themselves are stripped.
/// An unterminated quote runs to the end of the entry.
pub(crate) fn split_quoted(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                // An empty quoted region still yields a token.
                in_quotes = !in_quotes;
                in_token = true;
            }
            ' ' | '\t' if !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }

    tokens
}
