//! Quote-Aware Line Tokenizer
//!
//! Turns one line of client input into its arguments. The line is trimmed,
//! checked once by a small state machine that validates its structure, and
//! then split.
//!
//! ## Grammar
//!
//! ```text
//! line   := first ( WS+ token )* WS*
//! first  := BARE | '"' [A-Za-z0-9 ]+ '"'
//! token  := BARE | '"' [^"]* '"'
//! BARE   := [A-Za-z0-9]+
//! ```
//!
//! A double quote is only legal at the start of a token, and a closing quote
//! must be followed by whitespace or the end of the line. Anything else (a
//! stray quote, an unterminated quoted span, punctuation outside quotes)
//! rejects the whole line.
//!
//! ## Splitting
//!
//! Any quote character, single or double, flips the "inside quotes" flag and
//! is dropped. Each whitespace character outside quotes ends the current
//! token, so a run of separators yields empty tokens. The last token is kept
//! only if it is non-empty.
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::tokenize;
//!
//! let tokens = tokenize(r#"SET "a b" "c d""#).unwrap();
//! assert_eq!(tokens, vec!["SET", "a b", "c d"]);
//!
//! assert_eq!(tokenize(r#"SET k "it's""#).unwrap(), vec!["SET", "k", "its"]);
//! assert!(tokenize(r#"SET foo bar"in"quotes"#).is_err());
//! ```

use thiserror::Error;

const QUOTE: char = '"';
const SINGLE_QUOTE: char = '\'';

/// Reasons a line fails structural validation.
///
/// Clients never see these individually; every variant is reported as an
/// unknown command. They exist so the connection log can say why.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// Nothing but whitespace
    #[error("empty line")]
    Empty,

    /// A quoted span was never closed
    #[error("unbalanced quote")]
    UnbalancedQuote,

    /// A quote appeared inside a bare token, or a closing quote was
    /// immediately followed by another character
    #[error("unexpected quote at position {0}")]
    StrayQuote(usize),

    /// A character that is not allowed at this position
    #[error("unexpected character {ch:?} at position {pos}")]
    InvalidCharacter { ch: char, pos: usize },
}

/// Scanner position relative to the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between tokens, skipping whitespace
    Between,
    /// Inside an unquoted token
    Bare,
    /// Inside a quoted span
    Quoted,
    /// Just past a closing quote
    Closed,
}

/// Splits a command line into its arguments.
///
/// Quote characters are not part of any token. A trailing empty quoted
/// argument (`SET k ""`) is dropped, while one in the middle of the line is
/// kept as an empty string.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(TokenizeError::Empty);
    }

    validate(line)?;
    Ok(split(line))
}

/// Checks a trimmed, non-empty line against the grammar.
fn validate(line: &str) -> Result<(), TokenizeError> {
    let mut state = State::Between;
    // Whether the scanner is still on the command word
    let mut first = true;
    // Whether the current quoted span has any content
    let mut filled = false;

    for (pos, ch) in line.chars().enumerate() {
        state = match state {
            State::Between => {
                if ch.is_whitespace() {
                    State::Between
                } else if ch == QUOTE {
                    filled = false;
                    State::Quoted
                } else if ch.is_ascii_alphanumeric() {
                    State::Bare
                } else {
                    return Err(TokenizeError::InvalidCharacter { ch, pos });
                }
            }
            State::Bare => {
                if ch.is_whitespace() {
                    first = false;
                    State::Between
                } else if ch == QUOTE {
                    return Err(TokenizeError::StrayQuote(pos));
                } else if ch.is_ascii_alphanumeric() {
                    State::Bare
                } else {
                    return Err(TokenizeError::InvalidCharacter { ch, pos });
                }
            }
            State::Quoted => {
                if ch == QUOTE {
                    // The command word may be quoted, but never empty.
                    if first && !filled {
                        return Err(TokenizeError::StrayQuote(pos));
                    }
                    State::Closed
                } else if first && !(ch.is_ascii_alphanumeric() || ch == ' ') {
                    return Err(TokenizeError::InvalidCharacter { ch, pos });
                } else {
                    filled = true;
                    State::Quoted
                }
            }
            State::Closed => {
                if ch.is_whitespace() {
                    first = false;
                    State::Between
                } else if ch == QUOTE {
                    return Err(TokenizeError::StrayQuote(pos));
                } else {
                    return Err(TokenizeError::InvalidCharacter { ch, pos });
                }
            }
        };
    }

    match state {
        State::Quoted => Err(TokenizeError::UnbalancedQuote),
        _ => Ok(()),
    }
}

/// Splits a validated line into tokens.
fn split(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in line.chars() {
        if ch == QUOTE || ch == SINGLE_QUOTE {
            quoted = !quoted;
        } else if ch.is_whitespace() && !quoted {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> Vec<String> {
        tokenize(line).unwrap()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(ok("SET foo bar"), vec!["SET", "foo", "bar"]);
        assert_eq!(ok("PING"), vec!["PING"]);
    }

    #[test]
    fn test_quoted_value() {
        assert_eq!(
            ok(r#"SET foo "bar in quotes""#),
            vec!["SET", "foo", "bar in quotes"]
        );
    }

    #[test]
    fn test_quoted_key() {
        assert_eq!(
            ok(r#"SET "foo in quotes" bar"#),
            vec!["SET", "foo in quotes", "bar"]
        );
    }

    #[test]
    fn test_quoted_key_and_value() {
        assert_eq!(ok(r#"SET "a b" "c d""#), vec!["SET", "a b", "c d"]);
    }

    #[test]
    fn test_everything_quoted() {
        assert_eq!(
            ok(r#""SET" "foo in quotes" "bar in quotes""#),
            vec!["SET", "foo in quotes", "bar in quotes"]
        );
    }

    #[test]
    fn test_quoted_arguments_allow_punctuation() {
        assert_eq!(ok(r#"SET pi "3.14""#), vec!["SET", "pi", "3.14"]);
        assert_eq!(ok(r#"INCRBY n "-5""#), vec!["INCRBY", "n", "-5"]);
    }

    #[test]
    fn test_single_quote_toggles_and_is_dropped() {
        assert_eq!(ok(r#"SET k "it's""#), vec!["SET", "k", "its"]);
        // The apostrophe closes the span, so the space splits
        assert_eq!(
            ok(r#"SET k "it's fine""#),
            vec!["SET", "k", "its", "fine"]
        );
    }

    #[test]
    fn test_empty_quoted_argument() {
        assert_eq!(ok(r#"SET k """#), vec!["SET", "k"]);
        assert_eq!(ok(r#"SET "" v"#), vec!["SET", "", "v"]);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(ok("  GET foo \t"), vec!["GET", "foo"]);
        assert_eq!(ok("GET\tfoo\r\n"), vec!["GET", "foo"]);
    }

    #[test]
    fn test_repeated_whitespace_yields_empty_tokens() {
        assert_eq!(ok("GET  foo"), vec!["GET", "", "foo"]);
        assert_eq!(ok("SET k   v"), vec!["SET", "k", "", "", "v"]);
    }

    #[test]
    fn test_quote_inside_bare_token() {
        assert_eq!(
            tokenize(r#"SET foo bar"in"quotes"#),
            Err(TokenizeError::StrayQuote(11))
        );
    }

    #[test]
    fn test_unbalanced_quotes() {
        assert!(tokenize(r#"SET "foo in quotes "bar in quotes""#).is_err());
        assert_eq!(
            tokenize(r#"SET foo "bar"#),
            Err(TokenizeError::UnbalancedQuote)
        );
    }

    #[test]
    fn test_starting_in_quotes_then_running_on() {
        assert!(tokenize(r#""SET "foo in quotes "bar in quotes""#).is_err());
    }

    #[test]
    fn test_closing_quote_must_end_token() {
        assert!(tokenize(r#"SET "foo"bar baz"#).is_err());
    }

    #[test]
    fn test_bare_punctuation_rejected() {
        assert!(matches!(
            tokenize("SET pi 3.14"),
            Err(TokenizeError::InvalidCharacter { ch: '.', .. })
        ));
        assert!(tokenize("SET k 'v'").is_err());
    }

    #[test]
    fn test_command_word_restrictions() {
        assert!(tokenize(r#""" foo"#).is_err());
        assert!(tokenize(r#""GET!" foo"#).is_err());
        assert_eq!(ok(r#""my cmd" foo"#), vec!["my cmd", "foo"]);
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(tokenize(""), Err(TokenizeError::Empty));
        assert_eq!(tokenize("   "), Err(TokenizeError::Empty));
    }
}
