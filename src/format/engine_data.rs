//! Text engine data parser.
//!
//! Type layers store their rich-text model in a PostScript-like markup:
//!
//! ```text
//! <<
//!     /EngineDict
//!     <<
//!         /Editor << /Text (\xfe\xff...) >>
//!     >>
//!     /Values [ 1.0 0.0 0.0 0.0 ]
//! >>
//! ```
//!
//! Dictionaries are `<< /Key value ... >>`, arrays are `[ ... ]`, strings are
//! parenthesized with backslash escapes and usually carry a UTF-16BE byte
//! order mark. Bare words are numbers, `true`/`false` or `/Names`.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::EngineDataError;

/// Container nesting the parser follows before giving up.
const MAX_NESTING: usize = 256;

/// UTF-16BE byte order mark that prefixes most engine-data strings.
const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];

// =============================================================================
// Value Tree
// =============================================================================

/// A parsed engine-data value.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    /// Key/value pairs in file order
    Dict(Vec<(String, EngineValue)>),
    Array(Vec<EngineValue>),
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// A `/Name` appearing as a value
    Name(String),
}

impl EngineValue {
    /// Look up a key when this value is a dictionary.
    pub fn get(&self, key: &str) -> Option<&EngineValue> {
        match self {
            EngineValue::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The string content of a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EngineValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for EngineValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EngineValue::Dict(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            EngineValue::Array(values) => values.serialize(serializer),
            EngineValue::Integer(v) => serializer.serialize_i64(*v),
            EngineValue::Float(v) => serializer.serialize_f64(*v),
            EngineValue::Bool(v) => serializer.serialize_bool(*v),
            EngineValue::String(s) | EngineValue::Name(s) => serializer.serialize_str(s),
        }
    }
}

/// A parsed engine-data document. The root is always a dictionary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EngineData {
    pub root: EngineValue,
}

impl EngineData {
    /// Parse an engine-data byte run.
    ///
    /// Leading and trailing whitespace (including NUL padding) is ignored.
    /// Anything else after the root dictionary is an error.
    pub fn parse(data: &[u8]) -> Result<Self, EngineDataError> {
        let mut parser = Parser {
            lexer: Lexer { data, pos: 0 },
        };

        let root = match parser.lexer.next_token()? {
            Some(Token::DictStart) => parser.parse_dict(0)?,
            Some(other) => return Err(parser.unexpected(other)),
            None => return Err(EngineDataError::UnexpectedEnd),
        };

        if let Some(token) = parser.lexer.next_token()? {
            return Err(parser.unexpected(token));
        }

        Ok(EngineData { root })
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&EngineValue> {
        self.root.get(key)
    }
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    DictStart,
    DictEnd,
    ArrayStart,
    ArrayEnd,
    Name(String),
    String(String),
    Word(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::DictStart => "<<".to_string(),
            Token::DictEnd => ">>".to_string(),
            Token::ArrayStart => "[".to_string(),
            Token::ArrayEnd => "]".to_string(),
            Token::Name(n) => format!("/{}", n),
            Token::String(s) => format!("({})", s),
            Token::Word(w) => w.clone(),
        }
    }
}

struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(b: u8) -> bool {
    is_space(b) || matches!(b, b'/' | b'[' | b']' | b'<' | b'>' | b'(' | b')')
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_space(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_delimiter(b)) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.pos]).into_owned()
    }

    /// Read a parenthesized string; the opening paren is already consumed.
    fn read_string(&mut self) -> Result<String, EngineDataError> {
        let mut raw = Vec::new();
        loop {
            let b = self.peek().ok_or(EngineDataError::UnexpectedEnd)?;
            self.pos += 1;
            match b {
                b')' => break,
                b'\\' => {
                    let escaped = self.peek().ok_or(EngineDataError::UnexpectedEnd)?;
                    self.pos += 1;
                    raw.push(escaped);
                }
                _ => raw.push(b),
            }
        }

        if raw.starts_with(&UTF16_BOM) {
            let units: Vec<u16> = raw[2..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Ok(String::from_utf16_lossy(&units))
        } else {
            Ok(raw.iter().map(|&b| b as char).collect())
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, EngineDataError> {
        self.skip_space();
        let offset = self.pos;
        let Some(b) = self.peek() else {
            return Ok(None);
        };

        let token = match b {
            b'<' | b'>' => {
                if self.data.get(self.pos + 1) != Some(&b) {
                    return Err(EngineDataError::UnexpectedToken {
                        offset,
                        token: (b as char).to_string(),
                    });
                }
                self.pos += 2;
                if b == b'<' {
                    Token::DictStart
                } else {
                    Token::DictEnd
                }
            }
            b'[' => {
                self.pos += 1;
                Token::ArrayStart
            }
            b']' => {
                self.pos += 1;
                Token::ArrayEnd
            }
            b'/' => {
                self.pos += 1;
                Token::Name(self.read_word())
            }
            b'(' => {
                self.pos += 1;
                Token::String(self.read_string()?)
            }
            b')' => {
                return Err(EngineDataError::UnexpectedToken {
                    offset,
                    token: ")".to_string(),
                })
            }
            _ => Token::Word(self.read_word()),
        };
        Ok(Some(token))
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn unexpected(&self, token: Token) -> EngineDataError {
        EngineDataError::UnexpectedToken {
            offset: self.lexer.pos,
            token: token.describe(),
        }
    }

    fn expect_token(&mut self) -> Result<Token, EngineDataError> {
        self.lexer
            .next_token()?
            .ok_or(EngineDataError::UnexpectedEnd)
    }

    /// Parse dictionary entries; the opening `<<` is already consumed.
    fn parse_dict(&mut self, depth: usize) -> Result<EngineValue, EngineDataError> {
        if depth >= MAX_NESTING {
            return Err(EngineDataError::NestingTooDeep(MAX_NESTING));
        }

        let mut entries = Vec::new();
        loop {
            let key = match self.expect_token()? {
                Token::DictEnd => break,
                Token::Name(name) => name,
                other => return Err(self.unexpected(other)),
            };
            let value = match self.expect_token()? {
                Token::DictEnd => return Err(EngineDataError::MissingValue(key)),
                token => self.parse_value(token, depth + 1)?,
            };
            entries.push((key, value));
        }
        Ok(EngineValue::Dict(entries))
    }

    /// Parse array elements; the opening `[` is already consumed.
    fn parse_array(&mut self, depth: usize) -> Result<EngineValue, EngineDataError> {
        if depth >= MAX_NESTING {
            return Err(EngineDataError::NestingTooDeep(MAX_NESTING));
        }

        let mut values = Vec::new();
        loop {
            match self.expect_token()? {
                Token::ArrayEnd => break,
                token => values.push(self.parse_value(token, depth + 1)?),
            }
        }
        Ok(EngineValue::Array(values))
    }

    fn parse_value(&mut self, token: Token, depth: usize) -> Result<EngineValue, EngineDataError> {
        match token {
            Token::DictStart => self.parse_dict(depth),
            Token::ArrayStart => self.parse_array(depth),
            Token::Name(name) => Ok(EngineValue::Name(name)),
            Token::String(s) => Ok(EngineValue::String(s)),
            Token::Word(word) => {
                parse_word(&word).ok_or_else(|| self.unexpected(Token::Word(word)))
            }
            other => Err(self.unexpected(other)),
        }
    }
}

fn parse_word(word: &str) -> Option<EngineValue> {
    match word {
        "true" => return Some(EngineValue::Bool(true)),
        "false" => return Some(EngineValue::Bool(false)),
        _ => {}
    }
    if let Ok(v) = word.parse::<i64>() {
        return Some(EngineValue::Integer(v));
    }
    // Writers emit forms like `.5` and `-.25`, which f64 parsing accepts
    word.parse::<f64>().ok().map(EngineValue::Float)
}

// =============================================================================
// Tests
// =============================================================================
