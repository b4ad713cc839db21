//! PDF Object Parser
//!
//! Builds [`Object`] values from the token stream, including `n g R`
//! references, indirect object wrappers and stream bodies.

use super::lexer::{find_bytes, is_whitespace, Lexer, Token};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Arrays and dictionaries nested deeper than this are rejected
const MAX_NESTING_DEPTH: usize = 256;

/// Resolves an indirect `/Length` value to an integer
pub type LengthLookup<'r> = &'r dyn Fn(ObjectId) -> Option<i64>;

/// Parser for PDF objects positioned anywhere in a byte slice
pub struct ObjectParser<'a, 'r> {
    lexer: Lexer<'a>,
    lengths: Option<LengthLookup<'r>>,
}

impl<'a, 'r> ObjectParser<'a, 'r> {
    /// Create a parser that starts reading at `position`
    pub fn new(data: &'a [u8], position: usize) -> Self {
        Self {
            lexer: Lexer::at(data, position),
            lengths: None,
        }
    }

    /// Use `lookup` to resolve stream lengths given as indirect references
    pub fn with_length_lookup(mut self, lookup: LengthLookup<'r>) -> Self {
        self.lengths = Some(lookup);
        self
    }

    /// Next token that is not a comment
    pub fn next_token(&mut self) -> ParseResult<Token> {
        loop {
            match self.lexer.next_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    pub fn push_token(&mut self, token: Token) {
        self.lexer.push_token(token);
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    /// Parse a single direct object
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        let token = self.next_token()?;
        self.parse_from_token(token, 0)
    }

    /// Parse `n g obj <object> endobj`
    pub fn parse_indirect_object(&mut self) -> ParseResult<(ObjectId, Object)> {
        let number = self.expect_integer("object number")?;
        let generation = self.expect_integer("generation number")?;
        match self.next_token()? {
            Token::Obj => {}
            other => return Err(unexpected("'obj'", &other)),
        }

        let id = match (u32::try_from(number), u16::try_from(generation)) {
            (Ok(n), Ok(g)) => ObjectId::new(n, g),
            _ => {
                return Err(ParseError::SyntaxError {
                    position: self.position(),
                    message: format!("object identifier {number} {generation} out of range"),
                })
            }
        };

        let object = self.parse_object()?;

        match self.next_token()? {
            Token::EndObj => {}
            other => {
                // Missing endobj is common enough in the wild to accept
                tracing::warn!(%id, found = ?other, "object not terminated by endobj");
            }
        }

        Ok((id, object))
    }

    fn expect_integer(&mut self, what: &str) -> ParseResult<i64> {
        match self.next_token()? {
            Token::Integer(value) => Ok(value),
            other => Err(unexpected(what, &other)),
        }
    }

    fn parse_from_token(&mut self, token: Token, depth: usize) -> ParseResult<Object> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::SyntaxError {
                position: self.position(),
                message: format!("objects nested deeper than {MAX_NESTING_DEPTH} levels"),
            });
        }

        match token {
            Token::Null => Ok(Object::Null),
            Token::Boolean(b) => Ok(Object::Boolean(b)),
            Token::Integer(n) => self.integer_or_reference(n),
            Token::Real(r) => Ok(Object::Real(r)),
            Token::String(s) => Ok(Object::String(s)),
            Token::Name(n) => Ok(Object::Name(n)),
            Token::ArrayStart => self.parse_array(depth),
            Token::DictStart => self.parse_dictionary_or_stream(depth),
            other => Err(unexpected("PDF object", &other)),
        }
    }

    /// An integer may be the first of the three tokens `n g R`
    fn integer_or_reference(&mut self, number: i64) -> ParseResult<Object> {
        let second = self.lexer.next_token()?;
        if let Token::Integer(generation) = second {
            let third = self.lexer.next_token()?;
            if third == Token::R {
                return match (u32::try_from(number), u16::try_from(generation)) {
                    (Ok(n), Ok(g)) => Ok(Object::Reference(ObjectId::new(n, g))),
                    _ => Err(ParseError::SyntaxError {
                        position: self.position(),
                        message: format!("reference {number} {generation} R out of range"),
                    }),
                };
            }
            self.lexer.push_token(third);
        }
        self.lexer.push_token(second);
        Ok(Object::Integer(number))
    }

    fn parse_array(&mut self, depth: usize) -> ParseResult<Object> {
        let mut items = Vec::new();
        loop {
            match self.next_token()? {
                Token::ArrayEnd => break,
                Token::Eof => {
                    return Err(ParseError::SyntaxError {
                        position: self.position(),
                        message: "Unterminated array".to_string(),
                    })
                }
                token => items.push(self.parse_from_token(token, depth + 1)?),
            }
        }
        Ok(Object::Array(items))
    }

    fn parse_dictionary_or_stream(&mut self, depth: usize) -> ParseResult<Object> {
        let mut dict = Dictionary::new();
        loop {
            match self.next_token()? {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let token = self.next_token()?;
                    let value = self.parse_from_token(token, depth + 1)?;
                    dict.set(key, value);
                }
                other => return Err(unexpected("dictionary key", &other)),
            }
        }

        match self.next_token()? {
            Token::Stream => Ok(Object::Stream(self.parse_stream_body(dict)?)),
            other => {
                self.lexer.push_token(other);
                Ok(Object::Dictionary(dict))
            }
        }
    }

    /// Read stream bytes that follow the `stream` keyword.
    ///
    /// The declared `/Length` is trusted when `endstream` follows it;
    /// otherwise the data runs up to the next `endstream` keyword.
    fn parse_stream_body(&mut self, dict: Dictionary) -> ParseResult<Stream> {
        if let Err(err) = self.lexer.read_stream_eol() {
            tracing::warn!(error = %err, "stream keyword not followed by an end-of-line");
        }
        let data = self.lexer.data();
        let start = self.lexer.position();

        let declared = match dict.get("Length") {
            Some(Object::Integer(n)) => Some(*n),
            Some(Object::Reference(id)) => self.lengths.and_then(|lookup| lookup(*id)),
            _ => None,
        };

        let exact = declared
            .and_then(|len| usize::try_from(len).ok())
            .and_then(|len| start.checked_add(len))
            .filter(|&end| end <= data.len())
            .and_then(|end| endstream_after(data, end).map(|keyword| (end, keyword)));

        let (end, keyword) = match exact {
            Some(found) => found,
            None => {
                let keyword = find_bytes(data, b"endstream", start).ok_or_else(|| {
                    ParseError::SyntaxError {
                        position: start,
                        message: "stream without endstream".to_string(),
                    }
                })?;
                tracing::warn!(
                    declared = ?declared,
                    actual = keyword - start,
                    "stream /Length does not match data, recovered by scanning for endstream"
                );
                (trim_trailing_eol(data, start, keyword), keyword)
            }
        };

        self.lexer.seek(keyword + b"endstream".len());
        Ok(Stream::with_dictionary(dict, data[start..end].to_vec()))
    }
}

/// Offset of the `endstream` keyword if only whitespace separates it from `end`
fn endstream_after(data: &[u8], end: usize) -> Option<usize> {
    let mut pos = end;
    while pos < data.len() && is_whitespace(data[pos]) {
        pos += 1;
    }
    data[pos..].starts_with(b"endstream").then_some(pos)
}

/// Drop the single end-of-line marker that precedes `endstream`
fn trim_trailing_eol(data: &[u8], start: usize, keyword: usize) -> usize {
    let mut end = keyword;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    end
}

fn unexpected(expected: &str, found: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        expected: expected.to_string(),
        found: format!("{found:?}"),
    }
}
