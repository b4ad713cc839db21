//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer works
//! over an in-memory byte slice so callers can jump to any xref offset.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal)
    String(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// Reference keyword `R`
    R,

    /// Xref keyword
    XRef,

    /// Trailer keyword
    Trailer,

    /// StartXRef keyword
    StartXRef,

    /// Null object
    Null,

    /// Any other bare word (content-stream operators and the like)
    Keyword(String),

    /// Comment (usually ignored)
    Comment(Vec<u8>),

    /// End of input
    Eof,
}

pub(crate) fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

pub(crate) fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// PDF Lexer for tokenizing PDF content
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Create a new lexer positioned at `position`
    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
            token_buffer: Vec::new(),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        self.skip_whitespace();

        let ch = match self.peek_byte() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.position += 1;
                if self.peek_byte() == Some(b'>') {
                    self.position += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(self.syntax_error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if is_delimiter(ch) => {
                Err(self.syntax_error(&format!("Unexpected character: {}", ch as char)))
            }
            _ => Ok(self.read_keyword()),
        }
    }

    /// Push back a token to be returned by the next call to next_token.
    /// Tokens pushed later are returned first.
    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    /// Current byte offset. Only meaningful when no tokens are pushed back.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute byte offset, discarding pushed-back tokens.
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
        self.token_buffer.clear();
    }

    /// The full input the lexer is reading from
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn syntax_error(&self, message: &str) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            message: message.to_string(),
        }
    }

    /// Skip whitespace and return the number of bytes skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) {
                self.position += 1;
            } else {
                break;
            }
        }
        self.position - start
    }

    /// Consume the end-of-line marker that follows the `stream` keyword.
    ///
    /// The standard requires CRLF or LF; a lone CR is accepted as well.
    pub fn read_stream_eol(&mut self) -> ParseResult<()> {
        // Spaces before the EOL show up in files from sloppy producers
        while self.peek_byte() == Some(b' ') {
            self.position += 1;
        }
        match self.peek_byte() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.position += 1;
                }
                Ok(())
            }
            Some(b'\n') => {
                self.position += 1;
                Ok(())
            }
            _ => Err(self.syntax_error("Expected newline after 'stream'")),
        }
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.position += 1;
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.position += 1;
        }
        Token::Comment(self.data[start..self.position].to_vec())
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut name = String::new();

        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;

            // Handle hex codes in names (e.g., /A#20B means /A B)
            if ch == b'#' {
                let hex = self
                    .data
                    .get(self.position..self.position + 2)
                    .ok_or_else(|| self.syntax_error("Incomplete hex code in name"))?;
                let value = std::str::from_utf8(hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| self.syntax_error("Invalid hex code in name"))?;
                self.position += 2;
                name.push(value as char);
            } else {
                name.push(ch as char);
            }
        }

        Ok(Token::Name(name))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut string = Vec::new();
        let mut paren_depth = 1;

        while paren_depth > 0 {
            let ch = self
                .peek_byte()
                .ok_or_else(|| self.syntax_error("Unterminated string"))?;
            self.position += 1;

            match ch {
                b'\\' => {
                    let escaped = self
                        .peek_byte()
                        .ok_or_else(|| self.syntax_error("Unterminated string"))?;
                    self.position += 1;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'(' | b')' | b'\\' => string.push(escaped),
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek_byte() {
                                    Some(next @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + (next - b'0') as u32;
                                    }
                                    _ => break,
                                }
                            }
                            string.push((value & 0xFF) as u8);
                        }
                        // Backslash-newline is a line continuation
                        b'\r' => {
                            if self.peek_byte() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        _ => string.push(escaped),
                    }
                }
                b'(' => {
                    string.push(ch);
                    paren_depth += 1;
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth > 0 {
                        string.push(ch);
                    }
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.position += 1;

        if self.peek_byte() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut digits = Vec::new();
        loop {
            let ch = self
                .peek_byte()
                .ok_or_else(|| self.syntax_error("Unterminated hex string"))?;
            self.position += 1;
            match ch {
                b'>' => break,
                _ if ch.is_ascii_hexdigit() => digits.push(ch),
                _ if is_whitespace(ch) => {}
                _ => return Err(self.syntax_error("Invalid character in hex string")),
            }
        }

        // Pad with 0 if odd number of digits
        if digits.len() % 2 != 0 {
            digits.push(b'0');
        }

        let bytes = digits
            .chunks(2)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect();

        Ok(Token::String(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut has_dot = false;

        if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
            self.position += 1;
        }

        while let Some(ch) = self.peek_byte() {
            match ch {
                b'0'..=b'9' => self.position += 1,
                b'.' if !has_dot => {
                    has_dot = true;
                    self.position += 1;
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| self.syntax_error("Invalid number"))?;

        if has_dot {
            // "4." and "-.5" are valid PDF reals; a lone sign or dot is not
            let value = match text {
                "." | "+." | "-." => None,
                _ => text
                    .parse::<f64>()
                    .ok()
                    .or_else(|| format!("{text}0").parse::<f64>().ok()),
            };
            value
                .map(Token::Real)
                .ok_or_else(|| self.syntax_error(&format!("Invalid real number: '{text}'")))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.syntax_error(&format!("Invalid integer: '{text}'")))
        }
    }

    /// Read a bare word and classify it as a keyword
    fn read_keyword(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }
        let word = &self.data[start..self.position];

        match word {
            b"true" => Token::Boolean(true),
            b"false" => Token::Boolean(false),
            b"null" => Token::Null,
            b"obj" => Token::Obj,
            b"endobj" => Token::EndObj,
            b"stream" => Token::Stream,
            b"endstream" => Token::EndStream,
            b"R" => Token::R,
            b"xref" => Token::XRef,
            b"trailer" => Token::Trailer,
            b"startxref" => Token::StartXRef,
            _ => Token::Keyword(String::from_utf8_lossy(word).into_owned()),
        }
    }
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

/// Find the first occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Find the last occurrence of `needle` in `haystack`.
pub(crate) fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
