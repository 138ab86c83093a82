//! Lexer: source text to a token stream.
//!
//! Tokens carry their source location and a `glued` flag recording that no
//! whitespace separated them from the previous token. Gluing is load-bearing
//! for path assembly: `items[0]` is a path with a query segment, while
//! `items [0]` is a call with a code-literal argument; `x:` is a set path,
//! `a : b` is not.
//!
//! Operator spellings (`+`, `-`, `*`, `=`, `!=`, ...) lex as ordinary names;
//! the root scope binds them to piped paths, which is what makes them infix.

use crate::error::{CodeLoc, Error, ErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Int(i64),
    Float(f64),
    /// Single-quoted string (raw).
    RawStr(String),
    /// Double-quoted string (interpolated).
    IStr(String),
    Name(String),
    /// `scheme://rest` - the remainder is kept verbatim for the host.
    SchemePath { scheme: String, rest: String },
    Backtick,
    Tilde,
    Pipe,
    Colon,
    Comma,
    Semicolon,
    Newline,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// `#[` - list literal opener.
    HashBracket,
    /// `#{` - dict literal opener.
    HashBrace,
    /// `#(` - path configuration opener.
    HashParen,
    /// `u8#[`, `f64#[`, `b1#[`, ... - typed byte stream opener.
    BytesOpen(String),
    Dot,
    Slash,
    /// `../`
    ParentMark,
    /// `->`
    Arrow,
    /// `<-`
    PostMark,
    /// `...`
    Ellipsis,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokKind,
    pub loc: CodeLoc,
    pub glued: bool,
}

/// Byte-stream type tags accepted before `#[`.
pub const BYTES_TAGS: &[&str] = &[
    "u8", "i8", "u16", "i16", "u32", "i32", "u64", "i64", "f32", "f64", "b1",
];

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    glued: bool,
    tokens: Vec<Token>,
}

/// Tokenizes `source`. Comments are discarded here; any failure is a
/// 400-class syntax error with a location.
pub fn lex(source: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer {
        src: source.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
        glued: false,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer<'_> {
    fn loc(&self) -> CodeLoc {
        CodeLoc::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::SyntaxError, message).with_location(self.loc())
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn push(&mut self, kind: TokKind, loc: CodeLoc) {
        let glued = self.glued;
        self.tokens.push(Token { kind, loc, glued });
        self.glued = true;
    }

    fn run(&mut self) -> Result<(), Error> {
        while let Some(ch) = self.peek() {
            let loc = self.loc();
            match ch {
                b' ' | b'\t' | b'\r' => {
                    self.bump();
                    self.glued = false;
                }
                b'\n' => {
                    self.bump();
                    self.push(TokKind::Newline, loc);
                    self.glued = false;
                }
                b'-' => {
                    if self.peek_at(1) == Some(b'-') {
                        self.skip_line_comment();
                    } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                        self.lex_number()?;
                    } else if self.peek_at(1) == Some(b'>') {
                        self.bump();
                        self.bump();
                        self.push(TokKind::Arrow, loc);
                    } else {
                        self.bump();
                        self.push(TokKind::Name("-".into()), loc);
                    }
                }
                b'{' => {
                    if self.peek_at(1) == Some(b'-') && self.peek_at(2) == Some(b'-') {
                        self.skip_block_comment()?;
                    } else {
                        self.bump();
                        self.push(TokKind::LBrace, loc);
                    }
                }
                b'}' => {
                    self.bump();
                    self.push(TokKind::RBrace, loc);
                }
                b'\'' => self.lex_string(b'\'')?,
                b'"' => self.lex_string(b'"')?,
                b'0'..=b'9' => self.lex_number()?,
                b'#' => {
                    self.bump();
                    match self.peek() {
                        Some(b'[') => {
                            self.bump();
                            self.push(TokKind::HashBracket, loc);
                        }
                        Some(b'{') => {
                            self.bump();
                            self.push(TokKind::HashBrace, loc);
                        }
                        Some(b'(') => {
                            self.bump();
                            self.push(TokKind::HashParen, loc);
                        }
                        _ => return Err(self.error("expected `#[`, `#{` or `#(`")),
                    }
                }
                b'`' => {
                    self.bump();
                    self.push(TokKind::Backtick, loc);
                }
                b'~' => {
                    self.bump();
                    self.push(TokKind::Tilde, loc);
                }
                b'|' => {
                    self.bump();
                    self.push(TokKind::Pipe, loc);
                }
                b':' => {
                    self.bump();
                    self.push(TokKind::Colon, loc);
                }
                b',' => {
                    self.bump();
                    self.push(TokKind::Comma, loc);
                }
                b';' => {
                    self.bump();
                    self.push(TokKind::Semicolon, loc);
                }
                b'(' => {
                    self.bump();
                    self.push(TokKind::LParen, loc);
                }
                b')' => {
                    self.bump();
                    self.push(TokKind::RParen, loc);
                }
                b'[' => {
                    self.bump();
                    self.push(TokKind::LBracket, loc);
                }
                b']' => {
                    self.bump();
                    self.push(TokKind::RBracket, loc);
                }
                b'.' => {
                    if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                        self.bump();
                        self.bump();
                        self.bump();
                        self.push(TokKind::Ellipsis, loc);
                    } else if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'/') {
                        self.bump();
                        self.bump();
                        self.bump();
                        self.push(TokKind::ParentMark, loc);
                    } else {
                        self.bump();
                        self.push(TokKind::Dot, loc);
                    }
                }
                b'/' => {
                    self.bump();
                    self.push(TokKind::Slash, loc);
                }
                b'<' => {
                    self.bump();
                    match self.peek() {
                        Some(b'=') => {
                            self.bump();
                            self.push(TokKind::Name("<=".into()), loc);
                        }
                        Some(b'-') => {
                            self.bump();
                            self.push(TokKind::PostMark, loc);
                        }
                        _ => self.push(TokKind::Name("<".into()), loc),
                    }
                }
                b'>' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        self.push(TokKind::Name(">=".into()), loc);
                    } else {
                        self.push(TokKind::Name(">".into()), loc);
                    }
                }
                b'!' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        self.push(TokKind::Name("!=".into()), loc);
                    } else {
                        return Err(self.error("unexpected `!`"));
                    }
                }
                b'+' | b'*' | b'%' | b'=' => {
                    self.bump();
                    self.push(TokKind::Name((ch as char).to_string()), loc);
                }
                c if c.is_ascii_alphabetic() || c == b'_' => self.lex_name()?,
                other => {
                    return Err(self.error(format!("unexpected character `{}`", other as char)));
                }
            }
        }
        let loc = self.loc();
        self.push(TokKind::Eof, loc);
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.bump();
        }
        self.glued = false;
    }

    fn skip_block_comment(&mut self) -> Result<(), Error> {
        let start = self.loc();
        // consume `{--`
        self.bump();
        self.bump();
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Some(b'{') if self.peek_at(1) == Some(b'-') && self.peek_at(2) == Some(b'-') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') && self.peek_at(2) == Some(b'}') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    depth -= 1;
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(Error::new(ErrorKind::SyntaxError, "unterminated block comment")
                        .with_location(start));
                }
            }
        }
        self.glued = false;
        Ok(())
    }

    fn lex_string(&mut self, quote: u8) -> Result<(), Error> {
        let loc = self.loc();
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(b'\\') => match self.bump() {
                    Some(b'n') => text.push('\n'),
                    Some(b't') => text.push('\t'),
                    Some(b'r') => text.push('\r'),
                    Some(b'\\') => text.push('\\'),
                    Some(c) if c == quote => text.push(c as char),
                    Some(c) => {
                        return Err(self.error(format!("unknown escape `\\{}`", c as char)));
                    }
                    None => {
                        return Err(Error::new(ErrorKind::SyntaxError, "unterminated string")
                            .with_location(loc));
                    }
                },
                Some(c) if c == quote => break,
                Some(c) => {
                    // Source is UTF-8; push raw bytes back as chars via the
                    // original string slice for multi-byte sequences.
                    if c.is_ascii() {
                        text.push(c as char);
                    } else {
                        let start = self.pos - 1;
                        let mut end = self.pos;
                        while end < self.src.len() && (self.src[end] & 0b1100_0000) == 0b1000_0000 {
                            end += 1;
                            self.pos += 1;
                            self.column += 1;
                        }
                        let slice = std::str::from_utf8(&self.src[start..end])
                            .map_err(|_| self.error("invalid UTF-8 in string"))?;
                        text.push_str(slice);
                    }
                }
                None => {
                    return Err(
                        Error::new(ErrorKind::SyntaxError, "unterminated string").with_location(loc)
                    );
                }
            }
        }
        let kind = if quote == b'\'' {
            TokKind::RawStr(text)
        } else {
            TokKind::IStr(text)
        };
        self.push(kind, loc);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), Error> {
        let loc = self.loc();
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'_') {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'_') {
                self.bump();
            }
        }
        if self.peek() == Some(b'e') || self.peek() == Some(b'E') {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                ahead = 2;
            }
            if self.peek_at(ahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..ahead {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let text: String = std::str::from_utf8(&self.src[start..self.pos])
            .expect("number bytes are ASCII")
            .replace('_', "");
        let kind = if is_float {
            TokKind::Float(
                text.parse::<f64>()
                    .map_err(|_| self.error(format!("invalid float literal `{text}`")))?,
            )
        } else {
            TokKind::Int(
                text.parse::<i64>()
                    .map_err(|_| self.error(format!("invalid int literal `{text}`")))?,
            )
        };
        self.push(kind, loc);
        Ok(())
    }

    fn lex_name(&mut self) -> Result<(), Error> {
        let loc = self.loc();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.bump();
            } else if c == b'-' && self.peek_at(1).is_some_and(|n| n.is_ascii_alphanumeric()) {
                // kebab-case continuation; `--` always starts a comment
                self.bump();
            } else {
                break;
            }
        }
        let name: String = std::str::from_utf8(&self.src[start..self.pos])
            .expect("name bytes are ASCII")
            .to_owned();
        // `scheme://rest` - capture the remainder verbatim
        if self.peek() == Some(b':') && self.peek_at(1) == Some(b'/') && self.peek_at(2) == Some(b'/') {
            self.bump();
            self.bump();
            self.bump();
            let rest_start = self.pos;
            while let Some(c) = self.peek() {
                let stop = matches!(
                    c,
                    b' ' | b'\t' | b'\r' | b'\n' | b'[' | b']' | b'(' | b')' | b'#' | b',' | b';' | b'<'
                ) || (c == b':'
                    && !self
                        .peek_at(1)
                        .is_some_and(|n| n.is_ascii_alphanumeric() || n == b'/'));
                if stop {
                    break;
                }
                self.bump();
            }
            let rest = std::str::from_utf8(&self.src[rest_start..self.pos])
                .map_err(|_| self.error("invalid UTF-8 in path"))?
                .to_owned();
            self.push(TokKind::SchemePath { scheme: name, rest }, loc);
            return Ok(());
        }
        // typed byte stream opener
        if self.peek() == Some(b'#')
            && self.peek_at(1) == Some(b'[')
            && BYTES_TAGS.contains(&name.as_str())
        {
            self.bump();
            self.bump();
            self.push(TokKind::BytesOpen(name), loc);
            return Ok(());
        }
        self.push(TokKind::Name(name), loc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_and_names() {
        assert_eq!(
            kinds("x: 10 2.5 -3"),
            vec![
                TokKind::Name("x".into()),
                TokKind::Colon,
                TokKind::Int(10),
                TokKind::Float(2.5),
                TokKind::Int(-3),
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn kebab_names_and_comments() {
        assert_eq!(
            kinds("make-channel -- trailing comment"),
            vec![TokKind::Name("make-channel".into()), TokKind::Eof]
        );
        assert_eq!(kinds("{-- outer {-- inner --} still --} 1"), vec![
            TokKind::Int(1),
            TokKind::Eof
        ]);
    }

    #[test]
    fn glued_flag_tracks_whitespace() {
        let toks = lex("items[0] items [0]").unwrap();
        // items [0] ] items [ 0 ]
        assert!(toks[1].glued, "query bracket is glued");
        assert!(!toks[5].glued, "code-literal bracket is not glued");
    }

    #[test]
    fn operator_spellings_are_names() {
        assert_eq!(
            kinds("1 + 2 != 3 <= 4"),
            vec![
                TokKind::Int(1),
                TokKind::Name("+".into()),
                TokKind::Int(2),
                TokKind::Name("!=".into()),
                TokKind::Int(3),
                TokKind::Name("<=".into()),
                TokKind::Int(4),
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn scheme_paths_capture_rest() {
        assert_eq!(
            kinds("file://cfg/app.json#(lite: true)"),
            vec![
                TokKind::SchemePath {
                    scheme: "file".into(),
                    rest: "cfg/app.json".into()
                },
                TokKind::HashParen,
                TokKind::Name("lite".into()),
                TokKind::Colon,
                TokKind::Name("true".into()),
                TokKind::RParen,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn bytes_opener() {
        assert_eq!(
            kinds("u8#[1, 2]"),
            vec![
                TokKind::BytesOpen("u8".into()),
                TokKind::Int(1),
                TokKind::Comma,
                TokKind::Int(2),
                TokKind::RBracket,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_both_flavours() {
        assert_eq!(
            kinds(r#"'raw' "tpl {{x}}""#),
            vec![
                TokKind::RawStr("raw".into()),
                TokKind::IStr("tpl {{x}}".into()),
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn parent_and_ellipsis() {
        assert_eq!(
            kinds("../x args..."),
            vec![
                TokKind::ParentMark,
                TokKind::Name("x".into()),
                TokKind::Name("args".into()),
                TokKind::Ellipsis,
                TokKind::Eof,
            ]
        );
    }
}
