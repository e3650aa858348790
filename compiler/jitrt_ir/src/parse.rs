//! Parser for the textual host type syntax.
//!
//! Accepts exactly what `Display` for [`HostType`] prints, with optional
//! whitespace between list elements and around `->`:
//!
//! ```text
//! type     ::= int | float | `index` | `none` | `complex<` type `>`
//!            | (`tensor` | `memref`) `<` shaped `>`
//!            | `!async.token` | `!async.value<` type `>` | `!rt.kernel_context`
//!            | function
//! shaped   ::= `*x` type | (dim `x`)* type
//! dim      ::= `?` | [0-9]+
//! function ::= `(` type-list `)` `->` (type | `(` type-list `)`)
//! ```

use std::fmt;

use crate::types::{FloatKind, HostFunctionType, HostType, Shape, Signedness, DYNAMIC_SIZE};

/// Deepest nesting of element, value, and function types accepted.
pub const MAX_TYPE_NESTING: usize = 128;

/// What went wrong while parsing a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input ended in the middle of a type.
    UnexpectedEnd,
    /// A specific token was required.
    Expected(&'static str),
    /// A keyword that does not name any type.
    UnknownType(String),
    /// Integer width of zero or too many bits to represent.
    InvalidWidth(String),
    /// A dimension that does not fit in `i64`.
    InvalidDimension(String),
    /// Characters left over after a complete type.
    TrailingInput,
    /// Types nested deeper than [`MAX_TYPE_NESTING`].
    TooDeep,
}

/// Error from [`HostType::parse`] with the byte offset where it occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTypeError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedEnd => write!(f, "unexpected end of type at offset {}", self.offset),
            ParseErrorKind::Expected(what) => {
                write!(f, "expected `{what}` at offset {}", self.offset)
            }
            ParseErrorKind::UnknownType(word) => {
                write!(f, "unknown type `{word}` at offset {}", self.offset)
            }
            ParseErrorKind::InvalidWidth(word) => {
                write!(f, "invalid integer width in `{word}` at offset {}", self.offset)
            }
            ParseErrorKind::InvalidDimension(digits) => {
                write!(f, "invalid dimension `{digits}` at offset {}", self.offset)
            }
            ParseErrorKind::TrailingInput => {
                write!(f, "unexpected trailing input at offset {}", self.offset)
            }
            ParseErrorKind::TooDeep => write!(
                f,
                "type nested deeper than {MAX_TYPE_NESTING} levels at offset {}",
                self.offset
            ),
        }
    }
}

impl std::error::Error for ParseTypeError {}

pub(crate) fn parse_type(source: &str) -> Result<HostType, ParseTypeError> {
    let mut cursor = Cursor::new(source);
    cursor.skip_whitespace();
    let ty = cursor.parse_type()?;
    cursor.finish()?;
    Ok(ty)
}

pub(crate) fn parse_function_type(source: &str) -> Result<HostFunctionType, ParseTypeError> {
    let mut cursor = Cursor::new(source);
    cursor.skip_whitespace();
    let func = cursor.parse_function()?;
    cursor.finish()?;
    Ok(func)
}

// ── Cursor ──────────────────────────────────────────────────────────

/// Byte cursor over the type source.
struct Cursor<'src> {
    source: &'src str,
    pos: usize,
    depth: usize,
}

impl<'src> Cursor<'src> {
    fn new(source: &'src str) -> Self {
        Cursor {
            source,
            pos: 0,
            depth: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn error(&self, kind: ParseErrorKind) -> ParseTypeError {
        ParseTypeError {
            offset: self.pos,
            kind,
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Consume `token` if the input starts with it.
    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &'static str) -> Result<(), ParseTypeError> {
        if self.eat(token) {
            Ok(())
        } else if self.peek().is_none() {
            Err(self.error(ParseErrorKind::UnexpectedEnd))
        } else {
            Err(self.error(ParseErrorKind::Expected(token)))
        }
    }

    fn finish(&mut self) -> Result<(), ParseTypeError> {
        self.skip_whitespace();
        if self.peek().is_some() {
            return Err(self.error(ParseErrorKind::TrailingInput));
        }
        Ok(())
    }

    /// Consume a keyword: `!`, `.`, `_`, and ASCII alphanumerics.
    fn word(&mut self) -> &'src str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || matches!(b, b'!' | b'.' | b'_'))
        {
            self.pos += 1;
        }
        &self.source[start..self.pos]
    }

    fn digits(&mut self) -> &'src str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.source[start..self.pos]
    }

    // ── Grammar ─────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<HostType, ParseTypeError> {
        if self.depth == MAX_TYPE_NESTING {
            return Err(self.error(ParseErrorKind::TooDeep));
        }
        self.depth += 1;
        let ty = self.parse_type_at_depth();
        self.depth -= 1;
        ty
    }

    fn parse_type_at_depth(&mut self) -> Result<HostType, ParseTypeError> {
        if self.peek() == Some(b'(') {
            return self.parse_function().map(HostType::Function);
        }

        let start = self.pos;
        let word = self.word();
        if word.is_empty() {
            return Err(match self.peek() {
                None => self.error(ParseErrorKind::UnexpectedEnd),
                Some(_) => self.error(ParseErrorKind::Expected("type")),
            });
        }

        let ty = match word {
            "index" => HostType::Index,
            "none" => HostType::None,
            "f16" => HostType::Float(FloatKind::F16),
            "bf16" => HostType::Float(FloatKind::BF16),
            "f32" => HostType::Float(FloatKind::F32),
            "f64" => HostType::Float(FloatKind::F64),
            "complex" => {
                self.expect("<")?;
                let element = self.parse_type()?;
                self.expect(">")?;
                HostType::Complex(Box::new(element))
            }
            "tensor" => {
                self.expect("<")?;
                let ty = match self.parse_shape()? {
                    Some(shape) => HostType::RankedTensor {
                        shape,
                        element: Box::new(self.parse_type()?),
                    },
                    None => HostType::unranked_tensor(self.parse_type()?),
                };
                self.expect(">")?;
                ty
            }
            "memref" => {
                self.expect("<")?;
                let ty = match self.parse_shape()? {
                    Some(shape) => HostType::MemRef {
                        shape,
                        element: Box::new(self.parse_type()?),
                    },
                    None => HostType::unranked_memref(self.parse_type()?),
                };
                self.expect(">")?;
                ty
            }
            "!async.token" => HostType::AsyncToken,
            "!async.value" => {
                self.expect("<")?;
                let inner = self.parse_type()?;
                self.expect(">")?;
                HostType::async_value(inner)
            }
            "!rt.kernel_context" => HostType::KernelContext,
            _ => integer_type(word).map_err(|kind| ParseTypeError {
                offset: start,
                kind,
            })?,
        };
        Ok(ty)
    }

    /// Parse the dimension prefix of a shaped type.
    ///
    /// Returns `None` for the unranked `*x` form.
    fn parse_shape(&mut self) -> Result<Option<Shape>, ParseTypeError> {
        if self.eat("*") {
            self.expect("x")?;
            return Ok(None);
        }

        let mut shape = Shape::new();
        loop {
            match self.peek() {
                Some(b'?') => {
                    self.pos += 1;
                    shape.push(DYNAMIC_SIZE);
                }
                Some(b) if b.is_ascii_digit() => {
                    let start = self.pos;
                    let digits = self.digits();
                    let dim = digits.parse::<i64>().map_err(|_| ParseTypeError {
                        offset: start,
                        kind: ParseErrorKind::InvalidDimension(digits.to_owned()),
                    })?;
                    shape.push(dim);
                }
                _ => return Ok(Some(shape)),
            }
            self.expect("x")?;
        }
    }

    fn parse_type_list(&mut self) -> Result<Vec<HostType>, ParseTypeError> {
        self.expect("(")?;
        self.skip_whitespace();
        let mut types = Vec::new();
        if self.eat(")") {
            return Ok(types);
        }
        loop {
            types.push(self.parse_type()?);
            self.skip_whitespace();
            if self.eat(")") {
                return Ok(types);
            }
            self.expect(",")?;
            self.skip_whitespace();
        }
    }

    fn parse_function(&mut self) -> Result<HostFunctionType, ParseTypeError> {
        let inputs = self.parse_type_list()?;
        self.skip_whitespace();
        self.expect("->")?;
        self.skip_whitespace();
        let results = if self.peek() == Some(b'(') {
            self.parse_type_list()?
        } else {
            vec![self.parse_type()?]
        };
        Ok(HostFunctionType::new(inputs, results))
    }
}

/// Decode `iN`, `siN`, and `uiN`.
fn integer_type(word: &str) -> Result<HostType, ParseErrorKind> {
    let (signedness, digits) = if let Some(rest) = word.strip_prefix("si") {
        (Signedness::Signed, rest)
    } else if let Some(rest) = word.strip_prefix("ui") {
        (Signedness::Unsigned, rest)
    } else if let Some(rest) = word.strip_prefix('i') {
        (Signedness::Signless, rest)
    } else {
        return Err(ParseErrorKind::UnknownType(word.to_owned()));
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseErrorKind::UnknownType(word.to_owned()));
    }
    match digits.parse::<u32>() {
        Ok(width) if width > 0 => Ok(HostType::Integer { width, signedness }),
        _ => Err(ParseErrorKind::InvalidWidth(word.to_owned())),
    }
}
