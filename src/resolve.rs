//! Type expression parsing and resolution.
//!
//! Accepts the spellings a declaration can carry: Rust generics (`Vec<Vec<i64>>`,
//! including `stringify!` output such as `Vec < Vec < i64 > >`), bracketed
//! forms (`List[Dict[str, int]]`) and path-qualified names (`std::vec::Vec<u8>`,
//! `typing.List[int]`). Paths resolve by their last segment.

use crate::error::{Error, Result};
use crate::ir::{PrimitiveKind, TypeDescriptor};

const SEQUENCE_MARKERS: &[&str] = &["List", "list", "Vec", "VecDeque", "Sequence"];
const MAPPING_MARKERS: &[&str] = &["Dict", "dict", "HashMap", "BTreeMap", "IndexMap", "Mapping"];

/// Anything that can say whether a record name is declared.
pub trait Scope {
    fn declares(&self, name: &str) -> bool;
}

/// Parsed but not yet resolved: `Outer[params..]` or a bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
    pub params: Vec<TypeExpr>,
}

/// Parse and resolve `src` against `scope`.
pub fn resolve<S: Scope + ?Sized>(src: &str, scope: &S) -> Result<TypeDescriptor> {
    let expr = parse_type_expr(src)?;
    resolve_expr(&expr, src, scope)
}

pub fn parse_type_expr(src: &str) -> Result<TypeExpr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { src, tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::unsupported(src, "trailing tokens after type"));
    }
    Ok(expr)
}

pub fn resolve_expr<S: Scope + ?Sized>(expr: &TypeExpr, src: &str, scope: &S) -> Result<TypeDescriptor> {
    let name = expr.name.as_str();

    if expr.params.is_empty() {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Ok(TypeDescriptor::Primitive(kind));
        }
        if SEQUENCE_MARKERS.contains(&name) || MAPPING_MARKERS.contains(&name) {
            return Err(Error::unsupported(src, format!("`{name}` needs type parameters")));
        }
        if scope.declares(name) {
            return Ok(TypeDescriptor::RecordRef(name.to_string()));
        }
        return Err(Error::UnresolvedType { name: name.to_string() });
    }

    if SEQUENCE_MARKERS.contains(&name) {
        let [elem] = expr.params.as_slice() else {
            return Err(Error::unsupported(src, format!("`{name}` takes exactly one parameter")));
        };
        return Ok(TypeDescriptor::sequence_of(resolve_expr(elem, src, scope)?));
    }

    if MAPPING_MARKERS.contains(&name) {
        let [key, value] = expr.params.as_slice() else {
            return Err(Error::unsupported(src, format!("`{name}` takes exactly two parameters")));
        };
        match resolve_expr(key, src, scope)? {
            TypeDescriptor::Primitive(PrimitiveKind::Text) => {}
            other => {
                return Err(Error::unsupported(src, format!("mapping keys must be Text, not {other}")));
            }
        }
        return Ok(TypeDescriptor::mapping_of(resolve_expr(value, src, scope)?));
    }

    Err(Error::unsupported(src, format!("`{name}` is neither a sequence nor a mapping")))
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    PathSep,
    Open,
    Close,
    Comma,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tokenize(src: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '[' | '<' => tokens.push(Token::Open),
            ']' | '>' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            '.' => tokens.push(Token::PathSep),
            ':' => match chars.next() {
                Some((_, ':')) => tokens.push(Token::PathSep),
                _ => return Err(Error::unsupported(src, "stray `:`")),
            },
            c if is_ident_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !is_ident_char(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Ident(&src[start..end]));
            }
            other => {
                return Err(Error::unsupported(src, format!("unexpected character `{other}`")));
            }
        }
    }
    if tokens.is_empty() {
        return Err(Error::unsupported(src, "empty type expression"));
    }
    Ok(tokens)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: Token<'a>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> Result<TypeExpr> {
        let name = self.parse_path()?;
        let mut params = Vec::new();
        if self.eat(Token::Open) {
            loop {
                params.push(self.parse_expr()?);
                match self.next() {
                    Some(Token::Comma) if self.eat(Token::Close) => break, // trailing comma
                    Some(Token::Comma) => continue,
                    Some(Token::Close) => break,
                    _ => return Err(Error::unsupported(self.src, "unterminated parameter list")),
                }
            }
        }
        Ok(TypeExpr { name, params })
    }

    fn parse_path(&mut self) -> Result<String> {
        self.eat(Token::PathSep);
        let mut last = self.ident()?;
        while self.eat(Token::PathSep) {
            last = self.ident()?;
        }
        Ok(last.to_string())
    }

    fn ident(&mut self) -> Result<&'a str> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            _ => Err(Error::unsupported(self.src, "expected a type name")),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
