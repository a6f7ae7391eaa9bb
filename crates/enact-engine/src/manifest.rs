//! Manifest text: a small declarative resource language.
//!
//! ```text
//! file { '/tmp/a': ensure => file, content => "hello\n" }
//! @notify { 'later': message => 'only realized elsewhere' }
//! exec { 'reload': command => 'true', require => File['/tmp/a'] }
//! ```
//!
//! Values are quoted strings, bare words (`true`, `false`, `undef`, numbers, everything else is a
//! string), arrays, hashes, and `Type['title']` references (stored as `Type[title]` strings).

use crate::model::{META_BEFORE, META_REQUIRE, Resource, parse_display_ref};
use enact_types::{ParameterSet, ResourceRef};
use serde_json::{Map, Number, Value as JsonValue};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("cannot render {what} '{value}' as manifest code")]
    Unrenderable { what: &'static str, value: String },
}

/// Arrays and hashes nested deeper than this are rejected.
pub const MAX_NESTING: usize = 128;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semi,
    Arrow,
    At,
}

#[derive(Clone, Debug)]
struct Spanned {
    token: Token,
    line: usize,
}

/// Parse manifest text into resource declarations, in source order.
pub fn parse_manifest(src: &str) -> Result<Vec<Resource>, ManifestError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        eof_line: src.lines().count().max(1),
    };
    let mut resources = Vec::new();
    while !parser.at_end() {
        resources.extend(parser.declaration()?);
    }
    Ok(resources)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

fn tokenize(src: &str) -> Result<Vec<Spanned>, ManifestError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let single = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semi),
            '@' => Some(Token::At),
            ':' if chars.get(i + 1) != Some(&':') => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = single {
            out.push(Spanned { token, line });
            i += 1;
            continue;
        }

        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) != Some(&'>') {
                    return Err(syntax(line, "expected '=>'"));
                }
                out.push(Spanned {
                    token: Token::Arrow,
                    line,
                });
                i += 2;
            }
            '\'' | '"' => {
                let start_line = line;
                let (text, next, newlines) = lex_string(&chars, i)
                    .ok_or_else(|| syntax(start_line, "unterminated string"))?;
                out.push(Spanned {
                    token: Token::Str(text),
                    line: start_line,
                });
                line += newlines;
                i = next;
            }
            c if is_word_char(c) || c == ':' => {
                let start = i;
                while i < chars.len() {
                    if is_word_char(chars[i]) {
                        i += 1;
                    } else if chars[i] == ':' && chars.get(i + 1) == Some(&':') {
                        i += 2;
                    } else {
                        break;
                    }
                }
                out.push(Spanned {
                    token: Token::Word(chars[start..i].iter().collect()),
                    line,
                });
            }
            other => return Err(syntax(line, &format!("unexpected character '{other}'"))),
        }
    }

    Ok(out)
}

/// Returns the unescaped text, the index after the closing quote, and newlines consumed.
fn lex_string(chars: &[char], start: usize) -> Option<(String, usize, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut newlines = 0;
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return Some((text, i + 1, newlines));
        }
        if c == '\n' {
            newlines += 1;
        }
        if c == '\\' {
            let next = *chars.get(i + 1)?;
            let escaped = match (quote, next) {
                ('\'', '\\') | ('\'', '\'') => Some(next),
                ('"', 'n') => Some('\n'),
                ('"', 't') => Some('\t'),
                ('"', '"') | ('"', '\\') | ('"', '$') => Some(next),
                _ => None,
            };
            if let Some(e) = escaped {
                text.push(e);
                i += 2;
                continue;
            }
        }
        text.push(c);
        i += 1;
    }
    None
}

fn syntax(line: usize, message: &str) -> ManifestError {
    ManifestError::Syntax {
        line,
        message: message.to_string(),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    eof_line: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.line)
            .unwrap_or(self.eof_line)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ManifestError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn error(&self, message: &str) -> ManifestError {
        syntax(self.line(), message)
    }

    fn enter(&mut self) -> Result<(), ManifestError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    fn declaration(&mut self) -> Result<Vec<Resource>, ManifestError> {
        let is_virtual = self.eat(&Token::At);
        let type_name = match self.next() {
            Some(Token::Word(w)) if is_type_name(&w) => w,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error("expected a lowercase resource type"));
            }
        };
        self.expect(&Token::LBrace, "'{' after resource type")?;

        let mut resources = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            let title = match self.next() {
                Some(Token::Str(s)) | Some(Token::Word(s)) => s,
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error("resource titles must be strings"));
                }
            };
            self.expect(&Token::Colon, "':' after resource title")?;
            let parameters = self.attributes()?;
            resources.push(Resource {
                reference: ResourceRef::new(type_name.clone(), title),
                parameters,
                is_virtual,
            });
            if !self.eat(&Token::Semi) {
                break;
            }
        }
        self.expect(&Token::RBrace, "'}' to close resource body")?;

        if resources.is_empty() {
            return Err(self.error(&format!("'{type_name}' declaration has no title")));
        }
        Ok(resources)
    }

    fn attributes(&mut self) -> Result<ParameterSet, ManifestError> {
        let mut params = ParameterSet::new();
        while let Some(Token::Word(key)) = self.peek().cloned() {
            if self.peek_at(1) != Some(&Token::Arrow) {
                break;
            }
            self.pos += 2;
            let value = self.value()?;
            if params.insert(key.clone(), value).is_some() {
                return Err(self.error(&format!("duplicate attribute '{key}'")));
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn value(&mut self) -> Result<JsonValue, ManifestError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(JsonValue::String(s)),
            Some(Token::Word(w)) => {
                if self.peek() == Some(&Token::LBracket) && starts_uppercase(&w) {
                    self.pos += 1;
                    let title = match self.next() {
                        Some(Token::Str(s)) | Some(Token::Word(s)) => s,
                        _ => return Err(self.error("expected a title inside reference")),
                    };
                    self.expect(&Token::RBracket, "']' to close reference")?;
                    let reference = ResourceRef::new(w.to_lowercase(), title);
                    Ok(JsonValue::String(reference.display_ref()))
                } else {
                    Ok(bareword(&w))
                }
            }
            Some(Token::LBracket) => {
                self.enter()?;
                let mut items = Vec::new();
                while !self.eat(&Token::RBracket) {
                    items.push(self.value()?);
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RBracket, "']' to close array")?;
                        break;
                    }
                }
                self.depth -= 1;
                Ok(JsonValue::Array(items))
            }
            Some(Token::LBrace) => {
                self.enter()?;
                let mut map = Map::new();
                while !self.eat(&Token::RBrace) {
                    let key = match self.next() {
                        Some(Token::Str(s)) | Some(Token::Word(s)) => s,
                        _ => return Err(self.error("expected a hash key")),
                    };
                    self.expect(&Token::Arrow, "'=>' after hash key")?;
                    map.insert(key, self.value()?);
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RBrace, "'}' to close hash")?;
                        break;
                    }
                }
                self.depth -= 1;
                Ok(JsonValue::Object(map))
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected a value"))
            }
        }
    }
}

/// Lowercase resource type as accepted in a declaration head, e.g. `file` or `apt::source`.
pub fn is_type_name(w: &str) -> bool {
    w.starts_with(|c: char| c.is_ascii_lowercase())
        && w.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == ':')
}

/// Attribute name that reads back as a single bare word.
pub fn is_attribute_name(w: &str) -> bool {
    !w.is_empty() && w.chars().all(is_word_char)
}

fn starts_uppercase(w: &str) -> bool {
    w.starts_with(|c: char| c.is_ascii_uppercase())
}

fn bareword(w: &str) -> JsonValue {
    match w {
        "true" => return JsonValue::Bool(true),
        "false" => return JsonValue::Bool(false),
        "undef" => return JsonValue::Null,
        _ => {}
    }

    let digits = w.strip_prefix('-').unwrap_or(w);
    let numeric = digits.starts_with(|c: char| c.is_ascii_digit());
    // Leading zeros (file modes) stay strings.
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if numeric && !leading_zero {
        if let Ok(n) = w.parse::<i64>() {
            return JsonValue::Number(n.into());
        }
        if let Some(n) = w.parse::<f64>().ok().and_then(Number::from_f64) {
            return JsonValue::Number(n);
        }
    }
    JsonValue::String(w.to_string())
}

/// Render one resource as a single-line manifest declaration.
///
/// Fails when the type or an attribute name would not parse back.
pub fn render_resource(
    reference: &ResourceRef,
    parameters: &ParameterSet,
) -> Result<String, ManifestError> {
    if !is_type_name(&reference.type_name) {
        return Err(ManifestError::Unrenderable {
            what: "resource type",
            value: reference.type_name.clone(),
        });
    }

    let mut attrs = Vec::new();
    for (key, value) in parameters.iter() {
        if !is_attribute_name(key) {
            return Err(ManifestError::Unrenderable {
                what: "attribute name",
                value: key.clone(),
            });
        }
        let rendered = if key == META_REQUIRE || key == META_BEFORE {
            render_relationship(value)
        } else {
            render_value(value)
        };
        attrs.push(format!("{key} => {rendered}"));
    }

    let head = format!("{} {{ {}:", reference.type_name, quote(&reference.name));
    if attrs.is_empty() {
        Ok(format!("{head} }}"))
    } else {
        Ok(format!("{head} {} }}", attrs.join(", ")))
    }
}

fn render_relationship(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => match parse_display_ref(s) {
            Some(r) => {
                let display = r.display_ref();
                let type_part = &display[..display.find('[').unwrap_or(display.len())];
                format!("{type_part}[{}]", quote(&r.name))
            }
            None => quote(s),
        },
        JsonValue::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(render_relationship)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        other => render_value(other),
    }
}

fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "undef".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => quote(s),
        JsonValue::Array(items) => format!(
            "[{}]",
            items.iter().map(render_value).collect::<Vec<_>>().join(", ")
        ),
        JsonValue::Object(map) if map.is_empty() => "{}".to_string(),
        JsonValue::Object(map) => format!(
            "{{ {} }}",
            map.iter()
                .map(|(k, v)| format!("{} => {}", quote(k), render_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
