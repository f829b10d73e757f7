//! Minimal BibTeX reader for anthology bibliography files.
//!
//! Supports `@type{key, field = value, ...}` entries with braced, quoted,
//! numeric and macro values joined by `#`. `@string` definitions are
//! expanded; `@comment` and `@preamble` blocks are skipped. Field values keep
//! their inner braces and have whitespace runs collapsed to one space.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BibError {
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: unterminated {what}")]
    Unterminated { line: usize, what: &'static str },
}

/// One bibliography entry. Field names and the entry type are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Names listed in a person field (`author`, `editor`), split on ` and `
    /// outside of braces.
    pub fn persons(&self, role: &str) -> Vec<String> {
        self.field(role).map(split_persons).unwrap_or_default()
    }
}

pub fn parse(input: &str) -> Result<Vec<BibEntry>, BibError> {
    Parser::new(input).entries()
}

fn split_persons(value: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 && bytes[i..].len() >= 5 && bytes[i..i + 5].eq_ignore_ascii_case(b" and ") => {
                names.push(&value[start..i]);
                i += 5;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    names.push(&value[start..]);
    names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn month_macro(name: &str) -> Option<&'static str> {
    Some(match name {
        "jan" => "January",
        "feb" => "February",
        "mar" => "March",
        "apr" => "April",
        "may" => "May",
        "jun" => "June",
        "jul" => "July",
        "aug" => "August",
        "sep" => "September",
        "oct" => "October",
        "nov" => "November",
        "dec" => "December",
        _ => return None,
    })
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    macros: HashMap<String, String>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            macros: HashMap::new(),
        }
    }

    fn line(&self) -> usize {
        self.src[..self.pos].matches('\n').count() + 1
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn unexpected(&self, expected: &'static str) -> BibError {
        BibError::Unexpected {
            line: self.line(),
            expected,
            found: self
                .peek()
                .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'")),
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), BibError> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && !"{}()\",=#%@".contains(c))
        {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn entries(mut self) -> Result<Vec<BibEntry>, BibError> {
        let mut entries = Vec::new();
        // Anything outside an @-block is a comment.
        while let Some(offset) = self.src[self.pos..].find('@') {
            self.pos += offset + 1;
            self.skip_ws();
            let entry_type = self.identifier().to_ascii_lowercase();
            if entry_type.is_empty() {
                return Err(self.unexpected("entry type"));
            }
            self.skip_ws();
            let close = match self.bump() {
                Some('{') => '}',
                Some('(') => ')',
                _ => return Err(self.unexpected("'{' or '('")),
            };

            match entry_type.as_str() {
                "comment" | "preamble" => self.skip_block(close)?,
                "string" => self.string_definition(close)?,
                _ => entries.push(self.entry(entry_type, close)?),
            }
        }
        Ok(entries)
    }

    fn skip_block(&mut self, close: char) -> Result<(), BibError> {
        let line = self.line();
        let open = if close == '}' { '{' } else { '(' };
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(BibError::Unterminated { line, what: "block" })
    }

    fn string_definition(&mut self, close: char) -> Result<(), BibError> {
        self.skip_ws();
        let name = self.identifier().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.unexpected("macro name"));
        }
        self.expect('=', "'='")?;
        let value = self.value()?;
        self.macros.insert(name, value);
        self.expect(close, "end of @string")
    }

    fn entry(&mut self, entry_type: String, close: char) -> Result<BibEntry, BibError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c != ',' && c != close && !c.is_whitespace())
        {
            self.bump();
        }
        let key = self.src[start..self.pos].to_string();
        if key.is_empty() {
            return Err(self.unexpected("citation key"));
        }

        let mut fields = BTreeMap::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                }
                _ => return Err(self.unexpected("',' or end of entry")),
            }
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            let name = self.identifier().to_ascii_lowercase();
            if name.is_empty() {
                return Err(self.unexpected("field name"));
            }
            self.expect('=', "'='")?;
            let value = self.value()?;
            fields.entry(name).or_insert(value);
        }

        Ok(BibEntry {
            entry_type,
            key,
            fields,
        })
    }

    /// A value: one or more parts joined by `#`.
    fn value(&mut self) -> Result<String, BibError> {
        let mut out = String::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('{') => {
                    self.bump();
                    out.push_str(&self.delimited('}')?);
                }
                Some('"') => {
                    self.bump();
                    out.push_str(&self.delimited('"')?);
                }
                Some(c) if c.is_ascii_digit() => {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.bump();
                    }
                    out.push_str(&self.src[start..self.pos]);
                }
                Some(_) => {
                    let name = self.identifier().to_ascii_lowercase();
                    if name.is_empty() {
                        return Err(self.unexpected("field value"));
                    }
                    let expanded = self
                        .macros
                        .get(&name)
                        .map(String::as_str)
                        .or_else(|| month_macro(&name))
                        .unwrap_or(&name);
                    out.push_str(expanded);
                }
                None => return Err(self.unexpected("field value")),
            }
            self.skip_ws();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                return Ok(collapse_whitespace(&out));
            }
        }
    }

    /// Text up to the matching `end`, keeping nested braces.
    fn delimited(&mut self, end: char) -> Result<String, BibError> {
        let line = self.line();
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' if depth > 0 => depth -= 1,
                c if c == end && depth == 0 => {
                    let inner = &self.src[start..self.pos - c.len_utf8()];
                    return Ok(inner.to_string());
                }
                '}' => {
                    return Err(BibError::Unexpected {
                        line: self.line(),
                        expected: "balanced braces",
                        found: "'}'".to_string(),
                    });
                }
                _ => {}
            }
        }
        Err(BibError::Unterminated { line, what: "field value" })
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
