//! Hub reply-line parsing and formatting.
//!
//! The hub relays actor output as one line per reply:
//!
//! ```text
//! <commander> <mid> <actor> <code> key1=v1,v2; key2; key3="quoted, value"
//! ```
//!
//! Values are separated by commas, keywords by semicolons. Double-quoted
//! values may contain either separator and backslash-escaped quotes.

use std::fmt;

use ginga_core::{ActorError, Result};
use winnow::combinator::{cut_err, opt, preceded, repeat, separated, terminated};
use winnow::prelude::*;
use winnow::token::{any, take_till, take_while};

// ── Reply codes ───────────────────────────────────────────────────────────────

/// Message type flag carried by every reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    /// `>` command queued.
    Queued,
    /// `i` informational.
    Info,
    /// `w` warning.
    Warning,
    /// `d` debug.
    Debug,
    /// `:` command finished successfully.
    Finished,
    /// `f` command failed.
    Failed,
    /// `!` fatal.
    Fatal,
}

impl ReplyCode {
    pub fn as_char(self) -> char {
        match self {
            ReplyCode::Queued => '>',
            ReplyCode::Info => 'i',
            ReplyCode::Warning => 'w',
            ReplyCode::Debug => 'd',
            ReplyCode::Finished => ':',
            ReplyCode::Failed => 'f',
            ReplyCode::Fatal => '!',
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ">" => Some(ReplyCode::Queued),
            "i" => Some(ReplyCode::Info),
            "w" => Some(ReplyCode::Warning),
            "d" => Some(ReplyCode::Debug),
            ":" => Some(ReplyCode::Finished),
            "f" => Some(ReplyCode::Failed),
            "!" => Some(ReplyCode::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ── Keywords ──────────────────────────────────────────────────────────────────

/// One `name=v1,v2,...` element of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub name: String,
    pub values: Vec<String>,
}

impl Keyword {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.values.is_empty() {
            return Ok(());
        }
        f.write_str("=")?;
        for (idx, value) in self.values.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            f.write_str(&quote_value(value))?;
        }
        Ok(())
    }
}

/// Finite numbers go out bare; everything else is double-quoted.
pub fn quote_value(value: &str) -> String {
    if value.parse::<f64>().is_ok_and(f64::is_finite) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A fully parsed hub reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub commander: String,
    pub mid: i64,
    pub actor: String,
    pub code: ReplyCode,
    pub keywords: Vec<Keyword>,
}

impl Reply {
    /// Parse one line as relayed by the hub.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut rest = line;

        let (commander, mid, actor, code) = (token, token, token, token)
            .parse_next(&mut rest)
            .map_err(|_| ActorError::Protocol(format!("truncated reply header: {line:?}")))?;

        let mid = mid
            .parse::<i64>()
            .map_err(|_| ActorError::Protocol(format!("invalid message id {mid:?} in {line:?}")))?;
        let code = ReplyCode::from_token(code)
            .ok_or_else(|| ActorError::Protocol(format!("unknown reply code {code:?} in {line:?}")))?;

        Ok(Self {
            commander: commander.to_string(),
            mid,
            actor: actor.to_string(),
            code,
            keywords: parse_keywords(rest)?,
        })
    }

    /// Keyword by name, if present in this reply.
    pub fn keyword(&self, name: &str) -> Option<&Keyword> {
        self.keywords.iter().find(|k| k.name == name)
    }
}

/// Format an outgoing reply line (without trailing newline).
pub fn format_reply(commander: &str, mid: i64, code: ReplyCode, keywords: &[Keyword]) -> String {
    let mut line = format!("{commander} {mid} {code}");
    if !keywords.is_empty() {
        let body: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        line.push(' ');
        line.push_str(&body.join("; "));
    }
    line
}

/// Parse the keyword section of a reply.
pub fn parse_keywords(body: &str) -> Result<Vec<Keyword>> {
    keywords
        .parse(body)
        .map_err(|e| ActorError::Protocol(format!("invalid keywords in {body:?}: {e}")))
}

// ── Grammar ───────────────────────────────────────────────────────────────────

type PResult<T> = winnow::ModalResult<T>;

fn whitespace<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(0.., |c: char| c.is_whitespace()).parse_next(input)
}

/// Runs of `;` and whitespace between keywords.
fn separators<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(0.., |c: char| c.is_whitespace() || c == ';').parse_next(input)
}

/// One whitespace-delimited header field.
fn token<'i>(input: &mut &'i str) -> PResult<&'i str> {
    preceded(whitespace, take_till(1.., |c: char| c.is_whitespace())).parse_next(input)
}

fn keywords(input: &mut &str) -> PResult<Vec<Keyword>> {
    terminated(repeat(0.., preceded(separators, keyword)), separators).parse_next(input)
}

fn keyword(input: &mut &str) -> PResult<Keyword> {
    let name = take_till(1.., |c: char| c == '=' || c == ';' || c.is_whitespace())
        .parse_next(input)?;
    whitespace.parse_next(input)?;
    let values: Option<Vec<String>> =
        opt(preceded('=', separated(1.., value, ','))).parse_next(input)?;
    Ok(Keyword::new(name, values.unwrap_or_default()))
}

fn value(input: &mut &str) -> PResult<String> {
    whitespace.parse_next(input)?;
    if opt('"').parse_next(input)?.is_some() {
        let value = cut_err(quoted).parse_next(input)?;
        whitespace.parse_next(input)?;
        return Ok(value);
    }
    let bare = take_till(0.., [',', ';']).parse_next(input)?;
    Ok(bare.trim_end().to_string())
}

/// Body of a double-quoted value, after the opening quote.
fn quoted(input: &mut &str) -> PResult<String> {
    let mut value = String::new();
    loop {
        let chunk = take_till(0.., ['"', '\\']).parse_next(input)?;
        value.push_str(chunk);
        match any.parse_next(input)? {
            '"' => return Ok(value),
            _ => value.push(any.parse_next(input)?),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
