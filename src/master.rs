//! Master-file (presentation format) parsing: the tokenizer contract used
//! by the rdata parsers, and the zone-file reader with its `$` directives.
//!
//! Tokens are whitespace-separated with `\` escapes, `"` quoting, `()`
//! line continuation, and `;` comments. The tokenizer hands back raw token
//! text with escapes intact; [`escaped_bytes`] decodes them where a field
//! is a character string.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{error, Error, Result};
use crate::name::Name;
use crate::rdata::{parse_hex, Rdata};
use crate::rr::{DnsClass, Record, RrType, MAX_TTL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An unquoted word, escapes unprocessed.
    Ident(String),
    /// The inside of a quoted string, escapes unprocessed.
    Quoted(String),
    /// Leading whitespace on a line, only reported when asked for.
    Whitespace,
    Eol,
    Eof,
}

pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
    line: usize,
    parens: usize,
    ungot: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(s: &'a str) -> Self {
        Tokenizer {
            data: s.as_bytes(),
            pos: 0,
            line: 1,
            parens: 0,
            ungot: None,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn err(&self, what: &str) -> Error {
        error!(TextParse => "{} at line {}", what, self.line)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Skips spaces and tabs (and, inside parentheses, newlines); returns
    /// true when anything was skipped.
    fn skip_whitespace(&mut self) -> Result<bool> {
        let mut skipped = false;
        loop {
            match self.peek_byte() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.pos += 1;
                    skipped = true;
                }
                Some(b'\n') if self.parens > 0 => {
                    self.pos += 1;
                    self.line += 1;
                    skipped = true;
                }
                Some(b';') if self.parens > 0 => {
                    while let Some(b) = self.peek_byte() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => return Ok(skipped),
            }
        }
    }

    /// Core token reader. `want_whitespace` reports leading whitespace as a
    /// token of its own, which the zone-file parser uses to detect a line
    /// continuing the previous owner name.
    pub fn get_raw(&mut self, want_whitespace: bool) -> Result<Token> {
        if let Some(tok) = self.ungot.take() {
            return Ok(tok);
        }
        let skipped = self.skip_whitespace()?;
        if skipped && want_whitespace {
            return Ok(Token::Whitespace);
        }
        loop {
            match self.peek_byte() {
                None => {
                    if self.parens > 0 {
                        return Err(self.err("unbalanced parentheses"));
                    }
                    return Ok(Token::Eof);
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                    return Ok(Token::Eol);
                }
                Some(b';') => {
                    while let Some(b) = self.peek_byte() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'(') => {
                    self.pos += 1;
                    self.parens += 1;
                    self.skip_whitespace()?;
                }
                Some(b')') => {
                    if self.parens == 0 {
                        return Err(self.err("unbalanced parentheses"));
                    }
                    self.pos += 1;
                    self.parens -= 1;
                    self.skip_whitespace()?;
                }
                Some(b'"') => {
                    self.pos += 1;
                    let start = self.pos;
                    loop {
                        match self.peek_byte() {
                            None | Some(b'\n') => return Err(self.err("unterminated string")),
                            Some(b'\\') => self.pos += 2,
                            Some(b'"') => break,
                            Some(_) => self.pos += 1,
                        }
                    }
                    let inner = std::str::from_utf8(&self.data[start..self.pos])?.to_string();
                    self.pos += 1;
                    return Ok(Token::Quoted(inner));
                }
                Some(_) => {
                    let start = self.pos;
                    while let Some(b) = self.peek_byte() {
                        match b {
                            b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b';' | b'"' => break,
                            b'\\' => {
                                self.pos += 1;
                                if self.peek_byte().is_some() {
                                    self.pos += 1;
                                }
                            }
                            _ => self.pos += 1,
                        }
                    }
                    let word = std::str::from_utf8(&self.data[start..self.pos])?.to_string();
                    return Ok(Token::Ident(word));
                }
            }
        }
    }

    pub fn get(&mut self) -> Result<Token> {
        self.get_raw(false)
    }

    pub fn unget(&mut self, tok: Token) {
        debug_assert!(self.ungot.is_none());
        self.ungot = Some(tok);
    }

    /// The next unquoted word.
    pub fn get_ident(&mut self) -> Result<String> {
        match self.get()? {
            Token::Ident(s) => Ok(s),
            _ => Err(self.err("expected an identifier")),
        }
    }

    /// The next word, unquoted or quoted.
    pub fn get_string(&mut self) -> Result<String> {
        match self.get()? {
            Token::Ident(s) | Token::Quoted(s) => Ok(s),
            _ => Err(self.err("expected a string")),
        }
    }

    /// `Some(word)` or `None` at end of line, leaving the terminator for
    /// the caller.
    pub fn try_ident(&mut self) -> Result<Option<String>> {
        match self.get()? {
            Token::Ident(s) => Ok(Some(s)),
            tok @ (Token::Eol | Token::Eof) => {
                self.unget(tok);
                Ok(None)
            }
            _ => Err(self.err("expected an identifier")),
        }
    }

    /// A character string of at most 255 octets, with escapes decoded.
    pub fn get_char_string(&mut self) -> Result<Vec<u8>> {
        let raw = self.get_string()?;
        let bytes = escaped_bytes(&raw).map_err(|_| self.err("bad escape in string"))?;
        if bytes.len() > 255 {
            return Err(self.err("character string exceeds 255 octets"));
        }
        Ok(bytes)
    }

    pub fn try_char_string(&mut self) -> Result<Option<Vec<u8>>> {
        match self.get()? {
            Token::Ident(s) | Token::Quoted(s) => {
                let bytes = escaped_bytes(&s).map_err(|_| self.err("bad escape in string"))?;
                if bytes.len() > 255 {
                    return Err(self.err("character string exceeds 255 octets"));
                }
                Ok(Some(bytes))
            }
            tok @ (Token::Eol | Token::Eof) => {
                self.unget(tok);
                Ok(None)
            }
            _ => Err(self.err("expected a string")),
        }
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        let s = self.get_ident()?;
        s.parse().map_err(|_| self.err("expected an 8-bit integer"))
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        let s = self.get_ident()?;
        s.parse().map_err(|_| self.err("expected a 16-bit integer"))
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let s = self.get_ident()?;
        s.parse().map_err(|_| self.err("expected a 32-bit integer"))
    }

    /// A TTL: plain seconds or the `1w2d3h4m5s` unit syntax.
    pub fn get_ttl(&mut self) -> Result<u32> {
        let s = self.get_ident()?;
        parse_ttl(&s).map_err(|_| self.err("bad ttl"))
    }

    /// A domain name; `@` stands for the origin.
    pub fn get_name(&mut self, origin: Option<&Name>) -> Result<Name> {
        let s = self.get_ident()?;
        if s == "@" {
            return origin
                .cloned()
                .ok_or_else(|| self.err("@ used without an origin"));
        }
        let name = Name::parse(&s, origin)?;
        if !name.is_absolute() {
            return Err(self.err("relative name without an origin"));
        }
        Ok(name)
    }

    /// Base64 data spread over the rest of the line.
    pub fn get_base64(&mut self) -> Result<Vec<u8>> {
        let mut text = String::new();
        while let Some(word) = self.try_ident()? {
            text.push_str(&word);
        }
        if text.is_empty() {
            return Err(self.err("expected base64 data"));
        }
        Ok(BASE64.decode(text.as_bytes())?)
    }

    /// Hex data spread over the rest of the line.
    pub fn get_hex(&mut self) -> Result<Vec<u8>> {
        let mut text = String::new();
        while let Some(word) = self.try_ident()? {
            text.push_str(&word);
        }
        if text.is_empty() {
            return Err(self.err("expected hex data"));
        }
        parse_hex(&text)
    }

    /// Consumes the RFC 3597 `\# <length> <hex>` form if present.
    pub fn try_unknown_rdata(&mut self) -> Result<Option<Vec<u8>>> {
        match self.get()? {
            Token::Ident(s) if s == "\\#" => {
                let len = self.get_u16()? as usize;
                let data = if len == 0 { Vec::new() } else { self.get_hex()? };
                if data.len() != len {
                    return Err(self.err("\\# length does not match data"));
                }
                Ok(Some(data))
            }
            tok => {
                self.unget(tok);
                Ok(None)
            }
        }
    }

    /// Requires the line (or input) to end here.
    pub fn get_eol(&mut self) -> Result<()> {
        match self.get()? {
            Token::Eol | Token::Eof => Ok(()),
            _ => Err(self.err("unexpected trailing data")),
        }
    }
}

/// Decodes `\X` and `\DDD` escapes into raw bytes.
pub(crate) fn escaped_bytes(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 1;
            if i >= bytes.len() {
                return Err(error!(TextParse => "trailing backslash"));
            }
            if bytes[i].is_ascii_digit() {
                if i + 2 >= bytes.len()
                    || !bytes[i + 1].is_ascii_digit()
                    || !bytes[i + 2].is_ascii_digit()
                {
                    return Err(error!(TextParse => "bad \\DDD escape"));
                }
                let v = (bytes[i] - b'0') as u16 * 100
                    + (bytes[i + 1] - b'0') as u16 * 10
                    + (bytes[i + 2] - b'0') as u16;
                if v > 255 {
                    return Err(error!(TextParse => "\\DDD escape out of range"));
                }
                out.push(v as u8);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// `3600`, or `1w2d3h4m5s` in any mix of units.
pub fn parse_ttl(s: &str) -> Result<u32> {
    if s.is_empty() {
        return Err(error!(TextParse => "empty ttl"));
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        let v: u64 = s.parse().map_err(|_| error!(TextParse => "bad ttl {:?}", s))?;
        if v > MAX_TTL as u64 {
            return Err(error!(TextParse => "ttl {} out of range", v));
        }
        return Ok(v as u32);
    }
    let mut total: u64 = 0;
    let mut value: u64 = 0;
    let mut has_digits = false;
    for c in s.chars() {
        if let Some(d) = c.to_digit(10) {
            value = value * 10 + d as u64;
            has_digits = true;
            continue;
        }
        if !has_digits {
            return Err(error!(TextParse => "bad ttl {:?}", s));
        }
        let unit = match c.to_ascii_lowercase() {
            'w' => 604_800,
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return Err(error!(TextParse => "bad ttl unit {:?}", c)),
        };
        total += value * unit;
        value = 0;
        has_digits = false;
    }
    if has_digits {
        // Trailing bare number counts as seconds.
        total += value;
    }
    if total > MAX_TTL as u64 {
        return Err(error!(TextParse => "ttl {} out of range", total));
    }
    Ok(total as u32)
}

/// Zone-file reader state: origin, default TTL, and the carried-over owner
/// name for lines starting with whitespace.
pub struct Master {
    origin: Option<Name>,
    default_ttl: Option<u32>,
    last_ttl: Option<u32>,
    last_name: Option<Name>,
    records: Vec<Record>,
}

impl Master {
    pub fn new(origin: Option<Name>) -> Master {
        Master {
            origin,
            default_ttl: None,
            last_ttl: None,
            last_name: None,
            records: Vec::new(),
        }
    }

    /// Parses a whole master file from a string.
    pub fn parse_str(text: &str, origin: Option<Name>) -> Result<Vec<Record>> {
        let mut master = Master::new(origin);
        master.feed(text, None)?;
        Ok(master.records)
    }

    /// Parses a master file from disk, resolving `$INCLUDE` paths relative
    /// to it.
    pub fn parse_file<P: AsRef<Path>>(path: P, origin: Option<Name>) -> Result<Vec<Record>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut master = Master::new(origin);
        master.feed(&text, path.parent())?;
        Ok(master.records)
    }

    fn feed(&mut self, text: &str, dir: Option<&Path>) -> Result<()> {
        let mut t = Tokenizer::new(text);
        loop {
            let leading = t.get_raw(true)?;
            let first = match leading {
                Token::Eof => break,
                Token::Eol => continue,
                Token::Whitespace => match t.get()? {
                    Token::Eol => continue,
                    Token::Eof => break,
                    Token::Ident(s) => {
                        // Continuation line: reuse the previous owner.
                        let name = self
                            .last_name
                            .clone()
                            .ok_or_else(|| error!(TextParse => "no previous owner name at line {}", t.line()))?;
                        self.parse_record_tail(name, s, &mut t)?;
                        continue;
                    }
                    _ => return Err(error!(TextParse => "unexpected token at line {}", t.line())),
                },
                Token::Ident(s) => s,
                _ => return Err(error!(TextParse => "unexpected token at line {}", t.line())),
            };

            if let Some(directive) = first.strip_prefix('$') {
                self.parse_directive(&directive.to_ascii_uppercase(), &mut t, dir)?;
                continue;
            }

            let name = if first == "@" {
                self.origin
                    .clone()
                    .ok_or_else(|| error!(TextParse => "@ used without an origin at line {}", t.line()))?
            } else {
                let name = Name::parse(&first, self.origin.as_ref())?;
                if !name.is_absolute() {
                    return Err(
                        error!(TextParse => "relative owner {:?} without an origin at line {}", first, t.line()),
                    );
                }
                name
            };
            let next = t.get_ident()?;
            self.parse_record_tail(name, next, &mut t)?;
        }
        Ok(())
    }

    /// Parses `[ttl] [class] type rdata` starting from an already-read
    /// token, in either ttl/class order.
    fn parse_record_tail(&mut self, name: Name, first: String, t: &mut Tokenizer<'_>) -> Result<()> {
        let mut ttl: Option<u32> = None;
        let mut class: Option<DnsClass> = None;
        let mut word = first;
        let rtype = loop {
            if ttl.is_none() && word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                ttl = Some(parse_ttl(&word)?);
            } else if class.is_none() && DnsClass::from_mnemonic(&word).is_ok() {
                class = Some(DnsClass::from_mnemonic(&word)?);
            } else {
                break RrType::from_mnemonic(&word)?;
            }
            word = t.get_ident()?;
        };

        let rdata = Rdata::parse(rtype, t, self.origin.as_ref())?;
        t.get_eol()?;

        let ttl = match ttl.or(self.default_ttl).or(self.last_ttl) {
            Some(ttl) => ttl,
            None => match &rdata {
                // RFC 1035 zones without $TTL inherit the SOA minimum.
                Rdata::Soa(soa) => soa.minimum,
                _ => return Err(error!(TextParse => "no TTL for {} at line {}", name, t.line())),
            },
        };
        self.last_ttl = Some(ttl);
        self.last_name = Some(name.clone());
        self.records.push(Record::new(
            name,
            rtype,
            class.unwrap_or(DnsClass::IN),
            ttl,
            rdata,
        )?);
        Ok(())
    }

    fn parse_directive(
        &mut self,
        directive: &str,
        t: &mut Tokenizer<'_>,
        dir: Option<&Path>,
    ) -> Result<()> {
        match directive {
            "ORIGIN" => {
                let origin = t.get_name(self.origin.as_ref())?;
                t.get_eol()?;
                self.origin = Some(origin);
            }
            "TTL" => {
                let ttl = t.get_ttl()?;
                t.get_eol()?;
                self.default_ttl = Some(ttl);
            }
            "INCLUDE" => {
                let file = t.get_string()?;
                let included_origin = match t.try_ident()? {
                    Some(s) => Some(Name::parse(&s, self.origin.as_ref())?),
                    None => self.origin.clone(),
                };
                t.get_eol()?;
                let mut path = PathBuf::from(&file);
                if path.is_relative() {
                    if let Some(dir) = dir {
                        path = dir.join(path);
                    }
                }
                let text = std::fs::read_to_string(&path)?;
                let saved = (
                    self.origin.clone(),
                    self.last_name.take(),
                    self.last_ttl.take(),
                );
                self.origin = included_origin;
                self.feed(&text, path.parent())?;
                self.origin = saved.0;
                self.last_name = saved.1;
                self.last_ttl = saved.2;
            }
            "GENERATE" => self.parse_generate(t)?,
            _ => {
                return Err(
                    error!(TextParse => "unknown directive ${} at line {}", directive, t.line()),
                )
            }
        }
        Ok(())
    }

    /// `$GENERATE start-stop[/step] lhs [ttl] [class] type rhs`
    fn parse_generate(&mut self, t: &mut Tokenizer<'_>) -> Result<()> {
        let range = t.get_ident()?;
        let (bounds, step) = match range.split_once('/') {
            Some((b, s)) => (
                b,
                s.parse::<u64>()
                    .map_err(|_| error!(TextParse => "bad $GENERATE step {:?}", s))?,
            ),
            None => (range.as_str(), 1),
        };
        let (start, stop) = bounds
            .split_once('-')
            .ok_or_else(|| error!(TextParse => "bad $GENERATE range {:?}", range))?;
        let start: u64 = start
            .parse()
            .map_err(|_| error!(TextParse => "bad $GENERATE range {:?}", range))?;
        let stop: u64 = stop
            .parse()
            .map_err(|_| error!(TextParse => "bad $GENERATE range {:?}", range))?;
        if start > stop || step == 0 {
            return Err(error!(TextParse => "bad $GENERATE range {:?}", range));
        }

        let lhs = t.get_ident()?;
        let mut words = Vec::new();
        while let Some(word) = t.try_ident()? {
            words.push(word);
        }
        t.get_eol()?;
        let rhs = words
            .pop()
            .ok_or_else(|| error!(TextParse => "$GENERATE is missing rdata"))?;

        let mut value = start;
        while value <= stop {
            let mut line = substitute(&lhs, value)?;
            for w in &words {
                line.push(' ');
                line.push_str(w);
            }
            line.push(' ');
            line.push_str(&substitute(&rhs, value)?);
            line.push('\n');
            self.feed(&line, None)?;
            value += step;
        }
        Ok(())
    }
}

/// `$` and `${offset[,width[,base]]}` substitution for `$GENERATE`.
fn substitute(template: &str, value: u64) -> Result<String> {
    let bytes = template.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && bytes[i + 1] == b'$' => {
                out.push('$');
                i += 2;
            }
            b'$' => {
                i += 1;
                if i < bytes.len() && bytes[i] == b'{' {
                    let end = template[i..]
                        .find('}')
                        .ok_or_else(|| error!(TextParse => "unterminated ${{ in $GENERATE"))?
                        + i;
                    let spec = &template[i + 1..end];
                    i = end + 1;
                    let mut parts = spec.split(',');
                    let offset: i64 = parts
                        .next()
                        .unwrap_or("0")
                        .parse()
                        .map_err(|_| error!(TextParse => "bad $GENERATE modifier {:?}", spec))?;
                    let width: usize = match parts.next() {
                        Some(s) => s
                            .parse()
                            .map_err(|_| error!(TextParse => "bad $GENERATE modifier {:?}", spec))?,
                        None => 0,
                    };
                    let base = parts.next().unwrap_or("d");
                    let v = value as i64 + offset;
                    if v < 0 {
                        return Err(error!(TextParse => "negative $GENERATE value"));
                    }
                    match base {
                        "d" => write!(out, "{:0width$}", v, width = width).unwrap(),
                        "o" => write!(out, "{:0width$o}", v, width = width).unwrap(),
                        "x" => write!(out, "{:0width$x}", v, width = width).unwrap(),
                        "X" => write!(out, "{:0width$X}", v, width = width).unwrap(),
                        _ => return Err(error!(TextParse => "bad $GENERATE base {:?}", base)),
                    }
                } else {
                    write!(out, "{}", value).unwrap();
                }
            }
            b => {
                out.push(b as char);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Parses a single presentation-format record: `name [ttl] [class] type
/// rdata`.
pub fn parse_record(s: &str, origin: Option<&Name>) -> Result<Record> {
    let mut master = Master::new(origin.cloned());
    master.feed(s, None)?;
    let mut records = master.records;
    match records.len() {
        1 => Ok(records.remove(0)),
        n => Err(error!(TextParse => "expected one record, found {}", n)),
    }
}

impl std::str::FromStr for Record {
    type Err = Error;

    fn from_str(s: &str) -> Result<Record> {
        parse_record(s, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn tokens_with_comments_and_parens() {
        let mut t = Tokenizer::new("a b ; trailing\nmulti ( 1 ; inner\n 2 ) end\n");
        assert_eq!(t.get().unwrap(), Token::Ident("a".into()));
        assert_eq!(t.get().unwrap(), Token::Ident("b".into()));
        assert_eq!(t.get().unwrap(), Token::Eol);
        assert_eq!(t.get().unwrap(), Token::Ident("multi".into()));
        assert_eq!(t.get().unwrap(), Token::Ident("1".into()));
        assert_eq!(t.get().unwrap(), Token::Ident("2".into()));
        assert_eq!(t.get().unwrap(), Token::Ident("end".into()));
        assert_eq!(t.get().unwrap(), Token::Eol);
        assert_eq!(t.get().unwrap(), Token::Eof);
    }

    #[test]
    fn quoted_strings_keep_escapes() {
        let mut t = Tokenizer::new("\"hello \\\"world\\\"\" tail");
        assert_eq!(t.get().unwrap(), Token::Quoted("hello \\\"world\\\"".into()));
        assert_eq!(t.get().unwrap(), Token::Ident("tail".into()));
        assert_eq!(
            escaped_bytes("hello \\\"world\\\"").unwrap(),
            b"hello \"world\"".to_vec()
        );
    }

    #[test]
    fn ttl_units() {
        assert_eq!(parse_ttl("3600").unwrap(), 3600);
        assert_eq!(parse_ttl("1h30m").unwrap(), 5400);
        assert_eq!(parse_ttl("1W2D").unwrap(), 777_600);
        assert!(parse_ttl("2147483648").is_err());
        assert!(parse_ttl("xyz").is_err());
    }

    #[test]
    fn single_record_parse() {
        let r: Record = "example.com. 3600 IN A 192.0.2.1".parse().unwrap();
        assert_eq!(r.name(), &"example.com.".parse::<Name>().unwrap());
        assert_eq!(r.rtype(), RrType::A);
        assert_eq!(r.class(), DnsClass::IN);
        assert_eq!(r.ttl(), 3600);
        assert_eq!(r.rdata(), &Rdata::A(Ipv4Addr::new(192, 0, 2, 1)));

        // Class and TTL swap order freely.
        let r2: Record = "example.com. IN 3600 A 192.0.2.1".parse().unwrap();
        assert_eq!(r, r2);
    }

    #[test]
    fn zone_text_with_directives() {
        let text = "\
$ORIGIN example.com.
$TTL 1h
@  IN SOA ns1 admin ( 2024010101 7200 900 1209600 300 )
   IN NS ns1
ns1 IN A 192.0.2.53
www 300 IN CNAME ns1
$GENERATE 1-3 host-$ IN A 10.0.0.$
";
        let records = Master::parse_str(text, None).unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(records[0].rtype(), RrType::SOA);
        assert_eq!(records[0].name().to_string(), "example.com.");
        // Continuation line reuses the previous owner.
        assert_eq!(records[1].name().to_string(), "example.com.");
        assert_eq!(records[1].ttl(), 3600);
        assert_eq!(records[3].ttl(), 300);
        assert_eq!(records[4].name().to_string(), "host-1.example.com.");
        assert_eq!(
            records[6].rdata(),
            &Rdata::A(Ipv4Addr::new(10, 0, 0, 3))
        );
    }

    #[test]
    fn generate_modifiers() {
        assert_eq!(substitute("host-$", 7).unwrap(), "host-7");
        assert_eq!(substitute("${0,3,d}", 7).unwrap(), "007");
        assert_eq!(substitute("${16,2,x}", 10).unwrap(), "1a");
        assert_eq!(substitute("\\$plain", 1).unwrap(), "$plain");
    }

    #[test]
    fn soa_minimum_is_the_fallback_ttl() {
        let text = "example.com. IN SOA ns1.example.com. admin.example.com. 1 2 3 4 600\n";
        let records = Master::parse_str(text, None).unwrap();
        assert_eq!(records[0].ttl(), 600);
    }

    #[test]
    fn includes_read_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub.zone");
        std::fs::write(&sub, "www IN A 192.0.2.80\n").unwrap();
        let main = dir.path().join("main.zone");
        std::fs::write(
            &main,
            "$ORIGIN example.com.\n$TTL 60\n@ IN NS ns1.example.com.\n$INCLUDE sub.zone\n",
        )
        .unwrap();

        let records = Master::parse_file(&main, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name().to_string(), "www.example.com.");
    }
}
