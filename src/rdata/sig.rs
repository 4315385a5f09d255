//! SIG/RRSIG rdata, shared by both types: the cover type, validity window,
//! signer, and signature. Timestamps present as `YYYYMMDDHHmmSS`.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{error, Result};
use crate::master::Tokenizer;
use crate::name::Name;
use crate::rdata::emit_name;
use crate::rr::RrType;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sig {
    pub type_covered: RrType,
    pub algorithm: u8,
    pub labels: u8,
    pub orig_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: Name,
    pub signature: Vec<u8>,
}

impl Sig {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Sig> {
        Ok(Sig {
            type_covered: RrType(r.read_u16()?),
            algorithm: r.read_u8()?,
            labels: r.read_u8()?,
            orig_ttl: r.read_u32()?,
            expiration: r.read_u32()?,
            inception: r.read_u32()?,
            key_tag: r.read_u16()?,
            signer: Name::from_wire(r)?,
            signature: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        w.write_u16(self.type_covered.0);
        w.write_u8(self.algorithm);
        w.write_u8(self.labels);
        w.write_u32(self.orig_ttl);
        w.write_u32(self.expiration);
        w.write_u32(self.inception);
        w.write_u16(self.key_tag);
        emit_name(&self.signer, w, None, canonical)?;
        w.write_bytes(&self.signature);
        Ok(())
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Sig> {
        Ok(Sig {
            type_covered: RrType::from_mnemonic(&t.get_ident()?)?,
            algorithm: t.get_u8()?,
            labels: t.get_u8()?,
            orig_ttl: t.get_ttl()?,
            expiration: parse_time(&t.get_ident()?)?,
            inception: parse_time(&t.get_ident()?)?,
            key_tag: t.get_u16()?,
            signer: t.get_name(origin)?,
            signature: t.get_base64()?,
        })
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.type_covered,
            self.algorithm,
            self.labels,
            self.orig_ttl,
            format_time(self.expiration),
            format_time(self.inception),
            self.key_tag,
            self.signer,
            BASE64.encode(&self.signature)
        )
    }
}

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Renders seconds since the epoch as `YYYYMMDDHHmmSS`.
pub fn format_time(secs: u32) -> String {
    let mut days = secs / 86400;
    let sod = secs % 86400;
    let mut year = 1970;
    loop {
        let in_year = if is_leap(year) { 366 } else { 365 };
        if days < in_year {
            break;
        }
        days -= in_year;
        year += 1;
    }
    let mut month = 0;
    loop {
        let mut in_month = DAYS_IN_MONTH[month];
        if month == 1 && is_leap(year) {
            in_month += 1;
        }
        if days < in_month {
            break;
        }
        days -= in_month;
        month += 1;
    }
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        year,
        month + 1,
        days + 1,
        sod / 3600,
        sod / 60 % 60,
        sod % 60
    )
}

/// Parses `YYYYMMDDHHmmSS`, or a bare integer as raw epoch seconds.
pub fn parse_time(s: &str) -> Result<u32> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(error!(TextParse => "bad time {:?}", s));
    }
    if s.len() <= 10 {
        return s
            .parse::<u32>()
            .map_err(|_| error!(TextParse => "bad time {:?}", s));
    }
    if s.len() != 14 {
        return Err(error!(TextParse => "bad time {:?}", s));
    }
    let field = |from: usize, to: usize| s[from..to].parse::<u32>().unwrap();
    let (year, month, day) = (field(0, 4), field(4, 6), field(6, 8));
    let (hour, minute, second) = (field(8, 10), field(10, 12), field(12, 14));
    if !(1970..2107).contains(&year)
        || !(1..=12).contains(&month)
        || day < 1
        || hour > 23
        || minute > 59
        || second > 59
    {
        return Err(error!(TextParse => "time {:?} out of range", s));
    }
    let mut in_month = DAYS_IN_MONTH[month as usize - 1];
    if month == 2 && is_leap(year) {
        in_month += 1;
    }
    if day > in_month {
        return Err(error!(TextParse => "time {:?} out of range", s));
    }

    let mut days: u64 = 0;
    for y in 1970..year {
        days += if is_leap(y) { 366 } else { 365 };
    }
    for m in 1..month {
        days += DAYS_IN_MONTH[m as usize - 1] as u64;
        if m == 2 && is_leap(year) {
            days += 1;
        }
    }
    days += day as u64 - 1;
    let secs = days * 86400 + hour as u64 * 3600 + minute as u64 * 60 + second as u64;
    if secs > u32::MAX as u64 {
        return Err(error!(TextParse => "time {:?} out of range", s));
    }
    Ok(secs as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trips() {
        assert_eq!(format_time(0), "19700101000000");
        assert_eq!(parse_time("19700101000000").unwrap(), 0);

        // A leap day survives the round trip.
        let t = parse_time("20200229120000").unwrap();
        assert_eq!(format_time(t), "20200229120000");

        let t = parse_time("20380119031407").unwrap();
        assert_eq!(t, 0x7fff_ffff);
        assert_eq!(format_time(t), "20380119031407");

        assert_eq!(parse_time("1577836800").unwrap(), 1_577_836_800);
        assert!(parse_time("20211301000000").is_err());
        assert!(parse_time("2021").is_ok());
        assert!(parse_time("garbage").is_err());
    }
}
