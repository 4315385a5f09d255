//! LOC rdata (RFC 1876): geographic position with exponent-encoded
//! size and precision fields.

use std::fmt;

use crate::error::{error, Result};
use crate::master::Tokenizer;
use crate::wire::{WireReader, WireWriter};

/// Latitude/longitude are stored as thousandths of an arcsecond offset
/// from 2^31; altitude, size, and precisions in centimeters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loc {
    pub size: u8,
    pub h_precision: u8,
    pub v_precision: u8,
    pub latitude: u32,
    pub longitude: u32,
    pub altitude: u32,
}

const EQUATOR: u64 = 1 << 31;
const ALTITUDE_BASE: u64 = 10_000_000;

impl Default for Loc {
    fn default() -> Self {
        // 1m size, 10km horizontal, 10m vertical precision per RFC 1876.
        Loc {
            size: 0x12,
            h_precision: 0x16,
            v_precision: 0x13,
            latitude: EQUATOR as u32,
            longitude: EQUATOR as u32,
            altitude: ALTITUDE_BASE as u32,
        }
    }
}

impl Loc {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Loc> {
        let version = r.read_u8()?;
        if version != 0 {
            return Err(error!(WireParse => "unknown LOC version {}", version));
        }
        Ok(Loc {
            size: r.read_u8()?,
            h_precision: r.read_u8()?,
            v_precision: r.read_u8()?,
            latitude: r.read_u32()?,
            longitude: r.read_u32()?,
            altitude: r.read_u32()?,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u8(0);
        w.write_u8(self.size);
        w.write_u8(self.h_precision);
        w.write_u8(self.v_precision);
        w.write_u32(self.latitude);
        w.write_u32(self.longitude);
        w.write_u32(self.altitude);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Loc> {
        let mut loc = Loc::default();
        loc.latitude = parse_position(t, b"NS")?;
        loc.longitude = parse_position(t, b"EW")?;

        let alt = parse_meters(&t.get_ident()?)?;
        let alt = ALTITUDE_BASE as i64 + alt;
        if !(0..=u32::MAX as i64).contains(&alt) {
            return Err(error!(TextParse => "altitude out of range"));
        }
        loc.altitude = alt as u32;

        if let Some(s) = t.try_ident()? {
            loc.size = encode_exponent(parse_meters(&s)?)?;
            if let Some(s) = t.try_ident()? {
                loc.h_precision = encode_exponent(parse_meters(&s)?)?;
                if let Some(s) = t.try_ident()? {
                    loc.v_precision = encode_exponent(parse_meters(&s)?)?;
                }
            }
        }
        Ok(loc)
    }
}

/// Degrees, optional minutes and decimal seconds, then a hemisphere letter.
fn parse_position(t: &mut Tokenizer<'_>, hemispheres: &[u8; 2]) -> Result<u32> {
    let degrees: u64 = t.get_u16()? as u64;
    let mut minutes = 0u64;
    let mut msecs = 0u64;

    let mut token = t.get_ident()?;
    if token.chars().all(|c| c.is_ascii_digit()) {
        minutes = token
            .parse()
            .map_err(|_| error!(TextParse => "bad minutes {:?}", token))?;
        token = t.get_ident()?;
        if token.chars().any(|c| c.is_ascii_digit()) {
            msecs = parse_milli(&token)?;
            token = t.get_ident()?;
        }
    }
    if degrees > 180 || minutes > 59 || msecs > 59_999 {
        return Err(error!(TextParse => "position out of range"));
    }

    let total = ((degrees * 60 + minutes) * 60) * 1000 + msecs;
    let hemi = token.to_ascii_uppercase();
    let positive = hemi.as_bytes() == [hemispheres[0]];
    if !positive && hemi.as_bytes() != [hemispheres[1]] {
        return Err(error!(TextParse => "bad hemisphere {:?}", token));
    }
    let value = if positive {
        EQUATOR + total
    } else {
        EQUATOR - total
    };
    Ok(value as u32)
}

/// A decimal number of meters with up to centimeter precision and an
/// optional trailing `m`, returned in centimeters.
fn parse_meters(s: &str) -> Result<i64> {
    let s = s.strip_suffix('m').unwrap_or(s);
    let (sign, s) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s),
    };
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || frac.len() > 2 || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(error!(TextParse => "bad distance {:?}", s));
    }
    let whole: i64 = whole
        .parse()
        .map_err(|_| error!(TextParse => "bad distance {:?}", s))?;
    let mut cm = 0i64;
    if !frac.is_empty() {
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(error!(TextParse => "bad distance {:?}", s));
        }
        cm = frac.parse::<i64>().unwrap();
        if frac.len() == 1 {
            cm *= 10;
        }
    }
    Ok(sign * (whole * 100 + cm))
}

/// Packs centimeters into the RFC 1876 mantissa/exponent octet.
fn encode_exponent(cm: i64) -> Result<u8> {
    if cm < 0 {
        return Err(error!(TextParse => "negative distance"));
    }
    let mut value = cm as u64;
    let mut exponent = 0u8;
    while value >= 10 {
        value /= 10;
        exponent += 1;
        if exponent > 9 {
            return Err(error!(TextParse => "distance too large"));
        }
    }
    Ok((value as u8) << 4 | exponent)
}

fn decode_exponent(encoded: u8) -> u64 {
    let mantissa = (encoded >> 4) as u64;
    let exponent = (encoded & 0x0f) as u32;
    mantissa * 10u64.pow(exponent.min(9))
}

fn parse_milli(s: &str) -> Result<u64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if !whole.chars().all(|c| c.is_ascii_digit())
        || frac.len() > 3
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(error!(TextParse => "bad seconds {:?}", s));
    }
    let mut ms: u64 = whole
        .parse::<u64>()
        .map_err(|_| error!(TextParse => "bad seconds {:?}", s))?
        * 1000;
    if !frac.is_empty() {
        ms += frac.parse::<u64>().unwrap() * 10u64.pow(3 - frac.len() as u32);
    }
    Ok(ms)
}

fn fmt_position(f: &mut fmt::Formatter<'_>, value: u32, hemispheres: [char; 2]) -> fmt::Result {
    let (mut rest, hemi) = if value as u64 >= EQUATOR {
        (value as u64 - EQUATOR, hemispheres[0])
    } else {
        (EQUATOR - value as u64, hemispheres[1])
    };
    let msecs = rest % 60_000;
    rest /= 60_000;
    let minutes = rest % 60;
    let degrees = rest / 60;
    write!(
        f,
        "{} {} {}.{:03} {}",
        degrees,
        minutes,
        msecs / 1000,
        msecs % 1000,
        hemi
    )
}

fn fmt_cm(f: &mut fmt::Formatter<'_>, cm: i64) -> fmt::Result {
    if cm % 100 == 0 {
        write!(f, "{}m", cm / 100)
    } else {
        let sign = if cm < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}m", sign, cm.abs() / 100, cm.abs() % 100)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_position(f, self.latitude, ['N', 'S'])?;
        write!(f, " ")?;
        fmt_position(f, self.longitude, ['E', 'W'])?;
        write!(f, " ")?;
        fmt_cm(f, self.altitude as i64 - ALTITUDE_BASE as i64)?;
        write!(f, " ")?;
        fmt_cm(f, decode_exponent(self.size) as i64)?;
        write!(f, " ")?;
        fmt_cm(f, decode_exponent(self.h_precision) as i64)?;
        write!(f, " ")?;
        fmt_cm(f, decode_exponent(self.v_precision) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_encoding() {
        assert_eq!(encode_exponent(100).unwrap(), 0x12);
        assert_eq!(decode_exponent(0x12), 100);
        assert_eq!(decode_exponent(0x16), 1_000_000);
        assert!(encode_exponent(-1).is_err());
    }

    #[test]
    fn meters_parse() {
        assert_eq!(parse_meters("1m").unwrap(), 100);
        assert_eq!(parse_meters("-25.5").unwrap(), -2550);
        assert_eq!(parse_meters("0.07m").unwrap(), 7);
        assert!(parse_meters("xyz").is_err());
    }
}
