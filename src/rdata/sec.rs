//! DNSSEC and certificate rdata: DNSKEY, DS, SSHFP, TLSA, CERT, DHCID is in
//! the dispatch table, and the NSEC family with its type bitmaps.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{error, Result};
use crate::master::Tokenizer;
use crate::name::Name;
use crate::rdata::{emit_name, fmt_hex, parse_hex};
use crate::rr::RrType;
use crate::rrset::TypeBitmap;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dnskey {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub key: Vec<u8>,
}

impl Dnskey {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Dnskey> {
        Ok(Dnskey {
            flags: r.read_u16()?,
            protocol: r.read_u8()?,
            algorithm: r.read_u8()?,
            key: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u16(self.flags);
        w.write_u8(self.protocol);
        w.write_u8(self.algorithm);
        w.write_bytes(&self.key);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Dnskey> {
        Ok(Dnskey {
            flags: t.get_u16()?,
            protocol: t.get_u8()?,
            algorithm: t.get_u8()?,
            key: t.get_base64()?,
        })
    }
}

impl fmt::Display for Dnskey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.flags,
            self.protocol,
            self.algorithm,
            BASE64.encode(&self.key)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ds {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

impl Ds {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Ds> {
        Ok(Ds {
            key_tag: r.read_u16()?,
            algorithm: r.read_u8()?,
            digest_type: r.read_u8()?,
            digest: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u16(self.key_tag);
        w.write_u8(self.algorithm);
        w.write_u8(self.digest_type);
        w.write_bytes(&self.digest);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Ds> {
        Ok(Ds {
            key_tag: t.get_u16()?,
            algorithm: t.get_u8()?,
            digest_type: t.get_u8()?,
            digest: t.get_hex()?,
        })
    }
}

impl fmt::Display for Ds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key_tag,
            self.algorithm,
            self.digest_type,
            fmt_hex(&self.digest)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sshfp {
    pub algorithm: u8,
    pub digest_type: u8,
    pub fingerprint: Vec<u8>,
}

impl Sshfp {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Sshfp> {
        Ok(Sshfp {
            algorithm: r.read_u8()?,
            digest_type: r.read_u8()?,
            fingerprint: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u8(self.algorithm);
        w.write_u8(self.digest_type);
        w.write_bytes(&self.fingerprint);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Sshfp> {
        Ok(Sshfp {
            algorithm: t.get_u8()?,
            digest_type: t.get_u8()?,
            fingerprint: t.get_hex()?,
        })
    }
}

impl fmt::Display for Sshfp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.algorithm,
            self.digest_type,
            fmt_hex(&self.fingerprint)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlsa {
    pub usage: u8,
    pub selector: u8,
    pub matching_type: u8,
    pub data: Vec<u8>,
}

impl Tlsa {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Tlsa> {
        Ok(Tlsa {
            usage: r.read_u8()?,
            selector: r.read_u8()?,
            matching_type: r.read_u8()?,
            data: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u8(self.usage);
        w.write_u8(self.selector);
        w.write_u8(self.matching_type);
        w.write_bytes(&self.data);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Tlsa> {
        Ok(Tlsa {
            usage: t.get_u8()?,
            selector: t.get_u8()?,
            matching_type: t.get_u8()?,
            data: t.get_hex()?,
        })
    }
}

impl fmt::Display for Tlsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.usage,
            self.selector,
            self.matching_type,
            fmt_hex(&self.data)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cert {
    pub cert_type: u16,
    pub key_tag: u16,
    pub algorithm: u8,
    pub cert: Vec<u8>,
}

impl Cert {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Cert> {
        Ok(Cert {
            cert_type: r.read_u16()?,
            key_tag: r.read_u16()?,
            algorithm: r.read_u8()?,
            cert: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u16(self.cert_type);
        w.write_u16(self.key_tag);
        w.write_u8(self.algorithm);
        w.write_bytes(&self.cert);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Cert> {
        Ok(Cert {
            cert_type: t.get_u16()?,
            key_tag: t.get_u16()?,
            algorithm: t.get_u8()?,
            cert: t.get_base64()?,
        })
    }
}

impl fmt::Display for Cert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.cert_type,
            self.key_tag,
            self.algorithm,
            BASE64.encode(&self.cert)
        )
    }
}

/// NSEC: next owner in canonical order plus the type bitmap at this owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec {
    pub next: Name,
    pub types: TypeBitmap,
}

impl Nsec {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Nsec> {
        Ok(Nsec {
            next: Name::from_wire(r)?,
            types: TypeBitmap::from_wire(r)?,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        // RFC 6840: the next name is not lowercased in the canonical form.
        let _ = canonical;
        emit_name(&self.next, w, None, false)?;
        self.types.to_wire(w);
        Ok(())
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Nsec> {
        let next = t.get_name(origin)?;
        let mut types = Vec::new();
        while let Some(word) = t.try_ident()? {
            types.push(RrType::from_mnemonic(&word)?);
        }
        Ok(Nsec {
            next,
            types: TypeBitmap::new(types),
        })
    }
}

impl fmt::Display for Nsec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.next, self.types)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec3 {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    pub next: Vec<u8>,
    pub types: TypeBitmap,
}

impl Nsec3 {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Nsec3> {
        let hash_algorithm = r.read_u8()?;
        let flags = r.read_u8()?;
        let iterations = r.read_u16()?;
        let salt = r.read_counted_string()?.to_vec();
        let next = r.read_counted_string()?.to_vec();
        let types = TypeBitmap::from_wire(r)?;
        Ok(Nsec3 {
            hash_algorithm,
            flags,
            iterations,
            salt,
            next,
            types,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) -> Result<()> {
        w.write_u8(self.hash_algorithm);
        w.write_u8(self.flags);
        w.write_u16(self.iterations);
        w.write_counted_string(&self.salt)?;
        w.write_counted_string(&self.next)?;
        self.types.to_wire(w);
        Ok(())
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Nsec3> {
        let hash_algorithm = t.get_u8()?;
        let flags = t.get_u8()?;
        let iterations = t.get_u16()?;
        let salt = parse_salt(&t.get_ident()?)?;
        let next = base32hex_decode(&t.get_ident()?)?;
        let mut types = Vec::new();
        while let Some(word) = t.try_ident()? {
            types.push(RrType::from_mnemonic(&word)?);
        }
        Ok(Nsec3 {
            hash_algorithm,
            flags,
            iterations,
            salt,
            next,
            types: TypeBitmap::new(types),
        })
    }
}

impl fmt::Display for Nsec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}{}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            fmt_salt(&self.salt),
            base32hex_encode(&self.next),
            self.types
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec3Param {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
}

impl Nsec3Param {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Nsec3Param> {
        Ok(Nsec3Param {
            hash_algorithm: r.read_u8()?,
            flags: r.read_u8()?,
            iterations: r.read_u16()?,
            salt: r.read_counted_string()?.to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) -> Result<()> {
        w.write_u8(self.hash_algorithm);
        w.write_u8(self.flags);
        w.write_u16(self.iterations);
        w.write_counted_string(&self.salt)
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Nsec3Param> {
        Ok(Nsec3Param {
            hash_algorithm: t.get_u8()?,
            flags: t.get_u8()?,
            iterations: t.get_u16()?,
            salt: parse_salt(&t.get_ident()?)?,
        })
    }
}

impl fmt::Display for Nsec3Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            fmt_salt(&self.salt)
        )
    }
}

fn fmt_salt(salt: &[u8]) -> String {
    if salt.is_empty() {
        "-".to_string()
    } else {
        fmt_hex(salt)
    }
}

fn parse_salt(s: &str) -> Result<Vec<u8>> {
    if s == "-" {
        Ok(Vec::new())
    } else {
        parse_hex(s)
    }
}

const BASE32HEX: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";

/// RFC 4648 base32hex without padding, as used for NSEC3 hashes.
pub(crate) fn base32hex_encode(data: &[u8]) -> String {
    let mut out = String::new();
    for chunk in data.chunks(5) {
        let mut buf = [0u8; 5];
        buf[..chunk.len()].copy_from_slice(chunk);
        let v = u64::from(buf[0]) << 32
            | u64::from(buf[1]) << 24
            | u64::from(buf[2]) << 16
            | u64::from(buf[3]) << 8
            | u64::from(buf[4]);
        let chars = (chunk.len() * 8 + 4) / 5;
        for i in 0..chars {
            let shift = 35 - i * 5;
            out.push(BASE32HEX[(v >> shift & 0x1f) as usize] as char);
        }
    }
    out
}

pub(crate) fn base32hex_decode(s: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for chunk in s.as_bytes().chunks(8) {
        let mut v = 0u64;
        for (i, &c) in chunk.iter().enumerate() {
            let d = BASE32HEX
                .iter()
                .position(|&b| b == c.to_ascii_uppercase())
                .ok_or_else(|| error!(TextParse => "bad base32hex digit {:?}", c as char))?;
            v |= (d as u64) << (35 - i * 5);
        }
        let bytes = chunk.len() * 5 / 8;
        for i in 0..bytes {
            out.push((v >> (32 - i * 8) & 0xff) as u8);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base32hex_round_trip() {
        let data = [0x01u8, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x10, 0x32];
        let text = base32hex_encode(&data);
        assert_eq!(base32hex_decode(&text).unwrap(), data);
        // Lowercase input is accepted.
        assert_eq!(base32hex_decode(&text.to_lowercase()).unwrap(), data);
    }

    #[test]
    fn empty_salt_presents_as_dash() {
        assert_eq!(fmt_salt(&[]), "-");
        assert_eq!(parse_salt("-").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_salt("AB").unwrap(), vec![0xab]);
    }
}
