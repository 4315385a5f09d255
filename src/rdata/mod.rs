//! Record data, one variant per supported type.
//!
//! `Rdata` is a discriminated union with a common wire/presentation codec
//! surface; dispatch is a match on the numeric type. Types the registry does
//! not know carry their rdata as opaque bytes and round-trip through the
//! RFC 3597 `\#` syntax.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::edns::EdnsOption;
use crate::error::{error, Result};
use crate::master::Tokenizer;
use crate::name::{Compression, Name};
use crate::rr::RrType;
use crate::wire::{WireReader, WireWriter};

mod apl;
mod loc;
mod mail;
mod sec;
mod sig;
mod soa;
mod srv;
mod text;
mod tsig;

pub use apl::{Apl, AplItem, Wks};
pub use loc::Loc;
pub use mail::{Exchange, Minfo, Rp};
pub use sec::{Cert, Dnskey, Ds, Nsec, Nsec3, Nsec3Param, Sshfp, Tlsa};
pub use sig::Sig;
pub use soa::Soa;
pub use srv::{Naptr, Srv};
pub use text::{Hinfo, Isdn};
pub use tsig::{Tkey, Tsig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rdata {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(Name),
    Cname(Name),
    Ptr(Name),
    Dname(Name),
    Mb(Name),
    Md(Name),
    Mf(Name),
    Mg(Name),
    Mr(Name),
    Soa(Soa),
    Mx(Exchange),
    Kx(Exchange),
    Rt(Exchange),
    Afsdb(Exchange),
    Minfo(Minfo),
    Rp(Rp),
    Txt(Vec<Vec<u8>>),
    Spf(Vec<Vec<u8>>),
    Hinfo(Hinfo),
    Isdn(Isdn),
    X25(Vec<u8>),
    Srv(Srv),
    Naptr(Naptr),
    Loc(Loc),
    Cert(Cert),
    Sshfp(Sshfp),
    Dhcid(Vec<u8>),
    Tlsa(Tlsa),
    Ds(Ds),
    Dnskey(Dnskey),
    Nsec(Nsec),
    Nsec3(Nsec3),
    Nsec3Param(Nsec3Param),
    Rrsig(Sig),
    Sig(Sig),
    Tkey(Tkey),
    Tsig(Tsig),
    Opt(Vec<EdnsOption>),
    Wks(Wks),
    Apl(Apl),
    Null(Vec<u8>),
    Unknown(Vec<u8>),
    /// Question entries and zero-length rdata.
    Empty,
}

impl Rdata {
    /// Decodes the active region of `r` (already narrowed to rdlength) as
    /// rdata of the given type. Unregistered types fall back to opaque bytes.
    pub fn from_wire(rtype: RrType, r: &mut WireReader<'_>) -> Result<Rdata> {
        if r.is_empty() {
            return Ok(Rdata::Empty);
        }
        Ok(match rtype {
            RrType::A => {
                let o = r.read_bytes(4)?;
                Rdata::A(Ipv4Addr::new(o[0], o[1], o[2], o[3]))
            }
            RrType::AAAA => {
                let o = r.read_bytes(16)?;
                let mut b = [0u8; 16];
                b.copy_from_slice(o);
                Rdata::Aaaa(Ipv6Addr::from(b))
            }
            RrType::NS => Rdata::Ns(Name::from_wire(r)?),
            RrType::CNAME => Rdata::Cname(Name::from_wire(r)?),
            RrType::PTR => Rdata::Ptr(Name::from_wire(r)?),
            RrType::DNAME => Rdata::Dname(Name::from_wire(r)?),
            RrType::MB => Rdata::Mb(Name::from_wire(r)?),
            RrType::MD => Rdata::Md(Name::from_wire(r)?),
            RrType::MF => Rdata::Mf(Name::from_wire(r)?),
            RrType::MG => Rdata::Mg(Name::from_wire(r)?),
            RrType::MR => Rdata::Mr(Name::from_wire(r)?),
            RrType::SOA => Rdata::Soa(Soa::from_wire(r)?),
            RrType::MX => Rdata::Mx(Exchange::from_wire(r)?),
            RrType::KX => Rdata::Kx(Exchange::from_wire(r)?),
            RrType::RT => Rdata::Rt(Exchange::from_wire(r)?),
            RrType::AFSDB => Rdata::Afsdb(Exchange::from_wire(r)?),
            RrType::MINFO => Rdata::Minfo(Minfo::from_wire(r)?),
            RrType::RP => Rdata::Rp(Rp::from_wire(r)?),
            RrType::TXT => Rdata::Txt(read_strings(r)?),
            RrType::SPF => Rdata::Spf(read_strings(r)?),
            RrType::HINFO => Rdata::Hinfo(Hinfo::from_wire(r)?),
            RrType::ISDN => Rdata::Isdn(Isdn::from_wire(r)?),
            RrType::X25 => Rdata::X25(r.read_counted_string()?.to_vec()),
            RrType::SRV => Rdata::Srv(Srv::from_wire(r)?),
            RrType::NAPTR => Rdata::Naptr(Naptr::from_wire(r)?),
            RrType::LOC => Rdata::Loc(Loc::from_wire(r)?),
            RrType::CERT => Rdata::Cert(Cert::from_wire(r)?),
            RrType::SSHFP => Rdata::Sshfp(Sshfp::from_wire(r)?),
            RrType::DHCID => Rdata::Dhcid(r.read_remaining().to_vec()),
            RrType::TLSA => Rdata::Tlsa(Tlsa::from_wire(r)?),
            RrType::DS => Rdata::Ds(Ds::from_wire(r)?),
            RrType::DNSKEY => Rdata::Dnskey(Dnskey::from_wire(r)?),
            RrType::NSEC => Rdata::Nsec(Nsec::from_wire(r)?),
            RrType::NSEC3 => Rdata::Nsec3(Nsec3::from_wire(r)?),
            RrType::NSEC3PARAM => Rdata::Nsec3Param(Nsec3Param::from_wire(r)?),
            RrType::RRSIG => Rdata::Rrsig(Sig::from_wire(r)?),
            RrType::SIG => Rdata::Sig(Sig::from_wire(r)?),
            RrType::TKEY => Rdata::Tkey(Tkey::from_wire(r)?),
            RrType::TSIG => Rdata::Tsig(Tsig::from_wire(r)?),
            RrType::OPT => Rdata::Opt(EdnsOption::list_from_wire(r)?),
            RrType::WKS => Rdata::Wks(Wks::from_wire(r)?),
            RrType::APL => Rdata::Apl(Apl::from_wire(r)?),
            RrType::NULL => Rdata::Null(r.read_remaining().to_vec()),
            _ => Rdata::Unknown(r.read_remaining().to_vec()),
        })
    }

    /// Emits the rdata. `compression` is only ever passed for the RFC 1035
    /// types whose rdata historically compressed; `canonical` lowercases
    /// and never compresses embedded names.
    pub fn to_wire(
        &self,
        w: &mut WireWriter,
        mut c: Option<&mut Compression>,
        canonical: bool,
    ) -> Result<()> {
        match self {
            Rdata::A(a) => w.write_bytes(&a.octets()),
            Rdata::Aaaa(a) => w.write_bytes(&a.octets()),
            Rdata::Ns(n)
            | Rdata::Cname(n)
            | Rdata::Ptr(n)
            | Rdata::Mb(n)
            | Rdata::Md(n)
            | Rdata::Mf(n)
            | Rdata::Mg(n)
            | Rdata::Mr(n) => emit_name(n, w, c.as_deref_mut(), canonical)?,
            // DNAME targets are emitted uncompressed by convention.
            Rdata::Dname(n) => emit_name(n, w, None, canonical)?,
            Rdata::Soa(soa) => soa.to_wire(w, c, canonical)?,
            Rdata::Mx(x) => x.to_wire(w, c, canonical)?,
            Rdata::Kx(x) | Rdata::Rt(x) | Rdata::Afsdb(x) => x.to_wire(w, None, canonical)?,
            Rdata::Minfo(m) => m.to_wire(w, c, canonical)?,
            Rdata::Rp(rp) => rp.to_wire(w, canonical)?,
            Rdata::Txt(strings) | Rdata::Spf(strings) => {
                for s in strings {
                    w.write_counted_string(s)?;
                }
            }
            Rdata::Hinfo(h) => h.to_wire(w)?,
            Rdata::Isdn(i) => i.to_wire(w)?,
            Rdata::X25(s) => w.write_counted_string(s)?,
            Rdata::Srv(s) => s.to_wire(w, canonical)?,
            Rdata::Naptr(n) => n.to_wire(w, canonical)?,
            Rdata::Loc(l) => l.to_wire(w),
            Rdata::Cert(cert) => cert.to_wire(w),
            Rdata::Sshfp(s) => s.to_wire(w),
            Rdata::Dhcid(d) => w.write_bytes(d),
            Rdata::Tlsa(t) => t.to_wire(w),
            Rdata::Ds(d) => d.to_wire(w),
            Rdata::Dnskey(k) => k.to_wire(w),
            Rdata::Nsec(n) => n.to_wire(w, canonical)?,
            Rdata::Nsec3(n) => n.to_wire(w)?,
            Rdata::Nsec3Param(n) => n.to_wire(w)?,
            Rdata::Rrsig(s) | Rdata::Sig(s) => s.to_wire(w, canonical)?,
            Rdata::Tkey(t) => t.to_wire(w, canonical)?,
            Rdata::Tsig(t) => t.to_wire(w, canonical)?,
            Rdata::Opt(options) => EdnsOption::list_to_wire(options, w)?,
            Rdata::Wks(wks) => wks.to_wire(w),
            Rdata::Apl(apl) => apl.to_wire(w),
            Rdata::Null(d) | Rdata::Unknown(d) => w.write_bytes(d),
            Rdata::Empty => {}
        }
        Ok(())
    }

    /// Parses presentation-format rdata for the given type. Names resolve
    /// against `origin`. Meta types (OPT, TSIG, TKEY) have no presentation
    /// form.
    pub fn parse(rtype: RrType, t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Rdata> {
        // RFC 3597: "\# <length> <hex>" is accepted for any type.
        if let Some(data) = t.try_unknown_rdata()? {
            return Ok(match rtype {
                RrType::NULL => Rdata::Null(data),
                _ => Rdata::Unknown(data),
            });
        }
        Ok(match rtype {
            RrType::A => {
                let s = t.get_ident()?;
                let addr: Ipv4Addr = s
                    .parse()
                    .map_err(|_| error!(TextParse => "bad IPv4 address {:?}", s))?;
                Rdata::A(addr)
            }
            RrType::AAAA => {
                let s = t.get_ident()?;
                let addr: Ipv6Addr = s
                    .parse()
                    .map_err(|_| error!(TextParse => "bad IPv6 address {:?}", s))?;
                Rdata::Aaaa(addr)
            }
            RrType::NS => Rdata::Ns(t.get_name(origin)?),
            RrType::CNAME => Rdata::Cname(t.get_name(origin)?),
            RrType::PTR => Rdata::Ptr(t.get_name(origin)?),
            RrType::DNAME => Rdata::Dname(t.get_name(origin)?),
            RrType::MB => Rdata::Mb(t.get_name(origin)?),
            RrType::MD => Rdata::Md(t.get_name(origin)?),
            RrType::MF => Rdata::Mf(t.get_name(origin)?),
            RrType::MG => Rdata::Mg(t.get_name(origin)?),
            RrType::MR => Rdata::Mr(t.get_name(origin)?),
            RrType::SOA => Rdata::Soa(Soa::parse(t, origin)?),
            RrType::MX => Rdata::Mx(Exchange::parse(t, origin)?),
            RrType::KX => Rdata::Kx(Exchange::parse(t, origin)?),
            RrType::RT => Rdata::Rt(Exchange::parse(t, origin)?),
            RrType::AFSDB => Rdata::Afsdb(Exchange::parse(t, origin)?),
            RrType::MINFO => Rdata::Minfo(Minfo::parse(t, origin)?),
            RrType::RP => Rdata::Rp(Rp::parse(t, origin)?),
            RrType::TXT => Rdata::Txt(parse_strings(t)?),
            RrType::SPF => Rdata::Spf(parse_strings(t)?),
            RrType::HINFO => Rdata::Hinfo(Hinfo::parse(t)?),
            RrType::ISDN => Rdata::Isdn(Isdn::parse(t)?),
            RrType::X25 => Rdata::X25(t.get_char_string()?),
            RrType::SRV => Rdata::Srv(Srv::parse(t, origin)?),
            RrType::NAPTR => Rdata::Naptr(Naptr::parse(t, origin)?),
            RrType::LOC => Rdata::Loc(Loc::parse(t)?),
            RrType::CERT => Rdata::Cert(Cert::parse(t)?),
            RrType::SSHFP => Rdata::Sshfp(Sshfp::parse(t)?),
            RrType::DHCID => Rdata::Dhcid(t.get_base64()?),
            RrType::TLSA => Rdata::Tlsa(Tlsa::parse(t)?),
            RrType::DS => Rdata::Ds(Ds::parse(t)?),
            RrType::DNSKEY => Rdata::Dnskey(Dnskey::parse(t)?),
            RrType::NSEC => Rdata::Nsec(Nsec::parse(t, origin)?),
            RrType::NSEC3 => Rdata::Nsec3(Nsec3::parse(t)?),
            RrType::NSEC3PARAM => Rdata::Nsec3Param(Nsec3Param::parse(t)?),
            RrType::RRSIG => Rdata::Rrsig(Sig::parse(t, origin)?),
            RrType::SIG => Rdata::Sig(Sig::parse(t, origin)?),
            RrType::WKS => Rdata::Wks(Wks::parse(t)?),
            RrType::APL => Rdata::Apl(Apl::parse(t)?),
            RrType::NULL => {
                return Err(error!(TextParse => "NULL rdata has no presentation form"))
            }
            RrType::OPT | RrType::TSIG | RrType::TKEY => {
                return Err(error!(TextParse => "{} is a meta type with no presentation form", rtype))
            }
            _ => return Err(error!(InvalidType => "type {} has no presentation parser", rtype)),
        })
    }

    /// The name whose A/AAAA records belong in the additional section.
    pub fn additional_name(&self) -> Option<&Name> {
        match self {
            Rdata::Ns(n) | Rdata::Mb(n) | Rdata::Md(n) | Rdata::Mf(n) => Some(n),
            Rdata::Mx(x) | Rdata::Kx(x) | Rdata::Rt(x) | Rdata::Afsdb(x) => Some(&x.target),
            Rdata::Srv(s) => Some(&s.target),
            _ => None,
        }
    }
}

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rdata::A(a) => write!(f, "{}", a),
            Rdata::Aaaa(a) => write!(f, "{}", a),
            Rdata::Ns(n)
            | Rdata::Cname(n)
            | Rdata::Ptr(n)
            | Rdata::Dname(n)
            | Rdata::Mb(n)
            | Rdata::Md(n)
            | Rdata::Mf(n)
            | Rdata::Mg(n)
            | Rdata::Mr(n) => write!(f, "{}", n),
            Rdata::Soa(soa) => write!(f, "{}", soa),
            Rdata::Mx(x) | Rdata::Kx(x) | Rdata::Rt(x) | Rdata::Afsdb(x) => write!(f, "{}", x),
            Rdata::Minfo(m) => write!(f, "{}", m),
            Rdata::Rp(rp) => write!(f, "{}", rp),
            Rdata::Txt(strings) | Rdata::Spf(strings) => fmt_strings(f, strings),
            Rdata::Hinfo(h) => write!(f, "{}", h),
            Rdata::Isdn(i) => write!(f, "{}", i),
            Rdata::X25(s) => fmt_char_string(f, s),
            Rdata::Srv(s) => write!(f, "{}", s),
            Rdata::Naptr(n) => write!(f, "{}", n),
            Rdata::Loc(l) => write!(f, "{}", l),
            Rdata::Cert(c) => write!(f, "{}", c),
            Rdata::Sshfp(s) => write!(f, "{}", s),
            Rdata::Dhcid(d) => write!(f, "{}", BASE64.encode(d)),
            Rdata::Tlsa(t) => write!(f, "{}", t),
            Rdata::Ds(d) => write!(f, "{}", d),
            Rdata::Dnskey(k) => write!(f, "{}", k),
            Rdata::Nsec(n) => write!(f, "{}", n),
            Rdata::Nsec3(n) => write!(f, "{}", n),
            Rdata::Nsec3Param(n) => write!(f, "{}", n),
            Rdata::Rrsig(s) | Rdata::Sig(s) => write!(f, "{}", s),
            Rdata::Tkey(t) => write!(f, "{}", t),
            Rdata::Tsig(t) => write!(f, "{}", t),
            Rdata::Opt(options) => {
                for (i, o) in options.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", o)?;
                }
                Ok(())
            }
            Rdata::Wks(w) => write!(f, "{}", w),
            Rdata::Apl(a) => write!(f, "{}", a),
            Rdata::Null(d) | Rdata::Unknown(d) => {
                write!(f, "\\# {}", d.len())?;
                if !d.is_empty() {
                    write!(f, " {}", fmt_hex(d))?;
                }
                Ok(())
            }
            Rdata::Empty => Ok(()),
        }
    }
}

pub(crate) fn emit_name(
    name: &Name,
    w: &mut WireWriter,
    c: Option<&mut Compression>,
    canonical: bool,
) -> Result<()> {
    if canonical {
        name.to_wire_canonical(w)
    } else {
        name.to_wire(w, c)
    }
}

fn read_strings(r: &mut WireReader<'_>) -> Result<Vec<Vec<u8>>> {
    let mut strings = Vec::new();
    while !r.is_empty() {
        strings.push(r.read_counted_string()?.to_vec());
    }
    Ok(strings)
}

fn parse_strings(t: &mut Tokenizer<'_>) -> Result<Vec<Vec<u8>>> {
    let mut strings = vec![t.get_char_string()?];
    while let Some(s) = t.try_char_string()? {
        strings.push(s);
    }
    Ok(strings)
}

pub(crate) fn fmt_strings(f: &mut fmt::Formatter<'_>, strings: &[Vec<u8>]) -> fmt::Result {
    for (i, s) in strings.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        fmt_char_string(f, s)?;
    }
    Ok(())
}

/// Quotes and escapes a character string for presentation output.
pub(crate) fn fmt_char_string(f: &mut fmt::Formatter<'_>, s: &[u8]) -> fmt::Result {
    write!(f, "\"")?;
    for &b in s {
        match b {
            b'"' | b'\\' => write!(f, "\\{}", b as char)?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\{:03}", b)?,
        }
    }
    write!(f, "\"")
}

pub(crate) fn fmt_hex(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        s.push_str(&format!("{:02X}", b));
    }
    s
}

pub(crate) fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(error!(TextParse => "odd-length hex string"));
    }
    let mut out = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks(2) {
        let hi = (pair[0] as char)
            .to_digit(16)
            .ok_or_else(|| error!(TextParse => "bad hex digit {:?}", pair[0] as char))?;
        let lo = (pair[1] as char)
            .to_digit(16)
            .ok_or_else(|| error!(TextParse => "bad hex digit {:?}", pair[1] as char))?;
        out.push((hi * 16 + lo) as u8);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_rdata_round_trips_as_rfc3597() {
        let rd = Rdata::Unknown(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(rd.to_string(), "\\# 4 DEADBEEF");
    }

    #[test]
    fn txt_equality_compares_string_lists() {
        let a = Rdata::Txt(vec![b"hello".to_vec(), b"world".to_vec()]);
        let b = Rdata::Txt(vec![b"hello".to_vec(), b"world".to_vec()]);
        let c = Rdata::Txt(vec![b"hello".to_vec()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(fmt_hex(&[0x0a, 0xff]), "0AFF");
        assert_eq!(parse_hex("0aFF").unwrap(), vec![0x0a, 0xff]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
