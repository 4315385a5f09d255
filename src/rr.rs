//! Resource records and the numeric type/class registries.
//!
//! [`RrType`] and [`DnsClass`] are thin newtypes over the 16-bit wire codes
//! with a process-wide mnemonic table. Unlisted codes are still valid values
//! and round-trip through the RFC 3597 `TYPE###`/`CLASS###` syntax.

use std::fmt;

use crate::error::{error, Result};
use crate::name::{Compression, Name};
use crate::rdata::Rdata;
use crate::wire::{WireReader, WireWriter};

/// TTLs are 32 bits on the wire but capped at 2^31-1 by RFC 2181.
pub const MAX_TTL: u32 = 0x7fff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RrType(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DnsClass(pub u16);

/// (code, mnemonic, rdata carries compressible names). Only the RFC 1035
/// types ever compress names inside rdata; everything later is emitted
/// uncompressed per RFC 3597.
static TYPES: &[(u16, &str, bool)] = &[
    (1, "A", false),
    (2, "NS", true),
    (3, "MD", true),
    (4, "MF", true),
    (5, "CNAME", true),
    (6, "SOA", true),
    (7, "MB", true),
    (8, "MG", true),
    (9, "MR", true),
    (10, "NULL", false),
    (11, "WKS", false),
    (12, "PTR", true),
    (13, "HINFO", false),
    (14, "MINFO", true),
    (15, "MX", true),
    (16, "TXT", false),
    (17, "RP", false),
    (18, "AFSDB", false),
    (19, "X25", false),
    (20, "ISDN", false),
    (21, "RT", false),
    (24, "SIG", false),
    (28, "AAAA", false),
    (29, "LOC", false),
    (33, "SRV", false),
    (35, "NAPTR", false),
    (36, "KX", false),
    (37, "CERT", false),
    (39, "DNAME", false),
    (41, "OPT", false),
    (42, "APL", false),
    (43, "DS", false),
    (44, "SSHFP", false),
    (46, "RRSIG", false),
    (47, "NSEC", false),
    (48, "DNSKEY", false),
    (49, "DHCID", false),
    (50, "NSEC3", false),
    (51, "NSEC3PARAM", false),
    (52, "TLSA", false),
    (99, "SPF", false),
    (249, "TKEY", false),
    (250, "TSIG", false),
    (251, "IXFR", false),
    (252, "AXFR", false),
    (255, "ANY", false),
];

impl RrType {
    pub const A: RrType = RrType(1);
    pub const NS: RrType = RrType(2);
    pub const MD: RrType = RrType(3);
    pub const MF: RrType = RrType(4);
    pub const CNAME: RrType = RrType(5);
    pub const SOA: RrType = RrType(6);
    pub const MB: RrType = RrType(7);
    pub const MG: RrType = RrType(8);
    pub const MR: RrType = RrType(9);
    pub const NULL: RrType = RrType(10);
    pub const WKS: RrType = RrType(11);
    pub const PTR: RrType = RrType(12);
    pub const HINFO: RrType = RrType(13);
    pub const MINFO: RrType = RrType(14);
    pub const MX: RrType = RrType(15);
    pub const TXT: RrType = RrType(16);
    pub const RP: RrType = RrType(17);
    pub const AFSDB: RrType = RrType(18);
    pub const X25: RrType = RrType(19);
    pub const ISDN: RrType = RrType(20);
    pub const RT: RrType = RrType(21);
    pub const SIG: RrType = RrType(24);
    pub const AAAA: RrType = RrType(28);
    pub const LOC: RrType = RrType(29);
    pub const SRV: RrType = RrType(33);
    pub const NAPTR: RrType = RrType(35);
    pub const KX: RrType = RrType(36);
    pub const CERT: RrType = RrType(37);
    pub const DNAME: RrType = RrType(39);
    pub const OPT: RrType = RrType(41);
    pub const APL: RrType = RrType(42);
    pub const DS: RrType = RrType(43);
    pub const SSHFP: RrType = RrType(44);
    pub const RRSIG: RrType = RrType(46);
    pub const NSEC: RrType = RrType(47);
    pub const DNSKEY: RrType = RrType(48);
    pub const DHCID: RrType = RrType(49);
    pub const NSEC3: RrType = RrType(50);
    pub const NSEC3PARAM: RrType = RrType(51);
    pub const TLSA: RrType = RrType(52);
    pub const SPF: RrType = RrType(99);
    pub const TKEY: RrType = RrType(249);
    pub const TSIG: RrType = RrType(250);
    pub const IXFR: RrType = RrType(251);
    pub const AXFR: RrType = RrType(252);
    pub const ANY: RrType = RrType(255);

    /// True when rdata of this type may carry compressed names on encode.
    pub fn compressible(self) -> bool {
        TYPES
            .iter()
            .find(|(code, _, _)| *code == self.0)
            .map(|(_, _, c)| *c)
            .unwrap_or(false)
    }

    /// Query-only meta types never appear in stored RRsets.
    pub fn is_meta(self) -> bool {
        matches!(self, RrType::OPT | RrType::TSIG | RrType::TKEY)
            || matches!(self, RrType::IXFR | RrType::AXFR | RrType::ANY)
    }

    pub fn mnemonic(self) -> String {
        TYPES
            .iter()
            .find(|(code, _, _)| *code == self.0)
            .map(|(_, name, _)| name.to_string())
            .unwrap_or_else(|| format!("TYPE{}", self.0))
    }

    pub fn from_mnemonic(s: &str) -> Result<RrType> {
        let upper = s.to_ascii_uppercase();
        if let Some((code, _, _)) = TYPES.iter().find(|(_, name, _)| *name == upper) {
            return Ok(RrType(*code));
        }
        if let Some(num) = upper.strip_prefix("TYPE") {
            if let Ok(v) = num.parse::<u32>() {
                if v <= 0xffff {
                    return Ok(RrType(v as u16));
                }
            }
        }
        Err(error!(InvalidType => "unknown type {:?}", s))
    }
}

impl fmt::Display for RrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

static CLASSES: &[(u16, &str)] = &[(1, "IN"), (3, "CH"), (4, "HS"), (254, "NONE"), (255, "ANY")];

impl DnsClass {
    pub const IN: DnsClass = DnsClass(1);
    pub const CH: DnsClass = DnsClass(3);
    pub const HS: DnsClass = DnsClass(4);
    pub const NONE: DnsClass = DnsClass(254);
    pub const ANY: DnsClass = DnsClass(255);

    pub fn mnemonic(self) -> String {
        CLASSES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("CLASS{}", self.0))
    }

    pub fn from_mnemonic(s: &str) -> Result<DnsClass> {
        let upper = s.to_ascii_uppercase();
        if let Some((code, _)) = CLASSES.iter().find(|(_, name)| *name == upper) {
            return Ok(DnsClass(*code));
        }
        if let Some(num) = upper.strip_prefix("CLASS") {
            if let Ok(v) = num.parse::<u32>() {
                if v <= 0xffff {
                    return Ok(DnsClass(v as u16));
                }
            }
        }
        Err(error!(InvalidClass => "unknown class {:?}", s))
    }
}

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Serial-number arithmetic per RFC 1982, used for SOA serials.
pub mod serial {
    /// `a < b` under sequence-space comparison mod 2^32.
    pub fn lt(a: u32, b: u32) -> bool {
        a != b && (b.wrapping_sub(a) as i32) > 0
    }

    /// `a > b` under sequence-space comparison mod 2^32.
    pub fn gt(a: u32, b: u32) -> bool {
        a != b && (a.wrapping_sub(b) as i32) > 0
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    name: Name,
    rtype: RrType,
    class: DnsClass,
    ttl: u32,
    rdata: Rdata,
}

impl Record {
    pub fn new(name: Name, rtype: RrType, class: DnsClass, ttl: u32, rdata: Rdata) -> Result<Self> {
        if !name.is_absolute() {
            return Err(error!(NameTooLong => "record owner {} is not absolute", name));
        }
        if ttl > MAX_TTL {
            return Err(error!(TextParse => "ttl {} out of range", ttl));
        }
        Ok(Record {
            name,
            rtype,
            class,
            ttl,
            rdata,
        })
    }

    /// Unchecked constructor for pseudo-records (OPT packs flags into the
    /// TTL field, which would fail the RFC 2181 cap).
    pub(crate) fn raw(name: Name, rtype: RrType, class: DnsClass, ttl: u32, rdata: Rdata) -> Self {
        Record {
            name,
            rtype,
            class,
            ttl,
            rdata,
        }
    }

    /// A question-section entry: owner, type, and class only.
    pub fn question(name: Name, rtype: RrType, class: DnsClass) -> Self {
        Record {
            name,
            rtype,
            class,
            ttl: 0,
            rdata: Rdata::Empty,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn rtype(&self) -> RrType {
        self.rtype
    }

    pub fn class(&self) -> DnsClass {
        self.class
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
    }

    pub fn rdata(&self) -> &Rdata {
        &self.rdata
    }

    /// Re-owns the record, used for wildcard synthesis.
    pub fn with_name(&self, name: Name) -> Record {
        let mut r = self.clone();
        r.name = name;
        r
    }

    /// The type used for RRset grouping: SIG/RRSIG collapse onto the type
    /// they cover so signatures travel with the data they sign.
    pub fn rrset_type(&self) -> RrType {
        match &self.rdata {
            Rdata::Rrsig(sig) | Rdata::Sig(sig) => sig.type_covered,
            _ => self.rtype,
        }
    }

    /// The name whose address records belong in the additional section,
    /// defined by NS/MX/SRV-like types.
    pub fn additional_name(&self) -> Option<&Name> {
        self.rdata.additional_name()
    }

    /// Parses one record. Question-section entries stop after the class.
    pub fn from_wire(r: &mut WireReader<'_>, question: bool) -> Result<Record> {
        let name = Name::from_wire(r)?;
        let rtype = RrType(r.read_u16()?);
        let class = DnsClass(r.read_u16()?);
        if question {
            return Ok(Record::question(name, rtype, class));
        }
        let ttl = r.read_u32()?;
        let rdlength = r.read_u16()? as usize;
        let prev = r.set_active(rdlength)?;
        let rdata = Rdata::from_wire(rtype, r)?;
        if !r.is_empty() {
            return Err(
                error!(WireParse => "{} byte(s) of trailing rdata in {} record", r.remaining(), rtype),
            );
        }
        r.restore_active(prev);
        Ok(Record {
            name,
            rtype,
            class,
            ttl,
            rdata,
        })
    }

    /// Emits the record, backpatching rdlength after the rdata.
    pub fn to_wire(
        &self,
        w: &mut WireWriter,
        mut compression: Option<&mut Compression>,
        question: bool,
    ) -> Result<()> {
        self.name.to_wire(w, compression.as_deref_mut())?;
        w.write_u16(self.rtype.0);
        w.write_u16(self.class.0);
        if question {
            return Ok(());
        }
        w.write_u32(self.ttl);
        let len_at = w.skip_u16();
        if self.rtype.compressible() {
            self.rdata.to_wire(w, compression, false)?;
        } else {
            self.rdata.to_wire(w, None, false)?;
        }
        let rdlength = w.pos() - len_at - 2;
        if rdlength > 0xffff {
            return Err(error!(WireParse => "rdata of {} octets", rdlength));
        }
        w.patch_u16(len_at, rdlength as u16);
        Ok(())
    }

    /// Canonical form for signing: owner lowercased, no compression, rdata
    /// names lowercased and uncompressed.
    pub fn to_wire_canonical(&self, w: &mut WireWriter) -> Result<()> {
        self.name.to_wire_canonical(w)?;
        w.write_u16(self.rtype.0);
        w.write_u16(self.class.0);
        w.write_u32(self.ttl);
        let len_at = w.skip_u16();
        self.rdata.to_wire(w, None, true)?;
        let rdlength = w.pos() - len_at - 2;
        w.patch_u16(len_at, rdlength as u16);
        Ok(())
    }
}

/// Equality deliberately ignores the TTL: two records differing only in TTL
/// are the same record for RRset and transfer purposes.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.rtype == other.rtype
            && self.class == other.class
            && self.rdata == other.rdata
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Rdata::Empty = self.rdata {
            return write!(f, "{}\t{}\t{}", self.name, self.class, self.rtype);
        }
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.class, self.rtype, self.rdata
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn type_mnemonics() {
        assert_eq!(RrType::A.mnemonic(), "A");
        assert_eq!(RrType::from_mnemonic("aaaa").unwrap(), RrType::AAAA);
        assert_eq!(RrType(4711).mnemonic(), "TYPE4711");
        assert_eq!(RrType::from_mnemonic("TYPE4711").unwrap(), RrType(4711));
        assert!(RrType::from_mnemonic("BOGUS").is_err());
        assert!(RrType::from_mnemonic("TYPE65536").is_err());

        assert!(RrType::NS.compressible());
        assert!(!RrType::SRV.compressible());
        assert!(RrType::ANY.is_meta());
        assert!(!RrType::A.is_meta());
    }

    #[test]
    fn class_mnemonics() {
        assert_eq!(DnsClass::IN.mnemonic(), "IN");
        assert_eq!(DnsClass::from_mnemonic("CLASS42").unwrap(), DnsClass(42));
        assert!(DnsClass::from_mnemonic("XX").is_err());
    }

    #[test]
    fn serial_arithmetic_wraps() {
        assert!(serial::lt(0xffff_fffe, 2));
        assert!(serial::gt(2, 0xffff_fffe));
        assert!(serial::lt(100, 200));
        assert!(!serial::lt(5, 5));
    }

    #[test]
    fn a_record_wire_form() {
        let rec = Record::new(
            name("example.com."),
            RrType::A,
            DnsClass::IN,
            3600,
            Rdata::A(Ipv4Addr::new(192, 0, 2, 1)),
        )
        .unwrap();

        let mut w = WireWriter::new();
        rec.to_wire(&mut w, None, false).unwrap();
        let wire = w.freeze();

        // name(13) | type | class | ttl | rdlength=4 | 192.0.2.1
        assert_eq!(
            &wire[13..],
            &[0, 1, 0, 1, 0, 0, 0x0e, 0x10, 0, 4, 0xc0, 0x00, 0x02, 0x01]
        );

        let mut r = WireReader::new(&wire);
        let parsed = Record::from_wire(&mut r, false).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(parsed.ttl(), 3600);
    }

    #[test]
    fn equality_ignores_ttl() {
        let a = Record::new(
            name("example.com."),
            RrType::A,
            DnsClass::IN,
            3600,
            Rdata::A(Ipv4Addr::new(192, 0, 2, 1)),
        )
        .unwrap();
        let mut b = a.clone();
        b.set_ttl(60);
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_rdata_is_fatal() {
        // A record claiming rdlength 5 for a 4-byte address.
        let mut w = WireWriter::new();
        name("a.").to_wire(&mut w, None).unwrap();
        w.write_u16(1);
        w.write_u16(1);
        w.write_u32(0);
        w.write_u16(5);
        w.write_bytes(&[192, 0, 2, 1, 99]);
        let wire = w.freeze();
        let mut r = WireReader::new(&wire);
        assert!(Record::from_wire(&mut r, false).is_err());
    }

    #[test]
    fn ttl_out_of_range_rejected() {
        let err = Record::new(
            name("a."),
            RrType::A,
            DnsClass::IN,
            0x8000_0000,
            Rdata::A(Ipv4Addr::new(192, 0, 2, 1)),
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::TextParse);
    }
}
