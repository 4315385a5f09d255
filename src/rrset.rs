//! RRsets: records sharing (name, class, RRset-type), carried with the
//! signatures that cover them, plus the NSEC-style type bitmap codec.

use std::fmt;

use crate::error::{error, Result};
use crate::name::Name;
use crate::rr::{DnsClass, Record, RrType};
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rrset {
    records: Vec<Record>,
    sigs: Vec<Record>,
}

impl Rrset {
    pub fn new(record: Record) -> Rrset {
        let mut set = Rrset::default();
        // A single record always fits an empty set.
        set.add(record).unwrap();
        set
    }

    /// Adds a sibling or covering signature. All members must agree on
    /// name, class, and RRset-type; the set TTL is clamped to the minimum
    /// of its members.
    pub fn add(&mut self, record: Record) -> Result<()> {
        if let Some(first) = self.first() {
            if record.rrset_type() != first.rrset_type()
                || record.class() != first.class()
                || record.name() != first.name()
            {
                return Err(
                    error!(ZoneData => "record {} does not belong to rrset {}/{}", record, first.name(), first.rrset_type()),
                );
            }
        }
        let is_sig = matches!(record.rtype(), RrType::RRSIG | RrType::SIG);
        let list = if is_sig {
            &mut self.sigs
        } else {
            &mut self.records
        };
        if list.contains(&record) {
            return Ok(());
        }
        // Minimum TTL wins across the whole set.
        let ttl = self.ttl_opt().map_or(record.ttl(), |t| t.min(record.ttl()));
        let list = if is_sig {
            &mut self.sigs
        } else {
            &mut self.records
        };
        list.push(record);
        self.set_ttl(ttl);
        Ok(())
    }

    pub fn remove(&mut self, record: &Record) {
        self.records.retain(|r| r != record);
        self.sigs.retain(|r| r != record);
    }

    fn first(&self) -> Option<&Record> {
        self.records.first().or_else(|| self.sigs.first())
    }

    fn ttl_opt(&self) -> Option<u32> {
        self.first().map(|r| r.ttl())
    }

    fn set_ttl(&mut self, ttl: u32) {
        for r in self.records.iter_mut().chain(self.sigs.iter_mut()) {
            r.set_ttl(ttl);
        }
    }

    pub fn name(&self) -> &Name {
        self.first().expect("empty rrset").name()
    }

    /// The grouping type: signatures report the type they cover.
    pub fn rtype(&self) -> RrType {
        self.first().expect("empty rrset").rrset_type()
    }

    pub fn class(&self) -> DnsClass {
        self.first().expect("empty rrset").class()
    }

    pub fn ttl(&self) -> u32 {
        self.first().expect("empty rrset").ttl()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn sigs(&self) -> &[Record] {
        &self.sigs
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.sigs.is_empty()
    }

    /// A copy of the set owned by `name`, used for wildcard synthesis.
    pub fn with_name(&self, name: &Name) -> Rrset {
        let mut set = Rrset::default();
        for r in self.records.iter().chain(self.sigs.iter()) {
            set.records_mut_for(r).push(r.with_name(name.clone()));
        }
        set
    }

    fn records_mut_for(&mut self, r: &Record) -> &mut Vec<Record> {
        if matches!(r.rtype(), RrType::RRSIG | RrType::SIG) {
            &mut self.sigs
        } else {
            &mut self.records
        }
    }
}

impl fmt::Display for Rrset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.records.iter().chain(self.sigs.iter()).enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

/// The window-block type bitmap used by NSEC and NSEC3 (RFC 4034 §4.1.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBitmap(Vec<RrType>);

impl TypeBitmap {
    pub fn new(mut types: Vec<RrType>) -> TypeBitmap {
        types.sort();
        types.dedup();
        TypeBitmap(types)
    }

    pub fn types(&self) -> &[RrType] {
        &self.0
    }

    pub fn contains(&self, rtype: RrType) -> bool {
        self.0.binary_search(&rtype).is_ok()
    }

    pub fn from_wire(r: &mut WireReader<'_>) -> Result<TypeBitmap> {
        let mut types = Vec::new();
        let mut last_window = -1i32;
        while !r.is_empty() {
            let window = r.read_u8()? as i32;
            if window <= last_window {
                return Err(error!(WireParse => "type bitmap windows out of order"));
            }
            last_window = window;
            let len = r.read_u8()? as usize;
            if len == 0 || len > 32 {
                return Err(error!(WireParse => "type bitmap window of {} octets", len));
            }
            let bits = r.read_bytes(len)?;
            for (byte, &b) in bits.iter().enumerate() {
                for bit in 0..8 {
                    if b & (0x80 >> bit) != 0 {
                        types.push(RrType((window as u16) << 8 | (byte * 8 + bit) as u16));
                    }
                }
            }
        }
        Ok(TypeBitmap(types))
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        let mut i = 0;
        while i < self.0.len() {
            let window = self.0[i].0 >> 8;
            let mut bits = [0u8; 32];
            let mut max_byte = 0;
            while i < self.0.len() && self.0[i].0 >> 8 == window {
                let low = (self.0[i].0 & 0xff) as usize;
                bits[low / 8] |= 0x80 >> (low % 8);
                max_byte = low / 8;
                i += 1;
            }
            w.write_u8(window as u8);
            w.write_u8(max_byte as u8 + 1);
            w.write_bytes(&bits[..=max_byte]);
        }
    }
}

/// Presentation form: a space before every mnemonic, nothing when empty,
/// so it can be appended directly after the NSEC next-name.
impl fmt::Display for TypeBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.0 {
            write!(f, " {}", t)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdata::Rdata;
    use std::net::Ipv4Addr;

    fn a_record(name: &str, ttl: u32, addr: [u8; 4]) -> Record {
        Record::new(
            name.parse().unwrap(),
            RrType::A,
            DnsClass::IN,
            ttl,
            Rdata::A(Ipv4Addr::from(addr)),
        )
        .unwrap()
    }

    #[test]
    fn ttl_clamps_to_minimum() {
        let mut set = Rrset::new(a_record("a.example.", 3600, [192, 0, 2, 1]));
        set.add(a_record("a.example.", 60, [192, 0, 2, 2])).unwrap();
        assert_eq!(set.ttl(), 60);
        assert!(set.records().iter().all(|r| r.ttl() == 60));

        set.add(a_record("a.example.", 300, [192, 0, 2, 3])).unwrap();
        assert_eq!(set.ttl(), 60);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn mismatched_record_rejected() {
        let mut set = Rrset::new(a_record("a.example.", 60, [192, 0, 2, 1]));
        assert!(set.add(a_record("b.example.", 60, [192, 0, 2, 1])).is_err());
    }

    #[test]
    fn duplicates_collapse() {
        let mut set = Rrset::new(a_record("a.example.", 60, [192, 0, 2, 1]));
        set.add(a_record("a.example.", 60, [192, 0, 2, 1])).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn bitmap_round_trip() {
        let bitmap = TypeBitmap::new(vec![RrType::A, RrType::NS, RrType::RRSIG, RrType(1234)]);
        let mut w = WireWriter::new();
        bitmap.to_wire(&mut w);
        let wire = w.freeze();
        let mut r = WireReader::new(&wire);
        let parsed = TypeBitmap::from_wire(&mut r).unwrap();
        assert_eq!(parsed, bitmap);
        assert!(parsed.contains(RrType::NS));
        assert!(!parsed.contains(RrType::MX));
        assert_eq!(bitmap.to_string(), " A NS RRSIG TYPE1234");
    }
}
