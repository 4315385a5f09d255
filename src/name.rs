//! Domain names: parsing, compression, and name arithmetic.
//!
//! A [`Name`] is an ordered sequence of labels, each 1-63 octets, with a
//! total wire length of at most 255 octets. Case is preserved exactly as
//! read, but comparison, hashing, and the compression table all fold ASCII
//! A-Z.

use std::fmt;
use std::hash::{Hash, Hasher};

use std::collections::HashMap;

use crate::error::{error, Error, Result};
use crate::wire::{WireReader, WireWriter};

/// Maximum length of a name on the wire, including the root label.
pub const MAX_NAME_WIRE: usize = 255;
/// Maximum length of a single label.
pub const MAX_LABEL: usize = 63;
/// Compression pointer hops tolerated while decoding one name.
const MAX_POINTER_HOPS: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct Name {
    labels: Vec<Box<[u8]>>,
    absolute: bool,
}

/// Name -> earliest-offset table used while encoding one message. Offsets
/// at or above 0x4000 are never recorded since pointers carry 14 bits.
#[derive(Debug, Default)]
pub struct Compression {
    table: HashMap<Name, u16>,
}

impl Compression {
    pub fn new() -> Self {
        Compression {
            table: HashMap::new(),
        }
    }

    fn get(&self, name: &Name) -> Option<u16> {
        self.table.get(name).copied()
    }

    fn insert(&mut self, name: Name, pos: usize) {
        if pos < 0x4000 {
            self.table.entry(name).or_insert(pos as u16);
        }
    }
}

fn fold(b: u8) -> u8 {
    if b.is_ascii_uppercase() {
        b | 0x20
    } else {
        b
    }
}

fn labels_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| fold(*x) == fold(*y))
}

impl Name {
    /// The absolute root name ".".
    pub fn root() -> Self {
        Name {
            labels: Vec::new(),
            absolute: true,
        }
    }

    pub fn from_labels<I, L>(labels: I, absolute: bool) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<Box<[u8]>>,
    {
        let labels: Vec<Box<[u8]>> = labels.into_iter().map(Into::into).collect();
        let name = Name { labels, absolute };
        name.check_bounds()?;
        Ok(name)
    }

    fn check_bounds(&self) -> Result<()> {
        for l in &self.labels {
            if l.is_empty() || l.len() > MAX_LABEL {
                return Err(error!(NameTooLong => "label of {} octets", l.len()));
            }
        }
        if self.wire_length() > MAX_NAME_WIRE {
            return Err(error!(NameTooLong => "name of {} octets", self.wire_length()));
        }
        Ok(())
    }

    /// Number of labels, not counting the root.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, i: usize) -> &[u8] {
        &self.labels[i]
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// True when the leftmost label is `*`.
    pub fn is_wild(&self) -> bool {
        self.labels.first().map(|l| &**l == b"*").unwrap_or(false)
    }

    pub fn is_root(&self) -> bool {
        self.absolute && self.labels.is_empty()
    }

    /// Encoded length: one length octet per label plus the label bytes,
    /// plus the root octet.
    pub fn wire_length(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// The name formed by the last `n` labels (and the root).
    pub fn suffix(&self, n: usize) -> Name {
        let skip = self.labels.len() - n;
        Name {
            labels: self.labels[skip..].to_vec(),
            absolute: self.absolute,
        }
    }

    /// Strips `n` leftmost labels, replacing them with a `*` label.
    pub fn wild(&self, n: usize) -> Name {
        let mut labels = Vec::with_capacity(self.labels.len() - n + 1);
        labels.push(b"*".to_vec().into_boxed_slice());
        labels.extend(self.labels[n..].iter().cloned());
        Name {
            labels,
            absolute: self.absolute,
        }
    }

    /// True when `self` is `other` or lies below it.
    pub fn subdomain_of(&self, other: &Name) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        let skip = self.labels.len() - other.labels.len();
        self.labels[skip..]
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| labels_eq(a, b))
    }

    /// Joins a relative prefix onto a suffix, with a length check.
    pub fn concat(prefix: &Name, suffix: &Name) -> Result<Name> {
        if prefix.absolute {
            return Err(error!(NameTooLong => "cannot append to an absolute name"));
        }
        let mut labels = prefix.labels.clone();
        labels.extend(suffix.labels.iter().cloned());
        let name = Name {
            labels,
            absolute: suffix.absolute,
        };
        name.check_bounds()?;
        Ok(name)
    }

    /// Strips `origin` from the end of the name if present, producing a
    /// relative name; otherwise returns the name unchanged.
    pub fn relativize(&self, origin: &Name) -> Name {
        if !self.subdomain_of(origin) {
            return self.clone();
        }
        let keep = self.labels.len() - origin.labels.len();
        Name {
            labels: self.labels[..keep].to_vec(),
            absolute: false,
        }
    }

    /// DNAME substitution: if `self` lies strictly below `owner`, the suffix
    /// `owner` is replaced by `target`. Returns `None` when `self` is not
    /// below `owner`, an error when the substituted name would be too long.
    pub fn from_dname(&self, owner: &Name, target: &Name) -> Option<Result<Name>> {
        if !self.subdomain_of(owner) || self.labels.len() == owner.labels.len() {
            return None;
        }
        let keep = self.labels.len() - owner.labels.len();
        let mut labels = self.labels[..keep].to_vec();
        labels.extend(target.labels.iter().cloned());
        let name = Name {
            labels,
            absolute: target.absolute,
        };
        Some(name.check_bounds().map(|_| name))
    }

    /// Parses a presentation-format name. A trailing unescaped dot makes the
    /// name absolute; `origin` (when given) is appended to relative names.
    pub fn parse(s: &str, origin: Option<&Name>) -> Result<Name> {
        if s.is_empty() {
            return Err(error!(TextParse => "empty name"));
        }
        if s == "." {
            return Ok(Name::root());
        }
        let bytes = s.as_bytes();
        let mut labels: Vec<Box<[u8]>> = Vec::new();
        let mut cur: Vec<u8> = Vec::new();
        let mut absolute = false;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    i += 1;
                    if i >= bytes.len() {
                        return Err(error!(TextParse => "trailing backslash in name"));
                    }
                    if bytes[i].is_ascii_digit() {
                        if i + 2 >= bytes.len()
                            || !bytes[i + 1].is_ascii_digit()
                            || !bytes[i + 2].is_ascii_digit()
                        {
                            return Err(error!(TextParse => "bad \\DDD escape in name"));
                        }
                        let v = (bytes[i] - b'0') as u16 * 100
                            + (bytes[i + 1] - b'0') as u16 * 10
                            + (bytes[i + 2] - b'0') as u16;
                        if v > 255 {
                            return Err(error!(TextParse => "\\DDD escape out of range"));
                        }
                        cur.push(v as u8);
                        i += 3;
                    } else {
                        cur.push(bytes[i]);
                        i += 1;
                    }
                }
                b'.' => {
                    if cur.is_empty() {
                        return Err(error!(TextParse => "empty label in {:?}", s));
                    }
                    labels.push(std::mem::take(&mut cur).into_boxed_slice());
                    if i == bytes.len() - 1 {
                        absolute = true;
                    }
                    i += 1;
                }
                b => {
                    cur.push(b);
                    i += 1;
                }
            }
        }
        if !cur.is_empty() {
            labels.push(cur.into_boxed_slice());
        }
        let mut name = Name { labels, absolute };
        name.check_bounds()?;
        if !name.absolute {
            if let Some(origin) = origin {
                name = Name::concat(&name, origin)?;
            }
        }
        Ok(name)
    }

    /// Reads a possibly-compressed name. Pointers must target a strictly
    /// earlier byte than their own position, and at most
    /// [`MAX_POINTER_HOPS`] are followed.
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Name> {
        let mut labels: Vec<Box<[u8]>> = Vec::new();
        let mut wire_len = 1usize;
        let mut hops = 0usize;
        let mut return_to = None;

        loop {
            let at = r.current();
            let len = r.read_u8()?;
            match len & 0xc0 {
                0x00 => {
                    if len == 0 {
                        break;
                    }
                    wire_len += len as usize + 1;
                    if wire_len > MAX_NAME_WIRE {
                        return Err(
                            error!(WireParse => "name exceeds {} octets at offset {}", MAX_NAME_WIRE, at),
                        );
                    }
                    labels.push(r.read_bytes(len as usize)?.into());
                }
                0xc0 => {
                    let low = r.read_u8()? as usize;
                    let target = ((len & 0x3f) as usize) << 8 | low;
                    if target >= at {
                        return Err(
                            error!(WireParse => "forward compression pointer {} at offset {}", target, at),
                        );
                    }
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        return Err(error!(WireParse => "compression pointer chain too long"));
                    }
                    if return_to.is_none() {
                        return_to = Some(r.save());
                    }
                    r.jump(target)?;
                }
                _ => {
                    return Err(error!(WireParse => "bad label type {:#04x} at offset {}", len, at))
                }
            }
        }

        if let Some(mark) = return_to {
            r.restore(mark);
        }
        Ok(Name {
            labels,
            absolute: true,
        })
    }

    /// Emits the name, recording and reusing suffixes through `compression`
    /// when one is supplied.
    pub fn to_wire(&self, w: &mut WireWriter, compression: Option<&mut Compression>) -> Result<()> {
        if !self.absolute {
            return Err(error!(WireParse => "relative name {} cannot be rendered", self));
        }
        match compression {
            Some(c) => {
                for i in 0..self.labels.len() {
                    let suffix = self.suffix(self.labels.len() - i);
                    if let Some(off) = c.get(&suffix) {
                        w.write_u16(0xc000 | off);
                        return Ok(());
                    }
                    c.insert(suffix, w.pos());
                    w.write_u8(self.labels[i].len() as u8);
                    w.write_bytes(&self.labels[i]);
                }
                w.write_u8(0);
            }
            None => {
                for l in &self.labels {
                    w.write_u8(l.len() as u8);
                    w.write_bytes(l);
                }
                w.write_u8(0);
            }
        }
        Ok(())
    }

    /// Canonical form for signing and digests: uncompressed, A-Z folded.
    pub fn to_wire_canonical(&self, w: &mut WireWriter) -> Result<()> {
        if !self.absolute {
            return Err(error!(WireParse => "relative name {} cannot be rendered", self));
        }
        for l in &self.labels {
            w.write_u8(l.len() as u8);
            for b in l.iter() {
                w.write_u8(fold(*b));
            }
        }
        w.write_u8(0);
        Ok(())
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
            && self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| labels_eq(a, b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
        self.labels.len().hash(state);
        for l in &self.labels {
            for b in l.iter() {
                state.write_u8(fold(*b));
            }
            state.write_u8(0);
        }
    }
}

fn fmt_label(f: &mut fmt::Formatter<'_>, label: &[u8]) -> fmt::Result {
    for &b in label {
        match b {
            b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                write!(f, "\\{}", b as char)?
            }
            0x21..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\{:03}", b)?,
        }
    }
    Ok(())
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        for (i, l) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            fmt_label(f, l)?;
        }
        if self.absolute {
            write!(f, ".")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Name> {
        Name::parse(s, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn name(s: &str) -> Name {
        Name::parse(s, None).unwrap()
    }

    #[test]
    fn parse_and_display() {
        let n = name("www.Example.COM.");
        assert_eq!(n.label_count(), 3);
        assert!(n.is_absolute());
        assert_eq!(n.to_string(), "www.Example.COM.");
        assert_eq!(n, name("WWW.example.com."));

        assert!(name(".").is_root());
        assert!(!name("relative.example").is_absolute());
        assert!(name("*.example.com.").is_wild());

        let with_origin = Name::parse("www", Some(&name("example.com."))).unwrap();
        assert_eq!(with_origin, name("www.example.com."));
    }

    #[test]
    fn escapes_round_trip() {
        let n = name("a\\.b.example.");
        assert_eq!(n.label_count(), 2);
        assert_eq!(n.label(0), b"a.b");
        assert_eq!(n.to_string(), "a\\.b.example.");

        let n = name("a\\032b.example.");
        assert_eq!(n.label(0), b"a b");
        assert_eq!(n.to_string(), "a\\032b.example.");
    }

    #[test]
    fn length_limits() {
        let label64 = "a".repeat(64);
        assert_eq!(
            Name::parse(&format!("{}.com.", label64), None)
                .unwrap_err()
                .kind,
            ErrorKind::NameTooLong
        );

        // Four 63-octet labels need 257 octets with length bytes and root.
        let l63 = "a".repeat(63);
        let long = format!("{0}.{0}.{0}.{0}.", l63);
        assert_eq!(
            Name::parse(&long, None).unwrap_err().kind,
            ErrorKind::NameTooLong
        );
    }

    #[test]
    fn wire_round_trip_uncompressed() {
        let n = name("www.google.ie.");
        let mut w = WireWriter::new();
        n.to_wire(&mut w, None).unwrap();
        assert_eq!(
            w.as_slice(),
            &[3, b'w', b'w', b'w', 6, b'g', b'o', b'o', b'g', b'l', b'e', 2, b'i', b'e', 0]
        );

        let bytes = w.freeze();
        let mut r = WireReader::new(&bytes);
        assert_eq!(Name::from_wire(&mut r).unwrap(), n);
        assert!(r.is_empty());
    }

    #[test]
    fn wire_decompression() {
        // 12 zero bytes of fake header, then "example.com.", then "ns2" + pointer.
        let mut buf = vec![0u8; 12];
        buf.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0]);
        let second = buf.len();
        buf.extend_from_slice(&[3, b'n', b's', b'2', 0xc0, 12]);

        let mut r = WireReader::new(&buf);
        r.jump(second).unwrap();
        let n = Name::from_wire(&mut r).unwrap();
        assert_eq!(n, name("ns2.example.com."));
        assert_eq!(r.current(), second + 6);
    }

    #[test]
    fn forward_pointer_rejected() {
        // Pointer at offset 0 targeting itself.
        let buf = [0xc0u8, 0x00];
        let mut r = WireReader::new(&buf);
        assert_eq!(
            Name::from_wire(&mut r).unwrap_err().kind,
            ErrorKind::WireParse
        );

        // Pointer targeting a later offset.
        let buf = [0xc0u8, 0x05, 0, 0, 0, 0];
        let mut r = WireReader::new(&buf);
        assert_eq!(
            Name::from_wire(&mut r).unwrap_err().kind,
            ErrorKind::WireParse
        );
    }

    #[test]
    fn oversized_wire_name_rejected() {
        // Labels of 63 octets chained beyond 255 total.
        let mut buf = Vec::new();
        for _ in 0..5 {
            buf.push(63);
            buf.extend_from_slice(&[b'x'; 63]);
        }
        buf.push(0);
        let mut r = WireReader::new(&buf);
        assert_eq!(
            Name::from_wire(&mut r).unwrap_err().kind,
            ErrorKind::WireParse
        );
    }

    #[test]
    fn compression_reuses_suffixes() {
        let mut w = WireWriter::new();
        let mut c = Compression::new();
        name("ns1.example.com.").to_wire(&mut w, Some(&mut c)).unwrap();
        let first_len = w.pos();
        name("ns2.example.com.").to_wire(&mut w, Some(&mut c)).unwrap();

        // Second name is "ns2" + pointer to "example.com." at offset 4.
        assert_eq!(&w.as_slice()[first_len..], &[3, b'n', b's', b'2', 0xc0, 4]);
    }

    #[test]
    fn name_arithmetic() {
        let n = name("a.b.example.com.");
        let origin = name("example.com.");

        assert!(n.subdomain_of(&origin));
        assert!(!origin.subdomain_of(&n));
        assert_eq!(n.suffix(2), origin);
        assert_eq!(n.relativize(&origin).to_string(), "a.b");
        assert_eq!(n.wild(2).to_string(), "*.example.com.");

        let rel = name("mail");
        assert_eq!(Name::concat(&rel, &origin).unwrap(), name("mail.example.com."));

        let sub = name("www.old.example.").from_dname(&name("old.example."), &name("new.example."));
        assert_eq!(sub.unwrap().unwrap(), name("www.new.example."));
        assert!(name("old.example.")
            .from_dname(&name("old.example."), &name("new.example."))
            .is_none());
    }

    #[test]
    fn canonical_form_lowercases() {
        let mut w = WireWriter::new();
        name("NS1.Example.").to_wire_canonical(&mut w).unwrap();
        assert_eq!(w.as_slice(), &[3, b'n', b's', b'1', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0]);
    }
}
