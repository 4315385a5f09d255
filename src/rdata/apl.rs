//! Address-list rdata: APL (RFC 3123) and the ancient WKS bitmap.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{error, Result};
use crate::master::Tokenizer;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AplItem {
    pub family: u16,
    pub prefix: u8,
    pub negative: bool,
    /// Address bytes with trailing zero octets trimmed, as on the wire.
    pub address: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apl {
    pub items: Vec<AplItem>,
}

const FAMILY_IPV4: u16 = 1;
const FAMILY_IPV6: u16 = 2;

impl Apl {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Apl> {
        let mut items = Vec::new();
        while !r.is_empty() {
            let family = r.read_u16()?;
            let prefix = r.read_u8()?;
            let afdlen = r.read_u8()?;
            let negative = afdlen & 0x80 != 0;
            let len = (afdlen & 0x7f) as usize;
            let max = match family {
                FAMILY_IPV4 => 4,
                FAMILY_IPV6 => 16,
                _ => 127,
            };
            if len > max {
                return Err(error!(WireParse => "APL afdlength {} for family {}", len, family));
            }
            items.push(AplItem {
                family,
                prefix,
                negative,
                address: r.read_bytes(len)?.to_vec(),
            });
        }
        Ok(Apl { items })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        for item in &self.items {
            w.write_u16(item.family);
            w.write_u8(item.prefix);
            let neg = if item.negative { 0x80 } else { 0 };
            w.write_u8(neg | item.address.len() as u8);
            w.write_bytes(&item.address);
        }
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Apl> {
        let mut items = vec![parse_item(&t.get_ident()?)?];
        while let Some(s) = t.try_ident()? {
            items.push(parse_item(&s)?);
        }
        Ok(Apl { items })
    }
}

fn parse_item(s: &str) -> Result<AplItem> {
    let (negative, s) = match s.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (family, rest) = s
        .split_once(':')
        .ok_or_else(|| error!(TextParse => "bad APL item {:?}", s))?;
    let (addr, prefix) = rest
        .split_once('/')
        .ok_or_else(|| error!(TextParse => "bad APL item {:?}", s))?;
    let family: u16 = family
        .parse()
        .map_err(|_| error!(TextParse => "bad APL family {:?}", family))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| error!(TextParse => "bad APL prefix {:?}", prefix))?;
    let mut address = match family {
        FAMILY_IPV4 => {
            if prefix > 32 {
                return Err(error!(TextParse => "bad APL prefix {}", prefix));
            }
            let a: Ipv4Addr = addr
                .parse()
                .map_err(|_| error!(TextParse => "bad APL address {:?}", addr))?;
            a.octets().to_vec()
        }
        FAMILY_IPV6 => {
            if prefix > 128 {
                return Err(error!(TextParse => "bad APL prefix {}", prefix));
            }
            let a: Ipv6Addr = addr
                .parse()
                .map_err(|_| error!(TextParse => "bad APL address {:?}", addr))?;
            a.octets().to_vec()
        }
        _ => return Err(error!(TextParse => "unknown APL family {}", family)),
    };
    while address.last() == Some(&0) {
        address.pop();
    }
    Ok(AplItem {
        family,
        prefix,
        negative,
        address,
    })
}

impl fmt::Display for Apl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if item.negative {
                write!(f, "!")?;
            }
            match item.family {
                FAMILY_IPV4 => {
                    let mut o = [0u8; 4];
                    o[..item.address.len()].copy_from_slice(&item.address);
                    write!(f, "1:{}/{}", Ipv4Addr::from(o), item.prefix)?;
                }
                FAMILY_IPV6 => {
                    let mut o = [0u8; 16];
                    o[..item.address.len()].copy_from_slice(&item.address);
                    write!(f, "2:{}/{}", Ipv6Addr::from(o), item.prefix)?;
                }
                family => {
                    write!(f, "{}:", family)?;
                    for b in &item.address {
                        write!(f, "{:02x}", b)?;
                    }
                    write!(f, "/{}", item.prefix)?;
                }
            }
        }
        Ok(())
    }
}

/// Well-known services: an address, a protocol, and a port bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wks {
    pub address: Ipv4Addr,
    pub protocol: u8,
    pub bitmap: Vec<u8>,
}

impl Wks {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Wks> {
        let o = r.read_bytes(4)?;
        Ok(Wks {
            address: Ipv4Addr::new(o[0], o[1], o[2], o[3]),
            protocol: r.read_u8()?,
            bitmap: r.read_remaining().to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_bytes(&self.address.octets());
        w.write_u8(self.protocol);
        w.write_bytes(&self.bitmap);
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Wks> {
        let s = t.get_ident()?;
        let address: Ipv4Addr = s
            .parse()
            .map_err(|_| error!(TextParse => "bad IPv4 address {:?}", s))?;
        let protocol = t.get_u8()?;
        let mut ports = Vec::new();
        while let Some(p) = t.try_ident()? {
            let port: u16 = p
                .parse()
                .map_err(|_| error!(TextParse => "bad port {:?}", p))?;
            ports.push(port);
        }
        let mut bitmap = Vec::new();
        for port in ports {
            let byte = (port / 8) as usize;
            if bitmap.len() <= byte {
                bitmap.resize(byte + 1, 0);
            }
            bitmap[byte] |= 0x80 >> (port % 8);
        }
        Ok(Wks {
            address,
            protocol,
            bitmap,
        })
    }
}

impl fmt::Display for Wks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.protocol)?;
        for (byte, &bits) in self.bitmap.iter().enumerate() {
            for bit in 0..8 {
                if bits & (0x80 >> bit) != 0 {
                    write!(f, " {}", byte * 8 + bit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apl_item_syntax() {
        let item = parse_item("!1:192.0.2.0/24").unwrap();
        assert!(item.negative);
        assert_eq!(item.family, 1);
        assert_eq!(item.prefix, 24);
        // Trailing zero octets are trimmed on the wire.
        assert_eq!(item.address, vec![192, 0, 2]);

        assert!(parse_item("1:192.0.2.0/33").is_err());
        assert!(parse_item("3:abcd/1").is_err());
    }

    #[test]
    fn wks_bitmap_round_trip() {
        let mut t = Tokenizer::new("192.0.2.1 6 21 25");
        let wks = Wks::parse(&mut t).unwrap();
        assert_eq!(wks.to_string(), "192.0.2.1 6 21 25");
    }
}
