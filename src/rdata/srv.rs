//! Service-location rdata: SRV and NAPTR. Neither compresses its target
//! name on the wire (both postdate RFC 1035).

use std::fmt;

use crate::error::Result;
use crate::master::Tokenizer;
use crate::name::Name;
use crate::rdata::{emit_name, fmt_char_string};
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: Name,
}

impl Srv {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Srv> {
        Ok(Srv {
            priority: r.read_u16()?,
            weight: r.read_u16()?,
            port: r.read_u16()?,
            target: Name::from_wire(r)?,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        w.write_u16(self.priority);
        w.write_u16(self.weight);
        w.write_u16(self.port);
        emit_name(&self.target, w, None, canonical)
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Srv> {
        Ok(Srv {
            priority: t.get_u16()?,
            weight: t.get_u16()?,
            port: t.get_u16()?,
            target: t.get_name(origin)?,
        })
    }
}

impl fmt::Display for Srv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naptr {
    pub order: u16,
    pub preference: u16,
    pub flags: Vec<u8>,
    pub service: Vec<u8>,
    pub regexp: Vec<u8>,
    pub replacement: Name,
}

impl Naptr {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Naptr> {
        Ok(Naptr {
            order: r.read_u16()?,
            preference: r.read_u16()?,
            flags: r.read_counted_string()?.to_vec(),
            service: r.read_counted_string()?.to_vec(),
            regexp: r.read_counted_string()?.to_vec(),
            replacement: Name::from_wire(r)?,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        w.write_u16(self.order);
        w.write_u16(self.preference);
        w.write_counted_string(&self.flags)?;
        w.write_counted_string(&self.service)?;
        w.write_counted_string(&self.regexp)?;
        emit_name(&self.replacement, w, None, canonical)
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Naptr> {
        Ok(Naptr {
            order: t.get_u16()?,
            preference: t.get_u16()?,
            flags: t.get_char_string()?,
            service: t.get_char_string()?,
            regexp: t.get_char_string()?,
            replacement: t.get_name(origin)?,
        })
    }
}

impl fmt::Display for Naptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.order, self.preference)?;
        fmt_char_string(f, &self.flags)?;
        write!(f, " ")?;
        fmt_char_string(f, &self.service)?;
        write!(f, " ")?;
        fmt_char_string(f, &self.regexp)?;
        write!(f, " {}", self.replacement)
    }
}
