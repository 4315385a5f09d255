use std::fmt;

use crate::error::Result;
use crate::master::Tokenizer;
use crate::name::{Compression, Name};
use crate::rdata::emit_name;
use crate::wire::{WireReader, WireWriter};

/// Start-of-authority rdata. The serial wraps and compares under RFC 1982
/// sequence arithmetic ([`crate::rr::serial`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Soa {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Soa> {
        Ok(Soa {
            mname: Name::from_wire(r)?,
            rname: Name::from_wire(r)?,
            serial: r.read_u32()?,
            refresh: r.read_u32()?,
            retry: r.read_u32()?,
            expire: r.read_u32()?,
            minimum: r.read_u32()?,
        })
    }

    pub fn to_wire(
        &self,
        w: &mut WireWriter,
        mut c: Option<&mut Compression>,
        canonical: bool,
    ) -> Result<()> {
        emit_name(&self.mname, w, c.as_deref_mut(), canonical)?;
        emit_name(&self.rname, w, c, canonical)?;
        w.write_u32(self.serial);
        w.write_u32(self.refresh);
        w.write_u32(self.retry);
        w.write_u32(self.expire);
        w.write_u32(self.minimum);
        Ok(())
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Soa> {
        Ok(Soa {
            mname: t.get_name(origin)?,
            rname: t.get_name(origin)?,
            serial: t.get_u32()?,
            refresh: t.get_ttl()?,
            retry: t.get_ttl()?,
            expire: t.get_ttl()?,
            minimum: t.get_ttl()?,
        })
    }
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}
