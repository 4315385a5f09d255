//! Mail-routing rdata shapes: the preference+target pair shared by MX, KX,
//! RT, and AFSDB, plus the two-name MINFO and RP forms.

use std::fmt;

use crate::error::Result;
use crate::master::Tokenizer;
use crate::name::{Compression, Name};
use crate::rdata::emit_name;
use crate::wire::{WireReader, WireWriter};

/// A 16-bit preference followed by a target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub preference: u16,
    pub target: Name,
}

impl Exchange {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Exchange> {
        Ok(Exchange {
            preference: r.read_u16()?,
            target: Name::from_wire(r)?,
        })
    }

    pub fn to_wire(
        &self,
        w: &mut WireWriter,
        c: Option<&mut Compression>,
        canonical: bool,
    ) -> Result<()> {
        w.write_u16(self.preference);
        emit_name(&self.target, w, c, canonical)
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Exchange> {
        Ok(Exchange {
            preference: t.get_u16()?,
            target: t.get_name(origin)?,
        })
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.target)
    }
}

/// Mailbox / mail-list information: responsible mailbox and error mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minfo {
    pub rmailbx: Name,
    pub emailbx: Name,
}

impl Minfo {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Minfo> {
        Ok(Minfo {
            rmailbx: Name::from_wire(r)?,
            emailbx: Name::from_wire(r)?,
        })
    }

    pub fn to_wire(
        &self,
        w: &mut WireWriter,
        mut c: Option<&mut Compression>,
        canonical: bool,
    ) -> Result<()> {
        emit_name(&self.rmailbx, w, c.as_deref_mut(), canonical)?;
        emit_name(&self.emailbx, w, c, canonical)
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Minfo> {
        Ok(Minfo {
            rmailbx: t.get_name(origin)?,
            emailbx: t.get_name(origin)?,
        })
    }
}

impl fmt::Display for Minfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rmailbx, self.emailbx)
    }
}

/// Responsible person: mailbox plus a pointer to TXT details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rp {
    pub mbox: Name,
    pub txt: Name,
}

impl Rp {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Rp> {
        Ok(Rp {
            mbox: Name::from_wire(r)?,
            txt: Name::from_wire(r)?,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        emit_name(&self.mbox, w, None, canonical)?;
        emit_name(&self.txt, w, None, canonical)
    }

    pub fn parse(t: &mut Tokenizer<'_>, origin: Option<&Name>) -> Result<Rp> {
        Ok(Rp {
            mbox: t.get_name(origin)?,
            txt: t.get_name(origin)?,
        })
    }
}

impl fmt::Display for Rp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mbox, self.txt)
    }
}
