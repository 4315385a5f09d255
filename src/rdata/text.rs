//! Character-string rdata: HINFO and ISDN.

use std::fmt;

use crate::error::Result;
use crate::master::Tokenizer;
use crate::rdata::fmt_char_string;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hinfo {
    pub cpu: Vec<u8>,
    pub os: Vec<u8>,
}

impl Hinfo {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Hinfo> {
        Ok(Hinfo {
            cpu: r.read_counted_string()?.to_vec(),
            os: r.read_counted_string()?.to_vec(),
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) -> Result<()> {
        w.write_counted_string(&self.cpu)?;
        w.write_counted_string(&self.os)
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Hinfo> {
        Ok(Hinfo {
            cpu: t.get_char_string()?,
            os: t.get_char_string()?,
        })
    }
}

impl fmt::Display for Hinfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_char_string(f, &self.cpu)?;
        write!(f, " ")?;
        fmt_char_string(f, &self.os)
    }
}

/// ISDN address with an optional subaddress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isdn {
    pub address: Vec<u8>,
    pub sub_address: Option<Vec<u8>>,
}

impl Isdn {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Isdn> {
        let address = r.read_counted_string()?.to_vec();
        let sub_address = if r.is_empty() {
            None
        } else {
            Some(r.read_counted_string()?.to_vec())
        };
        Ok(Isdn {
            address,
            sub_address,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter) -> Result<()> {
        w.write_counted_string(&self.address)?;
        if let Some(sub) = &self.sub_address {
            w.write_counted_string(sub)?;
        }
        Ok(())
    }

    pub fn parse(t: &mut Tokenizer<'_>) -> Result<Isdn> {
        Ok(Isdn {
            address: t.get_char_string()?,
            sub_address: t.try_char_string()?,
        })
    }
}

impl fmt::Display for Isdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_char_string(f, &self.address)?;
        if let Some(sub) = &self.sub_address {
            write!(f, " ")?;
            fmt_char_string(f, sub)?;
        }
        Ok(())
    }
}
