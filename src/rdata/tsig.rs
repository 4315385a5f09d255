//! Meta rdata for transaction security: TSIG (RFC 8945) and TKEY
//! (RFC 2930). Neither has a presentation form; both display for logging.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{error, Result};
use crate::name::Name;
use crate::rdata::emit_name;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tsig {
    pub algorithm: Name,
    /// Signing time, 48 bits of seconds since the epoch.
    pub time_signed: u64,
    pub fudge: u16,
    pub mac: Vec<u8>,
    pub original_id: u16,
    pub error: u16,
    pub other: Vec<u8>,
}

impl Tsig {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Tsig> {
        let algorithm = Name::from_wire(r)?;
        let time_high = r.read_u16()? as u64;
        let time_low = r.read_u32()? as u64;
        let fudge = r.read_u16()?;
        let mac_len = r.read_u16()? as usize;
        let mac = r.read_bytes(mac_len)?.to_vec();
        let original_id = r.read_u16()?;
        let error = r.read_u16()?;
        let other_len = r.read_u16()? as usize;
        let other = r.read_bytes(other_len)?.to_vec();
        Ok(Tsig {
            algorithm,
            time_signed: time_high << 32 | time_low,
            fudge,
            mac,
            original_id,
            error,
            other,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        emit_name(&self.algorithm, w, None, canonical)?;
        w.write_u16((self.time_signed >> 32) as u16);
        w.write_u32(self.time_signed as u32);
        w.write_u16(self.fudge);
        if self.mac.len() > 0xffff {
            return Err(error!(WireParse => "tsig mac of {} octets", self.mac.len()));
        }
        w.write_u16(self.mac.len() as u16);
        w.write_bytes(&self.mac);
        w.write_u16(self.original_id);
        w.write_u16(self.error);
        w.write_u16(self.other.len() as u16);
        w.write_bytes(&self.other);
        Ok(())
    }
}

impl fmt::Display for Tsig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.algorithm,
            self.time_signed,
            self.fudge,
            BASE64.encode(&self.mac),
            self.original_id,
            self.error
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tkey {
    pub algorithm: Name,
    pub inception: u32,
    pub expiration: u32,
    pub mode: u16,
    pub error: u16,
    pub key: Vec<u8>,
    pub other: Vec<u8>,
}

impl Tkey {
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Tkey> {
        let algorithm = Name::from_wire(r)?;
        let inception = r.read_u32()?;
        let expiration = r.read_u32()?;
        let mode = r.read_u16()?;
        let error = r.read_u16()?;
        let key_len = r.read_u16()? as usize;
        let key = r.read_bytes(key_len)?.to_vec();
        let other_len = r.read_u16()? as usize;
        let other = r.read_bytes(other_len)?.to_vec();
        Ok(Tkey {
            algorithm,
            inception,
            expiration,
            mode,
            error,
            key,
            other,
        })
    }

    pub fn to_wire(&self, w: &mut WireWriter, canonical: bool) -> Result<()> {
        emit_name(&self.algorithm, w, None, canonical)?;
        w.write_u32(self.inception);
        w.write_u32(self.expiration);
        w.write_u16(self.mode);
        w.write_u16(self.error);
        w.write_u16(self.key.len() as u16);
        w.write_bytes(&self.key);
        w.write_u16(self.other.len() as u16);
        w.write_bytes(&self.other);
        Ok(())
    }
}

impl fmt::Display for Tkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.algorithm,
            self.inception,
            self.expiration,
            self.mode,
            self.error,
            BASE64.encode(&self.key)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsig_wire_round_trip() {
        let rd = Tsig {
            algorithm: "hmac-sha256.".parse().unwrap(),
            time_signed: 0x0001_2345_6789,
            fudge: 300,
            mac: vec![0xaa; 32],
            original_id: 0x1234,
            error: 0,
            other: Vec::new(),
        };
        let mut w = WireWriter::new();
        rd.to_wire(&mut w, false).unwrap();
        let wire = w.freeze();
        let mut r = WireReader::new(&wire);
        assert_eq!(Tsig::from_wire(&mut r).unwrap(), rd);
        assert!(r.is_empty());
    }
}
