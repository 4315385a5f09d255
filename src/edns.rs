//! EDNS(0) support: the OPT pseudo-record and its option list.
//!
//! An OPT record abuses the fixed record fields: the class carries the
//! requestor's UDP payload size and the TTL packs extended rcode, version,
//! and flags. [`OptRecord`] wraps a [`Record`] with accessors for that
//! encoding; the option list itself lives in the record's rdata.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{error, Result};
use crate::name::Name;
use crate::rdata::{fmt_hex, Rdata};
use crate::rr::{DnsClass, Record, RrType};
use crate::wire::{WireReader, WireWriter};

pub const OPT_NSID: u16 = 3;
pub const OPT_CLIENT_SUBNET: u16 = 8;
pub const OPT_LLQ: u16 = 1;
pub const OPT_UPDATE_LEASE: u16 = 2;

/// The DNSSEC-OK bit in the extended flags.
pub const FLAG_DO: u16 = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdnsOption {
    Nsid(Vec<u8>),
    /// RFC 7871 client subnet; the address is trimmed to the source
    /// prefix as on the wire.
    ClientSubnet {
        family: u16,
        source_netmask: u8,
        scope_netmask: u8,
        address: Vec<u8>,
    },
    /// Long-lived query control (draft-sekar-dns-llq).
    Llq {
        version: u16,
        opcode: u16,
        error: u16,
        id: u64,
        lease: u32,
    },
    /// Dynamic DNS update lease (draft-sekar-dns-ul).
    UpdateLease { lease: u32 },
    Unknown { code: u16, data: Vec<u8> },
}

impl EdnsOption {
    pub fn code(&self) -> u16 {
        match self {
            EdnsOption::Nsid(_) => OPT_NSID,
            EdnsOption::ClientSubnet { .. } => OPT_CLIENT_SUBNET,
            EdnsOption::Llq { .. } => OPT_LLQ,
            EdnsOption::UpdateLease { .. } => OPT_UPDATE_LEASE,
            EdnsOption::Unknown { code, .. } => *code,
        }
    }

    /// Builds a client-subnet option from an address and prefix length.
    pub fn client_subnet(addr: IpAddr, source_netmask: u8) -> EdnsOption {
        let (family, mut address) = match addr {
            IpAddr::V4(a) => (1u16, a.octets().to_vec()),
            IpAddr::V6(a) => (2u16, a.octets().to_vec()),
        };
        address.truncate((source_netmask as usize + 7) / 8);
        EdnsOption::ClientSubnet {
            family,
            source_netmask,
            scope_netmask: 0,
            address,
        }
    }

    fn data_from_wire(code: u16, r: &mut WireReader<'_>) -> Result<EdnsOption> {
        Ok(match code {
            OPT_NSID => EdnsOption::Nsid(r.read_remaining().to_vec()),
            OPT_CLIENT_SUBNET => {
                let family = r.read_u16()?;
                let source_netmask = r.read_u8()?;
                let scope_netmask = r.read_u8()?;
                let address = r.read_remaining().to_vec();
                if address.len() != (source_netmask as usize + 7) / 8 {
                    return Err(
                        error!(WireParse => "client-subnet address/netmask length mismatch"),
                    );
                }
                EdnsOption::ClientSubnet {
                    family,
                    source_netmask,
                    scope_netmask,
                    address,
                }
            }
            OPT_LLQ => EdnsOption::Llq {
                version: r.read_u16()?,
                opcode: r.read_u16()?,
                error: r.read_u16()?,
                id: (r.read_u32()? as u64) << 32 | r.read_u32()? as u64,
                lease: r.read_u32()?,
            },
            OPT_UPDATE_LEASE => EdnsOption::UpdateLease {
                lease: r.read_u32()?,
            },
            _ => EdnsOption::Unknown {
                code,
                data: r.read_remaining().to_vec(),
            },
        })
    }

    fn data_to_wire(&self, w: &mut WireWriter) {
        match self {
            EdnsOption::Nsid(data) => w.write_bytes(data),
            EdnsOption::ClientSubnet {
                family,
                source_netmask,
                scope_netmask,
                address,
            } => {
                w.write_u16(*family);
                w.write_u8(*source_netmask);
                w.write_u8(*scope_netmask);
                w.write_bytes(address);
            }
            EdnsOption::Llq {
                version,
                opcode,
                error,
                id,
                lease,
            } => {
                w.write_u16(*version);
                w.write_u16(*opcode);
                w.write_u16(*error);
                w.write_u32((id >> 32) as u32);
                w.write_u32(*id as u32);
                w.write_u32(*lease);
            }
            EdnsOption::UpdateLease { lease } => w.write_u32(*lease),
            EdnsOption::Unknown { data, .. } => w.write_bytes(data),
        }
    }

    /// Decodes `code | length | data` triples until the region is empty.
    pub fn list_from_wire(r: &mut WireReader<'_>) -> Result<Vec<EdnsOption>> {
        let mut options = Vec::new();
        while !r.is_empty() {
            let code = r.read_u16()?;
            let len = r.read_u16()? as usize;
            let prev = r.set_active(len)?;
            let option = EdnsOption::data_from_wire(code, r)?;
            if !r.is_empty() {
                return Err(error!(WireParse => "trailing bytes in option {}", code));
            }
            r.restore_active(prev);
            options.push(option);
        }
        Ok(options)
    }

    /// Encodes each option, backpatching its length.
    pub fn list_to_wire(options: &[EdnsOption], w: &mut WireWriter) -> Result<()> {
        for option in options {
            w.write_u16(option.code());
            let len_at = w.skip_u16();
            option.data_to_wire(w);
            let len = w.pos() - len_at - 2;
            if len > 0xffff {
                return Err(error!(WireParse => "option data of {} octets", len));
            }
            w.patch_u16(len_at, len as u16);
        }
        Ok(())
    }
}

impl fmt::Display for EdnsOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdnsOption::Nsid(data) => write!(f, "NSID {}", fmt_hex(data)),
            EdnsOption::ClientSubnet {
                family,
                source_netmask,
                scope_netmask,
                address,
            } => {
                write!(f, "CLIENT-SUBNET ")?;
                match family {
                    1 => {
                        let mut o = [0u8; 4];
                        let n = address.len().min(4);
                        o[..n].copy_from_slice(&address[..n]);
                        write!(f, "{}", Ipv4Addr::from(o))?;
                    }
                    2 => {
                        let mut o = [0u8; 16];
                        let n = address.len().min(16);
                        o[..n].copy_from_slice(&address[..n]);
                        write!(f, "{}", Ipv6Addr::from(o))?;
                    }
                    _ => write!(f, "{}", fmt_hex(address))?,
                }
                write!(f, "/{}/{}", source_netmask, scope_netmask)
            }
            EdnsOption::Llq {
                version,
                opcode,
                error,
                id,
                lease,
            } => write!(f, "LLQ {} {} {} {} {}", version, opcode, error, id, lease),
            EdnsOption::UpdateLease { lease } => write!(f, "UPDATE-LEASE {}", lease),
            EdnsOption::Unknown { code, data } => write!(f, "OPT{} {}", code, fmt_hex(data)),
        }
    }
}

/// View over an OPT [`Record`] decoding the payload/rcode/version/flags
/// packing of RFC 6891.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptRecord(Record);

impl OptRecord {
    pub fn new(
        payload_size: u16,
        ext_rcode: u8,
        version: u8,
        flags: u16,
        options: Vec<EdnsOption>,
    ) -> OptRecord {
        let ttl = (ext_rcode as u32) << 24 | (version as u32) << 16 | flags as u32;
        OptRecord(Record::raw(
            Name::root(),
            RrType::OPT,
            DnsClass(payload_size),
            ttl,
            Rdata::Opt(options),
        ))
    }

    pub fn from_record(record: Record) -> Result<OptRecord> {
        if record.rtype() != RrType::OPT {
            return Err(error!(InvalidType => "{} is not an OPT record", record.rtype()));
        }
        Ok(OptRecord(record))
    }

    pub fn payload_size(&self) -> u16 {
        self.0.class().0
    }

    pub fn ext_rcode(&self) -> u8 {
        (self.0.ttl() >> 24) as u8
    }

    pub fn version(&self) -> u8 {
        (self.0.ttl() >> 16) as u8
    }

    pub fn flags(&self) -> u16 {
        self.0.ttl() as u16
    }

    pub fn options(&self) -> &[EdnsOption] {
        match self.0.rdata() {
            Rdata::Opt(options) => options,
            _ => &[],
        }
    }

    pub fn record(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_list_round_trip() {
        let options = vec![
            EdnsOption::Nsid(b"ns.example".to_vec()),
            EdnsOption::client_subnet("192.0.2.0".parse().unwrap(), 24),
            EdnsOption::Llq {
                version: 1,
                opcode: 1,
                error: 0,
                id: 0xdead_beef_cafe_f00d,
                lease: 3600,
            },
            EdnsOption::UpdateLease { lease: 7200 },
            EdnsOption::Unknown {
                code: 999,
                data: vec![1, 2, 3],
            },
        ];
        let mut w = WireWriter::new();
        EdnsOption::list_to_wire(&options, &mut w).unwrap();
        let wire = w.freeze();
        let mut r = WireReader::new(&wire);
        assert_eq!(EdnsOption::list_from_wire(&mut r).unwrap(), options);
    }

    #[test]
    fn client_subnet_trims_address() {
        match EdnsOption::client_subnet("192.0.2.1".parse().unwrap(), 24) {
            EdnsOption::ClientSubnet { address, .. } => assert_eq!(address, vec![192, 0, 2]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn opt_record_packing() {
        let opt = OptRecord::new(4096, 0x01, 0, FLAG_DO, Vec::new());
        assert_eq!(opt.payload_size(), 4096);
        assert_eq!(opt.ext_rcode(), 1);
        assert_eq!(opt.version(), 0);
        assert_eq!(opt.flags(), FLAG_DO);
        assert_eq!(opt.record().ttl(), 0x0100_8000);
    }
}
