//! dnskit: a DNS protocol library.
//!
//! The crate covers the RFC 1035 wire codec with name compression, an
//! extensible record-type registry with presentation-format parsing, the
//! message structure with truncation-safe rendering, an authoritative
//! [`zone::Zone`] and a credibility-ranked [`cache::Cache`] sharing one
//! lookup algebra, TSIG signing with streaming verification, and an
//! IXFR/AXFR transfer client. It is the plumbing for resolvers,
//! authoritative servers, and administrative tooling.
//!
//! A quick tour:
//!
//! ```no_run
//! use dnskit::message::Section;
//! use dnskit::resolver::{make_query, Resolver, SimpleResolver};
//! use dnskit::rr::RrType;
//!
//! # fn main() -> dnskit::error::Result<()> {
//! let resolver = SimpleResolver::new("192.0.2.53".parse().unwrap());
//! let name = "www.example.com.".parse()?;
//! let response = resolver.send(&make_query(&name, RrType::A))?;
//! for record in response.records(Section::Answer) {
//!     println!("{}", record);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod edns;
pub mod error;
pub mod key;
pub mod logger;
pub mod lookup;
pub mod master;
pub mod message;
pub mod name;
pub mod rdata;
pub mod resolver;
pub mod rr;
pub mod rrset;
pub mod tsig;
pub mod wire;
pub mod xfr;
pub mod zone;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::name::Name;
pub use crate::rr::{DnsClass, Record, RrType};
