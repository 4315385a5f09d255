//! The resolution-outcome algebra shared by [`crate::zone::Zone`] and
//! [`crate::cache::Cache`], and the credibility ranks that order cached
//! data by trustworthiness.

use std::fmt;

use crate::name::Name;
use crate::rr::Record;
use crate::rrset::Rrset;

/// The outcome of `lookup(name, type)`. Cases are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetResponse {
    /// No information (cache miss, or name outside the zone).
    Unknown,
    /// The name is proven not to exist.
    Nxdomain,
    /// The name exists but has no data of the requested type.
    Nxrrset(Name),
    /// The answer lies below a zone cut; the NS set marks it.
    Delegation(Rrset),
    /// An alias; the caller follows the target.
    Cname(Record),
    /// A subtree rewrite; the caller synthesizes a CNAME and retargets.
    Dname(Record),
    /// One or more RRsets answering the question.
    Successful(Vec<Rrset>),
}

impl SetResponse {
    pub fn is_successful(&self) -> bool {
        matches!(self, SetResponse::Successful(_))
    }

    pub fn answers(&self) -> &[Rrset] {
        match self {
            SetResponse::Successful(sets) => sets,
            _ => &[],
        }
    }
}

impl fmt::Display for SetResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetResponse::Unknown => write!(f, "unknown"),
            SetResponse::Nxdomain => write!(f, "NXDOMAIN"),
            SetResponse::Nxrrset(name) => write!(f, "NXRRSET {}", name),
            SetResponse::Delegation(ns) => write!(f, "delegation: {}", ns),
            SetResponse::Cname(r) => write!(f, "CNAME: {}", r),
            SetResponse::Dname(r) => write!(f, "DNAME: {}", r),
            SetResponse::Successful(_) => write!(f, "successful"),
        }
    }
}

/// How trustworthy cached data is; higher ranks replace lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Credibility(pub u8);

impl Credibility {
    /// Bootstrap hints.
    pub const HINT: Credibility = Credibility(0);
    /// Additional-section data.
    pub const ADDITIONAL: Credibility = Credibility(1);
    /// Glue under a delegation.
    pub const GLUE: Credibility = Credibility(1);
    /// Answer section of a non-authoritative response.
    pub const NONAUTH_ANSWER: Credibility = Credibility(3);
    /// Authority section of a non-authoritative response.
    pub const NONAUTH_AUTHORITY: Credibility = Credibility(3);
    /// Answer section of an authoritative response.
    pub const AUTH_ANSWER: Credibility = Credibility(4);
    /// Authority section of an authoritative response.
    pub const AUTH_AUTHORITY: Credibility = Credibility(4);
    /// Data from a locally held zone.
    pub const ZONE: Credibility = Credibility(5);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credibility_ordering() {
        assert!(Credibility::HINT < Credibility::GLUE);
        assert!(Credibility::GLUE < Credibility::NONAUTH_ANSWER);
        assert!(Credibility::NONAUTH_AUTHORITY < Credibility::AUTH_ANSWER);
        assert!(Credibility::AUTH_AUTHORITY < Credibility::ZONE);
        assert_eq!(Credibility::GLUE, Credibility::ADDITIONAL);
    }
}
