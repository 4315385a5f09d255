//! An in-memory authoritative zone: a map from owner name to its RRsets,
//! the shared lookup walk over it, and response assembly for servers.
//!
//! A zone holds the names at or below its origin that are not below a
//! delegation, plus glue address records under cuts (stored, but never
//! authoritative).

use std::collections::HashMap;
use std::path::Path;

use crate::error::{error, Result};
use crate::lookup::SetResponse;
use crate::master::Master;
use crate::message::{Flag, Message, Rcode, Section};
use crate::name::Name;
use crate::rdata::Rdata;
use crate::rr::{DnsClass, Record, RrType};
use crate::rrset::Rrset;

/// CNAME/DNAME chains are chased at most this many times while building
/// one response.
const MAX_CHASE: usize = 6;

#[derive(Debug, Clone)]
pub struct Zone {
    origin: Name,
    class: DnsClass,
    nodes: HashMap<Name, Vec<Rrset>>,
}

impl Zone {
    /// Builds and validates a zone from a record list.
    pub fn new(origin: Name, records: Vec<Record>) -> Result<Zone> {
        if !origin.is_absolute() {
            return Err(error!(ZoneData => "zone origin {} is not absolute", origin));
        }
        let mut zone = Zone {
            origin,
            class: DnsClass::IN,
            nodes: HashMap::new(),
        };
        for record in records {
            zone.add_record(record)?;
        }
        zone.validate()?;
        Ok(zone)
    }

    /// Reads a master file rooted at `origin`.
    pub fn from_file<P: AsRef<Path>>(origin: Name, path: P) -> Result<Zone> {
        let records = Master::parse_file(path, Some(origin.clone()))?;
        Zone::new(origin, records)
    }

    /// Builds a zone from the record list of a completed full transfer.
    /// The transfer ends with a repeat of the starting SOA, which is
    /// dropped here.
    pub fn from_axfr(mut records: Vec<Record>) -> Result<Zone> {
        let origin = match records.first() {
            Some(first) if first.rtype() == RrType::SOA => first.name().clone(),
            _ => return Err(error!(ZoneData => "transfer does not start with SOA")),
        };
        if records.len() > 1 && records.last() == records.first() {
            records.pop();
        }
        Zone::new(origin, records)
    }

    fn validate(&self) -> Result<()> {
        let soa = self
            .find_exact(&self.origin, RrType::SOA)
            .ok_or_else(|| error!(ZoneData => "zone {} has no SOA", self.origin))?;
        if soa.len() != 1 {
            return Err(error!(ZoneData => "zone {} has {} SOA records", self.origin, soa.len()));
        }
        if self.find_exact(&self.origin, RrType::NS).is_none() {
            return Err(error!(ZoneData => "zone {} has no NS at the apex", self.origin));
        }
        Ok(())
    }

    pub fn origin(&self) -> &Name {
        &self.origin
    }

    pub fn class(&self) -> DnsClass {
        self.class
    }

    pub fn soa(&self) -> &Record {
        &self
            .find_exact(&self.origin, RrType::SOA)
            .expect("validated at construction")
            .records()[0]
    }

    pub fn serial(&self) -> u32 {
        match self.soa().rdata() {
            Rdata::Soa(soa) => soa.serial,
            _ => 0,
        }
    }

    pub fn ns(&self) -> &Rrset {
        self.find_exact(&self.origin, RrType::NS)
            .expect("validated at construction")
    }

    pub fn add_record(&mut self, record: Record) -> Result<()> {
        if record.rtype().is_meta() {
            return Err(error!(ZoneData => "meta type {} cannot be stored", record.rtype()));
        }
        if !record.name().subdomain_of(&self.origin) {
            return Err(
                error!(ZoneData => "record {} is outside zone {}", record.name(), self.origin),
            );
        }
        let sets = self.nodes.entry(record.name().clone()).or_default();
        match sets.iter_mut().find(|s| s.rtype() == record.rrset_type()) {
            Some(set) => set.add(record)?,
            None => sets.push(Rrset::new(record)),
        }
        Ok(())
    }

    pub fn remove_record(&mut self, record: &Record) {
        if let Some(sets) = self.nodes.get_mut(record.name()) {
            for set in sets.iter_mut() {
                set.remove(record);
            }
            sets.retain(|s| !s.is_empty());
            if sets.is_empty() {
                self.nodes.remove(record.name());
            }
        }
    }

    /// The RRset at exactly (name, type); no wildcard or delegation logic.
    pub fn find_exact(&self, name: &Name, rtype: RrType) -> Option<&Rrset> {
        self.nodes
            .get(name)?
            .iter()
            .find(|s| s.rtype() == rtype)
    }

    /// The shared lookup walk: origin downward, DNAME and delegations at
    /// ancestors, then the target node with a wildcard fallback.
    pub fn lookup(&self, name: &Name, rtype: RrType) -> SetResponse {
        if !name.is_absolute() || !name.subdomain_of(&self.origin) {
            return SetResponse::Unknown;
        }
        let olabels = self.origin.label_count();
        let labels = name.label_count();

        for tlabels in olabels..=labels {
            let is_origin = tlabels == olabels;
            let is_exact = tlabels == labels;
            let tname = name.suffix(tlabels);
            let Some(sets) = self.nodes.get(&tname) else {
                continue;
            };

            // A non-apex NS marks a cut; everything at or below it is
            // served by the child.
            if !is_origin {
                if let Some(ns) = sets.iter().find(|s| s.rtype() == RrType::NS) {
                    return SetResponse::Delegation(ns.clone());
                }
            }
            if !is_exact {
                if let Some(dname) = sets.iter().find(|s| s.rtype() == RrType::DNAME) {
                    return SetResponse::Dname(dname.records()[0].clone());
                }
                continue;
            }

            if rtype == RrType::ANY {
                return SetResponse::Successful(sets.to_vec());
            }
            if let Some(set) = sets.iter().find(|s| s.rtype() == rtype) {
                return SetResponse::Successful(vec![set.clone()]);
            }
            if rtype != RrType::CNAME {
                if let Some(cname) = sets.iter().find(|s| s.rtype() == RrType::CNAME) {
                    return SetResponse::Cname(cname.records()[0].clone());
                }
            }
            return SetResponse::Nxrrset(name.clone());
        }

        // The target does not exist. Only the wildcard directly under the
        // closest encloser may synthesize an answer; a deeper existing
        // ancestor shadows every broader wildcard. A name with descendants
        // counts as existing even when it holds no records itself.
        let mut encloser = olabels;
        for tlabels in (olabels..labels).rev() {
            let tname = name.suffix(tlabels);
            if self.nodes.keys().any(|k| k.subdomain_of(&tname)) {
                encloser = tlabels;
                break;
            }
        }
        if let Some(sets) = self.nodes.get(&name.wild(labels - encloser)) {
            if rtype == RrType::ANY {
                return SetResponse::Successful(
                    sets.iter().map(|s| s.with_name(name)).collect(),
                );
            }
            if let Some(set) = sets.iter().find(|s| s.rtype() == rtype) {
                return SetResponse::Successful(vec![set.with_name(name)]);
            }
            if rtype != RrType::CNAME {
                if let Some(cname) = sets.iter().find(|s| s.rtype() == RrType::CNAME) {
                    return SetResponse::Cname(cname.records()[0].with_name(name.clone()));
                }
            }
        }
        SetResponse::Nxdomain
    }

    /// All RRsets in transfer order: the SOA first, then the apex, then the
    /// remaining names. The closing SOA of an outgoing AXFR is the caller's
    /// to repeat.
    pub fn rrsets(&self) -> Vec<&Rrset> {
        let mut names: Vec<&Name> = self.nodes.keys().collect();
        names.sort_by_key(|n| (n.label_count(), n.to_string()));
        let mut out = Vec::new();
        out.push(
            self.find_exact(&self.origin, RrType::SOA)
                .expect("validated at construction"),
        );
        for name in names {
            for set in &self.nodes[name] {
                if set.rtype() != RrType::SOA {
                    out.push(set);
                }
            }
        }
        out
    }

    /// Flat record list in transfer order, without the closing SOA.
    pub fn records(&self) -> Vec<Record> {
        self.rrsets()
            .iter()
            .flat_map(|s| s.records().iter().chain(s.sigs().iter()).cloned())
            .collect()
    }

    /// Builds an authoritative answer for (name, type) into `response`,
    /// chasing CNAME and DNAME chains up to a small bound and pulling glue
    /// into the additional section. Returns the outcome of the first
    /// lookup.
    pub fn add_answer(&self, response: &mut Message, name: &Name, rtype: RrType) -> SetResponse {
        self.add_answer_at(response, name, rtype, 0)
    }

    fn add_answer_at(
        &self,
        response: &mut Message,
        name: &Name,
        rtype: RrType,
        iterations: usize,
    ) -> SetResponse {
        if iterations > MAX_CHASE {
            log::debug!(target: "zone", "alias chain for {} exceeds {} links", name, MAX_CHASE);
            return SetResponse::Unknown;
        }
        let sr = self.lookup(name, rtype);
        match &sr {
            SetResponse::Successful(sets) => {
                response.header_mut().set_flag(Flag::Aa);
                for set in sets {
                    add_rrset(response, Section::Answer, set);
                    self.add_glue(response, set);
                }
            }
            SetResponse::Cname(record) => {
                response.header_mut().set_flag(Flag::Aa);
                add_record(response, Section::Answer, record.clone());
                if let Rdata::Cname(target) = record.rdata() {
                    let target = target.clone();
                    self.add_answer_at(response, &target, rtype, iterations + 1);
                }
            }
            SetResponse::Dname(record) => {
                response.header_mut().set_flag(Flag::Aa);
                add_record(response, Section::Answer, record.clone());
                if let Rdata::Dname(target) = record.rdata() {
                    if let Some(Ok(new_name)) = name.from_dname(record.name(), target) {
                        // Synthesize the CNAME the rewrite implies.
                        if let Ok(cname) = Record::new(
                            name.clone(),
                            RrType::CNAME,
                            record.class(),
                            record.ttl(),
                            Rdata::Cname(new_name.clone()),
                        ) {
                            add_record(response, Section::Answer, cname);
                            self.add_answer_at(response, &new_name, rtype, iterations + 1);
                        }
                    }
                }
            }
            SetResponse::Nxdomain => {
                response.header_mut().set_flag(Flag::Aa);
                if iterations == 0 {
                    response.header_mut().set_rcode(Rcode::NXDOMAIN);
                }
                add_record(response, Section::Authority, self.soa().clone());
            }
            SetResponse::Nxrrset(_) => {
                response.header_mut().set_flag(Flag::Aa);
                add_record(response, Section::Authority, self.soa().clone());
            }
            SetResponse::Delegation(ns) => {
                response.header_mut().clear_flag(Flag::Aa);
                add_rrset(response, Section::Authority, ns);
                self.add_glue(response, ns);
            }
            SetResponse::Unknown => {}
        }
        sr
    }

    fn add_glue(&self, response: &mut Message, set: &Rrset) {
        for record in set.records() {
            let Some(target) = record.additional_name() else {
                continue;
            };
            for rtype in [RrType::A, RrType::AAAA] {
                if let Some(glue) = self.find_exact(target, rtype) {
                    add_rrset(response, Section::Additional, glue);
                }
            }
        }
    }
}

fn add_record(response: &mut Message, section: Section, record: Record) {
    if !response.records(section).contains(&record) {
        response.add_record(section, record);
    }
}

fn add_rrset(response: &mut Message, section: Section, set: &Rrset) {
    for record in set.records().iter().chain(set.sigs().iter()) {
        add_record(response, section, record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn test_zone() -> Zone {
        let text = "\
$ORIGIN example.com.
$TTL 3600
@       IN SOA ns1 admin 100 7200 900 1209600 300
        IN NS ns1
ns1     IN A 192.0.2.53
www     IN CNAME host
host    IN A 192.0.2.5
mail    IN MX 10 host
*.wild  IN TXT \"wildcard\"
sub     IN NS ns1.sub
ns1.sub IN A 192.0.2.99
alias   IN DNAME target
a.target IN A 192.0.2.7
";
        let records = Master::parse_str(text, None).unwrap();
        Zone::new(name("example.com."), records).unwrap()
    }

    #[test]
    fn zone_requires_soa_and_ns() {
        let records = Master::parse_str(
            "example.com. 300 IN NS ns1.example.com.\n",
            None,
        )
        .unwrap();
        let err = Zone::new(name("example.com."), records).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ZoneData);
    }

    #[test]
    fn successful_and_nxrrset_and_nxdomain() {
        let zone = test_zone();
        match zone.lookup(&name("host.example.com."), RrType::A) {
            SetResponse::Successful(sets) => {
                assert_eq!(sets.len(), 1);
                assert_eq!(sets[0].records()[0].rdata(), &Rdata::A(Ipv4Addr::new(192, 0, 2, 5)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            zone.lookup(&name("host.example.com."), RrType::MX),
            SetResponse::Nxrrset(name("host.example.com."))
        );
        assert_eq!(
            zone.lookup(&name("missing.example.com."), RrType::A),
            SetResponse::Nxdomain
        );
        assert_eq!(
            zone.lookup(&name("elsewhere.org."), RrType::A),
            SetResponse::Unknown
        );
    }

    #[test]
    fn cname_and_any() {
        let zone = test_zone();
        match zone.lookup(&name("www.example.com."), RrType::A) {
            SetResponse::Cname(r) => {
                assert_eq!(r.rdata(), &Rdata::Cname(name("host.example.com.")));
            }
            other => panic!("unexpected {:?}", other),
        }
        // Asking for the CNAME itself succeeds.
        assert!(zone
            .lookup(&name("www.example.com."), RrType::CNAME)
            .is_successful());
        // ANY returns every set at the node.
        match zone.lookup(&name("example.com."), RrType::ANY) {
            SetResponse::Successful(sets) => assert_eq!(sets.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn delegation_below_a_cut() {
        let zone = test_zone();
        for qname in ["sub.example.com.", "deep.in.sub.example.com."] {
            match zone.lookup(&name(qname), RrType::A) {
                SetResponse::Delegation(ns) => {
                    assert_eq!(ns.name(), &name("sub.example.com."));
                }
                other => panic!("unexpected {:?} for {}", other, qname),
            }
        }
    }

    #[test]
    fn wildcard_synthesis_owns_the_queried_name() {
        let zone = test_zone();
        match zone.lookup(&name("anything.wild.example.com."), RrType::TXT) {
            SetResponse::Successful(sets) => {
                assert_eq!(sets[0].name(), &name("anything.wild.example.com."));
            }
            other => panic!("unexpected {:?}", other),
        }
        // A type the wildcard does not carry is still NXDOMAIN.
        assert_eq!(
            zone.lookup(&name("anything.wild.example.com."), RrType::MX),
            SetResponse::Nxdomain
        );
    }

    #[test]
    fn wildcard_only_matches_under_the_closest_encloser() {
        let text = "\
$ORIGIN example.com.
$TTL 300
@       IN SOA ns1 admin 1 7200 900 1209600 300
        IN NS ns1
ns1     IN A 192.0.2.53
y.a     IN TXT \"concrete\"
*.a     IN TXT \"broad\"
";
        let records = Master::parse_str(text, None).unwrap();
        let zone = Zone::new(name("example.com."), records).unwrap();

        // The closest encloser of z.y.a is the concrete node y.a;
        // *.y.a does not exist, so the broader *.a must not match.
        assert_eq!(
            zone.lookup(&name("z.y.a.example.com."), RrType::A),
            SetResponse::Nxdomain
        );
        assert_eq!(
            zone.lookup(&name("z.y.a.example.com."), RrType::TXT),
            SetResponse::Nxdomain
        );

        // Directly under a, an empty non-terminal, the wildcard applies
        // and owns the queried name.
        match zone.lookup(&name("z.a.example.com."), RrType::TXT) {
            SetResponse::Successful(sets) => {
                assert_eq!(sets[0].name(), &name("z.a.example.com."));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dname_at_an_ancestor() {
        let zone = test_zone();
        match zone.lookup(&name("a.alias.example.com."), RrType::A) {
            SetResponse::Dname(r) => {
                assert_eq!(r.name(), &name("alias.example.com."));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn add_answer_chases_cname() {
        let zone = test_zone();
        let mut response = Message::new();
        let sr = zone.add_answer(&mut response, &name("www.example.com."), RrType::A);
        assert!(matches!(sr, SetResponse::Cname(_)));
        assert!(response.header().flag(Flag::Aa));

        let answers = response.records(Section::Answer);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].rtype(), RrType::CNAME);
        assert_eq!(answers[1].rtype(), RrType::A);
        assert_eq!(answers[1].name(), &name("host.example.com."));
    }

    #[test]
    fn add_answer_pulls_glue() {
        let zone = test_zone();
        let mut response = Message::new();
        zone.add_answer(&mut response, &name("mail.example.com."), RrType::MX);
        let additional = response.records(Section::Additional);
        assert!(additional
            .iter()
            .any(|r| r.name() == &name("host.example.com.") && r.rtype() == RrType::A));
    }

    #[test]
    fn add_answer_negative_attaches_soa() {
        let zone = test_zone();
        let mut response = Message::new();
        zone.add_answer(&mut response, &name("missing.example.com."), RrType::A);
        assert_eq!(response.header().rcode(), Rcode::NXDOMAIN);
        assert_eq!(response.records(Section::Authority).len(), 1);
        assert_eq!(response.records(Section::Authority)[0].rtype(), RrType::SOA);
    }

    #[test]
    fn transfer_order_starts_with_soa() {
        let zone = test_zone();
        let records = zone.records();
        assert_eq!(records[0].rtype(), RrType::SOA);
        assert!(records[1..].iter().all(|r| r.rtype() != RrType::SOA));

        // An AXFR result closed by the repeated SOA reconstructs the zone.
        let mut transferred = records.clone();
        transferred.push(records[0].clone());
        let rebuilt = Zone::from_axfr(transferred).unwrap();
        assert_eq!(rebuilt.serial(), 100);
        assert_eq!(rebuilt.records().len(), records.len());
    }
}
