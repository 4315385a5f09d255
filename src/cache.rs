//! A credibility-ranked record cache with negative caching and lazy
//! expiry. This is the one structure in the crate designed for sharing:
//! every operation takes `&self` and serializes on a single coarse lock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::lookup::{Credibility, SetResponse};
use crate::message::{Flag, Message, Rcode, Section};
use crate::name::Name;
use crate::rdata::Rdata;
use crate::rr::{Record, RrType, MAX_TTL};
use crate::rrset::Rrset;

/// Marker type for a cached proof that a whole name is absent.
const NXDOMAIN_TYPE: RrType = RrType(0);

#[derive(Debug, Clone)]
enum ElementData {
    Positive(Rrset),
    Negative(RrType),
}

#[derive(Debug, Clone)]
struct Element {
    data: ElementData,
    credibility: Credibility,
    expires: Instant,
}

impl Element {
    fn rtype(&self) -> RrType {
        match &self.data {
            ElementData::Positive(set) => set.rtype(),
            ElementData::Negative(rtype) => *rtype,
        }
    }

    fn expired(&self, now: Instant) -> bool {
        now >= self.expires
    }

    fn positive(&self) -> Option<&Rrset> {
        match &self.data {
            ElementData::Positive(set) => Some(set),
            ElementData::Negative(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Cache {
    inner: Mutex<HashMap<Name, Vec<Element>>>,
    max_cache_ttl: u32,
    max_ncache_ttl: u32,
}

impl Default for Cache {
    fn default() -> Self {
        Cache::new()
    }
}

impl Cache {
    pub fn new() -> Cache {
        Cache {
            inner: Mutex::new(HashMap::new()),
            max_cache_ttl: MAX_TTL,
            max_ncache_ttl: 3600,
        }
    }

    /// Caps the effective TTL of positive entries.
    pub fn set_max_cache_ttl(&mut self, seconds: u32) {
        self.max_cache_ttl = seconds;
    }

    /// Caps how long negative answers are retained.
    pub fn set_max_ncache_ttl(&mut self, seconds: u32) {
        self.max_ncache_ttl = seconds;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// Inserts an RRset. Equal or higher credibility replaces an existing
    /// entry for the same (name, type); lower credibility is ignored.
    pub fn add_rrset(&self, set: Rrset, credibility: Credibility) {
        let ttl = set.ttl().min(self.max_cache_ttl);
        let name = set.name().clone();
        let element = Element {
            data: ElementData::Positive(set),
            credibility,
            expires: Instant::now() + Duration::from_secs(ttl as u64),
        };
        self.insert(name, element);
    }

    /// Inserts a single record, merging it into an existing set of the
    /// same credibility when one is live.
    pub fn add_record(&self, record: Record, credibility: Credibility) {
        let now = Instant::now();
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(elements) = inner.get_mut(record.name()) {
                if let Some(element) = elements
                    .iter_mut()
                    .find(|e| e.rtype() == record.rrset_type() && !e.expired(now))
                {
                    if element.credibility == credibility {
                        if let ElementData::Positive(set) = &mut element.data {
                            let _ = set.add(record);
                            return;
                        }
                    }
                }
            }
        }
        self.add_rrset(Rrset::new(record), credibility);
    }

    /// Caches a proof of absence: `NXDOMAIN_TYPE` (0) for the whole name,
    /// any other type for an empty set. The TTL comes from the SOA minimum
    /// bounded by its own TTL and the configured cap.
    pub fn add_negative(
        &self,
        name: Name,
        rtype: RrType,
        soa: Option<&Record>,
        credibility: Credibility,
    ) {
        let ttl = match soa {
            Some(record) => match record.rdata() {
                Rdata::Soa(soa) => soa.minimum.min(record.ttl()),
                _ => 0,
            },
            None => 0,
        }
        .min(self.max_ncache_ttl);
        let element = Element {
            data: ElementData::Negative(rtype),
            credibility,
            expires: Instant::now() + Duration::from_secs(ttl as u64),
        };
        self.insert(name, element);
    }

    fn insert(&self, name: Name, element: Element) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        let elements = inner.entry(name).or_default();
        match elements
            .iter_mut()
            .find(|e| e.rtype() == element.rtype())
        {
            Some(existing) => {
                if element.credibility >= existing.credibility || existing.expired(now) {
                    *existing = element;
                }
            }
            None => elements.push(element),
        }
    }

    /// The shared lookup walk over cached data, materialized only from
    /// entries at or above `min_credibility`. Expired entries are treated
    /// as absent and purged as they are encountered.
    pub fn lookup(
        &self,
        name: &Name,
        rtype: RrType,
        min_credibility: Credibility,
    ) -> SetResponse {
        if !name.is_absolute() {
            return SetResponse::Unknown;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        let labels = name.label_count();

        for tlabels in 0..=labels {
            let is_exact = tlabels == labels;
            let tname = name.suffix(tlabels);
            let Some(elements) = inner.get_mut(&tname) else {
                continue;
            };
            elements.retain(|e| !e.expired(now));
            if elements.is_empty() {
                inner.remove(&tname);
                continue;
            }
            let visible =
                |e: &&Element| e.credibility >= min_credibility;

            if !is_exact {
                if let Some(dname) = elements
                    .iter()
                    .filter(visible)
                    .find(|e| e.rtype() == RrType::DNAME)
                    .and_then(|e| e.positive())
                {
                    return SetResponse::Dname(dname.records()[0].clone());
                }
                if let Some(ns) = elements
                    .iter()
                    .filter(visible)
                    .find(|e| e.rtype() == RrType::NS)
                    .and_then(|e| e.positive())
                {
                    return SetResponse::Delegation(ns.clone());
                }
                continue;
            }

            // Exact node. A cached NXDOMAIN covers every type.
            if let Some(e) = elements
                .iter()
                .filter(visible)
                .find(|e| e.rtype() == NXDOMAIN_TYPE)
            {
                if matches!(e.data, ElementData::Negative(_)) {
                    return SetResponse::Nxdomain;
                }
            }
            if rtype == RrType::ANY {
                let sets: Vec<Rrset> = elements
                    .iter()
                    .filter(visible)
                    .filter_map(|e| e.positive())
                    .cloned()
                    .collect();
                if !sets.is_empty() {
                    return SetResponse::Successful(sets);
                }
                return SetResponse::Unknown;
            }
            if let Some(e) = elements.iter().filter(visible).find(|e| e.rtype() == rtype) {
                return match &e.data {
                    ElementData::Positive(set) => SetResponse::Successful(vec![set.clone()]),
                    ElementData::Negative(_) => SetResponse::Nxrrset(name.clone()),
                };
            }
            if rtype != RrType::CNAME {
                if let Some(cname) = elements
                    .iter()
                    .filter(visible)
                    .find(|e| e.rtype() == RrType::CNAME)
                    .and_then(|e| e.positive())
                {
                    return SetResponse::Cname(cname.records()[0].clone());
                }
            }
            return SetResponse::Unknown;
        }
        SetResponse::Unknown
    }

    /// Ingests a response message, ranking each section by the AA flag and
    /// recording negative answers from the authority SOA.
    pub fn add_message(&self, msg: &Message) {
        let Some(question) = msg.question() else {
            return;
        };
        let qname = question.name().clone();
        let qtype = question.rtype();
        let aa = msg.header().flag(Flag::Aa);
        let (answer_cred, auth_cred) = if aa {
            (Credibility::AUTH_ANSWER, Credibility::AUTH_AUTHORITY)
        } else {
            (Credibility::NONAUTH_ANSWER, Credibility::NONAUTH_AUTHORITY)
        };

        let mut answered = false;
        for record in msg.records(Section::Answer) {
            if record.rtype().is_meta() {
                continue;
            }
            if record.rrset_type() == qtype || record.rtype() == RrType::CNAME {
                answered = true;
            }
            self.add_record(record.clone(), answer_cred);
        }
        for record in msg.records(Section::Authority) {
            if matches!(record.rtype(), RrType::NS) {
                self.add_record(record.clone(), auth_cred);
            }
        }
        for record in msg.records(Section::Additional) {
            if matches!(record.rtype(), RrType::A | RrType::AAAA) {
                self.add_record(record.clone(), Credibility::ADDITIONAL);
            }
        }

        let soa = msg
            .records(Section::Authority)
            .iter()
            .find(|r| r.rtype() == RrType::SOA);
        if msg.rcode() == Rcode::NXDOMAIN {
            self.add_negative(qname, NXDOMAIN_TYPE, soa, auth_cred);
        } else if msg.rcode() == Rcode::NOERROR && !answered {
            self.add_negative(qname, qtype, soa, auth_cred);
        }
        log::trace!(target: "cache", "ingested response for {} {}", question.name(), qtype);
    }

    /// Drops the entry for (name, type).
    pub fn flush_set(&self, name: &Name, rtype: RrType) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(elements) = inner.get_mut(name) {
            elements.retain(|e| e.rtype() != rtype);
            if elements.is_empty() {
                inner.remove(name);
            }
        }
    }

    /// Drops every entry at `name`.
    pub fn flush_name(&self, name: &Name) {
        self.inner.lock().unwrap().remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn a_set(owner: &str, ttl: u32, addr: [u8; 4]) -> Rrset {
        Rrset::new(
            Record::new(
                name(owner),
                RrType::A,
                crate::rr::DnsClass::IN,
                ttl,
                Rdata::A(Ipv4Addr::from(addr)),
            )
            .unwrap(),
        )
    }

    fn soa_record(owner: &str, minimum: u32) -> Record {
        format!(
            "{} 3600 IN SOA ns1.{} admin.{} 1 2 3 4 {}",
            owner, owner, owner, minimum
        )
        .parse()
        .unwrap()
    }

    #[test]
    fn lower_credibility_does_not_replace() {
        let cache = Cache::new();
        let good = a_set("www.example.com.", 3600, [192, 0, 2, 1]);
        let worse = a_set("www.example.com.", 3600, [10, 0, 0, 1]);

        cache.add_rrset(good.clone(), Credibility::AUTH_ANSWER);
        cache.add_rrset(worse, Credibility::ADDITIONAL);

        match cache.lookup(&name("www.example.com."), RrType::A, Credibility::ADDITIONAL) {
            SetResponse::Successful(sets) => assert_eq!(sets[0], good),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn equal_credibility_replaces() {
        let cache = Cache::new();
        let first = a_set("www.example.com.", 3600, [192, 0, 2, 1]);
        let second = a_set("www.example.com.", 3600, [192, 0, 2, 2]);
        cache.add_rrset(first, Credibility::AUTH_ANSWER);
        cache.add_rrset(second.clone(), Credibility::AUTH_ANSWER);
        match cache.lookup(&name("www.example.com."), RrType::A, Credibility::HINT) {
            SetResponse::Successful(sets) => assert_eq!(sets[0], second),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn min_credibility_filters() {
        let cache = Cache::new();
        cache.add_rrset(
            a_set("glue.example.com.", 3600, [192, 0, 2, 1]),
            Credibility::GLUE,
        );
        assert_eq!(
            cache.lookup(&name("glue.example.com."), RrType::A, Credibility::AUTH_ANSWER),
            SetResponse::Unknown
        );
        assert!(cache
            .lookup(&name("glue.example.com."), RrType::A, Credibility::GLUE)
            .is_successful());
    }

    #[test]
    fn expired_entries_vanish() {
        let cache = Cache::new();
        cache.add_rrset(a_set("dead.example.com.", 0, [192, 0, 2, 1]), Credibility::ZONE);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            cache.lookup(&name("dead.example.com."), RrType::A, Credibility::HINT),
            SetResponse::Unknown
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn negative_answers() {
        let cache = Cache::new();
        let soa = soa_record("example.com.", 300);
        cache.add_negative(
            name("gone.example.com."),
            NXDOMAIN_TYPE,
            Some(&soa),
            Credibility::AUTH_AUTHORITY,
        );
        cache.add_negative(
            name("www.example.com."),
            RrType::MX,
            Some(&soa),
            Credibility::AUTH_AUTHORITY,
        );

        assert_eq!(
            cache.lookup(&name("gone.example.com."), RrType::A, Credibility::HINT),
            SetResponse::Nxdomain
        );
        assert_eq!(
            cache.lookup(&name("www.example.com."), RrType::MX, Credibility::HINT),
            SetResponse::Nxrrset(name("www.example.com."))
        );
        // Other types at the NXRRSET name remain unknown.
        assert_eq!(
            cache.lookup(&name("www.example.com."), RrType::A, Credibility::HINT),
            SetResponse::Unknown
        );
    }

    #[test]
    fn delegation_from_an_ancestor() {
        let cache = Cache::new();
        let ns: Record = "sub.example.com. 3600 IN NS ns1.sub.example.com."
            .parse()
            .unwrap();
        cache.add_rrset(Rrset::new(ns), Credibility::AUTH_AUTHORITY);
        match cache.lookup(&name("deep.sub.example.com."), RrType::A, Credibility::HINT) {
            SetResponse::Delegation(set) => assert_eq!(set.name(), &name("sub.example.com.")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn message_ingestion_caches_negatives() {
        use crate::message::Message;

        let cache = Cache::new();
        let mut msg = Message::new();
        msg.header_mut().set_flag(Flag::Qr);
        msg.header_mut().set_flag(Flag::Aa);
        msg.header_mut().set_rcode(Rcode::NXDOMAIN);
        msg.add_record(
            Section::Question,
            Record::question(name("nope.example.com."), RrType::A, crate::rr::DnsClass::IN),
        );
        msg.add_record(Section::Authority, soa_record("example.com.", 600));
        cache.add_message(&msg);

        assert_eq!(
            cache.lookup(&name("nope.example.com."), RrType::A, Credibility::HINT),
            SetResponse::Nxdomain
        );
    }

    #[test]
    fn shared_across_threads() {
        let cache = std::sync::Arc::new(Cache::new());
        let mut handles = Vec::new();
        for i in 0..4u8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                let owner = format!("t{}.example.com.", i);
                cache.add_rrset(a_set(&owner, 3600, [10, 0, 0, i]), Credibility::ZONE);
                cache.lookup(&name(&owner), RrType::A, Credibility::HINT)
            }));
        }
        for h in handles {
            assert!(h.join().unwrap().is_successful());
        }
    }
}
