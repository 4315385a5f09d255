//! DNS messages: the 12-byte header and the four record sections, with
//! size-bounded rendering that never splits an RRset across a truncation
//! boundary, and TSIG retrofit at render time.

use std::fmt;

use bytes::Bytes;
use rand::Rng;

use crate::edns::OptRecord;
use crate::error::{error, Result};
use crate::name::Compression;
use crate::rdata::Rdata;
use crate::rr::{Record, RrType};
use crate::tsig::{TsigContext, VerifyState};
use crate::wire::{WireReader, WireWriter};

pub const HEADER_LENGTH: usize = 12;

/// Standard answer size ceiling without EDNS.
pub const MAX_UDP_PAYLOAD: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Question,
        Section::Answer,
        Section::Authority,
        Section::Additional,
    ];

    fn index(self) -> usize {
        match self {
            Section::Question => 0,
            Section::Answer => 1,
            Section::Authority => 2,
            Section::Additional => 3,
        }
    }
}

/// Single-bit header flags, named by their RFC 1035/2535 mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Qr,
    Aa,
    Tc,
    Rd,
    Ra,
    Ad,
    Cd,
}

impl Flag {
    fn mask(self) -> u16 {
        match self {
            Flag::Qr => 0x8000,
            Flag::Aa => 0x0400,
            Flag::Tc => 0x0200,
            Flag::Rd => 0x0100,
            Flag::Ra => 0x0080,
            Flag::Ad => 0x0020,
            Flag::Cd => 0x0010,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u8);

impl Opcode {
    pub const QUERY: Opcode = Opcode(0);
    pub const IQUERY: Opcode = Opcode(1);
    pub const STATUS: Opcode = Opcode(2);
    pub const NOTIFY: Opcode = Opcode(4);
    pub const UPDATE: Opcode = Opcode(5);

    pub fn mnemonic(self) -> String {
        match self.0 {
            0 => "QUERY".into(),
            1 => "IQUERY".into(),
            2 => "STATUS".into(),
            4 => "NOTIFY".into(),
            5 => "UPDATE".into(),
            v => format!("OPCODE{}", v),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Response codes, including the extended-rcode range reachable only
/// through EDNS and the TSIG error space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rcode(pub u16);

impl Rcode {
    pub const NOERROR: Rcode = Rcode(0);
    pub const FORMERR: Rcode = Rcode(1);
    pub const SERVFAIL: Rcode = Rcode(2);
    pub const NXDOMAIN: Rcode = Rcode(3);
    pub const NOTIMP: Rcode = Rcode(4);
    pub const REFUSED: Rcode = Rcode(5);
    pub const YXDOMAIN: Rcode = Rcode(6);
    pub const YXRRSET: Rcode = Rcode(7);
    pub const NXRRSET: Rcode = Rcode(8);
    pub const NOTAUTH: Rcode = Rcode(9);
    pub const NOTZONE: Rcode = Rcode(10);
    pub const BADVERS: Rcode = Rcode(16);
    pub const BADSIG: Rcode = Rcode(16);
    pub const BADKEY: Rcode = Rcode(17);
    pub const BADTIME: Rcode = Rcode(18);

    pub fn mnemonic(self) -> String {
        match self.0 {
            0 => "NOERROR".into(),
            1 => "FORMERR".into(),
            2 => "SERVFAIL".into(),
            3 => "NXDOMAIN".into(),
            4 => "NOTIMP".into(),
            5 => "REFUSED".into(),
            6 => "YXDOMAIN".into(),
            7 => "YXRRSET".into(),
            8 => "NXRRSET".into(),
            9 => "NOTAUTH".into(),
            10 => "NOTZONE".into(),
            16 => "BADVERS".into(),
            17 => "BADKEY".into(),
            18 => "BADTIME".into(),
            v => format!("RCODE{}", v),
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    id: u16,
    flags: u16,
    counts: [u16; 4],
}

impl Header {
    /// A fresh header with a random id, per the eager-id policy.
    pub fn new() -> Header {
        Header {
            id: rand::thread_rng().gen(),
            flags: 0,
            counts: [0; 4],
        }
    }

    pub fn with_id(id: u16) -> Header {
        Header {
            id,
            flags: 0,
            counts: [0; 4],
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn set_id(&mut self, id: u16) {
        self.id = id;
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.flags |= flag.mask();
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.flags &= !flag.mask();
    }

    pub fn opcode(&self) -> Opcode {
        Opcode((self.flags >> 11 & 0xf) as u8)
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.flags = self.flags & !0x7800 | (opcode.0 as u16 & 0xf) << 11;
    }

    /// The 4-bit header rcode; [`Message::rcode`] folds in the extended
    /// bits from OPT.
    pub fn rcode(&self) -> Rcode {
        Rcode(self.flags & 0xf)
    }

    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.flags = self.flags & !0xf | rcode.0 & 0xf;
    }

    pub fn count(&self, section: Section) -> u16 {
        self.counts[section.index()]
    }

    pub fn set_count(&mut self, section: Section, count: u16) {
        self.counts[section.index()] = count;
    }

    pub fn to_wire(&self, w: &mut WireWriter) {
        w.write_u16(self.id);
        w.write_u16(self.flags);
        for c in self.counts {
            w.write_u16(c);
        }
    }

    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Header> {
        let id = r.read_u16()?;
        let flags = r.read_u16()?;
        let mut counts = [0u16; 4];
        for c in counts.iter_mut() {
            *c = r.read_u16()?;
        }
        Ok(Header { id, flags, counts })
    }
}

impl Default for Header {
    fn default() -> Self {
        Header::new()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            ";; ->>HEADER<<- opcode: {}, status: {}, id: {}",
            self.opcode(),
            self.rcode(),
            self.id
        )?;
        write!(f, "\n;; flags:")?;
        for (flag, label) in [
            (Flag::Qr, "qr"),
            (Flag::Aa, "aa"),
            (Flag::Tc, "tc"),
            (Flag::Rd, "rd"),
            (Flag::Ra, "ra"),
            (Flag::Ad, "ad"),
            (Flag::Cd, "cd"),
        ] {
            if self.flag(flag) {
                write!(f, " {}", label)?;
            }
        }
        write!(
            f,
            "; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.counts[0], self.counts[1], self.counts[2], self.counts[3]
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    header: Header,
    sections: [Vec<Record>; 4],
    /// Offset of the first TSIG record seen while parsing, if any.
    tsig_start: Option<usize>,
    /// Offset of a SIG(0) record (a SIG covering type 0), if any.
    sig0_start: Option<usize>,
    wire_size: usize,
    tsig_context: Option<TsigContext>,
    tsig_state: VerifyState,
}

impl Message {
    pub fn new() -> Message {
        Message {
            header: Header::new(),
            ..Default::default()
        }
    }

    /// A standard query for one question, with recursion desired.
    pub fn query(question: Record) -> Message {
        let mut m = Message::new();
        m.header.set_opcode(Opcode::QUERY);
        m.header.set_flag(Flag::Rd);
        m.add_record(Section::Question, question);
        m
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn records(&self, section: Section) -> &[Record] {
        &self.sections[section.index()]
    }

    pub fn add_record(&mut self, section: Section, record: Record) {
        let idx = section.index();
        self.sections[idx].push(record);
        self.header.set_count(section, self.sections[idx].len() as u16);
    }

    pub fn clear_section(&mut self, section: Section) {
        self.sections[section.index()].clear();
        self.header.set_count(section, 0);
    }

    pub fn question(&self) -> Option<&Record> {
        self.sections[0].first()
    }

    /// The message rcode with the extended bits from an OPT record shifted
    /// in above the 4 header bits.
    pub fn rcode(&self) -> Rcode {
        let base = self.header.rcode().0;
        match self.opt() {
            Some(opt) => Rcode((opt.ext_rcode() as u16) << 4 | base),
            None => Rcode(base),
        }
    }

    pub fn opt(&self) -> Option<OptRecord> {
        self.sections[3]
            .iter()
            .find(|r| r.rtype() == RrType::OPT)
            .cloned()
            .and_then(|r| OptRecord::from_record(r).ok())
    }

    /// The transaction signature, by convention the last additional record.
    pub fn tsig(&self) -> Option<&Record> {
        self.sections[3].last().filter(|r| r.rtype() == RrType::TSIG)
    }

    pub fn tsig_start(&self) -> Option<usize> {
        self.tsig_start
    }

    pub fn sig0_start(&self) -> Option<usize> {
        self.sig0_start
    }

    /// Size of the wire form this message was parsed from.
    pub fn wire_size(&self) -> usize {
        self.wire_size
    }

    /// Arranges for the message to be signed when rendered.
    pub fn set_tsig(&mut self, context: TsigContext) {
        self.tsig_context = Some(context);
    }

    pub fn tsig_context(&self) -> Option<&TsigContext> {
        self.tsig_context.as_ref()
    }

    pub fn tsig_state(&self) -> VerifyState {
        self.tsig_state
    }

    pub fn set_tsig_state(&mut self, state: VerifyState) {
        self.tsig_state = state;
    }

    /// Decodes a message. When the TC flag is set, a parse failure in the
    /// record sections yields the records read so far instead of an error.
    pub fn from_wire(data: &[u8]) -> Result<Message> {
        let mut r = WireReader::new(data);
        let header = Header::from_wire(&mut r)?;
        let truncated = header.flags & Flag::Tc.mask() != 0;

        let mut m = Message {
            header,
            wire_size: data.len(),
            ..Default::default()
        };

        'sections: for section in Section::ALL {
            let count = m.header.count(section);
            for _ in 0..count {
                let start = r.current();
                let record = match Record::from_wire(&mut r, section == Section::Question) {
                    Ok(record) => record,
                    Err(e) if truncated => {
                        log::debug!(target: "wire", "tolerating parse failure under tc: {}", e);
                        break 'sections;
                    }
                    Err(e) => return Err(e),
                };
                if record.rtype() == RrType::TSIG && m.tsig_start.is_none() {
                    m.tsig_start = Some(start);
                }
                if let Rdata::Sig(sig) = record.rdata() {
                    if sig.type_covered == RrType(0) && m.sig0_start.is_none() {
                        m.sig0_start = Some(start);
                    }
                }
                m.sections[section.index()].push(record);
            }
        }

        // Counts reflect what was actually read, truncated or not.
        for section in Section::ALL {
            m.header
                .set_count(section, m.sections[section.index()].len() as u16);
        }
        Ok(m)
    }

    /// Renders without a length bound (TCP, or internal re-encoding).
    pub fn to_wire(&self) -> Result<Bytes> {
        self.to_wire_sized(usize::MAX)
    }

    /// Renders with at most `max` octets of output. If the sections do not
    /// fit, whole RRsets are dropped from the tail, the TC flag is set, and
    /// the counts of later sections are zeroed. A configured TSIG is
    /// computed over the output and appended afterwards.
    pub fn to_wire_sized(&self, max: usize) -> Result<Bytes> {
        let reserved = self
            .tsig_context
            .as_ref()
            .map(|ctx| ctx.key.record_length())
            .unwrap_or(0);
        if max < HEADER_LENGTH + reserved {
            return Err(error!(WireParse => "maximum length {} cannot hold a message", max));
        }
        let budget = max.saturating_sub(reserved);

        let mut w = WireWriter::new();
        let mut header = self.header.clone();
        header.to_wire(&mut w);

        let mut compression = Compression::new();
        'sections: for section in Section::ALL {
            let records = &self.sections[section.index()];
            let mut rrset_start = w.pos();
            let mut rrset_first = 0usize;
            let mut written = 0usize;
            for (i, record) in records.iter().enumerate() {
                if i == 0 || !same_set(&records[i - 1], record) {
                    rrset_start = w.pos();
                    rrset_first = i;
                }
                record.to_wire(&mut w, Some(&mut compression), section == Section::Question)?;
                if w.pos() > budget {
                    if section == Section::Question {
                        return Err(
                            error!(WireParse => "question does not fit in {} octets", max),
                        );
                    }
                    w.truncate_to(rrset_start);
                    header.set_count(section, rrset_first as u16);
                    for later in &Section::ALL[section.index() + 1..] {
                        header.set_count(*later, 0);
                    }
                    header.set_flag(Flag::Tc);
                    break 'sections;
                }
                written = i + 1;
            }
            header.set_count(section, written as u16);
        }

        // Re-emit the header with the final flags and counts.
        let mut hw = WireWriter::new();
        header.to_wire(&mut hw);
        let hb: Vec<u8> = hw.as_slice().to_vec();
        for i in (0..HEADER_LENGTH).step_by(2) {
            w.patch_u16(i, u16::from_be_bytes([hb[i], hb[i + 1]]));
        }

        if let Some(ctx) = &self.tsig_context {
            let arcount = header.count(Section::Additional) + 1;
            let tsig_record = ctx.sign(w.as_slice())?;
            tsig_record.to_wire(&mut w, None, false)?;
            w.patch_u16(10, arcount);
            if w.pos() > max {
                return Err(error!(WireParse => "signed message exceeds {} octets", max));
            }
        }

        Ok(w.freeze())
    }
}

/// True when two records belong to the same RRset.
pub fn same_set(a: &Record, b: &Record) -> bool {
    a.rrset_type() == b.rrset_type() && a.class() == b.class() && a.name() == b.name()
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for (section, label) in [
            (Section::Question, ";; QUESTION SECTION:"),
            (Section::Answer, ";; ANSWER SECTION:"),
            (Section::Authority, ";; AUTHORITY SECTION:"),
            (Section::Additional, ";; ADDITIONAL SECTION:"),
        ] {
            let records = self.records(section);
            if records.is_empty() {
                continue;
            }
            writeln!(f, "{}", label)?;
            for r in records {
                writeln!(f, "{}", r)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use crate::rr::DnsClass;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn a_record(owner: &str, addr: [u8; 4]) -> Record {
        Record::new(
            name(owner),
            RrType::A,
            DnsClass::IN,
            3600,
            Rdata::A(Ipv4Addr::from(addr)),
        )
        .unwrap()
    }

    #[test]
    fn header_fixed_bytes() {
        let mut h = Header::with_id(0xbeef);
        h.set_opcode(Opcode::QUERY);
        h.set_flag(Flag::Qr);
        h.set_flag(Flag::Aa);
        h.set_flag(Flag::Rd);
        h.set_flag(Flag::Ra);
        h.set_rcode(Rcode::NOERROR);
        h.set_count(Section::Question, 1);
        h.set_count(Section::Answer, 2);
        h.set_count(Section::Additional, 1);

        let mut w = WireWriter::new();
        h.to_wire(&mut w);
        assert_eq!(
            w.as_slice(),
            &[0xbe, 0xef, 0x85, 0x80, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01]
        );

        let wire = w.freeze();
        let mut r = WireReader::new(&wire);
        assert_eq!(Header::from_wire(&mut r).unwrap(), h);
    }

    #[test]
    fn message_round_trip_with_compression() {
        let mut m = Message::new();
        m.header_mut().set_flag(Flag::Qr);
        m.add_record(
            Section::Question,
            Record::question(name("example.com."), RrType::A, DnsClass::IN),
        );
        m.add_record(Section::Answer, a_record("example.com.", [192, 0, 2, 1]));
        m.add_record(Section::Answer, a_record("example.com.", [192, 0, 2, 2]));
        m.add_record(
            Section::Authority,
            Record::new(
                name("example.com."),
                RrType::NS,
                DnsClass::IN,
                3600,
                Rdata::Ns(name("ns1.example.com.")),
            )
            .unwrap(),
        );

        let wire = m.to_wire().unwrap();
        let parsed = Message::from_wire(&wire).unwrap();
        assert_eq!(parsed.header(), m.header());
        for section in Section::ALL {
            assert_eq!(parsed.records(section), m.records(section));
        }

        // The second copy of "example.com." must be a bare pointer to the
        // question name at offset 12.
        let answer_start = HEADER_LENGTH + name("example.com.").wire_length() + 4;
        assert_eq!(&wire[answer_start..answer_start + 2], &[0xc0, 0x0c]);

        // Recompressing what we parsed cannot grow the message.
        let rewire = parsed.to_wire().unwrap();
        assert!(rewire.len() <= wire.len());
    }

    #[test]
    fn names_compress_across_sections() {
        let mut m = Message::new();
        m.add_record(Section::Answer, a_record("ns1.example.com.", [192, 0, 2, 1]));
        m.add_record(Section::Authority, a_record("ns2.example.com.", [192, 0, 2, 2]));
        let wire = m.to_wire().unwrap();

        // First owner is at offset 12; its "example.com." suffix at 16.
        let second_owner = HEADER_LENGTH + name("ns1.example.com.").wire_length() + 14;
        assert_eq!(
            &wire[second_owner..second_owner + 6],
            &[3, b'n', b's', b'2', 0xc0, 16]
        );
    }

    #[test]
    fn truncation_drops_whole_rrsets() {
        let mut m = Message::new();
        m.add_record(
            Section::Question,
            Record::question(name("example.com."), RrType::A, DnsClass::IN),
        );
        for i in 0..10 {
            let mut rec = a_record("example.com.", [192, 0, 2, i]);
            rec.set_ttl(3600);
            m.add_record(Section::Answer, rec);
        }

        let wire = m.to_wire_sized(100).unwrap();
        assert!(wire.len() <= 100);
        let parsed = Message::from_wire(&wire).unwrap();
        assert!(parsed.header().flag(Flag::Tc));
        assert_eq!(parsed.header().count(Section::Answer), 0);
        assert_eq!(parsed.records(Section::Answer).len(), 0);
        assert_eq!(parsed.header().count(Section::Question), 1);
    }

    #[test]
    fn truncation_keeps_leading_rrsets() {
        let mut m = Message::new();
        m.add_record(
            Section::Question,
            Record::question(name("example.com."), RrType::A, DnsClass::IN),
        );
        m.add_record(Section::Answer, a_record("example.com.", [192, 0, 2, 1]));
        for i in 0..10 {
            m.add_record(Section::Answer, a_record("big.example.com.", [10, 0, 0, i]));
        }

        // Enough room for the question and the first (single-record) set.
        let wire = m.to_wire_sized(70).unwrap();
        let parsed = Message::from_wire(&wire).unwrap();
        assert!(parsed.header().flag(Flag::Tc));
        assert_eq!(parsed.records(Section::Answer).len(), 1);
        assert_eq!(parsed.records(Section::Answer)[0], m.records(Section::Answer)[0]);
    }

    #[test]
    fn question_too_big_is_an_error() {
        let mut m = Message::new();
        m.add_record(
            Section::Question,
            Record::question(name("a-rather-long-owner.example.com."), RrType::A, DnsClass::IN),
        );
        assert!(m.to_wire_sized(20).is_err());
    }

    #[test]
    fn extended_rcode_folds_in() {
        let mut m = Message::new();
        m.header_mut().set_rcode(Rcode(5));
        assert_eq!(m.rcode(), Rcode::REFUSED);

        let opt = crate::edns::OptRecord::new(4096, 1, 0, 0, Vec::new());
        m.add_record(Section::Additional, opt.into_record());
        assert_eq!(m.rcode(), Rcode(0x15));
    }

    #[test]
    fn clone_is_deep_for_sections() {
        let mut m = Message::new();
        m.add_record(Section::Answer, a_record("example.com.", [192, 0, 2, 1]));
        let mut copy = m.clone();
        copy.add_record(Section::Answer, a_record("example.com.", [192, 0, 2, 2]));
        assert_eq!(m.records(Section::Answer).len(), 1);
        assert_eq!(copy.records(Section::Answer).len(), 2);
    }
}
