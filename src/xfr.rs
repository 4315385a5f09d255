//! Incremental and full zone transfer client (RFC 1995/5936): a framed-TCP
//! state machine with TSIG stream verification and automatic IXFR-to-AXFR
//! fallback.

use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::error::{error, ErrorKind, Result};
use crate::message::{Message, Opcode, Rcode, Section};
use crate::name::Name;
use crate::rdata::{Rdata, Soa};
use crate::resolver::{read_frame, write_frame, MAX_TCP_MESSAGE};
use crate::rr::{serial, DnsClass, Record, RrType};
use crate::tsig::{StreamVerifier, TsigContext, TsigKey, VerifyState};

/// Wall-clock budget for a whole transfer unless overridden.
pub const DEFAULT_XFR_TIMEOUT: Duration = Duration::from_secs(900);

/// One IXFR change set: everything deleted going from `start_serial`,
/// everything added arriving at `end_serial`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub start_serial: u32,
    pub end_serial: u32,
    pub deletes: Vec<Record>,
    pub adds: Vec<Record>,
}

/// What a completed transfer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XfrResult {
    /// The zone at the server is not newer than the serial we hold.
    UpToDate,
    /// Full zone contents, bracketed by two identical SOAs.
    Axfr(Vec<Record>),
    /// Ordered deltas with monotonically increasing serials.
    Ixfr(Vec<Delta>),
}

impl XfrResult {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, XfrResult::UpToDate)
    }
}

/// Streaming callbacks invoked in wire order as the transfer progresses.
pub trait XfrHandler {
    fn start_axfr(&mut self) -> Result<()>;
    fn start_ixfr(&mut self) -> Result<()>;
    fn start_ixfr_deletes(&mut self, soa: &Record) -> Result<()>;
    fn start_ixfr_adds(&mut self, soa: &Record) -> Result<()>;
    fn handle_record(&mut self, record: &Record) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Axfr,
    IxfrDeletes,
    IxfrAdds,
}

/// The default handler: accumulates an AXFR list or an IXFR delta
/// sequence.
#[derive(Debug)]
pub struct BasicHandler {
    axfr: Vec<Record>,
    ixfr: Vec<Delta>,
    mode: Mode,
}

impl Default for BasicHandler {
    fn default() -> Self {
        BasicHandler {
            axfr: Vec::new(),
            ixfr: Vec::new(),
            mode: Mode::Idle,
        }
    }
}

impl XfrHandler for BasicHandler {
    fn start_axfr(&mut self) -> Result<()> {
        self.mode = Mode::Axfr;
        Ok(())
    }

    fn start_ixfr(&mut self) -> Result<()> {
        self.mode = Mode::Idle;
        Ok(())
    }

    fn start_ixfr_deletes(&mut self, soa: &Record) -> Result<()> {
        self.ixfr.push(Delta {
            start_serial: soa_serial(soa)?,
            ..Default::default()
        });
        self.mode = Mode::IxfrDeletes;
        Ok(())
    }

    fn start_ixfr_adds(&mut self, soa: &Record) -> Result<()> {
        let delta = self
            .ixfr
            .last_mut()
            .ok_or_else(|| error!(ZoneTransfer => "adds before any delta"))?;
        delta.end_serial = soa_serial(soa)?;
        self.mode = Mode::IxfrAdds;
        Ok(())
    }

    fn handle_record(&mut self, record: &Record) -> Result<()> {
        match self.mode {
            Mode::Axfr => self.axfr.push(record.clone()),
            Mode::IxfrDeletes => self
                .ixfr
                .last_mut()
                .expect("deletes started")
                .deletes
                .push(record.clone()),
            Mode::IxfrAdds => self
                .ixfr
                .last_mut()
                .expect("adds started")
                .adds
                .push(record.clone()),
            Mode::Idle => {
                return Err(error!(ZoneTransfer => "record {} outside any section", record))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InitialSoa,
    FirstData,
    IxfrDelSoa,
    IxfrDel,
    IxfrAddSoa,
    IxfrAdd,
    Axfr,
    End,
}

pub struct ZoneTransfer {
    zone: Name,
    dclass: DnsClass,
    qtype: RrType,
    ixfr_serial: u32,
    want_fallback: bool,
    address: SocketAddr,
    timeout: Duration,
    key: Option<TsigKey>,

    state: State,
    end_serial: u32,
    current_serial: u32,
    initial_soa: Option<Record>,
    result_type: RrType,
    up_to_date: bool,
    fallback_now: bool,
}

impl ZoneTransfer {
    fn new(zone: Name, qtype: RrType, ixfr_serial: u32, address: SocketAddr) -> ZoneTransfer {
        ZoneTransfer {
            zone,
            dclass: DnsClass::IN,
            qtype,
            ixfr_serial,
            want_fallback: false,
            address,
            timeout: DEFAULT_XFR_TIMEOUT,
            key: None,
            state: State::InitialSoa,
            end_serial: 0,
            current_serial: 0,
            initial_soa: None,
            result_type: qtype,
            up_to_date: false,
            fallback_now: false,
        }
    }

    /// A full transfer of `zone` from `address`.
    pub fn new_axfr(zone: Name, address: SocketAddr) -> ZoneTransfer {
        ZoneTransfer::new(zone, RrType::AXFR, 0, address)
    }

    /// An incremental transfer of everything since `serial`. With
    /// `fallback`, a server that cannot do IXFR is retried with AXFR.
    pub fn new_ixfr(
        zone: Name,
        serial: u32,
        fallback: bool,
        address: SocketAddr,
    ) -> ZoneTransfer {
        let mut xfr = ZoneTransfer::new(zone, RrType::IXFR, serial, address);
        xfr.want_fallback = fallback;
        xfr
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_class(&mut self, dclass: DnsClass) {
        self.dclass = dclass;
    }

    pub fn set_key(&mut self, key: TsigKey) {
        self.key = Some(key);
    }

    /// The style of answer the server actually gave, AXFR or IXFR; an
    /// AXFR-style response to an IXFR request reports AXFR.
    pub fn result_type(&self) -> RrType {
        self.result_type
    }

    /// Runs the transfer into the default accumulating handler.
    pub fn run(&mut self) -> Result<XfrResult> {
        let mut handler = BasicHandler::default();
        self.run_with(&mut handler)?;
        Ok(if self.up_to_date {
            XfrResult::UpToDate
        } else if self.result_type == RrType::IXFR {
            XfrResult::Ixfr(handler.ixfr)
        } else {
            XfrResult::Axfr(handler.axfr)
        })
    }

    /// Runs the transfer, streaming records into `handler`.
    pub fn run_with(&mut self, handler: &mut dyn XfrHandler) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        match self.try_run(handler, deadline) {
            Err(e)
                if self.fallback_now && self.want_fallback && self.qtype == RrType::IXFR =>
            {
                log::info!(target: "xfr", "falling back to AXFR for {}: {}", self.zone, e);
                self.qtype = RrType::AXFR;
                self.try_run(handler, deadline)
            }
            r => r,
        }
    }

    fn reset(&mut self) {
        self.state = State::InitialSoa;
        self.end_serial = 0;
        self.current_serial = 0;
        self.initial_soa = None;
        self.result_type = self.qtype;
        self.up_to_date = false;
        self.fallback_now = false;
    }

    fn remaining(&self, deadline: Instant) -> Result<Duration> {
        deadline
            .checked_duration_since(Instant::now())
            .ok_or_else(|| error!(Timeout => "zone transfer of {} timed out", self.zone))
    }

    fn build_query(&self) -> Result<Message> {
        let mut query = Message::new();
        query.header_mut().set_opcode(Opcode::QUERY);
        query.add_record(
            Section::Question,
            Record::question(self.zone.clone(), self.qtype, self.dclass),
        );
        if self.qtype == RrType::IXFR {
            // Skeleton SOA carrying the serial we already hold.
            let soa = Record::new(
                self.zone.clone(),
                RrType::SOA,
                self.dclass,
                0,
                Rdata::Soa(Soa {
                    mname: Name::root(),
                    rname: Name::root(),
                    serial: self.ixfr_serial,
                    refresh: 0,
                    retry: 0,
                    expire: 0,
                    minimum: 0,
                }),
            )?;
            query.add_record(Section::Authority, soa);
        }
        Ok(query)
    }

    /// One connection lifecycle: connect, query, consume messages until the
    /// terminating SOA. The socket is released on every exit path when the
    /// stream drops.
    fn try_run(&mut self, handler: &mut dyn XfrHandler, deadline: Instant) -> Result<()> {
        self.reset();
        log::debug!(target: "xfr", "requesting {} of {} from {}", self.qtype, self.zone, self.address);

        let stream = TcpStream::connect_timeout(&self.address, self.remaining(deadline)?)?;

        let mut query = self.build_query()?;
        if let Some(key) = &self.key {
            query.set_tsig(TsigContext::new(key.clone()));
        }
        let wire = query.to_wire_sized(MAX_TCP_MESSAGE)?;
        let id = u16::from_be_bytes([wire[0], wire[1]]);

        let mut verifier = match &self.key {
            Some(key) => {
                let sent = Message::from_wire(&wire)?;
                let mac = sent.tsig().and_then(|r| match r.rdata() {
                    Rdata::Tsig(rd) => Some(rd.mac.clone()),
                    _ => None,
                });
                Some(StreamVerifier::new(key.clone(), mac.as_deref()))
            }
            None => None,
        };

        write_frame(&stream, &wire, deadline)?;

        let mut last_state = VerifyState::Unsigned;
        while self.state != State::End {
            // A mid-stream close is a transfer failure, not plain I/O.
            let bytes = read_frame(&stream, deadline).map_err(|e| match e.kind {
                ErrorKind::Timeout => e,
                _ => error!(ZoneTransfer => "connection lost mid-transfer: {}", e),
            })?;
            let msg = Message::from_wire(&bytes)?;
            if msg.header().id() != id {
                return Err(
                    error!(ZoneTransfer => "response id {} does not match query {}", msg.header().id(), id),
                );
            }
            if let Some(v) = &mut verifier {
                last_state = v.verify(&msg, &bytes);
                if last_state == VerifyState::Failed {
                    return Err(error!(TsigVerify => "stream verification failed"));
                }
            }

            let rcode = msg.rcode();
            if rcode != Rcode::NOERROR {
                if rcode == Rcode::NOTIMP && self.qtype == RrType::IXFR {
                    self.fallback_now = true;
                    return Err(error!(ZoneTransfer => "server doesn't support IXFR"));
                }
                return Err(error!(ZoneTransfer => "server returned {}", rcode));
            }

            let answers = msg.records(Section::Answer);
            if self.state == State::InitialSoa && self.qtype == RrType::IXFR && answers.is_empty()
            {
                self.fallback_now = true;
                return Err(error!(ZoneTransfer => "empty IXFR response"));
            }
            for record in answers {
                self.parse_rr(record, handler)?;
            }
        }

        if verifier.is_some() && last_state != VerifyState::Verified {
            return Err(error!(TsigVerify => "final transfer message is not signed"));
        }
        Ok(())
    }

    /// Feeds one answer record through the state machine. Transitions that
    /// re-process the current record loop instead of recursing.
    fn parse_rr(&mut self, record: &Record, handler: &mut dyn XfrHandler) -> Result<()> {
        loop {
            match self.state {
                State::InitialSoa => {
                    let serial = soa_serial(record).map_err(
                        |_| error!(ZoneTransfer => "transfer does not begin with an SOA"),
                    )?;
                    self.end_serial = serial;
                    if self.qtype == RrType::IXFR && !serial::gt(serial, self.ixfr_serial) {
                        log::info!(target: "xfr", "zone {} is up to date at serial {}", self.zone, self.ixfr_serial);
                        self.up_to_date = true;
                        self.state = State::End;
                        return Ok(());
                    }
                    self.initial_soa = Some(record.clone());
                    self.state = State::FirstData;
                    return Ok(());
                }
                State::FirstData => {
                    if self.qtype == RrType::IXFR
                        && record.rtype() == RrType::SOA
                        && soa_serial(record)? == self.ixfr_serial
                    {
                        self.result_type = RrType::IXFR;
                        log::debug!(target: "xfr", "got incremental response for {}", self.zone);
                        handler.start_ixfr()?;
                        self.state = State::IxfrDelSoa;
                        continue;
                    }
                    // Non-incremental answer, even when IXFR was asked.
                    self.result_type = RrType::AXFR;
                    log::debug!(target: "xfr", "got nonincremental response for {}", self.zone);
                    handler.start_axfr()?;
                    let initial = self.initial_soa.clone().expect("set in INITIALSOA");
                    handler.handle_record(&initial)?;
                    self.state = State::Axfr;
                    continue;
                }
                State::IxfrDelSoa => {
                    self.current_serial = soa_serial(record)?;
                    handler.start_ixfr_deletes(record)?;
                    self.state = State::IxfrDel;
                    return Ok(());
                }
                State::IxfrDel => {
                    if record.rtype() == RrType::SOA {
                        self.current_serial = soa_serial(record)?;
                        self.state = State::IxfrAddSoa;
                        continue;
                    }
                    handler.handle_record(record)?;
                    return Ok(());
                }
                State::IxfrAddSoa => {
                    handler.start_ixfr_adds(record)?;
                    self.state = State::IxfrAdd;
                    return Ok(());
                }
                State::IxfrAdd => {
                    if record.rtype() == RrType::SOA {
                        let serial = soa_serial(record)?;
                        if serial == self.end_serial {
                            self.state = State::End;
                            return Ok(());
                        }
                        if serial != self.current_serial {
                            return Err(
                                error!(ZoneTransfer => "IXFR out of sync: expected serial {} or {}, got {}",
                                    self.current_serial, self.end_serial, serial),
                            );
                        }
                        self.state = State::IxfrDelSoa;
                        continue;
                    }
                    handler.handle_record(record)?;
                    return Ok(());
                }
                State::Axfr => {
                    // Old servers sent cross-class A glue on non-IN
                    // transfers.
                    if record.rtype() == RrType::A && record.class() != self.dclass {
                        log::debug!(target: "xfr", "ignoring cross-class record {}", record);
                        return Ok(());
                    }
                    handler.handle_record(record)?;
                    if record.rtype() == RrType::SOA {
                        self.state = State::End;
                    }
                    return Ok(());
                }
                State::End => {
                    return Err(error!(ZoneTransfer => "extra data after end of transfer"))
                }
            }
        }
    }
}

fn soa_serial(record: &Record) -> Result<u32> {
    match record.rdata() {
        Rdata::Soa(soa) => Ok(soa.serial),
        _ => Err(error!(ZoneTransfer => "{} record where SOA was required", record.rtype())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::message::Flag;
    use crate::tsig::StreamGenerator;
    use std::net::TcpListener;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn soa(serial: u32) -> Record {
        format!(
            "example.com. 3600 IN SOA ns1.example.com. admin.example.com. {} 7200 900 1209600 300",
            serial
        )
        .parse()
        .unwrap()
    }

    fn a(owner: &str, last: u8) -> Record {
        format!("{} 3600 IN A 192.0.2.{}", owner, last).parse().unwrap()
    }

    fn response_shell(query: &Message) -> Message {
        let mut m = Message::new();
        m.header_mut().set_id(query.header().id());
        m.header_mut().set_flag(Flag::Qr);
        m.header_mut().set_flag(Flag::Aa);
        m.add_record(Section::Question, query.question().unwrap().clone());
        m
    }

    /// Serves each incoming connection one query, answering with the wire
    /// frames `respond` produces.
    fn xfr_server<F>(respond: F) -> SocketAddr
    where
        F: Fn(&Message) -> Vec<Vec<u8>> + Send + 'static,
    {
        crate::logger::init_for_tests();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let deadline = Instant::now() + Duration::from_secs(10);
                let Ok(wire) = read_frame(&stream, deadline) else {
                    continue;
                };
                let Ok(query) = Message::from_wire(&wire) else {
                    continue;
                };
                for frame in respond(&query) {
                    if write_frame(&stream, &frame, deadline).is_err() {
                        break;
                    }
                }
            }
        });
        addr
    }

    fn frames(messages: Vec<Message>) -> Vec<Vec<u8>> {
        messages
            .into_iter()
            .map(|m| m.to_wire().unwrap().to_vec())
            .collect()
    }

    #[test]
    fn ixfr_up_to_date() {
        let addr = xfr_server(|query| {
            let mut m = response_shell(query);
            m.add_record(Section::Answer, soa(200));
            frames(vec![m])
        });

        let mut xfr = ZoneTransfer::new_ixfr(name("example.com."), 200, false, addr);
        xfr.set_timeout(Duration::from_secs(5));
        assert_eq!(xfr.run().unwrap(), XfrResult::UpToDate);
    }

    #[test]
    fn axfr_across_messages() {
        let addr = xfr_server(|query| {
            let mut first = response_shell(query);
            first.add_record(Section::Answer, soa(100));
            first.add_record(Section::Answer, "example.com. 3600 IN NS ns1.example.com.".parse().unwrap());
            let mut second = response_shell(query);
            second.add_record(Section::Answer, a("ns1.example.com.", 53));
            second.add_record(Section::Answer, soa(100));
            frames(vec![first, second])
        });

        let mut xfr = ZoneTransfer::new_axfr(name("example.com."), addr);
        xfr.set_timeout(Duration::from_secs(5));
        match xfr.run().unwrap() {
            XfrResult::Axfr(records) => {
                assert_eq!(records.len(), 4);
                assert_eq!(records.first().unwrap().rtype(), RrType::SOA);
                assert_eq!(records.last().unwrap().rtype(), RrType::SOA);
                assert_eq!(records.first(), records.last());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(xfr.result_type(), RrType::AXFR);
    }

    #[test]
    fn ixfr_delta_sequence() {
        let addr = xfr_server(|query| {
            let mut m = response_shell(query);
            for record in [
                soa(102),
                soa(100),
                a("old.example.com.", 1),
                soa(101),
                a("new.example.com.", 2),
                soa(101),
                a("older.example.com.", 3),
                soa(102),
                a("newer.example.com.", 4),
                soa(102),
            ] {
                m.add_record(Section::Answer, record);
            }
            frames(vec![m])
        });

        let mut xfr = ZoneTransfer::new_ixfr(name("example.com."), 100, false, addr);
        xfr.set_timeout(Duration::from_secs(5));
        match xfr.run().unwrap() {
            XfrResult::Ixfr(deltas) => {
                assert_eq!(deltas.len(), 2);
                assert_eq!((deltas[0].start_serial, deltas[0].end_serial), (100, 101));
                assert_eq!((deltas[1].start_serial, deltas[1].end_serial), (101, 102));
                assert_eq!(deltas[0].deletes, vec![a("old.example.com.", 1)]);
                assert_eq!(deltas[0].adds, vec![a("new.example.com.", 2)]);
                assert_eq!(deltas[1].adds, vec![a("newer.example.com.", 4)]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(xfr.result_type(), RrType::IXFR);
    }

    #[test]
    fn ixfr_answered_with_full_zone_reports_axfr() {
        let addr = xfr_server(|query| {
            let mut m = response_shell(query);
            m.add_record(Section::Answer, soa(101));
            m.add_record(
                Section::Answer,
                "example.com. 3600 IN NS ns1.example.com.".parse::<Record>().unwrap(),
            );
            m.add_record(Section::Answer, soa(101));
            frames(vec![m])
        });

        let mut xfr = ZoneTransfer::new_ixfr(name("example.com."), 50, false, addr);
        xfr.set_timeout(Duration::from_secs(5));
        match xfr.run().unwrap() {
            XfrResult::Axfr(records) => assert_eq!(records.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(xfr.result_type(), RrType::AXFR);
    }

    #[test]
    fn notimp_falls_back_to_axfr() {
        let addr = xfr_server(|query| {
            if query.question().unwrap().rtype() == RrType::IXFR {
                let mut m = response_shell(query);
                m.header_mut().set_rcode(Rcode::NOTIMP);
                frames(vec![m])
            } else {
                let mut m = response_shell(query);
                m.add_record(Section::Answer, soa(100));
                m.add_record(
                    Section::Answer,
                    "example.com. 3600 IN NS ns1.example.com.".parse::<Record>().unwrap(),
                );
                m.add_record(Section::Answer, soa(100));
                frames(vec![m])
            }
        });

        let mut xfr = ZoneTransfer::new_ixfr(name("example.com."), 100, true, addr);
        xfr.set_timeout(Duration::from_secs(5));
        match xfr.run().unwrap() {
            XfrResult::Axfr(records) => assert_eq!(records.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(xfr.result_type(), RrType::AXFR);
    }

    #[test]
    fn notimp_without_fallback_fails() {
        let addr = xfr_server(|query| {
            let mut m = response_shell(query);
            m.header_mut().set_rcode(Rcode::NOTIMP);
            frames(vec![m])
        });

        let mut xfr = ZoneTransfer::new_ixfr(name("example.com."), 100, false, addr);
        xfr.set_timeout(Duration::from_secs(5));
        let err = xfr.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZoneTransfer);
        assert_eq!(err.to_string(), "zone transfer error: server doesn't support IXFR");
    }

    #[test]
    fn ixfr_out_of_sync_fails() {
        let addr = xfr_server(|query| {
            let mut m = response_shell(query);
            for record in [soa(102), soa(100), soa(101), soa(999)] {
                m.add_record(Section::Answer, record);
            }
            frames(vec![m])
        });

        let mut xfr = ZoneTransfer::new_ixfr(name("example.com."), 100, false, addr);
        xfr.set_timeout(Duration::from_secs(5));
        let err = xfr.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZoneTransfer);
        assert!(err.to_string().contains("out of sync"));
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            // Accept and hold the connection without answering.
            let _held = listener.accept();
            std::thread::sleep(Duration::from_secs(10));
        });

        let mut xfr = ZoneTransfer::new_axfr(name("example.com."), addr);
        xfr.set_timeout(Duration::from_millis(200));
        let err = xfr.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[test]
    fn tsig_signed_transfer_verifies() {
        let key = TsigKey::new("xfr.example.", "hmac-sha256", b"sekrit-sekrit".to_vec()).unwrap();
        let server_key = key.clone();
        let addr = xfr_server(move |query| {
            let request_mac = query.tsig().and_then(|r| match r.rdata() {
                Rdata::Tsig(rd) => Some(rd.mac.clone()),
                _ => None,
            });
            let mut generator = StreamGenerator::new(server_key.clone(), request_mac);

            let mut first = response_shell(query);
            first.add_record(Section::Answer, soa(100));
            first.add_record(
                Section::Answer,
                "example.com. 3600 IN NS ns1.example.com.".parse::<Record>().unwrap(),
            );
            let mut second = response_shell(query);
            second.add_record(Section::Answer, soa(100));
            vec![
                generator.generate(&first).unwrap().to_vec(),
                generator.generate(&second).unwrap().to_vec(),
            ]
        });

        let mut xfr = ZoneTransfer::new_axfr(name("example.com."), addr);
        xfr.set_timeout(Duration::from_secs(5));
        xfr.set_key(key);
        match xfr.run().unwrap() {
            XfrResult::Axfr(records) => assert_eq!(records.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn tampered_tsig_stream_fails() {
        let key = TsigKey::new("xfr.example.", "hmac-sha256", b"sekrit-sekrit".to_vec()).unwrap();
        let wrong = TsigKey::new("xfr.example.", "hmac-sha256", b"other-secret!".to_vec()).unwrap();
        let addr = xfr_server(move |query| {
            let mut generator = StreamGenerator::new(wrong.clone(), None);
            let mut first = response_shell(query);
            first.add_record(Section::Answer, soa(100));
            vec![generator.generate(&first).unwrap().to_vec()]
        });

        let mut xfr = ZoneTransfer::new_axfr(name("example.com."), addr);
        xfr.set_timeout(Duration::from_secs(5));
        xfr.set_key(key);
        let err = xfr.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TsigVerify);
    }
}
