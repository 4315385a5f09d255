//! The resolver contract: the blocking send/receive surface higher layers
//! build on, and a concrete UDP-first resolver with TCP retry.
//!
//! The core is synchronous; `send_async` is a thread handle delivering the
//! outcome to a listener, which keeps the codec free of any runtime.

use std::net::{IpAddr, SocketAddr, TcpStream, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::edns::{EdnsOption, OptRecord};
use crate::error::{error, Result};
use crate::message::{Flag, Message, Section, MAX_UDP_PAYLOAD};
use crate::rr::RrType;
use crate::tsig::{self, TsigContext, TsigKey, VerifyState};
use crate::wire::WireWriter;

pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Messages over TCP are framed with a 2-byte length, so this is the hard
/// ceiling for any rendered query or response.
pub const MAX_TCP_MESSAGE: usize = 0xffff;

pub trait Resolver: Send + Sync {
    /// Sends a query and blocks for the response.
    fn send(&self, query: &Message) -> Result<Message>;
}

/// Completion handle for [`send_async`].
pub struct AsyncHandle {
    thread: std::thread::JoinHandle<()>,
}

impl AsyncHandle {
    /// Blocks until the listener has been invoked.
    pub fn join(self) {
        let _ = self.thread.join();
    }
}

/// Dispatches `query` on a background thread; `listener` receives the
/// outcome exactly once.
pub fn send_async<R, F>(resolver: Arc<R>, query: Message, listener: F) -> AsyncHandle
where
    R: Resolver + 'static,
    F: FnOnce(Result<Message>) + Send + 'static,
{
    let thread = std::thread::spawn(move || listener(resolver.send(&query)));
    AsyncHandle { thread }
}

/// EDNS parameters attached to outgoing queries.
#[derive(Debug, Clone)]
struct EdnsConfig {
    payload_size: u16,
    flags: u16,
    options: Vec<EdnsOption>,
}

/// A stub resolver speaking to one server: UDP first, retrying over TCP
/// on truncation unless configured otherwise.
#[derive(Debug, Clone)]
pub struct SimpleResolver {
    address: SocketAddr,
    tcp_only: bool,
    ignore_truncation: bool,
    timeout: Duration,
    edns: Option<EdnsConfig>,
    key: Option<TsigKey>,
}

impl SimpleResolver {
    pub fn new(server: IpAddr) -> SimpleResolver {
        SimpleResolver {
            address: SocketAddr::new(server, DEFAULT_PORT),
            tcp_only: false,
            ignore_truncation: false,
            timeout: DEFAULT_TIMEOUT,
            edns: None,
            key: None,
        }
    }

    pub fn set_port(&mut self, port: u16) {
        self.address.set_port(port);
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn set_tcp(&mut self, tcp_only: bool) {
        self.tcp_only = tcp_only;
    }

    pub fn set_ignore_truncation(&mut self, ignore: bool) {
        self.ignore_truncation = ignore;
    }

    pub fn set_timeout(&mut self, secs: u64, millis: u32) {
        self.timeout = Duration::new(secs, millis * 1_000_000);
    }

    /// Enables EDNS level 0 with the given payload size, flags, and
    /// options on every query.
    pub fn set_edns(&mut self, payload_size: u16, flags: u16, options: Vec<EdnsOption>) {
        self.edns = Some(EdnsConfig {
            payload_size,
            flags,
            options,
        });
    }

    pub fn set_tsig_key(&mut self, key: TsigKey) {
        self.key = Some(key);
    }

    fn udp_payload(&self) -> usize {
        self.edns
            .as_ref()
            .map(|e| e.payload_size as usize)
            .unwrap_or(MAX_UDP_PAYLOAD)
    }

    /// Clones the query and applies OPT and TSIG, leaving the caller's
    /// message untouched.
    fn prepare(&self, query: &Message) -> Message {
        let mut prepared = query.clone();
        if let Some(edns) = &self.edns {
            if prepared.opt().is_none() {
                let opt = OptRecord::new(edns.payload_size, 0, 0, edns.flags, edns.options.clone());
                prepared.add_record(Section::Additional, opt.into_record());
            }
        }
        if let Some(key) = &self.key {
            prepared.set_tsig(TsigContext::new(key.clone()));
        }
        prepared
    }

    fn verify_response(&self, query_wire: &[u8], response: &mut Message, wire: &[u8]) -> Result<()> {
        let Some(key) = &self.key else {
            if response.tsig().is_some() {
                // Signed, but we hold no key to check it with.
                response.set_tsig_state(VerifyState::Signed);
            }
            return Ok(());
        };
        // The MAC our query was signed with seeds the response MAC.
        let sent = Message::from_wire(query_wire)?;
        let request_mac = sent.tsig().and_then(|r| match r.rdata() {
            crate::rdata::Rdata::Tsig(rd) => Some(rd.mac.clone()),
            _ => None,
        });
        match tsig::verify(key, response, wire, request_mac.as_deref()) {
            Ok(()) => {
                response.set_tsig_state(VerifyState::Verified);
                Ok(())
            }
            Err(e) => {
                response.set_tsig_state(VerifyState::Failed);
                Err(e)
            }
        }
    }

    fn check_response(&self, query: &Message, response: &Message) -> Result<()> {
        let sent = query.question();
        let got = response.question();
        match (sent, got) {
            (Some(a), Some(b)) if a.name() == b.name() && a.rtype() == b.rtype() => Ok(()),
            (None, None) => Ok(()),
            _ => Err(error!(WireParse => "response question does not match query")),
        }
    }

    fn exchange_udp(&self, wire: &[u8], id: u16, deadline: Instant) -> Result<Vec<u8>> {
        let local: SocketAddr = if self.address.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(self.address)?;
        socket.send(wire)?;

        let mut buf = vec![0u8; self.udp_payload().max(MAX_UDP_PAYLOAD)];
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or_else(|| error!(Timeout => "query to {} timed out", self.address))?;
            socket.set_read_timeout(Some(remaining))?;
            let n = socket.recv(&mut buf)?;
            if n >= 2 && u16::from_be_bytes([buf[0], buf[1]]) == id {
                buf.truncate(n);
                return Ok(buf);
            }
            log::debug!(target: "resolver", "ignoring datagram with mismatched id from {}", self.address);
        }
    }

    fn exchange_tcp(&self, wire: &[u8], deadline: Instant) -> Result<Vec<u8>> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or_else(|| error!(Timeout => "query to {} timed out", self.address))?;
        let stream = TcpStream::connect_timeout(&self.address, remaining)?;
        write_frame(&stream, wire, deadline)?;
        read_frame(&stream, deadline)
    }
}

pub(crate) fn write_frame(mut stream: &TcpStream, wire: &[u8], deadline: Instant) -> Result<()> {
    use std::io::Write;

    if wire.len() > MAX_TCP_MESSAGE {
        return Err(error!(WireParse => "message of {} octets cannot be framed", wire.len()));
    }
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .ok_or_else(|| error!(Timeout => "tcp write deadline exceeded"))?;
    stream.set_write_timeout(Some(remaining))?;
    let mut w = WireWriter::new();
    w.write_u16(wire.len() as u16);
    w.write_bytes(wire);
    stream.write_all(w.as_slice())?;
    Ok(())
}

pub(crate) fn read_frame(mut stream: &TcpStream, deadline: Instant) -> Result<Vec<u8>> {
    use std::io::Read;

    let remaining = deadline
        .checked_duration_since(Instant::now())
        .ok_or_else(|| error!(Timeout => "tcp read deadline exceeded"))?;
    stream.set_read_timeout(Some(remaining))?;
    let mut len = [0u8; 2];
    stream.read_exact(&mut len)?;
    let mut body = vec![0u8; u16::from_be_bytes(len) as usize];
    stream.read_exact(&mut body)?;
    Ok(body)
}

impl Resolver for SimpleResolver {
    fn send(&self, query: &Message) -> Result<Message> {
        let deadline = Instant::now() + self.timeout;
        let prepared = self.prepare(query);
        let id = prepared.header().id();

        let max = if self.tcp_only {
            MAX_TCP_MESSAGE
        } else {
            self.udp_payload()
        };
        let wire = prepared.to_wire_sized(max)?;
        log::debug!(
            target: "resolver",
            "sending {} octet query {} to {}",
            wire.len(),
            id,
            self.address
        );

        let via_tcp = self.tcp_only;
        let response_wire = if via_tcp {
            self.exchange_tcp(&wire, deadline)?
        } else {
            self.exchange_udp(&wire, id, deadline)?
        };
        let mut response = Message::from_wire(&response_wire)?;
        if response.header().id() != id {
            return Err(error!(WireParse => "response id {} does not match query {}", response.header().id(), id));
        }

        // Truncated UDP answers retry over TCP with the same query bytes.
        if !via_tcp && response.header().flag(Flag::Tc) && !self.ignore_truncation {
            log::debug!(target: "resolver", "response truncated, retrying over tcp");
            let tcp_wire = prepared.to_wire_sized(MAX_TCP_MESSAGE)?;
            let response_wire = self.exchange_tcp(&tcp_wire, deadline)?;
            response = Message::from_wire(&response_wire)?;
            if response.header().id() != id {
                return Err(error!(WireParse => "response id mismatch over tcp"));
            }
            self.check_response(&prepared, &response)?;
            self.verify_response(&tcp_wire, &mut response, &response_wire)?;
            return Ok(response);
        }

        self.check_response(&prepared, &response)?;
        self.verify_response(&wire, &mut response, &response_wire)?;
        Ok(response)
    }
}

/// Builds a query for (name, type, IN class), the common entry point for
/// resolver users.
pub fn make_query(name: &crate::name::Name, rtype: RrType) -> Message {
    Message::query(crate::rr::Record::question(
        name.clone(),
        rtype,
        crate::rr::DnsClass::IN,
    ))
}
