//! TSIG transaction signatures (RFC 8945): single-message signing and
//! verification, and the streaming verifier/generator used by zone
//! transfers, where unsigned messages accumulate into the MAC of the next
//! signed one.

use ring::hmac;

use crate::error::{error, Result};
use crate::message::Message;
use crate::name::Name;
use crate::rdata::{Rdata, Tsig};
use crate::rr::{DnsClass, Record, RrType};
use crate::wire::WireWriter;

pub const HMAC_SHA1: &str = "hmac-sha1.";
pub const HMAC_SHA256: &str = "hmac-sha256.";
pub const HMAC_SHA384: &str = "hmac-sha384.";
pub const HMAC_SHA512: &str = "hmac-sha512.";
/// Recognized for compatibility, but ring carries no MD5; keys with this
/// algorithm are rejected at construction.
pub const HMAC_MD5: &str = "hmac-md5.sig-alg.reg.int.";

pub const DEFAULT_FUDGE: u16 = 300;

/// A signed stream may carry at most this many unsigned messages between
/// signatures.
const MAX_UNSIGNED: usize = 100;

/// Verification status of a message, tracked on [`Message`] and by
/// [`StreamVerifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyState {
    /// No signature present.
    #[default]
    Unsigned,
    /// Unsigned message inside a signed stream, vouched for by a later
    /// signature.
    Intermediate,
    /// Signed, but no verification was attempted.
    Signed,
    /// Signed and verified.
    Verified,
    /// Verification failed; the stream is dead.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsigKey {
    name: Name,
    algorithm: Name,
    secret: Vec<u8>,
}

fn ring_algorithm(algorithm: &Name) -> Result<(hmac::Algorithm, usize)> {
    let alg = algorithm.to_string().to_ascii_lowercase();
    match alg.as_str() {
        HMAC_SHA1 => Ok((hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, 20)),
        HMAC_SHA256 => Ok((hmac::HMAC_SHA256, 32)),
        HMAC_SHA384 => Ok((hmac::HMAC_SHA384, 48)),
        HMAC_SHA512 => Ok((hmac::HMAC_SHA512, 64)),
        _ => Err(error!(UnsupportedAlgorithm => "no HMAC for {}", algorithm)),
    }
}

impl TsigKey {
    /// Builds a key. `algorithm` accepts the canonical name with or without
    /// the trailing dot; unsupported algorithms (including hmac-md5) are
    /// rejected here rather than at signing time.
    pub fn new(name: &str, algorithm: &str, secret: Vec<u8>) -> Result<TsigKey> {
        let name: Name = Name::parse(name, Some(&Name::root()))?;
        let mut alg = algorithm.to_ascii_lowercase();
        if !alg.ends_with('.') {
            alg.push('.');
        }
        let algorithm: Name = Name::parse(&alg, None)?;
        ring_algorithm(&algorithm)?;
        Ok(TsigKey {
            name,
            algorithm,
            secret,
        })
    }

    /// Generates a key with a fresh random secret.
    pub fn generate(name: &str, algorithm: &str) -> Result<TsigKey> {
        use ring::rand::SecureRandom;

        let rng = ring::rand::SystemRandom::new();
        let mut secret = vec![0u8; 32];
        rng.fill(&mut secret)
            .map_err(|_| error!(Io => "system randomness unavailable"))?;
        TsigKey::new(name, algorithm, secret)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn algorithm(&self) -> &Name {
        &self.algorithm
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    fn mac_length(&self) -> usize {
        // Key construction validated the algorithm.
        ring_algorithm(&self.algorithm).map(|(_, n)| n).unwrap_or(0)
    }

    fn hmac_context(&self) -> hmac::Context {
        let (alg, _) = ring_algorithm(&self.algorithm).expect("validated at construction");
        hmac::Context::with_key(&hmac::Key::new(alg, &self.secret))
    }

    /// Wire length to reserve for a TSIG record signed with this key,
    /// including room for the BADTIME `other` field.
    pub fn record_length(&self) -> usize {
        self.name.wire_length() + 10 + self.algorithm.wire_length() + 16 + self.mac_length() + 6
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        & 0xffff_ffff_ffff
}

fn update_u16(ctx: &mut hmac::Context, v: u16) {
    ctx.update(&v.to_be_bytes());
}

fn update_name(ctx: &mut hmac::Context, name: &Name) -> Result<()> {
    let mut w = WireWriter::new();
    name.to_wire_canonical(&mut w)?;
    ctx.update(w.as_slice());
    Ok(())
}

/// Feeds the header of `wire` with its arcount lowered by one (removing
/// the TSIG record from the counted section), then the body up to `end`.
fn update_message(ctx: &mut hmac::Context, wire: &[u8], end: usize) -> Result<()> {
    if wire.len() < 12 || end > wire.len() || end < 12 {
        return Err(error!(WireParse => "message too short for tsig"));
    }
    let mut header = [0u8; 12];
    header.copy_from_slice(&wire[..12]);
    let arcount = u16::from_be_bytes([header[10], header[11]]);
    if arcount == 0 {
        return Err(error!(TsigVerify => "signed message has no additional records"));
    }
    header[10..12].copy_from_slice(&(arcount - 1).to_be_bytes());
    ctx.update(&header);
    ctx.update(&wire[12..end]);
    Ok(())
}

/// The full TSIG variables, hashed for first/solo signatures.
fn update_variables(ctx: &mut hmac::Context, owner: &Name, class: DnsClass, rd: &Tsig) -> Result<()> {
    update_name(ctx, owner)?;
    update_u16(ctx, class.0);
    ctx.update(&0u32.to_be_bytes());
    update_name(ctx, &rd.algorithm)?;
    update_time(ctx, rd.time_signed);
    update_u16(ctx, rd.fudge);
    update_u16(ctx, rd.error);
    update_u16(ctx, rd.other.len() as u16);
    ctx.update(&rd.other);
    Ok(())
}

fn update_time(ctx: &mut hmac::Context, time: u64) {
    update_u16(ctx, (time >> 32) as u16);
    ctx.update(&(time as u32).to_be_bytes());
}

/// Signing parameters carried by a [`Message`] until render time.
#[derive(Debug, Clone)]
pub struct TsigContext {
    pub key: TsigKey,
    pub error: u16,
    /// MAC of the request when signing a response.
    pub request_mac: Option<Vec<u8>>,
}

impl TsigContext {
    pub fn new(key: TsigKey) -> TsigContext {
        TsigContext {
            key,
            error: 0,
            request_mac: None,
        }
    }

    pub(crate) fn sign(&self, unsigned: &[u8]) -> Result<Record> {
        self.sign_at(unsigned, now_secs())
    }

    pub(crate) fn sign_at(&self, unsigned: &[u8], time: u64) -> Result<Record> {
        let mut ctx = self.key.hmac_context();
        if let Some(mac) = &self.request_mac {
            update_u16(&mut ctx, mac.len() as u16);
            ctx.update(mac);
        }
        ctx.update(unsigned);

        let rd = Tsig {
            algorithm: self.key.algorithm.clone(),
            time_signed: time,
            fudge: DEFAULT_FUDGE,
            mac: Vec::new(),
            original_id: u16::from_be_bytes([unsigned[0], unsigned[1]]),
            error: self.error,
            other: Vec::new(),
        };
        update_variables(&mut ctx, &self.key.name, DnsClass::ANY, &rd)?;
        let tag = ctx.sign();

        let rd = Tsig {
            mac: tag.as_ref().to_vec(),
            ..rd
        };
        Ok(Record::raw(
            self.key.name.clone(),
            RrType::TSIG,
            DnsClass::ANY,
            0,
            Rdata::Tsig(rd),
        ))
    }
}

fn tsig_of(msg: &Message) -> Result<(&Record, &Tsig, usize)> {
    let record = msg
        .tsig()
        .ok_or_else(|| error!(TsigVerify => "message is not signed"))?;
    let start = msg
        .tsig_start()
        .ok_or_else(|| error!(TsigVerify => "message was not parsed from wire"))?;
    match record.rdata() {
        Rdata::Tsig(rd) => Ok((record, rd, start)),
        _ => Err(error!(TsigVerify => "malformed tsig record")),
    }
}

fn check_identity(key: &TsigKey, record: &Record, rd: &Tsig) -> Result<()> {
    if record.name() != &key.name || rd.algorithm != key.algorithm {
        return Err(
            error!(TsigVerify => "key {}/{} does not match signature", key.name, key.algorithm),
        );
    }
    Ok(())
}

fn check_time(rd: &Tsig, now: u64) -> Result<()> {
    if now.abs_diff(rd.time_signed) > rd.fudge as u64 {
        return Err(
            error!(TsigVerify => "signature time {} outside fudge {} of {}", rd.time_signed, rd.fudge, now),
        );
    }
    Ok(())
}

fn check_mac(expected: &[u8], tag: hmac::Tag) -> Result<()> {
    if ring::constant_time::verify_slices_are_equal(tag.as_ref(), expected).is_err() {
        return Err(error!(TsigVerify => "mac mismatch"));
    }
    Ok(())
}

/// Verifies a single signed message against `key`. `request_mac` is the
/// MAC of the query this message responds to, when there was one.
pub fn verify(
    key: &TsigKey,
    msg: &Message,
    wire: &[u8],
    request_mac: Option<&[u8]>,
) -> Result<()> {
    verify_at(key, msg, wire, request_mac, now_secs())
}

pub fn verify_at(
    key: &TsigKey,
    msg: &Message,
    wire: &[u8],
    request_mac: Option<&[u8]>,
    now: u64,
) -> Result<()> {
    let (record, rd, start) = tsig_of(msg)?;
    check_identity(key, record, rd)?;
    check_time(rd, now)?;

    let mut ctx = key.hmac_context();
    if let Some(mac) = request_mac {
        update_u16(&mut ctx, mac.len() as u16);
        ctx.update(mac);
    }
    update_message(&mut ctx, wire, start)?;
    update_variables(&mut ctx, record.name(), record.class(), rd)?;
    check_mac(&rd.mac, ctx.sign())
}

/// Verifies a multi-message stream: the first message must be signed, a
/// signature must appear at least every [`MAX_UNSIGNED`] messages, and the
/// bytes of unsigned messages accumulate into the next signature's input.
pub struct StreamVerifier {
    key: TsigKey,
    running: hmac::Context,
    nresponses: usize,
    last_signed: usize,
    state: VerifyState,
}

impl StreamVerifier {
    /// `request_mac` is the MAC the query was signed with.
    pub fn new(key: TsigKey, request_mac: Option<&[u8]>) -> StreamVerifier {
        let mut running = key.hmac_context();
        if let Some(mac) = request_mac {
            update_u16(&mut running, mac.len() as u16);
            running.update(mac);
        }
        StreamVerifier {
            key,
            running,
            nresponses: 0,
            last_signed: 0,
            state: VerifyState::Unsigned,
        }
    }

    pub fn state(&self) -> VerifyState {
        self.state
    }

    fn reseed(&mut self, mac: &[u8]) {
        self.running = self.key.hmac_context();
        update_u16(&mut self.running, mac.len() as u16);
        self.running.update(mac);
    }

    /// Feeds one received message; returns the state it landed in. Once
    /// [`VerifyState::Failed`] is returned the stream cannot recover.
    pub fn verify(&mut self, msg: &Message, wire: &[u8]) -> VerifyState {
        self.verify_at(msg, wire, now_secs())
    }

    pub fn verify_at(&mut self, msg: &Message, wire: &[u8], now: u64) -> VerifyState {
        if self.state == VerifyState::Failed {
            return VerifyState::Failed;
        }
        self.nresponses += 1;

        if msg.tsig().is_none() {
            if self.nresponses == 1 {
                log::debug!(target: "tsig", "first stream message is unsigned");
                self.state = VerifyState::Failed;
                return self.state;
            }
            if self.nresponses - self.last_signed >= MAX_UNSIGNED {
                log::debug!(target: "tsig", "{} unsigned messages in stream", MAX_UNSIGNED);
                self.state = VerifyState::Failed;
                return self.state;
            }
            self.running.update(wire);
            self.state = VerifyState::Intermediate;
            return self.state;
        }

        let result = self.verify_signed(msg, wire, now);
        self.state = match result {
            Ok(()) => {
                self.last_signed = self.nresponses;
                VerifyState::Verified
            }
            Err(e) => {
                log::debug!(target: "tsig", "stream verification failed: {}", e);
                VerifyState::Failed
            }
        };
        self.state
    }

    fn verify_signed(&mut self, msg: &Message, wire: &[u8], now: u64) -> Result<()> {
        let (record, rd, start) = tsig_of(msg)?;
        check_identity(&self.key, record, rd)?;
        check_time(rd, now)?;

        let mut ctx = std::mem::replace(&mut self.running, self.key.hmac_context());
        update_message(&mut ctx, wire, start)?;
        if self.nresponses == 1 {
            update_variables(&mut ctx, record.name(), record.class(), rd)?;
        } else {
            // Intermediate signatures cover only the timers.
            update_time(&mut ctx, rd.time_signed);
            update_u16(&mut ctx, rd.fudge);
        }
        check_mac(&rd.mac, ctx.sign())?;
        self.reseed(&rd.mac);
        Ok(())
    }
}

/// Signs an outgoing multi-message stream, the sender-side mirror of
/// [`StreamVerifier`]. The first message carries a full signature;
/// subsequent ones sign the accumulated bytes plus timers.
pub struct StreamGenerator {
    key: TsigKey,
    prior_mac: Vec<u8>,
    first: bool,
}

impl StreamGenerator {
    pub fn new(key: TsigKey, request_mac: Option<Vec<u8>>) -> StreamGenerator {
        StreamGenerator {
            prior_mac: request_mac.unwrap_or_default(),
            key,
            first: true,
        }
    }

    /// Renders `msg` with a stream signature appended.
    pub fn generate(&mut self, msg: &Message) -> Result<bytes::Bytes> {
        self.generate_at(msg, now_secs())
    }

    pub fn generate_at(&mut self, msg: &Message, time: u64) -> Result<bytes::Bytes> {
        let unsigned = msg.to_wire()?;

        let mut ctx = self.key.hmac_context();
        if !self.prior_mac.is_empty() || !self.first {
            update_u16(&mut ctx, self.prior_mac.len() as u16);
            ctx.update(&self.prior_mac);
        }
        ctx.update(&unsigned);

        let rd = Tsig {
            algorithm: self.key.algorithm().clone(),
            time_signed: time,
            fudge: DEFAULT_FUDGE,
            mac: Vec::new(),
            original_id: u16::from_be_bytes([unsigned[0], unsigned[1]]),
            error: 0,
            other: Vec::new(),
        };
        if self.first {
            update_variables(&mut ctx, self.key.name(), DnsClass::ANY, &rd)?;
        } else {
            update_time(&mut ctx, rd.time_signed);
            update_u16(&mut ctx, rd.fudge);
        }
        let tag = ctx.sign();
        self.first = false;
        self.prior_mac = tag.as_ref().to_vec();

        let record = Record::raw(
            self.key.name().clone(),
            RrType::TSIG,
            DnsClass::ANY,
            0,
            Rdata::Tsig(Tsig {
                mac: self.prior_mac.clone(),
                ..rd
            }),
        );

        let mut w = WireWriter::new();
        w.write_bytes(&unsigned);
        record.to_wire(&mut w, None, false)?;
        let arcount = u16::from_be_bytes([unsigned[10], unsigned[11]]) + 1;
        w.patch_u16(10, arcount);
        Ok(w.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Section};
    use crate::rr::DnsClass;

    fn key() -> TsigKey {
        TsigKey::new("xfr-key.example.", "hmac-sha256", b"0123456789abcdef".to_vec()).unwrap()
    }

    /// Signs `msg` at a fixed time, the way `Message::to_wire_sized` does
    /// at the current time.
    fn signed_wire(msg: &Message, time: u64) -> Vec<u8> {
        let ctx = TsigContext::new(key());
        let wire = msg.to_wire().unwrap();
        let record = ctx.sign_at(&wire, time).unwrap();
        let mut w = crate::wire::WireWriter::new();
        w.write_bytes(&wire);
        record.to_wire(&mut w, None, false).unwrap();
        let arcount = u16::from_be_bytes([wire[10], wire[11]]) + 1;
        w.patch_u16(10, arcount);
        w.freeze().to_vec()
    }

    #[test]
    fn algorithms() {
        assert!(TsigKey::new("k.", "hmac-sha1", vec![1]).is_ok());
        assert!(TsigKey::new("k.", "hmac-sha512.", vec![1]).is_ok());
        let err = TsigKey::new("k.", "hmac-md5.sig-alg.reg.int.", vec![1]).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnsupportedAlgorithm);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let time = 1_700_000_000u64;
        let question = Record::question(
            "example.com.".parse().unwrap(),
            RrType::SOA,
            DnsClass::IN,
        );
        let msg = Message::query(question);
        let wire = signed_wire(&msg, time);

        let parsed = Message::from_wire(&wire).unwrap();
        assert!(parsed.tsig().is_some());
        assert!(parsed.tsig_start().is_some());
        verify_at(&key(), &parsed, &wire, None, time).unwrap();

        // Outside the fudge window the same message fails.
        let late = time + DEFAULT_FUDGE as u64 + 1;
        assert!(verify_at(&key(), &parsed, &wire, None, late).is_err());

        // A different key fails.
        let other = TsigKey::new("other.example.", "hmac-sha256", b"zzz".to_vec()).unwrap();
        assert!(verify_at(&other, &parsed, &wire, None, time).is_err());
    }

    #[test]
    fn tampered_message_fails() {
        let time = 1_700_000_000u64;
        let question = Record::question(
            "example.com.".parse().unwrap(),
            RrType::SOA,
            DnsClass::IN,
        );
        let msg = Message::query(question);
        let mut wire = signed_wire(&msg, time);
        // Flip a bit in the question name.
        wire[14] ^= 0x01;
        let parsed = Message::from_wire(&wire).unwrap();
        assert!(verify_at(&key(), &parsed, &wire, None, time).is_err());
    }

    #[test]
    fn stream_verifies_mixed_signed_and_unsigned() {
        let time = 1_700_000_000u64;
        let mut generator = StreamGenerator::new(key(), None);
        let mut verifier = StreamVerifier::new(key(), None);

        let mut first = Message::new();
        first.add_record(
            Section::Answer,
            "example.com. 3600 IN A 192.0.2.1".parse().unwrap(),
        );
        let wire1 = generator.generate_at(&first, time).unwrap();
        let m1 = Message::from_wire(&wire1).unwrap();
        assert_eq!(verifier.verify_at(&m1, &wire1, time), VerifyState::Verified);

        // An unsigned message in the middle of the stream.
        let mut middle = Message::new();
        middle.add_record(
            Section::Answer,
            "a.example.com. 3600 IN A 192.0.2.2".parse().unwrap(),
        );
        let wire2 = middle.to_wire().unwrap();
        let m2 = Message::from_wire(&wire2).unwrap();
        assert_eq!(
            verifier.verify_at(&m2, &wire2, time),
            VerifyState::Intermediate
        );

        // The next signed message covers the unsigned bytes in between.
        let mut last = Message::new();
        last.add_record(
            Section::Answer,
            "example.com. 3600 IN SOA ns1.example.com. admin.example.com. 2 1 1 1 1"
                .parse()
                .unwrap(),
        );
        let wire3 = generate_with_intermediate(&mut generator, &[&wire2[..]], &last, time);
        let m3 = Message::from_wire(&wire3).unwrap();
        assert_eq!(verifier.verify_at(&m3, &wire3, time), VerifyState::Verified);
    }

    /// Sender-side helper: hash intermediate unsigned wires into the MAC of
    /// the next signed message, as a transfer server does.
    fn generate_with_intermediate(
        generator: &mut StreamGenerator,
        unsigned: &[&[u8]],
        msg: &Message,
        time: u64,
    ) -> Vec<u8> {
        let body = msg.to_wire().unwrap();
        let mut ctx = generator.key.hmac_context();
        update_u16(&mut ctx, generator.prior_mac.len() as u16);
        ctx.update(&generator.prior_mac);
        for u in unsigned {
            ctx.update(u);
        }
        ctx.update(&body);
        let rd = Tsig {
            algorithm: generator.key.algorithm().clone(),
            time_signed: time,
            fudge: DEFAULT_FUDGE,
            mac: Vec::new(),
            original_id: u16::from_be_bytes([body[0], body[1]]),
            error: 0,
            other: Vec::new(),
        };
        update_time(&mut ctx, rd.time_signed);
        update_u16(&mut ctx, rd.fudge);
        let tag = ctx.sign();
        generator.prior_mac = tag.as_ref().to_vec();
        generator.first = false;

        let record = Record::raw(
            generator.key.name().clone(),
            RrType::TSIG,
            DnsClass::ANY,
            0,
            Rdata::Tsig(Tsig {
                mac: generator.prior_mac.clone(),
                ..rd
            }),
        );
        let mut w = crate::wire::WireWriter::new();
        w.write_bytes(&body);
        record.to_wire(&mut w, None, false).unwrap();
        let arcount = u16::from_be_bytes([body[10], body[11]]) + 1;
        w.patch_u16(10, arcount);
        w.freeze().to_vec()
    }

    #[test]
    fn unsigned_first_message_fails_stream() {
        let mut verifier = StreamVerifier::new(key(), None);
        let msg = Message::new();
        let wire = msg.to_wire().unwrap();
        let parsed = Message::from_wire(&wire).unwrap();
        assert_eq!(
            verifier.verify_at(&parsed, &wire, 0),
            VerifyState::Failed
        );
        // Failure is sticky.
        assert_eq!(
            verifier.verify_at(&parsed, &wire, 0),
            VerifyState::Failed
        );
    }
}
