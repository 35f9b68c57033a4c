//! SASL client context.
//!
//! Authentication is a pure state machine on byte slices: `start()`
//! yields the initial client payload, `step()` feeds each server
//! challenge back in. Mechanisms implement the [`Mechanism`] trait so
//! SCRAM variants can be provided without touching the session; the
//! crate ships PLAIN.
//!
//! Mechanism names follow the peer's advertisement format
//! (`SCRAM-SHA512 SCRAM-SHA256 SCRAM-SHA1 PLAIN`).

/// Outcome of a mechanism round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslStatus {
    /// Exchange complete on the client side.
    Ok,
    /// Another round is required; send the payload and await a challenge.
    Continue,
    /// The exchange cannot proceed.
    Fail,
}

/// A SASL mechanism as a pure byte-slice state machine.
pub trait Mechanism: Send {
    /// Mechanism name as advertised on the wire.
    fn name(&self) -> &'static str;

    /// Produce the initial client payload.
    fn start(&mut self) -> (SaslStatus, Vec<u8>);

    /// Feed a server challenge, producing the next client payload.
    fn step(&mut self, challenge: &[u8]) -> (SaslStatus, Vec<u8>);
}

/// The PLAIN mechanism: `authzid NUL authcid NUL password` in one round.
pub struct Plain {
    username: String,
    password: String,
}

impl Plain {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Mechanism for Plain {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn start(&mut self) -> (SaslStatus, Vec<u8>) {
        let mut payload = Vec::with_capacity(self.username.len() + self.password.len() + 2);
        payload.push(0);
        payload.extend_from_slice(self.username.as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.password.as_bytes());
        (SaslStatus::Ok, payload)
    }

    fn step(&mut self, _challenge: &[u8]) -> (SaslStatus, Vec<u8>) {
        // PLAIN is single-round; a challenge means the peer is confused.
        (SaslStatus::Fail, Vec::new())
    }
}

/// Mechanism preference, strongest first.
pub const MECHANISM_PREFERENCE: &[&str] = &["SCRAM-SHA512", "SCRAM-SHA256", "SCRAM-SHA1", "PLAIN"];

/// Client-side SASL context bound to one session.
///
/// Selects the first mechanism from [`MECHANISM_PREFERENCE`] that has an
/// available implementation and drives it through the exchange.
pub struct ClientContext {
    mechanism: Box<dyn Mechanism>,
}

impl ClientContext {
    /// Context over the built-in mechanisms (PLAIN).
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mechanism: Box::new(Plain::new(username, password)),
        }
    }

    /// Context over caller-provided mechanisms, picked by preference
    /// order. Falls back to the first provided mechanism when none match
    /// the preference list.
    pub fn with_mechanisms(mut mechanisms: Vec<Box<dyn Mechanism>>) -> Option<Self> {
        if mechanisms.is_empty() {
            return None;
        }
        let index = MECHANISM_PREFERENCE
            .iter()
            .find_map(|name| mechanisms.iter().position(|m| m.name() == *name))
            .unwrap_or(0);
        Some(Self {
            mechanism: mechanisms.swap_remove(index),
        })
    }

    /// Name of the selected mechanism.
    pub fn name(&self) -> &'static str {
        self.mechanism.name()
    }

    /// Produce the initial client payload.
    pub fn start(&mut self) -> (SaslStatus, Vec<u8>) {
        self.mechanism.start()
    }

    /// Feed a server challenge.
    pub fn step(&mut self, challenge: &[u8]) -> (SaslStatus, Vec<u8>) {
        self.mechanism.step(challenge)
    }
}
