//! Chain metadata, beacons, and the round/time arithmetic between them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tlock::Scheme;

use crate::error::TLockAgeError;

/// Static description of a randomness chain, as served by its `/info`
/// endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainInfo {
    scheme_id: String,
    period: u64,
    genesis_time: u64,
    hash: Vec<u8>,
    public_key: Vec<u8>,
}

impl ChainInfo {
    pub fn new(
        scheme_id: &str,
        period: u64,
        genesis_time: u64,
        hash: &[u8],
        public_key: &[u8],
    ) -> Self {
        Self {
            scheme_id: scheme_id.to_string(),
            period,
            genesis_time,
            hash: hash.to_vec(),
            public_key: public_key.to_vec(),
        }
    }

    pub fn scheme_id(&self) -> String {
        self.scheme_id.clone()
    }

    pub fn scheme(&self) -> Result<Scheme, TLockAgeError> {
        Scheme::from_id(&self.scheme_id).map_err(Into::into)
    }

    /// Seconds between rounds.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Unix time of round 1.
    pub fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    pub fn hash(&self) -> Vec<u8> {
        self.hash.clone()
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.public_key.clone()
    }
}

/// A single round's output as published by the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Beacon {
    round: u64,
    signature: Vec<u8>,
}

impl Beacon {
    pub fn new(round: u64, signature: &[u8]) -> Self {
        Self {
            round,
            signature: signature.to_vec(),
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn signature(&self) -> Vec<u8> {
        self.signature.clone()
    }
}

/// The beacon network as the container consumes it. Implementations fetch
/// over whatever transport they like; failures come back wrapped in
/// [`TLockAgeError::Network`].
pub trait ChainClient {
    fn chain_info(&self) -> Result<ChainInfo, TLockAgeError>;
    fn beacon(&self, round: u64) -> Result<Beacon, TLockAgeError>;
}

/// Unix time at which `round` is scheduled.
pub fn time_for_round(info: &ChainInfo, round: u64) -> u64 {
    round
        .saturating_sub(1)
        .saturating_mul(info.period())
        .saturating_add(info.genesis_time())
}

/// Round scheduled at or covering unix time `time`. Times at or before
/// genesis map to round 1; an exact boundary yields the boundary round.
pub fn round_for_time(info: &ChainInfo, time: u64) -> u64 {
    if time <= info.genesis_time() || info.period() == 0 {
        return 1;
    }
    (time - info.genesis_time()) / info.period() + 1
}

/// Round expected `d` from now.
pub fn round_after(info: &ChainInfo, d: Duration) -> u64 {
    round_for_time(info, unix_now().saturating_add(d.as_secs()))
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}
