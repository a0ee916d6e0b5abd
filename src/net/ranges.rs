//! Address-range sets for the deny and allow lists.
//!
//! # Responsibilities
//! - Parse CIDR and bare IP literals into typed ranges
//! - Answer "is this address inside the set" for the connection path
//!
//! # Design Decisions
//! - A bare address is a single-host range (/32 or /128)
//! - Host bits below the prefix are masked, so `10.1.2.3/8` means `10.0.0.0/8`
//! - IPv4-mapped IPv6 addresses are also checked against IPv4 ranges
//! - Parsing stops at the first malformed literal

use std::net::IpAddr;

use cidr::parsers::parse_cidr_ignore_hostbits;
use cidr::IpCidr;
use thiserror::Error;

/// A literal in a range list could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid address range {literal:?} at index {index}: {reason}")]
pub struct RangeParseError {
    /// Position of the offending literal in the input list.
    pub index: usize,
    /// The literal as written in the document.
    pub literal: String,
    /// Why it was rejected.
    pub reason: String,
}

/// An ordered set of IP ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<IpCidr>,
}

impl RangeSet {
    /// Build a set from CIDR/IP literals, failing on the first malformed entry.
    pub fn parse<S: AsRef<str>>(literals: &[S]) -> Result<Self, RangeParseError> {
        let ranges = literals
            .iter()
            .enumerate()
            .map(|(index, literal)| {
                let literal = literal.as_ref();
                parse_range(literal).map_err(|reason| RangeParseError {
                    index,
                    literal: literal.to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ranges })
    }

    /// Returns true if `addr` falls inside any range of the set.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        if self.ranges.iter().any(|range| range.contains(addr)) {
            return true;
        }

        match addr {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map(|v4| {
                    let v4 = IpAddr::V4(v4);
                    self.ranges.iter().any(|range| range.contains(&v4))
                })
                .unwrap_or(false),
            IpAddr::V4(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpCidr> {
        self.ranges.iter()
    }
}

fn parse_range(literal: &str) -> Result<IpCidr, String> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Err("empty entry".to_string());
    }

    parse_cidr_ignore_hostbits::<IpCidr, _>(trimmed, str::parse).map_err(|e| e.to_string())
}
