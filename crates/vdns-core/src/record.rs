//! Record and address types shared by every crate in the workspace
//!
//! All of these are transient: fetched or computed at the start of a
//! reconciliation cycle and dropped at its end.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Address family managed by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4, published as an `A` record
    V4,
    /// IPv6, published as an `AAAA` record
    V6,
}

impl AddressFamily {
    /// Both families, in the order they are processed and logged
    pub const ALL: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

    /// DNS record type carrying this family
    pub fn record_type(self) -> RecordType {
        match self {
            AddressFamily::V4 => RecordType::A,
            AddressFamily::V6 => RecordType::Aaaa,
        }
    }

    /// Whether `ip` belongs to this family
    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// DNS record type as reported by the provider
///
/// Anything other than `A` / `AAAA` is kept verbatim and never touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Other(String),
}

impl RecordType {
    /// Wire representation (`"A"`, `"AAAA"`, or the raw type)
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Other(raw) => raw,
        }
    }

    /// The managed family for this type, if any
    pub fn family(&self) -> Option<AddressFamily> {
        match self {
            RecordType::A => Some(AddressFamily::V4),
            RecordType::Aaaa => Some(AddressFamily::V6),
            RecordType::Other(_) => None,
        }
    }
}

impl From<&str> for RecordType {
    fn from(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("A") {
            RecordType::A
        } else if raw.eq_ignore_ascii_case("AAAA") {
            RecordType::Aaaa
        } else {
            RecordType::Other(raw.to_string())
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RecordType::from(raw.as_str()))
    }
}

/// A DNS record as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Opaque provider-assigned identifier
    pub id: String,
    /// Record name relative to the domain (the subdomain label)
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record value (an address for A / AAAA records)
    pub value: String,
}

impl DnsRecord {
    /// Create a new record
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        record_type: RecordType,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record_type,
            value: value.into(),
        }
    }

    /// Whether this record is an address record of `family` named `subdomain`
    ///
    /// DNS names are case-insensitive; the provider reports them lowercased.
    pub fn is_managed(&self, subdomain: &str, family: AddressFamily) -> bool {
        self.record_type.family() == Some(family) && self.name.eq_ignore_ascii_case(subdomain)
    }

    /// Case-insensitive value comparison
    ///
    /// Providers may return IPv6 values in mixed-case hex.
    pub fn has_value(&self, value: &str) -> bool {
        self.value.eq_ignore_ascii_case(value)
    }
}

/// The outcome of address discovery for one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredAddress {
    pub family: AddressFamily,
    /// `None` when every source for the family failed this cycle
    pub value: Option<String>,
}

impl DiscoveredAddress {
    /// A successfully discovered address
    pub fn found(family: AddressFamily, value: impl Into<String>) -> Self {
        Self {
            family,
            value: Some(value.into()),
        }
    }

    /// A failed discovery
    pub fn absent(family: AddressFamily) -> Self {
        Self {
            family,
            value: None,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }
}

/// Addresses discovered for both families in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub v4: DiscoveredAddress,
    pub v6: DiscoveredAddress,
}

impl Discovery {
    /// Build from optional values
    pub fn new(v4: Option<String>, v6: Option<String>) -> Self {
        Self {
            v4: DiscoveredAddress {
                family: AddressFamily::V4,
                value: v4,
            },
            v6: DiscoveredAddress {
                family: AddressFamily::V6,
                value: v6,
            },
        }
    }

    /// The discovered address for `family`
    pub fn get(&self, family: AddressFamily) -> &DiscoveredAddress {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    /// Whether discovery failed for every family
    pub fn is_empty(&self) -> bool {
        self.v4.is_absent() && self.v6.is_absent()
    }
}
