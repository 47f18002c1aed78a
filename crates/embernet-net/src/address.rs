//! Generation and persistence of a device's Ethernet and IPv4 addresses.
//!
//! Embedded network stacks that don't have a factory-programmed MAC need to
//! invent one on first boot and then keep using the same one, so that the
//! device is easy to find on the LAN across reboots. This module generates
//! a locally-administered unicast MAC and a link-local IPv4 address, and
//! persists both through the [`AddressStore`] trait so a caller can back
//! them with a file, a database row, or anything else byte-oriented.

use std::fmt;
use std::net::Ipv4Addr;

use rand::Rng;

use embernet_core::{Error, Result};

/// The three-byte Organizationally Unique Identifier prefix of a generated
/// MAC address.
///
/// `first_byte` is coerced into the locally-administered, unicast space
/// regardless of what's passed in, matching the historical OUI prefixes
/// vendors register for globally-unique addresses: the low bit (multicast)
/// is cleared and the second-lowest bit (locally administered) is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OuiPrefix {
    bytes: [u8; 3],
}

impl OuiPrefix {
    /// Build a prefix, normalizing `byte0` into the locally-administered
    /// unicast space.
    #[must_use]
    pub fn new(byte0: u8, byte1: u8, byte2: u8) -> Self {
        Self {
            bytes: [Self::to_oui_unicast(byte0), byte1, byte2],
        }
    }

    #[must_use]
    pub fn bytes(&self) -> [u8; 3] {
        self.bytes
    }

    fn to_oui_unicast(first_byte: u8) -> u8 {
        // Locally administered (second-lowest bit set), not multicast
        // (lowest bit clear).
        (first_byte | 0b0000_0010) & 0b1111_1110
    }
}

impl fmt::Display for OuiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:02X}:{:02X}", self.bytes[0], self.bytes[1], self.bytes[2])
    }
}

/// A six-byte Ethernet (MAC) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthernetAddress {
    bytes: [u8; 6],
}

impl EthernetAddress {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> [u8; 6] {
        self.bytes
    }

    /// Generate a random address, optionally pinned to `oui_prefix`'s first
    /// three bytes.
    pub fn generate(rng: &mut impl Rng, oui_prefix: Option<OuiPrefix>) -> Self {
        let mut bytes = [0u8; 6];
        let first_index = if let Some(prefix) = oui_prefix {
            bytes[..3].copy_from_slice(&prefix.bytes());
            3
        } else {
            0
        };
        for byte in &mut bytes[first_index..] {
            *byte = rng.r#gen();
        }
        bytes[0] = OuiPrefix::to_oui_unicast(bytes[0]);
        Self { bytes }
    }

    #[must_use]
    pub fn has_oui_prefix(&self, oui_prefix: OuiPrefix) -> bool {
        self.bytes[..3] == oui_prefix.bytes()
    }
}

impl fmt::Display for EthernetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// A link-local IPv4 address, generated or read back from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IpAddress {
    addr: Ipv4Addr,
}

impl IpAddress {
    #[must_use]
    pub fn from_addr(addr: Ipv4Addr) -> Self {
        Self { addr }
    }

    #[must_use]
    pub fn as_addr(&self) -> Ipv4Addr {
        self.addr
    }

    #[must_use]
    pub fn octets(&self) -> [u8; 4] {
        self.addr.octets()
    }

    /// Generate a link-local address in `169.254.1.0`..=`169.254.254.255`,
    /// per RFC 3927. `169.254.0.0/24` and `169.254.255.0/24` are reserved
    /// and excluded.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let third = rng.gen_range(1..=254u8);
        let fourth = rng.gen_range(0..=255u8);
        Self {
            addr: Ipv4Addr::new(169, 254, third, fourth),
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// A generated Ethernet/IPv4 address pair, the unit persisted to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Addresses {
    pub ethernet: EthernetAddress,
    pub ip: IpAddress,
}

impl Addresses {
    /// Generate both addresses from scratch.
    pub fn generate(rng: &mut impl Rng, oui_prefix: Option<OuiPrefix>) -> Self {
        Self {
            ethernet: EthernetAddress::generate(rng, oui_prefix),
            ip: IpAddress::generate(rng),
        }
    }

    /// Load from `store`, verifying the stored Ethernet address both is
    /// unicast and (if `oui_prefix` is given) carries that prefix.
    pub fn load(store: &dyn AddressStore, oui_prefix: Option<OuiPrefix>) -> Result<Self> {
        let addresses = store.read()?;
        if addresses.ethernet.as_bytes()[0] & 0b0000_0001 != 0 {
            return Err(Error::address_storage(
                "stored Ethernet address is not unicast",
            ));
        }
        if let Some(prefix) = oui_prefix {
            if !addresses.ethernet.has_oui_prefix(prefix) {
                return Err(Error::address_storage("stored OUI prefix mismatch"));
            }
        }
        Ok(addresses)
    }

    /// Persist to `store`.
    pub fn save(&self, store: &dyn AddressStore) -> Result<()> {
        store.write(self)
    }
}

impl fmt::Display for Addresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ethernet={} ip={}", self.ethernet, self.ip)
    }
}

/// Durable storage for a device's generated [`Addresses`].
///
/// The original embedded implementation backs this with a tagged EEPROM
/// entry, so that a freshly booted device reuses the same addresses instead
/// of generating new ones every time. Any byte-oriented store works here —
/// a file, a key-value row, a block device region — as long as it can round
/// trip the fixed 10-byte (6 + 4) record.
pub trait AddressStore {
    /// Read back a previously written address pair.
    ///
    /// Returns [`Error::AddressStorage`] if no entry exists or it fails to
    /// parse.
    fn read(&self) -> Result<Addresses>;

    /// Write the address pair, overwriting any previous entry.
    fn write(&self, addresses: &Addresses) -> Result<()>;
}

/// An in-memory [`AddressStore`], useful for tests and for devices with no
/// durable storage at all.
#[derive(Debug, Default)]
pub struct MemoryAddressStore {
    slot: std::sync::Mutex<Option<Addresses>>,
}

impl AddressStore for MemoryAddressStore {
    fn read(&self) -> Result<Addresses> {
        self.slot
            .lock()
            .unwrap()
            .ok_or_else(|| Error::address_storage("no entry stored"))
    }

    fn write(&self, addresses: &Addresses) -> Result<()> {
        *self.slot.lock().unwrap() = Some(*addresses);
        Ok(())
    }
}
