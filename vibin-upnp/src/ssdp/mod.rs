//! SSDP (Simple Service Discovery Protocol) control-point support: sending
//! M-SEARCH requests and parsing the Alive/ByeBye/SearchResponse messages
//! that come back. vibin never acts as an SSDP device, only a client.

mod client;

pub use client::{SsdpClient, SsdpEvent};

/// SSDP multicast group address.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP well-known port.
pub const SSDP_PORT: u16 = 1900;

/// Default `CACHE-CONTROL: max-age` assumed when a device omits it.
pub const DEFAULT_MAX_AGE: u32 = 1800;
