//! IPv4 address/mask normalization.
//!
//! FortiOS answers address fields as `10.0.0.0 255.255.255.0` while users
//! commonly write `10.0.0.0/24`. Reading a value back in the notation the
//! prior state used keeps the two from showing up as a perpetual diff.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

/// The two notations FortiOS accepts for an address with a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressNotation {
    /// `10.0.0.0/24`
    Cidr,
    /// `10.0.0.0 255.255.255.0`
    DottedMask,
}

/// Work out which notation `value` is written in.
pub fn notation(value: &str) -> Option<AddressNotation> {
    let value = value.trim();
    if value.contains('/') {
        Some(AddressNotation::Cidr)
    } else if value.split_whitespace().count() == 2 {
        Some(AddressNotation::DottedMask)
    } else {
        None
    }
}

/// Parse either notation into a network, keeping host bits as written.
pub fn parse(value: &str) -> Option<Ipv4Network> {
    match notation(value)? {
        AddressNotation::Cidr => {
            let (addr, prefix) = value.trim().split_once('/')?;
            let ip: Ipv4Addr = addr.trim().parse().ok()?;
            // FortiOS also accepts `10.0.0.0/255.255.255.0`.
            match prefix.trim().parse::<u8>() {
                Ok(len) => Ipv4Network::new(ip, len).ok(),
                Err(_) => {
                    let mask: Ipv4Addr = prefix.trim().parse().ok()?;
                    Ipv4Network::with_netmask(ip, mask).ok()
                }
            }
        }
        AddressNotation::DottedMask => {
            let mut parts = value.split_whitespace();
            let ip: Ipv4Addr = parts.next()?.parse().ok()?;
            let mask: Ipv4Addr = parts.next()?.parse().ok()?;
            Ipv4Network::with_netmask(ip, mask).ok()
        }
    }
}

/// Render a network as `a.b.c.d/n`.
pub fn to_cidr(network: &Ipv4Network) -> String {
    format!("{}/{}", network.ip(), network.prefix())
}

/// Render a network as `a.b.c.d m.m.m.m`.
pub fn to_dotted_mask(network: &Ipv4Network) -> String {
    format!("{} {}", network.ip(), network.mask())
}

/// Render `incoming` in the notation `prior` is written in.
///
/// Anything that does not parse on either side passes through unchanged.
pub fn normalize_like(prior: &str, incoming: &str) -> String {
    let Some(target) = notation(prior) else {
        return incoming.to_string();
    };
    let Some(network) = parse(incoming) else {
        return incoming.to_string();
    };
    match target {
        AddressNotation::Cidr => to_cidr(&network),
        AddressNotation::DottedMask => to_dotted_mask(&network),
    }
}
