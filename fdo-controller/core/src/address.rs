use crate::{k8s::onboarding::Address, Error, Result};
use std::net::IpAddr;

/// A host reachable either by DNS name or by IP address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostAddress {
    Dns(String),
    Ip(IpAddr),
}

impl HostAddress {
    /// Resolves a pair of mutually exclusive address fields. Empty strings
    /// count as unset.
    ///
    /// `target` names the thing being addressed in error messages.
    pub fn from_fields(target: &'static str, dns: Option<&str>, ip: Option<&str>) -> Result<Self> {
        let dns = dns.map(str::trim).filter(|s| !s.is_empty());
        let ip = ip.map(str::trim).filter(|s| !s.is_empty());
        match (dns, ip) {
            (Some(_), Some(_)) => Err(Error::BothAddresses(target)),
            (None, None) => Err(Error::MissingAddress(target)),
            (Some(dns), None) => Ok(Self::Dns(dns.to_string())),
            (None, Some(ip)) => ip
                .parse()
                .map(Self::Ip)
                .map_err(|_| Error::InvalidIpAddress {
                    target,
                    addr: ip.to_string(),
                }),
        }
    }

    pub fn dns_name(&self) -> Option<&str> {
        match self {
            Self::Dns(name) => Some(name),
            Self::Ip(_) => None,
        }
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        match self {
            Self::Ip(ip) => Some(*ip),
            Self::Dns(_) => None,
        }
    }
}

impl TryFrom<&Address> for HostAddress {
    type Error = Error;

    fn try_from(addr: &Address) -> Result<Self> {
        Self::from_fields(
            "owner address",
            addr.dns_name.as_deref(),
            addr.ip_address.as_deref(),
        )
    }
}
