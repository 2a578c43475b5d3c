use std::net::IpAddr;

use ipnet::IpNet;

use crate::config::{parse_local_nets, AnonymizationConfig};
use crate::error::Result;

/// The fixed private-range set from RFC 1918 / loopback / link-local, enabled by
/// `anonymize_private`. Parsed once at construction; never mutated.
const PRIVATE_BLOCKS: &[&str] = &[
    "127.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
    "fe80::/10",
];

/// Immutable CIDR membership policy, shared (read-only, no lock needed) across every
/// worker pipeline.
#[derive(Debug, Clone)]
pub struct PolicySet {
    anonymize: bool,
    anonymize_private: bool,
    private_blocks: Vec<IpNet>,
    local_blocks: Vec<IpNet>,
}

impl PolicySet {
    pub fn new(anonymize: bool, anonymize_private: bool, local_blocks: Vec<IpNet>) -> Self {
        let private_blocks = PRIVATE_BLOCKS
            .iter()
            .map(|s| s.parse().expect("PRIVATE_BLOCKS entries are valid CIDR literals"))
            .collect();
        PolicySet {
            anonymize,
            anonymize_private,
            private_blocks,
            local_blocks,
        }
    }

    pub fn from_config(cfg: &AnonymizationConfig) -> Result<Self> {
        let local_blocks = parse_local_nets(&cfg.local_nets)?;
        Ok(PolicySet::new(cfg.anonymize, cfg.anonymize_private, local_blocks))
    }

    pub fn has_local(&self) -> bool {
        !self.local_blocks.is_empty()
    }

    pub fn is_private(&self, ip: IpAddr) -> bool {
        self.private_blocks.iter().any(|net| net.contains(&ip))
    }

    pub fn is_local(&self, ip: IpAddr) -> bool {
        self.local_blocks.iter().any(|net| net.contains(&ip))
    }

    /// The master `anonymize` switch gates everything: when false, no address is ever
    /// substituted, regardless of `anonymize_private` or `LocalBlocks` membership.
    pub fn should_anonymize(&self, ip: IpAddr) -> bool {
        self.anonymize
            && ((self.anonymize_private && self.is_private(ip))
                || (self.has_local() && self.is_local(ip)))
    }

    /// Both-ends-local traffic is suppressed entirely; it is never emitted.
    pub fn should_drop(&self, src: IpAddr, dst: IpAddr) -> bool {
        self.has_local() && self.is_local(src) && self.is_local(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(local: &[&str]) -> PolicySet {
        let nets = local.iter().map(|s| s.parse().unwrap()).collect();
        PolicySet::new(true, true, nets)
    }

    #[test]
    fn private_blocks_cover_rfc1918_and_loopback() {
        let p = policy(&[]);
        assert!(p.is_private("10.1.2.3".parse().unwrap()));
        assert!(p.is_private("172.16.0.1".parse().unwrap()));
        assert!(p.is_private("192.168.1.1".parse().unwrap()));
        assert!(p.is_private("127.0.0.1".parse().unwrap()));
        assert!(p.is_private("::1".parse().unwrap()));
        assert!(p.is_private("fe80::1".parse().unwrap()));
        assert!(!p.is_private("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn should_anonymize_respects_anonymize_private_flag() {
        let mut p = policy(&[]);
        p.anonymize_private = false;
        assert!(!p.should_anonymize("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn master_switch_overrides_every_other_flag() {
        let mut p = policy(&["203.0.113.0/24"]);
        p.anonymize = false;
        assert!(!p.should_anonymize("10.0.0.1".parse().unwrap()));
        assert!(!p.should_anonymize("203.0.113.5".parse().unwrap()));
    }

    #[test]
    fn local_blocks_trigger_should_anonymize_even_when_not_private() {
        let p = policy(&["203.0.113.0/24"]);
        assert!(p.should_anonymize("203.0.113.5".parse().unwrap()));
        assert!(!p.should_anonymize("198.51.100.5".parse().unwrap()));
    }

    #[test]
    fn drop_requires_both_endpoints_local() {
        let p = policy(&["10.0.0.0/8"]);
        assert!(p.should_drop("10.0.0.5".parse().unwrap(), "10.0.0.7".parse().unwrap()));
        assert!(!p.should_drop("10.0.0.5".parse().unwrap(), "8.8.8.8".parse().unwrap()));
        assert!(!p.should_drop("8.8.8.8".parse().unwrap(), "8.8.4.4".parse().unwrap()));
    }

    #[test]
    fn no_local_blocks_means_never_drop() {
        let p = policy(&[]);
        assert!(!p.has_local());
        assert!(!p.should_drop("10.0.0.5".parse().unwrap(), "10.0.0.7".parse().unwrap()));
    }
}
