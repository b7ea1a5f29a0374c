//! nftables.conf generation
//!
//! Turns a [`ProfileStore`] into the complete text loaded by `nft -f`:
//!
//! - `flush ruleset`, then a single `table inet filter`
//! - one address set and one port set per profile
//! - an `input` chain with fixed base rules, one accept rule per profile that
//!   has both addresses and ports, and a log + drop tail
//! - pass-through `output` and `forward` chain stubs
//!
//! The output is deterministic for a given store; profiles are written in
//! store order.

use crate::core::profiles::{Profile, ProfileStore};
use crate::validators::sanitize_comment;
use std::fmt::Write;

/// Prefix of the per-profile address set name
pub const IP_SET_PREFIX: &str = "allowed_ips_";

/// Prefix of the per-profile TCP port set name
pub const PORT_SET_PREFIX: &str = "allowed_tcp_ports_";

/// Name of the address set for a profile
pub fn ip_set_name(profile: &str) -> String {
    format!("{IP_SET_PREFIX}{profile}")
}

/// Name of the port set for a profile
pub fn port_set_name(profile: &str) -> String {
    format!("{PORT_SET_PREFIX}{profile}")
}

impl ProfileStore {
    /// Generates the complete nftables.conf text for this store.
    pub fn to_nft_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "#!/usr/sbin/nft -f\n");
        let _ = writeln!(out, "flush ruleset\n");
        let _ = writeln!(out, "table inet filter {{");

        for profile in self {
            write_profile_sets(&mut out, profile);
        }

        let _ = writeln!(out, "    chain input {{");
        let _ = writeln!(
            out,
            "        type filter hook input priority filter; policy drop;"
        );
        write_base_rules(&mut out);

        for profile in self.iter().filter(|p| p.has_rule()) {
            let _ = writeln!(out, "        {}", profile_rule(profile));
        }

        let _ = writeln!(
            out,
            "\n        log prefix \"nftables-drop: \" flags all counter comment \"Log dropped packets\""
        );
        let _ = writeln!(out, "        drop comment \"Drop everything else\"");
        let _ = writeln!(out, "    }}");

        let _ = writeln!(out, "    chain output {{");
        let _ = writeln!(
            out,
            "        type filter hook output priority filter; policy accept;"
        );
        let _ = writeln!(out, "    }}");

        let _ = writeln!(out, "    chain forward {{");
        let _ = writeln!(
            out,
            "        type filter hook forward priority filter; policy drop;"
        );
        let _ = writeln!(out, "    }}");

        let _ = writeln!(out, "}}");

        out
    }
}

fn write_profile_sets(out: &mut String, profile: &Profile) {
    let _ = writeln!(out, "    set {} {{", ip_set_name(&profile.name));
    let _ = writeln!(out, "        type ipv4_addr");
    let _ = writeln!(out, "        flags interval");
    let _ = writeln!(out, "        elements = {{ {} }}", profile.ips.join(", "));
    let _ = writeln!(out, "    }}\n");

    let _ = writeln!(out, "    set {} {{", port_set_name(&profile.name));
    let _ = writeln!(out, "        type inet_service");
    let _ = writeln!(out, "        elements = {{ {} }}", profile.ports.join(", "));
    let _ = writeln!(out, "    }}\n");
}

fn write_base_rules(out: &mut String) {
    let _ = writeln!(out, "        iif \"lo\" accept comment \"Loopback\"");
    let _ = writeln!(
        out,
        "        ct state established,related accept comment \"Established connections\""
    );
    let _ = writeln!(out, "        ip protocol icmp accept comment \"Ping IPv4\"");
    let _ = writeln!(
        out,
        "        ip6 nexthdr ipv6-icmp accept comment \"Ping IPv6\"\n"
    );
}

/// The input-chain accept rule for a profile (without indentation)
pub fn profile_rule(profile: &Profile) -> String {
    format!(
        "ip saddr @{} tcp dport @{} accept comment \"{}\"",
        ip_set_name(&profile.name),
        port_set_name(&profile.name),
        sanitize_comment(&profile.comment)
    )
}
