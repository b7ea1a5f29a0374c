//! Input validation and sanitization functions for nftprof
//!
//! Every value that ends up inside the generated nftables.conf passes through
//! here first: profile names become set identifiers, addresses and ports become
//! set elements, and comments are embedded in a quoted rule comment.

use ipnetwork::IpNetwork;

/// Maximum profile name length.
///
/// nftables set names are limited to 255 bytes; the longest prefix we add is
/// `allowed_tcp_ports_`, so 64 keeps every identifier well inside that.
pub const MAX_PROFILE_NAME_LEN: usize = 64;

/// Validates a profile name.
///
/// Constraints:
/// - Non-empty.
/// - ASCII letters, digits and underscores only: the name is spliced into the
///   set identifiers `allowed_ips_<name>` and `allowed_tcp_ports_<name>`, and
///   the parser only recovers word-character identifiers.
/// - Max 64 chars.
///
/// # Errors
///
/// Returns `Err` with a user-facing message when a constraint is violated.
pub fn validate_profile_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Profile name cannot be empty".to_string());
    }

    if name.len() > MAX_PROFILE_NAME_LEN {
        return Err(format!(
            "Profile name too long (max {MAX_PROFILE_NAME_LEN} chars)"
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Profile name contains invalid characters (use only a-z, 0-9, _)".to_string());
    }

    Ok(())
}

/// Validates an IP address or CIDR network.
///
/// Accepts a bare IPv4/IPv6 address or a network in CIDR notation. A CIDR whose
/// host bits are set (`192.168.1.5/24`) is rejected: it is almost always a typo
/// for either the host or the network.
///
/// Returns the trimmed input unchanged so the config keeps what the operator typed.
///
/// # Errors
///
/// Returns `Err` if the input is empty or does not parse.
///
/// # Examples
///
/// ```
/// use nftprof::validators::validate_ip_or_network;
///
/// assert!(validate_ip_or_network("192.168.1.0/24").is_ok());
/// assert!(validate_ip_or_network("999.999.999.999").is_err());
/// ```
pub fn validate_ip_or_network(input: &str) -> Result<String, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("IP address or network is required".to_string());
    }

    let network: IpNetwork = input
        .parse()
        .map_err(|_| format!("Invalid IP address or network: {input}"))?;

    if input.contains('/') && network.network() != network.ip() {
        return Err(format!(
            "{input} has host bits set (did you mean {}/{}?)",
            network.network(),
            network.prefix()
        ));
    }

    Ok(input.to_string())
}

/// Parses a comma-separated port list.
///
/// Tokens are trimmed; tokens that are not purely numeric are dropped
/// silently. The input is rejected only when no numeric token remains.
///
/// # Errors
///
/// Returns `Err` if the input is empty or holds no numeric token.
///
/// # Examples
///
/// ```
/// use nftprof::validators::parse_ports;
///
/// assert_eq!(parse_ports("22,80,abc").unwrap(), vec!["22", "80"]);
/// assert!(parse_ports("abc,def").is_err());
/// ```
pub fn parse_ports(input: &str) -> Result<Vec<String>, String> {
    if input.trim().is_empty() {
        return Err("At least one port is required".to_string());
    }

    let ports: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .map(String::from)
        .collect();

    if ports.is_empty() {
        return Err("Provide at least one valid port (e.g. 22,80,443)".to_string());
    }

    Ok(ports)
}

/// Makes a comment safe for the quoted `comment "..."` field of a rule.
///
/// Double quotes would terminate the field early, so they become single quotes.
/// Newlines would split the rule across lines and are flattened to spaces.
pub fn sanitize_comment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Checks if a port is well-known and returns informational message.
///
/// This is informational only and does not block saving.
pub fn check_well_known_port(port: &str) -> Option<String> {
    let port: u32 = port.parse().ok()?;
    let name = match port {
        0 => return Some("Port 0 is reserved and will be rejected by nft".to_string()),
        22 => "SSH",
        80 => "HTTP",
        443 => "HTTPS",
        53 => "DNS",
        25 => "SMTP",
        21 => "FTP",
        3389 => "RDP",
        p if p > 65_535 => return Some(format!("Port {p} is out of range (max 65535)")),
        _ => return None,
    };
    Some(format!("Port {port}: {name}"))
}

/// Checks if an address is IPv6 and returns an informational warning.
///
/// Profile address sets are declared `ipv4_addr`, so nft refuses IPv6 entries
/// at load time even though they validate here.
pub fn check_address_family(input: &str) -> Option<String> {
    match input.parse::<IpNetwork>() {
        Ok(IpNetwork::V6(_)) => Some(format!(
            "{input} is IPv6; profile address sets are ipv4_addr and nft will reject it on apply"
        )),
        _ => None,
    }
}
