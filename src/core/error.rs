use thiserror::Error;

/// Core error types for nftprof
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// nftables command execution failed
    #[error("nftables error: {message}")]
    Nftables {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    /// Input validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// Profile store operation failed
    #[error(transparent)]
    Profile(#[from] crate::core::profiles::ProfileError),

    /// Privilege escalation failed
    #[error("Elevation error: {0}")]
    Elevation(#[from] crate::elevation::ElevationError),

    /// Internal logic error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Builds a validation error for the named input field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
    pub help_url: Option<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
            help_url: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, url: impl Into<String>) -> Self {
        self.help_url = Some(url.into());
        self
    }
}

impl std::fmt::Display for ErrorTranslation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message)?;
        for suggestion in &self.suggestions {
            write!(f, "\n  - {suggestion}")?;
        }
        if let Some(ref url) = self.help_url {
            write!(f, "\n  See: {url}")?;
        }
        Ok(())
    }
}

/// Database of nftables error patterns and their translations
pub struct NftablesErrorPattern;

impl NftablesErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        // Permission errors
        if lower.contains("permission denied") || lower.contains("operation not permitted") {
            return ErrorTranslation::new("Insufficient permissions to load the ruleset")
                .with_suggestion("Run nftprof from an account allowed to use sudo, run0 or pkexec")
                .with_suggestion("Or force a method: NFTPROF_ELEVATION_METHOD=sudo")
                .with_suggestion("Check if CAP_NET_ADMIN capability is available")
                .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Quick_reference-nftables_in_10_minutes");
        }

        // Cache initialization failed (common with insufficient permissions)
        if lower.contains("cache initialization failed") {
            return ErrorTranslation::new(
                "Failed to initialize nftables cache - insufficient privileges",
            )
            .with_suggestion("This usually means nft ran without elevated privileges")
            .with_suggestion("Check that NFTPROF_NO_ELEVATION is not set outside of tests")
            .with_help("https://wiki.archlinux.org/title/Nftables");
        }

        // Missing nftables
        if lower.contains("no such file") || lower.contains("command not found") {
            return ErrorTranslation::new("nftables is not installed or not found in PATH")
                .with_suggestion("Install nftables: sudo apt install nftables  (Debian/Ubuntu)")
                .with_suggestion("Or: sudo dnf install nftables  (Fedora/RHEL)")
                .with_suggestion("Or: sudo pacman -S nftables  (Arch)")
                .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Main_Page");
        }

        // Syntax errors
        if lower.contains("could not process rule") || lower.contains("syntax error") {
            return ErrorTranslation::new("Invalid ruleset syntax")
                .with_suggestion("Run `nftprof diff` to see how the file differs from the generated one")
                .with_suggestion("Verify port numbers are between 1 and 65535")
                .with_suggestion("Ensure IP addresses and network masks are valid")
                .with_help(
                    "https://wiki.nftables.org/wiki-nftables/index.php/Simple_rule_management",
                );
        }

        // IPv6 entries end up in the ipv4_addr sets
        if lower.contains("ipv4 address") || lower.contains("ipv6 address") {
            return ErrorTranslation::new("Address family does not match the set type")
                .with_suggestion("Profile address sets are declared as ipv4_addr")
                .with_suggestion("Remove IPv6 entries with `nftprof edit <profile> remove-ip <addr>`");
        }

        // Empty sets
        if lower.contains("elements") && lower.contains("unexpected '}'") {
            return ErrorTranslation::new("A profile set has no elements")
                .with_suggestion("Add at least one IP and one port to every profile")
                .with_suggestion("Or remove unused profiles with `nftprof remove <profile>`");
        }

        // Port range errors
        if lower.contains("invalid port") || (lower.contains("port") && lower.contains("range")) {
            return ErrorTranslation::new("Invalid port")
                .with_suggestion("Port numbers must be between 1 and 65535");
        }

        // Invalid IP address
        if lower.contains("invalid")
            && (lower.contains("ip") || lower.contains("address") || lower.contains("network"))
        {
            return ErrorTranslation::new("Invalid IP address or network")
                .with_suggestion("Use proper IP format: 192.168.1.1 or 192.168.1.0/24")
                .with_suggestion("Check CIDR notation: /24 for IPv4")
                .with_help("https://en.wikipedia.org/wiki/Classless_Inter-Domain_Routing");
        }

        // Resource busy
        if lower.contains("resource busy") || lower.contains("device or resource busy") {
            return ErrorTranslation::new("Firewall resource is busy")
                .with_suggestion("Another process may be modifying nftables")
                .with_suggestion("Wait a moment and try again")
                .with_suggestion(
                    "Check for conflicting firewall managers: sudo systemctl status firewalld ufw",
                );
        }

        // Netlink errors
        if lower.contains("netlink") {
            return ErrorTranslation::new("Communication error with kernel netlink interface")
                .with_suggestion("Check kernel modules: lsmod | grep nf_tables")
                .with_suggestion("Load nf_tables module: sudo modprobe nf_tables")
                .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Troubleshooting");
        }

        // Generic fallback
        ErrorTranslation::new(format!("Firewall error: {}", msg.trim()))
            .with_suggestion("Verify nftables is working: sudo nft list ruleset")
            .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Troubleshooting")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nftables_missing_command() {
        let translation = NftablesErrorPattern::match_error("command not found: nft");
        assert!(translation.user_message.contains("not installed"));
        assert!(translation.suggestions.len() >= 3); // Multiple distro options
    }

    #[test]
    fn test_nftables_syntax_error() {
        let translation =
            NftablesErrorPattern::match_error("/etc/nftables.conf:12:1-2: Error: syntax error");
        assert!(translation.user_message.contains("Invalid"));
        assert!(
            translation
                .suggestions
                .iter()
                .any(|s| s.contains("nftprof diff"))
        );
    }

    #[test]
    fn test_permission_error() {
        let translation = NftablesErrorPattern::match_error("Error: Operation not permitted");
        assert!(translation.user_message.contains("permissions"));
        assert!(translation.help_url.is_some());
    }

    #[test]
    fn test_address_family_mismatch() {
        let translation =
            NftablesErrorPattern::match_error("Error: Could not parse IPv4 address: 2001:db8::/32");
        assert!(translation.user_message.contains("Address family"));
    }

    #[test]
    fn test_fallback_keeps_message() {
        let translation = NftablesErrorPattern::match_error("  something odd happened\n");
        assert_eq!(translation.user_message, "Firewall error: something odd happened");
    }

    #[test]
    fn test_display_lists_suggestions() {
        let text = ErrorTranslation::new("Boom")
            .with_suggestion("first")
            .with_help("https://example.org")
            .to_string();
        assert_eq!(text, "Boom\n  - first\n  See: https://example.org");
    }

    #[test]
    fn test_validation_constructor() {
        let err = Error::validation("ports", "no numeric port");
        assert_eq!(
            err.to_string(),
            "Validation error in ports: no numeric port"
        );
    }
}
