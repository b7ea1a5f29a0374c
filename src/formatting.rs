//! Text formatting for terminal output

use crate::core::profiles::{Profile, ProfileStore};
use std::fmt::Write;

/// Formats the store as a fixed-width table, one profile per row
pub fn format_profile_table(store: &ProfileStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<15} {:<30} {:<20} Comment", "Profile", "IPs", "Ports");
    let _ = writeln!(out, "{}", "-".repeat(90));

    for profile in store {
        let _ = writeln!(
            out,
            "{:<15} {:<30} {:<20} {}",
            profile.name,
            profile.ips.join(", "),
            profile.ports.join(", "),
            profile.comment
        );
    }

    out
}

/// Formats one profile as a short multi-line summary
pub fn format_profile_details(profile: &Profile) -> String {
    format!(
        "Profile: {}\nIPs: {}\nPorts: {}\nComment: {}\n",
        profile.name,
        profile.ips.join(", "),
        profile.ports.join(", "),
        profile.comment
    )
}

/// Line diff between two texts with `- `/`+ `/`  ` prefixes.
///
/// Returns `None` when both texts are identical.
pub fn format_diff(old_text: &str, new_text: &str) -> Option<String> {
    if old_text == new_text {
        return None;
    }

    let diff = similar::TextDiff::from_lines(old_text, new_text);
    let mut result = String::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            similar::ChangeTag::Delete => "- ",
            similar::ChangeTag::Insert => "+ ",
            similar::ChangeTag::Equal => "  ",
        };
        // Display adds the newline a final line may lack
        let _ = write!(result, "{sign}{change}");
    }

    Some(result)
}
