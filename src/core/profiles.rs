//! Firewall profile store
//!
//! A profile is a named bundle of allowed source addresses, allowed TCP
//! destination ports and a comment. The store keeps profiles in insertion
//! order so the generated nftables.conf stays stable across edits.
//!
//! Operations here only mutate memory. The caller loads a store, runs one
//! operation, then persists it (see [`crate::core::conf_file`]).

use crate::validators;
use std::fmt;

/// Error type for profile operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    #[error("Profile already exists: {0}")]
    AlreadyExists(String),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("No profiles registered")]
    Empty,
}

/// A named set of allowed source addresses and TCP ports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// IPv4/IPv6 addresses or CIDR networks, as typed by the operator
    pub ips: Vec<String>,
    /// Numeric port strings
    pub ports: Vec<String>,
    pub comment: String,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        ips: Vec<String>,
        ports: Vec<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ips,
            ports,
            comment: comment.into(),
        }
    }

    /// Whether the profile produces a live accept rule.
    ///
    /// Sets are always emitted; the rule needs both an address and a port.
    pub fn has_rule(&self) -> bool {
        !self.ips.is_empty() && !self.ports.is_empty()
    }

    /// Adds an address, returning `false` if it was already present.
    pub fn add_ip(&mut self, ip: &str) -> bool {
        if self.ips.iter().any(|existing| existing == ip) {
            return false;
        }
        self.ips.push(ip.to_string());
        true
    }

    /// Removes an address, returning `false` if it was not present.
    pub fn remove_ip(&mut self, ip: &str) -> bool {
        let before = self.ips.len();
        self.ips.retain(|existing| existing != ip);
        self.ips.len() != before
    }

    /// Adds ports, skipping those already present. Returns how many were added.
    pub fn add_ports<S: AsRef<str>>(&mut self, ports: &[S]) -> usize {
        let mut added = 0;
        for port in ports {
            let port = port.as_ref();
            if !self.ports.iter().any(|existing| existing == port) {
                self.ports.push(port.to_string());
                added += 1;
            }
        }
        added
    }

    /// Removes a port, returning `false` if it was not present.
    pub fn remove_port(&mut self, port: &str) -> bool {
        let before = self.ports.len();
        self.ports.retain(|existing| existing != port);
        self.ports.len() != before
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }
}

/// One incremental change to an existing profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEdit {
    AddIp(String),
    RemoveIp(String),
    AddPorts(Vec<String>),
    RemovePort(String),
    SetComment(String),
}

impl fmt::Display for ProfileEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileEdit::AddIp(ip) => write!(f, "add IP {ip}"),
            ProfileEdit::RemoveIp(ip) => write!(f, "remove IP {ip}"),
            ProfileEdit::AddPorts(ports) => write!(f, "add ports {}", ports.join(",")),
            ProfileEdit::RemovePort(port) => write!(f, "remove port {port}"),
            ProfileEdit::SetComment(_) => write!(f, "set comment"),
        }
    }
}

/// What an edit actually did, for reporting back to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    IpAdded,
    IpAlreadyPresent,
    IpRemoved,
    NoIpsToRemove,
    IpNotFound,
    PortsAdded(usize),
    PortRemoved,
    NoPortsToRemove,
    PortNotFound,
    CommentUpdated,
}

impl EditOutcome {
    /// Whether the profile changed and needs persisting
    pub fn changed(self) -> bool {
        matches!(
            self,
            EditOutcome::IpAdded
                | EditOutcome::IpRemoved
                | EditOutcome::PortRemoved
                | EditOutcome::CommentUpdated
        ) || matches!(self, EditOutcome::PortsAdded(n) if n > 0)
    }

    /// Message shown to the operator
    pub fn message(self) -> String {
        match self {
            EditOutcome::IpAdded => "IP added.".to_string(),
            EditOutcome::IpAlreadyPresent => "IP already exists in the profile.".to_string(),
            EditOutcome::IpRemoved => "IP removed.".to_string(),
            EditOutcome::NoIpsToRemove => "No IPs to remove.".to_string(),
            EditOutcome::IpNotFound => "IP not found in the profile.".to_string(),
            EditOutcome::PortsAdded(n) => format!("{n} port(s) added."),
            EditOutcome::PortRemoved => "Port removed.".to_string(),
            EditOutcome::NoPortsToRemove => "No ports to remove.".to_string(),
            EditOutcome::PortNotFound => "Port not found in the profile.".to_string(),
            EditOutcome::CommentUpdated => "Comment updated.".to_string(),
        }
    }
}

/// Ordered mapping from profile name to [`Profile`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileStore {
    profiles: Vec<Profile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    /// Returns the named profile, appending an empty one if missing.
    ///
    /// Used by the parser, which discovers a profile piece by piece.
    pub(crate) fn entry(&mut self, name: &str) -> &mut Profile {
        let index = match self.profiles.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.profiles.push(Profile {
                    name: name.to_string(),
                    ..Profile::default()
                });
                self.profiles.len() - 1
            }
        };
        &mut self.profiles[index]
    }

    /// Adds a new profile.
    ///
    /// Repeated addresses and ports keep only their first occurrence, as the
    /// incremental edits do.
    ///
    /// # Errors
    ///
    /// Returns `Err` (and leaves the store unchanged) if the name is empty,
    /// contains characters that cannot form a set identifier, or is taken.
    pub fn add_profile(
        &mut self,
        name: &str,
        ips: Vec<String>,
        ports: Vec<String>,
        comment: &str,
    ) -> Result<&Profile, ProfileError> {
        validators::validate_profile_name(name).map_err(ProfileError::InvalidName)?;

        if self.contains(name) {
            return Err(ProfileError::AlreadyExists(name.to_string()));
        }

        let mut profile = Profile::new(name, Vec::new(), Vec::new(), comment);
        for ip in &ips {
            profile.add_ip(ip);
        }
        profile.add_ports(&ports);

        self.profiles.push(profile);
        Ok(&self.profiles[self.profiles.len() - 1])
    }

    /// Removes a profile and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Empty`] on an empty store and
    /// [`ProfileError::NotFound`] for an unknown name. Both leave the store
    /// unchanged; callers report them as a message, not a failure.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile, ProfileError> {
        if self.profiles.is_empty() {
            return Err(ProfileError::Empty);
        }

        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;

        Ok(self.profiles.remove(index))
    }

    /// Applies one incremental edit to an existing profile.
    ///
    /// Values are expected to be validated already (see [`crate::validators`]).
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Empty`] or [`ProfileError::NotFound`] when there
    /// is no such profile.
    pub fn edit_profile(
        &mut self,
        name: &str,
        edit: ProfileEdit,
    ) -> Result<EditOutcome, ProfileError> {
        if self.profiles.is_empty() {
            return Err(ProfileError::Empty);
        }

        let profile = self
            .get_mut(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;

        let outcome = match edit {
            ProfileEdit::AddIp(ip) => {
                if profile.add_ip(&ip) {
                    EditOutcome::IpAdded
                } else {
                    EditOutcome::IpAlreadyPresent
                }
            }
            ProfileEdit::RemoveIp(ip) => {
                if profile.ips.is_empty() {
                    EditOutcome::NoIpsToRemove
                } else if profile.remove_ip(&ip) {
                    EditOutcome::IpRemoved
                } else {
                    EditOutcome::IpNotFound
                }
            }
            ProfileEdit::AddPorts(ports) => EditOutcome::PortsAdded(profile.add_ports(&ports)),
            ProfileEdit::RemovePort(port) => {
                if profile.ports.is_empty() {
                    EditOutcome::NoPortsToRemove
                } else if profile.remove_port(&port) {
                    EditOutcome::PortRemoved
                } else {
                    EditOutcome::PortNotFound
                }
            }
            ProfileEdit::SetComment(comment) => {
                profile.set_comment(comment);
                EditOutcome::CommentUpdated
            }
        };

        Ok(outcome)
    }
}

impl<'a> IntoIterator for &'a ProfileStore {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}
