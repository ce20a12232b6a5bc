//! Static team roster: display names mapped to profiles and identities.

use crate::bot::intent::PROFILE_MARKER;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// A team member's profile, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    /// Display name, shown on the login keyboard.
    pub name: String,
    /// Telegram user ID. The only proof of owning this profile.
    pub identity: i64,
    pub team_id: String,
    pub role: String,
    pub login: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Errors raised while building the roster.
#[derive(Debug, PartialEq, Eq)]
pub enum RosterError {
    Empty,
    BlankName,
    /// Leading or trailing whitespace; the profile button could never match.
    PaddedName(String),
    /// Starts with the profile-button marker.
    MarkerName(String),
    DuplicateName(String),
    /// Two profiles claim the same Telegram user.
    DuplicateIdentity { identity: i64, first: String, second: String },
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "roster must contain at least one profile"),
            Self::BlankName => write!(f, "roster contains a profile with a blank name"),
            Self::PaddedName(name) => {
                write!(f, "roster name '{}' has leading or trailing whitespace", name)
            }
            Self::MarkerName(name) => {
                write!(f, "roster name '{}' starts with the profile marker", name)
            }
            Self::DuplicateName(name) => write!(f, "duplicate roster name '{}'", name),
            Self::DuplicateIdentity { identity, first, second } => write!(
                f,
                "identity {} is shared by '{}' and '{}'",
                identity, first, second
            ),
        }
    }
}

impl std::error::Error for RosterError {}

/// Immutable roster. Safe to share across handlers without locking.
#[derive(Debug, Clone)]
pub struct Roster {
    profiles: Vec<Profile>,
    by_name: HashMap<String, usize>,
}

impl Roster {
    /// Build a roster, rejecting duplicate names and duplicate identities.
    pub fn new(profiles: Vec<Profile>) -> Result<Self, RosterError> {
        if profiles.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut by_name = HashMap::with_capacity(profiles.len());
        let mut by_identity: HashMap<i64, &str> = HashMap::with_capacity(profiles.len());

        for (idx, profile) in profiles.iter().enumerate() {
            if profile.name.trim().is_empty() {
                return Err(RosterError::BlankName);
            }
            if profile.name != profile.name.trim() {
                return Err(RosterError::PaddedName(profile.name.clone()));
            }
            if profile.name.starts_with(PROFILE_MARKER) {
                return Err(RosterError::MarkerName(profile.name.clone()));
            }
            if by_name.insert(profile.name.clone(), idx).is_some() {
                return Err(RosterError::DuplicateName(profile.name.clone()));
            }
            if let Some(first) = by_identity.insert(profile.identity, &profile.name) {
                return Err(RosterError::DuplicateIdentity {
                    identity: profile.identity,
                    first: first.to_string(),
                    second: profile.name.clone(),
                });
            }
        }

        Ok(Self { profiles, by_name })
    }

    pub fn lookup(&self, name: &str) -> Option<&Profile> {
        self.by_name.get(name).map(|&idx| &self.profiles[idx])
    }

    pub fn identity_of(&self, name: &str) -> Option<i64> {
        self.lookup(name).map(|p| p.identity)
    }

    /// Reverse lookup, used only to label log lines.
    pub fn name_of(&self, identity: i64) -> Option<&str> {
        self.profiles
            .iter()
            .find(|p| p.identity == identity)
            .map(|p| p.name.as_str())
    }

    /// All profiles in configuration order.
    pub fn all(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn profile(name: &str, identity: i64) -> Profile {
    Profile {
        name: name.to_string(),
        identity,
        team_id: "0101".to_string(),
        role: "Operation Team Leader".to_string(),
        login: format!("{}@example.com", name.to_lowercase()),
        members: vec!["Ajay".to_string(), "Asik".to_string()],
        groups: vec![],
    }
}
