//! Permission levels.
//!
//! A deployment declares an ordered set of named levels. Commands require a
//! level, actors resolve to one, and an actor passes when its level is at
//! least the required one.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AlbertoError, Result};

/// A named permission tier.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    /// Level name, e.g. `administrator`.
    pub name: String,

    /// Numeric level. Higher means more privileged.
    pub level: i64,

    /// Alternative names accepted when parsing a level.
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub description: String,

    /// Platform permissions that grant this level.
    #[serde(default)]
    pub guild_permissions: Vec<String>,

    /// Platform roles that grant this level.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl PermissionLevel {
    pub fn new(name: impl Into<String>, level: i64) -> Self {
        Self {
            name: name.into(),
            level,
            aliases: Vec::new(),
            description: String::new(),
            guild_permissions: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_guild_permissions(mut self, permissions: &[&str]) -> Self {
        self.guild_permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Whether `name` is this level's name or one of its aliases (case-insensitive).
    pub fn is_called(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// `true` if this level meets `required` (boundary included).
    pub fn meets(&self, required: &PermissionLevel) -> bool {
        self.level >= required.level
    }
}

impl PartialEq for PermissionLevel {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.name == other.name
    }
}

impl PartialOrd for PermissionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PermissionLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level
            .cmp(&other.level)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.level)
    }
}

/// The declared levels of one deployment, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionLevels {
    levels: Vec<PermissionLevel>,
}

impl PermissionLevels {
    /// Validate and sort a level declaration.
    ///
    /// # Errors
    /// - `AlbertoError::Config` for an empty declaration or duplicate names/levels
    /// - `AlbertoError::InvalidPermissionLevel` for a negative level
    pub fn new(mut levels: Vec<PermissionLevel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(AlbertoError::Config(
                "At least one permission level has to be declared".to_string(),
            ));
        }

        let mut seen_levels = HashSet::new();
        let mut seen_names = HashSet::new();
        for level in &levels {
            if level.level < 0 {
                return Err(AlbertoError::InvalidPermissionLevel(level.level));
            }
            if !seen_levels.insert(level.level) {
                return Err(AlbertoError::Config(format!(
                    "Permission level {} is declared twice",
                    level.level
                )));
            }
            if !seen_names.insert(level.name.to_lowercase()) {
                return Err(AlbertoError::Config(format!(
                    "Permission level name '{}' is declared twice",
                    level.name
                )));
            }
        }

        levels.sort();
        Ok(Self { levels })
    }

    /// Levels in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, PermissionLevel> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The most privileged level.
    pub fn max(&self) -> &PermissionLevel {
        // non-empty by construction
        &self.levels[self.levels.len() - 1]
    }

    /// The least privileged level.
    pub fn min(&self) -> &PermissionLevel {
        &self.levels[0]
    }

    /// The level declared with exactly `level`.
    ///
    /// # Errors
    /// `AlbertoError::UnrecognisedPermissionLevel` if no declared level matches.
    pub fn find(&self, level: i64) -> Result<&PermissionLevel> {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .ok_or(AlbertoError::UnrecognisedPermissionLevel(level))
    }

    /// Parse a level from its number, name or alias.
    pub fn parse(&self, input: &str) -> Result<&PermissionLevel> {
        let input = input.trim();
        if let Ok(level) = input.parse::<i64>() {
            return self.find(level);
        }
        self.levels
            .iter()
            .find(|l| l.is_called(input))
            .ok_or_else(|| {
                AlbertoError::DeveloperArgument(format!("Unknown permission level '{}'", input))
            })
    }
}

/// Levels used when a deployment declares none.
pub fn default_levels() -> Vec<PermissionLevel> {
    vec![
        PermissionLevel::new("public", 0)
            .with_aliases(&["everyone", "default"])
            .with_description("Everyone"),
        PermissionLevel::new("moderator", 50)
            .with_aliases(&["mod"])
            .with_description("Server moderators")
            .with_guild_permissions(&["KICK_MEMBERS", "BAN_MEMBERS"]),
        PermissionLevel::new("administrator", 100)
            .with_aliases(&["admin"])
            .with_description("Server administrators")
            .with_guild_permissions(&["ADMINISTRATOR"]),
        PermissionLevel::new("owner", 1000)
            .with_description("Bot owner"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> PermissionLevels {
        PermissionLevels::new(default_levels()).unwrap()
    }

    #[test]
    fn test_levels_sorted_and_bounded() {
        let levels = levels();
        let order: Vec<i64> = levels.iter().map(|l| l.level).collect();
        assert_eq!(order, vec![0, 50, 100, 1000]);
        assert_eq!(levels.max().name, "owner");
        assert_eq!(levels.min().name, "public");
    }

    #[test]
    fn test_iter_from_highest() {
        let levels = levels();
        let order: Vec<&str> = levels.iter().rev().map(|l| l.name.as_str()).collect();
        assert_eq!(order, vec!["owner", "administrator", "moderator", "public"]);
    }

    #[test]
    fn test_declaration_order_does_not_matter() {
        let mut reversed = default_levels();
        reversed.reverse();
        assert_eq!(PermissionLevels::new(reversed).unwrap(), levels());
    }

    #[test]
    fn test_find_exact_level() {
        let levels = levels();
        assert_eq!(levels.find(50).unwrap().name, "moderator");
        assert!(matches!(
            levels.find(51),
            Err(AlbertoError::UnrecognisedPermissionLevel(51))
        ));
    }

    #[test]
    fn test_parse_by_number_name_and_alias() {
        let levels = levels();
        assert_eq!(levels.parse("100").unwrap().name, "administrator");
        assert_eq!(levels.parse("Admin").unwrap().name, "administrator");
        assert_eq!(levels.parse("mod").unwrap().level, 50);
        assert_eq!(levels.parse(" owner ").unwrap().level, 1000);
        assert!(levels.parse("overlord").is_err());
    }

    #[test]
    fn test_meets_includes_boundary() {
        let levels = levels();
        let moderator = levels.find(50).unwrap();
        assert!(moderator.meets(moderator));
        assert!(levels.max().meets(moderator));
        assert!(!levels.min().meets(moderator));
    }

    #[test]
    fn test_invalid_declarations() {
        assert!(PermissionLevels::new(vec![]).is_err());
        assert!(matches!(
            PermissionLevels::new(vec![PermissionLevel::new("neg", -1)]),
            Err(AlbertoError::InvalidPermissionLevel(-1))
        ));
        assert!(PermissionLevels::new(vec![
            PermissionLevel::new("a", 1),
            PermissionLevel::new("b", 1),
        ])
        .is_err());
        assert!(PermissionLevels::new(vec![
            PermissionLevel::new("a", 1),
            PermissionLevel::new("A", 2),
        ])
        .is_err());
    }

    #[test]
    fn test_level_deserialization_defaults() {
        let level: PermissionLevel =
            serde_json::from_str(r#"{"name": "team", "level": 10}"#).unwrap();
        assert_eq!(level.level, 10);
        assert!(level.aliases.is_empty());
        assert!(level.roles.is_empty());
    }
}
