//! Extension types for AlbertoX3
//!
//! This module defines the descriptor produced by discovery, the fixed
//! feature vocabulary an extension may declare by shipping a unit file, and
//! the requirement declarations an extension makes about libraries and other
//! extensions.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AlbertoError, Result};

/// One optional capability an extension declares by shipping a unit with
/// the same name.
///
/// The declaration order is the bit order of [`Features`]: `Colors` is bit 0,
/// `Db` bit 1, `Ext` bit 2, `Permissions` bit 3, `Settings` bit 4 and
/// `Stats` bit 5. Persisted or logged feature masks depend on this order, so
/// new features may only be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Colors,
    Db,
    Ext,
    Permissions,
    Settings,
    Stats,
}

impl Feature {
    /// Every feature, in bit order.
    pub const ALL: [Feature; 6] = [
        Feature::Colors,
        Feature::Db,
        Feature::Ext,
        Feature::Permissions,
        Feature::Settings,
        Feature::Stats,
    ];

    /// Name of the unit file (without suffix) that declares this feature.
    pub fn unit_name(self) -> &'static str {
        match self {
            Feature::Colors => "colors",
            Feature::Db => "db",
            Feature::Ext => "ext",
            Feature::Permissions => "permissions",
            Feature::Settings => "settings",
            Feature::Stats => "stats",
        }
    }

    /// Parse a unit name into a feature, if it is part of the vocabulary.
    pub fn from_unit_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.unit_name() == name)
    }

    /// Bit position of this feature inside [`Features`].
    pub fn bit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

/// A bit-set over [`Feature`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Features(u8);

impl Features {
    /// An empty feature set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Build a feature set from a raw mask, dropping bits outside the vocabulary.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & ((1 << Feature::ALL.len()) - 1))
    }

    /// The raw mask.
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn insert(&mut self, feature: Feature) {
        self.0 |= 1 << feature.bit();
    }

    pub fn has(self, feature: Feature) -> bool {
        self.0 & (1 << feature.bit()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained features in bit order.
    pub fn iter(self) -> impl Iterator<Item = Feature> {
        Feature::ALL.into_iter().filter(move |f| self.has(*f))
    }

    pub fn has_colors(self) -> bool {
        self.has(Feature::Colors)
    }

    pub fn has_db(self) -> bool {
        self.has(Feature::Db)
    }

    pub fn has_ext(self) -> bool {
        self.has(Feature::Ext)
    }

    pub fn has_permissions(self) -> bool {
        self.has(Feature::Permissions)
    }

    pub fn has_settings(self) -> bool {
        self.has(Feature::Settings)
    }

    pub fn has_stats(self) -> bool {
        self.has(Feature::Stats)
    }
}

impl FromIterator<Feature> for Features {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut features = Features::empty();
        for feature in iter {
            features.insert(feature);
        }
        features
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Feature::unit_name).collect();
        write!(f, "{}", names.join(","))
    }
}

/// An extension found on disk by discovery.
///
/// Identity is `(folder, group, name)`; `path` and `features` do not take
/// part in equality or hashing.
#[derive(Debug, Clone)]
pub struct ExtensionDescriptor {
    /// Name of the root extensions folder (e.g. `extensions`).
    pub folder: String,

    /// Group directory the extension lives in (e.g. `moderation`).
    pub group: String,

    /// Extension directory name (e.g. `ban`).
    pub name: String,

    /// The extension directory.
    pub path: PathBuf,

    /// Features declared by unit files in the extension directory.
    pub features: Features,
}

impl ExtensionDescriptor {
    pub fn new(
        folder: impl Into<String>,
        group: impl Into<String>,
        name: impl Into<String>,
        path: PathBuf,
        features: Features,
    ) -> Self {
        Self {
            folder: folder.into(),
            group: group.into(),
            name: name.into(),
            path,
            features,
        }
    }

    /// `group.name`, the identity used in extension requirements.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.group, self.name)
    }

    /// `folder.group.name`, the key extension modules register under.
    pub fn package(&self) -> String {
        format!("{}.{}", self.folder, self.full_name())
    }
}

impl PartialEq for ExtensionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.folder == other.folder && self.group == other.group && self.name == other.name
    }
}

impl Eq for ExtensionDescriptor {}

impl Hash for ExtensionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folder.hash(state);
        self.group.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Extension {:?} ({})>", self.full_name(), self.features.bits())
    }
}

/// Libraries and extensions an extension needs before it can be enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Library requirement strings, e.g. `"regex"` or `"regex>=1.10"`.
    #[serde(default)]
    pub lib: Vec<String>,

    /// Full names (`group.name`) of required extensions.
    #[serde(default)]
    pub ext: Vec<String>,
}

impl Requirements {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_ext(mut self, full_name: impl Into<String>) -> Self {
        self.ext.push(full_name.into());
        self
    }

    pub fn with_lib(mut self, requirement: impl Into<String>) -> Self {
        self.lib.push(requirement.into());
        self
    }
}

/// Comparison operator of a library version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    Eq,
    Ne,
    Ge,
    Le,
    Compatible,
}

impl VersionOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(VersionOp::Eq),
            "!" => Some(VersionOp::Ne),
            ">" => Some(VersionOp::Ge),
            "<" => Some(VersionOp::Le),
            "~" => Some(VersionOp::Compatible),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionOp::Eq => "==",
            VersionOp::Ne => "!=",
            VersionOp::Ge => ">=",
            VersionOp::Le => "<=",
            VersionOp::Compatible => "~=",
        }
    }
}

static LIB_REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z][\w-]*)(?:([=!><~])=(\d[\d.]*))?$").expect("valid regex")
});

/// A parsed library requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibRequirement {
    pub name: String,
    pub constraint: Option<(VersionOp, String)>,
}

impl LibRequirement {
    /// Parse `name` or `name<op>=version`.
    ///
    /// `package` is only used for the error message.
    pub fn parse(requirement: &str, package: &str) -> Result<Self> {
        let invalid = || AlbertoError::InvalidRequirement {
            package: package.to_string(),
            requirement: requirement.to_string(),
        };

        let captures = LIB_REQUIREMENT_RE.captures(requirement).ok_or_else(invalid)?;
        let name = captures.get(1).ok_or_else(invalid)?.as_str().to_string();
        let constraint = match (captures.get(2), captures.get(3)) {
            (Some(op), Some(version)) => {
                let op = VersionOp::from_symbol(op.as_str()).ok_or_else(invalid)?;
                Some((op, version.as_str().to_string()))
            }
            _ => None,
        };

        Ok(Self { name, constraint })
    }
}
