//! Installed-library inventory.
//!
//! Dependency resolution only checks whether a required library is present;
//! the inventory maps library names to their installed version strings.

use std::collections::HashMap;
use std::process::Command;

use tracing::{debug, warn};

/// Source of the `{library: version}` mapping used for library requirements.
pub trait LibraryInventory {
    fn installed_libraries(&self) -> HashMap<String, String>;
}

/// A fixed inventory, typically taken from `config.json`.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    libraries: HashMap<String, String>,
}

impl StaticInventory {
    pub fn new(libraries: HashMap<String, String>) -> Self {
        Self { libraries }
    }

    pub fn with(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.libraries.insert(name.into(), version.into());
        self
    }
}

impl LibraryInventory for StaticInventory {
    fn installed_libraries(&self) -> HashMap<String, String> {
        self.libraries.clone()
    }
}

/// Inventory read from a package manager listing such as `pip list`.
///
/// The command must print one `name version` pair per line. A header line
/// (`Package Version`) and separator lines made only of dashes are skipped.
/// A command that cannot be spawned or exits unsuccessfully yields an empty
/// inventory, which disables every extension with library requirements.
#[derive(Debug, Clone)]
pub struct CommandInventory {
    program: String,
    args: Vec<String>,
}

impl CommandInventory {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `["program", "arg", ...]` list. Returns `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl LibraryInventory for CommandInventory {
    fn installed_libraries(&self) -> HashMap<String, String> {
        let output = match Command::new(&self.program).args(&self.args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to list installed libraries");
                return HashMap::new();
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                program = %self.program,
                status = %output.status,
                stderr = %stderr.trim(),
                "Library listing command failed"
            );
            return HashMap::new();
        }

        let libraries = parse_listing(&String::from_utf8_lossy(&output.stdout));
        debug!(program = %self.program, count = libraries.len(), "Listed installed libraries");
        libraries
    }
}

/// Parse a two-column `name version` listing.
pub fn parse_listing(listing: &str) -> HashMap<String, String> {
    let mut libraries = HashMap::new();

    for line in listing.lines() {
        let mut columns = line.split_whitespace();
        let (Some(name), Some(version)) = (columns.next(), columns.next()) else {
            continue;
        };
        if name == "Package" && version == "Version" {
            continue;
        }
        if name.replace('-', "").is_empty() && version.replace('-', "").is_empty() {
            continue;
        }
        libraries.insert(name.to_string(), version.to_string());
    }

    libraries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_inventory() {
        let inventory = StaticInventory::default()
            .with("regex", "1.10.2")
            .with("tokio", "1.35.0");
        let libs = inventory.installed_libraries();
        assert_eq!(libs.len(), 2);
        assert_eq!(libs["regex"], "1.10.2");
    }

    #[test]
    fn test_parse_pip_style_listing() {
        let listing = "\
Package            Version
------------------ ---------
aenum              3.1.15
discord-py-interactions 5.11.0
redis              5.0.1
";
        let libs = parse_listing(listing);
        assert_eq!(libs.len(), 3);
        assert_eq!(libs["aenum"], "3.1.15");
        assert_eq!(libs["discord-py-interactions"], "5.11.0");
        assert!(!libs.contains_key("Package"));
    }

    #[test]
    fn test_parse_listing_skips_short_lines() {
        let libs = parse_listing("\nlonely\n  \nok 1.0\n");
        assert_eq!(libs.len(), 1);
        assert_eq!(libs["ok"], "1.0");
    }

    #[test]
    fn test_command_inventory_missing_program() {
        let inventory = CommandInventory::new("albertox3-definitely-not-a-program", vec![]);
        assert!(inventory.installed_libraries().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_inventory_failing_command() {
        let inventory = CommandInventory::new(
            "sh",
            vec!["-c".to_string(), "echo 'regex 1.10.2'; exit 3".to_string()],
        );
        assert!(inventory.installed_libraries().is_empty());

        let ok = CommandInventory::new("sh", vec!["-c".to_string(), "echo 'regex 1.10.2'".to_string()]);
        assert_eq!(ok.installed_libraries()["regex"], "1.10.2");
    }

    #[test]
    fn test_command_inventory_from_argv() {
        assert!(CommandInventory::from_argv(&[]).is_none());
        let argv = vec!["pip".to_string(), "list".to_string()];
        let inventory = CommandInventory::from_argv(&argv).unwrap();
        assert_eq!(inventory.program, "pip");
        assert_eq!(inventory.args, vec!["list"]);
    }
}
