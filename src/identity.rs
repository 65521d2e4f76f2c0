// Process executable name -> canonical application name.

use std::collections::{HashMap, HashSet};

const BUILTIN: &[(&str, &str)] = &[
    ("chrome.exe", "Google Chrome"),
    ("Code.exe", "VS Code"),
    ("WhatsApp.exe", "WhatsApp"),
    ("Docker Desktop.exe", "Docker"),
    ("explorer.exe", "File Explorer"),
    ("Teams.exe", "Microsoft Teams"),
    ("cmd.exe", "Command Prompt"),
    ("node.exe", "Node.js"),
    ("powershell.exe", "PowerShell"),
    ("OneDrive.exe", "OneDrive"),
];

/// Immutable many-to-one lookup table, built once at startup.
/// Names without an entry are their own canonical identity.
#[derive(Debug, Clone)]
pub struct AppIdentities {
    table: HashMap<String, String>,
    canonical: HashSet<String>,
}

impl AppIdentities {
    pub fn new(table: HashMap<String, String>) -> Self {
        let canonical = table.values().cloned().collect();
        Self { table, canonical }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(raw, name)| (raw.to_string(), name.to_string()))
                .collect(),
        )
    }

    /// Exact (case-sensitive) match on the executable name.
    pub fn resolve<'a>(&'a self, process_name: &'a str) -> &'a str {
        self.table
            .get(process_name)
            .map(String::as_str)
            .unwrap_or(process_name)
    }

    /// True when `name` is the target of at least one table entry.
    pub fn is_known(&self, name: &str) -> bool {
        self.canonical.contains(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for AppIdentities {
    fn default() -> Self {
        Self::builtin()
    }
}
