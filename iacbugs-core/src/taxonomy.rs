//! Label remapping tables used when reporting on the qualitative bug data.

use std::collections::BTreeSet;

static COMPONENT_LABELS: &[(&str, &str)] = &[
    ("Code", "Configuration unit"),
    ("Configuration", "IaC program"),
];

static SYSTEM_STATE_LABELS: &[(&str, &str)] = &[("Out of the box", "State agnostic")];

static ROOT_CAUSE_CATEGORIES: &[(&str, &str)] = &[
    (
        "Incorrect command construction/execution",
        "System interaction bugs",
    ),
    ("Missing system operations", "System interaction bugs"),
    ("Unsound system operations", "System interaction bugs"),
    (
        "Incorrect identification of system state deviations",
        "State handling bugs",
    ),
    (
        "Incorrect conversion/serialization of system state",
        "State handling bugs",
    ),
    (
        "Incorrect identification of current system state",
        "State handling bugs",
    ),
    ("Template bugs", "Template bugs"),
    (
        "Incorrect conversion/serialization of user input",
        "Input handling bugs",
    ),
    ("Incorrect validation of user input", "Input handling bugs"),
    ("API inconsistency bugs", "API-related bugs"),
    ("Incorrect data type", "API-related bugs"),
    (
        "Compatibility issue with the OS/platform",
        "Compatibility bugs",
    ),
    ("Compatibility issue with dependency", "Compatibility bugs"),
    ("Resilience bugs", "Resilience bugs"),
    (
        "Bugs related to hardcoded values",
        "Bugs related to hardcoded values",
    ),
    ("Dependency bugs", "Dependency bugs"),
    ("Invalid DSL", "Invalid DSL"),
];

// Keys are matched as substrings of each test input element.
static TEST_INPUT_KINDS: &[(&str, &str)] = &[
    ("shell", "command"),
    ("uri", "network"),
    ("package", "package"),
    ("host", "network"),
    ("db", "db"),
    ("cloud", "cloud"),
    ("port", "network"),
    ("service connection", "auth"),
    ("command options", "command"),
    ("network", "network"),
    ("URI", "network"),
    ("glob", "fs"),
    ("file", "fs"),
    ("CLI options", "command"),
    ("auth", "auth"),
    ("protocol", "network"),
    ("docker", "docker"),
    ("ip", "network"),
    ("firewall rule", "network"),
    ("locales", "OS general"),
    ("service  connection", "auth"),
    ("regex", "regex"),
    ("ssh key", "auth"),
    ("OS", "OS general"),
    ("command", "command"),
    ("environment variables", "OS general"),
    ("firewall", "network"),
    ("NetworkManager", "network"),
    ("URL", "network"),
    ("IP", "network"),
    ("token", "auth"),
    ("DNS", "network"),
    ("FQDN", "network"),
    ("container", "docker"),
    ("interface", "network"),
    ("AWS", "cloud"),
    ("HPE", "cloud"),
    ("version", "package"),
    ("mysql", "db"),
    ("username", "OS general"),
    ("credentials", "auth"),
    ("url", "network"),
    ("fstype", "fs"),
    ("args", "args"),
    ("checksum", "auth"),
];

/// Test input data types that are reported, with their display names.
pub static REPORTED_TEST_INPUT_KINDS: &[(&str, &str)] = &[
    ("network", "Network (IP, port, firewall)"),
    ("fs", "File system (path, attrs)"),
    ("package", "Package (name, version)"),
    ("auth", "Authentication (token, login info)"),
    ("command", "Command (shell)"),
];

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(raw, _)| *raw == key)
        .map(|(_, label)| *label)
}

/// Relabel a raw component value; unknown values pass through.
pub fn normalize_component(raw: &str) -> &str {
    lookup(COMPONENT_LABELS, raw).unwrap_or(raw)
}

/// Relabel a raw system state value; unknown values pass through.
pub fn normalize_system_state(raw: &str) -> &str {
    lookup(SYSTEM_STATE_LABELS, raw).unwrap_or(raw)
}

/// Category of a fine-grained root cause.
pub fn root_cause_category(root_cause: &str) -> Option<&'static str> {
    lookup(ROOT_CAUSE_CATEGORIES, root_cause.trim())
}

/// Data types referenced by a `;`-separated test input description.
pub fn test_input_kinds(description: &str) -> BTreeSet<&'static str> {
    let normalized = description.replace("; ", ";");
    let mut kinds = BTreeSet::new();
    for element in normalized.split(';').filter(|element| !element.is_empty()) {
        for (key, kind) in TEST_INPUT_KINDS {
            if element.contains(key) {
                kinds.insert(*kind);
            }
        }
    }
    kinds
}
