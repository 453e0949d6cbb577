//! Host attribute detection
//!
//! Builds the [`Node`] snapshot filters are evaluated against: `os`,
//! `platform`, `platform_family`, `platform_version` and `kernel.machine`.
//! Linux reads `/etc/os-release`, macOS asks `sw_vers`.

use anyhow::{Context, Result, bail};
use declarative::Node;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const OS_RELEASE: &str = "/etc/os-release";

/// Detect the current host
pub fn detect() -> Node {
    let os = os_name(std::env::consts::OS);
    let node = Node::new()
        .with("os", os)
        .with("kernel.machine", std::env::consts::ARCH);

    match os {
        "linux" => match fs::read_to_string(OS_RELEASE) {
            Ok(content) => with_os_release(node, &parse_os_release(&content)),
            Err(e) => {
                log::debug!("Could not read {OS_RELEASE}: {e}");
                node
            }
        },
        "darwin" => {
            let node = node
                .with("platform", "mac_os_x")
                .with("platform_family", "mac_os_x");
            match macos_version() {
                Some(version) => node.with("platform_version", version),
                None => node,
            }
        }
        _ => node,
    }
}

/// Load a node from a JSON or TOML file
pub fn load(path: &Path) -> Result<Node> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let value: serde_json::Value = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
    };
    match Node::from_value(value) {
        Some(node) => Ok(node),
        None => bail!("{} must contain a map of attributes", path.display()),
    }
}

/// Name used for the `os` attribute
fn os_name(target_os: &str) -> &str {
    match target_os {
        "macos" => "darwin",
        other => other,
    }
}

/// Parse `KEY=value` lines, stripping quotes
pub fn parse_os_release(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Family a distribution belongs to, from its `ID` and `ID_LIKE`
pub fn platform_family(id: &str, id_like: &str) -> String {
    let candidates = std::iter::once(id).chain(id_like.split_whitespace());
    for candidate in candidates {
        let family = match candidate {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" => "debian",
            "rhel" | "centos" | "rocky" | "almalinux" | "ol" => "rhel",
            "fedora" => "fedora",
            "amzn" => "amazon",
            "arch" | "manjaro" => "arch",
            "alpine" => "alpine",
            "suse" | "opensuse" | "opensuse-leap" | "sles" => "suse",
            _ => continue,
        };
        return family.to_string();
    }
    id.to_string()
}

fn with_os_release(node: Node, release: &BTreeMap<String, String>) -> Node {
    let Some(id) = release.get("ID") else {
        return node;
    };
    let id_like = release.get("ID_LIKE").map(String::as_str).unwrap_or("");
    let node = node
        .with("platform", id.as_str())
        .with("platform_family", platform_family(id, id_like));
    match release.get("VERSION_ID") {
        Some(version) => node.with("platform_version", version.as_str()),
        None => node,
    }
}

fn macos_version() -> Option<String> {
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}
