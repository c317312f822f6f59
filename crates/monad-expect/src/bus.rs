//! Event bus rule discovery
//!
//! A function declares bus rules as files under `{function_path}/bus/`;
//! the rule name is the file name up to its first `.`.

use crate::error::{ExpectError, ExpectResult};
use std::io::ErrorKind;
use std::path::Path;

/// Rule names declared under `{function_path}/bus/`, sorted and deduplicated
///
/// A missing `bus` directory declares no rules.
///
/// # Errors
/// Returns `ExpectError::Io` if the directory exists but cannot be read.
pub async fn bus_rules(function_path: &Path) -> ExpectResult<Vec<String>> {
    let dir = function_path.join("bus");
    let io_error = |e: std::io::Error| ExpectError::Io {
        path: dir.clone(),
        message: e.to_string(),
    };

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(e)),
    };

    let mut rules = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!("Skipping non-utf8 bus rule file in {}", dir.display());
            continue;
        };
        let rule = name.split('.').next().unwrap_or_default();
        if !rule.is_empty() {
            rules.push(rule.to_string());
        }
    }

    rules.sort();
    rules.dedup();
    Ok(rules)
}

/// Expected rule name for `rule` on a resource
#[must_use]
pub fn rule_name(resource_name: &str, rule: &str) -> String {
    format!("{resource_name}-{rule}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_rule_stems() {
        let tmp = tempfile::tempdir().unwrap();
        let bus = tmp.path().join("bus");
        std::fs::create_dir(&bus).unwrap();
        std::fs::write(bus.join("nightly.json.tmpl"), "{}").unwrap();
        std::fs::write(bus.join("deploys.json"), "{}").unwrap();
        std::fs::write(bus.join(".hidden"), "").unwrap();

        let rules = bus_rules(tmp.path()).await.unwrap();
        assert_eq!(rules, vec!["deploys", "nightly"]);
    }

    #[tokio::test]
    async fn missing_directory_declares_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(bus_rules(tmp.path()).await.unwrap().is_empty());
    }

    #[test]
    fn rule_name_joins_with_dash() {
        assert_eq!(rule_name("svc-main-fn", "nightly"), "svc-main-fn-nightly");
    }
}
