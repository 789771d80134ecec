// src/git/submodules.rs

//! Parsing of `git config --file=.gitmodules --list` output.

use std::path::Path;

/// One `key=value` line of a config listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

/// Split a config listing into entries.
///
/// Only the first `=` separates key from value. Blank lines are skipped.
pub fn parse_config_listing(listing: &str) -> Vec<ConfigEntry> {
    listing
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => ConfigEntry {
                key: key.to_string(),
                value: value.to_string(),
            },
            None => ConfigEntry {
                key: line.to_string(),
                value: String::new(),
            },
        })
        .collect()
}

/// Submodule name for a `submodule.<name>.<field>` key.
pub fn submodule_name<'a>(key: &'a str, field: &str) -> Option<&'a str> {
    key.strip_prefix("submodule.")?
        .strip_suffix(field)?
        .strip_suffix('.')
        .filter(|name| !name.is_empty())
}

/// `(name, url)` pairs pointing each submodule at its checkout under `src_dir`.
pub fn local_urls(entries: &[ConfigEntry], src_dir: &str) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|e| {
            let name = submodule_name(&e.key, "path")?;
            let url = Path::new(src_dir).join(&e.value);
            Some((name.to_string(), url.to_string_lossy().into_owned()))
        })
        .collect()
}

/// Entries holding the original `submodule.<name>.url` values.
pub fn original_urls(entries: &[ConfigEntry]) -> impl Iterator<Item = &ConfigEntry> {
    entries
        .iter()
        .filter(|e| submodule_name(&e.key, "url").is_some())
}
