//! `wpdocs config show/get/set`: read and modify configuration.

use std::path::Path;
use wpdocs_core::WpdocsConfig;

pub(crate) fn cmd_config_show(path: &Path) -> anyhow::Result<()> {
    let config = WpdocsConfig::load_or_default(path)?;
    print!("{}", toml::to_string_pretty(&config)?);
    if !path.exists() {
        eprintln!("(defaults; {} does not exist)", path.display());
    }
    Ok(())
}

pub(crate) fn cmd_config_get(path: &Path, key: &str) -> anyhow::Result<()> {
    let config = WpdocsConfig::load_or_default(path)?;
    let json = serde_json::to_value(&config)?;

    match navigate_json(&json, key) {
        Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
        None => anyhow::bail!("Unknown config key: {key}"),
    }
    Ok(())
}

pub(crate) fn cmd_config_set(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = WpdocsConfig::load_or_default(path)?;
    let updated = apply_setting(&config, key, value)?;
    updated.save(path)?;
    eprintln!("Updated {key} and saved to {}", path.display());
    Ok(())
}

/// Return `config` with `key` set to `value`. The value is parsed as JSON
/// first and taken as a plain string otherwise.
fn apply_setting(config: &WpdocsConfig, key: &str, value: &str) -> anyhow::Result<WpdocsConfig> {
    let mut json = serde_json::to_value(config)?;
    let new_value: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    set_json_path(&mut json, key, new_value)?;
    Ok(serde_json::from_value(json)?)
}

/// Navigate a JSON value by a dot-separated path.
fn navigate_json<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(value, |current, part| current.get(part))
}

/// Set an existing value at a dot-separated JSON path.
fn set_json_path(
    root: &mut serde_json::Value,
    path: &str,
    value: serde_json::Value,
) -> anyhow::Result<()> {
    let (sections, last) = path.rsplit_once('.').unwrap_or(("", path));
    if last.is_empty() {
        anyhow::bail!("Empty key path");
    }

    let mut current = root;
    for part in sections.split('.').filter(|p| !p.is_empty()) {
        current = current
            .get_mut(part)
            .ok_or_else(|| anyhow::anyhow!("Unknown config section: {part}"))?;
    }

    let Some(obj) = current.as_object_mut() else {
        anyhow::bail!("Config path does not lead to an object");
    };
    if !obj.contains_key(last) {
        anyhow::bail!("Unknown config key: {last}");
    }
    obj.insert(last.to_string(), value);
    Ok(())
}
