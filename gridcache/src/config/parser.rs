//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::{default_layer_gridsets, DEFAULT_POLICY};
use super::file::ConfigFileError;
use super::settings::{ConfigFile, LayerSettings};
use super::size::parse_size;
use crate::quota::ExpirationPolicy;

/// Prefix of per-layer section names, e.g. `[layer.roads]`.
pub const LAYER_SECTION_PREFIX: &str = "layer.";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [disk_quota] section
    if let Some(section) = ini.section(Some("disk_quota")) {
        if let Some(v) = non_empty(section, "cache_dir") {
            config.disk_quota.cache_dir = expand_tilde(v);
        }
        if let Some(v) = section.get("block_size") {
            let parsed = parse_size(v).map_err(|_| {
                invalid("disk_quota", "block_size", v, "expected a size like '4096' or '4KB'")
            })?;
            if parsed == 0 {
                return Err(invalid(
                    "disk_quota",
                    "block_size",
                    v,
                    "must be greater than zero",
                ));
            }
            config.disk_quota.block_size = parsed;
        }
        if let Some(v) = section.get("max_concurrent_tasks") {
            config.disk_quota.max_concurrent_tasks =
                parse_positive("disk_quota", "max_concurrent_tasks", v)?;
        }
        if let Some(v) = section.get("check_interval_secs") {
            config.disk_quota.check_interval_secs =
                parse_positive("disk_quota", "check_interval_secs", v)?;
        }
        if let Some(v) = section.get("safety_margin") {
            let margin: f64 = v
                .trim()
                .parse()
                .map_err(|_| invalid("disk_quota", "safety_margin", v, "must be a number"))?;
            if !(0.0..1.0).contains(&margin) {
                return Err(invalid(
                    "disk_quota",
                    "safety_margin",
                    v,
                    "must be at least 0.0 and below 1.0",
                ));
            }
            config.disk_quota.safety_margin = margin;
        }
        if let Some(v) = non_empty(section, "quota_file") {
            config.disk_quota.quota_file = Some(expand_tilde(v));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    // [layer.NAME] sections
    for (name, section) in ini.iter() {
        let Some(layer) = name.and_then(|n| n.strip_prefix(LAYER_SECTION_PREFIX)) else {
            continue;
        };
        let section_name = format!("{}{}", LAYER_SECTION_PREFIX, layer);
        if layer.trim().is_empty() {
            return Err(invalid(&section_name, "", "", "layer name must not be empty"));
        }
        if config.layer(layer).is_some() {
            return Err(invalid(&section_name, "", "", "layer is configured twice"));
        }
        config.layers.push(parse_layer(&section_name, layer, section)?);
    }

    Ok(config)
}

fn parse_layer(
    section_name: &str,
    layer: &str,
    section: &Properties,
) -> Result<LayerSettings, ConfigFileError> {
    let gridsets = match non_empty(section, "gridsets") {
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => default_layer_gridsets(),
    };

    let policy = match non_empty(section, "policy") {
        Some(v) => ExpirationPolicy::from_str(v)
            .map_err(|_| invalid(section_name, "policy", v, "must be one of: LRU, LFU, FIFO"))?
            .name()
            .to_string(),
        None => DEFAULT_POLICY.to_string(),
    };

    let quota = match non_empty(section, "quota") {
        None => None,
        Some(v) if v.eq_ignore_ascii_case("unlimited") || v.eq_ignore_ascii_case("none") => None,
        Some(v) => Some(parse_size(v).map_err(|_| {
            invalid(
                section_name,
                "quota",
                v,
                "expected format like '20GB', '500MB', or 'unlimited'",
            )
        })?),
    };

    Ok(LayerSettings {
        name: layer.to_string(),
        gridsets,
        policy,
        quota,
    })
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + Default + PartialOrd,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(invalid(section, key, value, "must be a positive integer")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
