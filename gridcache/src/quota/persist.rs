//! Persisted quota records.
//!
//! One INI section per layer, named by the percent-escaped layer name so
//! any name survives the INI syntax:
//!
//! ```ini
//! [topp%3Astates]
//! policy = LRU
//! used_bytes = 40960
//! limit_bytes = 524288000
//! ```
//!
//! Byte counts are written as plain integers so they read back exactly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use super::error::QuotaError;
use super::policy::ExpirationPolicy;
use super::units::Quota;
use crate::storage::{decode_name, encode_name};

/// Quota state of one layer as stored between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    pub layer: String,
    pub policy: ExpirationPolicy,
    pub used: Quota,
    pub limit: Option<Quota>,
}

/// Reads and writes quota records in an INI file.
#[derive(Debug, Clone)]
pub struct QuotaStore {
    path: PathBuf,
}

impl QuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. A missing file yields no records.
    pub fn load(&self) -> Result<BTreeMap<String, QuotaRecord>, QuotaError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let ini = Ini::load_from_file(&self.path)
            .map_err(|e| QuotaError::Persistence(format!("{}: {}", self.path.display(), e)))?;

        let mut records = BTreeMap::new();
        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            let layer = decode_name(section).ok_or_else(|| {
                QuotaError::Persistence(format!("'{}' is not an escaped layer name", section))
            })?;
            let layer = layer.as_str();
            let field = |key: &str| {
                properties.get(key).ok_or_else(|| {
                    QuotaError::Persistence(format!("layer '{}' is missing '{}'", layer, key))
                })
            };

            let policy: ExpirationPolicy = field("policy")?.parse()?;
            let used = parse_bytes(layer, "used_bytes", field("used_bytes")?)?;
            let limit = match properties.get("limit_bytes").map(str::trim) {
                None | Some("") => None,
                Some(value) => Some(parse_bytes(layer, "limit_bytes", value)?),
            };

            records.insert(
                layer.to_string(),
                QuotaRecord {
                    layer: layer.to_string(),
                    policy,
                    used,
                    limit,
                },
            );
        }

        debug!(path = %self.path.display(), records = records.len(), "Quota records loaded");
        Ok(records)
    }

    /// Replace the file with `records`.
    pub fn save<'a, I>(&self, records: I) -> Result<(), QuotaError>
    where
        I: IntoIterator<Item = &'a QuotaRecord>,
    {
        let mut ini = Ini::new();
        let mut count = 0usize;
        for record in records {
            let mut section = ini.with_section(Some(encode_name(&record.layer)));
            section
                .set("policy", record.policy.name())
                .set("used_bytes", record.used.bytes().to_string());
            if let Some(limit) = record.limit {
                section.set("limit_bytes", limit.bytes().to_string());
            }
            count += 1;
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ini.write_to_file(&self.path)?;

        debug!(path = %self.path.display(), records = count, "Quota records saved");
        Ok(())
    }
}

fn parse_bytes(layer: &str, key: &str, value: &str) -> Result<Quota, QuotaError> {
    value
        .trim()
        .parse::<u128>()
        .map(Quota::from_bytes)
        .map_err(|_| {
            QuotaError::Persistence(format!(
                "layer '{}': {} = '{}' is not a byte count",
                layer, key, value
            ))
        })
}
