//! Environment layer.
//!
//! The loader never reads `std::env` directly: it works from an [`EnvLayer`]
//! snapshot so that the same input always yields the same settings. Lookups
//! are case-insensitive and blank values count as unset.
//!
//! Variable names come from the serialized defaults: a root field `debug`
//! reads `DEBUG`, a field `pool_size` of the `database` table reads
//! `DB_POOL_SIZE`. Prefix stripping and list splitting are done by
//! [`config::Environment`]; type coercion happens when the merged sources are
//! deserialized.

use std::collections::HashMap;
use std::path::Path;

use config::{Environment, Map, Source, Value};

use crate::error::{ConfigError, Result};

/// Settings table and the prefix its variables carry.
const GROUP_PREFIXES: [(&str, &str); 10] = [
    ("server", "SERVICE"),
    ("database", "DB"),
    ("redis", "REDIS"),
    ("clickhouse", "CLICKHOUSE"),
    ("minio", "MINIO"),
    ("model", "MODEL"),
    ("training", "TRAINING"),
    ("evaluation", "EVALUATION"),
    ("monitoring", "MONITORING"),
    ("mlflow", "MLFLOW"),
];

/// Snapshot of environment variables, keyed by upper-cased name.
#[derive(Debug, Clone, Default)]
pub struct EnvLayer {
    vars: HashMap<String, String>,
}

impl EnvLayer {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self::from_pairs(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Build a layer from explicit pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_uppercase(), v.into()))
            .collect();
        Self { vars }
    }

    /// Fill in variables from a dotenv file. Variables already present win.
    /// A missing file leaves the layer unchanged.
    pub fn with_dotenv_file(mut self, path: &Path) -> Result<Self> {
        let dotenv_error = |source| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        };
        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(e) if e.not_found() => return Ok(self),
            Err(e) => return Err(dotenv_error(e)),
        };
        for entry in entries {
            let (key, value) = entry.map_err(dotenv_error)?;
            self.vars.entry(key.to_ascii_uppercase()).or_insert(value);
        }
        tracing::debug!("Read env file {}", path.display());
        Ok(self)
    }

    /// Look up a variable. Returns `None` when unset or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Every variable that maps onto a field of `defaults` (the serialized
    /// default settings), as dotted settings keys.
    pub(crate) fn overrides(&self, defaults: &serde_json::Value) -> Result<Vec<EnvOverride>> {
        let mut out = Vec::new();
        let Some(root) = defaults.as_object() else {
            return Ok(out);
        };

        let root_fields = root.iter().filter(|(_, default)| !default.is_object());
        self.scope_overrides(None, "", root_fields, &mut out)?;

        for (table, prefix) in GROUP_PREFIXES {
            if let Some(fields) = root.get(table).and_then(serde_json::Value::as_object) {
                self.scope_overrides(Some(table), prefix, fields.iter(), &mut out)?;
            }
        }
        Ok(out)
    }

    fn scope_overrides<'a>(
        &self,
        table: Option<&str>,
        prefix: &str,
        fields: impl Iterator<Item = (&'a String, &'a serde_json::Value)>,
        out: &mut Vec<EnvOverride>,
    ) -> Result<()> {
        let mut scalars = Map::new();
        let mut lists = Map::new();
        let mut list_keys = Vec::new();
        let mut raw_values = HashMap::new();

        for (field, default) in fields {
            let var = var_name(prefix, field);
            let Some(raw) = self.get(&var) else {
                continue;
            };
            tracing::debug!("Applying env override: {var}");
            raw_values.insert(field.clone(), (var.clone(), raw.to_string()));

            if !default.is_array() {
                scalars.insert(var, raw.to_string());
            } else if raw.trim_start().starts_with('[') {
                let items: Vec<String> = serde_json::from_str(raw).map_err(|_| {
                    ConfigError::invalid_env(&var, raw, "JSON array of strings or comma-separated list")
                })?;
                out.push(EnvOverride {
                    key: settings_key(table, field),
                    var,
                    raw: raw.to_string(),
                    value: Value::from(items),
                });
            } else {
                lists.insert(var, raw.to_string());
                list_keys.push(field.as_str());
            }
        }

        // Scalars stay strings until deserialization so that values like
        // `1.0` or `007` reach string fields unchanged.
        let mut collected = environment(prefix).source(Some(scalars)).collect()?;
        let mut list_source = environment(prefix)
            .try_parsing(true)
            .list_separator(",")
            .source(Some(lists));
        for key in list_keys {
            list_source = list_source.with_list_parse_key(key);
        }
        collected.extend(list_source.collect()?);

        for (field, value) in collected {
            if let Some((var, raw)) = raw_values.remove(&field) {
                out.push(EnvOverride {
                    key: settings_key(table, &field),
                    var,
                    raw,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// One environment value, addressed by its dotted settings key.
#[derive(Debug, Clone)]
pub(crate) struct EnvOverride {
    pub(crate) key: String,
    pub(crate) var: String,
    pub(crate) raw: String,
    pub(crate) value: Value,
}

fn environment(prefix: &str) -> Environment {
    if prefix.is_empty() {
        Environment::default()
    } else {
        Environment::with_prefix(prefix).prefix_separator("_")
    }
}

fn var_name(prefix: &str, field: &str) -> String {
    let field = field.to_ascii_uppercase();
    if prefix.is_empty() {
        field
    } else {
        format!("{prefix}_{field}")
    }
}

fn settings_key(table: Option<&str>, field: &str) -> String {
    match table {
        Some(table) => format!("{table}.{field}"),
        None => field.to_string(),
    }
}
