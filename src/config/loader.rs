//! Configuration loading and environment parsing.

use super::Config;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

/// Raw JSON document in an env var
pub const CONFIG_JSON_VAR: &str = "PARLEY_CONFIG_JSON";
/// When truthy, a JSON document is read from stdin
pub const CONFIG_STDIN_VAR: &str = "PARLEY_CONFIG_STDIN";
/// Path to a JSON config file
pub const CONFIG_PATH_VAR: &str = "PARLEY_CONFIG_PATH";
/// Prefix for per-field overrides, e.g. `PARLEY__SERVER__HISTORY_LIMIT=20`
pub const ENV_OVERRIDE_PREFIX: &str = "PARLEY__";

/// One place a partial JSON config can come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    File(PathBuf),
    Stdin,
    Inline(String),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Self::File(path) => format!("file {}", path.display()),
            Self::Stdin => "stdin".to_string(),
            Self::Inline(_) => CONFIG_JSON_VAR.to_string(),
        }
    }

    fn read(&self) -> Option<String> {
        match self {
            Self::File(path) => {
                if path.as_os_str().is_empty() || !path.exists() {
                    return None;
                }
                fs::read_to_string(path)
                    .map_err(|e| eprintln!("Failed to read config from {}: {e}", path.display()))
                    .ok()
            }
            Self::Stdin => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| eprintln!("Failed to read config from stdin: {e}"))
                    .ok()
                    .map(|_| buf)
            }
            Self::Inline(raw) => Some(raw.clone()),
        }
    }
}

/// Sources in increasing precedence; later ones win field by field.
fn sources() -> Vec<Source> {
    let mut sources = Vec::new();

    if let Some(exe_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.json")))
    {
        sources.push(Source::File(exe_dir));
    }
    sources.push(Source::File(PathBuf::from("config.json")));

    if let Ok(path) = env::var(CONFIG_PATH_VAR) {
        sources.push(Source::File(PathBuf::from(path)));
    }
    if env::var(CONFIG_STDIN_VAR).is_ok_and(|v| env_var_truthy(&v)) {
        sources.push(Source::Stdin);
    }
    if let Ok(json) = env::var(CONFIG_JSON_VAR) {
        sources.push(Source::Inline(json));
    }

    sources
}

/// Load configuration with the following precedence (highest first):
/// 1) `PARLEY__*` per-field env overrides, `__` separating nested keys
/// 2) `PARLEY_CONFIG_JSON` env var containing raw JSON
/// 3) JSON from stdin when `PARLEY_CONFIG_STDIN=true/1`
/// 4) File pointed to by `PARLEY_CONFIG_PATH`
/// 5) config.json in the current working directory
/// 6) config.json next to the executable
/// 7) Defaults compiled into the binary
///
/// Read and parse errors are printed to stderr and the offending source is
/// skipped. Validation is left to the caller (see
/// [`validate_config`](super::validation::validate_config)).
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged = serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    for source in sources() {
        if let Some(value) = source
            .read()
            .and_then(|raw| parse_json_document(&raw, &source.label()))
        {
            merge_values(&mut merged, value);
        }
    }

    apply_env_overrides(&mut merged, env::vars());

    match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    }
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    serde_json::from_str(raw)
        .map_err(|err| eprintln!("Failed to parse config from {label}: {err}"))
        .ok()
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => *target_slot = source_value,
    }
}

fn apply_env_overrides(root: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, raw_value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };

        let path: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if let Some((field, parents)) = path.split_last() {
            let slot = parents.iter().fold(&mut *root, |node, segment| {
                ensure_object(node)
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
            });
            let value = parse_env_value(slot, field, &raw_value);
            ensure_object(slot).insert(field.clone(), value);
        }
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Interpret an override as JSON, except for string and unset optional
/// fields, which take the raw text so secrets like `12345` survive.
fn parse_env_value(parent: &Value, field: &str, raw: &str) -> Value {
    let trimmed = raw.trim();
    let textual = matches!(parent.get(field), Some(Value::String(_) | Value::Null));
    if textual || trimmed.is_empty() {
        return Value::String(trimmed.to_string());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was coerced into an object above"),
    }
}
