//! `${VAR_NAME}` substitution in config string values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched. `$${VAR}` escapes
//! to a literal `${VAR}`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;

/// Matches `$${VAR}` (escaped) or `${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// A referenced env var that is unset or empty.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute env vars in every string leaf, using the process environment.
pub fn resolve_env_vars(value: Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(
    value: Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute(value, env, "")
}

fn substitute(
    value: Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(&s, env, path).map(Value::String),
        Value::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = serde_yaml::Mapping::with_capacity(map.len());
            for (k, v) in map {
                let key = k.as_str().unwrap_or("?");
                let child = if path.is_empty() { key.to_string() } else { format!("{path}.{key}") };
                let v = substitute(v, env, &child)?;
                out.insert(k, v);
            }
            Ok(Value::Mapping(out))
        }
        other => Ok(other),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let out = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(MissingEnvVarError {
            var_name,
            config_path: path.to_string(),
        }),
        None => Ok(out.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = yaml("ocr:\n  apiKey: ${GEMINI_API_KEY}\n");
        let out = resolve_env_vars_with(v, &env(&[("GEMINI_API_KEY", "g-123")])).unwrap();
        assert_eq!(out["ocr"]["apiKey"].as_str(), Some("g-123"));
    }

    #[test]
    fn error_names_var_and_path() {
        let v = yaml("ocr:\n  apiKey: ${MISSING_VAR}\n");
        let err = resolve_env_vars_with(v, &HashMap::new()).unwrap_err();
        assert_eq!(err.var_name, "MISSING_VAR");
        assert_eq!(err.config_path, "ocr.apiKey");
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = yaml("note: \"$${HOME} stays\"\n");
        let out = resolve_env_vars_with(v, &HashMap::new()).unwrap();
        assert_eq!(out["note"].as_str(), Some("${HOME} stays"));
    }

    #[test]
    fn lowercase_names_are_ignored() {
        let v = yaml("fields: [\"${not_a_var}\"]\n");
        let out = resolve_env_vars_with(v, &HashMap::new()).unwrap();
        assert_eq!(out["fields"][0].as_str(), Some("${not_a_var}"));
    }
}
