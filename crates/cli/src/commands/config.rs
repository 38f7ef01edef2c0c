use std::env;
use std::fs;
use std::path::Path;

use gardenquote_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run(options: LoadOptions, explicit_path: Option<&Path>) -> String {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];

    let table_path = config
        .pricing
        .table_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());
    lines.push(render_line(
        "pricing.table_path",
        &table_path,
        source("pricing.table_path", &["GARDENQUOTE_PRICING_TABLE_PATH"]),
    ));

    let rules = &config.estimate;
    let estimate_fields: [(&str, String, &[&str]); 7] = [
        ("estimate.default_split_share", rules.default_split_share.to_string(), &[]),
        ("estimate.min_surface_m2", rules.min_surface_m2.to_string(), &[]),
        ("estimate.saw_min_m1_per_m2", rules.saw_min_m1_per_m2.to_string(), &[]),
        ("estimate.saw_max_m1_per_m2", rules.saw_max_m1_per_m2.to_string(), &[]),
        (
            "estimate.decking_share",
            rules.decking_share.to_string(),
            &["GARDENQUOTE_ESTIMATE_DECKING_SHARE"],
        ),
        (
            "estimate.decking_min_m2",
            rules.decking_min_m2.to_string(),
            &["GARDENQUOTE_ESTIMATE_DECKING_MIN_M2"],
        ),
        (
            "estimate.decking_max_m2",
            rules.decking_max_m2.to_string(),
            &["GARDENQUOTE_ESTIMATE_DECKING_MAX_M2"],
        ),
    ];
    for (key_path, value, env_keys) in estimate_fields {
        lines.push(render_line(key_path, &value, source(key_path, env_keys)));
    }

    lines.push(render_line(
        "savings.max_applied_changes",
        &config.savings.max_applied_changes.to_string(),
        source("savings.max_applied_changes", &["GARDENQUOTE_SAVINGS_MAX_APPLIED_CHANGES"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["GARDENQUOTE_LOGGING_LEVEL", "GARDENQUOTE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["GARDENQUOTE_LOGGING_FORMAT", "GARDENQUOTE_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
