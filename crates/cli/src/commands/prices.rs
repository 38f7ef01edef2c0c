use gardenquote_core::config::LoadOptions;
use gardenquote_core::format_eur;
use serde_json::{Map, Value};

use crate::commands::{load_runtime, CommandResult};

pub fn run(json: bool, options: LoadOptions) -> CommandResult {
    let (config, prices) = match load_runtime("prices", options) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let source = match &config.pricing.table_path {
        Some(path) => format!("file ({})", path.display()),
        None => "built-in".to_string(),
    };

    if json {
        let mut entries = Map::new();
        for (key, entry) in prices.iter() {
            match serde_json::to_value(entry) {
                Ok(value) => {
                    entries.insert(key.as_str().to_string(), value);
                }
                Err(error) => {
                    return CommandResult::failure("prices", "serialization", error.to_string(), 1)
                }
            }
        }
        let message = format!("{} prices (source: {source})", entries.len());
        return CommandResult::success_with_data("prices", message, Some(Value::Object(entries)));
    }

    let mut lines = vec![format!("price table (source: {source}):")];
    for (key, entry) in prices.iter() {
        lines.push(format!(
            "- {key} = {} – {} {} ({})",
            format_eur(entry.min),
            format_eur(entry.max),
            entry.unit,
            entry.label
        ));
    }
    CommandResult::text(lines.join("\n"))
}
