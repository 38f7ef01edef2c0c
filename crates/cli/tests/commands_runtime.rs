use std::env;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use gardenquote_cli::commands::chat::{converse, ChatEnd};
use gardenquote_cli::commands::{config, estimate, prices};
use gardenquote_core::config::LoadOptions;
use gardenquote_core::session::GOODBYE;
use gardenquote_core::{DeterministicEstimator, InMemoryAuditSink, PriceTable, Session};
use serde_json::Value;

const PRESET_ANSWERS: &str = r#"{
    "garden_area_m2": "100",
    "paving_green": { "first_pct": 50, "second_pct": 50 },
    "lawn_planting": { "first_pct": 50, "second_pct": 50 },
    "surface_split": { "driveway_pct": 50, "paths_pct": 30, "terrace_pct": 20 },
    "materials": { "driveway": "concrete", "paths": "concrete", "terrace": "concrete" }
}"#;

#[test]
fn estimate_json_reports_total_and_line_items() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let answers = write_file(&dir, "answers.json", PRESET_ANSWERS);

        let result = estimate::run(&answers, true, LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful estimate");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "estimate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "total €7.025 – €13.000");
        let items = payload["data"]["items"].as_array().expect("items array");
        assert_eq!(items[0]["label"], "Grond afvoer");
    });
}

#[test]
fn estimate_text_is_the_customer_rendering() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let answers = write_file(&dir, "answers.json", PRESET_ANSWERS);

        let result = estimate::run(&answers, false, LoadOptions::default());

        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("✅ **Globale kostenindicatie** ✅"));
        assert!(result.output.contains("**Totale indicatie:** €7.025 – €13.000"));
    });
}

#[test]
fn estimate_without_surface_split_prices_the_terrace() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let answers = write_file(
            &dir,
            "answers.json",
            r#"{ "garden_area_m2": "60", "materials": { "terrace": "ceramic" } }"#,
        );

        let result = estimate::run(&answers, true, LoadOptions::default());
        assert_eq!(result.exit_code, 0, "unset split should fall back to all terrace");

        let payload = parse_payload(&result.output);
        let items = payload["data"]["items"].as_array().expect("items array");
        assert!(items.iter().any(|item| item["label"] == "Terras – Keramiek"));
        assert!(items.iter().all(|item| item["label"] != "Oprit – Beton"));
    });
}

#[test]
fn estimate_rejects_missing_file_as_input_error() {
    with_env(&[], || {
        let result =
            estimate::run(&PathBuf::from("does-not-exist.json"), true, LoadOptions::default());
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "input");
    });
}

#[test]
fn estimate_rejects_split_that_does_not_sum_to_100() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let answers = write_file(
            &dir,
            "answers.json",
            r#"{ "garden_area_m2": "80", "paving_green": { "first_pct": 60, "second_pct": 60 } }"#,
        );

        let result = estimate::run(&answers, true, LoadOptions::default());
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_answers");
        assert_eq!(payload["message"], "percentage split must sum to 100, got 120");
    });
}

#[test]
fn estimate_without_area_is_an_estimate_failure() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let answers = write_file(&dir, "answers.json", "{}");

        let result = estimate::run(&answers, true, LoadOptions::default());

        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "estimate");
    });
}

#[test]
fn invalid_env_override_fails_with_config_class() {
    with_env(&[("GARDENQUOTE_SAVINGS_MAX_APPLIED_CHANGES", "0")], || {
        let result = prices::run(true, LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "prices");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn prices_json_lists_every_key() {
    with_env(&[], || {
        let result = prices::run(true, LoadOptions::default());
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "20 prices (source: built-in)");
        assert_eq!(payload["data"]["turf_per_m2"]["label"], "Graszoden");
    });
}

#[test]
fn prices_text_uses_configured_table() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = write_file(
            &dir,
            "prices.toml",
            "[prices.turf_per_m2]\nmin = 20\nmax = 30\nunit = \"€/m²\"\nlabel = \"Graszoden\"\n",
        );
        let options = LoadOptions {
            overrides: gardenquote_core::ConfigOverrides {
                price_table_path: Some(table.clone()),
                ..Default::default()
            },
            ..LoadOptions::default()
        };

        let result = prices::run(false, options);

        assert_eq!(result.exit_code, 0);
        assert_eq!(
            first_line(&result.output),
            format!("price table (source: file ({})):", table.display())
        );
        assert!(result.output.contains("- turf_per_m2 = €20 – €30 €/m² (Graszoden)"));
    });
}

#[test]
fn config_attributes_sources() {
    with_env(&[("GARDENQUOTE_LOG_LEVEL", "debug")], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "gardenquote.toml", "[savings]\nmax_applied_changes = 4\n");
        let options = LoadOptions { config_path: Some(path.clone()), ..LoadOptions::default() };

        let output = config::run(options, Some(&path));

        assert!(output.contains(&format!(
            "- savings.max_applied_changes = 4 (source: file ({}))",
            path.display()
        )));
        assert!(output.contains("- logging.level = debug (source: env (GARDENQUOTE_LOG_LEVEL))"));
        assert!(output.contains("- estimate.decking_share = 0.12 (source: default)"));
        assert!(output.contains("- pricing.table_path = <built-in> (source: default)"));
    });
}

#[test]
fn chat_runs_a_conversation_to_goodbye() {
    let mut session = new_session();
    let input = ["100 m²", "2", "2", "1", "2", "2", "2", "nee", "nee", "nee", "nee", "3"].join("\n");
    let mut output = Vec::new();

    let end = converse(&mut session, Cursor::new(input), &mut output).expect("conversation");

    assert_eq!(end, ChatEnd::Ended);
    let transcript = String::from_utf8(output).expect("utf-8 transcript");
    assert!(transcript.starts_with(&session.greeting()));
    assert!(transcript.contains("**Totale indicatie:** €7.025 – €13.000"));
    assert!(transcript.trim_end().ends_with(GOODBYE));
}

#[test]
fn chat_stops_when_input_runs_out() {
    let mut session = new_session();
    let mut output = Vec::new();

    let end = converse(&mut session, Cursor::new("100\n2\n"), &mut output).expect("conversation");

    assert_eq!(end, ChatEnd::InputClosed);
    assert!(!session.is_ended());
}

fn new_session() -> Session<DeterministicEstimator, InMemoryAuditSink> {
    Session::new(
        "cli-test",
        &PriceTable::default(),
        DeterministicEstimator::default(),
        5,
        InMemoryAuditSink::default(),
    )
}

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn first_line(output: &str) -> &str {
    output.lines().next().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "GARDENQUOTE_PRICING_TABLE_PATH",
        "GARDENQUOTE_ESTIMATE_DECKING_SHARE",
        "GARDENQUOTE_ESTIMATE_DECKING_MIN_M2",
        "GARDENQUOTE_ESTIMATE_DECKING_MAX_M2",
        "GARDENQUOTE_SAVINGS_MAX_APPLIED_CHANGES",
        "GARDENQUOTE_LOGGING_LEVEL",
        "GARDENQUOTE_LOGGING_FORMAT",
        "GARDENQUOTE_LOG_LEVEL",
        "GARDENQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
