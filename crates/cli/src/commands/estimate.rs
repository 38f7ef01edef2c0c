use std::fs;
use std::path::Path;
use std::sync::Arc;

use gardenquote_core::config::LoadOptions;
use gardenquote_core::{
    format_eur, format_for_customer, AnswerRecord, ApplicationError, CostEstimate,
    DeterministicEstimator, Estimator,
};
use tracing::info;

use crate::commands::{load_runtime, CommandResult};

pub fn run(answers_path: &Path, json: bool, options: LoadOptions) -> CommandResult {
    let (config, prices) = match load_runtime("estimate", options) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let estimator = DeterministicEstimator::new(Arc::clone(&prices), config.estimate);

    let estimate = match estimate_file(&estimator, answers_path) {
        Ok(estimate) => estimate,
        Err(error) => {
            let (error_class, exit_code) = classify(&error);
            return CommandResult::failure("estimate", error_class, error.to_string(), exit_code);
        }
    };

    info!(
        event_name = "cli.estimate.completed",
        answers_path = %answers_path.display(),
        line_items = estimate.items.len(),
        "estimate computed from answer record"
    );

    if !json {
        return CommandResult::text(format_for_customer(&Ok(estimate)));
    }

    let message =
        format!("total {} – {}", format_eur(estimate.total.min), format_eur(estimate.total.max));
    match serde_json::to_value(&estimate) {
        Ok(data) => CommandResult::success_with_data("estimate", message, Some(data)),
        Err(error) => CommandResult::failure("estimate", "serialization", error.to_string(), 1),
    }
}

fn estimate_file<E: Estimator>(
    estimator: &E,
    answers_path: &Path,
) -> Result<CostEstimate, ApplicationError> {
    let raw = fs::read_to_string(answers_path).map_err(|error| {
        ApplicationError::Input(format!("could not read `{}`: {error}", answers_path.display()))
    })?;
    let answers: AnswerRecord = serde_json::from_str(&raw).map_err(|error| {
        ApplicationError::Input(format!("could not parse `{}`: {error}", answers_path.display()))
    })?;
    answers.validate()?;

    Ok(estimator.estimate(&answers)?)
}

fn classify(error: &ApplicationError) -> (&'static str, u8) {
    match error {
        ApplicationError::Input(_) => ("input", 3),
        ApplicationError::Domain(_) => ("invalid_answers", 3),
        ApplicationError::Estimate(_) => ("estimate", 4),
        ApplicationError::Savings(_) => ("savings", 4),
        ApplicationError::Configuration(_) => ("config_validation", 2),
    }
}
