use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::price_table::{PriceTable, PriceTableError};
use crate::estimate::EstimateRules;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["gardenquote.toml", "config/gardenquote.toml"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub estimate: EstimateRules,
    pub savings: SavingsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PricingConfig {
    /// External `[prices.<key>]` table; the built-in table when unset.
    pub table_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavingsConfig {
    pub max_applied_changes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub price_table_path: Option<PathBuf>,
    pub max_applied_changes: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("could not read price table `{path}`: {source}")]
    ReadPriceTable { path: PathBuf, source: std::io::Error },
    #[error("invalid price table `{path}`: {source}")]
    PriceTable { path: PathBuf, source: PriceTableError },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            estimate: EstimateRules::default(),
            savings: SavingsConfig { max_applied_changes: 5 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Builds the price table the engines share: the configured file merged
    /// over the built-in prices, or the built-in prices alone.
    pub fn price_table(&self) -> Result<PriceTable, ConfigError> {
        let Some(path) = &self.pricing.table_path else {
            return Ok(PriceTable::default());
        };

        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadPriceTable { path: path.clone(), source })?;
        PriceTable::from_toml_str(&raw)
            .map_err(|source| ConfigError::PriceTable { path: path.clone(), source })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(table_path) = pricing.table_path {
                self.pricing.table_path = Some(table_path);
            }
        }

        if let Some(estimate) = patch.estimate {
            let rules = &mut self.estimate;
            let fields = [
                (estimate.default_split_share, &mut rules.default_split_share),
                (estimate.min_surface_m2, &mut rules.min_surface_m2),
                (estimate.paths_terrace_soil_depth_m, &mut rules.paths_terrace_soil_depth_m),
                (estimate.paths_terrace_sand_depth_m, &mut rules.paths_terrace_sand_depth_m),
                (estimate.driveway_soil_depth_m, &mut rules.driveway_soil_depth_m),
                (estimate.driveway_rubble_depth_m, &mut rules.driveway_rubble_depth_m),
                (estimate.driveway_sand_depth_m, &mut rules.driveway_sand_depth_m),
                (estimate.saw_min_m1_per_m2, &mut rules.saw_min_m1_per_m2),
                (estimate.saw_max_m1_per_m2, &mut rules.saw_max_m1_per_m2),
                (estimate.decking_share, &mut rules.decking_share),
                (estimate.decking_min_m2, &mut rules.decking_min_m2),
                (estimate.decking_max_m2, &mut rules.decking_max_m2),
            ];
            for (value, target) in fields {
                if let Some(value) = value {
                    *target = value;
                }
            }
        }

        if let Some(savings) = patch.savings {
            if let Some(max_applied_changes) = savings.max_applied_changes {
                self.savings.max_applied_changes = max_applied_changes;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GARDENQUOTE_PRICING_TABLE_PATH") {
            self.pricing.table_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("GARDENQUOTE_ESTIMATE_DECKING_SHARE") {
            self.estimate.decking_share =
                parse_decimal("GARDENQUOTE_ESTIMATE_DECKING_SHARE", &value)?;
        }
        if let Some(value) = read_env("GARDENQUOTE_ESTIMATE_DECKING_MIN_M2") {
            self.estimate.decking_min_m2 =
                parse_decimal("GARDENQUOTE_ESTIMATE_DECKING_MIN_M2", &value)?;
        }
        if let Some(value) = read_env("GARDENQUOTE_ESTIMATE_DECKING_MAX_M2") {
            self.estimate.decking_max_m2 =
                parse_decimal("GARDENQUOTE_ESTIMATE_DECKING_MAX_M2", &value)?;
        }

        if let Some(value) = read_env("GARDENQUOTE_SAVINGS_MAX_APPLIED_CHANGES") {
            self.savings.max_applied_changes =
                parse_u32("GARDENQUOTE_SAVINGS_MAX_APPLIED_CHANGES", &value)?;
        }

        let log_level =
            read_env("GARDENQUOTE_LOGGING_LEVEL").or_else(|| read_env("GARDENQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GARDENQUOTE_LOGGING_FORMAT").or_else(|| read_env("GARDENQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(price_table_path) = overrides.price_table_path {
            self.pricing.table_path = Some(price_table_path);
        }
        if let Some(max_applied_changes) = overrides.max_applied_changes {
            self.savings.max_applied_changes = max_applied_changes;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_estimate(&self.estimate)?;
        validate_savings(&self.savings)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `load` would pick for `explicit_path`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if let Some(path) = &pricing.table_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "pricing.table_path must not be empty; remove it to use the built-in prices"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_estimate(rules: &EstimateRules) -> Result<(), ConfigError> {
    let one = Decimal::ONE;
    let shares = [
        ("estimate.default_split_share", rules.default_split_share),
        ("estimate.decking_share", rules.decking_share),
    ];
    for (name, share) in shares {
        if share < Decimal::ZERO || share > one {
            return Err(ConfigError::Validation(format!("{name} must be in range 0..=1")));
        }
    }

    let non_negative = [
        ("estimate.min_surface_m2", rules.min_surface_m2),
        ("estimate.paths_terrace_soil_depth_m", rules.paths_terrace_soil_depth_m),
        ("estimate.paths_terrace_sand_depth_m", rules.paths_terrace_sand_depth_m),
        ("estimate.driveway_soil_depth_m", rules.driveway_soil_depth_m),
        ("estimate.driveway_rubble_depth_m", rules.driveway_rubble_depth_m),
        ("estimate.driveway_sand_depth_m", rules.driveway_sand_depth_m),
        ("estimate.saw_min_m1_per_m2", rules.saw_min_m1_per_m2),
        ("estimate.decking_min_m2", rules.decking_min_m2),
    ];
    for (name, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(ConfigError::Validation(format!("{name} must not be negative")));
        }
    }

    if rules.saw_min_m1_per_m2 > rules.saw_max_m1_per_m2 {
        return Err(ConfigError::Validation(
            "estimate.saw_min_m1_per_m2 must not exceed estimate.saw_max_m1_per_m2".to_string(),
        ));
    }
    if rules.decking_min_m2 > rules.decking_max_m2 {
        return Err(ConfigError::Validation(
            "estimate.decking_min_m2 must not exceed estimate.decking_max_m2".to_string(),
        ));
    }

    Ok(())
}

fn validate_savings(savings: &SavingsConfig) -> Result<(), ConfigError> {
    if savings.max_applied_changes == 0 || savings.max_applied_changes > 50 {
        return Err(ConfigError::Validation(
            "savings.max_applied_changes must be in range 1..=50".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    estimate: Option<EstimatePatch>,
    savings: Option<SavingsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    table_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct EstimatePatch {
    default_split_share: Option<Decimal>,
    min_surface_m2: Option<Decimal>,
    paths_terrace_soil_depth_m: Option<Decimal>,
    paths_terrace_sand_depth_m: Option<Decimal>,
    driveway_soil_depth_m: Option<Decimal>,
    driveway_rubble_depth_m: Option<Decimal>,
    driveway_sand_depth_m: Option<Decimal>,
    saw_min_m1_per_m2: Option<Decimal>,
    saw_max_m1_per_m2: Option<Decimal>,
    decking_share: Option<Decimal>,
    decking_min_m2: Option<Decimal>,
    decking_max_m2: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct SavingsPatch {
    max_applied_changes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
