pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod estimate;
pub mod flows;
pub mod savings;
pub mod session;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::answers::{AnswerRecord, FenceItem, FenceType, Material, Surface, Wish};
pub use domain::estimate::{CostEstimate, CostLineItem, PriceRange};
pub use domain::price_table::{PriceKey, PriceTable, PriceTableError};
pub use errors::{ApplicationError, DomainError};
pub use estimate::{
    format_eur, format_for_customer, DeterministicEstimator, EstimateError, EstimateRules,
    Estimator,
};
pub use flows::{FlowReply, IntakeFlow, COMPLETION_MESSAGE};
pub use savings::{
    ChangeBudget, Proposal, SavingsAction, SavingsCategory, SavingsEngine, SavingsError,
};
pub use session::{Session, SessionReply, Stage};
