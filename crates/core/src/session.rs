//! Conversation orchestration: intake, the first offer, and the post-offer
//! menus that lead to savings, a contact request, or a goodbye.

use tracing::{debug, warn};

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::answers::{AnswerRecord, Surface};
use crate::domain::estimate::CostEstimate;
use crate::domain::price_table::PriceTable;
use crate::estimate::{format_for_customer, EstimateError, Estimator};
use crate::flows::parse::{is_back, parse_multi_select, Selection};
use crate::flows::IntakeFlow;
use crate::savings::{menu, ChangeBudget, Proposal, SavingsCategory, SavingsEngine, SavingsError};

pub const CONTACT_PROMPT: &str =
    "Top. Wilt u uw naam + postcode + telefoon/e-mail + een korte omschrijving sturen?";
pub const CONTACT_THANKS: &str = "Dank u wel! We nemen zo snel mogelijk contact met u op!";
pub const GOODBYE: &str = "Helemaal goed. Fijn dat u even heeft gekeken. 👋";

const CONTACT_WORDS: [&str; 3] = ["contact", "offerte", "advies"];
const NO_SURFACE_APPLIES: &str =
    "Geen van de gekozen onderdelen is van toepassing (0% gekozen). Typ 'nee' om terug te gaan.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Intake,
    OfferMenu,
    SavingsMenu,
    MaterialSurfaces,
    ChooseOption(Proposal),
    LimitFollowUp,
    Contact,
    Ended,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::OfferMenu => "offer_menu",
            Self::SavingsMenu => "savings_menu",
            Self::MaterialSurfaces => "material_surfaces",
            Self::ChooseOption(_) => "choose_option",
            Self::LimitFollowUp => "limit_follow_up",
            Self::Contact => "contact",
            Self::Ended => "ended",
        }
    }

    fn is_post_offer_menu(&self) -> bool {
        matches!(
            self,
            Self::OfferMenu
                | Self::SavingsMenu
                | Self::MaterialSurfaces
                | Self::ChooseOption(_)
                | Self::LimitFollowUp
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReply {
    /// Separate chat bubbles, in order.
    pub messages: Vec<String>,
    pub ended: bool,
}

impl SessionReply {
    pub fn text(&self) -> String {
        self.messages.join("\n\n")
    }
}

/// One customer conversation. Owns its answer record, its authoritative
/// estimate and its change budget; nothing is shared between sessions.
pub struct Session<E, S> {
    audit: AuditContext,
    intake: IntakeFlow,
    savings: SavingsEngine<E>,
    budget: ChangeBudget,
    answers: AnswerRecord,
    estimate: Option<CostEstimate>,
    stage: Stage,
    contact_details: Option<String>,
    sink: S,
}

impl<E, S> Session<E, S>
where
    E: Estimator,
    S: AuditSink,
{
    pub fn new(
        session_id: impl Into<String>,
        prices: &PriceTable,
        estimator: E,
        max_applied_changes: u32,
        sink: S,
    ) -> Self {
        let session_id = session_id.into();
        Self {
            audit: AuditContext::new(Some(session_id.clone()), session_id, "customer"),
            intake: IntakeFlow::new(prices),
            savings: SavingsEngine::new(estimator),
            budget: ChangeBudget::new(max_applied_changes),
            answers: AnswerRecord::default(),
            estimate: None,
            stage: Stage::Intake,
            contact_details: None,
            sink,
        }
    }

    /// The first question of the intake.
    pub fn greeting(&self) -> String {
        self.intake.current_prompt()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn estimate(&self) -> Option<&CostEstimate> {
        self.estimate.as_ref()
    }

    pub fn budget(&self) -> ChangeBudget {
        self.budget
    }

    pub fn contact_details(&self) -> Option<&str> {
        self.contact_details.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.stage == Stage::Ended
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn handle(&mut self, raw: &str) -> SessionReply {
        let text = raw.trim();
        let stage = std::mem::replace(&mut self.stage, Stage::Ended);
        let from = stage.name();

        let (next, messages) = if stage.is_post_offer_menu() && is_contact_request(text) {
            (Stage::Contact, vec![CONTACT_PROMPT.to_owned()])
        } else {
            match stage {
                Stage::Intake => self.on_intake(raw),
                Stage::OfferMenu => self.on_offer_menu(text),
                Stage::SavingsMenu => self.on_savings_menu(text),
                Stage::MaterialSurfaces => self.on_material_surfaces(text),
                Stage::ChooseOption(proposal) => self.on_choose_option(proposal, text),
                Stage::LimitFollowUp => self.on_limit_follow_up(text),
                Stage::Contact => self.on_contact(text),
                Stage::Ended => (Stage::Ended, vec![GOODBYE.to_owned()]),
            }
        };

        if next.name() != from {
            debug!(
                event_name = "session.stage_changed",
                session_id = self.audit.session_id.as_deref().unwrap_or("unknown"),
                from,
                to = next.name(),
                "session stage changed"
            );
        }
        self.stage = next;
        SessionReply { messages, ended: self.is_ended() }
    }

    fn on_intake(&mut self, raw: &str) -> (Stage, Vec<String>) {
        let reply = self.intake.handle_with_audit(raw, &self.sink, &self.audit);
        if !reply.complete {
            return (Stage::Intake, vec![reply.message]);
        }

        self.answers = self.intake.current_answers();
        self.sink.emit(
            self.audit
                .event("intake.completed", AuditCategory::Intake, AuditOutcome::Success)
                .with_metadata("wishes", self.answers.wishes.len().to_string()),
        );

        let mut messages = vec![reply.message];
        let next = self.present_estimate(&mut messages);
        (next, messages)
    }

    fn on_offer_menu(&mut self, text: &str) -> (Stage, Vec<String>) {
        match text {
            "1" if self.budget.is_exhausted() => self.limit_reached(Vec::new()),
            "1" => (Stage::SavingsMenu, vec![self.savings_menu()]),
            "2" => (Stage::Contact, vec![CONTACT_PROMPT.to_owned()]),
            "3" => self.end(),
            _ => (Stage::OfferMenu, vec![menu::OFFER_MENU.to_owned()]),
        }
    }

    fn on_savings_menu(&mut self, text: &str) -> (Stage, Vec<String>) {
        if is_back(text) {
            return (Stage::OfferMenu, vec![menu::OFFER_MENU.to_owned()]);
        }

        let categories = self.savings.applicable_categories(&self.answers);
        let picked = text
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|index| categories.get(index).copied());
        let Some(category) = picked else {
            return (Stage::SavingsMenu, vec![self.savings_menu()]);
        };

        if category == SavingsCategory::Material {
            return (Stage::MaterialSurfaces, vec![menu::material_surfaces(&self.answers)]);
        }

        let Some(current) = self.estimate.as_ref() else {
            return Self::without_estimate();
        };
        match self.savings.propose(category, &self.answers, current) {
            Ok(proposal) if proposal.is_empty() => {
                (Stage::SavingsMenu, vec![proposal.menu_text, self.savings_menu()])
            }
            Ok(proposal) => {
                let text = proposal.menu_text.clone();
                (Stage::ChooseOption(proposal), vec![text])
            }
            Err(error) => {
                warn!(
                    event_name = "savings.proposal_failed",
                    category = %category,
                    error = %error,
                    "savings proposal unavailable"
                );
                (Stage::SavingsMenu, vec![menu::NOT_APPLICABLE.to_owned(), self.savings_menu()])
            }
        }
    }

    fn on_material_surfaces(&mut self, text: &str) -> (Stage, Vec<String>) {
        if is_back(text) {
            return (Stage::SavingsMenu, vec![self.savings_menu()]);
        }

        let surfaces: Vec<Surface> = match parse_multi_select(text, &['1', '2', '3']) {
            Some(Selection::Tokens(tokens)) => {
                tokens.into_iter().filter_map(Surface::from_token).collect()
            }
            Some(Selection::Nothing) => return (Stage::SavingsMenu, vec![self.savings_menu()]),
            None => {
                return (Stage::MaterialSurfaces, vec![menu::material_surfaces(&self.answers)])
            }
        };

        let Some(current) = self.estimate.as_ref() else {
            return Self::without_estimate();
        };
        match self.savings.propose_material(&surfaces, &self.answers, current) {
            Ok(proposal) if proposal.is_empty() => (
                Stage::MaterialSurfaces,
                vec![proposal.menu_text, menu::material_surfaces(&self.answers)],
            ),
            Ok(proposal) => {
                let text = proposal.menu_text.clone();
                (Stage::ChooseOption(proposal), vec![text])
            }
            Err(_) => (
                Stage::MaterialSurfaces,
                vec![NO_SURFACE_APPLIES.to_owned(), menu::material_surfaces(&self.answers)],
            ),
        }
    }

    fn on_choose_option(&mut self, proposal: Proposal, text: &str) -> (Stage, Vec<String>) {
        if is_back(text) {
            return self.back_from(proposal.category);
        }

        let actions = match proposal.select(text) {
            Ok(actions) if !actions.is_empty() => actions,
            Ok(_) | Err(SavingsError::NothingSelected) => return self.back_from(proposal.category),
            Err(_) => {
                let text = proposal.menu_text.clone();
                return (Stage::ChooseOption(proposal), vec![text]);
            }
        };

        match self.savings.apply(&mut self.budget, &self.answers, &actions) {
            Ok(change) if change.changed => {
                self.answers = change.answers;
                self.sink.emit(
                    self.audit
                        .event("savings.change_applied", AuditCategory::Savings, AuditOutcome::Success)
                        .with_metadata("category", proposal.category.as_str())
                        .with_metadata("applied_changes", self.budget.applied_changes().to_string())
                        .with_metadata("remaining", self.budget.remaining().to_string()),
                );
                let mut messages = vec![change.explanation];
                let next = self.present_estimate(&mut messages);
                (next, messages)
            }
            Ok(change) => (Stage::OfferMenu, vec![change.explanation, menu::OFFER_MENU.to_owned()]),
            Err(SavingsError::LimitReached { .. }) => self.limit_reached(Vec::new()),
            Err(error) => {
                warn!(
                    event_name = "savings.apply_failed",
                    category = %proposal.category,
                    error = %error,
                    "savings change could not be applied"
                );
                (Stage::SavingsMenu, vec![menu::NOT_APPLICABLE.to_owned(), self.savings_menu()])
            }
        }
    }

    fn on_limit_follow_up(&mut self, text: &str) -> (Stage, Vec<String>) {
        match text {
            "1" => (Stage::Contact, vec![CONTACT_PROMPT.to_owned()]),
            "2" => self.end(),
            _ => (Stage::LimitFollowUp, vec![menu::LIMIT_FOLLOW_UP.to_owned()]),
        }
    }

    fn on_contact(&mut self, text: &str) -> (Stage, Vec<String>) {
        self.contact_details = Some(text.to_owned());
        self.sink.emit(
            self.audit
                .event("session.contact_requested", AuditCategory::Session, AuditOutcome::Success)
                .with_metadata("details_length", text.chars().count().to_string()),
        );
        (Stage::Ended, vec![CONTACT_THANKS.to_owned()])
    }

    fn end(&mut self) -> (Stage, Vec<String>) {
        self.sink.emit(self.audit.event(
            "session.ended",
            AuditCategory::Session,
            AuditOutcome::Success,
        ));
        (Stage::Ended, vec![GOODBYE.to_owned()])
    }

    fn back_from(&self, category: SavingsCategory) -> (Stage, Vec<String>) {
        if category == SavingsCategory::Material {
            (Stage::MaterialSurfaces, vec![menu::material_surfaces(&self.answers)])
        } else {
            (Stage::SavingsMenu, vec![self.savings_menu()])
        }
    }

    /// No estimate to preview savings against.
    fn without_estimate() -> (Stage, Vec<String>) {
        warn!(event_name = "savings.estimate_missing", "no current estimate to compare against");
        (Stage::OfferMenu, vec![menu::NOT_APPLICABLE.to_owned(), menu::OFFER_MENU.to_owned()])
    }

    fn limit_reached(&mut self, mut messages: Vec<String>) -> (Stage, Vec<String>) {
        self.sink.emit(
            self.audit
                .event("savings.limit_reached", AuditCategory::Savings, AuditOutcome::Rejected)
                .with_metadata(
                    "max_applied_changes",
                    self.budget.max_applied_changes().to_string(),
                ),
        );
        messages.push(menu::SOFT_LIMIT.to_owned());
        messages.push(menu::LIMIT_FOLLOW_UP.to_owned());
        (Stage::LimitFollowUp, messages)
    }

    fn savings_menu(&self) -> String {
        menu::savings_menu(&self.savings.applicable_categories(&self.answers))
    }

    /// Recomputes the authoritative estimate for the current answers and
    /// appends it to `messages`, followed by the next menu.
    fn present_estimate(&mut self, messages: &mut Vec<String>) -> Stage {
        let result = self.savings.estimator().estimate(&self.answers);
        self.record_estimate(&result);
        messages.push(format_for_customer(&result));

        match result {
            Ok(estimate) => {
                self.estimate = Some(estimate);
                messages.push(menu::OFFER_MENU.to_owned());
                Stage::OfferMenu
            }
            Err(_) => {
                self.estimate = None;
                messages.push(menu::LIMIT_FOLLOW_UP.to_owned());
                Stage::LimitFollowUp
            }
        }
    }

    fn record_estimate(&self, result: &Result<CostEstimate, EstimateError>) {
        let event = match result {
            Ok(estimate) => self
                .audit
                .event("estimate.computed", AuditCategory::Estimate, AuditOutcome::Success)
                .with_metadata("total_min", estimate.total.min.to_string())
                .with_metadata("total_max", estimate.total.max.to_string())
                .with_metadata("line_items", estimate.items.len().to_string()),
            Err(error) => self
                .audit
                .event("estimate.computed", AuditCategory::Estimate, AuditOutcome::Failed)
                .with_metadata("error", error.to_string()),
        };
        self.sink.emit(event);
    }
}

fn is_contact_request(text: &str) -> bool {
    CONTACT_WORDS.contains(&text.to_lowercase().as_str())
}
