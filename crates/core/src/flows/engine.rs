use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::answers::{
    AnswerRecord, DeckingTier, FenceItem, FenceType, IrrigationScope, Material, RatioChoice,
    Surface, SurfacePreset, SurfaceSplit, SurfaceSplitChoice, TwoWayPreset, TwoWaySplit, Wish,
};
use crate::domain::price_table::PriceTable;
use crate::errors::DomainError;
use crate::flows::parse::{
    parse_area, parse_choice, parse_multi_select, parse_number, parse_percent, parse_yes_no,
    Selection,
};
use crate::flows::script::{Script, Step, StepId, StepKind, COMPLETION_MESSAGE};
use crate::flows::states::{Cursor, FenceCursor, FenceStage, FlowState, PendingQueue, PendingSplit};

pub trait FlowDefinition {
    fn initial_state(&self) -> FlowState;
    fn transition(
        &self,
        current: &FlowState,
        answers: &AnswerRecord,
        input: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
    fn prompt(&self, state: &FlowState) -> String;
    fn error_prompt(&self, state: &FlowState) -> String;
}

/// Result of one accepted answer. The caller's answer record is never
/// touched; the updated copy travels here.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome {
    pub from: StepId,
    pub state: FlowState,
    pub answers: AnswerRecord,
    /// Shown before the next prompt (selection confirmations, restarts).
    pub notice: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("input `{input}` is not valid for step {step:?}")]
    InvalidInput { step: StepId, input: String },
    #[error("answer for step {step:?} does not fit cursor {cursor:?}")]
    InvalidTransition { step: StepId, cursor: Cursor },
    #[error("step {0:?} is not part of the script")]
    UnknownStep(StepId),
    #[error("intake is already complete")]
    AlreadyComplete,
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// The garden intake conversation.
#[derive(Clone, Debug)]
pub struct GardenIntakeFlow {
    script: Script,
}

impl GardenIntakeFlow {
    pub fn new(prices: &PriceTable) -> Self {
        Self { script: Script::build(prices) }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }
}

impl FlowDefinition for GardenIntakeFlow {
    fn initial_state(&self) -> FlowState {
        FlowState::default()
    }

    fn transition(
        &self,
        current: &FlowState,
        answers: &AnswerRecord,
        input: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(&self.script, current, answers, input)
    }

    fn prompt(&self, state: &FlowState) -> String {
        render_prompt(&self.script, &state.cursor)
    }

    fn error_prompt(&self, state: &FlowState) -> String {
        match state.cursor.step_id().and_then(|id| self.script.step(id)) {
            Some(step) => step.error_prompt.clone(),
            None => COMPLETION_MESSAGE.to_owned(),
        }
    }
}

/// Stateless driver; the caller owns the state and answers.
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> FlowState {
        self.flow.initial_state()
    }

    pub fn prompt(&self, state: &FlowState) -> String {
        self.flow.prompt(state)
    }

    pub fn error_prompt(&self, state: &FlowState) -> String {
        self.flow.error_prompt(state)
    }

    pub fn apply(
        &self,
        current: &FlowState,
        answers: &AnswerRecord,
        input: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, answers, input)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &FlowState,
        answers: &AnswerRecord,
        input: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink,
    {
        let result = self.apply(current, answers, input);
        match &result {
            Ok(outcome) => {
                let mut event = audit
                    .event("intake.step_answered", AuditCategory::Intake, AuditOutcome::Success)
                    .with_metadata("step", format!("{:?}", outcome.from));
                if outcome.state.is_complete() {
                    event = event.with_metadata("complete", "true");
                }
                sink.emit(event);
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event("intake.input_rejected", AuditCategory::Intake, AuditOutcome::Rejected)
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowReply {
    pub message: String,
    pub complete: bool,
}

/// Stateful intake conversation: owns the cursor and the answer record.
pub struct IntakeFlow {
    engine: FlowEngine<GardenIntakeFlow>,
    state: FlowState,
    answers: AnswerRecord,
}

impl IntakeFlow {
    pub fn new(prices: &PriceTable) -> Self {
        let engine = FlowEngine::new(GardenIntakeFlow::new(prices));
        let state = engine.initial_state();
        Self { engine, state, answers: AnswerRecord::default() }
    }

    pub fn handle(&mut self, raw: &str) -> FlowReply {
        if self.state.is_complete() {
            return self.completed_reply();
        }
        let result = self.engine.apply(&self.state, &self.answers, raw);
        self.settle(result)
    }

    pub fn handle_with_audit<S>(&mut self, raw: &str, sink: &S, audit: &AuditContext) -> FlowReply
    where
        S: AuditSink,
    {
        if self.state.is_complete() {
            return self.completed_reply();
        }
        let result = self.engine.apply_with_audit(&self.state, &self.answers, raw, sink, audit);
        self.settle(result)
    }

    pub fn current_answers(&self) -> AnswerRecord {
        self.answers.clone()
    }

    pub fn current_prompt(&self) -> String {
        self.engine.prompt(&self.state)
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.state.cursor.step_id()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    fn completed_reply(&self) -> FlowReply {
        FlowReply { message: COMPLETION_MESSAGE.to_owned(), complete: true }
    }

    fn settle(&mut self, result: Result<TransitionOutcome, FlowTransitionError>) -> FlowReply {
        match result {
            Ok(outcome) => {
                debug!(
                    event_name = "intake.step_answered",
                    step = ?outcome.from,
                    complete = outcome.state.is_complete(),
                    "intake step answered"
                );
                self.state = outcome.state;
                self.answers = outcome.answers;
                let prompt = self.engine.prompt(&self.state);
                let message = match outcome.notice {
                    Some(notice) => format!("{notice}\n\n{prompt}"),
                    None => prompt,
                };
                FlowReply { message, complete: self.state.is_complete() }
            }
            Err(error) => {
                debug!(event_name = "intake.input_rejected", error = %error, "intake input rejected");
                FlowReply { message: self.engine.error_prompt(&self.state), complete: false }
            }
        }
    }
}

enum Parsed {
    Number(Decimal),
    Percent(u8),
    YesNo(bool),
    Choice(char),
    Selection(Selection),
}

fn parse_input(step: &Step, input: &str) -> Option<Parsed> {
    match &step.kind {
        StepKind::Area => parse_area(input).map(Parsed::Number),
        StepKind::Number { min_exclusive, max } => {
            parse_number(input, *min_exclusive, *max).map(Parsed::Number)
        }
        StepKind::Percent => parse_percent(input).map(Parsed::Percent),
        StepKind::YesNo => parse_yes_no(input).map(Parsed::YesNo),
        StepKind::Choice { tokens } => parse_choice(input, tokens).map(Parsed::Choice),
        StepKind::MultiSelect { tokens, allow_none } => match parse_multi_select(input, tokens)? {
            Selection::Nothing if !allow_none => None,
            selection => Some(Parsed::Selection(selection)),
        },
    }
}

fn two_way_choice(token: char) -> RatioChoice {
    match token {
        '1' => RatioChoice::Preset(TwoWayPreset::Heavy),
        '2' => RatioChoice::Preset(TwoWayPreset::Balanced),
        '3' => RatioChoice::Preset(TwoWayPreset::Light),
        _ => RatioChoice::Custom,
    }
}

fn surface_choice(token: char) -> SurfaceSplitChoice {
    match token {
        '1' => SurfaceSplitChoice::Preset(SurfacePreset::DrivewayHeavy),
        '2' => SurfaceSplitChoice::Preset(SurfacePreset::DrivewayLeaning),
        '3' => SurfaceSplitChoice::Preset(SurfacePreset::TerraceLeaning),
        '4' => SurfaceSplitChoice::Preset(SurfacePreset::TerraceHeavy),
        _ => SurfaceSplitChoice::Custom,
    }
}

fn material_step(surface: Surface) -> StepId {
    match surface {
        Surface::Driveway => StepId::DrivewayMaterial,
        Surface::Paths => StepId::PathsMaterial,
        Surface::Terrace => StepId::TerraceMaterial,
    }
}

/// First material question from `from` onward whose surface has a share.
/// Skipped surfaces get their material cleared.
fn enter_materials(from: Surface, answers: &mut AnswerRecord) -> Cursor {
    for surface in Surface::ALL.into_iter().skip_while(|surface| *surface != from) {
        if answers.surface_pct(surface) > 0 {
            return Cursor::At(material_step(surface));
        }
        answers.materials.set(surface, None);
    }
    Cursor::At(StepId::Jointing)
}

fn confirm_split(split: PendingSplit, answers: &mut AnswerRecord) -> Cursor {
    match split {
        PendingSplit::PavingGreen(split) => {
            answers.paving_green = Some(split);
            Cursor::At(StepId::LawnPlantingRatio)
        }
        PendingSplit::LawnPlanting(split) => {
            answers.lawn_planting = Some(split);
            Cursor::At(StepId::SurfaceRatio)
        }
        PendingSplit::Surfaces(split) => {
            answers.surface_split = Some(split);
            answers.clear_unused_materials();
            enter_materials(Surface::Driveway, answers)
        }
    }
}

fn restart_split(split: PendingSplit, answers: &mut AnswerRecord) -> Cursor {
    match split {
        PendingSplit::PavingGreen(_) => {
            answers.paving_green = None;
            Cursor::At(StepId::PavingPct)
        }
        PendingSplit::LawnPlanting(_) => {
            answers.lawn_planting = None;
            Cursor::At(StepId::LawnPct)
        }
        PendingSplit::Surfaces(_) => {
            answers.surface_split = None;
            Cursor::At(StepId::DrivewayPct)
        }
    }
}

fn finish_sub_flow(pending: &mut PendingQueue) -> Cursor {
    match pending.finish_current() {
        Some(next) => Cursor::At(next.entry_step()),
        None => Cursor::Complete,
    }
}

fn next_fence(cursor: &FenceCursor, pending: &mut PendingQueue) -> Cursor {
    match cursor.next() {
        Some(next) => Cursor::Fence(next),
        None => finish_sub_flow(pending),
    }
}

fn selection_notice(title: &str, labels: &[&str]) -> Option<String> {
    (!labels.is_empty()).then(|| format!("Gekozen {title}: {}.", labels.join(", ")))
}

fn transition_intake(
    script: &Script,
    current: &FlowState,
    answers: &AnswerRecord,
    input: &str,
) -> Result<TransitionOutcome, FlowTransitionError> {
    let step_id = current.cursor.step_id().ok_or(FlowTransitionError::AlreadyComplete)?;
    let step = script.step(step_id).ok_or(FlowTransitionError::UnknownStep(step_id))?;
    let parsed = parse_input(step, input).ok_or_else(|| FlowTransitionError::InvalidInput {
        step: step_id,
        input: input.trim().to_owned(),
    })?;

    let mut answers = answers.clone();
    let mut pending = current.pending.clone();
    let mut notice = None;

    let cursor = match (&current.cursor, parsed) {
        (Cursor::At(StepId::GardenArea), Parsed::Number(area)) => {
            answers.garden_area_m2 = Some(area);
            Cursor::At(StepId::PavingGreenRatio)
        }
        (Cursor::At(StepId::PavingGreenRatio), Parsed::Choice(token)) => {
            let choice = two_way_choice(token);
            answers.paving_green_choice = Some(choice);
            match choice {
                RatioChoice::Preset(preset) => {
                    answers.paving_green = Some(TwoWaySplit::from_preset(preset));
                    Cursor::At(StepId::LawnPlantingRatio)
                }
                RatioChoice::Custom => {
                    answers.paving_green = None;
                    Cursor::At(StepId::PavingPct)
                }
            }
        }
        (Cursor::At(StepId::PavingPct), Parsed::Percent(pct)) => {
            Cursor::Confirm(PendingSplit::PavingGreen(TwoWaySplit::custom(pct)?))
        }
        (Cursor::At(StepId::LawnPlantingRatio), Parsed::Choice(token)) => {
            let choice = two_way_choice(token);
            answers.lawn_planting_choice = Some(choice);
            match choice {
                RatioChoice::Preset(preset) => {
                    answers.lawn_planting = Some(TwoWaySplit::from_preset(preset));
                    Cursor::At(StepId::SurfaceRatio)
                }
                RatioChoice::Custom => {
                    answers.lawn_planting = None;
                    Cursor::At(StepId::LawnPct)
                }
            }
        }
        (Cursor::At(StepId::LawnPct), Parsed::Percent(pct)) => {
            Cursor::Confirm(PendingSplit::LawnPlanting(TwoWaySplit::custom(pct)?))
        }
        (Cursor::At(StepId::SurfaceRatio), Parsed::Choice(token)) => {
            let choice = surface_choice(token);
            answers.surface_split_choice = Some(choice);
            match choice {
                SurfaceSplitChoice::Preset(preset) => {
                    answers.surface_split = Some(SurfaceSplit::from_preset(preset));
                    answers.clear_unused_materials();
                    enter_materials(Surface::Driveway, &mut answers)
                }
                SurfaceSplitChoice::Custom => {
                    answers.surface_split = None;
                    Cursor::At(StepId::DrivewayPct)
                }
            }
        }
        (Cursor::At(StepId::DrivewayPct), Parsed::Percent(driveway_pct)) => {
            Cursor::PathsShare { driveway_pct }
        }
        (Cursor::PathsShare { driveway_pct }, Parsed::Percent(paths_pct)) => {
            match SurfaceSplit::custom(*driveway_pct, paths_pct) {
                Ok(split) => Cursor::Confirm(PendingSplit::Surfaces(split)),
                Err(DomainError::InvalidSplit { total }) => {
                    notice = Some(format!(
                        "De totalen mogen samen niet boven 100% uitkomen. Nu is het {total}%. \
                         We vullen de verdeling opnieuw in."
                    ));
                    answers.surface_split = None;
                    Cursor::At(StepId::DrivewayPct)
                }
                Err(other) => return Err(other.into()),
            }
        }
        (Cursor::Confirm(split), Parsed::YesNo(true)) => confirm_split(*split, &mut answers),
        (Cursor::Confirm(split), Parsed::YesNo(false)) => {
            notice = Some("Geen probleem, dan vullen we de verdeling opnieuw in.".to_owned());
            restart_split(*split, &mut answers)
        }
        (Cursor::At(StepId::DrivewayMaterial), Parsed::Choice(token)) => {
            answers.materials.set(Surface::Driveway, Material::from_token(token));
            enter_materials(Surface::Paths, &mut answers)
        }
        (Cursor::At(StepId::PathsMaterial), Parsed::Choice(token)) => {
            answers.materials.set(Surface::Paths, Material::from_token(token));
            enter_materials(Surface::Terrace, &mut answers)
        }
        (Cursor::At(StepId::TerraceMaterial), Parsed::Choice(token)) => {
            answers.materials.set(Surface::Terrace, Material::from_token(token));
            Cursor::At(StepId::Jointing)
        }
        (Cursor::At(StepId::Jointing), Parsed::YesNo(value)) => {
            answers.weed_resistant_jointing = Some(value);
            Cursor::At(StepId::Canopy)
        }
        (Cursor::At(StepId::Canopy), Parsed::YesNo(value)) => {
            answers.canopy = Some(value);
            Cursor::At(StepId::Lighting)
        }
        (Cursor::At(StepId::Lighting), Parsed::YesNo(value)) => {
            answers.lighting = Some(value);
            Cursor::At(StepId::Wishes)
        }
        (Cursor::At(StepId::Wishes), Parsed::Selection(Selection::Nothing)) => Cursor::Complete,
        (Cursor::At(StepId::Wishes), Parsed::Selection(Selection::Tokens(tokens))) => {
            let selected: Vec<Wish> =
                Wish::ALL.into_iter().filter(|wish| tokens.contains(&wish.token())).collect();
            for wish in &selected {
                answers.add_wish(*wish);
            }
            let labels: Vec<&str> = selected.iter().map(|wish| wish.label()).collect();
            notice = selection_notice("opties", &labels);

            pending = PendingQueue::from_wishes(&selected);
            match pending.current() {
                Some(first) => Cursor::At(first.entry_step()),
                None => Cursor::Complete,
            }
        }
        (Cursor::At(StepId::FenceTypes), Parsed::Selection(Selection::Tokens(tokens))) => {
            let types: Vec<FenceType> =
                tokens.iter().copied().filter_map(FenceType::from_token).collect();
            let labels: Vec<&str> = types.iter().map(|fence| fence.label()).collect();
            notice = selection_notice("erfafscheiding", &labels);

            let cursor = FenceCursor::start(types.into_iter().collect()).ok_or_else(|| {
                FlowTransitionError::InvalidInput { step: step_id, input: input.trim().to_owned() }
            })?;
            Cursor::Fence(cursor)
        }
        (Cursor::Fence(fence), Parsed::Number(length_m)) if fence.stage == FenceStage::Length => {
            if fence.current.is_screen() {
                Cursor::Fence(FenceCursor { stage: FenceStage::Gate { length_m }, ..fence.clone() })
            } else {
                answers.fence_items.push(FenceItem::new(fence.current, length_m, None)?);
                next_fence(fence, &mut pending)
            }
        }
        (Cursor::Fence(fence), Parsed::YesNo(gate)) => match fence.stage {
            FenceStage::Gate { length_m } => {
                answers.fence_items.push(FenceItem::new(fence.current, length_m, Some(gate))?);
                next_fence(fence, &mut pending)
            }
            FenceStage::Length => {
                return Err(FlowTransitionError::InvalidTransition {
                    step: step_id,
                    cursor: current.cursor.clone(),
                })
            }
        },
        (Cursor::At(StepId::DeckingTier), Parsed::Choice(token)) => {
            answers.decking_tier = Some(match token {
                '1' => DeckingTier::Softwood,
                '2' => DeckingTier::Hardwood,
                _ => DeckingTier::Composite,
            });
            finish_sub_flow(&mut pending)
        }
        (Cursor::At(StepId::IrrigationScope), Parsed::Choice(token)) => {
            answers.irrigation_scope = Some(match token {
                '1' => IrrigationScope::Lawn,
                '2' => IrrigationScope::Planting,
                _ => IrrigationScope::Both,
            });
            finish_sub_flow(&mut pending)
        }
        (cursor, _) => {
            return Err(FlowTransitionError::InvalidTransition {
                step: step_id,
                cursor: cursor.clone(),
            })
        }
    };

    Ok(TransitionOutcome { from: step_id, state: FlowState { cursor, pending }, answers, notice })
}

fn render_prompt(script: &Script, cursor: &Cursor) -> String {
    match cursor {
        Cursor::Complete => COMPLETION_MESSAGE.to_owned(),
        Cursor::PathsShare { driveway_pct } => format!(
            "De oprit wordt {driveway_pct}%. Welk percentage van de bestrating wordt paden? \
             (0–{}%, de rest wordt terras)",
            100 - driveway_pct
        ),
        Cursor::Confirm(PendingSplit::PavingGreen(split)) => format!(
            "U kiest {}% bestrating en {}% groen. Klopt dat? (ja/nee)",
            split.first_pct, split.second_pct
        ),
        Cursor::Confirm(PendingSplit::LawnPlanting(split)) => format!(
            "U kiest {}% gazon en {}% beplanting. Klopt dat? (ja/nee)",
            split.first_pct, split.second_pct
        ),
        Cursor::Confirm(PendingSplit::Surfaces(split)) => format!(
            "U kiest {}% oprit, {}% paden en {}% terras. Klopt dat? (ja/nee)",
            split.driveway_pct, split.paths_pct, split.terrace_pct
        ),
        Cursor::Fence(FenceCursor { current, stage: FenceStage::Length, .. }) => {
            format!("Hoeveel meter {} is het ongeveer? (bijv. 10)", current.noun())
        }
        Cursor::Fence(FenceCursor { current, stage: FenceStage::Gate { .. }, .. }) => {
            format!("Wilt u bij deze {} ook een poortdeur opnemen? (ja/nee)", current.noun())
        }
        Cursor::At(step) => {
            script.step(*step).map(|step| step.prompt.clone()).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{FlowEngine, GardenIntakeFlow, IntakeFlow};
    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::domain::answers::{
        DeckingTier, FenceType, IrrigationScope, Material, Surface, TwoWaySplit, Wish,
    };
    use crate::domain::price_table::PriceTable;
    use crate::flows::script::{StepId, COMPLETION_MESSAGE};

    fn flow() -> IntakeFlow {
        IntakeFlow::new(&PriceTable::default())
    }

    fn answer_all(flow: &mut IntakeFlow, inputs: &[&str]) -> String {
        let mut last = String::new();
        for input in inputs {
            last = flow.handle(input).message;
        }
        last
    }

    #[test]
    fn preset_path_skips_percentage_steps() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "1"]);

        assert_eq!(flow.current_step(), Some(StepId::DrivewayMaterial));
        let answers = flow.current_answers();
        assert_eq!(answers.paving_green, Some(TwoWaySplit { first_pct: 50, second_pct: 50 }));
        assert_eq!(answers.surface_pct(Surface::Driveway), 50);
        assert_eq!(answers.surface_pct(Surface::Terrace), 20);
    }

    #[test]
    fn full_preset_run_completes_without_wishes() {
        let mut flow = flow();
        let last = answer_all(
            &mut flow,
            &["100 m²", "2", "2", "1", "2", "2", "2", "nee", "nee", "nee", "nee"],
        );

        assert_eq!(last, COMPLETION_MESSAGE);
        assert!(flow.is_complete());
        let answers = flow.current_answers();
        assert_eq!(answers.garden_area_m2, Some(Decimal::from(100)));
        assert_eq!(answers.materials.get(Surface::Paths), Some(Material::Concrete));
        assert_eq!(answers.weed_resistant_jointing, Some(false));
        assert!(answers.wishes.is_empty());
        assert!(answers.validate().is_ok());
    }

    #[test]
    fn invalid_input_reprompts_without_advancing_or_mutating() {
        let mut flow = flow();
        flow.handle("80");
        let before = flow.current_answers();

        let reply = flow.handle("7");

        assert!(!reply.complete);
        assert_eq!(reply.message, "Kies 1, 2, 3 of 4. Hoe wilt u de verhouding bestrating/groen?");
        assert_eq!(flow.current_step(), Some(StepId::PavingGreenRatio));
        assert_eq!(flow.current_answers(), before);
    }

    #[test]
    fn custom_two_way_split_computes_remainder_and_confirms() {
        let mut flow = flow();
        let reply = answer_all(&mut flow, &["100", "4", "65"]);

        assert_eq!(reply, "U kiest 65% bestrating en 35% groen. Klopt dat? (ja/nee)");
        assert_eq!(flow.current_answers().paving_green, None);

        flow.handle("ja");
        assert_eq!(
            flow.current_answers().paving_green,
            Some(TwoWaySplit { first_pct: 65, second_pct: 35 })
        );
        assert_eq!(flow.current_step(), Some(StepId::LawnPlantingRatio));
    }

    #[test]
    fn rejected_confirmation_restarts_the_split() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "4", "40"]);

        let reply = flow.handle("nee");

        assert!(reply.message.starts_with("Geen probleem"));
        assert_eq!(flow.current_step(), Some(StepId::LawnPct));
        assert_eq!(flow.current_answers().lawn_planting, None);
    }

    #[test]
    fn three_way_overflow_restarts_instead_of_clamping() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "5", "70"]);

        let reply = flow.handle("40");

        assert!(reply.message.contains("Nu is het 110%"), "{}", reply.message);
        assert_eq!(flow.current_step(), Some(StepId::DrivewayPct));
        assert_eq!(flow.current_answers().surface_split, None);
    }

    #[test]
    fn zero_share_surface_skips_its_material_question() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "5", "0", "60"]);
        let confirm = flow.handle("ja");

        assert_eq!(flow.current_step(), Some(StepId::PathsMaterial));
        assert!(confirm.message.starts_with("Welk materiaal wilt u voor de paden?"));
        let answers = flow.current_answers();
        assert_eq!(answers.surface_pct(Surface::Terrace), 40);
        assert_eq!(answers.materials.get(Surface::Driveway), None);

        flow.handle("4");
        flow.handle("1");
        let answers = flow.current_answers();
        assert_eq!(answers.materials.get(Surface::Paths), Some(Material::Ceramic));
        assert_eq!(answers.materials.get(Surface::Terrace), Some(Material::Gravel));
        assert_eq!(flow.current_step(), Some(StepId::Jointing));
    }

    #[test]
    fn wishes_queue_visits_fencing_then_decking_then_irrigation() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "1", "2", "2", "2", "ja", "nee", "nee"]);

        let reply = flow.handle("3, 2 1 5");
        assert!(reply.message.starts_with("Gekozen opties: Erfafscheiding, Vlonder, Beregening, Vijver."));
        assert_eq!(flow.current_step(), Some(StepId::FenceTypes));

        let reply = flow.handle("21");
        assert!(reply.message.starts_with("Gekozen erfafscheiding: Betonschutting, Haag."));
        assert!(reply.message.ends_with("Hoeveel meter betonschutting is het ongeveer? (bijv. 10)"));

        let reply = flow.handle("12,5");
        assert_eq!(reply.message, "Wilt u bij deze betonschutting ook een poortdeur opnemen? (ja/nee)");
        let reply = flow.handle("ja");
        assert_eq!(reply.message, "Hoeveel meter haag is het ongeveer? (bijv. 10)");
        flow.handle("8");

        assert_eq!(flow.current_step(), Some(StepId::DeckingTier));
        flow.handle("2");
        assert_eq!(flow.current_step(), Some(StepId::IrrigationScope));
        let reply = flow.handle("1");

        assert!(reply.complete);
        let answers = flow.current_answers();
        assert_eq!(answers.fence_items.len(), 2);
        assert_eq!(answers.fence_items[0].fence_type, FenceType::ConcreteScreen);
        assert_eq!(answers.fence_items[0].length_m, Decimal::new(125, 1));
        assert_eq!(answers.fence_items[0].gate, Some(true));
        assert_eq!(answers.fence_items[1].gate, None);
        assert_eq!(answers.decking_tier, Some(DeckingTier::Hardwood));
        assert_eq!(answers.irrigation_scope, Some(IrrigationScope::Lawn));
        assert!(answers.has_wish(Wish::Pond));
    }

    #[test]
    fn recorded_only_wishes_complete_immediately() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "1", "2", "2", "2", "nee", "nee", "nee"]);

        let reply = flow.handle("4");

        assert!(reply.complete);
        assert_eq!(flow.current_answers().wishes, vec![Wish::Pool]);
    }

    #[test]
    fn fence_type_question_rejects_nee() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "1", "2", "2", "2", "nee", "nee", "nee", "1"]);

        let reply = flow.handle("nee");

        assert!(!reply.complete);
        assert_eq!(flow.current_step(), Some(StepId::FenceTypes));
    }

    #[test]
    fn handling_after_completion_repeats_completion() {
        let mut flow = flow();
        answer_all(&mut flow, &["100", "2", "2", "1", "2", "2", "2", "nee", "nee", "nee", "nee"]);

        let reply = flow.handle("iets anders");
        assert!(reply.complete);
        assert_eq!(reply.message, COMPLETION_MESSAGE);
    }

    #[test]
    fn audited_transitions_record_rejections() {
        let engine = FlowEngine::new(GardenIntakeFlow::new(&PriceTable::default()));
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some("session-1".to_owned()), "req-1", "customer");
        let state = engine.initial_state();

        let rejected = engine.apply_with_audit(&state, &Default::default(), "groot", &sink, &audit);
        assert!(rejected.is_err());
        let accepted = engine.apply_with_audit(&state, &Default::default(), "60", &sink, &audit);
        assert!(accepted.is_ok());

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
        assert_eq!(events[1].event_type, "intake.step_answered");
        assert_eq!(events[1].session_id.as_deref(), Some("session-1"));
    }
}
