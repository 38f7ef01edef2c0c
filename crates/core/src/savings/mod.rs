pub mod menu;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::answers::{
    AnswerRecord, DeckingTier, FenceType, Material, Surface, TwoWayPreset, Wish,
};
use crate::domain::estimate::{CostEstimate, PriceRange};
use crate::domain::price_table::PriceKey;
use crate::estimate::{EstimateError, Estimator};
use crate::flows::parse::{parse_choice, parse_multi_select, Selection};

const PAVING_RATIO_KEYS: &[PriceKey] = &[
    PriceKey::SoilRemovalPerM3,
    PriceKey::SandSupplyPerM3,
    PriceKey::RubbleSupplyPerM3,
    PriceKey::SawCuttingPerM1,
    PriceKey::JointingPerM2,
    PriceKey::IrrigationBasicPerM2,
    PriceKey::CeramicPavingPerM2,
    PriceKey::ConcreteBakedPavingPerM2,
    PriceKey::GravelPerM2,
    PriceKey::TurfPerM2,
    PriceKey::BorderPlantingPerM2,
];

const MATERIAL_KEYS: &[PriceKey] = &[
    PriceKey::CeramicPavingPerM2,
    PriceKey::ConcreteBakedPavingPerM2,
    PriceKey::GravelPerM2,
    PriceKey::JointingPerM2,
    PriceKey::SawCuttingPerM1,
];

const EXTRAS_KEYS: &[PriceKey] = &[
    PriceKey::JointingPerM2,
    PriceKey::CanopyBasicPerUnit,
    PriceKey::LightingBasicPerUnit,
    PriceKey::IrrigationBasicPerM2,
];

const DECKING_KEYS: &[PriceKey] = &[
    PriceKey::DeckingSoftwoodPerM2,
    PriceKey::DeckingHardwoodPerM2,
    PriceKey::DeckingCompositePerM2,
];

const FENCE_KEYS: &[PriceKey] = &[
    PriceKey::HedgePlantingPerM1,
    PriceKey::ConcreteScreenPerM1,
    PriceKey::DesignScreenPerM1,
    PriceKey::GatePerUnit,
];

/// Ratios offered when shifting toward more green, in menu order.
const RATIO_CANDIDATES: [(TwoWayPreset, &str); 2] = [
    (TwoWayPreset::Balanced, "50/50 (gemengd)"),
    (TwoWayPreset::Light, "30/70 (veel groen)"),
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SavingsError {
    #[error("savings category `{0}` does not apply to these answers")]
    NotApplicable(SavingsCategory),
    #[error("the maximum of {max_applied_changes} applied changes has been reached")]
    LimitReached { max_applied_changes: u32 },
    #[error("`{0}` is not one of the offered options")]
    UnknownOption(String),
    #[error("no savings action selected")]
    NothingSelected,
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsCategory {
    PavingRatio,
    Extras,
    Material,
    Decking,
    Fencing,
    Gates,
}

impl SavingsCategory {
    pub const ALL: [Self; 6] =
        [Self::PavingRatio, Self::Extras, Self::Material, Self::Decking, Self::Fencing, Self::Gates];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PavingRatio => "paving_ratio",
            Self::Extras => "extras",
            Self::Material => "material",
            Self::Decking => "decking",
            Self::Fencing => "fencing",
            Self::Gates => "gates",
        }
    }

    /// Line items whose delta is shown as this category's saving.
    pub fn linked_keys(self) -> &'static [PriceKey] {
        match self {
            Self::PavingRatio => PAVING_RATIO_KEYS,
            Self::Extras => EXTRAS_KEYS,
            Self::Material => MATERIAL_KEYS,
            Self::Decking => DECKING_KEYS,
            Self::Fencing | Self::Gates => FENCE_KEYS,
        }
    }

    pub fn is_multi_select(self) -> bool {
        matches!(self, Self::Extras | Self::Fencing | Self::Gates)
    }

    pub fn applies_to(self, answers: &AnswerRecord) -> bool {
        match self {
            Self::PavingRatio => answers.garden_area_m2.is_some(),
            Self::Extras => Extra::ALL.iter().any(|extra| extra.is_selected(answers)),
            Self::Material => Surface::ALL.iter().any(|surface| answers.surface_pct(*surface) > 0),
            Self::Decking => answers.has_wish(Wish::Decking),
            Self::Fencing => !answers.fence_items.is_empty(),
            Self::Gates => answers.total_gate_count() > 0,
        }
    }
}

impl fmt::Display for SavingsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional extras that can be dropped one by one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extra {
    Jointing,
    Canopy,
    Lighting,
    Irrigation,
}

impl Extra {
    pub const ALL: [Self; 4] = [Self::Jointing, Self::Canopy, Self::Lighting, Self::Irrigation];

    pub fn label(self) -> &'static str {
        match self {
            Self::Jointing => "Voegen",
            Self::Canopy => "Overkapping",
            Self::Lighting => "Verlichting",
            Self::Irrigation => "Beregening",
        }
    }

    pub fn linked_keys(self) -> &'static [PriceKey] {
        match self {
            Self::Jointing => &[PriceKey::JointingPerM2],
            Self::Canopy => &[PriceKey::CanopyBasicPerUnit],
            Self::Lighting => &[PriceKey::LightingBasicPerUnit],
            Self::Irrigation => &[PriceKey::IrrigationBasicPerM2],
        }
    }

    pub fn is_selected(self, answers: &AnswerRecord) -> bool {
        match self {
            Self::Jointing => answers.weed_resistant_jointing == Some(true),
            Self::Canopy => answers.canopy == Some(true),
            Self::Lighting => answers.lighting == Some(true),
            Self::Irrigation => answers.has_wish(Wish::Irrigation),
        }
    }
}

/// One concrete mutation of an answer record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum SavingsAction {
    SetPavingRatio { preset: TwoWayPreset },
    RemoveExtra { extra: Extra },
    DowngradeMaterial { surfaces: Vec<Surface>, material: Material },
    DowngradeDecking { tier: DeckingTier },
    RemoveDecking,
    RemoveFence { fence_type: FenceType },
    DropGates { fence_type: FenceType },
}

impl SavingsAction {
    pub fn category(&self) -> SavingsCategory {
        match self {
            Self::SetPavingRatio { .. } => SavingsCategory::PavingRatio,
            Self::RemoveExtra { .. } => SavingsCategory::Extras,
            Self::DowngradeMaterial { .. } => SavingsCategory::Material,
            Self::DowngradeDecking { .. } | Self::RemoveDecking => SavingsCategory::Decking,
            Self::RemoveFence { .. } => SavingsCategory::Fencing,
            Self::DropGates { .. } => SavingsCategory::Gates,
        }
    }

    pub fn linked_keys(&self) -> &'static [PriceKey] {
        match self {
            Self::RemoveExtra { extra } => extra.linked_keys(),
            other => other.category().linked_keys(),
        }
    }

    /// Mutates `answers` and describes the change, or returns `None` when
    /// the action would not make anything cheaper.
    fn apply_to(&self, answers: &mut AnswerRecord) -> Option<String> {
        match self {
            Self::SetPavingRatio { preset } => {
                let current = answers.paving_green.map(|split| split.first_pct).unwrap_or(50);
                if preset.first_pct() >= current {
                    return None;
                }
                answers.set_paving_green(*preset);
                Some(format!("verhouding bestrating/groen aangepast naar {}", preset.code()))
            }
            Self::RemoveExtra { extra } => {
                if !extra.is_selected(answers) {
                    return None;
                }
                match extra {
                    Extra::Jointing => answers.weed_resistant_jointing = Some(false),
                    Extra::Canopy => answers.canopy = Some(false),
                    Extra::Lighting => answers.lighting = Some(false),
                    Extra::Irrigation => {
                        answers.remove_wish(Wish::Irrigation);
                        answers.irrigation_scope = None;
                    }
                }
                Some(format!("{} verwijderd", extra.label().to_lowercase()))
            }
            Self::DowngradeMaterial { surfaces, material } => {
                let mut changed: Vec<&str> = Vec::new();
                for surface in Surface::ALL.into_iter().filter(|surface| surfaces.contains(surface)) {
                    if answers.surface_pct(surface) == 0 {
                        continue;
                    }
                    let current = answers.materials.get(surface).unwrap_or(Material::Concrete);
                    if material.tier() >= current.tier() {
                        continue;
                    }
                    answers.materials.set(surface, Some(*material));
                    changed.push(surface_name(surface));
                }
                (!changed.is_empty()).then(|| {
                    format!(
                        "materiaal aangepast naar {} voor: {}",
                        material.label(),
                        changed.join(", ")
                    )
                })
            }
            Self::DowngradeDecking { tier } => {
                let current = answers.decking_tier.unwrap_or(DeckingTier::Composite);
                if !answers.has_wish(Wish::Decking) || tier.tier() >= current.tier() {
                    return None;
                }
                answers.decking_tier = Some(*tier);
                Some(format!("vlonder aangepast naar {} (goedkoper)", tier.label()))
            }
            Self::RemoveDecking => {
                if !answers.has_wish(Wish::Decking) {
                    return None;
                }
                answers.remove_wish(Wish::Decking);
                answers.decking_tier = None;
                Some("vlonder verwijderd".to_owned())
            }
            Self::RemoveFence { fence_type } => {
                let before = answers.fence_items.len();
                answers.fence_items.retain(|item| item.fence_type != *fence_type);
                if answers.fence_items.len() == before {
                    return None;
                }
                if answers.fence_items.is_empty() {
                    answers.remove_wish(Wish::Fencing);
                }
                Some(format!("verwijderd: {}", fence_type.noun()))
            }
            Self::DropGates { fence_type } => {
                let mut dropped = false;
                for item in answers.fence_items.iter_mut() {
                    if item.fence_type == *fence_type && item.has_gate() {
                        item.gate = Some(false);
                        dropped = true;
                    }
                }
                dropped.then(|| format!("poortdeur(en) bij {} laten vervallen", fence_type.noun()))
            }
        }
    }
}

fn surface_name(surface: Surface) -> &'static str {
    match surface {
        Surface::Driveway => "oprit",
        Surface::Paths => "paden",
        Surface::Terrace => "terras",
    }
}

/// Saving over `keys`, or `None` unless the maximum saving is positive.
/// Both bounds are clamped at zero and returned in ascending order.
pub fn linked_saving(
    current: &CostEstimate,
    projected: &CostEstimate,
    keys: &[PriceKey],
) -> Option<PriceRange> {
    let before = current.linked_sum(keys);
    let after = projected.linked_sum(keys);
    let saving_min = before.min - after.min;
    let saving_max = before.max - after.max;
    if saving_max <= Decimal::ZERO {
        return None;
    }

    let low = saving_min.max(Decimal::ZERO);
    let high = saving_max.max(Decimal::ZERO);
    Some(PriceRange::new(low.min(high), low.max(high)))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SavingsOption {
    pub token: char,
    pub action: SavingsAction,
    pub label: String,
    /// Preview only; the caller re-estimates after applying.
    pub projected: CostEstimate,
    pub saving: PriceRange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub category: SavingsCategory,
    pub menu_text: String,
    pub options: Vec<SavingsOption>,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn option(&self, token: char) -> Option<&SavingsOption> {
        self.options.iter().find(|option| option.token == token)
    }

    pub fn tokens(&self) -> Vec<char> {
        self.options.iter().map(|option| option.token).collect()
    }

    /// Resolves the customer's reply into the actions to apply.
    pub fn select(&self, raw: &str) -> Result<Vec<SavingsAction>, SavingsError> {
        let tokens = self.tokens();
        let chosen = if self.category.is_multi_select() {
            match parse_multi_select(raw, &tokens) {
                Some(Selection::Tokens(chosen)) => chosen,
                Some(Selection::Nothing) => return Err(SavingsError::NothingSelected),
                None => return Err(SavingsError::UnknownOption(raw.trim().to_owned())),
            }
        } else {
            let token = parse_choice(raw, &tokens)
                .ok_or_else(|| SavingsError::UnknownOption(raw.trim().to_owned()))?;
            vec![token]
        };

        Ok(chosen
            .into_iter()
            .filter_map(|token| self.option(token))
            .map(|option| option.action.clone())
            .collect())
    }
}

/// Caps how many changes a session may apply. Previews are free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBudget {
    max_applied_changes: u32,
    applied_changes: u32,
}

impl ChangeBudget {
    pub fn new(max_applied_changes: u32) -> Self {
        Self { max_applied_changes, applied_changes: 0 }
    }

    pub fn max_applied_changes(&self) -> u32 {
        self.max_applied_changes
    }

    pub fn applied_changes(&self) -> u32 {
        self.applied_changes
    }

    pub fn remaining(&self) -> u32 {
        self.max_applied_changes.saturating_sub(self.applied_changes)
    }

    pub fn is_exhausted(&self) -> bool {
        self.applied_changes >= self.max_applied_changes
    }

    fn record(&mut self) {
        self.applied_changes = self.applied_changes.saturating_add(1);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppliedChange {
    pub answers: AnswerRecord,
    pub explanation: String,
    /// `false` when nothing was cheaper; such a call leaves the budget alone.
    pub changed: bool,
}

/// Proposes strictly-cheaper alternatives and applies the chosen ones.
#[derive(Clone, Debug)]
pub struct SavingsEngine<E> {
    estimator: E,
}

impl<E> SavingsEngine<E>
where
    E: Estimator,
{
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn applicable_categories(&self, answers: &AnswerRecord) -> Vec<SavingsCategory> {
        SavingsCategory::ALL.into_iter().filter(|category| category.applies_to(answers)).collect()
    }

    pub fn propose(
        &self,
        category: SavingsCategory,
        answers: &AnswerRecord,
        current: &CostEstimate,
    ) -> Result<Proposal, SavingsError> {
        match category {
            SavingsCategory::Material => self.propose_material(&Surface::ALL, answers, current),
            _ => {
                if !category.applies_to(answers) {
                    return Err(SavingsError::NotApplicable(category));
                }
                let (header, candidates) = candidates(category, answers);
                self.build_proposal(category, header, candidates, answers, current, None)
            }
        }
    }

    /// Material downgrades for the chosen surfaces. Tokens follow the fixed
    /// material menu, so `1` is always gravel.
    pub fn propose_material(
        &self,
        surfaces: &[Surface],
        answers: &AnswerRecord,
        current: &CostEstimate,
    ) -> Result<Proposal, SavingsError> {
        let targets: Vec<(Surface, Material)> = Surface::ALL
            .into_iter()
            .filter(|surface| surfaces.contains(surface) && answers.surface_pct(*surface) > 0)
            .map(|surface| (surface, answers.materials.get(surface).unwrap_or(Material::Concrete)))
            .collect();
        let Some(highest_tier) = targets.iter().map(|(_, material)| material.tier()).max() else {
            return Err(SavingsError::NotApplicable(SavingsCategory::Material));
        };

        let mut header = vec!["Huidige materiaalkeuze:".to_owned()];
        for (surface, material) in &targets {
            header.push(format!("- {}: {}", surface.label(), material.label()));
        }
        header.push(String::new());
        header.push(
            "Kies een goedkoper materiaal (1 is goedkoopst, 4 is duurst). Ik toon alleen \
             goedkopere opties:"
                .to_owned(),
        );

        let surfaces: Vec<Surface> = targets.iter().map(|(surface, _)| *surface).collect();
        let candidates = Material::ALL
            .into_iter()
            .filter(|material| material.tier() < highest_tier)
            .map(|material| {
                (
                    SavingsAction::DowngradeMaterial { surfaces: surfaces.clone(), material },
                    material.label().to_owned(),
                )
            })
            .collect();

        self.build_proposal(
            SavingsCategory::Material,
            header,
            candidates,
            answers,
            current,
            Some(material_token),
        )
    }

    /// Applies `actions` to a copy of `answers`. The budget is checked
    /// before anything else and only consumed when the record changed.
    pub fn apply(
        &self,
        budget: &mut ChangeBudget,
        answers: &AnswerRecord,
        actions: &[SavingsAction],
    ) -> Result<AppliedChange, SavingsError> {
        if budget.is_exhausted() {
            info!(
                event_name = "savings.limit_reached",
                max_applied_changes = budget.max_applied_changes(),
                "savings change rejected, budget exhausted"
            );
            return Err(SavingsError::LimitReached {
                max_applied_changes: budget.max_applied_changes(),
            });
        }
        if actions.is_empty() {
            return Err(SavingsError::NothingSelected);
        }
        for action in actions {
            if !action.category().applies_to(answers) {
                return Err(SavingsError::NotApplicable(action.category()));
            }
        }

        let mut next = answers.clone();
        let fragments: Vec<String> =
            actions.iter().filter_map(|action| action.apply_to(&mut next)).collect();
        let changed = !fragments.is_empty();
        if changed {
            budget.record();
            info!(
                event_name = "savings.change_applied",
                category = %actions[0].category(),
                actions = actions.len(),
                applied_changes = budget.applied_changes(),
                remaining = budget.remaining(),
                "savings change applied"
            );
        }

        Ok(AppliedChange {
            answers: if changed { next } else { answers.clone() },
            explanation: menu::applied(&fragments),
            changed,
        })
    }

    fn build_proposal(
        &self,
        category: SavingsCategory,
        header: Vec<String>,
        candidates: Vec<(SavingsAction, String)>,
        answers: &AnswerRecord,
        current: &CostEstimate,
        token_for: Option<fn(&SavingsAction) -> Option<char>>,
    ) -> Result<Proposal, SavingsError> {
        let mut options = Vec::new();
        for (action, label) in candidates {
            let mut preview = answers.clone();
            if action.apply_to(&mut preview).is_none() {
                continue;
            }
            let projected = self.estimator.estimate(&preview)?;
            let Some(saving) = linked_saving(current, &projected, action.linked_keys()) else {
                continue;
            };
            let token = match token_for {
                Some(token_for) => token_for(&action),
                None => char::from_digit(options.len() as u32 + 1, 10),
            };
            let Some(token) = token else {
                continue;
            };
            options.push(SavingsOption { token, action, label, projected, saving });
        }

        debug!(
            event_name = "savings.proposed",
            category = %category,
            options = options.len(),
            "savings options proposed"
        );
        let menu_text = menu::proposal(category, header, &options);
        Ok(Proposal { category, menu_text, options })
    }
}

fn material_token(action: &SavingsAction) -> Option<char> {
    match action {
        SavingsAction::DowngradeMaterial { material, .. } => Some(material.token()),
        _ => None,
    }
}

/// Candidate actions and menu header for every category except material.
fn candidates(
    category: SavingsCategory,
    answers: &AnswerRecord,
) -> (Vec<String>, Vec<(SavingsAction, String)>) {
    match category {
        SavingsCategory::PavingRatio => (
            vec!["Welke verhouding wilt u kiezen? (ik toon alleen opties die goedkoper uitpakken)"
                .to_owned()],
            RATIO_CANDIDATES
                .into_iter()
                .map(|(preset, label)| {
                    (SavingsAction::SetPavingRatio { preset }, label.to_owned())
                })
                .collect(),
        ),
        SavingsCategory::Extras => (
            vec![
                "Welke extra’s wilt u weglaten?".to_owned(),
                "(u kunt meerdere opties tegelijk kiezen, bijv. 1,3)".to_owned(),
                "Ik toon alleen opties die goedkoper uitpakken:".to_owned(),
            ],
            Extra::ALL
                .into_iter()
                .filter(|extra| extra.is_selected(answers))
                .map(|extra| (SavingsAction::RemoveExtra { extra }, extra.label().to_owned()))
                .collect(),
        ),
        SavingsCategory::Decking => {
            let current = answers.decking_tier.unwrap_or(DeckingTier::Composite);
            let mut options: Vec<(SavingsAction, String)> = DeckingTier::ALL
                .into_iter()
                .rev()
                .filter(|tier| tier.tier() < current.tier())
                .map(|tier| (SavingsAction::DowngradeDecking { tier }, tier.label().to_owned()))
                .collect();
            options.push((SavingsAction::RemoveDecking, "Vlonder verwijderen".to_owned()));
            (
                vec![
                    format!("Huidige vlonder: {}", current.label()),
                    String::new(),
                    "Kies een goedkopere optie. Ik toon alleen opties die goedkoper uitpakken:"
                        .to_owned(),
                ],
                options,
            )
        }
        SavingsCategory::Fencing => {
            let mut header = vec!["Uw huidige erfafscheiding (op basis van uw invoer):".to_owned()];
            let mut options = Vec::new();
            for fence_type in FenceType::ALL {
                let length = answers.fence_length(fence_type);
                if length.is_zero() {
                    continue;
                }
                let shown = menu::format_length(length);
                header.push(format!("- {}: {shown}", fence_type.label()));
                options.push((
                    SavingsAction::RemoveFence { fence_type },
                    format!("{} verwijderen (nu: {shown})", fence_type.label()),
                ));
            }
            header.push(String::new());
            header.push(
                "Wat wilt u verwijderen? (u kunt meerdere opties tegelijk kiezen, bijv. 1,3)"
                    .to_owned(),
            );
            header.push("Ik toon alleen opties die goedkoper uitpakken:".to_owned());
            (header, options)
        }
        SavingsCategory::Gates => {
            let mut header = vec!["Uw huidige poortdeuren:".to_owned()];
            let mut options = Vec::new();
            for fence_type in FenceType::ALL.into_iter().filter(|kind| kind.is_screen()) {
                let gates = answers.gate_count(fence_type);
                if gates == 0 {
                    continue;
                }
                header.push(format!("- {}: {gates} st", fence_type.label()));
                options.push((
                    SavingsAction::DropGates { fence_type },
                    format!(
                        "Poortdeur(en) bij {} laten vervallen (nu: {gates} st)",
                        fence_type.noun()
                    ),
                ));
            }
            header.push(String::new());
            header.push(
                "Welke poortdeuren wilt u laten vervallen? (u kunt meerdere opties tegelijk \
                 kiezen, bijv. 1,2)"
                    .to_owned(),
            );
            header.push("Ik toon alleen opties die goedkoper uitpakken:".to_owned());
            (header, options)
        }
        SavingsCategory::Material => (Vec::new(), Vec::new()),
    }
}
