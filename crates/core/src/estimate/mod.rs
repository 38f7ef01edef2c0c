pub mod format;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::answers::{
    AnswerRecord, DeckingTier, FenceType, IrrigationScope, Material, Surface, TwoWaySplit, Wish,
};
use crate::domain::estimate::{CostEstimate, CostLineItem, EstimateMetrics, PriceRange};
use crate::domain::price_table::{PriceKey, PriceTable, PriceTableError};

pub use format::{format_eur, format_for_customer};

const SURFACE_NOTE: &str =
    "Indicatief; onderbouw/fundering, snijwerk en complexiteit beïnvloeden prijs.";
const EARTHWORKS_NOTE: &str =
    "Indicatief; grondwerk kan afwijken als de bestaande ondergrond al geschikt is.";
const LEFTOVER_LABEL: &str = "Overige wensen";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    #[error("garden area is missing or invalid")]
    MissingArea,
    #[error(transparent)]
    Prices(#[from] PriceTableError),
}

/// Heuristic constants behind the derived quantities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRules {
    /// Share used for each unset two-way split.
    pub default_split_share: Decimal,
    /// Surfaces at or below this area get no line item.
    pub min_surface_m2: Decimal,
    pub paths_terrace_soil_depth_m: Decimal,
    pub paths_terrace_sand_depth_m: Decimal,
    pub driveway_soil_depth_m: Decimal,
    pub driveway_rubble_depth_m: Decimal,
    pub driveway_sand_depth_m: Decimal,
    pub saw_min_m1_per_m2: Decimal,
    pub saw_max_m1_per_m2: Decimal,
    pub decking_share: Decimal,
    pub decking_min_m2: Decimal,
    pub decking_max_m2: Decimal,
}

impl Default for EstimateRules {
    fn default() -> Self {
        Self {
            default_split_share: Decimal::new(5, 1),
            min_surface_m2: Decimal::new(1, 2),
            paths_terrace_soil_depth_m: Decimal::new(20, 2),
            paths_terrace_sand_depth_m: Decimal::new(15, 2),
            driveway_soil_depth_m: Decimal::new(35, 2),
            driveway_rubble_depth_m: Decimal::new(25, 2),
            driveway_sand_depth_m: Decimal::new(5, 2),
            saw_min_m1_per_m2: Decimal::new(3, 1),
            saw_max_m1_per_m2: Decimal::new(5, 1),
            decking_share: Decimal::new(12, 2),
            decking_min_m2: Decimal::from(6),
            decking_max_m2: Decimal::from(12),
        }
    }
}

pub trait Estimator: Send + Sync {
    fn estimate(&self, answers: &AnswerRecord) -> Result<CostEstimate, EstimateError>;
}

/// Pure answer-record-to-estimate function over an injected price table.
#[derive(Clone, Debug)]
pub struct DeterministicEstimator {
    prices: Arc<PriceTable>,
    rules: EstimateRules,
}

impl DeterministicEstimator {
    pub fn new(prices: Arc<PriceTable>, rules: EstimateRules) -> Self {
        Self { prices, rules }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn rules(&self) -> &EstimateRules {
        &self.rules
    }
}

impl Default for DeterministicEstimator {
    fn default() -> Self {
        Self::new(Arc::new(PriceTable::default()), EstimateRules::default())
    }
}

impl Estimator for DeterministicEstimator {
    fn estimate(&self, answers: &AnswerRecord) -> Result<CostEstimate, EstimateError> {
        let estimate = estimate_garden(&self.prices, &self.rules, answers)?;
        debug!(
            event_name = "estimate.computed",
            total_min = %estimate.total.min,
            total_max = %estimate.total.max,
            line_items = estimate.items.len(),
            "cost estimate computed"
        );
        Ok(estimate)
    }
}

struct LineBuilder<'a> {
    prices: &'a PriceTable,
    items: Vec<CostLineItem>,
}

impl<'a> LineBuilder<'a> {
    /// Adds `quantity × unit price` under the table's label.
    fn per_unit(
        &mut self,
        key: PriceKey,
        quantity: Decimal,
        note: impl Into<String>,
    ) -> Result<(), EstimateError> {
        let label = self.prices.entry(key)?.label.clone();
        self.per_unit_labelled(key, label, quantity, note)
    }

    fn per_unit_labelled(
        &mut self,
        key: PriceKey,
        label: String,
        quantity: Decimal,
        note: impl Into<String>,
    ) -> Result<(), EstimateError> {
        if quantity <= Decimal::ZERO {
            return Ok(());
        }
        let entry = self.prices.entry(key)?;
        let range = entry.range() * quantity;
        self.items.push(CostLineItem::priced(key, label, entry.unit.clone(), quantity, range, note));
        Ok(())
    }
}

fn split_share(split: Option<TwoWaySplit>, default_share: Decimal) -> Decimal {
    split.map(|split| split.first_fraction()).unwrap_or(default_share)
}

fn estimate_garden(
    prices: &PriceTable,
    rules: &EstimateRules,
    answers: &AnswerRecord,
) -> Result<CostEstimate, EstimateError> {
    let area = answers
        .garden_area_m2
        .filter(|area| *area > Decimal::ZERO)
        .ok_or(EstimateError::MissingArea)?;

    let mut metrics = EstimateMetrics::default();
    let mut lines = LineBuilder { prices, items: Vec::new() };

    let paving_share = split_share(answers.paving_green, rules.default_split_share);
    let paving_m2 = area * paving_share;
    let green_m2 = (area - paving_m2).max(Decimal::ZERO);
    let lawn_share = split_share(answers.lawn_planting, rules.default_split_share);
    let lawn_m2 = green_m2 * lawn_share;
    let border_m2 = green_m2 * (Decimal::ONE - lawn_share);

    metrics.record("garden_area_m2", area);
    metrics.record("paving_share", paving_share);
    metrics.record("paving_m2", paving_m2);
    metrics.record("green_m2", green_m2);
    metrics.record("lawn_m2", lawn_m2);
    metrics.record("border_m2", border_m2);

    let surface_m2 = |surface: Surface| {
        paving_m2 * Decimal::from(answers.surface_pct(surface)) / Decimal::ONE_HUNDRED
    };
    let surfaces = Surface::ALL.map(|surface| (surface, surface_m2(surface)));

    let mut stone_m2 = Decimal::ZERO;
    for (surface, surface_area) in surfaces {
        metrics.record(&format!("{}_m2", surface_metric(surface)), surface_area);
        if surface_area <= rules.min_surface_m2 {
            continue;
        }
        let material = answers.effective_material(surface).unwrap_or(Material::Concrete);
        if material.is_paving_stone() {
            stone_m2 += surface_area;
        }
        lines.per_unit_labelled(
            PriceKey::for_material(material),
            format!("{} – {}", surface.label(), material.label()),
            surface_area,
            SURFACE_NOTE,
        )?;
    }
    metrics.record("stone_m2", stone_m2);

    let driveway_m2 = surfaces[0].1;
    let paths_terrace_m2 = surfaces[1].1 + surfaces[2].1;
    let earthworks = [
        (
            PriceKey::SoilRemovalPerM3,
            paths_terrace_m2 * rules.paths_terrace_soil_depth_m
                + driveway_m2 * rules.driveway_soil_depth_m,
        ),
        (
            PriceKey::SandSupplyPerM3,
            paths_terrace_m2 * rules.paths_terrace_sand_depth_m
                + driveway_m2 * rules.driveway_sand_depth_m,
        ),
        (PriceKey::RubbleSupplyPerM3, driveway_m2 * rules.driveway_rubble_depth_m),
    ];
    let mut earthwork_lines = LineBuilder { prices, items: Vec::new() };
    for (key, volume) in earthworks {
        metrics.record(&format!("{key}_volume"), volume);
        earthwork_lines.per_unit(key, volume, EARTHWORKS_NOTE)?;
    }

    if stone_m2 > rules.min_surface_m2 {
        let saw_min = stone_m2 * rules.saw_min_m1_per_m2;
        let saw_max = stone_m2 * rules.saw_max_m1_per_m2;
        metrics.record("saw_min_m1", saw_min);
        metrics.record("saw_max_m1", saw_max);

        let entry = prices.entry(PriceKey::SawCuttingPerM1)?;
        let range = PriceRange::new(entry.min * saw_min, entry.max * saw_max);
        let note = format!(
            "Schatting {}–{} m¹ zaagwerk (afhankelijk van randen/hoeken/obstakels).",
            format::round_whole(saw_min),
            format::round_whole(saw_max)
        );
        lines.items.push(CostLineItem::priced(
            PriceKey::SawCuttingPerM1,
            entry.label.clone(),
            entry.unit.clone(),
            (saw_min + saw_max) / Decimal::TWO,
            range,
            note,
        ));
    }

    lines.per_unit(
        PriceKey::TurfPerM2,
        lawn_m2,
        "Indicatief; afhankelijk van ondergrond, egaliseren en bereikbaarheid.",
    )?;
    lines.per_unit(
        PriceKey::BorderPlantingPerM2,
        border_m2,
        "Indicatief; soort beplanting en plantdichtheid beïnvloeden de prijs.",
    )?;

    let mut leftover: Vec<Wish> = answers.wishes.clone();

    if answers.has_wish(Wish::Fencing) && !answers.fence_items.is_empty() {
        for fence_type in FenceType::ALL {
            lines.per_unit(
                PriceKey::for_fence(fence_type),
                answers.fence_length(fence_type),
                "Indicatief; afhankelijk van uitvoering, ondergrond en bereikbaarheid.",
            )?;
        }
        lines.per_unit(
            PriceKey::GatePerUnit,
            Decimal::from(answers.total_gate_count()),
            "Indicatief; afhankelijk van maatvoering, beslag en fundering.",
        )?;
        leftover.retain(|wish| *wish != Wish::Fencing);
    }

    if answers.has_wish(Wish::Irrigation) {
        let scope = answers.irrigation_scope.unwrap_or(IrrigationScope::Both);
        let irrigated_m2 = match scope {
            IrrigationScope::Lawn => lawn_m2,
            IrrigationScope::Planting => border_m2,
            IrrigationScope::Both => lawn_m2 + border_m2,
        };
        metrics.record("irrigation_m2", irrigated_m2);
        if irrigated_m2 > rules.min_surface_m2 {
            lines.per_unit(
                PriceKey::IrrigationBasicPerM2,
                irrigated_m2,
                format!(
                    "Indicatief; berekend over {}. Afhankelijk van zones, waterpunt en besturing.",
                    scope.description()
                ),
            )?;
        }
        leftover.retain(|wish| *wish != Wish::Irrigation);
    }

    if answers.weed_resistant_jointing == Some(true) && stone_m2 > rules.min_surface_m2 {
        lines.per_unit(
            PriceKey::JointingPerM2,
            stone_m2,
            "Indicatief; voegwerk berekend per m² straatwerk (excl. grind).",
        )?;
    }
    if answers.canopy == Some(true) {
        lines.per_unit(
            PriceKey::CanopyBasicPerUnit,
            Decimal::ONE,
            "Basis; luxe opties/maatwerk/fundering en afwerking kunnen extra zijn.",
        )?;
    }
    if answers.lighting == Some(true) {
        lines.per_unit(
            PriceKey::LightingBasicPerUnit,
            Decimal::ONE,
            "Afhankelijk van aantal spots, trafo, bekabeling en montage.",
        )?;
    }

    if answers.has_wish(Wish::Decking) {
        let decking_m2 =
            (area * rules.decking_share).max(rules.decking_min_m2).min(rules.decking_max_m2);
        metrics.record("decking_m2", decking_m2);
        let tier = answers.decking_tier.unwrap_or(DeckingTier::Composite);
        lines.per_unit(
            PriceKey::for_decking(tier),
            decking_m2,
            "Schatting o.b.v. standaard vlonder-oppervlak; materiaal, fundering en afwerking \
             kunnen variëren.",
        )?;
        leftover.retain(|wish| *wish != Wish::Decking);
    }

    if !leftover.is_empty() {
        let tags: Vec<&str> = leftover.iter().map(|wish| wish.tag()).collect();
        lines.items.push(CostLineItem::note_only(
            LEFTOVER_LABEL,
            format!("Opgenomen als wens: {}", tags.join(", ")),
        ));
    }

    let mut items = earthwork_lines.items;
    items.extend(lines.items);
    let total = items.iter().map(CostLineItem::range_or_zero).sum();

    Ok(CostEstimate { total, items, metrics })
}

fn surface_metric(surface: Surface) -> &'static str {
    match surface {
        Surface::Driveway => "driveway",
        Surface::Paths => "paths",
        Surface::Terrace => "terrace",
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DeterministicEstimator, EstimateError, Estimator};
    use crate::domain::answers::{
        AnswerRecord, DeckingTier, FenceItem, FenceType, IrrigationScope, Material, Surface,
        SurfacePreset, SurfaceSplit, TwoWayPreset, TwoWaySplit, Wish,
    };
    use crate::domain::estimate::PriceRange;
    use crate::domain::price_table::PriceKey;
    use crate::savings::SavingsCategory;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn baseline() -> AnswerRecord {
        let mut answers = AnswerRecord {
            garden_area_m2: Some(dec(100)),
            lawn_planting: Some(TwoWaySplit::from_preset(TwoWayPreset::Balanced)),
            surface_split: Some(SurfaceSplit::from_preset(SurfacePreset::DrivewayHeavy)),
            weed_resistant_jointing: Some(false),
            canopy: Some(false),
            lighting: Some(false),
            ..AnswerRecord::default()
        };
        answers.set_paving_green(TwoWayPreset::Balanced);
        for surface in Surface::ALL {
            answers.materials.set(surface, Some(Material::Concrete));
        }
        answers
    }

    #[test]
    fn regression_scenario_has_fixed_total() {
        let estimate = DeterministicEstimator::default().estimate(&baseline()).expect("estimate");

        assert_eq!(estimate.total, PriceRange::new(dec(7025), dec(13000)));
        let soil = estimate.item(PriceKey::SoilRemovalPerM3).expect("soil line");
        assert_eq!(soil.quantity, Some(Decimal::new(1375, 2)));
        assert_eq!(
            soil.range,
            Some(PriceRange::new(Decimal::new(130625, 2), Decimal::new(20625, 1)))
        );
        let saw = estimate.item(PriceKey::SawCuttingPerM1).expect("saw line");
        assert_eq!(saw.range, Some(PriceRange::new(dec(525), dec(1625))));
        assert_eq!(saw.quantity, Some(dec(20)));
    }

    #[test]
    fn earthworks_come_first_once_per_resource() {
        let estimate = DeterministicEstimator::default().estimate(&baseline()).expect("estimate");

        let keys: Vec<_> = estimate.items.iter().take(3).map(|item| item.key).collect();
        assert_eq!(
            keys,
            vec![
                Some(PriceKey::SoilRemovalPerM3),
                Some(PriceKey::SandSupplyPerM3),
                Some(PriceKey::RubbleSupplyPerM3)
            ]
        );
        for key in [PriceKey::SoilRemovalPerM3, PriceKey::SandSupplyPerM3, PriceKey::RubbleSupplyPerM3] {
            assert_eq!(estimate.items.iter().filter(|item| item.key == Some(key)).count(), 1);
        }
        assert_eq!(estimate.items[3].label, "Oprit – Beton");
    }

    #[test]
    fn totals_equal_sum_of_items_and_ranges_are_ordered() {
        let mut answers = baseline();
        answers.weed_resistant_jointing = Some(true);
        answers.canopy = Some(true);
        answers.add_wish(Wish::Decking);
        answers.add_wish(Wish::Pond);

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        let mut min = Decimal::ZERO;
        let mut max = Decimal::ZERO;
        for item in &estimate.items {
            let range = item.range_or_zero();
            assert!(range.min <= range.max, "{}", item.label);
            min += range.min;
            max += range.max;
        }
        assert_eq!(estimate.total, PriceRange::new(min, max));
    }

    #[test]
    fn missing_area_is_an_error_not_a_partial_estimate() {
        let answers = AnswerRecord::default();
        assert_eq!(
            DeterministicEstimator::default().estimate(&answers),
            Err(EstimateError::MissingArea)
        );
    }

    #[test]
    fn estimate_is_deterministic() {
        let estimator = DeterministicEstimator::default();
        let answers = baseline();
        assert_eq!(estimator.estimate(&answers), estimator.estimate(&answers));
    }

    #[test]
    fn gates_are_aggregated_into_one_line() {
        let mut answers = baseline();
        answers.add_wish(Wish::Fencing);
        for _ in 0..2 {
            answers.fence_items.push(
                FenceItem::new(FenceType::ConcreteScreen, dec(10), Some(true)).expect("valid item"),
            );
        }

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        let gates: Vec<_> =
            estimate.items.iter().filter(|item| item.key == Some(PriceKey::GatePerUnit)).collect();
        assert_eq!(gates.len(), 1);
        assert_eq!(gates[0].quantity, Some(dec(2)));
        assert_eq!(gates[0].range, Some(PriceRange::new(dec(1500), dec(2000))));
        let screen = estimate.item(PriceKey::ConcreteScreenPerM1).expect("screen line");
        assert_eq!(screen.quantity, Some(dec(20)));
        assert!(estimate.items.iter().all(|item| item.key.is_some()));
    }

    #[test]
    fn gravel_surfaces_are_excluded_from_saw_and_jointing() {
        let mut answers = baseline();
        answers.weed_resistant_jointing = Some(true);
        answers.materials.set(Surface::Driveway, Some(Material::Gravel));

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        let jointing = estimate.item(PriceKey::JointingPerM2).expect("jointing line");
        assert_eq!(jointing.quantity, Some(dec(25)));
        assert_eq!(
            estimate.item(PriceKey::GravelPerM2).map(|item| item.label.as_str()),
            Some("Oprit – Grind")
        );
    }

    #[test]
    fn zero_share_surface_contributes_no_line() {
        let mut answers = baseline();
        answers.surface_split = Some(SurfaceSplit::custom(0, 50).expect("valid split"));
        answers.clear_unused_materials();

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        assert!(estimate.items.iter().all(|item| !item.label.starts_with("Oprit")));
        assert!(estimate.item(PriceKey::RubbleSupplyPerM3).is_none());
    }

    #[test]
    fn unset_surface_split_prices_all_paving_as_terrace() {
        let mut answers =
            AnswerRecord { garden_area_m2: Some(dec(60)), ..AnswerRecord::default() };
        answers.materials.set(Surface::Terrace, Some(Material::Ceramic));
        assert!(answers.validate().is_ok());
        assert!(SavingsCategory::Material.applies_to(&answers));

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        let terrace = estimate.item(PriceKey::CeramicPavingPerM2).expect("terrace line");
        assert_eq!(terrace.label, "Terras – Keramiek");
        assert_eq!(terrace.quantity, Some(dec(30)));
        assert!(estimate
            .items
            .iter()
            .all(|item| !item.label.starts_with("Oprit –") && !item.label.starts_with("Paden –")));

        let soil = estimate.item(PriceKey::SoilRemovalPerM3).expect("soil line");
        assert_eq!(soil.quantity, Some(dec(6)));
        let sand = estimate.item(PriceKey::SandSupplyPerM3).expect("sand line");
        assert_eq!(sand.quantity, Some(Decimal::new(45, 1)));
        assert!(estimate.item(PriceKey::RubbleSupplyPerM3).is_none());
    }

    #[test]
    fn decking_area_is_clamped_and_defaults_to_composite() {
        let mut answers = baseline();
        answers.add_wish(Wish::Decking);

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");
        let decking = estimate.item(PriceKey::DeckingCompositePerM2).expect("decking line");
        assert_eq!(decking.quantity, Some(dec(12)));

        answers.garden_area_m2 = Some(dec(20));
        answers.decking_tier = Some(DeckingTier::Softwood);
        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");
        let decking = estimate.item(PriceKey::DeckingSoftwoodPerM2).expect("decking line");
        assert_eq!(decking.quantity, Some(dec(6)));
    }

    #[test]
    fn irrigation_follows_scope_and_leaves_no_leftover_tag() {
        let mut answers = baseline();
        answers.add_wish(Wish::Irrigation);
        answers.add_wish(Wish::Pool);
        answers.irrigation_scope = Some(IrrigationScope::Planting);

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        let irrigation = estimate.item(PriceKey::IrrigationBasicPerM2).expect("irrigation line");
        assert_eq!(irrigation.quantity, Some(dec(25)));
        let leftover = estimate.items.last().expect("leftover note");
        assert_eq!(leftover.key, None);
        assert_eq!(leftover.note, "Opgenomen als wens: zwembad");
    }

    #[test]
    fn custom_split_uses_stored_percentages() {
        let mut answers = baseline();
        answers.paving_green = Some(TwoWaySplit::custom(40).expect("valid split"));

        let estimate = DeterministicEstimator::default().estimate(&answers).expect("estimate");

        assert_eq!(estimate.metrics.get("paving_m2"), Some(dec(40)));
        assert_eq!(estimate.metrics.get("green_m2"), Some(dec(60)));
    }
}
