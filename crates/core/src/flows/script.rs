use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::answers::MAX_GARDEN_AREA_M2;
use crate::domain::price_table::{PriceKey, PriceTable};
use crate::estimate::format::format_eur;

pub const COMPLETION_MESSAGE: &str =
    "Bedankt voor het invullen! Ik heb genoeg info. Hieronder kunt u de prijzen terug vinden.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    GardenArea,
    PavingGreenRatio,
    PavingPct,
    PavingGreenConfirm,
    LawnPlantingRatio,
    LawnPct,
    LawnPlantingConfirm,
    SurfaceRatio,
    DrivewayPct,
    PathsPct,
    SurfaceConfirm,
    DrivewayMaterial,
    PathsMaterial,
    TerraceMaterial,
    Jointing,
    Canopy,
    Lighting,
    Wishes,
    FenceTypes,
    FenceLength,
    FenceGate,
    DeckingTier,
    IrrigationScope,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepKind {
    Area,
    Number { min_exclusive: Decimal, max: Decimal },
    Percent,
    YesNo,
    Choice { tokens: Vec<char> },
    MultiSelect { tokens: Vec<char>, allow_none: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    pub prompt: String,
    pub error_prompt: String,
}

/// The fixed question set. Steps that depend on the conversation (fence
/// type, confirmed splits) keep a generic prompt here and are rendered by the
/// flow with the current context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Script {
    steps: BTreeMap<StepId, Step>,
}

fn tokens(range: std::ops::RangeInclusive<char>) -> Vec<char> {
    range.collect()
}

fn step(id: StepId, kind: StepKind, prompt: impl Into<String>, error: impl Into<String>) -> Step {
    Step { id, kind, prompt: prompt.into(), error_prompt: error.into() }
}

fn material_prompt(surface: &str) -> String {
    format!(
        "Welk materiaal wilt u voor {surface}?\n\
         1) Grind\n\
         2) Beton\n\
         3) Gebakken klinkers\n\
         4) Keramiek\n\
         \n\
         Reageer met 1, 2, 3 of 4."
    )
}

impl Script {
    /// Builds the question set. The price table is only read to quote the
    /// indicative canopy and lighting ranges.
    pub fn build(prices: &PriceTable) -> Self {
        use StepId::*;

        let percent_error = "Geef een percentage tussen 0 en 100, bijvoorbeeld 50.";
        let yes_no_error = "Antwoord met ja of nee.";

        let steps = vec![
            step(
                GardenArea,
                StepKind::Area,
                "Hoe groot is uw tuin in m²? (geef een getal)",
                "Ik heb alleen een getal nodig, bijvoorbeeld 60. Hoe groot is uw tuin in m²?",
            ),
            step(
                PavingGreenRatio,
                StepKind::Choice { tokens: tokens('1'..='4') },
                "Hoe wilt u de verhouding tussen bestrating en groen?\n\
                 1) Veel bestrating 70/30\n\
                 2) Gemengd 50/50\n\
                 3) Veel groen 30/70\n\
                 4) Zelf invullen\n\
                 \n\
                 Reageer met 1, 2, 3 of 4.",
                "Kies 1, 2, 3 of 4. Hoe wilt u de verhouding bestrating/groen?",
            ),
            step(
                PavingPct,
                StepKind::Percent,
                "Welk percentage van de tuin wordt bestrating? (0–100%)",
                percent_error,
            ),
            step(
                PavingGreenConfirm,
                StepKind::YesNo,
                "Klopt deze verdeling tussen bestrating en groen? (ja/nee)",
                yes_no_error,
            ),
            step(
                LawnPlantingRatio,
                StepKind::Choice { tokens: tokens('1'..='4') },
                "Hoe wilt u het groen verdelen tussen gazon en beplanting?\n\
                 1) Veel gazon 70/30\n\
                 2) Gemengd 50/50\n\
                 3) Veel beplanting 30/70\n\
                 4) Zelf invullen\n\
                 \n\
                 Reageer met 1, 2, 3 of 4.",
                "Kies 1, 2, 3 of 4. Hoe wilt u het groen verdelen tussen gazon en beplanting?",
            ),
            step(
                LawnPct,
                StepKind::Percent,
                "Welk percentage van het groen wordt gazon? (0–100%)",
                percent_error,
            ),
            step(
                LawnPlantingConfirm,
                StepKind::YesNo,
                "Klopt deze verdeling tussen gazon en beplanting? (ja/nee)",
                yes_no_error,
            ),
            step(
                SurfaceRatio,
                StepKind::Choice { tokens: tokens('1'..='5') },
                "Hoe wilt u de bestrating verdelen tussen oprit, paden en terras?\n\
                 1) 50% oprit / 30% paden / 20% terras\n\
                 2) 40% oprit / 30% paden / 30% terras\n\
                 3) 30% oprit / 30% paden / 40% terras\n\
                 4) 20% oprit / 30% paden / 50% terras\n\
                 5) Zelf invullen\n\
                 Reageer met 1 t/m 5.",
                "Kies 1 t/m 5. Hoe wilt u de bestrating verdelen tussen oprit/paden/terras?",
            ),
            step(
                DrivewayPct,
                StepKind::Percent,
                "Welk percentage van de bestrating wordt oprit? (0–100%)",
                "Geef een percentage tussen 0 en 100, bijvoorbeeld 40.",
            ),
            step(
                PathsPct,
                StepKind::Percent,
                "Welk percentage van de bestrating wordt paden? (0–100%)",
                "Geef een percentage tussen 0 en 100, bijvoorbeeld 20.",
            ),
            step(
                SurfaceConfirm,
                StepKind::YesNo,
                "Klopt deze verdeling tussen oprit, paden en terras? (ja/nee)",
                yes_no_error,
            ),
            step(
                DrivewayMaterial,
                StepKind::Choice { tokens: tokens('1'..='4') },
                material_prompt("de oprit"),
                "Kies 1, 2, 3 of 4. Welk materiaal wilt u voor de oprit?",
            ),
            step(
                PathsMaterial,
                StepKind::Choice { tokens: tokens('1'..='4') },
                material_prompt("de paden"),
                "Kies 1, 2, 3 of 4. Welk materiaal wilt u voor de paden?",
            ),
            step(
                TerraceMaterial,
                StepKind::Choice { tokens: tokens('1'..='4') },
                material_prompt("het terras"),
                "Kies 1, 2, 3 of 4. Welk materiaal wilt u voor het terras?",
            ),
            step(
                Jointing,
                StepKind::YesNo,
                "Wilt u de bestrating gevoegd hebben tegen onkruid? (ja/nee)",
                "Antwoord met ja of nee. Wilt u de bestrating gevoegd hebben tegen onkruid?",
            ),
            step(
                Canopy,
                StepKind::YesNo,
                format!("Wilt u een overkapping in de tuin? {} (ja/nee)", canopy_hint(prices)),
                "Antwoord met ja of nee. Wilt u een overkapping in de tuin?",
            ),
            step(
                Lighting,
                StepKind::YesNo,
                format!(
                    "Wilt u een basispakket tuinverlichting? {} (ja/nee)",
                    lighting_hint(prices)
                ),
                "Antwoord met ja of nee. Wilt u een basispakket tuinverlichting?",
            ),
            step(
                Wishes,
                StepKind::MultiSelect { tokens: tokens('1'..='6'), allow_none: true },
                "Heeft u nog overige wensen?\n\
                 1) Erfafscheiding\n\
                 2) Vlonder\n\
                 3) Beregening\n\
                 4) Zwembad\n\
                 5) Vijver\n\
                 6) Overig\n\
                 \n\
                 U kunt meerdere opties tegelijk kiezen, bijv. 1,3 (ook 13 werkt).\n\
                 Of typ 'nee' als u geen extra wensen hebt.",
                "Kies 1 t/m 6 (eventueel meerdere tegelijk, bijv. 1,3 of 13) of typ 'nee'.",
            ),
            step(
                FenceTypes,
                StepKind::MultiSelect { tokens: tokens('1'..='3'), allow_none: false },
                "Welk type erfafscheiding wilt u toevoegen?\n\
                 1) Haag\n\
                 2) Betonschutting\n\
                 3) Design schutting\n\
                 \n\
                 U kunt meerdere opties tegelijk kiezen, bijv. 1,3 (ook 13 werkt).\n\
                 Reageer met 1, 2 of 3.",
                "Kies 1, 2 of 3 (eventueel meerdere tegelijk, bijv. 1,3 of 13).",
            ),
            step(
                FenceLength,
                StepKind::Number {
                    min_exclusive: Decimal::ZERO,
                    max: Decimal::from(MAX_GARDEN_AREA_M2),
                },
                "Hoeveel meter is deze erfafscheiding ongeveer? (bijv. 10)",
                "Geef een getal, bijvoorbeeld 10.",
            ),
            step(
                FenceGate,
                StepKind::YesNo,
                "Wilt u bij deze erfafscheiding ook een poortdeur opnemen? (ja/nee)",
                yes_no_error,
            ),
            step(
                DeckingTier,
                StepKind::Choice { tokens: tokens('1'..='3') },
                "Welk type vlonder wilt u?\n\
                 1) Zachthout (bijv. Douglas)\n\
                 2) Hardhout\n\
                 3) Composiet\n\
                 \n\
                 Reageer met 1, 2 of 3.",
                "Kies 1, 2 of 3. Welk type vlonder wilt u?",
            ),
            step(
                IrrigationScope,
                StepKind::Choice { tokens: tokens('1'..='3') },
                "Voor welk deel wilt u beregening?\n\
                 1) Alleen gazon\n\
                 2) Alleen beplanting\n\
                 3) Gazon én beplanting\n\
                 \n\
                 Reageer met 1, 2 of 3.",
                "Kies 1, 2 of 3. Voor welk deel wilt u beregening?",
            ),
        ];

        Self { steps: steps.into_iter().map(|step| (step.id, step)).collect() }
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(&id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn price_hint(prices: &PriceTable, key: PriceKey) -> Option<String> {
    let range = prices.range(key).ok()?;
    Some(format!("{}–{}", format_eur(range.min), format_eur(range.max)))
}

fn canopy_hint(prices: &PriceTable) -> String {
    match price_hint(prices, PriceKey::CanopyBasicPerUnit) {
        Some(range) => format!(
            "Een basis overkapping 5×3 m is vaak vanaf {range} (indicatief, excl. luxe opties)."
        ),
        None => "Een basis overkapping 5×3 m is vaak mogelijk in verschillende prijsklassen \
                 (indicatief)."
            .to_owned(),
    }
}

fn lighting_hint(prices: &PriceTable) -> String {
    match price_hint(prices, PriceKey::LightingBasicPerUnit) {
        Some(range) => format!(
            "Een basispakket is vaak {range} (indicatief; afhankelijk van spots, trafo, \
             bekabeling en montage)."
        ),
        None => "Een basispakket varieert op basis van aantal spots, trafo, bekabeling en \
                 montage (indicatief)."
            .to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Script, StepId, StepKind};
    use crate::domain::price_table::PriceTable;

    #[test]
    fn canopy_prompt_quotes_price_table_range() {
        let script = Script::build(&PriceTable::default());
        let canopy = script.step(StepId::Canopy).expect("canopy step");

        assert!(canopy.prompt.contains("€10.000–€15.000"), "{}", canopy.prompt);
        let lighting = script.step(StepId::Lighting).expect("lighting step");
        assert!(lighting.prompt.contains("€1.000–€1.500"));
    }

    #[test]
    fn every_step_is_present_once() {
        let script = Script::build(&PriceTable::default());
        assert_eq!(script.len(), 23);
        assert!(matches!(
            script.step(StepId::Wishes).map(|step| &step.kind),
            Some(StepKind::MultiSelect { allow_none: true, .. })
        ));
    }
}
