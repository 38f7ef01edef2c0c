use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::answers::{DeckingTier, FenceType, Material};
use crate::domain::estimate::PriceRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceKey {
    SoilRemovalPerM3,
    SandSupplyPerM3,
    RubbleSupplyPerM3,
    CeramicPavingPerM2,
    ConcreteBakedPavingPerM2,
    GravelPerM2,
    SawCuttingPerM1,
    JointingPerM2,
    DeckingSoftwoodPerM2,
    DeckingHardwoodPerM2,
    DeckingCompositePerM2,
    TurfPerM2,
    BorderPlantingPerM2,
    HedgePlantingPerM1,
    CanopyBasicPerUnit,
    LightingBasicPerUnit,
    IrrigationBasicPerM2,
    ConcreteScreenPerM1,
    GatePerUnit,
    DesignScreenPerM1,
}

impl PriceKey {
    pub const ALL: [PriceKey; 20] = [
        Self::SoilRemovalPerM3,
        Self::SandSupplyPerM3,
        Self::RubbleSupplyPerM3,
        Self::CeramicPavingPerM2,
        Self::ConcreteBakedPavingPerM2,
        Self::GravelPerM2,
        Self::SawCuttingPerM1,
        Self::JointingPerM2,
        Self::DeckingSoftwoodPerM2,
        Self::DeckingHardwoodPerM2,
        Self::DeckingCompositePerM2,
        Self::TurfPerM2,
        Self::BorderPlantingPerM2,
        Self::HedgePlantingPerM1,
        Self::CanopyBasicPerUnit,
        Self::LightingBasicPerUnit,
        Self::IrrigationBasicPerM2,
        Self::ConcreteScreenPerM1,
        Self::GatePerUnit,
        Self::DesignScreenPerM1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SoilRemovalPerM3 => "soil_removal_per_m3",
            Self::SandSupplyPerM3 => "sand_supply_per_m3",
            Self::RubbleSupplyPerM3 => "rubble_supply_per_m3",
            Self::CeramicPavingPerM2 => "ceramic_paving_per_m2",
            Self::ConcreteBakedPavingPerM2 => "concrete_baked_paving_per_m2",
            Self::GravelPerM2 => "gravel_per_m2",
            Self::SawCuttingPerM1 => "saw_cutting_per_m1",
            Self::JointingPerM2 => "jointing_per_m2",
            Self::DeckingSoftwoodPerM2 => "decking_softwood_per_m2",
            Self::DeckingHardwoodPerM2 => "decking_hardwood_per_m2",
            Self::DeckingCompositePerM2 => "decking_composite_per_m2",
            Self::TurfPerM2 => "turf_per_m2",
            Self::BorderPlantingPerM2 => "border_planting_per_m2",
            Self::HedgePlantingPerM1 => "hedge_planting_per_m1",
            Self::CanopyBasicPerUnit => "canopy_basic_per_unit",
            Self::LightingBasicPerUnit => "lighting_basic_per_unit",
            Self::IrrigationBasicPerM2 => "irrigation_basic_per_m2",
            Self::ConcreteScreenPerM1 => "concrete_screen_per_m1",
            Self::GatePerUnit => "gate_per_unit",
            Self::DesignScreenPerM1 => "design_screen_per_m1",
        }
    }

    pub fn for_material(material: Material) -> Self {
        match material {
            Material::Ceramic => Self::CeramicPavingPerM2,
            Material::Gravel => Self::GravelPerM2,
            Material::Concrete | Material::BakedClay => Self::ConcreteBakedPavingPerM2,
        }
    }

    pub fn for_decking(tier: DeckingTier) -> Self {
        match tier {
            DeckingTier::Softwood => Self::DeckingSoftwoodPerM2,
            DeckingTier::Hardwood => Self::DeckingHardwoodPerM2,
            DeckingTier::Composite => Self::DeckingCompositePerM2,
        }
    }

    pub fn for_fence(fence_type: FenceType) -> Self {
        match fence_type {
            FenceType::Hedge => Self::HedgePlantingPerM1,
            FenceType::ConcreteScreen => Self::ConcreteScreenPerM1,
            FenceType::DesignScreen => Self::DesignScreenPerM1,
        }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceKey {
    type Err = PriceTableError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| PriceTableError::UnknownKey(value.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub min: Decimal,
    pub max: Decimal,
    pub unit: String,
    pub label: String,
}

impl PriceEntry {
    fn new(min: i64, max: i64, unit: &str, label: &str) -> Self {
        Self {
            min: Decimal::from(min),
            max: Decimal::from(max),
            unit: unit.to_owned(),
            label: label.to_owned(),
        }
    }

    pub fn range(&self) -> PriceRange {
        PriceRange::new(self.min, self.max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PriceTableError {
    #[error("unknown price key `{0}`")]
    UnknownKey(String),
    #[error("price table is missing required key `{0}`")]
    MissingKey(PriceKey),
    #[error("price `{key}` must satisfy 0 <= min <= max, got {min}..{max}")]
    InvalidRange { key: PriceKey, min: Decimal, max: Decimal },
    #[error("failed to parse price table: {0}")]
    Parse(String),
}

/// Read-only unit prices keyed by line-item identifier. Built once and
/// shared by reference; nothing mutates it after validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceTable {
    entries: BTreeMap<PriceKey, PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceTableFile {
    prices: BTreeMap<String, PriceEntry>,
}

impl Default for PriceTable {
    fn default() -> Self {
        use PriceKey::*;

        let entries = BTreeMap::from([
            (SoilRemovalPerM3, PriceEntry::new(95, 150, "€/m³", "Grond afvoer")),
            (SandSupplyPerM3, PriceEntry::new(95, 150, "€/m³", "Zand aanvoer")),
            (RubbleSupplyPerM3, PriceEntry::new(95, 150, "€/m³", "Puin aanvoer")),
            (CeramicPavingPerM2, PriceEntry::new(180, 220, "€/m²", "Keramisch straatwerk")),
            (ConcreteBakedPavingPerM2, PriceEntry::new(60, 120, "€/m²", "Beton/gebakken straatwerk")),
            (GravelPerM2, PriceEntry::new(60, 120, "€/m²", "Grind")),
            (SawCuttingPerM1, PriceEntry::new(35, 65, "€/m¹", "Zaagwerk")),
            (JointingPerM2, PriceEntry::new(15, 20, "€/m²", "Voegen straatwerk")),
            (DeckingSoftwoodPerM2, PriceEntry::new(200, 250, "€/m²", "Vlonder (zachthout)")),
            (DeckingHardwoodPerM2, PriceEntry::new(250, 300, "€/m²", "Vlonder (hardhout)")),
            (DeckingCompositePerM2, PriceEntry::new(280, 350, "€/m²", "Vlonder (composiet)")),
            (TurfPerM2, PriceEntry::new(15, 25, "€/m²", "Graszoden")),
            (BorderPlantingPerM2, PriceEntry::new(30, 40, "€/m²", "Beplanting border")),
            (HedgePlantingPerM1, PriceEntry::new(45, 200, "€/m¹", "Haagbeplanting")),
            (CanopyBasicPerUnit, PriceEntry::new(10_000, 15_000, "€/stuk", "Overkapping (basis)")),
            (
                LightingBasicPerUnit,
                PriceEntry::new(1_000, 1_500, "€/stuk", "Verlichting (basis 3 armaturen)"),
            ),
            (IrrigationBasicPerM2, PriceEntry::new(20, 40, "€/m²", "Beregening (basis)")),
            (ConcreteScreenPerM1, PriceEntry::new(150, 250, "€/m¹", "Betonschutting plaatsen")),
            (GatePerUnit, PriceEntry::new(750, 1_000, "€/stuk", "Poortdeur plaatsen")),
            (DesignScreenPerM1, PriceEntry::new(300, 400, "€/m¹", "Design schutting plaatsen")),
        ]);

        Self { entries }
    }
}

impl PriceTable {
    /// Parses `[prices.<key>]` tables with `min`, `max`, `unit` and `label`.
    /// Keys missing from the file keep their default entry.
    pub fn from_toml_str(input: &str) -> Result<Self, PriceTableError> {
        let file: PriceTableFile =
            toml::from_str(input).map_err(|error| PriceTableError::Parse(error.to_string()))?;

        let mut table = Self::default();
        for (raw_key, entry) in file.prices {
            let key = raw_key.parse::<PriceKey>()?;
            table.entries.insert(key, entry);
        }
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), PriceTableError> {
        for key in PriceKey::ALL {
            let entry = self.entries.get(&key).ok_or(PriceTableError::MissingKey(key))?;
            if entry.min < Decimal::ZERO || entry.min > entry.max {
                return Err(PriceTableError::InvalidRange { key, min: entry.min, max: entry.max });
            }
        }
        Ok(())
    }

    pub fn entry(&self, key: PriceKey) -> Result<&PriceEntry, PriceTableError> {
        self.entries.get(&key).ok_or(PriceTableError::MissingKey(key))
    }

    pub fn range(&self, key: PriceKey) -> Result<PriceRange, PriceTableError> {
        self.entry(key).map(PriceEntry::range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PriceKey, &PriceEntry)> {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }
}
