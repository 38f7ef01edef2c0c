use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Upper bound for a garden surface, in square meters.
pub const MAX_GARDEN_AREA_M2: i64 = 100_000;

/// Named two-way presets. The percentage is the share of the *first* part of
/// the pair (paving for paving/green, lawn for lawn/planting).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwoWayPreset {
    #[serde(rename = "70_30")]
    Heavy,
    #[serde(rename = "50_50")]
    Balanced,
    #[serde(rename = "30_70")]
    Light,
}

impl TwoWayPreset {
    pub const ALL: [TwoWayPreset; 3] = [Self::Heavy, Self::Balanced, Self::Light];

    pub fn first_pct(self) -> u8 {
        match self {
            Self::Heavy => 70,
            Self::Balanced => 50,
            Self::Light => 30,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Heavy => "70/30",
            Self::Balanced => "50/50",
            Self::Light => "30/70",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioChoice {
    Preset(TwoWayPreset),
    Custom,
}

/// A pair of percentages that always sums to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoWaySplit {
    pub first_pct: u8,
    pub second_pct: u8,
}

impl TwoWaySplit {
    pub fn from_preset(preset: TwoWayPreset) -> Self {
        let first_pct = preset.first_pct();
        Self { first_pct, second_pct: 100 - first_pct }
    }

    /// Custom split from the first share; the second share is the remainder.
    pub fn custom(first_pct: u8) -> Result<Self, DomainError> {
        if first_pct > 100 {
            return Err(DomainError::InvalidSplit { total: u32::from(first_pct) });
        }
        Ok(Self { first_pct, second_pct: 100 - first_pct })
    }

    pub fn first_fraction(&self) -> Decimal {
        Decimal::from(self.first_pct) / Decimal::ONE_HUNDRED
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfacePreset {
    #[serde(rename = "50_30_20")]
    DrivewayHeavy,
    #[serde(rename = "40_30_30")]
    DrivewayLeaning,
    #[serde(rename = "30_30_40")]
    TerraceLeaning,
    #[serde(rename = "20_30_50")]
    TerraceHeavy,
}

impl SurfacePreset {
    pub fn shares(self) -> (u8, u8, u8) {
        match self {
            Self::DrivewayHeavy => (50, 30, 20),
            Self::DrivewayLeaning => (40, 30, 30),
            Self::TerraceLeaning => (30, 30, 40),
            Self::TerraceHeavy => (20, 30, 50),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceSplitChoice {
    Preset(SurfacePreset),
    Custom,
}

/// Driveway/paths/terrace shares of the paved area; always sums to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSplit {
    pub driveway_pct: u8,
    pub paths_pct: u8,
    pub terrace_pct: u8,
}

impl SurfaceSplit {
    /// Used wherever the split was never answered.
    pub const ALL_TERRACE: Self = Self { driveway_pct: 0, paths_pct: 0, terrace_pct: 100 };

    pub fn from_preset(preset: SurfacePreset) -> Self {
        let (driveway_pct, paths_pct, terrace_pct) = preset.shares();
        Self { driveway_pct, paths_pct, terrace_pct }
    }

    /// Custom split from the driveway and paths shares; the terrace takes the
    /// remainder. Rejects inputs whose first two shares already exceed 100.
    pub fn custom(driveway_pct: u8, paths_pct: u8) -> Result<Self, DomainError> {
        let total = u32::from(driveway_pct) + u32::from(paths_pct);
        if total > 100 {
            return Err(DomainError::InvalidSplit { total });
        }
        Ok(Self { driveway_pct, paths_pct, terrace_pct: 100 - driveway_pct - paths_pct })
    }

    pub fn share(&self, surface: Surface) -> u8 {
        match surface {
            Surface::Driveway => self.driveway_pct,
            Surface::Paths => self.paths_pct,
            Surface::Terrace => self.terrace_pct,
        }
    }

    fn total(&self) -> u32 {
        u32::from(self.driveway_pct) + u32::from(self.paths_pct) + u32::from(self.terrace_pct)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Driveway,
    Paths,
    Terrace,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Self::Driveway, Self::Paths, Self::Terrace];

    pub fn label(self) -> &'static str {
        match self {
            Self::Driveway => "Oprit",
            Self::Paths => "Paden",
            Self::Terrace => "Terras",
        }
    }

    pub fn token(self) -> char {
        match self {
            Self::Driveway => '1',
            Self::Paths => '2',
            Self::Terrace => '3',
        }
    }

    pub fn from_token(token: char) -> Option<Self> {
        Self::ALL.into_iter().find(|surface| surface.token() == token)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Gravel,
    Concrete,
    BakedClay,
    Ceramic,
}

impl Material {
    /// Menu order; token 1 is the cheapest tier.
    pub const ALL: [Material; 4] = [Self::Gravel, Self::Concrete, Self::BakedClay, Self::Ceramic];

    /// Price tier, cheapest first. Concrete and baked clay share a tier.
    pub fn tier(self) -> u8 {
        match self {
            Self::Gravel => 0,
            Self::Concrete | Self::BakedClay => 1,
            Self::Ceramic => 2,
        }
    }

    pub fn token(self) -> char {
        match self {
            Self::Gravel => '1',
            Self::Concrete => '2',
            Self::BakedClay => '3',
            Self::Ceramic => '4',
        }
    }

    pub fn from_token(token: char) -> Option<Self> {
        Self::ALL.into_iter().find(|material| material.token() == token)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gravel => "Grind",
            Self::Concrete => "Beton",
            Self::BakedClay => "Gebakken klinkers",
            Self::Ceramic => "Keramiek",
        }
    }

    pub fn is_paving_stone(self) -> bool {
        !matches!(self, Self::Gravel)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceMaterials {
    pub driveway: Option<Material>,
    pub paths: Option<Material>,
    pub terrace: Option<Material>,
}

impl SurfaceMaterials {
    pub fn get(&self, surface: Surface) -> Option<Material> {
        match surface {
            Surface::Driveway => self.driveway,
            Surface::Paths => self.paths,
            Surface::Terrace => self.terrace,
        }
    }

    pub fn set(&mut self, surface: Surface, material: Option<Material>) {
        match surface {
            Surface::Driveway => self.driveway = material,
            Surface::Paths => self.paths = material,
            Surface::Terrace => self.terrace = material,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckingTier {
    Softwood,
    Hardwood,
    Composite,
}

impl DeckingTier {
    pub const ALL: [DeckingTier; 3] = [Self::Softwood, Self::Hardwood, Self::Composite];

    pub fn tier(self) -> u8 {
        match self {
            Self::Softwood => 0,
            Self::Hardwood => 1,
            Self::Composite => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Softwood => "Zachthout",
            Self::Hardwood => "Hardhout",
            Self::Composite => "Composiet",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationScope {
    Lawn,
    Planting,
    Both,
}

impl IrrigationScope {
    pub fn description(self) -> &'static str {
        match self {
            Self::Lawn => "alleen gazon",
            Self::Planting => "alleen beplanting",
            Self::Both => "gazon én beplanting",
        }
    }
}

/// Extra wishes. The first three have their own intake sub-flow and pricing;
/// the rest are only recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wish {
    Fencing,
    Decking,
    Irrigation,
    Pool,
    Pond,
    Other,
}

impl Wish {
    pub const ALL: [Wish; 6] =
        [Self::Fencing, Self::Decking, Self::Irrigation, Self::Pool, Self::Pond, Self::Other];

    pub fn token(self) -> char {
        match self {
            Self::Fencing => '1',
            Self::Decking => '2',
            Self::Irrigation => '3',
            Self::Pool => '4',
            Self::Pond => '5',
            Self::Other => '6',
        }
    }

    pub fn from_token(token: char) -> Option<Self> {
        Self::ALL.into_iter().find(|wish| wish.token() == token)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fencing => "Erfafscheiding",
            Self::Decking => "Vlonder",
            Self::Irrigation => "Beregening",
            Self::Pool => "Zwembad",
            Self::Pond => "Vijver",
            Self::Other => "Overig",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Fencing => "erfafscheiding",
            Self::Decking => "vlonder",
            Self::Irrigation => "beregening",
            Self::Pool => "zwembad",
            Self::Pond => "vijver",
            Self::Other => "overig",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FenceType {
    Hedge,
    ConcreteScreen,
    DesignScreen,
}

impl FenceType {
    pub const ALL: [FenceType; 3] = [Self::Hedge, Self::ConcreteScreen, Self::DesignScreen];

    pub fn is_screen(self) -> bool {
        !matches!(self, Self::Hedge)
    }

    pub fn token(self) -> char {
        match self {
            Self::Hedge => '1',
            Self::ConcreteScreen => '2',
            Self::DesignScreen => '3',
        }
    }

    pub fn from_token(token: char) -> Option<Self> {
        Self::ALL.into_iter().find(|fence| fence.token() == token)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Hedge => "Haag",
            Self::ConcreteScreen => "Betonschutting",
            Self::DesignScreen => "Design schutting",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Self::Hedge => "haag",
            Self::ConcreteScreen => "betonschutting",
            Self::DesignScreen => "design schutting",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FenceItem {
    pub fence_type: FenceType,
    pub length_m: Decimal,
    /// Only meaningful for screens; always `None` for a hedge.
    pub gate: Option<bool>,
}

impl FenceItem {
    pub fn new(
        fence_type: FenceType,
        length_m: Decimal,
        gate: Option<bool>,
    ) -> Result<Self, DomainError> {
        let item = Self { fence_type, length_m, gate };
        item.validate()?;
        Ok(item)
    }

    pub fn has_gate(&self) -> bool {
        self.fence_type.is_screen() && self.gate == Some(true)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.length_m <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "fence length must be positive, got {}",
                self.length_m
            )));
        }
        if !self.fence_type.is_screen() && self.gate.is_some() {
            return Err(DomainError::GateNotAllowed { fence_type: self.fence_type });
        }
        Ok(())
    }
}

/// Everything collected during intake. Every split present sums to 100, and
/// a surface's material is unset whenever that surface has a 0% share.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerRecord {
    pub garden_area_m2: Option<Decimal>,
    pub paving_green_choice: Option<RatioChoice>,
    pub paving_green: Option<TwoWaySplit>,
    pub lawn_planting_choice: Option<RatioChoice>,
    pub lawn_planting: Option<TwoWaySplit>,
    pub surface_split_choice: Option<SurfaceSplitChoice>,
    pub surface_split: Option<SurfaceSplit>,
    pub materials: SurfaceMaterials,
    pub weed_resistant_jointing: Option<bool>,
    pub canopy: Option<bool>,
    pub lighting: Option<bool>,
    pub wishes: Vec<Wish>,
    pub irrigation_scope: Option<IrrigationScope>,
    pub decking_tier: Option<DeckingTier>,
    pub fence_items: Vec<FenceItem>,
}

impl AnswerRecord {
    /// Split that counts for pricing; an unset split puts all paving on the terrace.
    pub fn effective_surface_split(&self) -> SurfaceSplit {
        self.surface_split.unwrap_or(SurfaceSplit::ALL_TERRACE)
    }

    pub fn surface_pct(&self, surface: Surface) -> u8 {
        self.effective_surface_split().share(surface)
    }

    /// Material that counts for pricing: `None` for a surface with no share.
    pub fn effective_material(&self, surface: Surface) -> Option<Material> {
        if self.surface_pct(surface) == 0 {
            return None;
        }
        self.materials.get(surface)
    }

    pub fn has_wish(&self, wish: Wish) -> bool {
        self.wishes.contains(&wish)
    }

    pub fn add_wish(&mut self, wish: Wish) {
        if !self.has_wish(wish) {
            self.wishes.push(wish);
        }
    }

    pub fn remove_wish(&mut self, wish: Wish) {
        self.wishes.retain(|existing| *existing != wish);
    }

    pub fn has_fencing(&self) -> bool {
        self.has_wish(Wish::Fencing) || !self.fence_items.is_empty()
    }

    pub fn fence_length(&self, fence_type: FenceType) -> Decimal {
        self.fence_items
            .iter()
            .filter(|item| item.fence_type == fence_type)
            .map(|item| item.length_m)
            .sum()
    }

    pub fn gate_count(&self, fence_type: FenceType) -> u32 {
        self.fence_items.iter().filter(|item| item.fence_type == fence_type && item.has_gate()).count()
            as u32
    }

    pub fn total_gate_count(&self) -> u32 {
        self.fence_items.iter().filter(|item| item.has_gate()).count() as u32
    }

    pub fn set_paving_green(&mut self, preset: TwoWayPreset) {
        self.paving_green_choice = Some(RatioChoice::Preset(preset));
        self.paving_green = Some(TwoWaySplit::from_preset(preset));
    }

    /// Forces the material of every zero-share surface to unset.
    pub fn clear_unused_materials(&mut self) {
        for surface in Surface::ALL {
            if self.surface_pct(surface) == 0 {
                self.materials.set(surface, None);
            }
        }
    }

    /// Checks the invariants that a deserialized record may not satisfy.
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(area) = self.garden_area_m2 {
            if area <= Decimal::ZERO || area > Decimal::from(MAX_GARDEN_AREA_M2) {
                return Err(DomainError::InvariantViolation(format!(
                    "garden area must be in (0, {MAX_GARDEN_AREA_M2}] m², got {area}"
                )));
            }
        }

        for split in [self.paving_green, self.lawn_planting].into_iter().flatten() {
            let total = u32::from(split.first_pct) + u32::from(split.second_pct);
            if total != 100 {
                return Err(DomainError::InvalidSplit { total });
            }
        }

        if let Some(split) = self.surface_split {
            if split.total() != 100 {
                return Err(DomainError::InvalidSplit { total: split.total() });
            }
        }

        for surface in Surface::ALL {
            if self.surface_pct(surface) == 0 && self.materials.get(surface).is_some() {
                return Err(DomainError::MaterialWithoutShare { surface });
            }
        }

        for item in &self.fence_items {
            item.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        AnswerRecord, FenceItem, FenceType, Material, Surface, SurfacePreset, SurfaceSplit,
        TwoWayPreset, TwoWaySplit, Wish,
    };
    use crate::errors::DomainError;

    #[test]
    fn presets_always_sum_to_one_hundred() {
        for preset in TwoWayPreset::ALL {
            let split = TwoWaySplit::from_preset(preset);
            assert_eq!(u32::from(split.first_pct) + u32::from(split.second_pct), 100);
        }
        let split = SurfaceSplit::from_preset(SurfacePreset::TerraceHeavy);
        assert_eq!((split.driveway_pct, split.paths_pct, split.terrace_pct), (20, 30, 50));
    }

    #[test]
    fn custom_surface_split_computes_terrace_remainder() {
        let split = SurfaceSplit::custom(45, 25).expect("45 + 25 fits");
        assert_eq!(split.terrace_pct, 30);
    }

    #[test]
    fn custom_surface_split_rejects_overflow_instead_of_clamping() {
        let error = SurfaceSplit::custom(70, 40).expect_err("70 + 40 exceeds 100");
        assert_eq!(error, DomainError::InvalidSplit { total: 110 });
    }

    #[test]
    fn hedge_cannot_carry_a_gate() {
        let error = FenceItem::new(FenceType::Hedge, Decimal::from(8), Some(true))
            .expect_err("hedges have no gates");
        assert!(matches!(error, DomainError::GateNotAllowed { fence_type: FenceType::Hedge }));
    }

    #[test]
    fn material_tiers_put_concrete_and_baked_clay_together() {
        assert!(Material::Gravel.tier() < Material::Concrete.tier());
        assert_eq!(Material::Concrete.tier(), Material::BakedClay.tier());
        assert!(Material::BakedClay.tier() < Material::Ceramic.tier());
    }

    #[test]
    fn clearing_unused_materials_follows_zero_shares() {
        let mut answers = AnswerRecord {
            surface_split: Some(SurfaceSplit::custom(0, 40).expect("valid split")),
            ..AnswerRecord::default()
        };
        answers.materials.set(Surface::Driveway, Some(Material::Ceramic));
        answers.materials.set(Surface::Paths, Some(Material::Gravel));

        assert!(answers.validate().is_err());
        answers.clear_unused_materials();

        assert_eq!(answers.materials.get(Surface::Driveway), None);
        assert_eq!(answers.materials.get(Surface::Paths), Some(Material::Gravel));
        assert!(answers.validate().is_ok());
    }

    #[test]
    fn unset_surface_split_counts_as_all_terrace() {
        let mut answers = AnswerRecord {
            garden_area_m2: Some(Decimal::from(60)),
            ..AnswerRecord::default()
        };
        answers.materials.set(Surface::Terrace, Some(Material::Ceramic));

        assert_eq!(answers.surface_pct(Surface::Driveway), 0);
        assert_eq!(answers.surface_pct(Surface::Paths), 0);
        assert_eq!(answers.surface_pct(Surface::Terrace), 100);
        assert_eq!(answers.effective_material(Surface::Terrace), Some(Material::Ceramic));
        assert!(answers.validate().is_ok());

        answers.materials.set(Surface::Driveway, Some(Material::Gravel));
        assert_eq!(
            answers.validate(),
            Err(DomainError::MaterialWithoutShare { surface: Surface::Driveway })
        );
    }

    #[test]
    fn wishes_are_recorded_once() {
        let mut answers = AnswerRecord::default();
        answers.add_wish(Wish::Pond);
        answers.add_wish(Wish::Pond);
        assert_eq!(answers.wishes, vec![Wish::Pond]);
        answers.remove_wish(Wish::Pond);
        assert!(answers.wishes.is_empty());
    }
}
