use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::price_table::PriceKey;

/// An inclusive `(min, max)` money range. Arithmetic is exact; rounding is a
/// formatting concern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceRange {
    pub const ZERO: PriceRange = PriceRange { min: Decimal::ZERO, max: Decimal::ZERO };

    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn is_zero(&self) -> bool {
        self.min.is_zero() && self.max.is_zero()
    }
}

impl Add for PriceRange {
    type Output = PriceRange;

    fn add(self, rhs: PriceRange) -> PriceRange {
        PriceRange { min: self.min + rhs.min, max: self.max + rhs.max }
    }
}

impl AddAssign for PriceRange {
    fn add_assign(&mut self, rhs: PriceRange) {
        *self = *self + rhs;
    }
}

impl Mul<Decimal> for PriceRange {
    type Output = PriceRange;

    fn mul(self, quantity: Decimal) -> PriceRange {
        PriceRange { min: self.min * quantity, max: self.max * quantity }
    }
}

impl std::iter::Sum for PriceRange {
    fn sum<I: Iterator<Item = PriceRange>>(iter: I) -> Self {
        iter.fold(PriceRange::ZERO, Add::add)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLineItem {
    /// `None` for note-only items that are not priced.
    pub key: Option<PriceKey>,
    pub label: String,
    pub unit: String,
    pub quantity: Option<Decimal>,
    pub range: Option<PriceRange>,
    pub note: String,
}

impl CostLineItem {
    pub fn priced(
        key: PriceKey,
        label: impl Into<String>,
        unit: impl Into<String>,
        quantity: Decimal,
        range: PriceRange,
        note: impl Into<String>,
    ) -> Self {
        Self {
            key: Some(key),
            label: label.into(),
            unit: unit.into(),
            quantity: Some(quantity),
            range: Some(range),
            note: note.into(),
        }
    }

    pub fn note_only(label: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            key: None,
            label: label.into(),
            unit: String::new(),
            quantity: None,
            range: None,
            note: note.into(),
        }
    }

    pub fn range_or_zero(&self) -> PriceRange {
        self.range.unwrap_or(PriceRange::ZERO)
    }
}

/// Intermediate quantities the estimate was derived from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateMetrics(pub BTreeMap<String, Decimal>);

impl EstimateMetrics {
    pub fn record(&mut self, name: &str, value: Decimal) {
        self.0.insert(name.to_owned(), value);
    }

    pub fn get(&self, name: &str) -> Option<Decimal> {
        self.0.get(name).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub total: PriceRange,
    pub items: Vec<CostLineItem>,
    pub metrics: EstimateMetrics,
}

impl CostEstimate {
    /// Sum of the ranges of the items whose key is in `keys`. Missing keys
    /// count as zero.
    pub fn linked_sum(&self, keys: &[PriceKey]) -> PriceRange {
        self.items
            .iter()
            .filter(|item| item.key.is_some_and(|key| keys.contains(&key)))
            .map(CostLineItem::range_or_zero)
            .sum()
    }

    pub fn item(&self, key: PriceKey) -> Option<&CostLineItem> {
        self.items.iter().find(|item| item.key == Some(key))
    }
}
