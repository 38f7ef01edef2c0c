use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::estimate::CostEstimate;
use crate::estimate::EstimateError;

const FALLBACK: &str = "Op basis van de ingevulde gegevens kan ik nu nog geen betrouwbare \
                        prijsindicatie geven. We helpen u graag verder met een offerte op maat.";

pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole euros with a dot as thousands separator, e.g. `€13.000`.
pub fn format_eur(value: Decimal) -> String {
    let rounded = round_whole(value);
    let digits = rounded.abs().to_u64().unwrap_or_default().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("−€{grouped}")
    } else {
        format!("€{grouped}")
    }
}

/// Cubic meters keep two decimals; everything else is shown whole.
pub fn format_quantity(quantity: Decimal, unit: &str) -> String {
    let shown = if unit.contains('³') {
        quantity.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero).normalize()
    } else {
        round_whole(quantity)
    };
    shown.to_string().replace('.', ",")
}

pub fn format_for_customer(estimate: &Result<CostEstimate, EstimateError>) -> String {
    let estimate = match estimate {
        Ok(estimate) => estimate,
        Err(_) => return FALLBACK.to_owned(),
    };

    let mut lines = vec![
        "✅ **Globale kostenindicatie** ✅".to_owned(),
        "Op basis van uw keuzes kan ik een globale kostenindicatie geven:".to_owned(),
        String::new(),
        format!(
            "**Totale indicatie:** {} – {}",
            format_eur(estimate.total.min),
            format_eur(estimate.total.max)
        ),
        String::new(),
    ];

    for item in &estimate.items {
        let Some(range) = item.range else {
            lines.push(format!("- {}: wordt meegenomen in de offerte", item.label));
            if !item.note.is_empty() {
                lines.push(format!("  _{}_", item.note));
            }
            continue;
        };

        let unit = item.unit.replace("€/", "").trim().to_owned();
        let mut line = format!("- {}", item.label);
        if let Some(quantity) = item.quantity {
            if !unit.is_empty() {
                line.push_str(&format!(" ({} {unit})", format_quantity(quantity, &unit)));
            }
        }
        line.push_str(&format!(": {} – {}", format_eur(range.min), format_eur(range.max)));
        lines.push(line);

        if !item.note.is_empty() {
            lines.push(format!("  _{}_", item.note));
        }
    }

    lines.push(String::new());
    lines.push(
        "_Deze prijsindicatie is globaal en gebaseerd op aannames. De exacte prijs hangt af van \
         onder andere locatie, bereikbaarheid, ondergrond en materiaalkeuze._"
            .to_owned(),
    );
    lines.push(String::new());
    lines.push(
        "Wilt u een **definitieve prijs**? Dan komen we graag langs voor een vrijblijvende offerte."
            .to_owned(),
    );

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_eur, format_for_customer, format_quantity, FALLBACK};
    use crate::domain::estimate::{CostEstimate, CostLineItem, EstimateMetrics, PriceRange};
    use crate::domain::price_table::PriceKey;
    use crate::estimate::EstimateError;

    #[test]
    fn euros_use_dot_thousands_and_round_half_away_from_zero() {
        assert_eq!(format_eur(Decimal::new(130625, 2)), "€1.306");
        assert_eq!(format_eur(Decimal::new(20625, 1)), "€2.063");
        assert_eq!(format_eur(Decimal::from(13_000)), "€13.000");
        assert_eq!(format_eur(Decimal::from(1_250_000)), "€1.250.000");
        assert_eq!(format_eur(Decimal::from(950)), "€950");
        assert_eq!(format_eur(Decimal::ZERO), "€0");
    }

    #[test]
    fn cubic_meters_keep_two_decimals() {
        assert_eq!(format_quantity(Decimal::new(1375, 2), "m³"), "13,75");
        assert_eq!(format_quantity(Decimal::new(500, 2), "m³"), "5");
        assert_eq!(format_quantity(Decimal::new(125, 1), "m²"), "13");
    }

    #[test]
    fn customer_text_lists_items_and_notes() {
        let estimate = CostEstimate {
            total: PriceRange::new(Decimal::from(375), Decimal::from(625)),
            items: vec![
                CostLineItem::priced(
                    PriceKey::TurfPerM2,
                    "Graszoden",
                    "€/m²",
                    Decimal::from(25),
                    PriceRange::new(Decimal::from(375), Decimal::from(625)),
                    "Indicatief.",
                ),
                CostLineItem::note_only("Overige wensen", "Opgenomen als wens: vijver"),
            ],
            metrics: EstimateMetrics::default(),
        };

        let text = format_for_customer(&Ok(estimate));

        assert!(text.contains("**Totale indicatie:** €375 – €625"));
        assert!(text.contains("- Graszoden (25 m²): €375 – €625\n  _Indicatief._"));
        assert!(text.contains("- Overige wensen: wordt meegenomen in de offerte"));
        assert!(text.ends_with("vrijblijvende offerte."));
    }

    #[test]
    fn error_estimate_renders_fallback() {
        assert_eq!(format_for_customer(&Err(EstimateError::MissingArea)), FALLBACK);
    }
}
