//! Customer-facing texts of the post-offer menus.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::answers::{AnswerRecord, Material, Surface};
use crate::domain::estimate::PriceRange;
use crate::estimate::format::format_eur;
use crate::savings::{SavingsCategory, SavingsOption};

pub const OFFER_MENU: &str = "Hoe wilt u verder?\n\
                              1) Kijken of er keuzes zijn om de kosten te verlagen\n\
                              2) Contact voor offerte op maat (vrijblijvend)\n\
                              3) Het hierbij laten\n\n\
                              Reageer met 1, 2 of 3.";

pub const SOFT_LIMIT: &str = "We kunnen samen een paar varianten bekijken. Daarna kijken we liever \
                              persoonlijk mee, zodat het echt goed aansluit bij uw situatie.";

pub const LIMIT_FOLLOW_UP: &str = "Hoe wilt u verder?\n\
                                   1) Contact voor offerte op maat (vrijblijvend)\n\
                                   2) Het hierbij laten\n\n\
                                   Reageer met 1 of 2.";

pub const NOT_APPLICABLE: &str = "Deze bespaaroptie is voor uw keuzes niet van toepassing.\n\
                                  Kies gerust een andere bespaaroptie.";

pub const NO_CHANGE: &str = "Geen kostenbesparing doorgevoerd (geen wijzigingen).";

const SINGLE_FOOTER: &str = "Reageer met het nummer. (of typ 'nee' om terug te gaan)";
const MULTI_FOOTER: &str = "Reageer met de nummers (bijv. 1,3) of typ 'nee' om terug te gaan.";

pub fn category_title(category: SavingsCategory) -> &'static str {
    match category {
        SavingsCategory::PavingRatio => {
            "Minder bestrating, meer groen (kies een voordeligere verhouding)"
        }
        SavingsCategory::Extras => "Extra’s aanpassen (kies welke extra’s u wilt weglaten)",
        SavingsCategory::Material => {
            "Bestratingmateriaal goedkoper kiezen (toon besparing per optie)"
        }
        SavingsCategory::Decking => "Vlonder goedkoper maken (toon besparing per optie)",
        SavingsCategory::Fencing => "Erfafscheiding verwijderen (toon besparing per optie)",
        SavingsCategory::Gates => "Poortdeuren laten vervallen (toon besparing per optie)",
    }
}

/// Numbered list of the categories; the position in `categories` is the
/// token minus one.
pub fn savings_menu(categories: &[SavingsCategory]) -> String {
    let mut lines = vec!["Waar wilt u eventueel op besparen?".to_owned()];
    for (index, category) in categories.iter().enumerate() {
        lines.push(format!("{}) {}", index + 1, category_title(*category)));
    }
    lines.push(String::new());
    lines.push(
        "U kunt hier later terugkomen om eventueel opnieuw een bespaaroptie te kiezen.".to_owned(),
    );
    lines.push(String::new());
    lines.push(SINGLE_FOOTER.to_owned());
    lines.join("\n")
}

pub fn no_options(category: SavingsCategory) -> &'static str {
    match category {
        SavingsCategory::PavingRatio => {
            "Ik zie op basis van uw invoer geen verhouding die duidelijk goedkoper uitpakt.\n\
             Kies gerust een andere bespaaroptie."
        }
        SavingsCategory::Extras => {
            "Ik zie geen extra’s die u nu kunt weglaten met een duidelijke besparing (op basis van \
             uw invoer).\nKies gerust een andere bespaaroptie."
        }
        SavingsCategory::Material => {
            "Er is geen materiaaloptie die op basis van uw invoer duidelijk goedkoper uitpakt.\n\
             Kies gerust een andere bespaaroptie."
        }
        SavingsCategory::Decking => {
            "Ik zie geen vlonder-optie die op basis van uw invoer duidelijk goedkoper uitpakt.\n\
             Kies gerust een andere bespaaroptie."
        }
        SavingsCategory::Fencing | SavingsCategory::Gates => {
            "Ik zie geen erfafscheiding-aanpassing die op basis van uw invoer duidelijk goedkoper \
             uitpakt.\nKies gerust een andere bespaaroptie."
        }
    }
}

pub fn saving_text(saving: PriceRange) -> String {
    format!("(besparing: −{} tot −{})", format_eur(saving.min), format_eur(saving.max))
}

pub fn applied(fragments: &[String]) -> String {
    if fragments.is_empty() {
        return NO_CHANGE.to_owned();
    }
    format!("✅ Doorgevoerde kostenbesparing: {}.", fragments.join(", "))
}

/// Lengths are shown with one decimal, e.g. `10,0 m`.
pub fn format_length(length_m: Decimal) -> String {
    let rounded = length_m.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.1} m").replace('.', ",")
}

pub fn material_surfaces(answers: &AnswerRecord) -> String {
    let mut lines = vec!["Welke onderdelen wilt u goedkoper maken?".to_owned()];
    for surface in Surface::ALL {
        let current = answers.materials.get(surface).unwrap_or(Material::Concrete);
        let mut line = format!("{}) {} (nu: {})", surface.token(), surface.label(), current.label());
        if answers.surface_pct(surface) == 0 {
            line.push_str(" (niet van toepassing)");
        }
        lines.push(line);
    }
    lines.push(String::new());
    lines.push("U kunt meerdere opties tegelijk kiezen, bijv. 1,3".to_owned());
    lines.push("Of typ 'nee' om terug te gaan.".to_owned());
    lines.join("\n")
}

pub(crate) fn proposal(
    category: SavingsCategory,
    header: Vec<String>,
    options: &[SavingsOption],
) -> String {
    if options.is_empty() {
        return no_options(category).to_owned();
    }

    let mut lines = header;
    for option in options {
        lines.push(format!("{}) {} {}", option.token, option.label, saving_text(option.saving)));
    }
    lines.push(String::new());
    lines.push(if category.is_multi_select() { MULTI_FOOTER } else { SINGLE_FOOTER }.to_owned());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{applied, format_length, savings_menu, saving_text, NO_CHANGE};
    use crate::domain::estimate::PriceRange;
    use crate::savings::SavingsCategory;

    #[test]
    fn savings_menu_numbers_categories_in_order() {
        let text = savings_menu(&[SavingsCategory::PavingRatio, SavingsCategory::Decking]);

        assert!(text.starts_with("Waar wilt u eventueel op besparen?\n1) Minder bestrating"));
        assert!(text.contains("\n2) Vlonder goedkoper maken"));
    }

    #[test]
    fn saving_text_uses_rounded_euros() {
        let saving = PriceRange::new(Decimal::new(4505, 1), Decimal::from(1_750));
        assert_eq!(saving_text(saving), "(besparing: −€451 tot −€1.750)");
    }

    #[test]
    fn applied_text_joins_fragments() {
        assert_eq!(
            applied(&["voegen verwijderd".to_owned(), "verlichting verwijderd".to_owned()]),
            "✅ Doorgevoerde kostenbesparing: voegen verwijderd, verlichting verwijderd."
        );
        assert_eq!(applied(&[]), NO_CHANGE);
    }

    #[test]
    fn lengths_keep_one_decimal() {
        assert_eq!(format_length(Decimal::from(10)), "10,0 m");
        assert_eq!(format_length(Decimal::new(1225, 2)), "12,3 m");
    }
}
