//! Polish amount-in-words conversion for invoice documents.
//!
//! Covers the full validated amount range (up to 999 999,99 PLN). Grosze
//! are rendered in the customary `NN/100` form rather than spelled out.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const UNITS: [&str; 10] = [
    "zero",
    "jeden",
    "dwa",
    "trzy",
    "cztery",
    "pięć",
    "sześć",
    "siedem",
    "osiem",
    "dziewięć",
];

const TEENS: [&str; 10] = [
    "dziesięć",
    "jedenaście",
    "dwanaście",
    "trzynaście",
    "czternaście",
    "piętnaście",
    "szesnaście",
    "siedemnaście",
    "osiemnaście",
    "dziewiętnaście",
];

const TENS: [&str; 10] = [
    "",
    "",
    "dwadzieścia",
    "trzydzieści",
    "czterdzieści",
    "pięćdziesiąt",
    "sześćdziesiąt",
    "siedemdziesiąt",
    "osiemdziesiąt",
    "dziewięćdziesiąt",
];

const HUNDREDS: [&str; 10] = [
    "",
    "sto",
    "dwieście",
    "trzysta",
    "czterysta",
    "pięćset",
    "sześćset",
    "siedemset",
    "osiemset",
    "dziewięćset",
];

/// Pick the Polish plural form for a count: 1 → `one`, 2–4 (except the
/// teens 12–14) → `few`, everything else → `many`.
fn plural_form<'a>(n: i64, one: &'a str, few: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else if (2..=4).contains(&(n % 10)) && !(12..=14).contains(&(n % 100)) {
        few
    } else {
        many
    }
}

/// Words for 1..=999; the empty string for 0.
fn under_thousand(n: i64) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let hundreds = (n / 100) as usize;
    let rest = n % 100;

    if hundreds > 0 {
        parts.push(HUNDREDS[hundreds]);
    }
    if (10..20).contains(&rest) {
        parts.push(TEENS[(rest - 10) as usize]);
    } else {
        let tens = (rest / 10) as usize;
        let units = (rest % 10) as usize;
        if tens >= 2 {
            parts.push(TENS[tens]);
        }
        if units > 0 {
            parts.push(UNITS[units]);
        }
    }
    parts.join(" ")
}

/// Words for 0..=999_999. Larger values fall back to digits; the
/// validator caps invoice amounts well below that.
fn number_to_words(n: i64) -> String {
    if n == 0 {
        return UNITS[0].to_string();
    }
    if n >= 1_000_000 {
        return n.to_string();
    }

    let thousands = n / 1000;
    let rest = n % 1000;
    let mut parts: Vec<String> = Vec::new();

    if thousands > 0 {
        let noun = plural_form(thousands, "tysiąc", "tysiące", "tysięcy");
        if thousands == 1 {
            parts.push(noun.to_string());
        } else {
            parts.push(format!("{} {}", under_thousand(thousands), noun));
        }
    }
    if rest > 0 {
        parts.push(under_thousand(rest));
    }
    parts.join(" ")
}

/// Convert an invoice amount to its Polish wording, e.g.
/// `100.50` → `"sto złotych 50/100"`.
pub fn amount_in_words(amount: Decimal) -> String {
    let amount = amount.round_dp(2);
    let zlote = amount.trunc().to_i64().unwrap_or(0);
    let grosze = ((amount - amount.trunc()) * Decimal::new(100, 0))
        .to_i64()
        .unwrap_or(0);

    let zlote_word = plural_form(zlote, "złoty", "złote", "złotych");
    format!(
        "{} {} {:02}/100",
        number_to_words(zlote),
        zlote_word,
        grosze
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn one_zloty_uses_singular() {
        assert_eq!(amount_in_words(dec!(1.00)), "jeden złoty 00/100");
    }

    #[test]
    fn two_to_four_use_paucal() {
        assert_eq!(amount_in_words(dec!(2.00)), "dwa złote 00/100");
        assert_eq!(amount_in_words(dec!(23.00)), "dwadzieścia trzy złote 00/100");
    }

    #[test]
    fn teens_use_plural_despite_final_digit() {
        assert_eq!(amount_in_words(dec!(12.00)), "dwanaście złotych 00/100");
        assert_eq!(amount_in_words(dec!(14.00)), "czternaście złotych 00/100");
    }

    #[test]
    fn grosze_render_as_fraction() {
        assert_eq!(amount_in_words(dec!(100.50)), "sto złotych 50/100");
        assert_eq!(amount_in_words(dec!(0.05)), "zero złotych 05/100");
    }

    #[test]
    fn hundreds_and_compounds() {
        assert_eq!(
            amount_in_words(dec!(999.99)),
            "dziewięćset dziewięćdziesiąt dziewięć złotych 99/100"
        );
        assert_eq!(
            amount_in_words(dec!(345.00)),
            "trzysta czterdzieści pięć złotych 00/100"
        );
    }

    #[test]
    fn thousands_inflect() {
        assert_eq!(amount_in_words(dec!(1000.00)), "tysiąc złotych 00/100");
        assert_eq!(
            amount_in_words(dec!(2000.00)),
            "dwa tysiące złotych 00/100"
        );
        assert_eq!(
            amount_in_words(dec!(5000.00)),
            "pięć tysięcy złotych 00/100"
        );
        assert_eq!(
            amount_in_words(dec!(12000.00)),
            "dwanaście tysięcy złotych 00/100"
        );
        assert_eq!(
            amount_in_words(dec!(999999.99)),
            "dziewięćset dziewięćdziesiąt dziewięć tysięcy \
             dziewięćset dziewięćdziesiąt dziewięć złotych 99/100"
        );
    }
}
