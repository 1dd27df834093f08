//! Spelling amounts out in Brazilian Portuguese.

use rust_decimal::Decimal;

use super::amounts::split_amount;

const UNITS: [&str; 20] = [
    "zero", "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove", "dez",
    "onze", "doze", "treze", "catorze", "quinze", "dezesseis", "dezessete", "dezoito",
    "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta",
    "noventa",
];

const HUNDREDS: [&str; 10] = [
    "", "cento", "duzentos", "trezentos", "quatrocentos", "quinhentos", "seiscentos",
    "setecentos", "oitocentos", "novecentos",
];

/// Singular and plural names of each power of one thousand above "mil".
const SCALES: [(&str, &str); 5] = [
    ("milhão", "milhões"),
    ("bilhão", "bilhões"),
    ("trilhão", "trilhões"),
    ("quatrilhão", "quatrilhões"),
    ("quintilhão", "quintilhões"),
];

/// Spell a number from 1 to 999.
fn spell_group(n: u64) -> String {
    debug_assert!(n > 0 && n < 1000);
    if n == 100 {
        return "cem".to_string();
    }

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    let hundreds = (n / 100) as usize;
    let rest = (n % 100) as usize;

    if hundreds > 0 {
        parts.push(HUNDREDS[hundreds]);
    }
    if rest >= 20 {
        parts.push(TENS[rest / 10]);
        if rest % 10 > 0 {
            parts.push(UNITS[rest % 10]);
        }
    } else if rest > 0 {
        parts.push(UNITS[rest]);
    }

    parts.join(" e ")
}

fn scale_phrase(group: u64, scale: usize) -> String {
    match scale {
        0 => spell_group(group),
        1 if group == 1 => "mil".to_string(),
        1 => format!("{} mil", spell_group(group)),
        _ => {
            let (singular, plural) = SCALES[scale - 2];
            if group == 1 {
                format!("um {}", singular)
            } else {
                format!("{} {}", spell_group(group), plural)
            }
        }
    }
}

/// Spell a non-negative integer in Portuguese ("mil duzentos e trinta e quatro").
pub fn spell_number(n: u64) -> String {
    if n == 0 {
        return UNITS[0].to_string();
    }

    // Groups of three digits, least significant first.
    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push(rest % 1000);
        rest /= 1000;
    }

    let nonzero: Vec<(usize, u64)> = groups
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, g)| **g > 0)
        .map(|(scale, g)| (scale, *g))
        .collect();

    let mut out = String::new();
    for (i, (scale, group)) in nonzero.iter().enumerate() {
        if i > 0 {
            let is_last = i == nonzero.len() - 1;
            if is_last && (*group < 100 || group % 100 == 0) {
                out.push_str(" e ");
            } else {
                out.push(' ');
            }
        }
        out.push_str(&scale_phrase(*group, *scale));
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Spell a currency amount: "Mil duzentos e trinta e quatro reais e
/// cinquenta e seis centavos". The centavos clause is omitted when zero.
///
/// Returns `None` for a zero amount, which has no spelled form, and when
/// the amount is too large to spell.
pub fn amount_in_words(amount: Decimal) -> Option<String> {
    if amount.is_zero() {
        return None;
    }
    let parts = split_amount(amount)?;

    let mut phrase = String::new();
    if parts.negative {
        phrase.push_str("menos ");
    }

    phrase.push_str(&spell_number(parts.reais));
    let unit = match parts.reais {
        1 => " real",
        // Round millions and above: "um milhão de reais".
        n if n >= 1_000_000 && n % 1_000_000 == 0 => " de reais",
        _ => " reais",
    };
    phrase.push_str(unit);

    if parts.centavos > 0 {
        phrase.push_str(" e ");
        phrase.push_str(&spell_number(u64::from(parts.centavos)));
        phrase.push_str(if parts.centavos == 1 { " centavo" } else { " centavos" });
    }

    Some(capitalize(&phrase))
}
