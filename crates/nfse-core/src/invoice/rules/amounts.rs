//! Amount parsing and Brazilian currency formatting.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// An amount split into its spoken parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountParts {
    pub negative: bool,
    pub reais: u64,
    pub centavos: u32,
}

/// Parse the decimal amount of an NFS-e element ("1234.56").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok()
}

/// Round to centavos, half to even.
fn round_centavos(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Split an amount into reais and centavos after rounding to centavos.
///
/// Returns `None` when the integer part does not fit in a `u64`.
pub fn split_amount(amount: Decimal) -> Option<AmountParts> {
    let rounded = round_centavos(amount);
    let abs = rounded.abs();
    let reais = abs.trunc().to_u64()?;
    let centavos = (abs.fract() * Decimal::ONE_HUNDRED).to_u32()?;

    Some(AmountParts {
        negative: rounded.is_sign_negative() && !rounded.is_zero(),
        reais,
        centavos,
    })
}

/// Format amount in Brazilian style (R$ 1.234,56).
pub fn format_brl(amount: Decimal) -> String {
    let rounded = round_centavos(amount);
    let s = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    format!("R$ {}{},{}", sign, formatted, decimal_part)
}

/// Parse a Brazilian-formatted amount ("R$ 1.234,56" or "1.234,56").
pub fn parse_brl(s: &str) -> Option<Decimal> {
    let cleaned = s.trim().trim_start_matches("R$").trim();
    let normalized = cleaned.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).ok()
}
