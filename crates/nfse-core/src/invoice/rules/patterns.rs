//! Common regex patterns for NFS-e descriptions.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Quantity followed by a currency amount: "120 R$ 15,00"
    pub static ref QUANTITY_BEFORE_PRICE: Regex = Regex::new(
        r"(\d+)\s+R\$"
    ).unwrap();
}

/// First digit run immediately followed by whitespace and "R$".
pub fn extract_quantity(description: &str) -> Option<&str> {
    QUANTITY_BEFORE_PRICE
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
