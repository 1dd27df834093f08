//! Normalization rules for NFS-e field values.

pub mod amounts;
pub mod dates;
pub mod patterns;
pub mod words;

pub use amounts::{format_brl, parse_amount, parse_brl, split_amount};
pub use dates::{format_competency, format_long_date, month_name, parse_iso_date};
pub use patterns::extract_quantity;
pub use words::{amount_in_words, spell_number};
