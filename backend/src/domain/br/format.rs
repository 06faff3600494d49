//! Presentation helpers for Brazilian values.

use super::digits_only;
use crate::domain::Money;

/// Format an amount as Brazilian currency, e.g. `R$ 1.234,56`.
///
/// # Examples
/// ```
/// use streamflix::domain::{Money, br::format_brl};
///
/// assert_eq!(format_brl(Money::from_centavos(123_456)), "R$ 1.234,56");
/// assert_eq!(format_brl(Money::from_centavos(1490)), "R$ 14,90");
/// ```
#[must_use]
pub fn format_brl(amount: Money) -> String {
    let centavos = amount.centavos();
    let sign = if centavos < 0 { "-" } else { "" };
    let absolute = centavos.unsigned_abs();
    let reais = (absolute / 100).to_string();
    let fraction = absolute % 100;

    let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
    for (index, c) in reais.chars().enumerate() {
        if index > 0 && (reais.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{sign}R$ {grouped},{fraction:02}")
}

/// `000.000.000-00`; input that is not eleven digits is returned unchanged.
#[must_use]
pub fn format_cpf(raw: &str) -> String {
    let d = digits_only(raw);
    if d.len() != 11 {
        return raw.to_owned();
    }
    format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..])
}

/// Phone presentation by length.
///
/// - 13 digits: `+55 (11) 98765-4321`
/// - 11 digits: `(11) 98765-4321`
/// - 10 digits: `(11) 3456-7890`
///
/// Other input is returned unchanged.
#[must_use]
pub fn format_phone(raw: &str) -> String {
    let d = digits_only(raw);
    match d.len() {
        13 => format!("+{} ({}) {}-{}", &d[..2], &d[2..4], &d[4..9], &d[9..]),
        11 => format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..]),
        10 => format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..]),
        _ => raw.to_owned(),
    }
}

/// `00000-000`; input that is not eight digits is returned unchanged.
#[must_use]
pub fn format_cep(raw: &str) -> String {
    let d = digits_only(raw);
    if d.len() != 8 {
        return raw.to_owned();
    }
    format!("{}-{}", &d[..5], &d[5..])
}
