//! Exported-symbol naming convention.

/// Suffix appended to a logical factory name to form its safe export.
///
/// Keeps safe adapters apart from plain exports, so looking up the bare
/// name through the unchecked path can never reach an adapter by accident.
pub const SAFE_SYMBOL_SUFFIX: &str = crate::__dynbridge_safe_suffix!();

/// Actual symbol exported for the safe adapter of `name`.
pub fn safe_symbol_name(name: &str) -> String {
    let mut symbol = String::with_capacity(name.len() + SAFE_SYMBOL_SUFFIX.len());
    symbol.push_str(name);
    symbol.push_str(SAFE_SYMBOL_SUFFIX);
    symbol
}

/// Logical name of a safe export, if `symbol` follows the convention.
pub fn logical_name(symbol: &str) -> Option<&str> {
    symbol
        .strip_suffix(SAFE_SYMBOL_SUFFIX)
        .filter(|name| !name.is_empty())
}
