use thiserror::Error;

/// The caller refused to cross into a callee.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallerError {
    #[error("symbol {symbol} implements {found}, caller expects {expected}")]
    SignatureMismatch {
        symbol: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("symbol {symbol} has a null address")]
    NullSymbol { symbol: &'static str },
}
