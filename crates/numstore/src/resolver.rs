//! Operand resolution: stored name first, literal second

use crate::decimal::Decimal;
use crate::engine::NumberStore;
use crate::error::OperandError;

/// Resolve one operand token
///
/// A live stored name wins over a literal reading of the same token. The
/// store is only read; literals never create entries.
pub fn resolve(store: &NumberStore, position: usize, token: &str) -> Result<Decimal, OperandError> {
    if let Some(value) = store.get(token) {
        return Ok(value);
    }
    Decimal::parse(token).map_err(|_| OperandError {
        position,
        token: token.to_string(),
    })
}

/// Resolve both operands of a binary operation, failing on the first bad one
pub fn resolve_pair(store: &NumberStore, a: &str, b: &str) -> Result<(Decimal, Decimal), OperandError> {
    let lhs = resolve(store, 0, a)?;
    let rhs = resolve(store, 1, b)?;
    Ok((lhs, rhs))
}
