use crate::config::MIN_TX_FEE;
use crate::rosetta::{RosettaError, RosettaErrorKind};

/// `max(size * rate, MIN_TX_FEE)`, scaled by the client's multiplier and
/// never below [`MIN_TX_FEE`].
pub(crate) fn suggested_fee(size: u64, fee_rate: u64, multiplier: Option<f64>) -> Result<u64, RosettaError> {
    let base = size.saturating_mul(fee_rate).max(MIN_TX_FEE);
    let fee = match multiplier {
        None => base,
        Some(m) if m.is_finite() && m > 0.0 => (base as f64 * m).ceil() as u64,
        Some(m) => {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidFee,
                format!("suggested_fee_multiplier must be positive, got {m}"),
            ))
        }
    };
    Ok(fee.max(MIN_TX_FEE))
}

/// Fails with `InvalidFee` when `fee` exceeds the client's cap.
pub(crate) fn check_max_fee(fee: u64, max_fee: Option<&str>) -> Result<(), RosettaError> {
    let Some(max_fee) = max_fee else {
        return Ok(());
    };
    let cap: u64 = max_fee
        .parse()
        .map_err(|_| RosettaError::with_message(RosettaErrorKind::InvalidFee, format!("invalid max_fee '{max_fee}'")))?;
    if fee > cap {
        return Err(RosettaError::with_message(
            RosettaErrorKind::InvalidFee,
            format!("suggested fee {fee} exceeds max_fee {cap}"),
        ));
    }
    Ok(())
}
