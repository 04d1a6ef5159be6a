//! Fee withholding and treasury routing.

use tracing::{info, warn};

use pillar_core::address::Address;
use pillar_core::constants::BASIS_POINTS;
use pillar_core::error::LedgerError;
use pillar_core::rates::Rate;
use pillar_core::traits::ValueTransfer;
use pillar_core::types::GlobalState;

/// Split `amount` into `(fee, net)` at `fee_bp` over [`BASIS_POINTS`].
pub fn withhold(amount: u128, fee_bp: u64) -> Result<(u128, u128), LedgerError> {
    let fee = Rate::basis_points(fee_bp).apply(amount)?;
    let net = amount.checked_sub(fee).ok_or(LedgerError::ArithmeticOverflow)?;
    Ok((fee, net))
}

/// Reject a fee above `max_bp`.
pub fn check_fee(fee_bp: u64, max_bp: u64) -> Result<(), LedgerError> {
    if fee_bp > max_bp || fee_bp > BASIS_POINTS {
        return Err(LedgerError::InvalidFee { fee: fee_bp, max: max_bp });
    }
    Ok(())
}

/// Where routed fees go.
#[derive(Clone, Copy, Debug)]
pub struct FeeRoute {
    pub treasury: Address,
    pub treasury2: Address,
    /// Percent of each routing for `treasury`.
    pub treasury_share_percent: u64,
}

/// Push pending fees to the treasuries.
///
/// A failed push keeps the unsent part pending for the next routing.
/// Returns the amount routed.
pub fn route_pending<T: ValueTransfer>(
    global: &mut GlobalState,
    transfer: &T,
    route: &FeeRoute,
) -> u128 {
    let pending = global.pending_fees;
    if pending == 0 {
        return 0;
    }
    let first = pending / 100 * route.treasury_share_percent as u128
        + pending % 100 * route.treasury_share_percent as u128 / 100;
    let second = pending - first;

    if first > 0 {
        if let Err(e) = transfer.push(&route.treasury, first) {
            warn!(amount = first, error = %e, "fee routing to treasury failed");
            return 0;
        }
        global.pending_fees -= first;
    }
    if second > 0 {
        if let Err(e) = transfer.push(&route.treasury2, second) {
            warn!(amount = second, error = %e, "fee routing to treasury2 failed");
            return first;
        }
        global.pending_fees -= second;
    }
    info!(treasury = first, treasury2 = second, "routed fees");
    pending
}
