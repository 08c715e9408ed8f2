//! The order-book DEX transaction subsystem of the chain.
//!
//! This crate owns everything between a raw DEX transaction blob and the
//! resulting state updates: the typed transaction model and its canonical
//! wire layout, signature hashing and the dual (user + operator)
//! authorization scheme, static validation, order placement and
//! cancellation, and the settlement engine that applies pre-matched deals.
//!
//! It holds no state of its own. Accounts, active orders, and operator
//! records live behind the traits in [`store`]; the block processor hands a
//! store plus a transaction to [`executive::Executive`] and commits or
//! rejects the whole block around it.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod executive;
pub mod execution;
pub mod settlement;
pub mod store;
pub mod tx;
pub mod types;
pub mod validation;
pub mod verifier;
pub mod wire;

pub use executive::{DexError, Executive, TxContext};
pub use store::TxError;

use dex_primitives::RegId;

/// A crate-wide target for diagnostic node log messages.
const LOG_TARGET: &str = "dex-core";

/// Longest memo accepted on any memo-carrying transaction, in bytes.
pub const MAX_ORDER_MEMO_LEN: usize = 100;

/// Return Err of the expression: `return Err($expression);`.
///
/// Used as `fail!(expression)`.
#[macro_export]
macro_rules! fail {
    ( $y:expr ) => {{
        return Err($y.into());
    }};
}

/// Evaluate `$x:expr` and if not true return `Err($y:expr)`.
///
/// Used as `ensure!(expression_to_ensure, expression_to_return_on_false)`.
#[macro_export]
macro_rules! ensure {
    ( $x:expr, $y:expr $(,)? ) => {{
        if !$x {
            $crate::fail!($y);
        }
    }};
}

/// Which regids may co-sign an order on an operator's behalf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorSignerPolicy {
    /// Only the operator's owner account.
    OwnerOnly,
    /// The owner account or the operator's matcher account.
    OwnerOrMatcher,
}

/// Chain-level knobs the subsystem reads but does not own.
///
/// The defaults mirror mainnet; test fixtures override individual fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainParams {
    /// Chain-wide clamp on an order's own `operator_fee_ratio` in
    /// `RequireAuth` mode; the effective ceiling is the operator's
    /// maker + taker sum, never above this. The default caps at 50%.
    pub operator_fee_ratio_cap: u64,
    /// Who may provide the operator co-signature.
    pub operator_signers: OperatorSignerPolicy,
    /// Maker fee ratio applied on the reserved system DEX, which has no
    /// operator record of its own.
    pub default_maker_fee_ratio: u64,
    /// Taker fee ratio applied on the reserved system DEX.
    pub default_taker_fee_ratio: u64,
    /// The only account allowed to settle trades on the reserved system DEX.
    pub sys_matcher_regid: RegId,
    /// Account credited with trade fees collected on the reserved system DEX.
    pub risk_reserve_regid: RegId,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            operator_fee_ratio_cap: 50_000_000,
            operator_signers: OperatorSignerPolicy::OwnerOrMatcher,
            default_maker_fee_ratio: 40_000,
            default_taker_fee_ratio: 40_000,
            sys_matcher_regid: RegId::new(0, 1),
            risk_reserve_regid: RegId::new(0, 2),
        }
    }
}
