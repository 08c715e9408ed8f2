//! Order placement and cancellation against the store.
//!
//! Placement freezes the paying side of the order, persists the full
//! [`OrderDetail`] under the placing transaction's hash, and opens the
//! [`ActiveOrder`] index entry. Cancellation refunds whatever the
//! settlement engine has not already spent and retires both records.

use crate::store::{BalanceOp, DexStore, TxError};
use crate::tx::{DexTx, OrderFields};
use crate::types::{ActiveOrder, OrderDetail, OrderGenerateType, OrderSide, OrderType};
use crate::validation::InvalidOrderReason;
use crate::{ensure, LOG_TARGET};
use dex_primitives::{RegId, TxCord, TxId};

/// Freeze the order's paying side and persist it as an open order.
///
/// This is the single placement path: user orders arrive here from the
/// executive, and protocol flows (CDP maintenance) hand in their
/// system-generated [`OrderDetail`]s directly.
pub fn place_order<S: DexStore>(
    store: &mut S,
    order_id: TxId,
    order: OrderDetail,
) -> Result<(), TxError> {
    let (freeze_symbol, freeze_amount) = order.freeze_requirement();
    store.operate_balance(
        &order.user_regid,
        &freeze_symbol,
        BalanceOp::Freeze,
        freeze_amount,
    )?;
    log::debug!(
        target: LOG_TARGET,
        "placing {} {} order {:?} for {}: froze {} {}",
        order.order_type.as_str(),
        order.order_side.as_str(),
        order_id,
        order.user_regid,
        freeze_amount,
        freeze_symbol,
    );
    store.set_active_order(
        &order_id,
        ActiveOrder::new(order.generate_type, order.tx_cord),
    );
    store.set_order_detail(&order_id, order);
    Ok(())
}

/// Execute an order-placing transaction whose checks already passed.
pub fn execute_order_tx<S: DexStore>(
    store: &mut S,
    tx_cord: TxCord,
    tx: &DexTx,
    tx_hash: TxId,
) -> Result<(), TxError> {
    let fields = tx.order_fields().ok_or(TxError::StateConflict)?;
    let order = build_order_detail(&fields, tx_cord, tx.tx_uid)
        .map_err(|_| TxError::StateConflict)?;
    place_order(store, tx_hash, order)
}

fn build_order_detail(
    fields: &OrderFields,
    tx_cord: TxCord,
    user_regid: RegId,
) -> Result<OrderDetail, InvalidOrderReason> {
    match (fields.order_type, fields.order_side) {
        (OrderType::LimitPrice, OrderSide::Buy) => OrderDetail::user_buy_limit(
            fields.mode(),
            fields.dex_id(),
            fields.operator_fee_ratio(),
            fields.coin_symbol,
            fields.asset_symbol,
            fields.asset_amount,
            fields.price,
            tx_cord,
            user_regid,
        ),
        (OrderType::LimitPrice, OrderSide::Sell) => OrderDetail::user_sell_limit(
            fields.mode(),
            fields.dex_id(),
            fields.operator_fee_ratio(),
            fields.coin_symbol,
            fields.asset_symbol,
            fields.asset_amount,
            fields.price,
            tx_cord,
            user_regid,
        ),
        (OrderType::MarketPrice, OrderSide::Buy) => OrderDetail::user_buy_market(
            fields.mode(),
            fields.dex_id(),
            fields.operator_fee_ratio(),
            fields.coin_symbol,
            fields.asset_symbol,
            fields.coin_amount,
            tx_cord,
            user_regid,
        ),
        (OrderType::MarketPrice, OrderSide::Sell) => OrderDetail::user_sell_market(
            fields.mode(),
            fields.dex_id(),
            fields.operator_fee_ratio(),
            fields.coin_symbol,
            fields.asset_symbol,
            fields.asset_amount,
            tx_cord,
            user_regid,
        ),
    }
}

/// Cancel an open, user-generated order owned by `tx_uid`: refund the
/// unspent freeze and retire the order.
pub fn execute_cancel<S: DexStore>(
    store: &mut S,
    tx_uid: &RegId,
    order_id: &TxId,
) -> Result<(), TxError> {
    let active = store
        .active_order(order_id)
        .ok_or(TxError::StateConflict)?;
    let detail = store
        .order_detail(order_id)
        .ok_or(TxError::StateConflict)?;

    ensure!(
        detail.generate_type == OrderGenerateType::UserGen,
        TxError::StateConflict
    );
    ensure!(&detail.user_regid == tx_uid, TxError::StateConflict);

    let (refund_symbol, refund_amount) = match detail.order_side {
        OrderSide::Buy => (
            detail.coin_symbol,
            detail
                .coin_amount
                .checked_sub(active.total_deal_coin_amount)
                .ok_or(TxError::StateConflict)?,
        ),
        OrderSide::Sell => (
            detail.asset_symbol,
            detail
                .asset_amount
                .checked_sub(active.total_deal_asset_amount)
                .ok_or(TxError::StateConflict)?,
        ),
    };
    store.operate_balance(tx_uid, &refund_symbol, BalanceOp::Unfreeze, refund_amount)?;
    log::debug!(
        target: LOG_TARGET,
        "cancelled order {:?} for {}: refunded {} {}",
        order_id,
        tx_uid,
        refund_amount,
        refund_symbol,
    );
    store.erase_active_order(order_id);
    store.erase_order_detail(order_id);
    Ok(())
}
