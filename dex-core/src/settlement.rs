//! The settlement engine: applies a matcher's pre-computed deal list
//! against pairs of open orders.
//!
//! Settlement is all-or-nothing. The executive runs it inside a write
//! batch, so the first failing deal item rejects the entire transaction
//! with no partial effects.

use crate::executive::DexError;
use crate::store::{operator_record, BalanceOp, DexStore, TxError};
use crate::tx::{DealItem, SettleBody};
use crate::types::{calc_coin_amount, ActiveOrder, DexOperator, OperatorMode, OrderDetail, OrderSide, OrderType};
use crate::{ensure, ChainParams, LOG_TARGET};
use dex_primitives::{Amount, RegId, TxId, RATIO_BOOST};

/// Why a settle transaction was rejected. Indexed variants carry the
/// position of the offending deal item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleError {
    /// An order referenced by the deal item is not open.
    OrderNotFound(u32),
    /// The two orders and the settle transaction do not agree on the DEX.
    DexMismatch(u32),
    /// The buy-slot order is not a buy, or the sell-slot order not a sell.
    BadSide(u32),
    /// The two orders trade different pairs.
    SymbolMismatch(u32),
    /// The deal price falls outside what the two orders permit.
    PriceInfeasible(u32),
    /// `deal_coin_amount` does not equal the scaled deal value.
    FillIncoherent(u32),
    /// The deal would exceed an order's remaining capacity.
    OverFill(u32),
    /// Two market orders cannot price each other.
    BothMarket(u32),
    /// The sender is not the matcher of the addressed DEX.
    UnauthorizedMatcher,
    /// A settle transaction with no deal items.
    EmptyDealSet,
}

/// Apply a settle transaction body submitted by `tx_uid`.
pub fn execute_settle<S: DexStore>(
    store: &mut S,
    params: &ChainParams,
    tx_uid: &RegId,
    body: &SettleBody,
) -> Result<(), DexError> {
    ensure!(!body.deal_items.is_empty(), SettleError::EmptyDealSet);

    let operator = operator_record(store, params, body.dex_id)
        .ok_or(SettleError::UnauthorizedMatcher)?;
    ensure!(
        tx_uid == &operator.match_regid,
        SettleError::UnauthorizedMatcher
    );

    for (i, item) in body.deal_items.iter().enumerate() {
        settle_deal_item(store, params, body, &operator, i as u32, item)?;
    }
    Ok(())
}

fn settle_deal_item<S: DexStore>(
    store: &mut S,
    params: &ChainParams,
    body: &SettleBody,
    operator: &DexOperator,
    i: u32,
    item: &DealItem,
) -> Result<(), DexError> {
    let (mut buy_active, buy) = load_deal_order(store, &item.buy_order_id, i)?;
    let (mut sell_active, sell) = load_deal_order(store, &item.sell_order_id, i)?;

    ensure!(
        buy.dex_id == body.dex_id && sell.dex_id == body.dex_id,
        SettleError::DexMismatch(i)
    );
    ensure!(
        buy.order_side == OrderSide::Buy && sell.order_side == OrderSide::Sell,
        SettleError::BadSide(i)
    );
    ensure!(
        buy.coin_symbol == sell.coin_symbol && buy.asset_symbol == sell.asset_symbol,
        SettleError::SymbolMismatch(i)
    );

    check_deal_price(&buy, &sell, item, i)?;

    ensure!(item.deal_asset_amount > 0, SettleError::FillIncoherent(i));
    let expected_coin = calc_coin_amount(item.deal_asset_amount, item.deal_price)
        .ok_or(SettleError::FillIncoherent(i))?;
    ensure!(
        item.deal_coin_amount == expected_coin,
        SettleError::FillIncoherent(i)
    );

    // Remaining-capacity checks, on the totals as they will be after this
    // deal.
    let new_buy_coin = buy_active
        .total_deal_coin_amount
        .checked_add(item.deal_coin_amount)
        .ok_or(SettleError::OverFill(i))?;
    let new_buy_asset = buy_active
        .total_deal_asset_amount
        .checked_add(item.deal_asset_amount)
        .ok_or(SettleError::OverFill(i))?;
    let new_sell_coin = sell_active
        .total_deal_coin_amount
        .checked_add(item.deal_coin_amount)
        .ok_or(SettleError::OverFill(i))?;
    let new_sell_asset = sell_active
        .total_deal_asset_amount
        .checked_add(item.deal_asset_amount)
        .ok_or(SettleError::OverFill(i))?;

    match buy.order_type {
        OrderType::LimitPrice => {
            ensure!(
                new_buy_asset <= buy.asset_amount && new_buy_coin <= buy.coin_amount,
                SettleError::OverFill(i)
            );
        }
        OrderType::MarketPrice => {
            ensure!(new_buy_coin <= buy.coin_amount, SettleError::OverFill(i));
        }
    }
    ensure!(new_sell_asset <= sell.asset_amount, SettleError::OverFill(i));

    // The later order pays the taker fee; on a tie the buy side does.
    let taker_side = if sell.tx_cord > buy.tx_cord {
        OrderSide::Sell
    } else {
        OrderSide::Buy
    };

    let buyer_ratio = settle_fee_ratio(&buy, operator, taker_side);
    let seller_ratio = settle_fee_ratio(&sell, operator, taker_side);
    let buyer_fee =
        calc_order_fee(item.deal_asset_amount, buyer_ratio).ok_or(TxError::StateConflict)?;
    let seller_fee =
        calc_order_fee(item.deal_coin_amount, seller_ratio).ok_or(TxError::StateConflict)?;
    let buyer_receives = item
        .deal_asset_amount
        .checked_sub(buyer_fee)
        .ok_or(TxError::StateConflict)?;
    let seller_receives = item
        .deal_coin_amount
        .checked_sub(seller_fee)
        .ok_or(TxError::StateConflict)?;

    // Fees on the reserved DEX accrue to the risk reserve; elsewhere to the
    // operator's owner.
    let fee_account = if body.dex_id == dex_primitives::DEX_RESERVED_ID {
        params.risk_reserve_regid
    } else {
        operator.owner_regid
    };

    store.operate_balance(
        &buy.user_regid,
        &buy.coin_symbol,
        BalanceOp::SubFrozen,
        item.deal_coin_amount,
    )?;
    store.operate_balance(
        &buy.user_regid,
        &buy.asset_symbol,
        BalanceOp::AddFree,
        buyer_receives,
    )?;
    store.operate_balance(
        &sell.user_regid,
        &sell.asset_symbol,
        BalanceOp::SubFrozen,
        item.deal_asset_amount,
    )?;
    store.operate_balance(
        &sell.user_regid,
        &sell.coin_symbol,
        BalanceOp::AddFree,
        seller_receives,
    )?;
    store.operate_balance(&fee_account, &buy.asset_symbol, BalanceOp::AddFree, buyer_fee)?;
    store.operate_balance(&fee_account, &buy.coin_symbol, BalanceOp::AddFree, seller_fee)?;

    log::debug!(
        target: LOG_TARGET,
        "deal {}: {} asset for {} coin at {} ({} taker), fees {}/{}",
        i,
        item.deal_asset_amount,
        item.deal_coin_amount,
        item.deal_price,
        taker_side.as_str(),
        buyer_fee,
        seller_fee,
    );

    buy_active.total_deal_coin_amount = new_buy_coin;
    buy_active.total_deal_asset_amount = new_buy_asset;
    sell_active.total_deal_coin_amount = new_sell_coin;
    sell_active.total_deal_asset_amount = new_sell_asset;

    let buy_done = match buy.order_type {
        OrderType::LimitPrice => buy_active.total_deal_asset_amount == buy.asset_amount,
        OrderType::MarketPrice => {
            // A market buy retires once its coin is spent, or once the
            // leftover cannot purchase one whole asset unit at the latest
            // deal price.
            let residual = buy
                .coin_amount
                .checked_sub(buy_active.total_deal_coin_amount)
                .ok_or(TxError::StateConflict)?;
            residual == 0 || residual < item.deal_price
        }
    };
    finish_order_side(store, &item.buy_order_id, &buy, &buy_active, buy_done)?;

    let sell_done = sell_active.total_deal_asset_amount == sell.asset_amount;
    finish_order_side(store, &item.sell_order_id, &sell, &sell_active, sell_done)?;

    Ok(())
}

/// Persist the side's updated progress, or retire it and refund whatever is
/// left of its freeze.
fn finish_order_side<S: DexStore>(
    store: &mut S,
    order_id: &TxId,
    order: &OrderDetail,
    active: &ActiveOrder,
    done: bool,
) -> Result<(), TxError> {
    if !done {
        store.set_active_order(order_id, active.clone());
        return Ok(());
    }
    let (symbol, residual) = match order.order_side {
        OrderSide::Buy => (
            order.coin_symbol,
            order
                .coin_amount
                .checked_sub(active.total_deal_coin_amount)
                .ok_or(TxError::StateConflict)?,
        ),
        OrderSide::Sell => (
            order.asset_symbol,
            order
                .asset_amount
                .checked_sub(active.total_deal_asset_amount)
                .ok_or(TxError::StateConflict)?,
        ),
    };
    if residual > 0 {
        store.operate_balance(&order.user_regid, &symbol, BalanceOp::Unfreeze, residual)?;
    }
    log::debug!(
        target: LOG_TARGET,
        "retiring order {:?}, refunded {} {}",
        order_id,
        residual,
        symbol,
    );
    store.erase_active_order(order_id);
    store.erase_order_detail(order_id);
    Ok(())
}

fn load_deal_order<S: DexStore>(
    store: &S,
    order_id: &TxId,
    i: u32,
) -> Result<(ActiveOrder, OrderDetail), SettleError> {
    let active = store
        .active_order(order_id)
        .ok_or(SettleError::OrderNotFound(i))?;
    let mut detail = store
        .order_detail(order_id)
        .ok_or(SettleError::OrderNotFound(i))?;
    // The stored detail keeps its placement-time totals; the live progress
    // is the active order's.
    detail.total_deal_coin_amount = active.total_deal_coin_amount;
    detail.total_deal_asset_amount = active.total_deal_asset_amount;
    Ok((active, detail))
}

fn check_deal_price(
    buy: &OrderDetail,
    sell: &OrderDetail,
    item: &DealItem,
    i: u32,
) -> Result<(), SettleError> {
    match (buy.order_type, sell.order_type) {
        (OrderType::LimitPrice, OrderType::LimitPrice) => {
            ensure!(
                sell.price <= item.deal_price && item.deal_price <= buy.price,
                SettleError::PriceInfeasible(i)
            );
        }
        (OrderType::LimitPrice, OrderType::MarketPrice) => {
            ensure!(item.deal_price == buy.price, SettleError::PriceInfeasible(i));
        }
        (OrderType::MarketPrice, OrderType::LimitPrice) => {
            ensure!(
                item.deal_price == sell.price,
                SettleError::PriceInfeasible(i)
            );
        }
        (OrderType::MarketPrice, OrderType::MarketPrice) => {
            return Err(SettleError::BothMarket(i));
        }
    }
    Ok(())
}

/// The fee ratio a side pays: its own ratio in `RequireAuth` mode,
/// otherwise the operator's taker or maker ratio by role.
fn settle_fee_ratio(order: &OrderDetail, operator: &DexOperator, taker_side: OrderSide) -> u64 {
    if order.mode == OperatorMode::RequireAuth {
        order.operator_fee_ratio
    } else if order.order_side == taker_side {
        operator.taker_fee_ratio
    } else {
        operator.maker_fee_ratio
    }
}

/// `⌊amount · ratio / RATIO_BOOST⌋`, `None` if it cannot fit.
fn calc_order_fee(amount: Amount, ratio: u64) -> Option<Amount> {
    Amount::try_from(u128::from(amount) * u128::from(ratio) / u128::from(RATIO_BOOST)).ok()
}
