//! Static validation of DEX transactions, run after signature verification
//! and before execution.
//!
//! Every failure maps to one [`InvalidOrderReason`] so relay policy and
//! operators can tell exactly which rule a rejected transaction broke.

use crate::executive::DexError;
use crate::settlement::SettleError;
use crate::store::{operator_record, AssetRegistry, DexStore};
use crate::tx::{DexTx, DexTxKind, OrderFields};
use crate::types::{calc_coin_amount, OperatorMode, OrderSide, OrderType};
use crate::verifier::verify_signature;
use crate::{ensure, ChainParams, OperatorSignerPolicy, MAX_ORDER_MEMO_LEN};
use dex_primitives::{Amount, TokenSymbol, DEX_RESERVED_ID};

/// Why an order-placing transaction was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidOrderReason {
    /// A symbol is not whitelisted, or not permitted on that side of a pair.
    UnknownSymbol,
    /// Coin and asset symbol are the same.
    SameSymbol,
    /// An amount is zero, beyond the per-symbol maximum, or does not fit.
    AmountOutOfRange,
    /// A limit price is outside the pair's configured bounds.
    PriceOutOfRange,
    /// The named DEX operator is not registered.
    UnknownDexOperator,
    /// The operator fee ratio exceeds the configured cap.
    FeeRatioOutOfRange,
    /// `RequireAuth` mode without an operator signature pair.
    MissingOperatorAuth,
    /// The operator signature is by the wrong account or does not verify.
    BadOperatorSignature,
    /// `Default` mode with a non-zero operator fee ratio.
    ModeFeeMismatch,
    /// The memo exceeds the allowed length.
    MemoTooLong,
}

/// Run the static checks appropriate to the transaction's kind.
pub fn check_transaction<S: DexStore + AssetRegistry>(
    store: &S,
    params: &ChainParams,
    tx: &DexTx,
) -> Result<(), DexError> {
    if let Some(fields) = tx.order_fields() {
        check_order(store, params, tx, &fields)?;
        return Ok(());
    }
    match &tx.kind {
        DexTxKind::Cancel(_) => Ok(()),
        DexTxKind::Settle(body) | DexTxKind::SettleEx(body) => {
            ensure!(!body.deal_items.is_empty(), SettleError::EmptyDealSet);
            Ok(())
        }
        // Order kinds were handled through `order_fields` above.
        _ => Ok(()),
    }
}

/// The order gauntlet: symbol, amount, price, operator, fee, and
/// authorization rules, in that order.
fn check_order<S: DexStore + AssetRegistry>(
    store: &S,
    params: &ChainParams,
    tx: &DexTx,
    fields: &OrderFields,
) -> Result<(), InvalidOrderReason> {
    check_order_symbols(store, &fields.coin_symbol, &fields.asset_symbol)?;

    match (fields.order_type, fields.order_side) {
        (OrderType::LimitPrice, OrderSide::Buy) => {
            check_amount_range(store, &fields.asset_symbol, fields.asset_amount)?;
            check_price_range(store, fields)?;
            // The coin-side freeze must exist and respect the coin limits.
            let coin_amount = calc_coin_amount(fields.asset_amount, fields.price)
                .ok_or(InvalidOrderReason::AmountOutOfRange)?;
            check_amount_range(store, &fields.coin_symbol, coin_amount)?;
        }
        (OrderType::LimitPrice, OrderSide::Sell) => {
            check_amount_range(store, &fields.asset_symbol, fields.asset_amount)?;
            check_price_range(store, fields)?;
        }
        (OrderType::MarketPrice, OrderSide::Buy) => {
            check_amount_range(store, &fields.coin_symbol, fields.coin_amount)?;
        }
        (OrderType::MarketPrice, OrderSide::Sell) => {
            check_amount_range(store, &fields.asset_symbol, fields.asset_amount)?;
        }
    }

    let mode = fields.mode();
    let dex_id = fields.dex_id();

    let operator = if dex_id != DEX_RESERVED_ID || mode == OperatorMode::RequireAuth {
        Some(operator_record(store, params, dex_id).ok_or(InvalidOrderReason::UnknownDexOperator)?)
    } else {
        None
    };

    match mode {
        OperatorMode::Default => {
            ensure!(
                fields.operator_fee_ratio() == 0,
                InvalidOrderReason::ModeFeeMismatch
            );
        }
        OperatorMode::RequireAuth => {
            let operator = operator
                .as_ref()
                .expect("operator presence was just checked for RequireAuth; qed");

            // The order's own ratio may not exceed what the operator
            // charges in total, and never the chain-wide cap.
            let ceiling = operator
                .maker_fee_ratio
                .saturating_add(operator.taker_fee_ratio)
                .min(params.operator_fee_ratio_cap);
            ensure!(
                fields.operator_fee_ratio() <= ceiling,
                InvalidOrderReason::FeeRatioOutOfRange
            );

            let pair = fields
                .operator
                .and_then(|p| p.operator_signature.as_ref())
                .ok_or(InvalidOrderReason::MissingOperatorAuth)?;
            let allowed = match params.operator_signers {
                OperatorSignerPolicy::OwnerOnly => pair.regid == operator.owner_regid,
                OperatorSignerPolicy::OwnerOrMatcher => {
                    pair.regid == operator.owner_regid || pair.regid == operator.match_regid
                }
            };
            ensure!(allowed, InvalidOrderReason::BadOperatorSignature);
            let pubkey = store
                .account_pubkey(&pair.regid)
                .ok_or(InvalidOrderReason::BadOperatorSignature)?;
            ensure!(
                verify_signature(&tx.signature_hash(), &pair.signature, &pubkey),
                InvalidOrderReason::BadOperatorSignature
            );
        }
    }

    ensure!(
        fields.memo().len() <= MAX_ORDER_MEMO_LEN,
        InvalidOrderReason::MemoTooLong
    );

    Ok(())
}

fn check_order_symbols<S: AssetRegistry>(
    store: &S,
    coin_symbol: &TokenSymbol,
    asset_symbol: &TokenSymbol,
) -> Result<(), InvalidOrderReason> {
    ensure!(
        coin_symbol.is_well_formed() && store.is_registered(coin_symbol) && store.can_be_coin(coin_symbol),
        InvalidOrderReason::UnknownSymbol
    );
    ensure!(
        asset_symbol.is_well_formed()
            && store.is_registered(asset_symbol)
            && store.can_be_asset(asset_symbol),
        InvalidOrderReason::UnknownSymbol
    );
    ensure!(coin_symbol != asset_symbol, InvalidOrderReason::SameSymbol);
    Ok(())
}

fn check_amount_range<S: AssetRegistry>(
    store: &S,
    symbol: &TokenSymbol,
    amount: Amount,
) -> Result<(), InvalidOrderReason> {
    ensure!(
        amount > 0 && amount <= store.max_order_amount(symbol),
        InvalidOrderReason::AmountOutOfRange
    );
    Ok(())
}

fn check_price_range<S: AssetRegistry>(
    store: &S,
    fields: &OrderFields,
) -> Result<(), InvalidOrderReason> {
    let (min, max) = store.price_range(&fields.coin_symbol, &fields.asset_symbol);
    ensure!(
        fields.price >= min && fields.price <= max,
        InvalidOrderReason::PriceOutOfRange
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssetEntry, MemStore};
    use crate::tx::{LimitOrderBody, MarketBuyBody, OperatorParams};
    use crate::types::DexOperator;
    use dex_primitives::{RegId, PRICE_BOOST};
    use sp_core::{crypto::Pair as _, ecdsa::Pair};

    fn wusd() -> TokenSymbol {
        TokenSymbol::new("WUSD").unwrap()
    }

    fn wicc() -> TokenSymbol {
        TokenSymbol::new("WICC").unwrap()
    }

    fn test_store() -> MemStore {
        let mut store = MemStore::new();
        store.assets.register(
            wusd(),
            AssetEntry {
                can_be_coin: true,
                can_be_asset: false,
                max_order_amount: 1_000_000 * PRICE_BOOST,
            },
        );
        store.assets.register(
            wicc(),
            AssetEntry {
                can_be_coin: false,
                can_be_asset: true,
                max_order_amount: 1_000_000 * PRICE_BOOST,
            },
        );
        store
            .assets
            .set_price_range(wusd(), wicc(), 1, 100 * PRICE_BOOST);
        store.register_operator(
            1,
            DexOperator {
                owner_regid: RegId::new(9, 0),
                match_regid: RegId::new(9, 1),
                name: b"op".to_vec(),
                portal_url: Vec::new(),
                maker_fee_ratio: 40_000,
                taker_fee_ratio: 80_000,
                memo: Vec::new(),
            },
        );
        store
    }

    fn buy_limit(asset_amount: u64, price: u64) -> DexTx {
        DexTx::buy_limit(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            LimitOrderBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                asset_amount,
                price,
            },
        )
    }

    fn check(store: &MemStore, tx: &DexTx) -> Result<(), DexError> {
        check_transaction(store, &ChainParams::default(), tx)
    }

    #[test]
    fn a_plain_limit_buy_passes() {
        let store = test_store();
        assert_eq!(check(&store, &buy_limit(5 * PRICE_BOOST, 10 * PRICE_BOOST)), Ok(()));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let store = test_store();
        assert_eq!(
            check(&store, &buy_limit(0, 10 * PRICE_BOOST)),
            Err(DexError::Invalid(InvalidOrderReason::AmountOutOfRange))
        );
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let store = test_store();
        assert_eq!(check(&store, &buy_limit(5, 100 * PRICE_BOOST)), Ok(()));
        assert_eq!(
            check(&store, &buy_limit(5, 100 * PRICE_BOOST + 1)),
            Err(DexError::Invalid(InvalidOrderReason::PriceOutOfRange))
        );
        assert_eq!(
            check(&store, &buy_limit(5, 0)),
            Err(DexError::Invalid(InvalidOrderReason::PriceOutOfRange))
        );
    }

    #[test]
    fn unknown_and_misplaced_symbols_are_rejected() {
        let store = test_store();
        let mut tx = buy_limit(5, PRICE_BOOST);
        if let DexTxKind::BuyLimit(body) = &mut tx.kind {
            body.coin_symbol = TokenSymbol::new("NOPE").unwrap();
        }
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::UnknownSymbol))
        );

        // WICC is asset-side only; using it as the coin must fail the same way.
        let mut tx = buy_limit(5, PRICE_BOOST);
        if let DexTxKind::BuyLimit(body) = &mut tx.kind {
            body.coin_symbol = wicc();
        }
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::UnknownSymbol))
        );
    }

    #[test]
    fn same_symbol_pairs_are_rejected() {
        let mut store = test_store();
        // Make WUSD valid on both sides so the pair check itself trips.
        store.assets.register(
            wusd(),
            AssetEntry {
                can_be_coin: true,
                can_be_asset: true,
                max_order_amount: 1_000_000,
            },
        );
        let mut tx = buy_limit(5, PRICE_BOOST);
        if let DexTxKind::BuyLimit(body) = &mut tx.kind {
            body.asset_symbol = wusd();
        }
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::SameSymbol))
        );
    }

    #[test]
    fn default_mode_with_fee_ratio_is_mode_fee_mismatch() {
        let store = test_store();
        let tx = DexTx::buy_limit_ex(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            LimitOrderBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                asset_amount: 5,
                price: PRICE_BOOST,
            },
            OperatorParams::new(OperatorMode::Default, 1, 7, Vec::new(), None),
        );
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::ModeFeeMismatch))
        );
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let store = test_store();
        let tx = DexTx::buy_limit_ex(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            LimitOrderBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                asset_amount: 5,
                price: PRICE_BOOST,
            },
            OperatorParams::new(OperatorMode::Default, 42, 0, Vec::new(), None),
        );
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::UnknownDexOperator))
        );
    }

    #[test]
    fn require_auth_needs_the_operator_signature() {
        let store = test_store();
        let tx = DexTx::buy_limit_ex(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            LimitOrderBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                asset_amount: 5,
                price: PRICE_BOOST,
            },
            OperatorParams::new(OperatorMode::RequireAuth, 1, 40_000, Vec::new(), None),
        );
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::MissingOperatorAuth))
        );
    }

    #[test]
    fn fee_ratio_ceiling_is_the_operator_sum_clamped_by_the_cap() {
        let mut store = test_store();
        let owner = RegId::new(9, 0);
        let owner_pair = Pair::from_seed(&[3u8; 32]);
        store.register_account(owner, owner_pair.public());

        let auth_buy_limit = |dex_id: u32, ratio: u64| {
            DexTx::buy_limit_ex(
                RegId::new(2, 3),
                100,
                wicc(),
                10_000,
                LimitOrderBody {
                    coin_symbol: wusd(),
                    asset_symbol: wicc(),
                    asset_amount: 5,
                    price: PRICE_BOOST,
                },
                OperatorParams::new(
                    OperatorMode::RequireAuth,
                    dex_id,
                    ratio,
                    Vec::new(),
                    Some(owner),
                ),
            )
        };

        // Operator 1 charges 40_000 + 80_000; one above the sum is refused.
        assert_eq!(
            check(&store, &auth_buy_limit(1, 120_001)),
            Err(DexError::Invalid(InvalidOrderReason::FeeRatioOutOfRange))
        );

        // Exactly the sum passes once properly co-signed.
        let mut tx = auth_buy_limit(1, 120_000);
        let hash = tx.signature_hash();
        if let DexTxKind::BuyLimitEx(_, params) = &mut tx.kind {
            params.operator_signature.as_mut().unwrap().signature =
                AsRef::<[u8]>::as_ref(&owner_pair.sign_prehashed(hash.as_fixed_bytes())).to_vec();
        }
        assert_eq!(check(&store, &tx), Ok(()));

        // A greedy operator's sum is still clamped by the chain-wide cap.
        let cap = ChainParams::default().operator_fee_ratio_cap;
        store.register_operator(
            5,
            DexOperator {
                owner_regid: owner,
                match_regid: RegId::new(9, 1),
                name: b"greedy".to_vec(),
                portal_url: Vec::new(),
                maker_fee_ratio: cap,
                taker_fee_ratio: cap,
                memo: Vec::new(),
            },
        );
        assert_eq!(
            check(&store, &auth_buy_limit(5, cap + 1)),
            Err(DexError::Invalid(InvalidOrderReason::FeeRatioOutOfRange))
        );
    }

    #[test]
    fn operator_signature_is_actually_verified() {
        let mut store = test_store();
        let owner = RegId::new(9, 0);
        let owner_pair = Pair::from_seed(&[3u8; 32]);
        store.register_account(owner, owner_pair.public());

        let mut tx = DexTx::buy_limit_ex(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            LimitOrderBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                asset_amount: 5,
                price: PRICE_BOOST,
            },
            OperatorParams::new(
                OperatorMode::RequireAuth,
                1,
                40_000,
                Vec::new(),
                Some(owner),
            ),
        );

        // Unsigned slot: rejected.
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::BadOperatorSignature))
        );

        // Properly co-signed: accepted.
        let hash = tx.signature_hash();
        if let DexTxKind::BuyLimitEx(_, params) = &mut tx.kind {
            params.operator_signature.as_mut().unwrap().signature =
                AsRef::<[u8]>::as_ref(&owner_pair.sign_prehashed(hash.as_fixed_bytes())).to_vec();
        }
        assert_eq!(check(&store, &tx), Ok(()));

        // A stranger regid is refused even with a valid signature by it.
        let stranger = RegId::new(30, 0);
        let stranger_pair = Pair::from_seed(&[4u8; 32]);
        store.register_account(stranger, stranger_pair.public());
        if let DexTxKind::BuyLimitEx(_, params) = &mut tx.kind {
            params.operator_signature.as_mut().unwrap().regid = stranger;
        }
        let hash = tx.signature_hash();
        if let DexTxKind::BuyLimitEx(_, params) = &mut tx.kind {
            params.operator_signature.as_mut().unwrap().signature =
                AsRef::<[u8]>::as_ref(&stranger_pair.sign_prehashed(hash.as_fixed_bytes()))
                    .to_vec();
        }
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::BadOperatorSignature))
        );
    }

    #[test]
    fn oversize_memos_are_rejected() {
        let store = test_store();
        let tx = DexTx::buy_market_ex(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            MarketBuyBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                coin_amount: 50,
            },
            OperatorParams::new(
                OperatorMode::Default,
                1,
                0,
                vec![b'x'; MAX_ORDER_MEMO_LEN + 1],
                None,
            ),
        );
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Invalid(InvalidOrderReason::MemoTooLong))
        );
    }

    #[test]
    fn settle_with_no_deals_is_rejected() {
        let store = test_store();
        let tx = DexTx::settle(RegId::new(0, 1), 100, wicc(), 10_000, Vec::new());
        assert_eq!(
            check(&store, &tx),
            Err(DexError::Settle(SettleError::EmptyDealSet))
        );
    }
}
