//! The typed DEX transaction model.
//!
//! One struct per wire body, aggregated by [`DexTxKind`]; validation and
//! execution dispatch by pattern match. Basic forms carry no operator
//! block; extended forms add [`OperatorParams`] with the optional
//! co-signature slot.
//!
//! [`DexTx::signature_hash`] builds the exact per-variant preimage. The
//! byte layouts here are consensus-critical and frozen; see `wire` for the
//! full transaction encoding.

use crate::types::{OperatorMode, OrderSide, OrderType};
use dex_primitives::{
    codec::Encode, double_sha256, Amount, DexId, Price, RegId, TokenSymbol, TxId,
    DEX_RESERVED_ID,
};
#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};
use sp_std::vec::Vec;

/// Tx version carried by every basic DEX transaction.
pub const TX_VERSION: u32 = 1;

/// Tx version that selects the extended settle layout under the shared
/// settle type tag.
pub const SETTLE_EX_VERSION: u32 = 2;

/// The subsystem's slice of the chain-wide transaction-type enumeration.
/// The byte value is part of every signature hash.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxType {
    DexLimitBuyOrder = 84,
    DexLimitSellOrder = 85,
    DexMarketBuyOrder = 86,
    DexMarketSellOrder = 87,
    DexCancelOrder = 88,
    DexTradeSettle = 89,
    DexLimitBuyOrderEx = 90,
    DexLimitSellOrderEx = 91,
    DexMarketBuyOrderEx = 92,
    DexMarketSellOrderEx = 93,
}

impl TxType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            84 => Some(TxType::DexLimitBuyOrder),
            85 => Some(TxType::DexLimitSellOrder),
            86 => Some(TxType::DexMarketBuyOrder),
            87 => Some(TxType::DexMarketSellOrder),
            88 => Some(TxType::DexCancelOrder),
            89 => Some(TxType::DexTradeSettle),
            90 => Some(TxType::DexLimitBuyOrderEx),
            91 => Some(TxType::DexLimitSellOrderEx),
            92 => Some(TxType::DexMarketBuyOrderEx),
            93 => Some(TxType::DexMarketSellOrderEx),
            _ => None,
        }
    }
}

/// An account and its signature over the transaction's signature hash.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignaturePair {
    pub regid: RegId,
    pub signature: Vec<u8>,
}

impl SignaturePair {
    pub fn new(regid: RegId) -> Self {
        Self {
            regid,
            signature: Vec::new(),
        }
    }
}

/// The operator-facing fields of an extended order transaction.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperatorParams {
    pub mode: OperatorMode,
    pub dex_id: DexId,
    pub operator_fee_ratio: u64,
    pub memo: Vec<u8>,
    pub operator_signature: Option<SignaturePair>,
}

impl OperatorParams {
    pub fn new(
        mode: OperatorMode,
        dex_id: DexId,
        operator_fee_ratio: u64,
        memo: Vec<u8>,
        operator_regid: Option<RegId>,
    ) -> Self {
        Self {
            mode,
            dex_id,
            operator_fee_ratio,
            memo,
            operator_signature: operator_regid.map(SignaturePair::new),
        }
    }

    /// The co-signing operator account, when one was named.
    pub fn operator_regid(&self) -> Option<RegId> {
        self.operator_signature.as_ref().map(|pair| pair.regid)
    }
}

/// Body of a limit order, buy or sell.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LimitOrderBody {
    pub coin_symbol: TokenSymbol,
    pub asset_symbol: TokenSymbol,
    pub asset_amount: Amount,
    pub price: Price,
}

/// Body of a market buy: spends a coin budget.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarketBuyBody {
    pub coin_symbol: TokenSymbol,
    pub asset_symbol: TokenSymbol,
    pub coin_amount: Amount,
}

/// Body of a market sell: liquidates an asset amount.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarketSellBody {
    pub coin_symbol: TokenSymbol,
    pub asset_symbol: TokenSymbol,
    pub asset_amount: Amount,
}

/// Body of an order cancellation.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CancelBody {
    pub order_id: TxId,
}

/// One pre-matched fill inside a settle transaction.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DealItem {
    pub buy_order_id: TxId,
    pub sell_order_id: TxId,
    pub deal_price: Price,
    pub deal_coin_amount: Amount,
    pub deal_asset_amount: Amount,
}

/// Body of a settle transaction. The basic form fixes `dex_id` to the
/// reserved DEX and carries no memo.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettleBody {
    pub dex_id: DexId,
    pub deal_items: Vec<DealItem>,
    pub memo: Vec<u8>,
}

impl SettleBody {
    pub fn add_deal_item(&mut self, item: DealItem) {
        self.deal_items.push(item);
    }
}

/// The tagged transaction variant, replacing the deep class hierarchy of
/// older designs: shared behavior lives in free functions, dispatch is a
/// pattern match.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DexTxKind {
    BuyLimit(LimitOrderBody),
    SellLimit(LimitOrderBody),
    BuyMarket(MarketBuyBody),
    SellMarket(MarketSellBody),
    BuyLimitEx(LimitOrderBody, OperatorParams),
    SellLimitEx(LimitOrderBody, OperatorParams),
    BuyMarketEx(MarketBuyBody, OperatorParams),
    SellMarketEx(MarketSellBody, OperatorParams),
    Cancel(CancelBody),
    Settle(SettleBody),
    SettleEx(SettleBody),
}

/// A flattened view of an order-placing transaction's fields, with the
/// basic-form defaults filled in for the operator block.
pub struct OrderFields<'a> {
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub coin_symbol: TokenSymbol,
    pub asset_symbol: TokenSymbol,
    pub coin_amount: Amount,
    pub asset_amount: Amount,
    pub price: Price,
    pub operator: Option<&'a OperatorParams>,
}

impl OrderFields<'_> {
    pub fn mode(&self) -> OperatorMode {
        self.operator.map(|p| p.mode).unwrap_or_default()
    }

    pub fn dex_id(&self) -> DexId {
        self.operator.map(|p| p.dex_id).unwrap_or(DEX_RESERVED_ID)
    }

    pub fn operator_fee_ratio(&self) -> u64 {
        self.operator.map(|p| p.operator_fee_ratio).unwrap_or(0)
    }

    pub fn memo(&self) -> &[u8] {
        self.operator.map(|p| p.memo.as_slice()).unwrap_or(&[])
    }
}

/// A complete DEX transaction: the common envelope fields, the variant
/// body, and the user's signature over [`DexTx::signature_hash`].
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DexTx {
    pub version: u32,
    pub valid_height: u32,
    pub tx_uid: RegId,
    pub fee_symbol: TokenSymbol,
    pub fees: u64,
    pub kind: DexTxKind,
    pub signature: Vec<u8>,
}

impl DexTx {
    fn new(tx_uid: RegId, valid_height: u32, fee_symbol: TokenSymbol, fees: u64, kind: DexTxKind) -> Self {
        let version = match kind {
            DexTxKind::SettleEx(_) => SETTLE_EX_VERSION,
            _ => TX_VERSION,
        };
        Self {
            version,
            valid_height,
            tx_uid,
            fee_symbol,
            fees,
            kind,
            signature: Vec::new(),
        }
    }

    pub fn buy_limit(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: LimitOrderBody,
    ) -> Self {
        Self::new(tx_uid, valid_height, fee_symbol, fees, DexTxKind::BuyLimit(body))
    }

    pub fn sell_limit(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: LimitOrderBody,
    ) -> Self {
        Self::new(tx_uid, valid_height, fee_symbol, fees, DexTxKind::SellLimit(body))
    }

    pub fn buy_market(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: MarketBuyBody,
    ) -> Self {
        Self::new(tx_uid, valid_height, fee_symbol, fees, DexTxKind::BuyMarket(body))
    }

    pub fn sell_market(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: MarketSellBody,
    ) -> Self {
        Self::new(tx_uid, valid_height, fee_symbol, fees, DexTxKind::SellMarket(body))
    }

    pub fn buy_limit_ex(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: LimitOrderBody,
        params: OperatorParams,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::BuyLimitEx(body, params),
        )
    }

    pub fn sell_limit_ex(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: LimitOrderBody,
        params: OperatorParams,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::SellLimitEx(body, params),
        )
    }

    pub fn buy_market_ex(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: MarketBuyBody,
        params: OperatorParams,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::BuyMarketEx(body, params),
        )
    }

    pub fn sell_market_ex(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        body: MarketSellBody,
        params: OperatorParams,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::SellMarketEx(body, params),
        )
    }

    pub fn cancel(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        order_id: TxId,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::Cancel(CancelBody { order_id }),
        )
    }

    pub fn settle(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        deal_items: Vec<DealItem>,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::Settle(SettleBody {
                dex_id: DEX_RESERVED_ID,
                deal_items,
                memo: Vec::new(),
            }),
        )
    }

    pub fn settle_ex(
        tx_uid: RegId,
        valid_height: u32,
        fee_symbol: TokenSymbol,
        fees: u64,
        dex_id: DexId,
        deal_items: Vec<DealItem>,
        memo: Vec<u8>,
    ) -> Self {
        Self::new(
            tx_uid,
            valid_height,
            fee_symbol,
            fees,
            DexTxKind::SettleEx(SettleBody {
                dex_id,
                deal_items,
                memo,
            }),
        )
    }

    pub fn tx_type(&self) -> TxType {
        match &self.kind {
            DexTxKind::BuyLimit(_) => TxType::DexLimitBuyOrder,
            DexTxKind::SellLimit(_) => TxType::DexLimitSellOrder,
            DexTxKind::BuyMarket(_) => TxType::DexMarketBuyOrder,
            DexTxKind::SellMarket(_) => TxType::DexMarketSellOrder,
            DexTxKind::BuyLimitEx(..) => TxType::DexLimitBuyOrderEx,
            DexTxKind::SellLimitEx(..) => TxType::DexLimitSellOrderEx,
            DexTxKind::BuyMarketEx(..) => TxType::DexMarketBuyOrderEx,
            DexTxKind::SellMarketEx(..) => TxType::DexMarketSellOrderEx,
            DexTxKind::Cancel(_) => TxType::DexCancelOrder,
            DexTxKind::Settle(_) | DexTxKind::SettleEx(_) => TxType::DexTradeSettle,
        }
    }

    /// The operator block of an extended order transaction, if any.
    pub fn operator_params(&self) -> Option<&OperatorParams> {
        match &self.kind {
            DexTxKind::BuyLimitEx(_, params)
            | DexTxKind::SellLimitEx(_, params)
            | DexTxKind::BuyMarketEx(_, params)
            | DexTxKind::SellMarketEx(_, params) => Some(params),
            _ => None,
        }
    }

    /// The order-placing view of this transaction; `None` for cancel and
    /// settle.
    pub fn order_fields(&self) -> Option<OrderFields> {
        let fields = match &self.kind {
            DexTxKind::BuyLimit(body) => order_fields_limit(body, OrderSide::Buy, None),
            DexTxKind::SellLimit(body) => order_fields_limit(body, OrderSide::Sell, None),
            DexTxKind::BuyLimitEx(body, params) => {
                order_fields_limit(body, OrderSide::Buy, Some(params))
            }
            DexTxKind::SellLimitEx(body, params) => {
                order_fields_limit(body, OrderSide::Sell, Some(params))
            }
            DexTxKind::BuyMarket(body) => order_fields_market_buy(body, None),
            DexTxKind::BuyMarketEx(body, params) => order_fields_market_buy(body, Some(params)),
            DexTxKind::SellMarket(body) => order_fields_market_sell(body, None),
            DexTxKind::SellMarketEx(body, params) => order_fields_market_sell(body, Some(params)),
            DexTxKind::Cancel(_) | DexTxKind::Settle(_) | DexTxKind::SettleEx(_) => return None,
        };
        Some(fields)
    }

    /// The hash both signature slots commit to:
    /// `SHA256d(prefix || variant fields)` with the signatures themselves
    /// excluded and, on extended variants, the operator regid included so
    /// user and operator commit to the same fee policy.
    pub fn signature_hash(&self) -> TxId {
        let mut ss = Vec::new();
        self.version.encode_to(&mut ss);
        ss.push(self.tx_type() as u8);
        self.valid_height.encode_to(&mut ss);
        self.tx_uid.encode_to(&mut ss);
        self.fee_symbol.encode_to(&mut ss);
        self.fees.encode_to(&mut ss);
        match &self.kind {
            DexTxKind::BuyLimit(body) | DexTxKind::SellLimit(body) => {
                body.coin_symbol.encode_to(&mut ss);
                body.asset_symbol.encode_to(&mut ss);
                body.asset_amount.encode_to(&mut ss);
                body.price.encode_to(&mut ss);
            }
            DexTxKind::BuyMarket(body) => {
                body.coin_symbol.encode_to(&mut ss);
                body.asset_symbol.encode_to(&mut ss);
                body.coin_amount.encode_to(&mut ss);
            }
            DexTxKind::SellMarket(body) => {
                body.coin_symbol.encode_to(&mut ss);
                body.asset_symbol.encode_to(&mut ss);
                body.asset_amount.encode_to(&mut ss);
            }
            DexTxKind::BuyLimitEx(body, params) | DexTxKind::SellLimitEx(body, params) => {
                ss.push(params.mode as u8);
                params.dex_id.encode_to(&mut ss);
                params.operator_fee_ratio.encode_to(&mut ss);
                body.coin_symbol.encode_to(&mut ss);
                body.asset_symbol.encode_to(&mut ss);
                body.asset_amount.encode_to(&mut ss);
                body.price.encode_to(&mut ss);
                params.memo.encode_to(&mut ss);
                params.operator_regid().encode_to(&mut ss);
            }
            DexTxKind::BuyMarketEx(body, params) => {
                ss.push(params.mode as u8);
                params.dex_id.encode_to(&mut ss);
                params.operator_fee_ratio.encode_to(&mut ss);
                body.coin_symbol.encode_to(&mut ss);
                body.asset_symbol.encode_to(&mut ss);
                body.coin_amount.encode_to(&mut ss);
                params.memo.encode_to(&mut ss);
                params.operator_regid().encode_to(&mut ss);
            }
            DexTxKind::SellMarketEx(body, params) => {
                ss.push(params.mode as u8);
                params.dex_id.encode_to(&mut ss);
                params.operator_fee_ratio.encode_to(&mut ss);
                body.coin_symbol.encode_to(&mut ss);
                body.asset_symbol.encode_to(&mut ss);
                body.asset_amount.encode_to(&mut ss);
                params.memo.encode_to(&mut ss);
                params.operator_regid().encode_to(&mut ss);
            }
            DexTxKind::Cancel(body) => {
                body.order_id.encode_to(&mut ss);
            }
            // Both settle forms hash the deal items only. The extended
            // form's dex_id and memo travel on the wire outside the signed
            // preimage, so a matcher can alter them under an unchanged
            // signature; kept for wire compatibility and tracked as a
            // protocol-level fix.
            DexTxKind::Settle(body) | DexTxKind::SettleEx(body) => {
                body.deal_items.encode_to(&mut ss);
            }
        }
        double_sha256(&ss)
    }
}

fn order_fields_limit<'a>(
    body: &LimitOrderBody,
    order_side: OrderSide,
    operator: Option<&'a OperatorParams>,
) -> OrderFields<'a> {
    OrderFields {
        order_type: OrderType::LimitPrice,
        order_side,
        coin_symbol: body.coin_symbol,
        asset_symbol: body.asset_symbol,
        coin_amount: 0,
        asset_amount: body.asset_amount,
        price: body.price,
        operator,
    }
}

fn order_fields_market_buy<'a>(
    body: &MarketBuyBody,
    operator: Option<&'a OperatorParams>,
) -> OrderFields<'a> {
    OrderFields {
        order_type: OrderType::MarketPrice,
        order_side: OrderSide::Buy,
        coin_symbol: body.coin_symbol,
        asset_symbol: body.asset_symbol,
        coin_amount: body.coin_amount,
        asset_amount: 0,
        price: 0,
        operator,
    }
}

fn order_fields_market_sell<'a>(
    body: &MarketSellBody,
    operator: Option<&'a OperatorParams>,
) -> OrderFields<'a> {
    OrderFields {
        order_type: OrderType::MarketPrice,
        order_side: OrderSide::Sell,
        coin_symbol: body.coin_symbol,
        asset_symbol: body.asset_symbol,
        coin_amount: 0,
        asset_amount: body.asset_amount,
        price: 0,
        operator,
    }
}
