//! The entity layer of the DEX: orders, active-order index entries, and
//! operator records. Pure values; nothing here touches state.

use crate::validation::InvalidOrderReason;
use dex_primitives::{Amount, DexId, Price, RegId, TokenSymbol, TxCord, PRICE_BOOST};
#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};
use sp_std::fmt;
use sp_std::vec::Vec;

/// Which side of the book an order sits on.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy = 1,
    Sell = 2,
}

impl Default for OrderSide {
    fn default() -> Self {
        OrderSide::Buy
    }
}

impl OrderSide {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(OrderSide::Buy),
            2 => Some(OrderSide::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "BUY" => Some(OrderSide::Buy),
            "SELL" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limit orders carry a price; market orders trade at whatever the matcher
/// found on the opposite side.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderType {
    LimitPrice = 1,
    MarketPrice = 2,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::LimitPrice
    }
}

impl OrderType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(OrderType::LimitPrice),
            2 => Some(OrderType::MarketPrice),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::LimitPrice => "LIMIT_PRICE",
            OrderType::MarketPrice => "MARKET_PRICE",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "LIMIT_PRICE" => Some(OrderType::LimitPrice),
            "MARKET_PRICE" => Some(OrderType::MarketPrice),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order came to exist. `Empty` doubles as the emptiness sentinel of
/// [`OrderDetail`] and [`ActiveOrder`].
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderGenerateType {
    Empty = 0,
    UserGen = 1,
    SystemGen = 2,
}

impl Default for OrderGenerateType {
    fn default() -> Self {
        OrderGenerateType::Empty
    }
}

impl OrderGenerateType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(OrderGenerateType::Empty),
            1 => Some(OrderGenerateType::UserGen),
            2 => Some(OrderGenerateType::SystemGen),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderGenerateType::Empty => "EMPTY_ORDER",
            OrderGenerateType::UserGen => "USER_GEN_ORDER",
            OrderGenerateType::SystemGen => "SYSTEM_GEN_ORDER",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "EMPTY_ORDER" => Some(OrderGenerateType::Empty),
            "USER_GEN_ORDER" => Some(OrderGenerateType::UserGen),
            "SYSTEM_GEN_ORDER" => Some(OrderGenerateType::SystemGen),
            _ => None,
        }
    }
}

impl fmt::Display for OrderGenerateType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-order choice between the simple fee model and the authenticated one.
///
/// `Default` forbids an operator fee ratio; `RequireAuth` requires an
/// operator co-signature and permits a non-zero ratio up to the configured
/// cap.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorMode {
    Default = 0,
    RequireAuth = 1,
}

impl Default for OperatorMode {
    fn default() -> Self {
        OperatorMode::Default
    }
}

impl OperatorMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(OperatorMode::Default),
            1 => Some(OperatorMode::RequireAuth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorMode::Default => "DEFAULT",
            OperatorMode::RequireAuth => "REQUIRE_AUTH",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "DEFAULT" => Some(OperatorMode::Default),
            "REQUIRE_AUTH" => Some(OperatorMode::RequireAuth),
            _ => None,
        }
    }
}

impl fmt::Display for OperatorMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coin cost of `asset_amount` at `price`, rounded up:
/// `⌈asset_amount · price / PRICE_BOOST⌉`.
///
/// `None` when the result does not fit an [`Amount`].
pub fn calc_coin_amount(asset_amount: Amount, price: Price) -> Option<Amount> {
    let product = u128::from(asset_amount).checked_mul(u128::from(price))?;
    let boosted = (product + u128::from(PRICE_BOOST) - 1) / u128::from(PRICE_BOOST);
    Amount::try_from(boosted).ok()
}

/// The full record of an accepted order, owned by the transaction that
/// placed it.
///
/// For a limit buy, `coin_amount` is the coin freeze derived at placement
/// time; for a market buy it is the coin budget. Deal totals start at zero
/// and stay zero in the stored record: live progress is tracked by
/// [`ActiveOrder`] and overlaid when the order is loaded for settlement.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderDetail {
    pub mode: OperatorMode,
    pub dex_id: DexId,
    pub operator_fee_ratio: u64,
    pub generate_type: OrderGenerateType,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub coin_symbol: TokenSymbol,
    pub asset_symbol: TokenSymbol,
    pub coin_amount: Amount,
    pub asset_amount: Amount,
    pub price: Price,
    pub tx_cord: TxCord,
    pub user_regid: RegId,
    pub total_deal_coin_amount: Amount,
    pub total_deal_asset_amount: Amount,
}

impl OrderDetail {
    /// A user limit buy: freezes the derived coin cost of `asset_amount` at
    /// `price`.
    pub fn user_buy_limit(
        mode: OperatorMode,
        dex_id: DexId,
        operator_fee_ratio: u64,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        asset_amount: Amount,
        price: Price,
        tx_cord: TxCord,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        if asset_amount == 0 {
            return Err(InvalidOrderReason::AmountOutOfRange);
        }
        if price == 0 {
            return Err(InvalidOrderReason::PriceOutOfRange);
        }
        let coin_amount =
            calc_coin_amount(asset_amount, price).ok_or(InvalidOrderReason::AmountOutOfRange)?;
        let mut order = Self::base(
            mode,
            dex_id,
            operator_fee_ratio,
            OrderGenerateType::UserGen,
            OrderType::LimitPrice,
            OrderSide::Buy,
            coin_symbol,
            asset_symbol,
            tx_cord,
            user_regid,
        )?;
        order.coin_amount = coin_amount;
        order.asset_amount = asset_amount;
        order.price = price;
        Ok(order)
    }

    /// A user limit sell of `asset_amount` at `price`.
    pub fn user_sell_limit(
        mode: OperatorMode,
        dex_id: DexId,
        operator_fee_ratio: u64,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        asset_amount: Amount,
        price: Price,
        tx_cord: TxCord,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        if asset_amount == 0 {
            return Err(InvalidOrderReason::AmountOutOfRange);
        }
        if price == 0 {
            return Err(InvalidOrderReason::PriceOutOfRange);
        }
        let mut order = Self::base(
            mode,
            dex_id,
            operator_fee_ratio,
            OrderGenerateType::UserGen,
            OrderType::LimitPrice,
            OrderSide::Sell,
            coin_symbol,
            asset_symbol,
            tx_cord,
            user_regid,
        )?;
        order.asset_amount = asset_amount;
        order.price = price;
        Ok(order)
    }

    /// A user market buy spending up to `coin_amount`.
    pub fn user_buy_market(
        mode: OperatorMode,
        dex_id: DexId,
        operator_fee_ratio: u64,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        coin_amount: Amount,
        tx_cord: TxCord,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        if coin_amount == 0 {
            return Err(InvalidOrderReason::AmountOutOfRange);
        }
        let mut order = Self::base(
            mode,
            dex_id,
            operator_fee_ratio,
            OrderGenerateType::UserGen,
            OrderType::MarketPrice,
            OrderSide::Buy,
            coin_symbol,
            asset_symbol,
            tx_cord,
            user_regid,
        )?;
        order.coin_amount = coin_amount;
        Ok(order)
    }

    /// A user market sell of `asset_amount`.
    pub fn user_sell_market(
        mode: OperatorMode,
        dex_id: DexId,
        operator_fee_ratio: u64,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        asset_amount: Amount,
        tx_cord: TxCord,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        if asset_amount == 0 {
            return Err(InvalidOrderReason::AmountOutOfRange);
        }
        let mut order = Self::base(
            mode,
            dex_id,
            operator_fee_ratio,
            OrderGenerateType::UserGen,
            OrderType::MarketPrice,
            OrderSide::Sell,
            coin_symbol,
            asset_symbol,
            tx_cord,
            user_regid,
        )?;
        order.asset_amount = asset_amount;
        Ok(order)
    }

    /// A protocol-generated market buy on the reserved DEX, placed for the
    /// synthetic `user_regid` by CDP maintenance flows.
    pub fn sys_buy_market(
        tx_cord: TxCord,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        coin_amount: Amount,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        let mut order = Self::user_buy_market(
            OperatorMode::Default,
            dex_primitives::DEX_RESERVED_ID,
            0,
            coin_symbol,
            asset_symbol,
            coin_amount,
            tx_cord,
            user_regid,
        )?;
        order.generate_type = OrderGenerateType::SystemGen;
        Ok(order)
    }

    /// A protocol-generated market sell on the reserved DEX.
    pub fn sys_sell_market(
        tx_cord: TxCord,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        asset_amount: Amount,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        let mut order = Self::user_sell_market(
            OperatorMode::Default,
            dex_primitives::DEX_RESERVED_ID,
            0,
            coin_symbol,
            asset_symbol,
            asset_amount,
            tx_cord,
            user_regid,
        )?;
        order.generate_type = OrderGenerateType::SystemGen;
        Ok(order)
    }

    #[allow(clippy::too_many_arguments)]
    fn base(
        mode: OperatorMode,
        dex_id: DexId,
        operator_fee_ratio: u64,
        generate_type: OrderGenerateType,
        order_type: OrderType,
        order_side: OrderSide,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        tx_cord: TxCord,
        user_regid: RegId,
    ) -> Result<Self, InvalidOrderReason> {
        if coin_symbol == asset_symbol {
            return Err(InvalidOrderReason::SameSymbol);
        }
        if mode == OperatorMode::Default && operator_fee_ratio != 0 {
            return Err(InvalidOrderReason::ModeFeeMismatch);
        }
        Ok(Self {
            mode,
            dex_id,
            operator_fee_ratio,
            generate_type,
            order_type,
            order_side,
            coin_symbol,
            asset_symbol,
            tx_cord,
            user_regid,
            ..Self::default()
        })
    }

    /// Symbol and amount that placement must move from available to frozen.
    pub fn freeze_requirement(&self) -> (TokenSymbol, Amount) {
        match self.order_side {
            OrderSide::Buy => (self.coin_symbol, self.coin_amount),
            OrderSide::Sell => (self.asset_symbol, self.asset_amount),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generate_type == OrderGenerateType::Empty
    }

    pub fn set_empty(&mut self) {
        *self = Self::default();
    }
}

/// The compact, mutable index entry kept for each open order, keyed by the
/// hash of the transaction that placed it.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveOrder {
    pub generate_type: OrderGenerateType,
    pub tx_cord: TxCord,
    pub total_deal_coin_amount: Amount,
    pub total_deal_asset_amount: Amount,
}

impl ActiveOrder {
    pub fn new(generate_type: OrderGenerateType, tx_cord: TxCord) -> Self {
        Self {
            generate_type,
            tx_cord,
            total_deal_coin_amount: 0,
            total_deal_asset_amount: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generate_type == OrderGenerateType::Empty
    }

    pub fn set_empty(&mut self) {
        *self = Self::default();
    }
}

/// Persistent record of a registered DEX operator, keyed by its `DexId`.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DexOperator {
    pub owner_regid: RegId,
    pub match_regid: RegId,
    pub name: Vec<u8>,
    pub portal_url: Vec<u8>,
    pub maker_fee_ratio: u64,
    pub taker_fee_ratio: u64,
    pub memo: Vec<u8>,
}

impl DexOperator {
    pub fn is_empty(&self) -> bool {
        self.owner_regid.is_empty()
            && self.match_regid.is_empty()
            && self.name.is_empty()
            && self.portal_url.is_empty()
            && self.maker_fee_ratio == 0
            && self.taker_fee_ratio == 0
            && self.memo.is_empty()
    }

    pub fn set_empty(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wusd() -> TokenSymbol {
        TokenSymbol::new("WUSD").unwrap()
    }

    fn wicc() -> TokenSymbol {
        TokenSymbol::new("WICC").unwrap()
    }

    #[test]
    fn buy_limit_derives_coin_freeze_with_ceiling() {
        let order = OrderDetail::user_buy_limit(
            OperatorMode::Default,
            0,
            0,
            wusd(),
            wicc(),
            3,
            PRICE_BOOST / 2,
            TxCord::new(10, 0),
            RegId::new(5, 1),
        )
        .unwrap();
        // 3 * 0.5 rounds up to 2.
        assert_eq!(order.coin_amount, 2);
        assert_eq!(order.freeze_requirement(), (wusd(), 2));
    }

    #[test]
    fn buy_limit_refuses_zero_price_and_amount() {
        let cord = TxCord::new(10, 0);
        let uid = RegId::new(5, 1);
        assert_eq!(
            OrderDetail::user_buy_limit(OperatorMode::Default, 0, 0, wusd(), wicc(), 5, 0, cord, uid),
            Err(InvalidOrderReason::PriceOutOfRange)
        );
        assert_eq!(
            OrderDetail::user_buy_limit(
                OperatorMode::Default,
                0,
                0,
                wusd(),
                wicc(),
                0,
                PRICE_BOOST,
                cord,
                uid
            ),
            Err(InvalidOrderReason::AmountOutOfRange)
        );
    }

    #[test]
    fn same_symbol_is_rejected_at_construction() {
        assert_eq!(
            OrderDetail::user_sell_market(
                OperatorMode::Default,
                0,
                0,
                wusd(),
                wusd(),
                5,
                TxCord::new(1, 0),
                RegId::new(5, 1)
            ),
            Err(InvalidOrderReason::SameSymbol)
        );
    }

    #[test]
    fn default_mode_refuses_operator_fee_ratio() {
        assert_eq!(
            OrderDetail::user_sell_limit(
                OperatorMode::Default,
                1,
                10,
                wusd(),
                wicc(),
                5,
                PRICE_BOOST,
                TxCord::new(1, 0),
                RegId::new(5, 1)
            ),
            Err(InvalidOrderReason::ModeFeeMismatch)
        );
    }

    #[test]
    fn market_orders_zero_the_unused_side() {
        let buy = OrderDetail::user_buy_market(
            OperatorMode::Default,
            0,
            0,
            wusd(),
            wicc(),
            100,
            TxCord::new(1, 0),
            RegId::new(5, 1),
        )
        .unwrap();
        assert_eq!((buy.coin_amount, buy.asset_amount, buy.price), (100, 0, 0));

        let sell = OrderDetail::user_sell_market(
            OperatorMode::Default,
            0,
            0,
            wusd(),
            wicc(),
            70,
            TxCord::new(1, 0),
            RegId::new(5, 1),
        )
        .unwrap();
        assert_eq!((sell.coin_amount, sell.asset_amount, sell.price), (0, 70, 0));
        assert_eq!(sell.freeze_requirement(), (wicc(), 70));
    }

    #[test]
    fn sys_orders_are_system_generated() {
        let order = OrderDetail::sys_buy_market(
            TxCord::new(9, 3),
            wusd(),
            wicc(),
            1_000,
            RegId::new(0, 7),
        )
        .unwrap();
        assert_eq!(order.generate_type, OrderGenerateType::SystemGen);
        assert_eq!(order.dex_id, dex_primitives::DEX_RESERVED_ID);
    }

    #[test]
    fn emptiness_round_trip_is_idempotent() {
        let mut order = OrderDetail::user_sell_market(
            OperatorMode::Default,
            0,
            0,
            wusd(),
            wicc(),
            5,
            TxCord::new(1, 0),
            RegId::new(5, 1),
        )
        .unwrap();
        assert!(!order.is_empty());
        order.set_empty();
        let after_once = order.clone();
        order.set_empty();
        assert_eq!(order, after_once);
        assert!(order.is_empty());
        assert!(OrderDetail::default().is_empty());
        assert!(ActiveOrder::default().is_empty());
        assert!(DexOperator::default().is_empty());
    }

    #[test]
    fn calc_coin_amount_saturates_to_none_on_overflow() {
        assert_eq!(calc_coin_amount(u64::MAX, u64::MAX), None);
        assert_eq!(calc_coin_amount(0, PRICE_BOOST), Some(0));
        assert_eq!(calc_coin_amount(1, 1), Some(1));
        assert_eq!(calc_coin_amount(PRICE_BOOST, PRICE_BOOST), Some(PRICE_BOOST));
    }

    #[test]
    fn enum_names_round_trip() {
        assert_eq!(OrderSide::parse(OrderSide::Sell.as_str()), Some(OrderSide::Sell));
        assert_eq!(
            OrderType::parse(OrderType::MarketPrice.as_str()),
            Some(OrderType::MarketPrice)
        );
        assert_eq!(
            OrderGenerateType::parse(OrderGenerateType::SystemGen.as_str()),
            Some(OrderGenerateType::SystemGen)
        );
        assert_eq!(
            OperatorMode::parse(OperatorMode::RequireAuth.as_str()),
            Some(OperatorMode::RequireAuth)
        );
        assert_eq!(OrderSide::parse("HOLD"), None);
        assert_eq!(OrderGenerateType::parse(""), None);
        assert_eq!(OrderSide::from_byte(3), None);
        assert_eq!(OperatorMode::from_byte(2), None);
    }

    #[test]
    fn enums_display_their_names() {
        assert_eq!(format!("{}", OrderSide::Buy), "BUY");
        assert_eq!(format!("{}", OrderType::LimitPrice), "LIMIT_PRICE");
        assert_eq!(format!("{}", OrderGenerateType::UserGen), "USER_GEN_ORDER");
        assert_eq!(format!("{}", OperatorMode::RequireAuth), "REQUIRE_AUTH");
    }
}
