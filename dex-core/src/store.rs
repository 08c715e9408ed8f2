//! The storage contract the DEX core runs against, plus the write-batch
//! overlay the executive wraps around every transaction.
//!
//! The node owns the real stores; this module only names the operations the
//! subsystem needs and supplies [`MemStore`], an in-memory implementation
//! used by tests and tooling.

use crate::types::{ActiveOrder, DexOperator, OrderDetail};
use dex_primitives::{Amount, DexId, Price, RegId, TokenSymbol, TxId};
#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};
use sp_core::ecdsa;
use sp_std::collections::btree_map::BTreeMap;

/// Execution-time transaction failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxError {
    /// The account's available balance cannot cover the required amount.
    InsufficientBalance,
    /// A required signature is missing, malformed, or by the wrong key.
    BadSignature,
    /// The transaction references state that does not exist or is not in a
    /// shape it could legally act on.
    StateConflict,
}

/// Free and frozen holdings of one account in one token.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountBalance {
    pub free: Amount,
    pub frozen: Amount,
}

/// The primitive balance moves the DEX performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceOp {
    AddFree,
    SubFree,
    /// Move available funds into the frozen bucket.
    Freeze,
    /// Release frozen funds back to available.
    Unfreeze,
    /// Spend directly out of the frozen bucket.
    SubFrozen,
}

/// Read access to the external asset registry: which symbols exist, which
/// sides of a pair they may take, and the per-symbol and per-pair limits.
pub trait AssetRegistry {
    fn is_registered(&self, symbol: &TokenSymbol) -> bool;
    fn can_be_coin(&self, symbol: &TokenSymbol) -> bool;
    fn can_be_asset(&self, symbol: &TokenSymbol) -> bool;
    fn max_order_amount(&self, symbol: &TokenSymbol) -> Amount;
    /// Inclusive price bounds for the pair.
    fn price_range(&self, coin_symbol: &TokenSymbol, asset_symbol: &TokenSymbol) -> (Price, Price);
}

/// The transactional state the DEX core reads and writes.
pub trait DexStore {
    fn account_pubkey(&self, regid: &RegId) -> Option<ecdsa::Public>;

    fn balance(&self, regid: &RegId, symbol: &TokenSymbol) -> AccountBalance;
    fn set_balance(&mut self, regid: &RegId, symbol: &TokenSymbol, balance: AccountBalance);

    fn active_order(&self, order_id: &TxId) -> Option<ActiveOrder>;
    fn set_active_order(&mut self, order_id: &TxId, order: ActiveOrder);
    fn erase_active_order(&mut self, order_id: &TxId);

    fn order_detail(&self, order_id: &TxId) -> Option<OrderDetail>;
    fn set_order_detail(&mut self, order_id: &TxId, detail: OrderDetail);
    fn erase_order_detail(&mut self, order_id: &TxId);

    fn dex_operator(&self, dex_id: DexId) -> Option<DexOperator>;

    /// Apply one balance move, read-modify-write. Shortfalls in the
    /// available bucket are [`TxError::InsufficientBalance`]; a shortfall in
    /// the frozen bucket means the caller's bookkeeping is broken and is a
    /// [`TxError::StateConflict`].
    fn operate_balance(
        &mut self,
        regid: &RegId,
        symbol: &TokenSymbol,
        op: BalanceOp,
        amount: Amount,
    ) -> Result<(), TxError> {
        let mut balance = self.balance(regid, symbol);
        match op {
            BalanceOp::AddFree => {
                balance.free = balance
                    .free
                    .checked_add(amount)
                    .ok_or(TxError::StateConflict)?;
            }
            BalanceOp::SubFree => {
                balance.free = balance
                    .free
                    .checked_sub(amount)
                    .ok_or(TxError::InsufficientBalance)?;
            }
            BalanceOp::Freeze => {
                balance.free = balance
                    .free
                    .checked_sub(amount)
                    .ok_or(TxError::InsufficientBalance)?;
                balance.frozen = balance
                    .frozen
                    .checked_add(amount)
                    .ok_or(TxError::StateConflict)?;
            }
            BalanceOp::Unfreeze => {
                balance.frozen = balance
                    .frozen
                    .checked_sub(amount)
                    .ok_or(TxError::StateConflict)?;
                balance.free = balance
                    .free
                    .checked_add(amount)
                    .ok_or(TxError::StateConflict)?;
            }
            BalanceOp::SubFrozen => {
                balance.frozen = balance
                    .frozen
                    .checked_sub(amount)
                    .ok_or(TxError::StateConflict)?;
            }
        }
        self.set_balance(regid, symbol, balance);
        Ok(())
    }
}

/// The operator record governing `dex_id`.
///
/// The reserved system DEX has no stored record; it behaves as an operator
/// owned by the risk-reserve account, matched by the system matcher, with
/// the chain's default fee ratios.
pub fn operator_record<S: DexStore + ?Sized>(
    store: &S,
    params: &crate::ChainParams,
    dex_id: DexId,
) -> Option<DexOperator> {
    if dex_id == dex_primitives::DEX_RESERVED_ID {
        return Some(DexOperator {
            owner_regid: params.risk_reserve_regid,
            match_regid: params.sys_matcher_regid,
            name: sp_std::vec::Vec::new(),
            portal_url: sp_std::vec::Vec::new(),
            maker_fee_ratio: params.default_maker_fee_ratio,
            taker_fee_ratio: params.default_taker_fee_ratio,
            memo: sp_std::vec::Vec::new(),
        });
    }
    store.dex_operator(dex_id)
}

/// A per-transaction write batch over a base store.
///
/// Reads see the batch's own writes first and fall through to the base.
/// [`StoreBatch::commit`] flushes everything down; dropping the batch
/// instead discards it, which is how a failed transaction leaves no trace.
pub struct StoreBatch<'a, S> {
    base: &'a mut S,
    balances: BTreeMap<(RegId, TokenSymbol), AccountBalance>,
    active_orders: BTreeMap<TxId, Option<ActiveOrder>>,
    order_details: BTreeMap<TxId, Option<OrderDetail>>,
}

impl<'a, S: DexStore> StoreBatch<'a, S> {
    pub fn new(base: &'a mut S) -> Self {
        Self {
            base,
            balances: BTreeMap::new(),
            active_orders: BTreeMap::new(),
            order_details: BTreeMap::new(),
        }
    }

    /// Flush every staged write into the base store.
    pub fn commit(self) {
        let StoreBatch {
            base,
            balances,
            active_orders,
            order_details,
        } = self;
        for ((regid, symbol), balance) in balances {
            base.set_balance(&regid, &symbol, balance);
        }
        for (order_id, entry) in active_orders {
            match entry {
                Some(order) => base.set_active_order(&order_id, order),
                None => base.erase_active_order(&order_id),
            }
        }
        for (order_id, entry) in order_details {
            match entry {
                Some(detail) => base.set_order_detail(&order_id, detail),
                None => base.erase_order_detail(&order_id),
            }
        }
    }
}

impl<S: DexStore> DexStore for StoreBatch<'_, S> {
    fn account_pubkey(&self, regid: &RegId) -> Option<ecdsa::Public> {
        self.base.account_pubkey(regid)
    }

    fn balance(&self, regid: &RegId, symbol: &TokenSymbol) -> AccountBalance {
        match self.balances.get(&(*regid, *symbol)) {
            Some(balance) => *balance,
            None => self.base.balance(regid, symbol),
        }
    }

    fn set_balance(&mut self, regid: &RegId, symbol: &TokenSymbol, balance: AccountBalance) {
        self.balances.insert((*regid, *symbol), balance);
    }

    fn active_order(&self, order_id: &TxId) -> Option<ActiveOrder> {
        match self.active_orders.get(order_id) {
            Some(entry) => entry.clone(),
            None => self.base.active_order(order_id),
        }
    }

    fn set_active_order(&mut self, order_id: &TxId, order: ActiveOrder) {
        self.active_orders.insert(*order_id, Some(order));
    }

    fn erase_active_order(&mut self, order_id: &TxId) {
        self.active_orders.insert(*order_id, None);
    }

    fn order_detail(&self, order_id: &TxId) -> Option<OrderDetail> {
        match self.order_details.get(order_id) {
            Some(entry) => entry.clone(),
            None => self.base.order_detail(order_id),
        }
    }

    fn set_order_detail(&mut self, order_id: &TxId, detail: OrderDetail) {
        self.order_details.insert(*order_id, Some(detail));
    }

    fn erase_order_detail(&mut self, order_id: &TxId) {
        self.order_details.insert(*order_id, None);
    }

    fn dex_operator(&self, dex_id: DexId) -> Option<DexOperator> {
        self.base.dex_operator(dex_id)
    }
}

/// Registry entry for one symbol in [`MemAssetRegistry`].
#[derive(Clone, Copy, Debug)]
pub struct AssetEntry {
    pub can_be_coin: bool,
    pub can_be_asset: bool,
    pub max_order_amount: Amount,
}

/// In-memory asset registry with explicit registrations and a wide-open
/// default price range.
#[derive(Clone, Debug, Default)]
pub struct MemAssetRegistry {
    entries: BTreeMap<TokenSymbol, AssetEntry>,
    price_ranges: BTreeMap<(TokenSymbol, TokenSymbol), (Price, Price)>,
}

impl MemAssetRegistry {
    pub fn register(&mut self, symbol: TokenSymbol, entry: AssetEntry) {
        self.entries.insert(symbol, entry);
    }

    pub fn set_price_range(
        &mut self,
        coin_symbol: TokenSymbol,
        asset_symbol: TokenSymbol,
        min: Price,
        max: Price,
    ) {
        self.price_ranges
            .insert((coin_symbol, asset_symbol), (min, max));
    }
}

impl AssetRegistry for MemAssetRegistry {
    fn is_registered(&self, symbol: &TokenSymbol) -> bool {
        self.entries.contains_key(symbol)
    }

    fn can_be_coin(&self, symbol: &TokenSymbol) -> bool {
        self.entries.get(symbol).map_or(false, |e| e.can_be_coin)
    }

    fn can_be_asset(&self, symbol: &TokenSymbol) -> bool {
        self.entries.get(symbol).map_or(false, |e| e.can_be_asset)
    }

    fn max_order_amount(&self, symbol: &TokenSymbol) -> Amount {
        self.entries.get(symbol).map_or(0, |e| e.max_order_amount)
    }

    fn price_range(&self, coin_symbol: &TokenSymbol, asset_symbol: &TokenSymbol) -> (Price, Price) {
        self.price_ranges
            .get(&(*coin_symbol, *asset_symbol))
            .copied()
            .unwrap_or((1, Price::MAX))
    }
}

/// An in-memory store implementing the full contract. The reference
/// fixture for tests, and a serviceable backing for tools.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    accounts: BTreeMap<RegId, ecdsa::Public>,
    balances: BTreeMap<(RegId, TokenSymbol), AccountBalance>,
    active_orders: BTreeMap<TxId, ActiveOrder>,
    order_details: BTreeMap<TxId, OrderDetail>,
    operators: BTreeMap<DexId, DexOperator>,
    pub assets: MemAssetRegistry,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_account(&mut self, regid: RegId, pubkey: ecdsa::Public) {
        self.accounts.insert(regid, pubkey);
    }

    /// Credit `amount` to the account's available balance.
    pub fn fund(&mut self, regid: RegId, symbol: TokenSymbol, amount: Amount) {
        let entry = self.balances.entry((regid, symbol)).or_default();
        entry.free += amount;
    }

    pub fn register_operator(&mut self, dex_id: DexId, operator: DexOperator) {
        self.operators.insert(dex_id, operator);
    }

    pub fn active_order_count(&self) -> usize {
        self.active_orders.len()
    }
}

impl DexStore for MemStore {
    fn account_pubkey(&self, regid: &RegId) -> Option<ecdsa::Public> {
        self.accounts.get(regid).copied()
    }

    fn balance(&self, regid: &RegId, symbol: &TokenSymbol) -> AccountBalance {
        self.balances
            .get(&(*regid, *symbol))
            .copied()
            .unwrap_or_default()
    }

    fn set_balance(&mut self, regid: &RegId, symbol: &TokenSymbol, balance: AccountBalance) {
        self.balances.insert((*regid, *symbol), balance);
    }

    fn active_order(&self, order_id: &TxId) -> Option<ActiveOrder> {
        self.active_orders.get(order_id).cloned()
    }

    fn set_active_order(&mut self, order_id: &TxId, order: ActiveOrder) {
        self.active_orders.insert(*order_id, order);
    }

    fn erase_active_order(&mut self, order_id: &TxId) {
        self.active_orders.remove(order_id);
    }

    fn order_detail(&self, order_id: &TxId) -> Option<OrderDetail> {
        self.order_details.get(order_id).cloned()
    }

    fn set_order_detail(&mut self, order_id: &TxId, detail: OrderDetail) {
        self.order_details.insert(*order_id, detail);
    }

    fn erase_order_detail(&mut self, order_id: &TxId) {
        self.order_details.remove(order_id);
    }

    fn dex_operator(&self, dex_id: DexId) -> Option<DexOperator> {
        self.operators.get(&dex_id).cloned()
    }
}

impl AssetRegistry for MemStore {
    fn is_registered(&self, symbol: &TokenSymbol) -> bool {
        self.assets.is_registered(symbol)
    }

    fn can_be_coin(&self, symbol: &TokenSymbol) -> bool {
        self.assets.can_be_coin(symbol)
    }

    fn can_be_asset(&self, symbol: &TokenSymbol) -> bool {
        self.assets.can_be_asset(symbol)
    }

    fn max_order_amount(&self, symbol: &TokenSymbol) -> Amount {
        self.assets.max_order_amount(symbol)
    }

    fn price_range(&self, coin_symbol: &TokenSymbol, asset_symbol: &TokenSymbol) -> (Price, Price) {
        self.assets.price_range(coin_symbol, asset_symbol)
    }
}
