//! Shared fixture for the end-to-end DEX tests: an in-memory chain with a
//! funded cast of accounts, a registered trading pair, and one commercial
//! DEX operator.

use dex_core::store::{AssetEntry, DexStore, MemStore};
use dex_core::tx::{DexTx, DexTxKind};
use dex_core::types::DexOperator;
use dex_core::{ChainParams, DexError, Executive, TxContext};
use dex_primitives::codec::Encode;
use dex_primitives::{Amount, RegId, TokenSymbol, TxId, PRICE_BOOST};
use sp_core::{crypto::Pair as _, ecdsa::Pair};

/// One whole token in minor units.
pub const UNIT: u64 = PRICE_BOOST;

pub const ALICE: RegId = RegId::new(10, 1);
pub const BOB: RegId = RegId::new(10, 2);
pub const CAROL: RegId = RegId::new(10, 3);
pub const OP_OWNER: RegId = RegId::new(9, 0);
pub const OP_MATCH: RegId = RegId::new(9, 1);
/// Matches `ChainParams::default().sys_matcher_regid`.
pub const SYS_MATCH: RegId = RegId::new(0, 1);
/// Matches `ChainParams::default().risk_reserve_regid`.
pub const RISK_RESERVE: RegId = RegId::new(0, 2);

/// The commercial operator registered as DEX 1.
pub const DEX_ONE: u32 = 1;

pub fn wusd() -> TokenSymbol {
    TokenSymbol::new("WUSD").unwrap()
}

pub fn wicc() -> TokenSymbol {
    TokenSymbol::new("WICC").unwrap()
}

pub struct TestChain {
    pub store: MemStore,
    pub params: ChainParams,
    pub height: u32,
    next_index: u16,
}

impl TestChain {
    pub fn new() -> Self {
        let mut store = MemStore::new();
        store.assets.register(
            wusd(),
            AssetEntry {
                can_be_coin: true,
                can_be_asset: false,
                max_order_amount: 1_000_000_000 * UNIT,
            },
        );
        store.assets.register(
            wicc(),
            AssetEntry {
                can_be_coin: false,
                can_be_asset: true,
                max_order_amount: 1_000_000_000 * UNIT,
            },
        );
        // The maker/taker sum also ceilings what RequireAuth orders may set
        // as their own ratio, so keep it above the 0.4% the tests use.
        store.register_operator(
            DEX_ONE,
            DexOperator {
                owner_regid: OP_OWNER,
                match_regid: OP_MATCH,
                name: b"testdex".to_vec(),
                portal_url: b"https://dex.example".to_vec(),
                maker_fee_ratio: 200_000,
                taker_fee_ratio: 400_000,
                memo: Vec::new(),
            },
        );

        let mut chain = Self {
            store,
            params: ChainParams::default(),
            height: 100,
            next_index: 0,
        };
        for regid in [ALICE, BOB, CAROL, OP_OWNER, OP_MATCH, SYS_MATCH] {
            let pair = keypair(regid);
            chain.store.register_account(regid, pair.public());
        }
        chain
    }

    /// Encode, decode, verify, validate, and execute; the same road a
    /// gossiped transaction takes.
    pub fn apply(&mut self, tx: &DexTx) -> Result<TxId, DexError> {
        let raw = tx.encode();
        let ctx = TxContext::new(self.height, self.next_index);
        self.next_index += 1;
        Executive::apply_transaction(&mut self.store, &self.params, &ctx, tx.tx_type(), &raw)
    }

    pub fn advance_block(&mut self) {
        self.height += 1;
        self.next_index = 0;
    }

    pub fn fund(&mut self, regid: RegId, symbol: TokenSymbol, amount: Amount) {
        self.store.fund(regid, symbol, amount);
    }

    pub fn free_balance(&self, regid: RegId, symbol: TokenSymbol) -> Amount {
        self.store.balance(&regid, &symbol).free
    }

    pub fn frozen_balance(&self, regid: RegId, symbol: TokenSymbol) -> Amount {
        self.store.balance(&regid, &symbol).frozen
    }
}

/// Deterministic keypair for an account: the regid display string padded
/// into a seed.
pub fn keypair(regid: RegId) -> Pair {
    let mut seed = [0u8; 32];
    let tag = format!("{}", regid);
    seed[..tag.len()].copy_from_slice(tag.as_bytes());
    seed[31] = 0x5a;
    Pair::from_seed(&seed)
}

/// Fill in the user signature slot.
pub fn sign(tx: &mut DexTx, regid: RegId) {
    let hash = tx.signature_hash();
    tx.signature = AsRef::<[u8]>::as_ref(&keypair(regid).sign_prehashed(hash.as_fixed_bytes()))
        .to_vec();
}

/// Fill in the operator co-signature slot of an extended order.
pub fn cosign_operator(tx: &mut DexTx, regid: RegId) {
    let hash = tx.signature_hash();
    let signature =
        AsRef::<[u8]>::as_ref(&keypair(regid).sign_prehashed(hash.as_fixed_bytes())).to_vec();
    match &mut tx.kind {
        DexTxKind::BuyLimitEx(_, params)
        | DexTxKind::SellLimitEx(_, params)
        | DexTxKind::BuyMarketEx(_, params)
        | DexTxKind::SellMarketEx(_, params) => {
            params
                .operator_signature
                .as_mut()
                .expect("extended order carries an operator slot")
                .signature = signature;
        }
        _ => panic!("not an extended order"),
    }
}
