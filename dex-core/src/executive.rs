//! The subsystem's entry point for the block processor: decode a raw DEX
//! transaction, verify authorization, validate, and execute inside a
//! per-transaction write batch.
//!
//! A failed transaction leaves no trace: the batch it executed in is
//! simply dropped. Committing or rejecting the enclosing block is the
//! caller's business.

use crate::execution::{execute_cancel, execute_order_tx};
use crate::settlement::{execute_settle, SettleError};
use crate::store::{AssetRegistry, DexStore, StoreBatch, TxError};
use crate::tx::{DexTx, DexTxKind, TxType};
use crate::validation::{check_transaction, InvalidOrderReason};
use crate::verifier::verify_signature;
use crate::{ensure, ChainParams, LOG_TARGET};
use dex_primitives::codec::CodecError;
use dex_primitives::{TxCord, TxId};
use sp_std::marker::PhantomData;

/// Everything that can go wrong between a raw blob and a committed DEX
/// transaction, by family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DexError {
    /// Rejected at ingest: the bytes do not decode.
    Codec(CodecError),
    /// Rejected in validation.
    Invalid(InvalidOrderReason),
    /// Rejected at execution time.
    Tx(TxError),
    /// A settle transaction was rejected; the whole deal list reverts.
    Settle(SettleError),
}

impl From<CodecError> for DexError {
    fn from(e: CodecError) -> Self {
        DexError::Codec(e)
    }
}

impl From<InvalidOrderReason> for DexError {
    fn from(e: InvalidOrderReason) -> Self {
        DexError::Invalid(e)
    }
}

impl From<TxError> for DexError {
    fn from(e: TxError) -> Self {
        DexError::Tx(e)
    }
}

impl From<SettleError> for DexError {
    fn from(e: SettleError) -> Self {
        DexError::Settle(e)
    }
}

/// Where in the chain the transaction being applied sits. Its coordinate
/// becomes the order's `tx_cord` and so its settlement priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxContext {
    pub height: u32,
    pub index: u16,
}

impl TxContext {
    pub fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    pub fn tx_cord(&self) -> TxCord {
        TxCord::new(self.height, self.index)
    }
}

/// The transaction application pipeline. Stateless; every call works the
/// store it is given.
pub struct Executive<S>(PhantomData<S>);

impl<S: DexStore + AssetRegistry> Executive<S> {
    /// Decode and apply a raw transaction whose type tag came from the
    /// outer envelope. Returns the transaction hash, which for
    /// order-placing transactions is also the order id.
    pub fn apply_transaction(
        store: &mut S,
        params: &ChainParams,
        ctx: &TxContext,
        tx_type: TxType,
        raw: &[u8],
    ) -> Result<TxId, DexError> {
        let tx = DexTx::decode_with_type(tx_type, raw)?;
        Self::apply_decoded(store, params, ctx, &tx)
    }

    /// Apply an already-decoded transaction.
    pub fn apply_decoded(
        store: &mut S,
        params: &ChainParams,
        ctx: &TxContext,
        tx: &DexTx,
    ) -> Result<TxId, DexError> {
        let tx_hash = tx.signature_hash();

        let pubkey = store
            .account_pubkey(&tx.tx_uid)
            .ok_or(TxError::BadSignature)?;
        ensure!(
            verify_signature(&tx_hash, &tx.signature, &pubkey),
            TxError::BadSignature
        );

        check_transaction(store, params, tx)?;

        let mut batch = StoreBatch::new(store);
        Self::dispatch(&mut batch, params, ctx, tx, tx_hash)?;
        batch.commit();
        log::debug!(
            target: LOG_TARGET,
            "applied {:?} tx {:?} from {}",
            tx.tx_type(),
            tx_hash,
            tx.tx_uid,
        );
        Ok(tx_hash)
    }

    fn dispatch<T: DexStore>(
        store: &mut T,
        params: &ChainParams,
        ctx: &TxContext,
        tx: &DexTx,
        tx_hash: TxId,
    ) -> Result<(), DexError> {
        match &tx.kind {
            DexTxKind::Cancel(body) => {
                execute_cancel(store, &tx.tx_uid, &body.order_id).map_err(DexError::from)
            }
            DexTxKind::Settle(body) | DexTxKind::SettleEx(body) => {
                execute_settle(store, params, &tx.tx_uid, body)
            }
            _ => execute_order_tx(store, ctx.tx_cord(), tx, tx_hash).map_err(DexError::from),
        }
    }
}
