//! Signature checking for the two authorization slots of a DEX transaction.
//!
//! Signatures are 65-byte recoverable secp256k1 over the transaction's
//! signature hash. Verification recovers the compressed public key and
//! compares it with the key registered for the signing account, so a
//! signature by any other key fails closed.

use dex_primitives::TxId;
use sp_core::ecdsa;

/// Length of a recoverable secp256k1 signature on the wire.
pub const SIGNATURE_LEN: usize = 65;

/// Check `signature` over `hash` against an account's registered key.
/// Malformed signatures simply fail.
pub fn verify_signature(hash: &TxId, signature: &[u8], expected: &ecdsa::Public) -> bool {
    let signature: &[u8; SIGNATURE_LEN] = match signature.try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    match sp_io::crypto::secp256k1_ecdsa_recover_compressed(signature, hash.as_fixed_bytes()) {
        Ok(recovered) => recovered == expected.0,
        Err(_) => false,
    }
}
