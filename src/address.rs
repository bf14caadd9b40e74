//! Deterministic seed-based address derivation
//!
//! Every record lives at an address computed from fixed string seeds plus the
//! identities/assets it belongs to, replacing pointer relationships with
//! reproducible lookups. A bump byte, probed from 255 downward, selects the
//! first candidate that is off-curve so the resulting address provably has no
//! signing key.

use crate::{
    crypto,
    error::{Error, Result},
    types::{Address, AssetId},
};

/// Seed for config records: ("config", admin)
pub const CONFIG_SEED: &[u8] = b"config";

/// Seed for loan records: ("loan", borrower, asset)
pub const LOAN_SEED: &[u8] = b"loan";

/// Seed for escrow records: ("escrow", loan address)
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Domain separator so derived addresses never collide with other protocols.
const DERIVATION_TAG: &[u8] = b"pawn-ledger:v1";

/// Candidate address for a seed list and a specific bump.
///
/// Each seed is length-prefixed so adjacent seeds cannot be reinterpreted as
/// one another. Seeds longer than 255 bytes are not used by this protocol.
pub fn derive_with_bump(seeds: &[&[u8]], bump: u8) -> Address {
    let mut preimage = Vec::with_capacity(DERIVATION_TAG.len() + 64);
    preimage.extend_from_slice(DERIVATION_TAG);
    for seed in seeds {
        preimage.push(seed.len() as u8);
        preimage.extend_from_slice(seed);
    }
    preimage.push(bump);
    Address::new(crypto::hash_bytes(&preimage))
}

/// Derive the record address for `seeds`, probing for the bump.
///
/// Probes bump 255 downward and accepts the first off-curve candidate. Each
/// candidate is off-curve with probability ~1/2, so the probe terminates
/// almost immediately; exhausting all 256 bumps is treated as a hard error
/// rather than a panic.
pub fn derive(seeds: &[&[u8]]) -> Result<(Address, u8)> {
    for bump in (0..=255u8).rev() {
        let candidate = derive_with_bump(seeds, bump);
        if crypto::is_off_curve(candidate.as_bytes()) {
            return Ok((candidate, bump));
        }
    }
    Err(Error::InvalidOperation(
        "no off-curve address exists for these seeds".to_string(),
    ))
}

/// Address of the config record owned by `admin`.
pub fn config_address(admin: Address) -> Result<(Address, u8)> {
    derive(&[CONFIG_SEED, admin.as_ref()])
}

/// Address of the loan record for `(borrower, asset)`.
///
/// Keying by both components means a borrower cannot open two simultaneous
/// loans against the same collateral.
pub fn loan_address(borrower: Address, asset: AssetId) -> Result<(Address, u8)> {
    derive(&[LOAN_SEED, borrower.as_ref(), asset.as_ref()])
}

/// Address of the escrow authority serving `loan`.
pub fn escrow_address(loan: Address) -> Result<(Address, u8)> {
    derive(&[ESCROW_SEED, loan.as_ref()])
}
