//! Crypto layer for the Cipherpool compute pipeline.
//!
//! This crate contains:
//! - A canonicalizer that makes structurally equal payloads serialize byte-identically.
//! - Ed25519 keypair derivation from opaque secret material, plus detached sign/verify.
//! - The SHA-256 content hash used for job commitments and tally checksums.

pub mod canonical;
pub mod signer;
