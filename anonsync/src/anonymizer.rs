//! Deterministic one-way anonymization of customer records.
//!
//! Personal fields are replaced with hex-encoded SHAKE-256 digests so that the
//! output collection carries no recoverable personal data while equal inputs
//! still map to equal outputs (re-upserting an unchanged record is a no-op for
//! downstream consumers).

use sha3::Shake256;
use sha3::digest::{ExtendableOutput, Update, XofReader};

use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;
use crate::types::Customer;

/// Replaces the personal fields of `customer` with deterministic digests.
///
/// Anonymized fields: first name, last name, the local part of the email
/// (the domain is preserved byte-for-byte), address lines 1 and 2, and the
/// postcode. Everything else, including the primary key and the creation
/// timestamp, passes through unchanged.
///
/// `hash_length` is the length in characters of each replacement string; the
/// underlying digest is `hash_length / 2` bytes, hex-encoded. The value is
/// validated at configuration load to be even and at least 2.
///
/// An email without an `@` separator is a fatal data error: the record cannot
/// be anonymized without leaking or corrupting the address, so the error is
/// propagated instead of guessing.
pub fn anonymize_customer(customer: &Customer, hash_length: usize) -> SyncResult<Customer> {
    let digest_len = hash_length / 2;

    let Some((local_part, domain)) = customer.email.split_once('@') else {
        return Err(sync_error!(
            ErrorKind::InvalidData,
            "Malformed email on source record",
            format!("record {} has no '@' separator in its email", customer.id)
        ));
    };

    let mut anonymized = customer.clone();
    anonymized.first_name = digest_hex(&customer.first_name, digest_len);
    anonymized.last_name = digest_hex(&customer.last_name, digest_len);
    anonymized.email = format!("{}@{}", digest_hex(local_part, digest_len), domain);
    anonymized.address.line1 = digest_hex(&customer.address.line1, digest_len);
    anonymized.address.line2 = digest_hex(&customer.address.line2, digest_len);
    anonymized.address.postcode = digest_hex(&customer.address.postcode, digest_len);

    Ok(anonymized)
}

/// Hex-encoded SHAKE-256 digest of `input`, `digest_len` bytes long.
fn digest_hex(input: &str, digest_len: usize) -> String {
    let mut hasher = Shake256::default();
    hasher.update(input.as_bytes());

    let mut digest = vec![0u8; digest_len];
    hasher.finalize_xof().read(&mut digest);

    hex::encode(digest)
}
