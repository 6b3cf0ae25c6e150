//! DNSSEC digest computations for the DS/DNSKEY chain of trust.
//!
//! A DS record commits to a child zone's DNSKEY by carrying a digest over the canonical owner
//! name and the DNSKEY RDATA (RFC 4034, Section 5.1.4). This module computes that digest so a
//! validator can check the linkage between a parent's DS set and a child's DNSKEY set.
//!
//! Key tags (RFC 4034, Appendix B) live on [`DNSKEY::key_tag()`](crate::rdata::DNSKEY::key_tag).

use std::io::Write;

use byteorder::{NetworkEndian, WriteBytesExt};
use data_encoding::HEXUPPER;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384};

use crate::error::EncodeError;
use crate::rdata::ds::DigestType;
use crate::Name;

/// Builds the input for a DS digest: the canonical (lowercased) wire encoding of the owner name
/// followed by the DNSKEY RDATA (flags, protocol 3, algorithm, public key bytes).
pub fn ds_digest_input(
    owner: &Name,
    flags: u16,
    algorithm: u8,
    key: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let mut canonical_owner = owner.clone();
    canonical_owner.canonicalize();

    let mut data = Vec::with_capacity(key.len() + 32);
    canonical_owner.encode_into(&mut data)?;
    data.write_u16::<NetworkEndian>(flags)?;
    // protocol must always be 3
    data.write_u8(3)?;
    data.write_u8(algorithm)?;
    data.write_all(key)?;
    Ok(data)
}

/// Computes the DS digest for a DNSKEY, returned as upper-case hex.
///
/// Returns an empty string for digest types this implementation does not hash (so an unknown
/// digest type can never produce a match).
pub fn ds_digest(
    owner: &Name,
    flags: u16,
    algorithm: u8,
    key: &[u8],
    digest_type: DigestType,
) -> Result<String, EncodeError> {
    let data = ds_digest_input(owner, flags, algorithm, key)?;

    let digest = match digest_type {
        DigestType::SHA1 => Sha1::digest(&data).to_vec(),
        DigestType::SHA256 => Sha256::digest(&data).to_vec(),
        DigestType::SHA384 => Sha384::digest(&data).to_vec(),
        _ => return Ok(String::new()),
    };

    Ok(HEXUPPER.encode(&digest))
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};

    use crate::rdata::ds::DigestType;
    use crate::Name;

    use super::{ds_digest, ds_digest_input};

    #[test]
    fn digest_input_layout() {
        let owner = Name::from_ascii("Example.COM").unwrap();
        let key = [0xAB, 0xCD, 0xEF];
        let input = ds_digest_input(&owner, 257, 8, &key).unwrap();

        // lowercased owner wire form, then flags-hi, flags-lo, protocol, algorithm, key
        let mut expected: Vec<u8> = b"\x07example\x03com\0".to_vec();
        expected.extend_from_slice(&[0x01, 0x01, 3, 8, 0xAB, 0xCD, 0xEF]);
        assert_eq!(input, expected);
    }

    #[test]
    fn sha256_digest_matches_direct_hash() {
        let owner = Name::from_ascii("example.com").unwrap();
        let key = vec![0x42; 64];
        let digest = ds_digest(&owner, 257, 8, &key, DigestType::SHA256).unwrap();

        let input = ds_digest_input(&owner, 257, 8, &key).unwrap();
        let expected = data_encoding::HEXUPPER.encode(&Sha256::digest(&input));

        assert_eq!(digest, expected);
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn unknown_digest_type_never_matches() {
        let owner = Name::root();
        let digest = ds_digest(&owner, 256, 8, &[1, 2, 3], DigestType::Unassigned(9)).unwrap();
        assert!(digest.is_empty());
    }
}
