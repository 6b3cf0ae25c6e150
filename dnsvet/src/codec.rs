//! Conversion of parsed DNS records into the chain data model.
//!
//! Everything derived is computed here: key tags, estimated key lengths, display names for
//! algorithm and digest-type numbers, and the RRSIG epoch-seconds to UTC conversion. Individual
//! malformed records never fail this layer; they are dropped by the resolver before reaching it.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use data_encoding::BASE64;
use dnsvet_proto::rdata::{DNSKEY, DS, NSEC, NSEC3, RRSIG};
use lazy_static::lazy_static;

use crate::chain::{DnskeyInfo, DsInfo, NsecInfo, RrsigInfo};

lazy_static! {
    /// DNSSEC algorithm numbers and their display names.
    static ref ALGORITHM_NAMES: HashMap<u8, &'static str> = HashMap::from([
        (1, "RSA/MD5"),
        (3, "DSA/SHA-1"),
        (5, "RSA/SHA-1"),
        (6, "DSA-NSEC3-SHA1"),
        (7, "RSASHA1-NSEC3-SHA1"),
        (8, "RSA/SHA-256"),
        (10, "RSA/SHA-512"),
        (12, "ECC-GOST"),
        (13, "ECDSA/P-256/SHA-256"),
        (14, "ECDSA/P-384/SHA-384"),
        (15, "Ed25519"),
        (16, "Ed448"),
    ]);

    /// DS digest type numbers and their display names.
    static ref DIGEST_TYPE_NAMES: HashMap<u8, &'static str> = HashMap::from([
        (1, "SHA-1"),
        (2, "SHA-256"),
        (3, "GOST R 34.11-94"),
        (4, "SHA-384"),
    ]);
}

/// Display name for a DNSSEC algorithm number.
pub fn algorithm_name(algorithm: u8) -> String {
    match ALGORITHM_NAMES.get(&algorithm) {
        Some(name) => (*name).into(),
        None => format!("Unknown ({})", algorithm),
    }
}

/// Display name for a DS digest type number.
pub fn digest_type_name(digest_type: u8) -> String {
    match DIGEST_TYPE_NAMES.get(&digest_type) {
        Some(name) => (*name).into(),
        None => format!("Unknown ({})", digest_type),
    }
}

/// Estimates a public key's length in bits from its algorithm and key bytes.
///
/// RSA keys (algorithms 1, 5, 7, 8, 10) carry an exponent-length prefix: either a single nonzero
/// byte giving the exponent length, or a zero byte followed by a 16-bit big-endian length. The
/// remainder is the modulus. The elliptic-curve algorithms have fixed sizes. Anything else is
/// reported as the raw key size.
pub fn estimate_key_length(algorithm: u8, key: &[u8]) -> usize {
    match algorithm {
        1 | 5 | 7 | 8 | 10 => {
            if key.is_empty() {
                return 0;
            }
            if key[0] == 0 {
                if key.len() < 3 {
                    return key.len() * 8;
                }
                let exp_len = ((key[1] as usize) << 8) | key[2] as usize;
                key.len().saturating_sub(3 + exp_len) * 8
            } else {
                let exp_len = key[0] as usize;
                key.len().saturating_sub(1 + exp_len) * 8
            }
        }
        13 => 256, // ECDSA P-256
        14 => 384, // ECDSA P-384
        15 => 256, // Ed25519
        16 => 448, // Ed448
        _ => key.len() * 8,
    }
}

/// Converts an RRSIG wire timestamp (unsigned seconds since the Unix epoch) into a UTC instant.
///
/// Wraparound beyond 2106 is not handled.
pub fn wire_timestamp(seconds: u32) -> DateTime<Utc> {
    match Utc.timestamp_opt(seconds as i64, 0) {
        chrono::LocalResult::Single(dt) => dt,
        _ => Utc.timestamp_opt(0, 0).unwrap(),
    }
}

/// Converts a parsed DNSKEY record into the model.
pub fn dnskey_info(rdata: &DNSKEY) -> DnskeyInfo {
    let flags = rdata.flags();
    let algorithm: u8 = rdata.algorithm.into();
    let is_ksk = (flags & 0x0001) == 1;

    DnskeyInfo {
        flags,
        protocol: 3,
        algorithm,
        algorithm_name: algorithm_name(algorithm),
        key_tag: rdata.key_tag(),
        key_data: BASE64.encode(&rdata.key),
        key_length: estimate_key_length(algorithm, &rdata.key),
        is_ksk,
        is_zsk: !is_ksk,
    }
}

/// Converts a parsed DS record into the model.
pub fn ds_info(rdata: &DS) -> DsInfo {
    let algorithm: u8 = rdata.algorithm.into();
    let digest_type: u8 = rdata.digest_type.into();

    DsInfo {
        key_tag: rdata.key_tag,
        algorithm,
        algorithm_name: algorithm_name(algorithm),
        digest_type,
        digest_type_name: digest_type_name(digest_type),
        digest: data_encoding::HEXUPPER.encode(&rdata.digest),
        validates_key: None,
    }
}

/// Converts a parsed RRSIG record into the model.
pub fn rrsig_info(rdata: &RRSIG) -> RrsigInfo {
    let algorithm: u8 = rdata.algorithm.into();

    RrsigInfo {
        type_covered: rdata.type_covered.to_string(),
        algorithm,
        algorithm_name: algorithm_name(algorithm),
        labels: rdata.labels,
        original_ttl: rdata.original_ttl,
        expiration: wire_timestamp(rdata.signature_expiration),
        inception: wire_timestamp(rdata.signature_inception),
        key_tag: rdata.key_tag,
        signer_name: rdata.signer_name.to_fqdn(),
        signature: BASE64.encode(&rdata.signature),
        is_valid: None,
        validation_error: None,
    }
}

/// Converts a parsed NSEC record into the model.
pub fn nsec_info(rdata: &NSEC) -> NsecInfo {
    NsecInfo {
        record_type: "NSEC".into(),
        next_domain: rdata.next_domain_name.to_fqdn(),
        types_covered: rdata.types.iter().map(ToString::to_string).collect(),
        hash_algorithm: None,
        flags: None,
        iterations: None,
        salt: None,
    }
}

/// Converts a parsed NSEC3 record into the model.
pub fn nsec3_info(rdata: &NSEC3) -> NsecInfo {
    NsecInfo {
        record_type: "NSEC3".into(),
        next_domain: rdata.next_hashed_owner_base32(),
        types_covered: rdata.types.iter().map(ToString::to_string).collect(),
        hash_algorithm: Some(rdata.hash_algorithm.into()),
        flags: Some(if rdata.opt_out { 1 } else { 0 }),
        iterations: Some(rdata.iterations),
        salt: Some(rdata.salt_hex()),
    }
}

/// Formats a TTL in human-readable form.
pub fn format_ttl(ttl: u32) -> String {
    if ttl < 60 {
        format!("{}s", ttl)
    } else if ttl < 3600 {
        format!("{}m", ttl / 60)
    } else if ttl < 86400 {
        format!("{}h", ttl / 3600)
    } else {
        format!("{}d", ttl / 86400)
    }
}

#[cfg(test)]
pub mod tests {
    use dnsvet_proto::rdata::dnskey::Algorithm;
    use dnsvet_proto::rdata::DNSKEY;

    use crate::chain::DnskeyInfo;

    use super::*;

    /// Builds a model DNSKEY directly, for tests that don't care about real key material.
    pub fn synthetic_dnskey(flags: u16) -> DnskeyInfo {
        let rdata = DNSKEY {
            zone: (flags & 0x0100) != 0,
            revoked: false,
            secure_entry_point: (flags & 0x0001) != 0,
            algorithm: Algorithm::RSASHA256,
            key: vec![3, 1, 0, 1, 0xAA, 0xBB, 0xCC, 0xDD],
        };
        dnskey_info(&rdata)
    }

    #[test]
    fn algorithm_names_cover_the_iana_table() {
        assert_eq!(algorithm_name(8), "RSA/SHA-256");
        assert_eq!(algorithm_name(13), "ECDSA/P-256/SHA-256");
        assert_eq!(algorithm_name(99), "Unknown (99)");
        assert_eq!(digest_type_name(2), "SHA-256");
        assert_eq!(digest_type_name(9), "Unknown (9)");
    }

    #[test]
    fn rsa_key_length_subtracts_exponent() {
        // one-byte exponent length: 3 exponent bytes, 256 modulus bytes
        let mut key = vec![3u8, 1, 0, 1];
        key.extend(vec![0xFF; 256]);
        assert_eq!(estimate_key_length(8, &key), 2048);

        // three-byte exponent length form: 0, then 16-bit length
        let mut key = vec![0u8, 0, 3, 1, 0, 1];
        key.extend(vec![0xFF; 128]);
        assert_eq!(estimate_key_length(8, &key), 1024);
    }

    #[test]
    fn curve_key_lengths_are_fixed() {
        assert_eq!(estimate_key_length(13, &[0; 64]), 256);
        assert_eq!(estimate_key_length(14, &[0; 96]), 384);
        assert_eq!(estimate_key_length(15, &[0; 32]), 256);
        assert_eq!(estimate_key_length(16, &[0; 57]), 448);
        // unknown algorithms report the raw size
        assert_eq!(estimate_key_length(42, &[0; 10]), 80);
    }

    #[test]
    fn dnskey_info_derives_ksk_from_sep_bit() {
        let ksk = synthetic_dnskey(257);
        assert!(ksk.is_ksk);
        assert!(!ksk.is_zsk);
        assert_eq!(ksk.flags, 257);
        assert_eq!(ksk.algorithm_name, "RSA/SHA-256");

        let zsk = synthetic_dnskey(256);
        assert!(zsk.is_zsk);
        assert_eq!(zsk.key_length, (8 - 1 - 3) * 8);
    }

    #[test]
    fn wire_timestamps_are_utc() {
        let dt = wire_timestamp(1_700_000_000);
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn ttl_formatting() {
        assert_eq!(format_ttl(30), "30s");
        assert_eq!(format_ttl(300), "5m");
        assert_eq!(format_ttl(7200), "2h");
        assert_eq!(format_ttl(172800), "2d");
    }
}
