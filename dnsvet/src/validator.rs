//! DNSSEC chain-of-trust validation.
//!
//! The validator walks the zones root-first and classifies each one: does a trust anchor vouch
//! for the root's DNSKEY set, does each parent's DS set commit to a DNSKEY of the child, and are
//! the RRSIGs covering the DNSKEY sets inside their validity windows. The result is one
//! [`TrustChain`] with a status and reason per zone and for the chain as a whole.
//!
//! The SECURE label attests to the integrity of the DS/DNSKEY linkage; RRSIG signatures over
//! other record sets are not cryptographically verified.

use chrono::{DateTime, Utc};
use data_encoding::BASE64;
use dnsvet_proto::dnssec::ds_digest;
use dnsvet_proto::rdata::ds::DigestType;
use dnsvet_proto::Name;

use crate::chain::{TrustChain, ValidationStatus, ZoneInfo};
use crate::resolver::Resolver;

/// A DS-equivalent entry for the root zone, from which all validation begins.
#[derive(Clone, Copy, Debug)]
pub struct TrustAnchor {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: &'static str,
}

/// The IANA root trust anchors.
///
/// Source: <https://data.iana.org/root-anchors/root-anchors.xml>
pub const ROOT_TRUST_ANCHORS: &[TrustAnchor] = &[
    // KSK-2017 (key tag 20326, algorithm 8 RSA/SHA-256)
    TrustAnchor {
        key_tag: 20326,
        algorithm: 8,
        digest_type: 2,
        digest: "E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D",
    },
    // KSK-2024 (key tag 38696, algorithm 8 RSA/SHA-256)
    TrustAnchor {
        key_tag: 38696,
        algorithm: 8,
        digest_type: 2,
        digest: "683D2D0ACB8C9B712A1948B27F741219298D0A450D612C483AF444A4C0FB2B16",
    },
];

/// Validates the DNSSEC chain of trust for target domains.
pub struct Validator {
    resolver: Resolver,
}

impl Validator {
    /// Creates a validator using the given resolver.
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Validates the complete DNSSEC chain for a domain, including the authoritative-nameserver
    /// consistency check.
    pub fn validate_chain(&self, domain: &str) -> TrustChain {
        self.validate_chain_with(domain, true)
    }

    /// Validates the complete DNSSEC chain for a domain. `check_consistency` controls whether the
    /// zone's authoritative nameservers are queried directly and compared.
    pub fn validate_chain_with(&self, domain: &str, check_consistency: bool) -> TrustChain {
        let mut chain = TrustChain::new(domain);
        chain.resolver_used = self.resolver.resolver_label();

        let (zones, query_ms) = self.resolver.query_zone_chain(domain, check_consistency);
        chain.query_duration_ms = query_ms;

        evaluate(chain, zones, Utc::now())
    }
}

/// Classifies already-fetched zones into a finished chain.
///
/// `chain` carries the query metadata (target, resolver, duration); `zones` is the hierarchy as
/// returned by [`Resolver::query_zone_chain`], root first. `now` is the single instant used for
/// every signature-window comparison of the run.
pub fn evaluate(mut chain: TrustChain, zones: Vec<ZoneInfo>, now: DateTime<Utc>) -> TrustChain {
    if zones.is_empty() {
        chain.overall_status = ValidationStatus::Indeterminate;
        chain.overall_reason = "Could not query DNS records - no zones returned".into();
        return chain;
    }

    chain.zones = zones;

    if chain.zones[0].name != "." {
        let zone_names: Vec<_> = chain.zones.iter().map(|z| z.name.clone()).collect();
        chain.overall_status = ValidationStatus::Indeterminate;
        chain.overall_reason = format!("Root zone not found. Got zones: {:?}", zone_names);
        return chain;
    }

    // root zone first: without an answer from the root there is nothing to anchor the chain to
    {
        let root = &mut chain.zones[0];
        if root.dnskeys.is_empty() {
            root.status = ValidationStatus::Indeterminate;
            root.status_reason = "Root zone has no DNSKEY records".into();
            chain.overall_status = ValidationStatus::Indeterminate;
            chain.overall_reason = "DNS query failed: the root zone returned no DNSKEY records".into();
            return chain;
        }

        let (root_valid, root_reason) = validate_root_zone(root, ROOT_TRUST_ANCHORS);
        if root_valid {
            root.status = ValidationStatus::Secure;
            root.status_reason = root_reason;
            root.chain_complete = true;
        } else {
            root.status = ValidationStatus::Bogus;
            root.status_reason = root_reason.clone();
            chain.overall_status = ValidationStatus::Bogus;
            chain.overall_reason = format!("Root validation failed: {}", root_reason);
            return chain;
        }

        let (timing_valid, timing_reason) = validate_rrsig_timing(root, now);
        if !timing_valid {
            root.status = ValidationStatus::Bogus;
            root.status_reason = timing_reason.clone();
            chain.overall_status = ValidationStatus::Bogus;
            chain.overall_reason = timing_reason;
            return chain;
        }
    }

    let mut all_secure = true;
    let mut parent_status = chain.zones[0].status;

    for idx in 1..chain.zones.len() {
        let zone = &mut chain.zones[idx];

        if zone.dnskeys.is_empty() {
            if !zone.ds_records.is_empty() {
                // the parent promises a signed child that serves no keys
                zone.status = ValidationStatus::Bogus;
                zone.status_reason = "DS exists but no DNSKEY in zone".into();
                chain.overall_status = ValidationStatus::Bogus;
                chain.overall_reason = format!("Zone {}: DS exists but no DNSKEY", zone.name);
                return chain;
            }

            if zone.nxdomain {
                zone.status = ValidationStatus::Indeterminate;
                zone.status_reason = "Name does not exist (NXDOMAIN)".into();
            } else {
                zone.status = ValidationStatus::Insecure;
                zone.status_reason = "No DNSSEC (unsigned delegation)".into();
            }
            all_secure = false;
            parent_status = zone.status;
            continue;
        }

        let (ds_valid, ds_reason, matched_tag) = validate_ds_to_dnskey(zone);

        if ds_valid {
            zone.ds_validated = true;
        } else if !zone.ds_records.is_empty() {
            // DS present but nothing matches: the delegation is broken
            zone.status = ValidationStatus::Bogus;
            zone.status_reason = ds_reason.clone();
            chain.overall_status = ValidationStatus::Bogus;
            chain.overall_reason = format!("Zone {}: {}", zone.name, ds_reason);
            return chain;
        } else {
            zone.status = ValidationStatus::Insecure;
            zone.status_reason = if parent_status == ValidationStatus::Secure {
                "No DS record in parent (insecure delegation)".into()
            } else {
                "Parent zone is not secure".into()
            };
            all_secure = false;
            parent_status = zone.status;
            continue;
        }

        let (timing_valid, timing_reason) = validate_rrsig_timing(zone, now);
        if !timing_valid {
            zone.status = ValidationStatus::Bogus;
            zone.status_reason = timing_reason.clone();
            chain.overall_status = ValidationStatus::Bogus;
            chain.overall_reason = format!("Zone {}: {}", zone.name, timing_reason);
            return chain;
        }

        // is the DNSKEY RRset signed by the key the DS chain vouches for (or at least by a key
        // present in the zone)?
        let dnskey_rrsig_tag = zone
            .rrsigs
            .iter()
            .find(|rrsig| rrsig.type_covered == "DNSKEY")
            .map(|rrsig| rrsig.key_tag);
        if let Some(tag) = dnskey_rrsig_tag {
            if matched_tag == Some(tag) || zone.key_by_tag(tag).is_some() {
                zone.dnskey_validated = true;
            }
        }

        if zone.ds_validated && zone.dnskey_validated {
            zone.status = ValidationStatus::Secure;
            zone.status_reason = "Chain validated".into();
            zone.chain_complete = true;
        } else if zone.ds_validated {
            zone.status = ValidationStatus::Secure;
            zone.status_reason = "DS validated (RRSIG check partial)".into();
            zone.chain_complete = true;
        } else {
            zone.status = ValidationStatus::Indeterminate;
            zone.status_reason = "Could not fully validate".into();
            all_secure = false;
        }

        parent_status = zone.status;
    }

    if all_secure {
        chain.overall_status = ValidationStatus::Secure;
        chain.overall_reason = "Complete chain of trust validated".into();
    } else {
        // the first zone that is not secure determines the chain's verdict
        for zone in &chain.zones {
            if zone.status != ValidationStatus::Secure {
                chain.overall_status = zone.status;
                chain.overall_reason = if zone.status == ValidationStatus::Insecure {
                    format!("Chain breaks at {}: {}", zone.name, zone.status_reason)
                } else {
                    format!("Chain issue at {}: {}", zone.name, zone.status_reason)
                };
                break;
            }
        }
    }

    chain
}

/// Validates the root zone's DNSKEY set against the compiled-in trust anchors.
///
/// When no anchor matches but the root serves a KSK, the root is still accepted with an explicit
/// annotation: a root KSK roll that post-dates the compiled-in list would otherwise turn every
/// chain bogus.
fn validate_root_zone(zone: &ZoneInfo, anchors: &[TrustAnchor]) -> (bool, String) {
    if zone.name != "." {
        return (false, "Not the root zone".into());
    }

    if zone.dnskeys.is_empty() {
        return (
            false,
            "Root zone has no DNSKEY records (DNS query may have failed)".into(),
        );
    }

    let root = Name::root();
    for anchor in anchors {
        for key in &zone.dnskeys {
            if key.key_tag != anchor.key_tag || key.algorithm != anchor.algorithm {
                continue;
            }

            let key_bytes = match BASE64.decode(key.key_data.as_bytes()) {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            let computed = match ds_digest(
                &root,
                key.flags,
                key.algorithm,
                &key_bytes,
                DigestType::from(anchor.digest_type),
            ) {
                Ok(digest) => digest,
                Err(_) => continue,
            };

            if !computed.is_empty() && computed.eq_ignore_ascii_case(anchor.digest) {
                return (
                    true,
                    format!("Root DNSKEY {} matches trust anchor", key.key_tag),
                );
            }
        }
    }

    let ksk_tags: Vec<u16> = zone
        .dnskeys
        .iter()
        .filter(|k| k.is_ksk)
        .map(|k| k.key_tag)
        .collect();
    if !ksk_tags.is_empty() {
        return (
            true,
            format!(
                "Root has KSK(s) {:?} (trust anchor verification skipped)",
                ksk_tags
            ),
        );
    }

    let tags_found: Vec<u16> = zone.dnskeys.iter().map(|k| k.key_tag).collect();
    (
        false,
        format!(
            "No root DNSKEY matches trust anchor. Found keys: {:?}",
            tags_found
        ),
    )
}

/// Matches a zone's DS records (from the parent) against its DNSKEYs.
///
/// A DS matches when key tag and algorithm agree with a DNSKEY and the digest computed over that
/// DNSKEY under the DS's digest type equals the DS digest (case-insensitive hex). One matching DS
/// is sufficient. KSKs are the preferred candidates; zones without any KSK are matched against
/// all their keys.
///
/// Returns (matched, reason, first matched key tag) and records the matched tag on each DS.
fn validate_ds_to_dnskey(zone: &mut ZoneInfo) -> (bool, String, Option<u16>) {
    if zone.ds_records.is_empty() {
        return (false, "No DS records in parent zone".into(), None);
    }
    if zone.dnskeys.is_empty() {
        return (false, "No DNSKEY records in zone".into(), None);
    }

    let owner = match Name::from_ascii(&zone.name) {
        Ok(name) => name,
        Err(e) => return (false, format!("Invalid zone name: {}", e), None),
    };

    let dnskeys = &zone.dnskeys;
    let candidates: Vec<usize> = {
        let ksks: Vec<usize> = (0..dnskeys.len()).filter(|&i| dnskeys[i].is_ksk).collect();
        if ksks.is_empty() {
            // some zones sign with ZSKs only
            (0..dnskeys.len()).collect()
        } else {
            ksks
        }
    };

    let ds_count = zone.ds_records.len();
    let mut validated_tags: Vec<u16> = Vec::new();
    let mut failed_ds: Vec<String> = Vec::new();

    for ds in zone.ds_records.iter_mut() {
        let mut matched = false;
        for &i in &candidates {
            let key = &dnskeys[i];
            if key.key_tag != ds.key_tag || key.algorithm != ds.algorithm {
                continue;
            }

            let key_bytes = match BASE64.decode(key.key_data.as_bytes()) {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            let computed = match ds_digest(
                &owner,
                key.flags,
                key.algorithm,
                &key_bytes,
                DigestType::from(ds.digest_type),
            ) {
                Ok(digest) => digest,
                Err(_) => continue,
            };

            if !computed.is_empty() && computed.eq_ignore_ascii_case(&ds.digest) {
                ds.validates_key = Some(key.key_tag);
                validated_tags.push(key.key_tag);
                matched = true;
                break; // this DS matched, move to the next DS
            }
        }

        if !matched {
            // distinguish a wrong digest from a DS pointing at a key the zone doesn't serve
            if dnskeys.iter().any(|k| k.key_tag == ds.key_tag) {
                failed_ds.push(format!("DS tag={} digest mismatch", ds.key_tag));
            } else {
                failed_ds.push(format!("DS tag={} no matching DNSKEY", ds.key_tag));
            }
        }
    }

    if !validated_tags.is_empty() {
        let mut unique_tags = validated_tags.clone();
        unique_tags.dedup();
        let reason = if ds_count > 1 {
            format!(
                "DS validates DNSKEY(s) {:?} ({}/{} DS records)",
                unique_tags,
                validated_tags.len(),
                ds_count
            )
        } else {
            format!("DS validates DNSKEY {}", unique_tags[0])
        };
        return (true, reason, Some(unique_tags[0]));
    }

    if !failed_ds.is_empty() {
        return (
            false,
            format!("DS validation failed: {}", failed_ds.join("; ")),
            None,
        );
    }
    (false, "No DS record matches any DNSKEY".into(), None)
}

/// Checks the validity windows of the RRSIGs covering a zone's DNSKEY RRset.
///
/// An expired or not-yet-valid signature fails the zone. A signature whose signing key is not
/// served by the zone is marked invalid but is not fatal on its own.
fn validate_rrsig_timing(zone: &mut ZoneInfo, now: DateTime<Utc>) -> (bool, String) {
    let dnskeys = &zone.dnskeys;

    for rrsig in zone.rrsigs.iter_mut() {
        if rrsig.type_covered != "DNSKEY" {
            continue;
        }

        if rrsig.is_expired_at(now) {
            rrsig.is_valid = Some(false);
            rrsig.validation_error = Some("Signature expired".into());
            return (
                false,
                format!(
                    "DNSKEY RRSIG expired on {}",
                    rrsig.expiration.format("%Y-%m-%d %H:%M:%S UTC")
                ),
            );
        }

        if rrsig.is_not_yet_valid_at(now) {
            rrsig.is_valid = Some(false);
            rrsig.validation_error = Some("Signature not yet valid".into());
            return (
                false,
                format!(
                    "DNSKEY RRSIG not valid until {}",
                    rrsig.inception.format("%Y-%m-%d %H:%M:%S UTC")
                ),
            );
        }

        if dnskeys.iter().any(|k| k.key_tag == rrsig.key_tag) {
            rrsig.is_valid = Some(true);
        } else {
            rrsig.is_valid = Some(false);
            rrsig.validation_error = Some(format!("Signing key {} not found", rrsig.key_tag));
        }
    }

    (true, "RRSIG timing valid".into())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use data_encoding::BASE64;
    use dnsvet_proto::dnssec::ds_digest;
    use dnsvet_proto::rdata::ds::DigestType;
    use dnsvet_proto::Name;

    use crate::chain::{
        ConsistencyResult, DnskeyInfo, DsInfo, RrsigInfo, ServerResponse, TrustChain,
        ValidationStatus, ZoneInfo,
    };
    use crate::codec;

    use super::{evaluate, validate_root_zone, TrustAnchor};

    fn make_key(flags: u16, seed: u8) -> DnskeyInfo {
        use dnsvet_proto::rdata::dnskey::{Algorithm, DNSKEY};
        let mut key = vec![3, 1, 0, 1];
        key.extend((0..32).map(|i| seed.wrapping_add(i)));
        codec::dnskey_info(&DNSKEY {
            zone: true,
            revoked: false,
            secure_entry_point: (flags & 1) == 1,
            algorithm: Algorithm::RSASHA256,
            key,
        })
    }

    /// Builds a DS that genuinely matches the given key under SHA-256.
    fn matching_ds(zone_name: &str, key: &DnskeyInfo) -> DsInfo {
        let owner = Name::from_ascii(zone_name).unwrap();
        let key_bytes = BASE64.decode(key.key_data.as_bytes()).unwrap();
        let digest = ds_digest(
            &owner,
            key.flags,
            key.algorithm,
            &key_bytes,
            DigestType::SHA256,
        )
        .unwrap();
        DsInfo {
            key_tag: key.key_tag,
            algorithm: key.algorithm,
            algorithm_name: key.algorithm_name.clone(),
            digest_type: 2,
            digest_type_name: "SHA-256".into(),
            digest,
            validates_key: None,
        }
    }

    fn dnskey_rrsig(signer: &str, key_tag: u16, now: DateTime<Utc>, days_left: i64) -> RrsigInfo {
        RrsigInfo {
            type_covered: "DNSKEY".into(),
            algorithm: 8,
            algorithm_name: "RSA/SHA-256".into(),
            labels: 2,
            original_ttl: 3600,
            expiration: now + Duration::days(days_left),
            inception: now - Duration::days(1),
            key_tag,
            signer_name: signer.into(),
            signature: BASE64.encode(b"not a real signature"),
            is_valid: None,
            validation_error: None,
        }
    }

    fn root_zone(now: DateTime<Utc>) -> ZoneInfo {
        let mut root = ZoneInfo::new(".");
        let ksk = make_key(257, 1);
        root.rrsigs.push(dnskey_rrsig(".", ksk.key_tag, now, 30));
        root.dnskeys.push(ksk);
        root
    }

    fn signed_zone(name: &str, parent: &str, seed: u8, now: DateTime<Utc>) -> ZoneInfo {
        let mut zone = ZoneInfo::new(name);
        zone.parent = Some(parent.to_string());
        let ksk = make_key(257, seed);
        zone.ds_records.push(matching_ds(name, &ksk));
        zone.rrsigs.push(dnskey_rrsig(name, ksk.key_tag, now, 30));
        zone.dnskeys.push(ksk);
        zone.dnskeys.push(make_key(256, seed.wrapping_add(100)));
        zone
    }

    fn run(domain: &str, zones: Vec<ZoneInfo>) -> TrustChain {
        run_at(domain, zones, Utc::now())
    }

    fn run_at(domain: &str, zones: Vec<ZoneInfo>, now: DateTime<Utc>) -> TrustChain {
        evaluate(TrustChain::new(domain), zones, now)
    }

    fn assert_parent_linkage(chain: &TrustChain) {
        assert_eq!(chain.zones[0].name, ".");
        for i in 1..chain.zones.len() {
            assert_eq!(
                chain.zones[i].parent.as_deref(),
                Some(chain.zones[i - 1].name.as_str())
            );
        }
    }

    #[test]
    fn empty_zone_list_is_indeterminate() {
        let chain = run("example.com", vec![]);
        assert_eq!(chain.overall_status, ValidationStatus::Indeterminate);
    }

    #[test]
    fn missing_root_answer_is_indeterminate() {
        let chain = run("example.com", vec![ZoneInfo::new(".")]);
        assert_eq!(chain.overall_status, ValidationStatus::Indeterminate);
        assert!(chain.overall_reason.contains("DNS query failed"));
    }

    #[test]
    fn first_zone_not_root_is_indeterminate() {
        let chain = run("example.com", vec![ZoneInfo::new("com.")]);
        assert_eq!(chain.overall_status, ValidationStatus::Indeterminate);
        assert!(chain.overall_reason.contains("Root zone not found"));
    }

    #[test]
    fn unsigned_delegation_yields_insecure_chain() {
        let now = Utc::now();
        let zones = vec![
            root_zone(now),
            signed_zone("example.", ".", 10, now),
            {
                let mut z = ZoneInfo::new("unsigned.example.");
                z.parent = Some("example.".into());
                z
            },
        ];
        let chain = run("unsigned.example.", zones);

        assert_eq!(chain.overall_status, ValidationStatus::Insecure);
        assert_eq!(chain.chain_path().len(), 3);
        assert!(chain.zones[2].status_reason.contains("unsigned delegation"));
        assert!(chain.overall_reason.contains("unsigned.example."));
        assert_parent_linkage(&chain);
    }

    #[test]
    fn fully_signed_chain_is_secure() {
        let now = Utc::now();
        let zones = vec![
            root_zone(now),
            signed_zone("example.", ".", 10, now),
            signed_zone("good.example.", "example.", 20, now),
        ];
        let chain = run("good.example.", zones);

        assert_eq!(chain.overall_status, ValidationStatus::Secure);
        assert!(chain.zones.iter().all(|z| z.status == ValidationStatus::Secure));
        assert_eq!(chain.chain_path(), [".", "example.", "good.example."]);
        // a secure zone always has its DS validated (root excepted)
        assert!(chain.zones[1..].iter().all(|z| z.ds_validated));
        assert!(chain.zones[1].ds_records[0].validates_key.is_some());
        assert_parent_linkage(&chain);
    }

    #[test]
    fn expired_dnskey_rrsig_is_bogus() {
        let now = Utc::now();
        let mut bad = signed_zone("expired.example.", "example.", 20, now);
        bad.rrsigs[0].expiration = now - Duration::days(1);

        let zones = vec![root_zone(now), signed_zone("example.", ".", 10, now), bad];
        let chain = run_at("expired.example.", zones, now);

        assert_eq!(chain.overall_status, ValidationStatus::Bogus);
        assert!(chain.overall_reason.contains("expired"));
        assert_eq!(
            chain.zone("expired.example.").unwrap().status,
            ValidationStatus::Bogus
        );
        assert_eq!(
            chain.zone("expired.example.").unwrap().rrsigs[0].is_valid,
            Some(false)
        );
    }

    #[test]
    fn expiration_exactly_now_counts_as_expired() {
        let now = Utc::now();
        let mut bad = signed_zone("boundary.example.", "example.", 20, now);
        bad.rrsigs[0].expiration = now;

        let zones = vec![root_zone(now), signed_zone("example.", ".", 10, now), bad];
        let chain = run_at("boundary.example.", zones, now);

        assert_eq!(chain.overall_status, ValidationStatus::Bogus);
    }

    #[test]
    fn ds_digest_mismatch_is_bogus() {
        let now = Utc::now();
        let mut bad = signed_zone("dsmismatch.example.", "example.", 20, now);
        bad.ds_records[0].digest = "AAAA".repeat(16);

        let zones = vec![root_zone(now), signed_zone("example.", ".", 10, now), bad];
        let chain = run("dsmismatch.example.", zones);

        assert_eq!(chain.overall_status, ValidationStatus::Bogus);
        assert!(chain.overall_reason.contains("digest mismatch"));
    }

    #[test]
    fn ds_without_dnskey_is_bogus() {
        let now = Utc::now();
        let mut broken = ZoneInfo::new("broken.example.");
        broken.parent = Some("example.".into());
        broken
            .ds_records
            .push(matching_ds("broken.example.", &make_key(257, 30)));

        let zones = vec![root_zone(now), signed_zone("example.", ".", 10, now), broken];
        let chain = run("broken.example.", zones);

        assert_eq!(chain.overall_status, ValidationStatus::Bogus);
        assert!(chain.overall_reason.contains("DS exists but no DNSKEY"));
    }

    #[test]
    fn unknown_root_ksk_is_secure_with_annotation() {
        let now = Utc::now();
        let chain = run("rollroot.", vec![root_zone(now)]);

        assert_eq!(chain.overall_status, ValidationStatus::Secure);
        assert!(chain.zones[0]
            .status_reason
            .contains("trust anchor verification skipped"));
    }

    #[test]
    fn root_with_only_zsks_and_no_anchor_match_is_bogus() {
        let now = Utc::now();
        let mut root = ZoneInfo::new(".");
        root.dnskeys.push(make_key(256, 1));
        let chain = run_at("example.com.", vec![root], now);

        assert_eq!(chain.overall_status, ValidationStatus::Bogus);
        assert!(chain.overall_reason.contains("Root validation failed"));
    }

    #[test]
    fn matching_trust_anchor_is_reported() {
        let key = make_key(257, 7);
        let key_bytes = BASE64.decode(key.key_data.as_bytes()).unwrap();
        let digest = ds_digest(
            &Name::root(),
            key.flags,
            key.algorithm,
            &key_bytes,
            DigestType::SHA256,
        )
        .unwrap();
        let anchors = vec![TrustAnchor {
            key_tag: key.key_tag,
            algorithm: key.algorithm,
            digest_type: 2,
            digest: Box::leak(digest.into_boxed_str()),
        }];

        let mut root = ZoneInfo::new(".");
        root.dnskeys.push(key);

        let (valid, reason) = validate_root_zone(&root, &anchors);
        assert!(valid);
        assert!(reason.contains("matches trust anchor"));
    }

    #[test]
    fn nxdomain_zone_is_reported_as_missing_name() {
        let now = Utc::now();
        let mut gone = ZoneInfo::new("gone.example.");
        gone.parent = Some("example.".into());
        gone.nxdomain = true;

        let zones = vec![root_zone(now), signed_zone("example.", ".", 10, now), gone];
        let chain = run("gone.example.", zones);

        assert_eq!(chain.overall_status, ValidationStatus::Indeterminate);
        assert!(chain.overall_reason.contains("gone.example."));
        assert!(chain.overall_reason.contains("NXDOMAIN"));
    }

    #[test]
    fn inconsistent_nameservers_do_not_change_zone_status() {
        let now = Utc::now();
        let mut zone = signed_zone("inconsistent.example.", "example.", 20, now);
        zone.consistency = Some(ConsistencyResult {
            zone_name: "inconsistent.example.".into(),
            nameservers_queried: 2,
            nameservers_responded: 2,
            is_consistent: false,
            issues: vec!["ns2 returned a different DNSKEY set".into()],
            server_responses: vec![ServerResponse {
                server_ip: "192.0.2.1".into(),
                server_name: "ns1.example.".into(),
                responded: true,
                error: None,
                response_time_ms: 2.0,
                dnskey_tags: vec![1],
                has_rrsig: true,
            }],
        });

        let zones = vec![root_zone(now), signed_zone("example.", ".", 10, now), zone];
        let chain = run("inconsistent.example.", zones);

        let target = chain.zone("inconsistent.example.").unwrap();
        assert_eq!(target.status, ValidationStatus::Secure);
        let consistency = target.consistency.as_ref().unwrap();
        assert!(!consistency.is_consistent);
        assert!(!consistency.issues.is_empty());
    }

    #[test]
    fn missing_ds_below_insecure_zone_blames_the_parent() {
        let now = Utc::now();
        let mut unsigned = ZoneInfo::new("unsigned.example.");
        unsigned.parent = Some("example.".into());

        // a signed zone hanging off an insecure one
        let mut leaf = signed_zone("leaf.unsigned.example.", "unsigned.example.", 40, now);
        leaf.ds_records.clear();

        let zones = vec![
            root_zone(now),
            signed_zone("example.", ".", 10, now),
            unsigned,
            leaf,
        ];
        let chain = run("leaf.unsigned.example.", zones);

        assert_eq!(chain.overall_status, ValidationStatus::Insecure);
        assert!(chain.overall_reason.contains("unsigned.example."));
        assert_eq!(
            chain.zone("leaf.unsigned.example.").unwrap().status_reason,
            "Parent zone is not secure"
        );
    }
}
