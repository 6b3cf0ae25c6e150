//! Data model for the DNSSEC chain of trust.
//!
//! A validation run produces one [`TrustChain`] holding one [`ZoneInfo`] per zone, root first.
//! Zones reference their parent by name, not by pointer, which keeps the chain an acyclic value
//! that can be handed to display and export code as-is. After a chain is returned, nothing
//! mutates it.

use chrono::{DateTime, Utc};

/// DNSSEC validation status of a zone or a whole chain.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ValidationStatus {
    /// Fully validated chain.
    Secure,
    /// No DNSSEC (but not broken).
    Insecure,
    /// Validation failed.
    Bogus,
    /// Cannot determine.
    Indeterminate,
    /// Not yet checked.
    Unknown,
}

impl ValidationStatus {
    /// The canonical lowercase identifier for this status, as used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Secure => "secure",
            ValidationStatus::Insecure => "insecure",
            ValidationStatus::Bogus => "bogus",
            ValidationStatus::Indeterminate => "indeterminate",
            ValidationStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_ascii_uppercase())
    }
}

/// A parsed DNSKEY record.
#[derive(Clone, Debug)]
pub struct DnskeyInfo {
    /// Wire-format flags field (256 = ZSK, 257 = KSK).
    pub flags: u16,
    /// Should be 3.
    pub protocol: u8,
    /// Algorithm number.
    pub algorithm: u8,
    /// Human-readable algorithm name.
    pub algorithm_name: String,
    /// Key tag (RFC 4034, Appendix B).
    pub key_tag: u16,
    /// Base64-encoded public key.
    pub key_data: String,
    /// Estimated key length in bits.
    pub key_length: usize,
    /// The SEP bit is set, marking a key signing key.
    pub is_ksk: bool,
    /// The SEP bit is clear, marking a zone signing key.
    pub is_zsk: bool,
}

impl DnskeyInfo {
    /// Human-readable key type.
    pub fn key_type(&self) -> &'static str {
        if self.is_ksk {
            "KSK"
        } else {
            "ZSK"
        }
    }

    /// Truncated key for display.
    pub fn display_key(&self) -> String {
        truncate_middle(&self.key_data)
    }
}

/// A parsed DS (Delegation Signer) record.
#[derive(Clone, Debug)]
pub struct DsInfo {
    /// Key tag of the DNSKEY this record commits to.
    pub key_tag: u16,
    /// Algorithm number.
    pub algorithm: u8,
    /// Human-readable algorithm name.
    pub algorithm_name: String,
    /// Hash algorithm (1=SHA-1, 2=SHA-256, 4=SHA-384).
    pub digest_type: u8,
    /// Human-readable digest type.
    pub digest_type_name: String,
    /// The digest value (upper-case hex).
    pub digest: String,
    /// Key tag of the DNSKEY this DS was verified against, set by the validator on success.
    pub validates_key: Option<u16>,
}

impl DsInfo {
    /// Truncated digest for display.
    pub fn display_digest(&self) -> String {
        truncate_middle(&self.digest)
    }
}

/// A parsed RRSIG (signature) record.
#[derive(Clone, Debug)]
pub struct RrsigInfo {
    /// Record type this signs (e.g. "DNSKEY", "A").
    pub type_covered: String,
    /// Algorithm number.
    pub algorithm: u8,
    /// Human-readable algorithm name.
    pub algorithm_name: String,
    /// Number of labels in the original owner name.
    pub labels: u8,
    /// Original TTL of the covered record set.
    pub original_ttl: u32,
    /// Signature expiration instant (UTC).
    pub expiration: DateTime<Utc>,
    /// Signature inception instant (UTC).
    pub inception: DateTime<Utc>,
    /// Key tag of the signing key.
    pub key_tag: u16,
    /// Name of the signer (fully qualified).
    pub signer_name: String,
    /// Base64-encoded signature.
    pub signature: String,
    /// Validation result, set by the validator.
    pub is_valid: Option<bool>,
    /// Validation error, set by the validator.
    pub validation_error: Option<String>,
}

impl RrsigInfo {
    /// Whether the signature has expired at `now`. The boundary is inclusive: a signature whose
    /// expiration equals `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Whether the signature is not yet valid at `now`. A signature whose inception equals `now`
    /// is valid.
    pub fn is_not_yet_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.inception
    }

    /// Whether the signature has expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the signature is not yet valid right now.
    pub fn is_not_yet_valid(&self) -> bool {
        self.is_not_yet_valid_at(Utc::now())
    }

    /// Days until expiration at `now` (negative if expired).
    pub fn days_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expiration - now).num_days()
    }

    /// Days until expiration right now (negative if expired).
    pub fn days_until_expiry(&self) -> i64 {
        self.days_until_expiry_at(Utc::now())
    }

    /// Human-readable validity status at `now`.
    pub fn validity_description(&self, now: DateTime<Utc>) -> String {
        if self.is_expired_at(now) {
            return format!("EXPIRED ({} days ago)", self.days_until_expiry_at(now).abs());
        }
        if self.is_not_yet_valid_at(now) {
            return "NOT YET VALID".into();
        }
        let days = self.days_until_expiry_at(now);
        if days < 7 {
            format!("EXPIRING SOON ({} days)", days)
        } else {
            format!("Valid ({} days)", days)
        }
    }
}

/// A parsed NSEC or NSEC3 record. Shown for information; never consulted by validation.
#[derive(Clone, Debug)]
pub struct NsecInfo {
    /// "NSEC" or "NSEC3".
    pub record_type: String,
    /// Next domain name (NSEC) or base32 hash (NSEC3).
    pub next_domain: String,
    /// Record types present at this name.
    pub types_covered: Vec<String>,
    /// NSEC3 hash algorithm.
    pub hash_algorithm: Option<u8>,
    /// NSEC3 flags.
    pub flags: Option<u8>,
    /// NSEC3 hash iterations.
    pub iterations: Option<u16>,
    /// NSEC3 salt (hex).
    pub salt: Option<String>,
}

/// An additional DNS record at the target domain (SOA, NS, A, AAAA, MX, TXT, SPF, DMARC).
#[derive(Clone, Debug)]
pub struct AdditionalRecord {
    /// Record type label; TXT records carrying policies are relabelled "SPF" or "DMARC".
    pub record_type: String,
    /// Full record name.
    pub name: String,
    /// Record value/content.
    pub value: String,
    /// TTL.
    pub ttl: u32,
    /// Whether the answer carried an RRSIG.
    pub is_signed: bool,
    /// The first RRSIG found in the answer, if any.
    pub rrsig: Option<RrsigInfo>,
}

/// Response from a single authoritative nameserver, queried directly for DNSKEYs.
#[derive(Clone, Debug)]
pub struct ServerResponse {
    /// IP address of the server.
    pub server_ip: String,
    /// Hostname if known.
    pub server_name: String,
    /// Did the server respond?
    pub responded: bool,
    /// Error message if it did not.
    pub error: Option<String>,
    /// Round-trip time of the query.
    pub response_time_ms: f64,
    /// Key tags of the DNSKEY records received.
    pub dnskey_tags: Vec<u16>,
    /// Whether any RRSIG came back with the answer.
    pub has_rrsig: bool,
}

/// Result of checking DNSKEY consistency across authoritative nameservers.
#[derive(Clone, Debug)]
pub struct ConsistencyResult {
    pub zone_name: String,
    pub nameservers_queried: usize,
    pub nameservers_responded: usize,
    /// True iff every responding server returned the same set of key tags, each with an RRSIG.
    pub is_consistent: bool,
    /// Human-readable descriptions of the divergences found.
    pub issues: Vec<String>,
    pub server_responses: Vec<ServerResponse>,
}

impl ConsistencyResult {
    /// Human-readable consistency status.
    pub fn summary(&self) -> String {
        if self.server_responses.is_empty() {
            return "Not checked".into();
        }
        if self.nameservers_responded == 0 {
            return "No responses".into();
        }
        if self.is_consistent {
            format!(
                "Consistent ({}/{})",
                self.nameservers_responded, self.nameservers_queried
            )
        } else {
            format!("INCONSISTENT ({} issues)", self.issues.len())
        }
    }
}

/// Information about a single zone in the chain.
#[derive(Clone, Debug)]
pub struct ZoneInfo {
    /// Zone name, fully qualified with a trailing dot; the root is ".".
    pub name: String,
    /// Parent zone name; absent only for the root.
    pub parent: Option<String>,
    pub status: ValidationStatus,
    /// Explanation of the status.
    pub status_reason: String,

    pub dnskeys: Vec<DnskeyInfo>,
    pub ds_records: Vec<DsInfo>,
    pub rrsigs: Vec<RrsigInfo>,
    pub nsec_records: Vec<NsecInfo>,

    /// A DS record from the parent matched one of this zone's DNSKEYs.
    pub ds_validated: bool,
    /// The DNSKEY RRset is signed by a key this chain trusts.
    pub dnskey_validated: bool,
    /// The full chain down to this zone validates.
    pub chain_complete: bool,

    /// Additional records; only populated for the target zone.
    pub additional_records: Vec<AdditionalRecord>,

    /// Cross-server consistency check results, when enabled.
    pub consistency: Option<ConsistencyResult>,

    /// The DNSKEY query for this zone answered NXDOMAIN (as opposed to an empty answer or a
    /// transport failure). Lets the validator report a missing name instead of a missing
    /// delegation.
    pub nxdomain: bool,
}

impl ZoneInfo {
    /// Creates an empty zone entry with [`ValidationStatus::Unknown`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            status: ValidationStatus::Unknown,
            status_reason: String::new(),
            dnskeys: Vec::new(),
            ds_records: Vec::new(),
            rrsigs: Vec::new(),
            nsec_records: Vec::new(),
            ds_validated: false,
            dnskey_validated: false,
            chain_complete: false,
            additional_records: Vec::new(),
            consistency: None,
            nxdomain: false,
        }
    }

    /// Whether the zone publishes DNSKEYs.
    pub fn has_dnssec(&self) -> bool {
        !self.dnskeys.is_empty()
    }

    /// Number of key signing keys.
    pub fn ksk_count(&self) -> usize {
        self.dnskeys.iter().filter(|k| k.is_ksk).count()
    }

    /// Number of zone signing keys.
    pub fn zsk_count(&self) -> usize {
        self.dnskeys.iter().filter(|k| k.is_zsk).count()
    }

    /// Finds a DNSKEY by its key tag.
    pub fn key_by_tag(&self, tag: u16) -> Option<&DnskeyInfo> {
        self.dnskeys.iter().find(|k| k.key_tag == tag)
    }
}

/// Complete chain of trust from the root zone to the target domain.
#[derive(Clone, Debug)]
pub struct TrustChain {
    /// The queried domain.
    pub target_domain: String,
    /// When the validation ran.
    pub query_time: DateTime<Utc>,
    /// Zones in order, root first, target last.
    pub zones: Vec<ZoneInfo>,
    pub overall_status: ValidationStatus,
    pub overall_reason: String,

    /// The resolver IPs used, comma-separated.
    pub resolver_used: String,
    /// Wall-clock duration of all queries.
    pub query_duration_ms: f64,
}

impl TrustChain {
    /// Creates an empty chain for the given target.
    pub fn new(target_domain: impl Into<String>) -> Self {
        Self {
            target_domain: target_domain.into(),
            query_time: Utc::now(),
            zones: Vec::new(),
            overall_status: ValidationStatus::Unknown,
            overall_reason: String::new(),
            resolver_used: String::new(),
            query_duration_ms: 0.0,
        }
    }

    /// Whether the entire chain is secure.
    pub fn is_secure(&self) -> bool {
        self.overall_status == ValidationStatus::Secure
    }

    /// Number of zones in the chain.
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Gets a zone by name.
    pub fn zone(&self, name: &str) -> Option<&ZoneInfo> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// The root zone, if it was reached.
    pub fn root_zone(&self) -> Option<&ZoneInfo> {
        self.zone(".")
    }

    /// The target domain's zone.
    pub fn target_zone(&self) -> Option<&ZoneInfo> {
        self.zones.last()
    }

    /// The zone names in order from root to target.
    pub fn chain_path(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.name.clone()).collect()
    }
}

/// Shortens long opaque strings (keys, digests) to their first and last 16 characters.
fn truncate_middle(s: &str) -> String {
    if s.len() > 32 {
        format!("{}...{}", &s[..16], &s[s.len() - 16..])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{RrsigInfo, ValidationStatus, ZoneInfo};

    fn rrsig_with_window(inception_offset: i64, expiration_offset: i64) -> RrsigInfo {
        let now = Utc::now();
        RrsigInfo {
            type_covered: "DNSKEY".into(),
            algorithm: 8,
            algorithm_name: "RSA/SHA-256".into(),
            labels: 2,
            original_ttl: 3600,
            expiration: now + Duration::seconds(expiration_offset),
            inception: now + Duration::seconds(inception_offset),
            key_tag: 12345,
            signer_name: "example.com.".into(),
            signature: String::new(),
            is_valid: None,
            validation_error: None,
        }
    }

    #[test]
    fn expiration_boundary_is_inclusive() {
        let rrsig = rrsig_with_window(-3600, 0);
        let now = rrsig.expiration;
        assert!(rrsig.is_expired_at(now));
        assert!(!rrsig.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn inception_boundary_is_valid() {
        let rrsig = rrsig_with_window(0, 3600);
        let now = rrsig.inception;
        assert!(!rrsig.is_not_yet_valid_at(now));
        assert!(rrsig.is_not_yet_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn key_counts_follow_sep_bit() {
        let mut zone = ZoneInfo::new("example.com.");
        assert!(!zone.has_dnssec());
        assert_eq!(zone.status, ValidationStatus::Unknown);

        zone.dnskeys.push(crate::codec::tests::synthetic_dnskey(257));
        zone.dnskeys.push(crate::codec::tests::synthetic_dnskey(256));

        assert!(zone.has_dnssec());
        assert_eq!(zone.ksk_count(), 1);
        assert_eq!(zone.zsk_count(), 1);
    }
}
