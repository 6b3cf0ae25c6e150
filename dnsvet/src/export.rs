//! JSON and plain-text export of validated trust chains.
//!
//! Files land in `exports/<domain>_<timestamp>.{json,txt}`, with dots in the domain replaced by
//! underscores. The status display metadata (symbols, colour names) lives here, with the
//! consumers, not on the engine's status enum.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::chain::{TrustChain, ValidationStatus, ZoneInfo};
use crate::codec;

/// Display symbol for a status.
pub fn status_symbol(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Secure => "✓",
        ValidationStatus::Insecure => "○",
        ValidationStatus::Bogus => "✗",
        ValidationStatus::Indeterminate => "?",
        ValidationStatus::Unknown => "·",
    }
}

/// Display colour name for a status.
pub fn status_color(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Secure => "green",
        ValidationStatus::Insecure => "yellow",
        ValidationStatus::Bogus => "red",
        ValidationStatus::Indeterminate => "orange1",
        ValidationStatus::Unknown => "dim",
    }
}

fn serialize_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_status(status: ValidationStatus) -> Value {
    json!({
        "value": status.as_str(),
        "symbol": status_symbol(status),
        "color": status_color(status),
    })
}

fn serialize_zone(zone: &ZoneInfo) -> Value {
    json!({
        "name": zone.name,
        "parent": zone.parent,
        "status": serialize_status(zone.status),
        "status_reason": zone.status_reason,
        "has_dnssec": zone.has_dnssec(),
        "ds_validated": zone.ds_validated,
        "dnskey_validated": zone.dnskey_validated,
        "chain_complete": zone.chain_complete,
        "dnskeys": zone.dnskeys.iter().map(|key| json!({
            "flags": key.flags,
            "protocol": key.protocol,
            "algorithm": key.algorithm,
            "algorithm_name": key.algorithm_name,
            "key_tag": key.key_tag,
            "key_length": key.key_length,
            "is_ksk": key.is_ksk,
            "is_zsk": key.is_zsk,
            "key_data": key.key_data,
        })).collect::<Vec<_>>(),
        "ds_records": zone.ds_records.iter().map(|ds| json!({
            "key_tag": ds.key_tag,
            "algorithm": ds.algorithm,
            "algorithm_name": ds.algorithm_name,
            "digest_type": ds.digest_type,
            "digest_type_name": ds.digest_type_name,
            "digest": ds.digest,
            "validates_key": ds.validates_key,
        })).collect::<Vec<_>>(),
        "rrsigs": zone.rrsigs.iter().map(|rrsig| json!({
            "type_covered": rrsig.type_covered,
            "algorithm": rrsig.algorithm,
            "algorithm_name": rrsig.algorithm_name,
            "labels": rrsig.labels,
            "original_ttl": rrsig.original_ttl,
            "expiration": serialize_datetime(rrsig.expiration),
            "inception": serialize_datetime(rrsig.inception),
            "key_tag": rrsig.key_tag,
            "signer_name": rrsig.signer_name,
            "is_valid": rrsig.is_valid,
            "is_expired": rrsig.is_expired(),
            "days_until_expiry": rrsig.days_until_expiry(),
        })).collect::<Vec<_>>(),
        "additional_records": zone.additional_records.iter().map(|rec| json!({
            "record_type": rec.record_type,
            "name": rec.name,
            "value": rec.value,
            "ttl": rec.ttl,
            "is_signed": rec.is_signed,
        })).collect::<Vec<_>>(),
    })
}

/// Converts a trust chain into its canonical JSON document.
pub fn chain_to_json(chain: &TrustChain) -> Value {
    json!({
        "metadata": {
            "target_domain": chain.target_domain,
            "query_time": serialize_datetime(chain.query_time),
            "query_duration_ms": chain.query_duration_ms,
            "resolver_used": chain.resolver_used,
            "zone_count": chain.zone_count(),
        },
        "overall_status": serialize_status(chain.overall_status),
        "overall_reason": chain.overall_reason,
        "chain_path": chain.chain_path(),
        "zones": chain.zones.iter().map(serialize_zone).collect::<Vec<_>>(),
    })
}

/// Exports a trust chain to JSON, optionally writing it to `path`.
///
/// Returns the JSON string.
pub fn export_json(chain: &TrustChain, path: Option<&Path>) -> Result<String> {
    let json_str = serde_json::to_string_pretty(&chain_to_json(chain))?;

    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        fs::write(path, &json_str).with_context(|| format!("Could not write {}", path.display()))?;
    }

    Ok(json_str)
}

/// Renders a trust chain as a human-readable multi-section report.
pub fn render_text(chain: &TrustChain) -> String {
    let now = Utc::now();
    let mut out = String::new();

    let _ = writeln!(out, "DNSSEC Chain of Trust Report");
    let _ = writeln!(out, "============================");
    let _ = writeln!(out, "Domain:    {}", chain.target_domain);
    let _ = writeln!(
        out,
        "Status:    {} {}",
        status_symbol(chain.overall_status),
        chain.overall_status
    );
    let _ = writeln!(out, "Reason:    {}", chain.overall_reason);
    let _ = writeln!(out, "Zones:     {}", chain.zone_count());
    let _ = writeln!(out, "Duration:  {:.0} ms", chain.query_duration_ms);
    let _ = writeln!(out, "Resolver:  {}", chain.resolver_used);
    let _ = writeln!(
        out,
        "Queried:   {}",
        chain.query_time.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for zone in &chain.zones {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "--- {} [{} {}] ---",
            zone.name,
            status_symbol(zone.status),
            zone.status
        );
        let _ = writeln!(out, "    {}", zone.status_reason);

        if !zone.dnskeys.is_empty() {
            let _ = writeln!(out, "  DNSKEY records:");
            for key in &zone.dnskeys {
                let _ = writeln!(
                    out,
                    "    tag {:5}  {}  {} ({} bits)",
                    key.key_tag,
                    key.key_type(),
                    key.algorithm_name,
                    key.key_length
                );
            }
        }

        if !zone.ds_records.is_empty() {
            let _ = writeln!(out, "  DS records:");
            for ds in &zone.ds_records {
                let validated = match ds.validates_key {
                    Some(tag) => format!("validates key {}", tag),
                    None => "not validated".into(),
                };
                let _ = writeln!(
                    out,
                    "    tag {:5}  {}  {}  {} ({})",
                    ds.key_tag,
                    ds.algorithm_name,
                    ds.digest_type_name,
                    ds.display_digest(),
                    validated
                );
            }
        }

        if !zone.rrsigs.is_empty() {
            let _ = writeln!(out, "  RRSIG records:");
            for rrsig in &zone.rrsigs {
                let _ = writeln!(
                    out,
                    "    {} by key {}  {} .. {}  ({})",
                    rrsig.type_covered,
                    rrsig.key_tag,
                    rrsig.inception.format("%Y-%m-%d"),
                    rrsig.expiration.format("%Y-%m-%d"),
                    rrsig.validity_description(now)
                );
            }
        }

        if !zone.additional_records.is_empty() {
            let _ = writeln!(out, "  Additional records:");
            for rec in &zone.additional_records {
                let signed = if rec.is_signed { "signed" } else { "unsigned" };
                let _ = writeln!(
                    out,
                    "    {:6} {}  TTL {}  [{}]  {}",
                    rec.record_type,
                    rec.name,
                    codec::format_ttl(rec.ttl),
                    signed,
                    rec.value
                );
            }
        }

        if let Some(consistency) = &zone.consistency {
            let _ = writeln!(out, "  Nameserver consistency: {}", consistency.summary());
            for issue in &consistency.issues {
                let _ = writeln!(out, "    ! {}", issue);
            }
        }
    }

    out
}

/// Exports a trust chain as text, optionally writing it to `path`.
///
/// Returns the rendered report.
pub fn export_text(chain: &TrustChain, path: Option<&Path>) -> Result<String> {
    let text = render_text(chain);

    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        fs::write(path, &text).with_context(|| format!("Could not write {}", path.display()))?;
    }

    Ok(text)
}

/// Makes a domain safe for use in a file name: the trailing dot is stripped and the remaining
/// dots become underscores.
pub fn sanitize_domain(domain: &str) -> String {
    domain.trim_end_matches('.').replace('.', "_")
}

/// The export base path for a chain: `exports/<domain>_<YYYYmmdd_HHMMSS>` (no extension).
pub fn export_base_path(chain: &TrustChain) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    PathBuf::from("exports").join(format!(
        "{}_{}",
        sanitize_domain(&chain.target_domain),
        timestamp
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::chain::{TrustChain, ValidationStatus, ZoneInfo};

    use super::{chain_to_json, render_text, sanitize_domain};

    fn sample_chain() -> TrustChain {
        let mut chain = TrustChain::new("example.com.");
        chain.resolver_used = "8.8.8.8".into();
        chain.query_duration_ms = 123.0;
        chain.query_time = Utc::now();
        chain.overall_status = ValidationStatus::Secure;
        chain.overall_reason = "Complete chain of trust validated".into();

        let mut root = ZoneInfo::new(".");
        root.status = ValidationStatus::Secure;
        root.dnskeys.push(crate::codec::tests::synthetic_dnskey(257));
        let mut com = ZoneInfo::new("com.");
        com.parent = Some(".".into());
        com.status = ValidationStatus::Secure;
        let mut example = ZoneInfo::new("example.com.");
        example.parent = Some("com.".into());
        example.status = ValidationStatus::Secure;
        chain.zones = vec![root, com, example];
        chain
    }

    #[test]
    fn json_roundtrip_preserves_chain_shape() {
        let chain = sample_chain();
        let json_str = serde_json::to_string_pretty(&chain_to_json(&chain)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();

        let chain_path: Vec<String> = parsed["chain_path"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(chain_path, chain.chain_path());

        assert_eq!(
            parsed["overall_status"]["value"].as_str().unwrap(),
            chain.overall_status.as_str()
        );
        assert_eq!(parsed["metadata"]["zone_count"].as_u64().unwrap() as usize, 3);

        for (zone_value, zone) in parsed["zones"].as_array().unwrap().iter().zip(&chain.zones) {
            assert_eq!(zone_value["name"].as_str().unwrap(), zone.name);
            assert_eq!(
                zone_value["status"]["value"].as_str().unwrap(),
                zone.status.as_str()
            );
        }

        // query_time serialises as ISO-8601 with a Z suffix
        assert!(parsed["metadata"]["query_time"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn text_report_lists_every_zone() {
        let chain = sample_chain();
        let text = render_text(&chain);
        assert!(text.contains("example.com."));
        assert!(text.contains("SECURE"));
        for zone in &chain.zones {
            assert!(text.contains(&zone.name));
        }
    }

    #[test]
    fn domains_are_sanitized_for_file_names() {
        assert_eq!(sanitize_domain("example.com."), "example_com");
        assert_eq!(sanitize_domain("example.com"), "example_com");
        assert_eq!(sanitize_domain("a.b.c."), "a_b_c");
    }
}
