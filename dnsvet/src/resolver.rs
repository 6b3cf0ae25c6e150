//! Recursive DNS queries for DNSSEC chain-of-trust inspection.
//!
//! The resolver asks the configured recursive nameservers (DO bit set, EDNS0 payload 4096) for
//! the records the validator needs: DNSKEY+RRSIG and DS per zone, plus the apex record set of the
//! target domain. It also discovers a zone's authoritative nameservers and queries them directly
//! over UDP to compare their DNSKEY sets.
//!
//! Transport and parse failures are swallowed at this boundary: a query either yields an answer
//! or it doesn't, and the validator classifies what is missing. The one distinction preserved is
//! NXDOMAIN, so a nonexistent name is not reported as an unsigned delegation.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use dnsvet_proto::error::ParseError;
use dnsvet_proto::{
    EdnsConfig, HeaderFlags, Message, Name, Opcode, RCode, Rdata, Record, RecordType,
};

use crate::chain::{AdditionalRecord, ConsistencyResult, DsInfo, ServerResponse, ZoneInfo};
use crate::codec;
use crate::net::{send_query_tcp, send_query_udp, Nameserver};

/// Public resolvers used when the caller does not supply any.
pub const DEFAULT_RESOLVERS: [Ipv4Addr; 3] = [
    Ipv4Addr::new(8, 8, 8, 8),
    Ipv4Addr::new(1, 1, 1, 1),
    Ipv4Addr::new(9, 9, 9, 9),
];

/// Upper bound on authoritative servers queried per zone for the consistency check.
pub const MAX_CONSISTENCY_SERVERS: usize = 5;

/// Resolver configuration.
///
/// The configuration is immutable; derive a changed one with
/// [`with_nameservers()`](Self::with_nameservers) and build a new [`Resolver`] from it. A
/// validation run snapshots the configuration when it starts, so swapping resolvers never
/// affects a run already in flight.
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Recursive resolver IPs, tried in order.
    pub nameservers: Vec<IpAddr>,
    /// Port the recursive resolvers listen on.
    pub port: u16,
    /// Per-query timeout.
    pub timeout: Duration,
    /// EDNS0 UDP payload size advertised in queries.
    pub payload_size: u16,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nameservers: DEFAULT_RESOLVERS.iter().map(|ip| IpAddr::V4(*ip)).collect(),
            port: 53,
            timeout: Duration::from_secs(3),
            payload_size: 4096,
        }
    }
}

impl ResolverConfig {
    /// Returns this configuration with the nameserver list replaced wholesale.
    pub fn with_nameservers(self, nameservers: Vec<IpAddr>) -> Self {
        Self {
            nameservers,
            ..self
        }
    }
}

/// What a single query attempt produced.
///
/// `NxDomain` is kept apart from `Failed` so the validator can tell "this name does not exist"
/// from "nobody answered".
enum QueryOutcome {
    Answer(Message),
    NxDomain,
    Failed,
}

/// DNS resolver for DNSSEC chain-of-trust queries.
pub struct Resolver {
    config: ResolverConfig,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl Resolver {
    /// Creates a resolver from the given configuration snapshot.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// The configured recursive resolver IPs.
    pub fn nameservers(&self) -> &[IpAddr] {
        &self.config.nameservers
    }

    /// The configured resolvers as a display string ("8.8.8.8, 1.1.1.1").
    pub fn resolver_label(&self) -> String {
        self.config
            .nameservers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Derives the zone hierarchy for a domain, root first.
    ///
    /// ```
    /// use dnsvet::resolver::Resolver;
    ///
    /// assert_eq!(
    ///     Resolver::zone_hierarchy("www.example.co.uk"),
    ///     [".", "uk.", "co.uk.", "example.co.uk.", "www.example.co.uk."],
    /// );
    /// ```
    pub fn zone_hierarchy(domain: &str) -> Vec<String> {
        let trimmed = domain.trim_end_matches('.');
        let mut zones = vec![".".to_string()];
        if trimmed.is_empty() {
            return zones;
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        for i in (0..parts.len()).rev() {
            let zone = format!("{}.", parts[i..].join("."));
            if zone != "." && !zones.contains(&zone) {
                zones.push(zone);
            }
        }

        zones
    }

    /// Builds an encoded query for `name`/`rtype` with the DO bit set.
    fn prepare_query(&self, name: &Name, rtype: RecordType) -> Result<Vec<u8>> {
        // see https://tools.ietf.org/html/rfc6840#section-5.9 for why the cd flag is set
        let flags = HeaderFlags {
            aa: false,
            tc: false,
            rd: true,
            ra: false,
            ad: true,
            cd: true,
        };
        let msg = Message::new_query(
            name.clone(),
            rtype,
            Opcode::QUERY,
            flags,
            Some(EdnsConfig {
                do_flag: true,
                bufsize: self.config.payload_size,
            }),
        )
        .context("Could not create query.")?;
        msg.encode().context("Could not encode query.")
    }

    /// Sends a query to one nameserver, retrying over TCP when the UDP answer is truncated.
    fn exchange(&self, nameserver: &Nameserver, data: &[u8]) -> Result<Message> {
        let (payload, _) =
            send_query_udp(nameserver, self.config.payload_size, self.config.timeout, data)?;

        match Message::parse(&mut Cursor::new(&payload)) {
            Ok(msg) => Ok(msg),
            Err(ParseError::TruncatedMessage) => {
                let (payload, _) = send_query_tcp(nameserver, self.config.timeout, data)?;
                Message::parse(&mut Cursor::new(&payload))
                    .context("Could not parse TCP answer.")
            }
            Err(e) => Err(e).context("Could not parse answer."),
        }
    }

    /// Queries the configured resolvers in order until one of them produces a usable answer.
    fn resolve(&self, name: &Name, rtype: RecordType) -> QueryOutcome {
        let data = match self.prepare_query(name, rtype) {
            Ok(data) => data,
            Err(_) => return QueryOutcome::Failed,
        };

        for ip in &self.config.nameservers {
            let nameserver = Nameserver {
                ip: *ip,
                port: self.config.port,
            };
            match self.exchange(&nameserver, &data) {
                Ok(msg) => match msg.header.rcode {
                    Some(RCode::NXDOMAIN) => return QueryOutcome::NxDomain,
                    Some(RCode::NOERROR) | None => return QueryOutcome::Answer(msg),
                    // SERVFAIL and friends: maybe the next resolver knows better
                    _ => continue,
                },
                Err(_) => continue,
            }
        }

        QueryOutcome::Failed
    }

    /// Performs a DNS query, treating NXDOMAIN, empty answers and transport failures alike.
    ///
    /// The caller sees either an answer message or nothing.
    pub fn query(&self, name: &str, rtype: RecordType) -> Option<Message> {
        let name = Name::from_ascii(name).ok()?;
        match self.resolve(&name, rtype) {
            QueryOutcome::Answer(msg) => Some(msg),
            _ => None,
        }
    }

    /// Queries DNSKEY records for a zone, together with the RRSIGs covering them and any
    /// NSEC/NSEC3 records from the authority section (kept for display only).
    pub fn query_dnskeys(&self, zone: &str) -> ZoneInfo {
        let mut zone_info = ZoneInfo::new(zone);

        let name = match Name::from_ascii(zone) {
            Ok(name) => name,
            Err(_) => return zone_info,
        };

        match self.resolve(&name, RecordType::DNSKEY) {
            QueryOutcome::Answer(msg) => {
                for record in msg.answers.iter().filter_map(Record::as_nonopt) {
                    match record.rdata() {
                        Rdata::DNSKEY(dnskey) => {
                            zone_info.dnskeys.push(codec::dnskey_info(dnskey));
                        }
                        Rdata::RRSIG(rrsig) if rrsig.type_covered == RecordType::DNSKEY => {
                            zone_info.rrsigs.push(codec::rrsig_info(rrsig));
                        }
                        _ => {}
                    }
                }
                for record in msg.authoritative_answers.iter().filter_map(Record::as_nonopt) {
                    match record.rdata() {
                        Rdata::NSEC(nsec) => zone_info.nsec_records.push(codec::nsec_info(nsec)),
                        Rdata::NSEC3(nsec3) => {
                            zone_info.nsec_records.push(codec::nsec3_info(nsec3));
                        }
                        _ => {}
                    }
                }
            }
            QueryOutcome::NxDomain => zone_info.nxdomain = true,
            QueryOutcome::Failed => {}
        }

        zone_info
    }

    /// Queries DS records for a zone. The records live in the parent zone; the recursive resolver
    /// handles that transparently.
    pub fn query_ds(&self, zone: &str) -> Vec<DsInfo> {
        let mut ds_records = Vec::new();
        if let Some(msg) = self.query(zone, RecordType::DS) {
            for record in msg.answers.iter().filter_map(Record::as_nonopt) {
                if let Rdata::DS(ds) = record.rdata() {
                    ds_records.push(codec::ds_info(ds));
                }
            }
        }
        ds_records
    }

    /// Queries the common records at a domain's apex (SOA, NS, A, AAAA, MX, TXT) plus the DMARC
    /// policy at `_dmarc.<domain>`. TXT values carrying SPF/DMARC policies are relabelled.
    ///
    /// For each answer, the first RRSIG present is captured and marks the records as signed. NS
    /// entries get a best-effort forward A lookup appended to their value.
    pub fn query_additional_records(&self, domain: &str) -> Vec<AdditionalRecord> {
        let mut records = Vec::new();

        let fqdn = if domain.ends_with('.') {
            domain.to_string()
        } else {
            format!("{}.", domain)
        };

        let queries = [
            (fqdn.clone(), RecordType::SOA),
            (fqdn.clone(), RecordType::NS),
            (fqdn.clone(), RecordType::A),
            (fqdn.clone(), RecordType::AAAA),
            (fqdn.clone(), RecordType::MX),
            (fqdn.clone(), RecordType::TXT),
            (format!("_dmarc.{}", fqdn), RecordType::TXT),
        ];

        for (qname, rtype) in queries {
            let msg = match self.query(&qname, rtype) {
                Some(msg) => msg,
                None => continue,
            };

            let rrsig = msg
                .answers
                .iter()
                .filter_map(Record::as_nonopt)
                .find_map(|rec| rec.rdata().as_rrsig())
                .map(codec::rrsig_info);
            let is_signed = rrsig.is_some();

            for record in msg.answers.iter().filter_map(Record::as_nonopt) {
                if record.rtype != rtype {
                    continue;
                }

                let value = match record.rdata() {
                    Rdata::TXT(txt) => txt.joined(),
                    Rdata::NS(ns) => {
                        let host = ns.name.to_fqdn();
                        match self.lookup_ipv4(&ns.name) {
                            Some(ip) => format!("{} ({})", host, ip),
                            None => host,
                        }
                    }
                    other => other.to_string(),
                };

                records.push(AdditionalRecord {
                    record_type: additional_record_type(&qname, rtype, &value),
                    name: qname.clone(),
                    value,
                    ttl: record.ttl,
                    is_signed,
                    rrsig: rrsig.clone(),
                });
            }
        }

        records
    }

    /// Best-effort forward lookup of a hostname's first IPv4 address.
    fn lookup_ipv4(&self, name: &Name) -> Option<Ipv4Addr> {
        match self.resolve(name, RecordType::A) {
            QueryOutcome::Answer(msg) => msg
                .answers
                .iter()
                .filter_map(Record::as_nonopt)
                .find_map(|rec| rec.rdata().as_a())
                .map(|a| a.address),
            _ => None,
        }
    }

    /// Discovers a zone's authoritative nameservers as (hostname, IP) pairs.
    ///
    /// Entries whose address cannot be resolved are skipped silently.
    pub fn get_authoritative_nameservers(&self, zone: &str) -> Vec<(String, IpAddr)> {
        let mut servers = Vec::new();

        if let Some(msg) = self.query(zone, RecordType::NS) {
            for record in msg.answers.iter().filter_map(Record::as_nonopt) {
                if let Rdata::NS(ns) = record.rdata() {
                    if let Some(ip) = self.lookup_ipv4(&ns.name) {
                        servers.push((ns.name.to_fqdn(), IpAddr::V4(ip)));
                    }
                }
            }
        }

        servers
    }

    /// Sends a single DNSKEY query (randomised id, DO bit set) straight to an authoritative
    /// server over UDP and reports which key tags it serves and whether any RRSIG came back.
    ///
    /// A timeout or socket error leaves `responded` false and fills `error`.
    pub fn query_nameserver_direct(
        &self,
        ip: IpAddr,
        zone: &str,
        timeout: Duration,
    ) -> ServerResponse {
        let mut response = ServerResponse {
            server_ip: ip.to_string(),
            server_name: String::new(),
            responded: false,
            error: None,
            response_time_ms: 0.0,
            dnskey_tags: Vec::new(),
            has_rrsig: false,
        };

        let name = match Name::from_ascii(zone) {
            Ok(name) => name,
            Err(e) => {
                response.error = Some(e.to_string());
                return response;
            }
        };
        let data = match self.prepare_query(&name, RecordType::DNSKEY) {
            Ok(data) => data,
            Err(e) => {
                response.error = Some(e.to_string());
                return response;
            }
        };

        let nameserver = Nameserver::new(ip);
        let (payload, elapsed) =
            match send_query_udp(&nameserver, self.config.payload_size, timeout, &data) {
                Ok(res) => res,
                Err(e) => {
                    response.error = Some(e.to_string());
                    return response;
                }
            };

        match Message::parse(&mut Cursor::new(&payload)) {
            Ok(msg) => {
                response.responded = true;
                response.response_time_ms = elapsed.as_secs_f64() * 1000.0;
                for record in msg.answers.iter().filter_map(Record::as_nonopt) {
                    match record.rdata() {
                        Rdata::DNSKEY(dnskey) => response.dnskey_tags.push(dnskey.key_tag()),
                        Rdata::RRSIG(_) => response.has_rrsig = true,
                        _ => {}
                    }
                }
            }
            Err(e) => response.error = Some(e.to_string()),
        }

        response
    }

    /// Queries up to `max_servers` of a zone's authoritative nameservers and checks that they
    /// agree on the zone's DNSKEY set.
    pub fn check_consistency(&self, zone: &str, max_servers: usize) -> ConsistencyResult {
        let servers: Vec<_> = self
            .get_authoritative_nameservers(zone)
            .into_iter()
            .take(max_servers)
            .collect();

        let mut responses = Vec::with_capacity(servers.len());
        for (hostname, ip) in &servers {
            let mut response = self.query_nameserver_direct(*ip, zone, self.config.timeout);
            response.server_name = hostname.clone();
            responses.push(response);
        }

        summarize_consistency(zone, servers.len(), responses)
    }

    /// Queries the complete DNSSEC chain for a domain: per zone the DNSKEY set, the DS set (not
    /// for the root), additional records for the terminal zone, and (when enabled) the
    /// cross-server consistency check for every non-root zone.
    ///
    /// Returns the zones root-first and the elapsed wall-clock time in milliseconds.
    pub fn query_zone_chain(&self, domain: &str, check_consistency: bool) -> (Vec<ZoneInfo>, f64) {
        let start = Instant::now();
        let hierarchy = Self::zone_hierarchy(domain);
        let mut zones = Vec::with_capacity(hierarchy.len());

        for (i, zone_name) in hierarchy.iter().enumerate() {
            let mut zone = self.query_dnskeys(zone_name);

            if i > 0 {
                zone.parent = Some(hierarchy[i - 1].clone());
            }

            if zone_name != "." {
                zone.ds_records = self.query_ds(zone_name);

                if i == hierarchy.len() - 1 {
                    zone.additional_records = self.query_additional_records(domain);
                }

                if check_consistency {
                    zone.consistency =
                        Some(self.check_consistency(zone_name, MAX_CONSISTENCY_SERVERS));
                }
            }

            zones.push(zone);
        }

        (zones, start.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Chooses the display label for an additional record: TXT values carrying an SPF policy become
/// "SPF", TXT values under a `_dmarc` label carrying a DMARC policy become "DMARC".
fn additional_record_type(name: &str, rtype: RecordType, value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    if rtype == RecordType::TXT && lower.contains("v=spf1") {
        return "SPF".into();
    }
    if name.contains("_dmarc") && lower.contains("v=dmarc1") {
        return "DMARC".into();
    }
    rtype.to_string()
}

/// Aggregates direct-query responses into a [`ConsistencyResult`].
///
/// A server that did not respond is reported as an issue but does not alone make the zone
/// inconsistent; a responding server with a diverging key tag set, or with DNSKEYs but no RRSIG,
/// does.
fn summarize_consistency(
    zone: &str,
    queried: usize,
    responses: Vec<ServerResponse>,
) -> ConsistencyResult {
    let mut result = ConsistencyResult {
        zone_name: zone.to_string(),
        nameservers_queried: queried,
        nameservers_responded: 0,
        is_consistent: true,
        issues: Vec::new(),
        server_responses: Vec::new(),
    };

    let mut reference: Option<(String, BTreeSet<u16>)> = None;

    for response in &responses {
        if !response.responded {
            let error = response.error.as_deref().unwrap_or("no response");
            result.issues.push(format!(
                "{} ({}) did not respond: {}",
                response.server_name, response.server_ip, error
            ));
            continue;
        }

        result.nameservers_responded += 1;
        let tags: BTreeSet<u16> = response.dnskey_tags.iter().copied().collect();

        if !response.dnskey_tags.is_empty() && !response.has_rrsig {
            result.issues.push(format!(
                "{} returned DNSKEYs without any RRSIG",
                response.server_name
            ));
            result.is_consistent = false;
        }

        match &reference {
            None => reference = Some((response.server_name.clone(), tags)),
            Some((reference_name, reference_tags)) => {
                if &tags != reference_tags {
                    result.issues.push(format!(
                        "{} returned DNSKEY tags {:?}, but {} returned {:?}",
                        response.server_name,
                        tags.iter().collect::<Vec<_>>(),
                        reference_name,
                        reference_tags.iter().collect::<Vec<_>>()
                    ));
                    result.is_consistent = false;
                }
            }
        }
    }

    result.server_responses = responses;
    result
}

#[cfg(test)]
mod tests {
    use crate::chain::ServerResponse;
    use dnsvet_proto::RecordType;

    use super::{additional_record_type, summarize_consistency, Resolver};

    #[test]
    fn hierarchy_is_root_first() {
        assert_eq!(
            Resolver::zone_hierarchy("www.example.co.uk"),
            [".", "uk.", "co.uk.", "example.co.uk.", "www.example.co.uk."]
        );
    }

    #[test]
    fn hierarchy_ignores_trailing_dot() {
        assert_eq!(
            Resolver::zone_hierarchy("example.com"),
            Resolver::zone_hierarchy("example.com.")
        );
    }

    #[test]
    fn hierarchy_of_bare_tld() {
        assert_eq!(Resolver::zone_hierarchy("com"), [".", "com."]);
    }

    #[test]
    fn hierarchy_of_deep_name_has_one_entry_per_label_plus_root() {
        let hierarchy = Resolver::zone_hierarchy("a.b.c.d.example.com");
        assert_eq!(hierarchy.len(), 7);
        assert_eq!(hierarchy[0], ".");
        assert_eq!(hierarchy[6], "a.b.c.d.example.com.");
    }

    #[test]
    fn hierarchy_of_root_is_just_root() {
        assert_eq!(Resolver::zone_hierarchy("."), ["."]);
    }

    #[test]
    fn txt_policies_are_relabelled() {
        assert_eq!(
            additional_record_type("example.com.", RecordType::TXT, "V=SPF1 include:_spf.example.com ~all"),
            "SPF"
        );
        assert_eq!(
            additional_record_type("_dmarc.example.com.", RecordType::TXT, "v=DMARC1; p=reject"),
            "DMARC"
        );
        assert_eq!(
            additional_record_type("example.com.", RecordType::TXT, "some-verification=abc"),
            "TXT"
        );
        assert_eq!(
            additional_record_type("example.com.", RecordType::MX, "10 mail.example.com"),
            "MX"
        );
    }

    fn server(name: &str, responded: bool, tags: &[u16], has_rrsig: bool) -> ServerResponse {
        ServerResponse {
            server_ip: "192.0.2.1".into(),
            server_name: name.into(),
            responded,
            error: if responded {
                None
            } else {
                Some("timed out".into())
            },
            response_time_ms: 1.0,
            dnskey_tags: tags.to_vec(),
            has_rrsig,
        }
    }

    #[test]
    fn agreeing_servers_are_consistent() {
        let result = summarize_consistency(
            "example.com.",
            2,
            vec![
                server("ns1.example.com.", true, &[20326, 38696], true),
                server("ns2.example.com.", true, &[38696, 20326], true),
            ],
        );
        assert!(result.is_consistent);
        assert_eq!(result.nameservers_responded, 2);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn diverging_key_sets_are_flagged() {
        let result = summarize_consistency(
            "example.com.",
            2,
            vec![
                server("ns1.example.com.", true, &[1111], true),
                server("ns2.example.com.", true, &[2222], true),
            ],
        );
        assert!(!result.is_consistent);
        assert!(result.issues.iter().any(|i| i.contains("ns2.example.com.")));
    }

    #[test]
    fn unresponsive_server_alone_does_not_flip_consistency() {
        let result = summarize_consistency(
            "example.com.",
            2,
            vec![
                server("ns1.example.com.", true, &[1111], true),
                server("ns2.example.com.", false, &[], false),
            ],
        );
        assert!(result.is_consistent);
        assert_eq!(result.nameservers_responded, 1);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn dnskeys_without_rrsig_flip_consistency() {
        let result = summarize_consistency(
            "example.com.",
            1,
            vec![server("ns1.example.com.", true, &[1111], false)],
        );
        assert!(!result.is_consistent);
        assert!(result.issues[0].contains("without any RRSIG"));
    }
}
