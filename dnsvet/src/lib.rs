//! `dnsvet` validates the DNSSEC chain of trust for a target domain: starting from the IANA root
//! trust anchors it walks the zone hierarchy down to the target, checks the DS→DNSKEY linkage and
//! the RRSIG validity windows at every delegation, compares DNSKEY sets across authoritative
//! nameservers, and reports every zone as SECURE, INSECURE, BOGUS or INDETERMINATE.
//!
//! The crate splits into the [`resolver`] (fetches DNSKEY/DS/RRSIG and the target's apex
//! records), the [`chain`] data model, the [`validator`] (classifies zones and the whole chain),
//! and [`export`] (JSON and text reports). Wire-format parsing lives in the `dnsvet-proto`
//! crate.
//!
//! A validation run is synchronous and produces one immutable [`chain::TrustChain`]; everything
//! in it is `Send`, so callers with a UI run the validation on a worker thread and ship the
//! finished chain back.

pub mod chain;
pub mod codec;
pub mod export;
pub mod net;
pub mod resolver;
pub mod validator;
