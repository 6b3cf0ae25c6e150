//! `RRSIG` RDATA definition.

use std::fmt::Display;
use std::io::{Read, Write};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use chrono::{TimeZone, Utc};
use data_encoding::BASE64;

use crate::error::{EncodeError, ParseError};
use crate::name::{Compression, Name};
use crate::RecordType;

use super::dnskey::Algorithm;
use super::{Rdata, RdataTrait};

// for easier rustdoc links
#[allow(unused_imports)]
use super::dnskey::DNSKEY;

/// A record storing the digital signature for a resource record set with a particular name, class,
/// and type. This signature can be verified using the public key stored in the matching [`DNSKEY`]
/// record. [\[RFC 4034\]](https://www.rfc-editor.org/rfc/rfc4034)
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RRSIG {
    /// The type of the record set covered by this record.
    pub type_covered: RecordType,
    /// The cryptographic algorithm used to create the signature.
    pub algorithm: Algorithm,
    /// The number of labels in the original `RRSIG` record owner name.
    ///
    /// A validator uses this to determine whether the answer was synthesized from a wildcard.
    /// The value MUST NOT count either the null (root) label that terminates the owner name or the
    /// wildcard label (if present): "www.example.com" has a value of 3, "*.example.com." has a
    /// value of 2, and root (".") has a value of 0.
    pub labels: u8,
    /// The TTL of the covered record set as it appears in the authoritative zone.
    pub original_ttl: u32,
    /// The end of the validity period for the signature, in the form of a 32-bit unsigned number
    /// of seconds elapsed since 1 January 1970 00:00:00 UTC, ignoring leap seconds.
    ///
    /// Values past the 32-bit wrap-around point (year 2106) are not handled.
    pub signature_expiration: u32,
    /// The start of the validity period for the signature. See [`Self::signature_expiration`] for
    /// the format.
    pub signature_inception: u32,
    /// The key tag of the [`DNSKEY`] record that validates this signature.
    ///
    /// See [`DNSKEY::key_tag()`].
    pub key_tag: u16,
    /// The owner name of the [`DNSKEY`] record that a validator is supposed to use to validate
    /// this signature.
    ///
    /// This MUST contain the name of the zone of the covered record set, and MUST NOT be
    /// compressed on the wire.
    pub signer_name: Name,
    /// The cryptographic signature. The format of this field depends on the algorithm in use.
    pub signature: Vec<u8>,
}

impl RdataTrait for RRSIG {
    fn parse_rdata(rdata: &mut std::io::Cursor<&[u8]>, rdlength: u16) -> Result<Rdata, ParseError> {
        // used to calculate how many bytes were read later on
        let rdata_pos_before = rdata.position();

        let type_covered: RecordType = rdata.read_u16::<NetworkEndian>()?.into();
        let algorithm: Algorithm = rdata.read_u8()?.into();
        let labels = rdata.read_u8()?;
        let original_ttl = rdata.read_u32::<NetworkEndian>()?;
        let signature_expiration = rdata.read_u32::<NetworkEndian>()?;
        let signature_inception = rdata.read_u32::<NetworkEndian>()?;
        let key_tag = rdata.read_u16::<NetworkEndian>()?;
        let signer_name = Name::parse(rdata, Compression::Prohibited)?;

        let rdata_pos_after = rdata.position();
        let bytes_read = (rdata_pos_after - rdata_pos_before) as usize;
        let mut signature = vec![0; rdlength as usize - bytes_read];
        rdata.read_exact(&mut signature)?;

        Ok(Rdata::RRSIG(Self {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            signature_expiration,
            signature_inception,
            key_tag,
            signer_name,
            signature,
        }))
    }

    fn encode_rdata_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        buf.write_u16::<NetworkEndian>(self.type_covered.into())?;
        buf.write_u8(self.algorithm.into())?;
        buf.write_u8(self.labels)?;
        buf.write_u32::<NetworkEndian>(self.original_ttl)?;
        buf.write_u32::<NetworkEndian>(self.signature_expiration)?;
        buf.write_u32::<NetworkEndian>(self.signature_inception)?;
        buf.write_u16::<NetworkEndian>(self.key_tag)?;
        let mut bytes_written = 2 + 1 + 1 + 4 + 4 + 4 + 2;
        bytes_written += self.signer_name.encode_into(buf)?;
        buf.write_all(&self.signature)?;

        Ok(bytes_written + self.signature.len() as u16)
    }
}

impl Display for RRSIG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let format_timestamp = |ts: u32| match Utc.timestamp_opt(ts as i64, 0) {
            chrono::LocalResult::Single(dt) => dt.format("%Y%m%d%H%M%S").to_string(),
            _ => ts.to_string(),
        };
        let signature = BASE64.encode(&self.signature);
        write!(
            f,
            "{} {:?} {} {} {} {} {} {} {}",
            self.type_covered,
            self.algorithm,
            self.labels,
            self.original_ttl,
            format_timestamp(self.signature_expiration),
            format_timestamp(self.signature_inception),
            self.key_tag,
            self.signer_name,
            signature
        )
    }
}
