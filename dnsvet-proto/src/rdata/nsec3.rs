//! `NSEC3` RDATA definition.

use std::fmt::Display;
use std::io::{Read, Write};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use data_encoding::{BASE32_DNSSEC, HEXUPPER};
use repr_with_fallback::repr_with_fallback;

use crate::error::{EncodeError, ParseError};
use crate::RecordType;

use super::nsec::NSEC;
use super::{Rdata, RdataTrait};

repr_with_fallback! {
    /// Hashing algorithms for use in [`NSEC3`] records.
    ///
    /// See <https://www.iana.org/assignments/dnssec-nsec3-parameters/dnssec-nsec3-parameters.xhtml>
    /// for the official list.
    #[derive(PartialEq, Eq, Copy, Clone, Debug)]
    #[non_exhaustive]
    pub enum HashAlgorithm {
        SHA1 = 1,
        Unassigned(u8), // 0, 2-255 (technically, 0 is Reserved, but we treat it as Unassigned)
    }
}

/// A record providing authenticated denial of existence for DNS record sets.
/// [\[RFC 5155\]](https://www.rfc-editor.org/rfc/rfc5155)
///
/// This serves the same purpose as an [`NSEC`][super::nsec::NSEC] record, but makes it harder to
/// enumerate all records in the zone by only containing a hash of the next owner name.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct NSEC3 {
    /// The cryptographic hash algorithm used to construct the hash-value.
    pub hash_algorithm: HashAlgorithm,
    /// Indicates whether this `NSEC3` record may cover unsigned delegations.
    pub opt_out: bool,
    /// The number of additional times the hash function has been performed.
    pub iterations: u16,
    /// If not [`None`], this is appended to the original owner name before hashing in order to
    /// defend against pre-calculated dictionary attacks.
    pub salt: Option<Vec<u8>>,
    /// The next hashed owner name in hash order.
    ///
    /// This is the unmodified binary hash value, not base32 encoded (unlike the owner name of the
    /// `NSEC3` record itself). It does not include the name of the containing zone.
    pub next_hashed_owner: Vec<u8>,
    /// The record set types that exist at the original owner name of the `NSEC3` record.
    pub types: Vec<RecordType>,
}

impl NSEC3 {
    fn encode_flags(&self) -> u8 {
        if self.opt_out {
            1
        } else {
            0
        }
    }

    /// Returns the next hashed owner name in its display form (base32, per RFC 5155).
    pub fn next_hashed_owner_base32(&self) -> String {
        BASE32_DNSSEC.encode(&self.next_hashed_owner)
    }

    /// Returns the salt as lowercase hex, or an empty string when there is no salt.
    pub fn salt_hex(&self) -> String {
        match &self.salt {
            None => String::new(),
            Some(salt) => data_encoding::HEXLOWER.encode(salt),
        }
    }
}

impl RdataTrait for NSEC3 {
    fn parse_rdata(rdata: &mut std::io::Cursor<&[u8]>, rdlength: u16) -> Result<Rdata, ParseError> {
        let hash_algorithm: HashAlgorithm = rdata.read_u8()?.into();
        let flags = rdata.read_u8()?;
        let opt_out = (flags & 1) != 0;
        let iterations = rdata.read_u16::<NetworkEndian>()?;
        let salt_length = rdata.read_u8()?;
        let salt = if salt_length != 0 {
            let mut salt = vec![0; salt_length as usize];
            rdata.read_exact(&mut salt)?;
            Some(salt)
        } else {
            None
        };
        let hash_length = rdata.read_u8()?;
        let mut next_hashed_owner = vec![0; hash_length as usize];
        rdata.read_exact(&mut next_hashed_owner)?;
        // we already read: u8 (1) + u8 (1) + u16 (2) + u8 (1) + salt_length + u8 (1) + hash_length
        let bytes_read = 6 + salt_length as u16 + hash_length as u16;
        let types = NSEC::parse_type_bitmap(rdata, bytes_read, rdlength)?;

        Ok(Rdata::NSEC3(Self {
            hash_algorithm,
            opt_out,
            iterations,
            salt,
            next_hashed_owner,
            types,
        }))
    }

    fn encode_rdata_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        buf.write_u8(self.hash_algorithm.into())?;
        buf.write_u8(self.encode_flags())?;
        buf.write_u16::<NetworkEndian>(self.iterations)?;

        if let Some(salt) = &self.salt {
            buf.write_u8(salt.len() as u8)?;
            buf.write_all(salt)?;
        } else {
            buf.write_u8(0)?;
        }

        buf.write_u8(self.next_hashed_owner.len() as u8)?;
        buf.write_all(&self.next_hashed_owner)?;

        let bytes_written = 1
            + 1
            + 2
            + 1
            + self.salt.as_ref().map(|s| s.len()).unwrap_or_default()
            + 1
            + self.next_hashed_owner.len();

        Ok(bytes_written as u16 + NSEC::encode_type_bitmap_into(&self.types, buf)?)
    }
}

impl Display for NSEC3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hash_algorithm: u8 = self.hash_algorithm.into();
        let salt = match &self.salt {
            None => "-".into(),
            Some(salt) => HEXUPPER.encode(salt),
        };
        let types: Vec<_> = self.types.iter().map(ToString::to_string).collect();
        let types = types.join(" ");
        write!(
            f,
            "{} {} {} {} {} {}",
            hash_algorithm,
            self.encode_flags(),
            self.iterations,
            salt,
            self.next_hashed_owner_base32(),
            types,
        )
    }
}
