//! `DNSKEY` RDATA definition.

use std::{
    fmt::Display,
    io::{Read, Write},
};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use data_encoding::BASE64;
use repr_with_fallback::repr_with_fallback;

use crate::error::{EncodeError, ParseError};

use super::{Rdata, RdataTrait};

repr_with_fallback! {
    /// Algorithms for use in zone signing.
    ///
    /// See <https://www.iana.org/assignments/dns-sec-alg-numbers/dns-sec-alg-numbers.xhtml> for the
    /// official list.
    #[derive(PartialEq, Eq, Copy, Clone, Debug)]
    #[non_exhaustive]
    #[allow(non_camel_case_types)]
    pub enum Algorithm {
        /// Obsolete; its key tag is computed differently from all other algorithms (see
        /// [`DNSKEY::key_tag()`]).
        RSAMD5 = 1,
        /// DON'T USE THIS! DSA is not considered secure anymore, and this is only provided for
        /// compatibility.
        DSA = 3,
        /// DON'T USE THIS! SHA1 is not considered secure anymore, and this is only provided for
        /// compatibility.
        RSASHA1 = 5,
        /// DON'T USE THIS! DSA and SHA1 are not considered secure anymore, and this is only
        /// provided for compatibility.
        DSA_NSEC3_SHA1 = 6,
        /// DON'T USE THIS! SHA1 is not considered secure anymore, and this is only provided for
        /// compatibility.
        RSASHA1_NSEC3_SHA1 = 7,
        /// RSA with SHA256 [\[RFC 5702\]](https://www.rfc-editor.org/rfc/rfc5702)
        RSASHA256 = 8,
        /// RSA with SHA512 [\[RFC 5702\]](https://www.rfc-editor.org/rfc/rfc5702)
        RSASHA512 = 10,
        /// GOST R 34.10-2001 [\[RFC 5933\]](https://www.rfc-editor.org/rfc/rfc5933)
        ECC_GOST = 12,
        /// ECDSA Curve P-256 with SHA-256 [\[RFC 6605\]](https://www.rfc-editor.org/rfc/rfc6605)
        ECDSAP256SHA256 = 13,
        /// ECDSA Curve P-384 with SHA-384 [\[RFC 6605\]](https://www.rfc-editor.org/rfc/rfc6605)
        ECDSAP384SHA384 = 14,
        /// Ed25519 [\[RFC 8080\]](https://www.rfc-editor.org/rfc/rfc8080)
        ED25519 = 15,
        /// Ed448 [\[RFC 8080\]](https://www.rfc-editor.org/rfc/rfc8080)
        ED448 = 16,
        Unassigned(u8),
    }
}

/// A record containing the public key used to sign record sets of the zone.
/// [\[RFC 4034\]](https://www.rfc-editor.org/rfc/rfc4034)
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DNSKEY {
    /// Indicates whether this key is used to sign record sets.
    pub zone: bool,
    /// A key is considered revoked when the resolver sees the key in a self-signed record set and
    /// the key has this set to true. [\[RFC 5011\]](https://www.rfc-editor.org/rfc/rfc5011)
    pub revoked: bool,
    /// Indicates whether this key is a key signing key (KSK), i.e. used to sign the key(s) that
    /// sign record sets.
    pub secure_entry_point: bool,

    // the wire format also contains a "Protocol" field, but that must always be 3 (see
    // https://www.iana.org/assignments/dns-key-rr/dns-key-rr.xhtml), so we don't store it
    // explicitly
    /// The public key's cryptographic algorithm; determines the format of [`Self::key`].
    pub algorithm: Algorithm,
    pub key: Vec<u8>,
}

impl DNSKEY {
    /// Calculates this key's key tag. Key tags are used in [`RRSIG`](super::RRSIG) and
    /// [`DS`](super::DS) records to "help select the corresponding `DNSKEY` record efficiently when
    /// more than one candidate `DNSKEY` record is available."
    /// [\[RFC 4034\]](https://www.rfc-editor.org/rfc/rfc4034)
    ///
    /// For algorithm 1 (RSA/MD5) the tag is read directly out of the trailing modulus octets; for
    /// every other algorithm it is the ones-complement-style fold of the RDATA from RFC 4034,
    /// Appendix B.
    ///
    /// # Note from [RFC 4034](https://www.rfc-editor.org/rfc/rfc4034)
    /// However, it is essential to note that the key tag is not a unique identifier. It is
    /// theoretically possible for two distinct `DNSKEY` records to have the same owner name, the
    /// same algorithm, and the same key tag. Implementations MUST NOT assume that the key tag
    /// uniquely identifies a `DNSKEY` record.
    pub fn key_tag(&self) -> u16 {
        if self.algorithm == Algorithm::RSAMD5 {
            let n = self.key.len();
            if n < 3 {
                return 0;
            }
            return ((self.key[n - 3] as u16) << 8) | self.key[n - 2] as u16;
        }

        // This is a translation of the C reference code from RFC 4034, Appendix B
        let mut key_data = Vec::with_capacity(self.key.len() + 4);
        self.encode_rdata_into(&mut key_data)
            .expect("encoding DNSKEY into vector failed");
        let mut ac = 0u32;
        for (i, byte) in key_data.iter().enumerate() {
            let byte = *byte as u32;
            ac += if (i & 1) != 0 { byte } else { byte << 8 };
        }
        ac += (ac >> 16) & 0xFFFF;
        (ac & 0xFFFF) as u16
    }

    /// Returns the wire-format flags field (zone, revoked, and SEP bits).
    pub fn flags(&self) -> u16 {
        let zone = if self.zone { 1 << 8 } else { 0 };
        let revoked = if self.revoked { 1 << 7 } else { 0 };
        let secure_entry_point = if self.secure_entry_point { 1 } else { 0 };
        zone | revoked | secure_entry_point
    }
}

impl RdataTrait for DNSKEY {
    fn parse_rdata(rdata: &mut std::io::Cursor<&[u8]>, rdlength: u16) -> Result<Rdata, ParseError> {
        let flags = rdata.read_u16::<NetworkEndian>()?;
        let zone = (flags & (1 << 8)) != 0;
        let revoked = (flags & (1 << 7)) != 0;
        let secure_entry_point = (flags & 1) != 0;

        let protocol = rdata.read_u8()?;
        if protocol != 3 {
            return Err(ParseError::InvalidDnskeyProtocol(protocol));
        }

        let algorithm: Algorithm = rdata.read_u8()?.into();

        // we already read: u16 (2) + u8 (1) + u8 (1) = 4 bytes
        let mut key = vec![0; (rdlength - 4) as usize];
        rdata.read_exact(&mut key)?;

        Ok(Rdata::DNSKEY(Self {
            zone,
            revoked,
            secure_entry_point,
            algorithm,
            key,
        }))
    }

    fn encode_rdata_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        buf.write_u16::<NetworkEndian>(self.flags())?;
        // protocol must always be 3
        buf.write_u8(3)?;
        buf.write_u8(self.algorithm.into())?;
        buf.write_all(&self.key)?;

        Ok(self.key.len() as u16 + 2 + 1 + 1)
    }
}

impl Display for DNSKEY {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = BASE64.encode(&self.key);
        write!(f, "{} 3 {:?} {}", self.flags(), self.algorithm, key)
    }
}
