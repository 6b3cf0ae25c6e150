//! RDATA type definitions.

use std::fmt::Display;
use std::io::{Cursor, Read, Write};

use byteorder::ReadBytesExt;
use data_encoding::HEXUPPER;

use crate::error::{EncodeError, ParseError};
use crate::RecordType;

pub mod a;
pub mod aaaa;
pub mod cname;
pub mod dnskey;
pub mod ds;
pub mod mx;
pub mod ns;
pub mod nsec;
pub mod nsec3;
pub mod opt;
pub mod rrsig;
pub mod soa;
pub mod txt;

pub use a::A;
pub use aaaa::AAAA;
pub use cname::CNAME;
pub use dnskey::DNSKEY;
pub use ds::DS;
pub use mx::MX;
pub use ns::NS;
pub use nsec::NSEC;
pub use nsec3::NSEC3;
pub use opt::OPT;
pub use rrsig::RRSIG;
pub use soa::SOA;
pub use txt::TXT;

/// The record data (RDATA) for a [`Record`][super::Record].
#[derive(PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum Rdata {
    A(A),
    NS(NS),
    CNAME(CNAME),
    SOA(SOA),
    MX(MX),
    TXT(TXT),
    AAAA(AAAA),
    OPT(OPT),
    DS(DS),
    RRSIG(RRSIG),
    NSEC(NSEC),
    DNSKEY(DNSKEY),
    NSEC3(NSEC3),

    /// Unknown RDATA, containing the raw RDATA bytes.
    Unknown(Vec<u8>),
}

/// A trait for working with the different RDATA variants.
pub trait RdataTrait: Sized + Display {
    /// Parses the RDATA from the encoded bytes, starting at `rdata`'s current position in the
    /// slice.
    ///
    /// `rdata` is a [`Cursor`] wrapping the complete DNS message that contains the RDATA. It is
    /// important that the slice contains the complete message, as this is needed for handling DNS
    /// message compression: it is necessary to be able to jump to a specific byte position in the
    /// message.
    ///
    /// `rdlength` is the byte count of the encoded RDATA that will be parsed.
    fn parse_rdata(rdata: &mut Cursor<&[u8]>, rdlength: u16) -> Result<Rdata, ParseError>;

    /// Encodes the RDATA into the given `buf` and returns the number of written bytes on success.
    ///
    /// If an error is returned, no guarantees for the state of `buf` are given.
    fn encode_rdata_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError>;

    /// Encodes the RDATA and returns the encoded bytes.
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut rdata = Vec::new();
        self.encode_rdata_into(&mut rdata)?;
        Ok(rdata)
    }
}

#[doc(hidden)]
macro_rules! impl_from_rtype {
    ($variant:ident) => {
        impl From<$variant> for Rdata {
            fn from(rdata: $variant) -> Self {
                Self::$variant(rdata)
            }
        }
    };
}

#[doc(hidden)]
macro_rules! impl_as_rtype {
    ($method:ident, $variant:ident, $doc:expr) => {
        #[doc = "Returns a reference to the inner [`"]
        #[doc = $doc]
        #[doc = "`] when called on the `"]
        #[doc = $doc]
        #[doc = "` variant. For all other variants, returns [`None`]."]
        pub fn $method(&self) -> Option<&$variant> {
            if let Self::$variant(inner) = self {
                Some(inner)
            } else {
                None
            }
        }
    };

    ($method:ident, $variant:ident) => {
        impl_as_rtype!($method, $variant, stringify!($variant));
    };
}

/// Match on every [`Rdata`] variant and execute a block for it.
///
/// Matches $self, using $arm as the match arm for the non-[`Rdata::Unknown`] variants and
/// $unknown_arm as the match arm for the [`Rdata::Unknown`] variant. $inner and $inner_unknown are
/// the identifiers for the inner field that can be used in $arm and $unknown_arm, respectively.
#[macro_export]
macro_rules! match_rdata {
    ($self:ident, $inner:ident, $arm:block, $inner_unknown:ident, $unknown_arm:block) => {
        match $self {
            Rdata::A($inner) => $arm,
            Rdata::NS($inner) => $arm,
            Rdata::CNAME($inner) => $arm,
            Rdata::SOA($inner) => $arm,
            Rdata::MX($inner) => $arm,
            Rdata::TXT($inner) => $arm,
            Rdata::AAAA($inner) => $arm,
            Rdata::OPT($inner) => $arm,
            Rdata::DS($inner) => $arm,
            Rdata::RRSIG($inner) => $arm,
            Rdata::NSEC($inner) => $arm,
            Rdata::DNSKEY($inner) => $arm,
            Rdata::NSEC3($inner) => $arm,
            Rdata::Unknown($inner_unknown) => $unknown_arm,
        }
    };
}

impl Rdata {
    /// See [`RdataTrait::encode()`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        match_rdata!(self, rdata, { rdata.encode() }, unknown_rdata, {
            Ok(unknown_rdata.clone())
        })
    }

    /// See [`RdataTrait::encode_rdata_into()`].
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        match_rdata!(
            self,
            rdata,
            { rdata.encode_rdata_into(buf) },
            unknown_rdata,
            {
                buf.write_all(unknown_rdata)?;
                Ok(unknown_rdata.len() as u16)
            }
        )
    }

    /// Returns the [`RecordType`] that matches this `RDATA`.
    ///
    /// # Note
    /// As [`Rdata::Unknown`] does not know its type, calling this method on it will return
    /// [`RecordType::Unknown(0)`].
    pub fn rtype(&self) -> RecordType {
        match self {
            Rdata::A(_) => RecordType::A,
            Rdata::NS(_) => RecordType::NS,
            Rdata::CNAME(_) => RecordType::CNAME,
            Rdata::SOA(_) => RecordType::SOA,
            Rdata::MX(_) => RecordType::MX,
            Rdata::TXT(_) => RecordType::TXT,
            Rdata::AAAA(_) => RecordType::AAAA,
            Rdata::OPT(_) => RecordType::OPT,
            Rdata::DS(_) => RecordType::DS,
            Rdata::RRSIG(_) => RecordType::RRSIG,
            Rdata::NSEC(_) => RecordType::NSEC,
            Rdata::DNSKEY(_) => RecordType::DNSKEY,
            Rdata::NSEC3(_) => RecordType::NSEC3,
            Rdata::Unknown(_) => RecordType::Unknown(0),
        }
    }

    impl_as_rtype!(as_a, A);
    impl_as_rtype!(as_ns, NS);
    impl_as_rtype!(as_cname, CNAME);
    impl_as_rtype!(as_soa, SOA);
    impl_as_rtype!(as_mx, MX);
    impl_as_rtype!(as_txt, TXT);
    impl_as_rtype!(as_aaaa, AAAA);
    impl_as_rtype!(as_opt, OPT);
    impl_as_rtype!(as_ds, DS);
    impl_as_rtype!(as_rrsig, RRSIG);
    impl_as_rtype!(as_nsec, NSEC);
    impl_as_rtype!(as_dnskey, DNSKEY);
    impl_as_rtype!(as_nsec3, NSEC3);
}

impl_from_rtype!(A);
impl_from_rtype!(NS);
impl_from_rtype!(CNAME);
impl_from_rtype!(SOA);
impl_from_rtype!(MX);
impl_from_rtype!(TXT);
impl_from_rtype!(AAAA);
impl_from_rtype!(OPT);
impl_from_rtype!(DS);
impl_from_rtype!(RRSIG);
impl_from_rtype!(NSEC);
impl_from_rtype!(DNSKEY);
impl_from_rtype!(NSEC3);

impl Display for Rdata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match_rdata!(self, rdata, { write!(f, "{}", rdata) }, data, {
            write!(f, "\\# {} {}", data.len(), HEXUPPER.encode(data))
        })
    }
}

/// Parses a character string as defined in [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035),
/// i.e. reads a length byte and then the number of ASCII characters specified by the length byte.
///
/// Returns the parsed string and the number of bytes read.
pub fn parse_string(msg: &mut Cursor<&[u8]>) -> Result<(String, usize), ParseError> {
    let length = msg.read_u8()?;
    let mut string = vec![0; length as usize];
    msg.read_exact(&mut string)?;

    let string = String::from_utf8_lossy(&string).into_owned();
    if !string.is_ascii() {
        return Err(ParseError::NonAsciiString(string));
    }

    // + 1 because we also need to count the length byte
    let bytes_read = string.len() + 1;
    Ok((string, bytes_read))
}

/// Encodes a string as a character string as defined in
/// [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035), i.e. writes the length of the string as a
/// byte and then the string bytes, into the given `buf`.
///
/// `string` must consist of only ASCII characters.
///
/// Returns the number of bytes written on success.
pub fn encode_string_into(
    string: impl AsRef<str>,
    buf: &mut impl Write,
) -> Result<u16, EncodeError> {
    let string = string.as_ref();

    if !string.is_ascii() {
        return Err(EncodeError::NonAsciiString(string.to_string()));
    }

    let len = string.len();
    buf.write_all(&(len as u8).to_be_bytes())?;
    write!(buf, "{}", string)?;
    Ok(1 + len as u16)
}
