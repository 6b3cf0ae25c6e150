//! `dnsvet-proto` provides the definition of the DNS protocol's data types as well as the means to
//! de-/serialize them from/to the wire format, covering the record types a DNSSEC chain-of-trust
//! check needs: DNSKEY, DS, RRSIG, NSEC/NSEC3 plus the common data types found at a zone apex
//! (SOA, NS, A, AAAA, MX, TXT).
//!
//! It is used as the backend for [`dnsvet`], a tool that walks the DNSSEC chain of trust from the
//! IANA root down to a target domain, but you can use this library on its own as well.
//!
//! # Basic usage example
//! ```rust
//! use dnsvet_proto::{EdnsConfig, HeaderFlags, Message, Name, Opcode, RecordType};
//!
//! let flags = HeaderFlags { aa: false, tc: false, rd: true, ra: false, ad: true, cd: true };
//! let msg = Message::new_query(
//!     Name::from_ascii("example.com").unwrap(),
//!     RecordType::DNSKEY,
//!     Opcode::QUERY,
//!     flags,
//!     Some(EdnsConfig { do_flag: true, bufsize: 4096 }),
//! ).unwrap();
//! let _encoded = msg.encode().unwrap();
//! ```
//!
//! [`dnsvet`]: ../dnsvet/index.html

use std::fmt::{self, Display};
use std::io::{Cursor, Read, Write};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use repr_with_fallback::repr_with_fallback;

pub mod dnssec;
pub mod error;
pub mod name;
pub mod rdata;

use error::{EncodeError, ParseError, ProtoError};
use rdata::{RdataTrait, OPT};

pub use name::Name;
pub use rdata::Rdata;

/// Represents a DNS OpCode.
///
/// See [here](https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-5)
/// for further information.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Opcode {
    QUERY,
    IQUERY,
    STATUS,
    NOTIFY,
    UPDATE,
    DSO,
}

/// Represents a DNS RCODE, including those introduced by EDNS.
///
/// See
/// [here](https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6)
/// for further information.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum RCode {
    NOERROR,
    FORMERR,
    SERVFAIL,
    NXDOMAIN,
    NOTIMP,
    REFUSED,
    YXDOMAIN,
    YXRRSET,
    NXRRSET,
    NOTAUTH,
    NOTZONE,
    DSOTYPENI,
    BADVERSBADSIG,
    BADKEY,
    BADTIME,
    BADMODE,
    BADNAME,
    BADALG,
    BADTRUNC,
    BADCOOKIE,
}

repr_with_fallback! {
    /// Represents a DNS TYPE.
    ///
    /// Only the types relevant for DNSSEC chain inspection are represented explicitly; everything
    /// else falls back to [`RecordType::Unknown`] and is carried as raw bytes.
    #[derive(PartialEq, Eq, Copy, Clone, Debug)]
    #[non_exhaustive]
    pub enum RecordType {
        A = 1,
        NS = 2,
        CNAME = 5,
        SOA = 6,
        MX = 15,
        TXT = 16,
        AAAA = 28,
        OPT = 41,
        DS = 43,
        RRSIG = 46,
        NSEC = 47,
        DNSKEY = 48,
        NSEC3 = 50,
        Unknown(u16),
    }
}

/// Represents a DNS CLASS.
///
/// Other classes than `IN` and `ANY` are included only for completeness and historical reasons.
///
/// See [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035) for further information.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Class {
    IN,
    CH,
    HS,
    NONE,
    /// See also [RFC 8482](https://www.rfc-editor.org/rfc/rfc8482).
    ANY,
}

/// Represents the flags of a [`Header`].
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct HeaderFlags {
    /// authoritative answer (valid in responses only)
    /// [\[RFC 1035\]](https://www.rfc-editor.org/rfc/rfc1035)
    pub aa: bool,
    /// truncated (set on all truncated messages except last one)
    /// [\[RFC 1035\]](https://www.rfc-editor.org/rfc/rfc1035)
    pub tc: bool,
    /// recursion desired (copied in answer if supported and accepted)
    /// [\[RFC 1035\]](https://www.rfc-editor.org/rfc/rfc1035)
    pub rd: bool,
    /// valid in responses, indicating recursive query support in the name server
    /// [\[RFC 1035\]](https://www.rfc-editor.org/rfc/rfc1035)
    pub ra: bool,
    /// For queries: indicates interest in the `ad` bit of the upcoming response; for responses:
    /// indicates that the resolver side considers all resource records in the answer section and
    /// relevant negative response resource records in the authority section to be authentic.
    /// [\[RFC 4035\]](https://www.rfc-editor.org/rfc/rfc4035),
    /// [\[RFC 6840\]](https://www.rfc-editor.org/rfc/rfc6840)
    pub ad: bool,
    /// disable signature validation in a security-aware name server's processing of a particular
    /// query [\[RFC 4035\]](https://www.rfc-editor.org/rfc/rfc4035)
    pub cd: bool,
}

/// Represents a DNS header.
///
/// The general format of a header is defined in [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Header {
    /// Supplied by questioner and reflected back unchanged by responder.
    pub msg_id: u16,
    /// False for queries, true for responses.
    pub qr: bool,
    /// The [`Opcode`] of the message.
    pub opcode: Opcode,
    /// The [`HeaderFlags`] of the message.
    pub flags: HeaderFlags,
    /// For queries: [`None`]. For responses: the return/status code of the server.
    pub rcode: Option<RCode>,
    /// The number of questions.
    pub qdcount: u16,
    /// The number of resource records.
    pub ancount: u16,
    /// The number of name server resource records.
    pub nscount: u16,
    /// The number of additional resource records.
    pub arcount: u16,
}

/// Represents a DNS question, i.e. an entry in the question section of a DNS message.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Question {
    /// The [`Name`] to query for.
    pub qname: Name,
    /// The [`RecordType`] to query for.
    pub qtype: RecordType,
    /// The query [`Class`].
    pub qclass: Class,
}

/// Represents a DNS record, i.e. an entry in the answer, authority or additional section of a DNS
/// message.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Record {
    OPT(OptRecord),
    NONOPT(NonOptRecord),
}

/// Flags for an [`OptRecord`].
///
/// See [RFC 6891](https://www.rfc-editor.org/rfc/rfc6891#section-6) for further information.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum OptFlags {
    /// Indicates to the server that the resolver is able to accept DNSSEC security records.
    /// [\[RFC 3225\]](https://www.rfc-editor.org/rfc/rfc3225)
    DO,
}

/// EDNS parameters.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct EdnsConfig {
    /// Indicates DNSSEC support, i.e. whether the server should send appropriate DNSSEC records.
    pub do_flag: bool,
    /// The payload size that gets sent in the `OPT` record.
    pub bufsize: u16,
}

/// The `OPT` variant of [`Record`].
///
/// See [RFC 6891](https://www.rfc-editor.org/rfc/rfc6891#section-6) for further information.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct OptRecord {
    /// Must be [`Name::root()`].
    pub owner: Name,
    /// The number of octets of the largest UDP payload that can be reassembled and delivered in
    /// the requestor's network stack.
    pub payload_size: u16,
    /// `None` for queries. For responses, this is always the correct [`RCode`], i.e. the lower
    /// four bits from the header are included.
    pub rcode: Option<RCode>,
    /// Almost always zero.
    pub edns_version: u8,
    /// A list of [`OptFlags`] (may be empty).
    pub flags: Vec<OptFlags>,
    // rdlength omitted as rdata knows its own length
    encoded_rdata: Vec<u8>, // needed for encoding
    rdata: Rdata,
}

/// The `NONOPT` variant of [`Record`].
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct NonOptRecord {
    /// The [`Name`] that this record is for.
    pub owner: Name,
    /// The type of this record.
    pub rtype: RecordType,
    /// The class of this record (will almost always be [`Class::IN`]).
    pub class: Class,
    /// The amount of seconds this record may be cached for.
    pub ttl: u32,
    // rdlength omitted as rdata knows its own length
    encoded_rdata: Vec<u8>, // needed for encoding
    rdata: Rdata,
}

/// Represents a DNS message.
///
/// See [RFC 1035](https://www.rfc-editor.org/rfc/rfc1035) for further information.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Message {
    /// The message header.
    pub header: Header,
    /// The list of questions.
    pub questions: Vec<Question>,
    /// The list of resource records.
    pub answers: Vec<Record>,
    /// The list of name server resource records.
    pub authoritative_answers: Vec<Record>,
    /// The list of additional resource records.
    pub additional_answers: Vec<Record>,
}

impl Opcode {
    /// Encodes a `Opcode` as a byte.
    pub fn encode(&self) -> u8 {
        match self {
            Opcode::QUERY => 0,
            Opcode::IQUERY => 1,
            Opcode::STATUS => 2,
            Opcode::NOTIFY => 4,
            Opcode::UPDATE => 5,
            Opcode::DSO => 6,
        }
    }

    /// Parses an encoded `Opcode` from a byte.
    ///
    /// Returns an error if the given byte does not represent a valid DNS OpCode.
    pub fn parse(val: u8) -> Result<Opcode, ParseError> {
        Ok(match val {
            0 => Opcode::QUERY,
            1 => Opcode::IQUERY,
            2 => Opcode::STATUS,
            4 => Opcode::NOTIFY,
            5 => Opcode::UPDATE,
            6 => Opcode::DSO,
            x => return Err(ParseError::InvalidOpcode(x)),
        })
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl RCode {
    /// Encodes an `RCode` as a byte (actually only the lower four bits are used).
    ///
    /// Note that for RCODEs `BADVERSBADSIG` and following only the lower four bits are encoded;
    /// the upper eight bits need to be encoded in an OPT record in the additional section of the
    /// DNS message.
    pub fn encode(&self) -> u8 {
        match self {
            RCode::NOERROR => 0,
            RCode::FORMERR => 1,
            RCode::SERVFAIL => 2,
            RCode::NXDOMAIN => 3,
            RCode::NOTIMP => 4,
            RCode::REFUSED => 5,
            RCode::YXDOMAIN => 6,
            RCode::YXRRSET => 7,
            RCode::NXRRSET => 8,
            RCode::NOTAUTH => 9,
            RCode::NOTZONE => 10,
            RCode::DSOTYPENI => 11,
            RCode::BADVERSBADSIG => 16 & 0b1111,
            RCode::BADKEY => 17 & 0b1111,
            RCode::BADTIME => 18 & 0b1111,
            RCode::BADMODE => 19 & 0b1111,
            RCode::BADNAME => 20 & 0b1111,
            RCode::BADALG => 21 & 0b1111,
            RCode::BADTRUNC => 22 & 0b1111,
            RCode::BADCOOKIE => 23 & 0b1111,
        }
    }

    /// Parses an encoded `RCode` from a twelve bit value. If EDNS is used, the upper eight bits
    /// are stored in the OPT entry of the additional section and the lower four bits are stored in
    /// the [`Header`].
    ///
    /// Returns an error if the given value does not represent a valid DNS RCODE.
    pub fn parse(val: u16) -> Result<RCode, ParseError> {
        Ok(match val {
            0 => RCode::NOERROR,
            1 => RCode::FORMERR,
            2 => RCode::SERVFAIL,
            3 => RCode::NXDOMAIN,
            4 => RCode::NOTIMP,
            5 => RCode::REFUSED,
            6 => RCode::YXDOMAIN,
            7 => RCode::YXRRSET,
            8 => RCode::NXRRSET,
            9 => RCode::NOTAUTH,
            10 => RCode::NOTZONE,
            11 => RCode::DSOTYPENI,
            16 => RCode::BADVERSBADSIG,
            17 => RCode::BADKEY,
            18 => RCode::BADTIME,
            19 => RCode::BADMODE,
            20 => RCode::BADNAME,
            21 => RCode::BADALG,
            22 => RCode::BADTRUNC,
            23 => RCode::BADCOOKIE,
            x => return Err(ParseError::InvalidRcode(x)),
        })
    }
}

impl Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Unknown(x) => write!(f, "TYPE{}", x),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl Class {
    /// Encodes a `Class` as a two-byte value.
    pub fn encode(&self) -> u16 {
        match self {
            Class::IN => 1,
            Class::CH => 3,
            Class::HS => 4,
            Class::NONE => 254,
            Class::ANY => 255,
        }
    }

    /// Parses an encoded `Class` from a two-byte value.
    ///
    /// Returns an error if the given value does not represent a valid DNS CLASS.
    pub fn parse(val: u16) -> Result<Class, ParseError> {
        Ok(match val {
            1 => Class::IN,
            3 => Class::CH,
            4 => Class::HS,
            254 => Class::NONE,
            255 => Class::ANY,
            x => return Err(ParseError::InvalidClass(x)),
        })
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl HeaderFlags {
    /// Creates a `HeaderFlags` struct from bitflags as they would appear in the second 16-octet
    /// line of a [`Header`].
    pub fn from_flags(flags: u16) -> Self {
        Self {
            aa: (flags & (1 << 10)) != 0,
            tc: (flags & (1 << 9)) != 0,
            rd: (flags & (1 << 8)) != 0,
            ra: (flags & (1 << 7)) != 0,
            ad: (flags & (1 << 5)) != 0,
            cd: (flags & (1 << 4)) != 0,
        }
    }

    /// Returns a u16 representing bitflags as they would appear in the second 16-octet line of a
    /// [`Header`].
    pub fn as_flags(&self) -> u16 {
        let aa = if self.aa { 1 } else { 0 };
        let tc = if self.tc { 1 } else { 0 };
        let rd = if self.rd { 1 } else { 0 };
        let ra = if self.ra { 1 } else { 0 };
        let ad = if self.ad { 1 } else { 0 };
        let cd = if self.cd { 1 } else { 0 };
        (aa << 10) + (tc << 9) + (rd << 8) + (ra << 7) + (ad << 5) + (cd << 4)
    }
}

impl Header {
    /// Creates a header for a DNS query message.
    ///
    /// If the query includes an [`OPT`](rdata::opt::OPT) record, `edns` must be `true`.
    ///
    /// Returns an error if `aa` or `ra` are set in `flags`.
    pub fn new_query_header(
        msg_id: u16,
        opcode: Opcode,
        flags: HeaderFlags,
        edns: bool,
        qdcount: u16,
    ) -> Result<Self, EncodeError> {
        if flags.aa || flags.ra {
            Err(EncodeError::AaOrRaInQuery)
        } else {
            Ok(Header {
                msg_id,
                qr: false,
                opcode,
                flags,
                rcode: None,
                qdcount,
                ancount: 0,
                nscount: 0,
                arcount: if edns { 1 } else { 0 },
            })
        }
    }

    /// Encodes a `Header` as a series of bytes, appended to the given writer.
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        let qr = if self.qr { 1u16 } else { 0u16 };
        let opcode = self.opcode.encode() as u16;
        let rcode = match &self.rcode {
            Some(val) => val.encode() as u16,
            None => 0u16,
        };

        let line_two = (qr << 15) + (opcode << 11) + self.flags.as_flags() + rcode;
        buf.write_u16::<NetworkEndian>(self.msg_id)?;
        buf.write_u16::<NetworkEndian>(line_two)?;
        buf.write_u16::<NetworkEndian>(self.qdcount)?;
        buf.write_u16::<NetworkEndian>(self.ancount)?;
        buf.write_u16::<NetworkEndian>(self.nscount)?;
        buf.write_u16::<NetworkEndian>(self.arcount)?;

        Ok(())
    }

    /// Parses an encoded `Header` from a series of bytes.
    pub fn parse(header: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let msg_id = header.read_u16::<NetworkEndian>()?;
        let line_two = header.read_u16::<NetworkEndian>()?;
        let qr = (line_two & (1 << 15)) >> 15;
        let opcode = Opcode::parse(((line_two & (0b1111 << 11)) >> 11) as u8)?;
        let flags = HeaderFlags::from_flags(line_two & 0b0000011110110000);
        let rcode = RCode::parse(line_two & 0b1111)?;

        Ok(Header {
            msg_id,
            qr: qr != 0,
            opcode,
            flags,
            rcode: if qr != 0 { Some(rcode) } else { None },
            qdcount: header.read_u16::<NetworkEndian>()?,
            ancount: header.read_u16::<NetworkEndian>()?,
            nscount: header.read_u16::<NetworkEndian>()?,
            arcount: header.read_u16::<NetworkEndian>()?,
        })
    }
}

impl Question {
    /// Creates a DNS question.
    pub fn new(name: Name, qtype: RecordType, qclass: Class) -> Self {
        Question {
            qname: name,
            qtype,
            qclass,
        }
    }

    /// Encodes a `Question` as a series of bytes, appended to the given writer.
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.qname.encode_into(buf)?;
        buf.write_u16::<NetworkEndian>(self.qtype.into())?;
        buf.write_u16::<NetworkEndian>(self.qclass.encode())?;
        Ok(())
    }

    /// Parses an encoded `Question` from a series of bytes.
    pub fn parse(msg: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let qname = Name::parse(msg, name::Compression::Allowed)?;
        let qtype: RecordType = msg.read_u16::<NetworkEndian>()?.into();
        let qclass = Class::parse(msg.read_u16::<NetworkEndian>()?)?;

        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }
}

impl Record {
    /// Encodes a `Record` as a series of bytes, appended to the given writer.
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        match self {
            Record::NONOPT(nonopt) => nonopt.encode_into(buf),
            Record::OPT(opt) => opt.encode_into(buf),
        }
    }

    /// Parses an encoded `Record` from a series of bytes.
    ///
    /// Returns an error if the record's name, class or RDATA cannot be parsed, or if an `OPT`
    /// record has a name other than `"."`.
    pub fn parse(msg: &mut Cursor<&[u8]>, rcode: Option<RCode>) -> Result<Self, ParseError> {
        let owner = Name::parse(msg, name::Compression::Allowed)?;
        let atype: RecordType = msg.read_u16::<NetworkEndian>()?.into();
        if atype == RecordType::OPT {
            return OptRecord::parse(msg, owner, rcode);
        }
        let class = Class::parse(msg.read_u16::<NetworkEndian>()?)?;
        let ttl = msg.read_u32::<NetworkEndian>()?;
        let rdlength = msg.read_u16::<NetworkEndian>()?;

        let mut encoded_rdata = vec![0; rdlength as usize];
        let pos_rdata_start = msg.position();
        msg.read_exact(&mut encoded_rdata)?;
        // reset position to the start of rdata for parse_rdata()
        msg.set_position(pos_rdata_start);
        // a record whose RDATA we cannot decode is carried as raw bytes; consumers that filter by
        // RDATA variant will skip it, and the rest of the message stays usable
        let rdata = match Record::parse_rdata(&atype, msg, rdlength) {
            Ok(rdata) => rdata,
            Err(_) => Rdata::Unknown(encoded_rdata.clone()),
        };
        // the RDATA parsers read from the full message cursor (name compression); make sure a
        // short or overlong read cannot desync the following records
        msg.set_position(pos_rdata_start + rdlength as u64);

        Ok(Record::NONOPT(NonOptRecord {
            owner,
            rtype: atype,
            class,
            ttl,
            encoded_rdata,
            rdata,
        }))
    }

    /// Parses encoded RDATA of the given type.
    ///
    /// `msg` is a cursor over the complete response message, which is needed for message
    /// compression. `rdlength` is the length of the RDATA in bytes.
    pub fn parse_rdata(
        atype: &RecordType,
        msg: &mut Cursor<&[u8]>,
        rdlength: u16,
    ) -> Result<Rdata, ParseError> {
        match atype {
            RecordType::A => rdata::A::parse_rdata(msg, rdlength),
            RecordType::NS => rdata::NS::parse_rdata(msg, rdlength),
            RecordType::CNAME => rdata::CNAME::parse_rdata(msg, rdlength),
            RecordType::SOA => rdata::SOA::parse_rdata(msg, rdlength),
            RecordType::MX => rdata::MX::parse_rdata(msg, rdlength),
            RecordType::TXT => rdata::TXT::parse_rdata(msg, rdlength),
            RecordType::AAAA => rdata::AAAA::parse_rdata(msg, rdlength),
            RecordType::OPT => rdata::OPT::parse_rdata(msg, rdlength),
            RecordType::DS => rdata::DS::parse_rdata(msg, rdlength),
            RecordType::RRSIG => rdata::RRSIG::parse_rdata(msg, rdlength),
            RecordType::NSEC => rdata::NSEC::parse_rdata(msg, rdlength),
            RecordType::DNSKEY => rdata::DNSKEY::parse_rdata(msg, rdlength),
            RecordType::NSEC3 => rdata::NSEC3::parse_rdata(msg, rdlength),
            RecordType::Unknown(_) => {
                let mut rdata = vec![0; rdlength as usize];
                msg.read_exact(&mut rdata)?;
                Ok(Rdata::Unknown(rdata))
            }
        }
    }

    /// Returns a reference to the inner [`OptRecord`]. [`None`] for the `NONOPT` variant.
    pub fn as_opt(&self) -> Option<&OptRecord> {
        match self {
            Self::OPT(opt) => Some(opt),
            Self::NONOPT(_) => None,
        }
    }

    /// Returns a reference to the inner [`NonOptRecord`]. [`None`] for the `OPT` variant.
    pub fn as_nonopt(&self) -> Option<&NonOptRecord> {
        match self {
            Self::NONOPT(nonopt) => Some(nonopt),
            Self::OPT(_) => None,
        }
    }

    /// Returns a reference to the contained [`Rdata`].
    pub fn rdata(&self) -> &Rdata {
        match self {
            Self::OPT(opt) => &opt.rdata,
            Self::NONOPT(nonopt) => &nonopt.rdata,
        }
    }
}

impl NonOptRecord {
    /// Creates a new `NonOptRecord` from [`Rdata`].
    ///
    /// Returns an error if `rdata` is [`Rdata::OPT`] or if `rdata` could not be encoded.
    pub fn new(owner: Name, class: Class, ttl: u32, rdata: Rdata) -> Result<Self, ProtoError> {
        if rdata.as_opt().is_some() {
            return Err(ProtoError::OptRdataForNonOptRecord);
        }

        let rtype = rdata.rtype();
        let encoded_rdata = rdata.encode()?;

        Ok(Self {
            owner,
            rtype,
            class,
            ttl,
            rdata,
            encoded_rdata,
        })
    }

    /// Encodes a `NonOptRecord` as a series of bytes, appended to the given writer.
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.owner.encode_into(buf)?;
        buf.write_u16::<NetworkEndian>(self.rtype.into())?;
        buf.write_u16::<NetworkEndian>(self.class.encode())?;
        buf.write_u32::<NetworkEndian>(self.ttl)?;
        buf.write_u16::<NetworkEndian>(self.encoded_rdata.len() as u16)?;
        buf.write_all(&self.encoded_rdata)?;
        Ok(())
    }

    /// Returns a reference to the contained [`Rdata`].
    pub fn rdata(&self) -> &Rdata {
        &self.rdata
    }
}

impl Display for NonOptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.owner, self.ttl, self.rtype, self.rdata
        )
    }
}

impl OptRecord {
    /// Creates a new `OPT` record.
    ///
    /// For the `rcode` parameter, see [`Self::rcode`].
    pub fn new(rcode: Option<RCode>, edns_config: EdnsConfig) -> Result<Self, EncodeError> {
        let mut flags = vec![];
        if edns_config.do_flag {
            flags.push(OptFlags::DO);
        }
        let rdata = Rdata::OPT(OPT {
            options: Default::default(),
        });
        Ok(Self {
            owner: Name::root(),
            payload_size: edns_config.bufsize,
            rcode,
            edns_version: 0,
            flags,
            encoded_rdata: rdata.encode()?,
            rdata,
        })
    }

    /// Encodes a `OptRecord` as a series of bytes, appended to the given writer.
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.owner.encode_into(buf)?;
        buf.write_u16::<NetworkEndian>(RecordType::OPT.into())?;
        buf.write_u16::<NetworkEndian>(self.payload_size)?;
        let rcode = self.rcode.unwrap_or(RCode::NOERROR);
        let rcode = (((rcode.encode() as u16) & 0b111111110000) >> 4) as u8;
        buf.write_u8(rcode)?;
        buf.write_u8(self.edns_version)?;
        if self.flags.contains(&OptFlags::DO) {
            buf.write_u16::<NetworkEndian>(1 << 15)?;
        } else {
            buf.write_u16::<NetworkEndian>(0)?;
        }
        buf.write_u16::<NetworkEndian>(self.encoded_rdata.len() as u16)?;
        buf.write_all(&self.encoded_rdata)?;
        Ok(())
    }

    /// Parses an encoded `OptRecord` from a series of bytes.
    fn parse(
        msg: &mut Cursor<&[u8]>,
        owner: Name,
        rcode: Option<RCode>,
    ) -> Result<Record, ParseError> {
        if !owner.is_root() {
            return Err(ParseError::InvalidOptName(owner));
        }

        let payload_size = msg.read_u16::<NetworkEndian>()?;
        let ext_rcode = msg.read_u8()?;
        let rcode = match (rcode, ext_rcode) {
            (Some(_), 0) | (None, _) => rcode,
            (Some(low), x) => Some(RCode::parse(
                ((x as u16) << 4) + (low.encode() as u16),
            )?),
        };
        let edns_version = msg.read_u8()?;
        let mut flags = vec![];
        let do_flag = msg.read_u16::<NetworkEndian>()? & (1 << 15) != 0;
        if do_flag {
            flags.push(OptFlags::DO);
        }

        let rdlength = msg.read_u16::<NetworkEndian>()?;
        let mut encoded_rdata = vec![0; rdlength as usize];
        let pos_rdata_start = msg.position();
        msg.read_exact(&mut encoded_rdata)?;
        // reset position to the start of rdata for parse_rdata()
        msg.set_position(pos_rdata_start);
        let rdata = Record::parse_rdata(&RecordType::OPT, msg, rdlength)?;

        Ok(Record::OPT(OptRecord {
            owner,
            payload_size,
            rcode,
            edns_version,
            flags,
            encoded_rdata,
            rdata,
        }))
    }
}

impl Message {
    /// Creates a DNS query.
    ///
    /// If `edns` is [`Some`], the query will contain an `OPT` record (this is how the DO bit and
    /// the UDP payload size are requested).
    ///
    /// Returns an error if `aa` or `ra` are set in `flags`.
    pub fn new_query(
        domain: Name,
        qtype: RecordType,
        opcode: Opcode,
        flags: HeaderFlags,
        edns: Option<EdnsConfig>,
    ) -> Result<Self, EncodeError> {
        if flags.aa || flags.ra {
            return Err(EncodeError::AaOrRaInQuery);
        }

        let msg_id = rand::thread_rng().gen_range(0..(1u32 << 16)) as u16;

        let header = Header::new_query_header(msg_id, opcode, flags, edns.is_some(), 1)?;

        let mut additional_answers = Vec::new();
        if let Some(edns_config) = edns {
            additional_answers.push(Record::OPT(OptRecord::new(None, edns_config)?));
        }

        Ok(Message {
            header,
            questions: vec![Question::new(domain, qtype, Class::IN)],
            answers: Vec::new(),
            authoritative_answers: Vec::new(),
            additional_answers,
        })
    }

    /// Encodes a `Message` as a series of bytes.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// The same as [`encode()`](Self::encode()), but encoded bytes are appended to the given
    /// writer instead of to a newly allocated one.
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<(), EncodeError> {
        self.header.encode_into(buf)?;
        for question in &self.questions {
            question.encode_into(buf)?;
        }
        for record in &self.answers {
            record.encode_into(buf)?;
        }
        for record in &self.authoritative_answers {
            record.encode_into(buf)?;
        }
        for record in &self.additional_answers {
            record.encode_into(buf)?;
        }

        Ok(())
    }

    /// Parses an encoded `Message` from a series of bytes.
    ///
    /// Returns an error if any section cannot be parsed or a truncated message is received (the
    /// caller should resend the query over TCP in that case).
    pub fn parse(msg: &mut Cursor<&[u8]>) -> Result<Self, ParseError> {
        let mut header = Header::parse(msg)?;

        if header.flags.tc {
            return Err(ParseError::TruncatedMessage);
        }

        let questions = Message::parse_questions(msg, header.qdcount)?;
        let answers = Message::parse_records(msg, header.ancount, header.rcode)?;
        let authoritative_answers = Message::parse_records(msg, header.nscount, header.rcode)?;
        let additional_answers = Message::parse_records(msg, header.arcount, header.rcode)?;

        for answer in &additional_answers {
            if let Record::OPT(OptRecord { rcode, .. }) = answer {
                header.rcode = *rcode;
            }
        }

        Ok(Message {
            header,
            questions,
            answers,
            authoritative_answers,
            additional_answers,
        })
    }

    /// Parses the question section of a DNS message.
    fn parse_questions(msg: &mut Cursor<&[u8]>, qdcount: u16) -> Result<Vec<Question>, ParseError> {
        let mut questions = Vec::with_capacity(qdcount as usize);
        for _i in 0..qdcount {
            questions.push(Question::parse(msg)?);
        }

        Ok(questions)
    }

    /// Parses an answer section (i.e. answer, authoritative or additional) of a DNS message.
    fn parse_records(
        msg: &mut Cursor<&[u8]>,
        ancount: u16,
        rcode: Option<RCode>,
    ) -> Result<Vec<Record>, ParseError> {
        let mut answers = Vec::with_capacity(ancount as usize);
        for _i in 0..ancount {
            answers.push(Record::parse(msg, rcode)?);
        }

        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::rdata::dnskey::Algorithm;
    use crate::rdata::DNSKEY;
    use crate::{
        Class, EdnsConfig, HeaderFlags, Message, Name, NonOptRecord, Opcode, Record, RecordType,
    };

    fn query_flags() -> HeaderFlags {
        HeaderFlags {
            aa: false,
            tc: false,
            rd: true,
            ra: false,
            ad: true,
            cd: true,
        }
    }

    #[test]
    fn query_with_do_bit_survives_encode_parse() {
        let msg = Message::new_query(
            Name::from_ascii("example.com").unwrap(),
            RecordType::DNSKEY,
            Opcode::QUERY,
            query_flags(),
            Some(EdnsConfig {
                do_flag: true,
                bufsize: 4096,
            }),
        )
        .unwrap();

        let encoded = msg.encode().unwrap();
        let parsed = Message::parse(&mut Cursor::new(&encoded)).unwrap();

        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].qtype, RecordType::DNSKEY);
        let opt = parsed.additional_answers[0].as_opt().unwrap();
        assert_eq!(opt.payload_size, 4096);
        assert!(opt.flags.contains(&crate::OptFlags::DO));
    }

    #[test]
    fn dnskey_record_roundtrip_through_wire() {
        let dnskey = DNSKEY {
            zone: true,
            revoked: false,
            secure_entry_point: true,
            algorithm: Algorithm::RSASHA256,
            key: vec![3, 1, 0, 1, 0xDE, 0xAD, 0xBE, 0xEF],
        };
        let record = NonOptRecord::new(
            Name::from_ascii("example.com").unwrap(),
            Class::IN,
            3600,
            dnskey.clone().into(),
        )
        .unwrap();

        let mut buf = Vec::new();
        record.encode_into(&mut buf).unwrap();
        let parsed = Record::parse(&mut Cursor::new(&buf), None).unwrap();
        let parsed = parsed.as_nonopt().unwrap();

        assert_eq!(parsed.rtype, RecordType::DNSKEY);
        assert_eq!(parsed.rdata().as_dnskey(), Some(&dnskey));
    }

    #[test]
    fn malformed_rdata_becomes_unknown_and_does_not_desync() {
        let mut buf = Vec::new();
        // a DNSKEY with an invalid protocol field (must be 3)
        Name::from_ascii("bad.example")
            .unwrap()
            .encode_into(&mut buf)
            .unwrap();
        buf.extend_from_slice(&48u16.to_be_bytes()); // DNSKEY
        buf.extend_from_slice(&1u16.to_be_bytes()); // IN
        buf.extend_from_slice(&300u32.to_be_bytes());
        buf.extend_from_slice(&6u16.to_be_bytes()); // rdlength
        buf.extend_from_slice(&[0x01, 0x01, 5, 8, 0xAA, 0xBB]);

        let a_start = buf.len();
        let a_record = NonOptRecord::new(
            Name::from_ascii("ok.example").unwrap(),
            Class::IN,
            300,
            crate::rdata::A {
                address: std::net::Ipv4Addr::new(192, 0, 2, 1),
            }
            .into(),
        )
        .unwrap();
        a_record.encode_into(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf.as_slice());
        let first = Record::parse(&mut cursor, None).unwrap();
        assert!(matches!(first.rdata(), crate::Rdata::Unknown(_)));
        // the cursor must sit exactly at the next record
        assert_eq!(cursor.position() as usize, a_start);

        let second = Record::parse(&mut cursor, None).unwrap();
        assert_eq!(second.as_nonopt().unwrap().rtype, RecordType::A);
    }

    /// Reference key tag computation, transcribed independently from RFC 4034, Appendix B.
    fn key_tag_reference(rdata: &[u8]) -> u16 {
        let mut ac: u64 = 0;
        for (i, byte) in rdata.iter().enumerate() {
            if i & 1 == 1 {
                ac += *byte as u64;
            } else {
                ac += (*byte as u64) << 8;
            }
        }
        ac += (ac >> 16) & 0xFFFF;
        (ac & 0xFFFF) as u16
    }

    #[test]
    fn key_tag_matches_rfc_reference_for_random_keys() {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let key_len = rng.gen_range(1..96);
            let key: Vec<u8> = (0..key_len).map(|_| rng.gen()).collect();
            let dnskey = DNSKEY {
                zone: true,
                revoked: false,
                secure_entry_point: rng.gen(),
                algorithm: Algorithm::RSASHA256,
                key,
            };

            let mut rdata = Vec::new();
            use crate::rdata::RdataTrait;
            dnskey.encode_rdata_into(&mut rdata).unwrap();

            assert_eq!(dnskey.key_tag(), key_tag_reference(&rdata));
        }
    }

    #[test]
    fn key_tag_for_rsamd5_uses_trailing_modulus_octets() {
        let dnskey = DNSKEY {
            zone: true,
            revoked: false,
            secure_entry_point: false,
            algorithm: Algorithm::RSAMD5,
            key: vec![0x01, 0x02, 0x03, 0x04, 0x05],
        };
        // tag is (key[n-3] << 8) | key[n-2]
        assert_eq!(dnskey.key_tag(), 0x0304);
    }
}
