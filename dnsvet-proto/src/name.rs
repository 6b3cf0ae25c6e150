//! Definition and implementation of the [`Name`] type.

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use smartstring::SmartString;

use crate::error::{EncodeError, ParseError};

/// A DNS domain name.
///
/// Comparison is case-insensitive, as DNS names are. The string representation omits the dot at
/// the end of the name; use [`Name::to_fqdn()`] for the fully-qualified form with a trailing dot.
/// The DNS root's name is represented as `"."` in both forms.
#[derive(Eq, Clone, Debug)]
pub struct Name {
    // does not contain the root label, as that would be the empty string
    labels: VecDeque<SmartString<smartstring::LazyCompact>>,
}

/// Whether DNS message/name compression is allowed when parsing a [`Name`].
///
/// For example, the signer name field of an RRSIG record must not be compressed, according to the
/// RFC.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Compression {
    /// Message compression is allowed.
    Allowed,
    /// Message compression is prohibited.
    Prohibited,
}

impl Name {
    /// Returns a `Name` representing the DNS root (`"."`).
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// assert_eq!(Name::from_ascii(".").ok(), Some(Name::root()));
    /// ```
    pub fn root() -> Self {
        Self {
            labels: VecDeque::new(),
        }
    }

    /// Parses a `Name` encoded as a DNS QNAME from the given cursor.
    ///
    /// If `compression` is [`Compression::Prohibited`], trying to parse a compressed name returns
    /// an error.
    ///
    /// # Examples
    /// ```rust
    /// use std::io::Cursor;
    /// use dnsvet_proto::name::{Compression, Name};
    ///
    /// // "sub.example.com" encoded via the "sub" label followed by a pointer to "example.com"
    /// let bytes = b"\x07example\x03com\0\x03sub\xc0";
    /// let mut cursor = Cursor::new(bytes as &[u8]);
    /// let name = Name::parse(&mut cursor, Compression::Allowed);
    /// assert_eq!(name.ok(), Some(Name::from_ascii("example.com").unwrap()));
    ///
    /// let name = Name::parse(&mut cursor, Compression::Prohibited);
    /// assert!(name.is_err());
    /// ```
    pub fn parse(msg: &mut Cursor<&[u8]>, compression: Compression) -> Result<Self, ParseError> {
        let mut labels = VecDeque::new();
        let mut c = msg.read_u8()?; // length of next label

        while c != 0 {
            if (c & 0b11000000) == 0b11000000 {
                if compression == Compression::Prohibited {
                    return Err(ParseError::CompressionProhibited);
                }

                // after this comes a pointer for message compression
                c &= 0b00111111; // erase upper two bits of c for offset calculation
                let offset = ((c as u16) << 8) + (msg.read_u8()? as u16);
                // save position after pointer
                let pos_after_pointer = msg.position();
                msg.seek(SeekFrom::Start(offset as u64))?;
                // recursion is the easiest way to handle recursive message compression
                labels.append(&mut Name::parse(msg, compression)?.labels);

                // move cursor to byte after pointer
                msg.seek(SeekFrom::Start(pos_after_pointer))?;
                return Ok(Name { labels });
            } else if (c & 0b11000000) != 0 {
                return Err(ParseError::InvalidLabelType(c));
            }
            let mut label = SmartString::new();
            for _ in 0..c {
                label.push(msg.read_u8()? as char);
            }
            labels.push_back(label);
            c = msg.read_u8()?;
        }

        Ok(Name { labels })
    }

    /// Constructs a `Name` from an ASCII domain string.
    ///
    /// The rules for allowed names are as follows:
    /// - Every label (except for the first, see next item) must consist of the following
    ///   characters: `a-z`, `A-Z`, `0-9`, `_`, `-`. The label's first and last character must not
    ///   be `-`.
    /// - The first label may also be a wildcard (i.e. `"*"`).
    /// - Every label must contain at least one character, except for the DNS root's name.
    /// - A trailing dot is allowed, but not necessary.
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// assert_eq!(Name::from_ascii(".").ok(), Some(Name::root()));
    /// assert_eq!(Name::from_ascii("").ok(), Some(Name::root()));
    ///
    /// assert!(Name::from_ascii("example.com").is_ok());
    /// assert!(Name::from_ascii("example.com.").is_ok());
    /// assert!(Name::from_ascii("_dmarc.example.com").is_ok());
    ///
    /// assert!(Name::from_ascii("exa-mple-.com").is_err());
    /// assert!(Name::from_ascii("exämple.com").is_err());
    /// ```
    pub fn from_ascii(name: impl AsRef<str>) -> Result<Self, ParseError> {
        let name = name.as_ref();

        // without this special case, we would later return `Err(EmptyLabel)`, because splitting "."
        // on '.' gives two empty labels
        if name == "." || name.is_empty() {
            return Ok(Self::root());
        }

        if name.len() > 255 {
            return Err(ParseError::NameTooLong(name.len()));
        }

        let mut labels = VecDeque::new();
        let mut root_label_found = false;
        for (idx, label) in name.split('.').enumerate() {
            if root_label_found {
                return Err(ParseError::EmptyLabel);
            }
            if label.len() > 63 {
                return Err(ParseError::LabelTooLong(label.len()));
            }
            if label.is_empty() {
                root_label_found = true;
            } else {
                // only the first label may be a wildcard
                let is_valid_wildcard = (idx == 0) && (label == "*");

                if !is_valid_wildcard {
                    Name::check_label(label)?;
                }
                labels.push_back(label.into());
            }
        }

        Ok(Name { labels })
    }

    /// Encodes this name as a DNS QNAME into the given buffer. Does not use message compression.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// let mut buf = Vec::new();
    /// let name = Name::from_ascii("example.com").unwrap();
    /// name.encode_into(&mut buf).ok();
    /// assert_eq!(buf, b"\x07example\x03com\0");
    /// ```
    pub fn encode_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        let mut bytes_written = 0;
        for label in &self.labels {
            buf.write_u8(label.len() as u8)?;
            buf.write_all(label.as_bytes())?;
            bytes_written += 1 + label.as_bytes().len();
        }
        buf.write_u8(0)?;
        Ok(bytes_written as u16 + 1)
    }

    /// Ensures this `Name` is in canonical format, i.e. all uppercase letters are replaced with
    /// their lowercase counterparts.
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// let mut name = Name::from_ascii("_EX4m-pLE.CoM").unwrap();
    /// name.canonicalize();
    ///
    /// assert_eq!(name.to_string(), "_ex4m-ple.com");
    /// ```
    pub fn canonicalize(&mut self) {
        self.labels
            .iter_mut()
            .for_each(|label| label.make_ascii_lowercase());
    }

    /// Returns true iff this `Name` represents the DNS root (`"."`).
    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns true iff this `Name` is a wildcard, i.e. the first label is `"*"`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.labels.front(), Some(label) if label == "*")
    }

    /// Returns true iff this `Name` is a parent zone of `other`.
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// let parent = Name::from_ascii("example.com").unwrap();
    /// let child = Name::from_ascii("a.example.com").unwrap();
    ///
    /// assert_eq!(child.zone_of(&child), true);
    /// assert_eq!(parent.zone_of(&parent), true);
    /// assert_eq!(parent.zone_of(&child), true);
    /// assert_eq!(child.zone_of(&parent), false);
    /// ```
    pub fn zone_of(&self, other: &Name) -> bool {
        if self.label_count() > other.label_count() {
            return false;
        }

        let label_pairs = self.labels.iter().rev().zip(other.labels.iter().rev());
        for (self_label, other_label) in label_pairs {
            if !self_label.eq_ignore_ascii_case(other_label) {
                return false;
            }
        }

        true
    }

    /// Returns the label count of this `Name`.
    ///
    /// This is calculated the same way as an RRSIG record's labels field, i.e. wildcards do not
    /// count (`"*.example.com"` has a label count of two) and the DNS root's name (`"."`) has a
    /// label count of zero.
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// assert_eq!(Name::from_ascii("www.example.com").unwrap().label_count(), 3);
    /// assert_eq!(Name::from_ascii("*.example.com").unwrap().label_count(), 2);
    /// assert_eq!(Name::root().label_count(), 0);
    /// ```
    pub fn label_count(&self) -> u8 {
        if self.is_wildcard() {
            (self.labels.len() - 1) as u8
        } else {
            self.labels.len() as u8
        }
    }

    /// Returns the fully-qualified string form of this `Name`, with a trailing dot.
    ///
    /// # Examples
    /// ```rust
    /// use dnsvet_proto::Name;
    ///
    /// assert_eq!(Name::root().to_fqdn(), ".");
    /// assert_eq!(Name::from_ascii("example.com").unwrap().to_fqdn(), "example.com.");
    /// ```
    pub fn to_fqdn(&self) -> String {
        if self.is_root() {
            return ".".into();
        }

        let mut s = String::new();
        for label in &self.labels {
            s.push_str(label);
            s.push('.');
        }
        s
    }

    /// Checks if the given string is a valid DNS name label.
    fn check_label(label: impl AsRef<str>) -> Result<(), ParseError> {
        let mut chars = label.as_ref().chars();
        // label is non-empty, so we can unwrap
        let mut c = chars.next().unwrap();
        // first label char must be a-z, A-Z, 0-9, or _
        if !c.is_ascii_alphanumeric() && (c != '_') {
            return Err(ParseError::NameInvalidChars);
        }
        // label chars in the middle must be a-z, A-Z, 0-9, _, or -
        for next_c in chars {
            if !c.is_ascii_alphanumeric() && (c != '_') && (c != '-') {
                return Err(ParseError::NameInvalidChars);
            }
            c = next_c;
        }
        // last label char must be a-z, A-Z, 0-9, or _
        if !c.is_ascii_alphanumeric() && (c != '_') {
            return Err(ParseError::NameInvalidChars);
        }

        Ok(())
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        if self.labels.len() != other.labels.len() {
            return false;
        }
        self.labels
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            let last_index = self.labels.len() - 1;
            for (i, label) in self.labels.iter().enumerate() {
                if i != last_index {
                    write!(f, "{}.", label)?;
                } else {
                    write!(f, "{}", label)?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Name;

    #[test]
    fn fqdn_matches_ascii_input() {
        for input in ["example.com", "example.com.", "www.example.co.uk"] {
            let name = Name::from_ascii(input).unwrap();
            let expected = format!("{}.", input.trim_end_matches('.'));
            assert_eq!(name.to_fqdn(), expected);
        }
        assert_eq!(Name::from_ascii(".").unwrap().to_fqdn(), ".");
    }

    #[test]
    fn equality_ignores_case() {
        let a = Name::from_ascii("Example.COM").unwrap();
        let b = Name::from_ascii("example.com").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Name::from_ascii("example.org").unwrap());
    }
}
