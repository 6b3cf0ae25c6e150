//! `TXT` RDATA definition.

use std::fmt::Display;
use std::io::Write;

use crate::error::{EncodeError, ParseError};

use super::{encode_string_into, parse_string, Rdata, RdataTrait};

/// A record containing text strings. [\[RFC 1035\]](https://www.rfc-editor.org/rfc/rfc1035)
///
/// `TXT` records hold descriptive text whose semantics depend on the domain where it is found;
/// SPF and DMARC policies are published this way.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TXT {
    /// One or more strings.
    pub text: Vec<String>,
}

impl TXT {
    /// Returns the record's strings joined into one value, the way policy records (SPF, DMARC)
    /// are meant to be read.
    pub fn joined(&self) -> String {
        self.text.concat()
    }
}

impl RdataTrait for TXT {
    fn parse_rdata(rdata: &mut std::io::Cursor<&[u8]>, rdlength: u16) -> Result<Rdata, ParseError> {
        let rdlength = rdlength as usize;
        let mut text = Vec::new();
        let mut bytes_read = 0;

        // according to RFC 1035, one TXT entry may hold multiple character strings
        while bytes_read < rdlength {
            let (s, len) = parse_string(rdata)?;
            bytes_read += len; // also counts the length byte before the actual string
            text.push(s);
        }

        Ok(Rdata::TXT(Self { text }))
    }

    fn encode_rdata_into(&self, buf: &mut impl Write) -> Result<u16, EncodeError> {
        let mut bytes_written = 0;
        for string in &self.text {
            bytes_written += encode_string_into(string, buf)?;
        }
        Ok(bytes_written)
    }
}

impl Display for TXT {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let texts: Vec<_> = self
            .text
            .iter()
            .map(|text| {
                // escape any quotes in the string so we can print the strings quoted
                let text = text.replace('"', "\\\"");
                format!("\"{}\"", text)
            })
            .collect();
        let texts = texts.join(" ");
        write!(f, "{}", texts)
    }
}
