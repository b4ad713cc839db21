//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::lexer::find_bytes;
use super::{ParseError, ParseResult};

/// How far into the file the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new PDF version
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this version is supported
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }

    /// Parse `M.m` as written in a Catalog `/Version` name
    pub fn from_name(name: &str) -> Option<Self> {
        PdfHeader::parse_version(name)
            .ok()
            .filter(PdfVersion::is_supported)
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 7)
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone, PartialEq)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Byte offset of `%PDF-` in the input. Non-zero when junk precedes it.
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    /// Locate and parse the header line
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        let offset = find_bytes(window, b"%PDF-", 0).ok_or(ParseError::InvalidHeader)?;

        let rest = &data[offset + 5..];
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(rest.len());
        let line = String::from_utf8_lossy(&rest[..line_end]);
        let version = Self::parse_version(line.trim())?;

        if !version.is_supported() {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }

        Ok(Self {
            version,
            offset,
            has_binary_marker: Self::check_binary_marker(&rest[line_end..]),
        })
    }

    fn parse_version(text: &str) -> ParseResult<PdfVersion> {
        // Some producers put a comment right after the version digits
        let text = text.split_whitespace().next().unwrap_or_default();
        let (major, minor) = text.split_once('.').ok_or(ParseError::InvalidHeader)?;
        let major = major.parse::<u8>().map_err(|_| ParseError::InvalidHeader)?;
        let minor = minor.parse::<u8>().map_err(|_| ParseError::InvalidHeader)?;
        Ok(PdfVersion::new(major, minor))
    }

    /// A comment line with at least four bytes >= 128 right after the header
    fn check_binary_marker(after_header: &[u8]) -> bool {
        let start = after_header
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .unwrap_or(after_header.len());
        let line = &after_header[start..];
        if line.first() != Some(&b'%') {
            return false;
        }
        line[1..]
            .iter()
            .take_while(|&&b| b != b'\n' && b != b'\r')
            .filter(|&&b| b >= 128)
            .count()
            >= 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_header() {
        let header = PdfHeader::parse(b"%PDF-1.7\n1 0 obj").unwrap();
        assert_eq!(header.version, PdfVersion::new(1, 7));
        assert_eq!(header.offset, 0);
        assert!(!header.has_binary_marker);
    }

    #[test]
    fn test_binary_marker() {
        let header = PdfHeader::parse(b"%PDF-1.4\r\n%\xE2\xE3\xCF\xD3\r\n").unwrap();
        assert!(header.has_binary_marker);
    }

    #[test]
    fn test_leading_garbage_is_tolerated() {
        let header = PdfHeader::parse(b"\xEF\xBB\xBFjunk%PDF-2.0\n").unwrap();
        assert_eq!(header.version, PdfVersion::new(2, 0));
        assert_eq!(header.offset, 7);
    }

    #[test]
    fn test_invalid_headers() {
        assert!(matches!(
            PdfHeader::parse(b"%PS-Adobe-3.0\n"),
            Err(ParseError::InvalidHeader)
        ));
        assert!(matches!(
            PdfHeader::parse(b"%PDF-x.y\n"),
            Err(ParseError::InvalidHeader)
        ));
        assert!(matches!(
            PdfHeader::parse(b"%PDF-3.1\n"),
            Err(ParseError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_version_ordering() {
        assert!(PdfVersion::new(1, 7) > PdfVersion::new(1, 4));
        assert!(PdfVersion::new(2, 0) > PdfVersion::new(1, 7));
        assert_eq!(PdfVersion::default().to_string(), "1.7");
    }
}
