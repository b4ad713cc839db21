use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;

/// Gaps in the object numbering up to this size are listed as free entries;
/// longer gaps start a new xref subsection.
const MAX_FREE_RUN: u32 = 16;

/// Bytes >= 128 in a comment right after the header mark the file as binary
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

pub struct PdfWriter<W: Write> {
    writer: W,
    xref_positions: BTreeMap<ObjectId, u64>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            xref_positions: BTreeMap::new(),
            current_position: 0,
        }
    }

    /// Write `document` as a complete PDF file with a fresh xref table.
    ///
    /// Fails with [`PdfError::SerializationError`] if the root Catalog is
    /// absent, if any reference dangles, or if two objects share a number.
    pub fn write_document(&mut self, document: &Document) -> Result<()> {
        Self::validate(document)?;

        self.write_header(document)?;

        let mut digests = Vec::with_capacity(document.len() * 16 + 16);
        digests.extend_from_slice(document.root().to_string().as_bytes());
        for (id, object) in document.objects() {
            let bytes = self.write_object(*id, object)?;
            digests.extend_from_slice(&md5::compute(&bytes).0);
        }

        let xref_position = self.current_position;
        self.write_xref()?;
        self.write_trailer(document, md5::compute(&digests).0, xref_position)?;

        self.writer.flush()?;
        tracing::debug!(
            objects = self.xref_positions.len(),
            bytes = self.current_position,
            "serialized document"
        );
        Ok(())
    }

    fn validate(document: &Document) -> Result<()> {
        match document.get(document.root()) {
            Some(Object::Dictionary(_)) => {}
            Some(_) => {
                return Err(PdfError::SerializationError(format!(
                    "root catalog {} is not a dictionary",
                    document.root()
                )))
            }
            None => {
                return Err(PdfError::SerializationError(format!(
                    "root catalog {} is absent",
                    document.root()
                )))
            }
        }

        if let Some((from, to)) = document.dangling_references().into_iter().next() {
            return Err(PdfError::SerializationError(format!(
                "object {from} references missing object {to}"
            )));
        }

        let mut previous: Option<ObjectId> = None;
        for id in document.objects().keys() {
            if id.number() == 0 {
                return Err(PdfError::SerializationError(
                    "object number 0 is reserved".to_string(),
                ));
            }
            if previous.is_some_and(|p| p.number() == id.number()) {
                return Err(PdfError::SerializationError(format!(
                    "object number {} is used by more than one generation",
                    id.number()
                )));
            }
            previous = Some(*id);
        }
        Ok(())
    }

    fn write_header(&mut self, document: &Document) -> Result<()> {
        let header = format!("%PDF-{}\n", document.version());
        self.write_bytes(header.as_bytes())?;
        self.write_bytes(BINARY_MARKER)
    }

    /// Write one indirect object and return its bytes
    fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<Vec<u8>> {
        self.xref_positions.insert(id, self.current_position);

        let mut bytes = format!("{} {} obj\n", id.number(), id.generation()).into_bytes();
        write_object_value(&mut bytes, object)?;
        bytes.extend_from_slice(b"\nendobj\n");

        self.write_bytes(&bytes)?;
        Ok(bytes)
    }

    fn write_xref(&mut self) -> Result<()> {
        let max_obj_num = self
            .xref_positions
            .keys()
            .next_back()
            .map(|id| id.number())
            .unwrap_or(0);

        // Split numbers 0..=max into runs; short gaps stay inside a run
        let mut runs: Vec<(u32, u32)> = vec![(0, 0)];
        for id in self.xref_positions.keys() {
            let number = id.number();
            let last = runs.len() - 1;
            if number - runs[last].1 <= MAX_FREE_RUN + 1 {
                runs[last].1 = number;
            } else {
                runs.push((number, number));
            }
        }

        let positions: BTreeMap<u32, (u64, u16)> = self
            .xref_positions
            .iter()
            .map(|(id, pos)| (id.number(), (*pos, id.generation())))
            .collect();

        // Free entries form a linked list headed by object 0
        let free: Vec<u32> = runs
            .iter()
            .flat_map(|&(start, end)| start..=end)
            .filter(|&n| n != 0 && !positions.contains_key(&n))
            .collect();
        let next_free = |n: u32| -> u32 {
            free.get(free.partition_point(|&f| f <= n))
                .copied()
                .unwrap_or(0)
        };

        let mut table = String::from("xref\n");
        for (start, end) in runs {
            table.push_str(&format!("{} {}\n", start, end - start + 1));
            for number in start..=end {
                match positions.get(&number) {
                    Some((position, generation)) => {
                        table.push_str(&format!("{position:010} {generation:05} n \n"))
                    }
                    None if number == 0 => {
                        table.push_str(&format!("{:010} 65535 f \n", next_free(0)))
                    }
                    None => table.push_str(&format!("{:010} 00001 f \n", next_free(number))),
                }
            }
        }

        tracing::trace!(max_obj_num, free = free.len(), "writing xref table");
        self.write_bytes(table.as_bytes())
    }

    fn write_trailer(&mut self, document: &Document, id: [u8; 16], xref_position: u64) -> Result<()> {
        let max_obj_num = self
            .xref_positions
            .keys()
            .map(|id| id.number())
            .max()
            .unwrap_or(0);

        let mut trailer = Dictionary::new();
        trailer.set("Size", Object::Integer(i64::from(max_obj_num) + 1));
        trailer.set("Root", Object::Reference(document.root()));
        if let Some(info) = document.info().filter(|info| document.get(*info).is_some()) {
            trailer.set("Info", Object::Reference(info));
        }
        trailer.set(
            "ID",
            Object::Array(vec![Object::String(id.to_vec()), Object::String(id.to_vec())]),
        );

        let mut bytes = b"trailer\n".to_vec();
        write_object_value(&mut bytes, &Object::Dictionary(trailer))?;
        bytes.extend_from_slice(format!("\nstartxref\n{xref_position}\n%%EOF\n").as_bytes());
        self.write_bytes(&bytes)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

/// Append the PDF syntax for `object` to `out`
pub(crate) fn write_object_value(out: &mut Vec<u8>, object: &Object) -> Result<()> {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format_real(*f)?.as_bytes()),
        Object::String(s) => write_string(out, s),
        Object::Name(n) => write_name(out, n),
        Object::Array(arr) => {
            out.push(b'[');
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object_value(out, obj)?;
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict, None)?,
        Object::Stream(stream) => {
            write_dictionary(out, stream.dictionary(), Some(stream.data().len()))?;
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(stream.data());
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
        }
    }
    Ok(())
}

/// `stream_length` replaces (or adds) `/Length` so it always matches the data
fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary, stream_length: Option<usize>) -> Result<()> {
    out.extend_from_slice(b"<<");
    let mut wrote_length = false;
    for (key, value) in dict.iter() {
        out.push(b' ');
        write_name(out, key);
        out.push(b' ');
        match stream_length {
            Some(length) if key == "Length" => {
                out.extend_from_slice(length.to_string().as_bytes());
                wrote_length = true;
            }
            _ => write_object_value(out, value)?,
        }
    }
    if let Some(length) = stream_length.filter(|_| !wrote_length) {
        out.extend_from_slice(format!(" /Length {length}").as_bytes());
    }
    out.extend_from_slice(b" >>");
    Ok(())
}

fn format_real(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(PdfError::SerializationError(format!(
            "real number {value} cannot be written"
        )));
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    Ok(match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    })
}

/// Text-like strings are written as literals, anything else as hex
fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let is_text = bytes
        .iter()
        .all(|&b| (0x20..0x7F).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));

    if is_text {
        out.push(b'(');
        for &b in bytes {
            match b {
                b'(' | b')' | b'\\' => {
                    out.push(b'\\');
                    out.push(b);
                }
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                _ => out.push(b),
            }
        }
        out.push(b')');
    } else {
        out.push(b'<');
        for b in bytes {
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
        out.push(b'>');
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for ch in name.chars() {
        // Names read from files hold one char per byte
        let mut buf = [0u8; 4];
        let bytes: &[u8] = match u8::try_from(ch as u32) {
            Ok(byte) => {
                buf[0] = byte;
                &buf[..1]
            }
            Err(_) => ch.encode_utf8(&mut buf).as_bytes(),
        };
        for &b in bytes {
            let regular = (0x21..=0x7E).contains(&b)
                && !matches!(
                    b,
                    b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
                );
            if regular {
                out.push(b);
            } else {
                out.extend_from_slice(format!("#{b:02X}").as_bytes());
            }
        }
    }
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub(crate) fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");

    // For UTC, the offset is always +00'00
    format!("{formatted}+00'00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Stream;
    use crate::parser::parse_document;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn value(object: &Object) -> String {
        let mut out = Vec::new();
        write_object_value(&mut out, object).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    fn sample_document() -> Document {
        let mut doc = Document::new();
        doc.add_page([0.0, 0.0, 612.0, 792.0], b"BT (one) Tj ET").unwrap();
        doc.add_page([0.0, 0.0, 612.0, 792.0], b"BT (two) Tj ET").unwrap();
        doc
    }

    #[test]
    fn test_write_primitives() {
        assert_eq!(value(&Object::Null), "null");
        assert_eq!(value(&Object::Boolean(false)), "false");
        assert_eq!(value(&Object::Integer(-42)), "-42");
        assert_eq!(value(&Object::Real(3.5)), "3.5");
        assert_eq!(value(&Object::Real(2.0)), "2");
        assert_eq!(value(&Object::Real(-0.0000001)), "0");
        assert_eq!(value(&Object::Reference(ObjectId::new(4, 2))), "4 2 R");
    }

    #[test]
    fn test_non_finite_real_is_rejected() {
        let mut out = Vec::new();
        assert!(matches!(
            write_object_value(&mut out, &Object::Real(f64::NAN)),
            Err(PdfError::SerializationError(_))
        ));
    }

    #[test]
    fn test_write_strings() {
        assert_eq!(
            value(&Object::String(b"page (1) \\ 2\n".to_vec())),
            "(page \\(1\\) \\\\ 2\\n)"
        );
        assert_eq!(value(&Object::String(vec![0xFE, 0xFF, 0x00, 0x41])), "<FEFF0041>");
    }

    #[test]
    fn test_write_names() {
        assert_eq!(value(&Object::name("Type")), "/Type");
        assert_eq!(value(&Object::name("A B#C")), "/A#20B#23C");
        assert_eq!(value(&Object::name("Font/X")), "/Font#2FX");
        // A Latin-1 char as produced by the lexer for `#E9`
        assert_eq!(value(&Object::name("caf\u{e9}")), "/caf#E9");
    }

    #[test]
    fn test_write_stream_normalizes_length() {
        let mut dict = Dictionary::new();
        dict.set("Length", 999);
        dict.set("Filter", Object::name("FlateDecode"));
        let stream = Stream::with_dictionary(dict, b"abc".to_vec());
        let mut raw = stream.clone();
        raw.dictionary_mut().set("Length", 999);

        assert_eq!(
            value(&Object::Stream(raw)),
            "<< /Length 3 /Filter /FlateDecode >>\nstream\nabc\nendstream"
        );
    }

    #[test]
    fn test_header_and_binary_marker() {
        let bytes = sample_document().to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let doc = sample_document();
        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let xref_start = text.rfind("xref\n").unwrap();
        let entries: Vec<&str> = text[xref_start..]
            .lines()
            .skip(2)
            .take_while(|line| !line.starts_with("trailer"))
            .collect();
        assert_eq!(entries.len(), doc.len() + 1);

        for (number, entry) in entries.iter().enumerate().skip(1) {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(bytes[offset..].starts_with(format!("{number} 0 obj").as_bytes()));
        }
    }

    #[test]
    fn test_gaps_become_free_entries_or_subsections() {
        let mut doc = sample_document();
        // Small gap: numbers 7..=9 are free
        doc.insert(ObjectId::new(10, 0), Object::Integer(1));
        // Large gap: 200 starts a new subsection
        doc.insert(ObjectId::new(200, 0), Object::Integer(2));
        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        assert!(text.contains("xref\n0 11\n0000000007 65535 f \n"));
        assert!(text.contains("0000000008 00001 f \n0000000009 00001 f \n0000000000 00001 f \n"));
        assert!(text.contains("\n200 1\n"));
        assert!(text.contains("/Size 201"));

        // Still readable
        let parsed = parse_document(&bytes).unwrap();
        assert_eq!(parsed.get(ObjectId::new(200, 0)), Some(&Object::Integer(2)));
    }

    #[test]
    fn test_sparse_document_free_list_is_chained_in_order() {
        let mut doc = sample_document();
        let first_extra = doc.max_object_number() + 2;
        for i in 0..2000 {
            doc.insert(ObjectId::new(first_extra + 2 * i, 0), Object::Integer(i as i64));
        }
        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let table = &text[text.find("xref\n0 ").unwrap()..];
        let entries: Vec<(u64, &str)> = table
            .lines()
            .skip(2)
            .take_while(|line| line.len() == 18 || line.len() == 19)
            .map(|line| (line[..10].parse().unwrap(), &line[17..18]))
            .collect();

        let expected: Vec<u64> = (0..2000u64)
            .map(|i| u64::from(first_extra) - 1 + 2 * i)
            .collect();
        let mut chain = Vec::new();
        let mut next = entries[0].0;
        while next != 0 {
            assert_eq!(entries[next as usize].1, "f");
            chain.push(next);
            next = entries[next as usize].0;
        }
        assert_eq!(chain, expected);
        assert_eq!(parse_document(&bytes).unwrap().len(), doc.len());
    }

    #[test]
    fn test_missing_root_is_serialization_error() {
        let mut doc = sample_document();
        doc.remove(doc.root());
        assert!(matches!(
            doc.to_bytes(),
            Err(PdfError::SerializationError(_))
        ));
    }

    #[test]
    fn test_dangling_reference_is_serialization_error() {
        let mut doc = sample_document();
        let mut dict = Dictionary::new();
        dict.set("Ghost", ObjectId::new(77, 0));
        doc.add_object(dict);
        assert!(matches!(
            doc.to_bytes(),
            Err(PdfError::SerializationError(_))
        ));
    }

    #[test]
    fn test_duplicate_object_numbers_are_rejected() {
        let mut doc = sample_document();
        doc.insert(ObjectId::new(3, 1), Object::Null);
        assert!(matches!(
            doc.to_bytes(),
            Err(PdfError::SerializationError(_))
        ));
    }

    #[test]
    fn test_output_is_deterministic() {
        let doc = sample_document();
        let first = doc.to_bytes().unwrap();
        let second = doc.clone().to_bytes().unwrap();
        assert_eq!(first, second);

        let mut changed = doc.clone();
        changed.add_page([0.0, 0.0, 10.0, 10.0], b"").unwrap();
        let text = String::from_utf8_lossy(&first).into_owned();
        let other = String::from_utf8_lossy(&changed.to_bytes().unwrap()).into_owned();
        let id_of = |t: &str| t[t.find("/ID").unwrap()..].lines().next().unwrap().to_string();
        assert_ne!(id_of(&text), id_of(&other));
    }

    #[test]
    fn test_round_trip_preserves_pages() {
        let doc = sample_document();
        let parsed = parse_document(&doc.to_bytes().unwrap()).unwrap();

        let before: Vec<ObjectId> = doc.pages().unwrap().iter().map(|p| p.id).collect();
        let after: Vec<ObjectId> = parsed.pages().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(before, after);
        assert_eq!(parsed.objects(), doc.objects());
    }

    #[test]
    fn test_info_written_only_when_present() {
        let mut doc = sample_document();
        let text = String::from_utf8_lossy(&doc.to_bytes().unwrap()).into_owned();
        assert!(!text.contains("/Info"));

        let info = doc.add_object(Dictionary::new());
        doc.set_info(Some(info));
        let text = String::from_utf8_lossy(&doc.to_bytes().unwrap()).into_owned();
        assert!(text.contains(&format!("/Info {info}")));
    }

    #[test]
    fn test_format_pdf_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
        assert_eq!(format_pdf_date(date), "D:20240309140530+00'00");
    }
}
