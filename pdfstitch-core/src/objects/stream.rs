use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};

/// Stream object: a dictionary plus raw, still-encoded bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        let mut dictionary = Dictionary::new();
        dictionary.set("Length", data.len() as i64);

        Self { dictionary, data }
    }

    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut dict = dictionary;
        dict.set("Length", data.len() as i64);

        Self {
            dictionary: dict,
            data,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the raw bytes and keep `/Length` in step.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.dictionary.set("Length", data.len() as i64);
        self.data = data;
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.dictionary.set("Filter", Object::name(filter));
    }

    /// Names of the filters applied to this stream, outermost first.
    pub fn filters(&self) -> Vec<&str> {
        match self.dictionary.get("Filter") {
            Some(Object::Name(name)) => vec![name.as_str()],
            Some(Object::Array(items)) => items.iter().filter_map(|f| f.as_name()).collect(),
            _ => Vec::new(),
        }
    }

    #[cfg(feature = "compression")]
    pub fn compress_flate(&mut self) -> Result<()> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.data)
            .map_err(|e| PdfError::CompressionError(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| PdfError::CompressionError(e.to_string()))?;

        self.set_data(compressed);
        self.set_filter("FlateDecode");

        Ok(())
    }

    /// Decoded stream bytes. Only unfiltered and `FlateDecode` streams are supported.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        match self.filters().as_slice() {
            [] => Ok(self.data.clone()),
            #[cfg(feature = "compression")]
            ["FlateDecode"] | ["Fl"] => {
                use flate2::read::ZlibDecoder;
                use std::io::Read;

                let mut decoder = ZlibDecoder::new(self.data.as_slice());
                let mut decoded = Vec::new();
                decoder
                    .read_to_end(&mut decoded)
                    .map_err(|e| PdfError::CompressionError(e.to_string()))?;
                Ok(decoded)
            }
            other => Err(PdfError::CompressionError(format!(
                "unsupported stream filter chain {other:?}"
            ))),
        }
    }
}
