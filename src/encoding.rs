use std::fmt;

use anyhow::{Result, anyhow};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Override,
    Bom,
    Utf8,
    Detector,
}

impl fmt::Display for EncodingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodingSource::Override => "override",
            EncodingSource::Bom => "bom",
            EncodingSource::Utf8 => "utf-8",
            EncodingSource::Detector => "detector",
        })
    }
}

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
    pub had_bom: bool,
    pub had_errors: bool,
}

impl DecodedText {
    /// Encodes `text` the way the file was stored, BOM included.
    ///
    /// encoding_rs only encodes UTF-16 as UTF-8, so those two are written by
    /// hand.
    pub fn encode_like(&self, text: &str) -> (Vec<u8>, bool) {
        let mut out = Vec::with_capacity(text.len() + 3);
        if self.had_bom {
            out.extend_from_slice(bom_bytes(self.encoding));
        }
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let little = self.encoding == UTF_16LE;
            for unit in text.encode_utf16() {
                let bytes = if little {
                    unit.to_le_bytes()
                } else {
                    unit.to_be_bytes()
                };
                out.extend_from_slice(&bytes);
            }
            return (out, false);
        }
        let (bytes, _, had_errors) = self.encoding.encode(text);
        out.extend_from_slice(&bytes);
        (out, had_errors)
    }
}

fn bom_bytes(encoding: &'static Encoding) -> &'static [u8] {
    if encoding == UTF_16LE {
        &[0xFF, 0xFE]
    } else if encoding == UTF_16BE {
        &[0xFE, 0xFF]
    } else if encoding == UTF_8 {
        &[0xEF, 0xBB, 0xBF]
    } else {
        &[]
    }
}

/// How file bytes become text: a fixed override, or BOM, then strict UTF-8,
/// then `chardetng` for legacy single-byte files.
#[derive(Debug, Clone, Default)]
pub struct EncodingStrategy {
    forced: Option<&'static Encoding>,
}

impl EncodingStrategy {
    pub fn new(label: Option<&str>) -> Result<Self> {
        let forced = label
            .map(str::trim)
            .map(|label| {
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| anyhow!("unknown encoding '{label}'"))
            })
            .transpose()?;
        Ok(Self { forced })
    }

    pub fn describe(&self) -> String {
        match self.forced {
            Some(encoding) => format!("forced {}", encoding.name()),
            None => "auto (bom, utf-8, detector)".to_string(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> DecodedText {
        let bom = Encoding::for_bom(bytes);
        let (encoding, source) = match (self.forced, bom) {
            (Some(encoding), _) => (encoding, EncodingSource::Override),
            (None, Some((encoding, _))) => (encoding, EncodingSource::Bom),
            (None, None) => detect(bytes),
        };
        // `decode` sniffs the BOM itself and reports what it actually used.
        let (text, used, had_errors) = encoding.decode(bytes);
        DecodedText {
            text: text.into_owned(),
            encoding: used,
            source,
            had_bom: bom.is_some(),
            had_errors,
        }
    }
}

fn detect(bytes: &[u8]) -> (&'static Encoding, EncodingSource) {
    if std::str::from_utf8(bytes).is_ok() {
        return (UTF_8, EncodingSource::Utf8);
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    (detector.guess(None, true), EncodingSource::Detector)
}
