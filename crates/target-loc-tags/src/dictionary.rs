//! Dictionary metadata and packed tag codes.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{builtins, TagFamily};

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error("failed to read codebook {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse codebook: {0}")]
    Json(#[from] serde_json::Error),
    #[error("codebook is for family {found}, expected {expected}")]
    FamilyMismatch { expected: TagFamily, found: String },
    #[error("invalid code `{0}` (expected a hex string such as 0x231b)")]
    BadCode(String),
    #[error("code {code:#x} does not fit in {bits} bits")]
    CodeTooWide { code: u64, bits: usize },
    #[error("{0} data bits per tag do not fit in a 64-bit code")]
    TooManyBits(usize),
    #[error("codebook has no codes")]
    Empty,
}

/// A tag family together with its codebook.
#[derive(Clone, Debug, PartialEq)]
pub struct Dictionary {
    pub family: TagFamily,
    /// Data cells per side.
    pub marker_size: usize,
    /// Bit errors the family can correct without ambiguity.
    pub max_correction_bits: u8,
    /// One code per tag id, MSB-first row-major, 1 = white.
    pub codes: Cow<'static, [u64]>,
}

#[derive(Deserialize)]
struct CodebookFile {
    family: String,
    codes: Vec<String>,
}

impl Dictionary {
    pub(crate) fn from_static(family: TagFamily, codes: &'static [u64]) -> Self {
        Self::with_codes(family, Cow::Borrowed(codes))
    }

    fn with_codes(family: TagFamily, codes: Cow<'static, [u64]>) -> Self {
        Self {
            family,
            marker_size: family.marker_size(),
            max_correction_bits: (family.min_hamming() - 1) / 2,
            codes,
        }
    }

    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Parse a codebook from JSON: `{ "family": "36h11", "codes": ["0x...", ...] }`.
    pub fn from_json_str(family: TagFamily, json: &str) -> Result<Self, DictionaryError> {
        let file: CodebookFile = serde_json::from_str(json)?;
        if file.family.parse::<TagFamily>().ok() != Some(family) {
            return Err(DictionaryError::FamilyMismatch {
                expected: family,
                found: file.family,
            });
        }
        if file.codes.is_empty() {
            return Err(DictionaryError::Empty);
        }

        let bits = family.marker_size() * family.marker_size();
        let codes = file
            .codes
            .iter()
            .map(|s| {
                let hex = s.trim();
                let hex = hex
                    .strip_prefix("0x")
                    .or_else(|| hex.strip_prefix("0X"))
                    .unwrap_or(hex);
                let code = u64::from_str_radix(hex, 16)
                    .map_err(|_| DictionaryError::BadCode(s.clone()))?;
                if bits < 64 && code >> bits != 0 {
                    return Err(DictionaryError::CodeTooWide { code, bits });
                }
                Ok(code)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_codes(family, Cow::Owned(codes)))
    }

    pub fn load_json(family: TagFamily, path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(family, &json)
    }

    /// Codebook from `codes_path` when given, else the embedded one.
    pub fn for_family(family: TagFamily, codes_path: Option<&Path>) -> Result<Self, DictionaryError> {
        match codes_path {
            Some(path) => Self::load_json(family, path),
            None => Ok(builtins::builtin_dictionary(family)),
        }
    }

    /// Value of data cell `(x, y)`; `true` is white.
    #[inline]
    pub fn cell_is_white(&self, id: usize, x: usize, y: usize) -> Option<bool> {
        let code = *self.codes.get(id)?;
        let shift = self.bit_count() - 1 - (y * self.marker_size + x);
        Some((code >> shift) & 1 == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_codebook_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{ "family": "tag36h11", "codes": ["0xd5d628584", "0XD97F18B49", "dd280910e"] }}"#
        )
        .expect("write");

        let dict = Dictionary::load_json(TagFamily::Tag36h11, file.path()).expect("load");
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.codes[0], 0xd5d628584);
        assert_eq!(dict.codes[1], 0xd97f18b49);
        assert_eq!(dict.max_correction_bits, 5);
        assert_eq!(dict.marker_size, 6);
    }

    #[test]
    fn rejects_mismatched_family_and_wide_codes() {
        let err = Dictionary::from_json_str(
            TagFamily::Tag36h11,
            r#"{ "family": "25h9", "codes": ["0x1"] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, DictionaryError::FamilyMismatch { .. }));

        let err = Dictionary::from_json_str(
            TagFamily::Tag16h5,
            r#"{ "family": "16h5", "codes": ["0x1ffff"] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, DictionaryError::CodeTooWide { bits: 16, .. }));

        let err =
            Dictionary::from_json_str(TagFamily::Tag16h5, r#"{ "family": "16h5", "codes": ["zz"] }"#)
                .unwrap_err();
        assert!(matches!(err, DictionaryError::BadCode(_)));
    }

    #[test]
    fn every_family_resolves_and_override_path_wins() {
        for family in TagFamily::ALL {
            let dict = Dictionary::for_family(family, None).expect("embedded");
            assert_eq!(dict.family, family);
            assert!(!dict.is_empty(), "{family}");
        }

        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{ "family": "25h7", "codes": ["0x4b770d"] }}"#).expect("write");
        let dict = Dictionary::for_family(TagFamily::Tag25h7, Some(file.path())).expect("load");
        assert_eq!(dict.codes.as_ref(), &[0x4b770d]);

        let err = Dictionary::for_family(TagFamily::Tag16h5, Some(Path::new("/nonexistent/codes.json")))
            .unwrap_err();
        assert!(matches!(err, DictionaryError::Io { .. }));
    }

    #[test]
    fn cell_lookup_is_msb_first() {
        let dict = Dictionary::for_family(TagFamily::Tag16h5, None).expect("embedded");
        // 0x231b = 0010 0011 0001 1011
        assert_eq!(dict.cell_is_white(0, 0, 0), Some(false));
        assert_eq!(dict.cell_is_white(0, 2, 0), Some(true));
        assert_eq!(dict.cell_is_white(0, 3, 3), Some(true));
        assert_eq!(dict.cell_is_white(0, 1, 3), Some(false));
        assert_eq!(dict.cell_is_white(99, 0, 0), None);
    }
}
