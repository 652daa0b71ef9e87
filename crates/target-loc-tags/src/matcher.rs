//! Codebook lookup over the four tag rotations.

use crate::{Dictionary, DictionaryError};

/// A codebook hit for an observed tag code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Quarter turns such that `observed == rotate_code_u64(code, n, rotation)`.
    pub rotation: u8,
    pub hamming: u8,
}

/// Brute-force matcher; every id is compared in all four rotations.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    pub fn new(dict: Dictionary, max_hamming: u8) -> Result<Self, DictionaryError> {
        if dict.bit_count() > 64 {
            return Err(DictionaryError::TooManyBits(dict.bit_count()));
        }
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&code| [0, 1, 2, 3].map(|rot| rotate_code_u64(code, n, rot)))
            .collect();

        Ok(Self {
            dict,
            max_hamming,
            rotated,
        })
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties keep the lowest id and rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let hamming = (observed ^ cand).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                if best.is_some_and(|b| b.hamming <= hamming) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming,
                });
                if hamming == 0 {
                    return best;
                }
            }
        }

        best
    }
}

/// Rotate an `n x n` bit grid by `rot` quarter turns clockwise.
///
/// Works for either bit order as long as it is row-major.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            let bit = (code >> (sy * n + sx)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builtins, TagFamily};

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0x0123_4567_89ab_cdef_u64;
        let r = (0..4).fold(code, |c, _| rotate_code_u64(c, 8, 1));
        assert_eq!(r, code);
        assert_eq!(
            rotate_code_u64(rotate_code_u64(code, 8, 1), 8, 1),
            rotate_code_u64(code, 8, 2)
        );
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        // MSB-first 2x2: only (0,0) set.
        let code = 0b1000;
        // After a clockwise quarter turn only (1,0) is set.
        assert_eq!(rotate_code_u64(code, 2, 1), 0b0100);
    }

    #[test]
    fn finds_rotated_code_with_bit_errors() {
        let dict = builtins::builtin_dictionary(TagFamily::Tag16h5);
        let matcher = Matcher::new(dict.clone(), 2).expect("fits");

        let observed = rotate_code_u64(dict.codes[7], dict.marker_size, 3) ^ 0b1000_0000_0001;
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(m.id, 7);
        assert_eq!(m.rotation, 3);
        assert_eq!(m.hamming, 2);
    }

    #[test]
    fn rejects_codes_beyond_max_hamming() {
        let dict = builtins::builtin_dictionary(TagFamily::Tag16h5);
        let matcher = Matcher::new(dict, 2).expect("fits");
        assert!(matcher.match_code(0).is_none());
        assert!(matcher.match_code(0xffff).is_none());
    }
}
