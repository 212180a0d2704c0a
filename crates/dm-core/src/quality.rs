//! DM read-quality grades.
//!
//! A quality tag is an appended `@<Q>` suffix, `Q` one of `A`..`F`. `A`/`B`
//! grade a good read; `C`..`F` grade a bad one. This module only knows how
//! to name, sample, and strip the tag — the decision of *whether* to tag a
//! code, and with what probability of being bad, belongs to the emitter.

use rand::Rng;

/// One of the six DM read-quality grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTag {
    A,
    B,
    C,
    D,
    E,
    F,
}

const GOOD: [QualityTag; 2] = [QualityTag::A, QualityTag::B];
const BAD: [QualityTag; 4] = [QualityTag::C, QualityTag::D, QualityTag::E, QualityTag::F];

impl QualityTag {
    pub fn is_good(self) -> bool {
        matches!(self, QualityTag::A | QualityTag::B)
    }

    pub fn as_char(self) -> char {
        match self {
            QualityTag::A => 'A',
            QualityTag::B => 'B',
            QualityTag::C => 'C',
            QualityTag::D => 'D',
            QualityTag::E => 'E',
            QualityTag::F => 'F',
        }
    }

    /// Uniformly sample a good grade (A or B).
    pub fn sample_good<R: Rng + ?Sized>(rng: &mut R) -> QualityTag {
        GOOD[rng.gen_range(0..GOOD.len())]
    }

    /// Uniformly sample a bad grade (C, D, E, or F).
    pub fn sample_bad<R: Rng + ?Sized>(rng: &mut R) -> QualityTag {
        BAD[rng.gen_range(0..BAD.len())]
    }
}

/// Append `@<Q>` to `code`.
pub fn tag(code: &str, q: QualityTag) -> String {
    let mut tagged = String::with_capacity(code.len() + 2);
    tagged.push_str(code);
    tagged.push('@');
    tagged.push(q.as_char());
    tagged
}

/// Strip a trailing `@<Q>` quality tag, if present. Idempotent on codes
/// that never carried one.
pub fn strip(code: &str) -> &str {
    let bytes = code.as_bytes();
    if bytes.len() >= 2 && bytes[bytes.len() - 2] == b'@' {
        let q = bytes[bytes.len() - 1];
        if matches!(q, b'A'..=b'F') {
            return &code[..code.len() - 2];
        }
    }
    code
}
