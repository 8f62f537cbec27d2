//! Digit-wise integer comparison without numeric parsing

use std::cmp::Ordering;

/// The trailing integer embedded in a string: its digits and sign.
struct TrailingInteger<'a> {
    digits: &'a [u8],
    negative: bool,
}

impl<'a> TrailingInteger<'a> {
    /// Find the last run of ASCII digits in `text`.
    ///
    /// A `-` immediately before the run makes it negative.
    fn find(text: &'a str) -> Option<Self> {
        let bytes = text.as_bytes();
        let end = bytes.iter().rposition(u8::is_ascii_digit)? + 1;
        let start = bytes[..end]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map_or(0, |i| i + 1);
        Some(Self {
            digits: &bytes[start..end],
            negative: start > 0 && bytes[start - 1] == b'-',
        })
    }

    fn is_zero(&self) -> bool {
        self.digits.iter().all(|&d| d == b'0')
    }

    /// Digit at `place` counting from the least significant, zero beyond
    /// the run.
    fn digit(&self, place: usize) -> u8 {
        if place < self.digits.len() {
            self.digits[self.digits.len() - 1 - place]
        } else {
            b'0'
        }
    }
}

/// Compare magnitudes by walking both digit runs from the least significant
/// place. The most significant differing place decides.
fn compare_magnitude(a: &TrailingInteger<'_>, b: &TrailingInteger<'_>) -> Ordering {
    let places = a.digits.len().max(b.digits.len());
    let mut decided = Ordering::Equal;
    for place in 0..places {
        match a.digit(place).cmp(&b.digit(place)) {
            Ordering::Equal => {}
            unequal => decided = unequal,
        }
    }
    decided
}

/// Compare the integers trailing `a` and `b`, e.g. `"item7" < "item12"`.
///
/// Works on any number of digits. Returns `None` when either string has no
/// digits, so the caller can fall through to another criterion.
pub fn compare_integers(a: &str, b: &str) -> Option<Ordering> {
    let a = TrailingInteger::find(a)?;
    let b = TrailingInteger::find(b)?;

    let a_negative = a.negative && !a.is_zero();
    let b_negative = b.negative && !b.is_zero();
    let ordering = match (a_negative, b_negative) {
        (false, false) => compare_magnitude(&a, &b),
        (true, true) => compare_magnitude(&a, &b).reverse(),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
    };
    Some(ordering)
}
