use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Zero-based cell position. Orders by row, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// `Coord::new(2, 1)` renders as `B3`.
    pub fn to_a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row + 1)
    }

    pub fn parse_a1(text: &str) -> Result<Self> {
        let text = text.trim();
        let split = text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidCoord(text.to_string()))?;
        let (letters, digits) = text.split_at(split);

        let col = column_index(letters).ok_or_else(|| Error::InvalidCoord(text.to_string()))?;
        let row: usize = digits
            .parse()
            .map_err(|_| Error::InvalidCoord(text.to_string()))?;
        if row == 0 {
            return Err(Error::InvalidCoord(text.to_string()));
        }

        Ok(Self { row: row - 1, col })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for Coord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_a1(s)
    }
}

/// Bijective base-26 column name: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn column_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Inclusive span of columns the client may write to. Everything outside
/// it is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableRange {
    pub first: usize,
    pub last: usize,
}

impl EditableRange {
    pub fn new(first: usize, last: usize) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidRange(format!(
                "{}:{}",
                column_letters(first),
                column_letters(last)
            )));
        }
        Ok(Self { first, last })
    }

    pub fn contains(&self, col: usize) -> bool {
        (self.first..=self.last).contains(&col)
    }

    pub fn width(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn columns(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

impl Default for EditableRange {
    /// Columns B through E.
    fn default() -> Self {
        Self { first: 1, last: 4 }
    }
}

impl fmt::Display for EditableRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", column_letters(self.first), column_letters(self.last))
    }
}

impl FromStr for EditableRange {
    type Err = Error;

    /// Accepts `B:E`, or a single column such as `C`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (first, last) = s.split_once(':').unwrap_or((s, s));
        let first = column_index(first.trim()).ok_or_else(|| Error::InvalidRange(s.to_string()))?;
        let last = column_index(last.trim()).ok_or_else(|| Error::InvalidRange(s.to_string()))?;
        Self::new(first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(4), "E");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("aa"), Some(26));
        assert_eq!(column_index("ZZ"), Some(701));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_a1_notation() {
        assert_eq!(Coord::new(2, 1).to_a1(), "B3");
        assert_eq!(Coord::new(0, 27).to_a1(), "AB1");
        assert_eq!(Coord::parse_a1("c12").unwrap(), Coord::new(11, 2));
        assert_eq!("AB1".parse::<Coord>().unwrap(), Coord::new(0, 27));
    }

    #[test]
    fn test_a1_rejects_garbage() {
        assert!(Coord::parse_a1("B0").is_err());
        assert!(Coord::parse_a1("12").is_err());
        assert!(Coord::parse_a1("B").is_err());
        assert!(Coord::parse_a1("B1x").is_err());
    }

    #[test]
    fn test_ordering_is_row_major() {
        let mut coords = vec![Coord::new(1, 0), Coord::new(0, 3), Coord::new(0, 1)];
        coords.sort();
        assert_eq!(coords, vec![Coord::new(0, 1), Coord::new(0, 3), Coord::new(1, 0)]);
    }

    #[test]
    fn test_editable_range() {
        let range = EditableRange::default();
        assert!(!range.contains(0));
        assert!(range.contains(1));
        assert!(range.contains(4));
        assert!(!range.contains(5));
        assert_eq!(range.width(), 4);
        assert_eq!(range.to_string(), "B:E");

        assert_eq!("b:e".parse::<EditableRange>().unwrap(), range);
        assert_eq!("C".parse::<EditableRange>().unwrap(), EditableRange::new(2, 2).unwrap());
        assert!("E:B".parse::<EditableRange>().is_err());
    }
}
