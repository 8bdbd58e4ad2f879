// Copyright © 2021 HQS Quantum Simulations GmbH. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the
// License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either
// express or implied. See the License for the specific language governing permissions and
// limitations under the License.

//! Immutable fixed-length binary vectors used for classical register
//! snapshots and `IfStatement` conditions.

use crate::{QcoreError, Result};
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Endianness used when converting a [`BitString`] to or from an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Bit at index 0 is the most significant bit.
    Big,
    /// Bit at index 0 is the least significant bit.
    Little,
}

/// Immutable, fixed-length sequence of bits.
///
/// Equality and hashing are by value (the canonical big-endian `to01`
/// string); all bitwise operators require both operands to have the same
/// length.
#[derive(Debug, Clone, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct BitString {
    bits: Vec<bool>,
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl std::hash::Hash for BitString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to01(Endianness::Big).hash(state);
    }
}

impl BitString {
    /// All-zero bit string of length `num_bits`.
    pub fn zeros(num_bits: usize) -> Self {
        BitString {
            bits: vec![false; num_bits],
        }
    }

    /// Parses a string of `0`/`1` characters.
    pub fn from_str01(s: &str) -> Result<Self> {
        let bits = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(QcoreError::Format {
                    message: format!("invalid bit character {other:?} in BitString literal"),
                }),
            })
            .collect::<Result<Vec<bool>>>()?;
        Ok(BitString { bits })
    }

    /// Builds a bit string of the given length with the listed indices set.
    pub fn from_nonzeros(num_bits: usize, nonzeros: &[usize]) -> Result<Self> {
        if let Some(&bad) = nonzeros.iter().find(|&&i| i >= num_bits) {
            return Err(QcoreError::Domain {
                operation: "BitString::from_nonzeros".to_string(),
                message: format!("index {bad} out of range for {num_bits} bits"),
            });
        }
        let mut bits = vec![false; num_bits];
        for &i in nonzeros {
            bits[i] = true;
        }
        Ok(BitString { bits })
    }

    /// Builds a bit string of the given length from a predicate over indices.
    pub fn from_function(num_bits: usize, f: impl Fn(usize) -> bool) -> Self {
        BitString {
            bits: (0..num_bits).map(f).collect(),
        }
    }

    /// Builds a bit string of `num_bits` width from the non-negative integer
    /// `value`, in the given endianness. Errors with `Domain` if `value`
    /// does not fit in `num_bits`.
    pub fn from_int(num_bits: usize, value: u128, endianness: Endianness) -> Result<Self> {
        if num_bits < 128 && value >= (1u128 << num_bits) {
            return Err(QcoreError::Domain {
                operation: "BitString::from_int".to_string(),
                message: format!("{value} does not fit in {num_bits} bits"),
            });
        }
        // big-endian: bits[0] is the most significant bit of `value`.
        let mut big_endian: Vec<bool> = (0..num_bits)
            .rev()
            .map(|shift| (value >> shift) & 1 == 1)
            .collect();
        if endianness == Endianness::Little {
            big_endian.reverse();
        }
        Ok(BitString { bits: big_endian })
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the bit string has zero length.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Indices of the set bits.
    pub fn nonzeros(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of the unset bits.
    pub fn zeros_indices(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| !b)
            .map(|(i, _)| i)
            .collect()
    }

    /// Reads the bit at `index`.
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Canonical `0`/`1` string representation.
    pub fn to01(&self, endianness: Endianness) -> String {
        match endianness {
            Endianness::Big => self.bits.iter().map(|&b| if b { '1' } else { '0' }).collect(),
            Endianness::Little => self
                .bits
                .iter()
                .rev()
                .map(|&b| if b { '1' } else { '0' })
                .collect(),
        }
    }

    /// Converts to an unsigned integer. Errors with `Domain` if the bit
    /// string has more than 128 bits.
    pub fn to_integer(&self, endianness: Endianness) -> Result<u128> {
        if self.bits.len() > 128 {
            return Err(QcoreError::Domain {
                operation: "BitString::to_integer".to_string(),
                message: "BitString too wide to fit in a u128".to_string(),
            });
        }
        let ordered: Vec<bool> = match endianness {
            Endianness::Big => self.bits.clone(),
            Endianness::Little => self.bits.iter().rev().copied().collect(),
        };
        let mut acc: u128 = 0;
        for bit in ordered {
            acc = (acc << 1) | (bit as u128);
        }
        Ok(acc)
    }

    fn elementwise(&self, other: &BitString, f: impl Fn(bool, bool) -> bool) -> Result<BitString> {
        if self.len() != other.len() {
            return Err(QcoreError::Arity {
                operation: "BitString bitwise op".to_string(),
                message: format!(
                    "lengths differ: {} vs {}",
                    self.len(),
                    other.len()
                ),
            });
        }
        Ok(BitString {
            bits: self
                .bits
                .iter()
                .zip(other.bits.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Bitwise OR. Both operands must have equal length.
    pub fn or(&self, other: &BitString) -> Result<BitString> {
        self.elementwise(other, |a, b| a || b)
    }

    /// Bitwise AND. Both operands must have equal length.
    pub fn and(&self, other: &BitString) -> Result<BitString> {
        self.elementwise(other, |a, b| a && b)
    }

    /// Bitwise XOR. Both operands must have equal length.
    pub fn xor(&self, other: &BitString) -> Result<BitString> {
        self.elementwise(other, |a, b| a != b)
    }

    /// Bitwise NOT.
    pub fn not(&self) -> BitString {
        BitString {
            bits: self.bits.iter().map(|&b| !b).collect(),
        }
    }

    /// Logical left shift by `amount`, filling with zeros, same length.
    pub fn shl(&self, amount: usize) -> BitString {
        let n = self.bits.len();
        let mut bits = vec![false; n];
        for i in 0..n {
            if i + amount < n {
                bits[i] = self.bits[i + amount];
            }
        }
        BitString { bits }
    }

    /// Logical right shift by `amount`, filling with zeros, same length.
    pub fn shr(&self, amount: usize) -> BitString {
        let n = self.bits.len();
        let mut bits = vec![false; n];
        for i in 0..n {
            if i >= amount {
                bits[i] = self.bits[i - amount];
            }
        }
        BitString { bits }
    }

    /// Concatenation: `self` followed by `other`.
    pub fn concat(&self, other: &BitString) -> BitString {
        let mut bits = self.bits.clone();
        bits.extend(other.bits.iter().copied());
        BitString { bits }
    }

    /// Repeats the bit string `count` times.
    pub fn repeat(&self, count: usize) -> BitString {
        let mut bits = Vec::with_capacity(self.bits.len() * count);
        for _ in 0..count {
            bits.extend(self.bits.iter().copied());
        }
        BitString { bits }
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bs\"{}\"", self.to01(Endianness::Big))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_int_conversion() {
        for n in 1..12usize {
            for k in 0..(1u128 << n) {
                let bs = BitString::from_int(n, k, Endianness::Big).unwrap();
                assert_eq!(bs.to_integer(Endianness::Big).unwrap(), k);
            }
        }
    }

    #[test]
    fn little_endian_reverses_big() {
        let bs = BitString::from_int(4, 0b1010, Endianness::Big).unwrap();
        assert_eq!(bs.to01(Endianness::Big), "1010");
        assert_eq!(bs.to01(Endianness::Little), "0101");
    }

    #[test]
    fn de_morgan_holds() {
        let a = BitString::from_str01("1010").unwrap();
        let b = BitString::from_str01("1100").unwrap();
        let lhs = a.and(&b).unwrap().not();
        let rhs = a.not().or(&b.not()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn bitwise_requires_equal_length() {
        let a = BitString::zeros(3);
        let b = BitString::zeros(4);
        assert!(matches!(a.and(&b), Err(QcoreError::Arity { .. })));
    }

    #[test]
    fn concat_and_repeat() {
        let a = BitString::from_str01("10").unwrap();
        let b = BitString::from_str01("11").unwrap();
        assert_eq!(a.concat(&b).to01(Endianness::Big), "1011");
        assert_eq!(a.repeat(2).to01(Endianness::Big), "1010");
    }

    #[test]
    fn equality_and_hash_by_value() {
        use std::collections::HashSet;
        let a = BitString::from_str01("101").unwrap();
        let b = BitString::from_int(3, 0b101, Endianness::Big).unwrap();
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
