//! Bitbreiten für n-bit-codierte Indizes.
//!
//! Event-Code-Teile, Partitions-Indizes und beschränkte Integer benutzen alle
//! `⌈log₂(n)⌉` Bits für `n` unterscheidbare Werte.

/// Anzahl Bits für `n` unterscheidbare Werte: `⌈log₂(n)⌉`, 0 für `n <= 1`.
#[inline]
pub fn for_count(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Wie [`for_count`], aber für `u64` (Bereiche beschränkter Integer).
#[inline]
pub fn for_count_u64(n: u64) -> u8 {
    if n <= 1 {
        0
    } else {
        (u64::BITS - (n - 1).leading_zeros()) as u8
    }
}
