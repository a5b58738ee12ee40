//! Size Accounting Module
//!
//! Two collaborators the cache engine depends on but does not care about the
//! internals of: parsing human byte-size input ("1M", 1024) into a byte count,
//! and estimating the memory footprint of a prospective key/value pair.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Byte Size Constants ==
/// Bytes per kibibyte (2^10).
pub const BYTES_PER_KIB: u64 = 1024;
/// Bytes per mebibyte (2^20).
pub const BYTES_PER_MIB: u64 = 1024 * BYTES_PER_KIB;
/// Bytes per gibibyte (2^30).
pub const BYTES_PER_GIB: u64 = 1024 * BYTES_PER_MIB;
/// Bytes per tebibyte (2^40).
pub const BYTES_PER_TIB: u64 = 1024 * BYTES_PER_GIB;

// == Byte Size Spec ==
/// User-facing byte-size input: a raw byte count or a unit-suffixed string
/// such as `"128.0M"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteSizeSpec {
    /// Raw byte count, must be > 0.
    Bytes(u64),
    /// Decimal quantity with a case-insensitive `K`/`M`/`G`/`T` suffix.
    Human(String),
}

impl From<u64> for ByteSizeSpec {
    fn from(bytes: u64) -> Self {
        ByteSizeSpec::Bytes(bytes)
    }
}

impl From<&str> for ByteSizeSpec {
    fn from(s: &str) -> Self {
        ByteSizeSpec::Human(s.to_string())
    }
}

impl From<String> for ByteSizeSpec {
    fn from(s: String) -> Self {
        ByteSizeSpec::Human(s)
    }
}

// == Parsing ==
/// Converts user byte-size input to an integer byte count.
///
/// String input must end in a case-insensitive unit suffix (`K`=2^10,
/// `M`=2^20, `G`=2^30, `T`=2^40) preceded by a positive decimal quantity;
/// the product is truncated to whole bytes.
///
/// # Errors
/// `CacheError::Config` on a non-positive byte count, missing/unknown
/// suffix, or a non-numeric or non-positive quantity.
pub fn parse_byte_size(spec: &ByteSizeSpec) -> Result<u64> {
    match spec {
        ByteSizeSpec::Bytes(bytes) => {
            if *bytes == 0 {
                return Err(CacheError::Config("Byte size must be >0".to_string()));
            }
            Ok(*bytes)
        }
        ByteSizeSpec::Human(text) => parse_human_size(text),
    }
}

fn parse_human_size(text: &str) -> Result<u64> {
    let Some(suffix) = text.chars().last() else {
        return Err(CacheError::Config("Empty byte size string".to_string()));
    };

    let multiplier = match suffix.to_ascii_uppercase() {
        'K' => BYTES_PER_KIB,
        'M' => BYTES_PER_MIB,
        'G' => BYTES_PER_GIB,
        'T' => BYTES_PER_TIB,
        other => {
            return Err(CacheError::Config(format!(
                "Unknown byte size suffix: '{}'",
                other
            )))
        }
    };

    let quantity: f64 = text[..text.len() - suffix.len_utf8()]
        .parse()
        .map_err(|_| CacheError::Config(format!("Invalid byte size quantity: '{}'", text)))?;

    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(CacheError::Config("Byte size must be >0".to_string()));
    }

    Ok((multiplier as f64 * quantity) as u64)
}

// == Size Estimator ==
/// Injected estimator for the memory footprint of a key/value pair, in bytes.
///
/// The engine treats this as opaque: it only requires that the result is a
/// reasonable estimate and that the function is cheap relative to the entries
/// being measured. The estimator runs under the cache lock.
pub type SizeEstimator<K, V> = Arc<dyn Fn(&K, &V) -> usize + Send + Sync>;

/// Shallow default estimator: the inline size of the key and value types.
///
/// Heap-owning types (e.g. `String`, `Vec`) are undercounted; pair a byte
/// budget with [`deep_size_estimator`] or a custom estimator for those.
pub fn shallow_estimator<K, V>() -> SizeEstimator<K, V> {
    Arc::new(|_k: &K, _v: &V| mem::size_of::<K>() + mem::size_of::<V>())
}

/// Estimator built from the [`ByteSized`] trait, recursing into owned data.
pub fn deep_size_estimator<K: ByteSized, V: ByteSized>() -> SizeEstimator<K, V> {
    Arc::new(|k: &K, v: &V| k.byte_size() + v.byte_size())
}

// == Deep Size Trait ==
/// Approximate deep memory footprint of a value, in bytes.
///
/// Counts the inline size plus owned heap allocations, recursively. Owned
/// data in Rust cannot form reference cycles, so no visited-set is needed.
pub trait ByteSized {
    /// Estimated total bytes held by this value.
    fn byte_size(&self) -> usize;
}

macro_rules! impl_byte_sized_inline {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteSized for $ty {
                fn byte_size(&self) -> usize {
                    mem::size_of::<$ty>()
                }
            }
        )*
    };
}

impl_byte_sized_inline!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, ()
);

impl ByteSized for String {
    fn byte_size(&self) -> usize {
        mem::size_of::<String>() + self.capacity()
    }
}

impl<T: ByteSized> ByteSized for Vec<T> {
    fn byte_size(&self) -> usize {
        let spare = (self.capacity() - self.len()) * mem::size_of::<T>();
        mem::size_of::<Vec<T>>() + spare + self.iter().map(ByteSized::byte_size).sum::<usize>()
    }
}

impl<T: ByteSized> ByteSized for Option<T> {
    fn byte_size(&self) -> usize {
        match self {
            Some(inner) => mem::size_of::<Option<T>>() - mem::size_of::<T>() + inner.byte_size(),
            None => mem::size_of::<Option<T>>(),
        }
    }
}

impl<T: ByteSized> ByteSized for Box<T> {
    fn byte_size(&self) -> usize {
        mem::size_of::<Box<T>>() + self.as_ref().byte_size()
    }
}

impl<A: ByteSized, B: ByteSized> ByteSized for (A, B) {
    fn byte_size(&self) -> usize {
        self.0.byte_size() + self.1.byte_size()
    }
}

impl<K: ByteSized, V: ByteSized, S> ByteSized for HashMap<K, V, S> {
    fn byte_size(&self) -> usize {
        mem::size_of::<Self>()
            + self
                .iter()
                .map(|(k, v)| k.byte_size() + v.byte_size())
                .sum::<usize>()
    }
}

impl<K: ByteSized, V: ByteSized> ByteSized for BTreeMap<K, V> {
    fn byte_size(&self) -> usize {
        mem::size_of::<Self>()
            + self
                .iter()
                .map(|(k, v)| k.byte_size() + v.byte_size())
                .sum::<usize>()
    }
}
