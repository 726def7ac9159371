//! Storage amounts with binary units.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::error::QuotaError;

/// Binary storage unit, each 1024 times the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageUnit {
    B,
    KiB,
    MiB,
    GiB,
    TiB,
    PiB,
    EiB,
}

impl StorageUnit {
    /// Units from smallest to largest.
    pub const ALL: [StorageUnit; 7] = [
        StorageUnit::B,
        StorageUnit::KiB,
        StorageUnit::MiB,
        StorageUnit::GiB,
        StorageUnit::TiB,
        StorageUnit::PiB,
        StorageUnit::EiB,
    ];

    /// Bytes in one of this unit.
    pub const fn bytes(self) -> u128 {
        1u128 << (10 * self as u32)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            StorageUnit::B => "B",
            StorageUnit::KiB => "KiB",
            StorageUnit::MiB => "MiB",
            StorageUnit::GiB => "GiB",
            StorageUnit::TiB => "TiB",
            StorageUnit::PiB => "PiB",
            StorageUnit::EiB => "EiB",
        }
    }
}

impl fmt::Display for StorageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for StorageUnit {
    type Err = QuotaError;

    /// Accepts binary symbols and the short decimal-looking forms (`MB`,
    /// `M`), all read as powers of 1024.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "B" => Ok(StorageUnit::B),
            "KIB" | "KB" | "K" => Ok(StorageUnit::KiB),
            "MIB" | "MB" | "M" => Ok(StorageUnit::MiB),
            "GIB" | "GB" | "G" => Ok(StorageUnit::GiB),
            "TIB" | "TB" | "T" => Ok(StorageUnit::TiB),
            "PIB" | "PB" | "P" => Ok(StorageUnit::PiB),
            "EIB" | "EB" | "E" => Ok(StorageUnit::EiB),
            _ => Err(QuotaError::InvalidQuota(s.to_string())),
        }
    }
}

/// An amount of storage.
///
/// Held exactly in bytes; the unit only affects display. Equality, ordering
/// and hashing compare the byte amount, so `1 KiB == 1024 B`.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    bytes: u128,
    unit: StorageUnit,
}

impl Quota {
    pub const ZERO: Quota = Quota {
        bytes: 0,
        unit: StorageUnit::B,
    };

    pub fn new(amount: u64, unit: StorageUnit) -> Self {
        Self {
            bytes: u128::from(amount) * unit.bytes(),
            unit,
        }
    }

    pub const fn from_bytes(bytes: u128) -> Self {
        Self {
            bytes,
            unit: StorageUnit::B,
        }
    }

    pub fn bytes(&self) -> u128 {
        self.bytes
    }

    /// Byte amount clamped into a `u64`.
    pub fn bytes_u64(&self) -> u64 {
        u64::try_from(self.bytes).unwrap_or(u64::MAX)
    }

    pub fn unit(&self) -> StorageUnit {
        self.unit
    }

    /// Amount expressed in `unit`.
    pub fn value_in(&self, unit: StorageUnit) -> f64 {
        self.bytes as f64 / unit.bytes() as f64
    }

    /// Sum of both amounts, saturating. Keeps this quota's unit.
    pub fn add(&self, other: &Quota) -> Quota {
        Quota {
            bytes: self.bytes.saturating_add(other.bytes),
            unit: self.unit,
        }
    }

    /// Difference clamped at zero. Keeps this quota's unit.
    pub fn saturating_sub(&self, other: &Quota) -> Quota {
        Quota {
            bytes: self.bytes.saturating_sub(other.bytes),
            unit: self.unit,
        }
    }

    /// Signed byte difference `self - other`, independent of either unit.
    pub fn difference(&self, other: &Quota) -> i128 {
        let (larger, smaller, sign) = if self.bytes >= other.bytes {
            (self.bytes, other.bytes, 1)
        } else {
            (other.bytes, self.bytes, -1)
        };
        i128::try_from(larger - smaller).unwrap_or(i128::MAX) * sign
    }

    /// Same amount in the largest unit whose value is at least one.
    pub fn nice(&self) -> Quota {
        let unit = StorageUnit::ALL
            .iter()
            .rev()
            .copied()
            .find(|unit| self.bytes >= unit.bytes())
            .unwrap_or(StorageUnit::B);
        Quota {
            bytes: self.bytes,
            unit,
        }
    }

    /// Same amount displayed in `unit`.
    pub fn in_unit(&self, unit: StorageUnit) -> Quota {
        Quota {
            bytes: self.bytes,
            unit,
        }
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Quota {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Quota {}

impl PartialOrd for Quota {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quota {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for Quota {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit_bytes = self.unit.bytes();
        if self.bytes % unit_bytes == 0 {
            write!(f, "{} {}", self.bytes / unit_bytes, self.unit)
        } else {
            write!(f, "{:.2} {}", self.value_in(self.unit), self.unit)
        }
    }
}

impl FromStr for Quota {
    type Err = QuotaError;

    /// Parses `"<amount> <unit>"`, with or without the space. Fractional
    /// amounts are rounded to the nearest byte.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (amount, unit) = s.split_at(split);
        if amount.is_empty() {
            return Err(QuotaError::InvalidQuota(s.to_string()));
        }
        let unit: StorageUnit = unit
            .parse()
            .map_err(|_| QuotaError::InvalidQuota(s.to_string()))?;

        if let Ok(whole) = amount.parse::<u64>() {
            return Ok(Quota::new(whole, unit));
        }
        let fractional: f64 = amount
            .parse()
            .map_err(|_| QuotaError::InvalidQuota(s.to_string()))?;
        Ok(Quota {
            bytes: (fractional * unit.bytes() as f64).round() as u128,
            unit,
        })
    }
}

/// Round a file size up to a whole number of filesystem blocks.
///
/// A block size of zero leaves the size unchanged.
pub fn round_to_block(size: u64, block_size: u64) -> u64 {
    if block_size == 0 {
        return size;
    }
    size.div_ceil(block_size).saturating_mul(block_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_sizes() {
        assert_eq!(StorageUnit::B.bytes(), 1);
        assert_eq!(StorageUnit::KiB.bytes(), 1024);
        assert_eq!(StorageUnit::GiB.bytes(), 1024 * 1024 * 1024);
        assert_eq!(StorageUnit::EiB.bytes(), 1u128 << 60);
    }

    #[test]
    fn test_difference_converts_units() {
        let mib = Quota::new(1, StorageUnit::MiB);
        let kib = Quota::new(1024, StorageUnit::KiB);

        assert_eq!(mib.difference(&kib), 0);
        assert_eq!(mib, kib);
        assert_eq!(Quota::new(2, StorageUnit::KiB).difference(&Quota::new(1, StorageUnit::KiB)), 1024);
        assert_eq!(Quota::new(1, StorageUnit::B).difference(&Quota::new(1, StorageUnit::KiB)), -1023);
    }

    #[test]
    fn test_ordering_ignores_unit() {
        assert!(Quota::new(1, StorageUnit::GiB) > Quota::new(1023, StorageUnit::MiB));
        assert!(Quota::new(1, StorageUnit::B) < Quota::new(1, StorageUnit::KiB));
    }

    #[test]
    fn test_add_and_saturating_sub() {
        let a = Quota::new(1, StorageUnit::KiB);
        let b = Quota::new(512, StorageUnit::B);

        assert_eq!(a.add(&b).bytes(), 1536);
        assert_eq!(a.add(&b).unit(), StorageUnit::KiB);
        assert_eq!(b.saturating_sub(&a), Quota::ZERO);
        assert_eq!(Quota::from_bytes(u128::MAX).add(&a).bytes(), u128::MAX);
    }

    #[test]
    fn test_nice_picks_largest_unit() {
        assert_eq!(Quota::from_bytes(1536).nice().unit(), StorageUnit::KiB);
        assert_eq!(Quota::new(3, StorageUnit::GiB).nice().unit(), StorageUnit::GiB);
        assert_eq!(Quota::from_bytes(10).nice().unit(), StorageUnit::B);
        assert_eq!(Quota::ZERO.nice().unit(), StorageUnit::B);
    }

    #[test]
    fn test_display() {
        assert_eq!(Quota::new(10, StorageUnit::MiB).to_string(), "10 MiB");
        assert_eq!(Quota::from_bytes(1536).nice().to_string(), "1.50 KiB");
        assert_eq!(Quota::ZERO.to_string(), "0 B");
    }

    #[test]
    fn test_parse() {
        assert_eq!("10 MiB".parse::<Quota>().unwrap(), Quota::new(10, StorageUnit::MiB));
        assert_eq!("512B".parse::<Quota>().unwrap().bytes(), 512);
        assert_eq!("2gb".parse::<Quota>().unwrap().bytes(), 2 * (1 << 30));
        assert_eq!("1024".parse::<Quota>().unwrap().bytes(), 1024);
        assert_eq!("1.5 KiB".parse::<Quota>().unwrap().bytes(), 1536);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Quota>().is_err());
        assert!("MiB".parse::<Quota>().is_err());
        assert!("10 parsecs".parse::<Quota>().is_err());
        assert!("1.2.3 MiB".parse::<Quota>().is_err());
    }

    #[test]
    fn test_round_to_block() {
        assert_eq!(round_to_block(2049, 2048), 4096);
        assert_eq!(round_to_block(2048, 2048), 2048);
        assert_eq!(round_to_block(0, 2048), 0);
        assert_eq!(round_to_block(1, 4096), 4096);
        assert_eq!(round_to_block(123, 0), 123);
    }
}
