use crate::catalog::{EMPTY_GROUP, GroupId};
use crate::error::DatabaseError;
use crate::modifier::ModifierSet;
use bincode::config::{Configuration, Fixint, LittleEndian};
use bincode::serde::{decode_from_slice, encode_into_slice};
use bitflags::bitflags;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Number of ingredient slots in a recipe.
pub const NUM_SLOTS: usize = 5;

/// Encoded size of one record: 5 x u16 slots, u8 value, u8 flags, u16 modifier.
pub const RECORD_SIZE: usize = 14;

/// Highest value a recipe can have.
pub const MAX_VALUE: u8 = 120;

/// Bonus added to the value of a hearty recipe when it crits
pub const HEARTY_CRIT_BONUS: u8 = 4;
/// Bonus added to the value of a regular recipe when it crits
pub const REGULAR_CRIT_BONUS: u8 = 12;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RecordFlags: u8 {
        /// The cooked item raises max hearts
        const HEARTY = 0x1;
        /// The value has a random chance to crit
        const CRIT_RNG = 0x2;
    }
}

/// Fixed-int, little-endian: every record has exactly `RECORD_SIZE` bytes.
#[inline]
pub fn record_config() -> Configuration<LittleEndian, Fixint> {
    bincode::config::standard().with_fixed_int_encoding()
}

/// On-disk form of a recipe. The id is implied by the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct RawRecord {
    slots: [GroupId; NUM_SLOTS],
    value: u8,
    flags: u8,
    modifier: u16,
}

/// A precomputed recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: u64,
    /// Ingredient groups in ascending order, empty slots first
    pub slots: [GroupId; NUM_SLOTS],
    pub value: u8,
    pub modifier: ModifierSet,
    pub hearty: bool,
    pub crit_rng: bool,
}

impl Recipe {
    /// Decode a record read from a chunk.
    pub fn decode(id: u64, bytes: &[u8]) -> Result<Self, DatabaseError> {
        let (raw, _): (RawRecord, usize) = decode_from_slice(bytes, record_config())
            .map_err(|e| DatabaseError::InvalidRecord(format!("recipe {}: {}", id, e)))?;
        let flags = RecordFlags::from_bits_truncate(raw.flags);
        Ok(Self {
            id,
            slots: raw.slots,
            value: raw.value,
            modifier: ModifierSet::from(raw.modifier),
            hearty: flags.contains(RecordFlags::HEARTY),
            crit_rng: flags.contains(RecordFlags::CRIT_RNG),
        })
    }

    /// Encode into exactly `RECORD_SIZE` bytes.
    pub fn encode(&self) -> Result<[u8; RECORD_SIZE], DatabaseError> {
        let mut flags = RecordFlags::empty();
        flags.set(RecordFlags::HEARTY, self.hearty);
        flags.set(RecordFlags::CRIT_RNG, self.crit_rng);
        let raw = RawRecord {
            slots: self.slots,
            value: self.value,
            flags: flags.bits(),
            modifier: self.modifier.bits(),
        };
        let mut buf = [0u8; RECORD_SIZE];
        let written = encode_into_slice(raw, &mut buf, record_config())
            .map_err(|e| DatabaseError::InvalidRecord(format!("recipe {}: {}", self.id, e)))?;
        if written != RECORD_SIZE {
            return Err(DatabaseError::InvalidRecord(format!(
                "recipe {} encoded to {} bytes",
                self.id, written
            )));
        }
        Ok(buf)
    }

    /// The value reached when the crit RNG hits, or the raw value if it can't crit.
    pub fn crit_value(&self) -> u8 {
        if !self.crit_rng {
            return self.value;
        }
        let bonus = if self.hearty {
            HEARTY_CRIT_BONUS
        } else {
            REGULAR_CRIT_BONUS
        };
        self.value.saturating_add(bonus).min(MAX_VALUE)
    }

    /// Non-empty slots, in slot order (may repeat a group).
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.slots.iter().copied().filter(|g| *g != EMPTY_GROUP)
    }

    /// Distinct non-empty groups referenced by the recipe.
    pub fn unique_groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        // slots are sorted, so dedup is enough
        self.groups().dedup()
    }

    /// Number of non-empty slots
    pub fn ingredient_count(&self) -> usize {
        self.groups().count()
    }
}
