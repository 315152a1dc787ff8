use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Weapon modifier categories a recipe grants, packed into 9 bits.
    ///
    /// The same set doubles as the recipe "price": the game encodes the
    /// modifier in the sell price of the cooked item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ModifierSet: u16 {
        /// Attack up
        const ADD_POWER = 0x1;
        /// Durability up
        const ADD_LIFE = 0x2;
        /// Critical hit
        const CRITICAL = 0x4;
        /// Long throw
        const ADD_THROW = 0x8;
        /// Multishot. Combined with `ZOOM` this becomes focus shot.
        const SPREAD_FIRE = 0x10;
        const ZOOM = 0x20;
        /// Quick shot
        const RAPID_FIRE = 0x40;
        /// Slick shield
        const SURF_MASTER = 0x80;
        /// Guard up
        const ADD_GUARD = 0x100;
    }
}

impl ModifierSet {
    /// Number of modifier flags.
    pub const COUNT: usize = 9;

    /// True if every bit of `required` is present in `self`.
    #[inline]
    pub fn has_all(self, required: ModifierSet) -> bool {
        self.intersection(required) == required
    }

    /// True if no bit of `excluded` is present in `self`.
    #[inline]
    pub fn has_none(self, excluded: ModifierSet) -> bool {
        self.intersection(excluded).is_empty()
    }

    /// Look up a single flag by its name, case-insensitively.
    ///
    /// Accepts both the constant name (`ADD_POWER`) and the camel case
    /// form used by the UI (`addPower`).
    pub fn from_flag_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::all().iter_names().find_map(|(flag_name, flag)| {
            let candidate: String = flag_name
                .chars()
                .filter(|c| *c != '_')
                .flat_map(char::to_lowercase)
                .collect();
            (candidate == normalized).then_some(flag)
        })
    }
}

impl From<u16> for ModifierSet {
    #[inline]
    fn from(value: u16) -> Self {
        Self::from_bits_truncate(value)
    }
}

impl From<ModifierSet> for u16 {
    #[inline]
    fn from(value: ModifierSet) -> Self {
        value.bits()
    }
}

impl Serialize for ModifierSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

impl<'de> Deserialize<'de> for ModifierSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}
