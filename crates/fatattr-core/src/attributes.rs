use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// FAT directory-entry attribute bits, as reported by the VFAT driver.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct AttributeSet: u32 {
        const READ_ONLY    = 0x01;
        const HIDDEN       = 0x02;
        const SYSTEM       = 0x04;
        const VOLUME_LABEL = 0x08;
        const DIRECTORY    = 0x10;
        const ARCHIVE      = 0x20;
    }
}

/// Display order of the fixed-width rendering.
const COLUMNS: [(char, AttributeSet); 6] = [
    ('R', AttributeSet::READ_ONLY),
    ('H', AttributeSet::HIDDEN),
    ('S', AttributeSet::SYSTEM),
    ('A', AttributeSet::ARCHIVE),
    ('D', AttributeSet::DIRECTORY),
    ('V', AttributeSet::VOLUME_LABEL),
];

impl AttributeSet {
    /// Map a command-line attribute letter to its bit.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'R' => Some(Self::READ_ONLY),
            'A' => Some(Self::ARCHIVE),
            'S' => Some(Self::SYSTEM),
            'H' => Some(Self::HIDDEN),
            'D' => Some(Self::DIRECTORY),
            'V' => Some(Self::VOLUME_LABEL),
            _ => None,
        }
    }

    /// Wrap a raw kernel value, keeping bits this crate does not name.
    pub fn from_raw(raw: u32) -> Self {
        Self::from_bits_retain(raw)
    }

    pub fn is_directory(&self) -> bool {
        self.contains(Self::DIRECTORY)
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, bit) in COLUMNS {
            let c = if self.contains(bit) { letter } else { '-' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_columns() {
        assert_eq!(AttributeSet::empty().to_string(), "------");
        assert_eq!(AttributeSet::ARCHIVE.to_string(), "---A--");
        assert_eq!(
            (AttributeSet::READ_ONLY | AttributeSet::ARCHIVE).to_string(),
            "R--A--"
        );
        assert_eq!(AttributeSet::all().to_string(), "RHSADV");
    }

    #[test]
    fn letters_map_to_bits() {
        assert_eq!(AttributeSet::from_letter('R'), Some(AttributeSet::READ_ONLY));
        assert_eq!(AttributeSet::from_letter('V'), Some(AttributeSet::VOLUME_LABEL));
        assert_eq!(AttributeSet::from_letter('r'), None);
        assert_eq!(AttributeSet::from_letter('X'), None);
    }

    #[test]
    fn unknown_kernel_bits_survive() {
        let raw = AttributeSet::from_raw(0x80 | 0x20);
        assert_eq!(raw.bits(), 0xA0);
        assert!(raw.contains(AttributeSet::ARCHIVE));
        assert_eq!(raw.to_string(), "---A--");
    }
}
