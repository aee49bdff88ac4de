use std::ffi::c_int;
use std::fmt;
use std::str::FromStr;

use magicscope_ffi as ffi;

use crate::error::{EngineError, MagicError};

/// Tunable limits bounding libmagic's recursion and processing depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Param {
    /// Recursion depth for indirect magic entries.
    IndirMax = ffi::MAGIC_PARAM_INDIR_MAX,
    /// Recursion depth for name/use calls.
    NameMax = ffi::MAGIC_PARAM_NAME_MAX,
    /// ELF program header entries processed.
    ElfPhnumMax = ffi::MAGIC_PARAM_ELF_PHNUM_MAX,
    /// ELF section entries processed.
    ElfShnumMax = ffi::MAGIC_PARAM_ELF_SHNUM_MAX,
    /// ELF notes processed.
    ElfNotesMax = ffi::MAGIC_PARAM_ELF_NOTES_MAX,
    /// Regex evaluations.
    RegexMax = ffi::MAGIC_PARAM_REGEX_MAX,
    /// Bytes read from the input.
    BytesMax = ffi::MAGIC_PARAM_BYTES_MAX,
}

impl Param {
    pub const ALL: [Param; 7] = [
        Param::IndirMax,
        Param::NameMax,
        Param::ElfPhnumMax,
        Param::ElfShnumMax,
        Param::ElfNotesMax,
        Param::RegexMax,
        Param::BytesMax,
    ];

    pub fn id(self) -> c_int {
        self as c_int
    }

    pub fn name(self) -> &'static str {
        match self {
            Param::IndirMax => "indir_max",
            Param::NameMax => "name_max",
            Param::ElfPhnumMax => "elf_phnum_max",
            Param::ElfShnumMax => "elf_shnum_max",
            Param::ElfNotesMax => "elf_notes_max",
            Param::RegexMax => "regex_max",
            Param::BytesMax => "bytes_max",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for Param {
    type Error = MagicError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Param::ALL
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| MagicError::Param {
                param: id.to_string(),
                source: EngineError::new(0, "unknown parameter id"),
            })
    }
}

impl FromStr for Param {
    type Err = MagicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        Param::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| MagicError::Param {
                param: s.trim().to_string(),
                source: EngineError::new(0, "unknown parameter name"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_header() {
        assert_eq!(Param::IndirMax.id(), 0);
        assert_eq!(Param::BytesMax.id(), 6);
        for (i, p) in Param::ALL.iter().enumerate() {
            assert_eq!(p.id(), i as i32);
        }
    }

    #[test]
    fn test_try_from_id() {
        assert_eq!(Param::try_from(5).unwrap(), Param::RegexMax);
        assert!(matches!(Param::try_from(99), Err(MagicError::Param { .. })));
        assert!(Param::try_from(-1).is_err());
    }

    #[test]
    fn test_parse_name() {
        assert_eq!("bytes_max".parse::<Param>().unwrap(), Param::BytesMax);
        assert_eq!("ELF-NOTES-MAX".parse::<Param>().unwrap(), Param::ElfNotesMax);
        assert!("depth".parse::<Param>().is_err());
    }
}
