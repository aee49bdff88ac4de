use std::ffi::c_int;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use magicscope_ffi as ffi;

use crate::error::{MagicError, Result};

bitflags! {
    /// Behavior flags controlling how libmagic classifies content.
    ///
    /// Values match `magic.h`. `MIME` and `NODESC` are unions of the
    /// primitive flags declared before them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: c_int {
        const NONE = ffi::MAGIC_NONE;
        /// Print debugging messages to stderr.
        const DEBUG = ffi::MAGIC_DEBUG;
        /// Follow symlinks.
        const SYMLINK = ffi::MAGIC_SYMLINK;
        /// Look inside compressed files.
        const COMPRESS = ffi::MAGIC_COMPRESS;
        /// Look at the contents of devices.
        const DEVICES = ffi::MAGIC_DEVICES;
        /// Return the MIME type.
        const MIME_TYPE = ffi::MAGIC_MIME_TYPE;
        /// Return all matches, not just the first.
        const CONTINUE = ffi::MAGIC_CONTINUE;
        /// Print warnings to stderr.
        const CHECK = ffi::MAGIC_CHECK;
        /// Restore access time on exit.
        const PRESERVE_ATIME = ffi::MAGIC_PRESERVE_ATIME;
        /// Don't convert unprintable chars.
        const RAW = ffi::MAGIC_RAW;
        /// Handle ENOENT etc. as real errors.
        const ERROR = ffi::MAGIC_ERROR;
        /// Return the MIME encoding.
        const MIME_ENCODING = ffi::MAGIC_MIME_ENCODING;
        /// Return the Apple creator/type.
        const APPLE = ffi::MAGIC_APPLE;
        /// Return a `/`-separated list of extensions.
        const EXTENSION = ffi::MAGIC_EXTENSION;
        /// Check inside compressed files but don't report compression.
        const COMPRESS_TRANSP = ffi::MAGIC_COMPRESS_TRANSP;

        const NO_CHECK_COMPRESS = ffi::MAGIC_NO_CHECK_COMPRESS;
        const NO_CHECK_TAR = ffi::MAGIC_NO_CHECK_TAR;
        const NO_CHECK_SOFT = ffi::MAGIC_NO_CHECK_SOFT;
        const NO_CHECK_APPTYPE = ffi::MAGIC_NO_CHECK_APPTYPE;
        const NO_CHECK_ELF = ffi::MAGIC_NO_CHECK_ELF;
        const NO_CHECK_TEXT = ffi::MAGIC_NO_CHECK_TEXT;
        const NO_CHECK_CDF = ffi::MAGIC_NO_CHECK_CDF;
        const NO_CHECK_TOKENS = ffi::MAGIC_NO_CHECK_TOKENS;
        const NO_CHECK_ENCODING = ffi::MAGIC_NO_CHECK_ENCODING;

        /// MIME type and encoding: `type/subtype; charset=...`.
        const MIME = Self::MIME_TYPE.bits() | Self::MIME_ENCODING.bits();
        /// Extension, MIME and Apple output, no textual description.
        const NODESC = Self::EXTENSION.bits() | Self::MIME.bits() | Self::APPLE.bits();
    }
}

impl Flags {
    /// Parse a single flag name. Accepts `MIME_TYPE`, `mime_type` and `mime-type`.
    pub fn parse_name(name: &str) -> Result<Self> {
        let normalized = name.trim().replace('-', "_").to_ascii_uppercase();
        Self::from_name(&normalized)
            .ok_or_else(|| MagicError::Config(format!("Unknown flag: {}", name.trim())))
    }

    /// Parse a `|`- or `,`-separated list of flag names. Empty means `NONE`.
    pub fn parse_list(list: &str) -> Result<Self> {
        list.split(['|', ','])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .try_fold(Self::NONE, |acc, name| Ok::<_, MagicError>(acc | Self::parse_name(name)?))
    }

    /// Union of all names in `names`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names
            .iter()
            .try_fold(Self::NONE, |acc, name| Ok::<_, MagicError>(acc | Self::parse_name(name.as_ref())?))
    }

    /// Names of the primitive flags set, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join(" | "))
        }
    }
}

impl FromStr for Flags {
    type Err = MagicError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_list(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composites_are_unions() {
        assert_eq!(Flags::MIME, Flags::MIME_TYPE | Flags::MIME_ENCODING);
        assert_eq!(Flags::NODESC, Flags::EXTENSION | Flags::MIME | Flags::APPLE);
        assert_eq!(Flags::NONE.bits(), 0);
        assert_eq!(Flags::NODESC.bits(), ffi::MAGIC_NODESC);
    }

    #[test]
    fn test_parse_name_variants() {
        assert_eq!(Flags::parse_name("MIME_TYPE").unwrap(), Flags::MIME_TYPE);
        assert_eq!(Flags::parse_name("mime-type").unwrap(), Flags::MIME_TYPE);
        assert_eq!(Flags::parse_name(" no_check_tar ").unwrap(), Flags::NO_CHECK_TAR);
        assert_eq!(Flags::parse_name("nodesc").unwrap(), Flags::NODESC);
        assert!(Flags::parse_name("bogus").is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(Flags::parse_list("").unwrap(), Flags::NONE);
        assert_eq!(
            "mime-type | symlink, compress".parse::<Flags>().unwrap(),
            Flags::MIME_TYPE | Flags::SYMLINK | Flags::COMPRESS
        );
        assert!(Flags::parse_list("mime|nope").is_err());
    }

    #[test]
    fn test_from_names() {
        let flags = Flags::from_names(&["extension", "mime", "apple"]).unwrap();
        assert_eq!(flags, Flags::NODESC);
    }

    #[test]
    fn test_display_lists_primitives() {
        assert_eq!(Flags::NONE.to_string(), "NONE");
        assert_eq!(Flags::MIME.to_string(), "MIME_TYPE | MIME_ENCODING");
        assert_eq!(Flags::default(), Flags::NONE);
    }
}
