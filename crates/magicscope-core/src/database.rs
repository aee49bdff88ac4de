use std::ffi::{CString, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MagicError, Result};

/// Separator between database files, as libmagic expects.
pub const SEPARATOR: char = ':';

/// Suffix libmagic appends to the base name of a compiled database.
pub const COMPILED_SUFFIX: &str = ".mgc";

/// Set of magic database files passed to load/check/compile/list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseList {
    /// The library's built-in default database.
    #[default]
    Default,
    Files(Vec<PathBuf>),
}

impl DatabaseList {
    /// Parse a colon-separated list. The empty string means the default.
    pub fn parse(list: &str) -> Self {
        let files: Vec<PathBuf> = list
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        Self::from_paths(files)
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if files.is_empty() {
            DatabaseList::Default
        } else {
            DatabaseList::Files(files)
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, DatabaseList::Default)
    }

    pub fn files(&self) -> &[PathBuf] {
        match self {
            DatabaseList::Default => &[],
            DatabaseList::Files(files) => files,
        }
    }

    /// The C string handed to libmagic; `None` selects the default database.
    ///
    /// Paths keep their raw bytes. A path containing [`SEPARATOR`] can't be
    /// expressed in the list and is rejected.
    pub(crate) fn to_c_string(&self) -> Result<Option<CString>> {
        let files = match self {
            DatabaseList::Default => return Ok(None),
            DatabaseList::Files(files) => files,
        };
        let mut joined = Vec::new();
        for (i, path) in files.iter().enumerate() {
            let bytes = path_bytes(path);
            if bytes.contains(&(SEPARATOR as u8)) {
                return Err(MagicError::InvalidPath(format!(
                    "{} contains the list separator '{SEPARATOR}'",
                    path.display()
                )));
            }
            if i > 0 {
                joined.push(SEPARATOR as u8);
            }
            joined.extend_from_slice(&bytes);
        }
        CString::new(joined)
            .map(Some)
            .map_err(|_| MagicError::InvalidPath(self.to_string()))
    }

    /// Files `compile` writes: each input's base name plus `.mgc`, in the
    /// current working directory.
    pub fn compiled_outputs(&self) -> Vec<PathBuf> {
        self.files().iter().filter_map(|p| compiled_name(p)).collect()
    }

    /// Human label used in errors and logs.
    pub fn describe(&self) -> String {
        match self {
            DatabaseList::Default => "default database".to_string(),
            DatabaseList::Files(_) => self.to_string(),
        }
    }
}

fn compiled_name(path: &Path) -> Option<PathBuf> {
    let base = path.file_name()?;
    // libmagic strips an existing ".mgc" before appending it again.
    if let Some(stem) = base.to_str().and_then(|b| b.strip_suffix(COMPILED_SUFFIX)) {
        return Some(PathBuf::from(format!("{stem}{COMPILED_SUFFIX}")));
    }
    let mut name = OsString::from(base);
    name.push(COMPILED_SUFFIX);
    Some(PathBuf::from(name))
}

/// Raw bytes of `path` as libmagic receives them.
#[cfg(unix)]
pub(crate) fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
pub(crate) fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

impl fmt::Display for DatabaseList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .files()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        f.write_str(&parts.join(&SEPARATOR.to_string()))
    }
}

impl FromStr for DatabaseList {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for DatabaseList {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_means_default() {
        assert_eq!(DatabaseList::parse(""), DatabaseList::Default);
        assert_eq!(DatabaseList::parse(":"), DatabaseList::Default);
        assert!(DatabaseList::default().is_default());
        assert!(DatabaseList::Default.to_c_string().unwrap().is_none());
    }

    #[test]
    fn test_colon_separated_roundtrip() {
        let list = DatabaseList::parse("/usr/share/misc/magic:local/extra");
        assert_eq!(list.files().len(), 2);
        assert_eq!(list.to_string(), "/usr/share/misc/magic:local/extra");
        let c = list.to_c_string().unwrap().unwrap();
        assert_eq!(c.to_str().unwrap(), "/usr/share/misc/magic:local/extra");
    }

    #[test]
    fn test_compiled_outputs_use_base_names() {
        let list = DatabaseList::parse("dir/a:/abs/path/b.mgc");
        assert_eq!(
            list.compiled_outputs(),
            vec![PathBuf::from("a.mgc"), PathBuf::from("b.mgc")]
        );
        assert!(DatabaseList::Default.compiled_outputs().is_empty());
    }

    #[test]
    fn test_interior_nul_rejected() {
        let list = DatabaseList::from_paths(["bad\0name"]);
        assert!(matches!(list.to_c_string(), Err(MagicError::InvalidPath(_))));
    }

    #[test]
    fn test_separator_inside_path_rejected() {
        let list = DatabaseList::from_paths(["/tmp/a:b"]);
        assert_eq!(list.files().len(), 1);
        let err = list.to_c_string().unwrap_err();
        assert!(matches!(err, MagicError::InvalidPath(_)));
        assert!(err.to_string().contains("separator"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_bytes_preserved() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let odd = PathBuf::from(OsStr::from_bytes(b"dir/db\xff"));
        let list = DatabaseList::from_paths([odd.clone(), PathBuf::from("plain")]);
        let c = list.to_c_string().unwrap().unwrap();
        assert_eq!(c.as_bytes(), b"dir/db\xff:plain");
        assert_eq!(
            list.compiled_outputs()[0].as_os_str().as_bytes(),
            b"db\xff.mgc"
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(DatabaseList::Default.describe(), "default database");
        assert_eq!(DatabaseList::from("x:y").describe(), "x:y");
    }
}
