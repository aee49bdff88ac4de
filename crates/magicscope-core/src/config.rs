use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::database::DatabaseList;
use crate::error::Result;
use crate::flags::Flags;
use crate::magic::Magic;
use crate::param::Param;

/// Handle defaults, loaded from `~/.config/magicscope/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicConfig {
    /// Flag names, e.g. `["mime-type", "symlink"]`.
    pub flags: Vec<String>,
    /// Colon-separated database list; empty for the default database.
    pub database: String,
    pub params: ParamsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indir_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elf_phnum_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elf_shnum_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elf_notes_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_max: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `"warn"` or `"magicscope_core=debug"`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl ParamsConfig {
    pub fn get(&self, param: Param) -> Option<usize> {
        match param {
            Param::IndirMax => self.indir_max,
            Param::NameMax => self.name_max,
            Param::ElfPhnumMax => self.elf_phnum_max,
            Param::ElfShnumMax => self.elf_shnum_max,
            Param::ElfNotesMax => self.elf_notes_max,
            Param::RegexMax => self.regex_max,
            Param::BytesMax => self.bytes_max,
        }
    }

    pub fn set(&mut self, param: Param, value: Option<usize>) {
        let slot = match param {
            Param::IndirMax => &mut self.indir_max,
            Param::NameMax => &mut self.name_max,
            Param::ElfPhnumMax => &mut self.elf_phnum_max,
            Param::ElfShnumMax => &mut self.elf_shnum_max,
            Param::ElfNotesMax => &mut self.elf_notes_max,
            Param::RegexMax => &mut self.regex_max,
            Param::BytesMax => &mut self.bytes_max,
        };
        *slot = value;
    }

    /// Params that are set, in [`Param::ALL`] order.
    pub fn entries(&self) -> Vec<(Param, usize)> {
        Param::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|v| (p, v)))
            .collect()
    }
}

// ─── Handle construction ───────────────────────────────────

impl MagicConfig {
    pub fn parsed_flags(&self) -> Result<Flags> {
        Flags::from_names(&self.flags)
    }

    pub fn database_list(&self) -> DatabaseList {
        DatabaseList::parse(&self.database)
    }

    /// Open a handle with these flags, database and params.
    pub fn open_magic(&self) -> Result<Magic> {
        let mut magic = Magic::open(self.parsed_flags()?)?;
        let databases = self.database_list();
        if !databases.is_default() {
            magic.load(&databases)?;
        }
        for (param, value) in self.params.entries() {
            magic.set_param(param, value)?;
        }
        Ok(magic)
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl MagicConfig {
    /// Standard config file path: `~/.config/magicscope/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("MAGICSCOPE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("magicscope")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.parsed_flags()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}
