use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use magicscope_core::{Flags, Magic, MagicConfig, MagicPool};
use rayon::prelude::*;

/// Something to classify: a named file, or stdin read into memory.
pub enum Input {
    File(PathBuf),
    Stdin(Vec<u8>),
}

impl Input {
    /// `-` reads all of stdin up front.
    pub fn from_arg(arg: &Path) -> Result<Self> {
        if arg.as_os_str() == "-" {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(Input::Stdin(buf))
        } else {
            Ok(Input::File(arg.to_path_buf()))
        }
    }

    pub fn label(&self) -> String {
        match self {
            Input::File(path) => path.display().to_string(),
            Input::Stdin(_) => "/dev/stdin".to_string(),
        }
    }

    pub fn classify(&self, magic: &mut Magic) -> magicscope_core::Result<String> {
        match self {
            Input::File(path) => magic.file(path),
            Input::Stdin(bytes) => magic.buffer(bytes),
        }
    }
}

/// One classified input.
pub struct Outcome {
    pub label: String,
    pub result: magicscope_core::Result<String>,
}

/// Switches on the `identify` command that map to flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagSwitches {
    pub mime: bool,
    pub mime_type: bool,
    pub mime_encoding: bool,
    pub extension: bool,
    pub apple: bool,
    pub keep_going: bool,
    pub dereference: bool,
    pub uncompress: bool,
    pub raw: bool,
}

impl FlagSwitches {
    pub fn flags(&self) -> Flags {
        let mut flags = Flags::NONE;
        let pairs = [
            (self.mime, Flags::MIME),
            (self.mime_type, Flags::MIME_TYPE),
            (self.mime_encoding, Flags::MIME_ENCODING),
            (self.extension, Flags::EXTENSION),
            (self.apple, Flags::APPLE),
            (self.keep_going, Flags::CONTINUE),
            (self.dereference, Flags::SYMLINK),
            (self.uncompress, Flags::COMPRESS),
            (self.raw, Flags::RAW),
        ];
        for (on, flag) in pairs {
            if on {
                flags |= flag;
            }
        }
        flags
    }
}

/// Config with command-line flags and database layered on top.
pub fn effective_config(base: &MagicConfig, extra: Flags, database: Option<&str>) -> Result<MagicConfig> {
    let flags = base.parsed_flags()? | extra;
    let mut config = base.clone();
    config.flags = flags.names().into_iter().map(str::to_string).collect();
    if let Some(database) = database {
        config.database = database.to_string();
    }
    Ok(config)
}

/// Classify inputs in order on one handle.
pub fn run_sequential(config: &MagicConfig, inputs: &[Input]) -> Result<Vec<Outcome>> {
    let mut magic = config.open_magic()?;
    Ok(inputs
        .iter()
        .map(|input| Outcome {
            label: input.label(),
            result: input.classify(&mut magic),
        })
        .collect())
}

/// Classify inputs on a `jobs`-thread rayon pool, checking a handle out of
/// a [`MagicPool`] per input. Output order matches input order.
pub fn run_parallel(config: &MagicConfig, inputs: &[Input], jobs: usize) -> Result<Vec<Outcome>> {
    let jobs = jobs.clamp(1, inputs.len().max(1));
    let pool = MagicPool::with_config(jobs, config)?;
    let threads = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    Ok(threads.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                let mut magic = pool.get();
                Outcome {
                    label: input.label(),
                    result: input.classify(&mut magic),
                }
            })
            .collect()
    }))
}

/// Plain-text line for an outcome, as `file(1)` prints it.
pub fn render_line(outcome: &Outcome, brief: bool) -> String {
    let text = match &outcome.result {
        Ok(description) => description.clone(),
        Err(e) => format!("ERROR: {}", e.message()),
    };
    if brief {
        text
    } else {
        format!("{}: {text}", outcome.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_switches_to_flags() {
        let switches = FlagSwitches {
            mime: true,
            dereference: true,
            ..Default::default()
        };
        assert_eq!(switches.flags(), Flags::MIME | Flags::SYMLINK);
        assert_eq!(FlagSwitches::default().flags(), Flags::NONE);
    }

    #[test]
    fn test_effective_config_layers_flags() {
        let mut base = MagicConfig::default();
        base.flags = vec!["symlink".to_string()];
        let cfg = effective_config(&base, Flags::MIME_TYPE, Some("a:b")).unwrap();
        assert_eq!(cfg.parsed_flags().unwrap(), Flags::SYMLINK | Flags::MIME_TYPE);
        assert_eq!(cfg.database, "a:b");

        let unchanged = effective_config(&base, Flags::NONE, None).unwrap();
        assert_eq!(unchanged.database, "");
    }

    #[test]
    fn test_render_line() {
        let ok = Outcome {
            label: "notes.txt".to_string(),
            result: Ok("ASCII text".to_string()),
        };
        assert_eq!(render_line(&ok, false), "notes.txt: ASCII text");
        assert_eq!(render_line(&ok, true), "ASCII text");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        let inputs: Vec<Input> = (0..7)
            .map(|i| {
                let path = dir.path().join(format!("f{i}.txt"));
                fs::write(&path, format!("plain line {i}\n")).unwrap();
                Input::File(path)
            })
            .chain(std::iter::once(Input::Stdin(b"from a buffer\n".to_vec())))
            .collect();

        let mut config = MagicConfig::default();
        config.flags = vec!["mime-type".to_string()];

        let seq = run_sequential(&config, &inputs).unwrap();
        let par = run_parallel(&config, &inputs, 3).unwrap();
        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(&par) {
            assert_eq!(a.label, b.label);
            assert_eq!(a.result.as_ref().unwrap(), b.result.as_ref().unwrap());
        }
        assert_eq!(par.last().unwrap().label, "/dev/stdin");
    }

    #[test]
    fn test_parallel_one_outcome_per_input() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.bin");
        let inputs = vec![
            Input::Stdin(b"first\n".to_vec()),
            Input::File(missing.clone()),
            Input::Stdin(b"third\n".to_vec()),
        ];

        // More jobs than inputs; a failing input still yields exactly one outcome.
        let par = run_parallel(&MagicConfig::default(), &inputs, 16).unwrap();
        let labels: Vec<String> = par.iter().map(|o| o.label.clone()).collect();
        let expected: Vec<String> = inputs.iter().map(Input::label).collect();
        assert_eq!(labels, expected);
        assert!(par[0].result.is_ok());
        assert!(par[2].result.is_ok());
        assert_eq!(par[1].label, missing.display().to_string());
    }
}
