//! Incremental file-name resolution
//!
//! Finds a usable path among `name.ext`, `name_1.ext`, `name_2.ext`, ...
//! A path that already carries a numeric suffix is incremented instead of
//! re-suffixed, so `name_1.ext` is followed by `name_2.ext` and never by
//! `name_1_1.ext`.

use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use taglog_utils::stat_if_exists;
use tracing::debug;

/// A path split into `<stem>_<number>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixState {
    pub stem: OsString,
    /// 0 when the path has no numeric suffix
    pub number: u64,
    pub extension: Option<OsString>,
}

impl SuffixState {
    /// Split the last segment of `path`. Without an extension the whole
    /// segment is the stem; dotfiles such as `.env` have no extension.
    pub fn parse(path: &Path) -> Self {
        let stem = path.file_stem().unwrap_or_default();
        let extension = path.extension().map(OsStr::to_os_string);

        let numbered = stem.to_str().and_then(|s| {
            let (base, digits) = s.rsplit_once('_')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((base, digits.parse::<u64>().ok()?))
        });

        match numbered {
            Some((base, number)) => Self {
                stem: OsString::from(base),
                number,
                extension,
            },
            None => Self {
                stem: stem.to_os_string(),
                number: 0,
                extension,
            },
        }
    }

    /// File name carrying suffix `number`
    pub fn file_name(&self, number: u64) -> OsString {
        let mut name = self.stem.clone();
        name.push(format!("_{}", number));
        if let Some(ext) = &self.extension {
            name.push(".");
            name.push(ext);
        }
        name
    }
}

/// Resolve `path` against `reject`.
///
/// `reject` receives each candidate with its metadata (`None` when the
/// candidate does not exist). If the original path is not rejected it is
/// returned unchanged. Otherwise suffixed candidates are probed in order
/// until one is accepted or does not exist yet; the latter ends the
/// search even when `reject` refuses it.
pub fn resolve_incremental_path<F>(path: impl AsRef<Path>, mut reject: F) -> PathBuf
where
    F: FnMut(&Path, Option<&Metadata>) -> bool,
{
    let path = path.as_ref();
    let meta = stat_if_exists(path);
    if !reject(path, meta.as_ref()) {
        return path.to_path_buf();
    }

    let state = SuffixState::parse(path);
    let mut number = state.number.saturating_add(1);

    loop {
        let candidate = path.with_file_name(state.file_name(number));
        let meta = stat_if_exists(&candidate);
        let absent = meta.is_none();

        if !reject(&candidate, meta.as_ref()) || absent || number == u64::MAX {
            debug!(
                requested = %path.display(),
                resolved = %candidate.display(),
                "rotated to suffixed path"
            );
            return candidate;
        }
        number += 1;
    }
}
