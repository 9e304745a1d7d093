//! File-open primitive
//!
//! A small builder over [`std::fs::OpenOptions`] that also creates missing
//! parent directories and applies unix permission bits.

use std::fs::{self, File, Metadata, OpenOptions};
use std::path::Path;

use crate::{Result, TaglogError};

/// Default permission bits for created files
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Permission bits for created parent directories
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// How the opened handle may be used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// Options for opening (and usually creating) a file
#[derive(Debug, Clone)]
pub struct FileOpener {
    access: Access,
    truncate: bool,
    create_new: bool,
    create_parents: bool,
    mode: u32,
}

impl Default for FileOpener {
    fn default() -> Self {
        Self {
            access: Access::ReadWrite,
            truncate: false,
            create_new: false,
            create_parents: true,
            mode: DEFAULT_FILE_MODE,
        }
    }
}

impl FileOpener {
    /// Read-write, append, create if missing, create parent directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Open for reading only. The file is never created in this mode.
    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.access = Access::WriteOnly;
        self
    }

    /// Truncate existing content instead of appending
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Fail with `AlreadyExists` if the file is already there
    pub fn create_new(mut self, create_new: bool) -> Self {
        self.create_new = create_new;
        self
    }

    pub fn create_parents(mut self, create_parents: bool) -> Self {
        self.create_parents = create_parents;
        self
    }

    /// Permission bits for a newly created file (unix only)
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_truncate(&self) -> bool {
        self.truncate
    }

    /// Open `path` with the configured flags
    pub fn open(&self, path: impl AsRef<Path>) -> Result<File> {
        let path = path.as_ref();

        if self.create_parents && self.access != Access::ReadOnly {
            create_parent_dirs(path)?;
        }

        let mut options = OpenOptions::new();
        match self.access {
            Access::ReadOnly => {
                options.read(true);
            }
            Access::ReadWrite | Access::WriteOnly => {
                options.read(self.access == Access::ReadWrite);
                if self.truncate {
                    options.write(true).truncate(true);
                } else {
                    options.append(true);
                }
                if self.create_new {
                    options.create_new(true);
                } else {
                    options.create(true);
                }
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.mode);
        }

        options.open(path).map_err(|e| TaglogError::FileOpen {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Metadata for `path`, or `None` if it cannot be stat'ed
pub fn stat_if_exists(path: impl AsRef<Path>) -> Option<Metadata> {
    fs::metadata(path).ok()
}

fn create_parent_dirs(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DEFAULT_DIR_MODE);
    }

    builder.create(parent).map_err(|e| TaglogError::FileWrite {
        path: parent.to_path_buf(),
        source: e,
    })
}
