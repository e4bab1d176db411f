// AVC - Arc/Info vector coverage and E00 conversion.
// Copyright (C) 2025 Free Software Foundation, Inc.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <http://www.gnu.org/licenses/>.

//! Locating coverages on disk, and deleting them.
//!
//! A coverage is a directory, such as `data/roads`, whose name is also the
//! name of the coverage.  Its attribute tables live in the INFO directory
//! beside it, `data/info`, which it shares with the other coverages in
//! `data`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    error::{Error, ErrorDetails, Result},
    info,
};

/// Maximum length of a coverage name.
pub const MAX_COVER_NAME_LEN: usize = 13;

/// Where a coverage and its INFO directory are.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverPath {
    /// The coverage directory.
    pub dir: PathBuf,

    /// The coverage name, which is the last component of `dir`.
    pub name: String,

    /// The INFO directory.
    pub info_dir: PathBuf,
}

impl CoverPath {
    /// Locates an existing coverage, given either as its directory (with or
    /// without a trailing separator) or as any file inside it.
    pub fn resolve(path: &Path) -> Result<Self> {
        let invalid = || Error::new(None, ErrorDetails::InvalidCoverPath(path.to_path_buf()));
        let metadata = fs::metadata(path).map_err(|_| invalid())?;
        let dir = if metadata.is_dir() {
            path
        } else {
            path.parent().ok_or_else(invalid)?
        };
        Self::for_dir(dir).ok_or_else(invalid)
    }

    /// Describes a coverage to be created in directory `dir`.  The directory
    /// need not exist, but its name must be valid as a coverage name.
    pub fn new_cover(dir: &Path) -> Result<Self> {
        let cover = Self::for_dir(dir)
            .ok_or_else(|| Error::new(None, ErrorDetails::InvalidCoverPath(dir.to_path_buf())))?;
        validate_cover_name(&cover.name)?;
        Ok(cover)
    }

    fn for_dir(dir: &Path) -> Option<Self> {
        let name = dir.file_name()?.to_str()?;
        if name.is_empty() {
            return None;
        }
        let parent = dir.parent().unwrap_or(Path::new(""));
        Some(Self {
            dir: dir.to_path_buf(),
            name: name.into(),
            info_dir: parent.join("info"),
        })
    }

    /// Replaces the default INFO directory.
    pub fn with_info_dir(self, info_dir: PathBuf) -> Self {
        Self { info_dir, ..self }
    }

    /// Fails unless the INFO directory contains `arc.dir`.
    pub fn check_info_dir(&self) -> Result<()> {
        let arc_dir = info::arc_dir_path(&self.info_dir);
        if arc_dir.is_file() {
            Ok(())
        } else {
            Err(ErrorDetails::MissingInfoDirectory(arc_dir).into())
        }
    }

    /// Returns the path of `file_name` in the coverage directory.
    pub fn file(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Returns the `EXP  0` line that opens an E00 export of this coverage.
    /// It names a file beside the coverage, in uppercase, as if the export
    /// were written there.
    pub fn exp_line(&self) -> String {
        let dir = std::path::absolute(&self.dir).unwrap_or_else(|_| self.dir.clone());
        let dir = dir.to_string_lossy();
        let dir = dir.trim_end_matches(std::path::MAIN_SEPARATOR);
        format!("EXP  0 {}.E00", dir.to_uppercase())
    }
}

/// Checks that `name` can name a coverage: 1 to 13 ASCII letters, digits or
/// underscores.
pub fn validate_cover_name(name: &str) -> Result<(), ErrorDetails> {
    if (1..=MAX_COVER_NAME_LEN).contains(&name.len())
        && name.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'_')
    {
        Ok(())
    } else {
        Err(ErrorDetails::InvalidCoverName(name.into()))
    }
}

/// Deletes the coverage at `path`, along with its tables in the INFO
/// directory.
///
/// Other tables keep their numbers.  As with creating a table, nothing
/// stops another process from changing `arc.dir` at the same time.
pub fn delete_coverage(path: &Path) -> Result<()> {
    let cover = CoverPath::resolve(path)?;
    if cover.check_info_dir().is_ok() {
        let info_files = info::list_tables(&cover.info_dir, Some(&cover.name))?
            .into_iter()
            .map(|(name, info_file)| {
                debug!("deleting table {name} ({info_file})");
                info_file
            })
            .collect::<Vec<_>>();
        if !info_files.is_empty() {
            info::remove_tables(&cover.info_dir, &info_files)?;
        }
    }

    let entries =
        fs::read_dir(&cover.dir).map_err(|error| Error::from(error).with_path(&cover.dir))?;
    for entry in entries {
        let path = entry?.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|error| Error::from(error).with_path(&path))?;
    }
    fs::remove_dir(&cover.dir).map_err(|error| Error::from(error).with_path(&cover.dir))?;
    debug!("deleted coverage {}", cover.dir.display());
    Ok(())
}
