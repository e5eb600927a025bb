use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::record::{IdentityPatch, IdentityRecord};

/// File-backed identity database (a JSON array of records)
#[derive(Debug)]
pub struct JsonIdentityStore {
    path: PathBuf,
    records: Vec<IdentityRecord>,
}

impl JsonIdentityStore {
    /// Open the database at `path`.
    ///
    /// A missing file is an empty database. So is an unreadable or corrupt
    /// one: the HUD keeps running and the next write replaces the file.
    pub fn open(path: &Path) -> Self {
        let records = match Self::read_records(path) {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "Identity database at {} could not be loaded, starting empty: {:#}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        log::info!(
            "Identity database opened: {} record(s) from {}",
            records.len(),
            path.display()
        );

        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    fn read_records(path: &Path) -> Result<Vec<IdentityRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(path).context("Failed to read identity database")?;
        serde_json::from_str(&json).context("Failed to parse identity database")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[IdentityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record and persist
    pub fn add(&mut self, record: IdentityRecord) -> Result<()> {
        log::info!(
            "Archiving identity '{}' ({}, access {})",
            record.name,
            record.gender,
            record.access_level
        );
        self.records.push(record);
        self.save()
    }

    /// Merge `patch` into the record at `index` and persist
    pub fn update(&mut self, index: usize, patch: IdentityPatch) -> Result<()> {
        let Some(record) = self.records.get_mut(index) else {
            bail!("No identity record at index {}", index);
        };
        record.apply(patch);
        log::info!("Identity record {} updated", index);
        self.save()
    }

    /// Remove the record at `index` and persist, returning it
    pub fn delete(&mut self, index: usize) -> Result<IdentityRecord> {
        if index >= self.records.len() {
            bail!("No identity record at index {}", index);
        }
        let removed = self.records.remove(index);
        log::info!("Identity record '{}' deleted", removed.name);
        self.save()?;
        Ok(removed)
    }

    /// Wipe every record
    pub fn clear(&mut self) -> Result<()> {
        self.records.clear();
        log::warn!("Identity database wiped");
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create identity database directory")?;
        }

        let json =
            serde_json::to_string_pretty(&self.records).context("Failed to serialize identities")?;
        fs::write(&self.path, json).context("Failed to write identity database")?;

        // Descriptors are biometric data: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .context("Failed to set identity database permissions")?;
        }

        log::debug!("Identity database saved to {}", self.path.display());
        Ok(())
    }
}
