// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

/// A JSON document named after its key in the per-user data directory.
pub(crate) struct File {
    path: PathBuf,
}

impl File {
    pub(crate) fn new(key: &str) -> Result<Self> {
        let dirs = metadata::PROJECT_DIRS
            .as_ref()
            .ok_or(error::Storage::NoProjectDirs)?;
        Ok(Self::new_in(dirs.data_dir(), key))
    }

    pub(crate) fn new_in<P: AsRef<Path>>(dir: P, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }
}

impl IsPersistent for File {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: Send + Serialize + Sync + for<'de> Deserialize<'de>> Storage<T> for File {
    async fn get(&mut self) -> Result<Option<T>> {
        match fs::read(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_slice::<T>(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_vec(data)?).await?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use crate::error::Result;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        env::temp_dir().join(format!("orderdesk-file-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_record_reads_as_none_and_clears_cleanly() -> Result<()> {
        let mut file = File::new_in(scratch_dir("missing"), "user");

        assert_eq!(Storage::<String>::get(&mut file).await?, None);
        Storage::<String>::clear(&mut file).await?;
        Ok(())
    }

    #[tokio::test]
    async fn update_then_get_then_clear() -> Result<()> {
        let dir = scratch_dir("cycle");
        let mut file = File::new_in(&dir, "token");

        file.update(&"abc".to_owned()).await?;
        assert!(dir.join("token.json").exists());
        assert_eq!(Storage::<String>::get(&mut file).await?, Some("abc".to_owned()));

        Storage::<String>::clear(&mut file).await?;
        assert_eq!(Storage::<String>::get(&mut file).await?, None);

        let _ = std::fs::remove_dir_all(dir);
        Ok(())
    }
}
