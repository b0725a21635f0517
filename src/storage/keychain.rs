// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretVec};
use security_framework::os::macos::keychain::{SecKeychain, SecPreferencesDomain};
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

// errSecItemNotFound
const ITEM_NOT_FOUND: i32 = -25300_i32;

/// A generic password item whose account is `<key>@<api url>`.
pub(crate) struct Keychain {
    delegate: SecKeychain,
    service: String,
    account: String,
}

impl Keychain {
    pub(crate) fn new(api_url: &url::Url, key: &str) -> Result<Self> {
        Ok(Self {
            delegate: SecKeychain::default_for_domain(SecPreferencesDomain::User)
                .map_err(error::Storage::from)?,
            service: metadata::PROJECT_DIRS
                .as_ref()
                .map(|dirs| dirs.project_path().as_os_str())
                .ok_or(error::Storage::NoProjectDirs)?
                .to_string_lossy()
                .to_string(),
            account: format!("{key}@{api_url}"),
        })
    }
}

impl IsPersistent for Keychain {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: for<'de> Deserialize<'de> + Send + Serialize + Sync> Storage<T> for Keychain {
    async fn get(&mut self) -> Result<Option<T>> {
        match self
            .delegate
            .find_generic_password(&self.service, &self.account)
        {
            Ok((password, _)) => Ok(Some(serde_json::from_slice(&password)?)),
            Err(err) if err.code() == ITEM_NOT_FOUND => Ok(None),
            Err(err) => Err(error::Storage::from(err).into()),
        }
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        self.delegate
            .set_generic_password(
                &self.service,
                &self.account,
                SecretVec::new(serde_json::to_vec(data)?).expose_secret(),
            )
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        match self
            .delegate
            .find_generic_password(&self.service, &self.account)
        {
            Ok((_, item)) => item.delete(),
            Err(err) if err.code() == ITEM_NOT_FOUND => {}
            Err(err) => return Err(error::Storage::from(err).into()),
        };
        Ok(())
    }
}
