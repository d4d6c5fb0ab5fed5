//! RapidAPI key storage in the OS keychain.

use anyhow::{Context, Result};
use keyring::Entry;

use crate::config::APP_NAME;

const ACCOUNT_NAME: &str = "rapidapi";

pub struct ApiKeyStore;

impl ApiKeyStore {
    /// Store the API key in the OS keychain
    pub fn store(api_key: &str) -> Result<()> {
        let entry = Entry::new(APP_NAME, ACCOUNT_NAME)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(api_key)
            .context("Failed to store API key in keychain")?;
        Ok(())
    }

    /// Retrieve the API key from the OS keychain
    pub fn get() -> Result<String> {
        let entry = Entry::new(APP_NAME, ACCOUNT_NAME)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve API key from keychain")
    }

    pub fn delete() -> Result<()> {
        let entry = Entry::new(APP_NAME, ACCOUNT_NAME)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete API key from keychain")?;
        Ok(())
    }

    pub fn has_api_key() -> bool {
        Self::get().is_ok()
    }
}
