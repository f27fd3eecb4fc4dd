//! Per-invocation state shared by every command handler.

use anyhow::Context as _;
use bisleri_client::{ClientSettings, StorefrontClient};
use bisleri_core::{GlobalConfig, Profile, ProfileStore, Settings};

pub(crate) struct AppContext {
    pub settings: Settings,
    pub store: ProfileStore,
}

impl AppContext {
    pub(crate) fn new(settings: Settings) -> Self {
        let store = ProfileStore::new(settings.config_dir.clone());
        Self { settings, store }
    }

    pub(crate) fn client_settings(&self) -> ClientSettings {
        ClientSettings::from_settings(&self.settings)
    }

    pub(crate) fn load_config(&self) -> anyhow::Result<GlobalConfig> {
        self.store
            .load_config()
            .context("failed to load global config")
    }

    /// Loads the global config and the profile selected by `flag` (or the
    /// current one), creating the profile file if it does not exist yet.
    pub(crate) fn load_profile(&self, flag: Option<&str>) -> anyhow::Result<(GlobalConfig, Profile)> {
        let cfg = self.load_config()?;
        let name = ProfileStore::resolve_profile_name(flag, &cfg);
        let profile = self
            .store
            .load_or_create_profile(&name)
            .with_context(|| format!("failed to load profile '{name}'"))?;
        Ok((cfg, profile))
    }

    /// A client carrying `profile`'s session. Refuses profiles that were
    /// never logged in.
    pub(crate) fn session_client(&self, profile: &Profile) -> anyhow::Result<StorefrontClient> {
        if !profile.has_session() {
            anyhow::bail!("no cookies in profile; run 'bislericli auth login'");
        }
        Ok(StorefrontClient::new(self.client_settings(), &profile.cookies)?)
    }
}
