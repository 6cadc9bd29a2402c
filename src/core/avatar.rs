// File: src/core/avatar.rs
use crate::config::ProgressConfig;
use crate::core::types::AvatarProfile;
use crate::storage::{keys, load_json, persist, KeyValueStore};

/// Image URL for a profile: its custom image when set, otherwise the
/// generated preview for its gender and face. Never fails.
pub fn derived_image_url(profile: &AvatarProfile, preview_root: &str) -> String {
    match profile.custom_image_url() {
        Some(url) => url.to_string(),
        None => format!(
            "{}/{}/{}.png",
            preview_root.trim_end_matches('/'),
            profile.gender,
            profile.face
        ),
    }
}

pub(crate) fn read_profile<S: KeyValueStore + ?Sized>(storage: &S) -> AvatarProfile {
    load_json(storage, keys::AVATAR_STATE).unwrap_or_default()
}

/// The avatar customization record under `avatarState`.
pub struct AvatarStore<'a, S: KeyValueStore + ?Sized> {
    storage: &'a mut S,
    config: &'a ProgressConfig,
}

impl<'a, S: KeyValueStore + ?Sized> AvatarStore<'a, S> {
    pub fn new(storage: &'a mut S, config: &'a ProgressConfig) -> Self {
        Self { storage, config }
    }

    pub fn read(&self) -> AvatarProfile {
        read_profile(&*self.storage)
    }

    /// Replaces the stored profile wholesale.
    pub fn write(&mut self, profile: &AvatarProfile) -> bool {
        persist(&mut *self.storage, keys::AVATAR_STATE, profile)
    }

    pub fn derived_image_url(&self, profile: &AvatarProfile) -> String {
        derived_image_url(profile, &self.config.avatar_preview_root)
    }

    /// Image URL of the stored profile.
    pub fn current_image_url(&self) -> String {
        self.derived_image_url(&self.read())
    }
}
