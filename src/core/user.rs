// File: src/core/user.rs
use crate::config::ProgressConfig;
use crate::core::avatar::{derived_image_url, read_profile};
use crate::core::types::UserIdentity;
use crate::core::workflow::read_state;
use crate::storage::{keys, load_json, persist, KeyValueStore, StoreTransaction};
use tracing::{debug, warn};

/// The logged-in identity under `user`.
///
/// The stored avatar URL is only a cache: every read recomputes it from the
/// workflow avatar, then the avatar profile, then the placeholder.
pub struct UserStore<'a, S: KeyValueStore + ?Sized> {
    storage: &'a mut S,
    config: &'a ProgressConfig,
}

impl<'a, S: KeyValueStore + ?Sized> UserStore<'a, S> {
    pub fn new(storage: &'a mut S, config: &'a ProgressConfig) -> Self {
        Self { storage, config }
    }

    /// The identity with a freshly resolved avatar, or `None` when nobody with
    /// a name is logged in.
    pub fn read(&self) -> Option<UserIdentity> {
        let mut identity: UserIdentity = load_json(&*self.storage, keys::USER)?;
        if identity.name.is_empty() {
            return None;
        }
        identity.avatar = self.resolve_avatar();
        Some(identity)
    }

    /// Workflow custom image, then the profile's own image, then the
    /// generated preview. A profile without a face has nothing to generate
    /// from and gets the placeholder.
    fn resolve_avatar(&self) -> String {
        let workflow = read_state(&*self.storage);
        if let Some(url) = workflow.avatar.custom_image_url() {
            return url.to_string();
        }
        let profile = read_profile(&*self.storage);
        if profile.custom_image_url().is_none() && profile.face.trim().is_empty() {
            return self.config.placeholder_avatar.clone();
        }
        derived_image_url(&profile, &self.config.avatar_preview_root)
    }

    /// Persists the identity as given.
    pub fn write(&mut self, identity: &UserIdentity) -> bool {
        persist(&mut *self.storage, keys::USER, identity)
    }

    /// Points both the identity and the workflow avatar at `url`. Either both
    /// records change or neither does.
    pub fn update_avatar(&mut self, url: &str) -> bool {
        let Some(mut identity) = self.read() else {
            warn!("no logged-in user, avatar not updated");
            return false;
        };
        identity.avatar = url.to_string();

        let mut workflow = read_state(&*self.storage);
        workflow.avatar.custom_image = Some(url.to_string());

        let mut tx = StoreTransaction::new();
        let staged = tx
            .stage_json(keys::USER, &identity)
            .and_then(|tx| tx.stage_json(keys::WORKFLOW_STATE, &workflow));
        if let Err(e) = staged {
            warn!(error = %e, "could not encode avatar update");
            return false;
        }
        match tx.commit(&mut *self.storage) {
            Ok(()) => {
                debug!(url, "avatar updated");
                true
            }
            Err(e) => {
                warn!(error = %e, "avatar update not persisted");
                false
            }
        }
    }

    /// Re-derives the avatar from the avatar profile and propagates it.
    pub fn sync_avatar_from_profile(&mut self) -> bool {
        if self.read().is_none() {
            return false;
        }
        let url = derived_image_url(&read_profile(&*self.storage), &self.config.avatar_preview_root);
        self.update_avatar(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::avatar::AvatarStore;
    use crate::core::types::{AvatarProfile, Gender};
    use crate::core::workflow::WorkflowStore;
    use crate::storage::MemoryStore;

    fn learner() -> UserIdentity {
        UserIdentity {
            email: "an@example.com".to_string(),
            name: "An".to_string(),
            role: "A".to_string(),
            avatar: "stale".to_string(),
        }
    }

    #[test]
    fn test_missing_or_nameless_identity_is_absent() {
        let mut storage = MemoryStore::new();
        let config = ProgressConfig::default();
        assert!(UserStore::new(&mut storage, &config).read().is_none());

        storage.set(keys::USER, r#"{"email":"x@y","name":""}"#.to_string()).unwrap();
        assert!(UserStore::new(&mut storage, &config).read().is_none());
    }

    #[test]
    fn test_read_ignores_cached_avatar() {
        let mut storage = MemoryStore::new();
        let config = ProgressConfig::default();
        let mut users = UserStore::new(&mut storage, &config);
        users.write(&learner());
        assert_eq!(users.read().unwrap().avatar, "/avatars/preview/male/face1.png");
    }

    #[test]
    fn test_workflow_custom_image_beats_profile() {
        let mut storage = MemoryStore::new();
        let config = ProgressConfig::default();
        AvatarStore::new(&mut storage, &config).write(&AvatarProfile {
            custom_image: Some("profile.png".to_string()),
            ..AvatarProfile::default()
        });
        WorkflowStore::new(&mut storage, &config).update_avatar(AvatarProfile {
            custom_image: Some("workflow.png".to_string()),
            ..AvatarProfile::default()
        });
        let mut users = UserStore::new(&mut storage, &config);
        users.write(&learner());
        assert_eq!(users.read().unwrap().avatar, "workflow.png");
    }

    #[test]
    fn test_update_avatar_without_user_changes_nothing() {
        let mut storage = MemoryStore::new();
        let config = ProgressConfig::default();
        assert!(!UserStore::new(&mut storage, &config).update_avatar("x.png"));
        assert!(storage.entries().is_empty());
    }

    #[test]
    fn test_sync_from_profile_propagates_generated_image() {
        let mut storage = MemoryStore::new();
        let config = ProgressConfig::default();
        AvatarStore::new(&mut storage, &config).write(&AvatarProfile {
            face: "face2".to_string(),
            gender: Gender::Female,
            ..AvatarProfile::default()
        });
        UserStore::new(&mut storage, &config).write(&learner());

        assert!(UserStore::new(&mut storage, &config).sync_avatar_from_profile());

        let workflow = WorkflowStore::new(&mut storage, &config).read();
        assert_eq!(
            workflow.avatar.custom_image.as_deref(),
            Some("/avatars/preview/female/face2.png")
        );
        let stored: UserIdentity = load_json(&storage, keys::USER).unwrap();
        assert_eq!(stored.avatar, "/avatars/preview/female/face2.png");
    }

    #[test]
    fn test_faceless_profile_falls_back_to_placeholder() {
        let mut storage = MemoryStore::new();
        let config = ProgressConfig::default();
        AvatarStore::new(&mut storage, &config).write(&AvatarProfile {
            face: String::new(),
            ..AvatarProfile::default()
        });
        let mut users = UserStore::new(&mut storage, &config);
        users.write(&learner());
        assert_eq!(users.read().unwrap().avatar, config.placeholder_avatar);
    }
}
