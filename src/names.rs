use std::collections::HashMap;

use tracing::{debug, error};

use crate::model::Channel;
use crate::slack::SlackApi;

/// Resolves user ids and channels to display names.
///
/// Lookups are cached for the lifetime of the resolver, failed ones included,
/// so each user costs at most one `users.info` call per run.
pub struct NameResolver<'a> {
    api: &'a dyn SlackApi,
    separator: String,
    cache: HashMap<String, String>,
}

impl<'a> NameResolver<'a> {
    pub fn new(api: &'a dyn SlackApi, separator: impl Into<String>) -> Self {
        Self {
            api,
            separator: separator.into(),
            cache: HashMap::new(),
        }
    }

    /// Real name, else short name, else the id itself. Never fails.
    pub async fn resolve_user_name(&mut self, user_id: &str) -> String {
        if let Some(name) = self.cache.get(user_id) {
            return name.clone();
        }

        let name = match self.api.user_info(user_id).await {
            Ok(profile) => profile.display_name(user_id),
            Err(e) => {
                error!(user = user_id, error = %e, "failed to fetch user info");
                user_id.to_string()
            }
        };
        debug!(user = user_id, name = %name, "resolved user");

        self.cache.insert(user_id.to_string(), name.clone());
        name
    }

    pub async fn resolve_channel_name(&mut self, channel: &Channel) -> String {
        match channel {
            Channel::Public { id, name } | Channel::Private { id, name } => name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(id)
                .to_string(),
            Channel::Direct { id, user } => match user {
                Some(user) => self.resolve_user_name(user).await,
                None => id.clone(),
            },
            Channel::Group { id, members } => {
                if members.is_empty() {
                    return id.clone();
                }
                let mut names = Vec::with_capacity(members.len());
                for member in members {
                    names.push(self.resolve_user_name(member).await);
                }
                names.join(&self.separator)
            }
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
