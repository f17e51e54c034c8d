//! Per-user session state.

use dashmap::DashMap;

/// Remembers the environment each user selected with `/env`.
#[derive(Debug, Default)]
pub struct SessionStore {
    envs: DashMap<i64, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_env(&self, user_id: i64) -> Option<String> {
        self.envs.get(&user_id).map(|env| env.value().clone())
    }

    /// Store the user's environment, lower-cased.
    pub fn set_env(&self, user_id: i64, env: &str) {
        self.envs.insert(user_id, env.trim().to_lowercase());
    }

    pub fn clear(&self, user_id: i64) {
        self.envs.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_env() {
        let sessions = SessionStore::new();
        assert_eq!(sessions.get_env(1), None);

        sessions.set_env(1, " REPLICA ");
        assert_eq!(sessions.get_env(1).as_deref(), Some("replica"));
        assert_eq!(sessions.get_env(2), None);

        sessions.clear(1);
        assert_eq!(sessions.get_env(1), None);
    }
}
