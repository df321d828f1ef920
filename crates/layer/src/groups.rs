use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Group membership with join timestamps.
///
/// Stale memberships are removed by [`GroupRegistry::sweep_expired`], which
/// callers run lazily before each group delivery rather than on a timer.
#[derive(Debug)]
pub(crate) struct GroupRegistry {
    expiry: Duration,
    groups: HashMap<String, HashMap<String, Instant>>,
}

impl GroupRegistry {
    pub(crate) fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            groups: HashMap::new(),
        }
    }

    pub(crate) fn add(&mut self, group: &str, channel: &str, now: Instant) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(channel.to_string(), now);
    }

    /// Removes the membership; a group left without members is removed
    /// entirely.
    pub(crate) fn discard(&mut self, group: &str, channel: &str) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(channel);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    /// Evicts memberships older than the configured expiry, dropping groups
    /// that end up empty.
    pub(crate) fn sweep_expired(&mut self, now: Instant) {
        let expiry = self.expiry;
        self.groups.retain(|_, members| {
            members.retain(|_, joined| now.duration_since(*joined) <= expiry);
            !members.is_empty()
        });
    }

    pub(crate) fn members(&self, group: &str) -> Vec<String> {
        self.groups
            .get(group)
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn clear(&mut self) {
        self.groups.clear();
    }

    #[cfg(test)]
    fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPIRY: Duration = Duration::from_secs(86_400);

    #[test]
    fn add_and_discard() {
        let mut registry = GroupRegistry::new(EXPIRY);
        let now = Instant::now();

        registry.add("room", "alice", now);
        registry.add("room", "bob", now);

        let mut members = registry.members("room");
        members.sort();
        assert_eq!(members, vec!["alice", "bob"]);

        registry.discard("room", "alice");
        assert_eq!(registry.members("room"), vec!["bob"]);
    }

    #[test]
    fn discarding_last_member_removes_group() {
        let mut registry = GroupRegistry::new(EXPIRY);

        registry.add("room", "alice", Instant::now());
        registry.discard("room", "alice");

        assert!(!registry.contains("room"));
        assert!(registry.members("room").is_empty());
    }

    #[test]
    fn discard_of_unknown_entries_is_harmless() {
        let mut registry = GroupRegistry::new(EXPIRY);

        registry.discard("room", "alice");

        registry.add("room", "bob", Instant::now());
        registry.discard("room", "alice");
        assert_eq!(registry.members("room"), vec!["bob"]);
    }

    #[test]
    fn sweep_evicts_only_stale_memberships() {
        let mut registry = GroupRegistry::new(EXPIRY);
        let joined = Instant::now();

        registry.add("room", "old", joined);
        registry.add("room", "new", joined + Duration::from_secs(3600));

        registry.sweep_expired(joined + EXPIRY + Duration::from_secs(1));

        assert_eq!(registry.members("room"), vec!["new"]);
    }

    #[test]
    fn sweep_at_exact_expiry_keeps_membership() {
        let mut registry = GroupRegistry::new(EXPIRY);
        let joined = Instant::now();

        registry.add("room", "alice", joined);
        registry.sweep_expired(joined + EXPIRY);

        assert_eq!(registry.members("room"), vec!["alice"]);
    }

    #[test]
    fn sweep_drops_emptied_groups() {
        let mut registry = GroupRegistry::new(EXPIRY);
        let joined = Instant::now();

        registry.add("room", "alice", joined);
        registry.sweep_expired(joined + EXPIRY + Duration::from_secs(1));

        assert!(!registry.contains("room"));
    }
}
