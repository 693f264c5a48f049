use std::collections::BTreeSet;

use chatsync_shared::UserId;

/// Users the server reports as online.
#[derive(Debug, Default, Clone)]
pub struct OnlineSet {
    online: BTreeSet<UserId>,
}

impl OnlineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single-user delta. Returns `true` if the set changed.
    pub fn apply_delta(&mut self, user: UserId, online: bool) -> bool {
        if online {
            self.online.insert(user)
        } else {
            self.online.remove(&user)
        }
    }

    /// Replace the set with a full snapshot and return each actual change.
    pub fn apply_full(&mut self, users: impl IntoIterator<Item = UserId>) -> Vec<(UserId, bool)> {
        let next: BTreeSet<UserId> = users.into_iter().collect();
        let mut changes: Vec<(UserId, bool)> = self
            .online
            .difference(&next)
            .map(|u| (*u, false))
            .collect();
        changes.extend(next.difference(&self.online).map(|u| (*u, true)));
        self.online = next;
        changes
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.online.contains(&user)
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.online.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_report_changes_only() {
        let mut set = OnlineSet::new();
        let a = UserId::new();
        assert!(set.apply_delta(a, true));
        assert!(!set.apply_delta(a, true));
        assert!(set.is_online(a));
        assert!(set.apply_delta(a, false));
        assert!(!set.apply_delta(a, false));
    }

    #[test]
    fn full_snapshot_diff() {
        let mut set = OnlineSet::new();
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        set.apply_full([a, b]);

        let mut changes = set.apply_full([b, c]);
        changes.sort();
        let mut expected = vec![(a, false), (c, true)];
        expected.sort();
        assert_eq!(changes, expected);
        assert_eq!(set.users().count(), 2);
    }
}
