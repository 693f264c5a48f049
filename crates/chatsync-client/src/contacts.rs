use chatsync_shared::{UserId, UserSummary};

/// The local user's contacts, unique by id.
#[derive(Debug, Default, Clone)]
pub struct ContactList {
    contacts: Vec<UserSummary>,
}

impl ContactList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, contacts: Vec<UserSummary>) {
        self.contacts.clear();
        for contact in contacts {
            self.add(contact);
        }
    }

    /// Returns `false` when the user is already listed.
    pub fn add(&mut self, contact: UserSummary) -> bool {
        if self.contains(contact.id) {
            return false;
        }
        self.contacts.push(contact);
        true
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.contacts.iter().any(|c| c.id == id)
    }

    pub fn list(&self) -> &[UserSummary] {
        &self.contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::user;

    #[test]
    fn add_dedupes_by_id() {
        let ann = user("Ann");
        let mut contacts = ContactList::new();
        assert!(contacts.add(ann.clone()));
        assert!(!contacts.add(ann.clone()));
        assert_eq!(contacts.list(), &[ann]);
    }
}
