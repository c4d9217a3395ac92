use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{ContactId, UserId};

/// one user's directed view of a shared counterparty identity
///
/// two users linked through the same contact pair each keep their own display
/// attributes for the other, so the same underlying relationship can carry
/// different names, emails and notes on each side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRelation {
    pub user_id: UserId,
    pub contact_id: ContactId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// directory boundary: display identities and contact-to-user resolution
///
/// the engine only asks two questions: how does this user see that contact,
/// and which registered user (if any) stands behind a contact identity
pub trait ContactDirectory {
    /// the display view `user` keeps for `contact`
    fn relation(&self, user: UserId, contact: ContactId) -> Option<ContactRelation>;

    /// the registered user behind a contact identity, if the contact is a user
    fn user_for_contact(&self, contact: ContactId) -> Option<UserId>;
}

/// in-memory directory, the reference implementation used in tests
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    relations: HashMap<(UserId, ContactId), ContactRelation>,
    contact_users: HashMap<ContactId, UserId>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// register how `user` sees `contact`
    pub fn add_relation(&mut self, relation: ContactRelation) {
        self.relations
            .insert((relation.user_id, relation.contact_id), relation);
    }

    /// mark a contact identity as backed by a registered user
    pub fn register_contact_user(&mut self, contact: ContactId, user: UserId) {
        self.contact_users.insert(contact, user);
    }

    /// link two users through a pair of contact identities, each side keeping
    /// its own display name for the other
    pub fn link_users(
        &mut self,
        a: UserId,
        a_sees_b_as: ContactRelation,
        b: UserId,
        b_sees_a_as: ContactRelation,
    ) {
        self.register_contact_user(a_sees_b_as.contact_id, b);
        self.register_contact_user(b_sees_a_as.contact_id, a);
        self.add_relation(a_sees_b_as);
        self.add_relation(b_sees_a_as);
    }
}

impl ContactDirectory for InMemoryDirectory {
    fn relation(&self, user: UserId, contact: ContactId) -> Option<ContactRelation> {
        self.relations.get(&(user, contact)).cloned()
    }

    fn user_for_contact(&self, contact: ContactId) -> Option<UserId> {
        self.contact_users.get(&contact).copied()
    }
}
