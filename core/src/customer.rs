//! Customer records owned by the customer service.

use crate::types::{Address, CustomerId, CustomerSnapshot, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored customer, including password material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer identifier
    pub id: CustomerId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Unique login e-mail (stored lowercase)
    pub email: String,
    /// Phone numbers
    pub phones: Vec<String>,
    /// Known addresses
    pub addresses: Vec<Address>,
    /// Membership tier
    pub role: Tier,
    /// Base64 salted SHA-256 digest of the password
    pub password_hash: String,
    /// Base64 salt used for `password_hash`
    pub password_salt: String,
    /// Whether the account is active
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Public projection without password material.
    #[must_use]
    pub fn snapshot(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            is_active: self.is_active,
            phones: self.phones.clone(),
            addresses: self.addresses.clone(),
        }
    }
}

/// A login session identified by an opaque bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token
    pub token: String,
    /// Customer the session belongs to
    pub customer_id: CustomerId,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// Expiry (exclusive)
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry_is_exclusive() {
        let now = Utc::now();
        let session = Session {
            token: "t".to_string(),
            customer_id: CustomerId::generate(),
            created_at: now,
            expires_at: now + Duration::hours(1),
        };

        assert!(session.is_valid_at(now));
        assert!(!session.is_valid_at(now + Duration::hours(1)));
    }
}
