//! Customer records, login and credential verification.

use crate::password::{hash_password, session_token, verify_password};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::customer::{Customer, Session};
use storefront_core::environment::Clock;
use storefront_core::store::{CustomerStore, SessionStore, UpdateOutcome};
use storefront_core::{
    Address, CustomerId, CustomerSnapshot, Pagination, ServiceError, StoreError, Tier,
};
use storefront_web::AuthContext;
use tracing::{info, warn};

const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=50;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;
const MIN_PASSWORD_LENGTH: usize = 8;

/// `POST /customer` body.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    /// Given name, 2 to 50 characters
    pub first_name: String,
    /// Family name, 2 to 50 characters
    pub last_name: String,
    /// Unique e-mail
    pub email: String,
    /// At least 8 characters
    pub password: String,
    /// Phone numbers, 7 to 15 digits
    #[serde(default)]
    pub phones: Vec<String>,
    /// Addresses
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// `PUT /customer/:id` body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerUpdate {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New e-mail
    pub email: Option<String>,
    /// New password
    pub password: Option<String>,
    /// Replacement phone list
    pub phones: Option<Vec<String>>,
    /// Replacement address list
    pub addresses: Option<Vec<Address>>,
    /// New tier, admin only
    pub role: Option<Tier>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque bearer token
    pub token: String,
    /// The logged-in customer
    pub customer: CustomerSnapshot,
}

/// Identity behind a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedCustomer {
    /// Token owner
    pub customer_id: CustomerId,
    /// Owner's tier
    pub role: Tier,
}

/// Customer service logic over the customer and session stores.
#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl CustomerService {
    /// Create the service.
    #[must_use]
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        session_ttl: std::time::Duration,
    ) -> Self {
        Self {
            customers,
            sessions,
            clock,
            session_ttl: Duration::from_std(session_ttl).unwrap_or_else(|_| Duration::hours(1)),
        }
    }

    /// Register a customer with the `non-premium` tier.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidInput`]: a field fails validation
    /// - [`ServiceError::AlreadyExists`]: the e-mail is taken
    #[tracing::instrument(skip(self, new), fields(email = %new.email))]
    pub async fn create(&self, new: NewCustomer) -> Result<CustomerId, ServiceError> {
        let email = normalize_email(&new.email);
        validate_name("first_name", &new.first_name)?;
        validate_name("last_name", &new.last_name)?;
        validate_email(&email)?;
        validate_password(&new.password)?;
        validate_phones(&new.phones)?;
        validate_addresses(&new.addresses)?;

        if self.customers.find_by_email(&email).await?.is_some() {
            return Err(email_taken(email));
        }

        let digest = hash_password(&new.password);
        let now = self.clock.now();
        let customer = Customer {
            id: CustomerId::generate(),
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            email: email.clone(),
            phones: new.phones,
            addresses: new.addresses,
            role: Tier::non_premium(),
            password_hash: digest.hash,
            password_salt: digest.salt,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let id = customer.id;

        self.customers
            .insert(customer)
            .await
            .map_err(|e| duplicate_as_taken(e, &email))?;

        info!(customer_id = %id, "Customer created");
        Ok(id)
    }

    /// Public view of one customer.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if there is no such customer.
    pub async fn get(&self, id: CustomerId) -> Result<CustomerSnapshot, ServiceError> {
        Ok(self.load(id).await?.snapshot())
    }

    async fn load(&self, id: CustomerId) -> Result<Customer, ServiceError> {
        self.customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::customer_not_found(id))
    }

    /// Partially update a customer. Callers may update themselves; admins may
    /// update anyone and are the only ones allowed to change a tier.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Forbidden`]: the caller may not make this change
    /// - [`ServiceError::NotFound`]: there is no such customer
    /// - [`ServiceError::InvalidInput`]: a new value fails validation
    /// - [`ServiceError::AlreadyExists`]: the new e-mail is taken
    #[tracing::instrument(skip(self, actor, update), fields(actor = %actor.user_id))]
    pub async fn update(
        &self,
        actor: &AuthContext,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<CustomerSnapshot, ServiceError> {
        if !actor.may_act_for(id) {
            return Err(ServiceError::Forbidden("cannot modify another customer".to_string()));
        }
        if update.role.is_some() && !actor.tier.is_admin() {
            return Err(ServiceError::Forbidden("only admins can change a tier".to_string()));
        }

        let mut customer = self.load(id).await?;

        if let Some(first_name) = update.first_name {
            validate_name("first_name", &first_name)?;
            customer.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            validate_name("last_name", &last_name)?;
            customer.last_name = last_name.trim().to_string();
        }
        if let Some(email) = update.email {
            let email = normalize_email(&email);
            validate_email(&email)?;
            if email != customer.email {
                if let Some(other) = self.customers.find_by_email(&email).await? {
                    if other.id != id {
                        return Err(email_taken(email));
                    }
                }
                customer.email = email;
            }
        }
        if let Some(password) = update.password {
            validate_password(&password)?;
            let digest = hash_password(&password);
            customer.password_hash = digest.hash;
            customer.password_salt = digest.salt;
        }
        if let Some(phones) = update.phones {
            validate_phones(&phones)?;
            customer.phones = phones;
        }
        if let Some(addresses) = update.addresses {
            validate_addresses(&addresses)?;
            customer.addresses = addresses;
        }
        if let Some(role) = update.role {
            customer.role = role;
        }
        if let Some(is_active) = update.is_active {
            customer.is_active = is_active;
        }
        customer.updated_at = self.clock.now();

        let email = customer.email.clone();
        let snapshot = customer.snapshot();
        match self
            .customers
            .update(customer)
            .await
            .map_err(|e| duplicate_as_taken(e, &email))?
        {
            UpdateOutcome::Applied => {
                info!(customer_id = %id, "Customer updated");
                Ok(snapshot)
            }
            UpdateOutcome::NotMatched => Err(ServiceError::customer_not_found(id)),
        }
    }

    /// Remove a customer and revoke their sessions.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Forbidden`]: the caller may not delete this customer
    /// - [`ServiceError::NotFound`]: there is no such customer
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn delete(&self, actor: &AuthContext, id: CustomerId) -> Result<(), ServiceError> {
        if !actor.may_act_for(id) {
            return Err(ServiceError::Forbidden("cannot delete another customer".to_string()));
        }

        match self.customers.delete(id).await? {
            UpdateOutcome::Applied => {
                self.sessions.revoke_all(id).await?;
                info!(customer_id = %id, "Customer deleted");
                Ok(())
            }
            UpdateOutcome::NotMatched => Err(ServiceError::customer_not_found(id)),
        }
    }

    /// Public view of the customer registered under `email`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidInput`]: `email` is not an e-mail address
    /// - [`ServiceError::Forbidden`]: the caller's tier may not look customers up
    /// - [`ServiceError::NotFound`]: nobody is registered under `email`
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn get_by_email(
        &self,
        actor: &AuthContext,
        email: &str,
    ) -> Result<CustomerSnapshot, ServiceError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        require_member(actor)?;

        self.customers
            .find_by_email(&email)
            .await?
            .as_ref()
            .map(Customer::snapshot)
            .ok_or_else(|| ServiceError::customer_not_found(&email))
    }

    /// A page of customers.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Forbidden`]: the caller's tier may not list customers
    /// - [`ServiceError::Internal`]: the store fails
    pub async fn list(
        &self,
        actor: &AuthContext,
        page: Pagination,
    ) -> Result<Vec<CustomerSnapshot>, ServiceError> {
        require_member(actor)?;
        let customers = self.customers.list(page).await?;
        Ok(customers.iter().map(Customer::snapshot).collect())
    }

    /// Exchange e-mail and password for a session token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] for unknown e-mails, wrong
    /// passwords and inactive accounts alike.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        let rejected = || ServiceError::Unauthorized("invalid email or password".to_string());

        let customer = self
            .customers
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(rejected)?;

        if !verify_password(password, &customer.password_hash, &customer.password_salt) {
            warn!(customer_id = %customer.id, "Wrong password");
            return Err(rejected());
        }
        if !customer.is_active {
            warn!(customer_id = %customer.id, "Login to inactive account");
            return Err(rejected());
        }

        let now = self.clock.now();
        let session = Session {
            token: session_token(),
            customer_id: customer.id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        let token = session.token.clone();
        self.sessions.insert(session).await?;

        info!(customer_id = %customer.id, "Customer logged in");
        Ok(LoginResponse {
            token,
            customer: customer.snapshot(),
        })
    }

    /// Resolve a session token into its owner.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] for unknown or expired tokens and
    /// for owners that are gone or inactive.
    pub async fn verify(&self, token: &str) -> Result<VerifiedCustomer, ServiceError> {
        let rejected = || ServiceError::Unauthorized("invalid or expired token".to_string());

        let session = self.sessions.find(token).await?.ok_or_else(rejected)?;
        if !session.is_valid_at(self.clock.now()) {
            return Err(rejected());
        }

        let customer = self
            .customers
            .find_by_id(session.customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(rejected)?;

        Ok(VerifiedCustomer {
            customer_id: customer.id,
            role: customer.role,
        })
    }
}

/// Lookups across customers are open to member tiers and admins.
fn require_member(actor: &AuthContext) -> Result<(), ServiceError> {
    match actor.tier.as_str() {
        Tier::PREMIUM | Tier::NON_PREMIUM | Tier::ADMIN => Ok(()),
        other => Err(ServiceError::Forbidden(format!(
            "tier '{other}' may not look up customers"
        ))),
    }
}

fn email_taken(email: String) -> ServiceError {
    ServiceError::AlreadyExists {
        resource: "Customer",
        key: email,
    }
}

fn duplicate_as_taken(err: StoreError, email: &str) -> ServiceError {
    match err {
        StoreError::Duplicate(_) => email_taken(email.to_string()),
        other => other.into(),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_name(field: &str, value: &str) -> Result<(), ServiceError> {
    if NAME_LENGTH.contains(&value.trim().chars().count()) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "{field} must be between {} and {} characters",
            NAME_LENGTH.start(),
            NAME_LENGTH.end()
        )))
    }
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.split('.').count() >= 2
            && domain.split('.').all(|label| !label.is_empty())
    }) && !email.chars().any(char::is_whitespace);

    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!("'{email}' is not a valid email")))
    }
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_phones(phones: &[String]) -> Result<(), ServiceError> {
    for phone in phones {
        let number = phone.strip_prefix('+').unwrap_or(phone);
        if !number.chars().all(|c| c.is_ascii_digit()) || !PHONE_DIGITS.contains(&number.len()) {
            return Err(ServiceError::InvalidInput(format!(
                "phone '{phone}' must have between {} and {} digits",
                PHONE_DIGITS.start(),
                PHONE_DIGITS.end()
            )));
        }
    }
    Ok(())
}

fn validate_addresses(addresses: &[Address]) -> Result<(), ServiceError> {
    addresses.iter().try_for_each(|address| address.validate("address"))
}
