use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Password shared by the pre-provisioned test accounts.
const DEFAULT_PASSWORD: &str = "Test123!";

#[derive(Debug, Error, PartialEq)]
pub enum CredentialsError {
    #[error("Credentials must be written as `email:password`, got `{0}`.")]
    Malformed(String),

    #[error("Credential pool is empty.")]
    EmptyPool,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl FromStr for Credentials {
    type Err = CredentialsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((email, password)) if !email.is_empty() && !password.is_empty() => {
                Ok(Self::new(email, password))
            }
            _ => Err(CredentialsError::Malformed(s.to_string())),
        }
    }
}

/// Fixed pool of accounts virtual users log in with.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPool {
    users: Vec<Credentials>,
}

impl CredentialPool {
    pub fn new(users: Vec<Credentials>) -> Result<Self, CredentialsError> {
        if users.is_empty() {
            Err(CredentialsError::EmptyPool)
        } else {
            Ok(Self { users })
        }
    }

    /// The first `count` of the pre-provisioned `test{n}@anb.com` accounts.
    pub fn provisioned(count: usize) -> Self {
        let users = (1..=count.max(1))
            .map(|n| Credentials::new(&format!("test{n}@anb.com"), DEFAULT_PASSWORD))
            .collect();
        Self { users }
    }

    pub fn choose<R: Rng>(&self, rng: &mut R) -> &Credentials {
        // NOTE: The pool is never empty, see `new`.
        self.users.choose(rng).unwrap_or(&self.users[0])
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn users(&self) -> &[Credentials] {
        &self.users
    }
}

impl Default for CredentialPool {
    fn default() -> Self {
        Self::provisioned(5)
    }
}
