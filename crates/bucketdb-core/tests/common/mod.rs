#![allow(dead_code)]

use bucketdb_core::{
    error::{InternalError, ValidationIssues},
    index::Indexer,
    model::{Metadata, Model},
    serialize::{deserialize, serialize},
};
use serde::{Deserialize, Serialize};

///
/// User
///
/// Fixture record shared by the integration tests.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            ..Self::default()
        }
    }
}

impl Model for User {
    const PATH: &'static str = "tests::common::User";

    fn validate(&self) -> Result<(), InternalError> {
        let mut issues = ValidationIssues::new();
        if self.name.is_empty() {
            issues.push("name", "must not be empty");
        }
        if !self.email.contains('@') {
            issues.push("email", "must contain '@'");
        }

        issues.into_result(Self::PATH)
    }

    fn marshal(&self) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(self)?)
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> Result<(), InternalError> {
        *self = deserialize(bytes)?;
        Ok(())
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        Some(&mut self.metadata)
    }
}

pub fn by_name() -> Indexer<User> {
    Indexer::single(|u: &User| Some(u.name.as_bytes().to_vec()))
}

// Only users with a company domain are listed.
pub fn by_domain() -> Indexer<User> {
    Indexer::single(|u: &User| {
        u.email
            .split_once('@')
            .map(|(_, domain)| domain.as_bytes().to_vec())
            .filter(|domain| domain != b"example.org")
    })
}
