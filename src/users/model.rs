use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    serde::deserialize_null_default,
};

/// Identity of a [`User`]. Server-assigned ids are small integers, ids of
/// users created locally are millisecond timestamps.
pub type UserId = i64;

/// A user record as held by the dashboard.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct User {
    /// The user's unique identifier.
    pub id: UserId,
    /// The user's name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The company the user works for.
    pub company: Company,
    /// The user's postal address.
    pub address: Address,
    pub phone: String,
    pub website: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct Company {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct Address {
    pub street: String,
    pub suite: String,
    pub city: String,
    pub zipcode: String,
}

impl User {
    /// Returns the address formatted as `street, suite, city, zipcode`.
    pub fn full_address(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.address.street, self.address.suite, self.address.city, self.address.zipcode
        )
    }
}

/// A user record as sent by the remote API. Everything except `id` may be
/// missing or null; [`decode_users`] decides what is acceptable.
#[derive(Deserialize, Debug)]
pub(crate) struct RemoteUser {
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    name: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    email: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    company: RemoteCompany,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    address: RemoteAddress,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    phone: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    website: String,
}

#[derive(Deserialize, Debug, Default)]
struct RemoteCompany {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    name: String,
}

// The API also sends `geo`, which the dashboard never shows.
#[derive(Deserialize, Debug, Default)]
struct RemoteAddress {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    street: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    suite: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    city: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    zipcode: String,
}

impl RemoteUser {
    fn into_user(self, index: usize) -> Result<User> {
        let id = self.id.ok_or_else(|| Error::InvalidRecord {
            index,
            reason: "missing id".to_string(),
        })?;
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRecord {
                index,
                reason: format!("user {id} has no name"),
            });
        }
        if self.email.trim().is_empty() {
            return Err(Error::InvalidRecord {
                index,
                reason: format!("user {id} has no email"),
            });
        }

        Ok(User {
            id,
            name: self.name,
            email: self.email,
            company: Company {
                name: self.company.name,
            },
            address: Address {
                street: self.address.street,
                suite: self.address.suite,
                city: self.address.city,
                zipcode: self.address.zipcode,
            },
            phone: self.phone,
            website: self.website,
        })
    }
}

/// Maps the wire payload into the entity model.
///
/// Null or missing strings become empty strings. A record without an id, name
/// or email rejects the whole payload.
pub(crate) fn decode_users(remote: Vec<RemoteUser>) -> Result<Vec<User>> {
    remote
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_user(index))
        .collect()
}
