//! The core of a user-management dashboard.
//!
//! A [`Store`](store::Store) holds the user list and the state of the remote
//! fetch, a [`Persistor`](persist::Persistor) mirrors it to durable storage,
//! and the [`Client`] fetches the collection from the remote API. The
//! [`view`] module has the helpers a front end needs on top of that.
//!
//! # Examples
//! ```no_run
//! use userdesk::{
//!     persist::{Config, FileStorage, Persistor},
//!     store::Store,
//!     view::{filter_and_sort, NewUser, SortOption},
//!     Client, Error,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::new()?;
//!     let store = Store::open(Persistor::new(FileStorage::new(".userdesk"), Config::default()));
//!
//!     // Only fetches when nothing was persisted.
//!     store.ensure_loaded(&client.users).await;
//!
//!     let ada = NewUser {
//!         name: "Ada".to_string(),
//!         email: "ada@example.com".to_string(),
//!         company_name: "X".to_string(),
//!     }
//!     .into_user_now()?;
//!     store.add(ada);
//!
//!     let users = store.users();
//!     for user in filter_and_sort(&users, "ada", SortOption::NameAsc) {
//!         println!("{} <{}>", user.name, user.email);
//!     }
//!
//!     Ok(())
//! }
//! ```
pub mod client;
pub mod error;
mod http;
mod serde;

pub mod persist;
pub mod store;
pub mod users;
pub mod view;

pub use client::Client;
pub use error::Error;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
