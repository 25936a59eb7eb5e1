//! The user entity and the remote collection it is fetched from.
//!
//! # Examples
//! ```no_run
//! use userdesk::{Client, Error};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::new()?;
//!
//!     for user in client.users.list().await? {
//!         println!("{} <{}>", user.name, user.email);
//!     }
//!
//!     Ok(())
//! }
//! ```
mod client;
mod model;

pub use client::{Client, UserSource};
pub use model::*;
