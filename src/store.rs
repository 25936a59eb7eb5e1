//! The users state container.
//!
//! [`Store`] is the only place the user list is mutated. Every transition is
//! mirrored to its [`Persistor`] and broadcast to subscribers.
//!
//! # Examples
//! ```no_run
//! use userdesk::{persist::Persistor, store::Store, users::User, Client, Error};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::new()?;
//!     let store = Store::open(Persistor::in_memory());
//!
//!     // Seeds the list only when nothing was rehydrated.
//!     store.ensure_loaded(&client.users).await;
//!
//!     store.add(User {
//!         id: 1_700_000_000_000,
//!         name: "Ada".to_string(),
//!         email: "ada@example.com".to_string(),
//!         ..Default::default()
//!     });
//!     assert_eq!(store.users()[0].name, "Ada");
//!
//!     Ok(())
//! }
//! ```
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::{
    error::{Error, Result},
    persist::Persistor,
    users::{User, UserId, UserSource},
};

/// Shown when a failed fetch carries no message of its own.
pub const FALLBACK_ERROR: &str = "Something went wrong";
/// Recorded when the future driving a fetch is dropped before it completes.
pub const CANCELLED_ERROR: &str = "Fetch was cancelled before it completed";

/// Life-cycle of the remote fetch.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Idle => "idle",
            Status::Loading => "loading",
            Status::Succeeded => "succeeded",
            Status::Failed => "failed",
        })
    }
}

/// Everything the store holds. This is also the persisted shape.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
#[serde(default)]
pub struct UsersState {
    /// Most recently added first.
    pub users: Vec<User>,
    pub status: Status,
    /// Only set while `status` is [`Status::Failed`].
    pub error: Option<String>,
}

impl UsersState {
    /// Look up a user by id.
    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }
}

/// What a call to [`Store::fetch_all`] or [`Store::ensure_loaded`] did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FetchOutcome {
    /// The list was replaced with the fetched collection.
    Succeeded,
    /// The fetch failed; see [`Store::error`].
    Failed,
    /// Another fetch was already running, nothing was requested.
    AlreadyInFlight,
    /// The store was not idle and empty, nothing was requested.
    Skipped,
}

/// The users state container.
///
/// Construct one per application (or per test) and hand it to whatever
/// renders it; there is no global instance.
///
/// Each transition is persisted synchronously while the state lock is held.
/// With [`FileStorage`](crate::persist::FileStorage) that is a blocking file
/// write on the calling thread, including when called from async code.
#[derive(Debug)]
pub struct Store {
    state: Mutex<UsersState>,
    persistor: Persistor,
    tx: watch::Sender<UsersState>,
}

impl Store {
    /// Rehydrate a store from `persistor`. The returned store already holds
    /// the persisted state.
    pub fn open(persistor: Persistor) -> Self {
        let state = persistor.load();
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            state: Mutex::new(state),
            persistor,
            tx,
        }
    }

    /// A store persisting to memory only.
    pub fn in_memory() -> Self {
        Self::open(Persistor::in_memory())
    }

    pub fn persistor(&self) -> &Persistor {
        &self.persistor
    }

    fn lock(&self) -> MutexGuard<'_, UsersState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` under the lock. When it reports a change, the new state is
    /// persisted and broadcast before the lock is released, so writes land in
    /// mutation order.
    fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut UsersState) -> bool,
    {
        let mut state = self.lock();
        let changed = f(&mut state);
        if changed {
            self.persistor.on_state_change(&state);
            self.tx.send_replace(state.clone());
        }
        changed
    }

    /// A copy of the whole state.
    pub fn snapshot(&self) -> UsersState {
        self.lock().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.lock().get(id).cloned()
    }

    /// Receive every state the store moves to.
    pub fn subscribe(&self) -> watch::Receiver<UsersState> {
        self.tx.subscribe()
    }

    /// Fetch the full collection from `source` and replace the list with it.
    ///
    /// Local additions and edits are overwritten. Failures are recorded in
    /// the state rather than returned; the status stays `failed` until the
    /// next explicit call. Returns [`FetchOutcome::AlreadyInFlight`] without
    /// touching `source` when another fetch is running.
    #[instrument(skip_all)]
    pub async fn fetch_all<S>(&self, source: &S) -> FetchOutcome
    where
        S: UserSource + ?Sized,
    {
        let started = self.mutate(|state| {
            if state.status == Status::Loading {
                return false;
            }
            begin_fetch(state);
            true
        });
        if !started {
            debug!("fetch already in flight");
            return FetchOutcome::AlreadyInFlight;
        }

        self.complete_fetch(source).await
    }

    /// Fetch only when nothing has been loaded yet: the status is idle and
    /// the list is empty.
    #[instrument(skip_all)]
    pub async fn ensure_loaded<S>(&self, source: &S) -> FetchOutcome
    where
        S: UserSource + ?Sized,
    {
        let started = self.mutate(|state| {
            if state.status != Status::Idle || !state.users.is_empty() {
                return false;
            }
            begin_fetch(state);
            true
        });
        if !started {
            return FetchOutcome::Skipped;
        }

        self.complete_fetch(source).await
    }

    async fn complete_fetch<S>(&self, source: &S) -> FetchOutcome
    where
        S: UserSource + ?Sized,
    {
        let guard = FetchGuard { store: self };
        let result = source.fetch_users().await;
        std::mem::forget(guard);

        match result {
            Ok(users) => {
                let users = unique_by_id(users);
                debug!(users = users.len(), "fetched users");
                self.mutate(|state| {
                    state.users = users;
                    state.status = Status::Succeeded;
                    state.error = None;
                    true
                });
                FetchOutcome::Succeeded
            }
            Err(e) => {
                let mut message = e.to_string();
                if message.trim().is_empty() {
                    message = FALLBACK_ERROR.to_string();
                }
                warn!(error = %message, "failed to fetch users");
                self.mutate(|state| {
                    state.status = Status::Failed;
                    state.error = Some(message);
                    true
                });
                FetchOutcome::Failed
            }
        }
    }

    /// Insert `user` at the front of the list.
    ///
    /// Ids are expected to be fresh. If one is not, the older entry with that
    /// id is dropped so ids stay unique.
    pub fn add(&self, user: User) {
        self.mutate(|state| {
            let before = state.users.len();
            state.users.retain(|existing| existing.id != user.id);
            if state.users.len() != before {
                warn!(id = user.id, "replacing user with reused id");
            }
            state.users.insert(0, user);
            true
        });
    }

    /// Remove every user with `id`. Returns whether anything was removed.
    pub fn delete(&self, id: UserId) -> bool {
        self.mutate(|state| {
            let before = state.users.len();
            state.users.retain(|user| user.id != id);
            state.users.len() != before
        })
    }

    /// Replace the user with the same id as `user`, whole-record. Returns
    /// whether a user was replaced.
    pub fn update(&self, user: User) -> bool {
        self.mutate(|state| {
            match state.users.iter_mut().find(|existing| existing.id == user.id) {
                Some(existing) => {
                    *existing = user;
                    true
                }
                None => false,
            }
        })
    }

    /// Reset to the default state and remove the persisted snapshot.
    ///
    /// Refused with [`Error::FetchInFlight`] while a fetch is running, since
    /// its result would land on the purged state.
    pub fn purge(&self) -> Result<()> {
        let mut state = self.lock();
        if state.status == Status::Loading {
            return Err(Error::FetchInFlight);
        }
        *state = UsersState::default();
        self.tx.send_replace(state.clone());
        self.persistor.purge()
    }
}

// Moves a fetch whose future was dropped mid-request to `failed`. While the
// status is `loading` no other fetch can start, so the loading state here is
// always the guarded fetch's own.
struct FetchGuard<'a> {
    store: &'a Store,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.store.mutate(|state| {
            if state.status != Status::Loading {
                return false;
            }
            warn!("fetch dropped before completion");
            state.status = Status::Failed;
            state.error = Some(CANCELLED_ERROR.to_string());
            true
        });
    }
}

fn begin_fetch(state: &mut UsersState) {
    state.status = Status::Loading;
    state.error = None;
}

// Keeps the first of each id.
fn unique_by_id(users: Vec<User>) -> Vec<User> {
    let mut seen = HashSet::with_capacity(users.len());
    users
        .into_iter()
        .filter(|user| {
            let fresh = seen.insert(user.id);
            if !fresh {
                warn!(id = user.id, "dropping fetched user with duplicate id");
            }
            fresh
        })
        .collect()
}
