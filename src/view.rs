//! Helpers for front ends rendering the store: list search and sort, the
//! detail page lookup, the add form and the edit form.
use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{
    error::{Error, Result},
    store::{Status, UsersState},
    users::{Address, Company, User, UserId},
};

/// Message shown when the add form is submitted without a name or email.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Name and Email are required.";

/// Sort order of the user list.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SortOption {
    /// Store order, most recently added first.
    #[default]
    Default,
    NameAsc,
    NameDesc,
    EmailAsc,
    EmailDesc,
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOption::Default => "default",
            SortOption::NameAsc => "name-asc",
            SortOption::NameDesc => "name-desc",
            SortOption::EmailAsc => "email-asc",
            SortOption::EmailDesc => "email-desc",
        })
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(SortOption::Default),
            "name-asc" => Ok(SortOption::NameAsc),
            "name-desc" => Ok(SortOption::NameDesc),
            "email-asc" => Ok(SortOption::EmailAsc),
            "email-desc" => Ok(SortOption::EmailDesc),
            _ => Err(format!("unknown sort option: {s}")),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Users whose name or email contains `search` (case-insensitive), in the
/// requested order. The sort is stable, so ties keep store order.
pub fn filter_and_sort<'a>(users: &'a [User], search: &str, sort: SortOption) -> Vec<&'a User> {
    let needle = search.to_lowercase();
    let mut result: Vec<&User> = users
        .iter()
        .filter(|user| {
            user.name.to_lowercase().contains(&needle)
                || user.email.to_lowercase().contains(&needle)
        })
        .collect();

    match sort {
        SortOption::Default => {}
        SortOption::NameAsc => result.sort_by(|a, b| compare_text(&a.name, &b.name)),
        SortOption::NameDesc => result.sort_by(|a, b| compare_text(&b.name, &a.name)),
        SortOption::EmailAsc => result.sort_by(|a, b| compare_text(&a.email, &b.email)),
        SortOption::EmailDesc => result.sort_by(|a, b| compare_text(&b.email, &a.email)),
    }
    result
}

/// Parse the `id` route parameter. Anything that is not an integer matches
/// no user.
pub fn parse_route_id(raw: &str) -> Option<UserId> {
    raw.trim().parse().ok()
}

/// What the detail page should show.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Lookup {
    /// Nothing fetched yet, or a fetch is running.
    Loading,
    NotFound,
    Found(User),
}

/// Resolve the detail page for route parameter `raw_id`.
pub fn lookup(state: &UsersState, raw_id: &str) -> Lookup {
    if matches!(state.status, Status::Idle | Status::Loading) && state.users.is_empty() {
        return Lookup::Loading;
    }
    parse_route_id(raw_id)
        .and_then(|id| state.get(id))
        .map_or(Lookup::NotFound, |user| Lookup::Found(user.clone()))
}

/// The add-user form.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub company_name: String,
}

impl NewUser {
    /// Name and email must not be blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(Error::Validation(REQUIRED_FIELDS_MESSAGE.to_string()));
        }
        Ok(())
    }

    /// Validate and build the user with `id`. Address, phone and website are
    /// left empty.
    pub fn into_user(self, id: UserId) -> Result<User> {
        self.validate()?;
        Ok(User {
            id,
            name: self.name,
            email: self.email,
            company: Company {
                name: self.company_name,
            },
            address: Address::default(),
            phone: String::new(),
            website: String::new(),
        })
    }

    /// Like [`NewUser::into_user`], with the current time in milliseconds as
    /// the id.
    ///
    /// Two users created in the same millisecond, or a clash with a server
    /// id, are not detected here.
    pub fn into_user_now(self) -> Result<User> {
        self.into_user(next_local_id())
    }
}

/// A fresh id for a locally created user.
pub fn next_local_id() -> UserId {
    chrono::Utc::now().timestamp_millis()
}

/// Set one field of `user` from the edit form. Nested fields use dotted
/// names such as `address.street`.
pub fn apply_edit(user: &mut User, field: &str, value: impl Into<String>) -> Result<()> {
    let slot = match field {
        "name" => &mut user.name,
        "email" => &mut user.email,
        "phone" => &mut user.phone,
        "website" => &mut user.website,
        "company.name" => &mut user.company.name,
        "address.street" => &mut user.address.street,
        "address.suite" => &mut user.address.suite,
        "address.city" => &mut user.address.city,
        "address.zipcode" => &mut user.address.zipcode,
        _ => return Err(Error::UnknownField(field.to_string())),
    };
    *slot = value.into();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn user(id: UserId, name: &str, email: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    fn sample() -> Vec<User> {
        vec![
            user(3, "Clementine Bauch", "Nathan@yesenia.net"),
            user(1, "Leanne Graham", "Sincere@april.biz"),
            user(2, "Ervin Howell", "Shanna@melissa.tv"),
        ]
    }

    fn ids(users: Vec<&User>) -> Vec<UserId> {
        users.into_iter().map(|u| u.id).collect()
    }

    #[test]
    fn test_sort_option_round_trip() {
        for option in [
            SortOption::Default,
            SortOption::NameAsc,
            SortOption::NameDesc,
            SortOption::EmailAsc,
            SortOption::EmailDesc,
        ] {
            assert_eq!(option.to_string().parse::<SortOption>(), Ok(option));
        }
        assert!("age-asc".parse::<SortOption>().is_err());
    }

    #[test]
    fn test_default_keeps_store_order() {
        let users = sample();
        assert_eq!(ids(filter_and_sort(&users, "", SortOption::Default)), vec![3, 1, 2]);
    }

    #[test]
    fn test_sorts() {
        let users = sample();
        assert_eq!(ids(filter_and_sort(&users, "", SortOption::NameAsc)), vec![3, 2, 1]);
        assert_eq!(ids(filter_and_sort(&users, "", SortOption::NameDesc)), vec![1, 2, 3]);
        assert_eq!(ids(filter_and_sort(&users, "", SortOption::EmailAsc)), vec![3, 2, 1]);
        assert_eq!(ids(filter_and_sort(&users, "", SortOption::EmailDesc)), vec![1, 2, 3]);
    }

    #[test]
    fn test_search_matches_name_or_email() {
        let users = sample();
        assert_eq!(ids(filter_and_sort(&users, "GRAHAM", SortOption::Default)), vec![1]);
        assert_eq!(ids(filter_and_sort(&users, "melissa", SortOption::Default)), vec![2]);
        assert_eq!(ids(filter_and_sort(&users, "ne", SortOption::NameAsc)), vec![3, 1]);
        assert!(filter_and_sort(&users, "zzz", SortOption::Default).is_empty());
    }

    #[test]
    fn test_lookup() {
        let mut state = UsersState::default();
        assert_eq!(lookup(&state, "1"), Lookup::Loading);

        state.users = sample();
        state.status = Status::Succeeded;
        assert_eq!(
            lookup(&state, "1"),
            Lookup::Found(user(1, "Leanne Graham", "Sincere@april.biz"))
        );
        assert_eq!(lookup(&state, "42"), Lookup::NotFound);
        assert_eq!(lookup(&state, "abc"), Lookup::NotFound);

        state.users.clear();
        state.status = Status::Failed;
        assert_eq!(lookup(&state, "1"), Lookup::NotFound);
    }

    #[test]
    fn test_parse_route_id() {
        assert_eq!(parse_route_id("1700000000000"), Some(1_700_000_000_000));
        assert_eq!(parse_route_id(" 7 "), Some(7));
        assert_eq!(parse_route_id("7a"), None);
        assert_eq!(parse_route_id(""), None);
    }

    #[test]
    fn test_new_user_requires_name_and_email() {
        let form = NewUser {
            name: "  ".to_string(),
            email: "ada@example.com".to_string(),
            ..Default::default()
        };
        match form.into_user(1) {
            Err(Error::Validation(msg)) => assert_eq!(msg, REQUIRED_FIELDS_MESSAGE),
            res => panic!("Expected validation error, got {:?}", res),
        }
    }

    #[test]
    fn test_new_user_defaults() {
        let form = NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company_name: "X".to_string(),
        };
        let user = form.into_user_now().unwrap();
        assert!(user.id > 0);
        assert_eq!(user.company.name, "X");
        assert_eq!(user.address, Address::default());
        assert_eq!(user.phone, "");
        assert_eq!(user.website, "");
    }

    #[test]
    fn test_apply_edit() {
        let mut user = user(1, "Leanne Graham", "Sincere@april.biz");
        apply_edit(&mut user, "address.street", "Victor Plains").unwrap();
        apply_edit(&mut user, "phone", "010-692-6593").unwrap();
        apply_edit(&mut user, "company.name", "Deckow-Crist").unwrap();
        assert_eq!(user.address.street, "Victor Plains");
        assert_eq!(user.phone, "010-692-6593");
        assert_eq!(user.company.name, "Deckow-Crist");

        match apply_edit(&mut user, "address.geo", "x") {
            Err(Error::UnknownField(field)) => assert_eq!(field, "address.geo"),
            res => panic!("Expected unknown field, got {:?}", res),
        }
    }
}
