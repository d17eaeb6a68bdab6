//! Business logic.
//!
//! > **Logic** is the "business (or domain) logic" of the application. The router will pull the
//! > necessary information out of the HTTP request, and call into this module as quickly as
//! > possible to do all the actual work.

pub mod country;
pub mod member;

use crate::{
    dal::{Dal, DalError},
    schema::User,
};
use futures::Future;
use serde_derive::Serialize;

/// Everything shown on the main page: the members, and a list of visited countries.
#[derive(Clone, Debug, Serialize)]
pub struct Listing {
    /// Every user, ordered by ID.
    pub users: Vec<User>,

    /// The codes of the visited countries. On the home page, this is every user's countries
    /// (with repeats); on a user's page, it's just theirs.
    pub countries: Vec<String>,

    /// The user whose page this is, if any.
    pub selected: Option<User>,

    /// The ID the page was requested for. This is set even if no such user exists.
    pub selected_id: Option<i32>,
}

/// Gets the listing for the home page.
pub fn home(dal: &dyn Dal) -> impl Future<Item = Listing, Error = DalError> {
    dal.list_users()
        .join(dal.list_all_visited_country_codes())
        .map(|(users, countries)| Listing {
            users,
            countries,
            selected: None,
            selected_id: None,
        })
}

/// Gets the listing for a user's page.
pub fn user_page(dal: &dyn Dal, user: i32) -> impl Future<Item = Listing, Error = DalError> {
    dal.list_users()
        .join(dal.list_user_visited_country_codes(user))
        .map(move |(users, countries)| {
            let selected = users.iter().find(|u| u.id == user).cloned();
            Listing {
                users,
                countries,
                selected,
                selected_id: Some(user),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dal::MemoryDB;

    #[test]
    fn listings() {
        let db = MemoryDB::with_countries(vec![("CA", "Canada"), ("JP", "Japan")]);
        let alice = db.add_user("Alice".into(), "blue".into()).wait().unwrap();
        let bob = db.add_user("Bob".into(), "red".into()).wait().unwrap();
        db.add_visited_country("CA".into(), alice.id).wait().unwrap();
        db.add_visited_country("CA".into(), bob.id).wait().unwrap();
        db.add_visited_country("JP".into(), bob.id).wait().unwrap();

        let listing = home(&db).wait().unwrap();
        assert_eq!(listing.users.len(), 2);
        assert_eq!(listing.countries, vec!["CA", "CA", "JP"]);
        assert_eq!(listing.selected, None);

        let listing = user_page(&db, bob.id).wait().unwrap();
        assert_eq!(listing.countries, vec!["CA", "JP"]);
        assert_eq!(listing.selected, Some(bob));
        assert_eq!(listing.selected_id, Some(2));

        let listing = user_page(&db, 7).wait().unwrap();
        assert!(listing.countries.is_empty());
        assert_eq!(listing.selected, None);
        assert_eq!(listing.selected_id, Some(7));
    }
}
