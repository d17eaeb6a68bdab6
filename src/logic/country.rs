//! Adding countries to and removing them from a user's visited list.

use crate::{
    dal::{Dal, DalError},
    schema::CountryMatch,
};
use failure::Fail;
use futures::{
    future::{err, Either},
    Future,
};
use log::{debug, info};
use serde_derive::Deserialize;
use std::{fmt, str::FromStr, sync::Arc};

/// What to do with a country.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Add it to the user's visited list.
    Add,

    /// Remove it from the user's visited list.
    Delete,
}

/// How to pick a country when the name the user typed matches more than one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchPolicy {
    /// Take the alphabetically first match.
    First,

    /// Take the match whose name or code is exactly what was typed, or the only match if there's
    /// just one. Anything else is ambiguous.
    Exact,

    /// Only accept a fragment that matches exactly one country.
    Unique,
}

impl MatchPolicy {
    /// Picks a country out of the (name-ordered) matches for the given lower-cased input.
    pub fn pick(
        self,
        input: &str,
        mut matches: Vec<CountryMatch>,
    ) -> Result<CountryMatch, CountryError> {
        if matches.is_empty() {
            return Err(CountryError::NotFound);
        }

        let idx = match self {
            MatchPolicy::First => Some(0),
            MatchPolicy::Exact => matches
                .iter()
                .position(|c| {
                    c.country_name.to_lowercase() == input
                        || c.country_code.to_lowercase() == input
                })
                .or_else(|| if matches.len() == 1 { Some(0) } else { None }),
            MatchPolicy::Unique if matches.len() == 1 => Some(0),
            MatchPolicy::Unique => None,
        };

        match idx {
            Some(idx) => Ok(matches.swap_remove(idx)),
            None => {
                let names = matches
                    .iter()
                    .map(|c| c.country_name.as_str())
                    .collect::<Vec<_>>();
                Err(CountryError::Ambiguous(names.join(", ")))
            }
        }
    }
}

impl Default for MatchPolicy {
    fn default() -> MatchPolicy {
        MatchPolicy::Exact
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<MatchPolicy, String> {
        match s {
            "first" => Ok(MatchPolicy::First),
            "exact" => Ok(MatchPolicy::Exact),
            "unique" => Ok(MatchPolicy::Unique),
            _ => Err(format!(
                "unknown country match policy {:?} (expected first, exact, or unique)",
                s
            )),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match self {
            MatchPolicy::First => "first",
            MatchPolicy::Exact => "exact",
            MatchPolicy::Unique => "unique",
        })
    }
}

/// A change that was made to a user's visited list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mutation {
    /// The country was added.
    Added(CountryMatch),

    /// The country was removed.
    Deleted(CountryMatch),
}

/// The reasons a change to a user's visited list can fail.
#[derive(Debug, Fail)]
pub enum CountryError {
    /// No country was entered.
    #[fail(display = "Enter a country")]
    Empty,

    /// No country matched what was entered.
    #[fail(display = "Country does NOT exist")]
    NotFound,

    /// Several countries matched what was entered, and the match policy didn't pick one.
    #[fail(display = "Country name is ambiguous: {}", _0)]
    Ambiguous(String),

    /// The country was to be added, but the user had already visited it.
    #[fail(display = "Country already in visited list")]
    AlreadyVisited,

    /// The country was to be removed, but the user hadn't visited it.
    #[fail(display = "Country was not in the visited list")]
    NotInList,

    /// The database refused to add the country.
    #[fail(display = "Country already exists")]
    Rejected(#[cause] DalError),

    /// The database failed.
    #[fail(display = "{}", _0)]
    Storage(#[cause] DalError),
}

impl From<DalError> for CountryError {
    fn from(err: DalError) -> CountryError {
        CountryError::Storage(err)
    }
}

type MutationFuture = Box<dyn Future<Item = Mutation, Error = CountryError> + Send>;

/// Adds a country to or removes it from a user's visited list. The country may be given as
/// (part of) its name, or as its code.
pub fn update_visited(
    dal: Arc<dyn Dal>,
    policy: MatchPolicy,
    user: i32,
    country: &str,
    operation: Operation,
) -> impl Future<Item = Mutation, Error = CountryError> {
    let fragment = country.trim().to_lowercase();
    if fragment.is_empty() {
        debug!("No country was entered for user {}", user);
        return Either::A(err(CountryError::Empty));
    }

    let dal_list = dal.clone();
    Either::B(
        dal.resolve_country_code(fragment.clone())
            .map_err(CountryError::from)
            .and_then(move |matches| policy.pick(&fragment, matches))
            .and_then(move |country| {
                dal_list
                    .list_user_visited_country_codes(user)
                    .map_err(CountryError::from)
                    .map(|visited| (country, visited))
            })
            .and_then(move |(country, visited)| mutate(&*dal, user, operation, country, &visited)),
    )
}

fn mutate(
    dal: &dyn Dal,
    user: i32,
    operation: Operation,
    country: CountryMatch,
    visited: &[String],
) -> MutationFuture {
    match operation {
        Operation::Add => {
            if visited.contains(&country.country_code) {
                info!(
                    "User {} has already visited {}",
                    user, country.country_code
                );
                return Box::new(err(CountryError::AlreadyVisited));
            }

            Box::new(
                dal.add_visited_country(country.country_code.clone(), user)
                    .map_err(|err| {
                        if err.is_constraint() {
                            CountryError::Rejected(err)
                        } else {
                            CountryError::Storage(err)
                        }
                    })
                    .map(move |()| {
                        info!("User {} visited {}", user, country.country_code);
                        Mutation::Added(country)
                    }),
            )
        }
        Operation::Delete => Box::new(
            dal.delete_visited_country(country.country_code.clone(), user)
                .map_err(CountryError::from)
                .and_then(move |deleted| {
                    if deleted == 0 {
                        info!(
                            "User {} hadn't visited {}",
                            user, country.country_code
                        );
                        Err(CountryError::NotInList)
                    } else {
                        info!("User {} unvisited {}", user, country.country_code);
                        Ok(Mutation::Deleted(country))
                    }
                }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dal::MemoryDB;

    fn setup() -> (MemoryDB, Arc<dyn Dal>, i32) {
        let db = MemoryDB::with_countries(vec![
            ("CA", "Canada"),
            ("JP", "Japan"),
            ("NE", "Niger"),
            ("NG", "Nigeria"),
        ]);
        let user = db.add_user("Alice".into(), "blue".into()).wait().unwrap();
        let dal: Arc<dyn Dal> = Arc::new(db.clone());
        (db, dal, user.id)
    }

    fn country(code: &str, name: &str) -> CountryMatch {
        CountryMatch {
            country_code: code.to_owned(),
            country_name: name.to_owned(),
        }
    }

    fn visited(db: &MemoryDB, user: i32) -> Vec<String> {
        db.list_user_visited_country_codes(user).wait().unwrap()
    }

    #[test]
    fn add_by_name() {
        let (db, dal, user) = setup();
        let mutation = update_visited(dal, MatchPolicy::Exact, user, " Canada ", Operation::Add)
            .wait()
            .unwrap();
        assert_eq!(mutation, Mutation::Added(country("CA", "Canada")));
        assert_eq!(visited(&db, user), vec!["CA"]);
    }

    #[test]
    fn add_by_code() {
        let (db, dal, user) = setup();
        let _ = update_visited(dal, MatchPolicy::Unique, user, "ng", Operation::Add)
            .wait()
            .unwrap();
        assert_eq!(visited(&db, user), vec!["NG"]);
    }

    #[test]
    fn empty_country_touches_nothing() {
        let (db, dal, user) = setup();
        db.set_offline(true);
        match update_visited(dal, MatchPolicy::Exact, user, "   ", Operation::Add).wait() {
            Err(CountryError::Empty) => {}
            r => panic!("expected an empty country error, got {:?}", r),
        }
    }

    #[test]
    fn unknown_country() {
        let (db, dal, user) = setup();
        match update_visited(dal, MatchPolicy::Exact, user, "Atlantis", Operation::Add).wait() {
            Err(CountryError::NotFound) => {}
            r => panic!("expected a not found error, got {:?}", r),
        }
        assert_eq!(db.writes(), 1);
    }

    #[test]
    fn add_twice() {
        let (db, dal, user) = setup();
        let _ = update_visited(dal.clone(), MatchPolicy::Exact, user, "japan", Operation::Add)
            .wait()
            .unwrap();
        let writes = db.writes();

        match update_visited(dal, MatchPolicy::Exact, user, "Japan", Operation::Add).wait() {
            Err(CountryError::AlreadyVisited) => {}
            r => panic!("expected an already visited error, got {:?}", r),
        }
        assert_eq!(db.writes(), writes);
        assert_eq!(visited(&db, user), vec!["JP"]);
    }

    #[test]
    fn add_then_delete() {
        let (db, dal, user) = setup();
        let _ = update_visited(dal.clone(), MatchPolicy::Exact, user, "Japan", Operation::Add)
            .wait()
            .unwrap();
        let before = visited(&db, user);

        let _ = update_visited(dal.clone(), MatchPolicy::Exact, user, "Canada", Operation::Add)
            .wait()
            .unwrap();
        let mutation =
            update_visited(dal, MatchPolicy::Exact, user, "Canada", Operation::Delete)
                .wait()
                .unwrap();
        assert_eq!(mutation, Mutation::Deleted(country("CA", "Canada")));
        assert_eq!(visited(&db, user), before);
    }

    #[test]
    fn delete_unvisited() {
        let (db, dal, user) = setup();
        match update_visited(dal, MatchPolicy::Exact, user, "Canada", Operation::Delete).wait() {
            Err(CountryError::NotInList) => {}
            r => panic!("expected a not in list error, got {:?}", r),
        }
        assert!(visited(&db, user).is_empty());
        assert_eq!(db.writes(), 1);
    }

    #[test]
    fn constraint_violations_are_rejections() {
        let (_, dal, _) = setup();
        match update_visited(dal, MatchPolicy::Exact, 99, "Canada", Operation::Add).wait() {
            Err(CountryError::Rejected(err)) => assert!(err.is_constraint()),
            r => panic!("expected a rejection, got {:?}", r),
        }
    }

    #[test]
    fn storage_failures() {
        let (db, dal, user) = setup();
        db.set_offline(true);
        match update_visited(dal, MatchPolicy::Exact, user, "Canada", Operation::Add).wait() {
            Err(CountryError::Storage(err)) => assert!(!err.is_constraint()),
            r => panic!("expected a storage error, got {:?}", r),
        }
    }

    #[test]
    fn ambiguous_fragments() {
        let (db, dal, user) = setup();

        match update_visited(dal.clone(), MatchPolicy::Exact, user, "an", Operation::Add).wait() {
            Err(CountryError::Ambiguous(names)) => assert_eq!(names, "Canada, Japan"),
            r => panic!("expected an ambiguity error, got {:?}", r),
        }

        // "niger" is both a country and part of another; the exact name wins.
        let _ = update_visited(dal.clone(), MatchPolicy::Exact, user, "Niger", Operation::Add)
            .wait()
            .unwrap();
        assert_eq!(visited(&db, user), vec!["NE"]);

        match update_visited(dal.clone(), MatchPolicy::Unique, user, "niger", Operation::Add).wait()
        {
            Err(CountryError::Ambiguous(names)) => assert_eq!(names, "Niger, Nigeria"),
            r => panic!("expected an ambiguity error, got {:?}", r),
        }

        let mutation = update_visited(dal, MatchPolicy::First, user, "an", Operation::Add)
            .wait()
            .unwrap();
        assert_eq!(mutation, Mutation::Added(country("CA", "Canada")));
    }

    #[test]
    fn pick() {
        let both = || vec![country("CA", "Canada"), country("JP", "Japan")];
        assert_eq!(
            MatchPolicy::First.pick("an", both()).unwrap(),
            country("CA", "Canada")
        );
        assert_eq!(
            MatchPolicy::Exact.pick("jp", both()).unwrap(),
            country("JP", "Japan")
        );
        assert!(MatchPolicy::Unique.pick("an", both()).is_err());
        match MatchPolicy::First.pick("an", Vec::new()) {
            Err(CountryError::NotFound) => {}
            r => panic!("expected a not found error, got {:?}", r),
        }
    }

    #[test]
    fn policy_names() {
        for policy in &[MatchPolicy::First, MatchPolicy::Exact, MatchPolicy::Unique] {
            assert_eq!(policy.to_string().parse::<MatchPolicy>(), Ok(*policy));
        }
        assert!("fuzzy".parse::<MatchPolicy>().is_err());
        assert_eq!(MatchPolicy::default(), MatchPolicy::Exact);
    }
}
