use crate::{
    dal::{dedup_codes, Dal, DalError, DalFuture},
    schema::{CountryMatch, User},
};
use antidote::Mutex;
use diesel::result::Error as DieselError;
use futures::future::result;
use std::sync::Arc;

/// An in-memory stand-in for the database. It enforces the same constraints the Postgres schema
/// does: unique user names, unique `(country, user)` visits, visits referring to real countries
/// and users, and visits being deleted along with their user.
#[allow(missing_debug_implementations)]
#[derive(Clone)]
pub struct MemoryDB {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    countries: Vec<CountryMatch>,
    users: Vec<User>,
    visits: Vec<(String, i32)>,
    next_user_id: i32,
    writes: usize,
    offline: bool,
}

impl MemoryDB {
    /// Creates an empty database with the given `(code, name)` countries.
    pub fn with_countries<'a, I>(countries: I) -> MemoryDB
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut countries = countries
            .into_iter()
            .map(|(code, name)| CountryMatch {
                country_code: code.to_owned(),
                country_name: name.to_owned(),
            })
            .collect::<Vec<_>>();
        countries.sort_by(|a, b| a.country_name.cmp(&b.country_name));

        MemoryDB {
            inner: Arc::new(Mutex::new(MemoryInner {
                countries,
                next_user_id: 1,
                ..MemoryInner::default()
            })),
        }
    }

    /// Inserts a visit without checking any constraints, as a database with a missing unique
    /// index might.
    #[cfg(test)]
    pub fn push_visit_unchecked(&self, country_code: &str, user: i32) {
        self.inner.lock().visits.push((country_code.to_owned(), user));
    }

    /// The number of rows inserted or deleted so far.
    #[doc(hidden)]
    pub fn writes(&self) -> usize {
        self.inner.lock().writes
    }

    /// Makes every subsequent operation fail (or succeed again), as if the database went away.
    #[doc(hidden)]
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    fn with<F, T>(&self, func: F) -> DalFuture<T>
    where
        F: FnOnce(&mut MemoryInner) -> Result<T, DalError>,
        T: 'static + Send,
    {
        let mut inner = self.inner.lock();
        let r = if inner.offline {
            Err(DalError::Query(DieselError::QueryBuilderError(
                "the database is offline".into(),
            )))
        } else {
            func(&mut *inner)
        };
        Box::new(result(r))
    }
}

fn constraint(message: &str, detail: String) -> DalError {
    DalError::Constraint {
        message: message.to_owned(),
        detail: Some(detail),
    }
}

impl Dal for MemoryDB {
    fn list_users(&self) -> DalFuture<Vec<User>> {
        self.with(|inner| {
            let mut users = inner.users.clone();
            users.sort_by_key(|user| user.id);
            Ok(users)
        })
    }

    fn list_all_visited_country_codes(&self) -> DalFuture<Vec<String>> {
        self.with(|inner| Ok(inner.visits.iter().map(|(code, _)| code.clone()).collect()))
    }

    fn list_user_visited_country_codes(&self, user: i32) -> DalFuture<Vec<String>> {
        self.with(|inner| {
            let codes = inner
                .visits
                .iter()
                .filter(|(_, id)| *id == user)
                .map(|(code, _)| code.clone())
                .collect();
            Ok(dedup_codes(codes))
        })
    }

    fn resolve_country_code(&self, fragment: String) -> DalFuture<Vec<CountryMatch>> {
        self.with(|inner| {
            Ok(inner
                .countries
                .iter()
                .filter(|country| {
                    country.country_name.to_lowercase().contains(&fragment)
                        || country.country_code.to_lowercase() == fragment
                })
                .cloned()
                .collect())
        })
    }

    fn add_visited_country(&self, country_code: String, user: i32) -> DalFuture<()> {
        self.with(|inner| {
            if !inner
                .countries
                .iter()
                .any(|country| country.country_code == country_code)
            {
                return Err(constraint(
                    r#"insert or update on table "visited_countries" violates foreign key constraint "visited_countries_country_code_fkey""#,
                    format!(
                        r#"Key (country_code)=({}) is not present in table "countries"."#,
                        country_code
                    ),
                ));
            }
            if !inner.users.iter().any(|u| u.id == user) {
                return Err(constraint(
                    r#"insert or update on table "visited_countries" violates foreign key constraint "visited_countries_user_id_fkey""#,
                    format!(r#"Key (user_id)=({}) is not present in table "users"."#, user),
                ));
            }
            if inner
                .visits
                .iter()
                .any(|(code, id)| *code == country_code && *id == user)
            {
                return Err(constraint(
                    r#"duplicate key value violates unique constraint "visited_countries_country_code_user_id_key""#,
                    format!(
                        "Key (country_code, user_id)=({}, {}) already exists.",
                        country_code, user
                    ),
                ));
            }

            inner.visits.push((country_code, user));
            inner.writes += 1;
            Ok(())
        })
    }

    fn delete_visited_country(&self, country_code: String, user: i32) -> DalFuture<usize> {
        self.with(|inner| {
            let before = inner.visits.len();
            inner
                .visits
                .retain(|(code, id)| !(*code == country_code && *id == user));
            let deleted = before - inner.visits.len();
            inner.writes += deleted;
            Ok(deleted)
        })
    }

    fn add_user(&self, name: String, colour: String) -> DalFuture<User> {
        self.with(|inner| {
            if inner.users.iter().any(|user| user.name == name) {
                return Err(constraint(
                    r#"duplicate key value violates unique constraint "users_name_key""#,
                    format!("Key (name)=({}) already exists.", name),
                ));
            }

            let user = User {
                id: inner.next_user_id,
                name,
                colour,
            };
            inner.next_user_id += 1;
            inner.users.push(user.clone());
            inner.writes += 1;
            Ok(user)
        })
    }

    fn delete_user(&self, user: i32) -> DalFuture<usize> {
        self.with(|inner| {
            let before = inner.users.len();
            inner.users.retain(|u| u.id != user);
            inner.visits.retain(|(_, id)| *id != user);
            let deleted = before - inner.users.len();
            inner.writes += deleted;
            Ok(deleted)
        })
    }
}
