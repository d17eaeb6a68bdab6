//! Bindings to the database.
//!
//! > **DAL**, for lack of a better term (borrowing this one from "data access layer" since I don't
//! > want to use "model"), is the only module that does any talking to the database, or any other
//! > IO or interaction with other kinds of externalized state for that matter.
//!
//! The rest of the system only sees the `Dal` trait; `DB` is the Postgres implementation, and
//! `MemoryDB` keeps everything in memory for the tests.

mod memory;

pub use crate::dal::memory::MemoryDB;
use crate::{
    queries::QueryCatalog,
    schema::{CountryMatch, User},
    util::blocking,
};
use diesel::{
    prelude::*,
    r2d2::{ConnectionManager, Pool, PoolError},
    result::{DatabaseErrorKind, Error as DieselError},
    sql_query,
    sql_types::{Integer, Text},
};
use failure::{Fail, Fallible};
use futures::{future::err, Future};
use std::{collections::HashSet, sync::Arc};
use tokio_threadpool::BlockingError;

/// The names of the queries `DB` runs, all of which must be in its catalog.
pub const QUERIES: &[&str] = &[
    "listUsers",
    "listAllVisitedCountries",
    "listUserCountries",
    "getCountryCode",
    "addCountry",
    "deleteCountry",
    "addUser",
    "deleteUser",
];

/// An error talking to the database.
#[derive(Debug, Fail)]
pub enum DalError {
    /// The database refused a row because of a uniqueness or foreign key constraint.
    #[fail(display = "{}", message)]
    Constraint {
        /// The database's error message.
        message: String,

        /// The database's explanation of the error, e.g. which key was duplicated.
        detail: Option<String>,
    },

    /// No connection could be gotten from the pool.
    #[fail(display = "Couldn't get a database connection: {}", _0)]
    Pool(#[cause] PoolError),

    /// A query failed for some other reason.
    #[fail(display = "A query failed: {}", _0)]
    Query(#[cause] DieselError),

    /// The query couldn't be run on the thread pool.
    #[fail(display = "Couldn't run a blocking query: {}", _0)]
    Blocking(String),

    /// A query wasn't in the query catalog.
    #[fail(display = "The query {:?} isn't in the query catalog", _0)]
    MissingQuery(&'static str),
}

impl DalError {
    /// Returns whether this is a constraint violation, as opposed to a "real" failure.
    pub fn is_constraint(&self) -> bool {
        match self {
            DalError::Constraint { .. } => true,
            _ => false,
        }
    }

    /// The most specific human-readable description of the error available.
    pub fn detail(&self) -> String {
        match self {
            DalError::Constraint {
                detail: Some(detail),
                ..
            } => detail.clone(),
            err => err.to_string(),
        }
    }
}

impl From<DieselError> for DalError {
    fn from(err: DieselError) -> DalError {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            | DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, ref info) => {
                DalError::Constraint {
                    message: info.message().to_owned(),
                    detail: info.details().map(str::to_owned),
                }
            }
            err => DalError::Query(err),
        }
    }
}

impl From<PoolError> for DalError {
    fn from(err: PoolError) -> DalError {
        DalError::Pool(err)
    }
}

impl From<BlockingError> for DalError {
    fn from(err: BlockingError) -> DalError {
        DalError::Blocking(format!("{:?}", err))
    }
}

/// The future returned by `Dal` operations.
pub type DalFuture<T> = Box<dyn Future<Item = T, Error = DalError> + Send>;

/// The operations the rest of the system can perform on stored state. Each one is a single
/// statement, committed on its own.
pub trait Dal: Send + Sync {
    /// Lists every user, ordered by ID.
    fn list_users(&self) -> DalFuture<Vec<User>>;

    /// Lists the country codes visited by every user. Codes visited by several users appear
    /// several times.
    fn list_all_visited_country_codes(&self) -> DalFuture<Vec<String>>;

    /// Lists the country codes visited by a user, each at most once, in the order they were
    /// first recorded.
    fn list_user_visited_country_codes(&self, user: i32) -> DalFuture<Vec<String>>;

    /// Finds the countries whose names contain the given (already lower-cased) fragment, or
    /// whose code is exactly the fragment. The results are ordered by name.
    fn resolve_country_code(&self, fragment: String) -> DalFuture<Vec<CountryMatch>>;

    /// Records that a user has visited a country.
    fn add_visited_country(&self, country_code: String, user: i32) -> DalFuture<()>;

    /// Forgets that a user visited a country, returning the number of rows removed.
    fn delete_visited_country(&self, country_code: String, user: i32) -> DalFuture<usize>;

    /// Creates a user, returning them.
    fn add_user(&self, name: String, colour: String) -> DalFuture<User>;

    /// Deletes a user, returning the number of rows removed.
    fn delete_user(&self, user: i32) -> DalFuture<usize>;
}

/// Removes repeated country codes, keeping the first occurrence of each.
pub fn dedup_codes(codes: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

#[derive(QueryableByName)]
struct CountryCodeRow {
    #[sql_type = "Text"]
    country_code: String,
}

fn country_codes(rows: Vec<CountryCodeRow>) -> Vec<String> {
    rows.into_iter().map(|row| row.country_code).collect()
}

/// A pool of connections to the database.
#[allow(missing_debug_implementations)]
#[derive(Clone)]
pub struct DB {
    pool: Arc<Pool<ConnectionManager<PgConnection>>>,
    queries: Arc<QueryCatalog>,
}

impl DB {
    /// Connects to the database with at the given URL, using the queries in the given catalog.
    pub fn connect(database_url: &str, queries: QueryCatalog) -> Fallible<DB> {
        queries.require(QUERIES)?;
        let pool = Arc::new(Pool::new(ConnectionManager::new(database_url))?);
        Ok(DB {
            pool,
            queries: Arc::new(queries),
        })
    }

    /// Performs a query "asynchronously" (but not really). Diesel currently does not support
    /// async/futures, so we use `crate::util::blocking` so the database operations don't block
    /// the thread. This does, however, require the future to be run inside a threadpool.
    fn async_query<F, T>(&self, name: &'static str, func: F) -> DalFuture<T>
    where
        F: 'static + Send + FnOnce(&PgConnection, &str) -> QueryResult<T>,
        T: 'static + Send,
    {
        let sql = match self.queries.get(name) {
            Some(sql) => sql.to_owned(),
            None => return Box::new(err(DalError::MissingQuery(name))),
        };
        let pool = self.pool.clone();
        Box::new(blocking(move || {
            let conn = pool.get()?;
            func(&*conn, sql.as_str()).map_err(DalError::from)
        }))
    }
}

impl Dal for DB {
    fn list_users(&self) -> DalFuture<Vec<User>> {
        self.async_query("listUsers", |conn, sql| sql_query(sql).load(conn))
    }

    fn list_all_visited_country_codes(&self) -> DalFuture<Vec<String>> {
        self.async_query("listAllVisitedCountries", |conn, sql| {
            sql_query(sql).load(conn).map(country_codes)
        })
    }

    fn list_user_visited_country_codes(&self, user: i32) -> DalFuture<Vec<String>> {
        self.async_query("listUserCountries", move |conn, sql| {
            sql_query(sql)
                .bind::<Integer, _>(user)
                .load(conn)
                .map(country_codes)
                .map(dedup_codes)
        })
    }

    fn resolve_country_code(&self, fragment: String) -> DalFuture<Vec<CountryMatch>> {
        self.async_query("getCountryCode", move |conn, sql| {
            sql_query(sql).bind::<Text, _>(fragment).load(conn)
        })
    }

    fn add_visited_country(&self, country_code: String, user: i32) -> DalFuture<()> {
        self.async_query("addCountry", move |conn, sql| {
            sql_query(sql)
                .bind::<Text, _>(country_code)
                .bind::<Integer, _>(user)
                .execute(conn)
                .map(|_| ())
        })
    }

    fn delete_visited_country(&self, country_code: String, user: i32) -> DalFuture<usize> {
        self.async_query("deleteCountry", move |conn, sql| {
            sql_query(sql)
                .bind::<Text, _>(country_code)
                .bind::<Integer, _>(user)
                .execute(conn)
        })
    }

    fn add_user(&self, name: String, colour: String) -> DalFuture<User> {
        self.async_query("addUser", move |conn, sql| {
            sql_query(sql)
                .bind::<Text, _>(name)
                .bind::<Text, _>(colour)
                .get_result(conn)
        })
    }

    fn delete_user(&self, user: i32) -> DalFuture<usize> {
        self.async_query("deleteUser", move |conn, sql| {
            sql_query(sql).bind::<Integer, _>(user).execute(conn)
        })
    }
}
