//! The query catalog.
//!
//! SQL lives in a plain text file rather than in the binary, as a series of named blocks:
//!
//! ```sql
//! -- name: listUsers
//! SELECT id, name, colour FROM users ORDER BY id ASC;
//!
//! -- name: deleteUser
//! DELETE FROM users WHERE id = $1;
//! ```
//!
//! Each block runs from its header to the next header (or the end of the file). Anything before
//! the first header is ignored.

use failure::Fail;
use std::{
    collections::HashMap,
    fs::File,
    io::{self, Read},
    path::Path,
    str::FromStr,
};

/// An error loading a query catalog.
#[derive(Debug, Fail)]
pub enum LoadError {
    /// A block had a header, but no SQL.
    #[fail(display = "Empty SQL for block {:?}", _0)]
    EmptyBlock(String),

    /// Two blocks had the same name.
    #[fail(display = "Duplicate query name: {}", _0)]
    Duplicate(String),

    /// A query that was needed wasn't defined.
    #[fail(display = "Missing query: {}", _0)]
    Missing(String),

    /// The catalog couldn't be read.
    #[fail(display = "Couldn't read the query catalog: {}", _0)]
    Io(#[cause] io::Error),

    /// The catalog wasn't UTF-8.
    #[fail(display = "The query catalog isn't valid UTF-8: {}", _0)]
    Utf8(#[cause] std::string::FromUtf8Error),
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> LoadError {
        LoadError::Io(err)
    }
}

/// An immutable mapping from query names to SQL.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryCatalog {
    queries: HashMap<String, String>,
}

impl QueryCatalog {
    /// Loads a catalog from the file at the given path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<QueryCatalog, LoadError> {
        QueryCatalog::from_reader(File::open(path)?)
    }

    /// Loads a catalog from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<QueryCatalog, LoadError> {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf)?;
        let text = String::from_utf8(buf).map_err(LoadError::Utf8)?;
        QueryCatalog::parse(&text)
    }

    /// Parses the text of a catalog.
    pub fn parse(text: &str) -> Result<QueryCatalog, LoadError> {
        let text = text.trim_start_matches('\u{feff}');
        let mut queries = HashMap::new();
        let mut current: Option<(&str, Vec<&str>)> = None;

        // str::lines already drops the '\r' of a "\r\n".
        for line in text.lines() {
            if let Some(name) = parse_header(line) {
                if let Some((prev, body)) = current.take() {
                    insert_block(&mut queries, prev, &body)?;
                }
                current = Some((name, Vec::new()));
            } else if let Some((_, ref mut body)) = current {
                body.push(line);
            }
        }
        if let Some((name, body)) = current {
            insert_block(&mut queries, name, &body)?;
        }

        Ok(QueryCatalog { queries })
    }

    /// Returns the SQL for the query with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(|sql| sql.as_str())
    }

    /// Checks that every one of the given queries is defined.
    pub fn require(&self, names: &[&str]) -> Result<(), LoadError> {
        match names.iter().find(|name| !self.queries.contains_key(**name)) {
            Some(name) => Err(LoadError::Missing(name.to_string())),
            None => Ok(()),
        }
    }

    /// Returns the names of all the queries, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(|name| name.as_str())
    }

    /// Returns the number of queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns whether there are no queries at all.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl FromStr for QueryCatalog {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<QueryCatalog, LoadError> {
        QueryCatalog::parse(s)
    }
}

/// Recognizes a `-- name: foo` line, returning `foo`.
fn parse_header(line: &str) -> Option<&str> {
    let rest = line.trim();
    if !rest.starts_with("--") {
        return None;
    }
    let rest = rest[2..].trim_start();
    if !rest.starts_with("name:") {
        return None;
    }
    let name = rest["name:".len()..].trim();

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Some(name)
    } else {
        None
    }
}

fn insert_block(
    queries: &mut HashMap<String, String>,
    name: &str,
    body: &[&str],
) -> Result<(), LoadError> {
    let sql = body.join("\n");
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(LoadError::EmptyBlock(name.to_owned()));
    }
    if queries.contains_key(name) {
        return Err(LoadError::Duplicate(name.to_owned()));
    }
    let _ = queries.insert(name.to_owned(), sql.to_owned());
    Ok(())
}
