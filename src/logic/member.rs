//! Adding and removing members.

use crate::{
    dal::{Dal, DalError},
    schema::User,
};
use failure::Fail;
use futures::{
    future::{err, Either},
    Future,
};
use log::info;

/// The reasons adding or removing a member can fail.
#[derive(Debug, Fail)]
pub enum MemberError {
    /// The name or colour was left blank.
    #[fail(display = "Enter a name and a colour")]
    Empty,

    /// There was no member to delete.
    #[fail(display = "There's no member with the ID {}", _0)]
    NoSuchMember(i32),

    /// The database failed, or refused the change.
    #[fail(display = "{}", _0)]
    Storage(#[cause] DalError),
}

impl MemberError {
    /// The message to show the user.
    pub fn detail(&self) -> String {
        match self {
            MemberError::Storage(err) => err.detail(),
            err => err.to_string(),
        }
    }

    /// Whether this is the server's fault, rather than the user's.
    pub fn is_internal(&self) -> bool {
        match self {
            MemberError::Storage(err) => !err.is_constraint(),
            _ => false,
        }
    }
}

impl From<DalError> for MemberError {
    fn from(err: DalError) -> MemberError {
        MemberError::Storage(err)
    }
}

/// Adds a member with the given name and colour.
pub fn add_member(
    dal: &dyn Dal,
    name: &str,
    colour: &str,
) -> impl Future<Item = User, Error = MemberError> {
    let (name, colour) = (name.trim(), colour.trim());
    if name.is_empty() || colour.is_empty() {
        return Either::A(err(MemberError::Empty));
    }

    Either::B(
        dal.add_user(name.to_owned(), colour.to_owned())
            .map_err(MemberError::from)
            .map(|user| {
                info!("Added member {} ({:?})", user.id, user.name);
                user
            }),
    )
}

/// Deletes the member with the given ID.
pub fn delete_member(dal: &dyn Dal, user: i32) -> impl Future<Item = (), Error = MemberError> {
    dal.delete_user(user)
        .map_err(MemberError::from)
        .and_then(move |deleted| {
            if deleted == 0 {
                Err(MemberError::NoSuchMember(user))
            } else {
                info!("Deleted member {}", user);
                Ok(())
            }
        })
}
