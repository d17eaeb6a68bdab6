use crate::{
    dal::Dal,
    logic::{
        self,
        country::{CountryError, MatchPolicy, Mutation, Operation},
    },
    router::util::{error_query, redirect, to_rejection, user_location, ErrorQuery, FutureExt},
    view::{listing_context, render_html, render_html_with_status},
};
use futures::{
    future::{result, Either},
    Future,
};
use log::{debug, warn};
use serde_derive::Deserialize;
use std::sync::Arc;
use warp::{
    http::{Response, StatusCode},
    path, Filter, Rejection,
};

/// The home page, listing every member and every visited country.
pub fn home() -> Resp!() {
    warp::path::end()
        .and(warp::ext::get::<Arc<dyn Dal>>())
        .and(error_query())
        .and_then(|dal: Arc<dyn Dal>, query: ErrorQuery| {
            logic::home(&*dal)
                .err_to_rejection()
                .and_then(move |listing| {
                    render_html(
                        "index.html",
                        listing_context(&listing, query.error.as_ref().map(|s| s.as_str())),
                    )
                })
        })
        .boxed()
}

/// A user's page, listing the countries they've visited.
pub fn user() -> Resp!() {
    path!(i32)
        .and(warp::path::end())
        .and(warp::ext::get::<Arc<dyn Dal>>())
        .and(error_query())
        .and_then(|user: i32, dal: Arc<dyn Dal>, query: ErrorQuery| {
            logic::user_page(&*dal, user)
                .err_to_rejection()
                .and_then(move |listing| {
                    render_html(
                        "index.html",
                        listing_context(&listing, query.error.as_ref().map(|s| s.as_str())),
                    )
                })
        })
        .boxed()
}

/// The route for adding a country to or removing a country from a user's visited list.
pub fn update() -> Resp!() {
    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(default)]
        country: String,
        operation: Operation,
    }

    path!(i32)
        .and(warp::path::end())
        .and(warp::body::content_length_limit(2 * 1024))
        .and(warp::ext::get::<Arc<dyn Dal>>())
        .and(warp::ext::get::<MatchPolicy>())
        .and(warp::body::form())
        .and_then(
            |user: i32, dal: Arc<dyn Dal>, policy: MatchPolicy, form: Form| {
                debug!(
                    "Country: {:?}, Operation: {:?}, User: {}",
                    form.country, form.operation, user
                );
                logic::country::update_visited(
                    dal.clone(),
                    policy,
                    user,
                    &form.country,
                    form.operation,
                )
                .then(move |r| respond(dal, user, r))
            },
        )
        .boxed()
}

/// Picks the response for the outcome of an update: a redirect back to the user's page (with an
/// error message for the "soft" failures), a re-rendered page for rejected changes, or a 500.
fn respond(
    dal: Arc<dyn Dal>,
    user: i32,
    r: Result<Mutation, CountryError>,
) -> impl Future<Item = Response<String>, Error = Rejection> {
    let err = match r {
        Ok(_) => return Either::A(result(redirect(&user_location(user, None)))),
        Err(err) => err,
    };

    match err {
        CountryError::Empty => Either::A(result(redirect(&user_location(user, None)))),
        CountryError::NotFound
        | CountryError::Ambiguous(_)
        | CountryError::AlreadyVisited
        | CountryError::NotInList => {
            let msg = err.to_string();
            Either::A(result(redirect(&user_location(user, Some(&msg)))))
        }
        CountryError::Rejected(cause) => {
            warn!("Couldn't add a country for user {}: {}", user, cause);
            let msg = CountryError::Rejected(cause).to_string();
            Either::B(
                logic::user_page(&*dal, user)
                    .err_to_rejection()
                    .and_then(move |listing| {
                        render_html_with_status(
                            StatusCode::BAD_REQUEST,
                            "index.html",
                            listing_context(&listing, Some(&msg)),
                        )
                    }),
            )
        }
        CountryError::Storage(cause) => Either::A(result(Err(to_rejection(cause)))),
    }
}
