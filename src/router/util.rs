use failure::Fail;
use futures::{Async, Future};
use serde_derive::Deserialize;
use url::form_urlencoded;
use warp::{
    http::{header::LOCATION, Response, StatusCode},
    Filter, Rejection,
};

/// An extension trait for Futures.
pub trait FutureExt: Sized {
    /// Converts an error to a `warp::Rejection`.
    fn err_to_rejection(self) -> ErrToRejection<Self>;
}

impl<F> FutureExt for F
where
    F: Future,
    F::Error: Fail,
{
    fn err_to_rejection(self) -> ErrToRejection<Self> {
        ErrToRejection(self)
    }
}

/// A wrapper that converts errors to Rejections.
pub struct ErrToRejection<F>(F);

impl<F> Future for ErrToRejection<F>
where
    F: Future,
    F::Error: Fail,
{
    type Item = F::Item;
    type Error = Rejection;

    fn poll(&mut self) -> Result<Async<F::Item>, Rejection> {
        match self.0.poll() {
            Ok(x) => Ok(x),
            Err(e) => Err(to_rejection(e)),
        }
    }
}

/// Converts an error to a `warp::Rejection`, which the `errors::last_chance` handler will turn
/// into a 500.
pub fn to_rejection<E: Fail>(err: E) -> Rejection {
    warp::reject::custom(failure::Error::from(err).compat())
}

/// A `302 Found` redirect to the given location.
pub fn redirect(location: &str) -> Result<Response<String>, Rejection> {
    Response::builder()
        .header(LOCATION, location)
        .status(StatusCode::FOUND)
        .body(String::new())
        .map_err(to_rejection)
}

/// The location of a user's page, optionally with an error message to show on it.
pub fn user_location(user: i32, error: Option<&str>) -> String {
    let mut location = format!("/user/{}", user);
    if let Some(error) = error {
        location.push('?');
        location += &form_urlencoded::Serializer::new(String::new())
            .append_pair("error", error)
            .finish();
    }
    location
}

/// The `?error=...` query parameter shown on the listing pages.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorQuery {
    /// The error message, if any.
    pub error: Option<String>,
}

/// A filter that extracts the `error` query parameter, if there is one.
pub fn error_query() -> impl Clone + Filter<Extract = (ErrorQuery,), Error = Rejection> {
    warp::query::<ErrorQuery>()
        .or(warp::any().map(ErrorQuery::default))
        .unify()
}

/// A filter that only passes requests with a `_method` query parameter matching the given method,
/// for forms that can't send anything but `GET` and `POST`.
pub fn method_override(
    method: &'static str,
) -> impl Clone + Filter<Extract = (), Error = Rejection> {
    #[derive(Debug, Deserialize)]
    struct Query {
        #[serde(rename = "_method")]
        method: String,
    }

    warp::query::<Query>()
        .and_then(move |query: Query| -> Result<(), Rejection> {
            if query.method.eq_ignore_ascii_case(method) {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}
