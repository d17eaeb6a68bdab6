use crate::util::log_err;
use failure::{Compat, Error};
use futures::future::{err, ok, Either};
use futures::Future;
use warp::{
    http::{header::CONTENT_TYPE, Response, StatusCode},
    Rejection,
};

/// A last-chance handler for errors that made it out of a route as rejections, rather than being
/// rendered. Rejections that didn't come from an error (not found, bad method, and so on) are
/// passed along for warp to deal with.
pub fn last_chance(rejection: Rejection) -> impl Future<Item = Response<String>, Error = Rejection> {
    let msg = match rejection.find_cause::<Compat<Error>>() {
        Some(cause) => {
            log_err(cause.get_ref().as_fail());

            let mut msg = String::from("Internal Server Error\n");
            for cause in cause.get_ref().iter_chain() {
                msg.push('\n');
                msg += &cause.to_string();
            }
            msg
        }
        None => return Either::A(err(rejection)),
    };

    let r = Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(msg);
    match r {
        Ok(resp) => Either::B(ok(resp)),
        Err(_) => Either::A(err(rejection)),
    }
}
