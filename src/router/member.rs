use crate::{
    dal::Dal,
    logic::member::{add_member, delete_member, MemberError},
    router::util::{redirect, FutureExt},
    util::log_err,
    view::{member_context, render_html, render_html_with_status},
};
use futures::{
    future::{result, Either},
    Future,
};
use serde_derive::Deserialize;
use std::sync::Arc;
use warp::{
    http::{Response, StatusCode},
    path, Filter, Rejection,
};

/// The form for adding a member.
pub fn form() -> Resp!() {
    warp::path::end()
        .and(warp::ext::get::<Arc<dyn Dal>>())
        .and_then(|dal: Arc<dyn Dal>| {
            dal.list_users()
                .err_to_rejection()
                .and_then(|users| render_html("member.html", member_context(&users, "", "", None)))
        })
        .boxed()
}

/// The route for adding a member.
pub fn create() -> Resp!() {
    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(default)]
        name: String,
        #[serde(default, alias = "color")]
        colour: String,
    }

    warp::path::end()
        .and(warp::body::content_length_limit(2 * 1024))
        .and(warp::ext::get::<Arc<dyn Dal>>())
        .and(warp::body::form())
        .and_then(|dal: Arc<dyn Dal>, form: Form| {
            add_member(&*dal, &form.name, &form.colour).then(move |r| match r {
                Ok(_) => Either::A(result(redirect("/"))),
                Err(err) => Either::B(render_error(dal, &form.name, &form.colour, err)),
            })
        })
        .boxed()
}

/// The route for deleting a member.
pub fn delete() -> Resp!() {
    path!(i32)
        .and(warp::path::end())
        .and(warp::ext::get::<Arc<dyn Dal>>())
        .and_then(|user: i32, dal: Arc<dyn Dal>| {
            delete_member(&*dal, user).then(move |r| match r {
                Ok(()) => Either::A(result(redirect("/"))),
                Err(err) => Either::B(render_error(dal, "", "", err)),
            })
        })
        .boxed()
}

/// Re-renders the member form with an error message.
fn render_error(
    dal: Arc<dyn Dal>,
    name: &str,
    colour: &str,
    err: MemberError,
) -> impl Future<Item = Response<String>, Error = Rejection> {
    let status = if err.is_internal() {
        log_err(&err);
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    let (name, colour, msg) = (name.to_owned(), colour.to_owned(), err.detail());

    dal.list_users().then(move |users| {
        let users = users.unwrap_or_else(|err| {
            log_err(&err);
            Vec::new()
        });
        render_html_with_status(
            status,
            "member.html",
            member_context(&users, &name, &colour, Some(&msg)),
        )
    })
}
