//! The HTTP server.
//!
//! > **Router** is the the only module that knows anything about HTTP. Every other part of the
//! > system has no knowledge of how the request is really being made. The router's responsibility
//! > is to call into the domain logic, and then render that response data with an appropriate view.

mod country;
mod errors;
mod member;
mod util;

use crate::{
    dal::Dal,
    logic::country::MatchPolicy,
    router::util::{method_override, to_rejection},
    view::content_type,
};
use futures::{
    future::{loop_fn, ok, Loop},
    Future,
};
use log::{info, warn};
use packer::Packer;
use std::{net::SocketAddr, sync::Arc};
use warp::{
    http::{header::CONTENT_TYPE, Response},
    path::Tail,
    Filter,
};

/// Starts an HTTP server at the given address. The polymorphism in the return type indicates that
/// the future will never resolve, since it can be trivially used as
/// `impl Future<Item = Void, Error = Void>`.
pub fn serve_on<T, E>(
    addr: SocketAddr,
    dal: Arc<dyn Dal>,
    policy: MatchPolicy,
) -> impl Future<Item = T, Error = E> {
    loop_fn((), move |()| {
        info!("Starting to serve on {}...", addr);
        let server = statics()
            .or(routes(dal.clone(), policy))
            .with(warp::log("travel_tracker::router"));
        warp::serve(server).bind(addr).then(|r| {
            let status = match r {
                Ok(()) => "success",
                Err(()) => "failure",
            };
            warn!("HTTP server exited with {}; restarting...", status);
            ok(Loop::Continue(()))
        })
    })
}

fn routes(dal: Arc<dyn Dal>, policy: MatchPolicy) -> Resp!() {
    warp::any()
        .map(move || {
            warp::ext::set(dal.clone());
            warp::ext::set(policy);
        })
        .untuple_one()
        .and(route_any! {
            GET () => country::home(),
            GET ("user") => country::user(),
            POST ("add") => country::update(),
            GET ("member") => member::form(),
            POST ("members" / "new") => member::create(),
            DELETE ("members") => member::delete(),
            POST ("members") => method_override("DELETE").and(member::delete()),
        })
        .recover(errors::last_chance)
        .boxed()
}

fn statics() -> Resp!() {
    #[derive(Packer)]
    #[folder = "src/static"]
    struct Assets;

    warp::path("static")
        .and(warp::path::tail())
        .and_then(|tail: Tail| {
            let path = tail.as_str();
            let body = Assets::get(path)
                .or_else(|| Assets::get(&format!("src/static/{}", path)))
                .ok_or_else(warp::reject::not_found)?;
            Response::builder()
                .header(CONTENT_TYPE, content_type(path))
                .body(body)
                .map_err(to_rejection)
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dal::MemoryDB;
    use warp::{
        http::{header::LOCATION, StatusCode},
        test::RequestBuilder,
    };

    fn setup() -> MemoryDB {
        let db = MemoryDB::with_countries(vec![
            ("CA", "Canada"),
            ("JP", "Japan"),
            ("NE", "Niger"),
            ("NG", "Nigeria"),
        ]);
        let _ = db.add_user("Alice".into(), "blue".into()).wait().unwrap();
        db
    }

    fn dal(db: &MemoryDB) -> Arc<dyn Dal> {
        Arc::new(db.clone())
    }

    fn post(path: &str, body: &str) -> RequestBuilder {
        warp::test::request()
            .method("POST")
            .path(path)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("content-length", body.len().to_string())
            .body(body)
    }

    fn location<B>(resp: &Response<B>) -> &str {
        resp.headers()[LOCATION].to_str().unwrap()
    }

    fn text<B: AsRef<[u8]>>(resp: &Response<B>) -> String {
        String::from_utf8_lossy(resp.body().as_ref()).into_owned()
    }

    #[test]
    fn pages() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);

        let resp = warp::test::request().path("/").reply(&filter);
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(text(&resp).contains("Alice"));

        let resp = warp::test::request()
            .path("/user/1?error=Oops")
            .reply(&filter);
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(text(&resp).contains("Oops"));
        assert!(text(&resp).contains(r#"action="/add/1""#));

        let resp = warp::test::request().path("/member").reply(&filter);
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = warp::test::request().path("/user/abc").reply(&filter);
        assert!(resp.status().is_client_error());
    }

    #[test]
    fn country_updates_redirect_to_the_user() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);
        let update = |body: &str| post("/add/1", body).reply(&filter);

        let resp = update("country=Canada&operation=add");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/user/1");
        assert_eq!(db.list_user_visited_country_codes(1).wait().unwrap(), vec!["CA"]);

        let resp = update("country=canada&operation=add");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            location(&resp),
            "/user/1?error=Country+already+in+visited+list"
        );

        let resp = update("country=Atlantis&operation=add");
        assert_eq!(location(&resp), "/user/1?error=Country+does+NOT+exist");

        let resp = update("country=Japan&operation=delete");
        assert_eq!(
            location(&resp),
            "/user/1?error=Country+was+not+in+the+visited+list"
        );

        let resp = update("country=an&operation=add");
        assert_eq!(
            location(&resp),
            "/user/1?error=Country+name+is+ambiguous%3A+Canada%2C+Japan"
        );

        let resp = update("country=CA&operation=delete");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/user/1");
        assert!(db.list_user_visited_country_codes(1).wait().unwrap().is_empty());
    }

    #[test]
    fn match_policy_is_used() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::First);

        let resp = post("/add/1", "country=an&operation=add").reply(&filter);
        assert_eq!(location(&resp), "/user/1");
        assert_eq!(db.list_user_visited_country_codes(1).wait().unwrap(), vec!["CA"]);
    }

    #[test]
    fn empty_country_is_a_no_op() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);
        let writes = db.writes();

        for body in &["country=++&operation=add", "operation=delete"] {
            let resp = post("/add/1", body).reply(&filter);
            assert_eq!(resp.status(), StatusCode::FOUND);
            assert_eq!(location(&resp), "/user/1");
        }
        assert_eq!(db.writes(), writes);
    }

    #[test]
    fn rejected_country_is_shown_inline() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);

        let resp = post("/add/99", "country=Canada&operation=add").reply(&filter);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(text(&resp).contains("Country already exists"));
    }

    #[test]
    fn storage_failures_are_500s() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);
        db.set_offline(true);

        let resp = post("/add/1", "country=Canada&operation=add").reply(&filter);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(&resp).starts_with("Internal Server Error"));

        let resp = warp::test::request().path("/").reply(&filter);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = post("/members/new", "name=Bob&colour=red").reply(&filter);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn adding_members() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);

        let resp = post("/members/new", "name=Bob&color=%23ff0000").reply(&filter);
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/");
        let users = db.list_users().wait().unwrap();
        assert_eq!(users[1].name, "Bob");
        assert_eq!(users[1].colour, "#ff0000");

        let resp = post("/members/new", "name=Bob&colour=green").reply(&filter);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(text(&resp).contains("Key (name)=(Bob) already exists."));

        let resp = post("/members/new", "name=+&colour=green").reply(&filter);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(text(&resp).contains("Enter a name and a colour"));
        assert_eq!(db.list_users().wait().unwrap().len(), 2);
    }

    #[test]
    fn deleting_members() {
        let db = setup();
        let filter = routes(dal(&db), MatchPolicy::Exact);

        let resp = post("/members/1?_method=DELETE", "").reply(&filter);
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/");
        assert!(db.list_users().wait().unwrap().is_empty());

        let resp = warp::test::request()
            .method("DELETE")
            .path("/members/1")
            .reply(&filter);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(text(&resp).contains("no member with the ID 1"));
    }
}
