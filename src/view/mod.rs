//! Rendering to templates.
//!
//! > View is the only module that knows anything about HTML, or JSON, or other "renderings" of the
//! > response. I'm happy to call this "view" in common with traditional stateless MVC, because
//! > it's role is largely the same.

use crate::{logic::Listing, schema::User};
use failure::{Error, Fallible, SyncFailure};
use packer::Packer;
use serde::Serialize;
use serde_json::{json, Value};
use tera::Tera;
use warp::{
    http::{header::CONTENT_TYPE, Response, StatusCode},
    reject::custom,
    Rejection,
};

lazy_static::lazy_static! {
    static ref TERA: Tera = {
        #[derive(Packer)]
        #[folder = "src/view/templates"]
        struct Templates;

        // Templates are referred to by their file name alone.
        let templates = Templates::list()
            .filter_map(|path| {
                let name = path.rsplit('/').next().unwrap_or(path);
                Templates::get_str(path).map(|body| (name, body))
            })
            .collect::<Vec<_>>();

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .expect("the built-in templates are invalid");
        tera.build_inheritance_chains()
            .expect("the built-in templates are invalid");
        tera
    };
}

/// The colour the add member form starts out with.
pub const DEFAULT_COLOUR: &str = "#1e90ff";

/// Renders a template as HTML to a String.
pub fn render<T: Serialize>(name: &str, data: T) -> Fallible<String> {
    TERA.render(name, &data)
        .map_err(|err| SyncFailure::new(err).into())
}

/// Renders a template as HTML to a `warp::Reply`.
pub fn render_html<T: Serialize>(name: &str, data: T) -> Result<Response<String>, Rejection> {
    render_html_with_status(StatusCode::OK, name, data)
}

/// Renders a template as HTML to a `warp::Reply` with the given status code.
pub fn render_html_with_status<T: Serialize>(
    status: StatusCode,
    name: &str,
    data: T,
) -> Result<Response<String>, Rejection> {
    render(name, data)
        .and_then(|body| {
            Response::builder()
                .status(status)
                .header(CONTENT_TYPE, "text/html; charset=utf-8")
                .body(body)
                .map_err(Error::from)
        })
        .map_err(|err| custom(err.compat()))
}

/// The context for `index.html`.
pub fn listing_context(listing: &Listing, error: Option<&str>) -> Value {
    json!({
        "users": listing.users,
        "countries": listing.countries,
        "total": listing.countries.len(),
        "selected": listing.selected,
        "selected_id": listing.selected_id,
        "error": error,
    })
}

/// The context for `member.html`.
pub fn member_context(users: &[User], name: &str, colour: &str, error: Option<&str>) -> Value {
    json!({
        "users": users,
        "name": name,
        "colour": if colour.is_empty() { DEFAULT_COLOUR } else { colour },
        "error": error,
    })
}

/// Guesses the `Content-Type` of a static file from its extension.
pub fn content_type(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
