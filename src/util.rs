//! Various utilities.

use failure::Fail;
use futures::{future::poll_fn, Async, Future};
use log::error;
use tokio_threadpool::BlockingError;

/// Logs an error, including its causes and backtrace (if possible).
pub fn log_err(err: &dyn Fail) {
    let num_errs = err.iter_chain().count();
    if num_errs <= 1 {
        error!("{}", err);
    } else {
        for (i, cause) in err.iter_chain().enumerate() {
            if i == 0 {
                error!("           {}", cause);
            } else {
                error!("caused by: {}", cause);
            }
        }
    }
    if let Some(bt) = err.backtrace() {
        let bt = bt.to_string();
        if bt != "" {
            error!("{}", bt);
        }
    }
}

/// Runs a blocking function on the current thread pool, as a future. The thread is marked as
/// blocking while the function runs, so the pool can spin up another worker in the meantime.
///
/// This has to be polled from inside a `tokio_threadpool` thread pool (e.g. the default tokio
/// runtime); otherwise, it fails with the `BlockingError`.
pub fn blocking<E, F, T>(func: F) -> impl Future<Item = T, Error = E>
where
    E: From<BlockingError>,
    F: FnOnce() -> Result<T, E>,
{
    let mut func = Some(func);
    poll_fn(move || {
        match tokio_threadpool::blocking(|| func.take().map(|func| func()))? {
            Async::Ready(Some(r)) => r.map(Async::Ready),
            Async::Ready(None) => panic!("blocking future polled after completion"),
            Async::NotReady => Ok(Async::NotReady),
        }
    })
}

/// The type of a responder. Since `impl Trait` can't be used in `type` items, this magics one up.
macro_rules! Resp {
    () => { warp::filters::BoxedFilter<(impl warp::Reply,)> };
}

/// Inserts `.or(...)` between the given filters.
macro_rules! route_any {
    ($hm:ident $hp:tt => $h:expr $(, $tm:ident $tp:tt => $t:expr)* $(,)*) => {
        route_any!(@internal @path $hm $hp).and($h)
            $(.or(route_any!(@internal @path $tm $tp).and($t)))*
    };

    (@internal @path GET ()) => {{ warp::get2() }};
    (@internal @path POST ()) => {{ warp::post2() }};
    (@internal @path DELETE ()) => {{ warp::delete2() }};
    (@internal @path $m:ident $p:tt) => {{
        use warp::path;
        route_any!(@internal @path $m ()).and(path! $p)
    }};
}
