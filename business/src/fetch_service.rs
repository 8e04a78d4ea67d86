use std::{
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

use log::debug;
use serde::de::DeserializeOwned;

use crate::http::{HttpError, HttpRequest, HttpResponse, HttpResult, Method};

pub type OnDone = Box<dyn FnOnce(HttpResult<HttpResponse>) + Send + 'static>;

pub trait FetchService: Send + Sync + Debug {
    fn fetch(&self, request: HttpRequest, on_done: OnDone);
}

/// Issues `request` and decodes a 2xx JSON body into `T`.
pub fn fetch_json<T, F>(fetcher: &dyn FetchService, request: HttpRequest, on_done: F)
where
    T: DeserializeOwned + 'static,
    F: FnOnce(HttpResult<T>) + Send + 'static,
{
    fetcher.fetch(
        request,
        Box::new(move |result| on_done(result.and_then(|response| response.json::<T>()))),
    );
}

/// `ehttp`-backed fetcher.
///
/// The backend keeps the login session in a cookie, so the fetcher remembers
/// the last session cookie it was given and replays it on every request.
#[derive(Debug, Default)]
pub struct EhttpFetcher {
    session_cookie: Arc<Mutex<Option<String>>>,
}

impl EhttpFetcher {
    fn to_ehttp(&self, request: HttpRequest) -> ehttp::Request {
        let mut out = match request.method {
            Method::Get => ehttp::Request::get(&request.url),
            Method::Post => ehttp::Request::post(&request.url, request.body),
        };
        for (key, value) in &request.headers {
            out.headers.insert(key, value);
        }
        let cookie = self
            .session_cookie
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(cookie) = cookie {
            out.headers.insert("Cookie", cookie);
        }
        out
    }
}

impl FetchService for EhttpFetcher {
    fn fetch(&self, request: HttpRequest, on_done: OnDone) {
        debug!("{:?} {}", request.method, request.url);
        let session_cookie = self.session_cookie.clone();
        ehttp::fetch(self.to_ehttp(request), move |result| {
            let result = result.map_err(HttpError::Transport).map(|response| {
                if let Some(set_cookie) = response.headers.get("set-cookie")
                    && let Some(pair) = set_cookie.split(';').next()
                {
                    *session_cookie
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(pair.trim().to_owned());
                }
                HttpResponse {
                    status: response.status,
                    body: response.bytes,
                }
            });
            on_done(result);
        });
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockFetcher;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::{
        fmt::{Debug, Formatter},
        sync::{Mutex, PoisonError},
    };

    use super::{FetchService, OnDone};
    use crate::http::{HttpError, HttpRequest, HttpResponse, Method};

    #[derive(Debug, Clone)]
    struct Route {
        method: Method,
        path: String,
        status: u16,
        body: Vec<u8>,
    }

    /// Answers synchronously from canned routes and records every request.
    ///
    /// Routes match on method and on the URL path ending with the given
    /// suffix; the most recently added matching route wins. Unmatched requests
    /// fail with a transport error.
    ///
    /// Paths passed to [`hold`](Self::hold) are parked instead and answered
    /// later, in any order, with [`release`](Self::release).
    #[derive(Default)]
    pub struct MockFetcher {
        routes: Mutex<Vec<Route>>,
        requests: Mutex<Vec<HttpRequest>>,
        held: Mutex<Vec<String>>,
        parked: Mutex<Vec<(HttpRequest, OnDone)>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
            self.routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Route {
                    method,
                    path: path.to_owned(),
                    status,
                    body: body.to_string().into_bytes(),
                });
        }

        /// Parks requests whose path ends with `path` until released.
        pub fn hold(&self, path: &str) {
            self.held
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(path.to_owned());
        }

        /// Answers the oldest parked request accepted by `matches`.
        ///
        /// Returns `false` if none is parked.
        pub fn release(
            &self,
            matches: impl Fn(&HttpRequest) -> bool,
            status: u16,
            body: serde_json::Value,
        ) -> bool {
            let on_done = {
                let mut parked = self.parked.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(index) = parked.iter().position(|(request, _)| matches(request)) else {
                    return false;
                };
                parked.remove(index).1
            };
            on_done(Ok(HttpResponse {
                status,
                body: body.to_string().into_bytes(),
            }));
            true
        }

        pub fn parked(&self) -> usize {
            self.parked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Requests whose path ends with `path`.
        pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
            self.requests()
                .into_iter()
                .filter(|request| request.path().ends_with(path))
                .collect()
        }
    }

    impl Debug for MockFetcher {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockFetcher")
                .field("routes", &self.routes)
                .field("requests", &self.requests)
                .field("held", &self.held)
                .field("parked", &self.parked())
                .finish()
        }
    }

    impl FetchService for MockFetcher {
        fn fetch(&self, request: HttpRequest, on_done: OnDone) {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            let held = self
                .held
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|path| request.path().ends_with(path));
            if held {
                self.parked
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((request, on_done));
                return;
            }
            let route = self
                .routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .rev()
                .find(|route| {
                    route.method == request.method && request.path().ends_with(&route.path)
                })
                .cloned();
            match route {
                Some(route) => on_done(Ok(HttpResponse {
                    status: route.status,
                    body: route.body,
                })),
                None => on_done(Err(HttpError::Transport(format!(
                    "MockFetcher: no response for {}",
                    request.url
                )))),
            }
        }
    }
}
