use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use regex::Regex;

use crate::error::Error;
use crate::http::request::{Method, Request};
use crate::http::response::Response;

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// An application callback invoked once a request matches a route.
///
/// Implemented for every `Fn(Request, Response, Vec<String>)` returning a
/// future, so plain handlers and suspending handlers register the same way;
/// invocation normalizes both into one boxed "invoke, possibly suspend"
/// contract.
pub trait Handler: Send + Sync {
    fn invoke(&self, request: Request, response: Response, args: Vec<String>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request, Response, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn invoke(&self, request: Request, response: Response, args: Vec<String>) -> HandlerFuture {
        Box::pin(self(request, response, args))
    }
}

/// One registered (pattern, handler) pair.
///
/// The pattern is compiled fully anchored, so a route matches whole paths
/// only. Immutable from registration until process end.
pub struct Route {
    pattern: Regex,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// Attempts a full match against `path`.
    ///
    /// On success returns the captured groups as positional handler
    /// arguments, an unmatched optional group becoming an empty string.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        self.pattern.captures(path).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|g| g.map_or(String::new(), |m| m.as_str().to_string()))
                .collect()
        })
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Immutable-after-registration table mapping method to its ordered routes.
///
/// Built once at startup, then shared read-only (behind `Arc`) across every
/// connection task. Match priority is registration order: the connection
/// tries a method's routes front to back and stops at the first full match.
pub struct Router {
    table: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Registers `handler` under `pattern` for each of `methods`.
    ///
    /// The pattern is anchored (`^`/`$` added when absent) and compiled once;
    /// relative registration order is preserved per method across calls.
    pub fn add_route<H>(
        &mut self,
        pattern: &str,
        handler: H,
        methods: &[Method],
    ) -> Result<(), Error>
    where
        H: Handler + 'static,
    {
        let anchored = anchor(pattern);
        let compiled = Regex::new(&anchored).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let handler: Arc<dyn Handler> = Arc::new(handler);

        for method in methods {
            self.table.entry(*method).or_default().push(Route {
                pattern: compiled.clone(),
                handler: Arc::clone(&handler),
            });
        }
        Ok(())
    }

    pub fn add_get<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<(), Error> {
        self.add_route(pattern, handler, &[Method::GET])
    }

    pub fn add_post<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<(), Error> {
        self.add_route(pattern, handler, &[Method::POST])
    }

    pub fn add_put<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<(), Error> {
        self.add_route(pattern, handler, &[Method::PUT])
    }

    pub fn add_delete<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<(), Error> {
        self.add_route(pattern, handler, &[Method::DELETE])
    }

    /// The ordered route list for `method`; empty for methods with no routes.
    pub fn method_queue(&self, method: Method) -> &[Route] {
        self.table.get(&method).map_or(&[], Vec::as_slice)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn anchor(pattern: &str) -> String {
    let mut anchored = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(pattern);
    if !pattern.ends_with('$') {
        anchored.push('$');
    }
    anchored
}
