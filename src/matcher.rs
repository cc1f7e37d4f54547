//! URI route table
//!
//! The coordinator needs a synchronous `uri -> route` parser for restoration and for
//! URI-driven navigation. [`RouteTable`] builds one from patterns:
//!
//! - `/users` - static segments
//! - `/users/:id` - captured parameter
//! - `/users/:id<\d+>` - constrained parameter (`\d+`, `uuid`, `alpha`, `a|b|c`)
//! - `/search/:query?` - optional trailing parameter
//! - `/files/*path` - wildcard capturing the rest of the path
//!
//! Patterns are tried most specific first: static segments beat parameters, which beat
//! optional parameters, which beat wildcards. Among equal priorities the first
//! registered pattern wins.

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, CachedMatch, ParseCache};
use crate::params::{decode_component, QueryParams, RouteParams};
use crate::route::Route;
use crate::trace_log;
#[cfg(feature = "cache")]
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A parsed route pattern with its matching priority
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
    priority: u8,
}

impl RoutePattern {
    /// Parse a pattern such as `/users/:id<\d+>/posts`
    pub fn parse(pattern: &str) -> Self {
        let segments: Vec<Segment> = split_path(pattern).map(Segment::parse).collect();
        let priority = Self::calculate_priority(&segments);
        Self {
            source: pattern.to_string(),
            segments,
            priority,
        }
    }

    /// Priority rules:
    /// - All static segments: 100
    /// - Each parameter: -10
    /// - Each optional parameter: -15
    /// - Wildcard: 0
    fn calculate_priority(segments: &[Segment]) -> u8 {
        let mut priority: u8 = 100;
        for segment in segments {
            match segment {
                Segment::Static(_) => {}
                Segment::Param { optional: false, .. } => priority = priority.saturating_sub(10),
                Segment::Param { optional: true, .. } => priority = priority.saturating_sub(15),
                Segment::Wildcard(_) => return 0,
            }
        }
        priority
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a URI path (no query string); returns captured, decoded parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = RouteParams::new();
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::Static(expected) => {
                    if parts.get(index) != Some(&expected.as_str()) {
                        return None;
                    }
                    index += 1;
                }
                Segment::Param {
                    name,
                    constraint,
                    optional,
                } => match parts.get(index) {
                    Some(raw) => {
                        let value = decode_component(raw);
                        if constraint.as_ref().is_some_and(|c| !c.validate(&value)) {
                            return None;
                        }
                        params.insert(name.clone(), value);
                        index += 1;
                    }
                    None if *optional => {}
                    None => return None,
                },
                Segment::Wildcard(name) => {
                    if let Some(name) = name {
                        params.insert(name.clone(), parts[index.min(parts.len())..].join("/"));
                    }
                    return Some(params);
                }
            }
        }

        (index == parts.len()).then_some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// A single segment in a route pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Text that must match exactly
    Static(String),
    /// Captured value
    Param {
        name: String,
        constraint: Option<Constraint>,
        optional: bool,
    },
    /// Matches the rest of the path, optionally capturing it
    Wildcard(Option<String>),
}

impl Segment {
    /// Parse a segment
    ///
    /// - `users` -> `Static("users")`
    /// - `:id` -> `Param { name: "id", .. }`
    /// - `:id<\d+>` -> `Param` with [`Constraint::Numeric`]
    /// - `:id?` -> optional `Param`
    /// - `*` / `*rest` -> `Wildcard`
    pub fn parse(segment: &str) -> Self {
        if let Some(rest) = segment.strip_prefix('*') {
            return Segment::Wildcard((!rest.is_empty()).then(|| rest.to_string()));
        }

        let Some(rest) = segment.strip_prefix(':') else {
            return Segment::Static(segment.to_string());
        };
        let (rest, optional) = match rest.strip_suffix('?') {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        match rest.split_once('<') {
            Some((name, constraint)) => Segment::Param {
                name: name.to_string(),
                constraint: Some(Constraint::parse(
                    constraint.strip_suffix('>').unwrap_or(constraint),
                )),
                optional,
            },
            None => Segment::Param {
                name: rest.to_string(),
                constraint: None,
                optional,
            },
        }
    }
}

/// Constraint for validating parameter values
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// ASCII digits only
    Numeric,
    /// 8-4-4-4-12 hex groups
    Uuid,
    /// ASCII letters only
    Alpha,
    /// One of a fixed set of values (`a|b|c`)
    OneOf(Vec<String>),
}

impl Constraint {
    fn parse(source: &str) -> Self {
        match source {
            "\\d+" | "int" => Constraint::Numeric,
            "uuid" => Constraint::Uuid,
            "alpha" => Constraint::Alpha,
            other => Constraint::OneOf(other.split('|').map(str::to_string).collect()),
        }
    }

    pub fn validate(&self, value: &str) -> bool {
        match self {
            Constraint::Numeric => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Constraint::Alpha => !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphabetic()),
            Constraint::Uuid => {
                let groups: Vec<&str> = value.split('-').collect();
                groups.len() == 5
                    && groups
                        .iter()
                        .zip([8, 4, 4, 4, 12])
                        .all(|(group, len)| {
                            group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit())
                        })
            }
            Constraint::OneOf(options) => options.iter().any(|option| option == value),
        }
    }
}

/// A successful URI match, handed to route factories
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The URI as given
    pub uri: String,
    /// Source of the pattern that matched
    pub pattern: String,
    pub params: RouteParams,
    pub query: QueryParams,
}

type RouteFactory = Rc<dyn Fn(&RouteMatch) -> Option<Route>>;

struct TableEntry {
    pattern: RoutePattern,
    factory: RouteFactory,
}

/// Pattern-based synchronous URI parser
///
/// # Example
///
/// ```
/// use stack_navigator::{Route, RouteTable, RouteTarget};
///
/// struct Profile(u64);
///
/// impl RouteTarget for Profile {
///     fn to_uri(&self) -> String {
///         format!("/profile/{}", self.0)
///     }
/// }
///
/// let table = RouteTable::new()
///     .route("/profile/:id<\\d+>", |m| Some(Route::new(Profile(m.params.get_as("id")?))));
///
/// let route = table.parse("/profile/42?tab=posts").unwrap();
/// assert_eq!(route.to_uri(), "/profile/42");
/// assert!(table.parse("/profile/abc").is_none());
/// ```
pub struct RouteTable {
    entries: Vec<TableEntry>,
    #[cfg(feature = "cache")]
    cache: RefCell<ParseCache>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            #[cfg(feature = "cache")]
            cache: RefCell::new(ParseCache::default()),
        }
    }

    /// Register a pattern (builder form)
    pub fn route<F>(mut self, pattern: &str, factory: F) -> Self
    where
        F: Fn(&RouteMatch) -> Option<Route> + 'static,
    {
        self.add(pattern, factory);
        self
    }

    /// Register a pattern
    pub fn add<F>(&mut self, pattern: &str, factory: F)
    where
        F: Fn(&RouteMatch) -> Option<Route> + 'static,
    {
        let pattern = RoutePattern::parse(pattern);
        // Keep entries sorted by priority, stable for equal priorities
        let index = self
            .entries
            .iter()
            .position(|entry| entry.pattern.priority < pattern.priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            index,
            TableEntry {
                pattern,
                factory: Rc::new(factory),
            },
        );
        #[cfg(feature = "cache")]
        self.cache.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Patterns in matching order
    pub fn patterns(&self) -> impl Iterator<Item = &RoutePattern> {
        self.entries.iter().map(|entry| &entry.pattern)
    }

    /// Find the pattern matching `uri`
    pub fn match_uri(&self, uri: &str) -> Option<RouteMatch> {
        self.match_entry(uri).map(|(_, matched)| matched)
    }

    fn match_entry(&self, uri: &str) -> Option<(usize, RouteMatch)> {
        let (path, query) = split_uri(uri);
        let (entry, params) = self.lookup(path)?;
        let matched = RouteMatch {
            uri: uri.to_string(),
            pattern: self.entries[entry].pattern.source.clone(),
            params,
            query: QueryParams::parse(query),
        };
        Some((entry, matched))
    }

    /// Parse `uri` into a fresh route
    pub fn parse(&self, uri: &str) -> Option<Route> {
        let (entry, matched) = self.match_entry(uri)?;
        let route = (self.entries[entry].factory)(&matched);
        if route.is_none() {
            trace_log!("Pattern '{}' declined '{}'", matched.pattern, uri);
        }
        route
    }

    #[cfg(feature = "cache")]
    fn lookup(&self, path: &str) -> Option<(usize, RouteParams)> {
        if let Some(cached) = self.cache.borrow_mut().get(path) {
            return cached.map(|hit| (hit.entry, hit.params));
        }
        let outcome = self.scan(path);
        self.cache.borrow_mut().put(
            path.to_string(),
            outcome.clone().map(|(entry, params)| CachedMatch { entry, params }),
        );
        outcome
    }

    #[cfg(not(feature = "cache"))]
    fn lookup(&self, path: &str) -> Option<(usize, RouteParams)> {
        self.scan(path)
    }

    fn scan(&self, path: &str) -> Option<(usize, RouteParams)> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(index, entry)| entry.pattern.matches(path).map(|params| (index, params)))
    }

    /// Parse cache statistics
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    /// Set the parse cache capacity; zero disables caching
    #[cfg(feature = "cache")]
    pub fn set_cache_capacity(&self, capacity: usize) {
        self.cache.borrow_mut().resize(capacity);
    }

    #[cfg(not(feature = "cache"))]
    pub fn set_cache_capacity(&self, _capacity: usize) {}
}

/// Split off `?query` and drop any `#fragment`
fn split_uri(uri: &str) -> (&str, &str) {
    let uri = uri.split_once('#').map_or(uri, |(before, _)| before);
    uri.split_once('?').unwrap_or((uri, ""))
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.pattern.source))
            .finish()
    }
}
