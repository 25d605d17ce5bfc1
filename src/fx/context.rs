//! Evaluation scope for FX expressions
//!
//! The context is the single object an expression can see. Roots such as
//! `components`, `queries` or `theme` are exposed by name; a bare
//! identifier that is not a root falls through to a widget id, then a
//! query name, then a variable name, then a policy key.

use serde_json::{json, Map, Value};

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Builder metadata exposed as `builder`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuilderMeta {
    pub app_name: String,
    pub current_page: Option<String>,
    pub pages: Vec<String>,
    pub running_queries: Vec<String>,
}

impl BuilderMeta {
    fn to_value(&self) -> Value {
        json!({
            "appName": self.app_name,
            "currentPage": self.current_page,
            "pages": self.pages,
            "runningQueries": self.running_queries,
        })
    }
}

/// Everything a bound expression may read at runtime
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Widget id -> current prop values
    pub components: Map<String, Value>,
    /// Query id or name -> `{data, isFetching}`
    pub queries: Map<String, Value>,
    /// Page or app variables -> `{data, isFetching}`
    pub variables: Map<String, Value>,
    /// Free-form application state
    pub state: Value,
    pub user: Value,
    pub local_storage: Map<String, Value>,
    pub theme: Value,
    /// Location/URL state (`pathname`, `query`, `hash`, ...)
    pub location: Value,
    pub viewport: Viewport,
    pub builder: BuilderMeta,
    /// Access-policy key -> granted flag
    pub policies: Map<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the current props of a widget
    pub fn with_component(mut self, id: impl Into<String>, props: Value) -> Self {
        self.components.insert(id.into(), props);
        self
    }

    /// Register a query result
    pub fn with_query(mut self, name: impl Into<String>, data: Value, is_fetching: bool) -> Self {
        self.queries.insert(
            name.into(),
            json!({ "data": data, "isFetching": is_fetching }),
        );
        self
    }

    /// Register a variable result
    pub fn with_variable(mut self, name: impl Into<String>, data: Value) -> Self {
        self.variables.insert(
            name.into(),
            json!({ "data": data, "isFetching": false }),
        );
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = user;
        self
    }

    pub fn with_local_storage(mut self, key: impl Into<String>, value: Value) -> Self {
        self.local_storage.insert(key.into(), value);
        self
    }

    pub fn with_theme(mut self, theme: Value) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_location(mut self, location: Value) -> Self {
        self.location = location;
        self
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    pub fn with_builder(mut self, builder: BuilderMeta) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_policies(mut self, policies: Map<String, Value>) -> Self {
        self.policies = policies;
        self
    }

    /// Build a context from a JSON document whose top-level keys match
    /// the root names (`components`, `queries`, `state`, ...)
    pub fn from_json(value: &Value) -> Self {
        let object = |key: &str| -> Map<String, Value> {
            value
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        let plain = |key: &str| value.get(key).cloned().unwrap_or(Value::Null);
        let strings = |v: Option<&Value>| -> Vec<String> {
            v.and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|i| i.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };

        let builder = value.get("builder");
        Self {
            components: object("components"),
            queries: object("queries"),
            variables: object("variables"),
            state: plain("state"),
            user: plain("currentUser"),
            local_storage: object("localStorage"),
            theme: plain("theme"),
            location: plain("location"),
            viewport: Viewport {
                width: value
                    .pointer("/viewport/width")
                    .and_then(Value::as_f64)
                    .unwrap_or_default(),
                height: value
                    .pointer("/viewport/height")
                    .and_then(Value::as_f64)
                    .unwrap_or_default(),
            },
            builder: BuilderMeta {
                app_name: builder
                    .and_then(|b| b.get("appName"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                current_page: builder
                    .and_then(|b| b.get("currentPage"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                pages: strings(builder.and_then(|b| b.get("pages"))),
                running_queries: strings(builder.and_then(|b| b.get("runningQueries"))),
            },
            policies: object("policies"),
        }
    }

    fn root(&self, name: &str) -> Option<Root<'_>> {
        let root = match name {
            "components" | "widgets" => Root::Map(&self.components),
            "queries" => Root::Map(&self.queries),
            "variables" => Root::Map(&self.variables),
            "state" | "appState" => Root::Value(&self.state),
            "currentUser" | "user" => Root::Value(&self.user),
            "localStorage" => Root::Map(&self.local_storage),
            "theme" => Root::Value(&self.theme),
            "location" | "url" => Root::Value(&self.location),
            "viewport" => Root::Computed(json!({
                "width": self.viewport.width,
                "height": self.viewport.height,
            })),
            "builder" => Root::Computed(self.builder.to_value()),
            "policies" => Root::Map(&self.policies),
            _ => {
                return self
                    .components
                    .get(name)
                    .or_else(|| self.queries.get(name))
                    .or_else(|| self.variables.get(name))
                    .or_else(|| self.policies.get(name))
                    .map(Root::Value)
            }
        };
        Some(root)
    }

    /// Resolve a root or fall-through identifier
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.lookup_path(name, &[]).map(|(value, _)| value)
    }

    /// Resolve `name` and then the object keys in `path`, cloning only
    /// the value reached.
    ///
    /// The walk stops at the first value that is not an object; the
    /// second element is how many keys were consumed. A missing key
    /// yields null.
    pub fn lookup_path(&self, name: &str, path: &[&str]) -> Option<(Value, usize)> {
        let (leaf, used) = match self.root(name)? {
            Root::Map(map) => match path.split_first() {
                None => return Some((Value::Object(map.clone()), 0)),
                Some((key, rest)) => {
                    let (leaf, used) = walk(map.get(*key).unwrap_or(&NULL), rest);
                    (leaf.clone(), used + 1)
                }
            },
            Root::Value(value) => {
                let (leaf, used) = walk(value, path);
                (leaf.clone(), used)
            }
            Root::Computed(value) => {
                let (leaf, used) = walk(&value, path);
                (leaf.clone(), used)
            }
        };
        Some((leaf, used))
    }
}

static NULL: Value = Value::Null;

/// A root as the context stores it
enum Root<'a> {
    Map(&'a Map<String, Value>),
    Value(&'a Value),
    Computed(Value),
}

fn walk<'v>(mut current: &'v Value, path: &[&str]) -> (&'v Value, usize) {
    for (used, key) in path.iter().enumerate() {
        match current {
            Value::Object(map) => current = map.get(*key).unwrap_or(&NULL),
            _ => return (current, used),
        }
    }
    (current, path.len())
}
