use crate::handler::BoundHandler;
use crate::middleware::Phase;
use crate::route::PhaseLists;
use crate::transport::TransportOptions;
use http::Method;
use serde::Serialize;

/// A route as the transport gets it: url, methods, bound handler and the resolved
/// callables of every phase. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    url: String,
    methods: Vec<Method>,
    name: Option<String>,
    handler: BoundHandler,
    middlewares: PhaseLists,
    options: TransportOptions,
}

impl CompiledRoute {
    pub(crate) fn new(
        url: String,
        methods: Vec<Method>,
        name: Option<String>,
        handler: BoundHandler,
        middlewares: PhaseLists,
        options: TransportOptions,
    ) -> Self {
        Self { url, methods, name, handler, middlewares, options }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn handler(&self) -> &BoundHandler {
        &self.handler
    }

    pub fn middlewares(&self) -> &PhaseLists {
        &self.middlewares
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// A serializable view of the route, with callable owners in place of the callables
    pub fn describe(&self) -> RouteDescriptor {
        let owners = |phase: Phase| -> Vec<String> { self.middlewares.owners(phase).into_iter().map(String::from).collect() };
        RouteDescriptor {
            url: self.url.clone(),
            methods: self.methods.iter().map(ToString::to_string).collect(),
            name: self.name.clone(),
            handler: self.handler.owner().to_string(),
            middlewares: MiddlewareDescriptor {
                validators: owners(Phase::Validate),
                handlers: owners(Phase::Handle),
                interceptors: owners(Phase::Intercept),
                terminators: owners(Phase::Terminate),
            },
            options: self.options.clone(),
        }
    }
}

/// Route listing entry, see [`CompiledRoute::describe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDescriptor {
    pub url: String,
    pub methods: Vec<String>,
    pub name: Option<String>,
    pub handler: String,
    pub middlewares: MiddlewareDescriptor,
    pub options: TransportOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MiddlewareDescriptor {
    pub validators: Vec<String>,
    pub handlers: Vec<String>,
    pub interceptors: Vec<String>,
    pub terminators: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::CompiledRoute;
    use crate::handler::handler_fn;
    use crate::middleware::terminate_fn;
    use crate::payload::Payload;
    use crate::route::PhaseLists;
    use crate::transport::TransportOptions;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_describe() {
        let mut lists = PhaseLists::default();
        let terminator = terminate_fn(|_ctx| Box::pin(async { Ok(()) }));
        let terminator_owner = terminator.owner().to_string();
        lists.insert(terminator, None);

        let mut options = TransportOptions::default();
        options.insert("helmet", true);

        let handler = handler_fn(|_ctx| Box::pin(async { Ok(Payload::Empty) }));
        let route = CompiledRoute::new(
            "/health".into(),
            vec![Method::GET, Method::HEAD],
            Some("health".into()),
            handler,
            lists,
            options,
        );

        let descriptor = route.describe();
        assert_eq!(descriptor.methods, vec!["GET", "HEAD"]);
        assert_eq!(descriptor.middlewares.terminators, vec![terminator_owner]);
        assert!(descriptor.middlewares.handlers.is_empty());

        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["url"], json!("/health"));
        assert_eq!(value["name"], json!("health"));
        assert_eq!(value["options"], json!({"helmet": true}));
    }
}
