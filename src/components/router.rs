//! Route to controller resolution.
//!
//! Controllers are not looked up by type name. Each controller is registered
//! under a name together with a factory, and [`ControllerRouter`] picks the
//! factory from the first route segment.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::components::dispatcher::{Dispatcher, Event};
use crate::core::errors::AppResult;

/// Fired by the router after a controller has been built.
pub const CONTROLLER_CREATED_EVENT: &str = "router.controller_created";

/// A request handler selected by the router.
pub trait Controller: Send {
    /// Handles the request. Called exactly once per dispatch.
    fn run(&mut self) -> AppResult<()>;

    fn name(&self) -> &str;
}

/// What a controller factory is told about the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    pub controller: String,
    pub action: String,
    pub params: Vec<String>,
}

pub type ControllerFactory = Arc<dyn Fn(RouteContext) -> Box<dyn Controller> + Send + Sync>;

pub trait Router: Send + Sync {
    fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>);

    fn default_controller(&self) -> String;

    fn default_action(&self) -> String;

    fn add_controller(&self, name: &str, factory: ControllerFactory);

    /// Builds the controller for `route`, or `None` when nothing matches.
    fn create_controller(&self, route: &str, params: &[String]) -> Option<Box<dyn Controller>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "RouterConfig::default_controller")]
    pub default_controller: String,

    #[serde(default = "RouterConfig::default_action")]
    pub default_action: String,
}

impl RouterConfig {
    fn default_controller() -> String {
        "home".to_string()
    }

    fn default_action() -> String {
        "index".to_string()
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_controller: Self::default_controller(),
            default_action: Self::default_action(),
        }
    }
}

/// Default router backed by a controller factory table.
#[derive(Default)]
pub struct ControllerRouter {
    config: RouterConfig,
    controllers: RwLock<HashMap<String, ControllerFactory>>,
    dispatcher: RwLock<Option<Arc<dyn Dispatcher>>>,
}

impl ControllerRouter {
    pub const CLASS: &'static str = "app_kernel::components::ControllerRouter";

    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            controllers: RwLock::new(HashMap::new()),
            dispatcher: RwLock::new(None),
        }
    }

    pub fn has_dispatcher(&self) -> bool {
        self.dispatcher.read().is_some()
    }

    /// Splits `route` into a context, filling in the defaults.
    pub fn resolve(&self, route: &str, params: &[String]) -> RouteContext {
        let mut segments = route.split('/').filter(|s| !s.is_empty());

        let controller = segments
            .next()
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.config.default_controller.clone());
        let action = segments
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_action.clone());

        let mut all_params: Vec<String> = segments.map(str::to_string).collect();
        all_params.extend(params.iter().cloned());

        RouteContext {
            controller,
            action,
            params: all_params,
        }
    }
}

impl Router for ControllerRouter {
    fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) {
        *self.dispatcher.write() = Some(dispatcher);
    }

    fn default_controller(&self) -> String {
        self.config.default_controller.clone()
    }

    fn default_action(&self) -> String {
        self.config.default_action.clone()
    }

    fn add_controller(&self, name: &str, factory: ControllerFactory) {
        self.controllers.write().insert(name.to_lowercase(), factory);
    }

    fn create_controller(&self, route: &str, params: &[String]) -> Option<Box<dyn Controller>> {
        let context = self.resolve(route, params);
        let factory = self.controllers.read().get(&context.controller).cloned()?;

        let event = Event::new(
            CONTROLLER_CREATED_EVENT,
            json!({ "controller": context.controller, "action": context.action }),
        );
        let controller = factory(context);

        let dispatcher = self.dispatcher.read().clone();
        if let Some(dispatcher) = dispatcher {
            dispatcher.fire(&event);
        }
        Some(controller)
    }
}
