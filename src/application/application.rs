//! The application kernel.
//!
//! [`Application`] is the composition root: it binds every collaborator into
//! its [`Container`] from the configuration, dispatches the current request to
//! a controller and keeps the flash mailbox for the session.

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::flash::{Flash, FlashKind, FLASH_SESSION_KEY};
use crate::components::{
    Controller, ControllerFactory, ControllerRouter, Dispatcher, Event, EventDispatcher,
    FileSystem, HttpRequest, LocalFileSystem, Log, Mail, RouteContext, SessionStore, SqlDatabase,
};
use crate::core::config::{Config, ErrorSettings, MaintenanceConfig};
use crate::core::errors::{AppError, AppResult};
use crate::service::{Container, ProviderRegistry};

pub const APP_INITIALISED_EVENT: &str = "app.initialised";
pub const APP_BEFORE_RUN_EVENT: &str = "app.before_run";
pub const APP_AFTER_RUN_EVENT: &str = "app.after_run";
pub const APP_CONTROLLER_RESOLVED_EVENT: &str = "app.controller_resolved";

const DEFAULT_APP_NAME: &str = "Application";
const DEFAULT_LANGUAGE: &str = "en_US";

/// Renders an error and terminates the process.
pub type ErrorHook = fn(&AppError) -> !;

/// Default [`ErrorHook`]: prints the error to stderr and exits with status 1.
pub fn display_error(error: &AppError) -> ! {
    eprintln!("{}", error);
    std::process::exit(1)
}

/// Configures providers and controllers before the application is built.
pub struct ApplicationBuilder {
    providers: ProviderRegistry,
    controllers: Vec<(String, ControllerFactory)>,
    error_hook: ErrorHook,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            providers: ProviderRegistry::with_defaults(),
            controllers: Vec::new(),
            error_hook: display_error,
        }
    }

    /// Registers alternate providers, selectable through a section's `class`.
    pub fn providers(mut self, register: impl FnOnce(&mut ProviderRegistry)) -> Self {
        register(&mut self.providers);
        self
    }

    pub fn controller<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(RouteContext) -> Box<dyn Controller> + Send + Sync + 'static,
    {
        let factory: ControllerFactory = Arc::new(factory);
        self.controllers.push((name.into(), factory));
        self
    }

    pub fn error_hook(mut self, hook: ErrorHook) -> Self {
        self.error_hook = hook;
        self
    }

    pub fn build(self, config: Config) -> AppResult<Application> {
        let mut app = Application {
            config: Arc::new(Config::default()),
            container: Container::new(),
            providers: self.providers,
            controllers: self.controllers,
            app_name: DEFAULT_APP_NAME.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timezone: String::new(),
            default_controller: String::new(),
            default_action: String::new(),
            controller: None,
            flash: Flash::default(),
            error_settings: ErrorSettings::default(),
            maintenance: MaintenanceConfig::default(),
            error_hook: self.error_hook,
            initialised: false,
        };
        app.init(config)?;
        Ok(app)
    }
}

pub struct Application {
    config: Arc<Config>,
    container: Container,
    providers: ProviderRegistry,
    controllers: Vec<(String, ControllerFactory)>,

    app_name: String,
    default_language: String,
    language: String,
    timezone: String,
    default_controller: String,
    default_action: String,

    controller: Option<Box<dyn Controller>>,
    flash: Flash,

    error_settings: ErrorSettings,
    maintenance: MaintenanceConfig,
    error_hook: ErrorHook,
    initialised: bool,
}

impl Application {
    /// Builds an application with the built-in providers and no controllers.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::builder().build(config)
    }

    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Binds and constructs every service from `config`, replacing any
    /// previous bindings. The first service that fails to build aborts init.
    pub fn init(&mut self, config: Config) -> AppResult<()> {
        self.config = Arc::new(config);
        self.container = Container::new();
        self.controller = None;
        self.initialised = false;

        self.init_defaults()?;
        self.init_mail()?;
        self.init_log()?;
        self.init_database()?;
        self.init_request()?;
        self.init_router()?;
        self.init_session()?;
        self.init_app_name();
        self.init_default_language();

        self.timezone = self.config.app.timezone.clone();
        self.error_settings = self.config.error.clone().unwrap_or_default();
        self.maintenance = self.config.maintenance.clone();
        self.initialised = true;

        info!(
            app = %self.app_name,
            services = ?self.container,
            "application initialised"
        );
        self.fire(APP_INITIALISED_EVENT, json!({ "app": self.app_name }));
        Ok(())
    }

    fn init_defaults(&mut self) -> AppResult<()> {
        self.container.bind_dispatcher(
            EventDispatcher::CLASS,
            Box::new(|_: &Container| Ok(Arc::new(EventDispatcher::new()) as Arc<dyn Dispatcher>)),
        );
        self.container.bind_files(
            LocalFileSystem::CLASS,
            Box::new(|_: &Container| Ok(Arc::new(LocalFileSystem::new()) as Arc<dyn FileSystem>)),
        );
        self.container.dispatcher()?;
        self.container.files()?;
        Ok(())
    }

    fn init_mail(&mut self) -> AppResult<()> {
        let (class, resolver) = self
            .providers
            .mailers()
            .resolver(self.config.mail.as_ref(), Mail::CLASS)?;
        debug!(class = %class, "binding mailer");
        self.container.bind_mailer(class, resolver);
        self.container.mailer()?;
        Ok(())
    }

    fn init_log(&mut self) -> AppResult<()> {
        let (class, resolver) = self
            .providers
            .loggers()
            .resolver(self.config.log.as_ref(), Log::CLASS)?;
        debug!(class = %class, "binding logger");
        self.container.bind_logger(class, resolver);
        self.container.logger()?;
        Ok(())
    }

    fn init_database(&mut self) -> AppResult<()> {
        let Some((key, section)) = self.config.database_section() else {
            debug!("no database configured");
            return Ok(());
        };
        let (class, resolver) = self
            .providers
            .databases()
            .resolver(Some(section), SqlDatabase::CLASS)?;
        debug!(class = %class, section = key, "binding database");
        self.container.bind_database(class, resolver);
        self.container.database()?;
        Ok(())
    }

    fn init_request(&mut self) -> AppResult<()> {
        let (class, resolver) = self
            .providers
            .requests()
            .resolver(self.config.request.as_ref(), HttpRequest::CLASS)?;
        debug!(class = %class, "binding request");
        self.container.bind_request(class, resolver);
        self.container.request()?;
        Ok(())
    }

    fn init_router(&mut self) -> AppResult<()> {
        let (class, resolver) = self
            .providers
            .routers()
            .resolver(self.config.router.as_ref(), ControllerRouter::CLASS)?;
        debug!(class = %class, "binding router");
        self.container.bind_router(class, resolver);

        let router = self.container.router()?;
        router.set_dispatcher(self.container.dispatcher()?);
        for (name, factory) in &self.controllers {
            router.add_controller(name, Arc::clone(factory));
        }

        self.default_controller = router.default_controller();
        self.default_action = router.default_action();
        Ok(())
    }

    fn init_session(&mut self) -> AppResult<()> {
        let (class, resolver) = self
            .providers
            .sessions()
            .resolver(self.config.session.as_ref(), SessionStore::CLASS)?;
        debug!(class = %class, "binding session");
        self.container.bind_session(class, resolver);

        let session = self.container.session()?;
        self.flash = Flash::from_session_value(session.get(FLASH_SESSION_KEY));
        Ok(())
    }

    fn init_app_name(&mut self) {
        self.app_name = self
            .config
            .app
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
    }

    fn init_default_language(&mut self) {
        self.default_language = self
            .config
            .default_language
            .clone()
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        self.language = self.default_language.clone();
    }

    fn fire(&self, name: &str, payload: Value) {
        match self.container.dispatcher() {
            Ok(dispatcher) => {
                dispatcher.fire(&Event::new(name, payload));
            }
            Err(e) => debug!(event = name, error = %e, "event not fired"),
        }
    }

    /// Handles the current request.
    pub fn run(&mut self) -> AppResult<()> {
        self.fire(APP_BEFORE_RUN_EVENT, Value::Null);
        self.process_request()?;
        self.fire(APP_AFTER_RUN_EVENT, Value::Null);
        Ok(())
    }

    /// Resolves the request's route to a controller and runs it once.
    ///
    /// Fails with [`AppError::ControllerNotFound`] when the router has no
    /// controller for the route; the current controller is left untouched.
    pub fn process_request(&mut self) -> AppResult<()> {
        let request = self.container.request()?;
        let router = self.container.router()?;

        let mut route = request.route();
        let mut params = request.params();

        if self.maintenance.enabled {
            let target = self.maintenance.route();
            if route.trim_matches('/') != target {
                info!(requested = %route, "maintenance mode, rerouting");
                route = target;
                params = Vec::new();
            }
        }

        let Some(controller) = router.create_controller(&route, &params) else {
            warn!(route = %route, "no controller for route");
            return Err(AppError::ControllerNotFound { route });
        };

        self.fire(
            APP_CONTROLLER_RESOLVED_EVENT,
            json!({ "controller": controller.name(), "route": route }),
        );
        self.controller.insert(controller).run()
    }

    pub fn create_url(
        &self,
        route: &str,
        params: Option<&[String]>,
        absolute: bool,
    ) -> AppResult<String> {
        let request = self.container.request()?;
        Ok(request.create_url(route, params.unwrap_or(&[]), absolute))
    }

    /// Appends to the in-memory mailbox. The session is only written by
    /// [`clean_flash`](Self::clean_flash) and [`save_flash`](Self::save_flash).
    pub fn add_flash(&mut self, message: impl Into<String>, kind: impl Into<FlashKind>) {
        self.flash.push(message, kind.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.flash.errors
    }

    pub fn messages(&self) -> &[String] {
        &self.flash.success
    }

    pub fn flash(&self) -> &Flash {
        &self.flash
    }

    pub fn set_flash(&mut self, flash: Flash) {
        self.flash = flash;
    }

    /// Empties the mailbox and writes it back to the session.
    pub fn clean_flash(&mut self) -> AppResult<()> {
        self.flash.clear();
        self.save_flash()
    }

    /// Writes the mailbox to the session as it stands.
    pub fn save_flash(&self) -> AppResult<()> {
        self.container
            .session()?
            .add(FLASH_SESSION_KEY, self.flash.to_value())
    }

    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.error_hook = hook;
    }

    /// Runs the request and hands any error to the error hook.
    pub fn run_or_display(&mut self) {
        if let Err(e) = self.run() {
            if self.error_settings.debug {
                error!(error = ?e, "request failed");
            } else {
                error!(error = %e, "request failed");
            }
            (self.error_hook)(&e)
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn controller(&self) -> Option<&dyn Controller> {
        self.controller.as_deref()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn default_controller(&self) -> &str {
        &self.default_controller
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    pub fn is_ready(&self) -> bool {
        self.initialised
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("app_name", &self.app_name)
            .field("services", &self.container)
            .field("controller", &self.controller.as_ref().map(|c| c.name().to_string()))
            .field("flash", &self.flash)
            .field("initialised", &self.initialised)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Level, Logger};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    struct Noop {
        name: String,
        runs: Arc<Mutex<usize>>,
    }

    impl Controller for Noop {
        fn run(&mut self) -> AppResult<()> {
            *self.runs.lock() += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct Silent;

    impl Logger for Silent {
        fn log(&self, _level: Level, _message: &str) {}

        fn enabled(&self, _level: Level) -> bool {
            false
        }
    }

    fn config(value: Value) -> Config {
        Config::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_without_config() {
        let app = Application::new(Config::default()).unwrap();

        assert!(app.is_ready());
        assert_eq!(app.app_name(), "Application");
        assert_eq!(app.default_language(), "en_US");
        assert_eq!(app.language(), "en_US");
        assert_eq!(app.timezone(), "Australia/Melbourne");
        assert_eq!(app.default_controller(), "home");
        assert_eq!(app.default_action(), "index");
        assert!(app.flash().is_empty());
        assert!(!app.container().is_bound("db"));
    }

    #[test]
    fn test_every_default_service_is_bound() {
        let app = Application::new(Config::default()).unwrap();
        for key in ["dispatcher", "files", "mail", "log", "request", "router", "session"] {
            assert!(app.container().is_bound(key), "{} not bound", key);
        }
        assert_eq!(app.container().class_of("log"), Some(Log::CLASS));
    }

    #[test]
    fn test_class_override_through_registry() {
        let app = Application::builder()
            .providers(|registry| {
                registry.register_logger("silent", |_, _| Ok(Arc::new(Silent) as Arc<dyn Logger>));
            })
            .build(config(json!({ "log": { "class": "silent" } })))
            .unwrap();

        assert_eq!(app.container().class_of("logger"), Some("silent"));
        assert!(!app.container().logger().unwrap().enabled(Level::Critical));
    }

    #[test]
    fn test_unknown_class_fails_init() {
        let result = Application::new(config(json!({ "mail": { "class": "nope.Mailer" } })));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_process_request_runs_controller_once() {
        let runs = Arc::new(Mutex::new(0));
        let counter = runs.clone();

        let mut app = Application::builder()
            .controller("blog", move |ctx: RouteContext| {
                Box::new(Noop {
                    name: ctx.controller,
                    runs: counter.clone(),
                }) as Box<dyn Controller>
            })
            .build(config(json!({ "request": { "route": "blog/show" } })))
            .unwrap();

        app.run().unwrap();
        assert_eq!(*runs.lock(), 1);
        assert_eq!(app.controller().map(|c| c.name()), Some("blog"));
    }

    #[test]
    fn test_missing_controller_is_not_found() {
        let mut app =
            Application::new(config(json!({ "request": { "route": "missing/index" } }))).unwrap();

        let err = app.process_request().unwrap_err();
        assert!(matches!(err, AppError::ControllerNotFound { ref route } if route == "missing/index"));
        assert!(app.controller().is_none());
    }

    #[test]
    fn test_lifecycle_events_fire() {
        let mut app = Application::builder()
            .controller("home", |ctx: RouteContext| {
                Box::new(Noop {
                    name: ctx.controller,
                    runs: Arc::new(Mutex::new(0)),
                }) as Box<dyn Controller>
            })
            .build(Config::default())
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = app.container().dispatcher().unwrap();
        for name in [
            APP_BEFORE_RUN_EVENT,
            APP_CONTROLLER_RESOLVED_EVENT,
            APP_AFTER_RUN_EVENT,
        ] {
            let seen = seen.clone();
            dispatcher.listen(
                name,
                Arc::new(move |event: &Event| seen.lock().push(event.name.clone())),
            );
        }

        app.run().unwrap();
        assert_eq!(
            *seen.lock(),
            vec![
                APP_BEFORE_RUN_EVENT.to_string(),
                APP_CONTROLLER_RESOLVED_EVENT.to_string(),
                APP_AFTER_RUN_EVENT.to_string(),
            ]
        );
    }

    #[test]
    fn test_flash_persistence_is_explicit() {
        let mut app = Application::new(Config::default()).unwrap();
        let session = app.container().session().unwrap();

        app.add_flash("saved", FlashKind::Success);
        assert!(session.get(FLASH_SESSION_KEY).is_none());

        app.save_flash().unwrap();
        assert_eq!(
            session.get(FLASH_SESSION_KEY),
            Some(json!({ "errors": [], "success": ["saved"] }))
        );
        assert_eq!(app.messages(), ["saved".to_string()]);
    }
}
