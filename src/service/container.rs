//! Typed service container.
//!
//! Every capability has its own slot and accessor, so lookups return the
//! capability's trait object rather than an untyped value. Bindings are
//! constructed on first access and shared afterwards.

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

use crate::components::{
    Database, Dispatcher, FileSystem, Logger, Mailer, Request, Router, Session,
};
use crate::core::errors::{AppError, AppResult};

/// Services the kernel knows how to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Dispatcher,
    FileSystem,
    Mailer,
    Logger,
    Database,
    Request,
    Router,
    Session,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Dispatcher,
        Capability::FileSystem,
        Capability::Mailer,
        Capability::Logger,
        Capability::Database,
        Capability::Request,
        Capability::Router,
        Capability::Session,
    ];

    /// Abstract identifier of the capability.
    pub fn identifier(&self) -> &'static str {
        match self {
            Capability::Dispatcher => "dispatcher",
            Capability::FileSystem => "filesystem",
            Capability::Mailer => "mailer",
            Capability::Logger => "logger",
            Capability::Database => "database",
            Capability::Request => "request",
            Capability::Router => "router",
            Capability::Session => "session",
        }
    }

    /// Short alias accepted wherever the identifier is.
    pub fn alias(&self) -> &'static str {
        match self {
            Capability::Dispatcher => "dispatcher",
            Capability::FileSystem => "files",
            Capability::Mailer => "mail",
            Capability::Logger => "log",
            Capability::Database => "db",
            Capability::Request => "request",
            Capability::Router => "router",
            Capability::Session => "session",
        }
    }

    /// Looks a capability up by identifier or alias.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.identifier() == key || cap.alias() == key)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

pub type Resolver<T> = Box<dyn Fn(&Container) -> AppResult<Arc<T>> + Send + Sync>;

struct Binding<T: ?Sized> {
    capability: Capability,
    class: String,
    resolver: Resolver<T>,
    instance: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Binding<T> {
    fn new(capability: Capability, class: String, resolver: Resolver<T>) -> Self {
        Self {
            capability,
            class,
            resolver,
            instance: OnceCell::new(),
        }
    }

    fn resolve(&self, container: &Container) -> AppResult<Arc<T>> {
        self.instance
            .get_or_try_init(|| {
                tracing::debug!(service = %self.capability, class = %self.class, "constructing service");
                (self.resolver)(container)
            })
            .map(Arc::clone)
    }
}

trait BindingInfo {
    fn class(&self) -> &str;
    fn is_resolved(&self) -> bool;
}

impl<T: ?Sized> BindingInfo for Binding<T> {
    fn class(&self) -> &str {
        &self.class
    }

    fn is_resolved(&self) -> bool {
        self.instance.get().is_some()
    }
}

fn required<'a, T: ?Sized>(
    slot: &'a Option<Binding<T>>,
    capability: Capability,
) -> AppResult<&'a Binding<T>> {
    slot.as_ref()
        .ok_or_else(|| AppError::ServiceNotBound(capability.identifier().to_string()))
}

/// Singleton-per-application service registry.
#[derive(Default)]
pub struct Container {
    dispatcher: Option<Binding<dyn Dispatcher>>,
    files: Option<Binding<dyn FileSystem>>,
    mailer: Option<Binding<dyn Mailer>>,
    logger: Option<Binding<dyn Logger>>,
    database: Option<Binding<dyn Database>>,
    request: Option<Binding<dyn Request>>,
    router: Option<Binding<dyn Router>>,
    session: Option<Binding<dyn Session>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_dispatcher(&mut self, class: impl Into<String>, resolver: Resolver<dyn Dispatcher>) {
        self.dispatcher = Some(Binding::new(Capability::Dispatcher, class.into(), resolver));
    }

    pub fn bind_files(&mut self, class: impl Into<String>, resolver: Resolver<dyn FileSystem>) {
        self.files = Some(Binding::new(Capability::FileSystem, class.into(), resolver));
    }

    pub fn bind_mailer(&mut self, class: impl Into<String>, resolver: Resolver<dyn Mailer>) {
        self.mailer = Some(Binding::new(Capability::Mailer, class.into(), resolver));
    }

    pub fn bind_logger(&mut self, class: impl Into<String>, resolver: Resolver<dyn Logger>) {
        self.logger = Some(Binding::new(Capability::Logger, class.into(), resolver));
    }

    pub fn bind_database(&mut self, class: impl Into<String>, resolver: Resolver<dyn Database>) {
        self.database = Some(Binding::new(Capability::Database, class.into(), resolver));
    }

    pub fn bind_request(&mut self, class: impl Into<String>, resolver: Resolver<dyn Request>) {
        self.request = Some(Binding::new(Capability::Request, class.into(), resolver));
    }

    pub fn bind_router(&mut self, class: impl Into<String>, resolver: Resolver<dyn Router>) {
        self.router = Some(Binding::new(Capability::Router, class.into(), resolver));
    }

    pub fn bind_session(&mut self, class: impl Into<String>, resolver: Resolver<dyn Session>) {
        self.session = Some(Binding::new(Capability::Session, class.into(), resolver));
    }

    pub fn dispatcher(&self) -> AppResult<Arc<dyn Dispatcher>> {
        required(&self.dispatcher, Capability::Dispatcher)?.resolve(self)
    }

    pub fn files(&self) -> AppResult<Arc<dyn FileSystem>> {
        required(&self.files, Capability::FileSystem)?.resolve(self)
    }

    pub fn mailer(&self) -> AppResult<Arc<dyn Mailer>> {
        required(&self.mailer, Capability::Mailer)?.resolve(self)
    }

    pub fn logger(&self) -> AppResult<Arc<dyn Logger>> {
        required(&self.logger, Capability::Logger)?.resolve(self)
    }

    /// The database is optional; `Ok(None)` means none was configured.
    pub fn database(&self) -> AppResult<Option<Arc<dyn Database>>> {
        match &self.database {
            Some(binding) => binding.resolve(self).map(Some),
            None => Ok(None),
        }
    }

    pub fn request(&self) -> AppResult<Arc<dyn Request>> {
        required(&self.request, Capability::Request)?.resolve(self)
    }

    pub fn router(&self) -> AppResult<Arc<dyn Router>> {
        required(&self.router, Capability::Router)?.resolve(self)
    }

    pub fn session(&self) -> AppResult<Arc<dyn Session>> {
        required(&self.session, Capability::Session)?.resolve(self)
    }

    fn info(&self, capability: Capability) -> Option<&dyn BindingInfo> {
        match capability {
            Capability::Dispatcher => self.dispatcher.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::FileSystem => self.files.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::Mailer => self.mailer.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::Logger => self.logger.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::Database => self.database.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::Request => self.request.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::Router => self.router.as_ref().map(|b| b as &dyn BindingInfo),
            Capability::Session => self.session.as_ref().map(|b| b as &dyn BindingInfo),
        }
    }

    /// Whether `key` (identifier or alias) has a binding.
    pub fn is_bound(&self, key: &str) -> bool {
        Capability::parse(key)
            .and_then(|cap| self.info(cap))
            .is_some()
    }

    /// Provider class bound under `key` (identifier or alias).
    pub fn class_of(&self, key: &str) -> Option<&str> {
        Capability::parse(key)
            .and_then(|cap| self.info(cap))
            .map(|info| info.class())
    }

    /// Whether the service under `key` has been constructed yet.
    pub fn is_resolved(&self, key: &str) -> bool {
        Capability::parse(key)
            .and_then(|cap| self.info(cap))
            .map(|info| info.is_resolved())
            .unwrap_or(false)
    }

    pub fn bound(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.info(*cap).is_some())
            .collect()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for cap in Capability::ALL {
            if let Some(info) = self.info(cap) {
                map.entry(&cap.identifier(), &info.class());
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{EventDispatcher, Log, LogConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    #[test_case("logger", Capability::Logger)]
    #[test_case("log", Capability::Logger)]
    #[test_case("db", Capability::Database)]
    #[test_case("database", Capability::Database)]
    #[test_case("files", Capability::FileSystem)]
    #[test_case("mail", Capability::Mailer)]
    #[test_case("router", Capability::Router)]
    fn test_parse_identifier_or_alias(key: &str, expected: Capability) {
        assert_eq!(Capability::parse(key), Some(expected));
    }

    #[test]
    fn test_parse_unknown_key() {
        assert_eq!(Capability::parse("cache"), None);
    }

    #[test]
    fn test_singleton_constructed_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let mut container = Container::new();
        container.bind_logger(
            Log::CLASS,
            Box::new(move |_: &Container| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Log::new(LogConfig::default())) as Arc<dyn Logger>)
            }),
        );

        assert!(!container.is_resolved("log"));
        let first = container.logger().unwrap();
        let second = container.logger().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(container.is_resolved("logger"));
    }

    #[test]
    fn test_failed_construction_is_retried_on_next_access() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let mut container = Container::new();
        container.bind_dispatcher(
            "flaky",
            Box::new(move |_: &Container| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::Config("first attempt".to_string()))
                } else {
                    Ok(Arc::new(EventDispatcher::new()) as Arc<dyn Dispatcher>)
                }
            }),
        );

        assert!(container.dispatcher().is_err());
        assert!(container.dispatcher().is_ok());
    }

    #[test]
    fn test_unbound_service() {
        let container = Container::new();
        assert!(matches!(
            container.router(),
            Err(AppError::ServiceNotBound(name)) if name == "router"
        ));
        assert!(container.database().unwrap().is_none());
        assert!(!container.is_bound("db"));
        assert!(container.bound().is_empty());
    }

    #[test]
    fn test_class_lookup_by_alias() {
        let mut container = Container::new();
        container.bind_dispatcher(
            EventDispatcher::CLASS,
            Box::new(|_: &Container| Ok(Arc::new(EventDispatcher::new()) as Arc<dyn Dispatcher>)),
        );

        assert_eq!(container.class_of("dispatcher"), Some(EventDispatcher::CLASS));
        assert_eq!(container.class_of("session"), None);
        assert_eq!(container.bound(), vec![Capability::Dispatcher]);
    }
}
