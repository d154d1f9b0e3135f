//! Provider registry: the table consulted when a configuration section names
//! an alternate implementation through its `class` key.

use std::collections::HashMap;
use std::sync::Arc;

use crate::components::{
    ControllerRouter, Database, DbConfig, HttpRequest, Log, LogConfig, Logger, Mail, MailConfig,
    Mailer, Request, RequestConfig, Router, RouterConfig, Session, SessionConfig, SessionStore,
    SqlDatabase,
};
use crate::core::config::ServiceSection;
use crate::core::errors::{AppError, AppResult};
use crate::service::container::{Capability, Container, Resolver};

/// Builds a service from its configuration section.
pub type Provider<T> = Arc<dyn Fn(&ServiceSection, &Container) -> AppResult<Arc<T>> + Send + Sync>;

/// Providers for one capability, keyed by class name.
pub struct ProviderTable<T: ?Sized> {
    capability: Capability,
    providers: HashMap<String, Provider<T>>,
}

impl<T: ?Sized + 'static> ProviderTable<T> {
    fn new(capability: Capability) -> Self {
        Self {
            capability,
            providers: HashMap::new(),
        }
    }

    pub fn register(&mut self, class: impl Into<String>, provider: Provider<T>) {
        self.providers.insert(class.into(), provider);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.providers.contains_key(class)
    }

    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }

    /// Picks the provider for `section`: its `class` when set, otherwise
    /// `default_class`.
    pub fn select(
        &self,
        section: Option<&ServiceSection>,
        default_class: &str,
    ) -> AppResult<(String, Provider<T>)> {
        let class = section
            .and_then(|s| s.class.as_deref())
            .unwrap_or(default_class);

        let provider = self.providers.get(class).cloned().ok_or_else(|| {
            AppError::Config(format!(
                "no {} provider registered as '{}'",
                self.capability, class
            ))
        })?;
        Ok((class.to_string(), provider))
    }

    /// Turns the selected provider into a container resolver bound to a copy
    /// of the section. An absent section resolves with empty settings.
    pub fn resolver(
        &self,
        section: Option<&ServiceSection>,
        default_class: &str,
    ) -> AppResult<(String, Resolver<T>)> {
        let (class, provider) = self.select(section, default_class)?;
        let section = section.cloned().unwrap_or_default();
        let resolver: Resolver<T> =
            Box::new(move |container: &Container| provider(&section, container));
        Ok((class, resolver))
    }
}

/// Class-name to constructor tables for every configurable capability.
pub struct ProviderRegistry {
    mailers: ProviderTable<dyn Mailer>,
    loggers: ProviderTable<dyn Logger>,
    databases: ProviderTable<dyn Database>,
    requests: ProviderTable<dyn Request>,
    routers: ProviderTable<dyn Router>,
    sessions: ProviderTable<dyn Session>,
}

impl ProviderRegistry {
    /// A registry with no providers at all.
    pub fn empty() -> Self {
        Self {
            mailers: ProviderTable::new(Capability::Mailer),
            loggers: ProviderTable::new(Capability::Logger),
            databases: ProviderTable::new(Capability::Database),
            requests: ProviderTable::new(Capability::Request),
            routers: ProviderTable::new(Capability::Router),
            sessions: ProviderTable::new(Capability::Session),
        }
    }

    /// A registry holding the built-in implementations.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        registry.register_mailer(Mail::CLASS, |section, _| {
            let config: MailConfig = section.parse()?;
            Ok(Arc::new(Mail::new(config)) as Arc<dyn Mailer>)
        });
        registry.register_logger(Log::CLASS, |section, _| {
            let config: LogConfig = section.parse()?;
            Ok(Arc::new(Log::new(config)) as Arc<dyn Logger>)
        });
        registry.register_database(SqlDatabase::CLASS, |section, _| {
            let config: DbConfig = section.parse()?;
            Ok(Arc::new(SqlDatabase::new(config)) as Arc<dyn Database>)
        });
        registry.register_request(HttpRequest::CLASS, |section, _| {
            let config: RequestConfig = section.parse()?;
            Ok(Arc::new(HttpRequest::new(config)) as Arc<dyn Request>)
        });
        registry.register_router(ControllerRouter::CLASS, |section, _| {
            let config: RouterConfig = section.parse()?;
            Ok(Arc::new(ControllerRouter::new(config)) as Arc<dyn Router>)
        });
        registry.register_session(SessionStore::CLASS, |section, container| {
            let config: SessionConfig = section.parse()?;
            let session = SessionStore::open(&config, container.files()?)?;
            Ok(Arc::new(session) as Arc<dyn Session>)
        });

        registry
    }

    pub fn register_mailer<F>(&mut self, class: impl Into<String>, provider: F)
    where
        F: Fn(&ServiceSection, &Container) -> AppResult<Arc<dyn Mailer>> + Send + Sync + 'static,
    {
        self.mailers.register(class, Arc::new(provider));
    }

    pub fn register_logger<F>(&mut self, class: impl Into<String>, provider: F)
    where
        F: Fn(&ServiceSection, &Container) -> AppResult<Arc<dyn Logger>> + Send + Sync + 'static,
    {
        self.loggers.register(class, Arc::new(provider));
    }

    pub fn register_database<F>(&mut self, class: impl Into<String>, provider: F)
    where
        F: Fn(&ServiceSection, &Container) -> AppResult<Arc<dyn Database>> + Send + Sync + 'static,
    {
        self.databases.register(class, Arc::new(provider));
    }

    pub fn register_request<F>(&mut self, class: impl Into<String>, provider: F)
    where
        F: Fn(&ServiceSection, &Container) -> AppResult<Arc<dyn Request>> + Send + Sync + 'static,
    {
        self.requests.register(class, Arc::new(provider));
    }

    pub fn register_router<F>(&mut self, class: impl Into<String>, provider: F)
    where
        F: Fn(&ServiceSection, &Container) -> AppResult<Arc<dyn Router>> + Send + Sync + 'static,
    {
        self.routers.register(class, Arc::new(provider));
    }

    pub fn register_session<F>(&mut self, class: impl Into<String>, provider: F)
    where
        F: Fn(&ServiceSection, &Container) -> AppResult<Arc<dyn Session>> + Send + Sync + 'static,
    {
        self.sessions.register(class, Arc::new(provider));
    }

    pub fn mailers(&self) -> &ProviderTable<dyn Mailer> {
        &self.mailers
    }

    pub fn loggers(&self) -> &ProviderTable<dyn Logger> {
        &self.loggers
    }

    pub fn databases(&self) -> &ProviderTable<dyn Database> {
        &self.databases
    }

    pub fn requests(&self) -> &ProviderTable<dyn Request> {
        &self.requests
    }

    pub fn routers(&self) -> &ProviderTable<dyn Router> {
        &self.routers
    }

    pub fn sessions(&self) -> &ProviderTable<dyn Session> {
        &self.sessions
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
