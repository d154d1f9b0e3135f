//! Collaborator contracts and their default implementations.

pub mod database;
pub mod dispatcher;
pub mod filesystem;
pub mod log;
pub mod mail;
pub mod request;
pub mod router;
pub mod session;

pub use database::{Database, DbConfig, DbDriver, SqlDatabase};
pub use dispatcher::{Dispatcher, Event, EventDispatcher, Listener};
pub use filesystem::{FileSystem, LocalFileSystem};
pub use log::{Level, Log, LogConfig, Logger};
pub use mail::{Address, Mail, MailConfig, Mailer, Message};
pub use request::{HttpRequest, Request, RequestConfig};
pub use router::{Controller, ControllerFactory, ControllerRouter, RouteContext, Router, RouterConfig};
pub use session::{Session, SessionConfig, SessionHandler, SessionStatus, SessionStore};
