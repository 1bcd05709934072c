pub mod bootstrap;
pub mod pagination;
pub mod queries;

pub use crate::domain::model::{EndpointRecord, Query, Session, TamperStatus, UserRecord};
pub use crate::domain::ports::{Pacer, RosterSource, Transport};
pub use crate::utils::error::Result;
