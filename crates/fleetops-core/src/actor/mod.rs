//! Actor implementations

pub mod reporter;

pub use reporter::{ReporterActor, ReporterArgs};
