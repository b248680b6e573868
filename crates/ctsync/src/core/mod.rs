pub mod actions;
pub mod batch;
pub mod cache;
pub mod custom_fields;
pub mod error;
pub mod options;
pub mod references;
pub mod service;
pub mod statistics;
pub mod sync;
pub mod validator;
