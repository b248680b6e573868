//! In-memory stand-ins for the remote catalog, for tests and offline runs.

mod fake;

pub use fake::{FakeCatalog, FakeCounters, FakeRemote, FakeResource};
