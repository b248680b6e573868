//! Capabilities the synchronization engine needs from any resource kind.

use crate::custom::{CustomFields, CustomFieldsDraft};
use crate::reference::{Reference, ResourceIdentifier};

/// Desired state of one resource, identified by a caller-chosen key.
pub trait Draft: Clone + Send + Sync + 'static {
    fn key(&self) -> Option<&str>;

    /// Human label used in error messages when the key is missing.
    fn display_name(&self) -> String;

    fn custom(&self) -> Option<&CustomFieldsDraft> {
        None
    }

    fn for_each_reference(&self, f: &mut dyn FnMut(&ResourceIdentifier));

    fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut ResourceIdentifier));
}

/// Existing remote state, versioned for optimistic concurrency.
pub trait CurrentResource: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn key(&self) -> Option<&str>;

    fn version(&self) -> u64;

    fn custom(&self) -> Option<&CustomFields> {
        None
    }

    fn for_each_reference(&self, f: &mut dyn FnMut(&Reference));

    fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut Reference));
}
