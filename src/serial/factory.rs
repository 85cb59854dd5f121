//! Prototype registry and object factory.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::serializable::Serializable;

/// Maps every token of a registered hierarchy to its prototype, so a stream
/// naming any ancestor of a known type still resolves to an instance.
#[derive(Default)]
pub struct ObjectFactory {
    prototypes: BTreeMap<String, Arc<dyn Serializable>>,
}

impl ObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the prototype under each token of its hierarchy. Later
    /// registrations win on shared base names.
    pub fn register(&mut self, prototype: Box<dyn Serializable>) {
        let hierarchy = prototype.hierarchy().replace("::", ".");
        if hierarchy.is_empty() {
            tracing::warn!("refusing to register a prototype with an empty hierarchy");
            return;
        }

        tracing::debug!(hierarchy = %hierarchy, "registering prototype");
        let prototype: Arc<dyn Serializable> = Arc::from(prototype);
        for token in hierarchy.split(',') {
            let token = token.trim();
            if !token.is_empty() {
                self.prototypes.insert(token.to_string(), Arc::clone(&prototype));
            }
        }
    }

    /// Walks the hierarchy most-specific-first and instantiates the first
    /// known token. An entirely unknown hierarchy yields `None`.
    pub fn create(&self, hierarchy: &str) -> Option<Box<dyn Serializable>> {
        for token in hierarchy.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if let Some(prototype) = self.prototypes.get(token) {
                return Some(prototype.new_instance());
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::archive::{ArchiveError, ReadArchive, WriteArchive};
    use std::any::Any;

    struct Fruit {
        hierarchy: &'static str,
    }

    impl Serializable for Fruit {
        fn hierarchy(&self) -> String {
            self.hierarchy.to_string()
        }

        fn new_instance(&self) -> Box<dyn Serializable> {
            Box::new(Fruit {
                hierarchy: self.hierarchy,
            })
        }

        fn write_to(&self, _archive: &mut WriteArchive) -> Result<(), ArchiveError> {
            Ok(())
        }

        fn read_from(&mut self, _archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_message(
            self: Box<Self>,
        ) -> Result<Box<dyn crate::net::Message>, Box<dyn Serializable>> {
            Err(self)
        }

        fn into_simulation(
            self: Box<Self>,
        ) -> Result<Box<dyn crate::simulation::SimulationRequest>, Box<dyn Serializable>> {
            Err(self)
        }
    }

    #[test]
    fn every_token_resolves() {
        let mut factory = ObjectFactory::new();
        factory.register(Box::new(Fruit {
            hierarchy: "ns.GrannySmith,ns.Apple,ns.Fruit",
        }));

        for token in ["ns.GrannySmith", "ns.Apple", "ns.Fruit"] {
            let instance = factory.create(token).unwrap();
            assert_eq!(instance.hierarchy(), "ns.GrannySmith,ns.Apple,ns.Fruit");
        }
    }

    #[test]
    fn unknown_hierarchy_yields_none() {
        let factory = ObjectFactory::new();
        assert!(factory.create("ns.Pong").is_none());
    }

    #[test]
    fn newer_sender_resolves_to_known_base() {
        let mut factory = ObjectFactory::new();
        factory.register(Box::new(Fruit {
            hierarchy: "ns.Apple,ns.Fruit",
        }));

        // The sender knows a derived class we do not.
        let instance = factory.create("ns.Fuji,ns.Apple,ns.Fruit").unwrap();
        assert_eq!(instance.hierarchy(), "ns.Apple,ns.Fruit");
    }

    #[test]
    fn namespace_separator_is_normalized_at_registration() {
        let mut factory = ObjectFactory::new();
        factory.register(Box::new(Fruit {
            hierarchy: "ns::Apple,ns::Fruit",
        }));
        assert!(factory.create("ns.Apple").is_some());
    }

    #[test]
    fn later_registration_wins_on_shared_base() {
        let mut factory = ObjectFactory::new();
        factory.register(Box::new(Fruit {
            hierarchy: "ns.Apple,ns.Fruit",
        }));
        factory.register(Box::new(Fruit {
            hierarchy: "ns.Pear,ns.Fruit",
        }));

        let instance = factory.create("ns.Fruit").unwrap();
        assert_eq!(instance.hierarchy(), "ns.Pear,ns.Fruit");
    }
}
