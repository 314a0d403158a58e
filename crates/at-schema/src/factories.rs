//! Process-wide component registries (spec.md §6.1, §9 "dynamic factory
//! registry"). One [`at_core::Factory`] per component kind, built once and
//! reused by every `Schema::from_bundle` call. Builtins are registered by
//! [`builtin::register_all`](crate::builtin::register_all); callers add
//! `custom/<name>` entries with `register_custom_*`.

use std::sync::OnceLock;

use at_core::Factory;

use crate::traits::{Batcher, Command, Filter, Input, Repo, Transformer, Validator};

pub struct Factories {
    pub input: Factory<Box<dyn Input>>,
    pub filter: Factory<Box<dyn Filter>>,
    pub batcher: Factory<Box<dyn Batcher>>,
    pub transformer: Factory<Box<dyn Transformer>>,
    pub validator: Factory<Box<dyn Validator>>,
    pub command: Factory<Box<dyn Command>>,
    pub repo: Factory<Box<dyn Repo>>,
}

impl Factories {
    fn new() -> Self {
        let mut factories = Self {
            input: Factory::new("Input"),
            filter: Factory::new("Filter"),
            batcher: Factory::new("Batcher"),
            transformer: Factory::new("Transformer"),
            validator: Factory::new("Validator"),
            command: Factory::new("Command"),
            repo: Factory::new("Repo"),
        };
        crate::builtin::register_all(&mut factories);
        factories
    }
}

static FACTORIES: OnceLock<Factories> = OnceLock::new();

/// The process-wide registry, built with builtins registered on first use.
pub fn factories() -> &'static Factories {
    FACTORIES.get_or_init(Factories::new)
}
