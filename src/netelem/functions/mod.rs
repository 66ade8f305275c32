//! # Function Registry
//!
//! Validators and presentation policies are plain function pointers looked up
//! by name. Nothing is discovered at runtime: the built-ins come from
//! enumerating [`validators::BUILTINS`] and [`policies::BUILTINS`], and a host
//! adds its own with [`FunctionRegistry::register`] at startup.
//!
//! The registry is an ordinary value passed to whatever needs it (attribute
//! creation, edit commits, emitted initializers). There is no global instance.
//!
//! A lookup miss is not an error. Callers get `None` and fall back to the
//! no-op validator or the identity policy.

pub mod policies;
pub mod validators;

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::attributes::{Attribute, TypeRegistry};
use crate::error::{Error, Result};
use crate::model::{CompositeNode, KeyPath, RoleId, Segment};
use crate::presentation::{PresentationDescriptor, WindowKind};

/// What a validator gets to look at besides the attribute itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub path: &'a KeyPath,
    pub window: WindowKind,
    pub types: &'a TypeRegistry,
}

/// `(context, host node, parent attribute, attribute, new text)`.
///
/// The error string is shown to the user as is.
pub type ValidatorFn = fn(
    &ValidationContext<'_>,
    &CompositeNode,
    Option<&Attribute>,
    &Attribute,
    &str,
) -> std::result::Result<(), String>;

/// Everything a presentation policy may consult.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    pub attribute: &'a Attribute,
    pub key: &'a Segment,
    pub main_node: &'a CompositeNode,
    pub main_role: RoleId,
    pub current_role: RoleId,
    pub window: WindowKind,
    pub editable: bool,
    pub types: &'a TypeRegistry,
}

pub type PolicyFn = fn(&PolicyInput<'_>) -> PresentationDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Validator,
    Policy,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Validator => f.write_str("validator"),
            FunctionKind::Policy => f.write_str("policy"),
        }
    }
}

/// A registered function before it is bound to a name.
#[derive(Clone, Copy)]
pub enum Function {
    Validator(ValidatorFn),
    Policy(PolicyFn),
}

impl Function {
    pub fn kind(&self) -> FunctionKind {
        match self {
            Function::Validator(_) => FunctionKind::Validator,
            Function::Policy(_) => FunctionKind::Policy,
        }
    }
}

/// A validator bound to the name it was registered under.
///
/// Handles compare by name; the name is what generated code and requests refer to.
#[derive(Clone)]
pub struct ValidatorHandle {
    name: String,
    func: ValidatorFn,
}

impl ValidatorHandle {
    pub fn new(name: impl Into<String>, func: ValidatorFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        ctx: &ValidationContext<'_>,
        host: &CompositeNode,
        parent: Option<&Attribute>,
        attribute: &Attribute,
        text: &str,
    ) -> std::result::Result<(), String> {
        (self.func)(ctx, host, parent, attribute, text)
    }
}

impl PartialEq for ValidatorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for ValidatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorHandle({})", self.name)
    }
}

#[derive(Clone)]
pub struct PolicyHandle {
    name: String,
    func: PolicyFn,
}

impl PolicyHandle {
    pub fn new(name: impl Into<String>, func: PolicyFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, input: &PolicyInput<'_>) -> PresentationDescriptor {
        (self.func)(input)
    }
}

impl PartialEq for PolicyHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for PolicyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolicyHandle({})", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionHandle {
    Validator(ValidatorHandle),
    Policy(PolicyHandle),
}

impl FunctionHandle {
    pub fn name(&self) -> &str {
        match self {
            FunctionHandle::Validator(h) => h.name(),
            FunctionHandle::Policy(h) => h.name(),
        }
    }
}

/// Name-keyed validators and policies.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    validators: BTreeMap<String, ValidatorFn>,
    policies: BTreeMap<String, PolicyFn>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in validator and policy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, func) in validators::BUILTINS {
            registry.validators.insert(name.to_string(), *func);
        }
        for (name, func) in policies::BUILTINS {
            registry.policies.insert(name.to_string(), *func);
        }
        registry
    }

    /// Registers a function under `name`. Names are unique per kind.
    pub fn register(&mut self, name: impl Into<String>, function: Function) -> Result<()> {
        let name = name.into();
        let taken = match function {
            Function::Validator(_) => self.validators.contains_key(&name),
            Function::Policy(_) => self.policies.contains_key(&name),
        };
        if taken {
            return Err(Error::DuplicateFunction {
                kind: function.kind(),
                name,
            });
        }
        match function {
            Function::Validator(func) => {
                self.validators.insert(name, func);
            }
            Function::Policy(func) => {
                self.policies.insert(name, func);
            }
        }
        Ok(())
    }

    pub fn lookup(&self, kind: FunctionKind, name: &str) -> Option<FunctionHandle> {
        match kind {
            FunctionKind::Validator => self.validator(name).map(FunctionHandle::Validator),
            FunctionKind::Policy => self.policy(name).map(FunctionHandle::Policy),
        }
    }

    pub fn validator(&self, name: &str) -> Option<ValidatorHandle> {
        let found = self
            .validators
            .get(name)
            .map(|func| ValidatorHandle::new(name, *func));
        if found.is_none() {
            debug!(validator = name, "validator lookup missed");
        }
        found
    }

    pub fn policy(&self, name: &str) -> Option<PolicyHandle> {
        let found = self
            .policies
            .get(name)
            .map(|func| PolicyHandle::new(name, *func));
        if found.is_none() {
            debug!(policy = name, "policy lookup missed");
        }
        found
    }

    /// Registered names of one kind, sorted.
    pub fn list_all(&self, kind: FunctionKind) -> Vec<String> {
        match kind {
            FunctionKind::Validator => self.validators.keys().cloned().collect(),
            FunctionKind::Policy => self.policies.keys().cloned().collect(),
        }
    }

    /// The attribute's own validator, or the no-op default.
    pub fn validator_or_default(&self, handle: Option<&ValidatorHandle>) -> ValidatorHandle {
        handle
            .cloned()
            .unwrap_or_else(|| ValidatorHandle::new(validators::NOOP, validators::noop))
    }

    /// The attribute's own policy, or the identity default.
    pub fn policy_or_default(&self, handle: Option<&PolicyHandle>) -> PolicyHandle {
        handle
            .cloned()
            .unwrap_or_else(|| PolicyHandle::new(policies::IDENTITY, policies::identity))
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("policies", &self.policies.keys().collect::<Vec<_>>())
            .finish()
    }
}
