//! Call registry: named computations with typed signatures.
//!
//! The registry is populated at startup and read-only afterwards. Each
//! entry pins a computation's parameter types, return type, and which
//! reporter handles it receives; the dispatcher resolves inbound requests
//! against it by name and argument count.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::codec::{TypeDesc, Value};
use crate::reporter::CallContext;

/// Boxed future for invoker results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A failure raised by a computation, surfaced to the supervisor verbatim
/// (subject to the wire truncation limits).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct CallFailure {
    pub code: String,
    pub message: String,
}

impl CallFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// What a computation produces.
pub type CallResult = std::result::Result<Value, CallFailure>;

/// Which reporter handles a computation receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    None,
    Progress,
    Failure,
    Both,
}

impl Capability {
    pub fn wants_progress(self) -> bool {
        matches!(self, Capability::Progress | Capability::Both)
    }

    pub fn wants_failure(self) -> bool {
        matches!(self, Capability::Failure | Capability::Both)
    }
}

/// Trait for registered computations.
pub trait Invoker: Send + Sync + 'static {
    /// Run the computation with decoded arguments. The argument vector
    /// matches the registered parameter types in count and kind.
    fn invoke(&self, args: Vec<Value>, ctx: CallContext) -> BoxFuture<'static, CallResult>;
}

/// Wraps an async closure as an [`Invoker`].
pub struct FnInvoker<F>(F);

impl<F> FnInvoker<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, Fut> Invoker for FnInvoker<F>
where
    F: Fn(Vec<Value>, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    fn invoke(&self, args: Vec<Value>, ctx: CallContext) -> BoxFuture<'static, CallResult> {
        Box::pin((self.0)(args, ctx))
    }
}

/// Entry for one registered computation.
pub struct CallDescriptor {
    pub name: String,
    /// Data parameters only; reporter handles come from `capability`.
    pub params: Vec<TypeDesc>,
    pub returns: TypeDesc,
    pub capability: Capability,
    invoker: Box<dyn Invoker>,
}

impl CallDescriptor {
    pub(crate) fn invoker(&self) -> &dyn Invoker {
        self.invoker.as_ref()
    }
}

impl std::fmt::Debug for CallDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Startup registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("computation {0:?} is already registered")]
    Duplicate(String),

    /// The wire carries names behind a 1-byte length prefix.
    #[error("computation name {0:?} exceeds 255 bytes")]
    NameTooLong(String),
}

/// Request-time resolution errors; both surface as Failure frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no computation named {0:?} is registered")]
    NotFound(String),

    #[error("{name:?} takes {expected} arguments, request carries {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl LookupError {
    /// Failure-frame code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::NotFound(_) => "NotFound",
            LookupError::ArityMismatch { .. } => "ArityMismatch",
        }
    }
}

/// Registry mapping computation names to descriptors. Names are unique.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: HashMap<String, CallDescriptor>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a computation.
    ///
    /// `params` describe the data parameters carried on the wire;
    /// `capability` selects the reporter handles the invoker's context
    /// exposes. Duplicate and over-long names fail here, at startup.
    pub fn register<F, Fut>(
        &mut self,
        name: &str,
        params: Vec<TypeDesc>,
        returns: TypeDesc,
        capability: Capability,
        invoker: F,
    ) -> std::result::Result<(), RegistryError>
    where
        F: Fn(Vec<Value>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        if name.len() > u8::MAX as usize {
            return Err(RegistryError::NameTooLong(name.to_string()));
        }
        if self.calls.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.calls.insert(
            name.to_string(),
            CallDescriptor {
                name: name.to_string(),
                params,
                returns,
                capability,
                invoker: Box::new(FnInvoker::new(invoker)),
            },
        );
        Ok(())
    }

    /// Resolve a request by name and observed argument count.
    pub fn lookup(
        &self,
        name: &str,
        argc: usize,
    ) -> std::result::Result<&CallDescriptor, LookupError> {
        let descriptor = self
            .calls
            .get(name)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))?;
        if descriptor.params.len() != argc {
            return Err(LookupError::ArityMismatch {
                name: name.to_string(),
                expected: descriptor.params.len(),
                got: argc,
            });
        }
        Ok(descriptor)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.calls.keys().map(String::as_str)
    }
}
