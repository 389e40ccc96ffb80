use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Identity of one method activation, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivationId(u64);

static NEXT_ACTIVATION_ID: AtomicU64 = AtomicU64::new(1);

impl std::fmt::Display for ActivationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "activation#{}", self.0)
    }
}

/// A method activation as seen by the blocks created inside it.
///
/// Literal blocks hold an `Arc<Activation>` as their home. The activation is
/// live until its method returns, normally or by unwinding.
#[derive(Debug)]
pub struct Activation {
    id: ActivationId,
    live: AtomicBool,
    description: String,
}

impl Activation {
    /// Start a new activation; it is retired when the guard drops.
    pub fn begin(description: impl Into<String>) -> LiveActivation {
        LiveActivation(Arc::new(Self {
            id: ActivationId(NEXT_ACTIVATION_ID.fetch_add(1, Ordering::Relaxed)),
            live: AtomicBool::new(true),
            description: description.into(),
        }))
    }

    pub fn id(&self) -> ActivationId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// `Class>>selector` of the activated method.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Owning handle of a running activation.
pub struct LiveActivation(Arc<Activation>);

impl LiveActivation {
    pub fn id(&self) -> ActivationId {
        self.0.id
    }

    pub fn handle(&self) -> &Arc<Activation> {
        &self.0
    }
}

impl Drop for LiveActivation {
    fn drop(&mut self) {
        self.0.live.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activations_die_with_their_guard() {
        let guard = Activation::begin("Foo>>bar");
        let handle = guard.handle().clone();
        assert!(handle.is_live());
        assert_eq!(handle.description(), "Foo>>bar");
        drop(guard);
        assert!(!handle.is_live());
    }

    #[test]
    fn ids_are_fresh() {
        let a = Activation::begin("a");
        let b = Activation::begin("b");
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
    }
}
