//! The primitive object model of Redline Smalltalk.
//!
//! Values and heap objects, classes and metaclasses, blocks with their
//! method-block flag and answer semantics, method activations, temporaries
//! contexts and the class table that resolves class names.

mod activation;
mod block;
mod class;
mod class_table;
mod code;
mod context;
mod error;
mod lookup;
mod objects;
mod special;
mod value;

pub use activation::{Activation, ActivationId, LiveActivation};
pub use block::{Block, BlockData, MethodBody, NativeFn};
pub use class::{ClassData, attach_metaclass, class_object, new_class};
pub use class_table::{ClassResolver, ClassTable};
pub use code::CompiledCode;
pub use context::Context;
pub use error::{BlockAnswer, RuntimeError, Signal};
pub use lookup::{LookupResult, inherits_from, lookup};
pub use objects::{HostData, ObjRef, Object, ObjectId, ObjectKind};
pub use special::SpecialClasses;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    /// Runtime state is shared across threads behind `Arc`s.
    #[test]
    fn runtime_types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Object>();
        assert_send_sync::<ClassTable>();
        assert_send_sync::<Value>();
        assert_send_sync::<Context>();
        assert_send_sync::<Signal>();
    }
}
