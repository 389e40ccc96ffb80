use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::block::BlockData;
use crate::class::ClassData;
use crate::error::RuntimeError;
use crate::value::Value;

pub type ObjRef = Arc<Object>;

/// Process-unique object identity, allocated monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Opaque Rust state behind an instance of a host class.
pub struct HostData(Mutex<Box<dyn Any + Send>>);

impl HostData {
    pub fn new<T: Any + Send>(payload: T) -> Self {
        Self(Mutex::new(Box::new(payload)))
    }

    /// Wrap a payload that is already boxed, without boxing it again.
    pub fn from_box(payload: Box<dyn Any + Send>) -> Self {
        Self(Mutex::new(payload))
    }

    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Any + Send>> {
        self.0.lock()
    }
}

impl std::fmt::Debug for HostData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostData(..)")
    }
}

pub enum ObjectKind {
    Plain,
    Class(ClassData),
    Block(BlockData),
    Host(HostData),
}

/// A heap object: identity, class reference and a fixed-size slot vector.
///
/// The class reference is `None` only for objects created while the class
/// table is bootstrapping; those are patched when bootstrap finishes.
pub struct Object {
    id: ObjectId,
    class: RwLock<Option<ObjRef>>,
    slots: RwLock<Vec<Value>>,
    kind: ObjectKind,
}

impl Object {
    pub fn new(class: Option<ObjRef>, basic_size: usize, kind: ObjectKind) -> ObjRef {
        Self::with_slots(class, vec![Value::Nil; basic_size], kind)
    }

    pub fn with_slots(class: Option<ObjRef>, slots: Vec<Value>, kind: ObjectKind) -> ObjRef {
        Arc::new(Self {
            id: ObjectId::next(),
            class: RwLock::new(class),
            slots: RwLock::new(slots),
            kind,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn class(&self) -> Option<ObjRef> {
        self.class.read().clone()
    }

    pub fn set_class(&self, class: ObjRef) {
        *self.class.write() = Some(class);
    }

    pub fn basic_size(&self) -> usize {
        self.slots.read().len()
    }

    pub fn slot(&self, index: usize) -> Result<Value, RuntimeError> {
        let slots = self.slots.read();
        slots.get(index).cloned().ok_or(RuntimeError::IndexOutOfBounds {
            index: index as i64,
            size: slots.len(),
        })
    }

    pub fn set_slot(&self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let mut slots = self.slots.write();
        let size = slots.len();
        match slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::IndexOutOfBounds {
                index: index as i64,
                size,
            }),
        }
    }

    /// Snapshot of every slot, in order.
    pub fn slots(&self) -> Vec<Value> {
        self.slots.read().clone()
    }

    /// Grow the slot vector to `size`, padding with `nil`. Used when a class
    /// gains instance variables after instances already exist.
    pub fn grow_slots(&self, size: usize) {
        let mut slots = self.slots.write();
        if slots.len() < size {
            slots.resize(size, Value::Nil);
        }
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.kind {
            ObjectKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockData> {
        match &self.kind {
            ObjectKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostData> {
        match &self.kind {
            ObjectKind::Host(host) => Some(host),
            _ => None,
        }
    }

    /// Name of the object's class, or `"nil"` for a bootstrap orphan.
    pub fn class_name(&self) -> String {
        self.class()
            .and_then(|c| c.as_class().map(|data| data.name().to_string()))
            .unwrap_or_else(|| "nil".to_string())
    }
}

/// Shallow: classes, methods and blocks reference each other in cycles.
impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            ObjectKind::Plain => "plain",
            ObjectKind::Class(_) => "class",
            ObjectKind::Block(_) => "block",
            ObjectKind::Host(_) => "host",
        };
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("class", &self.class_name())
            .field("kind", &kind)
            .field("size", &self.basic_size())
            .finish()
    }
}
