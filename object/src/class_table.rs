use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::RuntimeError;
use crate::objects::{ObjRef, Object, ObjectKind};
use crate::value::Value;

/// Supplies classes the global namespace doesn't define, e.g. bindings for
/// host classes generated on first use.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, table: &ClassTable, name: &str) -> Result<Option<ObjRef>, RuntimeError>;
}

type ResolutionCell = Arc<Mutex<Option<ObjRef>>>;

/// Global namespace plus the class-resolution cache of one runtime.
///
/// Each name resolves at most once: concurrent resolvers of the same name
/// serialise on a per-name lock and the first successful resolution wins.
/// The cache only grows.
///
/// While bootstrapping, class resolution answers the nil sentinel
/// (`Ok(None)`) without doing any work, and objects instantiated through
/// [`instantiate`](Self::instantiate) are recorded so that
/// [`finish_bootstrap`](Self::finish_bootstrap) can patch their class.
pub struct ClassTable {
    bootstrapping: AtomicBool,
    globals: RwLock<HashMap<String, Value>>,
    cells: Mutex<HashMap<String, ResolutionCell>>,
    orphans: Mutex<Vec<(ObjRef, String)>>,
    resolutions: AtomicUsize,
    resolver: RwLock<Option<Arc<dyn ClassResolver>>>,
}

impl ClassTable {
    /// A new table, in the bootstrap phase.
    pub fn new() -> Self {
        Self {
            bootstrapping: AtomicBool::new(true),
            globals: RwLock::new(HashMap::new()),
            cells: Mutex::new(HashMap::new()),
            orphans: Mutex::new(Vec::new()),
            resolutions: AtomicUsize::new(0),
            resolver: RwLock::new(None),
        }
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.bootstrapping.load(Ordering::Acquire)
    }

    /// How many times resolution work actually ran (cache misses).
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn set_resolver(&self, resolver: Arc<dyn ClassResolver>) {
        *self.resolver.write() = Some(resolver);
    }

    // ── globals ─────────────────────────────────────────────────────

    pub fn define_global(&self, name: &str, value: Value) {
        log::trace!("global {name} defined");
        self.globals.write().insert(name.to_string(), value);
    }

    /// Bind a class under its own name.
    pub fn define_class(&self, class: &ObjRef) {
        if let Some(data) = class.as_class() {
            self.define_global(data.name(), Value::Object(class.clone()));
        }
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.read().get(name).cloned()
    }

    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ── resolution ──────────────────────────────────────────────────

    /// Resolve `name` to a class.
    ///
    /// Answers the cached class if there is one; `Ok(None)` while
    /// bootstrapping; otherwise looks the name up in the globals, then asks
    /// the resolver hook, caches and answers the result. A name nothing can
    /// resolve is [`RuntimeError::UnresolvableClass`].
    pub fn resolve_object(&self, name: &str) -> Result<Option<ObjRef>, RuntimeError> {
        let cell = self.cells.lock().entry(name.to_string()).or_default().clone();
        let mut slot = cell.lock();
        if let Some(class) = slot.as_ref() {
            return Ok(Some(class.clone()));
        }
        if self.is_bootstrapping() {
            return Ok(None);
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let class = match self.class_from_globals(name) {
            Some(class) => class,
            None => {
                let resolver = self.resolver.read().clone();
                let resolved = match resolver {
                    Some(resolver) => resolver.resolve(self, name)?,
                    None => None,
                };
                let class = resolved.ok_or_else(|| RuntimeError::UnresolvableClass {
                    name: name.to_string(),
                })?;
                self.define_class(&class);
                class
            }
        };
        log::debug!("resolved class {name}");
        *slot = Some(class.clone());
        Ok(Some(class))
    }

    /// Like [`resolve_object`](Self::resolve_object), but the nil sentinel
    /// is an error too.
    pub fn resolve(&self, name: &str) -> Result<ObjRef, RuntimeError> {
        self.resolve_object(name)?.ok_or_else(|| RuntimeError::UnresolvableClass {
            name: name.to_string(),
        })
    }

    fn class_from_globals(&self, name: &str) -> Option<ObjRef> {
        match self.globals.read().get(name) {
            Some(Value::Object(object)) if object.as_class().is_some() => Some(object.clone()),
            _ => None,
        }
    }

    // ── bootstrap ───────────────────────────────────────────────────

    /// Create an instance of the class called `class_name`. During bootstrap
    /// the class reference stays nil and is patched by
    /// [`finish_bootstrap`](Self::finish_bootstrap).
    pub fn instantiate(
        &self,
        class_name: &str,
        basic_size: usize,
        kind: ObjectKind,
    ) -> Result<ObjRef, RuntimeError> {
        let class = self.resolve_object(class_name)?;
        let orphan = class.is_none();
        let object = Object::new(class, basic_size, kind);
        if orphan {
            self.orphans.lock().push((object.clone(), class_name.to_string()));
        }
        Ok(object)
    }

    /// End the bootstrap phase and give every orphan its class. Answers the
    /// number of objects patched.
    pub fn finish_bootstrap(&self) -> Result<usize, RuntimeError> {
        self.bootstrapping.store(false, Ordering::Release);
        let orphans = std::mem::take(&mut *self.orphans.lock());
        for (object, class_name) in &orphans {
            object.set_class(self.resolve(class_name)?);
        }
        log::debug!("bootstrap finished, {} orphans patched", orphans.len());
        Ok(orphans.len())
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::class_object;

    fn table_with(names: &[&str]) -> ClassTable {
        let table = ClassTable::new();
        for name in names {
            table.define_class(&class_object(name, None, vec![]));
        }
        table
    }

    #[test]
    fn bootstrap_answers_nil_without_resolving() {
        let table = table_with(&["Object"]);
        assert!(table.resolve_object("Object").unwrap().is_none());
        assert!(table.resolve_object("Nope").unwrap().is_none());
        assert_eq!(table.resolutions(), 0);
    }

    #[test]
    fn resolves_once_and_caches() {
        let table = table_with(&["Object"]);
        table.finish_bootstrap().unwrap();
        let first = table.resolve_object("Object").unwrap().unwrap();
        let second = table.resolve_object("Object").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.resolutions(), 1);
    }

    #[test]
    fn undefined_names_are_errors() {
        let table = table_with(&[]);
        table.finish_bootstrap().unwrap();
        assert!(matches!(
            table.resolve_object("Ghost"),
            Err(RuntimeError::UnresolvableClass { name }) if name == "Ghost"
        ));
    }

    #[test]
    fn orphans_are_patched_when_bootstrap_finishes() {
        let table = table_with(&["BlockClosure"]);
        let orphan = table.instantiate("BlockClosure", 0, ObjectKind::Plain).unwrap();
        assert!(orphan.class().is_none());
        assert_eq!(table.finish_bootstrap().unwrap(), 1);
        assert_eq!(orphan.class_name(), "BlockClosure");
        // after bootstrap instances get their class immediately
        let later = table.instantiate("BlockClosure", 0, ObjectKind::Plain).unwrap();
        assert_eq!(later.class_name(), "BlockClosure");
    }

    struct Counting(AtomicUsize);

    impl ClassResolver for Counting {
        fn resolve(&self, _: &ClassTable, name: &str) -> Result<Option<ObjRef>, RuntimeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok((name == "Host").then(|| class_object(name, None, vec![])))
        }
    }

    #[test]
    fn concurrent_resolvers_share_one_resolution() {
        let table = table_with(&[]);
        table.finish_bootstrap().unwrap();
        let hook = Arc::new(Counting(AtomicUsize::new(0)));
        table.set_resolver(hook.clone());

        let results: Vec<ObjRef> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| table.resolve("Host").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
        assert_eq!(table.resolutions(), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(table.global("Host").is_some());
    }
}
