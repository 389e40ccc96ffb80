use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::objects::{ObjRef, Object, ObjectKind};

/// The state of a class or metaclass object.
pub struct ClassData {
    name: Arc<str>,
    superclass: RwLock<Option<ObjRef>>,
    instance_variables: RwLock<Vec<String>>,
    methods: RwLock<HashMap<String, ObjRef>>,
    meta: bool,
    /// A metaclass's sole instance.
    this_class: RwLock<Weak<Object>>,
}

impl ClassData {
    pub fn new(
        name: impl Into<Arc<str>>,
        superclass: Option<ObjRef>,
        instance_variables: Vec<String>,
        meta: bool,
    ) -> Self {
        Self {
            name: name.into(),
            superclass: RwLock::new(superclass),
            instance_variables: RwLock::new(instance_variables),
            methods: RwLock::new(HashMap::new()),
            meta,
            this_class: RwLock::new(Weak::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_meta(&self) -> bool {
        self.meta
    }

    pub fn superclass(&self) -> Option<ObjRef> {
        self.superclass.read().clone()
    }

    pub fn set_superclass(&self, superclass: Option<ObjRef>) {
        *self.superclass.write() = superclass;
    }

    /// For a metaclass, the class it describes.
    pub fn this_class(&self) -> Option<ObjRef> {
        self.this_class.read().upgrade()
    }

    /// Instance variables declared by this class itself.
    pub fn instance_variables(&self) -> Vec<String> {
        self.instance_variables.read().clone()
    }

    pub fn add_instance_variable(&self, name: &str) {
        let mut ivars = self.instance_variables.write();
        if !ivars.iter().any(|v| v == name) {
            ivars.push(name.to_string());
        }
    }

    /// Inherited instance variables first, then this class's own.
    pub fn all_instance_variables(&self) -> Vec<String> {
        let mut names = match self.superclass() {
            Some(superclass) => superclass
                .as_class()
                .map(ClassData::all_instance_variables)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        names.extend(self.instance_variables());
        names
    }

    /// Number of slots an instance of this class needs.
    pub fn instance_size(&self) -> usize {
        self.all_instance_variables().len()
    }

    pub fn install_method(&self, selector: &str, method: ObjRef) {
        log::trace!("{}>>{} installed", self.name, selector);
        self.methods.write().insert(selector.to_string(), method);
    }

    pub fn method(&self, selector: &str) -> Option<ObjRef> {
        self.methods.read().get(selector).cloned()
    }

    pub fn selectors(&self) -> Vec<String> {
        let mut selectors: Vec<String> = self.methods.read().keys().cloned().collect();
        selectors.sort();
        selectors
    }
}

/// A class object whose own class reference is still nil.
pub fn class_object(name: &str, superclass: Option<ObjRef>, instance_variables: Vec<String>) -> ObjRef {
    Object::new(
        None,
        0,
        ObjectKind::Class(ClassData::new(name, superclass, instance_variables, false)),
    )
}

/// Create `class`'s metaclass, an instance of `metaclass_class` inheriting
/// from `meta_superclass`, and make it the class of `class`.
pub fn attach_metaclass(
    class: &ObjRef,
    metaclass_class: Option<ObjRef>,
    meta_superclass: Option<ObjRef>,
) -> ObjRef {
    let name = class
        .as_class()
        .map(|data| format!("{} class", data.name()))
        .unwrap_or_else(|| "? class".to_string());
    let data = ClassData::new(name, meta_superclass, Vec::new(), true);
    *data.this_class.write() = Arc::downgrade(class);
    let metaclass = Object::new(metaclass_class, 0, ObjectKind::Class(data));
    class.set_class(metaclass.clone());
    metaclass
}

/// Create a class together with its metaclass.
///
/// The metaclass inherits from the superclass's metaclass; a root class's
/// metaclass inherits from `class_class` (the class `Class`).
pub fn new_class(
    name: &str,
    superclass: Option<ObjRef>,
    instance_variables: Vec<String>,
    metaclass_class: Option<ObjRef>,
    class_class: Option<ObjRef>,
) -> ObjRef {
    let meta_superclass = match &superclass {
        Some(superclass) => superclass.class(),
        None => class_class,
    };
    let class = class_object(name, superclass, instance_variables);
    attach_metaclass(&class, metaclass_class, meta_superclass);
    log::debug!("created class {name}");
    class
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_variables_are_inherited_first() {
        let animal = new_class("Animal", None, vec!["name".into()], None, None);
        let dog = new_class("Dog", Some(animal.clone()), vec!["tricks".into()], None, None);
        let data = dog.as_class().unwrap();
        assert_eq!(data.all_instance_variables(), vec!["name", "tricks"]);
        assert_eq!(data.instance_size(), 2);
    }

    #[test]
    fn metaclasses_parallel_the_class_hierarchy() {
        let class_class = class_object("Class", None, vec![]);
        let animal = new_class("Animal", None, vec![], None, Some(class_class.clone()));
        let dog = new_class("Dog", Some(animal.clone()), vec![], None, None);

        let dog_meta = dog.class().unwrap();
        let meta = dog_meta.as_class().unwrap();
        assert!(meta.is_meta());
        assert_eq!(meta.name(), "Dog class");
        assert!(Arc::ptr_eq(&meta.this_class().unwrap(), &dog));
        let meta_super = meta.superclass().unwrap();
        assert!(Arc::ptr_eq(&meta_super, &animal.class().unwrap()));

        let root_meta_super = meta_super.as_class().unwrap().superclass().unwrap();
        assert!(Arc::ptr_eq(&root_meta_super, &class_class));
    }

    #[test]
    fn adding_an_existing_instance_variable_is_a_no_op() {
        let c = class_object("C", None, vec!["a".into()]);
        let data = c.as_class().unwrap();
        data.add_instance_variable("a");
        data.add_instance_variable("b");
        assert_eq!(data.instance_variables(), vec!["a", "b"]);
    }
}
