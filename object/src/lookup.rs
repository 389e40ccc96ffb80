use std::sync::Arc;

use crate::objects::ObjRef;

/// A method found by [`lookup`] and the class that defines it.
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub method: ObjRef,
    pub holder: ObjRef,
}

/// Look up `selector` starting at `class` and walking superclass links.
pub fn lookup(class: &ObjRef, selector: &str) -> Option<LookupResult> {
    let mut current = Some(class.clone());
    while let Some(class) = current {
        let data = class.as_class()?;
        if let Some(method) = data.method(selector) {
            return Some(LookupResult {
                method,
                holder: class.clone(),
            });
        }
        current = data.superclass();
    }
    None
}

/// Whether `class` is `ancestor` or one of its subclasses.
pub fn inherits_from(class: &ObjRef, ancestor: &ObjRef) -> bool {
    let mut current = Some(class.clone());
    while let Some(class) = current {
        if Arc::ptr_eq(&class, ancestor) {
            return true;
        }
        current = class.as_class().and_then(|data| data.superclass());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::class_object;
    use crate::objects::{Object, ObjectKind};

    #[test]
    fn finds_inherited_methods_and_their_holder() {
        let base = class_object("Base", None, vec![]);
        let derived = class_object("Derived", Some(base.clone()), vec![]);
        let method = Object::new(None, 0, ObjectKind::Plain);
        base.as_class().unwrap().install_method("greet", method.clone());

        let found = lookup(&derived, "greet").unwrap();
        assert!(Arc::ptr_eq(&found.method, &method));
        assert!(Arc::ptr_eq(&found.holder, &base));
        assert!(lookup(&derived, "missing").is_none());
    }

    #[test]
    fn overrides_win() {
        let base = class_object("Base", None, vec![]);
        let derived = class_object("Derived", Some(base.clone()), vec![]);
        let a = Object::new(None, 0, ObjectKind::Plain);
        let b = Object::new(None, 0, ObjectKind::Plain);
        base.as_class().unwrap().install_method("m", a);
        derived.as_class().unwrap().install_method("m", b.clone());
        assert!(Arc::ptr_eq(&lookup(&derived, "m").unwrap().method, &b));
    }

    #[test]
    fn ancestry() {
        let base = class_object("Base", None, vec![]);
        let derived = class_object("Derived", Some(base.clone()), vec![]);
        assert!(inherits_from(&derived, &base));
        assert!(inherits_from(&base, &base));
        assert!(!inherits_from(&base, &derived));
    }
}
