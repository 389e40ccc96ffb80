use crate::objects::ObjRef;
use crate::value::Value;

/// Well-known kernel classes.
///
/// Immediates carry no class reference, so dispatch on them goes through
/// this table. Built once bootstrap has created the kernel classes.
#[derive(Debug, Clone)]
pub struct SpecialClasses {
    pub object: ObjRef,
    pub class: ObjRef,
    pub metaclass: ObjRef,
    pub undefined_object: ObjRef,
    pub true_class: ObjRef,
    pub false_class: ObjRef,
    pub small_integer: ObjRef,
    pub float: ObjRef,
    pub character: ObjRef,
    pub string: ObjRef,
    pub symbol: ObjRef,
    pub array: ObjRef,
    pub block_closure: ObjRef,
}

impl SpecialClasses {
    pub fn class_of(&self, value: &Value) -> ObjRef {
        match value {
            Value::Nil => self.undefined_object.clone(),
            Value::True => self.true_class.clone(),
            Value::False => self.false_class.clone(),
            Value::Integer(_) => self.small_integer.clone(),
            Value::Float(_) => self.float.clone(),
            Value::Character(_) => self.character.clone(),
            Value::String(_) => self.string.clone(),
            Value::Symbol(_) => self.symbol.clone(),
            Value::Object(object) => object.class().unwrap_or_else(|| self.object.clone()),
        }
    }

    /// Name of the value's class, for diagnostics.
    pub fn class_name_of(&self, value: &Value) -> String {
        self.class_of(value)
            .as_class()
            .map(|class| class.name().to_string())
            .unwrap_or_default()
    }
}
