use std::sync::Arc;

use crate::objects::ObjRef;

/// A Smalltalk value.
///
/// Immediates (`nil`, booleans, small integers, floats, characters) carry no
/// object header; their class comes from the runtime's
/// [`SpecialClasses`](crate::SpecialClasses). Strings and symbols are
/// immutable shared text. Everything else is an [`ObjRef`].
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    True,
    False,
    Integer(i64),
    Float(f64),
    Character(char),
    String(Arc<str>),
    Symbol(Arc<str>),
    Object(ObjRef),
}

impl Value {
    pub fn from_bool(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn symbol(s: impl Into<Arc<str>>) -> Self {
        Self::Symbol(s.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// `==`: the same object, or the same immediate.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil)
            | (Self::True, Self::True)
            | (Self::False, Self::False) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Character(a), Self::Character(b)) => a == b,
            (Self::String(a), Self::String(b)) => Arc::ptr_eq(a, b),
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short name of the value's representation, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::True | Self::False => "Boolean",
            Self::Integer(_) => "SmallInteger",
            Self::Float(_) => "Float",
            Self::Character(_) => "Character",
            Self::String(_) => "String",
            Self::Symbol(_) => "Symbol",
            Self::Object(_) => "Object",
        }
    }
}

/// Structural equality: text by content, objects by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            _ => self.identical(other),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl From<ObjRef> for Value {
    fn from(o: ObjRef) -> Self {
        Self::Object(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_compare_by_content_but_identity_by_pointer() {
        let a = Value::string("abc");
        let b = Value::string("abc");
        assert_eq!(a, b);
        assert!(!a.identical(&b));
        assert!(a.identical(&a.clone()));
    }

    #[test]
    fn symbols_are_identical_by_content() {
        assert!(Value::symbol("foo").identical(&Value::symbol("foo")));
        assert!(!Value::symbol("foo").identical(&Value::string("foo")));
    }

    #[test]
    fn immediates() {
        assert!(Value::Integer(3).identical(&Value::from(3)));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::Nil.is_nil());
        assert_eq!(Value::Float(1.5).kind_name(), "Float");
    }
}
