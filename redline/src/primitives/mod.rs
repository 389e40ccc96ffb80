use object::{RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;

pub mod array;
pub mod block;
pub mod character;
pub mod class;
pub mod float;
pub mod integer;
pub mod objects;
pub mod string;
pub mod transcript;

/// A primitive method: interpreter, receiver and arguments in, answer out.
/// Primitives that evaluate blocks propagate [`Signal::Answer`] untouched.
pub type PrimitiveFn = fn(&mut Interpreter<'_>, &Value, &[Value]) -> Result<Value, Signal>;

#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    /// Class the primitive is installed on; `Foo class` for the class side.
    pub class: &'static str,
    pub selector: &'static str,
    pub arity: u8,
    pub func: PrimitiveFn,
}

impl PrimitiveDesc {
    pub const fn new(
        class: &'static str,
        selector: &'static str,
        arity: u8,
        func: PrimitiveFn,
    ) -> Self {
        Self {
            class,
            selector,
            arity,
            func,
        }
    }
}

impl std::fmt::Debug for PrimitiveDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<primitive {}>>{}>", self.class, self.selector)
    }
}

pub fn default_primitives() -> Vec<PrimitiveDesc> {
    vec![
        PrimitiveDesc::new("Object", "==", 1, objects::object_identical),
        PrimitiveDesc::new("Object", "=", 1, objects::object_identical),
        PrimitiveDesc::new("Object", "~~", 1, objects::object_not_identical),
        PrimitiveDesc::new("Object", "hash", 0, objects::object_hash),
        PrimitiveDesc::new("Object", "identityHash", 0, objects::object_hash),
        PrimitiveDesc::new("Object", "class", 0, objects::object_class),
        PrimitiveDesc::new("Object", "printString", 0, objects::object_print_string),
        PrimitiveDesc::new("Object", "error:", 1, objects::object_error),
        PrimitiveDesc::new("Object", "respondsTo:", 1, objects::object_responds_to),
        PrimitiveDesc::new("Object", "isKindOf:", 1, objects::object_is_kind_of),
        PrimitiveDesc::new("Object", "isMemberOf:", 1, objects::object_is_member_of),
        PrimitiveDesc::new("Object", "instVarAt:", 1, objects::object_inst_var_at),
        PrimitiveDesc::new("Object", "instVarAt:put:", 2, objects::object_inst_var_at_put),
        PrimitiveDesc::new("Object", "perform:", 1, objects::object_perform),
        PrimitiveDesc::new("Object", "perform:with:", 2, objects::object_perform),
        PrimitiveDesc::new("Object", "perform:with:with:", 3, objects::object_perform),
        PrimitiveDesc::new("Class", "new", 0, class::class_new),
        PrimitiveDesc::new("Class", "basicNew", 0, class::class_new),
        PrimitiveDesc::new("Class", "new:", 1, class::class_new_sized),
        PrimitiveDesc::new("Class", "name", 0, class::class_name),
        PrimitiveDesc::new("Class", "printString", 0, class::class_name),
        PrimitiveDesc::new("Class", "superclass", 0, class::class_superclass),
        PrimitiveDesc::new("Class", "subclass:", 1, class::class_subclass),
        PrimitiveDesc::new(
            "Class",
            "subclass:instanceVariableNames:",
            2,
            class::class_subclass,
        ),
        PrimitiveDesc::new("Class", "selectors", 0, class::class_selectors),
        PrimitiveDesc::new("Class", "includesSelector:", 1, class::class_includes_selector),
        PrimitiveDesc::new(
            "Class",
            "instanceVariableNames",
            0,
            class::class_instance_variable_names,
        ),
        PrimitiveDesc::new("Class", "inheritsFrom:", 1, class::class_inherits_from),
        PrimitiveDesc::new("SmallInteger", "+", 1, integer::integer_add),
        PrimitiveDesc::new("SmallInteger", "-", 1, integer::integer_sub),
        PrimitiveDesc::new("SmallInteger", "*", 1, integer::integer_mul),
        PrimitiveDesc::new("SmallInteger", "/", 1, integer::integer_div),
        PrimitiveDesc::new("SmallInteger", "//", 1, integer::integer_floor_div),
        PrimitiveDesc::new("SmallInteger", "\\\\", 1, integer::integer_floor_mod),
        PrimitiveDesc::new("SmallInteger", "rem:", 1, integer::integer_rem),
        PrimitiveDesc::new("SmallInteger", "quo:", 1, integer::integer_quo),
        PrimitiveDesc::new("SmallInteger", "<", 1, integer::integer_lt),
        PrimitiveDesc::new("SmallInteger", ">", 1, integer::integer_gt),
        PrimitiveDesc::new("SmallInteger", "<=", 1, integer::integer_le),
        PrimitiveDesc::new("SmallInteger", ">=", 1, integer::integer_ge),
        PrimitiveDesc::new("SmallInteger", "=", 1, integer::integer_eq),
        PrimitiveDesc::new("SmallInteger", "bitAnd:", 1, integer::integer_bit_and),
        PrimitiveDesc::new("SmallInteger", "bitOr:", 1, integer::integer_bit_or),
        PrimitiveDesc::new("SmallInteger", "bitXor:", 1, integer::integer_bit_xor),
        PrimitiveDesc::new("SmallInteger", "bitShift:", 1, integer::integer_bit_shift),
        PrimitiveDesc::new("SmallInteger", "printString", 0, integer::integer_print_string),
        PrimitiveDesc::new("SmallInteger", "printString:", 1, integer::integer_print_string_radix),
        PrimitiveDesc::new("SmallInteger", "asFloat", 0, integer::integer_as_float),
        PrimitiveDesc::new("SmallInteger", "asCharacter", 0, integer::integer_as_character),
        PrimitiveDesc::new("Float", "+", 1, float::float_add),
        PrimitiveDesc::new("Float", "-", 1, float::float_sub),
        PrimitiveDesc::new("Float", "*", 1, float::float_mul),
        PrimitiveDesc::new("Float", "/", 1, float::float_div),
        PrimitiveDesc::new("Float", "<", 1, float::float_lt),
        PrimitiveDesc::new("Float", ">", 1, float::float_gt),
        PrimitiveDesc::new("Float", "<=", 1, float::float_le),
        PrimitiveDesc::new("Float", ">=", 1, float::float_ge),
        PrimitiveDesc::new("Float", "=", 1, float::float_eq),
        PrimitiveDesc::new("Float", "printString", 0, float::float_print_string),
        PrimitiveDesc::new("Float", "truncated", 0, float::float_truncated),
        PrimitiveDesc::new("Float", "rounded", 0, float::float_rounded),
        PrimitiveDesc::new("Float", "floor", 0, float::float_floor),
        PrimitiveDesc::new("Float", "ceiling", 0, float::float_ceiling),
        PrimitiveDesc::new("Float", "sqrt", 0, float::float_sqrt),
        PrimitiveDesc::new("Float", "asFloat", 0, float::float_as_float),
        PrimitiveDesc::new("Character", "value", 0, character::character_value),
        PrimitiveDesc::new("Character", "asCharacter", 0, character::character_self),
        PrimitiveDesc::new("Character", "asString", 0, character::character_as_string),
        PrimitiveDesc::new("Character", "printString", 0, character::character_print_string),
        PrimitiveDesc::new("Character", "=", 1, character::character_eq),
        PrimitiveDesc::new("Character", "<", 1, character::character_lt),
        PrimitiveDesc::new("Character", "isVowel", 0, character::character_is_vowel),
        PrimitiveDesc::new("Character", "isLetter", 0, character::character_is_letter),
        PrimitiveDesc::new("Character", "isDigit", 0, character::character_is_digit),
        PrimitiveDesc::new("Character", "asUppercase", 0, character::character_as_uppercase),
        PrimitiveDesc::new("Character", "asLowercase", 0, character::character_as_lowercase),
        PrimitiveDesc::new("Character class", "value:", 1, character::character_class_value),
        PrimitiveDesc::new("String", "size", 0, string::string_size),
        PrimitiveDesc::new("String", "at:", 1, string::string_at),
        PrimitiveDesc::new("String", ",", 1, string::string_concat),
        PrimitiveDesc::new("String", "=", 1, string::string_eq),
        PrimitiveDesc::new("String", "<", 1, string::string_lt),
        PrimitiveDesc::new("String", "hash", 0, string::string_hash),
        PrimitiveDesc::new("String", "printString", 0, string::string_print_string),
        PrimitiveDesc::new("String", "displayString", 0, string::string_as_string),
        PrimitiveDesc::new("String", "asString", 0, string::string_as_string),
        PrimitiveDesc::new("String", "asSymbol", 0, string::string_as_symbol),
        PrimitiveDesc::new("String", "asUppercase", 0, string::string_as_uppercase),
        PrimitiveDesc::new("String", "asLowercase", 0, string::string_as_lowercase),
        PrimitiveDesc::new("String", "reversed", 0, string::string_reversed),
        PrimitiveDesc::new("String", "reverse", 0, string::string_reversed),
        PrimitiveDesc::new("String", "indexOf:", 1, string::string_index_of),
        PrimitiveDesc::new("String", "includesSubstring:", 1, string::string_includes_substring),
        PrimitiveDesc::new("String", "asNumber", 0, string::string_as_number),
        PrimitiveDesc::new("Symbol", "printString", 0, string::symbol_print_string),
        PrimitiveDesc::new("Array", "size", 0, array::array_size),
        PrimitiveDesc::new("Array", "at:", 1, array::array_at),
        PrimitiveDesc::new("Array", "at:put:", 2, array::array_at_put),
        PrimitiveDesc::new("Array", "printString", 0, array::array_print_string),
        PrimitiveDesc::new("BlockClosure", "value", 0, block::block_value),
        PrimitiveDesc::new("BlockClosure", "value:", 1, block::block_value),
        PrimitiveDesc::new("BlockClosure", "value:value:", 2, block::block_value),
        PrimitiveDesc::new("BlockClosure", "value:value:value:", 3, block::block_value),
        PrimitiveDesc::new("BlockClosure", "value:value:value:value:", 4, block::block_value),
        PrimitiveDesc::new("BlockClosure", "valueWithArguments:", 1, block::block_value_with_arguments),
        PrimitiveDesc::new("BlockClosure", "numArgs", 0, block::block_num_args),
        PrimitiveDesc::new("BlockClosure", "whileTrue:", 1, block::block_while_true),
        PrimitiveDesc::new("BlockClosure", "whileFalse:", 1, block::block_while_false),
        PrimitiveDesc::new("BlockClosure", "repeat", 0, block::block_repeat),
        PrimitiveDesc::new("BlockClosure", "ensure:", 1, block::block_ensure),
        PrimitiveDesc::new("TextCollector", "show:", 1, transcript::transcript_show),
        PrimitiveDesc::new("TextCollector", "nextPutAll:", 1, transcript::transcript_show),
        PrimitiveDesc::new("TextCollector", "display:", 1, transcript::transcript_display),
        PrimitiveDesc::new("TextCollector", "print:", 1, transcript::transcript_print),
        PrimitiveDesc::new("TextCollector", "cr", 0, transcript::transcript_cr),
        PrimitiveDesc::new("TextCollector", "tab", 0, transcript::transcript_tab),
        PrimitiveDesc::new("TextCollector", "space", 0, transcript::transcript_space),
    ]
}

// ── Argument helpers ────────────────────────────────────────────────

pub(crate) fn arg<'a>(args: &'a [Value], index: usize, selector: &str) -> Result<&'a Value, RuntimeError> {
    args.get(index).ok_or_else(|| RuntimeError::WrongArgumentCount {
        selector: selector.to_string(),
        expected: index + 1,
        given: args.len(),
    })
}

pub(crate) fn expect_integer(value: &Value) -> Result<i64, RuntimeError> {
    value
        .as_integer()
        .ok_or_else(|| RuntimeError::type_error("SmallInteger", value))
}

pub(crate) fn expect_str(value: &Value) -> Result<&str, RuntimeError> {
    value
        .as_str()
        .ok_or_else(|| RuntimeError::type_error("String", value))
}

/// 1-based Smalltalk index into a collection of `size` elements.
pub(crate) fn expect_index(value: &Value, size: usize) -> Result<usize, RuntimeError> {
    let index = expect_integer(value)?;
    if index < 1 || index as usize > size {
        return Err(RuntimeError::IndexOutOfBounds { index, size });
    }
    Ok(index as usize - 1)
}

/// Answer of sending `printString`, which must be a string.
pub(crate) fn print_string(interp: &mut Interpreter<'_>, value: &Value) -> Result<String, Signal> {
    let printed = interp.send(value.clone(), "printString", &[])?;
    Ok(expect_str(&printed)?.to_string())
}

/// Answer of sending `displayString`.
pub(crate) fn display_string(interp: &mut Interpreter<'_>, value: &Value) -> Result<String, Signal> {
    if let Value::String(s) = value {
        return Ok(s.to_string());
    }
    let shown = interp.send(value.clone(), "displayString", &[])?;
    Ok(expect_str(&shown)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_has_a_matching_arity() {
        for desc in default_primitives() {
            let colons = desc.selector.matches(':').count();
            let binary = !desc.selector.starts_with(|c: char| c.is_alphabetic());
            let arity = if binary { 1 } else { colons };
            assert_eq!(usize::from(desc.arity), arity, "{desc:?}");
        }
    }

    #[test]
    fn indices_are_one_based_and_checked() {
        assert_eq!(expect_index(&Value::Integer(1), 3), Ok(0));
        assert_eq!(
            expect_index(&Value::Integer(4), 3),
            Err(RuntimeError::IndexOutOfBounds { index: 4, size: 3 })
        );
        assert!(matches!(
            expect_index(&Value::Nil, 3),
            Err(RuntimeError::TypeError { .. })
        ));
    }
}
