use object::{Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::{arg, display_string, print_string};

fn write(interp: &Interpreter<'_>, text: &str) {
    interp.runtime().config.transcript.write(text);
}

pub fn transcript_show(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let text = display_string(interp, arg(args, 0, "show:")?)?;
    write(interp, &text);
    Ok(receiver.clone())
}

pub fn transcript_display(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let text = display_string(interp, arg(args, 0, "display:")?)?;
    write(interp, &text);
    Ok(receiver.clone())
}

pub fn transcript_print(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let text = print_string(interp, arg(args, 0, "print:")?)?;
    write(interp, &text);
    Ok(receiver.clone())
}

pub fn transcript_cr(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    write(interp, "\n");
    Ok(receiver.clone())
}

pub fn transcript_tab(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    write(interp, "\t");
    Ok(receiver.clone())
}

pub fn transcript_space(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    write(interp, " ");
    Ok(receiver.clone())
}
