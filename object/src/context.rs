use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RuntimeError;
use crate::value::Value;

/// Heap-allocated temporaries of one method or block activation.
///
/// Blocks keep their defining context alive through `outer`, so captured
/// temporaries outlive the activation that declared them.
#[derive(Debug)]
pub struct Context {
    temps: RwLock<Vec<Value>>,
    outer: Option<Arc<Context>>,
}

impl Context {
    pub fn new(size: usize, outer: Option<Arc<Context>>) -> Arc<Self> {
        Self::with_temps(vec![Value::Nil; size], outer)
    }

    pub fn with_temps(temps: Vec<Value>, outer: Option<Arc<Context>>) -> Arc<Self> {
        Arc::new(Self {
            temps: RwLock::new(temps),
            outer,
        })
    }

    pub fn temp(&self, index: usize) -> Result<Value, RuntimeError> {
        let temps = self.temps.read();
        temps.get(index).cloned().ok_or(RuntimeError::IndexOutOfBounds {
            index: index as i64,
            size: temps.len(),
        })
    }

    pub fn set_temp(&self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let mut temps = self.temps.write();
        let size = temps.len();
        let slot = temps.get_mut(index).ok_or(RuntimeError::IndexOutOfBounds {
            index: index as i64,
            size,
        })?;
        *slot = value;
        Ok(())
    }

    pub fn outer(&self) -> Option<&Arc<Context>> {
        self.outer.as_ref()
    }

    /// The context `depth` hops outwards; `0` is `self`.
    pub fn at_depth(self: &Arc<Self>, depth: usize) -> Option<Arc<Context>> {
        let mut context = self.clone();
        for _ in 0..depth {
            context = context.outer.clone()?;
        }
        Some(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_contexts_share_temporaries() {
        let method = Context::new(1, None);
        let block = Context::new(0, Some(method.clone()));
        block.at_depth(1).unwrap().set_temp(0, Value::Integer(5)).unwrap();
        assert_eq!(method.temp(0), Ok(Value::Integer(5)));
        assert!(block.at_depth(2).is_none());
    }

    #[test]
    fn temps_are_bounds_checked() {
        let c = Context::new(1, None);
        assert!(c.temp(1).is_err());
        assert!(c.set_temp(3, Value::Nil).is_err());
    }
}
