//! Parameter/placeholder tracker
//!
//! Placeholders are bound to slots as they are visited. Slot numbers say
//! nothing about final order: once the tree is rewritten, [`collect_slots`]
//! walks it in textual order and [`ParameterTracker::finish`] numbers the
//! `?` placeholders from 1.

use crate::ast::visit::{VisitorMut, walk_statement};
use crate::ast::{Parameter, Statement};
use crate::compiled::{ParameterComponent, QueryParameter};
use crate::error::{CompileError, CompileResult};
use crate::metadata::OBJECT_TYPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    Positional,
    Named,
}

impl ParameterMode {
    fn of(param: &Parameter) -> Option<Self> {
        match param {
            Parameter::Positional(_) => Some(Self::Positional),
            Parameter::Named(_) => Some(Self::Named),
            Parameter::Bound(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSlot {
    pub name: Option<String>,
    pub index: Option<u32>,
    pub value_type: String,
    pub component: Option<ParameterComponent>,
}

/// Leaf of a composite value: dotted path and value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLeaf {
    pub path: String,
    pub value_type: String,
}

#[derive(Debug, Default)]
pub struct ParameterTracker {
    mode: Option<ParameterMode>,
    slots: Vec<ParameterSlot>,
    composite_types: Vec<String>,
}

impl ParameterTracker {
    /// Mode fixed by the first placeholder.
    pub fn mode(&self) -> Option<ParameterMode> {
        self.mode
    }

    /// Composite types expanded so far, each recorded once.
    pub fn composite_types(&self) -> &[String] {
        &self.composite_types
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: usize) -> Option<&ParameterSlot> {
        self.slots.get(id)
    }

    fn check_mode(&mut self, param: &Parameter) -> CompileResult<()> {
        let Some(mode) = ParameterMode::of(param) else {
            return Ok(());
        };
        match self.mode {
            None => {
                self.mode = Some(mode);
                Ok(())
            }
            Some(fixed) if fixed == mode => Ok(()),
            Some(_) => Err(CompileError::MixedParameters(param.to_string())),
        }
    }

    fn push(&mut self, param: &Parameter, value_type: &str, component: Option<ParameterComponent>) -> usize {
        let (name, index) = match param {
            Parameter::Named(name) => (Some(name.clone()), None),
            Parameter::Positional(index) => (None, *index),
            Parameter::Bound(_) => (None, None),
        };
        self.slots.push(ParameterSlot {
            name,
            index,
            value_type: value_type.to_string(),
            component,
        });
        self.slots.len() - 1
    }

    /// Bind a scalar placeholder. Already-bound placeholders keep their slot.
    pub fn bind(&mut self, param: &Parameter, value_type: Option<&str>) -> CompileResult<usize> {
        if let Parameter::Bound(slot) = param {
            return Ok(*slot);
        }
        self.check_mode(param)?;
        Ok(self.push(param, value_type.unwrap_or(OBJECT_TYPE), None))
    }

    /// Bind one placeholder standing for a composite value, producing one
    /// slot per leaf.
    pub fn bind_composite(&mut self, param: &Parameter, class: &str, leaves: &[CompositeLeaf]) -> CompileResult<Vec<usize>> {
        self.check_mode(param)?;
        if !self.composite_types.iter().any(|c| c == class) {
            self.composite_types.push(class.to_string());
        }
        Ok(leaves
            .iter()
            .map(|leaf| {
                let component = ParameterComponent {
                    class: class.to_string(),
                    path: leaf.path.clone(),
                };
                self.push(param, &leaf.value_type, Some(component))
            })
            .collect())
    }

    /// Parameter descriptors in final statement order.
    pub fn finish(&self, order: &[usize]) -> Vec<QueryParameter> {
        order
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                self.slots.get(*slot).map(|s| QueryParameter {
                    position: i + 1,
                    name: s.name.clone(),
                    index: s.index,
                    value_type: s.value_type.clone(),
                    component: s.component.clone(),
                })
            })
            .collect()
    }
}

struct SlotCollector {
    order: Vec<usize>,
}

impl VisitorMut for SlotCollector {
    fn visit_parameter(&mut self, param: &mut Parameter) -> CompileResult<()> {
        if let Parameter::Bound(slot) = param {
            self.order.push(*slot);
        }
        Ok(())
    }
}

/// Bound slots in the order their placeholders appear in rendered text.
pub fn collect_slots(stmt: &mut Statement) -> CompileResult<Vec<usize>> {
    let mut collector = SlotCollector { order: Vec::new() };
    walk_statement(&mut collector, stmt)?;
    Ok(collector.order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_exclusivity() {
        let mut tracker = ParameterTracker::default();
        tracker.bind(&Parameter::Positional(Some(1)), Some("i64")).unwrap();
        tracker.bind(&Parameter::Positional(None), None).unwrap();
        let err = tracker.bind(&Parameter::Named("name".into()), None).unwrap_err();
        assert!(matches!(err, CompileError::MixedParameters(p) if p == ":name"));
        assert_eq!(tracker.mode(), Some(ParameterMode::Positional));
    }

    #[test]
    fn test_composite_binding() {
        let mut tracker = ParameterTracker::default();
        let leaves = vec![
            CompositeLeaf {
                path: "orderId".into(),
                value_type: "i64".into(),
            },
            CompositeLeaf {
                path: "lineNo".into(),
                value_type: "i32".into(),
            },
        ];
        let slots = tracker
            .bind_composite(&Parameter::Named("key".into()), "OrderLineKey", &leaves)
            .unwrap();
        assert_eq!(slots, vec![0, 1]);
        tracker
            .bind_composite(&Parameter::Named("other".into()), "OrderLineKey", &leaves)
            .unwrap();
        assert_eq!(tracker.composite_types(), ["OrderLineKey".to_string()]);

        let params = tracker.finish(&[1, 0]);
        assert_eq!(params[0].position, 1);
        assert_eq!(params[0].value_type, "i32");
        assert_eq!(params[1].component.as_ref().map(|c| c.path.as_str()), Some("orderId"));
        assert_eq!(params[1].name.as_deref(), Some("key"));
    }
}
