use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::collection::AnyCollection;
use crate::error::FlowError;
use crate::value::{Kind, Scalar};

/// What a variable slot holds: one scalar, or one typed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(Scalar),
    Collection(AnyCollection),
}

/// A named, typed, mutable slot scoped to one script instance. The kind is
/// fixed at declaration; writes are kind-checked by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: VariableValue,
}

impl Variable {
    pub fn scalar(name: impl Into<String>, value: Scalar) -> Self {
        Self {
            name: name.into(),
            value: VariableValue::Scalar(value),
        }
    }

    pub fn collection(name: impl Into<String>, value: AnyCollection) -> Self {
        Self {
            name: name.into(),
            value: VariableValue::Collection(value),
        }
    }

    /// The scalar kind, if this slot holds a scalar.
    pub fn scalar_kind(&self) -> Option<Kind> {
        match &self.value {
            VariableValue::Scalar(scalar) => Some(scalar.kind()),
            VariableValue::Collection(_) => None,
        }
    }

    pub fn kind_name(&self) -> String {
        match &self.value {
            VariableValue::Scalar(scalar) => scalar.kind().name().to_string(),
            VariableValue::Collection(collection) => {
                format!("collection of {}", collection.element_kind().name())
            }
        }
    }
}

/// The declared variables of one script instance, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableStore {
    slots: BTreeMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, variable: Variable) -> Result<(), FlowError> {
        if self.slots.contains_key(&variable.name) {
            return Err(FlowError::new(
                "VAR_DUPLICATE",
                format!("Variable \"{}\" is already declared.", variable.name),
            ));
        }
        self.slots.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.slots.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.slots.values()
    }

    /// The declared scalar kind of `name`, if it names a scalar slot.
    pub fn scalar_kind(&self, name: &str) -> Option<Kind> {
        self.slots.get(name).and_then(Variable::scalar_kind)
    }

    pub fn scalar(&self, name: &str) -> Result<&Scalar, FlowError> {
        match &self.lookup(name)?.value {
            VariableValue::Scalar(scalar) => Ok(scalar),
            VariableValue::Collection(_) => Err(FlowError::new(
                "VAR_KIND",
                format!("Variable \"{}\" holds a collection, not a scalar.", name),
            )),
        }
    }

    /// Kind-checked scalar write. The slot keeps its declared kind for its
    /// whole lifetime.
    pub fn set_scalar(&mut self, name: &str, value: Scalar) -> Result<(), FlowError> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| missing_error(name))?;
        match &mut slot.value {
            VariableValue::Scalar(current) if current.kind() == value.kind() => {
                *current = value;
                Ok(())
            }
            _ => Err(FlowError::new(
                "VAR_KIND",
                format!(
                    "Cannot write a {} value into variable \"{}\" ({}).",
                    value.kind().name(),
                    name,
                    slot.kind_name()
                ),
            )),
        }
    }

    pub fn collection(&self, name: &str) -> Result<&AnyCollection, FlowError> {
        match &self.lookup(name)?.value {
            VariableValue::Collection(collection) => Ok(collection),
            VariableValue::Scalar(_) => Err(collection_kind_error(name)),
        }
    }

    pub fn collection_mut(&mut self, name: &str) -> Result<&mut AnyCollection, FlowError> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| missing_error(name))?;
        match &mut slot.value {
            VariableValue::Collection(collection) => Ok(collection),
            VariableValue::Scalar(_) => Err(collection_kind_error(name)),
        }
    }

    fn lookup(&self, name: &str) -> Result<&Variable, FlowError> {
        self.slots.get(name).ok_or_else(|| missing_error(name))
    }
}

fn missing_error(name: &str) -> FlowError {
    FlowError::new(
        "VAR_MISSING",
        format!("Variable \"{}\" is not declared.", name),
    )
}

fn collection_kind_error(name: &str) -> FlowError {
    FlowError::new(
        "VAR_KIND",
        format!("Variable \"{}\" does not hold a collection.", name),
    )
}
