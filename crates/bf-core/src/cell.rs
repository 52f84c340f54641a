use serde::{Deserialize, Serialize};

use crate::collection::Element;
use crate::error::FlowError;
use crate::variable::VariableStore;

/// A literal-or-reference holder for one scalar kind. When a variable name
/// is set it wins on read; writes go through to the variable, otherwise they
/// update the literal slot. Control-flow commands read their comparison
/// operands exclusively through cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueCell<T: Element> {
    pub variable: Option<String>,
    pub literal: T,
}

impl<T: Element> Default for ValueCell<T> {
    fn default() -> Self {
        Self {
            variable: None,
            literal: T::default_element(),
        }
    }
}

impl<T: Element> ValueCell<T> {
    pub fn literal(value: T) -> Self {
        Self {
            variable: None,
            literal: value,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            variable: Some(name.into()),
            literal: T::default_element(),
        }
    }

    /// Always yields a value of this cell's kind. A missing or mismatched
    /// reference degrades to the literal rather than failing.
    pub fn resolve(&self, variables: &VariableStore) -> T {
        if let Some(name) = &self.variable {
            if let Ok(scalar) = variables.scalar(name) {
                if let Some(value) = T::from_scalar(scalar) {
                    return value;
                }
            }
        }
        self.literal.clone()
    }

    /// Writes through to the referenced variable if one is set, else updates
    /// the literal slot.
    pub fn assign(&mut self, variables: &mut VariableStore, value: T) -> Result<(), FlowError> {
        match &self.variable {
            Some(name) => variables.set_scalar(name, value.into_scalar()),
            None => {
                self.literal = value;
                Ok(())
            }
        }
    }

    pub fn references(&self, name: &str) -> bool {
        self.variable.as_deref() == Some(name)
    }

    pub fn describe(&self) -> String {
        match &self.variable {
            Some(name) => format!("{{${}}}", name),
            None => self.literal.clone().into_scalar().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;
    use crate::variable::Variable;

    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store
            .declare(Variable::scalar("count", Scalar::Integer(9)))
            .expect("declare");
        store
            .declare(Variable::scalar("label", Scalar::Str("hi".to_string())))
            .expect("declare");
        store
    }

    #[test]
    fn reference_wins_over_literal() {
        let cell = ValueCell::<i64> {
            variable: Some("count".to_string()),
            literal: 1,
        };
        assert_eq!(cell.resolve(&store()), 9);
    }

    #[test]
    fn missing_or_mismatched_reference_falls_back_to_literal() {
        let missing = ValueCell::<i64> {
            variable: Some("ghost".to_string()),
            literal: 3,
        };
        assert_eq!(missing.resolve(&store()), 3);

        let mismatched = ValueCell::<i64> {
            variable: Some("label".to_string()),
            literal: 4,
        };
        assert_eq!(mismatched.resolve(&store()), 4);
    }

    #[test]
    fn assign_writes_through_to_the_variable() {
        let mut vars = store();
        let mut cell = ValueCell::<i64>::reference("count");
        cell.assign(&mut vars, 17).expect("write through");
        assert_eq!(vars.scalar("count").expect("read"), &Scalar::Integer(17));
        assert_eq!(cell.literal, 0, "literal slot untouched");
    }

    #[test]
    fn assign_without_reference_updates_the_literal() {
        let mut vars = store();
        let mut cell = ValueCell::<String>::literal("old".to_string());
        cell.assign(&mut vars, "new".to_string()).expect("assign");
        assert_eq!(cell.literal, "new");
    }

    #[test]
    fn describe_shows_reference_or_literal() {
        assert_eq!(ValueCell::<i64>::reference("hp").describe(), "{$hp}");
        assert_eq!(ValueCell::<i64>::literal(5).describe(), "5");
    }
}
