use serde::{Deserialize, Serialize};

use bf_core::{CompareOperator, Kind, Scalar, ValueCell, VariableStore};

/// Mutation applied by a set-variable command. Negate flips a boolean or
/// negates a numeric operand; Add on strings concatenates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetOperator {
    Assign,
    Negate,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl SetOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Negate => "=!",
            Self::Add => "+=",
            Self::Subtract => "-=",
            Self::Multiply => "*=",
            Self::Divide => "/=",
        }
    }
}

/// One operand cell per comparable kind. Commands that compare or assign
/// against a variable carry all four and pick the one matching the
/// variable's kind at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperandCells {
    pub boolean: ValueCell<bool>,
    pub integer: ValueCell<i64>,
    pub float: ValueCell<f64>,
    pub string: ValueCell<String>,
}

impl OperandCells {
    /// Resolves the cell matching `kind`. Object and collection variables
    /// have no operand cell and yield `None`.
    pub fn resolve(&self, kind: Kind, variables: &VariableStore) -> Option<Scalar> {
        match kind {
            Kind::Boolean => Some(Scalar::Boolean(self.boolean.resolve(variables))),
            Kind::Integer => Some(Scalar::Integer(self.integer.resolve(variables))),
            Kind::Float => Some(Scalar::Float(self.float.resolve(variables))),
            Kind::Str => Some(Scalar::Str(self.string.resolve(variables))),
            Kind::Object => None,
        }
    }

    pub fn describe(&self, kind: Option<Kind>) -> String {
        match kind {
            Some(Kind::Boolean) => self.boolean.describe(),
            Some(Kind::Integer) => self.integer.describe(),
            Some(Kind::Float) => self.float.describe(),
            Some(Kind::Str) => self.string.describe(),
            Some(Kind::Object) | None => "<unsupported>".to_string(),
        }
    }

    pub fn references(&self, name: &str) -> bool {
        self.boolean.references(name)
            || self.integer.references(name)
            || self.float.references(name)
            || self.string.references(name)
    }
}

/// A loosely supplied element for collection mutations: a named variable
/// (which wins when both are set) or a bare literal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemSource {
    pub variable: Option<String>,
    pub literal: Option<Scalar>,
}

impl ItemSource {
    pub fn value(scalar: Scalar) -> Self {
        Self {
            variable: None,
            literal: Some(scalar),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            variable: Some(name.into()),
            literal: None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.variable.is_some() || self.literal.is_some()
    }

    pub fn describe(&self) -> String {
        match (&self.variable, &self.literal) {
            (Some(name), _) => format!("{{${}}}", name),
            (None, Some(scalar)) => scalar.to_string(),
            (None, None) => "<unset>".to_string(),
        }
    }

    pub fn references(&self, name: &str) -> bool {
        self.variable.as_deref() == Some(name)
    }
}

/// The mutation a collection command performs on its target collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CollectionOp {
    Add { source: ItemSource },
    AddUnique { source: ItemSource },
    Insert { index: ValueCell<i64>, source: ItemSource },
    Remove { source: ItemSource },
    RemoveAll { source: ItemSource },
    RemoveAt { index: ValueCell<i64> },
    Clear,
    Reverse,
    Shuffle,
    Sort,
    Resize { count: ValueCell<i64> },
    Reserve { count: ValueCell<i64> },
    GetAt { index: ValueCell<i64>, target: Option<String> },
}

impl CollectionOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "Add",
            Self::AddUnique { .. } => "Add Unique",
            Self::Insert { .. } => "Insert",
            Self::Remove { .. } => "Remove",
            Self::RemoveAll { .. } => "Remove All",
            Self::RemoveAt { .. } => "Remove At",
            Self::Clear => "Clear",
            Self::Reverse => "Reverse",
            Self::Shuffle => "Shuffle",
            Self::Sort => "Sort",
            Self::Resize { .. } => "Resize",
            Self::Reserve { .. } => "Reserve",
            Self::GetAt { .. } => "Get At",
        }
    }

    fn source(&self) -> Option<&ItemSource> {
        match self {
            Self::Add { source }
            | Self::AddUnique { source }
            | Self::Insert { source, .. }
            | Self::Remove { source }
            | Self::RemoveAll { source } => Some(source),
            _ => None,
        }
    }

    fn references(&self, name: &str) -> bool {
        if self.source().is_some_and(|source| source.references(name)) {
            return true;
        }
        match self {
            Self::Insert { index, .. } | Self::RemoveAt { index } => index.references(name),
            Self::Resize { count } | Self::Reserve { count } => count.references(name),
            Self::GetAt { index, target } => {
                index.references(name) || target.as_deref() == Some(name)
            }
            _ => false,
        }
    }
}

/// The variant-specific behavior of one command. A closed set: adding a
/// command kind means adding a variant and its entry handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CommandPayload {
    /// Never entered, never active; purely for authors.
    Comment {
        #[serde(default)]
        text: String,
    },
    SetVariable {
        #[serde(default)]
        variable: Option<String>,
        operator: SetOperator,
        #[serde(default)]
        operands: OperandCells,
    },
    If {
        #[serde(default)]
        variable: Option<String>,
        operator: CompareOperator,
        #[serde(default)]
        operands: OperandCells,
    },
    Else,
    End {
        /// Armed at runtime by a loop command; an armed end-marker jumps
        /// back to its loop instead of falling through.
        #[serde(skip)]
        loop_back_index: Option<usize>,
    },
    ForEach {
        #[serde(default)]
        collection: Option<String>,
        #[serde(default)]
        item: Option<String>,
        /// Runtime iteration cursor; meaningful only between a loop entry
        /// and the matching fresh re-entry reset.
        #[serde(skip)]
        cur_index: i64,
    },
    CollectionCommand {
        #[serde(default)]
        collection: Option<String>,
        op: CollectionOp,
    },
    Label {
        name: String,
    },
    Jump {
        target: String,
    },
    StopBlock,
}

/// One step of a block: indent metadata, an enable flag, and a payload. The
/// command's position index is its slot in the owning block's list; commands
/// hold no reference back to the block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default)]
    pub indent_level: usize,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub payload: CommandPayload,
}

fn enabled_default() -> bool {
    true
}

impl Command {
    pub fn new(indent_level: usize, payload: CommandPayload) -> Self {
        Self {
            indent_level,
            enabled: true,
            payload,
        }
    }

    /// The one predicate deciding whether advancement or a jump-target scan
    /// may land on this command. Disabled commands and comments are
    /// invisible to execution.
    pub fn is_runnable(&self) -> bool {
        self.enabled && !matches!(self.payload, CommandPayload::Comment { .. })
    }

    /// True when required configuration is missing or unresolvable. The
    /// engine never faults on such a command; this flag and `summary` are
    /// how the misconfiguration is surfaced.
    pub fn has_error(&self, variables: &VariableStore) -> bool {
        match &self.payload {
            CommandPayload::SetVariable { variable, .. }
            | CommandPayload::If { variable, .. } => match variable {
                Some(name) => !matches!(
                    variables.scalar_kind(name),
                    Some(Kind::Boolean | Kind::Integer | Kind::Float | Kind::Str)
                ),
                None => true,
            },
            CommandPayload::ForEach {
                collection, item, ..
            } => {
                let collection_ok = collection
                    .as_deref()
                    .is_some_and(|name| variables.collection(name).is_ok());
                let item_ok = item
                    .as_deref()
                    .is_some_and(|name| variables.scalar(name).is_ok());
                !(collection_ok && item_ok)
            }
            CommandPayload::CollectionCommand { collection, op } => {
                let collection_ok = collection
                    .as_deref()
                    .is_some_and(|name| variables.collection(name).is_ok());
                let source_ok = op.source().map_or(true, ItemSource::is_set);
                !(collection_ok && source_ok)
            }
            CommandPayload::Jump { target } => target.is_empty(),
            _ => false,
        }
    }

    /// Short human-readable description of the configured state, for the
    /// observation boundary. Reports an "Error: ..." line when required
    /// configuration is missing.
    pub fn summary(&self, variables: &VariableStore) -> String {
        match &self.payload {
            CommandPayload::Comment { text } => format!("// {}", text),
            CommandPayload::SetVariable {
                variable,
                operator,
                operands,
            } => match variable {
                Some(name) => format!(
                    "{} {} {}",
                    name,
                    operator.symbol(),
                    operands.describe(variables.scalar_kind(name))
                ),
                None => "Error: No variable selected".to_string(),
            },
            CommandPayload::If {
                variable,
                operator,
                operands,
            } => match variable {
                Some(name) => format!(
                    "{} {} {}",
                    name,
                    operator.symbol(),
                    operands.describe(variables.scalar_kind(name))
                ),
                None => "Error: No variable selected".to_string(),
            },
            CommandPayload::Else => String::new(),
            CommandPayload::End { .. } => String::new(),
            CommandPayload::ForEach {
                collection, item, ..
            } => match (collection, item) {
                (Some(collection), Some(item)) => {
                    format!("For each {{${}}} in {{${}}}", item, collection)
                }
                (None, _) => "Error: No collection selected".to_string(),
                (_, None) => "Error: No item variable selected".to_string(),
            },
            CommandPayload::CollectionCommand { collection, op } => match collection {
                Some(name) => format!("{} on {{${}}}", op.name(), name),
                None => "Error: No collection selected".to_string(),
            },
            CommandPayload::Label { name } => format!("Label: {}", name),
            CommandPayload::Jump { target } => {
                if target.is_empty() {
                    "Error: No label selected".to_string()
                } else {
                    format!("Jump to {}", target)
                }
            }
            CommandPayload::StopBlock => "Stop".to_string(),
        }
    }

    /// True if this command's configuration reads or writes `name`. Used by
    /// hosts for dependency tracking before deleting a variable.
    pub fn references_variable(&self, name: &str) -> bool {
        match &self.payload {
            CommandPayload::SetVariable {
                variable, operands, ..
            }
            | CommandPayload::If {
                variable, operands, ..
            } => variable.as_deref() == Some(name) || operands.references(name),
            CommandPayload::ForEach {
                collection, item, ..
            } => collection.as_deref() == Some(name) || item.as_deref() == Some(name),
            CommandPayload::CollectionCommand { collection, op } => {
                collection.as_deref() == Some(name) || op.references(name)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::Variable;

    fn vars() -> VariableStore {
        let mut store = VariableStore::new();
        store
            .declare(Variable::scalar("x", Scalar::Integer(0)))
            .expect("declare");
        store
    }

    #[test]
    fn runnable_excludes_disabled_and_comments() {
        let mut command = Command::new(0, CommandPayload::Else);
        assert!(command.is_runnable());
        command.enabled = false;
        assert!(!command.is_runnable());

        let comment = Command::new(
            0,
            CommandPayload::Comment {
                text: "note".to_string(),
            },
        );
        assert!(!comment.is_runnable());
    }

    #[test]
    fn if_summary_reports_missing_variable() {
        let command = Command::new(
            0,
            CommandPayload::If {
                variable: None,
                operator: CompareOperator::Equals,
                operands: OperandCells::default(),
            },
        );
        assert_eq!(command.summary(&vars()), "Error: No variable selected");
        assert!(command.has_error(&vars()));
    }

    #[test]
    fn if_summary_shows_operator_and_operand() {
        let mut operands = OperandCells::default();
        operands.integer = ValueCell::literal(5);
        let command = Command::new(
            0,
            CommandPayload::If {
                variable: Some("x".to_string()),
                operator: CompareOperator::LessThanOrEquals,
                operands,
            },
        );
        assert_eq!(command.summary(&vars()), "x <= 5");
        assert!(!command.has_error(&vars()));
    }

    #[test]
    fn foreach_reports_configuration_errors() {
        let command = Command::new(
            0,
            CommandPayload::ForEach {
                collection: None,
                item: Some("x".to_string()),
                cur_index: 0,
            },
        );
        assert!(command.has_error(&vars()));
        assert_eq!(command.summary(&vars()), "Error: No collection selected");
    }

    #[test]
    fn references_variable_covers_operands_and_targets() {
        let mut operands = OperandCells::default();
        operands.integer = ValueCell::reference("limit");
        let command = Command::new(
            0,
            CommandPayload::If {
                variable: Some("x".to_string()),
                operator: CompareOperator::LessThan,
                operands,
            },
        );
        assert!(command.references_variable("x"));
        assert!(command.references_variable("limit"));
        assert!(!command.references_variable("other"));

        let collection = Command::new(
            0,
            CommandPayload::CollectionCommand {
                collection: Some("bag".to_string()),
                op: CollectionOp::Add {
                    source: ItemSource::variable("x"),
                },
            },
        );
        assert!(collection.references_variable("bag"));
        assert!(collection.references_variable("x"));
    }

    #[test]
    fn command_json_is_kind_tagged_with_defaults() {
        let json = r#"{"kind":"if","variable":"x","operator":"equals"}"#;
        let command: Command = serde_json::from_str(json).expect("deserialize");
        assert_eq!(command.indent_level, 0);
        assert!(command.enabled);
        assert!(matches!(
            command.payload,
            CommandPayload::If {
                operator: CompareOperator::Equals,
                ..
            }
        ));
    }

    #[test]
    fn runtime_fields_are_not_serialized() {
        let command = Command::new(
            0,
            CommandPayload::ForEach {
                collection: Some("bag".to_string()),
                item: Some("x".to_string()),
                cur_index: 7,
            },
        );
        let json = serde_json::to_value(&command).expect("serialize");
        assert!(json.get("curIndex").is_none());

        let back: Command = serde_json::from_value(json).expect("deserialize");
        assert!(matches!(
            back.payload,
            CommandPayload::ForEach { cur_index: 0, .. }
        ));
    }
}
