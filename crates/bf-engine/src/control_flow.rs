use tracing::warn;

use bf_core::{compare, CompareOperator};

use crate::command::{CommandPayload, OperandCells};
use crate::engine::{Engine, Transfer};

impl Engine {
    /// Conditional branch. True falls through to the structural successor;
    /// false jumps one past the first Else or End marker at this command's
    /// indent level. An unset or undeclared variable short-circuits to
    /// "condition satisfied".
    pub(crate) fn run_if(
        &mut self,
        block: usize,
        index: usize,
        variable: Option<&str>,
        operator: CompareOperator,
        operands: &OperandCells,
    ) -> Transfer {
        let Some(name) = variable else {
            warn!("if command has no variable selected; continuing");
            return Transfer::AdvanceFrom(Some(index));
        };
        let Some(kind) = self.variables().scalar_kind(name) else {
            warn!(variable = name, "if variable is not a declared scalar; continuing");
            return Transfer::AdvanceFrom(Some(index));
        };
        let Some(operand) = operands.resolve(kind, self.variables()) else {
            warn!(
                variable = name,
                kind = kind.name(),
                "if has no operand cell for kind; continuing"
            );
            return Transfer::AdvanceFrom(Some(index));
        };
        let lhs = match self.variables().scalar(name) {
            Ok(scalar) => scalar.clone(),
            Err(error) => {
                warn!(%error, "if variable unavailable; continuing");
                return Transfer::AdvanceFrom(Some(index));
            }
        };

        let condition = match compare::evaluate(operator, &lhs, &operand) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "if comparison failed; continuing");
                return Transfer::AdvanceFrom(Some(index));
            }
        };

        if condition {
            Transfer::AdvanceFrom(Some(index))
        } else {
            let marker = self.find_branch_marker(block, index + 1, self.indent_of(block, index));
            self.past_marker(block, marker)
        }
    }

    /// Reached when an If body falls through onto its Else: skip the whole
    /// alternate branch by jumping past the matching End.
    pub(crate) fn run_else(&mut self, block: usize, index: usize) -> Transfer {
        let marker = self.find_end_marker(block, index + 1, self.indent_of(block, index));
        self.past_marker(block, marker)
    }

    /// Loop over a collection. Re-entry from the loop's own end-marker keeps
    /// the iteration cursor; any other entry resets it. Each admitted
    /// iteration writes the current element into the item variable and arms
    /// the end-marker to jump back here.
    pub(crate) fn run_for_each(
        &mut self,
        block: usize,
        index: usize,
        collection: Option<&str>,
        item: Option<&str>,
        cur_index: i64,
    ) -> Transfer {
        let (Some(collection_name), Some(item_name)) = (collection, item) else {
            warn!("for-each is missing its collection or item variable; stopping block");
            return Transfer::Halt;
        };
        if self.variables().collection(collection_name).is_err() {
            warn!(
                collection = collection_name,
                "for-each collection is not a declared collection; stopping block"
            );
            return Transfer::Halt;
        }
        if self.variables().scalar(item_name).is_err() {
            warn!(
                item = item_name,
                "for-each item is not a declared scalar; stopping block"
            );
            return Transfer::Halt;
        }
        let indent = self.indent_of(block, index);
        let Some(end_index) = self.find_end_marker(block, index + 1, indent) else {
            warn!("for-each has no matching end marker; stopping block");
            return Transfer::Halt;
        };

        // Coming from our own end marker means the body just completed; any
        // other entry is fresh and resets the cursor.
        let reentered = self.blocks()[block].previous_active_index() == Some(end_index);
        let mut next_index = if reentered { cur_index } else { -1 };
        next_index += 1;

        let count = self
            .variables()
            .collection(collection_name)
            .map(|col| col.count() as i64)
            .unwrap_or(0);

        if next_index < count {
            let element = match self
                .variables()
                .collection(collection_name)
                .and_then(|col| col.get_scalar(next_index as usize))
            {
                Ok(scalar) => scalar,
                Err(error) => {
                    warn!(%error, "for-each element read failed; exiting loop");
                    return self.past_marker(block, Some(end_index));
                }
            };
            if let Err(error) = self.variables_mut().set_scalar(item_name, element) {
                warn!(%error, "for-each item variable is incompatible; element skipped");
            }

            self.store_loop_cursor(block, index, next_index);
            self.arm_end_marker(block, end_index, index);
            Transfer::AdvanceFrom(Some(index))
        } else {
            // Exhausted. The cursor keeps its last admitted value until a
            // fresh re-entry resets it.
            self.past_marker(block, Some(end_index))
        }
    }

    /// Transfers control to the first runnable label with the given name;
    /// continues unchanged when the label is missing.
    pub(crate) fn run_jump(&mut self, block: usize, index: usize, target: &str) -> Transfer {
        if target.is_empty() {
            warn!("jump command has no label selected; continuing");
            return Transfer::AdvanceFrom(Some(index));
        }
        let found = self.blocks()[block].commands().iter().position(|command| {
            command.is_runnable()
                && matches!(&command.payload, CommandPayload::Label { name } if name == target)
        });
        match found {
            Some(label_index) => Transfer::AdvanceFrom(Some(label_index)),
            None => {
                warn!(label = target, "jump label not found; continuing");
                Transfer::AdvanceFrom(Some(index))
            }
        }
    }

    /// First runnable Else or End at `indent`, scanning forward from `from`.
    /// Commands at other indent levels belong to other nesting scopes and
    /// are passed over.
    fn find_branch_marker(&self, block: usize, from: usize, indent: usize) -> Option<usize> {
        self.scan_markers(block, from, indent, true)
    }

    /// Like `find_branch_marker` but matches End only.
    pub(crate) fn find_end_marker(&self, block: usize, from: usize, indent: usize) -> Option<usize> {
        self.scan_markers(block, from, indent, false)
    }

    fn scan_markers(
        &self,
        block: usize,
        from: usize,
        indent: usize,
        accept_else: bool,
    ) -> Option<usize> {
        let commands = self.blocks()[block].commands();
        (from..commands.len()).find(|&candidate| {
            let command = &commands[candidate];
            if !command.is_runnable() || command.indent_level != indent {
                return false;
            }
            match command.payload {
                CommandPayload::End { .. } => true,
                CommandPayload::Else => accept_else,
                _ => false,
            }
        })
    }

    /// Jump one past `marker`. A marker that is the last command, or no
    /// marker at all (unterminated block), stops the block. That is a
    /// defined fallback, not a fault.
    fn past_marker(&mut self, block: usize, marker: Option<usize>) -> Transfer {
        match marker {
            Some(found) if found + 1 < self.blocks()[block].len() => Transfer::JumpTo(found + 1),
            Some(_) => Transfer::Halt,
            None => {
                warn!(
                    block = %self.blocks()[block].name,
                    "no matching end marker found; stopping block"
                );
                Transfer::Halt
            }
        }
    }

    fn indent_of(&self, block: usize, index: usize) -> usize {
        self.blocks()[block]
            .command(index)
            .map_or(0, |command| command.indent_level)
    }

    fn store_loop_cursor(&mut self, block: usize, index: usize, value: i64) {
        if let Some(command) = self.block_command_mut(block, index) {
            if let CommandPayload::ForEach { cur_index, .. } = &mut command.payload {
                *cur_index = value;
            }
        }
    }

    fn arm_end_marker(&mut self, block: usize, end_index: usize, loop_index: usize) {
        if let Some(command) = self.block_command_mut(block, end_index) {
            if let CommandPayload::End { loop_back_index } = &mut command.payload {
                *loop_back_index = Some(loop_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::command::{CollectionOp, Command, ItemSource};
    use crate::engine::engine_test_support::*;
    use crate::engine::EngineOptions;
    use bf_core::{
        AnyCollection, Collection, Kind, Scalar, ValueCell, Variable, VariableStore,
    };

    fn if_int(variable: &str, operator: CompareOperator, literal: i64, indent: usize) -> Command {
        let mut operands = OperandCells::default();
        operands.integer = ValueCell::literal(literal);
        Command::new(
            indent,
            CommandPayload::If {
                variable: Some(variable.to_string()),
                operator,
                operands,
            },
        )
    }

    fn set_int_at(name: &str, value: i64, indent: usize) -> Command {
        let mut command = set_int(name, value);
        command.indent_level = indent;
        command
    }

    fn end(indent: usize) -> Command {
        Command::new(
            indent,
            CommandPayload::End {
                loop_back_index: None,
            },
        )
    }

    #[test]
    fn if_true_advances_to_structural_successor() {
        let mut engine = engine_with(
            vec![int_var("x", 0), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
                end(0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 1);
    }

    #[test]
    fn if_false_jumps_one_past_the_matching_end() {
        let mut engine = engine_with(
            vec![int_var("x", 5), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
                end(0),
                set_int_at("y", 2, 0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 2);
    }

    #[test]
    fn if_false_with_no_marker_stops_the_block() {
        let mut engine = engine_with(
            vec![int_var("x", 5), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 0);
        assert_eq!(engine.block(0).expect("block").active_index(), None);
    }

    #[test]
    fn if_false_ignores_markers_at_other_indent_levels() {
        // The inner End at indent 1 belongs to a nested scope; the branch
        // must land one past the End at its own indent.
        let mut engine = engine_with(
            vec![int_var("x", 1), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                if_int("x", CompareOperator::Equals, 1, 1),
                set_int_at("y", 1, 2),
                end(1),
                end(0),
                set_int_at("y", 9, 0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 9);
    }

    #[test]
    fn if_false_skips_disabled_markers() {
        let mut disabled_else = Command::new(0, CommandPayload::Else);
        disabled_else.enabled = false;
        let mut engine = engine_with(
            vec![int_var("x", 5), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
                disabled_else,
                set_int_at("y", 2, 1),
                end(0),
                set_int_at("y", 3, 0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        // The disabled Else is invisible; the branch lands past the End.
        assert_eq!(int_value(&engine, "y"), 3);
    }

    #[test]
    fn if_with_unset_variable_continues() {
        let mut engine = engine_with(
            vec![int_var("y", 0)],
            vec![
                Command::new(
                    0,
                    CommandPayload::If {
                        variable: None,
                        operator: CompareOperator::Equals,
                        operands: OperandCells::default(),
                    },
                ),
                set_int_at("y", 1, 1),
                end(0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 1);
    }

    #[test]
    fn if_else_end_scenario_takes_the_true_branch() {
        // [SetVar x=0, If x==0, SetVar y=1, Else, SetVar y=2, End] must end
        // with y=1 and the block fallen off the end.
        let mut engine = engine_with(
            vec![int_var("x", 7), int_var("y", 0)],
            vec![
                set_int_at("x", 0, 0),
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
                Command::new(0, CommandPayload::Else),
                set_int_at("y", 2, 1),
                end(0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 1);
        assert_eq!(engine.block(0).expect("block").active_index(), None);
    }

    #[test]
    fn if_else_end_scenario_takes_the_else_branch() {
        let mut engine = engine_with(
            vec![int_var("x", 3), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
                Command::new(0, CommandPayload::Else),
                set_int_at("y", 2, 1),
                end(0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 2);
        assert_eq!(engine.block(0).expect("block").active_index(), None);
    }

    fn foreach_fixture() -> (VariableStore, Vec<Command>) {
        let mut store = VariableStore::new();
        store
            .declare(Variable::collection(
                "input",
                AnyCollection::Integer(Collection::from_items(vec![10, 20, 30])),
            ))
            .expect("declare");
        store
            .declare(Variable::collection(
                "output",
                AnyCollection::new(Kind::Integer),
            ))
            .expect("declare");
        store
            .declare(Variable::scalar("item", Scalar::Integer(0)))
            .expect("declare");

        let commands = vec![
            Command::new(
                0,
                CommandPayload::ForEach {
                    collection: Some("input".to_string()),
                    item: Some("item".to_string()),
                    cur_index: 0,
                },
            ),
            Command::new(
                1,
                CommandPayload::CollectionCommand {
                    collection: Some("output".to_string()),
                    op: CollectionOp::Add {
                        source: ItemSource::variable("item"),
                    },
                },
            ),
            end(0),
        ];
        (store, commands)
    }

    fn output_items(engine: &Engine) -> Vec<Scalar> {
        let output = engine.variables().collection("output").expect("output");
        (0..output.count())
            .map(|index| output.get_scalar(index).expect("element"))
            .collect()
    }

    #[test]
    fn foreach_visits_each_element_in_order_then_exits() {
        let (store, commands) = foreach_fixture();
        let mut engine = Engine::new(
            store,
            vec![Block::new("main", commands)],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");

        assert_eq!(
            output_items(&engine),
            vec![
                Scalar::Integer(10),
                Scalar::Integer(20),
                Scalar::Integer(30)
            ]
        );
        assert_eq!(engine.block(0).expect("block").active_index(), None);

        // Cursor parks on the last admitted index until a fresh re-entry.
        match &engine.block(0).expect("block").commands()[0].payload {
            CommandPayload::ForEach { cur_index, .. } => assert_eq!(*cur_index, 2),
            other => panic!("expected for-each, got {:?}", other),
        }
    }

    #[test]
    fn foreach_restarts_fresh_on_a_new_execution() {
        let (store, commands) = foreach_fixture();
        let mut engine = Engine::new(
            store,
            vec![Block::new("main", commands)],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("first run");
        engine.execute_block(0).expect("second run");

        // A fresh start resets the cursor, so the traversal repeats in full.
        assert_eq!(output_items(&engine).len(), 6);
    }

    #[test]
    fn jumping_into_the_loop_body_does_not_corrupt_the_cursor() {
        let (store, mut commands) = foreach_fixture();
        // Jump over the loop header straight into the body.
        commands.insert(
            1,
            Command::new(
                1,
                CommandPayload::Label {
                    name: "inside".to_string(),
                },
            ),
        );
        commands.insert(
            0,
            Command::new(
                0,
                CommandPayload::Jump {
                    target: "inside".to_string(),
                },
            ),
        );

        let mut engine = Engine::new(
            store,
            vec![Block::new("main", commands)],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");

        // The body ran once with the item variable's initial value; the
        // unarmed End fell through instead of looping back.
        assert_eq!(output_items(&engine), vec![Scalar::Integer(0)]);
        match &engine.block(0).expect("block").commands()[1].payload {
            CommandPayload::ForEach { cur_index, .. } => assert_eq!(*cur_index, 0),
            other => panic!("expected for-each, got {:?}", other),
        }
    }

    #[test]
    fn foreach_with_missing_configuration_stops_the_block() {
        let mut engine = engine_with(
            vec![int_var("item", 0), int_var("y", 0)],
            vec![
                Command::new(
                    0,
                    CommandPayload::ForEach {
                        collection: None,
                        item: Some("item".to_string()),
                        cur_index: 0,
                    },
                ),
                set_int_at("y", 1, 1),
                end(0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 0);
        assert_eq!(engine.block(0).expect("block").active_index(), None);
    }

    #[test]
    fn foreach_over_empty_collection_skips_the_body() {
        let mut store = VariableStore::new();
        store
            .declare(Variable::collection(
                "input",
                AnyCollection::new(Kind::Integer),
            ))
            .expect("declare");
        store
            .declare(Variable::scalar("item", Scalar::Integer(0)))
            .expect("declare");
        store
            .declare(Variable::scalar("y", Scalar::Integer(0)))
            .expect("declare");

        let mut engine = Engine::new(
            store,
            vec![Block::new(
                "main",
                vec![
                    Command::new(
                        0,
                        CommandPayload::ForEach {
                            collection: Some("input".to_string()),
                            item: Some("item".to_string()),
                            cur_index: 0,
                        },
                    ),
                    set_int_at("y", 1, 1),
                    end(0),
                    set_int_at("y", 2, 0),
                ],
            )],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 2);
    }

    #[test]
    fn jump_transfers_to_the_named_label() {
        let mut engine = engine_with(
            vec![int_var("y", 0)],
            vec![
                Command::new(
                    0,
                    CommandPayload::Jump {
                        target: "skip".to_string(),
                    },
                ),
                set_int_at("y", 1, 0),
                Command::new(
                    0,
                    CommandPayload::Label {
                        name: "skip".to_string(),
                    },
                ),
                set_int_at("y", 2, 0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 2);
    }

    #[test]
    fn jump_with_unknown_label_continues() {
        let mut engine = engine_with(
            vec![int_var("y", 0)],
            vec![
                Command::new(
                    0,
                    CommandPayload::Jump {
                        target: "ghost".to_string(),
                    },
                ),
                set_int_at("y", 1, 0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 1);
    }

    #[test]
    fn else_reached_from_the_true_branch_skips_to_past_end() {
        // Covered by the scenario tests too; this pins the Else-as-last-End
        // edge: when the matching End is the last command, the block stops.
        let mut engine = engine_with(
            vec![int_var("x", 0), int_var("y", 0)],
            vec![
                if_int("x", CompareOperator::Equals, 0, 0),
                set_int_at("y", 1, 1),
                Command::new(0, CommandPayload::Else),
                set_int_at("y", 2, 1),
                end(0),
            ],
            EngineOptions::default(),
        );
        engine.execute_block(0).expect("start");
        assert_eq!(int_value(&engine, "y"), 1);
        assert_eq!(engine.block(0).expect("block").active_index(), None);
    }

    #[test]
    fn numeric_operators_branch_correctly() {
        let cases = [
            (CompareOperator::LessThan, 5, true),
            (CompareOperator::GreaterThan, 5, false),
            (CompareOperator::LessThanOrEquals, 3, true),
            (CompareOperator::GreaterThanOrEquals, 2, true),
            (CompareOperator::NotEquals, 3, false),
        ];
        for (operator, literal, expect_body) in cases {
            let mut engine = engine_with(
                vec![int_var("x", 3), int_var("y", 0)],
                vec![
                    if_int("x", operator, literal, 0),
                    set_int_at("y", 1, 1),
                    end(0),
                ],
                EngineOptions::default(),
            );
            engine.execute_block(0).expect("start");
            let expected = if expect_body { 1 } else { 0 };
            assert_eq!(int_value(&engine, "y"), expected, "{:?} {}", operator, literal);
        }
    }
}
