use std::time::Duration;

use tracing::{debug, warn};

use bf_core::{FlowError, Scalar, VariableStore};

use crate::block::Block;
use crate::command::{Command, CommandPayload, OperandCells, SetOperator};

/// Behavior knobs fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// When set, a command becomes active immediately but its entry behavior
    /// runs only after this delay has elapsed on the host tick.
    pub step_delay: Option<Duration>,
    pub random_seed: Option<u32>,
}

/// What a command's entry behavior decided: continue past a position, enter
/// an explicit target, or stop the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transfer {
    AdvanceFrom(Option<usize>),
    JumpTo(usize),
    Halt,
}

const STEP_GUARD: usize = 10_000;

/// One script instance: its variable store and its blocks, advanced
/// cooperatively from the host's periodic tick. Single logical thread of
/// control; the engine contains no synchronization by design.
#[derive(Debug)]
pub struct Engine {
    variables: VariableStore,
    blocks: Vec<Block>,
    step_delay: Option<Duration>,
    pub(crate) rng_state: u32,
}

impl Engine {
    pub fn new(variables: VariableStore, blocks: Vec<Block>, options: EngineOptions) -> Self {
        Self {
            variables,
            blocks,
            step_delay: options.step_delay,
            rng_state: options.random_seed.unwrap_or(1),
        }
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Split borrow for operations that mutate a collection while drawing
    /// from the engine's random state.
    pub(crate) fn variables_and_rng(&mut self) -> (&mut VariableStore, &mut u32) {
        (&mut self.variables, &mut self.rng_state)
    }

    pub(crate) fn block_command_mut(&mut self, block: usize, index: usize) -> Option<&mut Command> {
        self.blocks
            .get_mut(block)
            .and_then(|found| found.command_mut(index))
    }

    pub fn block_index(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.name == name)
    }

    pub fn any_executing(&self) -> bool {
        self.blocks
            .iter()
            .any(|block| block.is_executing() || block.pending().is_some())
    }

    /// Starts `block` from its first command. Fails if the index is unknown
    /// or the block is already executing.
    pub fn execute_block(&mut self, block: usize) -> Result<(), FlowError> {
        let found = self.blocks.get(block).ok_or_else(|| {
            FlowError::new(
                "ENGINE_BLOCK_MISSING",
                format!("No block at index {}.", block),
            )
        })?;
        if found.is_executing() || found.pending().is_some() {
            return Err(FlowError::new(
                "ENGINE_BLOCK_ACTIVE",
                format!("Block \"{}\" is already executing.", found.name),
            ));
        }

        self.run_transfer(block, Transfer::AdvanceFrom(None));
        Ok(())
    }

    pub fn execute_block_named(&mut self, name: &str) -> Result<(), FlowError> {
        let index = self.block_index(name).ok_or_else(|| {
            FlowError::new("ENGINE_BLOCK_MISSING", format!("No block named \"{}\".", name))
        })?;
        self.execute_block(index)
    }

    /// Clears the block's active command and cancels any pending deferred
    /// entry, so a stale command can never fire after the block moved on.
    /// Idempotent, and safe to call from within a command's own entry.
    pub fn stop_block(&mut self, block: usize) {
        if let Some(found) = self.blocks.get_mut(block) {
            found.halt();
        }
    }

    pub fn stop_all(&mut self) {
        for block in &mut self.blocks {
            block.halt();
        }
    }

    /// Host tick: drives pending slow-step entries. The only suspension
    /// point in the engine; all other transitions are synchronous.
    pub fn tick(&mut self, elapsed: Duration) {
        for index in 0..self.blocks.len() {
            let due = match self.blocks[index].pending_mut() {
                Some(pending) => {
                    if elapsed >= pending.remaining {
                        Some(pending.index)
                    } else {
                        pending.remaining -= elapsed;
                        None
                    }
                }
                None => None,
            };

            if let Some(command_index) = due {
                self.blocks[index].clear_pending();
                let transfer = self.enter_command(index, command_index);
                self.run_transfer(index, transfer);
            }
        }
    }

    /// Advances the block until it stops or defers to the next tick. Each
    /// step finds the next runnable command, records history, activates it,
    /// and runs (or schedules) its entry behavior.
    pub(crate) fn run_transfer(&mut self, block: usize, mut transfer: Transfer) {
        let mut guard = 0usize;
        loop {
            guard += 1;
            if guard > STEP_GUARD {
                warn!(
                    block = %self.blocks[block].name,
                    "execution guard exceeded {} steps; stopping block",
                    STEP_GUARD
                );
                self.blocks[block].halt();
                return;
            }

            let next = match transfer {
                Transfer::AdvanceFrom(current) => {
                    if current.is_none() {
                        self.blocks[block].begin_execution();
                    }
                    let start = current.map_or(0, |index| index + 1);
                    self.blocks[block].next_runnable_from(start)
                }
                Transfer::JumpTo(target) => self.blocks[block].next_runnable_from(target),
                Transfer::Halt => None,
            };

            let Some(index) = next else {
                self.blocks[block].halt();
                return;
            };

            self.blocks[block].activate(index);
            if let Some(delay) = self.step_delay {
                self.blocks[block].set_pending(index, delay);
                return;
            }
            transfer = self.enter_command(block, index);
        }
    }

    pub(crate) fn enter_command(&mut self, block: usize, index: usize) -> Transfer {
        let Some(command) = self.blocks[block].command(index) else {
            return Transfer::Halt;
        };
        let payload = command.payload.clone();
        debug!(
            block = %self.blocks[block].name,
            index,
            summary = %command.summary(&self.variables),
            "entering command"
        );

        match payload {
            CommandPayload::Comment { .. } | CommandPayload::Label { .. } => {
                Transfer::AdvanceFrom(Some(index))
            }
            CommandPayload::SetVariable {
                variable,
                operator,
                operands,
            } => {
                self.run_set_variable(variable.as_deref(), operator, &operands);
                Transfer::AdvanceFrom(Some(index))
            }
            CommandPayload::If {
                variable,
                operator,
                operands,
            } => self.run_if(block, index, variable.as_deref(), operator, &operands),
            CommandPayload::Else => self.run_else(block, index),
            CommandPayload::End { loop_back_index } => match loop_back_index {
                Some(target) => Transfer::JumpTo(target),
                None => Transfer::AdvanceFrom(Some(index)),
            },
            CommandPayload::ForEach {
                collection,
                item,
                cur_index,
            } => self.run_for_each(
                block,
                index,
                collection.as_deref(),
                item.as_deref(),
                cur_index,
            ),
            CommandPayload::CollectionCommand { collection, op } => {
                if let Err(error) = self.run_collection_command(collection.as_deref(), &op) {
                    warn!(
                        block = %self.blocks[block].name,
                        index,
                        %error,
                        "collection command dropped"
                    );
                }
                Transfer::AdvanceFrom(Some(index))
            }
            CommandPayload::Jump { target } => self.run_jump(block, index, &target),
            CommandPayload::StopBlock => Transfer::Halt,
        }
    }

    fn run_set_variable(
        &mut self,
        variable: Option<&str>,
        operator: SetOperator,
        operands: &OperandCells,
    ) {
        let Some(name) = variable else {
            warn!("set-variable command has no variable selected");
            return;
        };
        let Some(kind) = self.variables.scalar_kind(name) else {
            warn!(variable = name, "set-variable target is not a declared scalar");
            return;
        };
        let Some(operand) = operands.resolve(kind, &self.variables) else {
            warn!(variable = name, kind = kind.name(), "set-variable has no operand for kind");
            return;
        };
        let current = match self.variables.scalar(name) {
            Ok(scalar) => scalar.clone(),
            Err(error) => {
                warn!(%error, "set-variable target unavailable");
                return;
            }
        };

        let next = apply_set_operator(&current, &operand, operator);
        match next {
            Some(value) => {
                if let Err(error) = self.variables.set_scalar(name, value) {
                    warn!(%error, "set-variable write rejected");
                }
            }
            None => warn!(
                variable = name,
                kind = kind.name(),
                operator = operator.symbol(),
                "set operator unsupported for kind; command skipped"
            ),
        }
    }
}

fn apply_set_operator(current: &Scalar, operand: &Scalar, operator: SetOperator) -> Option<Scalar> {
    match (current, operand) {
        (Scalar::Boolean(_), Scalar::Boolean(rhs)) => match operator {
            SetOperator::Assign => Some(Scalar::Boolean(*rhs)),
            SetOperator::Negate => Some(Scalar::Boolean(!rhs)),
            _ => None,
        },
        (Scalar::Integer(lhs), Scalar::Integer(rhs)) => match operator {
            SetOperator::Assign => Some(Scalar::Integer(*rhs)),
            SetOperator::Negate => Some(Scalar::Integer(rhs.wrapping_neg())),
            SetOperator::Add => Some(Scalar::Integer(lhs.wrapping_add(*rhs))),
            SetOperator::Subtract => Some(Scalar::Integer(lhs.wrapping_sub(*rhs))),
            SetOperator::Multiply => Some(Scalar::Integer(lhs.wrapping_mul(*rhs))),
            SetOperator::Divide => lhs.checked_div(*rhs).map(Scalar::Integer),
        },
        (Scalar::Float(lhs), Scalar::Float(rhs)) => match operator {
            SetOperator::Assign => Some(Scalar::Float(*rhs)),
            SetOperator::Negate => Some(Scalar::Float(-rhs)),
            SetOperator::Add => Some(Scalar::Float(lhs + rhs)),
            SetOperator::Subtract => Some(Scalar::Float(lhs - rhs)),
            SetOperator::Multiply => Some(Scalar::Float(lhs * rhs)),
            SetOperator::Divide => Some(Scalar::Float(lhs / rhs)),
        },
        (Scalar::Str(lhs), Scalar::Str(rhs)) => match operator {
            SetOperator::Assign => Some(Scalar::Str(rhs.clone())),
            SetOperator::Add => Some(Scalar::Str(format!("{}{}", lhs, rhs))),
            _ => None,
        },
        _ => None,
    }
}
