pub mod block;
pub mod command;
mod collection_ops;
mod control_flow;
mod engine;

pub use block::Block;
pub use command::{Command, CommandPayload, CollectionOp, ItemSource, OperandCells, SetOperator};
pub use engine::{Engine, EngineOptions};
