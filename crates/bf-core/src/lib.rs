pub mod cell;
pub mod collection;
pub mod compare;
pub mod error;
pub mod rng;
pub mod value;
pub mod variable;

pub use cell::ValueCell;
pub use collection::{AnyCollection, Collection, Element, Operand};
pub use compare::CompareOperator;
pub use error::FlowError;
pub use value::{Kind, ObjectRef, Scalar};
pub use variable::{Variable, VariableStore, VariableValue};
