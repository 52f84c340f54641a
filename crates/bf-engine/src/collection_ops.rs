use bf_core::{FlowError, Operand, Scalar, ValueCell, Variable};

use crate::command::{CollectionOp, ItemSource};
use crate::engine::Engine;

/// An item source snapshotted into owned data before the target collection
/// is borrowed mutably. Capturing also fixes the element value at command
/// entry time.
enum CapturedSource {
    Value(Scalar),
    Variable(Variable),
}

impl CapturedSource {
    fn operand(&self) -> Operand<'_> {
        match self {
            Self::Value(scalar) => Operand::Value(scalar),
            Self::Variable(variable) => Operand::Variable(variable),
        }
    }
}

impl Engine {
    /// Applies one collection mutation. Any error leaves the collection
    /// unchanged; the caller logs it and the block continues.
    pub(crate) fn run_collection_command(
        &mut self,
        collection: Option<&str>,
        op: &CollectionOp,
    ) -> Result<(), FlowError> {
        let Some(name) = collection else {
            return Err(FlowError::new(
                "COLLECTION_TARGET",
                "No collection selected.".to_string(),
            ));
        };
        self.variables().collection(name)?;

        match op {
            CollectionOp::Add { source } => {
                let captured = self.capture_source(source)?;
                self.variables_mut()
                    .collection_mut(name)?
                    .add(&captured.operand())
            }
            CollectionOp::AddUnique { source } => {
                let captured = self.capture_source(source)?;
                self.variables_mut()
                    .collection_mut(name)?
                    .add_unique(&captured.operand())
            }
            CollectionOp::Insert { index, source } => {
                let at = self.resolve_index(index)?;
                let captured = self.capture_source(source)?;
                self.variables_mut()
                    .collection_mut(name)?
                    .insert(at, &captured.operand())
            }
            CollectionOp::Remove { source } => {
                let captured = self.capture_source(source)?;
                self.variables_mut()
                    .collection_mut(name)?
                    .remove(&captured.operand())
                    .map(|_| ())
            }
            CollectionOp::RemoveAll { source } => {
                let captured = self.capture_source(source)?;
                self.variables_mut()
                    .collection_mut(name)?
                    .remove_all(&captured.operand())
                    .map(|_| ())
            }
            CollectionOp::RemoveAt { index } => {
                let at = self.resolve_index(index)?;
                self.variables_mut().collection_mut(name)?.remove_at(at)
            }
            CollectionOp::Clear => {
                self.variables_mut().collection_mut(name)?.clear();
                Ok(())
            }
            CollectionOp::Reverse => {
                self.variables_mut().collection_mut(name)?.reverse();
                Ok(())
            }
            CollectionOp::Shuffle => {
                let (variables, rng_state) = self.variables_and_rng();
                variables.collection_mut(name)?.shuffle(rng_state);
                Ok(())
            }
            CollectionOp::Sort => {
                self.variables_mut().collection_mut(name)?.sort();
                Ok(())
            }
            CollectionOp::Resize { count } => {
                let count = self.resolve_index(count)?;
                self.variables_mut().collection_mut(name)?.resize(count);
                Ok(())
            }
            CollectionOp::Reserve { count } => {
                let count = self.resolve_index(count)?;
                self.variables_mut().collection_mut(name)?.reserve(count);
                Ok(())
            }
            CollectionOp::GetAt { index, target } => {
                let at = self.resolve_index(index)?;
                let Some(target) = target.as_deref() else {
                    return Err(FlowError::new(
                        "COLLECTION_TARGET",
                        "No target variable selected.".to_string(),
                    ));
                };
                let element = self.variables().collection(name)?.get_scalar(at)?;
                self.variables_mut().set_scalar(target, element)
            }
        }
    }

    fn capture_source(&self, source: &ItemSource) -> Result<CapturedSource, FlowError> {
        if let Some(name) = source.variable.as_deref() {
            let variable = self.variables().get(name).ok_or_else(|| {
                FlowError::new(
                    "VAR_MISSING",
                    format!("Variable \"{}\" is not declared.", name),
                )
            })?;
            return Ok(CapturedSource::Variable(variable.clone()));
        }
        match &source.literal {
            Some(scalar) => Ok(CapturedSource::Value(scalar.clone())),
            None => Err(FlowError::new(
                "COLLECTION_SOURCE",
                "No item value or variable supplied.".to_string(),
            )),
        }
    }

    /// Indices and counts arrive as integer cells; negative values are
    /// reported rather than wrapped.
    fn resolve_index(&self, cell: &ValueCell<i64>) -> Result<usize, FlowError> {
        let value = cell.resolve(self.variables());
        usize::try_from(value).map_err(|_| {
            FlowError::new(
                "COLLECTION_INDEX",
                format!("Index {} is negative.", value),
            )
        })
    }
}
