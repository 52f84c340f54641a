use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::rng;
use crate::value::{Kind, ObjectRef, Scalar};
use crate::variable::{Variable, VariableValue};

/// An element kind a collection can be fixed to. The five implementations
/// below are the whole set; promotion and natural ordering are defined here
/// so the container itself never inspects kinds at runtime.
pub trait Element: Clone + PartialEq {
    const KIND: Kind;

    fn default_element() -> Self;
    fn natural_order(&self, other: &Self) -> Ordering;
    fn from_scalar(scalar: &Scalar) -> Option<Self>;
    fn into_scalar(self) -> Scalar;
}

impl Element for bool {
    const KIND: Kind = Kind::Boolean;

    fn default_element() -> Self {
        false
    }

    fn natural_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Boolean(self)
    }
}

impl Element for i64 {
    const KIND: Kind = Kind::Integer;

    fn default_element() -> Self {
        0
    }

    fn natural_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Integer(value) => Some(*value),
            _ => None,
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Integer(self)
    }
}

impl Element for f64 {
    const KIND: Kind = Kind::Float;

    fn default_element() -> Self {
        0.0
    }

    fn natural_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Float(self)
    }
}

impl Element for String {
    const KIND: Kind = Kind::Str;

    fn default_element() -> Self {
        String::new()
    }

    fn natural_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Str(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Str(self)
    }
}

impl Element for Option<ObjectRef> {
    const KIND: Kind = Kind::Object;

    fn default_element() -> Self {
        None
    }

    fn natural_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Object(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Object(self)
    }
}

/// A loosely supplied input to a collection mutation: either a bare value or
/// a variable expected to hold the collection's element kind.
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Value(&'a Scalar),
    Variable(&'a Variable),
}

impl Operand<'_> {
    /// Checked conversion into the requested element kind. Failure reports
    /// what was supplied; the caller leaves the collection untouched.
    pub fn promote<T: Element>(&self) -> Result<T, FlowError> {
        let promoted = match self {
            Self::Value(scalar) => T::from_scalar(scalar),
            Self::Variable(variable) => match &variable.value {
                VariableValue::Scalar(scalar) => T::from_scalar(scalar),
                VariableValue::Collection(_) => None,
            },
        };

        promoted.ok_or_else(|| {
            FlowError::new(
                "COLLECTION_PROMOTE",
                format!("Cannot promote {} to {}.", self.describe(), T::KIND.name()),
            )
        })
    }

    fn describe(&self) -> String {
        match self {
            Self::Value(scalar) => format!("a {} value", scalar.kind().name()),
            Self::Variable(variable) => {
                format!(
                    "variable \"{}\" ({})",
                    variable.name,
                    variable.kind_name()
                )
            }
        }
    }
}

/// Ordered container over a single element kind fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T: Element> {
    items: Vec<T>,
}

impl<T: Element> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Collection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn add_unique(&mut self, item: T) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    pub fn insert(&mut self, index: usize, item: T) -> Result<(), FlowError> {
        if index > self.items.len() {
            return Err(index_error(index, self.items.len()));
        }
        self.items.insert(index, item);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&T, FlowError> {
        self.items
            .get(index)
            .ok_or_else(|| index_error(index, self.items.len()))
    }

    pub fn set(&mut self, index: usize, item: T) -> Result<(), FlowError> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| index_error(index, len))?;
        *slot = item;
        Ok(())
    }

    /// Removes the first occurrence. Returns whether anything was removed.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|entry| entry == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every occurrence, returning how many were dropped.
    pub fn remove_all(&mut self, item: &T) -> usize {
        let before = self.items.len();
        self.items.retain(|entry| entry != item);
        before - self.items.len()
    }

    pub fn remove_at(&mut self, index: usize) -> Result<(), FlowError> {
        if index >= self.items.len() {
            return Err(index_error(index, self.items.len()));
        }
        self.items.remove(index);
        Ok(())
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|entry| entry == item)
    }

    pub fn last_index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().rposition(|entry| entry == item)
    }

    pub fn occurrences(&self, item: &T) -> usize {
        self.items.iter().filter(|entry| *entry == item).count()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
    }

    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| a.natural_order(b));
    }

    /// Swaps each position with an independently drawn uniform index
    /// (self-swaps allowed). This is deliberately not Fisher-Yates: the two
    /// algorithms are not distribution-equivalent, and this one preserves
    /// the long-observed behavior of existing scripts.
    pub fn shuffle(&mut self, rng_state: &mut u32) {
        let len = self.items.len();
        for i in 0..len {
            let j = rng::next_bounded(rng_state, len as u32) as usize;
            self.items.swap(i, j);
        }
    }

    /// Grows to `count` entries by padding with defaults. Never shrinks.
    pub fn resize(&mut self, count: usize) {
        while self.items.len() < count {
            self.items.push(T::default_element());
        }
    }

    /// Grows reserved capacity without changing count or contents.
    pub fn reserve(&mut self, count: usize) {
        if count > self.items.capacity() {
            self.items.reserve(count - self.items.len());
        }
    }
}

fn index_error(index: usize, len: usize) -> FlowError {
    FlowError::new(
        "COLLECTION_INDEX",
        format!("Index {} out of bounds for collection of {}.", index, len),
    )
}

/// The closed union over the five collection instantiations. This is what a
/// variable slot stores; all operations promote their input first and leave
/// the collection unchanged on promotion failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "elementKind", content = "items", rename_all = "camelCase")]
pub enum AnyCollection {
    Boolean(Collection<bool>),
    Integer(Collection<i64>),
    Float(Collection<f64>),
    #[serde(rename = "string")]
    Str(Collection<String>),
    Object(Collection<Option<ObjectRef>>),
}

macro_rules! with_elements {
    ($any:expr, $col:ident => $body:expr) => {
        match $any {
            AnyCollection::Boolean($col) => $body,
            AnyCollection::Integer($col) => $body,
            AnyCollection::Float($col) => $body,
            AnyCollection::Str($col) => $body,
            AnyCollection::Object($col) => $body,
        }
    };
}

impl AnyCollection {
    pub fn new(element_kind: Kind) -> Self {
        match element_kind {
            Kind::Boolean => Self::Boolean(Collection::new()),
            Kind::Integer => Self::Integer(Collection::new()),
            Kind::Float => Self::Float(Collection::new()),
            Kind::Str => Self::Str(Collection::new()),
            Kind::Object => Self::Object(Collection::new()),
        }
    }

    pub fn from_scalars(element_kind: Kind, scalars: &[Scalar]) -> Result<Self, FlowError> {
        let mut collection = Self::new(element_kind);
        for scalar in scalars {
            collection.add(&Operand::Value(scalar))?;
        }
        Ok(collection)
    }

    pub fn element_kind(&self) -> Kind {
        match self {
            Self::Boolean(_) => Kind::Boolean,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Str(_) => Kind::Str,
            Self::Object(_) => Kind::Object,
        }
    }

    pub fn count(&self) -> usize {
        with_elements!(self, col => col.count())
    }

    pub fn capacity(&self) -> usize {
        with_elements!(self, col => col.capacity())
    }

    pub fn is_empty(&self) -> bool {
        with_elements!(self, col => col.is_empty())
    }

    pub fn is_compatible(&self, operand: &Operand<'_>) -> bool {
        compatible_with(self.element_kind(), operand)
    }

    pub fn add(&mut self, operand: &Operand<'_>) -> Result<(), FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            col.add(item);
            Ok(())
        })
    }

    pub fn add_unique(&mut self, operand: &Operand<'_>) -> Result<(), FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            col.add_unique(item);
            Ok(())
        })
    }

    pub fn insert(&mut self, index: usize, operand: &Operand<'_>) -> Result<(), FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            col.insert(index, item)
        })
    }

    pub fn set(&mut self, index: usize, operand: &Operand<'_>) -> Result<(), FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            col.set(index, item)
        })
    }

    pub fn remove(&mut self, operand: &Operand<'_>) -> Result<bool, FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            Ok(col.remove(&item))
        })
    }

    pub fn remove_all(&mut self, operand: &Operand<'_>) -> Result<usize, FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            Ok(col.remove_all(&item))
        })
    }

    pub fn remove_at(&mut self, index: usize) -> Result<(), FlowError> {
        with_elements!(self, col => col.remove_at(index))
    }

    pub fn contains(&self, operand: &Operand<'_>) -> Result<bool, FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            Ok(col.contains(&item))
        })
    }

    pub fn index_of(&self, operand: &Operand<'_>) -> Result<Option<usize>, FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            Ok(col.index_of(&item))
        })
    }

    pub fn last_index_of(&self, operand: &Operand<'_>) -> Result<Option<usize>, FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            Ok(col.last_index_of(&item))
        })
    }

    pub fn occurrences(&self, operand: &Operand<'_>) -> Result<usize, FlowError> {
        with_elements!(self, col => {
            let item = operand.promote()?;
            Ok(col.occurrences(&item))
        })
    }

    pub fn get_scalar(&self, index: usize) -> Result<Scalar, FlowError> {
        with_elements!(self, col => col.get(index).map(|item| item.clone().into_scalar()))
    }

    pub fn clear(&mut self) {
        with_elements!(self, col => col.clear());
    }

    pub fn reverse(&mut self) {
        with_elements!(self, col => col.reverse());
    }

    pub fn sort(&mut self) {
        with_elements!(self, col => col.sort());
    }

    pub fn shuffle(&mut self, rng_state: &mut u32) {
        with_elements!(self, col => col.shuffle(rng_state));
    }

    pub fn resize(&mut self, count: usize) {
        with_elements!(self, col => col.resize(count));
    }

    pub fn reserve(&mut self, count: usize) {
        with_elements!(self, col => col.reserve(count));
    }
}

fn compatible_with(element_kind: Kind, operand: &Operand<'_>) -> bool {
    let scalar_kind = match operand {
        Operand::Value(scalar) => Some(scalar.kind()),
        Operand::Variable(variable) => match &variable.value {
            VariableValue::Scalar(scalar) => Some(scalar.kind()),
            VariableValue::Collection(_) => None,
        },
    };
    scalar_kind == Some(element_kind)
}
