//! Ordered parameter storage for query builders.

use crate::types::{Param, ToParam};

/// Parameters collected while rendering a statement.
///
/// Indices handed out by [`ParamList::push`] are 1-based and start after
/// `offset`, so a fragment rendered into a list created with
/// [`ParamList::with_offset`] can be appended to SQL that already uses
/// `$1..$offset`.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
    offset: usize,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty list whose first placeholder is `$offset + 1`.
    pub fn with_offset(offset: usize) -> Self {
        Self {
            params: Vec::new(),
            offset,
        }
    }

    /// Encode and add a value, returning its placeholder index.
    pub fn push<T: ToParam>(&mut self, value: T) -> usize {
        self.push_param(Param::new(&value))
    }

    /// Add a pre-encoded param, returning its placeholder index.
    pub fn push_param(&mut self, param: Param) -> usize {
        self.params.push(param);
        self.offset + self.params.len()
    }

    /// Number of params stored in this list (the offset is not counted).
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_slice(&self) -> &[Param] {
        &self.params
    }

    pub fn into_vec(self) -> Vec<Param> {
        self.params
    }

    /// Append another list's parameters.
    pub fn extend(&mut self, other: &ParamList) {
        self.params.extend(other.params.iter().cloned());
    }
}
