//! Per-column value wrapper tracking modified state, so an UPDATE's SET
//! clause contains only modified non-key fields.

use std::ops::{Deref, DerefMut};

/// Primary-key semantics declared on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyKind {
    /// Not a primary key.
    None,
    /// Client-assigned if unset: a fresh GUID for GUID keys, else `MAX(pk) + 1`.
    AutoAssign,
    /// Database-assigned; omitted from INSERT and read back via the dialect's
    /// last-insert-id query.
    ServerSideAutoIncrement,
}

/// Wraps a column value together with a dirty flag the mapper consults to
/// build minimal `UPDATE ... SET` clauses and to decide which fields
/// participate in `INSERT`.
#[derive(Debug, Clone, Default)]
pub struct Field<T> {
    value: T,
    modified: bool,
}

impl<T> Field<T> {
    pub fn new(value: T) -> Self {
        Self { value, modified: false }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Field<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

/// Borrowing the value mutably through the field is assumed to modify it —
/// a caller reaching for `&mut` almost always intends to change the value,
/// so this marks modified unconditionally rather than trying to detect a
/// no-op write after the fact.
impl<T> DerefMut for Field<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.modified = true;
        &mut self.value
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: PartialEq> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_field_is_unmodified() {
        let f = Field::new(5i32);
        assert!(!f.is_modified());
        assert_eq!(*f.get(), 5);
    }

    #[test]
    fn set_marks_modified() {
        let mut f = Field::new(5i32);
        f.set(6);
        assert!(f.is_modified());
        assert_eq!(*f, 6);
    }

    #[test]
    fn clear_modified_resets_flag() {
        let mut f = Field::new(5i32);
        f.set(6);
        f.clear_modified();
        assert!(!f.is_modified());
    }
}
