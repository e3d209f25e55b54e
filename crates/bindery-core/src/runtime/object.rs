//! Runtime objects carrying native data.
//!
//! An [`ObjectRef`] is the runtime's handle to an object. Objects of data
//! classes own at most one native instance in their data slot, together with
//! the [`DataType`] describing how to release it. When the last handle goes
//! away the runtime finalizes the object and the data type's `free` callback
//! receives the instance.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use super::ClassId;
use crate::RuntimeError;

/// Describes the native payload of a data object.
///
/// Equivalent of a data type record in C runtimes: a name for diagnostics and
/// the callback that releases the payload on finalization.
pub struct DataType {
    name: String,
    free: Box<dyn Fn(Box<dyn Any>)>,
}

impl DataType {
    /// Create a data type with a release callback.
    pub fn new(name: impl Into<String>, free: impl Fn(Box<dyn Any>) + 'static) -> Self {
        Self {
            name: name.into(),
            free: Box::new(free),
        }
    }

    /// The data type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release a payload through this type's callback.
    pub fn free(&self, data: Box<dyn Any>) {
        (self.free)(data)
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Errors reaching into an object's data slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// The slot is empty: never constructed or already finalized.
    #[error("uninitialized {class} object")]
    Uninitialized { class: String },

    /// The slot holds a different native type.
    #[error("wrong argument type {actual} (expected {expected})")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// The slot is already borrowed incompatibly by an outer call.
    #[error("{class} object is already in use")]
    Busy { class: String },
}

impl From<DataError> for RuntimeError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Uninitialized { class } => RuntimeError::Uninitialized { class },
            DataError::Busy { class } => RuntimeError::Busy { class },
            err @ DataError::TypeMismatch { .. } => RuntimeError::type_error(err.to_string()),
        }
    }
}

#[derive(Default)]
struct DataSlot {
    data_type: Option<Rc<DataType>>,
    data: Option<Box<dyn Any>>,
}

impl DataSlot {
    fn release(&mut self) -> bool {
        let Some(data) = self.data.take() else {
            return false;
        };
        match &self.data_type {
            Some(data_type) => {
                tracing::trace!(data_type = data_type.name(), "finalizing native data");
                data_type.free(data);
            }
            None => drop(data),
        }
        true
    }
}

struct RObject {
    class: ClassId,
    class_name: Rc<str>,
    slot: RefCell<DataSlot>,
    /// Mirrors `slot.data.is_some()`; readable while the slot is borrowed.
    initialized: Cell<bool>,
}

impl Drop for RObject {
    fn drop(&mut self) {
        self.slot.get_mut().release();
    }
}

/// Reference-counted handle to a runtime object.
///
/// Cloning the handle clones the runtime reference, never the native data.
#[derive(Clone)]
pub struct ObjectRef(Rc<RObject>);

impl ObjectRef {
    /// Allocate a fresh object of `class` with an empty data slot.
    pub fn new(class: ClassId, class_name: Rc<str>) -> Self {
        ObjectRef(Rc::new(RObject {
            class,
            class_name,
            slot: RefCell::new(DataSlot::default()),
            initialized: Cell::new(false),
        }))
    }

    pub fn class(&self) -> ClassId {
        self.0.class
    }

    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    /// Whether both handles refer to the same runtime object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this object.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Set the data type without touching the payload.
    pub fn set_data_type(&self, data_type: Rc<DataType>) -> Result<(), DataError> {
        let mut slot = self.slot_mut()?;
        slot.data_type = Some(data_type);
        Ok(())
    }

    pub fn data_type(&self) -> Option<Rc<DataType>> {
        self.0.slot.try_borrow().ok()?.data_type.clone()
    }

    /// Store a native payload, releasing any previous one first.
    ///
    /// Passing `None` leaves the slot empty (a failed construction).
    pub fn attach(&self, data: Option<Box<dyn Any>>) -> Result<(), DataError> {
        let mut slot = self.slot_mut()?;
        slot.release();
        self.0.initialized.set(data.is_some());
        slot.data = data;
        Ok(())
    }

    /// Release the payload now instead of at finalization.
    ///
    /// Returns `true` if a payload was released.
    pub fn release(&self) -> Result<bool, DataError> {
        let released = self.slot_mut()?.release();
        self.0.initialized.set(false);
        Ok(released)
    }

    /// Whether the data slot currently holds a native instance, also while
    /// a call has it borrowed.
    pub fn is_initialized(&self) -> bool {
        self.0.initialized.get()
    }

    /// Borrow the native payload as `T` for the duration of `f`.
    pub fn with_data<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, DataError> {
        let slot = self.0.slot.try_borrow().map_err(|_| self.busy())?;
        let data = slot.data.as_ref().ok_or_else(|| self.uninitialized())?;
        let this = data
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>(&slot))?;
        Ok(f(this))
    }

    /// Mutably borrow the native payload as `T` for the duration of `f`.
    pub fn with_data_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, DataError> {
        let mut slot = self.slot_mut()?;
        let actual = self.actual_type_name(&slot);
        let data = slot.data.as_mut().ok_or_else(|| self.uninitialized())?;
        let this = data
            .downcast_mut::<T>()
            .ok_or_else(|| DataError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual,
            })?;
        Ok(f(this))
    }

    fn slot_mut(&self) -> Result<std::cell::RefMut<'_, DataSlot>, DataError> {
        self.0.slot.try_borrow_mut().map_err(|_| self.busy())
    }

    fn busy(&self) -> DataError {
        DataError::Busy {
            class: self.class_name().to_string(),
        }
    }

    fn uninitialized(&self) -> DataError {
        DataError::Uninitialized {
            class: self.class_name().to_string(),
        }
    }

    fn actual_type_name(&self, slot: &DataSlot) -> String {
        slot.data_type
            .as_ref()
            .map(|dt| dt.name().to_string())
            .unwrap_or_else(|| self.class_name().to_string())
    }

    fn mismatch<T>(&self, slot: &DataSlot) -> DataError {
        DataError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: self.actual_type_name(slot),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("class", &self.0.class)
            .field("class_name", &self.0.class_name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
