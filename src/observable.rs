use std::cell::{Ref, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::edge::CellId;
use crate::error::Error;
use crate::runtime::{Runtime, RuntimeInner};

/// A mutable value cell that reports its reads and writes to the
/// runtime's active transaction.
///
/// Handles are cheap to clone and share one cell. The value itself
/// lives in the handle body; the runtime only tracks the cell id, its
/// subscription edges and its pending-write claim.
pub struct Observable<T> {
	body: Rc<ObservableBody<T>>,
}

struct ObservableBody<T> {
	id: CellId,
	value: RefCell<T>,
	compare: Option<Box<dyn Fn(&T, &T) -> bool>>,
	runtime: Weak<RefCell<RuntimeInner>>,
}

impl<T> Clone for Observable<T> {
	fn clone(&self) -> Self {
		Observable {
			body: self.body.clone(),
		}
	}
}

impl<T> Observable<T>
where
	T: 'static,
{
	/// A cell comparing writes with `==`; equal writes are no-ops.
	pub fn new(runtime: &Runtime, value: T) -> Self
	where
		T: PartialEq,
	{
		Self::build(runtime, value, Some(Box::new(|a: &T, b: &T| a == b)))
	}

	/// A cell with a caller-supplied equality predicate.
	pub fn with_comparator(
		runtime: &Runtime,
		value: T,
		compare: impl Fn(&T, &T) -> bool + 'static,
	) -> Self {
		Self::build(runtime, value, Some(Box::new(compare)))
	}

	/// A cell whose writes always count as changes, for value types
	/// with no usable equality.
	pub fn opaque(runtime: &Runtime, value: T) -> Self {
		Self::build(runtime, value, None)
	}

	fn build(runtime: &Runtime, value: T, compare: Option<Box<dyn Fn(&T, &T) -> bool>>) -> Self {
		Observable {
			body: Rc::new(ObservableBody {
				id: runtime.register_cell(),
				value: RefCell::new(value),
				compare,
				runtime: runtime.handle(),
			}),
		}
	}

	/// Returns the stored value, subscribing the currently running
	/// reaction (if any) to this cell.
	pub fn get(&self) -> Ref<'_, T> {
		if let Some(inner) = self.body.runtime.upgrade() {
			inner.borrow_mut().on_get(self.body.id);
		}
		self.body.value.borrow()
	}

	/// Returns the stored value without subscribing anything.
	pub fn get_untracked(&self) -> Ref<'_, T> {
		self.body.value.borrow()
	}

	/// Writes a value. Fails with [`Error::IllegalMutation`] when no
	/// action is open on the owning runtime.
	pub fn set(&self, value: T) -> Result<(), Error> {
		self.replace(value).map(|_| ())
	}

	/// Like [`Observable::set`], returning the previous value. When
	/// the write is judged equal nothing is stored and the incoming
	/// value is handed back.
	pub fn replace(&self, value: T) -> Result<T, Error> {
		let inner = match self.body.runtime.upgrade() {
			Some(inner) => inner,
			// With the runtime gone no action can be open.
			None => return Err(Error::IllegalMutation),
		};
		if !inner.borrow().in_action() {
			return Err(Error::IllegalMutation);
		}
		let changed = match &self.body.compare {
			Some(compare) => !compare(&self.body.value.borrow(), &value),
			None => true,
		};
		if !changed {
			return Ok(value);
		}
		// First write claims the pending slot; the comparison above
		// used the pre-write value but the stored value always becomes
		// the newest write.
		inner.borrow_mut().on_set(self.body.id)?;
		Ok(self.body.value.replace(value))
	}
}

impl<T> Drop for ObservableBody<T> {
	fn drop(&mut self) {
		if let Some(inner) = self.runtime.upgrade() {
			inner.borrow_mut().release_cell(self.id);
		}
	}
}

impl<T> Debug for Observable<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get_untracked().fmt(f)
	}
}
