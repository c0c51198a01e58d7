use std::cell::RefCell;
use std::rc::Weak;

use crate::edge::ObserverId;
use crate::runtime::RuntimeInner;

/// External handle owning one reaction.
///
/// [`Disposer::dispose`] severs the reaction permanently; it is
/// idempotent, including after the reaction disposed itself from
/// within its own run. Dropping the handle does NOT dispose the
/// reaction — an undisposed reaction stays subscribed until its
/// runtime is dropped.
pub struct Disposer {
	runtime: Weak<RefCell<RuntimeInner>>,
	observer: ObserverId,
}

impl Disposer {
	pub(crate) fn new(runtime: Weak<RefCell<RuntimeInner>>, observer: ObserverId) -> Self {
		Disposer {
			runtime,
			observer,
		}
	}

	/// Detaches and destroys the owned reaction; it will never run
	/// again. Safe to call at any time, any number of times.
	pub fn dispose(&self) {
		if let Some(inner) = self.runtime.upgrade() {
			let retired = inner.borrow_mut().remove_observer(self.observer);
			// The computation can hold observables that re-borrow the
			// runtime when released.
			drop(retired);
		}
	}

	/// Whether the owned reaction is gone, either through this handle
	/// or through its own in-run disposal.
	pub fn is_disposed(&self) -> bool {
		match self.runtime.upgrade() {
			Some(inner) => !inner.borrow().is_live(self.observer),
			None => true,
		}
	}
}
