use std::cell::Cell;

use smallvec::SmallVec;

use crate::edge::EdgeId;
use crate::error::BoxError;

/// The wrapped computation of a reaction.
///
/// The two shapes are picked at construction time: a plain body, or a
/// body that wants the per-run [`Reaction`] handle so it can dispose
/// itself. Fallibility is normalized here; the infallible `autorun`
/// constructors wrap their closure with `Ok(())`.
pub(crate) enum Computation {
	Plain(Box<dyn FnMut() -> Result<(), BoxError>>),
	WithHandle(Box<dyn FnMut(&Reaction) -> Result<(), BoxError>>),
}

impl Computation {
	pub(crate) fn invoke(&mut self, handle: &Reaction) -> Result<(), BoxError> {
		match self {
			Computation::Plain(f) => f(),
			Computation::WithHandle(f) => f(handle),
		}
	}
}

/// Per-run disposal handle passed to `autorun_with` computations.
///
/// Calling [`Reaction::dispose`] does not interrupt the current run;
/// the engine checks the mark after the computation returns, drops the
/// observer's record and builds no new subscriptions, so the reaction
/// never runs again.
pub struct Reaction {
	disposed: Cell<bool>,
}

impl Reaction {
	pub(crate) fn new() -> Self {
		Reaction {
			disposed: Cell::new(false),
		}
	}

	pub fn dispose(&self) {
		self.disposed.set(true);
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.get()
	}
}

/// Arena record for one registered reaction.
///
/// `computation` is taken out of the record while the body runs, so
/// the runtime is not borrowed during user code; an absent computation
/// therefore means "currently running". `edges` always equals the set
/// of cells read during the last successful run.
pub(crate) struct ObserverState {
	pub(crate) computation: Option<Computation>,
	pub(crate) edges: SmallVec<[EdgeId; 4]>,
}

impl ObserverState {
	pub(crate) fn new(computation: Computation) -> Self {
		ObserverState {
			computation: Some(computation),
			edges: SmallVec::new_const(),
		}
	}
}
