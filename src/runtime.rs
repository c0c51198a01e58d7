use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::disposer::Disposer;
use crate::edge::{CellId, Edge, EdgeId, ObserverId};
use crate::error::{BoxError, Error};
use crate::observer::{Computation, ObserverState, Reaction};

/// The host-owned reactive context.
///
/// One `Runtime` owns one dependency graph: the cell/observer/edge
/// arenas, the transaction nesting depth and the pending-write queue.
/// It is confined to a single logical execution context (`Rc` inside),
/// so independent runtimes never share state. Cloning the handle is
/// cheap and refers to the same graph.
pub struct Runtime {
	inner: Rc<RefCell<RuntimeInner>>,
}

impl Clone for Runtime {
	fn clone(&self) -> Self {
		Runtime {
			inner: self.inner.clone(),
		}
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Runtime::new()
	}
}

pub(crate) struct RuntimeInner {
	next_id: u64,
	/// Nesting depth of open mutation scopes: `run_in_action` bodies
	/// and running reaction bodies. Writes are legal iff non-zero.
	depth: usize,
	/// Cells with an outstanding write, in first-write order. A cell
	/// registers here at most once until the flush drains it.
	pending_writes: Vec<CellId>,
	/// One frame per currently-running reaction, innermost last.
	frames: Vec<Frame>,
	cells: FxHashMap<CellId, CellRecord>,
	observers: FxHashMap<ObserverId, ObserverState>,
	edges: FxHashMap<EdgeId, Edge>,
}

/// Reads recorded while one reaction body runs, in read order,
/// deduplicated per frame.
#[derive(Default)]
struct Frame {
	reads: Vec<CellId>,
	seen: FxHashSet<CellId>,
}

pub(crate) struct CellRecord {
	edges: SmallVec<[EdgeId; 4]>,
	pending_write: bool,
}

impl Runtime {
	pub fn new() -> Self {
		Runtime {
			inner: Rc::new(RefCell::new(RuntimeInner {
				next_id: 0,
				depth: 0,
				pending_writes: Vec::new(),
				frames: Vec::new(),
				cells: FxHashMap::default(),
				observers: FxHashMap::default(),
				edges: FxHashMap::default(),
			})),
		}
	}

	pub(crate) fn handle(&self) -> Weak<RefCell<RuntimeInner>> {
		Rc::downgrade(&self.inner)
	}

	pub(crate) fn register_cell(&self) -> CellId {
		self.inner.borrow_mut().register_cell()
	}

	/// True while a mutation scope is open on this runtime.
	pub fn in_action(&self) -> bool {
		self.inner.borrow().in_action()
	}

	/// Opens a transaction, runs `body`, and flushes on exit when this
	/// was the outermost scope. Nested calls only accumulate writes
	/// for the outermost scope to flush.
	pub fn run_in_action(&self, body: impl FnOnce()) -> Result<(), Error> {
		self.enter();
		body();
		if self.leave() {
			self.flush(None)
		} else {
			Ok(())
		}
	}

	/// Like [`Runtime::run_in_action`] for a fallible body. The flush
	/// still runs after a body failure; the body's error is reported
	/// and shadows any flush error.
	pub fn try_run_in_action(
		&self,
		body: impl FnOnce() -> Result<(), BoxError>,
	) -> Result<(), Error> {
		self.enter();
		let outcome = body();
		let flushed = if self.leave() { self.flush(None) } else { Ok(()) };
		match outcome {
			Ok(()) => flushed,
			Err(err) => {
				if let Err(shadowed) = flushed {
					tracing::debug!(error = %shadowed, "flush failure shadowed by action failure");
				}
				Err(Error::Action(err))
			}
		}
	}

	/// Creates a reaction, runs it once immediately to establish its
	/// subscriptions, and returns the handle that can sever it.
	pub fn autorun(&self, mut f: impl FnMut() + 'static) -> Result<Disposer, Error> {
		self.spawn(Computation::Plain(Box::new(move || {
			f();
			Ok(())
		})))
	}

	/// [`Runtime::autorun`] for a computation that wants the per-run
	/// [`Reaction`] handle so it can dispose itself.
	pub fn autorun_with(&self, mut f: impl FnMut(&Reaction) + 'static) -> Result<Disposer, Error> {
		self.spawn(Computation::WithHandle(Box::new(move |reaction| {
			f(reaction);
			Ok(())
		})))
	}

	pub fn try_autorun(
		&self,
		f: impl FnMut() -> Result<(), BoxError> + 'static,
	) -> Result<Disposer, Error> {
		self.spawn(Computation::Plain(Box::new(f)))
	}

	pub fn try_autorun_with(
		&self,
		f: impl FnMut(&Reaction) -> Result<(), BoxError> + 'static,
	) -> Result<Disposer, Error> {
		self.spawn(Computation::WithHandle(Box::new(f)))
	}

	fn enter(&self) {
		self.inner.borrow_mut().depth += 1;
	}

	/// Returns true when the scope being left was the outermost one.
	fn leave(&self) -> bool {
		let mut inner = self.inner.borrow_mut();
		inner.depth -= 1;
		inner.depth == 0
	}

	fn spawn(&self, computation: Computation) -> Result<Disposer, Error> {
		let (id, nested) = {
			let mut inner = self.inner.borrow_mut();
			let id = ObserverId(inner.next_id());
			inner.observers.insert(id, ObserverState::new(computation));
			(id, inner.in_action())
		};
		let disposer = Disposer::new(self.handle(), id);
		let outcome = if nested {
			// Created inside an action or a running reaction: run it
			// inline; its writes join the enclosing flush.
			self.run_observer(id).map_err(Error::Reaction)
		} else {
			self.flush(Some(id))
		};
		match outcome {
			Ok(()) => Ok(disposer),
			Err(err) => {
				// The establishing run failed somewhere in the
				// cascade; tear the new reaction down rather than
				// hand back a handle alongside an error.
				disposer.dispose();
				Err(err)
			}
		}
	}

	/// The fix-point notification loop, executed by the outermost
	/// scope on exit (or seeded with a freshly created reaction).
	///
	/// Each iteration drains the pending-write queue in write order,
	/// collects every subscribed observer into an ordered batch (an
	/// observer hit twice moves to the back, so it fires at most once
	/// per iteration), and reruns the batch. Reruns may write further
	/// cells; the loop ends when an iteration collects nothing.
	/// Failures never abort the loop; the first one in batch order is
	/// reported once the loop is done.
	fn flush(&self, mut seed: Option<ObserverId>) -> Result<(), Error> {
		let mut failure: Option<BoxError> = None;
		loop {
			let batch = {
				let inner = &mut *self.inner.borrow_mut();
				let mut batch: Vec<ObserverId> = Vec::new();
				let mut members: FxHashSet<ObserverId> = FxHashSet::default();
				if let Some(id) = seed.take() {
					members.insert(id);
					batch.push(id);
				}
				let written = std::mem::take(&mut inner.pending_writes);
				for cell_id in written {
					let edges = match inner.cells.get_mut(&cell_id) {
						Some(cell) => {
							cell.pending_write = false;
							cell.edges.clone()
						}
						// The cell was dropped while pending.
						None => continue,
					};
					for edge_id in edges {
						let observer = match inner.edges.get(&edge_id) {
							Some(edge) => edge.observer,
							None => continue,
						};
						if !members.insert(observer) {
							if let Some(at) = batch.iter().position(|id| *id == observer) {
								batch.remove(at);
							}
						}
						batch.push(observer);
					}
				}
				batch
			};

			if batch.is_empty() {
				break;
			}

			tracing::trace!(observers = batch.len(), "flush iteration");

			for id in batch {
				if let Err(err) = self.run_observer(id) {
					if failure.is_none() {
						failure = Some(err);
					} else {
						tracing::debug!(error = %err, "later reaction failure dropped");
					}
				}
			}
		}
		match failure {
			None => Ok(()),
			Some(err) => Err(Error::Reaction(err)),
		}
	}

	/// Runs one observer: drop its old subscriptions, execute the
	/// computation under a fresh read frame, then rebuild its edge set
	/// from the reads of this run.
	fn run_observer(&self, id: ObserverId) -> Result<(), BoxError> {
		let mut computation = {
			let inner = &mut *self.inner.borrow_mut();
			let state = match inner.observers.get_mut(&id) {
				Some(state) => state,
				// Disposed after it was batched.
				None => return Ok(()),
			};
			let computation = match state.computation.take() {
				Some(computation) => computation,
				None => return Ok(()),
			};
			let stale = std::mem::take(&mut state.edges);
			inner.detach_edges(&stale);
			inner.frames.push(Frame::default());
			inner.depth += 1;
			computation
		};

		// The runtime is unborrowed here: the body is free to read and
		// write cells, open actions, create or dispose reactions.
		let handle = Reaction::new();
		let result = computation.invoke(&handle);

		let mut retired: Option<Computation> = None;
		{
			let inner = &mut *self.inner.borrow_mut();
			inner.depth -= 1;
			let frame = inner.frames.pop().unwrap_or_default();
			if !inner.observers.contains_key(&id) {
				// Disposed externally while it was running.
				retired = Some(computation);
			} else if handle.is_disposed() {
				if let Some(state) = inner.observers.remove(&id) {
					inner.detach_edges(&state.edges);
				}
				retired = Some(computation);
			} else {
				if let Some(state) = inner.observers.get_mut(&id) {
					state.computation = Some(computation);
				}
				// A failed run keeps no subscriptions: the reaction
				// goes dark until something recreates it.
				if result.is_ok() {
					for cell_id in frame.reads {
						inner.connect(cell_id, id);
					}
				}
			}
		}
		// Dropping the computation can drop captured observables,
		// which re-borrow the runtime to release their cells.
		drop(retired);
		result
	}
}

impl RuntimeInner {
	fn next_id(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	pub(crate) fn in_action(&self) -> bool {
		self.depth > 0
	}

	pub(crate) fn register_cell(&mut self) -> CellId {
		let id = CellId(self.next_id());
		self.cells.insert(
			id,
			CellRecord {
				edges: SmallVec::new_const(),
				pending_write: false,
			},
		);
		id
	}

	/// Removes a cell and severs its edges from both sides. A stale id
	/// left in the pending queue is skipped at flush time.
	pub(crate) fn release_cell(&mut self, id: CellId) {
		if let Some(cell) = self.cells.remove(&id) {
			for edge_id in cell.edges {
				if let Some(edge) = self.edges.remove(&edge_id) {
					if let Some(state) = self.observers.get_mut(&edge.observer) {
						state.edges.retain(|e| *e != edge_id);
					}
				}
			}
		}
	}

	/// Tracked read: recorded once per frame, only while a reaction is
	/// running.
	pub(crate) fn on_get(&mut self, id: CellId) {
		if let Some(frame) = self.frames.last_mut() {
			if frame.seen.insert(id) {
				frame.reads.push(id);
			}
		}
	}

	/// Tracked write: first registration wins; the cell stays claimed
	/// until the flush drains it, so later writes in nested scopes
	/// only update the stored value.
	pub(crate) fn on_set(&mut self, id: CellId) -> Result<(), Error> {
		if self.depth == 0 {
			return Err(Error::IllegalMutation);
		}
		if let Some(cell) = self.cells.get_mut(&id) {
			if !cell.pending_write {
				cell.pending_write = true;
				self.pending_writes.push(id);
			}
		}
		Ok(())
	}

	/// Removes the observer and severs its edges. Returns the retired
	/// computation so the caller can drop it outside the runtime
	/// borrow; `None` when the observer was mid-run or already gone.
	pub(crate) fn remove_observer(&mut self, id: ObserverId) -> Option<Computation> {
		let state = self.observers.remove(&id)?;
		self.detach_edges(&state.edges);
		state.computation
	}

	pub(crate) fn is_live(&self, id: ObserverId) -> bool {
		self.observers.contains_key(&id)
	}

	fn detach_edges(&mut self, edges: &[EdgeId]) {
		for edge_id in edges {
			if let Some(edge) = self.edges.remove(edge_id) {
				if let Some(cell) = self.cells.get_mut(&edge.cell) {
					cell.edges.retain(|e| e != edge_id);
				}
				if let Some(state) = self.observers.get_mut(&edge.observer) {
					state.edges.retain(|e| e != edge_id);
				}
			}
		}
	}

	fn connect(&mut self, cell: CellId, observer: ObserverId) {
		// Either endpoint can be gone by the time the run settles.
		if !self.cells.contains_key(&cell) || !self.observers.contains_key(&observer) {
			return;
		}
		let id = EdgeId(self.next_id());
		self.edges.insert(
			id,
			Edge {
				cell,
				observer,
			},
		);
		if let Some(record) = self.cells.get_mut(&cell) {
			record.edges.push(id);
		}
		if let Some(state) = self.observers.get_mut(&observer) {
			state.edges.push(id);
		}
	}
}
