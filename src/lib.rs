//! Transactional fine-grained observables with autorun reactions.
//!
//! A [`Runtime`] owns one dependency graph. [`Observable`] cells hold
//! values; [`Runtime::autorun`] reactions rerun whenever a cell they
//! read last time changes. Writes are only legal inside an action
//! (or a running reaction) and are batched: the outermost scope exit
//! reruns exactly the affected reactions, once each, resubscribing
//! them from the reads of the new run.
//!
//! ```
//! use reflux::{Observable, Runtime};
//!
//! let rt = Runtime::new();
//! let x = Observable::new(&rt, 1);
//!
//! let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
//! let disposer = rt
//! 	.autorun({
//! 		let x = x.clone();
//! 		let seen = seen.clone();
//! 		move || seen.borrow_mut().push(*x.get())
//! 	})
//! 	.unwrap();
//!
//! rt.run_in_action(|| {
//! 	x.set(2).unwrap();
//! })
//! .unwrap();
//!
//! assert_eq!(*seen.borrow(), vec![1, 2]);
//! disposer.dispose();
//! ```

pub mod macros;

mod disposer;
mod edge;
mod error;
mod observable;
mod observer;
mod runtime;

pub use disposer::Disposer;
pub use error::{BoxError, Error};
pub use observable::Observable;
pub use observer::Reaction;
pub use runtime::Runtime;
