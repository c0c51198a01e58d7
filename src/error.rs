use std::error::Error as StdError;

/// Failure payload produced by a fallible reaction or action body.
pub type BoxError = Box<dyn StdError + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// An observable can only be changed inside `run_in_action` or
	/// inside a running reaction.
	#[error("observable can only be changed inside an action")]
	IllegalMutation,

	/// A reaction failed while the flush was rerunning it. The flush
	/// keeps going; the first failure in batch order is reported.
	#[error("reaction failed during flush")]
	Reaction(#[source] BoxError),

	/// The body passed to `try_run_in_action` failed. The flush still
	/// ran before this was reported.
	#[error("action body failed")]
	Action(#[source] BoxError),
}

impl Error {
	pub fn is_illegal_mutation(&self) -> bool {
		matches!(self, Error::IllegalMutation)
	}
}
