pub use enclose::*;

/// `autorun!((a, b) rt => { ... })` clones `a` and `b` into the
/// reaction body before handing it to [`Runtime::autorun`].
///
/// [`Runtime::autorun`]: crate::Runtime::autorun
#[macro_export]
macro_rules! autorun {
	(( $($d_tt:tt)* ) $rt:expr => $($b:tt)*) => {
		$rt.autorun($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
	};
	($rt:expr => $($b:tt)*) => {
		$rt.autorun(move || { $($b)* })
	};
}

/// `action!((a) rt => { ... })` clones `a` into the body and runs it
/// through [`Runtime::run_in_action`].
///
/// [`Runtime::run_in_action`]: crate::Runtime::run_in_action
#[macro_export]
macro_rules! action {
	(( $($d_tt:tt)* ) $rt:expr => $($b:tt)*) => {
		$rt.run_in_action($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
	};
	($rt:expr => $($b:tt)*) => {
		$rt.run_in_action(move || { $($b)* })
	};
}
