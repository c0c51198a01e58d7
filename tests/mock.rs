use std::sync::{Arc, Mutex, MutexGuard};

use mockall::*;

#[automock]
pub trait Spy {
	fn trigger(&self, value: i64);
}

/// Shared handle so a reaction body and the test can both poke the
/// same expectations.
#[derive(Clone)]
pub struct SharedSpy(Arc<Mutex<MockSpy>>);

impl SharedSpy {
	pub fn new() -> SharedSpy {
		SharedSpy(Arc::new(Mutex::new(MockSpy::new())))
	}

	pub fn get<'a>(&'a self) -> MutexGuard<'a, MockSpy> {
		self.0.lock().unwrap()
	}
}
