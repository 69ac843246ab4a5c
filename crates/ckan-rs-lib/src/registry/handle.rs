use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use super::Registry;

/// Shared access to one registry.
///
/// Any number of readers may hold the registry at once. Changes go through [`RegistryHandle::transaction`],
/// which works on a copy and only replaces the shared registry when every step succeeded.
#[derive(Debug, Clone, Default)]
pub struct RegistryHandle {
	inner: Arc<RwLock<Registry>>,
	/// Held for a whole transaction, the registry itself is only write locked to publish.
	writer: Arc<Mutex<()>>,
}

impl RegistryHandle {
	pub fn new(registry: Registry) -> Self {
		Self {
			inner: Arc::new(RwLock::new(registry)),
			writer: Arc::new(Mutex::new(())),
		}
	}

	pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
		self.inner.read()
	}

	/// An owned copy, unaffected by later transactions.
	pub fn snapshot(&self) -> Registry {
		self.inner.read().clone()
	}

	/// Applies `f` to a copy of the registry, publishing the copy only when `f` returns `Ok`.
	///
	/// Writers are serialized, readers keep seeing the previous registry until the transaction completes.
	pub fn transaction<T>(&self, f: impl FnOnce(&mut Registry) -> crate::Result<T>) -> crate::Result<T> {
		let _writer = self.writer.lock();
		let mut working = self.inner.read().clone();
		let result = f(&mut working);
		match &result {
			Ok(_) => *self.inner.write() = working,
			Err(e) => log::debug!("Registry transaction rolled back: {}", e),
		}
		result
	}

	pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
		self.inner.read().save(path)
	}
}
