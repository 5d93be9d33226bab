use std::borrow::Cow;
use std::fmt;

#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
use std::cell::{RefCell, RefMut};
#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
use std::rc::Weak;
#[cfg(all(feature = "shared_ns", feature = "mt"))]
use std::sync::{Mutex, MutexGuard, Weak};

use crate::parser::{NamespaceName, RcPtr};

#[cfg(feature = "shared_ns")]
type NamespaceWeakSet = weak_table::WeakHashSet<Weak<str>>;

/**
# Shared context for multiple parsers

This context allows parsers to share data. This is useful in cases where many
parsers are used in the same application, and all of them encountering similar
data.

The context is used to share the namespace URIs encountered in XML
documents. Actual deduplication only happens if the `shared_ns` feature is
used for building; otherwise every call to [`Context::intern_namespace`]
allocates.

Even though the context is internally mutable, it can safely be shared with
an immutable reference between parsers. If the crate is built with the `mt`
feature, the Context is Send and Sync, otherwise it is neither.
*/
pub struct Context {
	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	nss: Mutex<NamespaceWeakSet>,
	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	nss: RefCell<NamespaceWeakSet>,
}

impl Context {
	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	fn wrap_nss(nss: NamespaceWeakSet) -> Mutex<NamespaceWeakSet> {
		Mutex::new(nss)
	}

	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	fn wrap_nss(nss: NamespaceWeakSet) -> RefCell<NamespaceWeakSet> {
		RefCell::new(nss)
	}

	/// Create a new context
	pub fn new() -> Context {
		Context {
			#[cfg(feature = "shared_ns")]
			nss: Self::wrap_nss(weak_table::WeakHashSet::new()),
		}
	}

	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	fn lock_nss<'a>(&'a self) -> MutexGuard<'a, NamespaceWeakSet> {
		// the set stays consistent even if a holder panicked
		self.nss.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	fn lock_nss<'a>(&'a self) -> RefMut<'a, NamespaceWeakSet> {
		self.nss.borrow_mut()
	}

	/// Intern a namespace URI
	///
	/// The given URI is interned in the context and a refcounted pointer
	/// is returned. When the last reference to that pointer expires, the
	/// string will be lazily removed from the internal storage.
	///
	/// To force expiry, call [`Context::release_temporaries`], although that
	/// should only rarely be necessary and may be detrimental to performance.
	pub fn intern_namespace<'a, T: Into<Cow<'a, str>>>(&self, uri: T) -> NamespaceName {
		let uri = uri.into();
		#[cfg(feature = "shared_ns")]
		{
			let mut nss = self.lock_nss();
			return match nss.get(&*uri) {
				Some(ptr) => ptr.clone(),
				None => {
					let ptr: NamespaceName = RcPtr::from(uri.into_owned());
					nss.insert(ptr.clone());
					ptr
				}
			};
		}
		#[cfg(not(feature = "shared_ns"))]
		return RcPtr::from(uri.into_owned());
	}

	/// Remove all unreferenced strings from storage and shrink the storage to
	/// fit the requirements.
	///
	/// This should rarely be necessary to call. The internal storage will
	/// prefer expiring unused strings over reallocating and will only
	/// reallocate if necessary.
	pub fn release_temporaries(&self) {
		#[cfg(feature = "shared_ns")]
		{
			let mut nss = self.lock_nss();
			nss.remove_expired();
			nss.shrink_to_fit();
		}
	}

	/// Return the number of namespace URIs interned.
	///
	/// Returns zero if built without `shared_ns`. This count includes strings
	/// which are unreferenced and which would be removed before the next
	/// reallocation.
	pub fn namespaces(&self) -> usize {
		#[cfg(feature = "shared_ns")]
		{
			let nss = self.lock_nss();
			nss.len()
		}
		#[cfg(not(feature = "shared_ns"))]
		0
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Context {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		let mut f = f.debug_struct("Context");
		f.field("instance", &(self as *const Context));
		#[cfg(feature = "shared_ns")]
		{
			let nss = self.lock_nss();
			f.field("nss.capacity()", &nss.capacity())
				.field("nss.length()", &nss.len());
		}
		f.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn interned_namespace_keeps_content() {
		let ctx = Context::new();
		let ns = ctx.intern_namespace("urn:x");
		assert_eq!(&*ns, "urn:x");
		let ns2 = ctx.intern_namespace(String::from("urn:x"));
		assert_eq!(ns, ns2);
	}

	#[cfg(feature = "shared_ns")]
	#[test]
	fn shared_ns_deduplicates() {
		let ctx = Context::new();
		let ns1 = ctx.intern_namespace("urn:x");
		let ns2 = ctx.intern_namespace("urn:x");
		assert!(RcPtr::ptr_eq(&ns1, &ns2));
		assert_eq!(ctx.namespaces(), 1);
		drop(ns1);
		drop(ns2);
		ctx.release_temporaries();
		assert_eq!(ctx.namespaces(), 0);
	}
}
