//! Before/after conversion hooks.
//!
//! `ConversionHooks` is a cheap cloneable handle. Handlers may capture a clone
//! and subscribe or unsubscribe from inside their own invocation: firing walks
//! a snapshot of the handler list, so changes apply from the next firing.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::Direction;

type Handler = Arc<Mutex<Box<dyn FnMut(Direction) + Send>>>;

/// Token returned by `subscribe_*`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Handler storage never holds the list lock while a handler runs, so a
/// poisoned lock only means a handler panicked mid-call.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct HookList {
  handlers: Vec<(SubscriptionId, Handler)>,
}

impl HookList {
  fn subscribe(&mut self, handler: Box<dyn FnMut(Direction) + Send>) -> SubscriptionId {
    let id = SubscriptionId::next();
    self.handlers.push((id, Arc::new(Mutex::new(handler))));
    id
  }

  fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    let before = self.handlers.len();
    self.handlers.retain(|(existing, _)| *existing != id);
    self.handlers.len() != before
  }

  fn snapshot(&self) -> Vec<Handler> {
    self.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
  }
}

/// Subscriber lists for conversion start and commit.
#[derive(Clone, Default)]
pub struct ConversionHooks {
  before: Arc<Mutex<HookList>>,
  after: Arc<Mutex<HookList>>,
}

impl ConversionHooks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Called when a request is accepted, before the coordinator starts
  /// converting.
  pub fn subscribe_before<F>(&self, handler: F) -> SubscriptionId
  where
    F: FnMut(Direction) + Send + 'static,
  {
    lock(&self.before).subscribe(Box::new(handler))
  }

  /// Called when the deadline elapses and the direction is committed. Units
  /// may still be converting when this fires.
  pub fn subscribe_after<F>(&self, handler: F) -> SubscriptionId
  where
    F: FnMut(Direction) + Send + 'static,
  {
    lock(&self.after).subscribe(Box::new(handler))
  }

  /// Returns `false` if the id was not subscribed.
  pub fn unsubscribe_before(&self, id: SubscriptionId) -> bool {
    lock(&self.before).unsubscribe(id)
  }

  /// Returns `false` if the id was not subscribed.
  pub fn unsubscribe_after(&self, id: SubscriptionId) -> bool {
    lock(&self.after).unsubscribe(id)
  }

  pub fn before_count(&self) -> usize {
    lock(&self.before).handlers.len()
  }

  pub fn after_count(&self) -> usize {
    lock(&self.after).handlers.len()
  }

  pub(crate) fn fire_before(&self, direction: Direction) {
    Self::fire(&self.before, direction);
  }

  pub(crate) fn fire_after(&self, direction: Direction) {
    Self::fire(&self.after, direction);
  }

  fn fire(list: &Mutex<HookList>, direction: Direction) {
    let snapshot = lock(list).snapshot();
    for handler in snapshot {
      let mut handler = lock(&handler);
      (*handler)(direction);
    }
  }
}

impl fmt::Debug for ConversionHooks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConversionHooks")
      .field("before", &self.before_count())
      .field("after", &self.after_count())
      .finish()
  }
}
