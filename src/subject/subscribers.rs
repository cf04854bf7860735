use smallvec::SmallVec;

/// The active set of a subject: observers in subscription order, each under
/// the id it was registered with so it can remove itself later.
///
/// The same observer may be registered twice; each registration gets its own
/// id.
pub struct Subscribers<Ob> {
  next_id: usize,
  items: SmallVec<[(usize, Ob); 2]>,
}

impl<Ob> Default for Subscribers<Ob> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<Ob> Subscribers<Ob> {
  /// Add an observer and return its id.
  #[inline]
  pub fn add(&mut self, observer: Ob) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, observer));
    id
  }

  /// Remove an observer by id.
  pub fn remove(&mut self, id: usize) -> Option<Ob> {
    let pos = self.items.iter().position(|(i, _)| *i == id)?;
    Some(self.items.remove(pos).1)
  }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Take every observer out, leaving the set empty.
  pub fn take_all(&mut self) -> SmallVec<[Ob; 2]> {
    self.items.drain(..).map(|(_, observer)| observer).collect()
  }
}

impl<Ob: Clone> Subscribers<Ob> {
  /// Copy of the current set, so that broadcasting does not hold a borrow
  /// while observer code runs.
  pub fn snapshot(&self) -> SmallVec<[Ob; 2]> {
    self.items.iter().map(|(_, observer)| observer.clone()).collect()
  }
}

/// Send `value` to each target in order, cloning for all but the last one.
pub(crate) fn broadcast<T: Clone, Ob>(
  targets: impl IntoIterator<Item = Ob>, value: T, mut send: impl FnMut(&Ob, T),
) {
  let mut iter = targets.into_iter().peekable();
  while let Some(target) = iter.next() {
    if iter.peek().is_some() {
      send(&target, value.clone());
    } else {
      send(&target, value);
      break;
    }
  }
}
