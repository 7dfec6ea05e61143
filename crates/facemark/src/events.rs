//! Change notifications for the presentation layer.
//!
//! Observers run synchronously on the thread that performed the mutation,
//! after the change has been persisted.

use facemark_core::AttendanceEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceEvent {
    ReferenceAdded { name: String },
    ReferencesRemoved { name: String, count: usize },
    AttendanceMarked(AttendanceEntry),
}

pub trait Observer: Send {
    fn notify(&self, event: &AttendanceEvent);
}

impl<F> Observer for F
where
    F: Fn(&AttendanceEvent) + Send,
{
    fn notify(&self, event: &AttendanceEvent) {
        self(event)
    }
}

#[derive(Default)]
pub struct Subscribers {
    observers: Vec<Box<dyn Observer>>,
}

impl Subscribers {
    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn publish(&self, event: &AttendanceEvent) {
        tracing::trace!(?event, observers = self.observers.len(), "publishing event");
        for observer in &self.observers {
            observer.notify(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
