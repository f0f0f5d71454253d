use std::collections::VecDeque;

use crate::model::ProductId;

/// The two broadcast signals of the showroom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowroomEvent {
    /// The camera finished a move to the waypoint with this index
    WaypointReached(usize),
    /// A closed UI session hands its product back to auto-rotation
    ResumeRotation(ProductId),
}

type Listener = Box<dyn FnMut(&ShowroomEvent)>;

/// Publish/subscribe channel. Subscribers are notified synchronously; the event
/// is also queued so the owner can dispatch it to controllers once the current
/// handler has returned.
#[derive(Default)]
pub struct EventBus {
    queue: VecDeque<ShowroomEvent>,
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ShowroomEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn publish(&mut self, event: ShowroomEvent) {
        tracing::debug!(?event, "publish");
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
        self.queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<ShowroomEvent> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_publish_notifies_and_queues_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        {
            let seen = seen.clone();
            bus.subscribe(move |e| seen.borrow_mut().push(*e));
        }

        bus.publish(ShowroomEvent::WaypointReached(1));
        bus.publish(ShowroomEvent::ResumeRotation(ProductId(0)));

        assert_eq!(
            *seen.borrow(),
            vec![ShowroomEvent::WaypointReached(1), ShowroomEvent::ResumeRotation(ProductId(0))]
        );
        assert_eq!(bus.pop(), Some(ShowroomEvent::WaypointReached(1)));
        assert_eq!(bus.pop(), Some(ShowroomEvent::ResumeRotation(ProductId(0))));
        assert!(bus.is_empty());
    }
}
