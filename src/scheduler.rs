//! Delivery schedulers: where projection reactions run.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A boxed unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Decides the execution context for a projection's reaction to a source change.
///
/// The default, [`Immediate`], runs reactions inline on whatever context delivered the source
/// event, so derived state is already consistent when the mutating call returns.
pub trait Scheduler {
    /// Runs or enqueues `task`.
    fn schedule(&self, task: Task);
}

/// Runs every task inline on the calling context. The default scheduler.
#[derive(Default, Clone, Copy, Debug)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn schedule(&self, task: Task) {
        task();
    }
}

/// Defers tasks onto a manually-pumped queue.
///
/// Useful when reactions should run at a controlled point of the frame rather than in the middle
/// of a mutating call, and in tests that assert on deferral.
#[derive(Default, Clone)]
pub struct TaskQueue {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Drains the queue, running tasks in FIFO order until it is empty (including tasks enqueued
    /// by the tasks themselves), and returns how many ran.
    pub fn run(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.queue.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn task_queue_defers_until_pumped() {
        let queue = TaskQueue::new();
        let ran = Rc::new(Cell::new(false));

        queue.schedule(Box::new(crate::clone!((ran) move || ran.set(true))));
        assert!(!ran.get(), "TaskQueue ran a task at schedule time");
        assert_eq!(queue.pending(), 1);

        assert_eq!(queue.run(), 1);
        assert!(ran.get());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn run_drains_tasks_scheduled_by_tasks() {
        let queue = TaskQueue::new();
        let inner_ran = Rc::new(Cell::new(false));

        let queue_handle = queue.clone();
        let inner_ran_handle = inner_ran.clone();
        queue.schedule(Box::new(move || {
            queue_handle.schedule(Box::new(move || inner_ran_handle.set(true)));
        }));

        assert_eq!(queue.run(), 2);
        assert!(inner_ran.get());
    }
}
