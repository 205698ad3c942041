// ============================================================================
// Task-local bindings
// ============================================================================
//
// A logical task is the thread of execution a guarded operation runs on.
// State bound to it lives in a `TaskLocal` owned by whoever needs it (the
// unit-of-work manager keeps one per instance), so two managers never share
// bindings and nothing is process-wide.
//
// ============================================================================

use super::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::thread::ThreadId;

thread_local! {
    /// Dropped when the thread exits, which orphans its bindings
    static ALIVE: Arc<()> = Arc::new(());
}

fn liveness() -> Weak<()> {
    ALIVE
        .try_with(|alive| Arc::downgrade(alive))
        .unwrap_or_default()
}

/// Identity of the current logical task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(ThreadId);

impl TaskId {
    /// Id of the task the caller is running on
    pub fn current() -> Self {
        TaskId(std::thread::current().id())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task_{:?}", self.0)
    }
}

/// One slot of `T` per logical task.
///
/// Thread ids are never reused, so a binding left behind by a thread that
/// has exited is never unbound by that thread again. Such bindings are
/// orphaned; [`TaskLocal::sweep`] removes and returns them.
pub struct TaskLocal<T> {
    slots: Mutex<HashMap<TaskId, Slot<T>>>,
}

struct Slot<T> {
    value: T,
    owner: Weak<()>,
}

impl<T: Clone> TaskLocal<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Value bound to the current task, if any
    pub fn get(&self) -> Result<Option<T>> {
        let slots = self.slots.lock()?;
        Ok(slots.get(&TaskId::current()).map(|slot| slot.value.clone()))
    }

    /// Bind `value` to the current task, returning the previous binding
    pub fn set(&self, value: T) -> Result<Option<T>> {
        let mut slots = self.slots.lock()?;
        let slot = Slot {
            value,
            owner: liveness(),
        };
        Ok(slots.insert(TaskId::current(), slot).map(|slot| slot.value))
    }

    /// Unbind and return the current task's value
    pub fn take(&self) -> Result<Option<T>> {
        let mut slots = self.slots.lock()?;
        Ok(slots.remove(&TaskId::current()).map(|slot| slot.value))
    }

    pub fn is_bound(&self) -> bool {
        self.slots
            .lock()
            .map(|slots| slots.contains_key(&TaskId::current()))
            .unwrap_or(false)
    }

    /// Number of tasks holding a binding, orphaned ones included
    pub fn bound_count(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    /// Unbind and return the values of tasks whose thread has exited
    pub fn sweep(&self) -> Result<Vec<T>> {
        let mut slots = self.slots.lock()?;
        let orphaned: Vec<TaskId> = slots
            .iter()
            .filter(|(_, slot)| slot.owner.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();

        Ok(orphaned
            .iter()
            .filter_map(|id| slots.remove(id))
            .map(|slot| slot.value)
            .collect())
    }
}

impl<T: Clone> Default for TaskLocal<T> {
    fn default() -> Self {
        Self::new()
    }
}
