//! Task scheduler.
//!
//! A fixed pool of worker threads drains a shared set of tasks. Each task may
//! name other tasks it depends on; a task only becomes runnable once every one
//! of its dependencies has finished.
//!
//! # Lifecycle
//!
//! ```text
//! reserve_id() ──> Reserved ──add_reserved_task()──┐
//!                                                  v
//! add_task() ─────────────────────────────────> Queued ──claim──> Running ──> Finished
//! ```
//!
//! Reserving an id lets a task be named as a dependency before its body exists.
//!
//! The thread calling [`Scheduler::wait_for_tasks`] does not sleep while there
//! is runnable work: it claims and executes tasks like any worker, so a
//! scheduler with zero worker threads still makes progress.
//!
//! # Panics
//!
//! A task that panics is still marked finished. The panic payload is handed to
//! the first thread that waits on that task, which resumes unwinding with it.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Globally unique identifier of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Where a task currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Id handed out by [`Scheduler::reserve_id`], no body submitted yet.
    Reserved,
    /// Submitted and waiting to be claimed.
    Queued,
    /// Claimed by a thread and executing.
    Running,
    /// Done (successfully or by panicking).
    Finished,
}

type Work = Box<dyn FnOnce() + Send + 'static>;
type PanicPayload = Box<dyn Any + Send + 'static>;

struct PendingTask {
    id: TaskId,
    work: Work,
    dependencies: Vec<TaskId>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    reserved: HashSet<TaskId>,
    queued: VecDeque<PendingTask>,
    running: HashSet<TaskId>,
    panics: HashMap<TaskId, PanicPayload>,
    terminate: bool,
}

impl State {
    fn issue_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    fn status(&self, id: TaskId) -> TaskStatus {
        assert!(
            id.0 < self.next_id,
            "task {id:?} was never issued by this scheduler"
        );
        if self.running.contains(&id) {
            TaskStatus::Running
        } else if self.reserved.contains(&id) {
            TaskStatus::Reserved
        } else if self.queued.iter().any(|task| task.id == id) {
            TaskStatus::Queued
        } else {
            TaskStatus::Finished
        }
    }

    fn is_finished(&self, id: TaskId) -> bool {
        self.status(id) == TaskStatus::Finished
    }

    /// Removes the oldest queued task whose dependencies have all finished.
    fn claim_runnable(&mut self) -> Option<PendingTask> {
        let index = self
            .queued
            .iter()
            .position(|task| task.dependencies.iter().all(|&dep| self.is_finished(dep)))?;
        let task = self.queued.remove(index)?;
        self.running.insert(task.id);
        Some(task)
    }
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes a claimed task outside the lock and publishes its completion.
    fn run(&self, task: PendingTask) {
        let result = panic::catch_unwind(AssertUnwindSafe(task.work));

        let mut state = self.lock();
        state.running.remove(&task.id);
        if let Err(payload) = result {
            log::debug!("task {:?} panicked", task.id);
            state.panics.insert(task.id, payload);
        }
        drop(state);

        // Completion can make other tasks runnable and can satisfy waiters.
        self.wake.notify_all();
    }

    fn submit(&self, id: Option<TaskId>, work: Work, dependencies: &[TaskId]) -> TaskId {
        let mut state = self.lock();
        let id = match id {
            Some(id) => {
                assert!(
                    state.reserved.remove(&id),
                    "task {id:?} was not reserved or has already been submitted"
                );
                id
            }
            None => state.issue_id(),
        };
        for &dep in dependencies {
            // Asserts that every dependency was issued.
            state.status(dep);
        }
        state.queued.push_back(PendingTask {
            id,
            work,
            dependencies: dependencies.to_vec(),
        });
        drop(state);

        self.wake.notify_all();
        id
    }

    /// Queues an empty body for `id` if it is still reserved.
    fn fill_reservation(&self, id: TaskId) {
        let mut state = self.lock();
        if state.reserved.remove(&id) {
            state.queued.push_back(PendingTask {
                id,
                work: Box::new(|| {}),
                dependencies: Vec::new(),
            });
        }
        drop(state);

        self.wake.notify_all();
    }

    /// Blocks until every listed task finished, helping with runnable work in
    /// the meantime. Returns the first panic payload among the listed tasks.
    fn wait_until_finished(&self, ids: &[TaskId]) -> Option<PanicPayload> {
        let mut state = self.lock();
        loop {
            if ids.iter().all(|&id| state.is_finished(id)) {
                return ids.iter().find_map(|id| state.panics.remove(id));
            }
            if let Some(task) = state.claim_runnable() {
                drop(state);
                self.run(task);
                state = self.lock();
                continue;
            }
            state = self.wait(state);
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    let mut state = shared.lock();
    loop {
        if state.terminate {
            break;
        }
        if let Some(task) = state.claim_runnable() {
            drop(state);
            shared.run(task);
            state = shared.lock();
            continue;
        }
        state = shared.wait(state);
    }
}

/// A fixed pool of worker threads executing a dependency graph of tasks.
pub struct Scheduler {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns `threads` worker threads. Zero is allowed: all work then runs on
    /// whichever thread waits for it.
    pub fn new(threads: usize) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        });

        let mut scheduler = Self {
            shared,
            threads: Vec::with_capacity(threads),
        };
        for index in 0..threads {
            let shared = Arc::clone(&scheduler.shared);
            // On error the partially built scheduler is dropped, which joins
            // the threads spawned so far.
            let handle = thread::Builder::new()
                .name(format!("levelrast-worker-{index}"))
                .spawn(move || worker_loop(shared))?;
            scheduler.threads.push(handle);
        }
        log::debug!("scheduler started with {threads} worker threads");
        Ok(scheduler)
    }

    /// Number of worker threads in the pool (the waiting thread not included).
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Reserves a task id whose body is supplied later with
    /// [`Scheduler::add_reserved_task`].
    pub fn reserve_id(&self) -> TaskId {
        let mut state = self.shared.lock();
        let id = state.issue_id();
        state.reserved.insert(id);
        id
    }

    /// Queues `work`, runnable once every task in `dependencies` finished.
    pub fn add_task<F>(&self, work: F, dependencies: &[TaskId]) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(None, Box::new(work), dependencies)
    }

    /// Supplies the body of a previously reserved id.
    ///
    /// # Panics
    /// Panics if `id` was not reserved or its body was already submitted.
    pub fn add_reserved_task<F>(&self, id: TaskId, work: F, dependencies: &[TaskId])
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Some(id), Box::new(work), dependencies);
    }

    /// Blocks until every listed task has finished.
    ///
    /// # Panics
    /// Panics if an id was never issued, and re-raises the panic of any listed
    /// task that panicked.
    pub fn wait_for_tasks(&self, ids: &[TaskId]) {
        if let Some(payload) = self.shared.wait_until_finished(ids) {
            panic::resume_unwind(payload);
        }
    }

    /// Current status of a task.
    ///
    /// # Panics
    /// Panics if `id` was never issued by this scheduler.
    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.shared.lock().status(id)
    }

    /// Runs `f` with a [`Scope`] through which tasks borrowing local data can
    /// be submitted. Every task submitted through the scope has finished when
    /// this returns, including when `f` unwinds.
    pub fn scope<'env, F, T>(&self, f: F) -> T
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> T,
    {
        let scope = Scope {
            scheduler: self,
            submitted: RefCell::new(Vec::new()),
            reserved: RefCell::new(HashSet::new()),
            scope: PhantomData,
            env: PhantomData,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));

        // Reserved ids left without a body get an empty one so that tasks
        // depending on them can still run and the wait below terminates.
        let mut unsupplied: Vec<TaskId> = scope.reserved.take().into_iter().collect();
        unsupplied.sort();
        for &id in &unsupplied {
            self.shared.fill_reservation(id);
        }

        let mut submitted = scope.submitted.take();
        submitted.extend_from_slice(&unsupplied);
        let task_panic = self.shared.wait_until_finished(&submitted);

        let value = match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        };
        if let Some(payload) = task_panic {
            panic::resume_unwind(payload);
        }
        assert!(
            unsupplied.is_empty(),
            "scope ended with reserved tasks {unsupplied:?} that never received a body"
        );
        value
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.lock().terminate = true;
        self.shared.wake.notify_all();

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::warn!("scheduler worker exited abnormally");
            }
        }
        log::debug!("scheduler stopped");
    }
}

/// Submission handle for tasks that borrow from the enclosing stack frame.
///
/// Created by [`Scheduler::scope`].
pub struct Scope<'scope, 'env: 'scope> {
    scheduler: &'scope Scheduler,
    submitted: RefCell<Vec<TaskId>>,
    reserved: RefCell<HashSet<TaskId>>,
    scope: PhantomData<&'scope mut &'scope ()>,
    env: PhantomData<&'env mut &'env ()>,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    /// Queues `work`, which may borrow anything outliving the scope.
    pub fn add_task<F>(&'scope self, work: F, dependencies: &[TaskId]) -> TaskId
    where
        F: FnOnce() + Send + 'scope,
    {
        let id = self
            .scheduler
            .shared
            .submit(None, erase_lifetime(Box::new(work)), dependencies);
        self.submitted.borrow_mut().push(id);
        id
    }

    /// Supplies the body of an id reserved with [`Scope::reserve_id`].
    ///
    /// # Panics
    /// Panics if `id` was not reserved through this scope or its body was
    /// already submitted.
    pub fn add_reserved_task<F>(&'scope self, id: TaskId, work: F, dependencies: &[TaskId])
    where
        F: FnOnce() + Send + 'scope,
    {
        assert!(
            self.reserved.borrow_mut().remove(&id),
            "task {id:?} was not reserved through this scope or has already been submitted"
        );
        self.scheduler
            .shared
            .submit(Some(id), erase_lifetime(Box::new(work)), dependencies);
        self.submitted.borrow_mut().push(id);
    }

    /// Reserves an id whose body is supplied later with
    /// [`Scope::add_reserved_task`].
    ///
    /// If the scope ends before the body is supplied, the id finishes as an
    /// empty task and the scope panics once everything else has finished.
    pub fn reserve_id(&'scope self) -> TaskId {
        let id = self.scheduler.reserve_id();
        self.reserved.borrow_mut().insert(id);
        id
    }

    /// Same as [`Scheduler::wait_for_tasks`].
    pub fn wait_for_tasks(&self, ids: &[TaskId]) {
        self.scheduler.wait_for_tasks(ids);
    }
}

fn erase_lifetime<'scope>(work: Box<dyn FnOnce() + Send + 'scope>) -> Work {
    // SAFETY: only called from `Scope`, for ids recorded in its `submitted`
    // list. `Scheduler::scope` does not return (or unwind) before every one
    // of those tasks has finished, so everything the closure borrows
    // outlives its execution.
    unsafe { std::mem::transmute::<Box<dyn FnOnce() + Send + 'scope>, Work>(work) }
}
