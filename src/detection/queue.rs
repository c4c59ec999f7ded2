use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, info, warn};

use crate::config::DetectionConfig;

use super::{DetectionCompletion, DetectionStatus, DetectionTask, Detector, contours};

struct State {
    tasks: VecDeque<DetectionTask>,
    running: bool,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-consumer FIFO in front of a detector.
///
/// Tasks run one at a time on a dedicated thread, in submission order.
/// Completions are delivered over the receiver returned by
/// [`DetectionQueue::start`]; the queue never touches label collections.
pub struct DetectionQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl DetectionQueue {
    pub fn start<D: Detector>(detector: D, config: DetectionConfig) -> (Self, Receiver<DetectionCompletion>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                tasks: VecDeque::new(),
                running: true,
            }),
            available: Condvar::new(),
        });
        let (sender, receiver) = mpsc::channel();

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("detection-queue".to_string())
            .spawn(move || consume(worker_shared, detector, config, sender));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("failed to spawn detection worker: {err}");
                None
            }
        };

        (Self { shared, worker }, receiver)
    }

    /// Enqueue a task. Never blocks on detection work.
    pub fn submit(&self, task: DetectionTask) {
        debug!(task = %task.id, image_id = task.image_id, "queueing detection task");
        let mut state = self.shared.lock();
        if !state.running {
            warn!(task = %task.id, "detection queue stopped, dropping task");
            return;
        }
        state.tasks.push_back(task);
        drop(state);
        self.shared.available.notify_one();
    }

    /// Tasks queued but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.shared.lock().running
    }

    /// Wake and stop the worker. A task already handed to the detector runs to
    /// completion; queued tasks are discarded.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.running = false;
            let dropped = state.tasks.len();
            state.tasks.clear();
            if dropped > 0 {
                info!(dropped, "discarding queued detection tasks");
            }
        }
        self.shared.available.notify_all();

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("detection worker panicked");
            }
        }
    }
}

impl Drop for DetectionQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn consume<D: Detector>(
    shared: Arc<Shared>,
    mut detector: D,
    config: DetectionConfig,
    completions: Sender<DetectionCompletion>,
) {
    loop {
        let task = {
            let mut state = shared.lock();
            loop {
                if !state.running {
                    debug!("detection worker exiting");
                    return;
                }
                if let Some(task) = state.tasks.pop_front() {
                    break task;
                }
                state = shared.available.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        };

        let completion = run_task(&mut detector, task, &config);
        if completions.send(completion).is_err() {
            debug!("completion receiver dropped, detection worker exiting");
            return;
        }
    }
}

fn run_task<D: Detector>(detector: &mut D, task: DetectionTask, config: &DetectionConfig) -> DetectionCompletion {
    let (contours, status) = match detector.detect(&task.image, task.confidence_threshold) {
        Ok(raw) => {
            let found = raw.len();
            let contours = contours::process_contours(
                raw,
                task.confidence_threshold,
                task.offset,
                config.simplify_epsilon_factor,
            );
            info!(task = %task.id, found, kept = contours.len(), "detection finished");
            (contours, DetectionStatus::Completed)
        }
        Err(err) => {
            warn!(task = %task.id, "{err}");
            (Vec::new(), DetectionStatus::from(err))
        }
    };
    DetectionCompletion {
        task,
        contours,
        status,
    }
}
