//! listflow demo
//!
//! Builds a task-board pipeline (filter open tasks, order by priority, render a
//! label) and replays it onto a worker thread through a channel dispatcher.
//! Pass a TOML engine config path as the first argument to override defaults.

use anyhow::{Context, Result};
use listflow::{
    fixed_filter, fixed_order, observer_fn, EngineConfig, ListMutator, MutableObject,
    MutationSignal, ObservableList, PipelineBuilder, Trigger,
};
use listflow::pipeline::Dispatcher;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Task {
    title: String,
    priority: AtomicU32,
    done: AtomicBool,
    signal: MutationSignal,
}

impl Task {
    fn new(title: &str, priority: u32) -> Arc<Self> {
        Arc::new(Self {
            title: title.to_string(),
            priority: AtomicU32::new(priority),
            done: AtomicBool::new(false),
            signal: MutationSignal::new(),
        })
    }

    fn priority(&self) -> u32 {
        self.priority.load(Ordering::SeqCst)
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn set_priority(&self, priority: u32) -> listflow::Result<()> {
        self.priority.store(priority, Ordering::SeqCst);
        self.signal.notify_mutated()
    }

    fn complete(&self) -> listflow::Result<()> {
        self.done.store(true, Ordering::SeqCst);
        self.signal.notify_mutated()
    }
}

impl MutableObject for Task {
    fn mutation_signal(&self) -> Option<&MutationSignal> {
        Some(&self.signal)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,listflow=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load engine config from {path}"))?,
        None => EngineConfig::default(),
    };
    tracing::info!(?config, "Starting listflow demo");

    let (dispatcher, queue) = config.dispatcher();
    let worker = std::thread::spawn(move || queue.run_blocking());

    let unlinker = Trigger::new();
    let builder = PipelineBuilder::new(config.monitor()).unlinker(unlinker.clone());
    let write_docs = Task::new("write docs", 2);
    let tasks = builder.new_list(vec![
        Task::new("fix login bug", 5),
        write_docs.clone(),
        Task::new("release 0.1", 3),
    ]);

    let board = builder
        .source(tasks.clone())
        .filter(fixed_filter(|t: &Arc<Task>| !t.is_done()))?
        .order(fixed_order(|a: &Arc<Task>, b: &Arc<Task>| {
            a.priority() > b.priority()
        }))?
        .map(|t: &Arc<Task>| format!("[{}] {}", t.priority(), t.title))?
        .dispatch(dispatcher.clone().shared())?
        .build();

    board.add_observer(observer_fn(|event| {
        tracing::info!(?event, "board changed");
        Ok(())
    }))?;

    tasks.add(Task::new("triage issues", 4))?;
    write_docs.set_priority(9)?;
    tasks.get(0)?.complete()?;
    tasks.remove(2, 1)?;

    // Wait for the worker to catch up with everything posted so far.
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    dispatcher.dispatch(Box::new(move || {
        let _ = done_tx.send(());
    }));
    done_rx.recv().context("worker thread stopped early")?;

    for label in board.to_vec() {
        tracing::info!("{}", label);
    }

    unlinker.fire()?;
    drop(board);
    drop(dispatcher);
    let ran = worker
        .join()
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
    tracing::info!(ran, "Shutting down");
    Ok(())
}
