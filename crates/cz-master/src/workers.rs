//! Background threads: the device render loop and the playhead poller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use cz_audio::{AudioError, AudioOutput, CpalOutput};
use cz_engine::graph::{self, SharedGraph};
use cz_engine::{Frame, PollEvent, Transport};

/// How long the render loop sleeps while the device queue is full.
const QUEUE_BACKOFF: Duration = Duration::from_millis(1);

pub(crate) type SharedTransport = Arc<Mutex<Transport>>;

pub(crate) fn lock_transport(transport: &SharedTransport) -> MutexGuard<'_, Transport> {
    transport.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A background thread with a cooperative stop flag.
pub(crate) struct Worker {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Signal the thread and wait for it to exit.
    pub(crate) fn shutdown(mut self) {
        self.stop_signal.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

/// Open the default device on a dedicated thread and keep it fed from
/// `graph`. Returns the worker and the device sample rate.
///
/// The device stream is created on the render thread since it cannot
/// move between threads.
pub(crate) fn spawn_output(graph: SharedGraph, block_size: usize) -> Result<(Worker, u32), AudioError> {
    let stop_signal = Arc::new(AtomicBool::new(false));
    let stop = stop_signal.clone();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    let thread = std::thread::Builder::new()
        .name("cz-render".into())
        .spawn(move || {
            let mut output = match open_device() {
                Ok(output) => output,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(output.sample_rate()));
            render_loop(&mut output, &graph, block_size, &stop);
            if let Err(e) = output.stop() {
                tracing::warn!(%e, "failed to stop audio output");
            }
        })
        .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

    let worker = Worker {
        stop_signal,
        thread: Some(thread),
    };
    match ready_rx.recv() {
        Ok(Ok(sample_rate)) => Ok((worker, sample_rate)),
        Ok(Err(e)) => {
            worker.shutdown();
            Err(e)
        }
        Err(_) => {
            worker.shutdown();
            Err(AudioError::DeviceInit("render thread exited".into()))
        }
    }
}

fn open_device() -> Result<CpalOutput, AudioError> {
    let (mut output, consumer) = CpalOutput::new()?;
    output.build_stream(consumer)?;
    output.start()?;
    Ok(output)
}

fn render_loop(output: &mut impl AudioOutput, graph: &SharedGraph, block_size: usize, stop: &AtomicBool) {
    let mut block = vec![Frame::silence(); block_size.max(1)];
    tracing::info!(block_size = block.len(), "render loop started");
    while !stop.load(Ordering::Relaxed) {
        if output.available() < block.len() {
            std::thread::sleep(QUEUE_BACKOFF);
            continue;
        }
        {
            let mut graph = graph::lock(graph);
            #[cfg(feature = "alloc_check")]
            assert_no_alloc::assert_no_alloc(|| graph.render_block(&mut block));
            #[cfg(not(feature = "alloc_check"))]
            graph.render_block(&mut block);
        }
        output.write(&block);
    }
    tracing::info!("render loop stopped");
}

/// Poll the transport every `interval`, mirroring the playhead into
/// `position`. Exits when playback stops or finishes.
pub(crate) fn spawn_poller(
    transport: SharedTransport,
    position: Arc<AtomicU64>,
    interval: Duration,
) -> Worker {
    let stop_signal = Arc::new(AtomicBool::new(false));
    let stop = stop_signal.clone();

    let thread = std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(interval);
            let mut transport = lock_transport(&transport);
            let event = transport.poll();
            position.store(transport.position(), Ordering::Relaxed);
            match event {
                PollEvent::Advanced(_) | PollEvent::Wrapped { .. } => {}
                PollEvent::Finished | PollEvent::Idle => break,
            }
        }
    });

    Worker {
        stop_signal,
        thread: Some(thread),
    }
}
