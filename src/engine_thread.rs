use std::sync::mpsc;
use std::thread;

use crate::engine::{Engine, RoundOutcome};
use crate::error::{TraceError, TraceResult};
use crate::export::Primitive;
use crate::fitness::MetricsSnapshot;
use crate::raster::RasterBuffer;
use crate::render::Rasterizer;
use crate::search_config::SearchConfig;

// messages from the driver to the engine thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Stop,
}

// messages from the engine thread to the driver
#[derive(Clone, Debug)]
pub enum EngineUpdate {
    /// one round finished
    Round {
        round: u64,
        accepted: Option<Primitive>,
        metrics: MetricsSnapshot,
        shapes: usize,
    },
    /// last message of a run that ended normally or was stopped
    Finished {
        primitives: Vec<Primitive>,
        metrics: MetricsSnapshot,
        rounds_run: u64,
    },
    /// last message of a run that hit an error
    Failed(String),
}

/// owning side of a running engine thread. dropping it stops and joins the thread.
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    update_rx: mpsc::Receiver<EngineUpdate>,
    thread: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    /// ask the engine to stop after the round in progress
    pub fn stop(&self) {
        let _ = self.command_tx.send(EngineCommand::Stop);
    }

    /// blocking iterator over updates; ends when the thread is gone
    pub fn updates(&self) -> mpsc::Iter<'_, EngineUpdate> {
        self.update_rx.iter()
    }

    /// next update if one is already queued; never blocks
    pub fn try_update(&self) -> Option<EngineUpdate> {
        self.update_rx.try_recv().ok()
    }

    pub fn join(mut self) -> TraceResult<()> {
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| TraceError::Other(anyhow::anyhow!("engine thread panicked")))?;
        }
        Ok(())
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.take() {
            self.stop();
            let _ = handle.join();
        }
    }
}

/// Build an engine and run it on a background thread named "engine".
/// Configuration errors surface here, before the thread starts.
pub fn spawn_engine<R>(
    target: RasterBuffer,
    fill: [u8; 3],
    cfg: SearchConfig,
    renderer: R,
) -> TraceResult<EngineHandle>
where
    R: Rasterizer + Send + 'static,
{
    profiling::scope!("spawn_engine");
    let engine = Engine::new(target, fill, cfg, renderer)?;

    // create communication channels
    let (command_tx, command_rx) = mpsc::channel();
    let (update_tx, update_rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name("engine".to_owned())
        .spawn(move || engine_loop(engine, command_rx, update_tx))?;

    Ok(EngineHandle {
        command_tx,
        update_rx,
        thread: Some(handle),
    })
}

fn engine_loop<R: Rasterizer>(
    mut engine: Engine<R>,
    command_rx: mpsc::Receiver<EngineCommand>,
    update_tx: mpsc::Sender<EngineUpdate>,
) {
    loop {
        profiling::scope!("engine_thread_loop");

        // commands are only honored between rounds
        match command_rx.try_recv() {
            Ok(EngineCommand::Stop) => {
                tracing::info!(round = engine.round(), "stop requested");
                break;
            }
            Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match engine.step() {
            Ok(Some(outcome)) => {
                let accepted = match outcome {
                    RoundOutcome::Accepted(step) => Some(step.to_primitive()),
                    RoundOutcome::Skipped => None,
                };
                let update = EngineUpdate::Round {
                    round: engine.round() - 1,
                    accepted,
                    metrics: engine.metrics(),
                    shapes: engine.primitives().len(),
                };
                if update_tx.send(update).is_err() {
                    // receiver gone, nobody is listening
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::error!(error = %err, round = engine.round(), "engine failed");
                let _ = update_tx.send(EngineUpdate::Failed(err.to_string()));
                return;
            }
        }
    }

    tracing::info!(
        rounds = engine.round(),
        shapes = engine.primitives().len(),
        distance = engine.state().distance(),
        "engine finished"
    );
    let _ = update_tx.send(EngineUpdate::Finished {
        primitives: engine.primitives().to_vec(),
        metrics: engine.metrics(),
        rounds_run: engine.round(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CpuRenderer;

    fn gradient(w: u32, h: u32) -> RasterBuffer {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[(x * 255 / w) as u8, (y * 255 / h) as u8, 90, 255]);
            }
        }
        RasterBuffer::from_rgba(w, h, data).unwrap()
    }

    fn cfg(rounds: u64) -> SearchConfig {
        SearchConfig {
            rounds,
            breadth: 8,
            patience: 3,
            strict_consistency: false,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn reports_every_round_then_finishes() {
        let handle = spawn_engine(gradient(16, 12), [0, 0, 0], cfg(5), CpuRenderer::default()).unwrap();
        let updates: Vec<EngineUpdate> = handle.updates().collect();

        let rounds: Vec<u64> = updates
            .iter()
            .filter_map(|u| match u {
                EngineUpdate::Round { round, .. } => Some(*round),
                _ => None,
            })
            .collect();
        assert_eq!(rounds, vec![0, 1, 2, 3, 4]);

        let accepted = updates
            .iter()
            .filter(|u| matches!(u, EngineUpdate::Round { accepted: Some(_), .. }))
            .count();
        match updates.last() {
            Some(EngineUpdate::Finished { primitives, rounds_run, .. }) => {
                assert_eq!(*rounds_run, 5);
                assert_eq!(primitives.len(), accepted);
            }
            other => panic!("unexpected last update {other:?}"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn stop_still_sends_finished() {
        let handle = spawn_engine(gradient(16, 12), [0, 0, 0], cfg(100_000), CpuRenderer::default()).unwrap();
        handle.stop();
        let last = handle.updates().last();
        match last {
            Some(EngineUpdate::Finished { rounds_run, .. }) => assert!(rounds_run < 100_000),
            other => panic!("unexpected last update {other:?}"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn polling_drains_to_finished() {
        let handle = spawn_engine(gradient(12, 8), [0, 0, 0], cfg(4), CpuRenderer::default()).unwrap();
        let mut rounds = 0;
        let mut finished = None;
        while finished.is_none() {
            match handle.try_update() {
                Some(EngineUpdate::Round { .. }) => rounds += 1,
                Some(EngineUpdate::Finished { rounds_run, .. }) => finished = Some(rounds_run),
                Some(EngineUpdate::Failed(msg)) => panic!("engine failed: {msg}"),
                None => std::thread::sleep(std::time::Duration::from_millis(1)),
            }
        }
        assert_eq!(rounds, 4);
        assert_eq!(finished, Some(4));
        assert!(handle.try_update().is_none());
        handle.join().unwrap();
    }

    #[test]
    fn bad_config_fails_before_spawning() {
        let res = spawn_engine(gradient(4, 4), [0, 0, 0], cfg(0), CpuRenderer::default());
        assert!(matches!(res, Err(TraceError::Configuration(_))));
    }
}
