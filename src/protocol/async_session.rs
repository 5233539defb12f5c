/*!
Paced asynchronous driver for the QKD link.

A [`SharedSession`] can be cloned into any number of tasks: the operator's
buttons, the scene's intersection callback, a status poller. Each round is
computed at once under the controller lock, then replayed photon by photon
with the configured pacing while the lock is released. The controller stays
marked busy for the whole replay, so requests that arrive in between are
refused rather than queued. Once a round has settled, its trailing effects
(the renewal flash) stop as soon as a reset or a newer round supersedes it.
*/

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;

use crate::core::{
    error::{Error, Result},
    quantum::{RandomSource, RngSource},
    session::{Operation, SessionController, SessionState, Transition},
    signals::{apply_effects, IntersectionGate, VisualCommand, VisualSink},
};

/// Shared, paced handle to a session controller
pub struct SharedSession<V, S = RngSource<StdRng>> {
    /// The shared controller
    controller: Arc<Mutex<SessionController<S>>>,

    /// Rendering side
    sink: Arc<Mutex<V>>,

    /// Throttle for intersection signals
    gate: Arc<Mutex<IntersectionGate>>,

    /// Clock origin for the gate
    started: Instant,
}

impl<V, S> Clone for SharedSession<V, S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            sink: Arc::clone(&self.sink),
            gate: Arc::clone(&self.gate),
            started: self.started,
        }
    }
}

impl<V: VisualSink, S: RandomSource> SharedSession<V, S> {
    /// Wrap a controller and the sink its effects are played into
    pub fn new(controller: SessionController<S>, sink: V) -> Self {
        let gate = IntersectionGate::new(controller.config().intersection_cooldown);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            sink: Arc::new(Mutex::new(sink)),
            gate: Arc::new(Mutex::new(gate)),
            started: Instant::now(),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Result<SessionState> {
        Ok(self.lock_controller()?.state().clone())
    }

    /// Copy of the event log
    pub fn log(&self) -> Result<Vec<String>> {
        Ok(self.lock_controller()?.log().to_vec())
    }

    /// Inspect the sink
    pub fn with_sink<R>(&self, f: impl FnOnce(&V) -> R) -> Result<R> {
        Ok(f(&*self.lock_sink()?))
    }

    /// Establish a QKD-protected link
    pub async fn start_secure(&self, eavesdropper_active: bool) -> Result<Transition> {
        self.run(Operation::StartSecure {
            eavesdropper_active,
        })
        .await
    }

    /// Establish an unprotected link
    pub async fn start_unsafe(&self, eavesdropper_active: bool) -> Result<Transition> {
        self.run(Operation::StartUnsafe {
            eavesdropper_active,
        })
        .await
    }

    /// Renew the key of an established link
    pub async fn renew(&self, eavesdropper_active: bool) -> Result<Transition> {
        self.run(Operation::Renew {
            eavesdropper_active,
        })
        .await
    }

    /// Beam-intersection callback from the scene.
    ///
    /// Signals inside the cooldown window are dropped before they reach the
    /// controller.
    pub async fn on_intersection(&self) -> Result<Transition> {
        let admitted = self.lock_gate()?.admit(self.started.elapsed());
        if !admitted {
            log::debug!("Intersection signal inside cooldown, dropped");
            return Ok(Transition::rejected());
        }
        self.run(Operation::AutoRenew).await
    }

    /// Reset the session; applies immediately, even mid-round
    pub fn reset(&self) -> Result<Transition> {
        let transition = self.lock_controller()?.reset();
        self.lock_gate()?.reset();
        apply_effects(&transition.effects, &mut *self.lock_sink()?);
        Ok(transition)
    }

    /// Perform one operation with pacing
    pub async fn run(&self, operation: Operation) -> Result<Transition> {
        let (pending, steps, config) = {
            let mut controller = self.lock_controller()?;
            let Some(mut pending) = controller.begin(operation) else {
                return Ok(Transition::rejected());
            };

            let mut steps = Vec::with_capacity(pending.request().photon_count);
            if let Err(err) = controller.execute(&mut pending, |step| steps.push(step)) {
                controller.abort(pending);
                return Err(err);
            }
            (pending, steps, controller.config().clone())
        };
        let epoch = pending.epoch();

        if !self.play(pending.effects(), epoch).await? {
            return Ok(superseded(operation));
        }
        for step in &steps {
            {
                let controller = self.lock_controller()?;
                if !controller.is_current(epoch) {
                    return Ok(superseded(operation));
                }
                self.lock_sink()?.photon_in_flight(step);
            }
            pause(config.photon_interval).await;
        }
        // Sifting, then security verification.
        pause(config.stage_interval).await;
        pause(config.stage_interval).await;

        let mut effects = pending.effects().to_vec();
        let settled = self.lock_controller()?.complete(pending);
        if !settled.accepted {
            return Ok(superseded(operation));
        }

        if !self.play(&settled.effects, epoch).await? {
            log::debug!("{} round superseded during its closing effects", operation);
        }
        effects.extend(settled.effects);
        Ok(Transition::accepted(effects))
    }

    /// Apply effects to the sink, waiting out holds.
    ///
    /// Returns `false` once the round accepted in `epoch` has been superseded;
    /// nothing after that point reaches the sink.
    async fn play(&self, effects: &[VisualCommand], epoch: u64) -> Result<bool> {
        for effect in effects {
            match *effect {
                VisualCommand::Hold(duration) => pause(duration).await,
                other => {
                    // Controller stays locked until the sink is updated.
                    let controller = self.lock_controller()?;
                    if !controller.is_current(epoch) {
                        return Ok(false);
                    }
                    apply_effects(&[other], &mut *self.lock_sink()?);
                    drop(controller);
                }
            }
        }
        Ok(true)
    }

    fn lock_controller(&self) -> Result<MutexGuard<'_, SessionController<S>>> {
        self.controller
            .lock()
            .map_err(|_| Error::Internal("session controller lock poisoned".into()))
    }

    fn lock_sink(&self) -> Result<MutexGuard<'_, V>> {
        self.sink
            .lock()
            .map_err(|_| Error::Internal("visual sink lock poisoned".into()))
    }

    fn lock_gate(&self) -> Result<MutexGuard<'_, IntersectionGate>> {
        self.gate
            .lock()
            .map_err(|_| Error::Internal("intersection gate lock poisoned".into()))
    }
}

fn superseded(operation: Operation) -> Transition {
    log::info!("{} round was superseded, result dropped", operation);
    Transition::rejected()
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
