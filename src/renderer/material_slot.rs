//! Holds the current material and rebuilds it off-thread.
//!
//! Every request is stamped with a generation. Only the result of the newest
//! request is ever applied, whatever order the workers finish in.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender};

use super::{
    mapping::Mapping,
    material::{MappingMaterial, MaterialBuilder, MaterialSpec},
};

struct BuildCompletion {
    generation: u64,
    result: Result<MappingMaterial>,
}

pub struct MaterialSlot {
    builder: MaterialBuilder,
    latest: Arc<AtomicU64>,
    applied: u64,
    tx: Sender<BuildCompletion>,
    rx: Receiver<BuildCompletion>,
    current: Option<MappingMaterial>,
}

impl MaterialSlot {
    pub fn new(builder: MaterialBuilder) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            builder,
            latest: Arc::new(AtomicU64::new(0)),
            applied: 0,
            tx,
            rx,
            current: None,
        }
    }

    /// Start building a material on a worker thread, superseding any build
    /// still in flight. Returns the generation of the new build.
    pub fn request_build(&mut self, mapping: Arc<Mapping>, spec: MaterialSpec) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = self.latest.clone();
        let builder = self.builder.clone();
        let tx = self.tx.clone();

        thread::spawn(move || {
            if latest.load(Ordering::SeqCst) != generation {
                log::debug!("material build {generation} superseded before it started");
                return;
            }
            let result = catch_unwind(AssertUnwindSafe(|| builder.build(mapping, &spec)))
                .unwrap_or_else(|_| Err(anyhow!("material build {generation} panicked")));
            let _ = tx.send(BuildCompletion { generation, result });
        });

        generation
    }

    /// True while the newest requested build has not been applied.
    pub fn is_pending(&self) -> bool {
        self.applied != self.latest.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.applied
    }

    pub fn current(&self) -> Option<&MappingMaterial> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut MappingMaterial> {
        self.current.as_mut()
    }

    /// Apply the newest build if it has finished. `Ok(true)` when the current
    /// material changed; a failed newest build keeps the previous material.
    pub fn poll(&mut self) -> Result<bool> {
        while let Ok(completion) = self.rx.try_recv() {
            if self.apply(completion)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Block until the newest requested build is applied.
    pub fn wait(&mut self) -> Result<&MappingMaterial> {
        while self.is_pending() {
            let completion = self
                .rx
                .recv()
                .map_err(|_| anyhow!("material build worker disconnected"))?;
            self.apply(completion)?;
        }
        self.current
            .as_ref()
            .ok_or_else(|| anyhow!("no material has been built"))
    }

    fn apply(&mut self, completion: BuildCompletion) -> Result<bool> {
        let BuildCompletion { generation, result } = completion;
        if generation != self.latest.load(Ordering::SeqCst) {
            log::debug!("discarding stale material build {generation}");
            return Ok(false);
        }
        self.applied = generation;
        self.current = Some(result?);
        Ok(true)
    }
}
