//! Build stages with declared dependencies, run wave by wave.
//!
//! Stages whose dependencies are all complete form a wave; every stage in a
//! wave runs on its own scoped thread and reports back over a channel. The
//! next wave starts only after the whole wave has joined, so a stage always
//! sees the outputs of everything it depends on.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, bail};

type StageFn<'a, T> = Box<dyn FnOnce(&StageOutputs<T>) -> Result<T> + Send + 'a>;

pub struct BuildStage<'a, T> {
    name: &'static str,
    deps: Vec<&'static str>,
    run: StageFn<'a, T>,
}

impl<'a, T> BuildStage<'a, T> {
    pub fn new(
        name: &'static str,
        run: impl FnOnce(&StageOutputs<T>) -> Result<T> + Send + 'a,
    ) -> Self {
        Self {
            name,
            deps: Vec::new(),
            run: Box::new(run),
        }
    }

    pub fn after(mut self, deps: &[&'static str]) -> Self {
        self.deps.extend_from_slice(deps);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Outputs of completed stages, keyed by stage name.
pub struct StageOutputs<T> {
    outputs: BTreeMap<&'static str, T>,
}

impl<T> StageOutputs<T> {
    fn new() -> Self {
        Self {
            outputs: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.outputs.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<T> {
        self.outputs.remove(name)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Group stages into waves (indices into the input) in dependency order.
pub fn plan_waves(stages: &[(&'static str, Vec<&'static str>)]) -> Result<Vec<Vec<usize>>> {
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();
    for (i, (name, _)) in stages.iter().enumerate() {
        if index_by_name.insert(*name, i).is_some() {
            bail!("duplicate build stage: {name}");
        }
    }

    let mut indeg: Vec<usize> = vec![0; stages.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); stages.len()];
    for (i, (name, deps)) in stages.iter().enumerate() {
        for dep in deps {
            let Some(&d) = index_by_name.get(dep) else {
                bail!("build stage {name} depends on unknown stage {dep}");
            };
            indeg[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..stages.len()).filter(|&i| indeg[i] == 0).collect();
    let mut waves: Vec<Vec<usize>> = Vec::new();
    let mut scheduled = 0;
    while !ready.is_empty() {
        let wave: Vec<usize> = ready.drain(..).collect();
        for &i in &wave {
            for &next in &dependents[i] {
                indeg[next] -= 1;
                if indeg[next] == 0 {
                    ready.push_back(next);
                }
            }
        }
        scheduled += wave.len();
        waves.push(wave);
    }

    if scheduled != stages.len() {
        bail!("cycle detected in build stage dependencies");
    }
    Ok(waves)
}

/// Run every stage, returning once all of them have completed.
///
/// Fails with the first error in input order once the failing wave has joined;
/// later waves do not start.
pub fn run_stages<T: Send + Sync>(stages: Vec<BuildStage<'_, T>>) -> Result<StageOutputs<T>> {
    let shape: Vec<(&'static str, Vec<&'static str>)> =
        stages.iter().map(|s| (s.name, s.deps.clone())).collect();
    let waves = plan_waves(&shape)?;

    let mut pending: Vec<Option<BuildStage<'_, T>>> = stages.into_iter().map(Some).collect();
    let mut outputs = StageOutputs::new();

    for wave in waves {
        let batch: Vec<(usize, BuildStage<'_, T>)> = wave
            .into_iter()
            .filter_map(|i| pending[i].take().map(|s| (i, s)))
            .collect();

        let mut results: Vec<(usize, &'static str, Result<T>, Duration)> =
            thread::scope(|scope| {
                let (tx, rx) = crossbeam_channel::unbounded();
                let done = &outputs;
                for (i, stage) in batch {
                    let tx = tx.clone();
                    scope.spawn(move || {
                        let start = Instant::now();
                        let result = (stage.run)(done);
                        let _ = tx.send((i, stage.name, result, start.elapsed()));
                    });
                }
                drop(tx);
                rx.iter().collect()
            });
        results.sort_by_key(|(i, ..)| *i);

        let mut first_error = None;
        for (_, name, result, elapsed) in results {
            log::debug!("build stage {name} finished in {elapsed:?}");
            match result {
                Ok(v) => {
                    outputs.outputs.insert(name, v);
                }
                Err(e) if first_error.is_none() => {
                    first_error = Some(e.context(format!("build stage {name} failed")));
                }
                Err(e) => log::debug!("build stage {name} also failed: {e:#}"),
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Ok(outputs)
}
