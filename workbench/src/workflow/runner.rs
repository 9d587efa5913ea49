use anyhow::{anyhow, Context};
use erdcore::processing::{ExtractionReport, GenerationReport, TofInOptions};
use erdcore::{CancelFlag, Request, TabId};
use std::sync::{Arc, RwLock};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;

/// Outcome of a cut extraction, optionally followed by the slaves.
pub struct ExtractionResult {
    pub master: ExtractionReport,
    pub slaves: Vec<(TabId, ExtractionReport)>,
}

/// Runs long request operations on a worker thread so Ctrl+C can cancel
/// them cooperatively.
#[derive(Clone)]
pub struct Runner {
    request: Arc<RwLock<Request>>,
}

impl Runner {
    pub fn new(request: Request) -> Self {
        Self {
            request: Arc::new(RwLock::new(request)),
        }
    }

    pub fn request(&self) -> Arc<RwLock<Request>> {
        Arc::clone(&self.request)
    }

    pub fn generate_tof_in(
        &self,
        tab: TabId,
        options: TofInOptions,
    ) -> anyhow::Result<GenerationReport> {
        let request = self.request();
        self.run_cancellable("tof.in generation", move |cancel| {
            let request = request
                .read()
                .map_err(|_| anyhow!("request lock poisoned"))?;
            request
                .generate_tof_in(tab, &options, &cancel)
                .context("generating tof.in")
        })
    }

    pub fn extract_cuts(&self, tab: TabId, propagate: bool) -> anyhow::Result<ExtractionResult> {
        let request = self.request();
        self.run_cancellable("cut extraction", move |cancel| {
            let mut request = request
                .write()
                .map_err(|_| anyhow!("request lock poisoned"))?;
            let master = request
                .measurement_mut(tab)
                .with_context(|| format!("no measurement open in tab {}", tab.0))?
                .extract_cuts(&cancel)
                .context("extracting cuts")?;
            let slaves = if propagate {
                request
                    .set_master(Some(tab))
                    .context("marking master measurement")?;
                request
                    .propagate_master_selections(&cancel)
                    .context("propagating selections to slaves")?
            } else {
                Vec::new()
            };
            Ok(ExtractionResult { master, slaves })
        })
    }

    /// Runs `job` on the blocking pool and raises its cancel flag on Ctrl+C,
    /// then waits for the job to notice.
    fn run_cancellable<T, F>(&self, label: &str, job: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(CancelFlag) -> anyhow::Result<T> + Send + 'static,
    {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for worker jobs")?;
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();
        runtime.block_on(async {
            let mut task = tokio::task::spawn_blocking(move || job(worker_cancel));
            tokio::select! {
                joined = &mut task => joined.with_context(|| format!("{} worker panicked", label))?,
                Ok(()) = signal::ctrl_c() => {
                    log::warn!("Cancelling {}...", label);
                    cancel.cancel();
                    task.await.with_context(|| format!("{} worker panicked", label))?
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erdcore::model::{Selection, SelectionLabel};
    use erdcore::processing::GenerationStatus;
    use erdcore::settings::GlobalSettings;
    use std::fs;
    use tempfile::TempDir;

    fn runner_with_measurement(dir: &TempDir) -> (Runner, TabId) {
        let (mut request, _) =
            Request::open_or_create(&dir.path().join("req"), GlobalSettings::default()).unwrap();
        let tab = request.next_tab();
        let defaults = request.defaults().clone();
        let asc = dir.path().join("m1.asc");
        fs::write(&asc, "5 5\n50 50\n15 15\n").unwrap();
        request
            .add_sample("s")
            .unwrap()
            .import_measurement(tab, &asc, &defaults)
            .unwrap();
        (Runner::new(request), tab)
    }

    #[test]
    fn runner_generates_tof_in_once() {
        let dir = TempDir::new().unwrap();
        let (runner, tab) = runner_with_measurement(&dir);
        let first = runner.generate_tof_in(tab, TofInOptions::default()).unwrap();
        assert!(matches!(first.status, GenerationStatus::Written { backup: None }));
        let second = runner.generate_tof_in(tab, TofInOptions::default()).unwrap();
        assert_eq!(second.status, GenerationStatus::Unchanged);
        assert!(first.path.is_file());
    }

    #[test]
    fn runner_extracts_cuts() {
        let dir = TempDir::new().unwrap();
        let (runner, tab) = runner_with_measurement(&dir);
        {
            let request = runner.request();
            let mut request = request.write().unwrap();
            let square = Selection::closed(
                vec![(0.0, 0.0), (0.0, 20.0), (20.0, 20.0), (20.0, 0.0)],
                SelectionLabel::erd("H".parse().unwrap()),
            )
            .unwrap();
            *request.measurement_mut(tab).unwrap().selector_mut() =
                erdcore::model::Selector::from_closed(vec![square]);
        }
        let result = runner.extract_cuts(tab, false).unwrap();
        assert_eq!(result.master.written.len(), 1);
        assert!(result.slaves.is_empty());
        let cut = result.master.cuts.values().next().unwrap();
        assert_eq!(cut.points.len(), 2);
    }

    #[test]
    fn runner_reports_missing_tab() {
        let dir = TempDir::new().unwrap();
        let (runner, _) = runner_with_measurement(&dir);
        assert!(runner.extract_cuts(TabId(999), false).is_err());
    }
}
