use foldserve::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";
const BAR_TEMPLATE: &str = "{msg:<20} [{bar:30.green/white}] {pos}/{len} steps";

struct BarState {
    bar: ProgressBar,
    phase: &'static str,
}

/// Renders pipeline progress on stderr: a spinner while the model runs, then
/// a bar over the written recycle structures.
#[derive(Clone)]
pub struct FoldProgress {
    state: Arc<Mutex<BarState>>,
}

impl FoldProgress {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        bar.finish_and_clear();
        Self {
            state: Arc::new(Mutex::new(BarState { bar, phase: "" })),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();
        Box::new(move |event: Progress| {
            let Ok(mut guard) = state.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };
            apply(&mut guard, event);
        })
    }
}

impl Default for FoldProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(state: &mut BarState, event: Progress) {
    let bar = &state.bar;
    match event {
        Progress::PhaseStart { name } => {
            state.phase = name;
            bar.reset();
            bar.set_length(0);
            bar.set_style(spinner_style());
            bar.set_message(name);
            bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
        Progress::PhaseFinish => {
            bar.disable_steady_tick();
            bar.finish_with_message(format!("{} ✓", state.phase));
        }
        Progress::TaskStart { total_steps } => {
            bar.disable_steady_tick();
            bar.reset();
            bar.set_style(bar_style());
            bar.set_length(total_steps);
            bar.set_position(0);
        }
        Progress::TaskIncrement => bar.inc(1),
        Progress::TaskFinish => {
            if let Some(len) = bar.length() {
                bar.set_position(len);
            }
            bar.finish();
        }
        Progress::Message(msg) => {
            if bar.is_finished() {
                bar.set_message(msg);
            } else {
                bar.println(format!("  {}", msg));
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden() -> FoldProgress {
        FoldProgress::with_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn starts_finished_and_empty() {
        let progress = hidden();
        let state = progress.state.lock().unwrap();
        assert_eq!(state.bar.length(), Some(0));
        assert!(state.bar.is_finished());
    }

    #[test]
    fn follows_a_fold_run() {
        let progress = hidden();
        let callback = progress.callback();

        callback(Progress::PhaseStart { name: "Inference" });
        {
            let state = progress.state.lock().unwrap();
            assert_eq!(state.bar.message(), "Inference");
            assert!(!state.bar.is_finished());
        }
        callback(Progress::PhaseFinish);
        assert_eq!(progress.state.lock().unwrap().bar.message(), "Inference ✓");

        callback(Progress::PhaseStart {
            name: "Writing structures",
        });
        callback(Progress::TaskStart { total_steps: 8 });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        {
            let state = progress.state.lock().unwrap();
            assert_eq!(state.bar.length(), Some(8));
            assert_eq!(state.bar.position(), 2);
        }

        callback(Progress::TaskFinish);
        {
            let state = progress.state.lock().unwrap();
            assert!(state.bar.is_finished());
            assert_eq!(state.bar.position(), 8);
        }
        callback(Progress::PhaseFinish);
        assert_eq!(
            progress.state.lock().unwrap().bar.message(),
            "Writing structures ✓"
        );
    }

    #[test]
    fn callback_can_move_to_a_worker_thread() {
        let progress = hidden();
        let callback = progress.callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Inference" });
            callback(Progress::Message("loading weights".to_string()));
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let state = progress.state.lock().unwrap();
        assert!(state.bar.is_finished());
        assert_eq!(state.bar.message(), "Inference ✓");
    }
}
