//! Window size planner.
//!
//! Every [`LayoutSignal`] change cancels whatever was pending and decides
//! afresh:
//!
//! | state                       | action                                   |
//! |-----------------------------|------------------------------------------|
//! | no content, not loading     | hide after `hide_delay_ms`               |
//! | loading                     | show at `loading_height`, immediately    |
//! | content, not loading        | after `debounce_ms`, measure and show    |
//!
//! Measuring waits for the consumer's render, then for the host's layout
//! pass, and only then reads the content height (clamped to
//! `max_content_height`).  High-frequency stream updates therefore collapse
//! into one measurement per quiet period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::ToolbarConfig;
use crate::session::LayoutSignal;
use crate::surface::SurfaceHost;

/// What a signal asks of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Hide,
    ShowLoading,
    Measure,
}

impl Plan {
    pub fn for_signal(signal: &LayoutSignal) -> Self {
        if !signal.has_content {
            Plan::Hide
        } else if signal.is_loading {
            Plan::ShowLoading
        } else {
            Plan::Measure
        }
    }
}

pub struct WindowSizePlanner {
    host: Arc<dyn SurfaceHost>,
    loading_height: u32,
    max_content_height: u32,
    debounce: Duration,
    hide_delay: Duration,
}

impl WindowSizePlanner {
    pub fn new(host: Arc<dyn SurfaceHost>, config: &ToolbarConfig) -> Self {
        Self {
            host,
            loading_height: config.loading_height,
            max_content_height: config.max_content_height,
            debounce: Duration::from_millis(config.debounce_ms),
            hide_delay: Duration::from_millis(config.hide_delay_ms),
        }
    }

    /// React to `signals` until the sender side is dropped.
    pub async fn run(self, mut signals: watch::Receiver<LayoutSignal>) {
        let initial = *signals.borrow_and_update();
        let mut pending = self.on_signal(&initial).await;

        loop {
            let deadline = pending.map(|(_, at)| at);
            tokio::select! {
                changed = signals.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let signal = *signals.borrow_and_update();
                    pending = self.on_signal(&signal).await;
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((plan, _)) = pending.take() {
                        self.fire(plan).await;
                    }
                }
            }
        }

        log::debug!("planner: layout channel closed");
    }

    /// Returns the delayed action to schedule, if any.
    async fn on_signal(&self, signal: &LayoutSignal) -> Option<(Plan, Instant)> {
        match Plan::for_signal(signal) {
            Plan::Hide => Some((Plan::Hide, Instant::now() + self.hide_delay)),
            Plan::ShowLoading => {
                if let Err(e) = self.host.show(self.loading_height).await {
                    log::warn!("planner: show loading surface failed: {e}");
                }
                None
            }
            Plan::Measure => Some((Plan::Measure, Instant::now() + self.debounce)),
        }
    }

    async fn fire(&self, plan: Plan) {
        match plan {
            Plan::Hide => {
                log::debug!("planner: no content, hiding");
                if let Err(e) = self.host.hide().await {
                    log::debug!("planner: hide failed (surface not ready?): {e}");
                }
            }
            Plan::Measure => self.measure_and_show().await,
            Plan::ShowLoading => {}
        }
    }

    async fn measure_and_show(&self) {
        self.host.wait_for_render().await;
        self.host.wait_for_layout().await;

        let measured = match self.host.content_height().await {
            Ok(h) => h,
            Err(e) => {
                log::warn!("planner: content not measurable: {e}");
                return;
            }
        };
        let height = measured.min(self.max_content_height);
        log::debug!("planner: content {measured}px -> show {height}px");

        if let Err(e) = self.host.show(height).await {
            log::warn!("planner: resize failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HostError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Show(u32),
        Hide,
        Render,
        Layout,
        Measure,
    }

    struct MockHost {
        start: Instant,
        content_height: u32,
        calls: Mutex<Vec<(Call, Duration)>>,
    }

    impl MockHost {
        fn new(content_height: u32) -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                content_height,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, call: Call) {
            self.calls
                .lock()
                .unwrap()
                .push((call, Instant::now() - self.start));
        }

        fn calls(&self) -> Vec<(Call, Duration)> {
            self.calls.lock().unwrap().clone()
        }

        /// Surface-changing calls only.
        fn surface_calls(&self) -> Vec<(Call, Duration)> {
            self.calls()
                .into_iter()
                .filter(|(c, _)| matches!(c, Call::Show(_) | Call::Hide))
                .collect()
        }
    }

    #[async_trait]
    impl SurfaceHost for MockHost {
        async fn show(&self, height: u32) -> Result<(), HostError> {
            self.record(Call::Show(height));
            Ok(())
        }

        async fn hide(&self) -> Result<(), HostError> {
            self.record(Call::Hide);
            Ok(())
        }

        async fn set_always_on_top(&self, _on_top: bool) -> Result<(), HostError> {
            Ok(())
        }

        async fn wait_for_render(&self) {
            self.record(Call::Render);
        }

        async fn wait_for_layout(&self) {
            self.record(Call::Layout);
        }

        async fn content_height(&self) -> Result<u32, HostError> {
            self.record(Call::Measure);
            Ok(self.content_height)
        }
    }

    fn signal(has_content: bool, is_loading: bool, revision: u64) -> LayoutSignal {
        LayoutSignal {
            has_content,
            is_loading,
            revision,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn spawn_planner(
        host: &Arc<MockHost>,
        initial: LayoutSignal,
    ) -> (watch::Sender<LayoutSignal>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = watch::channel(initial);
        let planner = WindowSizePlanner::new(host.clone(), &ToolbarConfig::default());
        (tx, tokio::spawn(planner.run(rx)))
    }

    #[test]
    fn plan_for_signal() {
        assert_eq!(Plan::for_signal(&signal(false, false, 0)), Plan::Hide);
        assert_eq!(Plan::for_signal(&signal(true, true, 0)), Plan::ShowLoading);
        assert_eq!(Plan::for_signal(&signal(true, false, 0)), Plan::Measure);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_shows_fixed_height_without_debounce() {
        let host = MockHost::new(300);
        let (_tx, _task) = spawn_planner(&host, signal(true, true, 1));

        tokio::time::sleep(ms(200)).await;

        assert_eq!(host.calls(), vec![(Call::Show(50), ms(0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn content_is_measured_after_full_debounce() {
        let host = MockHost::new(320);
        let (_tx, _task) = spawn_planner(&host, signal(true, false, 1));

        tokio::time::sleep(ms(49)).await;
        assert!(host.calls().is_empty());

        tokio::time::sleep(ms(100)).await;
        assert_eq!(
            host.calls(),
            vec![
                (Call::Render, ms(50)),
                (Call::Layout, ms(50)),
                (Call::Measure, ms(50)),
                (Call::Show(320), ms(50)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn measured_height_is_clamped() {
        let host = MockHost::new(1_200);
        let (_tx, _task) = spawn_planner(&host, signal(true, false, 1));

        tokio::time::sleep(ms(100)).await;
        assert_eq!(host.surface_calls(), vec![(Call::Show(500), ms(50))]);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_bursts_collapse_into_one_measurement() {
        let host = MockHost::new(120);
        let (tx, _task) = spawn_planner(&host, signal(true, false, 1));

        for rev in 2..=5 {
            tokio::time::sleep(ms(20)).await;
            tx.send(signal(true, false, rev)).unwrap();
        }
        tokio::time::sleep(ms(200)).await;

        // Last update at 80ms, measured 50ms later.
        assert_eq!(host.surface_calls(), vec![(Call::Show(120), ms(130))]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_state_hides_after_delay() {
        let host = MockHost::new(100);
        let (_tx, _task) = spawn_planner(&host, signal(false, false, 0));

        tokio::time::sleep(ms(99)).await;
        assert!(host.calls().is_empty());

        tokio::time::sleep(ms(10)).await;
        assert_eq!(host.calls(), vec![(Call::Hide, ms(100))]);
    }

    #[tokio::test(start_paused = true)]
    async fn new_content_cancels_pending_hide() {
        let host = MockHost::new(80);
        let (tx, _task) = spawn_planner(&host, signal(false, false, 0));

        tokio::time::sleep(ms(60)).await;
        tx.send(signal(true, true, 1)).unwrap();
        tokio::time::sleep(ms(200)).await;

        assert_eq!(host.surface_calls(), vec![(Call::Show(50), ms(60))]);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_cancels_pending_measurement() {
        let host = MockHost::new(80);
        let (tx, _task) = spawn_planner(&host, signal(true, false, 1));

        tokio::time::sleep(ms(30)).await;
        tx.send(signal(true, true, 2)).unwrap();
        tokio::time::sleep(ms(200)).await;

        assert_eq!(host.calls(), vec![(Call::Show(50), ms(30))]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ends_when_sender_drops() {
        let host = MockHost::new(80);
        let (tx, task) = spawn_planner(&host, signal(true, true, 1));
        drop(tx);
        task.await.unwrap();
    }
}
