//! Background vitals monitor.
//!
//! Polls the wearable for every cached user and logs abnormal readings, and
//! periodically refreshes wearable access tokens. Alerts are only logged.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::session::SessionCache;
use crate::wearable::{RefreshOutcome, WearableReport, WearableService};

/// Handle to the running monitor task.
pub struct MonitorHandle {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl MonitorHandle {
    /// Signal the monitor to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Vitals monitor task ended abnormally");
        }
    }
}

/// Spawn the monitor. Neither timer fires immediately.
pub fn spawn_vitals_monitor(
    wearable: Arc<WearableService>,
    sessions: Arc<SessionCache>,
    config: MonitorConfig,
) -> MonitorHandle {
    let (shutdown, mut stop) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(
            "Vitals monitor started: polling every {}s, refreshing tokens every {}s",
            config.poll_interval.as_secs(),
            config.token_refresh_interval.as_secs()
        );

        let mut poll = delayed_interval(config.poll_interval);
        let mut refresh = delayed_interval(config.token_refresh_interval);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    poll_vitals(&wearable, &sessions).await;
                }
                _ = refresh.tick() => {
                    refresh_tokens(&wearable, &sessions).await;
                }
                _ = stop.changed() => {
                    info!("Vitals monitor shutting down");
                    return;
                }
            }
        }
    });

    MonitorHandle { handle, shutdown }
}

fn delayed_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// One vitals pass over every cached user.
pub async fn poll_vitals(wearable: &WearableService, sessions: &SessionCache) -> usize {
    let ids = sessions.ids().await;
    debug!(users = ids.len(), "Polling wearable vitals");

    let mut alerted = 0;
    for user_id in &ids {
        match wearable.check(user_id).await {
            WearableReport::Alerts(alerts) => {
                alerted += 1;
                for alert in &alerts {
                    warn!(user_id = %user_id, alert = %alert, "Abnormal vital sign");
                }
            }
            report => debug!(user_id = %user_id, ?report, "Vitals checked"),
        }
    }
    alerted
}

/// One token-refresh pass over every cached user holding a refresh token.
pub async fn refresh_tokens(wearable: &WearableService, sessions: &SessionCache) -> usize {
    let mut refreshed = 0;
    for user_id in sessions.ids().await {
        if wearable.refresh_token(&user_id).await == RefreshOutcome::Refreshed {
            refreshed += 1;
        }
    }
    if refreshed > 0 {
        info!(refreshed, "Wearable tokens refreshed");
    }
    refreshed
}
