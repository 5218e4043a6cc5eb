//! Daily broadcast scheduling.
//!
//! Each configured `HH:MM` becomes a cron schedule expanded in the
//! configured timezone. A single loop tracks the next fire instant per
//! schedule and invokes the broadcast exactly once per firing, independent
//! of its outcome.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::time::{self, Duration, Instant};
use tracing::{error, info, warn};

use dustline_broadcast::BroadcastService;
use dustline_config::BroadcastTime;

/// Hard ceiling on one broadcast run; a hung fetch becomes a logged failure
/// instead of blocking the timer.
const BROADCAST_DEADLINE: Duration = Duration::from_secs(120);

pub struct BroadcastScheduler {
    schedules: Vec<Schedule>,
    timezone: Tz,
    broadcast: Arc<BroadcastService>,
}

impl BroadcastScheduler {
    pub fn new(
        times: &[BroadcastTime],
        timezone: &str,
        broadcast: Arc<BroadcastService>,
    ) -> Result<Self> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("unknown timezone '{}': {}", timezone, e))?;
        let schedules = times
            .iter()
            .map(|t| {
                Schedule::from_str(&cron_expression(t))
                    .with_context(|| format!("bad schedule for {:02}:{:02}", t.hour, t.minute))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schedules,
            timezone,
            broadcast,
        })
    }

    /// Run the scheduling loop forever.
    pub async fn run(&self) {
        let mut next_fires: Vec<Option<Instant>> = Vec::with_capacity(self.schedules.len());
        for schedule in &self.schedules {
            match schedule.upcoming(self.timezone).next() {
                Some(next) => info!(next = %next, tz = %self.timezone, "Broadcast scheduled"),
                None => warn!("Schedule yields no upcoming fire time"),
            }
            next_fires.push(self.next_fire(schedule));
        }

        let mut ticker = time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let now = Instant::now();
            for (i, schedule) in self.schedules.iter().enumerate() {
                let due = matches!(next_fires[i], Some(fire_at) if now >= fire_at);
                if !due {
                    continue;
                }

                info!("Broadcast trigger fired");
                match time::timeout(BROADCAST_DEADLINE, self.broadcast.run()).await {
                    Ok(true) => info!("Scheduled broadcast completed"),
                    Ok(false) => error!("Scheduled broadcast failed"),
                    Err(_) => error!("Scheduled broadcast timed out"),
                }

                next_fires[i] = self.next_fire(schedule);
            }
        }
    }

    fn next_fire(&self, schedule: &Schedule) -> Option<Instant> {
        let next = schedule.upcoming(self.timezone).next()?;
        let until = (next.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(60));
        Some(Instant::now() + until)
    }
}

/// 6-field cron expression firing daily at the given wall-clock time.
fn cron_expression(time: &BroadcastTime) -> String {
    format!("0 {} {} * * *", time.minute, time.hour)
}
