//! Generation schedule
//!
//! Survey questions are regenerated at local midnight on the 1st of each month;
//! personal questions daily at a configured local hour.

use crate::generation::QuestionGenerator;
use chrono::{DateTime, Datelike, Days, Duration as ChronoDuration, FixedOffset, Months, NaiveDate, Utc};
use recall_common::time::{local_date, now, start_of_local_day};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// First local midnight on the 1st of a month strictly after `after`
pub fn next_monthly_run(after: DateTime<Utc>, offset: &FixedOffset) -> DateTime<Utc> {
    let first = first_of_month(local_date(after, offset));
    let candidate = start_of_local_day(first, offset);
    if candidate > after {
        candidate
    } else {
        start_of_local_day(first + Months::new(1), offset)
    }
}

/// First local `hour:00` strictly after `after`; `hour` is clamped to 23
pub fn next_daily_run(after: DateTime<Utc>, offset: &FixedOffset, hour: u32) -> DateTime<Utc> {
    let at_hour = |date: NaiveDate| start_of_local_day(date, offset) + ChronoDuration::hours(i64::from(hour.min(23)));

    let today = local_date(after, offset);
    let candidate = at_hour(today);
    if candidate > after {
        candidate
    } else {
        at_hour(today + Days::new(1))
    }
}

fn until(instant: DateTime<Utc>) -> Duration {
    (instant - now()).to_std().unwrap_or(Duration::ZERO)
}

pub struct Scheduler {
    generator: Arc<QuestionGenerator>,
    offset: FixedOffset,
    personal_hour: u32,
}

impl Scheduler {
    pub fn new(generator: Arc<QuestionGenerator>, offset: FixedOffset, personal_hour: u32) -> Self {
        Self {
            generator,
            offset,
            personal_hour,
        }
    }

    /// Run both schedules until the returned handle is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        let offset = self.offset;
        let hour = self.personal_hour;

        let survey = {
            let generator = Arc::clone(&self.generator);
            run_forever("survey", move |after| next_monthly_run(after, &offset), move || {
                let generator = Arc::clone(&generator);
                async move {
                    if let Err(e) = generator.generate_survey_questions().await {
                        error!(error = %e, "Scheduled survey generation failed");
                    }
                }
            })
        };

        let personal = {
            let generator = Arc::clone(&self.generator);
            run_forever("personal", move |after| next_daily_run(after, &offset, hour), move || {
                let generator = Arc::clone(&generator);
                async move {
                    if let Err(e) = generator.generate_personal_for_day(now()).await {
                        error!(error = %e, "Scheduled personal generation failed");
                    }
                }
            })
        };

        tokio::spawn(async move {
            tokio::join!(survey, personal);
        })
    }
}

async fn run_forever<N, J, F>(name: &'static str, next_run: N, job: J)
where
    N: Fn(DateTime<Utc>) -> DateTime<Utc>,
    J: Fn() -> F,
    F: Future<Output = ()>,
{
    loop {
        let at = next_run(now());
        info!(schedule = name, next_run = %at, "Next scheduled generation");
        tokio::time::sleep(until(at)).await;

        info!(schedule = name, "Running scheduled generation");
        job().await;
    }
}
