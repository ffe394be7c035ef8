use std::future::Future;
use std::time::Duration;

use bloomjournal_core::{Event, HealthCheckTimer, PlantService, PlantStore, PlantView, Transition};
use clap::Subcommand;
use serde::Serialize;

use super::{open_service, parse_time, print_json, user_or_default, CmdResult};

#[derive(Subcommand)]
pub enum PlantAction {
    /// Create a seed for a new user
    Init {
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the plant with its derived visual state
    Show {
        #[arg(long)]
        user: Option<String>,
    },
    /// Run one idle health check
    Check {
        #[arg(long)]
        user: Option<String>,
        /// Check time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Catch a lagging stage up to the current points and streak
    Repair {
        #[arg(long)]
        user: Option<String>,
    },
    /// Keep running health checks on the configured cadence until Ctrl-C
    Watch {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Serialize)]
struct Report {
    plant: PlantView,
    events: Vec<Event>,
}

impl From<Transition> for Report {
    fn from(t: Transition) -> Self {
        Self {
            plant: t.state.view(),
            events: t.events,
        }
    }
}

pub fn run(action: PlantAction) -> CmdResult {
    let (service, config) = open_service()?;

    match action {
        PlantAction::Init { user } => {
            let user = user_or_default(user, &config);
            let state = service.onboard(&user)?;
            print_json(&state.view())?;
        }
        PlantAction::Show { user } => {
            let user = user_or_default(user, &config);
            print_json(&service.view(&user)?)?;
        }
        PlantAction::Check { user, at } => {
            let user = user_or_default(user, &config);
            let now = parse_time(at.as_deref())?.unwrap_or_else(|| service.now());
            print_json(&Report::from(service.health_check_at(&user, now)?))?;
        }
        PlantAction::Repair { user } => {
            let user = user_or_default(user, &config);
            print_json(&Report::from(service.recalculate_stage(&user)?))?;
        }
        PlantAction::Watch { user } => {
            let user = user_or_default(user, &config);
            // Fail fast on an unknown user instead of erroring on the first tick.
            service.load(&user)?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let timer = HealthCheckTimer::from_config(&config, service.now());
            runtime.block_on(watch(&service, &user, timer, tokio::signal::ctrl_c(), |t| {
                print_json(&Report::from(t))
            }))?;
        }
    }
    Ok(())
}

/// Poll `timer` once a second and run due health checks until `shutdown`
/// resolves. Only checks that changed the plant are passed to `report`.
///
/// `shutdown` is polled through one pinned future, so a signal raised while
/// a check is running is still seen on the next turn of the loop.
async fn watch<S: PlantStore>(
    service: &PlantService<S>,
    user: &str,
    mut timer: HealthCheckTimer,
    shutdown: impl Future,
    mut report: impl FnMut(Transition) -> CmdResult,
) -> CmdResult {
    let mut poll = tokio::time::interval(Duration::from_secs(1));
    tokio::pin!(shutdown);
    tracing::info!(user, next_due = %timer.next_due(), "watching plant");

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                tracing::info!("stopping watch");
                return Ok(());
            }
            _ = poll.tick() => {
                if timer.tick(service.now()) {
                    match service.health_check_now(user) {
                        Ok(t) if !t.events.is_empty() => report(t)?,
                        Ok(_) => tracing::debug!(user, "health check: no change"),
                        Err(e) => tracing::warn!(user, "health check failed: {e}"),
                    }
                }
            }
        }
    }
}
