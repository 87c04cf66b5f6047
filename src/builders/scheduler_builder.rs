//! Builders to construct named schedulers from configuration.

use std::collections::HashMap;

use tracing::info;

use crate::config::SchedulerSetConfig;
use crate::core::{Scheduler, SchedulerError};

/// Build and start one scheduler per configured entry.
///
/// Either every scheduler starts or none is left running: schedulers built
/// before a failure are dropped, which stops them.
///
/// # Errors
///
/// `InvalidConfig` if the set fails validation, or the first construction
/// error encountered.
pub fn build_schedulers(
    cfg: &SchedulerSetConfig,
) -> Result<HashMap<String, Scheduler>, SchedulerError> {
    cfg.validate()?;

    let mut schedulers = HashMap::with_capacity(cfg.schedulers.len());
    for (name, scheduler_cfg) in &cfg.schedulers {
        let scheduler = Scheduler::from_config(scheduler_cfg)?;
        info!(name = %name, scheduler = %scheduler.id(), "named scheduler ready");
        schedulers.insert(name.clone(), scheduler);
    }

    Ok(schedulers)
}
