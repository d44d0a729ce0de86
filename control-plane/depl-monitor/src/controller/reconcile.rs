use std::future::Future;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ControllerConfig;
use crate::crd::MonDepl;
use crate::store::{Deletion, ObjectKey, ObjectStore, StoreError};

use super::ReconcileErr;
use super::decision::{Observed, Step, evaluate};
use super::{naming, owner, status, workload};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Try again soon; nothing failed that needs reporting.
    Retry,
}

/// Drives the Deployment behind one MonDepl towards its spec.
///
/// Holds no per-object state between passes. Callers must not run two
/// passes for the same key at once; different keys may run in parallel.
pub struct Reconciler {
    desired: Arc<dyn ObjectStore<MonDepl>>,
    managed: Arc<dyn ObjectStore<Deployment>>,
    cfg: ControllerConfig,
}

impl Reconciler {
    pub fn new(
        desired: Arc<dyn ObjectStore<MonDepl>>,
        managed: Arc<dyn ObjectStore<Deployment>>,
        cfg: ControllerConfig,
    ) -> Self {
        Self {
            desired,
            managed,
            cfg,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    #[instrument(skip_all, fields(ns = %key.namespace, name = %key.name))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Outcome, ReconcileErr> {
        let deadline = Instant::now() + self.cfg.pass_timeout();
        let mut conflicts = 0;
        loop {
            match self.pass(key, deadline).await {
                Err(ReconcileErr::Store(StoreError::Conflict(msg))) => {
                    if conflicts >= self.cfg.max_conflict_retries {
                        warn!(%msg, conflicts, "reconcile: conflicts persist; requeueing");
                        return Ok(Outcome::Retry);
                    }
                    conflicts += 1;
                    debug!(%msg, conflicts, "reconcile: write conflict; re-reading");
                }
                other => return other,
            }
        }
    }

    async fn pass(
        &self,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Outcome, ReconcileErr> {
        let managed_key = naming::underlying_key(key);

        let desired = bounded(deadline, self.desired.get(key))
            .await
            .inspect_err(|e| error!(error = %e, "reconcile: could not get MonDepl"))?;
        let managed = bounded(deadline, self.managed.get(&managed_key))
            .await
            .inspect_err(|e| error!(error = %e, underlying = %managed_key, "reconcile: could not get underlying"))?;

        let step = evaluate(&Observed {
            desired: desired.as_ref(),
            managed: managed.as_ref(),
        });
        debug!(?step, "reconcile: step selected");

        match step {
            Step::Noop(reason) => {
                info!(?reason, "reconcile: nothing to do");
                Ok(Outcome::Done)
            }
            Step::DeleteManaged(reason) => {
                info!(?reason, underlying = %managed_key, "reconcile: deleting underlying");
                let deletion = bounded(deadline, self.managed.delete(&managed_key))
                    .await
                    .inspect_err(|e| error!(error = %e, "reconcile: failed to delete underlying"))?;
                if deletion == Deletion::AlreadyGone {
                    debug!("reconcile: underlying vanished before delete");
                }
                Ok(Outcome::Done)
            }
            Step::Create(desired) => self.create(desired, &managed_key, deadline).await,
            Step::Update(desired, managed) => {
                self.update(desired, managed, deadline).await
            }
        }
    }

    async fn create(
        &self,
        desired: &MonDepl,
        managed_key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Outcome, ReconcileErr> {
        let mut underlying = workload::build_underlying(desired, managed_key);
        owner::link(desired, &mut underlying)
            .inspect_err(|e| error!(error = %e, "reconcile: could not set owner reference"))?;

        info!(underlying = %managed_key, "reconcile: creating underlying");
        let created = bounded(deadline, self.managed.create(&underlying))
            .await
            .inspect_err(|e| error!(error = %e, "reconcile: could not create underlying"))?;

        self.publish(desired, &created, deadline).await?;
        Ok(Outcome::Done)
    }

    async fn update(
        &self,
        desired: &MonDepl,
        managed: &Deployment,
        deadline: Instant,
    ) -> Result<Outcome, ReconcileErr> {
        let mut next = managed.clone();
        owner::link(desired, &mut next)
            .inspect_err(|e| error!(error = %e, "reconcile: could not set owner reference"))?;
        workload::overwrite(&mut next, desired);

        let current = if next == *managed {
            debug!("reconcile: underlying already in sync; skipping update");
            next
        } else {
            info!("reconcile: updating underlying");
            bounded(deadline, self.managed.update(&next))
                .await
                .inspect_err(|e| error!(error = %e, "reconcile: could not update underlying"))?
        };

        if self.cfg.heal_status && !status::is_current(desired, &current) {
            warn!("reconcile: status.active missing or stale; republishing");
            self.publish(desired, &current, deadline).await?;
        }
        Ok(Outcome::Done)
    }

    async fn publish(
        &self,
        desired: &MonDepl,
        managed: &Deployment,
        deadline: Instant,
    ) -> Result<(), ReconcileErr> {
        info!("reconcile: updating MonDepl status");
        let reference = status::reference_for(managed);
        bounded(deadline, status::publish(self.desired.as_ref(), desired, reference))
            .await
            .inspect_err(|e| error!(error = %e, "reconcile: could not update status of MonDepl"))?;
        Ok(())
    }
}

async fn bounded<T, F>(deadline: Instant, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    timeout_at(deadline, call)
        .await
        .map_err(|_| StoreError::Timeout)?
}
