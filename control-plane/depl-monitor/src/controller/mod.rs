use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    Client,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tracing::{error, info, warn};

use crate::config::ControllerConfig;
use crate::crd::MonDepl;
use crate::store::{KubeStore, ObjectKey, StoreError};

pub mod decision;
pub mod naming;
pub mod owner;
pub mod reconcile;
pub mod status;
pub mod workload;

pub use owner::LinkError;
pub use reconcile::{Outcome, Reconciler};


#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Not expected to clear by itself; retried anyway.
    #[error("configuration error: {0}")]
    Configuration(#[from] LinkError),
}

pub struct ControllerContext {
    pub reconciler: Reconciler,
}

pub async fn run_controller(
    client: Client,
    cfg: ControllerConfig,
) -> anyhow::Result<()> {
    let (mondepls, deployments): (Api<MonDepl>, Api<Deployment>) =
        match cfg.watch_namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
            ),
            None => (Api::all(client.clone()), Api::all(client.clone())),
        };
    let reconciler = Reconciler::new(
        Arc::new(KubeStore::<MonDepl>::new(client.clone(), &cfg.field_manager)),
        Arc::new(KubeStore::<Deployment>::new(client, &cfg.field_manager)),
        cfg,
    );
    let ctx = Arc::new(ControllerContext { reconciler });

    Controller::new(mondepls, Config::default())
        .owns(deployments, Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(object = %obj_ref, ?action, "reconciled")
                }
                Err(e) => warn!(error = ?e, "reconcile dispatch error"),
            }
        })
        .await;

    Ok(())
}

/// Hands only the identity to the reconciler, which re-reads both objects.
async fn reconcile(
    obj: Arc<MonDepl>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let key = ObjectKey::of(obj.as_ref());
    let outcome = ctx.reconciler.reconcile(&key).await?;
    Ok(next_action(outcome, ctx.reconciler.config()))
}

pub fn next_action(outcome: Outcome, cfg: &ControllerConfig) -> Action {
    match outcome {
        Outcome::Done => Action::await_change(),
        Outcome::Retry => Action::requeue(cfg.retry_after()),
    }
}

fn error_policy(
    _obj: Arc<MonDepl>,
    err: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    if let ReconcileErr::Configuration(e) = err {
        error!(error = %e, "ownership link failed; needs operator attention");
    }
    Action::requeue(ctx.reconciler.config().error_backoff())
}
