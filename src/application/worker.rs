//! Per-job orchestration: fetch, composite, publish, and status discipline.

use std::sync::Arc;

use metrics::counter;
use tracing::{error, info, warn};

use crate::{
    application::{
        ports::{ArtifactStore, TaskStatusStore, TemplateSource},
        render::{self, Compositor},
    },
    domain::{job::RenderJob, task::TaskStatus},
};

/// Constructed-once dependencies shared by every job a worker processes.
#[derive(Clone)]
pub struct WorkerContext {
    pub status: Arc<dyn TaskStatusStore>,
    pub templates: Arc<dyn TemplateSource>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub compositor: Arc<Compositor>,
}

/// Run one job to completion, isolating panics at the job boundary.
///
/// The job is processed in a spawned task: if anything in the pipeline
/// panics, the join error is logged, the task is marked `Failed`, and the
/// consumer loop keeps serving subsequent deliveries.
pub async fn dispatch(ctx: WorkerContext, job: RenderJob) {
    let task_id = job.id.clone();
    let status = ctx.status.clone();

    match tokio::spawn(process_render_job(ctx, job)).await {
        Ok(()) => {}
        Err(join_error) => {
            counter!("memeforge_jobs_failed_total").increment(1);
            error!(
                target = "memeforge::worker",
                task_id,
                error = %join_error,
                "render job aborted unexpectedly"
            );
            write_status(status.as_ref(), &task_id, TaskStatus::Failed, None).await;
        }
    }
}

/// Fetch, composite, encode, publish. Every exit path leaves the task in a
/// terminal state; status-store faults are logged and swallowed so they
/// never change the job outcome.
pub async fn process_render_job(ctx: WorkerContext, job: RenderJob) {
    info!(
        target = "memeforge::worker",
        task_id = %job.id,
        layers = job.text_lines.len(),
        "processing render job"
    );

    write_status(ctx.status.as_ref(), &job.id, TaskStatus::Processing, None).await;

    let template = match ctx.templates.fetch(&job.template_url).await {
        Ok(image) => image,
        Err(fetch_error) => {
            warn!(
                target = "memeforge::worker",
                task_id = %job.id,
                template_url = %job.template_url,
                error = %fetch_error,
                "template fetch failed"
            );
            fail(&ctx, &job.id).await;
            return;
        }
    };

    let composed = ctx
        .compositor
        .compose(template, &job.text_lines, job.text_border);

    let bytes = match render::encode_jpeg(&render::flatten(&composed)) {
        Ok(bytes) => bytes,
        Err(encode_error) => {
            error!(
                target = "memeforge::worker",
                task_id = %job.id,
                error = %encode_error,
                "artifact encoding failed"
            );
            fail(&ctx, &job.id).await;
            return;
        }
    };

    match ctx.artifacts.publish(&job.id, bytes).await {
        Ok(url) => {
            counter!("memeforge_jobs_processed_total").increment(1);
            info!(
                target = "memeforge::worker",
                task_id = %job.id,
                url = %url,
                "render job complete"
            );
            write_status(ctx.status.as_ref(), &job.id, TaskStatus::Done, Some(&url)).await;
        }
        Err(publish_error) => {
            warn!(
                target = "memeforge::worker",
                task_id = %job.id,
                error = %publish_error,
                "artifact publish failed"
            );
            fail(&ctx, &job.id).await;
        }
    }
}

async fn fail(ctx: &WorkerContext, task_id: &str) {
    counter!("memeforge_jobs_failed_total").increment(1);
    write_status(ctx.status.as_ref(), task_id, TaskStatus::Failed, None).await;
}

async fn write_status(
    store: &dyn TaskStatusStore,
    task_id: &str,
    status: TaskStatus,
    image_url: Option<&str>,
) {
    if let Err(store_error) = store.set_status(task_id, status, image_url).await {
        warn!(
            target = "memeforge::worker",
            task_id,
            status = status.as_str(),
            error = %store_error,
            "status write failed"
        );
    }
}
