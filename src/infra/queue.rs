//! Broker consumption with indefinite fixed-delay reconnection.

use futures::StreamExt;
use lapin::{
    Connection, ConnectionProperties,
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
};
use metrics::counter;
use tracing::{info, warn};

use crate::{
    application::worker::{self, WorkerContext},
    config::BrokerSettings,
    domain::job::RenderJob,
};

const CONSUMER_TAG: &str = "memeforge-worker";

/// Consumes render jobs from the well-known queue, one delivery at a time.
///
/// Every delivery is acknowledged after dispatch regardless of the job's
/// outcome, so the broker never redelivers; the status store is the only
/// record of failures. Connection faults tear everything down and the full
/// connect sequence is retried after a fixed delay, forever.
pub struct QueueConsumer {
    settings: BrokerSettings,
}

impl QueueConsumer {
    pub fn new(settings: BrokerSettings) -> Self {
        Self { settings }
    }

    /// Run the consume loop. Never returns; the caller decides process
    /// lifetime (for example by racing against a shutdown signal).
    pub async fn run(&self, ctx: WorkerContext) {
        loop {
            match self.consume(&ctx).await {
                Ok(()) => {
                    warn!(
                        target = "memeforge::queue",
                        "consumer stream ended; reconnecting"
                    );
                }
                Err(error) => {
                    warn!(
                        target = "memeforge::queue",
                        error = %error,
                        delay_seconds = self.settings.reconnect_delay.as_secs(),
                        "broker connection lost; reconnecting"
                    );
                }
            }
            counter!("memeforge_broker_reconnects_total").increment(1);
            tokio::time::sleep(self.settings.reconnect_delay).await;
        }
    }

    async fn consume(&self, ctx: &WorkerContext) -> Result<(), lapin::Error> {
        let connection =
            Connection::connect(&self.settings.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        // One unacked delivery at a time: the job runs to completion before
        // the broker hands over the next message.
        channel.basic_qos(1, BasicQosOptions::default()).await?;
        channel
            .queue_declare(
                &self.settings.queue,
                QueueDeclareOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let mut consumer = channel
            .basic_consume(
                &self.settings.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            target = "memeforge::queue",
            queue = %self.settings.queue,
            "worker started, waiting for render jobs"
        );

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;

            match decode_job(&delivery.data) {
                Ok(job) => worker::dispatch(ctx.clone(), job).await,
                Err(decode_error) => {
                    counter!("memeforge_messages_dropped_total").increment(1);
                    warn!(
                        target = "memeforge::queue",
                        error = %decode_error,
                        bytes = delivery.data.len(),
                        "dropping undecodable message"
                    );
                }
            }

            delivery.ack(BasicAckOptions::default()).await?;
        }

        Ok(())
    }
}

fn decode_job(body: &[u8]) -> Result<RenderJob, serde_json::Error> {
    serde_json::from_slice(body)
}
