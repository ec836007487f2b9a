use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{info, error};

use async_trait::async_trait;
use carshare_core::notification::{NotificationError, NotificationSink};

/// Publishes notifications to a Kafka topic
#[derive(Clone)]
pub struct KafkaNotifier {
    producer: FutureProducer,
    topic: String,
}

impl KafkaNotifier {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for KafkaNotifier {
    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        let record: FutureRecord<'_, (), str> = FutureRecord::to(&self.topic).payload(message);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!("Sent notification to {}: partition {} offset {}", self.topic, delivery.partition, delivery.offset);
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send notification to {}: {}", self.topic, e);
                Err(NotificationError(e.to_string()))
            }
        }
    }
}
