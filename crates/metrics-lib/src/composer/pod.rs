//! Pod views

use super::usage::{child_usage, UsageFields};
use super::MetricsService;
use crate::backend;
use crate::error::Result;
use crate::extract::KeyField;
use crate::fanout::FanOut;
use crate::models::{PodPhase, PodRecord};
use crate::query::{templates as pq, Dimensions, Division};
use std::time::Instant;
use tracing::{debug, warn};

impl MetricsService {
    /// One record per pod of the pod name list, each pod summed in its own
    /// task. Records keep name-list order.
    pub async fn pod_metric_list(&self) -> Result<Vec<PodRecord>> {
        let started = Instant::now();
        let (pods, denominators) = tokio::join!(
            backend::fetch_rows(
                self.backend.as_ref(),
                pq::POD_NAME_LIST,
                &[(KeyField::Pod, "pod_name")],
            ),
            self.denominators("pod_metric_list"),
        );
        let (pods, denominators) = (pods?, denominators?);

        let mut fan_out = FanOut::new();
        for row in pods {
            let pod_name = row.get(KeyField::Pod).unwrap_or_default().to_string();
            let backend = self.backend.clone();

            fan_out.spawn("pod", async move {
                let dims = Dimensions::new().pod(pod_name.clone());
                let fields = match child_usage(
                    backend,
                    Division::Pod,
                    dims,
                    denominators.machine_memory,
                )
                .await
                {
                    Ok(totals) => UsageFields::render(&totals, &denominators),
                    Err(e) => {
                        warn!(pod = %pod_name, error = %e, "Pod usage unavailable");
                        UsageFields::default()
                    }
                };

                PodRecord {
                    pod_name,
                    cpu: fields.cpu,
                    cpu_usage: fields.cpu_usage,
                    memory: fields.memory,
                    memory_usage: fields.memory_usage,
                    disk: fields.disk,
                    disk_usage: fields.disk_usage,
                }
            });
        }

        let records = fan_out.join().await?.into_ordered();
        self.finish("pod_metric_list", records.len(), started);
        Ok(records)
    }

    /// Pod counts by phase. `total` is derived from the buckets, never
    /// queried, so it always equals their sum.
    pub async fn pod_phase(&self) -> Result<PodPhase> {
        let rows = backend::fetch_rows(
            self.backend.as_ref(),
            pq::POD_PHASE,
            &[(KeyField::Phase, "phase")],
        )
        .await?;

        let mut phase = PodPhase::default();
        for row in &rows {
            let count = row.number().unwrap_or(0.0).max(0.0).round() as u64;
            let bucket = match row.get(KeyField::Phase).unwrap_or_default() {
                "Failed" => &mut phase.failed,
                "Pending" => &mut phase.pending,
                "Running" => &mut phase.running,
                "Succeeded" => &mut phase.succeeded,
                "Unknown" => &mut phase.unknown,
                other => {
                    debug!(phase = other, "Ignoring unrecognized pod phase");
                    continue;
                }
            };
            *bucket += count;
        }
        phase.total = phase.bucket_sum();

        Ok(phase)
    }
}
