// THEORY:
// The `parallel_pipeline` runs several camera sessions side by side. Each stream
// gets its own worker on tokio's blocking pool that owns a `VisionPipeline`, and
// with it that camera's calibration threshold. Requests travel over an `mpsc`
// channel and answers come back on a `oneshot`, so no session state is ever shared
// or locked: two cameras can only influence each other through CPU time.

use crate::core_modules::color_quantizer::Quantization;
use crate::core_modules::error::{Result, VisionError};
use crate::core_modules::frame::RgbFrame;
use crate::pipeline::{PipelineConfig, Report, VisionPipeline};
use futures::future::join_all;
use log::trace;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const STREAM_QUEUE_DEPTH: usize = 8;

pub type StreamId = usize;

/// Message type for stream workers.
enum StreamMessage {
    FindTarget(RgbFrame, oneshot::Sender<Result<Report>>),
    Quantize(RgbFrame, oneshot::Sender<Result<Quantization>>),
    Threshold(oneshot::Sender<f64>),
    Shutdown,
}

struct StreamWorker {
    sender: mpsc::Sender<StreamMessage>,
    handle: JoinHandle<()>,
}

impl StreamWorker {
    fn spawn(stream: StreamId, config: PipelineConfig) -> Self {
        let (sender, mut receiver) = mpsc::channel::<StreamMessage>(STREAM_QUEUE_DEPTH);

        let handle = tokio::task::spawn_blocking(move || {
            let mut pipeline = VisionPipeline::new(config);
            trace!("stream {} worker started", stream);

            while let Some(message) = receiver.blocking_recv() {
                match message {
                    StreamMessage::FindTarget(frame, reply) => {
                        let _ = reply.send(pipeline.find_target(&frame));
                    }
                    StreamMessage::Quantize(frame, reply) => {
                        let _ = reply.send(pipeline.quantize(&frame));
                    }
                    StreamMessage::Threshold(reply) => {
                        let _ = reply.send(pipeline.threshold());
                    }
                    StreamMessage::Shutdown => break,
                }
            }
            trace!(
                "stream {} worker stopped after {} frames",
                stream,
                pipeline.frames_processed()
            );
        });

        Self { sender, handle }
    }
}

/// One independent `VisionPipeline` per camera stream.
pub struct ParallelPipeline {
    workers: Vec<StreamWorker>,
}

impl ParallelPipeline {
    /// Starts one worker per config. Must be called inside a tokio runtime.
    pub fn new(configs: Vec<PipelineConfig>) -> Self {
        let workers = configs
            .into_iter()
            .enumerate()
            .map(|(stream, config)| StreamWorker::spawn(stream, config))
            .collect();
        Self { workers }
    }

    pub fn stream_count(&self) -> usize {
        self.workers.len()
    }

    async fn request<T>(
        &self,
        stream: StreamId,
        message: impl FnOnce(oneshot::Sender<T>) -> StreamMessage,
    ) -> Result<T> {
        let worker = self
            .workers
            .get(stream)
            .ok_or_else(|| VisionError::WorkerUnavailable(format!("no stream {stream}")))?;
        let (reply, response) = oneshot::channel();

        worker.sender.send(message(reply)).await.map_err(|_| {
            VisionError::WorkerUnavailable(format!("stream {stream} is not accepting frames"))
        })?;
        response
            .await
            .map_err(|_| VisionError::WorkerUnavailable(format!("stream {stream} dropped its reply")))
    }

    pub async fn process_frame(&self, stream: StreamId, frame: RgbFrame) -> Result<Report> {
        self.request(stream, |reply| StreamMessage::FindTarget(frame, reply))
            .await?
    }

    pub async fn quantize(&self, stream: StreamId, frame: RgbFrame) -> Result<Quantization> {
        self.request(stream, |reply| StreamMessage::Quantize(frame, reply))
            .await?
    }

    /// Current calibration threshold of one stream.
    pub async fn threshold(&self, stream: StreamId) -> Result<f64> {
        self.request(stream, StreamMessage::Threshold).await
    }

    /// Processes frames from several streams concurrently. Results keep input order.
    pub async fn process_batch(&self, frames: Vec<(StreamId, RgbFrame)>) -> Vec<Result<Report>> {
        join_all(
            frames
                .into_iter()
                .map(|(stream, frame)| self.process_frame(stream, frame)),
        )
        .await
    }

    /// Stops every worker and waits for it to finish.
    pub async fn shutdown(self) {
        for worker in self.workers {
            let _ = worker.sender.send(StreamMessage::Shutdown).await;
            let _ = worker.handle.await;
        }
    }
}
