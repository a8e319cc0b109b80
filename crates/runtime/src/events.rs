use std::sync::mpsc;

use glam::Mat4;
use markerview_capture::OnReady;
use markerview_common::ElementSize;
use markerview_track::OnCompleted;

use crate::RuntimeError;

/// Which initialization step an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Source,
    Context,
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Context => "context",
        })
    }
}

/// Completion of an asynchronous initialization step.
#[derive(Debug)]
pub enum InitEvent {
    /// The video source is delivering frames of this native size.
    SourceReady(ElementSize),
    /// The detection context is ready; carries its projection matrix.
    ContextInitialized(Mat4),
    Failed { stage: InitStage, error: RuntimeError },
}

/// Sending half handed to backends. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<InitEvent>,
}

impl Notifier {
    pub fn send(&self, event: InitEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("init event dropped, session is gone");
        }
    }

    /// Completion for [`VideoSource::init`](markerview_capture::VideoSource::init).
    pub fn source_callback(&self) -> OnReady {
        let notifier = self.clone();
        Box::new(move |result| {
            notifier.send(match result {
                Ok(size) => InitEvent::SourceReady(size),
                Err(e) => InitEvent::Failed {
                    stage: InitStage::Source,
                    error: e.into(),
                },
            })
        })
    }

    /// Completion for [`DetectionContext::init`](markerview_track::DetectionContext::init).
    pub fn context_callback(&self) -> OnCompleted {
        let notifier = self.clone();
        Box::new(move |result| {
            notifier.send(match result {
                Ok(projection) => InitEvent::ContextInitialized(projection),
                Err(e) => InitEvent::Failed {
                    stage: InitStage::Context,
                    error: e.into(),
                },
            })
        })
    }
}

/// Receiving half, drained on the host thread.
#[derive(Debug)]
pub struct EventPump {
    rx: mpsc::Receiver<InitEvent>,
}

impl EventPump {
    /// Every event received so far, in arrival order. Never blocks.
    pub fn drain(&self) -> Vec<InitEvent> {
        self.rx.try_iter().collect()
    }
}

pub fn channel() -> (Notifier, EventPump) {
    let (tx, rx) = mpsc::channel();
    (Notifier { tx }, EventPump { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerview_capture::CaptureError;

    #[test]
    fn callbacks_deliver_in_order() {
        let (notifier, pump) = channel();
        notifier.source_callback()(Ok(ElementSize::new(640, 480)));
        notifier.context_callback()(Ok(Mat4::IDENTITY));

        let events = pump.drain();
        assert!(matches!(events[0], InitEvent::SourceReady(s) if s == ElementSize::new(640, 480)));
        assert!(matches!(events[1], InitEvent::ContextInitialized(_)));
        assert!(pump.drain().is_empty());
    }

    #[test]
    fn failures_carry_their_stage() {
        let (notifier, pump) = channel();
        notifier.source_callback()(Err(CaptureError::Device("busy".into())));
        let events = pump.drain();
        assert!(matches!(
            &events[0],
            InitEvent::Failed { stage: InitStage::Source, error: RuntimeError::Capture(_) }
        ));
    }

    #[test]
    fn delivers_across_threads() {
        let (notifier, pump) = channel();
        let callback = notifier.source_callback();
        std::thread::spawn(move || callback(Ok(ElementSize::new(1, 1))))
            .join()
            .unwrap();
        assert_eq!(pump.drain().len(), 1);
    }

    #[test]
    fn send_after_pump_dropped_is_harmless() {
        let (notifier, pump) = channel();
        drop(pump);
        notifier.send(InitEvent::ContextInitialized(Mat4::IDENTITY));
    }
}
