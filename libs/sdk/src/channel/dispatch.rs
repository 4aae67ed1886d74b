//! Inbound frame dispatch
//!
//! Classifies a binary frame by opcode, invokes the matching handler for the
//! channel's role and acknowledges it on the same socket.

use async_trait::async_trait;
use iofog_codec::{ack_frame, decode_inbound, InboundFrame};
use tracing::{debug, warn};

use super::watcher::AckWatcher;
use super::ChannelRole;
use crate::error::{ChannelError, SdkError};
use crate::handlers::Handlers;

/// Outbound half of a channel socket
#[async_trait]
pub(crate) trait FrameSink: Send {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ChannelError>;
}

/// Handle one inbound binary frame
///
/// Only a failure to write the acknowledgment is returned; everything else is
/// reported through the handlers.
pub(crate) async fn dispatch_frame<S: FrameSink>(
    role: ChannelRole,
    data: &[u8],
    handlers: &Handlers,
    watcher: Option<&mut AckWatcher>,
    sink: &mut S,
) -> Result<(), ChannelError> {
    let frame = match decode_inbound(data) {
        Ok(frame) => frame,
        Err(e) => {
            // Acknowledged anyway so the gateway does not redeliver it
            warn!("Malformed frame on {} channel: {}", role, e);
            handlers.emit_error(&SdkError::Codec(e));
            return sink.send_frame(ack_frame()).await;
        }
    };

    match (role, frame) {
        (ChannelRole::Control, InboundFrame::ControlSignal) => {
            debug!("New configuration signal");
            handlers.emit_new_config_signal();
        }
        (ChannelRole::Message, InboundFrame::Message(message)) => {
            handlers.emit_messages(vec![message]);
        }
        (ChannelRole::Message, InboundFrame::ForeignVersion(version)) => {
            warn!("Skipping ioMessage with unsupported version {}", version);
        }
        (ChannelRole::Message, InboundFrame::Receipt { id, timestamp }) => {
            if let Some(watcher) = watcher {
                watcher.acknowledge(&id);
            }
            handlers.emit_message_receipt(&id, timestamp);
        }
        (_, InboundFrame::Empty) => {
            debug!("Empty frame on {} channel", role);
            return Ok(());
        }
        (role, other) => {
            warn!("Ignoring {:?} frame on {} channel", other, role);
            return Ok(());
        }
    }

    sink.send_frame(ack_frame()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use iofog_codec::{encode_message_frame, encode_receipt_frame, IoMessage};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
            self.frames.push(frame);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_control_signal_is_acknowledged() {
        let signals = Arc::new(Mutex::new(0));
        let counter = signals.clone();
        let handlers = Handlers::new().on_new_config_signal(move || *counter.lock() += 1);
        let mut sink = RecordingSink::default();

        dispatch_frame(ChannelRole::Control, &[0xC], &handlers, None, &mut sink)
            .await
            .unwrap();

        assert_eq!(*signals.lock(), 1);
        assert_eq!(sink.frames, vec![vec![0xB]]);
    }

    #[tokio::test]
    async fn test_message_frame_reaches_handler() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = received.clone();
        let handlers = Handlers::new().on_messages(move |msgs| store.lock().extend(msgs));
        let msg = IoMessage::builder().tag("t").content_data(b"abc".to_vec()).build();
        let mut sink = RecordingSink::default();

        dispatch_frame(
            ChannelRole::Message,
            &encode_message_frame(&msg).unwrap(),
            &handlers,
            None,
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(*received.lock(), vec![msg]);
        assert_eq!(sink.frames, vec![vec![0xB]]);
    }

    #[tokio::test]
    async fn test_foreign_version_is_skipped_but_acknowledged() {
        let received = Arc::new(Mutex::new(0));
        let store = received.clone();
        let handlers = Handlers::new().on_messages(move |_| *store.lock() += 1);
        let mut frame = encode_message_frame(&IoMessage::builder().tag("x").build()).unwrap();
        // Version lives right after the 5-byte frame prefix
        frame[5] = 0;
        frame[6] = 9;
        let mut sink = RecordingSink::default();

        dispatch_frame(ChannelRole::Message, &frame, &handlers, None, &mut sink)
            .await
            .unwrap();

        assert_eq!(*received.lock(), 0);
        assert_eq!(sink.frames, vec![vec![0xB]]);
    }

    #[tokio::test]
    async fn test_all_default_message_is_delivered() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = received.clone();
        let handlers = Handlers::new().on_messages(move |msgs| store.lock().extend(msgs));
        let frame = encode_message_frame(&IoMessage::default()).unwrap();
        let mut sink = RecordingSink::default();

        dispatch_frame(ChannelRole::Message, &frame, &handlers, None, &mut sink)
            .await
            .unwrap();

        assert_eq!(*received.lock(), vec![IoMessage::default()]);
        assert_eq!(sink.frames, vec![vec![0xB]]);
    }

    #[tokio::test]
    async fn test_receipt_settles_watcher() {
        let receipts = Arc::new(Mutex::new(Vec::new()));
        let store = receipts.clone();
        let handlers = Handlers::new()
            .on_message_receipt(move |id, ts| store.lock().push((id.to_string(), ts)));
        let mut watcher = AckWatcher::new(Default::default());
        watcher.track(&IoMessage::builder().tag("pending").build());
        let mut sink = RecordingSink::default();

        let frame = encode_receipt_frame("gw-id", 1_700_000_000_000).unwrap();
        dispatch_frame(
            ChannelRole::Message,
            &frame,
            &handlers,
            Some(&mut watcher),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(
            *receipts.lock(),
            vec![("gw-id".to_string(), 1_700_000_000_000)]
        );
        assert!(watcher.is_empty());
        assert_eq!(sink.frames, vec![vec![0xB]]);
    }

    #[tokio::test]
    async fn test_truncated_frame_reports_error_and_acks() {
        let errors = Arc::new(Mutex::new(0));
        let store = errors.clone();
        let handlers = Handlers::new().on_error(move |_| *store.lock() += 1);
        let mut sink = RecordingSink::default();

        dispatch_frame(
            ChannelRole::Message,
            &[0xD, 0, 0, 0, 40, 0],
            &handlers,
            None,
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(*errors.lock(), 1);
        assert_eq!(sink.frames, vec![vec![0xB]]);
    }

    #[tokio::test]
    async fn test_other_role_opcodes_are_ignored() {
        let signals = Arc::new(Mutex::new(0));
        let counter = signals.clone();
        let handlers = Handlers::new().on_new_config_signal(move || *counter.lock() += 1);
        let mut sink = RecordingSink::default();

        dispatch_frame(ChannelRole::Message, &[0xC], &handlers, None, &mut sink)
            .await
            .unwrap();
        dispatch_frame(ChannelRole::Control, &[0x42], &handlers, None, &mut sink)
            .await
            .unwrap();
        dispatch_frame(ChannelRole::Control, &[], &handlers, None, &mut sink)
            .await
            .unwrap();

        assert_eq!(*signals.lock(), 0);
        assert!(sink.frames.is_empty());
    }
}
