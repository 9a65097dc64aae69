use std::time::Duration;

/// Tunables for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Intermediate buffer used when streaming frames into the buffer store.
    pub binary_chunk_bytes: usize,
    /// Largest live preview frame copied to the watcher.
    pub preview_frame_bytes: usize,
    /// Maximum number of pending requests.
    pub reply_queue_size: usize,
    /// How long a request waits for its reply before it is dropped.
    pub max_response_wait: Duration,
    /// Wall-clock budget for one `check_for_inbound` tick.
    pub max_inbound_check: Duration,
    /// Longest pattern id/name or preview-image id kept; longer ones are truncated.
    pub text_field_bytes: usize,
    /// Text messages longer than this are discarded unparsed.
    pub max_text_bytes: usize,
    /// Sleep between ticks while waiting on a completion token.
    pub sync_poll_wait: Duration,
    /// Most controls kept per sequencer snapshot or controls reply.
    pub control_limit: usize,
    /// Most playlist items kept.
    pub playlist_limit: usize,
    /// Most peers kept from a peers reply.
    pub peer_limit: usize,
    /// Time budget for reconnect attempts in one tick.
    pub max_conn_repair: Duration,
    /// Delay between reconnect attempts.
    pub conn_repair_retry_delay: Duration,
    /// Keepalive ping interval; `None` disables keepalive.
    pub send_ping_every: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            binary_chunk_bytes: 3072,
            preview_frame_bytes: 3072,
            reply_queue_size: 100,
            max_response_wait: Duration::from_secs(5),
            max_inbound_check: Duration::from_millis(300),
            text_field_bytes: 128,
            max_text_bytes: 16 * 1024,
            sync_poll_wait: Duration::from_millis(5),
            control_limit: 25,
            playlist_limit: 150,
            peer_limit: 25,
            max_conn_repair: Duration::from_millis(300),
            conn_repair_retry_delay: Duration::from_millis(50),
            send_ping_every: Some(Duration::from_secs(3)),
        }
    }
}
