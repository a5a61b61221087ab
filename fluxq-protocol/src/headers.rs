//! Canonical header names, broker commands, and typed accessors.
//!
//! The queue domain rides on a small set of well-known headers. The
//! accessors here are thin translation wrappers over the generic header
//! map: string values come back as `Option<&str>`, numeric values as
//! `Option<i32>`/`Option<i64>` where an absent header is `None` and
//! malformed numeric text is `Some(0)` (the broker tolerates sloppy
//! clients; that leniency is part of the contract).

use crate::frame::Frame;

/// Command verb understood by the broker.
pub const CMD: &str = "cmd";
/// Correlation id matching a response to its originating request.
pub const ID: &str = "id";
/// Whether the broker should acknowledge the operation.
pub const ACK: &str = "ack";
/// Free-form routing tag.
pub const TAG: &str = "tag";
/// Id of the message this one was derived from.
pub const ORIGIN_ID: &str = "origin_id";
/// Url of the message this one was derived from.
pub const ORIGIN_URL: &str = "origin_url";
/// Target topic.
pub const TOPIC: &str = "topic";
/// Topic feature mask.
pub const TOPIC_MASK: &str = "topic_mask";
/// Consumer-group name.
pub const CONSUME_GROUP: &str = "consume_group";
/// Message filter applied within a consumer group.
pub const GROUP_FILTER: &str = "group_filter";
/// Consumer-group feature mask.
pub const GROUP_MASK: &str = "group_mask";
/// Group to copy the start bookmark from.
pub const GROUP_START_COPY: &str = "group_start_copy";
/// Absolute offset a group starts consuming at.
pub const GROUP_START_OFFSET: &str = "group_start_offset";
/// Message id a group starts consuming at.
pub const GROUP_START_MSGID: &str = "group_start_msgid";
/// Timestamp a group starts consuming at.
pub const GROUP_START_TIME: &str = "group_start_time";
/// Authentication token.
pub const TOKEN: &str = "token";
/// Body length in bytes; derived, never caller-supplied.
pub const CONTENT_LENGTH: &str = "content-length";
/// Body media type.
pub const CONTENT_TYPE: &str = "content-type";

/// Commands the broker dispatches on.
pub mod cmd {
    /// Liveness probe sent by the session's heartbeat task.
    pub const HEARTBEAT: &str = "heartbeat";
    pub const PRODUCE: &str = "produce";
    pub const CONSUME: &str = "consume";
    pub const DECLARE: &str = "declare";
    pub const QUERY: &str = "query";
    pub const REMOVE: &str = "remove";
    pub const ROUTE: &str = "route";
}

impl Frame {
    fn header_i32(&self, key: &str) -> Option<i32> {
        self.header(key).map(|s| s.parse().unwrap_or(0))
    }

    fn header_i64(&self, key: &str) -> Option<i64> {
        self.header(key).map(|s| s.parse().unwrap_or(0))
    }

    pub fn cmd(&self) -> Option<&str> {
        self.header(CMD)
    }

    pub fn set_cmd(&mut self, value: &str) {
        self.set_header(CMD, value);
    }

    pub fn id(&self) -> Option<&str> {
        self.header(ID)
    }

    pub fn set_id(&mut self, value: &str) {
        self.set_header(ID, value);
    }

    /// Whether the broker should acknowledge. Absent means yes; text that
    /// fails to parse as a bool means no.
    pub fn ack(&self) -> bool {
        match self.header(ACK) {
            None => true,
            Some(value) => value.parse().unwrap_or(false),
        }
    }

    pub fn set_ack(&mut self, ack: bool) {
        self.set_header(ACK, if ack { "true" } else { "false" });
    }

    pub fn tag(&self) -> Option<&str> {
        self.header(TAG)
    }

    pub fn set_tag(&mut self, value: &str) {
        self.set_header(TAG, value);
    }

    pub fn origin_id(&self) -> Option<&str> {
        self.header(ORIGIN_ID)
    }

    pub fn set_origin_id(&mut self, value: &str) {
        self.set_header(ORIGIN_ID, value);
    }

    pub fn origin_url(&self) -> Option<&str> {
        self.header(ORIGIN_URL)
    }

    pub fn set_origin_url(&mut self, value: &str) {
        self.set_header(ORIGIN_URL, value);
    }

    pub fn topic(&self) -> Option<&str> {
        self.header(TOPIC)
    }

    pub fn set_topic(&mut self, value: &str) {
        self.set_header(TOPIC, value);
    }

    pub fn topic_mask(&self) -> Option<i32> {
        self.header_i32(TOPIC_MASK)
    }

    pub fn set_topic_mask(&mut self, value: i32) {
        self.set_header(TOPIC_MASK, &value.to_string());
    }

    pub fn consume_group(&self) -> Option<&str> {
        self.header(CONSUME_GROUP)
    }

    pub fn set_consume_group(&mut self, value: &str) {
        self.set_header(CONSUME_GROUP, value);
    }

    pub fn group_filter(&self) -> Option<&str> {
        self.header(GROUP_FILTER)
    }

    pub fn set_group_filter(&mut self, value: &str) {
        self.set_header(GROUP_FILTER, value);
    }

    pub fn group_mask(&self) -> Option<i32> {
        self.header_i32(GROUP_MASK)
    }

    pub fn set_group_mask(&mut self, value: i32) {
        self.set_header(GROUP_MASK, &value.to_string());
    }

    pub fn group_start_copy(&self) -> Option<&str> {
        self.header(GROUP_START_COPY)
    }

    pub fn set_group_start_copy(&mut self, value: &str) {
        self.set_header(GROUP_START_COPY, value);
    }

    pub fn group_start_offset(&self) -> Option<i64> {
        self.header_i64(GROUP_START_OFFSET)
    }

    pub fn set_group_start_offset(&mut self, value: i64) {
        self.set_header(GROUP_START_OFFSET, &value.to_string());
    }

    pub fn group_start_msgid(&self) -> Option<&str> {
        self.header(GROUP_START_MSGID)
    }

    pub fn set_group_start_msgid(&mut self, value: &str) {
        self.set_header(GROUP_START_MSGID, value);
    }

    pub fn group_start_time(&self) -> Option<i64> {
        self.header_i64(GROUP_START_TIME)
    }

    pub fn set_group_start_time(&mut self, value: i64) {
        self.set_header(GROUP_START_TIME, &value.to_string());
    }

    pub fn token(&self) -> Option<&str> {
        self.header(TOKEN)
    }

    pub fn set_token(&mut self, value: &str) {
        self.set_header(TOKEN, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_defaults_and_leniency() {
        let mut frame = Frame::new();
        assert!(frame.ack());

        frame.set_ack(false);
        assert_eq!(frame.header(ACK), Some("false"));
        assert!(!frame.ack());

        frame.set_header(ACK, "yes-please");
        assert!(!frame.ack());

        frame.set_header(ACK, "true");
        assert!(frame.ack());
    }

    #[test]
    fn test_numeric_accessors_absent_vs_malformed() {
        let mut frame = Frame::new();
        assert_eq!(frame.topic_mask(), None);
        assert_eq!(frame.group_start_offset(), None);

        frame.set_topic_mask(6);
        assert_eq!(frame.topic_mask(), Some(6));

        frame.set_header(TOPIC_MASK, "not-a-number");
        assert_eq!(frame.topic_mask(), Some(0));

        frame.set_group_start_offset(1 << 40);
        assert_eq!(frame.group_start_offset(), Some(1 << 40));

        frame.set_header(GROUP_START_OFFSET, "9x");
        assert_eq!(frame.group_start_offset(), Some(0));
    }

    #[test]
    fn test_string_accessors() {
        let mut frame = Frame::new();
        assert!(frame.topic().is_none());

        frame.set_topic("orders");
        frame.set_consume_group("billing");
        frame.set_group_start_msgid("m-42");
        frame.set_token("secret");
        assert_eq!(frame.topic(), Some("orders"));
        assert_eq!(frame.consume_group(), Some("billing"));
        assert_eq!(frame.group_start_msgid(), Some("m-42"));
        assert_eq!(frame.token(), Some("secret"));
    }

    #[test]
    fn test_typed_setters_drop_empty_values() {
        let mut frame = Frame::new();
        frame.set_id("");
        frame.set_topic("");
        assert!(frame.id().is_none());
        assert!(frame.topic().is_none());
    }

    #[test]
    fn test_heartbeat_cmd() {
        let mut frame = Frame::new();
        frame.set_cmd(cmd::HEARTBEAT);
        assert_eq!(frame.cmd(), Some("heartbeat"));
    }
}
