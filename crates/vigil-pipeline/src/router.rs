use vigil_core::{ChannelKind, Message, OutputFiles, ReplyHandle, TaskId, TaskInfo, TaskStatus};

/// Converts a raw inbound [`Message`] into a [`TaskInfo`]: stamps a stable
/// per-channel task id and preserves the reply route for the Reporter.
pub fn route(msg: &Message) -> TaskInfo {
    let task_id = match msg.channel {
        ChannelKind::Chat => TaskId::new(format!("chat-{}", msg.timestamp.timestamp_millis())),
        ChannelKind::Mail => TaskId::new(msg.id.clone()),
    };

    let original_prompt = match &msg.subject {
        Some(subject) if !subject.trim().is_empty() => {
            format!("{}\n\n{}", subject.trim(), msg.content)
        }
        _ => msg.content.clone(),
    };

    let reply_handle = ReplyHandle::from(
        msg.metadata
            .get("reply_handle")
            .cloned()
            .unwrap_or_else(|| msg.sender.as_str().to_string()),
    );

    let mut metadata = msg.metadata.clone();
    metadata.insert("reply_handle".to_string(), reply_handle.as_str().to_string());
    metadata.insert("message_id".to_string(), msg.id.clone());

    TaskInfo {
        task_id,
        original_prompt,
        refined_prompt: None,
        status: TaskStatus::Pending,
        sender: msg.sender.clone(),
        channel: msg.channel,
        reply_handle,
        created_at: msg.timestamp,
        started_at: None,
        completed_at: None,
        confidence: 0.0,
        intent_type: None,
        output_files: OutputFiles::default(),
        error: None,
        report_url: None,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use vigil_core::SenderId;

    fn sample_message(channel: ChannelKind) -> Message {
        Message {
            id: "msg-1".into(),
            channel,
            sender: SenderId::from("user-1"),
            recipient: None,
            subject: Some("Fix the build".into()),
            content: "the build is broken on main".into(),
            raw_content: "the build is broken on main".into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn chat_task_id_is_channel_prefixed() {
        let task = route(&sample_message(ChannelKind::Chat));
        assert!(task.task_id.as_str().starts_with("chat-"));
    }

    #[test]
    fn mail_task_id_is_the_provider_message_id() {
        let task = route(&sample_message(ChannelKind::Mail));
        assert_eq!(task.task_id.as_str(), "msg-1");
    }

    #[test]
    fn substantive_subject_is_prepended_to_body() {
        let task = route(&sample_message(ChannelKind::Mail));
        assert!(task.original_prompt.starts_with("Fix the build"));
    }

    #[test]
    fn reply_handle_defaults_to_sender_id() {
        let task = route(&sample_message(ChannelKind::Chat));
        assert_eq!(task.reply_handle.as_str(), "user-1");
    }
}
