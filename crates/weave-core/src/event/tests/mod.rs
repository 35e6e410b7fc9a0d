#[cfg(test)]
mod queue_tests;

#[cfg(test)]
mod tests {
    use crate::event::{Event, LogCategory, LogRecord, LOG};

    #[test]
    fn test_log_category_names() {
        for category in LogCategory::ALL {
            assert_eq!(LogCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(LogCategory::parse("warn"), None);
        assert_eq!(LogCategory::Log.level(), log::Level::Info);
        assert_eq!(LogCategory::Finest.level(), log::Level::Trace);
    }

    #[test]
    fn test_log_record_payload_shape() {
        let record = LogRecord::warn("something odd");
        let data = record.to_data();
        assert_eq!(data["category"], "WARN");
        assert_eq!(data["message"], "something odd");
        assert!(data["timestamp"].is_string());

        let back = LogRecord::from_data(&data).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_log_record_rejects_foreign_payload() {
        let err = LogRecord::from_data(&serde_json::json!({ "hello": 1 })).unwrap_err();
        assert!(err.to_string().contains("'log'"));

        let event = Event::new(LOG, serde_json::json!("plain text"));
        assert!(event.as_log_record().is_none());
    }

    #[test]
    fn test_log_record_display() {
        let record = LogRecord::error("boom");
        let text = record.to_string();
        assert!(text.ends_with(" - ERROR: boom"), "unexpected display: {}", text);
    }
}
