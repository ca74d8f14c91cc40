pub mod error_reporter;
pub mod history_pager;
pub mod new_message_detector;
pub mod notification_dispatcher;
pub mod notification_manager;
pub mod poll_scheduler;
pub mod read_state;
pub mod send_pipeline;
