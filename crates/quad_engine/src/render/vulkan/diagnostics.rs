//! Validation layer diagnostics
//!
//! The debug messenger hands every validation message to a [`ValidationSink`].
//! [`LogSink`] forwards to the `log` facade; tests and tools can install
//! their own sink to capture messages instead.

use std::ffi::{c_void, CStr};

use ash::vk;

/// Receiver for validation layer messages
pub trait ValidationSink: Send {
    /// Handle one message from the debug messenger
    fn message(
        &mut self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        message: &str,
    );
}

/// Forwards validation messages to `log`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ValidationSink for LogSink {
    fn message(
        &mut self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        message: &str,
    ) {
        log::log!(log_level(severity), "[Vulkan] {:?} - {}", message_type, message);
    }
}

/// Map a messenger severity to a log level
pub fn log_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

/// Severities the messenger subscribes to
pub fn subscribed_severities() -> vk::DebugUtilsMessageSeverityFlagsEXT {
    vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
}

/// Message types the messenger subscribes to
pub fn subscribed_types() -> vk::DebugUtilsMessageTypeFlagsEXT {
    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
}

/// Messenger callback; `user_data` points at a `Box<dyn ValidationSink>`
///
/// # Safety
///
/// Called by the validation layer. `user_data` must be null or point at a
/// live `Box<dyn ValidationSink>` owned by the instance wrapper.
pub unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if user_data.is_null() {
        LogSink.message(message_severity, message_type, &message);
    } else {
        let sink = &mut *user_data.cast::<Box<dyn ValidationSink>>();
        sink.message(message_severity, message_type, &message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CaptureSink(Arc<Mutex<Vec<(log::Level, String)>>>);

    impl ValidationSink for CaptureSink {
        fn message(
            &mut self,
            severity: vk::DebugUtilsMessageSeverityFlagsEXT,
            _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
            message: &str,
        ) {
            self.0.lock().unwrap().push((log_level(severity), message.to_string()));
        }
    }

    #[test]
    fn test_severity_mapping() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(log_level(S::ERROR), log::Level::Error);
        assert_eq!(log_level(S::WARNING), log::Level::Warn);
        assert_eq!(log_level(S::INFO), log::Level::Debug);
        assert_eq!(log_level(S::VERBOSE), log::Level::Trace);
    }

    #[test]
    fn test_subscription_excludes_chatty_severities() {
        let severities = subscribed_severities();
        assert!(severities.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
        assert!(!severities.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
        assert!(subscribed_types().contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION));
    }

    #[test]
    fn test_callback_routes_to_installed_sink() {
        let capture = CaptureSink::default();
        let mut sink: Box<dyn ValidationSink> = Box::new(capture.clone());
        let text = CString::new("vkQueueSubmit: fence is already in use").unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: text.as_ptr(),
            ..Default::default()
        };

        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                (&mut sink as *mut Box<dyn ValidationSink>).cast(),
            )
        };

        assert_eq!(result, vk::FALSE);
        let messages = capture.0.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, log::Level::Error);
        assert!(messages[0].1.contains("fence is already in use"));
    }
}
