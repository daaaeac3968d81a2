// Logging utilities for the sealkit crates
//
// Component-based structured logging over the `log` facade. Loggers carry a
// context id (device or session identifier) so that concurrent cipher and
// trust operations can be told apart in the output, and child loggers
// inherit that id while switching component.

use log::{debug, error, info, warn};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    Provider,
    Cipher,
    Codec,
    FileStream,
    Trust,
    System,
    Custom(&'static str),
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &str {
        match self {
            Component::Provider => "Provider",
            Component::Cipher => "Cipher",
            Component::Codec => "Codec",
            Component::FileStream => "FileStream",
            Component::Trust => "Trust",
            Component::System => "System",
            Component::Custom(name) => name,
        }
    }
}

/// A helper for creating component-specific loggers with context id tracking
#[derive(Clone)]
pub struct Logger {
    /// Component this logger is for
    component: Component,
    /// Context id (device or session identifier) for tracing
    context_id: String,
    /// Parent component for hierarchical logging (if any)
    parent_component: Option<Component>,
}

impl Logger {
    /// Create a new root logger for a specific component and context id
    pub fn new_root(component: Component, context_id: &str) -> Self {
        Self {
            component,
            context_id: context_id.to_string(),
            parent_component: None,
        }
    }

    /// Create a child logger with the same context id but different component
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            context_id: self.context_id.clone(),
            parent_component: Some(self.component),
        }
    }

    /// Get a reference to the context id
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Get the component prefix for logging, including parent if available
    fn component_prefix(&self) -> String {
        match self.parent_component {
            Some(parent) if parent != Component::System => {
                format!("{}.{}", parent.as_str(), self.component.as_str())
            }
            _ => self.component.as_str().to_string(),
        }
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "[{}][{}] {}",
                self.context_id,
                self.component_prefix(),
                message.into()
            );
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Info) {
            info!(
                "[{}][{}] {}",
                self.context_id,
                self.component_prefix(),
                message.into()
            );
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Warn) {
            warn!(
                "[{}][{}] {}",
                self.context_id,
                self.component_prefix(),
                message.into()
            );
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Error) {
            error!(
                "[{}][{}] {}",
                self.context_id,
                self.component_prefix(),
                message.into()
            );
        }
    }
}

/// Initialize env_logger once; safe to call from every test.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_prefix_includes_parent() {
        let root = Logger::new_root(Component::Cipher, "device-1");
        let child = root.with_component(Component::Codec);
        assert_eq!(child.component_prefix(), "Cipher.Codec");
        assert_eq!(root.component_prefix(), "Cipher");
    }

    #[test]
    fn system_parent_is_not_repeated() {
        let root = Logger::new_root(Component::System, "device-1");
        let child = root.with_component(Component::Trust);
        assert_eq!(child.component_prefix(), "Trust");
    }
}
