//! ---
//! cz_section: "03-logging"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Tagged logging macros."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! Leveled macros that attach a [`LogContext`](crate::LogContext) to a tracing event.

#[doc(hidden)]
#[macro_export]
macro_rules! __cz_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        tracing::event!(
            $level,
            tag = ctx.tag.unwrap_or(""),
            service = ctx.service.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a trace log enriched with host context.
#[macro_export]
macro_rules! cz_trace {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::TRACE, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::TRACE, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with host context.
#[macro_export]
macro_rules! cz_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an informational log enriched with host context.
#[macro_export]
macro_rules! cz_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with host context.
#[macro_export]
macro_rules! cz_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with host context.
#[macro_export]
macro_rules! cz_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cz_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a fatal record.
///
/// tracing has no level above `ERROR`, so fatal records are errors carrying
/// `severity = "fatal"`. Escalation is up to the host application.
#[macro_export]
macro_rules! cz_fatal {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            severity = "fatal",
            tag = ctx.tag.unwrap_or(""),
            service = ctx.service.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {
        $crate::cz_fatal!(context = $crate::LogContext::default(), $($arg)+)
    };
}
