//! Tracing subscriber setup

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Directive used when `RUST_LOG` is unset
fn default_directive(debug: bool) -> &'static str {
    if debug { "debug,russh=info" } else { "info" }
}

/// Writes the event's message and nothing else
#[derive(Debug, Default)]
struct MessageOnly;

impl<S, N> FormatEvent<S, N> for MessageOnly
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = MessageVisitor::default();
        event.record(&mut message);
        writeln!(writer, "{}", message.0)
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Build the subscriber for the given flags
///
/// `simple` prints only the message text: no timestamp, level, target,
/// span context or fields.
fn build<W>(
    filter: EnvFilter,
    simple: bool,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync + 'static>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    if simple {
        Box::new(builder.event_format(MessageOnly).finish())
    } else {
        Box::new(builder.finish())
    }
}

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over `debug`.
pub fn init(debug: bool, simple: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    build(filter, simple, std::io::stderr).init();
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::{info, info_span};

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn emit_connecting(subscriber: Box<dyn Subscriber + Send + Sync + 'static>) {
        tracing::subscriber::with_default(subscriber, || {
            let span = info_span!("host", host = "10.0.0.1");
            let _entered = span.enter();
            info!(endpoint = "10.0.0.1:22", "connecting to host");
        });
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).starts_with("debug"));
    }

    #[test]
    fn test_simple_prints_message_only() {
        let capture = Capture::default();
        emit_connecting(build(EnvFilter::new("info"), true, capture.clone()));

        assert_eq!(capture.contents(), "connecting to host\n");
    }

    #[test]
    fn test_simple_keeps_formatted_message() {
        let capture = Capture::default();
        tracing::subscriber::with_default(
            build(EnvFilter::new("info"), true, capture.clone()),
            || info!(target: "fleetops::report", "host: {}: {}", "web-1", "up 3 days"),
        );

        assert_eq!(capture.contents(), "host: web-1: up 3 days\n");
    }

    #[test]
    fn test_full_format_keeps_context() {
        let capture = Capture::default();
        emit_connecting(build(EnvFilter::new("info"), false, capture.clone()));

        let out = capture.contents();
        assert!(out.contains("connecting to host"));
        assert!(out.contains("endpoint"));
        assert!(out.contains("host"));
    }

    #[test]
    fn test_filter_applies_in_simple_mode() {
        let capture = Capture::default();
        tracing::subscriber::with_default(
            build(EnvFilter::new("warn"), true, capture.clone()),
            || info!("hidden"),
        );

        assert!(capture.contents().is_empty());
    }
}
