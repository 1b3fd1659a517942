//! Log records tagged with the running task.
//!
//! [`UnitTagFormat`] wraps another `tracing-subscriber` event formatter and
//! prefixes every record emitted from inside a task with
//! `task:<id>/live:<n>`. Records emitted outside of any task are passed
//! through untouched, whatever state the resolver is in.

use std::fmt;

use taskid_runtime::raw;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{Format, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::detect::{HostRelease, ReleaseSource};
use crate::error::ResolveError;
use crate::resolve::Resolver;

/// Event formatter that tags records with the current task identifier.
#[derive(Debug, Clone)]
pub struct UnitTagFormat<F = Format, R: 'static = HostRelease> {
    inner: F,
    resolver: &'static Resolver<R>,
    label: &'static str,
    live_count: bool,
}

impl<F> UnitTagFormat<F> {
    /// Tag records using the process-wide resolver.
    pub fn new(inner: F) -> Self {
        UnitTagFormat {
            inner,
            resolver: crate::global(),
            label: "task",
            live_count: true,
        }
    }
}

impl<F, R: 'static> UnitTagFormat<F, R> {
    /// Resolve identifiers through `resolver` instead of the global one.
    pub fn with_resolver<R2: 'static>(self, resolver: &'static Resolver<R2>) -> UnitTagFormat<F, R2> {
        UnitTagFormat {
            inner: self.inner,
            resolver,
            label: self.label,
            live_count: self.live_count,
        }
    }

    /// Label written before the identifier. Defaults to `task`.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Whether to append the process-wide live task count. Defaults to `true`.
    pub fn with_live_count(mut self, live_count: bool) -> Self {
        self.live_count = live_count;
        self
    }
}

impl Default for UnitTagFormat {
    fn default() -> Self {
        UnitTagFormat::new(Format::default())
    }
}

impl<S, N, F, R> FormatEvent<S, N> for UnitTagFormat<F, R>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
    R: ReleaseSource + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        // Outside a poll there is nothing to tag, and the record may be the
        // one reporting an unsupported release.
        if raw::current_control_block().is_some() {
            match self.resolver.try_resolve() {
                Ok(id) => {
                    write!(writer, "{}:{}", self.label, id)?;
                    if self.live_count {
                        write!(writer, "/live:{}", taskid_runtime::live_tasks())?;
                    }
                    writer.write_char(' ')?;
                }
                Err(ResolveError::OutsideTask) => {}
                // A record tagged with the wrong task is worse than no record.
                Err(err) => panic!("{err}"),
            }
        }
        self.inner.format_event(ctx, writer, event)
    }
}

/// Install a global subscriber that writes tagged records to stdout.
///
/// `default_directive` is used when `RUST_LOG` is not set.
pub fn init_logging(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer().event_format(UnitTagFormat::default()))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use crate::detect::Detection;
    use taskid_runtime::Runtime;
    use tracing_subscriber::fmt::format;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture<T, R: ReleaseSource + 'static>(
        tag: UnitTagFormat<Format<format::Full, ()>, R>,
        f: impl FnOnce() -> T,
    ) -> (T, Vec<String>) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(captured.clone())
            .event_format(tag)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, captured.lines())
    }

    fn plain() -> Format<format::Full, ()> {
        Format::default().with_ansi(false).without_time().with_target(false)
    }

    #[test]
    fn records_inside_tasks_are_tagged() {
        let (id, lines) = capture(UnitTagFormat::new(plain()).with_live_count(false), || {
            Runtime::new(4)
                .run(async {
                    tracing::info!("inside");
                    crate::resolve_current_unit_id()
                })
                .expect("main task finished")
        });
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].starts_with(&format!("task:{id} ")), "{}", lines[0]);
        assert!(lines[0].ends_with("inside"), "{}", lines[0]);
    }

    #[test]
    fn records_outside_tasks_are_untouched() {
        let ((), lines) = capture(UnitTagFormat::new(plain()), || tracing::info!("outside"));
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].contains("task:"), "{}", lines[0]);
    }

    #[test]
    fn label_and_live_count_are_configurable() {
        let (_, lines) = capture(UnitTagFormat::new(plain()).with_label("grtid"), || {
            Runtime::new(4).run(async { tracing::info!("counted") })
        });
        assert!(lines[0].starts_with("grtid:"), "{}", lines[0]);
        assert!(lines[0].contains("/live:"), "{}", lines[0]);
    }

    #[derive(Debug)]
    struct FixedRelease(&'static str);

    impl ReleaseSource for FixedRelease {
        fn detect(&self) -> Detection {
            Detection::from_signal(self.0)
        }
    }

    fn unsupported() -> &'static Resolver<FixedRelease> {
        Box::leak(Box::new(Resolver::new(
            FixedRelease("0.4.0"),
            crate::LayoutRegistry::builtin(),
        )))
    }

    #[test]
    fn unsupported_release_is_reported_outside_tasks() {
        let resolver = unsupported();
        let tag = UnitTagFormat::new(plain()).with_resolver(resolver);
        let (result, lines) = capture(tag, || {
            let err = resolver.prime().unwrap_err();
            tracing::error!("{err}");
            resolver.try_resolve()
        });
        assert!(matches!(result, Err(ResolveError::UnsupportedRelease { .. })));
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(!lines[0].contains("task:"), "{}", lines[0]);
        assert!(
            lines[0].ends_with("unsupported runtime release 0.4.0: no control block layout registered"),
            "{}",
            lines[0]
        );
    }

    #[test]
    #[should_panic(expected = "unsupported runtime release 0.4.0")]
    fn unsupported_release_panics_inside_tasks() {
        let tag = UnitTagFormat::new(plain()).with_resolver(unsupported());
        capture(tag, || {
            Runtime::new(4).run(async { tracing::info!("never tagged") });
        });
    }
}
