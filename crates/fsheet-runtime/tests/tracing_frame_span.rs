#![forbid(unsafe_code)]

//! Settle lifecycle events are emitted inside the `sheet.frame` span.
//!
//! Run:
//!   cargo test -p fsheet-runtime --test tracing_frame_span

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fsheet_core::config::SheetConfig;
use fsheet_core::geometry::{SnapKey, SnapProfile};
use fsheet_runtime::controller::{SheetProps, sheet_contexts};
use fsheet_runtime::dispatch::NoopListener;
use fsheet_runtime::scroll::ListView;
use tracing_subscriber::layer::SubscriberExt;
use web_time::Instant;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    span: Option<String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(Option<String>);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_string());
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        let span = ctx.lookup_current().map(|s| s.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0.unwrap_or_default(),
            span,
        });
    }
}

struct Detached;

impl ListView for Detached {
    fn is_attached(&self) -> bool {
        false
    }
    fn scroll_to_offset(&mut self, _offset: f64, _animated: bool) {}
    fn effective_offset(&self) -> f64 {
        0.0
    }
}

#[test]
fn settle_events_live_in_frame_span() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });

    tracing::subscriber::with_default(subscriber, || {
        let (mut engine, mut app) = sheet_contexts(SheetConfig::default());
        let props = SheetProps {
            visible: true,
            snap_profile: SnapProfile::new(0.0, 300.0, 600.0, Some(700.0)),
            initial_snap_key: SnapKey::Collapsed,
            ..SheetProps::default()
        };
        let now = Instant::now();
        app.set_props(props, now, &Detached);
        for _ in 0..400 {
            if !engine.frame(Duration::from_millis(16)) {
                break;
            }
        }
        app.pump(now, &mut Detached, &mut NoopListener);
    });

    let events = events.lock().unwrap().clone();
    let complete: Vec<_> = events
        .iter()
        .filter(|e| e.message == "settle complete")
        .collect();
    assert_eq!(complete.len(), 1, "{events:#?}");
    assert_eq!(complete[0].span.as_deref(), Some("sheet.frame"));
    assert_eq!(complete[0].level, tracing::Level::DEBUG);

    assert!(
        events.iter().any(|e| e.message == "show" && e.span.is_none()),
        "app-context events are emitted outside the frame span"
    );
}

#[test]
fn invalid_layout_warns() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, || {
        let inputs = fsheet_core::snap::LayoutInputs {
            screen_height: f64::NAN,
            ..Default::default()
        };
        let profile = fsheet_core::snap::derive(&Default::default(), &inputs, true);
        assert!(profile.hidden().is_some());
    });
    let events = events.lock().unwrap();
    assert!(
        events
            .iter()
            .any(|e| e.level == tracing::Level::WARN && e.message.contains("fallback"))
    );
}
