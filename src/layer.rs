use crate::context::DiagnosticContext;
use crate::engine::EngineHandle;
use crate::event::NativeEvent;
use crate::message::{self, Message};
use crate::record::ErrorInfo;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

#[cfg(feature = "log-bridge")]
use tracing_log::NormalizeEvent;

/// `tracing_subscriber` layer that turns events into [`NativeEvent`]s and
/// routes them through an [`EngineHandle`].
///
/// Levels live in the engine and can change at any time, so every callsite
/// is registered as `sometimes` and [`Layer::enabled`] asks the engine on
/// each event. Spans are always enabled; their fields become part of the
/// diagnostic context of events logged inside them.
pub struct RoutingLayer {
    engine: EngineHandle,
}

impl RoutingLayer {
    pub fn new(engine: EngineHandle) -> Self {
        RoutingLayer { engine }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }
}

/// Span fields rendered as strings, kept in the span's extensions.
#[derive(Default)]
struct SpanFields(BTreeMap<String, String>);

impl<S> Layer<S> for RoutingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        if metadata.is_span() {
            return true;
        }
        self.engine.is_enabled(metadata.target(), *metadata.level())
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut StringVisitor { fields: &mut fields.0 });
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            values.record(&mut StringVisitor { fields: &mut fields.0 });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        #[cfg(feature = "log-bridge")]
        let normalized = event.normalized_metadata();
        #[cfg(feature = "log-bridge")]
        let meta = normalized.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "log-bridge"))]
        let meta = event.metadata();

        let mut fields = BTreeMap::new();
        let mut text: Option<String> = None;
        let mut error: Option<ErrorInfo> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut text,
            error: &mut error,
        };
        event.record(&mut visitor);

        let message = match text {
            Some(text) => message::take_pending(&text).unwrap_or_else(|| Message::simple(text)),
            None => Message::simple(fallback_text(&fields, meta.name())),
        };

        let mut context = BTreeMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                    context.extend(span_fields.0.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        context.extend(DiagnosticContext::snapshot());

        let mut native = NativeEvent::new(*meta.level(), meta.target(), message)
            .with_context_data(context)
            .with_fields(fields)
            .with_location(meta.module_path(), meta.file(), meta.line());
        if let Some(error) = error {
            native = native.with_thrown(error);
        }

        self.engine.route(&Arc::new(native));
    }
}

/// Text for events logged without a message: their fields as `k=v`, or the
/// callsite name when there are none.
fn fallback_text(fields: &BTreeMap<String, serde_json::Value>, name: &str) -> String {
    if fields.is_empty() {
        return name.to_string();
    }
    fields
        .iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fields added by `tracing-log` to bridged `log` records.
fn is_bridge_field(field: &Field) -> bool {
    field.name().starts_with("log.")
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
    pub error: &'a mut Option<ErrorInfo>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        if !is_bridge_field(field) {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        // The first error becomes the event's error, later ones stay fields.
        if self.error.is_none() {
            *self.error = Some(ErrorInfo::from_error(value));
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, serde_json::Value::String(format!("{:?}", value)));
        }
    }
}

/// Renders span fields to strings for the diagnostic context.
struct StringVisitor<'a> {
    fields: &'a mut BTreeMap<String, String>,
}

impl<'a> Visit for StringVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields.insert(field.name().to_string(), format!("{:?}", value));
    }
}
