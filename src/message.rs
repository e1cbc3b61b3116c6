use serde::Serialize;
use std::cell::RefCell;

/// Message carried by a [`NativeEvent`](crate::event::NativeEvent).
///
/// The engine keeps the unformatted template next to the rendered text so
/// tests can assert on either. Messages logged straight through `tracing`
/// have no separate template; for those both strings are equal and there
/// are no parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    template: String,
    formatted: String,
    parameters: Vec<String>,
}

impl Message {
    /// A message without placeholders.
    pub fn simple(text: impl Into<String>) -> Self {
        let text = text.into();
        Message {
            template: text.clone(),
            formatted: text,
            parameters: Vec::new(),
        }
    }

    /// A `{}`-style parameterized message. See [`substitute`] for the
    /// placeholder rules.
    pub fn parameterized(template: impl Into<String>, parameters: Vec<String>) -> Self {
        let template = template.into();
        let formatted = substitute(&template, &parameters);
        Message {
            template,
            formatted,
            parameters,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn formatted(&self) -> &str {
        &self.formatted
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

/// Replace each `{}` in `template` with the next parameter.
///
/// - Placeholders without a matching parameter are left as `{}`.
/// - Extra parameters are ignored (they are still kept on the message).
/// - `\{}` renders a literal `{}` and consumes no parameter.
pub fn substitute(template: &str, parameters: &[String]) -> String {
    let extra: usize = parameters.iter().map(String::len).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut params = parameters.iter();
    let mut rest = template;

    while let Some(pos) = rest.find("{}") {
        let (head, tail) = rest.split_at(pos);
        match head.strip_suffix('\\') {
            Some(escaped) => {
                out.push_str(escaped);
                out.push_str("{}");
            }
            None => {
                out.push_str(head);
                match params.next() {
                    Some(param) => out.push_str(param),
                    None => out.push_str("{}"),
                }
            }
        }
        rest = &tail[2..];
    }

    out.push_str(rest);
    out
}

thread_local! {
    static PENDING: RefCell<Option<Message>> = const { RefCell::new(None) };
}

struct PendingGuard {
    previous: Option<Message>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        PENDING.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Make `message` available to the routing layer while `emit` dispatches
/// the matching `tracing` event on this thread.
///
/// `emit` receives the rendered text, which must be used verbatim as the
/// event's message so the layer can pair the two.
pub fn dispatch<F>(message: Message, emit: F)
where
    F: FnOnce(&str),
{
    let text = message.formatted.clone();
    let previous = PENDING.with(|slot| slot.replace(Some(message)));
    let _guard = PendingGuard { previous };
    emit(&text);
}

/// Take the pending message if it belongs to an event rendered as
/// `formatted`.
pub(crate) fn take_pending(formatted: &str) -> Option<Message> {
    PENDING.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().is_some_and(|m| m.formatted == formatted) {
            slot.take()
        } else {
            None
        }
    })
}
