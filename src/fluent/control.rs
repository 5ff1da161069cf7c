//! Traffic control middleware: request timeouts and panic catching.

use super::router::FluentRouter;
use crate::{Error, HttpMiddleware};

use {
    axum::response::{IntoResponse, Response},
    http::StatusCode,
    std::any::Any,
    tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer},
};

impl<State> FluentRouter<State>
where
    State: Clone + Send + Sync + 'static,
{
    /// Sets up request timeout middleware.
    ///
    /// Requests taking longer than the configured duration are answered with
    /// `408 Request Timeout`. Without a configured timeout nothing is added.
    ///
    /// ```toml
    /// [http]
    /// request_timeout = "30s"
    /// ```
    #[must_use]
    pub fn setup_timeout(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::Timeout) {
            return self;
        }

        if let Some(timeout) = self.config.http.request_timeout {
            self.inner = self.inner.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ));
        }
        self
    }

    /// Sets up panic catching middleware.
    ///
    /// A panicking renderer yields a JSON `500` response and the server keeps
    /// running. The panic message goes to the channel set with
    /// [`with_panic_notification_channel`](Self::with_panic_notification_channel),
    /// if any.
    ///
    /// `setup_middleware()` installs this as the outermost layer.
    #[must_use]
    pub fn setup_catch_panic(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::CatchPanic) {
            return self;
        }

        let panic_channel = self.panic_channel.clone();
        self.inner = self.inner.layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| -> Response {
                let msg = panic_message(err.as_ref());
                tracing::error!("{msg}");
                if let Some(ch) = &panic_channel {
                    ch.try_send(msg).ok();
                }
                Error::internal("Internal Server Error").into_response()
            },
        ));
        self
    }
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        format!("Service panicked: {s}")
    } else if let Some(s) = err.downcast_ref::<&str>() {
        format!("Service panicked: {s}")
    } else {
        "Service panicked with a non-string payload".to_string()
    }
}
