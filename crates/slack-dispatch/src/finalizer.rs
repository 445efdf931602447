//! Turns the outcome of a request pipeline into exactly one acknowledgement.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// The single response sent for an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// 200 with the challenge as the body.
    Challenge(String),
    /// 200 with an empty body.
    Empty,
    /// 400 with an empty body.
    BadRequest,
}

impl Ack {
    pub fn status_code(&self) -> u16 {
        match self {
            Ack::Challenge(_) | Ack::Empty => 200,
            Ack::BadRequest => 400,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Ack::Challenge(challenge) => challenge,
            Ack::Empty | Ack::BadRequest => "",
        }
    }
}

/// Run a request pipeline, converting a panic anywhere inside it into
/// [`Ack::Empty`].
pub async fn finalize<F>(pipeline: F) -> Ack
where
    F: Future<Output = Ack>,
{
    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(ack) => ack,
        Err(panic) => {
            tracing::error!(panic = %panic_message(panic.as_ref()), "Request pipeline panicked");
            Ack::Empty
        }
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
