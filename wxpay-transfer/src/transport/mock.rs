//! Scripted transport for pipeline tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use super::{Endpoint, Transport, sealed};
use crate::{
    error::{Result, TransferError, TransportFailureKind},
    merchant::MerchantContext,
};

/// Canned outcome of one post.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(String),
    Fail(TransportFailureKind, &'static str),
    Status(u16),
}

/// Request as seen by the transport.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub merchant: u32,
    pub mch_id: String,
    pub endpoint: Endpoint,
    pub body: String,
}

/// Transport that replays scripted replies and records requests.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    recorded: Mutex<Vec<Recorded>>,
    calls: AtomicUsize,
}

impl sealed::private::Sealed for MockTransport {}

impl MockTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), ..Self::default() }
    }

    pub(crate) fn replying(body: &str) -> Self {
        Self::new([Reply::Body(body.to_owned())])
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn post<'a>(
        &'a self,
        merchant: &'a MerchantContext,
        endpoint: Endpoint,
        body: String,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().push(Recorded {
            merchant: merchant.number(),
            mch_id: merchant.mch_id().to_owned(),
            endpoint,
            body,
        });

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(kind, message)) => Err(TransferError::transport(kind, message)),
            Some(Reply::Status(status)) => {
                Err(TransferError::Protocol(format!("provider returned HTTP {status}")))
            }
            None => Err(TransferError::transport(TransportFailureKind::Connect, "no reply scripted")),
        }
    }

    fn protocol_name(&self) -> &'static str {
        "mock"
    }
}
